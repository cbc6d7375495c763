//! Lyrical Complexity CLI - score chart lyrics and track readability over time
//!
//! # Main Commands
//!
//! ```bash
//! lyrical-complexity run                   # Run every stage in order
//! lyrical-complexity run --skip-extract    # Reuse the existing songs file
//! ```
//!
//! # Stage Commands
//!
//! ```bash
//! lyrical-complexity extract               # Look up lyrics, write songs.csv
//! lyrical-complexity transform             # Score songs, write complexity files
//! lyrical-complexity load                  # Upsert complexity files into SQLite
//! lyrical-complexity check                 # Run the quality gate on loaded rows
//! lyrical-complexity report                # Write the summary report
//! ```
//!
//! # Debug Commands
//!
//! ```bash
//! lyrical-complexity metrics lyrics.txt    # Score one lyric text
//! lyrical-complexity insights              # Insights from the last transform
//! lyrical-complexity analytics             # Verification queries on the database
//! lyrical-complexity config                # Print the effective configuration
//! ```

use chrono::Utc;
use clap::{Parser, Subcommand};
use lyrical_complexity::pipeline::{
    extract_stage, load_stage, quality_stage, report_stage, transform_stage,
};
use lyrical_complexity::output::read_transform_output;
use lyrical_complexity::{
    generate_insights, logs, run_pipeline, LyricsStore, MetricCalculator, PipelineConfig,
    RunOptions,
};
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "lyrical-complexity")]
#[command(about = "Measure the lyrical complexity of chart-listed songs")]
#[command(version)]
struct Cli {
    /// JSON configuration file (defaults apply when omitted)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run extract, transform, load, quality check and report
    Run {
        /// Reuse the existing songs file instead of calling the lyrics API
        #[arg(long)]
        skip_extract: bool,
    },

    /// Look up lyrics for the chart file
    Extract,

    /// Score the songs file and aggregate by year and decade
    Transform,

    /// Upsert the transform output into the database
    Load,

    /// Check loaded rows against the quality thresholds
    Check,

    /// Write the summary report for the last transform
    Report,

    /// Compute metrics for a single lyric text
    Metrics {
        /// Text file with lyrics (default: stdin)
        input: Option<PathBuf>,
    },

    /// Show insights derived from the last transform
    Insights {
        /// First year counted as recent (default: from config)
        #[arg(long)]
        recent_since: Option<i32>,
    },

    /// Run verification queries against the database
    Analytics,

    /// Print the effective configuration as JSON
    Config,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logs::init(cli.verbose);

    let result = match PipelineConfig::load(cli.config.as_deref()) {
        Ok(config) => run_command(cli.command, &config).await,
        Err(e) => Err(e.into()),
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

async fn run_command(
    command: Commands,
    config: &PipelineConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Run { skip_extract } => cmd_run(config, skip_extract).await,
        Commands::Extract => cmd_extract(config).await,
        Commands::Transform => cmd_transform(config),
        Commands::Load => cmd_load(config),
        Commands::Check => cmd_check(config),
        Commands::Report => cmd_report(config),
        Commands::Metrics { input } => cmd_metrics(config, input.as_deref()),
        Commands::Insights { recent_since } => cmd_insights(config, recent_since),
        Commands::Analytics => cmd_analytics(config),
        Commands::Config => print_json(config),
    }
}

async fn cmd_run(config: &PipelineConfig, skip_extract: bool) -> Result<(), Box<dyn std::error::Error>> {
    let summary = run_pipeline(config, RunOptions { skip_extract }).await?;

    eprintln!("✅ Run {} finished", summary.run_id);
    if let Some(ref extraction) = summary.extraction {
        eprintln!(
            "   Lyrics found: {}/{} ({:.0}%)",
            extraction.found,
            extraction.total(),
            extraction.found_ratio() * 100.0
        );
    }
    eprintln!("   Rows: {} ({} skipped)", summary.rows, summary.skipped);
    eprintln!(
        "   Loaded: {} rows, {} years, {} decades",
        summary.load.rows, summary.load.years, summary.load.decades
    );
    eprintln!("   Missing lyrics: {}", summary.quality.missing_lyrics);
    eprintln!("   📄 Report: {}", summary.report_path.display());
    Ok(())
}

async fn cmd_extract(config: &PipelineConfig) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("🔎 Extracting lyrics: {}", config.chart_path.display());
    let report = extract_stage(config).await?;

    eprintln!("   Found: {}", report.found);
    eprintln!("   Missing: {}", report.missing);
    eprintln!("   Failed: {}", report.failed);
    if report.out_of_range > 0 {
        eprintln!("   Out of range: {}", report.out_of_range);
    }
    eprintln!("💾 Songs written to: {}", config.songs_path().display());
    Ok(())
}

fn cmd_transform(config: &PipelineConfig) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("⚙️  Transforming: {}", config.songs_path().display());
    let output = transform_stage(config, Utc::now())?;

    eprintln!("   Rows: {}", output.rows.len());
    eprintln!("   Years: {}", output.yearly.len());
    eprintln!("   Decades: {}", output.decade.len());
    for record in output.skipped.iter().take(5) {
        eprintln!("   ⚠️  {}", record);
    }
    eprintln!("💾 Output written to: {}", config.transform_output_path().display());
    Ok(())
}

fn cmd_load(config: &PipelineConfig) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📦 Loading into: {}", config.database_path.display());
    let summary = load_stage(config)?;
    eprintln!(
        "✅ Loaded {} rows, {} years, {} decades",
        summary.rows, summary.years, summary.decades
    );
    Ok(())
}

fn cmd_check(config: &PipelineConfig) -> Result<(), Box<dyn std::error::Error>> {
    let report = quality_stage(config)?;
    eprintln!("✅ Quality check passed");
    print_json(&report)
}

fn cmd_report(config: &PipelineConfig) -> Result<(), Box<dyn std::error::Error>> {
    let path = report_stage(config, Utc::now())?;
    eprintln!("📄 Report written to: {}", path.display());
    Ok(())
}

fn cmd_metrics(config: &PipelineConfig, input: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let lyrics = match input {
        Some(path) => fs::read_to_string(path)?,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };

    let metrics = MetricCalculator::from_heuristic(config.syllable_heuristic).compute(Some(&lyrics));
    print_json(&metrics)
}

fn cmd_insights(config: &PipelineConfig, recent_since: Option<i32>) -> Result<(), Box<dyn std::error::Error>> {
    let output = read_transform_output(&config.transform_output_path())?;
    let insights = generate_insights(&output.rows, recent_since.unwrap_or(config.recent_since));
    print_json(&insights)
}

fn cmd_analytics(config: &PipelineConfig) -> Result<(), Box<dyn std::error::Error>> {
    let store = LyricsStore::open(&config.database_path)?;
    println!("{}", store.analytics()?);
    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
