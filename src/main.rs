use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{error, info, warn};

use hitting_scraper::app::{run_export_session, ExportTimings, ExportUseCase, NormalizeUseCase};
use hitting_scraper::config::{Config, Credentials};
use hitting_scraper::infra::{DownloadDir, WebDriverSession};
use hitting_scraper::logging;
use hitting_scraper::types::{parse_cli_date, season_start, DateEntry, DateRange, ExportRequest};

#[derive(Parser)]
#[command(name = "hitting_scraper")]
#[command(about = "Export hitting leaderboards by date range and normalize them")]
#[command(version)]
struct Cli {
    /// Path to a TOML config file (defaults to ./config.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory for the rolling JSON log files
    #[arg(long, global = true, default_value = "logs")]
    log_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download one cumulative CSV per day, starting at the given end date
    Export {
        /// The starting end date in MM/DD/YYYY format (after 3/1)
        starting_end_date: String,
        /// Number of days to export (1-10)
        num_days_to_evaluate: u32,
        /// Run the browser headless (default from config)
        #[arg(long, conflicts_with = "no_headless")]
        headless: bool,
        /// Show the browser window
        #[arg(long)]
        no_headless: bool,
        /// How dates are entered into the report inputs
        #[arg(long, value_enum)]
        date_entry: Option<DateEntry>,
        /// Directory the browser downloads into
        #[arg(long)]
        download_dir: Option<PathBuf>,
        /// WebDriver server URL (chromedriver)
        #[arg(long)]
        webdriver_url: Option<String>,
    },
    /// Clean and z-score one exported CSV
    Normalize {
        /// Raw export to read; defaults to the download for --end-date
        input: Option<PathBuf>,
        /// End date (MM/DD/YYYY) of the export to read from the download directory
        #[arg(long)]
        end_date: Option<String>,
        /// Where the derived CSVs are written
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,
    },
}

async fn run_export(
    config: Config,
    starting_end_date: &str,
    num_days: u32,
) -> Result<()> {
    // Validate everything before touching the network
    let date = parse_cli_date(starting_end_date)?;
    let request = ExportRequest::new(date, num_days)?;
    let credentials = Credentials::from_env()?;

    std::fs::create_dir_all(&config.export.download_dir).with_context(|| {
        format!(
            "Failed to create download directory {}",
            config.export.download_dir.display()
        )
    })?;

    println!("🌐 Starting browser session...");
    let session = WebDriverSession::start(
        &config.browser.webdriver_url,
        config.browser.headless,
        &config.export.download_dir,
    )
    .await
    .with_context(|| format!("Failed to start WebDriver session at {}", config.browser.webdriver_url))?;

    let use_case = ExportUseCase::new(
        &session,
        DownloadDir::new(&config.export.download_dir),
        config.site.clone(),
        ExportTimings::from(&config.export),
        config.browser.date_entry,
    );

    let summary = run_export_session(&use_case, &request, &credentials).await?;

    println!("\n📊 Export Results:");
    println!("   Days attempted: {}", summary.attempted);
    println!("   Exported: {}", summary.exported.len());
    println!("   Failed: {}", summary.failures.len());
    for path in &summary.exported {
        println!("   - {}", path.display());
    }
    if !summary.failures.is_empty() {
        warn!("{} days failed to export", summary.failures.len());
        println!("\n⚠️  Failures:");
        for failure in &summary.failures {
            println!("   - {}: {}", failure.range, failure.error);
        }
    }
    Ok(())
}

fn run_normalize(
    config: Config,
    input: Option<PathBuf>,
    end_date: Option<String>,
    output_dir: PathBuf,
) -> Result<()> {
    let input = match (input, end_date) {
        (Some(path), _) => path,
        (None, Some(end)) => {
            let end = parse_cli_date(&end)?;
            let range = DateRange::new(season_start(end), end)?;
            config.export.download_dir.join(range.export_file_name())
        }
        (None, None) => anyhow::bail!("Provide an input CSV path or --end-date"),
    };

    let use_case = NormalizeUseCase::new(config.normalize.to_spec());
    let (outputs, report) = use_case
        .run(&input, &output_dir)
        .with_context(|| format!("Normalization of {} failed", input.display()))?;

    println!("\n📊 Normalization Results for {}:", input.display());
    println!("   Rows kept: {} (dropped {})", report.rows_kept, report.rows_dropped());
    println!("   Columns removed: {:?}", report.columns_removed);
    println!("   Columns normalized: {}", report.normalized_columns.len());
    if !report.undefined_columns.is_empty() {
        println!("   ⚠️  Undefined (no spread): {:?}", report.undefined_columns);
    }
    println!("💾 {}", outputs.cleaned.display());
    println!("💾 {}", outputs.normalized.display());
    println!("💾 {}", outputs.names.display());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _log_guard = logging::init_logging(&logging::LogSettings::new(&cli.log_dir))?;
    let mut config = Config::load(cli.config.as_deref())?;

    let result = match cli.command {
        Commands::Export {
            starting_end_date,
            num_days_to_evaluate,
            headless,
            no_headless,
            date_entry,
            download_dir,
            webdriver_url,
        } => {
            if headless {
                config.browser.headless = true;
            }
            if no_headless {
                config.browser.headless = false;
            }
            if let Some(entry) = date_entry {
                config.browser.date_entry = entry;
            }
            if let Some(dir) = download_dir {
                config.export.download_dir = dir;
            }
            if let Some(url) = webdriver_url {
                config.browser.webdriver_url = url;
            }
            println!("🔄 Running export pipeline...");
            run_export(config, &starting_end_date, num_days_to_evaluate).await
        }
        Commands::Normalize {
            input,
            end_date,
            output_dir,
        } => {
            println!("🔨 Running normalization pipeline...");
            run_normalize(config, input, end_date, output_dir)
        }
    };

    match &result {
        Ok(()) => info!("Run completed"),
        Err(e) => {
            error!("Run failed: {:#}", e);
            println!("❌ {e:#}");
        }
    }
    result
}
