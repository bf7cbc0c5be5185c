use std::path::PathBuf;

use anyhow::Context;
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

mod block;
mod chart;
mod config;
mod day;
mod db;
mod error;
mod gaps;
mod import;
mod models;
mod pipeline;
mod report;
mod sample;
mod series;
mod smooth;
mod store;

use config::{
    AppConfig, DEFAULT_START_PARAM, MAX_GRAPH_SAMPLES, MAX_MOBILE_SAMPLES, MOBILE_IMG_HEIGHT,
    MOBILE_IMG_WIDTH, PRIME_DAYS,
};
use db::PgBlockStore;
use models::UserSettings;
use pipeline::TrendRequest;
use series::TimeSeries;

#[derive(Parser)]
#[command(name = "weightmeter")]
#[command(about = "Daily weight tracking with a smoothed trend line", long_about = None)]
struct Cli {
    /// Owner of the weight entries
    #[arg(long, global = true, env = "WEIGHTMETER_USER", default_value = "me@localhost")]
    user: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    #[command(flatten)]
    Owner(OwnerCommands),
}

/// Commands acting on the selected owner's entries and settings.
#[derive(Subcommand)]
enum OwnerCommands {
    /// Record a weight (defaults to today)
    Add {
        #[arg(long)]
        weight: f64,
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Remove the weight recorded for a day
    Clear {
        #[arg(long)]
        date: NaiveDate,
    },
    /// Import date,weight rows from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Export recorded weights as CSV
    Export {
        #[arg(long, default_value = "*", allow_hyphen_values = true)]
        start: String,
        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        end: String,
        #[arg(long, default_value = "weight.csv")]
        out: PathBuf,
    },
    /// Show the most recent weight and quick-entry choices
    Latest,
    /// Print a trend chart URL
    Chart {
        #[arg(long, default_value = DEFAULT_START_PARAM, allow_hyphen_values = true)]
        start: String,
        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        end: String,
        #[arg(long, default_value_t = MAX_MOBILE_SAMPLES)]
        samples: usize,
        #[arg(long, default_value_t = MOBILE_IMG_WIDTH)]
        width: u32,
        #[arg(long, default_value_t = MOBILE_IMG_HEIGHT)]
        height: u32,
    },
    /// Generate a markdown trend report
    Report {
        #[arg(long, default_value = DEFAULT_START_PARAM, allow_hyphen_values = true)]
        start: String,
        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        end: String,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// Show or change trend settings
    Settings {
        #[arg(long)]
        gamma: Option<f64>,
        #[arg(long)]
        resolution: Option<f64>,
    },
}

fn init_logging() {
    FmtSubscriber::builder()
        .with_max_level(
            std::env::var("RUST_LOG")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(Level::INFO),
        )
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();
    let config = AppConfig::load(cli.user)?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await
        .context("failed to connect to Postgres")?;

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Owner(command) => run_owner_command(command, &pool, &config).await?,
    }

    Ok(())
}

async fn run_owner_command(
    command: OwnerCommands,
    pool: &PgPool,
    config: &AppConfig,
) -> anyhow::Result<()> {
    let user = db::get_or_create_user(pool, &config.user_email).await?;
    info!(user = %user.email, "loaded owner");
    let store = PgBlockStore::new(pool.clone());
    let series = TimeSeries::new(&store, user.id);
    let today = day::to_day(Utc::now().date_naive());

    match command {
        OwnerCommands::Add { weight, date } => {
            let day = date.map(day::to_day).unwrap_or(today);
            series.update(day, weight).await?;
            println!("Recorded {weight:.2} for {}.", day::to_date(day)?);
        }
        OwnerCommands::Clear { date } => {
            series.clear(day::to_day(date)).await?;
            println!("Cleared {date}.");
        }
        OwnerCommands::Import { csv } => {
            let parsed = import::import_csv(&series, &csv).await?;
            println!(
                "Imported {} weights and cleared {} days from {} ({} rows rejected).",
                parsed.entries.len(),
                parsed.cleared.len(),
                csv.display(),
                parsed.rejected
            );
        }
        OwnerCommands::Export { start, end, out } => {
            let (start, end) = day::date_range(&start, &end, today)?;
            let file = std::fs::File::create(&out)
                .with_context(|| format!("failed to create {}", out.display()))?;
            let written = import::write_csv(series.query(start, end).await?, file)?;
            println!("Exported {written} weights to {}.", out.display());
        }
        OwnerCommands::Latest => match series.most_recent_entry(today).await? {
            Some(entry) => {
                println!("Latest: {:.2} on {}", entry.weight, day::to_date(entry.day)?);
                let resolution = user.settings.scale_resolution;
                let choices = report::weight_choices(entry.weight, resolution);
                println!("Choices: {}", choices.join(" "));
            }
            None => println!("No recent entry found."),
        },
        OwnerCommands::Chart {
            start,
            end,
            samples,
            width,
            height,
        } => {
            let (start, end) = day::date_range(&start, &end, today)?;
            let request = TrendRequest {
                start,
                end,
                samples,
                gamma: user.settings.gamma,
                prime_days: PRIME_DAYS,
            };
            let points = pipeline::trend(&series, request).await?;
            if points.is_empty() {
                println!("No weights recorded for this window.");
                return Ok(());
            }
            println!("{}", chart::chart_url(&points, width, height)?);
        }
        OwnerCommands::Report { start, end, out } => {
            let (start, end) = day::date_range(&start, &end, today)?;
            let request = TrendRequest {
                start,
                end,
                samples: MAX_GRAPH_SAMPLES,
                gamma: user.settings.gamma,
                prime_days: PRIME_DAYS,
            };
            let points = pipeline::trend(&series, request).await?;
            let url = if points.is_empty() {
                None
            } else {
                Some(chart::chart_url(&points, MOBILE_IMG_WIDTH, MOBILE_IMG_HEIGHT)?)
            };
            let latest = series.most_recent_entry(today).await?;
            let report =
                report::build_report(&user, start, end, latest, &points, url.as_deref())?;
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
        OwnerCommands::Settings { gamma, resolution } => {
            let current = user.settings;
            if gamma.is_none() && resolution.is_none() {
                println!(
                    "gamma {:.2}, scale resolution {:.2}",
                    current.gamma, current.scale_resolution
                );
                return Ok(());
            }

            let settings = UserSettings {
                gamma: gamma.unwrap_or(current.gamma),
                scale_resolution: resolution.unwrap_or(current.scale_resolution),
            };
            db::update_settings(pool, user.id, &settings).await?;
            println!(
                "Saved gamma {:.2}, scale resolution {:.2}.",
                settings.gamma, settings.scale_resolution
            );
        }
    }

    Ok(())
}
