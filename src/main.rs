use std::path::PathBuf;

use anyhow::Context;
use chrono::{Duration, NaiveDate, Utc};
use clap::{ArgGroup, Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod band;
mod config;
mod db;
mod facts;
mod insights;
mod models;
mod numeric;
mod pacing;
mod partition;
mod report;
mod rollup;
mod seed;

use config::{PacingMode, Thresholds};
use models::{CampaignStatus, CampaignUpdate, DailyFact, Metric};
use numeric::format_optional_delta;

#[derive(Parser)]
#[command(name = "marketpulse")]
#[command(about = "Campaign rollups, KPI bands and week-over-week anomaly signals", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load deterministic demo campaigns
    Seed {
        /// Last simulated day, defaults to yesterday (UTC)
        #[arg(long)]
        end_date: Option<NaiveDate>,
    },
    /// Import daily facts from a CSV file
    Import {
        #[arg(long)]
        campaign: String,
        #[arg(long = "type", default_value = "conversions")]
        campaign_type: String,
        #[arg(long, default_value = "LinkedIn")]
        platform: String,
        #[arg(long)]
        budget: Option<f64>,
        #[arg(long)]
        csv: PathBuf,
    },
    /// List, edit or remove campaigns
    Campaigns {
        #[command(subcommand)]
        action: CampaignAction,
    },
    /// Headline 30-day metrics with their change against the prior 30 days
    Summary {
        #[arg(long)]
        campaign: String,
        #[arg(long)]
        json: bool,
    },
    /// Roll up a trailing window and compare it with the window before
    Rollup {
        #[arg(long)]
        campaign: String,
        #[arg(long, default_value_t = 7)]
        days: usize,
        #[arg(long)]
        json: bool,
    },
    /// Compare a metric with its KPI target
    Kpi {
        #[arg(long)]
        campaign: String,
        #[arg(long, value_enum)]
        metric: Metric,
        #[arg(long)]
        target: f64,
        #[arg(long, default_value_t = 10.0)]
        near_band: f64,
        #[arg(long, default_value_t = 30)]
        days: usize,
    },
    /// Rate a metric against an industry benchmark
    Benchmark {
        #[arg(long)]
        campaign: String,
        #[arg(long, value_enum)]
        metric: Metric,
        #[arg(long)]
        benchmark: f64,
        #[arg(long, default_value_t = 30)]
        days: usize,
    },
    /// Detect week-over-week anomalies
    #[command(group(
        ArgGroup::new("source")
            .args(["campaign", "csv"])
            .required(true)
            .multiple(false)
    ))]
    Insights {
        #[arg(long)]
        campaign: Option<String>,
        #[arg(long)]
        csv: Option<PathBuf>,
        /// Overrides the campaign's stored budget
        #[arg(long)]
        budget: Option<f64>,
        #[arg(long)]
        thresholds: Option<PathBuf>,
        #[arg(long, value_enum)]
        pacing: Option<PacingMode>,
        /// Day used for month pacing, defaults to the latest fact date
        #[arg(long)]
        as_of: Option<NaiveDate>,
        #[arg(long)]
        json: bool,
        /// Persist signals (requires --campaign)
        #[arg(long, requires = "campaign")]
        store: bool,
    },
    /// Generate a markdown report
    Report {
        #[arg(long)]
        campaign: String,
        #[arg(long)]
        budget: Option<f64>,
        #[arg(long)]
        thresholds: Option<PathBuf>,
        /// KPI targets as metric=value, e.g. cvr=4.5
        #[arg(long = "target", value_parser = parse_target)]
        targets: Vec<(Metric, f64)>,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

#[derive(Subcommand)]
enum CampaignAction {
    List {
        #[arg(long, value_enum)]
        status: Option<CampaignStatus>,
        #[arg(long)]
        json: bool,
    },
    /// Change selected fields; the rest stay as stored
    #[command(group(
        ArgGroup::new("changes")
            .args(["rename", "campaign_type", "platform", "status", "budget"])
            .required(true)
            .multiple(true)
    ))]
    Update {
        name: String,
        #[arg(long)]
        rename: Option<String>,
        #[arg(long = "type")]
        campaign_type: Option<String>,
        #[arg(long)]
        platform: Option<String>,
        #[arg(long, value_enum)]
        status: Option<CampaignStatus>,
        #[arg(long)]
        budget: Option<f64>,
    },
    /// Delete a campaign with its facts and stored signals
    Delete { name: String },
}

fn parse_target(raw: &str) -> Result<(Metric, f64), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected metric=value, got {raw:?}"))?;
    let metric = <Metric as clap::ValueEnum>::from_str(name.trim(), true)?;
    let value = numeric::coerce_number(value).ok_or_else(|| format!("invalid target {value:?}"))?;
    Ok((metric, value))
}

fn init_tracing(verbose: bool) {
    let filter = if verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().without_time().with_writer(std::io::stderr))
        .init();
}

async fn connect() -> anyhow::Result<PgPool> {
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to a production Postgres instance")?;

    PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")
}

fn load_thresholds(path: Option<&PathBuf>) -> anyhow::Result<Thresholds> {
    match path {
        Some(path) => Thresholds::load(path),
        None => Ok(Thresholds::default()),
    }
}

fn trailing_facts(facts: &[DailyFact], days: usize) -> Vec<DailyFact> {
    let (sorted, _) = facts::normalize(facts.to_vec());
    rollup::trailing_window(&sorted, days).to_vec()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::InitDb => {
            let pool = connect().await?;
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed { end_date } => {
            let pool = connect().await?;
            let end_date = end_date.unwrap_or_else(|| Utc::now().date_naive() - Duration::days(1));
            db::seed(&pool, end_date).await?;
            println!("Seed data inserted through {end_date}.");
        }
        Commands::Import {
            campaign,
            campaign_type,
            platform,
            budget,
            csv,
        } => {
            let pool = connect().await?;
            let campaign_id =
                db::upsert_campaign(&pool, &campaign, &campaign_type, &platform, budget).await?;
            let summary = db::import_csv(&pool, campaign_id, &csv).await?;
            println!(
                "Imported {} facts from {} ({} rejected, {} duplicate dates).",
                summary.inserted,
                csv.display(),
                summary.rejected,
                summary.duplicates
            );
        }
        Commands::Campaigns { action } => {
            let pool = connect().await?;
            match action {
                CampaignAction::List { status, json } => {
                    let campaigns = db::list_campaigns(&pool, status).await?;
                    if json {
                        println!("{}", serde_json::to_string_pretty(&campaigns)?);
                        return Ok(());
                    }
                    if campaigns.is_empty() {
                        println!("No campaigns found.");
                    }
                    for campaign in &campaigns {
                        let budget = campaign
                            .budget
                            .map(numeric::format_currency)
                            .unwrap_or_else(|| "no budget".to_string());
                        println!(
                            "- {} [{}] {} on {}, {}",
                            campaign.name, campaign.status, campaign.campaign_type, campaign.platform, budget
                        );
                    }
                }
                CampaignAction::Update {
                    name,
                    rename,
                    campaign_type,
                    platform,
                    status,
                    budget,
                } => {
                    let update = CampaignUpdate {
                        name: rename,
                        campaign_type,
                        platform,
                        status,
                        budget,
                    };
                    let campaign = db::update_campaign(&pool, &name, &update).await?;
                    info!(campaign = %campaign.name, status = %campaign.status, "updated campaign");
                    println!("Updated {}.", campaign.name);
                }
                CampaignAction::Delete { name } => {
                    if db::delete_campaign(&pool, &name).await? {
                        println!("Deleted {name}.");
                    } else {
                        anyhow::bail!("campaign {name:?} not found");
                    }
                }
            }
        }
        Commands::Summary { campaign, json } => {
            let pool = connect().await?;
            let campaign = db::find_campaign(&pool, &campaign).await?;
            let facts = db::fetch_facts(&pool, campaign.id, None).await?;
            let insights = insights::detect_signals(&facts, &Thresholds::default(), None, None);
            let cards = report::dashboard_summary(&insights);

            if json {
                println!("{}", serde_json::to_string_pretty(&cards)?);
                return Ok(());
            }
            if cards.is_empty() {
                println!(
                    "{} has {} days of data; the summary needs 30.",
                    campaign.name, insights.available_days
                );
                return Ok(());
            }
            for card in &cards {
                println!("- {}: {} ({} vs prior {})", card.name, card.value, card.change, card.period);
            }
        }
        Commands::Rollup {
            campaign,
            days,
            json,
        } => {
            let pool = connect().await?;
            let campaign = db::find_campaign(&pool, &campaign).await?;
            let facts = db::fetch_facts(&pool, campaign.id, None).await?;
            let (sorted, _) = facts::normalize(facts);
            let (current, previous) = rollup::split_windows(&sorted, days.max(1));

            if json {
                let body = serde_json::json!({ "current": current, "previous": previous });
                println!("{}", serde_json::to_string_pretty(&body)?);
                return Ok(());
            }

            println!("{}: last {} days vs the {} days before", campaign.name, current.days, previous.days);
            for change in report::summarize_changes(&current, &previous) {
                println!(
                    "- {}: {} → {} ({})",
                    change.metric.label(),
                    report::format_metric(change.metric, change.previous),
                    report::format_metric(change.metric, change.current),
                    format_optional_delta(change.delta_pct)
                );
            }
        }
        Commands::Kpi {
            campaign,
            metric,
            target,
            near_band,
            days,
        } => {
            let pool = connect().await?;
            let campaign = db::find_campaign(&pool, &campaign).await?;
            let facts = db::fetch_facts(&pool, campaign.id, None).await?;
            let window = rollup::rollup(&trailing_facts(&facts, days));
            let progress = band::kpi_progress(metric, &window, target, near_band);
            println!("{}", serde_json::to_string_pretty(&progress)?);
        }
        Commands::Benchmark {
            campaign,
            metric,
            benchmark,
            days,
        } => {
            let pool = connect().await?;
            let campaign = db::find_campaign(&pool, &campaign).await?;
            let facts = db::fetch_facts(&pool, campaign.id, None).await?;
            let window = rollup::rollup(&trailing_facts(&facts, days));
            let comparison = band::compare_to_benchmark(metric, &window, benchmark);
            println!("{}", serde_json::to_string_pretty(&comparison)?);
        }
        Commands::Insights {
            campaign,
            csv,
            budget,
            thresholds,
            pacing,
            as_of,
            json,
            store,
        } => {
            let mut thresholds = load_thresholds(thresholds.as_ref())?;
            if let Some(mode) = pacing {
                thresholds.pacing_mode = mode;
            }

            let (facts, stored_campaign, pool) = match (campaign, csv) {
                (Some(name), _) => {
                    let pool = connect().await?;
                    let campaign = db::find_campaign(&pool, &name).await?;
                    let facts = db::fetch_facts(&pool, campaign.id, None).await?;
                    (facts, Some(campaign), Some(pool))
                }
                (None, Some(path)) => (db::load_csv_facts(&path)?.facts, None, None),
                (None, None) => anyhow::bail!("either --campaign or --csv is required"),
            };

            let budget = budget.or_else(|| stored_campaign.as_ref().and_then(|c| c.budget));
            let report = insights::detect_signals(&facts, &thresholds, budget, as_of);
            if report.signals.is_empty() || report.available_days < insights::MIN_HISTORY_DAYS {
                info!(
                    available_days = report.available_days,
                    signals = report.signals.len(),
                    "no actionable signals"
                );
            }

            if store {
                if let (Some(pool), Some(campaign)) = (&pool, &stored_campaign) {
                    let run_date = as_of
                        .or_else(|| facts.iter().map(|f| f.date).max())
                        .unwrap_or_else(|| Utc::now().date_naive());
                    let stored = db::store_signals(pool, campaign.id, run_date, &report.signals).await?;
                    info!(stored, %run_date, "stored insight signals");
                }
            }

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
                return Ok(());
            }

            if report.signals.is_empty() {
                println!("No signals for {} days of data.", report.available_days);
                return Ok(());
            }

            println!("Signals across {} days of data:", report.available_days);
            for signal in &report.signals {
                println!("- [{}] {} ({})", signal.severity, signal.title, signal.id);
                for line in &signal.evidence {
                    println!("    {line}");
                }
            }
        }
        Commands::Report {
            campaign,
            budget,
            thresholds,
            targets,
            out,
        } => {
            let pool = connect().await?;
            let thresholds = load_thresholds(thresholds.as_ref())?;
            let campaign = db::find_campaign(&pool, &campaign).await?;
            let facts = db::fetch_facts(&pool, campaign.id, None).await?;
            let budget = budget.or(campaign.budget);
            let insights = insights::detect_signals(&facts, &thresholds, budget, None);

            let kpi_window = insights.cur30.clone().unwrap_or_else(|| insights.cur7.clone());
            let kpis: Vec<_> = targets
                .iter()
                .map(|(metric, target)| band::kpi_progress(*metric, &kpi_window, *target, 10.0))
                .collect();

            let generated_on = facts
                .iter()
                .map(|f| f.date)
                .max()
                .unwrap_or_else(|| Utc::now().date_naive());
            let report = report::build_report(&campaign.name, generated_on, &insights, &kpis);
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_kpi_targets() {
        assert_eq!(parse_target("cvr=4.5"), Ok((Metric::Cvr, 4.5)));
        assert_eq!(parse_target("CPC = $2.10"), Ok((Metric::Cpc, 2.1)));
        assert!(parse_target("cvr").is_err());
        assert!(parse_target("nope=1").is_err());
    }

    #[test]
    fn insights_requires_a_source() {
        assert!(Cli::try_parse_from(["marketpulse", "insights"]).is_err());
        assert!(Cli::try_parse_from(["marketpulse", "insights", "--csv", "facts.csv", "--store"]).is_err());
        assert!(Cli::try_parse_from(["marketpulse", "insights", "--csv", "facts.csv", "--as-of", "2024-03-31"]).is_ok());
    }

    #[test]
    fn campaign_update_needs_at_least_one_change() {
        assert!(Cli::try_parse_from(["marketpulse", "campaigns", "update", "Spring Brand Push"]).is_err());

        let cli = Cli::try_parse_from([
            "marketpulse",
            "campaigns",
            "update",
            "Spring Brand Push",
            "--status",
            "paused",
            "--type",
            "awareness",
        ])
        .unwrap();
        match cli.command {
            Commands::Campaigns {
                action: CampaignAction::Update { status, campaign_type, rename, .. },
            } => {
                assert_eq!(status, Some(CampaignStatus::Paused));
                assert_eq!(campaign_type.as_deref(), Some("awareness"));
                assert_eq!(rename, None);
            }
            _ => panic!("expected campaigns update"),
        }
    }

    #[test]
    fn campaign_list_filters_by_known_status() {
        assert!(Cli::try_parse_from(["marketpulse", "campaigns", "list", "--status", "draft"]).is_ok());
        assert!(Cli::try_parse_from(["marketpulse", "campaigns", "list", "--status", "archived"]).is_err());
    }
}
