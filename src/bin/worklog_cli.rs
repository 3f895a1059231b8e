use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use clap::{ArgAction, Parser, Subcommand};
use serde::Serialize;
use uuid::Uuid;
use worklog_api::{
    clock::{BusinessCalendar, SystemClock},
    config::{self, AppConfig},
    db::{self, DbPool},
    services::{metrics::MetricsService, sequences},
};

#[derive(Parser)]
#[command(name = "worklog-cli", about = "Maintenance utilities for the worklog database", version)]
struct Cli {
    #[arg(
        long,
        global = true,
        action = ArgAction::SetTrue,
        help = "Render command output as pretty JSON when available"
    )]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending schema migrations
    Migrate,
    #[command(subcommand)]
    Sequences(SequenceCommands),
    #[command(subcommand)]
    Metrics(MetricsCommands),
}

#[derive(Subcommand)]
enum SequenceCommands {
    /// Report gaps and malformed ids per HS_ID letter bucket
    Check,
    /// Renumber every project in creation order
    Repair,
}

#[derive(Subcommand)]
enum MetricsCommands {
    /// Recompute one member's metrics for one day
    Recompute {
        #[arg(long)]
        team_member: Uuid,
        #[arg(long)]
        date: NaiveDate,
    },
    /// Recompute a date range, for one member or the whole active team
    Backfill {
        #[arg(long)]
        team_member: Option<Uuid>,
        #[arg(long)]
        from: NaiveDate,
        #[arg(long)]
        to: NaiveDate,
    },
}

struct CliContext {
    config: AppConfig,
    db: Arc<DbPool>,
}

impl CliContext {
    async fn initialize() -> Result<Self> {
        let config = config::load_config().context("failed to load configuration")?;
        config::init_tracing(config.log_level(), config.log_json);
        let db = db::establish_connection_from_app_config(&config)
            .await
            .context("failed to connect to the database")?;
        Ok(Self {
            config,
            db: Arc::new(db),
        })
    }

    fn metrics_service(&self) -> Result<MetricsService> {
        let calendar = BusinessCalendar::from_offset_minutes(self.config.timezone_offset_minutes)
            .ok_or_else(|| {
                anyhow!(
                    "invalid timezone offset {} minutes",
                    self.config.timezone_offset_minutes
                )
            })?;
        Ok(MetricsService::new(
            self.db.clone(),
            Arc::new(SystemClock),
            calendar,
            self.config.available_minutes_per_day,
        ))
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let context = CliContext::initialize().await?;

    match cli.command {
        Commands::Migrate => {
            db::run_migrations(&context.db).await?;
            println!("Migrations applied");
        }
        Commands::Sequences(command) => handle_sequences(&context, command, cli.json).await?,
        Commands::Metrics(command) => handle_metrics(&context, command, cli.json).await?,
    }

    Ok(())
}

async fn handle_sequences(context: &CliContext, command: SequenceCommands, json: bool) -> Result<()> {
    match command {
        SequenceCommands::Check => {
            let report = sequences::check_hs_ids(&context.db).await?;
            if json {
                return print_json(&report);
            }
            for bucket in &report.buckets {
                if bucket.missing.is_empty() {
                    println!("{}: {} ids, contiguous to {}", bucket.letter, bucket.count, bucket.max);
                } else {
                    println!(
                        "{}: {} ids, max {}, missing {:?}",
                        bucket.letter, bucket.count, bucket.max, bucket.missing
                    );
                }
            }
            for id in &report.invalid {
                println!("malformed: {}", id);
            }
            if report.is_contiguous() {
                println!("All HS_ID buckets are contiguous");
            }
        }
        SequenceCommands::Repair => {
            let renamed = sequences::repair_hs_ids(&context.db).await?;
            println!("Renumbered {} projects", renamed);
        }
    }
    Ok(())
}

async fn handle_metrics(context: &CliContext, command: MetricsCommands, json: bool) -> Result<()> {
    let metrics = context.metrics_service()?;
    match command {
        MetricsCommands::Recompute { team_member, date } => {
            let row = metrics.recompute(team_member, date).await?;
            if json {
                return print_json(&row);
            }
            println!(
                "{} on {}: completed {}, delivered {}, productivity {}",
                team_member,
                date,
                row.assignments_completed,
                row.projects_delivered,
                row.productivity_score
                    .map(|p| p.to_string())
                    .unwrap_or_else(|| "-".into())
            );
        }
        MetricsCommands::Backfill {
            team_member,
            from,
            to,
        } => {
            let written = metrics.backfill(team_member, from, to).await?;
            println!("Recomputed {} member-days", written);
        }
    }
    Ok(())
}
