use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use slot_engine::memory::{InMemoryStore, StaticCalendar};
use slot_engine::{
    slot_id, AvailabilityCriteria, Coach, CoachId, ContributionId, DisplayPreference,
    EngineConfig, SchedulingService, TimeRange,
};

#[derive(Parser)]
#[command(name = "slots", about = "Preview bookable slots from availability criteria")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate slots for a criteria file and print them as JSON
    Calculate {
        /// Availability criteria as JSON
        #[arg(long)]
        criteria: PathBuf,

        /// Coach's IANA timezone
        #[arg(long, env = "SLOTS_TIMEZONE")]
        timezone: String,

        /// Render in UTC instead of the coach's zone
        #[arg(long)]
        utc: bool,

        /// Anchor instant (RFC 3339); defaults to the current time
        #[arg(long)]
        now: Option<DateTime<Utc>>,

        /// JSON array of `{start, end}` busy ranges to exclude
        #[arg(long)]
        busy: Option<PathBuf>,

        /// Engine configuration as JSON
        #[arg(long, env = "SLOTS_CONFIG")]
        config: Option<PathBuf>,
    },
    /// Print the deterministic id of a slot
    SlotId {
        /// Contribution the slot belongs to
        #[arg(long)]
        contribution: String,

        /// Slot start (RFC 3339)
        #[arg(long)]
        start: DateTime<Utc>,

        /// Slot end (RFC 3339)
        #[arg(long)]
        end: DateTime<Utc>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Calculate {
            criteria,
            timezone,
            utc,
            now,
            busy,
            config,
        } => {
            let criteria: AvailabilityCriteria = read_json(&criteria)?;
            let busy: Vec<TimeRange> = match busy {
                Some(path) => read_json::<Vec<TimeRange>>(&path)?
                    .into_iter()
                    .map(|r| TimeRange::new(r.start, r.end))
                    .collect::<Result<_, _>>()
                    .with_context(|| format!("invalid busy range in {}", path.display()))?,
                None => Vec::new(),
            };
            let config = match config {
                Some(path) => {
                    let raw = fs::read_to_string(&path)
                        .with_context(|| format!("failed to read {}", path.display()))?;
                    EngineConfig::from_json_str(&raw)
                        .with_context(|| format!("invalid config in {}", path.display()))?
                }
                None => EngineConfig::default(),
            };
            let display = if utc {
                DisplayPreference::Utc
            } else {
                DisplayPreference::CoachLocal
            };

            let coach = CoachId::new("cli");
            let store = Arc::new(InMemoryStore::new());
            store.insert_coach(Coach {
                id: coach.clone(),
                timezone,
                calendar_linked: !busy.is_empty(),
            });
            let calendar = Arc::new(StaticCalendar::new());
            for range in busy {
                calendar.add_busy(&coach, range);
            }

            let service = SchedulingService::new(
                store.clone(),
                store.clone(),
                calendar,
                store,
                &config,
            );
            let slots = service
                .calculate_slots(&coach, &criteria, display, now.unwrap_or_else(Utc::now))
                .await
                .context("slot calculation failed")?;

            tracing::info!(count = slots.len(), "slots calculated");
            println!("{}", serde_json::to_string_pretty(&slots)?);
        }
        Command::SlotId {
            contribution,
            start,
            end,
        } => {
            if end <= start {
                anyhow::bail!("slot end {end} must be after start {start}");
            }
            println!("{}", slot_id(&ContributionId::new(contribution), start, end));
        }
    }

    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let raw =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("invalid JSON in {}", path.display()))
}
