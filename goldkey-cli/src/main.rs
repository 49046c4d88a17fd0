use anyhow::{Context, Result, bail};
use chrono::Utc;
use clap::{Parser, Subcommand};
use goldkey_core::{
    CoveragePatch, CrmStore, CustomerPatch, classify, events_to_ics, hoffmann_gap, run_watchdog,
    watchdog,
};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

mod config;
mod state;

use config::{Config, load_config};

#[derive(Parser, Debug)]
#[command(
    name = "goldkey",
    version,
    about = "GoldKey CRM toolkit for insurance agents"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Classify an indemnity policy by its enrollment month (YYYY-MM)
    Generation { date: String },

    /// Hoffmann present value of the coverage gap, in 10,000 KRW
    Gap {
        #[arg(long)]
        income: f64,

        #[arg(long, default_value_t = 30.0)]
        percent: f64,

        #[arg(long, default_value_t = 30.0)]
        years: f64,
    },

    /// Generate a consultation report and print it once published
    Report {
        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        job: Option<String>,

        /// Enrollment month (YYYY-MM)
        #[arg(long)]
        date: Option<String>,

        #[arg(long)]
        income: Option<f64>,

        #[arg(long)]
        percent: Option<f64>,

        #[arg(long)]
        years: Option<f64>,

        /// Also write the report (with its title) to this file
        #[arg(long)]
        share_to: Option<PathBuf>,
    },

    /// List tasks and completion progress from a state snapshot
    Tasks {
        /// Snapshot JSON; the starter task list when omitted
        snapshot: Option<PathBuf>,
    },

    /// Check a state snapshot and repair corrupted slices
    Recover {
        snapshot: PathBuf,

        /// Overwrite the snapshot file with the repaired state
        #[arg(long, default_value_t = false)]
        write: bool,
    },

    /// Calendar export for due-dated tasks
    Calendar {
        #[command(subcommand)]
        command: CalendarCommand,
    },

    /// Fetch a policy PDF and send it to the document bucket
    Upload {
        /// Document URL
        #[arg(long)]
        url: String,

        #[arg(long)]
        insurer: Option<String>,

        #[arg(long)]
        doc_type: Option<String>,

        /// Override upload.api_endpoint
        #[arg(long)]
        endpoint: Option<String>,

        /// Override upload.api_key
        #[arg(long)]
        api_key: Option<String>,
    },

    /// Manage ~/.goldkey/config.toml
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
enum CalendarCommand {
    /// Print an ICS calendar for the open tasks in a snapshot
    ExportIcs { snapshot: PathBuf },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Write the default config if none exists
    Init,
    /// Print the effective config
    Show,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("goldkey=info,goldkey_core=info,goldkey_upload=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::Generation { date } => {
            let g = classify(&date);
            println!("{}", g.label().unwrap_or("unset"));
        }

        Command::Gap {
            income,
            percent,
            years,
        } => {
            let cfg = load_config()?;
            if !cfg.features.coverage_enabled {
                bail!("coverage calculation is disabled (features.coverage_enabled)");
            }
            println!("{}", hoffmann_gap(income, percent, years));
        }

        Command::Report {
            name,
            job,
            date,
            income,
            percent,
            years,
            share_to,
        } => {
            let cfg = load_config()?;
            let mut store = CrmStore::new(cfg.features, cfg.store_settings());
            store.update_customer(CustomerPatch {
                name,
                job,
                ..Default::default()
            });
            if let Some(d) = date {
                store.set_insurance_date(d);
            }
            store.update_coverage(CoveragePatch {
                annual_income: income,
                coverage_gap_percent: percent,
                years_remaining: years,
            });
            run_report(&mut store, share_to.as_deref()).await?;
        }

        Command::Tasks { snapshot } => {
            let cfg = load_config()?;
            let store = match snapshot {
                Some(path) => {
                    let mut store = CrmStore::new(cfg.features, cfg.store_settings());
                    if store.restore(state::read_snapshot(&path)?) {
                        tracing::warn!(path = %path.display(), "snapshot needed repair");
                    }
                    store
                }
                None => CrmStore::with_seed_tasks(cfg.features, cfg.store_settings()),
            };
            for t in &store.state().tasks {
                let due = t.due_date.map(|d| d.to_string()).unwrap_or_default();
                println!(
                    "[{}] #{} {:?} {} {}",
                    if t.is_done { "x" } else { " " },
                    t.id,
                    t.priority,
                    t.title,
                    due
                );
            }
            println!("\nProgress: {}%", store.progress_percent());
        }

        Command::Recover { snapshot, write } => {
            recover_snapshot(&snapshot, write)?;
        }

        Command::Calendar { command } => match command {
            CalendarCommand::ExportIcs { snapshot } => {
                let cfg = load_config()?;
                if !cfg.features.calendar_sync_enabled {
                    bail!(
                        "calendar sync is disabled; set features.calendar_sync_enabled = true in {}",
                        config::config_path()?.display()
                    );
                }
                let mut store = CrmStore::new(cfg.features, cfg.store_settings());
                store.restore(state::read_snapshot(&snapshot)?);
                let events = store.calendar_events(cfg.timezone()?);
                print!("{}", events_to_ics(&events));
            }
        },

        Command::Upload {
            url,
            insurer,
            doc_type,
            endpoint,
            api_key,
        } => {
            let cfg = load_config()?;
            let mut settings = cfg.upload_settings();
            if let Some(e) = endpoint {
                settings.api_endpoint = e;
            }
            if let Some(k) = api_key {
                settings.api_key = k;
            }
            if let Some(i) = insurer {
                settings.insurer = i;
            }
            let doc_type = doc_type.unwrap_or(cfg.upload.doc_type);

            let client = reqwest::Client::new();
            let (doc, reply) = goldkey_upload::send_to_bucket(&client, &settings, &url, &doc_type)
                .await
                .with_context(|| format!("sending {url}"))?;
            println!("Uploaded {} ({} bytes)", doc.filename, doc.bytes.len());
            if !reply.is_null() {
                println!("{}", serde_json::to_string_pretty(&reply)?);
            }
        }

        Command::Config { command } => match command {
            ConfigCommand::Init => config::init_config()?,
            ConfigCommand::Show => {
                let cfg: Config = load_config()?;
                println!("{}", toml::to_string_pretty(&cfg).context("serialize config")?);
            }
        },
    }

    Ok(())
}

/// Kick off generation and drive the store until the publish lands.
async fn run_report(store: &mut CrmStore, share_to: Option<&Path>) -> Result<()> {
    if store.generate_report(Utc::now()).is_none() {
        bail!("report generation is disabled (features.report_enabled)");
    }

    while let Some(due) = store.next_publish_at() {
        let wait = (due - Utc::now()).to_std().unwrap_or_default();
        tokio::time::sleep(wait).await;
        store.poll(Utc::now());
    }

    let text = store
        .state()
        .report
        .text
        .clone()
        .context("report did not publish")?;
    println!("{text}");

    if let Some(path) = share_to {
        let mut write_file = |text: &str, title: &str| -> Result<()> {
            fs::write(path, format!("{title}\n\n{text}\n"))
                .with_context(|| format!("write {}", path.display()))
        };
        if store.share_report(&mut write_file) {
            tracing::info!(path = %path.display(), "report shared");
        }
    }
    Ok(())
}

fn recover_snapshot(path: &Path, write: bool) -> Result<()> {
    let raw = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let parsed: Option<Value> = serde_json::from_str(&raw).ok();

    let mut repaired: Option<Value> = None;
    let recovered = run_watchdog(
        || parsed.clone().context("snapshot is not valid JSON"),
        |v| repaired = Some(v),
    );

    let out = repaired
        .or(parsed)
        .unwrap_or_else(watchdog::default_state);

    if recovered {
        tracing::warn!(path = %path.display(), "snapshot repaired");
    } else {
        tracing::info!(path = %path.display(), "snapshot is healthy");
    }

    if write && recovered {
        state::write_snapshot(path, &out)?;
    }
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}
