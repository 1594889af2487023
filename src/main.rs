//! # taskpulse
//!
//! Mirrors an external collaboration board into a local store, scores
//! assignees on completion delay, and sends deduplicated notifications.
//!
//! Usage:
//!   taskpulse serve                  # scheduler + webhook gateway
//!   taskpulse sync                   # one reconciliation pass
//!   taskpulse scan                   # run all notification scans once
//!   taskpulse summary [--date ...]   # daily summary now
//!   taskpulse member-email <id> <email>
//!   taskpulse override <task-id> [score]

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use taskpulse_board::{ActivityClient, BoardApi, BoardClient};
use taskpulse_compose::OpenAiCompatibleComposer;
use taskpulse_core::PulseConfig;
use taskpulse_engine::{DailySummary, Dispatcher, Reconciler};
use taskpulse_gateway::AppState;
use taskpulse_mail::SmtpMailer;
use taskpulse_scheduler::{JobRegistry, Schedule};
use taskpulse_store::MirrorDb;

#[derive(Parser)]
#[command(name = "taskpulse", version, about = "Board mirror, scoring, and notifications")]
struct Cli {
    /// Path to config.toml (default: ~/.taskpulse/config.toml)
    #[arg(short, long)]
    config: Option<String>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the scheduler and the webhook gateway.
    Serve,
    /// Run one reconciliation pass and exit.
    Sync,
    /// Run every notification scan once and exit.
    Scan,
    /// Send the daily summary (yesterday by default).
    Summary {
        /// Day to summarize, YYYY-MM-DD
        #[arg(long)]
        date: Option<chrono::NaiveDate>,
    },
    /// Register the delivery address for a board member.
    MemberEmail { member_id: String, email: String },
    /// Set (or clear, when omitted) a task's manual score.
    Override {
        task_id: i64,
        score: Option<f64>,
    },
    /// List board members with their running scores.
    Members,
    /// Create or update a card on the board.
    Push {
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        desc: String,
        /// Deadline, RFC 3339
        #[arg(long)]
        due: Option<chrono::DateTime<chrono::Utc>>,
        /// Assignee member id
        #[arg(long)]
        member: Option<String>,
        /// Existing card to update instead of creating one
        #[arg(long)]
        card_id: Option<String>,
        /// Put the card on the done list
        #[arg(long)]
        done: bool,
    },
    /// Delete a card from the board and the mirror.
    Remove { card_id: String },
}

/// Everything wired together from one config.
struct App {
    config: PulseConfig,
    store: Arc<MirrorDb>,
    board: Arc<BoardClient>,
    reconciler: Arc<Reconciler>,
    dispatcher: Arc<Dispatcher>,
    summary: Arc<DailySummary>,
}

impl App {
    fn build(config: PulseConfig) -> Result<Self> {
        let store = Arc::new(
            MirrorDb::open(&config.store.resolved_path()).context("open mirror database")?,
        );
        let board = Arc::new(BoardClient::new(config.board.clone()).context("board client")?);
        let composer = Arc::new(
            OpenAiCompatibleComposer::new(config.llm.clone()).context("composer client")?,
        );
        let mailer = Arc::new(SmtpMailer::new(config.mail.clone()));
        let activity =
            Arc::new(ActivityClient::new(config.activity.clone()).context("activity client")?);

        let reconciler = Arc::new(Reconciler::new(
            board.clone(),
            store.clone(),
            &config.board.done_list,
        ));
        let dispatcher = Arc::new(Dispatcher::new(
            store.clone(),
            composer.clone(),
            mailer.clone(),
            &config.llm.persona,
            config.notify.clone(),
        ));
        let summary = Arc::new(DailySummary::new(
            activity,
            composer,
            mailer,
            &config.llm.persona,
            config.notify.clone(),
        ));

        Ok(Self {
            config,
            store,
            board,
            reconciler,
            dispatcher,
            summary,
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "taskpulse=debug,tower_http=debug"
    } else {
        "taskpulse=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    let config = match &cli.config {
        Some(path) => PulseConfig::load_from(std::path::Path::new(path))?,
        None => PulseConfig::load()?,
    };
    let app = App::build(config)?;

    match cli.command {
        Command::Serve => serve(app).await,
        Command::Sync => {
            let outcome = app.reconciler.run().await?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
            Ok(())
        }
        Command::Scan => {
            let outcome = app.dispatcher.run_all().await?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
            Ok(())
        }
        Command::Summary { date } => {
            match date {
                Some(d) => app.summary.run_for(d).await?,
                None => app.summary.run().await?,
            }
            Ok(())
        }
        Command::MemberEmail { member_id, email } => {
            app.store.set_member_email(&member_id, &email)?;
            println!("Email registered for member {member_id}");
            Ok(())
        }
        Command::Override { task_id, score } => {
            let folded = app.reconciler.apply_score_override(task_id, score)?;
            println!(
                "Override {} for task {task_id}{}",
                score.map(|s| s.to_string()).unwrap_or_else(|| "cleared".into()),
                if folded { ", score credited" } else { "" }
            );
            Ok(())
        }
        Command::Members => {
            let profiles = app.board.board_members().await?;
            let local = app.store.list_members()?;
            for profile in profiles {
                let scored = local.iter().find(|m| m.member_id == profile.id);
                println!(
                    "{} ({}): score {}, {} task(s) counted",
                    profile.full_name,
                    profile.username,
                    scored
                        .and_then(|m| m.historical_score)
                        .map(|s| s.to_string())
                        .unwrap_or_else(|| "n/a".into()),
                    scored.map(|m| m.total_tasks_counted).unwrap_or(0),
                );
            }
            Ok(())
        }
        Command::Push {
            title,
            desc,
            due,
            member,
            card_id,
            done,
        } => {
            let draft = taskpulse_board::CardDraft {
                card_id,
                name: title,
                desc,
                due,
                member_ids: member.into_iter().collect(),
                completed: done,
            };
            let task = app.reconciler.push_task(&draft).await?;
            println!("{}", serde_json::to_string_pretty(&task)?);
            Ok(())
        }
        Command::Remove { card_id } => {
            if app.reconciler.remove_card(&card_id).await? {
                println!("Card {card_id} deleted");
            } else {
                println!("Board refused to delete card {card_id}");
            }
            Ok(())
        }
    }
}

/// Register the background jobs, then run the gateway until shutdown.
async fn serve(app: App) -> Result<()> {
    let registry = JobRegistry::new();
    let schedule = app.config.schedule.clone();

    let reconciler = app.reconciler.clone();
    registry.register(
        "reconcile",
        Schedule::Interval {
            every_secs: schedule.reconcile_secs,
        },
        move || {
            let reconciler = reconciler.clone();
            async move {
                if let Err(e) = reconciler.run().await {
                    tracing::error!("Reconcile pass failed: {e}");
                }
            }
        },
    );

    let dispatcher = app.dispatcher.clone();
    registry.register(
        "notify-scan",
        Schedule::Interval {
            every_secs: schedule.notify_secs,
        },
        move || {
            let dispatcher = dispatcher.clone();
            async move {
                for result in [
                    dispatcher.scan_assignments().await,
                    dispatcher.scan_overdue().await,
                    dispatcher.scan_completions().await,
                ] {
                    if let Err(e) = result {
                        tracing::error!("Notification scan failed: {e}");
                    }
                }
            }
        },
    );

    let dispatcher = app.dispatcher.clone();
    registry.register(
        "escalation-scan",
        Schedule::Interval {
            every_secs: schedule.escalation_secs,
        },
        move || {
            let dispatcher = dispatcher.clone();
            async move {
                if let Err(e) = dispatcher.scan_escalations().await {
                    tracing::error!("Escalation scan failed: {e}");
                }
            }
        },
    );

    let summary = app.summary.clone();
    registry.register(
        "daily-summary",
        Schedule::Daily {
            cron: schedule.summary_cron.clone(),
        },
        move || {
            let summary = summary.clone();
            async move {
                if let Err(e) = summary.run().await {
                    tracing::error!("Daily summary failed: {e}");
                }
            }
        },
    );

    let state = AppState {
        config: app.config.gateway.clone(),
        board: app.board.clone(),
        store: app.store.clone(),
        reconciler: app.reconciler.clone(),
        dispatcher: app.dispatcher.clone(),
    };
    taskpulse_gateway::serve(state).await?;
    Ok(())
}
