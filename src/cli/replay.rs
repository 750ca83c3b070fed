use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use action_flow::{
    join_playback, FailureStrategy, OutcomeStatus, PlaybackEngine, PlaybackReport,
};
use anyhow::{bail, Context, Result};
use clap::Args;
use dom_snapshot::SharedDocument;
use domreplay_cli::page::load_page;
use domreplay_core_types::ScenarioId;
use domreplay_scenario_store::{Action, Scenario};
use serde::Deserialize;
use tokio::fs;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cli::context::CliContext;

/// Base backoff for `--retries`
const RETRY_BACKOFF_MS: u64 = 500;

#[derive(Args, Clone, Debug)]
pub struct ReplayArgs {
    /// Scenario id, or a scenario / action list JSON file
    pub scenario: String,

    /// Page snapshot (JSON) to replay against
    #[arg(short, long, value_name = "SNAPSHOT")]
    pub page: PathBuf,

    /// Playback speed multiplier
    #[arg(long)]
    pub speed: Option<f64>,

    /// Stop on first error
    #[arg(long)]
    pub fail_fast: bool,

    /// Retry a failed action up to N more times
    #[arg(long, value_name = "N", conflicts_with = "fail_fast")]
    pub retries: Option<u32>,

    /// Fail an attempt whose effect pauses run past this (e.g. "2s", "750ms")
    #[arg(long, value_name = "DURATION", value_parser = humantime::parse_duration)]
    pub action_timeout: Option<Duration>,

    /// Disable the transient element highlight
    #[arg(long)]
    pub no_highlight: bool,

    /// Replay even if the page host differs from the recording host
    #[arg(long)]
    pub force: bool,

    /// Write the page state after playback to this snapshot file
    #[arg(long, value_name = "FILE")]
    pub save_page: Option<PathBuf>,
}

/// Scenario or bare action list read from a file
#[derive(Deserialize)]
#[serde(untagged)]
enum ScenarioFile {
    Scenario {
        #[serde(default)]
        name: Option<String>,
        actions: Vec<Action>,
        #[serde(default)]
        url: Option<String>,
    },
    Actions(Vec<Action>),
}

pub async fn cmd_replay(args: ReplayArgs, ctx: &CliContext) -> Result<()> {
    let scenario = load_scenario(&args.scenario, ctx).await?;
    let doc = load_page(&args.page).await?;

    if let Some(page_url) = doc.url() {
        if !scenario.matches_host(page_url) {
            let recorded = scenario.host().unwrap_or_default();
            if args.force {
                warn!(recorded = %recorded, page = %page_url, "Replaying on a different host");
            } else {
                bail!(
                    "Scenario was recorded on {} but the page is {}; pass --force to replay anyway",
                    recorded,
                    page_url
                );
            }
        }
    }

    let mut options = ctx.config().playback.clone();
    if let Some(speed) = args.speed {
        options.speed = speed;
    }
    if args.no_highlight {
        options.highlight = false;
    }
    if let Some(timeout) = args.action_timeout {
        options.action_timeout_ms = Some(timeout.as_millis() as u64);
    }
    if args.fail_fast {
        options.failure_strategy = FailureStrategy::Abort;
    } else if let Some(retries) = args.retries {
        options.failure_strategy = FailureStrategy::Retry {
            max_attempts: retries.saturating_add(1),
            backoff_ms: RETRY_BACKOFF_MS,
        };
    }

    let doc = SharedDocument::new(doc);
    let engine = Arc::new(
        PlaybackEngine::new(doc.clone(), options)
            .with_resolver(Arc::new(ctx.config().resolver())),
    );

    info!(
        scenario = %scenario.id,
        name = %scenario.name,
        actions = scenario.actions.len(),
        "Replaying scenario"
    );
    let token = CancellationToken::new();
    let handle = engine.spawn(scenario.actions.clone(), token.clone())?;
    let cancel = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling playback");
            cancel.cancel();
        }
    });
    let report = join_playback(handle).await?;

    if let Some(path) = &args.save_page {
        let json = doc.read().to_snapshot()?.to_json()?;
        fs::write(path, json)
            .await
            .with_context(|| format!("Failed to write page snapshot {}", path.display()))?;
        info!("Saved page state to {}", path.display());
    }

    ctx.output()
        .emit(&report, || format_report(&scenario, &report))?;

    if report.aborted {
        bail!(
            "Playback aborted after {} of {} actions",
            report.outcomes.len() - report.count(OutcomeStatus::Skipped),
            report.outcomes.len()
        );
    }
    Ok(())
}

async fn load_scenario(source: &str, ctx: &CliContext) -> Result<Scenario> {
    let path = Path::new(source);
    if path.is_file() {
        let raw = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read scenario file {}", path.display()))?;
        let parsed: ScenarioFile = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse scenario file {}", path.display()))?;
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| source.to_string());
        return Ok(match parsed {
            ScenarioFile::Scenario { name, actions, url } => {
                Scenario::new(name.unwrap_or(stem), actions, url)
            }
            ScenarioFile::Actions(actions) => Scenario::new(stem, actions, None),
        });
    }

    let id = ScenarioId::parse(source)
        .with_context(|| format!("{:?} is neither a file nor a scenario id", source))?;
    Ok(ctx.catalog().get(&id).await?)
}

fn status_label(status: OutcomeStatus) -> &'static str {
    match status {
        OutcomeStatus::Applied => "applied",
        OutcomeStatus::NoOp => "no-op",
        OutcomeStatus::NotFound => "not found",
        OutcomeStatus::Failed => "failed",
        OutcomeStatus::Cancelled => "cancelled",
        OutcomeStatus::Skipped => "skipped",
    }
}

fn format_report(scenario: &Scenario, report: &PlaybackReport) -> String {
    let mut out = format!(
        "Replayed \"{}\": {} actions, {} succeeded, {} failed in {}",
        scenario.name,
        report.outcomes.len(),
        report.success_count(),
        report.failure_count(),
        humantime::format_duration(Duration::from_millis(report.latency_ms))
    );
    for outcome in &report.outcomes {
        out.push_str(&format!(
            "\n  {:>3}. {:<8} {:<10} {}",
            outcome.index + 1,
            outcome.kind,
            status_label(outcome.status),
            outcome.locator
        ));
        if let Some(strategy) = outcome.strategy {
            out.push_str(&format!(" [{}]", strategy));
        }
        if outcome.attempts > 1 {
            out.push_str(&format!(" ({} attempts)", outcome.attempts));
        }
        if let Some(error) = &outcome.error {
            out.push_str(&format!("\n       {}", error));
        }
    }
    out
}
