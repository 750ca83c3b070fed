use std::path::PathBuf;

use action_recorder::{parse_script, ScriptRecorder};
use anyhow::{Context, Result};
use chrono::Utc;
use clap::Args;
use domreplay_cli::page::load_page;
use tokio::fs;
use tracing::info;

use super::scenarios::format_actions;
use crate::cli::context::CliContext;

#[derive(Args, Clone, Debug)]
pub struct RecordArgs {
    /// Scenario name
    #[arg(short, long)]
    pub name: String,

    /// Page snapshot (JSON) the script runs against
    #[arg(short, long, value_name = "SNAPSHOT")]
    pub page: PathBuf,

    /// Interaction script (JSON array of timed steps)
    #[arg(short, long, value_name = "SCRIPT")]
    pub events: PathBuf,

    /// Page URL stored with the scenario; defaults to the snapshot URL
    #[arg(short, long)]
    pub url: Option<String>,

    /// Print the recorded actions without saving them
    #[arg(long)]
    pub dry_run: bool,
}

pub async fn cmd_record(args: RecordArgs, ctx: &CliContext) -> Result<()> {
    let mut doc = load_page(&args.page).await?;
    let raw = fs::read_to_string(&args.events)
        .await
        .with_context(|| format!("Failed to read script {}", args.events.display()))?;
    let steps = parse_script(&raw)?;

    let recorder = ScriptRecorder::new(ctx.config().synthesizer(), Utc::now().timestamp_millis());
    let actions = recorder
        .run(&mut doc, &steps)
        .context("Recording failed")?;
    info!(
        steps = steps.len(),
        actions = actions.len(),
        "Recording finished"
    );

    if args.dry_run {
        return ctx.output().emit(&actions, || format_actions(&actions));
    }

    let url = args.url.or_else(|| doc.url().map(str::to_string));
    let scenario = ctx.catalog().save(&args.name, actions, url).await?;
    ctx.output().emit(&scenario, || {
        format!(
            "Saved scenario {} \"{}\" ({} actions)\n{}",
            scenario.id,
            scenario.name,
            scenario.actions.len(),
            format_actions(&scenario.actions)
        )
    })
}
