use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};
use domreplay_core_types::ScenarioId;
use domreplay_scenario_store::{Action, Scenario, ScenarioEdit};
use serde::Serialize;
use tokio::fs;
use tracing::info;

use crate::cli::context::CliContext;

#[derive(Args, Clone, Debug)]
pub struct ScenariosArgs {
    #[command(subcommand)]
    pub action: ScenariosAction,
}

/// Action positions are 1-based, as listed by `show`
#[derive(Subcommand, Clone, Debug)]
pub enum ScenariosAction {
    /// List saved scenarios
    List,

    /// Show one scenario with its actions
    Show { id: String },

    /// Rename a scenario
    Rename { id: String, name: String },

    /// Change the wait before one action
    SetDelay {
        id: String,
        position: usize,
        /// New delay in milliseconds
        millis: u64,
    },

    /// Remove one action
    RemoveAction { id: String, position: usize },

    /// Copy a scenario under a new id
    Duplicate { id: String },

    /// Delete a scenario
    Delete { id: String },

    /// Write every scenario as a JSON array (stdout when no file is given)
    Export { file: Option<PathBuf> },

    /// Append scenarios from a JSON array under fresh ids
    Import { file: PathBuf },
}

#[derive(Serialize)]
struct ScenarioSummary<'a> {
    id: &'a ScenarioId,
    name: &'a str,
    actions: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<&'a str>,
    created_at: String,
}

impl<'a> From<&'a Scenario> for ScenarioSummary<'a> {
    fn from(scenario: &'a Scenario) -> Self {
        Self {
            id: &scenario.id,
            name: &scenario.name,
            actions: scenario.actions.len(),
            url: scenario.url.as_deref(),
            created_at: scenario.created_at.to_rfc3339(),
        }
    }
}

pub async fn cmd_scenarios(args: ScenariosArgs, ctx: &CliContext) -> Result<()> {
    let catalog = ctx.catalog();
    let output = ctx.output();

    match args.action {
        ScenariosAction::List => {
            let all = catalog.list().await?;
            let summaries: Vec<ScenarioSummary> = all.iter().map(ScenarioSummary::from).collect();
            output.emit(&summaries, || {
                if all.is_empty() {
                    return "No scenarios saved".to_string();
                }
                all.iter()
                    .map(|s| {
                        format!(
                            "{}  {}  ({} actions, {})",
                            s.id,
                            s.name,
                            s.actions.len(),
                            s.created_at.format("%Y-%m-%d %H:%M")
                        )
                    })
                    .collect::<Vec<_>>()
                    .join("\n")
            })?;
        }
        ScenariosAction::Show { id } => {
            let scenario = catalog.get(&parse_id(&id)?).await?;
            output.emit(&scenario, || format_scenario(&scenario))?;
        }
        ScenariosAction::Rename { id, name } => {
            let scenario = catalog
                .edit(&parse_id(&id)?, ScenarioEdit::rename(name))
                .await?;
            output.emit(&scenario, || {
                format!("Renamed {} to \"{}\"", scenario.id, scenario.name)
            })?;
        }
        ScenariosAction::SetDelay {
            id,
            position,
            millis,
        } => {
            let edit = ScenarioEdit::default().set_delay(to_index(position)?, millis);
            let scenario = catalog.edit(&parse_id(&id)?, edit).await?;
            output.emit(&scenario, || format_scenario(&scenario))?;
        }
        ScenariosAction::RemoveAction { id, position } => {
            let edit = ScenarioEdit::default().remove(to_index(position)?);
            let scenario = catalog.edit(&parse_id(&id)?, edit).await?;
            output.emit(&scenario, || format_scenario(&scenario))?;
        }
        ScenariosAction::Duplicate { id } => {
            let copy = catalog.duplicate(&parse_id(&id)?).await?;
            output.emit(&copy, || format!("Created {} \"{}\"", copy.id, copy.name))?;
        }
        ScenariosAction::Delete { id } => {
            let id = parse_id(&id)?;
            catalog.delete(&id).await?;
            output.emit(&serde_json::json!({ "deleted": id.as_str() }), || format!("Deleted {}", id))?;
        }
        ScenariosAction::Export { file } => {
            let json = catalog.export_json().await?;
            match file {
                Some(path) => {
                    fs::write(&path, json)
                        .await
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    info!("Exported scenarios to {}", path.display());
                }
                None => println!("{}", json),
            }
        }
        ScenariosAction::Import { file } => {
            let raw = fs::read_to_string(&file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let imported = catalog.import_json(&raw).await?;
            let summaries: Vec<ScenarioSummary> =
                imported.iter().map(ScenarioSummary::from).collect();
            output.emit(&summaries, || format!("Imported {} scenarios", imported.len()))?;
        }
    }
    Ok(())
}

fn parse_id(raw: &str) -> Result<ScenarioId> {
    Ok(ScenarioId::parse(raw)?)
}

fn to_index(position: usize) -> Result<usize> {
    if position == 0 {
        bail!("Action positions start at 1");
    }
    Ok(position - 1)
}

fn format_scenario(scenario: &Scenario) -> String {
    let mut out = format!("{}  {}", scenario.id, scenario.name);
    if let Some(url) = &scenario.url {
        out.push_str(&format!("\n  recorded on {}", url));
    }
    out.push_str(&format!(
        "\n  {} actions, {} ms of recorded waits",
        scenario.actions.len(),
        scenario.total_delay_millis()
    ));
    out.push('\n');
    out.push_str(&format_actions(&scenario.actions));
    out
}

/// Numbered action listing with the wait before each action
pub fn format_actions(actions: &[Action]) -> String {
    actions
        .iter()
        .enumerate()
        .map(|(i, action)| {
            let wait = format!("+{}ms", action.delay_millis);
            format!("  {:>3}. {:<8} {}", i + 1, wait, action.describe())
        })
        .collect::<Vec<_>>()
        .join("\n")
}
