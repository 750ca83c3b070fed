use super::env::CliArgs;
use super::record::cmd_record;
use super::replay::cmd_replay;
use super::resolve::cmd_resolve;
use super::scenarios::cmd_scenarios;
use super::synthesize::cmd_synthesize;
use crate::cli::commands::Commands;
use crate::cli::context::CliContext;
use anyhow::Result;

pub async fn dispatch(cli: &CliArgs, ctx: &CliContext) -> Result<()> {
    match cli.command.clone() {
        Commands::Record(args) => cmd_record(args, ctx).await,
        Commands::Replay(args) => cmd_replay(args, ctx).await,
        Commands::Synthesize(args) => cmd_synthesize(args, ctx).await,
        Commands::Resolve(args) => cmd_resolve(args, ctx).await,
        Commands::Scenarios(args) => cmd_scenarios(args, ctx).await,
    }
}
