use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use domreplay_cli::page::{describe_node, load_page, query_one};
use serde::Serialize;

use crate::cli::context::CliContext;

#[derive(Args, Clone, Debug)]
pub struct SynthesizeArgs {
    /// Page snapshot (JSON)
    #[arg(short, long, value_name = "SNAPSHOT")]
    pub page: PathBuf,

    /// CSS selector picking the element
    #[arg(short, long)]
    pub target: String,
}

#[derive(Serialize)]
struct SynthesisOutput {
    element: String,
    rule: String,
    locator: String,
}

pub async fn cmd_synthesize(args: SynthesizeArgs, ctx: &CliContext) -> Result<()> {
    let doc = load_page(&args.page).await?;
    let node = query_one(&doc, &args.target)?;
    let (rule, locator) = ctx.config().synthesizer().try_synthesize(&doc, node)?;

    let output = SynthesisOutput {
        element: describe_node(&doc, node),
        rule: rule.name().to_string(),
        locator: locator.to_string(),
    };
    ctx.output().emit(&output, || output.locator.clone())
}
