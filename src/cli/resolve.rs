use std::path::PathBuf;

use action_locator::{ElementResolver, ResolveRequest};
use anyhow::Result;
use clap::Args;
use domreplay_cli::page::{describe_node, load_page};
use serde::Serialize;

use crate::cli::context::CliContext;

#[derive(Args, Clone, Debug)]
pub struct ResolveArgs {
    /// Page snapshot (JSON)
    #[arg(short, long, value_name = "SNAPSHOT")]
    pub page: PathBuf,

    /// Stored locator
    #[arg(short, long)]
    pub locator: String,

    /// Text captured with the locator
    #[arg(long)]
    pub hint: Option<String>,

    /// Tag name captured with the locator
    #[arg(long)]
    pub tag: Option<String>,
}

#[derive(Serialize)]
struct ResolveOutput {
    strategy: String,
    node: usize,
    element: String,
}

pub async fn cmd_resolve(args: ResolveArgs, ctx: &CliContext) -> Result<()> {
    let doc = load_page(&args.page).await?;
    let request = ResolveRequest::new(&args.locator)
        .with_hint(args.hint.as_deref())
        .with_tag(args.tag.as_deref());

    let result = ctx.config().resolver().try_resolve(&doc, &request)?;
    let output = ResolveOutput {
        strategy: result.strategy.name().to_string(),
        node: result.node.0,
        element: describe_node(&doc, result.node),
    };
    ctx.output()
        .emit(&output, || format!("{} (via {})", output.element, output.strategy))
}
