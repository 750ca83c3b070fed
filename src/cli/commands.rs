use clap::Subcommand;

use super::record::RecordArgs;
use super::replay::ReplayArgs;
use super::resolve::ResolveArgs;
use super::scenarios::ScenariosArgs;
use super::synthesize::SynthesizeArgs;

#[derive(Subcommand, Clone)]
pub enum Commands {
    /// Record an interaction script against a page snapshot and save it
    Record(RecordArgs),

    /// Replay a stored scenario or a scenario file against a page snapshot
    Replay(ReplayArgs),

    /// Show the locator that would be recorded for an element
    Synthesize(SynthesizeArgs),

    /// Run the resolver fallback chain for a stored locator
    Resolve(ResolveArgs),

    /// Manage saved scenarios
    Scenarios(ScenariosArgs),
}
