use std::path::PathBuf;

use crate::{model::run_config::RunConfig, util::Output};

#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct ConfigArg {
    /// Output file path
    #[arg(long)]
    output: Option<PathBuf>,
}

pub(crate) fn run(arg: &ConfigArg) -> anyhow::Result<()> {
    Output::save_json(&RunConfig::default(), arg.output.clone())
}
