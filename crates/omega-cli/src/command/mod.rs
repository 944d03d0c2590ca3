use clap::{Parser, Subcommand};

use self::{config::ConfigArg, rollout::RolloutArg, train::TrainArg};

mod config;
mod rollout;
mod train;

#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct CommandArgs {
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Debug, Clone, Subcommand)]
enum Mode {
    /// Write the default run configuration as JSON
    Config(#[clap(flatten)] ConfigArg),
    /// Train a policy-gradient agent on the dungeon
    Train(#[clap(flatten)] TrainArg),
    /// Play the dungeon with a random agent or a trained model, without training
    Rollout(#[clap(flatten)] RolloutArg),
}

pub fn run() -> anyhow::Result<()> {
    let args = CommandArgs::parse();
    match args.mode {
        Mode::Config(arg) => config::run(&arg)?,
        Mode::Train(arg) => train::run(&arg)?,
        Mode::Rollout(arg) => rollout::run(&arg)?,
    }
    Ok(())
}
