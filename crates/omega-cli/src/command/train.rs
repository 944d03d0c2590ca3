use std::path::PathBuf;

use anyhow::Context;
use chrono::Utc;
use omega_agent::Key;
use omega_stats::{RunStats, StatsSummary};
use omega_training::{OnPolicyNight, Trainer};
use tracing::info;

use crate::{
    model::{
        policy_model::{DungeonPolicy, PolicyModel},
        run_config::RunConfig,
    },
    util::Output,
};

const MODEL_NAME: &str = "dungeon-policy-gradient";

#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct TrainArg {
    /// Run configuration file (see `omega config`)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Number of training steps, overriding the configuration
    #[arg(long)]
    training_steps: Option<usize>,
    /// Output file path for the trained model
    #[arg(long)]
    output: Option<PathBuf>,
    /// Base seed, overriding the configuration
    #[arg(long)]
    seed: Option<u64>,
}

pub(crate) fn run(arg: &TrainArg) -> anyhow::Result<()> {
    let TrainArg {
        config,
        training_steps,
        output,
        seed,
    } = arg;

    let mut config = RunConfig::load(config.as_deref())?;
    if let Some(training_steps) = training_steps {
        config.training_steps = *training_steps;
    }
    if let Some(seed) = seed {
        config.seed = Some(*seed);
    }
    config.validate()?;

    let seed = config.seed_or_random();
    let (agent_key, trainer_key) = Key::new(seed).split();
    info!(seed, training_steps = config.training_steps, "starting training");

    let agent = DungeonPolicy::new(
        config.agent.clone(),
        config.dungeon.observation_len(),
        agent_key,
    )
    .context("Failed to create the policy agent")?;
    let mut trainer = Trainer::new(
        agent,
        config.dungeon_factory(seed),
        &config.trainer,
        OnPolicyNight::new(),
        trainer_key,
    )
    .context("Failed to start the trainer")?;

    let mut stats = RunStats::new(config.stats_window);
    for step in 1..=config.training_steps {
        trainer
            .run_training_step(Some(&mut stats))
            .with_context(|| format!("Training step {step} failed"))?;
        if step % config.log_every == 0 || step == config.training_steps {
            log_progress(step, &stats.summary());
        }
    }

    let model = PolicyModel {
        name: MODEL_NAME.to_owned(),
        trained_at: Utc::now(),
        training_steps: config.training_steps,
        seed,
        dungeon: config.dungeon.clone(),
        agent: config.agent.clone(),
        summary: stats.summary(),
        params: trainer.into_agent().into_params(),
    };
    Output::save_json(&model, output.clone())?;

    eprintln!();
    eprintln!("Model saved successfully");
    if let Some(path) = output {
        eprintln!("  Path: {}", path.display());
    }
    eprintln!("  Name: {}", model.name);
    eprintln!("  Trained at: {}", model.trained_at);
    eprintln!("  Training steps: {}", model.training_steps);
    eprintln!("  Episodes: {}", model.summary.completed_episodes);
    if let Some(returns) = &model.summary.episode_return {
        eprintln!("  Recent return: {:.3} ± {:.3}", returns.mean, returns.std_dev);
    }

    Ok(())
}

pub(crate) fn log_progress(step: usize, summary: &StatsSummary) {
    info!(
        step,
        episodes = summary.completed_episodes,
        mean_return = ?summary.episode_return.as_ref().map(|s| s.mean),
        mean_length = ?summary.episode_length.as_ref().map(|s| s.mean),
        loss = ?summary.rolling.get("loss"),
        entropy = ?summary.rolling.get("entropy"),
        "training progress"
    );
}
