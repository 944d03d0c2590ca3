use std::path::PathBuf;

use anyhow::{Context, ensure};
use omega_agent::{Agent, Key, RandomAgent};
use omega_env::dungeon::{DungeonAction, DungeonObservation};
use omega_stats::{RunStats, StatsSummary};
use omega_training::{NoopNight, Trainer};
use tracing::info;

use super::train::log_progress;
use crate::{
    model::{policy_model::PolicyModel, run_config::RunConfig},
    util::Output,
};

#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct RolloutArg {
    /// Run configuration file (see `omega config`)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Trained model to play; a random agent plays when omitted
    #[arg(long)]
    model: Option<PathBuf>,
    /// Number of collection horizons to play, overriding the configuration
    #[arg(long)]
    training_steps: Option<usize>,
    /// Base seed, overriding the configuration
    #[arg(long)]
    seed: Option<u64>,
    /// Output file path for the statistics summary
    #[arg(long)]
    output: Option<PathBuf>,
}

pub(crate) fn run(arg: &RolloutArg) -> anyhow::Result<()> {
    let RolloutArg {
        config,
        model,
        training_steps,
        seed,
        output,
    } = arg;

    let mut config = RunConfig::load(config.as_deref())?;
    if let Some(training_steps) = training_steps {
        config.training_steps = *training_steps;
    }
    if let Some(seed) = seed {
        config.seed = Some(*seed);
    }

    let summary = match model {
        Some(path) => {
            let model = PolicyModel::open(path)?;
            // the policy only understands observations of the dungeon it was trained on
            config.dungeon = model.dungeon.clone();
            config.validate()?;
            ensure!(
                model.params.feature_len == config.dungeon.observation_len(),
                "Model {} expects {} features, the dungeon produces {}",
                model.name,
                model.params.feature_len,
                config.dungeon.observation_len()
            );
            info!(
                name = %model.name,
                trained_at = %model.trained_at,
                "playing trained model"
            );
            evaluate(model.to_agent()?, &config)?
        }
        None => {
            config.validate()?;
            info!("playing random agent");
            evaluate(RandomAgent::new(), &config)?
        }
    };

    Output::save_json(&summary, output.clone())
}

fn evaluate<A>(agent: A, config: &RunConfig) -> anyhow::Result<StatsSummary>
where
    A: Agent<Observation = DungeonObservation, Action = DungeonAction>,
{
    let seed = config.seed_or_random();
    info!(seed, steps = config.training_steps, "starting rollout");
    let mut trainer = Trainer::new(
        agent,
        config.dungeon_factory(seed),
        &config.trainer,
        NoopNight,
        Key::new(seed),
    )
    .context("Failed to start the rollout")?;

    let mut stats = RunStats::new(config.stats_window);
    for step in 1..=config.training_steps {
        trainer
            .run_training_step(Some(&mut stats))
            .with_context(|| format!("Rollout step {step} failed"))?;
        if step % config.log_every == 0 || step == config.training_steps {
            log_progress(step, &stats.summary());
        }
    }
    Ok(stats.summary())
}

#[cfg(test)]
mod tests {
    use omega_training::TrainerConfig;

    use super::*;

    fn small_config() -> RunConfig {
        RunConfig {
            trainer: TrainerConfig {
                num_envs: 3,
                num_collection_steps: 40,
                num_workers: 1,
                allow_to_act_in_terminal_state_once: true,
            },
            training_steps: 2,
            seed: Some(5),
            ..RunConfig::default()
        }
    }

    #[test]
    fn test_random_rollout_collects_every_step() {
        let summary = evaluate(RandomAgent::new(), &small_config()).unwrap();
        assert_eq!(summary.total_steps, 3 * 40 * 2);
        assert!(summary.rolling.is_empty());
    }

    #[test]
    fn test_rollout_is_reproducible() {
        let a = evaluate(RandomAgent::new(), &small_config()).unwrap();
        let b = evaluate(RandomAgent::new(), &small_config()).unwrap();
        assert_eq!(a, b);
    }
}
