use std::path::Path;

use anyhow::Context;
use chrono::{DateTime, Utc};
use omega_agent::{PolicyGradientAgent, PolicyGradientConfig, PolicyParams};
use omega_env::dungeon::{DungeonAction, DungeonConfig, DungeonObservation};
use omega_stats::StatsSummary;
use serde::{Deserialize, Serialize};

use crate::util;

pub type DungeonPolicy = PolicyGradientAgent<DungeonObservation, DungeonAction>;

/// A trained policy as saved by `omega train`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PolicyModel {
    pub name: String,
    pub trained_at: DateTime<Utc>,
    pub training_steps: usize,
    pub seed: u64,
    pub dungeon: DungeonConfig,
    pub agent: PolicyGradientConfig,
    pub summary: StatsSummary,
    pub params: PolicyParams,
}

impl PolicyModel {
    pub fn open<P>(path: P) -> anyhow::Result<Self>
    where
        P: AsRef<Path>,
    {
        util::read_json_file("policy model", path)
    }

    pub fn to_agent(&self) -> anyhow::Result<DungeonPolicy> {
        DungeonPolicy::from_params(self.agent.clone(), self.params.clone())
            .with_context(|| format!("Model {} does not fit the dungeon agent", self.name))
    }
}
