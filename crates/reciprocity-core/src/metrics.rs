use crate::agent::Agent;
use crate::strategy::Reputation;
use crate::tribe::Tribe;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct GenerationRecord {
    /// 1-based generation number.
    pub generation: usize,
    /// Total payout summed over all tribes for this generation.
    pub total_payout: i64,
}

fn default_schema_version() -> u32 {
    1
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunSummary {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub generations: usize,
    pub records: Vec<GenerationRecord>,
}

impl RunSummary {
    /// Per-generation totals in loop order.
    pub fn total_payouts(&self) -> Vec<i64> {
        self.records.iter().map(|r| r.total_payout).collect()
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct AgentSnapshot {
    /// 4-bit strategy code, GOOD-GOOD slot most significant.
    pub strategy_code: u8,
    pub reputation: Reputation,
    pub payout: i64,
    pub games_played: u32,
}

impl From<&Agent> for AgentSnapshot {
    fn from(agent: &Agent) -> Self {
        Self {
            strategy_code: agent.strategy().code(),
            reputation: agent.reputation(),
            payout: agent.payout(),
            games_played: agent.games_played(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TribeSnapshot {
    pub index: usize,
    pub total_payout: i64,
    pub agents: Vec<AgentSnapshot>,
}

impl From<&Tribe> for TribeSnapshot {
    fn from(tribe: &Tribe) -> Self {
        Self {
            index: tribe.index(),
            total_payout: tribe.total_payout(),
            agents: tribe.agents().iter().map(AgentSnapshot::from).collect(),
        }
    }
}

/// Per-agent strategy and reputation state for external reporting.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PopulationSnapshot {
    pub total_payout: i64,
    pub tribes: Vec<TribeSnapshot>,
}
