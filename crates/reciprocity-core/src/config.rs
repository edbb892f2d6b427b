use serde::{Deserialize, Serialize};

/// What tribe reproduction does when the tribe's summed payout is not positive.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SelectionFallback {
    /// Fail the generation with a selection error.
    #[default]
    Reject,
    /// Pick parents uniformly at random among the tribe's agents.
    Uniform,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SimConfig {
    /// Deterministic seed; tribe `i` draws from a stream derived from `seed` and `i`.
    pub seed: u64,
    /// Number of isolated tribes.
    pub num_tribes: usize,
    /// Number of agents in every tribe.
    pub agents_per_tribe: usize,
    /// Cost a donor pays to donate.
    pub cost: i64,
    /// Benefit the recipient receives from a donation.
    pub benefit: i64,
    /// Number of generations a full run plays.
    pub generations: usize,
    /// Probability that a donor's decision is inverted during play.
    pub execution_error_rate: f64,
    /// Per-slot probability that an inherited strategy bit flips at reproduction.
    pub strategy_mutation_rate: f64,
    /// Reproduction policy for tribes whose summed payout is not positive.
    pub selection_fallback: SelectionFallback,
    /// Play tribes on a worker pool instead of one after another.
    pub parallel: bool,
    /// Dedicated worker pool size (0 = rayon's global pool).
    pub worker_threads: usize,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            num_tribes: 64,
            agents_per_tribe: 64,
            cost: 1,
            benefit: 3,
            generations: 10,
            execution_error_rate: 0.0,
            strategy_mutation_rate: 0.0,
            selection_fallback: SelectionFallback::Reject,
            parallel: true,
            worker_threads: 0,
        }
    }
}

macro_rules! define_sim_config_error {
    (
        $(
            $variant:ident $( { $($field:ident : $type:ty),* } )? => $fmt:literal $(, $arg:expr)*
        );* $(;)?
    ) => {
        #[derive(Debug, Clone, PartialEq)]
        pub enum SimConfigError {
            $(
                $variant $( { $($field : $type),* } )?,
            )*
        }

        impl std::fmt::Display for SimConfigError {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(
                        Self::$variant $( { $($field),* } )? => write!(f, $fmt $(, $arg)*),
                    )*
                }
            }
        }
    };
}

define_sim_config_error! {
    InvalidNumTribes => "num_tribes must be greater than 0";
    InvalidAgentsPerTribe => "agents_per_tribe must be greater than 0";
    TooFewAgentsForSelection { min: usize, actual: usize } => "agents_per_tribe ({actual}) must be at least {min} when selection_fallback is reject";
    AgentCountOverflow => "Total agent count overflow";
    TooManyAgents { max: usize, actual: usize } => "Too many agents: {} > max {}", actual, max;
    NegativeCost => "cost must be non-negative";
    NegativeBenefit => "benefit must be non-negative";
    StakeTooLarge { max: i64, actual: i64 } => "cost/benefit ({actual}) exceeds supported maximum ({max})";
    TooManyGenerations { max: usize, actual: usize } => "generations ({actual}) exceed supported maximum ({max})";
    InvalidExecutionErrorRate => "execution_error_rate must be finite and within [0,1]";
    InvalidStrategyMutationRate => "strategy_mutation_rate must be finite and within [0,1]";
    TooManyWorkerThreads { max: usize, actual: usize } => "worker_threads ({actual}) exceeds supported maximum ({max})";
}

impl std::error::Error for SimConfigError {}

impl SimConfig {
    pub const MAX_TOTAL_AGENTS: usize = crate::constants::MAX_TOTAL_AGENTS;
    pub const MAX_STAKE: i64 = crate::constants::MAX_STAKE;
    /// Also bounds `Population::run_generations`.
    pub const MAX_GENERATIONS: usize = crate::constants::MAX_GENERATIONS;
    pub const MAX_WORKER_THREADS: usize = crate::constants::MAX_WORKER_THREADS;
    /// Smallest tribe that can earn a positive payout. A lone agent never plays.
    pub const MIN_AGENTS_FOR_SELECTION: usize = 2;

    pub fn validate(&self) -> Result<(), SimConfigError> {
        self.validate_population()?;
        self.validate_stakes()?;
        self.validate_rates()?;
        self.validate_run()?;
        Ok(())
    }

    /// Total number of agents across all tribes, if it fits in `usize`.
    pub fn total_agents(&self) -> Option<usize> {
        self.num_tribes.checked_mul(self.agents_per_tribe)
    }

    fn validate_population(&self) -> Result<(), SimConfigError> {
        if self.num_tribes == 0 {
            return Err(SimConfigError::InvalidNumTribes);
        }
        if self.agents_per_tribe == 0 {
            return Err(SimConfigError::InvalidAgentsPerTribe);
        }
        if self.selection_fallback == SelectionFallback::Reject
            && self.agents_per_tribe < Self::MIN_AGENTS_FOR_SELECTION
        {
            return Err(SimConfigError::TooFewAgentsForSelection {
                min: Self::MIN_AGENTS_FOR_SELECTION,
                actual: self.agents_per_tribe,
            });
        }
        let total = self
            .total_agents()
            .ok_or(SimConfigError::AgentCountOverflow)?;
        if total > Self::MAX_TOTAL_AGENTS {
            return Err(SimConfigError::TooManyAgents {
                max: Self::MAX_TOTAL_AGENTS,
                actual: total,
            });
        }
        Ok(())
    }

    fn validate_stakes(&self) -> Result<(), SimConfigError> {
        if self.cost < 0 {
            return Err(SimConfigError::NegativeCost);
        }
        if self.benefit < 0 {
            return Err(SimConfigError::NegativeBenefit);
        }
        let largest = self.cost.max(self.benefit);
        if largest > Self::MAX_STAKE {
            return Err(SimConfigError::StakeTooLarge {
                max: Self::MAX_STAKE,
                actual: largest,
            });
        }
        Ok(())
    }

    fn validate_rates(&self) -> Result<(), SimConfigError> {
        if !(self.execution_error_rate.is_finite()
            && (0.0..=1.0).contains(&self.execution_error_rate))
        {
            return Err(SimConfigError::InvalidExecutionErrorRate);
        }
        if !(self.strategy_mutation_rate.is_finite()
            && (0.0..=1.0).contains(&self.strategy_mutation_rate))
        {
            return Err(SimConfigError::InvalidStrategyMutationRate);
        }
        Ok(())
    }

    fn validate_run(&self) -> Result<(), SimConfigError> {
        if self.generations > Self::MAX_GENERATIONS {
            return Err(SimConfigError::TooManyGenerations {
                max: Self::MAX_GENERATIONS,
                actual: self.generations,
            });
        }
        if self.worker_threads > Self::MAX_WORKER_THREADS {
            return Err(SimConfigError::TooManyWorkerThreads {
                max: Self::MAX_WORKER_THREADS,
                actual: self.worker_threads,
            });
        }
        Ok(())
    }
}
