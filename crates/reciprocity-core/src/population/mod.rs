use crate::config::{SimConfig, SimConfigError};
use crate::executor::{ExecutorError, TribeExecutor};
use crate::metrics::{GenerationRecord, PopulationSnapshot, RunSummary, TribeSnapshot};
use crate::tribe::{SelectionError, Tribe, TribeRates};
use std::{error::Error, fmt};

#[derive(Debug, Clone, PartialEq)]
pub enum PopulationInitError {
    Config(SimConfigError),
    Executor(ExecutorError),
}

impl fmt::Display for PopulationInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PopulationInitError::Config(e) => write!(f, "{}", e),
            PopulationInitError::Executor(e) => write!(f, "{}", e),
        }
    }
}

impl From<SimConfigError> for PopulationInitError {
    fn from(err: SimConfigError) -> Self {
        PopulationInitError::Config(err)
    }
}

impl From<ExecutorError> for PopulationInitError {
    fn from(err: ExecutorError) -> Self {
        PopulationInitError::Executor(err)
    }
}

impl Error for PopulationInitError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            PopulationInitError::Config(e) => Some(e),
            PopulationInitError::Executor(e) => Some(e),
        }
    }
}

/// Failure of one generation step. The population must not be used for
/// further generations after any of these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    Executor(ExecutorError),
    Selection {
        tribe_index: usize,
        source: SelectionError,
    },
    TooManyGenerations {
        max: usize,
        actual: usize,
    },
}

impl fmt::Display for GenerationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerationError::Executor(e) => write!(f, "{}", e),
            GenerationError::Selection {
                tribe_index,
                source,
            } => write!(f, "reproduction failed in tribe {tribe_index}: {source}"),
            GenerationError::TooManyGenerations { max, actual } => {
                write!(f, "generations ({actual}) exceed supported maximum ({max})")
            }
        }
    }
}

impl From<ExecutorError> for GenerationError {
    fn from(err: ExecutorError) -> Self {
        GenerationError::Executor(err)
    }
}

impl Error for GenerationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            GenerationError::Executor(e) => Some(e),
            GenerationError::Selection { source, .. } => Some(source),
            GenerationError::TooManyGenerations { .. } => None,
        }
    }
}

/// All tribes of a run. Tribe `i` always sits at position `i`.
#[derive(Debug)]
pub struct Population {
    tribes: Vec<Tribe>,
    total_payout: i64,
    config: SimConfig,
    executor: TribeExecutor,
}

impl Population {
    /// Same limit `SimConfig::validate` applies to `generations`.
    pub const MAX_GENERATIONS: usize = SimConfig::MAX_GENERATIONS;

    pub fn new(config: SimConfig) -> Result<Self, PopulationInitError> {
        config.validate()?;
        let executor = TribeExecutor::from_config(&config)?;
        let rates = TribeRates::from_config(&config);

        let tribes: Vec<Tribe> = (0..config.num_tribes)
            .map(|index| {
                Tribe::new(index, config.agents_per_tribe, config.seed)
                    .with_rates(rates)
                    .with_selection_fallback(config.selection_fallback)
            })
            .collect();

        tracing::info!(
            tribes = config.num_tribes,
            agents_per_tribe = config.agents_per_tribe,
            seed = config.seed,
            mode = ?executor.mode(),
            threads = executor.num_threads(),
            "population initialised"
        );

        Ok(Self {
            tribes,
            total_payout: 0,
            config,
            executor,
        })
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn executor(&self) -> &TribeExecutor {
        &self.executor
    }

    pub fn tribes(&self) -> &[Tribe] {
        &self.tribes
    }

    /// Mutable access to the tribes; the tribe count cannot change.
    pub fn tribes_mut(&mut self) -> &mut [Tribe] {
        &mut self.tribes
    }

    pub fn total_payout(&self) -> i64 {
        self.total_payout
    }

    /// Play one generation in every tribe; the population total is the sum of
    /// the tribe totals.
    pub fn play_round(&mut self, cost: i64, benefit: i64) -> Result<i64, GenerationError> {
        let totals = self.executor.play_tribes(&mut self.tribes, cost, benefit)?;
        self.total_payout = totals.iter().sum();
        Ok(self.total_payout)
    }

    /// Reproduce every tribe from its own agents only.
    ///
    /// Every tribe's offspring is drawn first; strategies are replaced only
    /// once all tribes succeeded, so an error leaves the whole population in
    /// its current generation.
    pub fn create_next_generation(&mut self) -> Result<(), GenerationError> {
        let plans = self
            .executor
            .map_tribes(&mut self.tribes, |tribe| tribe.plan_next_generation())?;

        let mut next = Vec::with_capacity(plans.len());
        for (tribe_index, plan) in plans.into_iter().enumerate() {
            next.push(plan.map_err(|source| GenerationError::Selection {
                tribe_index,
                source,
            })?);
        }
        for (tribe, generation) in self.tribes.iter_mut().zip(next) {
            tribe.commit_generation(generation);
        }
        Ok(())
    }

    /// Zero every tribe and the population aggregate.
    pub fn reset(&mut self) {
        self.total_payout = 0;
        for tribe in &mut self.tribes {
            tribe.reset();
        }
    }

    /// Run `generations` cycles of play, record, reproduce, reset.
    ///
    /// Expects the population to start in its reset state and leaves it there.
    pub fn run_generations(&mut self, generations: usize) -> Result<RunSummary, GenerationError> {
        if generations > Self::MAX_GENERATIONS {
            return Err(GenerationError::TooManyGenerations {
                max: Self::MAX_GENERATIONS,
                actual: generations,
            });
        }
        let (cost, benefit) = (self.config.cost, self.config.benefit);

        let mut records = Vec::with_capacity(generations.min(4_096));
        for generation in 1..=generations {
            let total_payout = self.play_round(cost, benefit)?;
            tracing::debug!(generation, total_payout, "generation played");
            records.push(GenerationRecord {
                generation,
                total_payout,
            });
            self.create_next_generation()?;
            self.reset();
        }

        tracing::info!(
            generations,
            final_total = records.last().map(|r| r.total_payout),
            "run complete"
        );
        Ok(RunSummary {
            schema_version: 1,
            generations,
            records,
        })
    }

    /// Run the number of generations configured in `SimConfig::generations`.
    pub fn run(&mut self) -> Result<RunSummary, GenerationError> {
        self.run_generations(self.config.generations)
    }

    pub fn snapshot(&self) -> PopulationSnapshot {
        PopulationSnapshot {
            total_payout: self.total_payout,
            tribes: self.tribes.iter().map(TribeSnapshot::from).collect(),
        }
    }
}
