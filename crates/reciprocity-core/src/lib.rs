pub mod agent;
pub mod config;
pub mod constants;
pub mod executor;
pub mod metrics;
pub mod population;
pub mod rng;
pub mod strategy;
pub mod tribe;

pub use agent::Agent;
pub use config::{SelectionFallback, SimConfig, SimConfigError};
pub use executor::{ExecutionMode, ExecutorError, TribeExecutor};
pub use metrics::{AgentSnapshot, GenerationRecord, PopulationSnapshot, RunSummary, TribeSnapshot};
pub use population::{GenerationError, Population, PopulationInitError};
pub use strategy::{Reputation, Strategy};
pub use tribe::{NextGeneration, SelectionError, Tribe, TribeRates};
