/// Prime multiplier used to derive per-tribe RNG streams from a base seed.
/// Chosen so streams for consecutive tribe indices have minimal overlap.
pub const RNG_DERIVATION_PRIME: u64 = 7919;

/// Largest total number of agents (tribes x agents per tribe) in one population.
pub const MAX_TOTAL_AGENTS: usize = 1_000_000;

/// Largest accepted donation cost or benefit. Keeps per-generation payout
/// sums far away from `i64` overflow at `MAX_TOTAL_AGENTS`.
pub const MAX_STAKE: i64 = 1_000_000;

/// Largest number of generations per run, both in `SimConfig::generations`
/// and as an explicit `run_generations` argument.
pub const MAX_GENERATIONS: usize = 10_000_000;

/// Upper bound on a dedicated worker pool size.
pub const MAX_WORKER_THREADS: usize = 1_024;
