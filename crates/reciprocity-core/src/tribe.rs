use crate::agent::Agent;
use crate::config::{SelectionFallback, SimConfig};
use crate::rng::derive_tribe_rng;
use crate::strategy::Strategy;
use rand::Rng;
use rand_chacha::ChaCha12Rng;
use std::{error::Error, fmt};

/// Noise applied while a tribe plays and reproduces.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TribeRates {
    /// Probability that a donor's decision is inverted.
    pub execution_error: f64,
    /// Per-slot flip probability for inherited strategies.
    pub strategy_mutation: f64,
}

impl TribeRates {
    pub fn from_config(config: &SimConfig) -> Self {
        Self {
            execution_error: config.execution_error_rate,
            strategy_mutation: config.strategy_mutation_rate,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionError {
    EmptyTribe,
    NonPositiveFitness { total: i64 },
}

impl fmt::Display for SelectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionError::EmptyTribe => write!(f, "cannot select a parent from an empty tribe"),
            SelectionError::NonPositiveFitness { total } => write!(
                f,
                "roulette selection needs a positive summed payout (got {total})"
            ),
        }
    }
}

impl Error for SelectionError {}

/// Minimum and maximum total payout one `play_rounds` call can produce.
///
/// Every pair earns `2 * cost` without a donation and `benefit + cost` with one.
pub fn tribe_payout_bounds(num_agents: usize, cost: i64, benefit: i64) -> (i64, i64) {
    let pairs = pair_count(num_agents) as i64;
    let per_pair = [2 * cost, benefit + cost];
    let lo = per_pair[0].min(per_pair[1]);
    let hi = per_pair[0].max(per_pair[1]);
    (pairs * lo, pairs * hi)
}

/// Number of unordered agent pairs, C(n, 2).
pub fn pair_count(num_agents: usize) -> usize {
    num_agents * num_agents.saturating_sub(1) / 2
}

/// Two distinct mutable agents out of one slice.
fn pair_mut(agents: &mut [Agent], i: usize, j: usize) -> (&mut Agent, &mut Agent) {
    debug_assert!(i < j, "pair indices must be ordered");
    let (head, tail) = agents.split_at_mut(j);
    (&mut head[i], &mut tail[0])
}

/// An isolated sub-population. Reproduction only ever draws from its own agents.
#[derive(Clone, Debug)]
pub struct Tribe {
    index: usize,
    agents: Vec<Agent>,
    total_payout: i64,
    rates: TribeRates,
    selection_fallback: SelectionFallback,
    rng: ChaCha12Rng,
}

impl Tribe {
    /// Build a tribe of `num_agents` GOOD agents with random strategies drawn
    /// from the tribe's own stream (derived from `base_seed` and `index`).
    pub fn new(index: usize, num_agents: usize, base_seed: u64) -> Self {
        let mut rng = derive_tribe_rng(base_seed, index);
        let agents = (0..num_agents)
            .map(|_| Agent::new(Strategy::random(&mut rng)))
            .collect();
        Self::from_agents(index, agents, rng)
    }

    /// Build a tribe from explicit agents and generator.
    pub fn from_agents(index: usize, agents: Vec<Agent>, rng: ChaCha12Rng) -> Self {
        Self {
            index,
            agents,
            total_payout: 0,
            rates: TribeRates::default(),
            selection_fallback: SelectionFallback::default(),
            rng,
        }
    }

    pub fn with_rates(mut self, rates: TribeRates) -> Self {
        self.rates = rates;
        self
    }

    pub fn with_selection_fallback(mut self, fallback: SelectionFallback) -> Self {
        self.selection_fallback = fallback;
        self
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn agents_mut(&mut self) -> &mut [Agent] {
        &mut self.agents
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn total_payout(&self) -> i64 {
        self.total_payout
    }

    pub fn average_payout(&self) -> f64 {
        if self.agents.is_empty() {
            return 0.0;
        }
        self.total_payout as f64 / self.agents.len() as f64
    }

    /// Zero the tribe aggregate and every agent's accumulators.
    pub fn reset(&mut self) {
        self.total_payout = 0;
        for agent in &mut self.agents {
            agent.reset();
        }
    }

    /// Play one round for every unordered pair `i < j`, roles decided by a fair coin.
    ///
    /// Returns the tribe's accumulated total, which is also stored.
    pub fn play_rounds(&mut self, cost: i64, benefit: i64) -> i64 {
        let n = self.agents.len();
        for i in 0..n {
            for j in (i + 1)..n {
                let i_donates_to_j = self.rng.random::<bool>();
                let (a, b) = pair_mut(&mut self.agents, i, j);
                let (donor, recipient) = if i_donates_to_j { (a, b) } else { (b, a) };

                let mut donates = donor.decides_to_donate(recipient);
                if self.rates.execution_error > 0.0
                    && self.rng.random_bool(self.rates.execution_error)
                {
                    donates = !donates;
                }
                self.total_payout += donor.settle_round(recipient, donates, cost, benefit);
            }
        }
        self.total_payout
    }

    /// Fitness-proportional (roulette-wheel) draw over the agents' current payouts.
    ///
    /// Draws `r` uniformly from `[0, total]` and returns the first agent whose
    /// running payout sum reaches `r`.
    pub fn select_parent_index(&mut self) -> Result<usize, SelectionError> {
        roulette_index(&self.agents, &mut self.rng)
    }

    pub fn select_local_parent(&mut self) -> Result<&Agent, SelectionError> {
        let idx = self.select_parent_index()?;
        Ok(&self.agents[idx])
    }

    /// Draw every slot's inherited strategy without touching the tribe.
    ///
    /// Works on a copy of the tribe's generator; nothing changes until the
    /// result is passed to [`Tribe::commit_generation`]. Parents are drawn
    /// from the strategies as they stand before reproduction, so unlike a
    /// sequential in-place overwrite a later slot never inherits a strategy
    /// an earlier slot received in the same generation.
    pub fn plan_next_generation(&self) -> Result<NextGeneration, SelectionError> {
        let mut rng = self.rng.clone();
        let n = self.agents.len();
        if n == 0 {
            return Ok(NextGeneration {
                strategies: Vec::new(),
                rng,
            });
        }

        let total: i64 = self.agents.iter().map(Agent::payout).sum();
        let uniform = total <= 0 && self.selection_fallback == SelectionFallback::Uniform;
        if uniform {
            tracing::warn!(
                tribe = self.index,
                total,
                "non-positive tribe fitness; selecting parents uniformly"
            );
        }

        let mut strategies = Vec::with_capacity(n);
        for _ in 0..n {
            let parent = if uniform {
                rng.random_range(0..n)
            } else {
                roulette_index(&self.agents, &mut rng)?
            };
            strategies.push(
                self.agents[parent]
                    .strategy
                    .mutated(&mut rng, self.rates.strategy_mutation),
            );
        }
        Ok(NextGeneration { strategies, rng })
    }

    /// Apply a generation drawn by [`Tribe::plan_next_generation`] on this tribe.
    pub fn commit_generation(&mut self, next: NextGeneration) {
        debug_assert_eq!(next.strategies.len(), self.agents.len());
        for (agent, strategy) in self.agents.iter_mut().zip(next.strategies) {
            agent.strategy = strategy;
        }
        self.rng = next.rng;
    }

    /// Replace every agent's strategy with that of a parent chosen by payout.
    ///
    /// Must run after `play_rounds` and before `reset`: it reads this
    /// generation's payouts and leaves them untouched. On error the tribe is
    /// left exactly as it was.
    pub fn create_next_generation(&mut self) -> Result<(), SelectionError> {
        let next = self.plan_next_generation()?;
        self.commit_generation(next);
        Ok(())
    }
}

/// Inherited strategies for one tribe, drawn but not yet applied.
#[derive(Clone, Debug)]
pub struct NextGeneration {
    strategies: Vec<Strategy>,
    rng: ChaCha12Rng,
}

impl NextGeneration {
    pub fn strategies(&self) -> &[Strategy] {
        &self.strategies
    }
}

fn roulette_index<R: Rng>(agents: &[Agent], rng: &mut R) -> Result<usize, SelectionError> {
    if agents.is_empty() {
        return Err(SelectionError::EmptyTribe);
    }
    let total: i64 = agents.iter().map(Agent::payout).sum();
    if total <= 0 {
        return Err(SelectionError::NonPositiveFitness { total });
    }

    let r = rng.random_range(0..=total);
    let mut threshold = 0i64;
    for (idx, agent) in agents.iter().enumerate() {
        threshold += agent.payout;
        if r <= threshold {
            return Ok(idx);
        }
    }
    // The running sum ends at `total >= r`, so the loop always returns.
    Ok(agents.len() - 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::create_rng;
    use crate::strategy::Reputation;

    const COST: i64 = 1;
    const BENEFIT: i64 = 3;

    fn tribe_with(strategies: &[Strategy]) -> Tribe {
        let agents = strategies.iter().copied().map(Agent::new).collect();
        Tribe::from_agents(0, agents, create_rng(17))
    }

    fn set_payouts(tribe: &mut Tribe, payouts: &[i64]) {
        for (agent, &p) in tribe.agents_mut().iter_mut().zip(payouts) {
            agent.payout = p;
        }
    }

    #[test]
    fn new_tribe_has_requested_size_and_zero_total() {
        let t = Tribe::new(2, 3, 42);
        assert_eq!(t.len(), 3);
        assert_eq!(t.index(), 2);
        assert_eq!(t.total_payout(), 0);
        assert!(t
            .agents()
            .iter()
            .all(|a| a.reputation() == Reputation::Good && a.payout() == 0));
    }

    #[test]
    fn same_seed_and_index_build_identical_tribes() {
        let a = Tribe::new(5, 16, 99);
        let b = Tribe::new(5, 16, 99);
        assert_eq!(a.agents(), b.agents());
    }

    #[test]
    fn all_cooperators_earn_benefit_plus_cost_per_pair() {
        let mut t = tribe_with(&[Strategy::all_cooperate(); 3]);
        assert_eq!(t.play_rounds(COST, BENEFIT), 12);
        assert_eq!(t.total_payout(), 12);
    }

    #[test]
    fn all_defectors_earn_only_the_baseline() {
        let mut t = tribe_with(&[Strategy::all_defect(); 3]);
        assert_eq!(t.play_rounds(COST, BENEFIT), 6);
    }

    #[test]
    fn good_only_cooperators_refuse_once_everyone_is_bad() {
        let co = Strategy::new([true, false, true, false]);
        let mut t = tribe_with(&[co; 3]);
        assert_eq!(t.play_rounds(COST, BENEFIT), 12);

        t.reset();
        assert_eq!(t.total_payout(), 0);
        for agent in t.agents_mut() {
            agent.set_reputation(Reputation::Bad);
        }
        assert_eq!(t.play_rounds(COST, BENEFIT), 6);
    }

    #[test]
    fn play_rounds_plays_every_pair_exactly_once() {
        let n = 9;
        let mut t = Tribe::new(0, n, 3);
        let total = t.play_rounds(COST, BENEFIT);

        let games: u32 = t.agents().iter().map(Agent::games_played).sum();
        assert_eq!(games as usize, 2 * pair_count(n));
        assert!(t
            .agents()
            .iter()
            .all(|a| a.games_played() as usize == n - 1));
        let summed: i64 = t.agents().iter().map(Agent::payout).sum();
        assert_eq!(summed, total);

        let (lo, hi) = tribe_payout_bounds(n, COST, BENEFIT);
        assert!((lo..=hi).contains(&total));
    }

    #[test]
    fn payout_bounds_match_unconditional_strategies() {
        assert_eq!(tribe_payout_bounds(3, COST, BENEFIT), (6, 12));
        assert_eq!(tribe_payout_bounds(1, COST, BENEFIT), (0, 0));
        assert_eq!(tribe_payout_bounds(64, 1, 3), (4032, 8064));
    }

    #[test]
    fn certain_execution_error_inverts_every_decision() {
        let mut t = tribe_with(&[Strategy::all_cooperate(); 3]).with_rates(TribeRates {
            execution_error: 1.0,
            strategy_mutation: 0.0,
        });
        assert_eq!(t.play_rounds(COST, BENEFIT), 6);
    }

    #[test]
    fn reset_is_idempotent() {
        let mut t = Tribe::new(0, 4, 1);
        let before: Vec<Strategy> = t.agents().iter().map(|a| *a.strategy()).collect();
        t.play_rounds(COST, BENEFIT);
        t.reset();
        t.reset();
        assert_eq!(t.total_payout(), 0);
        assert!(t
            .agents()
            .iter()
            .all(|a| a.payout() == 0 && a.games_played() == 0));
        let after: Vec<Strategy> = t.agents().iter().map(|a| *a.strategy()).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn dominant_payout_wins_selection_and_reproduction() {
        let allc = Strategy::all_cooperate();
        let alld = Strategy::all_defect();
        let mut t = tribe_with(&[allc, allc, alld]);
        set_payouts(&mut t, &[-1, -1, 10]);

        for _ in 0..50 {
            assert_eq!(t.select_local_parent().map(|a| *a.strategy()), Ok(alld));
        }
        t.create_next_generation().expect("positive fitness");
        assert!(t.agents().iter().all(|a| *a.strategy() == alld));
        // Payouts are left for reset to clear.
        let payouts: Vec<i64> = t.agents().iter().map(Agent::payout).collect();
        assert_eq!(payouts, vec![-1, -1, 10]);
    }

    #[test]
    fn roulette_frequencies_follow_payout_shares() {
        let mut t = tribe_with(&[Strategy::all_defect(); 4]);
        let payouts = [10i64, 20, 30, 40];
        set_payouts(&mut t, &payouts);

        let trials = 40_000;
        let mut counts = [0usize; 4];
        for _ in 0..trials {
            counts[t.select_parent_index().expect("positive fitness")] += 1;
        }
        // r is drawn from [0, 100], so agent 0 also wins r = 0.
        let expected = [11.0 / 101.0, 20.0 / 101.0, 30.0 / 101.0, 40.0 / 101.0];
        for (count, share) in counts.iter().zip(expected) {
            let observed = *count as f64 / trials as f64;
            assert!(
                (observed - share).abs() < 0.01,
                "observed {observed:.4}, expected {share:.4}"
            );
        }
    }

    #[test]
    fn trailing_zero_payout_agents_are_never_selected() {
        let mut t = tribe_with(&[Strategy::all_defect(); 3]);
        set_payouts(&mut t, &[0, 5, 0]);
        for _ in 0..200 {
            let idx = t.select_parent_index().expect("positive fitness");
            assert_ne!(idx, 2);
        }
    }

    #[test]
    fn non_positive_fitness_is_rejected_by_default() {
        let mut t = tribe_with(&[Strategy::all_defect(); 3]);
        assert_eq!(
            t.select_parent_index(),
            Err(SelectionError::NonPositiveFitness { total: 0 })
        );
        set_payouts(&mut t, &[-2, 1, 0]);
        assert_eq!(
            t.create_next_generation(),
            Err(SelectionError::NonPositiveFitness { total: -1 })
        );
    }

    #[test]
    fn failed_reproduction_leaves_tribe_untouched() {
        let allc = Strategy::all_cooperate();
        let alld = Strategy::all_defect();
        let mut t = tribe_with(&[allc, alld, alld]);
        let mut untouched = t.clone();
        set_payouts(&mut t, &[0, 0, 0]);

        assert_eq!(
            t.plan_next_generation().map(|next| next.strategies().len()),
            Err(SelectionError::NonPositiveFitness { total: 0 })
        );
        assert!(t.create_next_generation().is_err());
        let strategies: Vec<Strategy> = t.agents().iter().map(|a| *a.strategy()).collect();
        assert_eq!(strategies, vec![allc, alld, alld]);

        // The generator did not advance either.
        set_payouts(&mut t, &[4, 1, 2]);
        set_payouts(&mut untouched, &[4, 1, 2]);
        t.create_next_generation().expect("positive fitness");
        untouched.create_next_generation().expect("positive fitness");
        assert_eq!(t.agents(), untouched.agents());
    }

    #[test]
    fn planned_generation_applies_only_on_commit() {
        let strategies = [
            Strategy::all_defect(),
            Strategy::all_cooperate(),
            Strategy::new([true, false, true, false]),
        ];
        let mut t = tribe_with(&strategies);
        set_payouts(&mut t, &[1, 0, 9]);
        let mut direct = t.clone();

        let next = t.plan_next_generation().expect("positive fitness");
        let unchanged: Vec<Strategy> = t.agents().iter().map(|a| *a.strategy()).collect();
        assert_eq!(unchanged, strategies.to_vec());

        let planned = next.strategies().to_vec();
        t.commit_generation(next);
        let applied: Vec<Strategy> = t.agents().iter().map(|a| *a.strategy()).collect();
        assert_eq!(applied, planned);

        direct.create_next_generation().expect("positive fitness");
        assert_eq!(t.agents(), direct.agents());
    }

    #[test]
    fn uniform_fallback_reproduces_from_own_agents() {
        let strategies = [
            Strategy::all_defect(),
            Strategy::all_cooperate(),
            Strategy::new([true, false, true, false]),
        ];
        let mut t = tribe_with(&strategies).with_selection_fallback(SelectionFallback::Uniform);
        t.create_next_generation().expect("uniform fallback");
        assert!(t
            .agents()
            .iter()
            .all(|a| strategies.contains(a.strategy())));
    }

    #[test]
    fn empty_tribe_cannot_select_but_reproduces_trivially() {
        let mut t = tribe_with(&[]);
        assert_eq!(t.select_parent_index(), Err(SelectionError::EmptyTribe));
        assert_eq!(t.create_next_generation(), Ok(()));
        assert_eq!(t.average_payout(), 0.0);
    }

    #[test]
    fn average_payout_divides_total_by_size() {
        let mut t = tribe_with(&[Strategy::all_cooperate(); 3]);
        t.play_rounds(COST, BENEFIT);
        assert_eq!(t.average_payout(), 4.0);
    }
}
