use crate::strategy::{Reputation, Strategy};

/// One player: a strategy, a reputation and the current generation's accumulators.
#[derive(Clone, Debug, PartialEq)]
pub struct Agent {
    pub(crate) reputation: Reputation,
    pub(crate) payout: i64,
    pub(crate) games_played: u32,
    pub(crate) strategy: Strategy,
}

impl Agent {
    /// Create an agent with a GOOD reputation and zeroed accumulators.
    pub fn new(strategy: Strategy) -> Self {
        Self::with_reputation(strategy, Reputation::Good)
    }

    pub fn with_reputation(strategy: Strategy, reputation: Reputation) -> Self {
        Self {
            reputation,
            payout: 0,
            games_played: 0,
            strategy,
        }
    }

    pub fn reputation(&self) -> Reputation {
        self.reputation
    }

    pub fn payout(&self) -> i64 {
        self.payout
    }

    pub fn games_played(&self) -> u32 {
        self.games_played
    }

    pub fn strategy(&self) -> &Strategy {
        &self.strategy
    }

    /// Replace the reputation label. Play itself never calls this.
    pub fn set_reputation(&mut self, reputation: Reputation) {
        self.reputation = reputation;
    }

    /// Replace the strategy wholesale, as reproduction does.
    pub fn set_strategy(&mut self, strategy: Strategy) {
        self.strategy = strategy;
    }

    /// Zero payout and games played; reputation and strategy are kept.
    pub fn reset(&mut self) {
        self.payout = 0;
        self.games_played = 0;
    }

    pub fn decides_to_donate(&self, partner: &Agent) -> bool {
        self.strategy.decide(self.reputation, partner.reputation)
    }

    /// Play one donation round with `self` as donor and return the joint payout.
    ///
    /// The joint payout is `2 * cost` without a donation and `benefit + cost` with one.
    pub fn play_round(&mut self, partner: &mut Agent, cost: i64, benefit: i64) -> i64 {
        let donates = self.decides_to_donate(partner);
        self.settle_round(partner, donates, cost, benefit)
    }

    /// Apply the payout rule for an already-made decision.
    pub(crate) fn settle_round(
        &mut self,
        partner: &mut Agent,
        donates: bool,
        cost: i64,
        benefit: i64,
    ) -> i64 {
        self.games_played += 1;
        partner.games_played += 1;

        let mut joint_payout = 0;
        if donates {
            partner.payout += benefit;
            self.payout -= cost;
            joint_payout += benefit - cost;
        }

        // Baseline so a refused donation never leaves either side negative.
        self.payout += cost;
        partner.payout += cost;
        joint_payout += 2 * cost;

        joint_payout
    }
}
