use rand::Rng;
use serde::{Deserialize, Serialize};

/// Binary reputation label. Fixed at agent creation; play never updates it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reputation {
    #[default]
    Good,
    Bad,
}

/// Donation decision table, one entry per (own reputation, partner reputation).
///
/// ```text
///   slot  own   partner
///   ----  ----  -------
///    0    GOOD  GOOD
///    1    GOOD  BAD
///    2    BAD   GOOD
///    3    BAD   BAD
/// ```
///
/// `true` means donate. A strategy is a plain value: agents that inherit it
/// hold their own copy, so nothing is ever mutated in place.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Strategy {
    table: [bool; 4],
}

impl Strategy {
    /// Code of the strategy that never donates.
    pub const ALL_DEFECT_CODE: u8 = 0;
    /// Code of the strategy that always donates.
    pub const ALL_COOPERATE_CODE: u8 = 15;

    pub const fn new(table: [bool; 4]) -> Self {
        Self { table }
    }

    /// Draw every slot from an independent fair coin.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::new(std::array::from_fn(|_| rng.random::<bool>()))
    }

    pub const fn all_cooperate() -> Self {
        Self::new([true; 4])
    }

    pub const fn all_defect() -> Self {
        Self::new([false; 4])
    }

    /// Build a strategy from its 4-bit code (slot 0 is the most significant bit).
    /// Returns `None` for codes above 15.
    pub fn from_code(code: u8) -> Option<Self> {
        if code > Self::ALL_COOPERATE_CODE {
            return None;
        }
        Some(Self::new(std::array::from_fn(|slot| {
            (code >> (3 - slot)) & 1 == 1
        })))
    }

    fn slot(own: Reputation, partner: Reputation) -> usize {
        match (own, partner) {
            (Reputation::Good, Reputation::Good) => 0,
            (Reputation::Good, Reputation::Bad) => 1,
            (Reputation::Bad, Reputation::Good) => 2,
            (Reputation::Bad, Reputation::Bad) => 3,
        }
    }

    /// Whether a donor with reputation `own` donates to a partner with reputation `partner`.
    pub fn decide(&self, own: Reputation, partner: Reputation) -> bool {
        self.table[Self::slot(own, partner)]
    }

    pub fn table(&self) -> [bool; 4] {
        self.table
    }

    /// Pack the table into 4 bits, slot 0 most significant.
    pub fn code(&self) -> u8 {
        self.table
            .iter()
            .fold(0u8, |acc, &bit| (acc << 1) | u8::from(bit))
    }

    /// Copy of this strategy where each slot flips independently with probability `rate`.
    ///
    /// `rate` must lie in [0, 1]. A zero rate consumes no randomness.
    pub fn mutated<R: Rng + ?Sized>(&self, rng: &mut R, rate: f64) -> Self {
        if rate <= 0.0 {
            return *self;
        }
        let mut table = self.table;
        for bit in &mut table {
            if rng.random_bool(rate) {
                *bit = !*bit;
            }
        }
        Self::new(table)
    }
}
