//! Tier classification derived from lifetime earnings.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// A named band of lifetime-earned currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tier {
    pub name: String,
    pub minimum_lifetime_earned: u64,
}

impl Tier {
    fn new(name: &str, minimum_lifetime_earned: u64) -> Self {
        Self {
            name: name.to_string(),
            minimum_lifetime_earned,
        }
    }
}

/// Current tier and distance to the next one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TierStatus {
    pub current: Tier,
    pub next: Option<Tier>,
    /// 0.0 to 100.0; 100.0 at the top tier.
    pub progress_percent: f64,
    /// Lifetime XP still needed for the next tier, 0 at the top tier.
    pub remaining: u64,
}

/// Fixed ascending threshold table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Tier>", into = "Vec<Tier>")]
pub struct TierTable {
    tiers: Vec<Tier>,
}

impl TierTable {
    /// Validate a table: non-empty, starts at 0, strictly ascending.
    pub fn new(tiers: Vec<Tier>) -> EngineResult<Self> {
        let Some(first) = tiers.first() else {
            return Err(EngineError::Configuration("tier table is empty".into()));
        };
        if first.minimum_lifetime_earned != 0 {
            return Err(EngineError::Configuration(format!(
                "first tier '{}' must start at 0",
                first.name
            )));
        }
        for pair in tiers.windows(2) {
            if pair[1].minimum_lifetime_earned <= pair[0].minimum_lifetime_earned {
                return Err(EngineError::Configuration(format!(
                    "tier '{}' threshold must be above '{}'",
                    pair[1].name, pair[0].name
                )));
            }
        }
        Ok(Self { tiers })
    }

    pub fn tiers(&self) -> &[Tier] {
        &self.tiers
    }

    /// Pure lookup of the tier for a lifetime total.
    pub fn tier_for(&self, lifetime_earned: u64) -> TierStatus {
        let idx = self
            .tiers
            .iter()
            .rposition(|t| t.minimum_lifetime_earned <= lifetime_earned)
            .unwrap_or(0);
        let current = self.tiers[idx].clone();
        let next = self.tiers.get(idx + 1).cloned();

        let (progress_percent, remaining) = match &next {
            Some(next) => {
                let span = next.minimum_lifetime_earned - current.minimum_lifetime_earned;
                let into = lifetime_earned - current.minimum_lifetime_earned;
                let pct = (into as f64 / span as f64 * 100.0).clamp(0.0, 100.0);
                (pct, next.minimum_lifetime_earned - lifetime_earned)
            }
            None => (100.0, 0),
        };

        TierStatus {
            current,
            next,
            progress_percent,
            remaining,
        }
    }
}

impl Default for TierTable {
    fn default() -> Self {
        Self {
            tiers: vec![
                Tier::new("Rookie", 0),
                Tier::new("Bronze", 500),
                Tier::new("Silver", 1500),
                Tier::new("Gold", 3000),
                Tier::new("Platinum", 6000),
            ],
        }
    }
}

impl TryFrom<Vec<Tier>> for TierTable {
    type Error = EngineError;

    fn try_from(tiers: Vec<Tier>) -> Result<Self, Self::Error> {
        Self::new(tiers)
    }
}

impl From<TierTable> for Vec<Tier> {
    fn from(table: TierTable) -> Self {
        table.tiers
    }
}
