//! Virtual-currency ledger.
//!
//! Every operation is a pure function from the current [`LedgerState`] to a
//! new one. Transaction ids and timestamps come in through a [`TxStamp`], so
//! a recorded list of [`LedgerOp`]s replays to the same state every time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};

/// Transaction kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TxKind {
    Earn,
    Spend,
    /// Awaiting verification; affects only the pending total.
    Pending,
    /// A rejected pending transaction. Terminal, affects nothing.
    Void,
}

impl fmt::Display for TxKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TxKind::Earn => write!(f, "EARN"),
            TxKind::Spend => write!(f, "SPEND"),
            TxKind::Pending => write!(f, "PENDING"),
            TxKind::Void => write!(f, "VOID"),
        }
    }
}

/// One ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub description: String,
    pub category: String,
    pub amount: u64,
    #[serde(rename = "type")]
    pub kind: TxKind,
    /// When a pending transaction was approved or rejected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
}

/// Identity and time for the transaction an operation appends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxStamp {
    pub id: String,
    pub at: DateTime<Utc>,
}

impl TxStamp {
    /// Fresh random id, current time.
    pub fn now() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            at: Utc::now(),
        }
    }
}

/// Verification outcome for a pending transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resolution {
    Approve,
    Reject,
}

/// A ledger mutation, recorded for replay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum LedgerOp {
    Grant {
        amount: u64,
        category: String,
        description: String,
    },
    GrantPending {
        amount: u64,
        category: String,
        description: String,
    },
    Resolve {
        transaction_id: String,
        resolution: Resolution,
    },
    Spend {
        amount: u64,
        category: String,
        description: String,
    },
}

/// Balance, pending and lifetime totals plus the transaction log.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerState {
    pub balance: u64,
    pub pending: u64,
    pub lifetime_earned: u64,
    /// Insertion order. Display newest first via [`LedgerState::recent`].
    #[serde(default)]
    pub transactions: Vec<Transaction>,
}

impl LedgerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn find(&self, transaction_id: &str) -> Option<&Transaction> {
        self.transactions.iter().find(|t| t.id == transaction_id)
    }

    /// Transactions newest first.
    pub fn recent(&self) -> impl Iterator<Item = &Transaction> {
        self.transactions.iter().rev()
    }

    /// Transactions still awaiting verification.
    pub fn outstanding(&self) -> impl Iterator<Item = &Transaction> {
        self.transactions
            .iter()
            .filter(|t| t.kind == TxKind::Pending)
    }

    /// Post an `EARN` transaction.
    pub fn grant(
        &self,
        amount: u64,
        category: &str,
        description: &str,
        stamp: TxStamp,
    ) -> EngineResult<Self> {
        let amount = positive(amount)?;
        let balance = checked_add(self.balance, amount)?;
        let lifetime_earned = checked_add(self.lifetime_earned, amount)?;
        let mut next = self.append(stamp, TxKind::Earn, amount, category, description)?;
        next.balance = balance;
        next.lifetime_earned = lifetime_earned;
        Ok(next)
    }

    /// Post a `PENDING` transaction. Balance and lifetime are untouched.
    pub fn grant_pending(
        &self,
        amount: u64,
        category: &str,
        description: &str,
        stamp: TxStamp,
    ) -> EngineResult<Self> {
        let amount = positive(amount)?;
        let pending = checked_add(self.pending, amount)?;
        let mut next = self.append(stamp, TxKind::Pending, amount, category, description)?;
        next.pending = pending;
        Ok(next)
    }

    /// Approve or reject a pending transaction, exactly once.
    pub fn resolve_pending(
        &self,
        transaction_id: &str,
        resolution: Resolution,
        at: DateTime<Utc>,
    ) -> EngineResult<Self> {
        let idx = self
            .transactions
            .iter()
            .position(|t| t.id == transaction_id)
            .ok_or_else(|| EngineError::transaction_not_found(transaction_id))?;
        let tx = &self.transactions[idx];

        match (tx.kind, tx.resolved_at) {
            (TxKind::Pending, _) => {}
            (TxKind::Void, _) | (TxKind::Earn, Some(_)) => {
                return Err(EngineError::AlreadyResolved {
                    transaction_id: transaction_id.to_string(),
                })
            }
            _ => {
                return Err(EngineError::NotPending {
                    transaction_id: transaction_id.to_string(),
                })
            }
        }

        let amount = tx.amount;
        let mut next = self.clone();
        next.pending = self.pending.saturating_sub(amount);
        match resolution {
            Resolution::Approve => {
                next.balance = checked_add(self.balance, amount)?;
                next.lifetime_earned = checked_add(self.lifetime_earned, amount)?;
                next.transactions[idx].kind = TxKind::Earn;
            }
            Resolution::Reject => {
                next.transactions[idx].kind = TxKind::Void;
            }
        }
        next.transactions[idx].resolved_at = Some(at);
        Ok(next)
    }

    /// Post a `SPEND` transaction against the spendable balance.
    pub fn spend(
        &self,
        amount: u64,
        category: &str,
        description: &str,
        stamp: TxStamp,
    ) -> EngineResult<Self> {
        let amount = positive(amount)?;
        if amount > self.balance {
            return Err(EngineError::InsufficientFunds {
                requested: amount,
                available: self.balance,
            });
        }
        let mut next = self.append(stamp, TxKind::Spend, amount, category, description)?;
        next.balance = self.balance - amount;
        Ok(next)
    }

    /// Apply a recorded operation.
    pub fn apply(&self, op: &LedgerOp, stamp: TxStamp) -> EngineResult<Self> {
        match op {
            LedgerOp::Grant {
                amount,
                category,
                description,
            } => self.grant(*amount, category, description, stamp),
            LedgerOp::GrantPending {
                amount,
                category,
                description,
            } => self.grant_pending(*amount, category, description, stamp),
            LedgerOp::Resolve {
                transaction_id,
                resolution,
            } => self.resolve_pending(transaction_id, *resolution, stamp.at),
            LedgerOp::Spend {
                amount,
                category,
                description,
            } => self.spend(*amount, category, description, stamp),
        }
    }

    /// Fold a history of operations from an empty ledger, stopping at the
    /// first rejected operation.
    pub fn replay<'a, I>(history: I) -> EngineResult<Self>
    where
        I: IntoIterator<Item = (&'a LedgerOp, TxStamp)>,
    {
        history
            .into_iter()
            .try_fold(Self::new(), |state, (op, stamp)| state.apply(op, stamp))
    }

    /// Recompute the aggregates from the transaction log and compare.
    pub fn is_consistent(&self) -> bool {
        let sum = |kind: TxKind| -> u128 {
            self.transactions
                .iter()
                .filter(|t| t.kind == kind)
                .map(|t| t.amount as u128)
                .sum()
        };
        let earned = sum(TxKind::Earn);
        let spent = sum(TxKind::Spend);
        earned >= spent
            && self.balance as u128 == earned - spent
            && self.lifetime_earned as u128 == earned
            && self.pending as u128 == sum(TxKind::Pending)
    }

    fn append(
        &self,
        stamp: TxStamp,
        kind: TxKind,
        amount: u64,
        category: &str,
        description: &str,
    ) -> EngineResult<Self> {
        if self.find(&stamp.id).is_some() {
            return Err(EngineError::Configuration(format!(
                "duplicate transaction id: {}",
                stamp.id
            )));
        }
        let mut next = self.clone();
        next.transactions.push(Transaction {
            id: stamp.id,
            timestamp: stamp.at,
            description: description.to_string(),
            category: category.to_string(),
            amount,
            kind,
            resolved_at: None,
        });
        Ok(next)
    }
}

fn positive(amount: u64) -> EngineResult<u64> {
    if amount == 0 {
        return Err(EngineError::InvalidAmount(amount));
    }
    Ok(amount)
}

fn checked_add(a: u64, b: u64) -> EngineResult<u64> {
    a.checked_add(b).ok_or(EngineError::InvalidAmount(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn stamp(n: u32) -> TxStamp {
        TxStamp {
            id: format!("tx-{n}"),
            at: Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, n % 60).unwrap(),
        }
    }

    #[test]
    fn grant_updates_balance_and_lifetime() {
        let l = LedgerState::new()
            .grant(100, "Training", "Completed A", stamp(1))
            .unwrap();
        assert_eq!(l.balance, 100);
        assert_eq!(l.lifetime_earned, 100);
        assert_eq!(l.transactions.len(), 1);
        assert_eq!(l.transactions[0].kind, TxKind::Earn);
        assert!(l.is_consistent());
    }

    #[test]
    fn spend_beyond_balance_is_rejected() {
        let l = LedgerState::new()
            .grant(200, "Training", "x", stamp(1))
            .unwrap();
        let err = l.spend(500, "Shop", "x", stamp(2)).unwrap_err();
        assert!(matches!(
            err,
            EngineError::InsufficientFunds {
                requested: 500,
                available: 200
            }
        ));
        assert_eq!(l.balance, 200);
        assert_eq!(l.transactions.len(), 1);
    }

    #[test]
    fn spend_keeps_lifetime() {
        let l = LedgerState::new()
            .grant(300, "Training", "x", stamp(1))
            .unwrap()
            .spend(120, "Shop", "Cleats", stamp(2))
            .unwrap();
        assert_eq!(l.balance, 180);
        assert_eq!(l.lifetime_earned, 300);
        assert!(l.is_consistent());
    }

    #[test]
    fn pending_is_excluded_until_approved() {
        let l = LedgerState::new()
            .grant_pending(50, "Drill", "video check", stamp(1))
            .unwrap();
        assert_eq!(l.balance, 0);
        assert_eq!(l.pending, 50);
        assert_eq!(l.lifetime_earned, 0);
        assert!(l.spend(10, "Shop", "x", stamp(2)).is_err());

        let approved = l
            .resolve_pending("tx-1", Resolution::Approve, stamp(3).at)
            .unwrap();
        assert_eq!(approved.balance, 50);
        assert_eq!(approved.pending, 0);
        assert_eq!(approved.lifetime_earned, 50);
        assert_eq!(approved.transactions[0].kind, TxKind::Earn);
        assert!(approved.is_consistent());
    }

    #[test]
    fn rejected_pending_stays_recorded_as_void() {
        let l = LedgerState::new()
            .grant_pending(50, "Drill", "video check", stamp(1))
            .unwrap()
            .resolve_pending("tx-1", Resolution::Reject, stamp(2).at)
            .unwrap();
        assert_eq!(l.balance, 0);
        assert_eq!(l.lifetime_earned, 0);
        assert_eq!(l.pending, 0);
        assert_eq!(l.transactions.len(), 1);
        assert_eq!(l.transactions[0].kind, TxKind::Void);
        assert!(l.transactions[0].resolved_at.is_some());
    }

    #[test]
    fn second_resolution_is_already_resolved() {
        let l = LedgerState::new()
            .grant_pending(50, "Drill", "x", stamp(1))
            .unwrap()
            .resolve_pending("tx-1", Resolution::Approve, stamp(2).at)
            .unwrap();
        for resolution in [Resolution::Approve, Resolution::Reject] {
            let err = l
                .resolve_pending("tx-1", resolution, stamp(3).at)
                .unwrap_err();
            assert!(matches!(err, EngineError::AlreadyResolved { .. }));
        }
        assert_eq!(l.balance, 50);
    }

    #[test]
    fn resolving_plain_earn_or_unknown_id_fails() {
        let l = LedgerState::new().grant(10, "T", "x", stamp(1)).unwrap();
        assert!(matches!(
            l.resolve_pending("tx-1", Resolution::Approve, stamp(2).at),
            Err(EngineError::NotPending { .. })
        ));
        assert!(matches!(
            l.resolve_pending("nope", Resolution::Approve, stamp(2).at),
            Err(EngineError::NotFound { .. })
        ));
    }

    #[test]
    fn zero_and_overflowing_amounts_are_rejected() {
        let l = LedgerState::new();
        assert!(matches!(
            l.grant(0, "T", "x", stamp(1)),
            Err(EngineError::InvalidAmount(0))
        ));
        let full = l.grant(u64::MAX, "T", "x", stamp(1)).unwrap();
        assert!(full.grant(1, "T", "y", stamp(2)).is_err());
        assert_eq!(full.transactions.len(), 1);
    }

    #[test]
    fn duplicate_stamp_ids_are_rejected() {
        let l = LedgerState::new().grant(10, "T", "x", stamp(1)).unwrap();
        assert!(l.grant(10, "T", "x", stamp(1)).is_err());
    }

    #[test]
    fn replay_is_deterministic() {
        let ops = vec![
            LedgerOp::Grant {
                amount: 250,
                category: "Training".into(),
                description: "Module".into(),
            },
            LedgerOp::GrantPending {
                amount: 75,
                category: "Drill".into(),
                description: "Upload".into(),
            },
            LedgerOp::Spend {
                amount: 100,
                category: "Shop".into(),
                description: "Socks".into(),
            },
            LedgerOp::Resolve {
                transaction_id: "tx-1".into(),
                resolution: Resolution::Approve,
            },
        ];
        let history = || ops.iter().enumerate().map(|(i, op)| (op, stamp(i as u32)));
        let a = LedgerState::replay(history()).unwrap();
        let b = LedgerState::replay(history()).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.balance, 225);
        assert_eq!(a.lifetime_earned, 325);
        assert!(a.is_consistent());
    }

    #[test]
    fn aggregates_hold_over_mixed_histories() {
        // Deterministic pseudo-random walk over grant/pending/spend/resolve.
        let mut seed: u64 = 0x5eed;
        let mut next = || {
            seed ^= seed << 13;
            seed ^= seed >> 7;
            seed ^= seed << 17;
            seed
        };
        let mut l = LedgerState::new();
        let mut lifetime = 0;
        for i in 0..400u32 {
            let r = next();
            let amount = r % 300;
            let candidate = match r % 4 {
                0 => l.grant(amount, "T", "g", stamp(i)),
                1 => l.grant_pending(amount, "T", "p", stamp(i)),
                2 => l.spend(amount, "S", "s", stamp(i)),
                _ => {
                    let target = l.outstanding().next().map(|t| t.id.clone());
                    match target {
                        Some(id) if r % 8 == 3 => {
                            l.resolve_pending(&id, Resolution::Approve, stamp(i).at)
                        }
                        Some(id) => l.resolve_pending(&id, Resolution::Reject, stamp(i).at),
                        None => continue,
                    }
                }
            };
            if let Ok(updated) = candidate {
                l = updated;
            }
            assert!(l.is_consistent(), "step {i}");
            assert!(l.lifetime_earned >= lifetime, "lifetime decreased at {i}");
            lifetime = l.lifetime_earned;
        }
    }

    #[test]
    fn serializes_type_field_uppercase() {
        let l = LedgerState::new().grant(5, "T", "x", stamp(1)).unwrap();
        let json = serde_json::to_value(&l).unwrap();
        assert_eq!(json["transactions"][0]["type"], "EARN");
        let back: LedgerState = serde_json::from_value(json).unwrap();
        assert_eq!(back, l);
    }
}
