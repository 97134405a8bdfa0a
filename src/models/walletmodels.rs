// models/walletmodels.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "wallet_transaction_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Deposit,
    Withdrawal,
}

impl TransactionType {
    /// Sign applied to `amount` when moving the balance.
    pub fn signed(&self, amount: i64) -> i64 {
        match self {
            TransactionType::Deposit => amount,
            TransactionType::Withdrawal => -amount,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserWallet {
    pub id: Uuid,
    pub user_id: Uuid,
    pub balance: i64,
    pub locked_balance: i64,
    pub currency: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct WalletTransaction {
    pub id: Uuid,
    pub wallet_id: Uuid,
    pub transaction_type: TransactionType,
    pub amount: i64,
    pub previous_balance: i64,
    pub new_balance: i64,
    pub reference: String, // Unique; doubles as idempotency key
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// Balance movement computed before anything is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    pub transaction_type: TransactionType,
    pub amount: i64,
    pub previous_balance: i64,
    pub new_balance: i64,
}

impl LedgerEntry {
    pub fn new(transaction_type: TransactionType, amount: i64, previous_balance: i64) -> Self {
        Self {
            transaction_type,
            amount,
            previous_balance,
            new_balance: previous_balance + transaction_type.signed(amount),
        }
    }

    pub fn deposit(amount: i64, previous_balance: i64) -> Self {
        Self::new(TransactionType::Deposit, amount, previous_balance)
    }
}

pub fn visit_payout_reference(visit_id: Uuid) -> String {
    format!("VISIT-{}", visit_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deposit_adds_to_previous_balance() {
        let entry = LedgerEntry::deposit(10_500, 2_000);
        assert_eq!(entry.new_balance, 12_500);
        assert_eq!(entry.new_balance, entry.previous_balance + entry.amount);
    }

    #[test]
    fn entries_compare_by_value() {
        assert_eq!(
            LedgerEntry::deposit(4_500, 1_000),
            LedgerEntry::new(TransactionType::Deposit, 4_500, 1_000)
        );
        assert_ne!(
            LedgerEntry::deposit(4_500, 1_000),
            LedgerEntry::new(TransactionType::Withdrawal, 4_500, 1_000)
        );
    }

    #[test]
    fn withdrawal_subtracts() {
        let entry = LedgerEntry::new(TransactionType::Withdrawal, 500, 2_000);
        assert_eq!(entry.new_balance, 1_500);
    }

    #[test]
    fn deposit_invariant_holds_across_balances() {
        for previous in [0_i64, 1, 10_500, 999_999_999] {
            for amount in [0_i64, 1, 4_500, 10_500] {
                let entry = LedgerEntry::deposit(amount, previous);
                assert_eq!(entry.new_balance, previous + amount);
            }
        }
    }

    #[test]
    fn payout_reference_is_stable_per_visit() {
        let visit_id = Uuid::new_v4();
        assert_eq!(visit_payout_reference(visit_id), visit_payout_reference(visit_id));
        assert_eq!(visit_payout_reference(visit_id), format!("VISIT-{}", visit_id));
    }
}
