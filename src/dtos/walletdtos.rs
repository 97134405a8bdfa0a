use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::walletmodels::UserWallet;

#[derive(Debug, Serialize, Deserialize)]
pub struct WalletResponseDto {
    pub id: Option<Uuid>,
    pub balance: i64,
    pub locked_balance: i64,
    pub available_balance: i64,
    pub currency: String,
    pub updated_at: Option<DateTime<Utc>>,
}

impl WalletResponseDto {
    pub fn from_wallet(wallet: &UserWallet) -> Self {
        WalletResponseDto {
            id: Some(wallet.id),
            balance: wallet.balance,
            locked_balance: wallet.locked_balance,
            available_balance: wallet.balance - wallet.locked_balance,
            currency: wallet.currency.clone(),
            updated_at: Some(wallet.updated_at),
        }
    }

    /// Zero-balance view for users who have never been paid out.
    pub fn empty(currency: &str) -> Self {
        WalletResponseDto {
            id: None,
            balance: 0,
            locked_balance: 0,
            available_balance: 0,
            currency: currency.to_string(),
            updated_at: None,
        }
    }
}
