use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::models::paymentmodel::{PaymentMethod, PaymentTransaction};
use crate::service::payment_provider::PaymentInitiation;

fn phone_regex() -> &'static Regex {
    static PHONE: OnceLock<Regex> = OnceLock::new();
    PHONE.get_or_init(|| Regex::new(r"^\+?[0-9]{8,15}$").expect("valid phone regex"))
}

pub fn validate_phone_number(phone: &str) -> Result<(), ValidationError> {
    let compact: String = phone.chars().filter(|c| !c.is_whitespace() && *c != '-').collect();
    if phone_regex().is_match(&compact) {
        Ok(())
    } else {
        let mut err = ValidationError::new("phone_number");
        err.message = Some("Phone number must be 8 to 15 digits".into());
        Err(err)
    }
}

/// Optional payer details sent alongside a payment method.
#[derive(Debug, Default, Clone, Serialize, Deserialize, Validate)]
pub struct PaymentDetailsDto {
    #[validate(custom = "validate_phone_number")]
    pub phone_number: Option<String>,

    #[validate(length(min = 4, max = 34, message = "Account number must be between 4 and 34 characters"))]
    pub account_number: Option<String>,

    #[validate(length(min = 10, max = 128, message = "Crypto wallet address looks invalid"))]
    pub crypto_wallet: Option<String>,

    #[validate(length(min = 2, max = 32, message = "Crypto network is invalid"))]
    pub crypto_network: Option<String>,
}

impl PaymentDetailsDto {
    /// Method specific requirements that field validation cannot express.
    pub fn check_for(&self, method: PaymentMethod) -> Result<(), String> {
        match method {
            PaymentMethod::MobileMoney if self.phone_number.is_none() => {
                Err("phone_number is required for mobile money payments".to_string())
            }
            PaymentMethod::Crypto if self.crypto_network.is_none() => {
                Err("crypto_network is required for crypto payments".to_string())
            }
            _ => Ok(()),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "phone_number": self.phone_number,
            "account_number": self.account_number,
            "crypto_wallet": self.crypto_wallet,
            "crypto_network": self.crypto_network,
        })
    }
}

/// Payment block returned to the client after initiation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentSummaryDto {
    pub transaction_id: Option<Uuid>,
    pub reference: String,
    pub amount: i64,
    pub currency: String,
    pub payment_method: PaymentMethod,
    pub checkout_url: Option<String>,
    pub instructions: Option<String>,
}

impl PaymentSummaryDto {
    pub fn from_initiation(
        initiation: &PaymentInitiation,
        transaction: Option<&PaymentTransaction>,
        amount: i64,
        currency: &str,
        payment_method: PaymentMethod,
    ) -> Self {
        PaymentSummaryDto {
            transaction_id: transaction.map(|t| t.id),
            reference: initiation.reference.clone(),
            amount,
            currency: currency.to_string(),
            payment_method,
            checkout_url: initiation.checkout_url.clone(),
            instructions: initiation.instructions.clone(),
        }
    }
}
