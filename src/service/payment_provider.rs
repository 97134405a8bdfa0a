// service/payment_provider.rs
use std::sync::Arc;

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sha2::Sha512;
use subtle::ConstantTimeEq;
use thiserror::Error;

use crate::{
    config::Config,
    models::paymentmodel::PaymentMethod,
    utils::money::{format_amount, from_minor_units, to_minor_units},
};

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("Invalid webhook signature")]
    InvalidSignature,

    #[error("Payment method {0:?} is not supported by this provider")]
    UnsupportedMethod(PaymentMethod),

    #[error("{0}")]
    Provider(String),

    #[error("Malformed gateway payload: {0}")]
    MalformedPayload(String),

    #[error("Gateway request failed: {0}")]
    Http(#[from] reqwest::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub reference: String,
    pub amount: i64,
    pub currency: String,
    pub payment_method: PaymentMethod,
    pub customer_email: String,
    pub customer_phone: Option<String>,
    pub description: String,
    pub metadata: Option<JsonValue>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentInitiation {
    pub success: bool,
    pub reference: String,
    pub gateway_reference: Option<String>,
    pub checkout_url: Option<String>,
    pub instructions: Option<String>,
    pub error: Option<String>,
}

impl PaymentInitiation {
    pub fn failed(reference: &str, error: impl Into<String>) -> Self {
        PaymentInitiation {
            success: false,
            reference: reference.to_string(),
            gateway_reference: None,
            checkout_url: None,
            instructions: None,
            error: Some(error.into()),
        }
    }

    fn out_of_band(request: &PaymentRequest) -> Self {
        PaymentInitiation {
            success: true,
            reference: request.reference.clone(),
            gateway_reference: None,
            checkout_url: None,
            instructions: Some(out_of_band_instructions(request)),
            error: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GatewayStatus {
    Pending,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentVerification {
    pub status: GatewayStatus,
    pub gateway_reference: Option<String>,
    /// Whole currency units, when the gateway reports it
    pub amount: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEvent {
    pub event_type: String,
    pub reference: String,
    pub status: GatewayStatus,
    pub gateway_reference: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundRequest {
    pub reference: String,
    pub gateway_reference: Option<String>,
    pub amount: i64,
    pub currency: String,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundOutcome {
    pub success: bool,
    pub refund_reference: Option<String>,
    pub instructions: Option<String>,
    pub error: Option<String>,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    fn provider_name(&self) -> &str;

    fn supported_methods(&self) -> Vec<PaymentMethod>;

    /// Methods this provider cannot settle itself; an admin confirms them with evidence.
    fn is_out_of_band(&self, method: PaymentMethod) -> bool {
        method.is_out_of_band()
    }

    fn supports(&self, method: PaymentMethod) -> bool {
        self.supported_methods().contains(&method)
    }

    /// Never fails outright: provider errors come back with `success = false`.
    async fn initiate_payment(&self, request: PaymentRequest) -> PaymentInitiation;

    async fn verify_payment(
        &self,
        method: PaymentMethod,
        reference: &str,
    ) -> Result<PaymentVerification, PaymentError>;

    async fn process_webhook(
        &self,
        provider: &str,
        signature: Option<&str>,
        payload: &[u8],
    ) -> Result<WebhookEvent, PaymentError>;

    async fn refund_payment(
        &self,
        method: PaymentMethod,
        request: RefundRequest,
    ) -> Result<RefundOutcome, PaymentError>;
}

fn out_of_band_instructions(request: &PaymentRequest) -> String {
    let amount = format_amount(request.amount, &request.currency);
    match request.payment_method {
        PaymentMethod::Crypto => format!(
            "Send the equivalent of {} and quote reference {} in the transaction memo. \
             An administrator confirms the payment once the transfer is visible on chain.",
            amount, request.reference
        ),
        PaymentMethod::BankTransfer => format!(
            "Transfer {} to the marketplace account using reference {} as the narration.",
            amount, request.reference
        ),
        PaymentMethod::MobileMoney => format!(
            "Approve the mobile money request of {} on your phone. Reference: {}.",
            amount, request.reference
        ),
        PaymentMethod::Card => format!(
            "Pay {} by card at the counter and keep the receipt. Reference: {}.",
            amount, request.reference
        ),
    }
}

pub fn verify_paystack_signature(payload: &[u8], signature: &str, secret: &str) -> bool {
    let Ok(mut mac) = Hmac::<Sha512>::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(payload);

    let expected_signature_hex = hex::encode(mac.finalize().into_bytes());

    ConstantTimeEq::ct_eq(signature.as_bytes(), expected_signature_hex.as_bytes()).into()
}

pub fn verify_flutterwave_hash(signature: &str, secret: &str) -> bool {
    ConstantTimeEq::ct_eq(signature.as_bytes(), secret.as_bytes()).into()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Paystack,
    Flutterwave,
}

impl Provider {
    pub fn name(&self) -> &'static str {
        match self {
            Provider::Paystack => "paystack",
            Provider::Flutterwave => "flutterwave",
        }
    }
}

/// Card/mobile money/bank transfer through a hosted checkout; crypto stays out of band.
pub struct ProviderGateway {
    provider: Provider,
    secret_key: String,
    redirect_url: String,
    client: reqwest::Client,
}

impl ProviderGateway {
    pub fn new(provider: Provider, secret_key: String, redirect_url: String) -> Self {
        Self {
            provider,
            secret_key,
            redirect_url,
            client: reqwest::Client::new(),
        }
    }

    async fn paystack_initialize(
        &self,
        request: &PaymentRequest,
    ) -> Result<PaymentInitiation, PaymentError> {
        let channel = match request.payment_method {
            PaymentMethod::MobileMoney => "mobile_money",
            PaymentMethod::BankTransfer => "bank_transfer",
            _ => "card",
        };
        let payload = serde_json::json!({
            "email": request.customer_email,
            "amount": to_minor_units(request.amount, &request.currency),
            "reference": request.reference,
            "currency": request.currency,
            "callback_url": self.redirect_url,
            "metadata": request.metadata.clone().unwrap_or(serde_json::json!({})),
            "channels": [channel]
        });

        let response_body: JsonValue = self
            .client
            .post("https://api.paystack.co/transaction/initialize")
            .header("Authorization", format!("Bearer {}", self.secret_key))
            .json(&payload)
            .send()
            .await?
            .json()
            .await?;

        if !response_body["status"].as_bool().unwrap_or(false) {
            return Err(PaymentError::Provider(
                response_body["message"]
                    .as_str()
                    .unwrap_or("Payment initialization failed")
                    .to_string(),
            ));
        }

        let data = &response_body["data"];
        Ok(PaymentInitiation {
            success: true,
            reference: request.reference.clone(),
            gateway_reference: data["access_code"].as_str().map(str::to_string),
            checkout_url: data["authorization_url"].as_str().map(str::to_string),
            instructions: None,
            error: None,
        })
    }

    async fn flutterwave_initialize(
        &self,
        request: &PaymentRequest,
    ) -> Result<PaymentInitiation, PaymentError> {
        let payment_options = match request.payment_method {
            PaymentMethod::MobileMoney => "mobilemoneyfranco",
            PaymentMethod::BankTransfer => "banktransfer",
            _ => "card",
        };
        let payload = serde_json::json!({
            "tx_ref": request.reference,
            "amount": request.amount,
            "currency": request.currency,
            "redirect_url": self.redirect_url,
            "payment_options": payment_options,
            "customer": {
                "email": request.customer_email,
                "phonenumber": request.customer_phone,
            },
            "customizations": {
                "title": "Marketnest",
                "description": request.description,
            },
            "meta": request.metadata.clone().unwrap_or(serde_json::json!({}))
        });

        let response_body: JsonValue = self
            .client
            .post("https://api.flutterwave.com/v3/payments")
            .header("Authorization", format!("Bearer {}", self.secret_key))
            .json(&payload)
            .send()
            .await?
            .json()
            .await?;

        if response_body["status"].as_str() != Some("success") {
            return Err(PaymentError::Provider(
                response_body["message"]
                    .as_str()
                    .unwrap_or("Payment initialization failed")
                    .to_string(),
            ));
        }

        Ok(PaymentInitiation {
            success: true,
            reference: request.reference.clone(),
            gateway_reference: None,
            checkout_url: response_body["data"]["link"].as_str().map(str::to_string),
            instructions: None,
            error: None,
        })
    }

    async fn paystack_verify(&self, reference: &str) -> Result<PaymentVerification, PaymentError> {
        let url = format!("https://api.paystack.co/transaction/verify/{}", reference);
        let response_body: JsonValue = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.secret_key))
            .send()
            .await?
            .json()
            .await?;

        if !response_body["status"].as_bool().unwrap_or(false) {
            return Err(PaymentError::Provider(
                response_body["message"].as_str().unwrap_or("Verification failed").to_string(),
            ));
        }

        let data = &response_body["data"];
        let currency = data["currency"].as_str().unwrap_or("XAF");
        let status = match data["status"].as_str() {
            Some("success") => GatewayStatus::Completed,
            Some("failed") | Some("abandoned") | Some("reversed") => GatewayStatus::Failed,
            _ => GatewayStatus::Pending,
        };

        Ok(PaymentVerification {
            status,
            gateway_reference: data["id"].as_i64().map(|id| id.to_string()),
            amount: data["amount"].as_i64().map(|a| from_minor_units(a, currency)),
        })
    }

    async fn flutterwave_verify(&self, reference: &str) -> Result<PaymentVerification, PaymentError> {
        let url = format!(
            "https://api.flutterwave.com/v3/transactions/verify_by_reference?tx_ref={}",
            reference
        );
        let response_body: JsonValue = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.secret_key))
            .send()
            .await?
            .json()
            .await?;

        if response_body["status"].as_str() != Some("success") {
            return Err(PaymentError::Provider(
                response_body["message"].as_str().unwrap_or("Verification failed").to_string(),
            ));
        }

        let data = &response_body["data"];
        let status = match data["status"].as_str() {
            Some("successful") => GatewayStatus::Completed,
            Some("failed") => GatewayStatus::Failed,
            _ => GatewayStatus::Pending,
        };

        Ok(PaymentVerification {
            status,
            gateway_reference: data["id"].as_i64().map(|id| id.to_string()),
            amount: data["amount"].as_f64().map(|a| a.round() as i64),
        })
    }
}

fn parse_paystack_event(body: &JsonValue) -> Result<WebhookEvent, PaymentError> {
    let event_type = body["event"]
        .as_str()
        .ok_or_else(|| PaymentError::MalformedPayload("missing event type".to_string()))?;
    let data = &body["data"];
    let reference = data["reference"]
        .as_str()
        .ok_or_else(|| PaymentError::MalformedPayload("missing reference".to_string()))?;

    let status = match event_type {
        "charge.success" => GatewayStatus::Completed,
        "charge.failed" => GatewayStatus::Failed,
        _ => GatewayStatus::Pending,
    };

    Ok(WebhookEvent {
        event_type: event_type.to_string(),
        reference: reference.to_string(),
        status,
        gateway_reference: data["id"].as_i64().map(|id| id.to_string()),
    })
}

fn parse_flutterwave_event(body: &JsonValue) -> Result<WebhookEvent, PaymentError> {
    let event_type = body["event"]
        .as_str()
        .ok_or_else(|| PaymentError::MalformedPayload("missing event type".to_string()))?;
    let data = &body["data"];
    let reference = data["tx_ref"]
        .as_str()
        .ok_or_else(|| PaymentError::MalformedPayload("missing tx_ref".to_string()))?;

    let status = match (event_type, data["status"].as_str()) {
        ("charge.completed", Some("successful")) => GatewayStatus::Completed,
        ("charge.completed", Some("failed")) => GatewayStatus::Failed,
        _ => GatewayStatus::Pending,
    };

    Ok(WebhookEvent {
        event_type: event_type.to_string(),
        reference: reference.to_string(),
        status,
        gateway_reference: data["id"].as_i64().map(|id| id.to_string()),
    })
}

#[async_trait]
impl PaymentGateway for ProviderGateway {
    fn provider_name(&self) -> &str {
        self.provider.name()
    }

    fn supported_methods(&self) -> Vec<PaymentMethod> {
        vec![
            PaymentMethod::MobileMoney,
            PaymentMethod::Card,
            PaymentMethod::BankTransfer,
            PaymentMethod::Crypto,
        ]
    }

    async fn initiate_payment(&self, request: PaymentRequest) -> PaymentInitiation {
        if !self.supports(request.payment_method) {
            return PaymentInitiation::failed(
                &request.reference,
                PaymentError::UnsupportedMethod(request.payment_method).to_string(),
            );
        }
        if self.is_out_of_band(request.payment_method) {
            return PaymentInitiation::out_of_band(&request);
        }

        let result = match self.provider {
            Provider::Paystack => self.paystack_initialize(&request).await,
            Provider::Flutterwave => self.flutterwave_initialize(&request).await,
        };

        match result {
            Ok(initiation) => initiation,
            Err(e) => {
                tracing::warn!(
                    "{} initialization failed for {}: {}",
                    self.provider.name(),
                    request.reference,
                    e
                );
                PaymentInitiation::failed(&request.reference, e.to_string())
            }
        }
    }

    async fn verify_payment(
        &self,
        method: PaymentMethod,
        reference: &str,
    ) -> Result<PaymentVerification, PaymentError> {
        if self.is_out_of_band(method) {
            return Ok(PaymentVerification {
                status: GatewayStatus::Pending,
                gateway_reference: None,
                amount: None,
            });
        }

        match self.provider {
            Provider::Paystack => self.paystack_verify(reference).await,
            Provider::Flutterwave => self.flutterwave_verify(reference).await,
        }
    }

    async fn process_webhook(
        &self,
        provider: &str,
        signature: Option<&str>,
        payload: &[u8],
    ) -> Result<WebhookEvent, PaymentError> {
        if provider != self.provider.name() {
            return Err(PaymentError::Provider(format!(
                "Webhooks from {} are not accepted",
                provider
            )));
        }
        let signature = signature.ok_or(PaymentError::InvalidSignature)?;

        let valid = match self.provider {
            Provider::Paystack => verify_paystack_signature(payload, signature, &self.secret_key),
            Provider::Flutterwave => verify_flutterwave_hash(signature, &self.secret_key),
        };
        if !valid {
            return Err(PaymentError::InvalidSignature);
        }

        let body: JsonValue = serde_json::from_slice(payload)
            .map_err(|e| PaymentError::MalformedPayload(e.to_string()))?;

        match self.provider {
            Provider::Paystack => parse_paystack_event(&body),
            Provider::Flutterwave => parse_flutterwave_event(&body),
        }
    }

    async fn refund_payment(
        &self,
        method: PaymentMethod,
        request: RefundRequest,
    ) -> Result<RefundOutcome, PaymentError> {
        if self.is_out_of_band(method) {
            return Ok(RefundOutcome {
                success: true,
                refund_reference: None,
                instructions: Some(format!(
                    "Return {} to the payer out of band and record reference {}.",
                    format_amount(request.amount, &request.currency),
                    request.reference
                )),
                error: None,
            });
        }

        let response_body: JsonValue = match self.provider {
            Provider::Paystack => {
                let payload = serde_json::json!({
                    "transaction": request.reference,
                    "amount": to_minor_units(request.amount, &request.currency),
                    "merchant_note": request.reason,
                });
                self.client
                    .post("https://api.paystack.co/refund")
                    .header("Authorization", format!("Bearer {}", self.secret_key))
                    .json(&payload)
                    .send()
                    .await?
                    .json()
                    .await?
            }
            Provider::Flutterwave => {
                let transaction_id = request.gateway_reference.as_deref().ok_or_else(|| {
                    PaymentError::Provider("Missing gateway transaction id for refund".to_string())
                })?;
                let url = format!(
                    "https://api.flutterwave.com/v3/transactions/{}/refund",
                    transaction_id
                );
                self.client
                    .post(&url)
                    .header("Authorization", format!("Bearer {}", self.secret_key))
                    .json(&serde_json::json!({ "amount": request.amount }))
                    .send()
                    .await?
                    .json()
                    .await?
            }
        };

        let accepted = response_body["status"].as_bool().unwrap_or(false)
            || response_body["status"].as_str() == Some("success");

        Ok(RefundOutcome {
            success: accepted,
            refund_reference: response_body["data"]["id"].as_i64().map(|id| id.to_string()),
            instructions: None,
            error: if accepted {
                None
            } else {
                Some(
                    response_body["message"]
                        .as_str()
                        .unwrap_or("Refund failed")
                        .to_string(),
                )
            },
        })
    }
}

/// Every method is settled out of band and confirmed by an administrator.
pub struct ManualGateway;

#[async_trait]
impl PaymentGateway for ManualGateway {
    fn provider_name(&self) -> &str {
        "manual"
    }

    fn supported_methods(&self) -> Vec<PaymentMethod> {
        vec![
            PaymentMethod::MobileMoney,
            PaymentMethod::BankTransfer,
            PaymentMethod::Crypto,
        ]
    }

    fn is_out_of_band(&self, _method: PaymentMethod) -> bool {
        true
    }

    async fn initiate_payment(&self, request: PaymentRequest) -> PaymentInitiation {
        if !self.supports(request.payment_method) {
            return PaymentInitiation::failed(
                &request.reference,
                PaymentError::UnsupportedMethod(request.payment_method).to_string(),
            );
        }
        PaymentInitiation::out_of_band(&request)
    }

    async fn verify_payment(
        &self,
        _method: PaymentMethod,
        _reference: &str,
    ) -> Result<PaymentVerification, PaymentError> {
        Ok(PaymentVerification {
            status: GatewayStatus::Pending,
            gateway_reference: None,
            amount: None,
        })
    }

    async fn process_webhook(
        &self,
        provider: &str,
        _signature: Option<&str>,
        _payload: &[u8],
    ) -> Result<WebhookEvent, PaymentError> {
        Err(PaymentError::Provider(format!(
            "Webhooks from {} are not accepted",
            provider
        )))
    }

    async fn refund_payment(
        &self,
        _method: PaymentMethod,
        request: RefundRequest,
    ) -> Result<RefundOutcome, PaymentError> {
        Ok(RefundOutcome {
            success: true,
            refund_reference: None,
            instructions: Some(format!(
                "Return {} to the payer out of band and record reference {}.",
                format_amount(request.amount, &request.currency),
                request.reference
            )),
            error: None,
        })
    }
}

pub struct PaymentProcessorFactory;

impl PaymentProcessorFactory {
    pub fn from_config(config: &Config) -> Arc<dyn PaymentGateway> {
        match config.active_payment_provider.as_str() {
            "paystack" => Arc::new(ProviderGateway::new(
                Provider::Paystack,
                config.paystack_secret_key.clone(),
                config.payment_redirect_url.clone(),
            )),
            "flutterwave" => Arc::new(ProviderGateway::new(
                Provider::Flutterwave,
                config.flutterwave_secret_key.clone(),
                config.payment_redirect_url.clone(),
            )),
            "manual" => Arc::new(ManualGateway),
            other => {
                tracing::warn!("Unknown payment provider '{}', falling back to manual", other);
                Arc::new(ManualGateway)
            }
        }
    }
}
