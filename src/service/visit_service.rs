// service/visit_service.rs
use std::sync::Arc;

use uuid::Uuid;

use crate::{
    db::{
        db::DBClient,
        listingdb::ListingExt,
        paymentdb::{NewPaymentTransaction, PaymentExt},
        visitdb::{NewVisitRequest, PayoutRelease, VisitExt},
    },
    dtos::{paymentdtos::PaymentSummaryDto, visitdtos::CreateVisitRequestDto},
    models::{
        paymentmodel::{generate_payment_reference, PaymentPurpose, PaymentTransaction},
        usermodel::User,
        visitmodel::{PayoutStatus, VisitRequest, VisitRequestWithListing, VisitStatus},
    },
    service::{
        error::ServiceError,
        payment_provider::{GatewayStatus, PaymentGateway, PaymentRequest, RefundRequest},
        side_effects::{SideEffect, SideEffectQueue},
    },
    utils::money::{format_amount, split_visit_fee},
};

/// Allowed moves of a visit request. Released and cancelled are terminal.
pub fn is_valid_transition(from: VisitStatus, to: VisitStatus) -> bool {
    if from.is_terminal() {
        return false;
    }
    matches!(
        (from, to),
        (VisitStatus::PendingPayment, VisitStatus::Paid)
            | (VisitStatus::PendingPayment, VisitStatus::Cancelled)
            | (VisitStatus::Paid, VisitStatus::Released)
            | (VisitStatus::Paid, VisitStatus::Cancelled)
    )
}

#[derive(Clone)]
pub struct VisitService {
    db_client: Arc<DBClient>,
    gateway: Arc<dyn PaymentGateway>,
    side_effects: SideEffectQueue,
}

impl VisitService {
    pub fn new(
        db_client: Arc<DBClient>,
        gateway: Arc<dyn PaymentGateway>,
        side_effects: SideEffectQueue,
    ) -> Self {
        Self {
            db_client,
            gateway,
            side_effects,
        }
    }

    pub async fn create_visit_request(
        &self,
        buyer: &User,
        body: CreateVisitRequestDto,
    ) -> Result<(VisitRequest, PaymentSummaryDto), ServiceError> {
        let listing_id = body
            .listing_id
            .ok_or_else(|| ServiceError::Validation("listing_id is required".to_string()))?;
        let payment_method = body
            .payment_method
            .ok_or_else(|| ServiceError::Validation("payment_method is required".to_string()))?;

        let listing = self
            .db_client
            .get_listing(listing_id)
            .await?
            .ok_or(ServiceError::ListingNotFound(listing_id))?;

        let visit_fee = listing
            .effective_visit_fee()
            .ok_or(ServiceError::VisitFeesDisabled(listing.id))?;

        if listing.is_owned_by(buyer.id) {
            return Err(ServiceError::Validation(
                "You cannot request a visit to your own listing".to_string(),
            ));
        }
        if !self.gateway.supports(payment_method) {
            return Err(ServiceError::Validation(format!(
                "Payment method {} is not supported",
                payment_method.to_str()
            )));
        }
        body.payment_details
            .check_for(payment_method)
            .map_err(ServiceError::Validation)?;

        let split = split_visit_fee(visit_fee);
        let reference = generate_payment_reference(PaymentPurpose::VisitFee);

        let initiation = self
            .gateway
            .initiate_payment(PaymentRequest {
                reference: reference.clone(),
                amount: split.visit_fee_amount,
                currency: listing.currency.clone(),
                payment_method,
                customer_email: buyer.email.clone(),
                customer_phone: body.payment_details.phone_number.clone(),
                description: format!("Visit fee for {}", listing.title),
                metadata: Some(serde_json::json!({
                    "listing_id": listing.id,
                    "buyer_id": buyer.id,
                    "purpose": "visit_fee",
                })),
            })
            .await;

        if !initiation.success {
            return Err(ServiceError::Payment(
                initiation
                    .error
                    .unwrap_or_else(|| "Payment initiation failed".to_string()),
            ));
        }

        let payment_details = body.payment_details.to_json();

        // The visit is still created when the payment record cannot be written
        let transaction: Option<PaymentTransaction> = match self
            .db_client
            .create_payment_transaction(NewPaymentTransaction {
                user_id: buyer.id,
                amount: split.visit_fee_amount,
                currency: listing.currency.clone(),
                payment_method,
                purpose: PaymentPurpose::VisitFee,
                our_reference: reference.clone(),
                gateway_reference: initiation.gateway_reference.clone(),
                metadata: Some(payment_details.clone()),
            })
            .await
        {
            Ok(transaction) => Some(transaction),
            Err(e) => {
                tracing::error!("Failed to record payment transaction {}: {}", reference, e);
                None
            }
        };

        let visit = self
            .db_client
            .create_visit_request(NewVisitRequest {
                listing_id: listing.id,
                buyer_id: buyer.id,
                seller_id: listing.seller_id,
                visit_fee_amount: split.visit_fee_amount,
                platform_fee: split.platform_fee,
                seller_payout: split.seller_payout,
                currency: listing.currency.clone(),
                payment_method,
                payment_reference: reference,
                payment_transaction_id: transaction.as_ref().map(|t| t.id),
                payment_details: Some(payment_details),
                preferred_date: body.preferred_date,
                message: body.message,
            })
            .await?;

        tracing::info!(
            "Visit request {} created for listing {} by buyer {}",
            visit.id,
            listing.id,
            buyer.id
        );

        self.side_effects.enqueue(SideEffect::notify(
            listing.seller_id,
            "visit_requested",
            format!("{} requested a visit to \"{}\"", buyer.name, listing.title),
            serde_json::json!({ "visit_request_id": visit.id, "listing_id": listing.id }),
        ));

        let payment = PaymentSummaryDto::from_initiation(
            &initiation,
            transaction.as_ref(),
            visit.visit_fee_amount,
            &visit.currency,
            payment_method,
        );

        Ok((visit, payment))
    }

    pub async fn buyer_visits(&self, buyer_id: Uuid) -> Result<Vec<VisitRequest>, ServiceError> {
        Ok(self.db_client.get_buyer_visit_requests(buyer_id).await?)
    }

    pub async fn admin_visits(
        &self,
        status: Option<VisitStatus>,
    ) -> Result<Vec<VisitRequestWithListing>, ServiceError> {
        Ok(self.db_client.get_visit_requests_admin(status).await?)
    }

    async fn load(&self, visit_id: Uuid) -> Result<VisitRequest, ServiceError> {
        self.db_client
            .get_visit_request(visit_id)
            .await?
            .ok_or(ServiceError::VisitNotFound(visit_id))
    }

    /// Reports the state that made a conditional update miss.
    async fn stale_status(&self, visit_id: Uuid) -> ServiceError {
        match self.load(visit_id).await {
            Ok(visit) => ServiceError::InvalidVisitStatus(visit.id, visit.status),
            Err(e) => e,
        }
    }

    pub async fn cancel_by_buyer(
        &self,
        buyer_id: Uuid,
        visit_id: Uuid,
    ) -> Result<VisitRequest, ServiceError> {
        let visit = self.load(visit_id).await?;
        if visit.buyer_id != buyer_id {
            return Err(ServiceError::VisitNotFound(visit_id));
        }
        if visit.status != VisitStatus::PendingPayment {
            return Err(ServiceError::InvalidVisitStatus(visit.id, visit.status));
        }

        match self
            .db_client
            .cancel_visit_request(
                visit.id,
                VisitStatus::PendingPayment,
                Some("Cancelled by buyer".to_string()),
                false,
            )
            .await?
        {
            Some(visit) => Ok(visit),
            None => Err(self.stale_status(visit_id).await),
        }
    }

    pub async fn confirm_payment(
        &self,
        admin_id: Uuid,
        visit_id: Uuid,
        gateway_reference: Option<String>,
    ) -> Result<VisitRequest, ServiceError> {
        let visit = self.load(visit_id).await?;
        if !is_valid_transition(visit.status, VisitStatus::Paid) {
            return Err(ServiceError::InvalidVisitStatus(visit.id, visit.status));
        }

        let evidence = if self.gateway.is_out_of_band(visit.payment_method) {
            gateway_reference.ok_or_else(|| {
                ServiceError::PaymentNotConfirmed(visit.payment_reference.clone())
            })?
        } else {
            let verification = self
                .gateway
                .verify_payment(visit.payment_method, &visit.payment_reference)
                .await
                .map_err(|e| ServiceError::Payment(e.to_string()))?;
            if verification.status != GatewayStatus::Completed {
                return Err(ServiceError::PaymentNotConfirmed(
                    visit.payment_reference.clone(),
                ));
            }
            if let Some(amount) = verification.amount {
                if amount < visit.visit_fee_amount {
                    return Err(ServiceError::Payment(format!(
                        "Gateway reports {} but the visit fee is {}",
                        format_amount(amount, &visit.currency),
                        format_amount(visit.visit_fee_amount, &visit.currency)
                    )));
                }
            }
            verification
                .gateway_reference
                .or(gateway_reference)
                .unwrap_or_default()
        };

        let evidence = (!evidence.is_empty()).then_some(evidence);
        let paid = match self
            .db_client
            .mark_visit_paid(visit.id, Some(admin_id), evidence)
            .await?
        {
            Some(visit) => visit,
            None => return Err(self.stale_status(visit_id).await),
        };

        tracing::info!("Visit request {} marked paid by admin {}", paid.id, admin_id);
        self.notify_paid(&paid);
        Ok(paid)
    }

    /// Webhook path: the gateway itself reported the payment as completed.
    pub async fn settle_from_gateway(
        &self,
        payment_reference: &str,
        gateway_reference: Option<String>,
    ) -> Result<Option<VisitRequest>, ServiceError> {
        let Some(visit) = self
            .db_client
            .get_visit_request_by_reference(payment_reference)
            .await?
        else {
            return Ok(None);
        };

        let paid = self
            .db_client
            .mark_visit_paid(visit.id, None, gateway_reference)
            .await?;
        if let Some(paid) = &paid {
            tracing::info!("Visit request {} paid via gateway webhook", paid.id);
            self.notify_paid(paid);
        }
        Ok(paid)
    }

    fn notify_paid(&self, visit: &VisitRequest) {
        self.side_effects.enqueue(SideEffect::notify(
            visit.seller_id,
            "visit_paid",
            format!(
                "A visit fee of {} has been paid and is held in escrow",
                format_amount(visit.visit_fee_amount, &visit.currency)
            ),
            serde_json::json!({ "visit_request_id": visit.id }),
        ));
    }

    pub async fn release_payout(
        &self,
        admin_id: Uuid,
        visit_id: Uuid,
    ) -> Result<VisitRequest, ServiceError> {
        match self.db_client.release_visit_payout(visit_id, admin_id).await? {
            PayoutRelease::Released(visit) => {
                tracing::info!(
                    "Released payout of {} for visit {} to seller {}",
                    visit.seller_payout,
                    visit.id,
                    visit.seller_id
                );
                self.side_effects.enqueue(SideEffect::notify(
                    visit.seller_id,
                    "payout_released",
                    format!(
                        "{} has been credited to your wallet",
                        format_amount(visit.seller_payout, &visit.currency)
                    ),
                    serde_json::json!({ "visit_request_id": visit.id }),
                ));
                Ok(visit)
            }
            PayoutRelease::NotFound => Err(ServiceError::VisitNotFound(visit_id)),
            PayoutRelease::AlreadyReleased => Err(ServiceError::PayoutAlreadyReleased(visit_id)),
            PayoutRelease::NotPaid(status) => Err(ServiceError::InvalidVisitStatus(visit_id, status)),
            PayoutRelease::CurrencyMismatch {
                wallet_currency,
                payout_currency,
            } => Err(ServiceError::CurrencyMismatch {
                wallet_currency,
                payout_currency,
            }),
        }
    }

    async fn refund(
        &self,
        visit: &VisitRequest,
        reason: Option<String>,
    ) -> Result<(), ServiceError> {
        let gateway_reference = self
            .db_client
            .get_payment_by_reference(&visit.payment_reference)
            .await?
            .and_then(|payment| payment.gateway_reference);

        let outcome = self
            .gateway
            .refund_payment(
                visit.payment_method,
                RefundRequest {
                    reference: visit.payment_reference.clone(),
                    gateway_reference,
                    amount: visit.visit_fee_amount,
                    currency: visit.currency.clone(),
                    reason,
                },
            )
            .await
            .map_err(|e| ServiceError::Payment(e.to_string()))?;

        if !outcome.success {
            return Err(ServiceError::Payment(
                outcome.error.unwrap_or_else(|| "Refund failed".to_string()),
            ));
        }
        Ok(())
    }

    pub async fn admin_cancel(
        &self,
        admin_id: Uuid,
        visit_id: Uuid,
        reason: Option<String>,
    ) -> Result<VisitRequest, ServiceError> {
        let visit = self.load(visit_id).await?;
        if !is_valid_transition(visit.status, VisitStatus::Cancelled)
            || visit.payout_status != PayoutStatus::Pending
        {
            return Err(ServiceError::InvalidVisitStatus(visit.id, visit.status));
        }

        let refund = visit.status == VisitStatus::Paid;

        // Claim the visit before any money moves so a concurrent release sees it cancelled.
        let cancelled = match self
            .db_client
            .cancel_visit_request(visit.id, visit.status, reason.clone(), refund)
            .await?
        {
            Some(visit) => visit,
            None => return Err(self.stale_status(visit_id).await),
        };

        if refund {
            if let Err(e) = self.refund(&cancelled, reason).await {
                tracing::error!(
                    "Refund for visit request {} failed, restoring escrow: {}",
                    cancelled.id,
                    e
                );
                if self.db_client.restore_paid_visit(cancelled.id).await?.is_none() {
                    tracing::error!(
                        "Visit request {} could not be restored after a failed refund",
                        cancelled.id
                    );
                }
                return Err(e);
            }
        }

        tracing::info!(
            "Visit request {} cancelled by admin {} (refunded: {})",
            cancelled.id,
            admin_id,
            refund
        );

        self.side_effects.enqueue(SideEffect::notify(
            cancelled.buyer_id,
            "visit_cancelled",
            if refund {
                format!(
                    "Your visit request was cancelled and {} is being refunded",
                    format_amount(cancelled.visit_fee_amount, &cancelled.currency)
                )
            } else {
                "Your visit request was cancelled".to_string()
            },
            serde_json::json!({ "visit_request_id": cancelled.id }),
        ));

        Ok(cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_forward_transitions_are_allowed() {
        assert!(is_valid_transition(VisitStatus::PendingPayment, VisitStatus::Paid));
        assert!(is_valid_transition(VisitStatus::Paid, VisitStatus::Released));
        assert!(is_valid_transition(VisitStatus::Paid, VisitStatus::Cancelled));

        assert!(!is_valid_transition(VisitStatus::PendingPayment, VisitStatus::Released));
        assert!(!is_valid_transition(VisitStatus::Released, VisitStatus::Released));
        assert!(!is_valid_transition(VisitStatus::Released, VisitStatus::Cancelled));
        assert!(!is_valid_transition(VisitStatus::Cancelled, VisitStatus::Paid));
    }

    #[test]
    fn terminal_states_have_no_exit() {
        for from in [VisitStatus::Released, VisitStatus::Cancelled] {
            assert!(from.is_terminal());
            for to in [
                VisitStatus::PendingPayment,
                VisitStatus::Paid,
                VisitStatus::Released,
                VisitStatus::Cancelled,
            ] {
                assert!(!is_valid_transition(from, to));
            }
        }
    }
}
