// service/promotion_service.rs
use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::{
    db::{
        db::DBClient,
        paymentdb::{NewPaymentTransaction, PaymentExt},
        promotiondb::{self, NewListingPromotion, PromotionExt},
    },
    dtos::{paymentdtos::PaymentSummaryDto, promotiondtos::PurchasePromotionDto},
    models::{
        paymentmodel::{generate_payment_reference, PaymentPurpose},
        promotionmodel::{ListingPromotion, PendingPromotionRow, PromotionPackage, PromotionStatus, ReviewAction},
        usermodel::User,
    },
    service::{
        error::ServiceError,
        payment_provider::{PaymentGateway, PaymentRequest},
        side_effects::{SideEffect, SideEffectQueue},
    },
};

#[derive(Clone)]
pub struct PromotionService {
    db_client: Arc<DBClient>,
    gateway: Arc<dyn PaymentGateway>,
    side_effects: SideEffectQueue,
}

impl PromotionService {
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

    pub async fn packages(&self) -> Result<Vec<PromotionPackage>, ServiceError> {
        Ok(self.db_client.get_active_packages().await?)
    }

    pub async fn purchase(
        &self,
        seller: &User,
        body: PurchasePromotionDto,
    ) -> Result<(PaymentSummaryDto, ListingPromotion), ServiceError> {
        let (Some(listing_id), Some(package_id), Some(payment_method)) =
            (body.listing_id, body.package_id, body.payment_method)
        else {
            return Err(ServiceError::Validation(
                "listing_id, package_id and payment_method are required".to_string(),
            ));
        };

        let package = self
            .db_client
            .get_package(package_id)
            .await?
            .filter(|package| package.is_active)
            .ok_or(ServiceError::PackageNotFound(package_id))?;

        if !self.gateway.supports(payment_method) {
            return Err(ServiceError::Validation(format!(
                "Payment method {} is not supported",
                payment_method.to_str()
            )));
        }
        body.payment_details
            .check_for(payment_method)
            .map_err(ServiceError::Validation)?;

        // The listing lock covers the checks and the pending row, not the gateway call.
        let mut tx = self.db_client.pool.begin().await?;

        let listing = promotiondb::lock_listing(&mut *tx, listing_id)
            .await?
            .ok_or(ServiceError::ListingNotFound(listing_id))?;

        if !listing.is_owned_by(seller.id) {
            return Err(ServiceError::NotListingOwner(listing.id));
        }
        if promotiondb::has_active_promotion(&mut *tx, listing.id, package.id).await? {
            return Err(ServiceError::ActivePromotionExists);
        }

        let (starts_at, expires_at) = package.window_from(Utc::now());
        let promotion = promotiondb::insert_promotion(
            &mut *tx,
            NewListingPromotion {
                listing_id: listing.id,
                package_id: package.id,
                seller_id: seller.id,
                payment_transaction_id: None,
                starts_at,
                expires_at,
            },
        )
        .await?;
        tx.commit().await?;

        let reference = generate_payment_reference(PaymentPurpose::Promotion);
        let initiation = self
            .gateway
            .initiate_payment(PaymentRequest {
                reference: reference.clone(),
                amount: package.price,
                currency: package.currency.clone(),
                payment_method,
                customer_email: seller.email.clone(),
                customer_phone: body.payment_details.phone_number.clone(),
                description: format!("{} promotion for {}", package.name, listing.title),
                metadata: Some(serde_json::json!({
                    "listing_id": listing.id,
                    "package_id": package.id,
                    "promotion_id": promotion.id,
                    "purpose": "promotion",
                })),
            })
            .await;

        if !initiation.success {
            self.db_client.cancel_unpaid_promotion(promotion.id).await?;
            return Err(ServiceError::Payment(
                initiation
                    .error
                    .unwrap_or_else(|| "Payment initiation failed".to_string()),
            ));
        }

        let transaction = match self
            .db_client
            .create_payment_transaction(NewPaymentTransaction {
                user_id: seller.id,
                amount: package.price,
                currency: package.currency.clone(),
                payment_method,
                purpose: PaymentPurpose::Promotion,
                our_reference: reference.clone(),
                gateway_reference: initiation.gateway_reference.clone(),
                metadata: Some(body.payment_details.to_json()),
            })
            .await
        {
            Ok(transaction) => Some(transaction),
            Err(e) => {
                tracing::error!("Failed to record payment transaction {}: {}", reference, e);
                None
            }
        };

        let promotion = match &transaction {
            Some(transaction) => self
                .db_client
                .link_promotion_payment(promotion.id, transaction.id)
                .await?
                .unwrap_or(promotion),
            None => promotion,
        };

        tracing::info!(
            "Promotion {} ({}) created for listing {}",
            promotion.id,
            package.name,
            listing.id
        );

        let payment = PaymentSummaryDto::from_initiation(
            &initiation,
            transaction.as_ref(),
            package.price,
            &package.currency,
            payment_method,
        );

        Ok((payment, promotion))
    }

    pub async fn pending(&self) -> Result<Vec<PendingPromotionRow>, ServiceError> {
        Ok(self.db_client.get_pending_promotions().await?)
    }

    pub async fn review(
        &self,
        admin_id: Uuid,
        promotion_id: Uuid,
        action: ReviewAction,
        admin_notes: Option<String>,
    ) -> Result<ListingPromotion, ServiceError> {
        let promotion = self
            .db_client
            .get_promotion(promotion_id)
            .await?
            .ok_or(ServiceError::PromotionNotFound(promotion_id))?;

        if promotion.status != PromotionStatus::Pending {
            return Err(ServiceError::InvalidPromotionStatus(promotion.id, promotion.status));
        }

        let reviewed = match action {
            ReviewAction::Approve => {
                self.db_client
                    .approve_promotion(promotion.id, admin_id, admin_notes)
                    .await?
            }
            ReviewAction::Reject => {
                self.db_client
                    .reject_promotion(promotion.id, admin_id, admin_notes)
                    .await?
            }
        };

        let reviewed = match reviewed {
            Some(reviewed) => reviewed,
            None => {
                let current = self
                    .db_client
                    .get_promotion(promotion_id)
                    .await?
                    .ok_or(ServiceError::PromotionNotFound(promotion_id))?;
                return Err(ServiceError::InvalidPromotionStatus(current.id, current.status));
            }
        };

        tracing::info!(
            "Promotion {} {} by admin {}",
            reviewed.id,
            reviewed.status.to_str(),
            admin_id
        );

        let message = match action {
            ReviewAction::Approve => "Your listing promotion is now live",
            ReviewAction::Reject => "Your listing promotion was not approved",
        };
        self.side_effects.enqueue(SideEffect::notify(
            reviewed.seller_id,
            "promotion_reviewed",
            message,
            serde_json::json!({
                "promotion_id": reviewed.id,
                "listing_id": reviewed.listing_id,
                "status": reviewed.status.to_str(),
            }),
        ));

        Ok(reviewed)
    }

    pub async fn expire_due(&self) -> Result<u64, ServiceError> {
        Ok(self.db_client.expire_promotions().await?)
    }
}
