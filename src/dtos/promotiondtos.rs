use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::dtos::paymentdtos::PaymentDetailsDto;
use crate::models::paymentmodel::PaymentMethod;
use crate::models::promotionmodel::ReviewAction;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PurchasePromotionDto {
    #[validate(required(message = "listing_id is required"))]
    pub listing_id: Option<Uuid>,

    #[validate(required(message = "package_id is required"))]
    pub package_id: Option<Uuid>,

    #[validate(required(message = "payment_method is required"))]
    pub payment_method: Option<PaymentMethod>,

    #[serde(flatten)]
    #[validate]
    pub payment_details: PaymentDetailsDto,
}

/// Body of the admin review endpoints. `action` stays a string so an unknown
/// value is reported as a 400 instead of a deserialization failure.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ReviewPromotionDto {
    #[validate(required(message = "promotion_id is required"))]
    pub promotion_id: Option<Uuid>,

    #[validate(required(message = "action is required"))]
    pub action: Option<String>,

    #[validate(length(max = 1000, message = "Admin notes are too long"))]
    pub admin_notes: Option<String>,
}

pub fn parse_review_action(action: &str) -> Option<ReviewAction> {
    match action.trim().to_ascii_lowercase().as_str() {
        "approve" => Some(ReviewAction::Approve),
        "reject" => Some(ReviewAction::Reject),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn review_actions() {
        assert_eq!(parse_review_action("approve"), Some(ReviewAction::Approve));
        assert_eq!(parse_review_action(" Reject "), Some(ReviewAction::Reject));
        assert_eq!(parse_review_action("archive"), None);
    }

    #[test]
    fn purchase_requires_package() {
        let dto: PurchasePromotionDto = serde_json::from_value(serde_json::json!({
            "listing_id": Uuid::nil(),
            "payment_method": "card"
        }))
        .unwrap();
        let errors = dto.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("package_id"));
    }
}
