use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::dtos::paymentdtos::PaymentDetailsDto;
use crate::models::paymentmodel::PaymentMethod;
use crate::models::visitmodel::VisitStatus;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateVisitRequestDto {
    #[validate(required(message = "listing_id is required"))]
    pub listing_id: Option<Uuid>,

    #[validate(required(message = "payment_method is required"))]
    pub payment_method: Option<PaymentMethod>,

    #[serde(flatten)]
    #[validate]
    pub payment_details: PaymentDetailsDto,

    pub preferred_date: Option<DateTime<Utc>>,

    #[validate(length(max = 1000, message = "Message is too long"))]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct VisitRequestIdDto {
    #[validate(required(message = "visit_request_id is required"))]
    pub visit_request_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ConfirmVisitPaymentDto {
    #[validate(required(message = "visit_request_id is required"))]
    pub visit_request_id: Option<Uuid>,

    /// Receipt number or transaction hash for out-of-band payments
    #[validate(length(min = 4, max = 255, message = "gateway_reference is invalid"))]
    pub gateway_reference: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AdminCancelVisitDto {
    #[validate(required(message = "visit_request_id is required"))]
    pub visit_request_id: Option<Uuid>,

    #[validate(length(max = 500, message = "Reason is too long"))]
    pub reason: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct VisitAdminQueryDto {
    pub status: Option<VisitStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_listing_is_a_validation_error() {
        let dto: CreateVisitRequestDto =
            serde_json::from_value(serde_json::json!({ "payment_method": "card" })).unwrap();
        let errors = dto.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("listing_id"));
    }

    #[test]
    fn payment_details_flatten_from_top_level() {
        let dto: CreateVisitRequestDto = serde_json::from_value(serde_json::json!({
            "listing_id": Uuid::nil(),
            "payment_method": "mobile_money",
            "phone_number": "+237677123456"
        }))
        .unwrap();
        assert_eq!(dto.payment_details.phone_number.as_deref(), Some("+237677123456"));
        assert!(dto.validate().is_ok());
    }

    #[test]
    fn bad_phone_fails_nested_validation() {
        let dto: CreateVisitRequestDto = serde_json::from_value(serde_json::json!({
            "listing_id": Uuid::nil(),
            "payment_method": "mobile_money",
            "phone_number": "abc"
        }))
        .unwrap();
        assert!(dto.validate().is_err());
    }
}
