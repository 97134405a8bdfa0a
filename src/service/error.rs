use axum::http::StatusCode;
use thiserror::Error;
use uuid::Uuid;

use crate::{
    error::HttpError,
    models::{admodel::CampaignStatus, promotionmodel::PromotionStatus, visitmodel::VisitStatus},
};

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Visit request {0} not found")]
    VisitNotFound(Uuid),

    #[error("Listing {0} not found")]
    ListingNotFound(Uuid),

    #[error("Promotion {0} not found")]
    PromotionNotFound(Uuid),

    #[error("Promotion package not found or inactive")]
    PackageNotFound(Uuid),

    #[error("Ad campaign {0} not found")]
    CampaignNotFound(Uuid),

    #[error("Visit fees are not enabled for this listing")]
    VisitFeesDisabled(Uuid),

    #[error("Visit request {0} is {1:?}; this action is not allowed")]
    InvalidVisitStatus(Uuid, VisitStatus),

    #[error("Payout for visit request {0} has already been released")]
    PayoutAlreadyReleased(Uuid),

    #[error("Promotion {0} is {1:?}; only pending promotions can be reviewed")]
    InvalidPromotionStatus(Uuid, PromotionStatus),

    #[error("Ad campaign {0} is {1:?}; only pending campaigns can be reviewed")]
    InvalidCampaignStatus(Uuid, CampaignStatus),

    #[error("You do not own listing {0}")]
    NotListingOwner(Uuid),

    #[error("An active promotion with this package already exists for the listing")]
    ActivePromotionExists,

    #[error("Payment {0} has not been confirmed by the gateway")]
    PaymentNotConfirmed(String),

    #[error("Seller wallet holds {wallet_currency}; a {payout_currency} payout cannot be credited")]
    CurrencyMismatch {
        wallet_currency: String,
        payout_currency: String,
    },

    #[error("Payment error: {0}")]
    Payment(String),

    #[error("{0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Other error: {0}")]
    Other(String),
}

impl From<ServiceError> for HttpError {
    fn from(error: ServiceError) -> Self {
        match error.status_code() {
            StatusCode::NOT_FOUND => HttpError::not_found(error.to_string()),
            StatusCode::BAD_REQUEST => HttpError::bad_request(error.to_string()),
            StatusCode::FORBIDDEN => HttpError::forbidden(error.to_string()),
            _ => HttpError::server_error(error.to_string()),
        }
    }
}

impl From<String> for ServiceError {
    fn from(err: String) -> Self {
        ServiceError::Other(err)
    }
}

impl ServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::VisitNotFound(_)
            | ServiceError::ListingNotFound(_)
            | ServiceError::PromotionNotFound(_)
            | ServiceError::PackageNotFound(_)
            | ServiceError::CampaignNotFound(_) => StatusCode::NOT_FOUND,

            ServiceError::VisitFeesDisabled(_)
            | ServiceError::InvalidVisitStatus(_, _)
            | ServiceError::PayoutAlreadyReleased(_)
            | ServiceError::InvalidPromotionStatus(_, _)
            | ServiceError::InvalidCampaignStatus(_, _)
            | ServiceError::ActivePromotionExists
            | ServiceError::PaymentNotConfirmed(_)
            | ServiceError::CurrencyMismatch { .. }
            | ServiceError::Payment(_)
            | ServiceError::Validation(_) => StatusCode::BAD_REQUEST,

            ServiceError::NotListingOwner(_) => StatusCode::FORBIDDEN,

            ServiceError::Database(_) | ServiceError::Other(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_domain_errors_to_statuses() {
        let id = Uuid::new_v4();
        assert_eq!(ServiceError::VisitNotFound(id).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            ServiceError::PayoutAlreadyReleased(id).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ServiceError::NotListingOwner(id).status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            ServiceError::CurrencyMismatch {
                wallet_currency: "XAF".to_string(),
                payout_currency: "NGN".to_string(),
            }
            .status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServiceError::Database(sqlx::Error::RowNotFound).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn http_error_keeps_status() {
        let err: HttpError = ServiceError::ActivePromotionExists.into();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);

        let err: HttpError = ServiceError::Other("boom".to_string()).into();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
