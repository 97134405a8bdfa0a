use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::listingmodel::{ListingCategory, ListingStatus};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateListingDto {
    #[validate(length(min = 3, max = 200, message = "Title must be between 3 and 200 characters"))]
    pub title: String,

    #[validate(length(max = 5000, message = "Description is too long"))]
    pub description: Option<String>,

    pub category: ListingCategory,

    #[validate(range(min = 0, message = "Price cannot be negative"))]
    pub price: i64,

    #[validate(length(equal = 3, message = "Currency must be a 3 letter code"))]
    pub currency: Option<String>,

    #[validate(length(min = 2, max = 255, message = "Location is required"))]
    pub location: String,

    #[serde(default)]
    pub visit_fee_enabled: bool,

    #[validate(range(min = 0, max = 1000000, message = "Visit fee must be between 0 and 1,000,000"))]
    pub visit_fee_amount: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateListingDto {
    #[validate(length(min = 3, max = 200, message = "Title must be between 3 and 200 characters"))]
    pub title: Option<String>,

    #[validate(length(max = 5000, message = "Description is too long"))]
    pub description: Option<String>,

    #[validate(range(min = 0, message = "Price cannot be negative"))]
    pub price: Option<i64>,

    #[validate(length(min = 2, max = 255))]
    pub location: Option<String>,

    pub status: Option<ListingStatus>,

    pub visit_fee_enabled: Option<bool>,

    #[validate(range(min = 0, max = 1000000, message = "Visit fee must be between 0 and 1,000,000"))]
    pub visit_fee_amount: Option<i64>,
}

#[derive(Debug, Default, Serialize, Deserialize, Validate)]
pub struct ListingQueryDto {
    pub category: Option<ListingCategory>,
    pub status: Option<ListingStatus>,
    pub promoted: Option<bool>,
    #[validate(range(min = 1))]
    pub page: Option<usize>,
    #[validate(range(min = 1, max = 50))]
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct UploadMediaDto {
    #[validate(length(min = 1, max = 120, message = "File name is required"))]
    pub file_name: String,

    #[validate(custom = "validate_image_content_type")]
    pub content_type: String,

    /// Base64 encoded file body
    #[validate(length(min = 1, message = "File data is required"))]
    pub data: String,
}

fn validate_image_content_type(content_type: &str) -> Result<(), validator::ValidationError> {
    match content_type {
        "image/jpeg" | "image/png" | "image/webp" => Ok(()),
        _ => Err(validator::ValidationError::new("content_type must be image/jpeg, image/png or image/webp")),
    }
}
