pub mod ad_service;
pub mod background_jobs;
pub mod error;
pub mod media_storage;
pub mod payment_provider;
pub mod promotion_service;
pub mod side_effects;
pub mod visit_service;
