pub mod config;
pub mod db;
pub mod dtos;
pub mod error;
pub mod handler;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod service;
pub mod utils;

use std::sync::Arc;

use config::Config;
use db::db::DBClient;
use service::{
    ad_service::AdService,
    media_storage::MediaStorage,
    payment_provider::PaymentGateway,
    promotion_service::PromotionService,
    side_effects::SideEffectQueue,
    visit_service::VisitService,
};

#[derive(Clone)]
pub struct AppState {
    pub env: Config,
    pub db_client: Arc<DBClient>,
    pub payment_gateway: Arc<dyn PaymentGateway>,
    pub side_effects: SideEffectQueue,
    pub media_storage: MediaStorage,
    // Services
    pub visit_service: Arc<VisitService>,
    pub promotion_service: Arc<PromotionService>,
    pub ad_service: Arc<AdService>,
}

impl AppState {
    pub fn new(
        config: Config,
        db_client: Arc<DBClient>,
        payment_gateway: Arc<dyn PaymentGateway>,
        side_effects: SideEffectQueue,
    ) -> Self {
        let visit_service = Arc::new(VisitService::new(
            db_client.clone(),
            payment_gateway.clone(),
            side_effects.clone(),
        ));
        let promotion_service = Arc::new(PromotionService::new(
            db_client.clone(),
            payment_gateway.clone(),
            side_effects.clone(),
        ));
        let ad_service = Arc::new(AdService::new(
            db_client.clone(),
            payment_gateway.clone(),
            side_effects.clone(),
            config.default_currency.clone(),
        ));
        let media_storage = MediaStorage::new(&config);

        Self {
            env: config,
            db_client,
            payment_gateway,
            side_effects,
            media_storage,
            visit_service,
            promotion_service,
            ad_service,
        }
    }
}
