pub mod ads;
pub mod auth;
pub mod listings;
pub mod payments;
pub mod promotions;
pub mod visits;
pub mod wallet;
