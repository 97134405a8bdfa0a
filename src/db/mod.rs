pub mod addb;
pub mod db;
pub mod listingdb;
pub mod notificationdb;
pub mod paymentdb;
pub mod promotiondb;
pub mod userdb;
pub mod visitdb;
pub mod walletdb;
