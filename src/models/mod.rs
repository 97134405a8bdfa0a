pub mod admodel;
pub mod listingmodel;
pub mod notificationmodel;
pub mod paymentmodel;
pub mod promotionmodel;
pub mod usermodel;
pub mod visitmodel;
pub mod walletmodels;
