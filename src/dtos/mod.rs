pub mod addtos;
pub mod listingdtos;
pub mod paymentdtos;
pub mod promotiondtos;
pub mod userdtos;
pub mod visitdtos;
pub mod walletdtos;
