pub mod money;
pub mod password;
pub mod token;
