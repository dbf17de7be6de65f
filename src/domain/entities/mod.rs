pub mod account;
pub mod order;
pub mod position;
pub mod transaction;
