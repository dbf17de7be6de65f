pub mod amount;
pub mod lenient;
pub mod units;
