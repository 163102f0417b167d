pub mod cost;
pub mod types;

pub use cost::{intrinsic_gas, total_gas};
pub use types::{BodyOptions, Clause, TransactionBody};
