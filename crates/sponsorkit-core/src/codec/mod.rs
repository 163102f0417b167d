pub mod abi;
pub mod crypto;
pub mod transaction;

pub use abi::{owner_salt, CallData, EncodedCall};
pub use transaction::{Clause, TransactionBody};
