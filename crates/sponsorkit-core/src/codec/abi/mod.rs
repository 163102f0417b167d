pub mod bindings;
pub mod encoding;

pub use bindings::{owner_salt, ExecuteWithAuthorization, IAccountFactory, ISmartAccount};
pub use encoding::{decode_address_word, parse_function, CallData, EncodedCall};
