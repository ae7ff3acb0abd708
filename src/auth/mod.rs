pub mod accounts;
pub mod bootstrap;
pub mod codec;
mod error;
pub mod password;
pub mod store;
mod types;

pub use accounts::{Accounts, LocalAccounts};
pub use codec::{CodecError, TokenCodec};
pub use error::AuthError;
pub use types::{
    AccessClaims, AccountInfo, IssuedToken, RefreshClaims, RequestMeta, Role, TokenPair,
};
