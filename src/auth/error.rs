use thiserror::Error;

use super::codec::CodecError;
use crate::db::dao::DaoLayerError;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("invalid token")]
    InvalidToken,
    #[error("expired token")]
    ExpiredToken,
    #[error("revoked token")]
    TokenRevoked,
    #[error("refresh token reused")]
    TokenReused,
    #[error("token signing failed: {0}")]
    Signing(String),
    #[error(transparent)]
    Storage(#[from] DaoLayerError),
}

impl AuthError {
    /// Stable label for logs. Clients only ever see a generic message.
    pub fn kind(&self) -> &'static str {
        match self {
            AuthError::InvalidCredentials => "invalid_credentials",
            AuthError::InvalidToken => "invalid_token",
            AuthError::ExpiredToken => "expired_token",
            AuthError::TokenRevoked => "token_revoked",
            AuthError::TokenReused => "token_reused",
            AuthError::Signing(_) => "signing",
            AuthError::Storage(_) => "storage",
        }
    }
}

impl From<CodecError> for AuthError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::Expired => AuthError::ExpiredToken,
            CodecError::InvalidSignature | CodecError::Malformed => AuthError::InvalidToken,
            CodecError::Signing(reason) => AuthError::Signing(reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::AuthError;
    use crate::auth::codec::CodecError;

    #[test]
    fn codec_failures_map_onto_the_taxonomy() {
        assert!(matches!(
            AuthError::from(CodecError::Expired),
            AuthError::ExpiredToken
        ));
        assert!(matches!(
            AuthError::from(CodecError::InvalidSignature),
            AuthError::InvalidToken
        ));
        assert!(matches!(
            AuthError::from(CodecError::Malformed),
            AuthError::InvalidToken
        ));
        assert_eq!(AuthError::TokenReused.kind(), "token_reused");
    }
}
