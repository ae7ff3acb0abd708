use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;
use uuid::Uuid;

use super::{AccessClaims, IssuedToken, RefreshClaims, Role};
use crate::config::AuthConfig;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("token signature is invalid")]
    InvalidSignature,
    #[error("token is malformed")]
    Malformed,
    #[error("token has expired")]
    Expired,
    #[error("token signing failed: {0}")]
    Signing(String),
}

impl From<jsonwebtoken::errors::Error> for CodecError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::InvalidSignature => CodecError::InvalidSignature,
            ErrorKind::ExpiredSignature => CodecError::Expired,
            _ => CodecError::Malformed,
        }
    }
}

#[derive(Clone)]
pub struct JwtKeys {
    enc: EncodingKey,
    dec: DecodingKey,
}

impl JwtKeys {
    pub fn from_secret(secret: &[u8]) -> Self {
        Self {
            enc: EncodingKey::from_secret(secret),
            dec: DecodingKey::from_secret(secret),
        }
    }
}

/// Signs and verifies both token kinds. Access and refresh tokens use separate keys.
#[derive(Clone)]
pub struct TokenCodec {
    access: JwtKeys,
    refresh: JwtKeys,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenCodec {
    pub fn new(cfg: &AuthConfig) -> Self {
        Self {
            access: JwtKeys::from_secret(cfg.access_token_secret.as_bytes()),
            refresh: JwtKeys::from_secret(cfg.refresh_token_secret.as_bytes()),
            access_ttl: Duration::seconds(cfg.access_token_ttl_secs),
            refresh_ttl: Duration::seconds(cfg.refresh_token_ttl_secs),
        }
    }

    pub fn access_ttl_secs(&self) -> i64 {
        self.access_ttl.num_seconds()
    }

    pub fn issue_access_token(&self, user_id: Uuid, role: Role) -> Result<IssuedToken, CodecError> {
        let now = Utc::now();
        let expires_at = now + self.access_ttl;
        let claims = AccessClaims {
            sub: user_id.to_string(),
            role,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };
        Ok(IssuedToken {
            token: self.sign_access(&claims)?,
            expires_at: truncate_to_secs(expires_at),
        })
    }

    pub fn issue_refresh_token(
        &self,
        user_id: Uuid,
        family: Uuid,
        token_id: Uuid,
    ) -> Result<IssuedToken, CodecError> {
        let now = Utc::now();
        let expires_at = now + self.refresh_ttl;
        let claims = RefreshClaims {
            sub: user_id.to_string(),
            family,
            jti: token_id,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };
        Ok(IssuedToken {
            token: self.sign_refresh(&claims)?,
            expires_at: truncate_to_secs(expires_at),
        })
    }

    pub fn sign_access(&self, claims: &AccessClaims) -> Result<String, CodecError> {
        sign(&self.access, claims)
    }

    pub fn sign_refresh(&self, claims: &RefreshClaims) -> Result<String, CodecError> {
        sign(&self.refresh, claims)
    }

    pub fn verify_access(&self, token: &str) -> Result<AccessClaims, CodecError> {
        verify(&self.access, token)
    }

    pub fn verify_refresh(&self, token: &str) -> Result<RefreshClaims, CodecError> {
        verify(&self.refresh, token)
    }
}

fn sign<T: Serialize>(keys: &JwtKeys, claims: &T) -> Result<String, CodecError> {
    let mut header = Header::new(Algorithm::HS256);
    header.typ = Some("JWT".into());

    encode(&header, claims, &keys.enc).map_err(|err| CodecError::Signing(err.to_string()))
}

fn verify<T: DeserializeOwned + Clone>(keys: &JwtKeys, token: &str) -> Result<T, CodecError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    validation.validate_exp = true;
    let data = decode::<T>(token, &keys.dec, &validation)?;
    Ok(data.claims)
}

// Claims carry whole seconds; keep the record's expiry on the same boundary.
fn truncate_to_secs(at: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp(at.timestamp(), 0).unwrap_or(at)
}
