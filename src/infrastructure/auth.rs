use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::domain::DomainError;

pub fn hash_password(password: &str) -> Result<String, String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| e.to_string())?
        .to_string();
    Ok(password_hash)
}

pub fn verify_password(password: &str, password_hash: &str) -> Result<bool, String> {
    let parsed_hash = PasswordHash::new(password_hash).map_err(|e| e.to_string())?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Hash on the blocking pool.
pub async fn hash_password_blocking(password: String) -> Result<String, DomainError> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| DomainError::Internal(e.to_string()))?
        .map_err(DomainError::Internal)
}

pub async fn verify_password_blocking(
    password: String,
    password_hash: String,
) -> Result<bool, DomainError> {
    tokio::task::spawn_blocking(move || verify_password(&password, &password_hash))
        .await
        .map_err(|e| DomainError::Internal(e.to_string()))?
        .map_err(DomainError::Internal)
}

/// Claims of the short-lived access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    pub sub: String, // customer id
    pub name: String,
    pub exp: usize,
}

/// Claims of the long-lived refresh token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub sub: String, // customer id
    pub exp: usize,
}

impl RefreshClaims {
    pub fn customer_id(&self) -> Option<i32> {
        self.sub.parse().ok()
    }
}

impl AccessClaims {
    pub fn customer_id(&self) -> Option<i32> {
        self.sub.parse().ok()
    }
}

/// Issues and verifies the two customer session tokens.
pub struct TokenService {
    access_secret: String,
    refresh_secret: String,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenService {
    pub fn new(
        access_secret: String,
        refresh_secret: String,
        access_ttl: Duration,
        refresh_ttl: Duration,
    ) -> Self {
        Self {
            access_secret,
            refresh_secret,
            access_ttl,
            refresh_ttl,
        }
    }

    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }

    pub fn create_access_token(&self, customer_id: i32, name: &str) -> Result<String, String> {
        let claims = AccessClaims {
            sub: customer_id.to_string(),
            name: name.to_owned(),
            exp: expires_in(self.access_ttl),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.access_secret.as_bytes()),
        )
        .map_err(|e| e.to_string())
    }

    pub fn create_refresh_token(&self, customer_id: i32) -> Result<String, String> {
        let claims = RefreshClaims {
            sub: customer_id.to_string(),
            exp: expires_in(self.refresh_ttl),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.refresh_secret.as_bytes()),
        )
        .map_err(|e| e.to_string())
    }

    /// Signature and expiry failures are both reported as `Err`.
    pub fn decode_access_token(&self, token: &str) -> Result<AccessClaims, String> {
        decode::<AccessClaims>(
            token,
            &DecodingKey::from_secret(self.access_secret.as_bytes()),
            &Validation::default(),
        )
        .map(|data| data.claims)
        .map_err(|e| e.to_string())
    }

    pub fn decode_refresh_token(&self, token: &str) -> Result<RefreshClaims, String> {
        decode::<RefreshClaims>(
            token,
            &DecodingKey::from_secret(self.refresh_secret.as_bytes()),
            &Validation::default(),
        )
        .map(|data| data.claims)
        .map_err(|e| e.to_string())
    }
}

fn expires_in(ttl: Duration) -> usize {
    (Utc::now().timestamp() + ttl.as_secs() as i64) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> TokenService {
        TokenService::new(
            "access".into(),
            "refresh".into(),
            Duration::from_secs(60),
            Duration::from_secs(3600),
        )
    }

    #[test]
    fn password_round_trip() {
        let hash = hash_password("super_secret_password").expect("Failed to hash password");
        assert_ne!(hash, "super_secret_password");
        assert!(verify_password("super_secret_password", &hash).unwrap());
        assert!(!verify_password("wrong_password", &hash).unwrap());
    }

    #[test]
    fn access_token_carries_id_and_name() {
        let tokens = service();
        let token = tokens.create_access_token(7, "Ada Lovelace").unwrap();
        let claims = tokens.decode_access_token(&token).unwrap();
        assert_eq!(claims.customer_id(), Some(7));
        assert_eq!(claims.name, "Ada Lovelace");
    }

    #[test]
    fn tokens_are_not_interchangeable() {
        let tokens = service();
        let refresh = tokens.create_refresh_token(7).unwrap();
        assert!(tokens.decode_access_token(&refresh).is_err());
        assert_eq!(
            tokens.decode_refresh_token(&refresh).unwrap().customer_id(),
            Some(7)
        );
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let tokens = service();
        let claims = RefreshClaims {
            sub: "7".into(),
            exp: (Utc::now().timestamp() - 3600) as usize,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"refresh"),
        )
        .unwrap();
        assert!(tokens.decode_refresh_token(&token).is_err());
    }
}
