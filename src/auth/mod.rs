use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use uuid::Uuid;

use crate::config::SecurityConfig;

/// Minutes a password reset token stays valid
pub const RESET_TOKEN_TTL_MINUTES: i64 = 10;

const RESET_TOKEN_BYTES: usize = 20;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub id: Uuid,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn new(user_id: Uuid, expiry_days: i64) -> Self {
        let now = Utc::now();
        Self {
            id: user_id,
            iat: now.timestamp(),
            exp: (now + Duration::days(expiry_days)).timestamp(),
        }
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("JWT generation error: {0}")]
    TokenGeneration(String),

    #[error("Password hashing error: {0}")]
    Hashing(String),

    #[error("JWT secret not configured")]
    MissingSecret,
}

pub fn generate_jwt(claims: &Claims, secret: &str) -> Result<String, AuthError> {
    if secret.is_empty() {
        return Err(AuthError::MissingSecret);
    }
    let encoding_key = EncodingKey::from_secret(secret.as_bytes());
    encode(&Header::default(), claims, &encoding_key)
        .map_err(|e| AuthError::TokenGeneration(e.to_string()))
}

/// Signed session token for `user_id` using the configured secret and lifetime
pub fn issue_token(user_id: Uuid, security: &SecurityConfig) -> Result<String, AuthError> {
    generate_jwt(&Claims::new(user_id, security.jwt_expiry_days), &security.jwt_secret)
}

pub fn validate_jwt(token: &str, secret: &str) -> Result<Claims, AuthError> {
    if secret.is_empty() {
        return Err(AuthError::MissingSecret);
    }
    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    decode::<Claims>(token, &decoding_key, &Validation::default())
        .map(|data| data.claims)
        .map_err(|e| AuthError::InvalidToken(e.to_string()))
}

/// bcrypt on the blocking pool
pub async fn hash_password(password: String, cost: u32) -> Result<String, AuthError> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| AuthError::Hashing(e.to_string()))?
        .map_err(|e| AuthError::Hashing(e.to_string()))
}

pub async fn verify_password(password: String, password_hash: String) -> Result<bool, AuthError> {
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &password_hash))
        .await
        .map_err(|e| AuthError::Hashing(e.to_string()))?
        .map_err(|e| AuthError::Hashing(e.to_string()))
}

/// Random reset token for the email link, and the sha256 hex digest to store
pub fn generate_reset_token() -> (String, String) {
    let bytes: [u8; RESET_TOKEN_BYTES] = rand::thread_rng().gen();
    let token = hex::encode(bytes);
    let hashed = hash_reset_token(&token);
    (token, hashed)
}

pub fn hash_reset_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    #[test]
    fn token_round_trip_carries_user_id() {
        let id = Uuid::new_v4();
        let token = generate_jwt(&Claims::new(id, 30), SECRET).unwrap();
        let claims = validate_jwt(&token, SECRET).unwrap();
        assert_eq!(claims.id, id);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn expired_or_foreign_tokens_are_rejected() {
        let expired = generate_jwt(&Claims::new(Uuid::new_v4(), -1), SECRET).unwrap();
        assert!(matches!(validate_jwt(&expired, SECRET), Err(AuthError::InvalidToken(_))));

        let foreign = generate_jwt(&Claims::new(Uuid::new_v4(), 1), "other").unwrap();
        assert!(matches!(validate_jwt(&foreign, SECRET), Err(AuthError::InvalidToken(_))));

        assert!(matches!(generate_jwt(&Claims::new(Uuid::nil(), 1), ""), Err(AuthError::MissingSecret)));
    }

    #[test]
    fn reset_tokens_are_hex_and_hashed() {
        let (token, hashed) = generate_reset_token();
        assert_eq!(token.len(), RESET_TOKEN_BYTES * 2);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(hashed, hash_reset_token(&token));
        assert_eq!(hashed.len(), 64);
        assert_ne!(generate_reset_token().0, token);
    }

    #[tokio::test]
    async fn password_hash_verifies() {
        let hash = hash_password("123456".into(), 4).await.unwrap();
        assert!(verify_password("123456".into(), hash.clone()).await.unwrap());
        assert!(!verify_password("654321".into(), hash).await.unwrap());
    }
}
