use crate::config::SecurityConfig;
use crate::db::models::{AuthToken, Session, User};
use crate::error::Error;
use anyhow::Result;
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, TokenData, Validation};
use serde::{Deserialize, Serialize};

pub mod auth;
pub mod password;

pub use auth::{AuthService, AuthenticatedSession, ClientInfo};

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// Token of the backing session row
    pub sid: String,
    /// User name
    pub name: String,
    /// Expiration time (Unix timestamp)
    pub exp: usize,
    /// Issued at (Unix timestamp)
    pub iat: usize,
}

/// Signs and validates session tokens
#[derive(Clone)]
pub struct SecurityService {
    config: SecurityConfig,
}

impl SecurityService {
    pub fn new(config: SecurityConfig) -> Self {
        Self { config }
    }

    /// Sign a JWT for a session; it expires together with the session
    pub fn generate_token(&self, user: &User, session: &Session) -> Result<AuthToken> {
        let now = Utc::now();

        let claims = Claims {
            sub: user.id.clone(),
            sid: session.token.clone(),
            name: user.name.clone(),
            exp: session.expires_at.timestamp().max(0) as usize,
            iat: now.timestamp() as usize,
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(|e| Error::Authentication(format!("Failed to generate JWT token: {}", e)))?;

        Ok(AuthToken {
            access_token: token,
            token_type: "Bearer".to_string(),
            expires_in: (session.expires_at - now).num_seconds().max(0) as u64,
        })
    }

    /// Validate and decode a JWT token
    pub fn validate_token(&self, token: &str) -> Result<TokenData<Claims>> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|e| Error::Authentication(format!("Invalid token: {}", e)))?;

        Ok(token_data)
    }

    pub fn config(&self) -> &SecurityConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn user() -> User {
        User {
            id: "user-1".to_string(),
            name: "Operator".to_string(),
            email: "ops@stadium.test".to_string(),
            email_verified: false,
            image: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn session(expires_in: Duration) -> Session {
        Session {
            id: "s-1".to_string(),
            expires_at: Utc::now() + expires_in,
            token: "opaque-token".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            ip_address: None,
            user_agent: None,
            user_id: "user-1".to_string(),
        }
    }

    #[test]
    fn test_token_round_trip_carries_session() {
        let service = SecurityService::new(SecurityConfig::default());
        let token = service.generate_token(&user(), &session(Duration::hours(1))).unwrap();

        assert_eq!(token.token_type, "Bearer");
        assert!(token.expires_in > 3500 && token.expires_in <= 3600);

        let data = service.validate_token(&token.access_token).unwrap();
        assert_eq!(data.claims.sub, "user-1");
        assert_eq!(data.claims.sid, "opaque-token");
    }

    #[test]
    fn test_token_from_other_secret_is_rejected() {
        let issuer = SecurityService::new(SecurityConfig {
            jwt_secret: "one".to_string(),
            ..SecurityConfig::default()
        });
        let verifier = SecurityService::new(SecurityConfig {
            jwt_secret: "two".to_string(),
            ..SecurityConfig::default()
        });

        let token = issuer.generate_token(&user(), &session(Duration::hours(1))).unwrap();
        assert!(verifier.validate_token(&token.access_token).is_err());
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let service = SecurityService::new(SecurityConfig::default());
        let token = service
            .generate_token(&user(), &session(Duration::hours(-2)))
            .unwrap();

        assert_eq!(token.expires_in, 0);
        assert!(service.validate_token(&token.access_token).is_err());
    }
}
