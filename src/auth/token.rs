//! Signed, time-limited session tokens (HS256 JWT).

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::AuthError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub roles: Vec<String>,
    pub iat: i64,
    pub exp: i64,
}

/// Who a verified token speaks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: Uuid,
    pub roles: Vec<String>,
}

/// Issues and verifies session tokens with a secret fixed at construction.
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn issue(&self, user_id: Uuid, roles: &[String]) -> Result<String, AuthError> {
        self.issue_at(user_id, roles, Utc::now())
    }

    pub fn issue_at(
        &self,
        user_id: Uuid,
        roles: &[String],
        issued_at: DateTime<Utc>,
    ) -> Result<String, AuthError> {
        let claims = Claims {
            sub: user_id,
            roles: roles.to_vec(),
            iat: issued_at.timestamp(),
            exp: (issued_at + self.ttl).timestamp(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?;
        Ok(token)
    }

    /// Expired, malformed, tampered and foreign tokens are all rejected the
    /// same way.
    pub fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation)
            .map_err(|_| AuthError::InvalidToken)?;
        Ok(Identity {
            user_id: data.claims.sub,
            roles: data.claims.roles,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issuer() -> TokenIssuer {
        TokenIssuer::new(b"test-secret", Duration::hours(24))
    }

    fn roles(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn round_trip_returns_identity() {
        let issuer = issuer();
        let user_id = Uuid::new_v4();
        let roles = roles(&["Admin", "Seller", "SomethingCustom"]);

        let token = issuer.issue(user_id, &roles).unwrap();
        let identity = issuer.verify(&token).unwrap();

        assert_eq!(identity, Identity { user_id, roles });
    }

    #[test]
    fn round_trip_with_no_roles() {
        let issuer = issuer();
        let user_id = Uuid::new_v4();
        let token = issuer.issue(user_id, &[]).unwrap();
        let identity = issuer.verify(&token).unwrap();
        assert_eq!(identity.user_id, user_id);
        assert!(identity.roles.is_empty());
    }

    #[test]
    fn expired_token_is_invalid() {
        let issuer = issuer();
        let issued_at = Utc::now() - Duration::hours(25);
        let token = issuer
            .issue_at(Uuid::new_v4(), &roles(&["User"]), issued_at)
            .unwrap();
        assert!(matches!(issuer.verify(&token), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn token_just_inside_window_is_valid() {
        let issuer = issuer();
        let issued_at = Utc::now() - Duration::hours(23);
        let token = issuer
            .issue_at(Uuid::new_v4(), &roles(&["User"]), issued_at)
            .unwrap();
        assert!(issuer.verify(&token).is_ok());
    }

    #[test]
    fn tampered_signature_is_invalid() {
        let issuer = issuer();
        let token = issuer.issue(Uuid::new_v4(), &roles(&["User"])).unwrap();

        let (head, signature) = token.rsplit_once('.').unwrap();
        let mut sig: Vec<char> = signature.chars().collect();
        sig[0] = if sig[0] == 'A' { 'B' } else { 'A' };
        let tampered = format!("{head}.{}", sig.into_iter().collect::<String>());

        assert!(matches!(issuer.verify(&tampered), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn swapped_payload_is_invalid() {
        let issuer = issuer();
        let user = issuer.issue(Uuid::new_v4(), &roles(&["User"])).unwrap();
        let admin = issuer.issue(Uuid::new_v4(), &roles(&["Admin"])).unwrap();

        let user_parts: Vec<&str> = user.split('.').collect();
        let admin_parts: Vec<&str> = admin.split('.').collect();
        let forged = format!("{}.{}.{}", user_parts[0], admin_parts[1], user_parts[2]);

        assert!(matches!(issuer.verify(&forged), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn foreign_secret_is_invalid() {
        let other = TokenIssuer::new(b"another-secret", Duration::hours(24));
        let token = other.issue(Uuid::new_v4(), &roles(&["Admin"])).unwrap();
        assert!(matches!(issuer().verify(&token), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn garbage_is_invalid() {
        let issuer = issuer();
        assert!(matches!(issuer.verify(""), Err(AuthError::InvalidToken)));
        assert!(matches!(issuer.verify("a.b.c"), Err(AuthError::InvalidToken)));
        assert!(matches!(
            issuer.verify("not a token at all"),
            Err(AuthError::InvalidToken)
        ));
    }
}
