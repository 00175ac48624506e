use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Bearer token payload. `sub` is the user id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub iat: i64,
    pub exp: i64,
}

/// Signs an HS256 token for `user_id` valid for `expiry_days`.
pub fn issue_token(
    user_id: Uuid,
    secret: &str,
    expiry_days: i64,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now();
    let claims = Claims {
        sub: user_id,
        iat: now.timestamp(),
        exp: (now + Duration::days(expiry_days)).timestamp(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// Checks signature and expiry, returning the claims.
pub fn verify_token(token: &str, secret: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_and_verify() {
        let user_id = Uuid::new_v4();
        let token = issue_token(user_id, "s3cret", 7).unwrap();
        let claims = verify_token(&token, "s3cret").unwrap();
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.exp - claims.iat, 7 * 24 * 60 * 60);
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let token = issue_token(Uuid::new_v4(), "right", 7).unwrap();
        assert!(verify_token(&token, "wrong").is_err());
    }

    #[test]
    fn test_expired_token_is_rejected() {
        // Past the default 60s leeway.
        let token = issue_token(Uuid::new_v4(), "s3cret", -1).unwrap();
        assert!(verify_token(&token, "s3cret").is_err());
    }

    #[test]
    fn test_garbage_token_is_rejected() {
        assert!(verify_token("not.a.jwt", "s3cret").is_err());
    }
}
