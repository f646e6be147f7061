use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use jsonwebtoken::{encode, EncodingKey, Header};

use civic_shared::errors::{AppError, AppResult};
use civic_shared::types::{AccessToken, Claims};

use crate::models::User;

pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AppError::internal(format!("password hashing failed: {e}")))
}

pub fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| AppError::internal(format!("invalid password hash: {e}")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

pub fn validate_password(password: &str) -> AppResult<()> {
    if password.len() < 8 {
        return Err(AppError::validation("password must be at least 8 characters"));
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(AppError::validation("password must contain at least one number"));
    }
    if !password.chars().any(|c| c.is_ascii_alphabetic()) {
        return Err(AppError::validation("password must contain at least one letter"));
    }
    Ok(())
}

pub fn create_access_token(user: &User, secret: &str, ttl_secs: i64) -> AppResult<AccessToken> {
    let claims = Claims::new(user.id, user.username.clone(), user.is_admin, ttl_secs);
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::internal(format!("token signing failed: {e}")))?;
    Ok(AccessToken::new(token, ttl_secs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use jsonwebtoken::{decode, DecodingKey, Validation};

    fn sample_user() -> User {
        User {
            id: 7,
            username: "ravi".into(),
            password_hash: String::new(),
            name: "Ravi Kumar".into(),
            email: "ravi@example.com".into(),
            is_admin: false,
            warning_count: 0,
            is_banned: false,
            location: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn hash_then_verify() {
        let hash = hash_password("hunter42x").unwrap();
        assert!(verify_password("hunter42x", &hash).unwrap());
        assert!(!verify_password("wrong-pass1", &hash).unwrap());
    }

    #[test]
    fn password_rules() {
        assert!(validate_password("short1").is_err());
        assert!(validate_password("lettersonly").is_err());
        assert!(validate_password("12345678").is_err());
        assert!(validate_password("goodpass1").is_ok());
    }

    #[test]
    fn token_round_trip() {
        let user = sample_user();
        let token = create_access_token(&user, "test-secret", 3600).unwrap();
        assert_eq!(token.token_type, "Bearer");

        let decoded = decode::<Claims>(
            &token.access_token,
            &DecodingKey::from_secret(b"test-secret"),
            &Validation::default(),
        )
        .unwrap();
        assert_eq!(decoded.claims.sub, 7);
        assert_eq!(decoded.claims.username, "ravi");
        assert!(!decoded.claims.is_admin);
    }
}
