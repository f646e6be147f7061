pub mod admin;
pub mod auth;
pub mod health;
pub mod profile;
pub mod reports;
pub mod suggestions;

use civic_shared::errors::{AppError, ErrorCode};
use validator::ValidationErrors;

/// Map payload validation failures to the error envelope, carrying the
/// per-field errors as structured details.
pub(crate) fn invalid_payload(errors: ValidationErrors) -> AppError {
    let details = serde_json::to_value(&errors).unwrap_or(serde_json::Value::Null);
    AppError::with_details(ErrorCode::ValidationError, errors.to_string(), details)
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Debug, Validate)]
    struct SignupCheck {
        #[validate(email)]
        email: String,
    }

    #[test]
    fn validation_failures_carry_field_details() {
        let bad = SignupCheck {
            email: "not-an-email".into(),
        };
        let err = invalid_payload(bad.validate().unwrap_err());
        match err {
            AppError::Known { code, details, .. } => {
                assert_eq!(code, ErrorCode::ValidationError);
                assert!(details.unwrap().get("email").is_some());
            }
            other => panic!("unexpected error variant: {other:?}"),
        }
    }
}
