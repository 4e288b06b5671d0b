use axum::http::{HeaderMap, StatusCode};
use uuid::Uuid;

use crate::error::LedgerError;

use super::auth::AuthService;

#[inline]
pub fn validate_auth_token(headers: HeaderMap, service: &AuthService) -> Result<Uuid, StatusCode> {
    let jwt_header_token = match headers.get("Authorization").map(|token| token.to_str()) {
        Some(Ok(token)) => token,
        _ => {
            return Err(StatusCode::UNAUTHORIZED);
        }
    };
    //validate our token
    match service.verify_token(jwt_header_token) {
        Ok(user) => Ok(user),
        Err(_) => Err(StatusCode::UNAUTHORIZED),
    }
}

#[inline]
pub fn check_password(password: &str) -> Result<(), Box<dyn std::error::Error>> {
    if password.len() < 8 {
        return Err("Password must be at least 8 characters".into());
    }
    if !password.chars().any(|c| c.is_uppercase()) {
        return Err("Password must contain at least one uppercase letter".into());
    }
    if !password.chars().any(|c| c.is_lowercase()) {
        return Err("Password must contain at least one lowercase letter".into());
    }
    if !password.chars().any(|c| c.is_digit(10)) {
        return Err("Password must contain at least one digit".into());
    }
    if !password.chars().any(|c| !c.is_alphanumeric()) {
        return Err("Password must contain at least one special character".into());
    }
    Ok(())
}

// Maps ledger failures onto the wire. Reconciliation cases are masked from
// the client and logged for the repair job instead.
pub fn ledger_error_response(err: LedgerError) -> (StatusCode, String) {
    match err {
        LedgerError::NotFound(_) => (StatusCode::NOT_FOUND, err.to_string()),
        LedgerError::InvalidState(_) => (StatusCode::CONFLICT, err.to_string()),
        LedgerError::InsufficientBalance => (StatusCode::BAD_REQUEST, err.to_string()),
        LedgerError::StoreFailure(_) => {
            tracing::error!("store failure during ledger operation: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Operation failed, please retry".to_string(),
            )
        }
        LedgerError::ReconciliationRequired { booking_id, detail } => {
            tracing::error!("reconciliation required for booking {booking_id}: {detail}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Booking flagged for manual review".to_string(),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::check_password;

    #[test]
    fn password_policy() {
        assert!(check_password("Sup3r-secret").is_ok());
        assert!(check_password("short").is_err());
        assert!(check_password("no-uppercase-1!").is_err());
        assert!(check_password("NO-LOWERCASE-1!").is_err());
        assert!(check_password("No-Digits-Here!").is_err());
        assert!(check_password("NoSpecials123").is_err());
    }
}
