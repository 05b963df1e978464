use axum::http::HeaderMap;

use crate::error::AppError;

pub fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, AppError> {
    let header = headers
        .get("authorization")
        .ok_or_else(|| AppError::unauthorized("Missing Authorization header"))?
        .to_str()
        .map_err(|_| AppError::unauthorized("Authorization header is not valid UTF-8"))?;

    let (scheme, token) = header
        .split_once(' ')
        .ok_or_else(|| AppError::unauthorized("Authorization header must be `Bearer <token>`"))?;

    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AppError::unauthorized(
            "Authorization scheme must be `Bearer`",
        ));
    }
    let token = token.trim();
    if token.is_empty() {
        return Err(AppError::unauthorized("Bearer token is empty"));
    }

    Ok(token)
}

/// Check the item-service token when one is configured.
pub fn verify_service_token(headers: &HeaderMap, expected: Option<&str>) -> Result<(), AppError> {
    let Some(expected) = expected else {
        return Ok(());
    };
    if extract_bearer_token(headers)? != expected {
        return Err(AppError::unauthorized("Invalid item service token"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn bearer_token_extractor_accepts_standard_header() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("bearer s3cret"));

        assert_eq!(extract_bearer_token(&headers).unwrap(), "s3cret");
    }

    #[test]
    fn bearer_token_extractor_rejects_wrong_scheme() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Basic abc"));
        assert!(extract_bearer_token(&headers).is_err());
    }

    #[test]
    fn service_token_is_optional() {
        let headers = HeaderMap::new();
        assert!(verify_service_token(&headers, None).is_ok());
        assert!(verify_service_token(&headers, Some("s3cret")).is_err());
    }

    #[test]
    fn service_token_must_match() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Bearer wrong"));
        assert!(verify_service_token(&headers, Some("s3cret")).is_err());

        headers.insert("authorization", HeaderValue::from_static("Bearer s3cret"));
        assert!(verify_service_token(&headers, Some("s3cret")).is_ok());
    }
}
