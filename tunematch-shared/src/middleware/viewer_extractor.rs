use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderMap;

use crate::errors::{AppError, ErrorCode};
use crate::types::viewer::{Viewer, VIEWER_HEADER};

#[axum::async_trait]
impl<S> FromRequestParts<S> for Viewer
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let profile_id = extract_profile_id(&parts.headers)?;
        Ok(Viewer::new(profile_id))
    }
}

fn extract_profile_id(headers: &HeaderMap) -> Result<i64, AppError> {
    let raw = headers
        .get(VIEWER_HEADER)
        .ok_or_else(|| AppError::new(ErrorCode::Unauthorized, "missing viewer header"))?
        .to_str()
        .map_err(|_| AppError::new(ErrorCode::Unauthorized, "invalid viewer header"))?;

    match raw.trim().parse::<i64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(AppError::new(ErrorCode::Unauthorized, "viewer header must be a positive profile id")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(VIEWER_HEADER, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn parses_positive_id() {
        assert_eq!(extract_profile_id(&headers_with(" 42 ")).unwrap(), 42);
    }

    #[test]
    fn rejects_missing_and_malformed() {
        for headers in [HeaderMap::new(), headers_with("abc"), headers_with("0"), headers_with("-3")] {
            let err = extract_profile_id(&headers).unwrap_err();
            assert!(err.is(ErrorCode::Unauthorized));
        }
    }
}
