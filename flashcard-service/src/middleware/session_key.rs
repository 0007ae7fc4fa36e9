use crate::services::session_store::DEFAULT_SESSION_KEY;
use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use service_core::error::AppError;

/// Header a client may send to keep its own conversation.
pub const SESSION_ID_HEADER: &str = "X-Session-ID";

/// Session key extractor.
///
/// Taken from the `X-Session-ID` header. Requests without it share the
/// default session, so a single browser tab behaves like the classic
/// one-conversation app.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionKey(pub String);

impl SessionKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for SessionKey
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let key = match parts.headers.get(SESSION_ID_HEADER) {
            Some(value) => {
                let key = value.to_str().map_err(|_| {
                    AppError::BadRequest(anyhow::anyhow!("Invalid {} header", SESSION_ID_HEADER))
                })?;
                let key = key.trim();
                if key.is_empty() {
                    DEFAULT_SESSION_KEY
                } else {
                    key
                }
            }
            None => DEFAULT_SESSION_KEY,
        };

        Ok(SessionKey(key.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn extract(request: Request<()>) -> Result<SessionKey, AppError> {
        let (mut parts, _) = request.into_parts();
        SessionKey::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn missing_header_uses_default_session() {
        let key = extract(Request::builder().body(()).unwrap()).await.unwrap();
        assert_eq!(key.as_str(), DEFAULT_SESSION_KEY);
    }

    #[tokio::test]
    async fn header_selects_session() {
        let request = Request::builder()
            .header(SESSION_ID_HEADER, " seminar-42 ")
            .body(())
            .unwrap();
        let key = extract(request).await.unwrap();
        assert_eq!(key.as_str(), "seminar-42");
    }
}
