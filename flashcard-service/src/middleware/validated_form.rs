use axum::async_trait;
use axum::extract::{FromRequest, Request};
use axum::http::StatusCode;
use axum::Form;
use serde::de::DeserializeOwned;
use service_core::error::AppError;
use validator::Validate;

/// URL-encoded form body that is deserialized and validated, with every
/// rejection rendered as the service's JSON error body.
pub struct ValidatedForm<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedForm<T>
where
    T: DeserializeOwned + Validate + 'static,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Form(value) = Form::<T>::from_request(req, state).await.map_err(|rejection| {
            let message = rejection.body_text();
            if rejection.status() == StatusCode::UNPROCESSABLE_ENTITY {
                AppError::UnprocessableEntity(anyhow::anyhow!(message))
            } else {
                AppError::BadRequest(anyhow::anyhow!(message))
            }
        })?;

        value.validate()?;

        Ok(ValidatedForm(value))
    }
}
