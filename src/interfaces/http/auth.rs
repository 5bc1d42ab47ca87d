use super::HttpState;
use crate::domain::error::AppError;
use crate::domain::user::User;
use actix_web::dev::Payload;
use actix_web::http::header;
use actix_web::{web, FromRequest, HttpRequest};
use futures::future::LocalBoxFuture;

/// The caller resolved from an `Authorization: Token <key>` header.
pub struct AuthenticatedUser(pub User);

impl FromRequest for AuthenticatedUser {
    type Error = AppError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let state = req.app_data::<web::Data<HttpState>>().cloned();
        let token = token_from_header(req);

        Box::pin(async move {
            let state = state
                .ok_or_else(|| AppError::Internal("HTTP state is not registered".to_string()))?;
            let token = token.ok_or_else(|| {
                AppError::Unauthorized("Authentication credentials were not provided.".to_string())
            })?;
            let user = state.auth.authenticate(&token).await?;
            Ok(AuthenticatedUser(user))
        })
    }
}

/// Accepts both the `Token` and `Bearer` schemes.
fn token_from_header(req: &HttpRequest) -> Option<String> {
    let value = req.headers().get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, key) = value.trim().split_once(' ')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    if scheme.eq_ignore_ascii_case("token") || scheme.eq_ignore_ascii_case("bearer") {
        Some(key.to_string())
    } else {
        None
    }
}
