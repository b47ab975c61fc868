use actix_web::{dev::Payload, FromRequest, HttpRequest};
use futures::future::{err, ok, Ready};
use uuid::Uuid;

use crate::errors::AppError;

/// Extractor that provides the calling user's ID.
///
/// Authentication is handled upstream (API gateway); this service trusts the
/// forwarded `X-User-Id` header and rejects requests without a valid one.
pub struct AuthenticatedUser {
    pub user_id: Uuid,
}

impl FromRequest for AuthenticatedUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let header = match req
            .headers()
            .get("X-User-Id")
            .and_then(|h| h.to_str().ok())
        {
            Some(value) => value,
            None => {
                return err(AppError::Unauthorized(
                    "Missing X-User-Id header".to_string(),
                ))
            }
        };

        match Uuid::parse_str(header) {
            Ok(user_id) => ok(AuthenticatedUser { user_id }),
            Err(_) => err(AppError::Unauthorized(
                "Invalid X-User-Id header".to_string(),
            )),
        }
    }
}
