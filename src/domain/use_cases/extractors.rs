use actix_web::{FromRequest, HttpRequest};
use futures_util::future::{ready, Ready};

use crate::errors::AppError;

/// Extracts the requester's owner id from the `X-User-Id` header for
/// mutating endpoints. The value is trusted as given; signature verification
/// is explicitly out of scope.
/// Usage: add `owner: OwnerIdentity` as a handler parameter.
#[derive(Debug, Clone)]
pub struct OwnerIdentity(pub String);

impl FromRequest for OwnerIdentity {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut actix_web::dev::Payload) -> Self::Future {
        let owner_id = req
            .headers()
            .get("X-User-Id")
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string);

        match owner_id {
            Some(owner_id) => ready(Ok(OwnerIdentity(owner_id))),
            None => ready(Err(
                AppError::Validation("Missing X-User-Id header".to_string()).into()
            )),
        }
    }
}
