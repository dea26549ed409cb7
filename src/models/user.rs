use std::future::{Ready, ready};

use actix_web::{Error, FromRequest, HttpMessage, HttpRequest, dev::Payload, error};
use serde::{Deserialize, Serialize};

/// The caller as vouched for by the identity provider's token. Credentials
/// never reach this service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: String,
    pub email: Option<String>,
    pub name: Option<String>,
}

// Populated by `JwtAuth`; handlers behind it take `User` as an argument.
impl FromRequest for User {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let user = req.extensions().get::<User>().cloned();
        ready(user.ok_or_else(|| error::ErrorUnauthorized("Authentication required")))
    }
}
