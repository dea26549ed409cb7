use std::future::{Ready, ready};

use actix_web::{
    Error, HttpMessage,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
    http::header,
    web,
};
use futures_util::future::LocalBoxFuture;
use log::debug;

use crate::errors::ApiError;
use crate::models::User;
use crate::state::AppState;
use crate::utils::jwt::validate_token;

/// Verifies the identity provider's bearer token and attaches the caller as
/// a [`User`] extension. The signing secret comes from [`AppState`].
pub struct JwtAuth;

impl<S, B> Transform<S, ServiceRequest> for JwtAuth
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = JwtAuthMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(JwtAuthMiddleware { service }))
    }
}

pub struct JwtAuthMiddleware<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for JwtAuthMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let user = match authenticate(&req) {
            Ok(user) => user,
            Err(e) => {
                debug!("Rejected request to {}: {}", req.path(), e);
                return Box::pin(async move { Err(e.into()) });
            }
        };

        req.extensions_mut().insert(user);
        Box::pin(self.service.call(req))
    }
}

fn authenticate(req: &ServiceRequest) -> Result<User, ApiError> {
    let header = req
        .headers()
        .get(header::AUTHORIZATION)
        .ok_or(ApiError::Unauthorized("No authorization header"))?;
    let header = header
        .to_str()
        .map_err(|_| ApiError::Unauthorized("Invalid authorization header"))?;
    let token = header
        .strip_prefix("Bearer ")
        .ok_or(ApiError::Unauthorized("Invalid authorization format"))?;

    let state = req
        .app_data::<web::Data<AppState>>()
        .ok_or(ApiError::Unauthorized("Authentication unavailable"))?;
    let claims = validate_token(token, &state.settings.jwt_secret)
        .map_err(|_| ApiError::Unauthorized("Invalid token"))?;

    Ok(claims.into())
}
