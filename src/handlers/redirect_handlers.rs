use actix_web::{HttpResponse, http, web};

use crate::errors::ApiError;
use crate::services::Resolution;
use crate::state::AppState;

fn respond(resolution: Resolution) -> HttpResponse {
    match resolution {
        Resolution::Resolved { destination_url, .. } => HttpResponse::Found()
            .append_header((http::header::LOCATION, destination_url))
            .finish(),
        Resolution::Deactivated => HttpResponse::Gone().json(serde_json::json!({
            "error": "This QR code has been deactivated"
        })),
        Resolution::NotFound => HttpResponse::NotFound().json(serde_json::json!({
            "error": "QR code not found"
        })),
    }
}

/// Scan entry point encoded in every printed code.
pub async fn redirect(
    app_state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let short_code = path.into_inner();
    // Look up the code and record the scan before answering
    let resolution = app_state.resolver.resolve(&short_code).await?;
    Ok(respond(resolution))
}

pub async fn redirect_for_owner(
    app_state: web::Data<AppState>,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, ApiError> {
    let (user_id, short_code) = path.into_inner();
    let resolution = app_state
        .resolver
        .resolve_for_owner(&user_id, &short_code)
        .await?;
    Ok(respond(resolution))
}
