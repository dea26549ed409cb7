use actix_web::{HttpResponse, web};

use crate::errors::ApiError;
use crate::models::User;
use crate::services::analytics::summarize;
use crate::state::AppState;

/// Dashboard totals across every code the caller owns.
pub async fn dashboard_stats(app_state: web::Data<AppState>, user: User) -> Result<HttpResponse, ApiError> {
    let codes = app_state.store.list_codes(&user.id).await?;
    Ok(HttpResponse::Ok().json(summarize(&codes)))
}
