use std::borrow::Cow;

use actix_web::{HttpResponse, web};
use chrono::Utc;
use log::info;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::errors::ApiError;
use crate::models::qr_code::{DEFAULT_BACKGROUND, DEFAULT_FOREGROUND, DEFAULT_SIZE};
use crate::models::{NewQrCode, QrCodePatch, User};
use crate::services::analytics::scan_stats;
use crate::services::provisioning;
use crate::services::render::{RenderSpec, RenderedImage, render};
use crate::state::AppState;
use crate::store::PageCursor;
use crate::structs::qr_request::{
    CreateQrCodeRequest, ImageParams, ListParams, QrCodeResponse, StaticQrRequest,
    UpdateQrCodeRequest,
};

/// A code may only join a group its owner already has.
async fn ensure_group(state: &AppState, user: &User, group_id: Option<&str>) -> Result<(), ApiError> {
    let Some(group_id) = group_id else {
        return Ok(());
    };
    if state.store.get_group(&user.id, group_id).await?.is_some() {
        return Ok(());
    }
    let mut errors = ValidationErrors::new();
    errors.add(
        "group_id",
        ValidationError::new("unknown_group").with_message(Cow::Borrowed("Group does not exist")),
    );
    Err(errors.into())
}

fn image_response(image: RenderedImage) -> HttpResponse {
    HttpResponse::Ok()
        .content_type(image.kind.content_type())
        .body(image.bytes)
}

pub async fn create_qr_code(
    app_state: web::Data<AppState>,
    user: User,
    web::Json(req): web::Json<CreateQrCodeRequest>,
) -> Result<HttpResponse, ApiError> {
    // Validate the request
    req.validate()?;
    let new = NewQrCode::from(req);
    ensure_group(&app_state, &user, new.group_id.as_deref()).await?;

    // Generate the short code and store the record
    let code = provisioning::create_code(app_state.store.as_ref(), &user.id, new).await?;
    info!("User {} created QR code {} ({})", user.id, code.id, code.short_code);
    Ok(HttpResponse::Created().json(QrCodeResponse::new(code, &app_state.settings)))
}

/// Newest first. With `limit` or `after` only one page is returned, for the
/// dashboard's "load more".
pub async fn list_qr_codes(
    app_state: web::Data<AppState>,
    user: User,
    params: web::Query<ListParams>,
) -> Result<HttpResponse, ApiError> {
    let params = params.into_inner();
    params.validate()?;

    if !params.is_paged() {
        let codes = app_state.store.list_codes(&user.id).await?;
        return Ok(HttpResponse::Ok().json(QrCodeResponse::list(codes, &app_state.settings)));
    }

    // Resolve the cursor from the last code the client already has
    let cursor = match &params.after {
        Some(id) => {
            let last = app_state
                .store
                .get_code(&user.id, id)
                .await?
                .ok_or(ApiError::NotFound("QR code"))?;
            Some(PageCursor::from(&last))
        }
        None => None,
    };

    let codes = app_state
        .store
        .list_codes_page(&user.id, cursor.as_ref(), params.page_size())
        .await?;
    Ok(HttpResponse::Ok().json(QrCodeResponse::list(codes, &app_state.settings)))
}

pub async fn get_qr_code(
    app_state: web::Data<AppState>,
    user: User,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let code = app_state
        .store
        .get_code(&user.id, &path.into_inner())
        .await?
        .ok_or(ApiError::NotFound("QR code"))?;
    Ok(HttpResponse::Ok().json(QrCodeResponse::new(code, &app_state.settings)))
}

pub async fn update_qr_code(
    app_state: web::Data<AppState>,
    user: User,
    path: web::Path<String>,
    web::Json(req): web::Json<UpdateQrCodeRequest>,
) -> Result<HttpResponse, ApiError> {
    req.validate()?;
    let patch = QrCodePatch::from(req);
    // Moving into a group needs the group to exist; detaching never does
    if let Some(Some(group_id)) = &patch.group_id {
        ensure_group(&app_state, &user, Some(group_id.as_str())).await?;
    }

    let id = path.into_inner();
    let code = app_state
        .store
        .update_code(&user.id, &id, patch)
        .await?
        .ok_or(ApiError::NotFound("QR code"))?;
    Ok(HttpResponse::Ok().json(QrCodeResponse::new(code, &app_state.settings)))
}

pub async fn delete_qr_code(
    app_state: web::Data<AppState>,
    user: User,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    // Frees the short code as well; the printed code stops resolving
    if !app_state.store.delete_code(&user.id, &id).await? {
        return Err(ApiError::NotFound("QR code"));
    }
    info!("User {} deleted QR code {}", user.id, id);
    Ok(HttpResponse::NoContent().finish())
}

pub async fn qr_code_stats(
    app_state: web::Data<AppState>,
    user: User,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let code = app_state
        .store
        .get_code(&user.id, &path.into_inner())
        .await?
        .ok_or(ApiError::NotFound("QR code"))?;
    Ok(HttpResponse::Ok().json(scan_stats(&code, Utc::now())))
}

/// The printable image for a stored code; it always encodes the scan URL,
/// never the destination, so the destination stays editable.
pub async fn qr_code_image(
    app_state: web::Data<AppState>,
    user: User,
    path: web::Path<String>,
    params: web::Query<ImageParams>,
) -> Result<HttpResponse, ApiError> {
    let code = app_state
        .store
        .get_code(&user.id, &path.into_inner())
        .await?
        .ok_or(ApiError::NotFound("QR code"))?;

    // Encode the scan URL in the code's own colors and size
    let scan_url = app_state.settings.scan_url(&code.short_code);
    let spec = RenderSpec {
        content: &scan_url,
        foreground: &code.foreground_color,
        background: &code.background_color,
        size: code.size,
    };
    Ok(image_response(render(&spec, params.format)?))
}

/// Renders a plain URL without storing anything.
pub async fn static_qr(web::Json(req): web::Json<StaticQrRequest>) -> Result<HttpResponse, ApiError> {
    req.validate()?;
    // Fall back to the stored-code defaults for anything not supplied
    let spec = RenderSpec {
        content: &req.url,
        foreground: req.foreground_color.as_deref().unwrap_or(DEFAULT_FOREGROUND),
        background: req.background_color.as_deref().unwrap_or(DEFAULT_BACKGROUND),
        size: req.size.unwrap_or(DEFAULT_SIZE),
    };
    Ok(image_response(render(&spec, req.format)?))
}
