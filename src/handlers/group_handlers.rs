use actix_web::{HttpResponse, web};
use log::info;
use validator::Validate;

use crate::errors::ApiError;
use crate::models::{QrCodeGroup, User};
use crate::services::analytics::summarize;
use crate::state::AppState;
use crate::structs::group_request::{
    CreateGroupRequest, GroupMemberResponse, GroupResponse, UpdateGroupRequest,
};

async fn owned_group(state: &AppState, user: &User, id: &str) -> Result<QrCodeGroup, ApiError> {
    state
        .store
        .get_group(&user.id, id)
        .await?
        .ok_or(ApiError::NotFound("Group"))
}

pub async fn create_group(
    app_state: web::Data<AppState>,
    user: User,
    web::Json(req): web::Json<CreateGroupRequest>,
) -> Result<HttpResponse, ApiError> {
    // Validate the request
    req.validate()?;
    let group = app_state.store.create_group(&user.id, req.into()).await?;
    info!("User {} created group {}", user.id, group.id);
    Ok(HttpResponse::Created().json(GroupResponse::from(group)))
}

pub async fn list_groups(app_state: web::Data<AppState>, user: User) -> Result<HttpResponse, ApiError> {
    let groups: Vec<GroupResponse> = app_state
        .store
        .list_groups(&user.id)
        .await?
        .into_iter()
        .map(GroupResponse::from)
        .collect();
    Ok(HttpResponse::Ok().json(groups))
}

pub async fn get_group(
    app_state: web::Data<AppState>,
    user: User,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let group = owned_group(&app_state, &user, &path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(GroupResponse::from(group)))
}

pub async fn update_group(
    app_state: web::Data<AppState>,
    user: User,
    path: web::Path<String>,
    web::Json(req): web::Json<UpdateGroupRequest>,
) -> Result<HttpResponse, ApiError> {
    req.validate()?;
    let group = app_state
        .store
        .update_group(&user.id, &path.into_inner(), req.into())
        .await?
        .ok_or(ApiError::NotFound("Group"))?;
    Ok(HttpResponse::Ok().json(GroupResponse::from(group)))
}

/// Member codes survive; they are only detached.
pub async fn delete_group(
    app_state: web::Data<AppState>,
    user: User,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    if !app_state.store.delete_group(&user.id, &id).await? {
        return Err(ApiError::NotFound("Group"));
    }
    info!("User {} deleted group {} and detached its codes", user.id, id);
    Ok(HttpResponse::NoContent().finish())
}

pub async fn list_group_codes(
    app_state: web::Data<AppState>,
    user: User,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let group = owned_group(&app_state, &user, &path.into_inner()).await?;
    let codes = app_state.store.list_codes_by_group(&user.id, &group.id).await?;

    // Describe each destination relative to the group's base URL
    let members = GroupMemberResponse::list(&group, codes, &app_state.settings);
    Ok(HttpResponse::Ok().json(members))
}

pub async fn group_stats(
    app_state: web::Data<AppState>,
    user: User,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    // Check ownership before aggregating
    let group = owned_group(&app_state, &user, &path.into_inner()).await?;
    let codes = app_state.store.list_codes_by_group(&user.id, &group.id).await?;
    Ok(HttpResponse::Ok().json(summarize(&codes)))
}
