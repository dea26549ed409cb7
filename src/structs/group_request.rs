use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::config::Settings;
use crate::models::{GroupPatch, NewGroup, QrCode, QrCodeGroup};
use crate::services::variation::{UrlVariation, classify};
use crate::structs::qr_request::QrCodeResponse;
use crate::utils::validation::nullable;

#[derive(Deserialize, Validate)]
pub struct CreateGroupRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,
    #[validate(url(message = "Invalid URL format"))]
    pub base_url: String,
    pub description: Option<String>,
}

impl From<CreateGroupRequest> for NewGroup {
    fn from(req: CreateGroupRequest) -> Self {
        Self {
            name: req.name,
            base_url: req.base_url,
            description: req.description.filter(|d| !d.is_empty()),
        }
    }
}

#[derive(Deserialize, Validate, Default)]
pub struct UpdateGroupRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: Option<String>,
    #[validate(url(message = "Invalid URL format"))]
    pub base_url: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
}

impl From<UpdateGroupRequest> for GroupPatch {
    fn from(req: UpdateGroupRequest) -> Self {
        Self {
            name: req.name,
            base_url: req.base_url,
            description: req.description,
        }
    }
}

#[derive(Serialize)]
pub struct GroupResponse {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub base_url: String,
    pub description: Option<String>,
    pub created_at: i64,
}

impl From<QrCodeGroup> for GroupResponse {
    fn from(group: QrCodeGroup) -> Self {
        Self {
            id: group.id,
            user_id: group.user_id,
            name: group.name,
            base_url: group.base_url,
            description: group.description,
            created_at: group.created_at,
        }
    }
}

/// A member code together with how its destination varies from the group's
/// base URL.
#[derive(Serialize)]
pub struct GroupMemberResponse {
    #[serde(flatten)]
    pub code: QrCodeResponse,
    pub url_info: UrlVariation,
}

impl GroupMemberResponse {
    pub fn list(group: &QrCodeGroup, codes: Vec<QrCode>, settings: &Settings) -> Vec<Self> {
        codes
            .into_iter()
            .map(|code| Self {
                url_info: classify(&code.destination_url, &group.base_url),
                code: QrCodeResponse::new(code, settings),
            })
            .collect()
    }
}
