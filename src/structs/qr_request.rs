use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::config::Settings;
use crate::models::qr_code::{DEFAULT_BACKGROUND, DEFAULT_FOREGROUND, DEFAULT_SIZE};
use crate::models::{NewQrCode, QrCode, QrCodePatch};
use crate::services::render::ImageKind;
use crate::utils::validation::{nullable, validate_hex_color};

#[derive(Deserialize, Validate)]
pub struct CreateQrCodeRequest {
    #[validate(length(min = 1, max = 100, message = "Title must be 1-100 characters"))]
    pub title: String,
    #[validate(url(message = "Invalid URL format"))]
    pub destination_url: String,
    pub group_id: Option<String>,
    #[validate(custom(function = "validate_hex_color"))]
    pub foreground_color: Option<String>,
    #[validate(custom(function = "validate_hex_color"))]
    pub background_color: Option<String>,
    #[validate(range(min = 128, max = 1024, message = "Size must be between 128 and 1024"))]
    pub size: Option<u32>,
}

impl From<CreateQrCodeRequest> for NewQrCode {
    fn from(req: CreateQrCodeRequest) -> Self {
        Self {
            group_id: req.group_id.filter(|id| !id.is_empty()),
            title: req.title,
            destination_url: req.destination_url,
            foreground_color: req
                .foreground_color
                .unwrap_or_else(|| DEFAULT_FOREGROUND.to_string()),
            background_color: req
                .background_color
                .unwrap_or_else(|| DEFAULT_BACKGROUND.to_string()),
            size: req.size.unwrap_or(DEFAULT_SIZE),
        }
    }
}

/// `"group_id": null` detaches the code; omitting it leaves the group alone.
#[derive(Deserialize, Validate, Default)]
pub struct UpdateQrCodeRequest {
    #[validate(length(min = 1, max = 100, message = "Title must be 1-100 characters"))]
    pub title: Option<String>,
    #[validate(url(message = "Invalid URL format"))]
    pub destination_url: Option<String>,
    #[validate(custom(function = "validate_hex_color"))]
    pub foreground_color: Option<String>,
    #[validate(custom(function = "validate_hex_color"))]
    pub background_color: Option<String>,
    #[validate(range(min = 128, max = 1024, message = "Size must be between 128 and 1024"))]
    pub size: Option<u32>,
    pub is_active: Option<bool>,
    #[serde(default, deserialize_with = "nullable")]
    pub group_id: Option<Option<String>>,
}

impl From<UpdateQrCodeRequest> for QrCodePatch {
    fn from(req: UpdateQrCodeRequest) -> Self {
        Self {
            title: req.title,
            destination_url: req.destination_url,
            foreground_color: req.foreground_color,
            background_color: req.background_color,
            size: req.size,
            is_active: req.is_active,
            group_id: req.group_id,
        }
    }
}

#[derive(Deserialize, Validate)]
pub struct StaticQrRequest {
    #[validate(url(message = "Invalid URL format"))]
    pub url: String,
    #[validate(custom(function = "validate_hex_color"))]
    pub foreground_color: Option<String>,
    #[validate(custom(function = "validate_hex_color"))]
    pub background_color: Option<String>,
    #[validate(range(min = 128, max = 1024, message = "Size must be between 128 and 1024"))]
    pub size: Option<u32>,
    #[serde(default)]
    pub format: ImageKind,
}

pub const DEFAULT_PAGE_SIZE: usize = 20;

/// `?limit=&after=`; `after` is the id of the last code already shown.
/// Without either parameter the whole collection is returned.
#[derive(Deserialize, Validate, Default)]
pub struct ListParams {
    #[validate(range(min = 1, max = 100, message = "Limit must be between 1 and 100"))]
    pub limit: Option<usize>,
    pub after: Option<String>,
}

impl ListParams {
    pub fn is_paged(&self) -> bool {
        self.limit.is_some() || self.after.is_some()
    }

    pub fn page_size(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_PAGE_SIZE)
    }
}

#[derive(Deserialize)]
pub struct ImageParams {
    #[serde(default)]
    pub format: ImageKind,
}

#[derive(Serialize)]
pub struct QrCodeResponse {
    pub id: String,
    pub user_id: String,
    pub group_id: Option<String>,
    pub title: String,
    pub destination_url: String,
    pub short_code: String,
    pub scan_url: String,
    pub foreground_color: String,
    pub background_color: String,
    pub size: u32,
    pub is_active: bool,
    pub scan_count: i64,
    pub last_scanned: Option<i64>,
    pub scan_history: Vec<i64>,
    pub created_at: i64,
}

impl QrCodeResponse {
    pub fn new(code: QrCode, settings: &Settings) -> Self {
        Self {
            scan_url: settings.scan_url(&code.short_code),
            id: code.id,
            user_id: code.user_id,
            group_id: code.group_id,
            title: code.title,
            destination_url: code.destination_url,
            short_code: code.short_code,
            foreground_color: code.foreground_color,
            background_color: code.background_color,
            size: code.size,
            is_active: code.is_active,
            scan_count: code.scan_count,
            last_scanned: code.last_scanned,
            scan_history: code.scan_history,
            created_at: code.created_at,
        }
    }

    pub fn list(codes: Vec<QrCode>, settings: &Settings) -> Vec<Self> {
        codes.into_iter().map(|code| Self::new(code, settings)).collect()
    }
}
