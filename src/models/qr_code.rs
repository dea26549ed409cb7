use serde::{Deserialize, Serialize};

pub const DEFAULT_FOREGROUND: &str = "#000000";
pub const DEFAULT_BACKGROUND: &str = "#ffffff";
pub const DEFAULT_SIZE: u32 = 256;
pub const MIN_SIZE: u32 = 128;
pub const MAX_SIZE: u32 = 1024;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct QrCode {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    #[serde(default)]
    pub group_id: Option<String>,
    pub title: String,
    pub destination_url: String, // Where a scan currently lands, editable after printing
    pub short_code: String,      // Token embedded in the printed QR image
    pub foreground_color: String,
    pub background_color: String,
    pub size: u32,
    pub is_active: bool,
    #[serde(default)]
    pub scan_count: i64,
    #[serde(default)]
    pub last_scanned: Option<i64>,
    #[serde(default)]
    pub scan_history: Vec<i64>, // One timestamp (ms) per scan, in append order
    pub created_at: i64,
}

/// Fields supplied by the owner when a code is created.
#[derive(Debug, Clone, PartialEq)]
pub struct NewQrCode {
    pub group_id: Option<String>,
    pub title: String,
    pub destination_url: String,
    pub foreground_color: String,
    pub background_color: String,
    pub size: u32,
}

impl NewQrCode {
    pub fn new(title: impl Into<String>, destination_url: impl Into<String>) -> Self {
        Self {
            group_id: None,
            title: title.into(),
            destination_url: destination_url.into(),
            foreground_color: DEFAULT_FOREGROUND.to_string(),
            background_color: DEFAULT_BACKGROUND.to_string(),
            size: DEFAULT_SIZE,
        }
    }

    pub fn in_group(mut self, group_id: impl Into<String>) -> Self {
        self.group_id = Some(group_id.into());
        self
    }
}

/// The owner-editable subset of a code. `None` leaves a field untouched;
/// `group_id: Some(None)` detaches the code from its group.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QrCodePatch {
    pub title: Option<String>,
    pub destination_url: Option<String>,
    pub foreground_color: Option<String>,
    pub background_color: Option<String>,
    pub size: Option<u32>,
    pub is_active: Option<bool>,
    pub group_id: Option<Option<String>>,
}

impl QrCodePatch {
    pub fn activation(is_active: bool) -> Self {
        Self {
            is_active: Some(is_active),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply(self, code: &mut QrCode) {
        if let Some(title) = self.title {
            code.title = title;
        }
        if let Some(url) = self.destination_url {
            code.destination_url = url;
        }
        if let Some(color) = self.foreground_color {
            code.foreground_color = color;
        }
        if let Some(color) = self.background_color {
            code.background_color = color;
        }
        if let Some(size) = self.size {
            code.size = size;
        }
        if let Some(is_active) = self.is_active {
            code.is_active = is_active;
        }
        if let Some(group_id) = self.group_id {
            code.group_id = group_id;
        }
    }
}

impl QrCode {
    pub fn new(id: String, user_id: &str, short_code: String, new: NewQrCode, created_at: i64) -> Self {
        Self {
            id,
            user_id: user_id.to_string(),
            group_id: new.group_id,
            title: new.title,
            destination_url: new.destination_url,
            short_code,
            foreground_color: new.foreground_color,
            background_color: new.background_color,
            size: new.size,
            is_active: true,
            scan_count: 0,
            last_scanned: None,
            scan_history: Vec::new(),
            created_at,
        }
    }

    /// Appends one scan. The counter is derived from the history so the two
    /// can never drift apart.
    pub fn register_scan(&mut self, at: i64) {
        self.scan_history.push(at);
        self.scan_count = self.scan_history.len() as i64;
        self.last_scanned = Some(at);
    }

    pub fn belongs_to(&self, user_id: &str) -> bool {
        self.user_id == user_id
    }
}
