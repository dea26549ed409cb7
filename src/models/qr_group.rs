use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct QrCodeGroup {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub base_url: String, // Shared prefix the member codes are variations of
    #[serde(default)]
    pub description: Option<String>,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewGroup {
    pub name: String,
    pub base_url: String,
    pub description: Option<String>,
}

/// `description: Some(None)` clears the description.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupPatch {
    pub name: Option<String>,
    pub base_url: Option<String>,
    pub description: Option<Option<String>>,
}

impl GroupPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply(self, group: &mut QrCodeGroup) {
        if let Some(name) = self.name {
            group.name = name;
        }
        if let Some(base_url) = self.base_url {
            group.base_url = base_url;
        }
        if let Some(description) = self.description {
            group.description = description;
        }
    }
}

impl QrCodeGroup {
    pub fn new(id: String, user_id: &str, new: NewGroup, created_at: i64) -> Self {
        Self {
            id,
            user_id: user_id.to_string(),
            name: new.name,
            base_url: new.base_url,
            description: new.description,
            created_at,
        }
    }
}
