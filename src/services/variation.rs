use serde::Serialize;

/// How a member code's destination relates to its group's `base_url`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum UrlVariation {
    /// Not under the base URL at all.
    Different { variation: String },
    /// Extra path after the base URL.
    Path { variation: String },
    Params { path: String, params: String },
}

pub fn classify(destination_url: &str, base_url: &str) -> UrlVariation {
    let Some(remaining) = destination_url.strip_prefix(base_url) else {
        return UrlVariation::Different {
            variation: destination_url.to_string(),
        };
    };

    match remaining.split_once('?') {
        Some((path, params)) => UrlVariation::Params {
            path: or_root(path),
            params: params.to_string(),
        },
        None => UrlVariation::Path {
            variation: or_root(remaining),
        },
    }
}

fn or_root(path: &str) -> String {
    if path.is_empty() { "/".to_string() } else { path.to_string() }
}
