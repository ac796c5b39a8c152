//! Wire types of the Athlyze measurement API.

use serde::{Deserialize, Deserializer, Serialize};

/// A measurement as stored by the backend.
///
/// `id` is assigned by the backend on create and omitted from request
/// bodies while it is zero.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RemoteEntry {
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "is_unassigned"
    )]
    pub id: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub date: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub weight: f32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub fat: f32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub water: f32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub muscle: f32,
}

/// Nullable backend columns arrive as `null`; treat them like absent fields.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn is_unassigned(id: &i64) -> bool {
    *id == 0
}

/// One page of `GET measurements` or `GET measurements/get-by-date`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EntryPage {
    /// Total number of remote entries; negative or absent means unknown.
    #[serde(default)]
    pub count: Option<i64>,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
    #[serde(default)]
    pub results: Option<Vec<RemoteEntry>>,
}

impl EntryPage {
    /// Entries on this page, empty when the backend sent none.
    pub fn entries(&self) -> &[RemoteEntry] {
        self.results.as_deref().unwrap_or_default()
    }

    /// The reported total, if the backend reported a usable one.
    pub fn known_count(&self) -> Option<u64> {
        self.count
            .filter(|count| *count >= 0)
            .map(|count| count as u64)
    }

    pub fn first(&self) -> Option<&RemoteEntry> {
        self.entries().first()
    }
}

/// Error body shapes the backend is known to produce.
#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    detail: Option<String>,
    message: Option<String>,
    error: Option<String>,
}

/// Best-effort human-readable message from an error response body.
///
/// Prefers `detail`, then `message`, then `error` from a JSON object, and
/// falls back to the raw body.
pub fn extract_error_message(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "(empty body)".to_string();
    }
    if let Ok(parsed) = serde_json::from_str::<ApiErrorResponse>(trimmed) {
        if let Some(message) = parsed.detail.or(parsed.message).or(parsed.error) {
            return message;
        }
    }
    trimmed.to_string()
}
