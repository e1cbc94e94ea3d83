use serde::Deserialize;
use tracing::{debug, warn};

/// The store's view of an item after an upload or publish call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemResource {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub upload_state: String,
    #[serde(default)]
    pub item_error: Vec<ItemError>,
    /// Publish responses only.
    #[serde(default)]
    pub status: Vec<String>,
    #[serde(default)]
    pub status_detail: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ItemError {
    #[serde(default, rename = "error_code")]
    pub code: String,
    #[serde(default, rename = "error_detail")]
    pub detail: String,
}

impl ItemResource {
    /// Logs the resource, then one warning per reported item error.
    pub(crate) fn log(&self, operation: &str) {
        debug!(
            id = %self.id,
            kind = %self.kind,
            upload_state = %self.upload_state,
            status = ?self.status,
            errors = self.item_error.len(),
            "{operation} completed"
        );

        for (index, err) in self.item_error.iter().enumerate() {
            warn!(
                id = %self.id,
                index,
                code = %err.code,
                detail = %err.detail,
                "{operation} reported an item error"
            );
        }
        for detail in &self.status_detail {
            debug!(id = %self.id, "{operation} status detail: {detail}");
        }
    }
}
