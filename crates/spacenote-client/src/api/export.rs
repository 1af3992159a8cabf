use serde_json::Value as JsonValue;
use tracing::info;

use spacenote_core::{Error, Result, Space};

use crate::client::{seg, SpaceNoteClient};

impl SpaceNoteClient {
    /// Space definition as JSON; with `include_data`, notes and comments too.
    pub async fn export_space(&self, slug: &str, include_data: bool) -> Result<JsonValue> {
        self.fetch_uncached(
            "export_space",
            &format!("spaces/{}/export", seg(slug)),
            vec![("include_data", include_data.to_string())],
        )
        .await
    }

    /// Import a space from exported JSON text.
    ///
    /// Only syntax is checked here; structure is validated by the server.
    pub async fn import_space(&self, json_text: &str) -> Result<Space> {
        let document: JsonValue = serde_json::from_str(json_text)
            .map_err(|e| Error::Validation(format!("Invalid JSON: {}", e)))?;
        let space: Space = self
            .mutate_json(
                "import_space",
                self.post("spaces/import").json(&document),
                &["spaces".to_string()],
            )
            .await?;
        info!(
            subsystem = "client",
            component = "export",
            space = %space.slug,
            "Space imported"
        );
        Ok(space)
    }
}
