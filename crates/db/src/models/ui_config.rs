use brandcfg_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `ui_configs` table.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct UiConfig {
    pub id: DbId,
    pub client_id: DbId,
    pub theme_bg_main: String,
    pub theme_bg_second: String,
    pub theme_text_main: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Input for creating or fully replacing a UI config.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateUiConfig {
    pub theme_bg_main: String,
    pub theme_bg_second: String,
    #[serde(default)]
    pub theme_text_main: Option<String>,
}
