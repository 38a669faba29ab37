use brandcfg_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `novel_configs` table.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct NovelConfig {
    pub id: DbId,
    pub client_id: DbId,
    pub tt_jump_home_url: String,
    pub tt_login_callback_domain: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Input for creating or fully replacing a novel config.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CreateNovelConfig {
    pub tt_jump_home_url: String,
    pub tt_login_callback_domain: String,
}
