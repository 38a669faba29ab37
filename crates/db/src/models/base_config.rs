use brandcfg_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// A row from the `base_configs` table.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct BaseConfig {
    pub id: DbId,
    pub client_id: DbId,
    pub platform: String,
    pub app_name: String,
    pub app_code: String,
    pub product: String,
    pub customer: String,
    pub appid: String,
    pub version: String,
    pub cl: String,
    pub uc: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Input for creating or fully replacing a base config.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateBaseConfig {
    #[validate(length(min = 1, message = "app_name is required"))]
    pub app_name: String,
    #[validate(length(min = 1, message = "platform is required"))]
    pub platform: String,
    #[validate(length(min = 1, message = "app_code is required"))]
    pub app_code: String,
    #[validate(length(min = 1, message = "product is required"))]
    pub product: String,
    #[validate(length(min = 1, message = "customer is required"))]
    pub customer: String,
    #[serde(default)]
    pub appid: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[validate(length(min = 1, message = "cl is required"))]
    pub cl: String,
    #[serde(default)]
    pub uc: String,
}

fn default_version() -> String {
    "1.0.0".to_string()
}
