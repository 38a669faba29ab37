//! Clients: one delivery channel (`host`) of a brand.

use brandcfg_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `clients` table.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Client {
    pub id: DbId,
    pub brand_id: DbId,
    pub host: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Deserialize)]
pub struct CreateClient {
    pub brand_id: DbId,
    pub host: String,
}

/// A client joined with its brand code.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ClientWithBrand {
    pub id: DbId,
    pub brand_id: DbId,
    pub host: String,
    pub brand_code: String,
}
