//! Brands and the brand type lookup table.

use brandcfg_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `brand_types` table.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct BrandType {
    pub id: DbId,
    pub name: String,
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateBrandType {
    pub name: String,
    pub code: String,
}

/// A row from the `brands` table. `code` names every generated file of the
/// brand.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Brand {
    pub id: DbId,
    pub code: String,
    pub type_id: DbId,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Deserialize)]
pub struct CreateBrand {
    pub code: String,
    pub type_id: DbId,
}
