//! Row structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - A `Deserialize` create DTO for inserts, which config updates reuse as
//!   the full replacement shape

pub mod base_config;
pub mod brand;
pub mod client;
pub mod common_config;
pub mod novel_config;
pub mod pay_config;
pub mod ui_config;
