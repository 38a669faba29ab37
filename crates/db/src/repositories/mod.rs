//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&mut DbConn` as the first argument, so the same call works
//! on a pooled connection or inside an open transaction.

pub mod base_config_repo;
pub mod brand_repo;
pub mod client_repo;
pub mod common_config_repo;
pub mod novel_config_repo;
pub mod pay_config_repo;
pub mod ui_config_repo;

pub use base_config_repo::BaseConfigRepo;
pub use brand_repo::{BrandRepo, BrandTypeRepo};
pub use client_repo::ClientRepo;
pub use common_config_repo::CommonConfigRepo;
pub use novel_config_repo::NovelConfigRepo;
pub use pay_config_repo::PayConfigRepo;
pub use ui_config_repo::UiConfigRepo;
