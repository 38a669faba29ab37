//! Website lifecycle workflows.
//!
//! A website is one `(brand, host)` client with a row and a generated
//! channel entry for each config kind, plus its build registrations in the
//! shared project files. [`WebsiteService`] creates and deletes websites as
//! single orchestrated operations; the per-kind services in [`configs`] also
//! offer standalone updates and deletes.

pub mod configs;
pub mod error;
pub mod files;
pub mod website;

pub use configs::{ConfigStep, ConfigSteps};
pub use error::WebsiteError;
pub use files::ProjectFileService;
pub use website::{
    BasicInfo, CreateWebsiteRequest, WebsiteConfig, WebsiteCreated, WebsiteDeleted, WebsiteService,
};
