pub mod config;
pub mod document;
pub mod error;
pub mod kinds;
pub mod progress;
pub mod project_files;
pub mod types;
