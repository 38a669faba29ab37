use std::path::PathBuf;

use brandcfg_core::document::DocumentError;
use brandcfg_core::error::CoreError;
use brandcfg_core::project_files::ProjectFileError;
use brandcfg_saga::{CodecError, FsError, SagaError};

#[derive(Debug, thiserror::Error)]
pub enum WebsiteError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error(transparent)]
    Fs(#[from] FsError),

    #[error("Cannot edit {}: {source}", path.display())]
    ProjectFile {
        path: PathBuf,
        #[source]
        source: ProjectFileError,
    },

    #[error("Operation cancelled")]
    Cancelled,

    /// An orchestrated operation failed and was rolled back.
    #[error(transparent)]
    Saga(#[from] Box<SagaError<WebsiteError>>),
}

impl From<SagaError<WebsiteError>> for WebsiteError {
    fn from(err: SagaError<WebsiteError>) -> Self {
        Self::Saga(Box::new(err))
    }
}

impl From<validator::ValidationErrors> for WebsiteError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::Core(CoreError::Validation(validation_message(&errors)))
    }
}

impl WebsiteError {
    /// The step error behind a rolled-back operation, or `self`.
    pub fn root(&self) -> &WebsiteError {
        match self {
            Self::Saga(saga) => saga.work_error().map_or(self, WebsiteError::root),
            other => other,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self.root(),
            Self::Core(CoreError::NotFound { .. }) | Self::Codec(CodecError::NotFound(_))
        )
    }
}

/// Flatten field errors into `field: message` pairs, sorted by field.
fn validation_message(errors: &validator::ValidationErrors) -> String {
    let mut parts: Vec<String> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| match &e.message {
                Some(msg) => msg.to_string(),
                None => format!("{field} is invalid"),
            })
        })
        .collect();
    parts.sort();
    parts.join(", ")
}

#[cfg(test)]
mod tests {
    use brandcfg_db::models::base_config::CreateBaseConfig;
    use validator::Validate;

    use super::*;

    #[test]
    fn validation_errors_are_sorted_messages() {
        let input = CreateBaseConfig {
            app_name: String::new(),
            platform: "tt".into(),
            app_code: String::new(),
            product: "p".into(),
            customer: "c".into(),
            appid: String::new(),
            version: "1.0.0".into(),
            cl: "cl".into(),
            uc: String::new(),
        };
        let err = WebsiteError::from(input.validate().unwrap_err());
        assert_eq!(
            err.to_string(),
            "Validation failed: app_code is required, app_name is required"
        );
    }

    #[test]
    fn root_unwraps_rolled_back_work_error() {
        let err = WebsiteError::from(SagaError::RolledBack {
            cause: brandcfg_saga::FailureCause::Work(WebsiteError::Core(CoreError::NotFound {
                entity: "client",
                id: 7,
            })),
            db_rollback: None,
            fs_rollback: None,
        });
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "Entity not found: client with id 7");
    }
}
