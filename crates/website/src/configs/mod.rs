//! Per-kind config services.
//!
//! Each kind owns one table and one channel entry per client in a generated
//! document. Within a website workflow the kinds are driven through the
//! [`ConfigStep`] trait so a workflow can be assembled from substitute
//! steps; each service also offers standalone orchestrated updates.

pub mod base;
pub mod common;
pub mod pay;
pub mod ui;
pub mod novel;

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use brandcfg_core::config::FileLayout;
use brandcfg_core::document::{ChannelSlot, ConfigValue};
use brandcfg_core::error::CoreError;
use brandcfg_core::kinds::ConfigKind;
use brandcfg_core::types::DbId;
use brandcfg_db::models::base_config::CreateBaseConfig;
use brandcfg_db::models::client::ClientWithBrand;
use brandcfg_db::models::common_config::CreateCommonConfig;
use brandcfg_db::models::novel_config::CreateNovelConfig;
use brandcfg_db::models::pay_config::CreatePayConfig;
use brandcfg_db::models::ui_config::CreateUiConfig;
use brandcfg_db::repositories::ClientRepo;
use brandcfg_db::DbConn;
use brandcfg_saga::{codec, FsRollback, Orchestrator, TransactionContext};

use crate::error::WebsiteError;

pub use base::BaseConfigService;
pub use common::CommonConfigService;
pub use novel::NovelConfigService;
pub use pay::PayConfigService;
pub use ui::UiConfigService;

/// One config kind as a step of a website workflow.
#[async_trait]
pub trait ConfigStep: Send + Sync {
    type Input: Send + Sync;

    fn kind(&self) -> ConfigKind;

    /// Insert the row for `client` and write its channel. Returns the row id.
    async fn create(
        &self,
        ctx: &mut TransactionContext,
        client: &ClientWithBrand,
        input: &Self::Input,
    ) -> Result<DbId, WebsiteError>;

    /// Delete the row and the channel. Returns `false` when the client had
    /// no row; the channel is removed either way.
    async fn delete(
        &self,
        ctx: &mut TransactionContext,
        client: &ClientWithBrand,
    ) -> Result<bool, WebsiteError>;
}

/// The full set of steps a website workflow runs.
#[derive(Clone)]
pub struct ConfigSteps {
    pub base: Arc<dyn ConfigStep<Input = CreateBaseConfig>>,
    pub common: Arc<dyn ConfigStep<Input = CreateCommonConfig>>,
    pub pay: Arc<dyn ConfigStep<Input = CreatePayConfig>>,
    pub ui: Arc<dyn ConfigStep<Input = CreateUiConfig>>,
    pub novel: Arc<dyn ConfigStep<Input = CreateNovelConfig>>,
}

impl ConfigSteps {
    /// The production steps, backed by the per-kind services.
    pub fn standard(orchestrator: &Orchestrator, layout: Arc<FileLayout>) -> Self {
        Self {
            base: Arc::new(BaseConfigService::new(orchestrator.clone(), layout.clone())),
            common: Arc::new(CommonConfigService::new(orchestrator.clone(), layout.clone())),
            pay: Arc::new(PayConfigService::new(orchestrator.clone(), layout.clone())),
            ui: Arc::new(UiConfigService::new(orchestrator.clone(), layout.clone())),
            novel: Arc::new(NovelConfigService::new(orchestrator.clone(), layout)),
        }
    }
}

// ---------------------------------------------------------------------------
// Channel helpers
// ---------------------------------------------------------------------------

/// Write `value` at `slot` of the document at `path`, staging the file and
/// any directory created for it.
pub(crate) async fn write_channel(
    files: &mut FsRollback,
    path: &Path,
    slot: &ChannelSlot,
    value: ConfigValue,
) -> Result<(), WebsiteError> {
    files.stage(path).await?;
    if let Some(parent) = path.parent() {
        files.create_dir_all(parent).await?;
    }
    let mut doc = codec::read_or_empty(path).await?;
    doc.set_channel(slot, value)?;
    codec::write(&doc, path).await?;
    tracing::debug!(path = %path.display(), channel = %slot, "Wrote channel");
    Ok(())
}

/// Remove `slot` from the document at `path`. A missing file or channel is
/// not an error. Returns whether a channel was removed.
pub(crate) async fn remove_channel(
    files: &mut FsRollback,
    path: &Path,
    slot: &ChannelSlot,
) -> Result<bool, WebsiteError> {
    files.lock(path).await;
    if !tokio::fs::try_exists(path).await.unwrap_or(false) {
        tracing::warn!(path = %path.display(), channel = %slot, "Config file missing, nothing to remove");
        return Ok(false);
    }

    files.stage(path).await?;
    let mut doc = codec::read(path).await?;
    if doc.remove_channel(slot).is_none() {
        tracing::warn!(path = %path.display(), channel = %slot, "Channel not present");
        return Ok(false);
    }
    codec::write(&doc, path).await?;
    tracing::debug!(path = %path.display(), channel = %slot, "Removed channel");
    Ok(true)
}

/// Read the channel of `(brand, host)` from the `kind` document.
pub(crate) async fn read_channel(
    layout: &FileLayout,
    kind: ConfigKind,
    brand: &str,
    host: &str,
) -> Result<ConfigValue, WebsiteError> {
    let path = layout.config_file(kind, brand);
    let slot = kind.slot(brand, host);
    let doc = codec::read(&path).await?;
    doc.channel(&slot).cloned().ok_or_else(|| {
        CoreError::ChannelNotFound {
            channel: slot.to_string(),
            file: path.display().to_string(),
        }
        .into()
    })
}

pub(crate) async fn find_client(conn: &mut DbConn, client_id: DbId) -> Result<ClientWithBrand, WebsiteError> {
    ClientRepo::find_with_brand(conn, client_id)
        .await?
        .ok_or_else(|| {
            CoreError::NotFound {
                entity: "client",
                id: client_id,
            }
            .into()
        })
}

/// Fail with [`WebsiteError::Cancelled`] once the operation's token fires.
pub(crate) fn checkpoint(ctx: &TransactionContext) -> Result<(), WebsiteError> {
    if ctx.is_cancelled() {
        ctx.log("Cancellation requested, stopping");
        return Err(WebsiteError::Cancelled);
    }
    Ok(())
}
