//! Website create/delete workflows.
//!
//! Each workflow is one orchestrated operation: every row it writes and
//! every file it touches commit together or are rolled back together.
//! Progress milestones are reported through the operation's sink, and the
//! cancellation token is checked between steps.

use std::sync::Arc;

use brandcfg_core::config::FileLayout;
use brandcfg_core::error::CoreError;
use brandcfg_core::kinds::Host;
use brandcfg_core::progress::ProgressSink;
use brandcfg_core::project_files::PlatformEntry;
use brandcfg_core::types::DbId;
use brandcfg_db::models::base_config::{BaseConfig, CreateBaseConfig};
use brandcfg_db::models::brand::Brand;
use brandcfg_db::models::client::{ClientWithBrand, CreateClient};
use brandcfg_db::models::common_config::{CommonConfig, CreateCommonConfig};
use brandcfg_db::models::novel_config::{CreateNovelConfig, NovelConfig};
use brandcfg_db::models::pay_config::{CreatePayConfig, PayConfig};
use brandcfg_db::models::ui_config::{CreateUiConfig, UiConfig};
use brandcfg_db::repositories::{
    BaseConfigRepo, BrandRepo, ClientRepo, CommonConfigRepo, NovelConfigRepo, PayConfigRepo,
    UiConfigRepo,
};
use brandcfg_db::{DbConn, DbPool};
use brandcfg_saga::{Orchestrator, TransactionContext};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use validator::Validate;

use crate::configs::{self, checkpoint, find_client, ConfigStep, ConfigSteps, NovelConfigService};
use crate::error::WebsiteError;
use crate::files::ProjectFileService;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct BasicInfo {
    pub brand_id: DbId,
    pub host: String,
}

/// Everything needed to create one website.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateWebsiteRequest {
    pub basic_info: BasicInfo,
    pub base_config: CreateBaseConfig,
    /// Base config of the companion mini-program channel (`tt` for `tth5`,
    /// `ks` for `ksh5`).
    #[serde(default)]
    pub extra_base_config: Option<CreateBaseConfig>,
    pub common_config: CreateCommonConfig,
    pub pay_config: CreatePayConfig,
    pub ui_config: CreateUiConfig,
    #[serde(default)]
    pub novel_config: Option<CreateNovelConfig>,
}

/// Ids of everything a create workflow wrote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WebsiteCreated {
    pub client_id: DbId,
    pub base_config_id: DbId,
    pub common_config_id: DbId,
    pub pay_config_id: DbId,
    pub ui_config_id: DbId,
    pub novel_config_id: Option<DbId>,
    pub extra_client_id: Option<DbId>,
    pub extra_base_config_id: Option<DbId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WebsiteDeleted {
    pub client_id: DbId,
    pub brand_code: String,
    pub host: String,
    /// The brand had no other client, so its files and row were removed.
    pub brand_removed: bool,
}

/// Every stored row of one website.
#[derive(Debug, Clone, Serialize)]
pub struct WebsiteConfig {
    pub client: ClientWithBrand,
    pub brand: Brand,
    pub base: BaseConfig,
    pub common: CommonConfig,
    pub pay: PayConfig,
    pub ui: UiConfig,
    pub novel: Option<NovelConfig>,
}

/// Check everything that can be checked without the database.
pub fn validate_request(req: &CreateWebsiteRequest) -> Result<Host, WebsiteError> {
    if req.basic_info.brand_id <= 0 {
        return Err(CoreError::Validation("brand_id must be a positive id".into()).into());
    }
    let host = Host::parse_primary(&req.basic_info.host)?;

    req.base_config.validate()?;
    if let Some(extra) = &req.extra_base_config {
        extra.validate()?;
    }
    configs::pay::validate(&req.pay_config)?;

    if host == Host::Tth5 {
        let novel = req.novel_config.as_ref().ok_or_else(|| {
            CoreError::Validation("novel_config is required for tth5".into())
        })?;
        configs::novel::validate_required(novel)?;
    }
    Ok(host)
}

// ---------------------------------------------------------------------------
// WebsiteService
// ---------------------------------------------------------------------------

/// Creates, deletes and reads websites. Cheap to clone.
#[derive(Clone)]
pub struct WebsiteService {
    orchestrator: Orchestrator,
    steps: ConfigSteps,
    novel: NovelConfigService,
    files: ProjectFileService,
}

impl WebsiteService {
    pub fn new(pool: DbPool, layout: Arc<FileLayout>) -> Self {
        let orchestrator = Orchestrator::new(pool);
        let steps = ConfigSteps::standard(&orchestrator, layout.clone());
        Self::with_steps(orchestrator, layout, steps)
    }

    /// Assemble a service from explicit steps, e.g. to substitute one kind.
    pub fn with_steps(orchestrator: Orchestrator, layout: Arc<FileLayout>, steps: ConfigSteps) -> Self {
        Self {
            novel: NovelConfigService::new(orchestrator.clone(), layout.clone()),
            files: ProjectFileService::new(layout),
            orchestrator,
            steps,
        }
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    // -----------------------------------------------------------------------
    // Create
    // -----------------------------------------------------------------------

    pub async fn create_website(
        &self,
        req: CreateWebsiteRequest,
        sink: Option<Arc<dyn ProgressSink>>,
        cancel: CancellationToken,
    ) -> Result<WebsiteCreated, WebsiteError> {
        tracing::info!(
            brand_id = req.basic_info.brand_id,
            host = %req.basic_info.host,
            "Creating website",
        );
        let this = self.clone();
        let created = self
            .orchestrator
            .execute_with_cancel("Create website", sink, cancel, move |ctx| {
                Box::pin(async move { this.run_create(ctx, &req).await })
            })
            .await?;
        tracing::info!(client_id = created.client_id, "Website created");
        Ok(created)
    }

    async fn run_create(
        &self,
        ctx: &mut TransactionContext,
        req: &CreateWebsiteRequest,
    ) -> Result<WebsiteCreated, WebsiteError> {
        ctx.progress(5, "Validating request", "");
        let host = validate_request(req)?;
        let brand_id = req.basic_info.brand_id;
        let brand = BrandRepo::find_by_id(&mut ctx.tx, brand_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "brand",
                id: brand_id,
            })?;
        if ClientRepo::exists(&mut ctx.tx, brand.id, host.as_str()).await? {
            return Err(CoreError::Conflict(format!(
                "Brand '{}' already has a {host} website",
                brand.code
            ))
            .into());
        }
        ctx.progress(10, "Request validated", &format!("{}/{host}", brand.code));
        checkpoint(ctx)?;

        ctx.progress(15, "Creating client", "");
        let client = create_client(&mut ctx.tx, &brand, host).await?;
        ctx.progress(20, "Client created", &format!("client id {}", client.id));
        checkpoint(ctx)?;

        ctx.progress(25, "Creating base config", "");
        let base_config_id = self.steps.base.create(ctx, &client, &req.base_config).await?;
        ctx.progress(30, "Base config created", "");
        checkpoint(ctx)?;

        ctx.progress(35, "Creating common config", "");
        let common_config_id = self.steps.common.create(ctx, &client, &req.common_config).await?;
        ctx.progress(40, "Common config created", "");
        checkpoint(ctx)?;

        ctx.progress(45, "Creating pay config", "");
        let pay_config_id = self.steps.pay.create(ctx, &client, &req.pay_config).await?;
        ctx.progress(50, "Pay config created", "");
        checkpoint(ctx)?;

        ctx.progress(55, "Creating UI config", "");
        let ui_config_id = self.steps.ui.create(ctx, &client, &req.ui_config).await?;
        ctx.progress(60, "UI config created", "");
        checkpoint(ctx)?;

        let mut extra_client_id = None;
        let mut extra_base_config_id = None;
        if let Some(extra) = &req.extra_base_config {
            match host.extra_host() {
                Some(extra_host) => {
                    ctx.progress(65, "Creating extra channel", extra_host.as_str());
                    let extra_client = create_client(&mut ctx.tx, &brand, extra_host).await?;
                    extra_base_config_id = Some(self.steps.base.create(ctx, &extra_client, extra).await?);
                    extra_client_id = Some(extra_client.id);
                    ctx.progress(70, "Extra channel created", extra_host.as_str());
                    checkpoint(ctx)?;
                }
                None => {
                    tracing::warn!(host = %host, "Extra base config ignored, host has no companion channel");
                    ctx.log(format!("Extra base config ignored for {host}"));
                }
            }
        }

        let mut novel_config_id = None;
        if let Some(novel) = &req.novel_config {
            ctx.progress(75, "Creating novel config", "");
            novel_config_id = Some(self.steps.novel.create(ctx, &client, novel).await?);
            ctx.progress(80, "Novel config created", "");
            checkpoint(ctx)?;
        }

        ctx.progress(85, "Registering build entries", "");
        let entry = PlatformEntry {
            brand: brand.code.clone(),
            host: host.as_str().to_string(),
            app_name: req.base_config.app_name.clone(),
        };
        self.files
            .register_platform(&mut ctx.files, &entry, &req.common_config.script_base)
            .await?;
        ctx.progress(90, "Build entries registered", &entry.key());
        checkpoint(ctx)?;

        ctx.progress(92, "Generating prebuild files", "");
        self.files
            .ensure_prebuild(&mut ctx.files, &brand.code, host.as_str(), &req.base_config.app_name)
            .await?;
        ctx.progress(95, "Prebuild files generated", "");
        checkpoint(ctx)?;

        ctx.progress(98, "Copying static assets", "");
        self.files.copy_static_assets(&mut ctx.files, &brand.code).await?;
        ctx.progress(100, "Static assets ready", "");

        Ok(WebsiteCreated {
            client_id: client.id,
            base_config_id,
            common_config_id,
            pay_config_id,
            ui_config_id,
            novel_config_id,
            extra_client_id,
            extra_base_config_id,
        })
    }

    // -----------------------------------------------------------------------
    // Delete
    // -----------------------------------------------------------------------

    pub async fn delete_website(
        &self,
        client_id: DbId,
        sink: Option<Arc<dyn ProgressSink>>,
        cancel: CancellationToken,
    ) -> Result<WebsiteDeleted, WebsiteError> {
        tracing::info!(client_id, "Deleting website");
        let this = self.clone();
        let deleted = self
            .orchestrator
            .execute_with_cancel("Delete website", sink, cancel, move |ctx| {
                Box::pin(async move { this.run_delete(ctx, client_id).await })
            })
            .await?;
        tracing::info!(
            client_id,
            brand = %deleted.brand_code,
            brand_removed = deleted.brand_removed,
            "Website deleted",
        );
        Ok(deleted)
    }

    async fn run_delete(
        &self,
        ctx: &mut TransactionContext,
        client_id: DbId,
    ) -> Result<WebsiteDeleted, WebsiteError> {
        ctx.progress(5, "Loading website", "");
        let client = find_client(&mut ctx.tx, client_id).await?;
        let brand = client.brand_code.clone();
        ctx.progress(10, "Website loaded", &format!("{brand}/{}", client.host));
        checkpoint(ctx)?;

        ctx.progress(20, "Deleting base config", "");
        self.delete_step(ctx, self.steps.base.as_ref(), &client).await?;
        ctx.progress(30, "Deleting common config", "");
        self.delete_step(ctx, self.steps.common.as_ref(), &client).await?;
        ctx.progress(40, "Deleting pay config", "");
        self.delete_step(ctx, self.steps.pay.as_ref(), &client).await?;
        ctx.progress(50, "Deleting UI config", "");
        self.delete_step(ctx, self.steps.ui.as_ref(), &client).await?;
        ctx.progress(55, "Deleting novel config", "");
        self.delete_step(ctx, self.steps.novel.as_ref(), &client).await?;
        checkpoint(ctx)?;

        ctx.progress(60, "Deleting client", "");
        ClientRepo::delete(&mut ctx.tx, client.id).await?;
        checkpoint(ctx)?;

        ctx.progress(70, "Removing build entries", "");
        self.files
            .unregister_platform(&mut ctx.files, &brand, &client.host)
            .await?;
        ctx.progress(80, "Removing prebuild channel directory", "");
        self.files
            .remove_prebuild_host(&mut ctx.files, &brand, &client.host)
            .await?;
        checkpoint(ctx)?;

        ctx.progress(90, "Checking remaining brand websites", "");
        let remaining = BrandRepo::count_clients_by_code(&mut ctx.tx, &brand).await?;
        let brand_removed = remaining == 0;
        if brand_removed {
            ctx.log(format!("No websites left for {brand}, removing brand files"));
            self.files.remove_brand_files(&mut ctx.files, &brand).await?;
            self.novel.remove_brand(&mut ctx.files, &brand).await?;
            BrandRepo::delete(&mut ctx.tx, client.brand_id).await?;
            tracing::info!(brand = %brand, "Brand removed");
        } else {
            tracing::debug!(brand = %brand, remaining, "Brand still in use, keeping shared files");
        }
        ctx.progress(100, "Website removed", "");

        Ok(WebsiteDeleted {
            client_id: client.id,
            brand_code: brand,
            host: client.host,
            brand_removed,
        })
    }

    async fn delete_step<I>(
        &self,
        ctx: &mut TransactionContext,
        step: &dyn ConfigStep<Input = I>,
        client: &ClientWithBrand,
    ) -> Result<(), WebsiteError>
    where
        I: Send + Sync,
    {
        if !step.delete(ctx, client).await? {
            tracing::warn!(kind = %step.kind(), client_id = client.id, "No config row to delete");
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Read
    // -----------------------------------------------------------------------

    /// Every stored row of the website behind `client_id`.
    pub async fn website_config(&self, client_id: DbId) -> Result<WebsiteConfig, WebsiteError> {
        let mut conn = self.orchestrator.pool().acquire().await?;
        let client = find_client(&mut conn, client_id).await?;
        let brand = BrandRepo::find_by_id(&mut conn, client.brand_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "brand",
                id: client.brand_id,
            })?;

        let missing = |entity: &'static str| CoreError::NotFound { entity, id: client_id };
        let base = BaseConfigRepo::find_by_client(&mut conn, client_id)
            .await?
            .ok_or_else(|| missing("base_config"))?;
        let common = CommonConfigRepo::find_by_client(&mut conn, client_id)
            .await?
            .ok_or_else(|| missing("common_config"))?;
        let pay = PayConfigRepo::find_by_client(&mut conn, client_id)
            .await?
            .ok_or_else(|| missing("pay_config"))?;
        let ui = UiConfigRepo::find_by_client(&mut conn, client_id)
            .await?
            .ok_or_else(|| missing("ui_config"))?;
        let novel = NovelConfigRepo::find_by_client(&mut conn, client_id).await?;

        Ok(WebsiteConfig {
            client,
            brand,
            base,
            common,
            pay,
            ui,
            novel,
        })
    }
}

async fn create_client(conn: &mut DbConn, brand: &Brand, host: Host) -> Result<ClientWithBrand, WebsiteError> {
    let client = ClientRepo::create(
        conn,
        &CreateClient {
            brand_id: brand.id,
            host: host.as_str().to_string(),
        },
    )
    .await?;
    Ok(ClientWithBrand {
        id: client.id,
        brand_id: brand.id,
        host: client.host,
        brand_code: brand.code.clone(),
    })
}
