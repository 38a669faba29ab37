//! Shared fixture: a migrated SQLite file plus a scratch front-end project.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use brandcfg_core::config::FileLayout;
use brandcfg_core::progress::{ProgressEvent, ProgressSink};
use brandcfg_db::models::brand::{Brand, CreateBrand, CreateBrandType};
use brandcfg_db::repositories::{BrandRepo, BrandTypeRepo};
use brandcfg_db::DbPool;
use brandcfg_website::{CreateWebsiteRequest, WebsiteService};
use tempfile::TempDir;
use tokio::sync::mpsc;

pub const VITE_CONFIG: &str = "import { defineConfig } from 'vite'\n\
\n\
const basePathMap = {\n  'h5-jinse': '/jinse/',\n}\n\
\n\
export default defineConfig({\n  base: basePathMap[process.env.UNI_UTS_PLATFORM],\n})\n";

pub const PACKAGE_JSON: &str = r#"{
  "name": "fun-novel",
  "scripts": {
    "dev:h5-jinse": "uni -p h5-jinse --minify",
    "build:h5-jinse": "uni build -p h5-jinse --minify"
  },
  "uni-app": {
    "scripts": {}
  }
}
"#;

pub struct Fixture {
    pub dir: TempDir,
    pub pool: DbPool,
    pub layout: Arc<FileLayout>,
}

impl Fixture {
    pub async fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("website.db").display());
        let pool = brandcfg_db::create_pool(&url, 4).await.unwrap();
        brandcfg_db::run_migrations(&pool).await.unwrap();

        let layout = Arc::new(FileLayout::from_base(dir.path().join("edit")));
        let template = layout.static_template_dir();
        tokio::fs::create_dir_all(template.join("icons")).await.unwrap();
        tokio::fs::write(template.join("logo.png"), b"logo").await.unwrap();
        tokio::fs::write(template.join("icons").join("home.png"), b"home")
            .await
            .unwrap();
        tokio::fs::write(&layout.vite_config_file, VITE_CONFIG).await.unwrap();
        tokio::fs::write(&layout.package_file, PACKAGE_JSON).await.unwrap();

        Self { dir, pool, layout }
    }

    pub fn service(&self) -> WebsiteService {
        WebsiteService::new(self.pool.clone(), self.layout.clone())
    }

    pub async fn seed_brand(&self, code: &str) -> Brand {
        let mut conn = self.pool.acquire().await.unwrap();
        let kind = match BrandTypeRepo::find_by_code(&mut conn, "novel").await.unwrap() {
            Some(kind) => kind,
            None => BrandTypeRepo::create(
                &mut conn,
                &CreateBrandType {
                    name: "Novel".into(),
                    code: "novel".into(),
                },
            )
            .await
            .unwrap(),
        };
        BrandRepo::create(
            &mut conn,
            &CreateBrand {
                code: code.into(),
                type_id: kind.id,
            },
        )
        .await
        .unwrap()
    }

    /// Every file (with content) and directory under the project base.
    pub async fn snapshot(&self) -> BTreeMap<PathBuf, Option<Vec<u8>>> {
        let mut out = BTreeMap::new();
        let mut pending = vec![self.layout.base_path.clone()];
        while let Some(dir) = pending.pop() {
            let mut entries = tokio::fs::read_dir(&dir).await.unwrap();
            while let Some(entry) = entries.next_entry().await.unwrap() {
                let path = entry.path();
                if entry.file_type().await.unwrap().is_dir() {
                    out.insert(path.clone(), None);
                    pending.push(path);
                } else {
                    out.insert(path.clone(), Some(tokio::fs::read(&path).await.unwrap()));
                }
            }
        }
        out
    }

    pub async fn read(&self, path: &Path) -> String {
        tokio::fs::read_to_string(path).await.unwrap()
    }
}

/// A complete request for `host` on `brand_id`. `tth5` gets the novel
/// config it requires.
pub fn request(brand_id: i64, host: &str) -> CreateWebsiteRequest {
    let mut body = serde_json::json!({
        "basic_info": {"brand_id": brand_id, "host": host},
        "base_config": {
            "app_name": "Acme Reader",
            "platform": "h5",
            "app_code": "acme",
            "product": "1001",
            "customer": "2002",
            "cl": format!("acme_{host}"),
        },
        "common_config": {
            "deliver_business_id_enable": true,
            "deliver_business_id": "biz-1",
            "protocol_company": "Acme Ltd",
            "contact_url": "https://acme.example/contact",
            "script_base": format!("/acme-{host}/"),
        },
        "pay_config": {
            "normal_pay_enable": true,
            "normal_pay_gateway_android": 11,
            "normal_pay_gateway_ios": 12,
        },
        "ui_config": {
            "theme_bg_main": "#ffffff",
            "theme_bg_second": "#f5f5f5",
            "theme_text_main": "#333333",
        },
    });
    if host == "tth5" {
        body["novel_config"] = serde_json::json!({
            "tt_jump_home_url": "https://acme.example/home",
            "tt_login_callback_domain": "acme.example",
        });
    }
    serde_json::from_value(body).unwrap()
}

pub fn recorder() -> (Arc<dyn ProgressSink>, mpsc::UnboundedReceiver<ProgressEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Arc::new(tx), rx)
}

pub fn drain(rx: &mut mpsc::UnboundedReceiver<ProgressEvent>) -> Vec<ProgressEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
