//! Repository for the `ui_configs` table.

use brandcfg_core::types::DbId;

use crate::models::ui_config::{CreateUiConfig, UiConfig};
use crate::DbConn;

/// Column list for ui_configs queries.
const COLUMNS: &str =
    "id, client_id, theme_bg_main, theme_bg_second, theme_text_main, created_at, updated_at";

pub struct UiConfigRepo;

impl UiConfigRepo {
    pub async fn create(
        conn: &mut DbConn,
        client_id: DbId,
        input: &CreateUiConfig,
    ) -> Result<UiConfig, sqlx::Error> {
        let query = format!(
            "INSERT INTO ui_configs (client_id, theme_bg_main, theme_bg_second, theme_text_main)
             VALUES ($1, $2, $3, $4)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, UiConfig>(&query)
            .bind(client_id)
            .bind(&input.theme_bg_main)
            .bind(&input.theme_bg_second)
            .bind(&input.theme_text_main)
            .fetch_one(conn)
            .await
    }

    pub async fn find_by_client(
        conn: &mut DbConn,
        client_id: DbId,
    ) -> Result<Option<UiConfig>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM ui_configs WHERE client_id = $1");
        sqlx::query_as::<_, UiConfig>(&query)
            .bind(client_id)
            .fetch_optional(conn)
            .await
    }

    pub async fn update_by_client(
        conn: &mut DbConn,
        client_id: DbId,
        input: &CreateUiConfig,
    ) -> Result<Option<UiConfig>, sqlx::Error> {
        let query = format!(
            "UPDATE ui_configs SET
                theme_bg_main = $1, theme_bg_second = $2, theme_text_main = $3,
                updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
             WHERE client_id = $4
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, UiConfig>(&query)
            .bind(&input.theme_bg_main)
            .bind(&input.theme_bg_second)
            .bind(&input.theme_text_main)
            .bind(client_id)
            .fetch_optional(conn)
            .await
    }

    pub async fn delete_by_client(conn: &mut DbConn, client_id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM ui_configs WHERE client_id = $1")
            .bind(client_id)
            .execute(conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
