//! Repository for the `novel_configs` table.

use brandcfg_core::types::DbId;

use crate::models::novel_config::{CreateNovelConfig, NovelConfig};
use crate::DbConn;

/// Column list for novel_configs queries.
const COLUMNS: &str =
    "id, client_id, tt_jump_home_url, tt_login_callback_domain, created_at, updated_at";

pub struct NovelConfigRepo;

impl NovelConfigRepo {
    pub async fn create(
        conn: &mut DbConn,
        client_id: DbId,
        input: &CreateNovelConfig,
    ) -> Result<NovelConfig, sqlx::Error> {
        let query = format!(
            "INSERT INTO novel_configs (client_id, tt_jump_home_url, tt_login_callback_domain)
             VALUES ($1, $2, $3)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, NovelConfig>(&query)
            .bind(client_id)
            .bind(&input.tt_jump_home_url)
            .bind(&input.tt_login_callback_domain)
            .fetch_one(conn)
            .await
    }

    pub async fn find_by_client(
        conn: &mut DbConn,
        client_id: DbId,
    ) -> Result<Option<NovelConfig>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM novel_configs WHERE client_id = $1");
        sqlx::query_as::<_, NovelConfig>(&query)
            .bind(client_id)
            .fetch_optional(conn)
            .await
    }

    pub async fn update_by_client(
        conn: &mut DbConn,
        client_id: DbId,
        input: &CreateNovelConfig,
    ) -> Result<Option<NovelConfig>, sqlx::Error> {
        let query = format!(
            "UPDATE novel_configs SET
                tt_jump_home_url = $1, tt_login_callback_domain = $2,
                updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
             WHERE client_id = $3
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, NovelConfig>(&query)
            .bind(&input.tt_jump_home_url)
            .bind(&input.tt_login_callback_domain)
            .bind(client_id)
            .fetch_optional(conn)
            .await
    }

    pub async fn delete_by_client(conn: &mut DbConn, client_id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM novel_configs WHERE client_id = $1")
            .bind(client_id)
            .execute(conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
