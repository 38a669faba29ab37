//! Repository for the `base_configs` table.

use brandcfg_core::types::DbId;

use crate::models::base_config::{BaseConfig, CreateBaseConfig};
use crate::DbConn;

/// Column list for base_configs queries.
const COLUMNS: &str = "id, client_id, platform, app_name, app_code, product, customer, \
    appid, version, cl, uc, created_at, updated_at";

/// Provides CRUD operations for base configs. A client has at most one.
pub struct BaseConfigRepo;

impl BaseConfigRepo {
    /// Insert the base config of `client_id`, returning the created row.
    pub async fn create(
        conn: &mut DbConn,
        client_id: DbId,
        input: &CreateBaseConfig,
    ) -> Result<BaseConfig, sqlx::Error> {
        let query = format!(
            "INSERT INTO base_configs
                (client_id, platform, app_name, app_code, product, customer, appid, version, cl, uc)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, BaseConfig>(&query)
            .bind(client_id)
            .bind(&input.platform)
            .bind(&input.app_name)
            .bind(&input.app_code)
            .bind(&input.product)
            .bind(&input.customer)
            .bind(&input.appid)
            .bind(&input.version)
            .bind(&input.cl)
            .bind(&input.uc)
            .fetch_one(conn)
            .await
    }

    pub async fn find_by_client(
        conn: &mut DbConn,
        client_id: DbId,
    ) -> Result<Option<BaseConfig>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM base_configs WHERE client_id = $1");
        sqlx::query_as::<_, BaseConfig>(&query)
            .bind(client_id)
            .fetch_optional(conn)
            .await
    }

    /// Replace every field of the client's base config. Returns `None` if
    /// the client has none.
    pub async fn update_by_client(
        conn: &mut DbConn,
        client_id: DbId,
        input: &CreateBaseConfig,
    ) -> Result<Option<BaseConfig>, sqlx::Error> {
        let query = format!(
            "UPDATE base_configs SET
                platform = $1, app_name = $2, app_code = $3, product = $4,
                customer = $5, appid = $6, version = $7, cl = $8, uc = $9,
                updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
             WHERE client_id = $10
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, BaseConfig>(&query)
            .bind(&input.platform)
            .bind(&input.app_name)
            .bind(&input.app_code)
            .bind(&input.product)
            .bind(&input.customer)
            .bind(&input.appid)
            .bind(&input.version)
            .bind(&input.cl)
            .bind(&input.uc)
            .bind(client_id)
            .fetch_optional(conn)
            .await
    }

    /// Returns `true` if a row was deleted.
    pub async fn delete_by_client(conn: &mut DbConn, client_id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM base_configs WHERE client_id = $1")
            .bind(client_id)
            .execute(conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
