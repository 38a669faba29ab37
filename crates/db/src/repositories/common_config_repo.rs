//! Repository for the `common_configs` table.

use brandcfg_core::types::DbId;

use crate::models::common_config::{CommonConfig, CreateCommonConfig};
use crate::DbConn;

/// Column list for common_configs queries.
const COLUMNS: &str = "id, client_id, deliver_business_id_enable, deliver_business_id, \
    deliver_switch_id_enable, deliver_switch_id, protocol_company, protocol_about, \
    protocol_privacy, protocol_vod, protocol_user_cancel, contact_url, script_base, \
    created_at, updated_at";

pub struct CommonConfigRepo;

impl CommonConfigRepo {
    pub async fn create(
        conn: &mut DbConn,
        client_id: DbId,
        input: &CreateCommonConfig,
    ) -> Result<CommonConfig, sqlx::Error> {
        let query = format!(
            "INSERT INTO common_configs
                (client_id, deliver_business_id_enable, deliver_business_id,
                 deliver_switch_id_enable, deliver_switch_id, protocol_company,
                 protocol_about, protocol_privacy, protocol_vod, protocol_user_cancel,
                 contact_url, script_base)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, CommonConfig>(&query)
            .bind(client_id)
            .bind(input.deliver_business_id_enable)
            .bind(&input.deliver_business_id)
            .bind(input.deliver_switch_id_enable)
            .bind(&input.deliver_switch_id)
            .bind(&input.protocol_company)
            .bind(&input.protocol_about)
            .bind(&input.protocol_privacy)
            .bind(&input.protocol_vod)
            .bind(&input.protocol_user_cancel)
            .bind(&input.contact_url)
            .bind(&input.script_base)
            .fetch_one(conn)
            .await
    }

    pub async fn find_by_client(
        conn: &mut DbConn,
        client_id: DbId,
    ) -> Result<Option<CommonConfig>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM common_configs WHERE client_id = $1");
        sqlx::query_as::<_, CommonConfig>(&query)
            .bind(client_id)
            .fetch_optional(conn)
            .await
    }

    pub async fn update_by_client(
        conn: &mut DbConn,
        client_id: DbId,
        input: &CreateCommonConfig,
    ) -> Result<Option<CommonConfig>, sqlx::Error> {
        let query = format!(
            "UPDATE common_configs SET
                deliver_business_id_enable = $1, deliver_business_id = $2,
                deliver_switch_id_enable = $3, deliver_switch_id = $4,
                protocol_company = $5, protocol_about = $6, protocol_privacy = $7,
                protocol_vod = $8, protocol_user_cancel = $9, contact_url = $10,
                script_base = $11,
                updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
             WHERE client_id = $12
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, CommonConfig>(&query)
            .bind(input.deliver_business_id_enable)
            .bind(&input.deliver_business_id)
            .bind(input.deliver_switch_id_enable)
            .bind(&input.deliver_switch_id)
            .bind(&input.protocol_company)
            .bind(&input.protocol_about)
            .bind(&input.protocol_privacy)
            .bind(&input.protocol_vod)
            .bind(&input.protocol_user_cancel)
            .bind(&input.contact_url)
            .bind(&input.script_base)
            .bind(client_id)
            .fetch_optional(conn)
            .await
    }

    pub async fn delete_by_client(conn: &mut DbConn, client_id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM common_configs WHERE client_id = $1")
            .bind(client_id)
            .execute(conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
