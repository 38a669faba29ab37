//! Repository for the `pay_configs` table.

use brandcfg_core::types::DbId;

use crate::models::pay_config::{CreatePayConfig, PayConfig};
use crate::DbConn;

/// Column list for pay_configs queries.
const COLUMNS: &str = "id, client_id, normal_pay_enable, normal_pay_gateway_android, \
    normal_pay_gateway_ios, renew_pay_enable, renew_pay_gateway_android, \
    renew_pay_gateway_ios, created_at, updated_at";

pub struct PayConfigRepo;

impl PayConfigRepo {
    pub async fn create(
        conn: &mut DbConn,
        client_id: DbId,
        input: &CreatePayConfig,
    ) -> Result<PayConfig, sqlx::Error> {
        let query = format!(
            "INSERT INTO pay_configs
                (client_id, normal_pay_enable, normal_pay_gateway_android, normal_pay_gateway_ios,
                 renew_pay_enable, renew_pay_gateway_android, renew_pay_gateway_ios)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, PayConfig>(&query)
            .bind(client_id)
            .bind(input.normal_pay_enable)
            .bind(input.normal_pay_gateway_android)
            .bind(input.normal_pay_gateway_ios)
            .bind(input.renew_pay_enable)
            .bind(input.renew_pay_gateway_android)
            .bind(input.renew_pay_gateway_ios)
            .fetch_one(conn)
            .await
    }

    pub async fn find_by_client(
        conn: &mut DbConn,
        client_id: DbId,
    ) -> Result<Option<PayConfig>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM pay_configs WHERE client_id = $1");
        sqlx::query_as::<_, PayConfig>(&query)
            .bind(client_id)
            .fetch_optional(conn)
            .await
    }

    pub async fn update_by_client(
        conn: &mut DbConn,
        client_id: DbId,
        input: &CreatePayConfig,
    ) -> Result<Option<PayConfig>, sqlx::Error> {
        let query = format!(
            "UPDATE pay_configs SET
                normal_pay_enable = $1, normal_pay_gateway_android = $2,
                normal_pay_gateway_ios = $3, renew_pay_enable = $4,
                renew_pay_gateway_android = $5, renew_pay_gateway_ios = $6,
                updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
             WHERE client_id = $7
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, PayConfig>(&query)
            .bind(input.normal_pay_enable)
            .bind(input.normal_pay_gateway_android)
            .bind(input.normal_pay_gateway_ios)
            .bind(input.renew_pay_enable)
            .bind(input.renew_pay_gateway_android)
            .bind(input.renew_pay_gateway_ios)
            .bind(client_id)
            .fetch_optional(conn)
            .await
    }

    pub async fn delete_by_client(conn: &mut DbConn, client_id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM pay_configs WHERE client_id = $1")
            .bind(client_id)
            .execute(conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
