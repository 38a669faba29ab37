//! Repository for the `clients` table.

use brandcfg_core::types::DbId;

use crate::models::client::{Client, ClientWithBrand, CreateClient};
use crate::DbConn;

/// Column list for clients queries.
const COLUMNS: &str = "id, brand_id, host, created_at, updated_at";

/// Provides CRUD operations for clients.
pub struct ClientRepo;

impl ClientRepo {
    /// Insert a new client, returning the created row.
    ///
    /// A second client for the same `(brand_id, host)` violates the unique
    /// constraint.
    pub async fn create(conn: &mut DbConn, input: &CreateClient) -> Result<Client, sqlx::Error> {
        let query = format!(
            "INSERT INTO clients (brand_id, host) VALUES ($1, $2)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Client>(&query)
            .bind(input.brand_id)
            .bind(&input.host)
            .fetch_one(conn)
            .await
    }

    pub async fn find_by_id(conn: &mut DbConn, id: DbId) -> Result<Option<Client>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM clients WHERE id = $1");
        sqlx::query_as::<_, Client>(&query)
            .bind(id)
            .fetch_optional(conn)
            .await
    }

    /// Find a client together with its brand code.
    pub async fn find_with_brand(
        conn: &mut DbConn,
        id: DbId,
    ) -> Result<Option<ClientWithBrand>, sqlx::Error> {
        sqlx::query_as::<_, ClientWithBrand>(
            "SELECT clients.id, clients.brand_id, clients.host, brands.code AS brand_code
             FROM clients
             JOIN brands ON clients.brand_id = brands.id
             WHERE clients.id = $1",
        )
        .bind(id)
        .fetch_optional(conn)
        .await
    }

    /// Whether the brand already has a client on `host`.
    pub async fn exists(conn: &mut DbConn, brand_id: DbId, host: &str) -> Result<bool, sqlx::Error> {
        let row: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM clients WHERE brand_id = $1 AND host = $2")
                .bind(brand_id)
                .bind(host)
                .fetch_one(conn)
                .await?;
        Ok(row.0 > 0)
    }

    pub async fn list_by_brand(conn: &mut DbConn, brand_id: DbId) -> Result<Vec<Client>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM clients WHERE brand_id = $1 ORDER BY id");
        sqlx::query_as::<_, Client>(&query)
            .bind(brand_id)
            .fetch_all(conn)
            .await
    }

    /// Delete a client by ID.
    ///
    /// Returns `true` if a row was deleted, `false` if not found.
    pub async fn delete(conn: &mut DbConn, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM clients WHERE id = $1")
            .bind(id)
            .execute(conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
