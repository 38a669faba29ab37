//! Repositories for the `brand_types` and `brands` tables.

use brandcfg_core::types::DbId;

use crate::models::brand::{Brand, BrandType, CreateBrand, CreateBrandType};
use crate::DbConn;

/// Column list for brands queries.
const COLUMNS: &str = "id, code, type_id, created_at, updated_at";

/// Provides access to the brand type lookup table.
pub struct BrandTypeRepo;

impl BrandTypeRepo {
    pub async fn create(conn: &mut DbConn, input: &CreateBrandType) -> Result<BrandType, sqlx::Error> {
        sqlx::query_as::<_, BrandType>(
            "INSERT INTO brand_types (name, code) VALUES ($1, $2)
             RETURNING id, name, code",
        )
        .bind(&input.name)
        .bind(&input.code)
        .fetch_one(conn)
        .await
    }

    pub async fn find_by_code(conn: &mut DbConn, code: &str) -> Result<Option<BrandType>, sqlx::Error> {
        sqlx::query_as::<_, BrandType>("SELECT id, name, code FROM brand_types WHERE code = $1")
            .bind(code)
            .fetch_optional(conn)
            .await
    }
}

/// Provides CRUD operations for brands.
pub struct BrandRepo;

impl BrandRepo {
    /// Insert a new brand, returning the created row.
    pub async fn create(conn: &mut DbConn, input: &CreateBrand) -> Result<Brand, sqlx::Error> {
        let query = format!(
            "INSERT INTO brands (code, type_id) VALUES ($1, $2)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Brand>(&query)
            .bind(&input.code)
            .bind(input.type_id)
            .fetch_one(conn)
            .await
    }

    pub async fn find_by_id(conn: &mut DbConn, id: DbId) -> Result<Option<Brand>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM brands WHERE id = $1");
        sqlx::query_as::<_, Brand>(&query)
            .bind(id)
            .fetch_optional(conn)
            .await
    }

    pub async fn find_by_code(conn: &mut DbConn, code: &str) -> Result<Option<Brand>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM brands WHERE code = $1");
        sqlx::query_as::<_, Brand>(&query)
            .bind(code)
            .fetch_optional(conn)
            .await
    }

    /// Number of clients still attached to the brand with `code`.
    pub async fn count_clients_by_code(conn: &mut DbConn, code: &str) -> Result<i64, sqlx::Error> {
        let row: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM clients
             JOIN brands ON clients.brand_id = brands.id
             WHERE brands.code = $1",
        )
        .bind(code)
        .fetch_one(conn)
        .await?;
        Ok(row.0)
    }

    /// Delete a brand by ID.
    ///
    /// Returns `true` if a row was deleted, `false` if not found. Fails with
    /// a foreign key violation while clients still reference the brand.
    pub async fn delete(conn: &mut DbConn, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM brands WHERE id = $1")
            .bind(id)
            .execute(conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
