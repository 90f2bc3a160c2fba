use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder, Transaction};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::pagination::{Page, PageRequest};
use crate::application::repos::{
    CreateDishParams, DishListRecord, DishQueryFilter, DishesRepo, DishesWriteRepo, FlavorInput,
    FlavorsRepo, RepoError, UpdateDishParams,
};
use crate::domain::entities::{DishFlavorRecord, DishRecord, DishWithFlavors};
use crate::domain::types::DishStatus;

use super::PostgresRepositories;
use super::util::{convert_count, map_sqlx_error};

const DISH_COLUMNS: &str = "d.id, d.category_id, d.name, d.code, d.price_cents, d.image, \
     d.description, d.status, d.sort_order, d.deleted, d.created_at, d.updated_at";

#[derive(sqlx::FromRow)]
struct DishRow {
    id: Uuid,
    category_id: Uuid,
    name: String,
    code: Option<String>,
    price_cents: i64,
    image: Option<String>,
    description: Option<String>,
    status: DishStatus,
    sort_order: i32,
    deleted: bool,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<DishRow> for DishRecord {
    fn from(row: DishRow) -> Self {
        Self {
            id: row.id,
            category_id: row.category_id,
            name: row.name,
            code: row.code,
            price_cents: row.price_cents,
            image: row.image,
            description: row.description,
            status: row.status,
            sort_order: row.sort_order,
            deleted: row.deleted,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct DishListRow {
    id: Uuid,
    category_id: Uuid,
    name: String,
    code: Option<String>,
    price_cents: i64,
    image: Option<String>,
    description: Option<String>,
    status: DishStatus,
    sort_order: i32,
    deleted: bool,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
    category_name: String,
}

impl From<DishListRow> for DishListRecord {
    fn from(row: DishListRow) -> Self {
        Self {
            dish: DishRecord {
                id: row.id,
                category_id: row.category_id,
                name: row.name,
                code: row.code,
                price_cents: row.price_cents,
                image: row.image,
                description: row.description,
                status: row.status,
                sort_order: row.sort_order,
                deleted: row.deleted,
                created_at: row.created_at,
                updated_at: row.updated_at,
            },
            category_name: row.category_name,
        }
    }
}

#[derive(sqlx::FromRow)]
struct FlavorRow {
    id: Uuid,
    dish_id: Uuid,
    name: String,
    options_json: String,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<FlavorRow> for DishFlavorRecord {
    fn from(row: FlavorRow) -> Self {
        Self {
            id: row.id,
            dish_id: row.dish_id,
            name: row.name,
            options_json: row.options_json,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl DishesRepo for PostgresRepositories {
    async fn list_page(
        &self,
        filter: &DishQueryFilter,
        page: PageRequest,
    ) -> Result<Page<DishListRecord>, RepoError> {
        let mut qb =
            QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM dishes d WHERE NOT d.deleted ");
        apply_dish_filter(&mut qb, filter);

        let total: i64 = qb
            .build_query_scalar()
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        let mut qb = QueryBuilder::<Postgres>::new("SELECT ");
        qb.push(DISH_COLUMNS);
        qb.push(", c.name AS category_name \
             FROM dishes d \
             INNER JOIN categories c ON c.id = d.category_id \
             WHERE NOT d.deleted ");
        apply_dish_filter(&mut qb, filter);
        qb.push(" ORDER BY d.sort_order ASC, d.updated_at DESC ");
        qb.push(" LIMIT ");
        qb.push_bind(page.limit());
        qb.push(" OFFSET ");
        qb.push_bind(page.offset());

        let rows = qb
            .build_query_as::<DishListRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        let records = rows.into_iter().map(DishListRecord::from).collect();
        Ok(Page::new(records, convert_count(total)?, page))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<DishRecord>, RepoError> {
        let row = sqlx::query_as::<_, DishRow>(
            "SELECT id, category_id, name, code, price_cents, image, description, \
                    status, sort_order, deleted, created_at, updated_at \
             FROM dishes WHERE id = $1 AND NOT deleted",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(DishRecord::from))
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<DishRecord>, RepoError> {
        let row = sqlx::query_as::<_, DishRow>(
            "SELECT id, category_id, name, code, price_cents, image, description, \
                    status, sort_order, deleted, created_at, updated_at \
             FROM dishes WHERE name = $1 AND NOT deleted",
        )
        .bind(name)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(DishRecord::from))
    }

    async fn list_for_menu(
        &self,
        category_id: Uuid,
        status: DishStatus,
    ) -> Result<Vec<DishWithFlavors>, RepoError> {
        let rows = sqlx::query_as::<_, DishListRow>(
            "SELECT d.id, d.category_id, d.name, d.code, d.price_cents, d.image, \
                    d.description, d.status, d.sort_order, d.deleted, d.created_at, \
                    d.updated_at, c.name AS category_name \
             FROM dishes d \
             INNER JOIN categories c ON c.id = d.category_id \
             WHERE d.category_id = $1 AND d.status = $2 AND NOT d.deleted \
             ORDER BY d.sort_order ASC, d.updated_at DESC",
        )
        .bind(category_id)
        .bind(status)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let dish_ids: Vec<Uuid> = rows.iter().map(|row| row.id).collect();
        let flavor_rows = sqlx::query_as::<_, FlavorRow>(
            "SELECT id, dish_id, name, options_json, created_at, updated_at \
             FROM dish_flavors WHERE dish_id = ANY($1) \
             ORDER BY created_at ASC, id ASC",
        )
        .bind(dish_ids)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        let mut flavors_by_dish: HashMap<Uuid, Vec<DishFlavorRecord>> = HashMap::new();
        for row in flavor_rows {
            flavors_by_dish
                .entry(row.dish_id)
                .or_default()
                .push(DishFlavorRecord::from(row));
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let record = DishListRecord::from(row);
                let flavors = flavors_by_dish
                    .remove(&record.dish.id)
                    .unwrap_or_default();
                DishWithFlavors {
                    dish: record.dish,
                    category_name: record.category_name,
                    flavors,
                }
            })
            .collect())
    }
}

#[async_trait]
impl DishesWriteRepo for PostgresRepositories {
    async fn create_dish(
        &self,
        params: CreateDishParams,
        flavors: &[FlavorInput],
    ) -> Result<DishRecord, RepoError> {
        let CreateDishParams {
            category_id,
            name,
            code,
            price_cents,
            image,
            description,
            status,
            sort_order,
        } = params;

        let id = Uuid::new_v4();
        let now = OffsetDateTime::now_utc();

        let mut tx = self.pool().begin().await.map_err(map_sqlx_error)?;

        let row = sqlx::query_as::<_, DishRow>(
            "INSERT INTO dishes (id, category_id, name, code, price_cents, image, \
                                 description, status, sort_order, deleted, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, FALSE, $10, $10) \
             RETURNING id, category_id, name, code, price_cents, image, description, \
                       status, sort_order, deleted, created_at, updated_at",
        )
        .bind(id)
        .bind(category_id)
        .bind(name)
        .bind(code)
        .bind(price_cents)
        .bind(image)
        .bind(description)
        .bind(status)
        .bind(sort_order)
        .bind(now)
        .fetch_one(tx.as_mut())
        .await
        .map_err(map_sqlx_error)?;

        insert_flavors(&mut tx, row.id, flavors, now).await?;

        tx.commit().await.map_err(map_sqlx_error)?;

        Ok(DishRecord::from(row))
    }

    async fn update_dish(
        &self,
        params: UpdateDishParams,
        flavors: &[FlavorInput],
    ) -> Result<DishRecord, RepoError> {
        let UpdateDishParams {
            id,
            category_id,
            name,
            code,
            price_cents,
            image,
            description,
            status,
            sort_order,
        } = params;

        let now = OffsetDateTime::now_utc();

        let mut tx = self.pool().begin().await.map_err(map_sqlx_error)?;

        let row = sqlx::query_as::<_, DishRow>(
            "UPDATE dishes \
             SET category_id = $2, name = $3, code = $4, price_cents = $5, image = $6, \
                 description = $7, status = $8, sort_order = $9, updated_at = $10 \
             WHERE id = $1 AND NOT deleted \
             RETURNING id, category_id, name, code, price_cents, image, description, \
                       status, sort_order, deleted, created_at, updated_at",
        )
        .bind(id)
        .bind(category_id)
        .bind(name)
        .bind(code)
        .bind(price_cents)
        .bind(image)
        .bind(description)
        .bind(status)
        .bind(sort_order)
        .bind(now)
        .fetch_one(tx.as_mut())
        .await
        .map_err(map_sqlx_error)?;

        // Replace the flavor set wholesale, even when unchanged.
        sqlx::query("DELETE FROM dish_flavors WHERE dish_id = $1")
            .bind(id)
            .execute(tx.as_mut())
            .await
            .map_err(map_sqlx_error)?;

        insert_flavors(&mut tx, id, flavors, now).await?;

        tx.commit().await.map_err(map_sqlx_error)?;

        Ok(DishRecord::from(row))
    }

    async fn update_status(&self, ids: &[Uuid], status: DishStatus) -> Result<u64, RepoError> {
        let result = sqlx::query(
            "UPDATE dishes SET status = $1, updated_at = $2 \
             WHERE id = ANY($3) AND NOT deleted",
        )
        .bind(status)
        .bind(OffsetDateTime::now_utc())
        .bind(ids.to_vec())
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected())
    }

    async fn mark_deleted(&self, ids: &[Uuid]) -> Result<u64, RepoError> {
        let result = sqlx::query(
            "UPDATE dishes SET deleted = TRUE, status = $1, updated_at = $2 \
             WHERE id = ANY($3) AND NOT deleted",
        )
        .bind(DishStatus::Halted)
        .bind(OffsetDateTime::now_utc())
        .bind(ids.to_vec())
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected())
    }
}

#[async_trait]
impl FlavorsRepo for PostgresRepositories {
    async fn list_flavors(&self, dish_id: Uuid) -> Result<Vec<DishFlavorRecord>, RepoError> {
        let rows = sqlx::query_as::<_, FlavorRow>(
            "SELECT id, dish_id, name, options_json, created_at, updated_at \
             FROM dish_flavors WHERE dish_id = $1 \
             ORDER BY created_at ASC, id ASC",
        )
        .bind(dish_id)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(DishFlavorRecord::from).collect())
    }
}

async fn insert_flavors(
    tx: &mut Transaction<'_, Postgres>,
    dish_id: Uuid,
    flavors: &[FlavorInput],
    now: OffsetDateTime,
) -> Result<(), RepoError> {
    if flavors.is_empty() {
        return Ok(());
    }

    let mut qb = QueryBuilder::<Postgres>::new(
        "INSERT INTO dish_flavors (id, dish_id, name, options_json, created_at, updated_at) ",
    );
    qb.push_values(flavors, |mut b, flavor| {
        b.push_bind(Uuid::new_v4())
            .push_bind(dish_id)
            .push_bind(flavor.name.as_str())
            .push_bind(flavor.options_json.as_str())
            .push_bind(now)
            .push_bind(now);
    });

    qb.build()
        .execute(tx.as_mut())
        .await
        .map_err(map_sqlx_error)?;

    Ok(())
}

fn apply_dish_filter<'q>(qb: &mut QueryBuilder<'q, Postgres>, filter: &'q DishQueryFilter) {
    if let Some(category_id) = filter.category_id {
        qb.push(" AND d.category_id = ");
        qb.push_bind(category_id);
    }

    if let Some(search) = filter.search.as_ref() {
        qb.push(" AND d.name ILIKE ");
        qb.push_bind(format!("%{}%", search));
    }
}
