use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::pagination::{Page, PageRequest};
use crate::application::repos::{
    CategoriesRepo, CategoriesWriteRepo, CategoryQueryFilter, CreateCategoryParams, RepoError,
    UpdateCategoryParams,
};
use crate::domain::entities::CategoryRecord;
use crate::domain::types::CategoryKind;

use super::PostgresRepositories;
use super::util::{convert_count, map_sqlx_error};

const CATEGORY_COLUMNS: &str = "c.id, c.name, c.kind, c.sort_order, c.created_at, c.updated_at";

#[derive(sqlx::FromRow)]
struct CategoryRow {
    id: Uuid,
    name: String,
    kind: CategoryKind,
    sort_order: i32,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<CategoryRow> for CategoryRecord {
    fn from(row: CategoryRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            kind: row.kind,
            sort_order: row.sort_order,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl CategoriesRepo for PostgresRepositories {
    async fn list_all(&self, kind: Option<CategoryKind>) -> Result<Vec<CategoryRecord>, RepoError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT ");
        qb.push(CATEGORY_COLUMNS);
        qb.push(" FROM categories c WHERE 1=1 ");

        if let Some(kind) = kind {
            qb.push(" AND c.kind = ");
            qb.push_bind(kind);
        }

        qb.push(" ORDER BY c.sort_order ASC, c.updated_at DESC ");

        let rows = qb
            .build_query_as::<CategoryRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(CategoryRecord::from).collect())
    }

    async fn list_page(
        &self,
        filter: &CategoryQueryFilter,
        page: PageRequest,
    ) -> Result<Page<CategoryRecord>, RepoError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM categories c WHERE 1=1 ");
        apply_category_filter(&mut qb, filter);

        let total: i64 = qb
            .build_query_scalar()
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        let mut qb = QueryBuilder::<Postgres>::new("SELECT ");
        qb.push(CATEGORY_COLUMNS);
        qb.push(" FROM categories c WHERE 1=1 ");
        apply_category_filter(&mut qb, filter);
        qb.push(" ORDER BY c.sort_order ASC, c.updated_at DESC ");
        qb.push(" LIMIT ");
        qb.push_bind(page.limit());
        qb.push(" OFFSET ");
        qb.push_bind(page.offset());

        let rows = qb
            .build_query_as::<CategoryRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        let records = rows.into_iter().map(CategoryRecord::from).collect();
        Ok(Page::new(records, convert_count(total)?, page))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<CategoryRecord>, RepoError> {
        let row = sqlx::query_as::<_, CategoryRow>(
            "SELECT id, name, kind, sort_order, created_at, updated_at \
             FROM categories WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(CategoryRecord::from))
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<CategoryRecord>, RepoError> {
        let row = sqlx::query_as::<_, CategoryRow>(
            "SELECT id, name, kind, sort_order, created_at, updated_at \
             FROM categories WHERE name = $1",
        )
        .bind(name)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(CategoryRecord::from))
    }

    async fn count_dishes(&self, id: Uuid) -> Result<u64, RepoError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM dishes WHERE category_id = $1 AND NOT deleted",
        )
        .bind(id)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        convert_count(count)
    }
}

#[async_trait]
impl CategoriesWriteRepo for PostgresRepositories {
    async fn create_category(
        &self,
        params: CreateCategoryParams,
    ) -> Result<CategoryRecord, RepoError> {
        let CreateCategoryParams {
            name,
            kind,
            sort_order,
        } = params;

        let id = Uuid::new_v4();
        let now = OffsetDateTime::now_utc();

        let row = sqlx::query_as::<_, CategoryRow>(
            "INSERT INTO categories (id, name, kind, sort_order, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $5) \
             RETURNING id, name, kind, sort_order, created_at, updated_at",
        )
        .bind(id)
        .bind(name)
        .bind(kind)
        .bind(sort_order)
        .bind(now)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(CategoryRecord::from(row))
    }

    async fn update_category(
        &self,
        params: UpdateCategoryParams,
    ) -> Result<CategoryRecord, RepoError> {
        let UpdateCategoryParams {
            id,
            name,
            sort_order,
        } = params;

        let row = sqlx::query_as::<_, CategoryRow>(
            "UPDATE categories \
             SET name = $2, sort_order = $3, updated_at = now() \
             WHERE id = $1 \
             RETURNING id, name, kind, sort_order, created_at, updated_at",
        )
        .bind(id)
        .bind(name)
        .bind(sort_order)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(CategoryRecord::from(row))
    }

    async fn delete_category(&self, id: Uuid) -> Result<(), RepoError> {
        sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(())
    }
}

fn apply_category_filter<'q>(
    qb: &mut QueryBuilder<'q, Postgres>,
    filter: &'q CategoryQueryFilter,
) {
    if let Some(kind) = filter.kind {
        qb.push(" AND c.kind = ");
        qb.push_bind(kind);
    }

    if let Some(search) = filter.search.as_ref() {
        qb.push(" AND c.name ILIKE ");
        qb.push_bind(format!("%{}%", search));
    }
}
