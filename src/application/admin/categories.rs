use std::sync::Arc;

use metrics::counter;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::application::admin::audit::AdminAuditService;
use crate::application::pagination::{Page, PageRequest};
use crate::application::repos::{
    CategoriesRepo, CategoriesWriteRepo, CategoryQueryFilter, CreateCategoryParams, RepoError,
    UpdateCategoryParams,
};
use crate::cache::CacheState;
use crate::domain::entities::CategoryRecord;
use crate::domain::types::CategoryKind;

const METRIC_CATEGORY_HIT: &str = "comanda_cache_category_hit_total";
const METRIC_CATEGORY_MISS: &str = "comanda_cache_category_miss_total";

#[derive(Debug, Error)]
pub enum AdminCategoryError {
    #[error("{0}")]
    ConstraintViolation(&'static str),
    #[error("category name `{name}` already exists")]
    DuplicateName { name: String },
    #[error("category is referenced by {count} dishes")]
    InUse { count: u64 },
    #[error("category not found")]
    NotFound,
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone)]
pub struct CreateCategoryCommand {
    pub name: String,
    pub kind: CategoryKind,
    pub sort_order: i32,
}

#[derive(Debug, Clone)]
pub struct UpdateCategoryCommand {
    pub id: Uuid,
    pub name: String,
    pub sort_order: i32,
}

#[derive(Clone)]
pub struct AdminCategoryService {
    reader: Arc<dyn CategoriesRepo>,
    writer: Arc<dyn CategoriesWriteRepo>,
    audit: AdminAuditService,
    cache: Option<CacheState>,
}

impl AdminCategoryService {
    pub fn new(
        reader: Arc<dyn CategoriesRepo>,
        writer: Arc<dyn CategoriesWriteRepo>,
        audit: AdminAuditService,
    ) -> Self {
        Self {
            reader,
            writer,
            audit,
            cache: None,
        }
    }

    /// Attach cache handles to this service (optional).
    pub fn with_cache_opt(mut self, cache: Option<CacheState>) -> Self {
        self.cache = cache;
        self
    }

    /// Full category listing for selector dropdowns, read through the
    /// cached singleton; a `kind` filter is applied in memory.
    pub async fn list_all(
        &self,
        kind: Option<CategoryKind>,
    ) -> Result<Vec<CategoryRecord>, AdminCategoryError> {
        if let Some(cache) = self.enabled_cache() {
            if let Some(all) = cache.store.get_categories() {
                counter!(METRIC_CATEGORY_HIT).increment(1);
                return Ok(filter_kind(all, kind));
            }
            counter!(METRIC_CATEGORY_MISS).increment(1);
        }

        let all = self.reader.list_all(None).await?;
        if let Some(cache) = self.enabled_cache() {
            cache.store.set_categories(all.clone());
        }
        Ok(filter_kind(all, kind))
    }

    pub async fn list(
        &self,
        filter: &CategoryQueryFilter,
        page: PageRequest,
    ) -> Result<Page<CategoryRecord>, AdminCategoryError> {
        self.reader
            .list_page(filter, page)
            .await
            .map_err(AdminCategoryError::from)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<CategoryRecord>, AdminCategoryError> {
        self.reader
            .find_by_id(id)
            .await
            .map_err(AdminCategoryError::from)
    }

    pub async fn create_category(
        &self,
        actor: &str,
        command: CreateCategoryCommand,
    ) -> Result<CategoryRecord, AdminCategoryError> {
        let name = command.name.trim().to_string();
        ensure_non_empty(&name, "name")?;

        if self.reader.find_by_name(&name).await?.is_some() {
            return Err(AdminCategoryError::DuplicateName { name });
        }

        let params = CreateCategoryParams {
            name,
            kind: command.kind,
            sort_order: command.sort_order,
        };

        let category = self
            .writer
            .create_category(params)
            .await
            .map_err(map_duplicate)?;

        let snapshot = CategorySnapshot {
            name: category.name.as_str(),
            kind: category.kind,
        };
        self.audit
            .record(
                actor,
                "category.create",
                "category",
                Some(&category.id.to_string()),
                Some(&snapshot),
            )
            .await?;

        if let Some(cache) = &self.cache {
            cache.trigger.category_upserted(category.id).await;
        }

        Ok(category)
    }

    pub async fn update_category(
        &self,
        actor: &str,
        command: UpdateCategoryCommand,
    ) -> Result<CategoryRecord, AdminCategoryError> {
        let name = command.name.trim().to_string();
        ensure_non_empty(&name, "name")?;

        let existing = self
            .reader
            .find_by_id(command.id)
            .await?
            .ok_or(AdminCategoryError::NotFound)?;

        if let Some(other) = self.reader.find_by_name(&name).await? {
            if other.id != existing.id {
                return Err(AdminCategoryError::DuplicateName { name });
            }
        }

        let params = UpdateCategoryParams {
            id: existing.id,
            name,
            sort_order: command.sort_order,
        };

        let category = self
            .writer
            .update_category(params)
            .await
            .map_err(map_duplicate)?;

        let snapshot = CategorySnapshot {
            name: category.name.as_str(),
            kind: category.kind,
        };
        self.audit
            .record(
                actor,
                "category.update",
                "category",
                Some(&category.id.to_string()),
                Some(&snapshot),
            )
            .await?;

        if let Some(cache) = &self.cache {
            cache.trigger.category_upserted(category.id).await;
        }

        Ok(category)
    }

    pub async fn delete_category(&self, actor: &str, id: Uuid) -> Result<(), AdminCategoryError> {
        let usage = self.reader.count_dishes(id).await?;
        if usage > 0 {
            return Err(AdminCategoryError::InUse { count: usage });
        }

        self.writer.delete_category(id).await?;
        self.audit
            .record(
                actor,
                "category.delete",
                "category",
                Some(&id.to_string()),
                Option::<&CategorySnapshot>::None,
            )
            .await?;

        if let Some(cache) = &self.cache {
            cache.trigger.category_deleted(id).await;
        }

        Ok(())
    }

    fn enabled_cache(&self) -> Option<&CacheState> {
        self.cache
            .as_ref()
            .filter(|cache| cache.config.is_enabled())
    }
}

#[derive(Debug, Serialize)]
struct CategorySnapshot<'a> {
    name: &'a str,
    kind: CategoryKind,
}

fn filter_kind(all: Vec<CategoryRecord>, kind: Option<CategoryKind>) -> Vec<CategoryRecord> {
    match kind {
        Some(kind) => all
            .into_iter()
            .filter(|category| category.kind == kind)
            .collect(),
        None => all,
    }
}

fn map_duplicate(err: RepoError) -> AdminCategoryError {
    match err {
        RepoError::Duplicate { constraint } => AdminCategoryError::DuplicateName { name: constraint },
        other => AdminCategoryError::Repo(other),
    }
}

fn ensure_non_empty(value: &str, field: &'static str) -> Result<(), AdminCategoryError> {
    if value.trim().is_empty() {
        return Err(AdminCategoryError::ConstraintViolation(field));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use time::OffsetDateTime;

    use crate::application::repos::AuditRepo;
    use crate::domain::entities::AuditLogRecord;

    use super::*;

    #[derive(Clone, Default)]
    struct StubCategoriesRepo {
        usage: u64,
        record: Option<CategoryRecord>,
    }

    #[async_trait]
    impl CategoriesRepo for StubCategoriesRepo {
        async fn list_all(
            &self,
            _kind: Option<CategoryKind>,
        ) -> Result<Vec<CategoryRecord>, RepoError> {
            Ok(self.record.clone().into_iter().collect())
        }

        async fn list_page(
            &self,
            _filter: &CategoryQueryFilter,
            page: PageRequest,
        ) -> Result<Page<CategoryRecord>, RepoError> {
            Ok(Page::empty(page))
        }

        async fn find_by_id(&self, id: Uuid) -> Result<Option<CategoryRecord>, RepoError> {
            Ok(self.record.clone().filter(|category| category.id == id))
        }

        async fn find_by_name(&self, name: &str) -> Result<Option<CategoryRecord>, RepoError> {
            Ok(self.record.clone().filter(|category| category.name == name))
        }

        async fn count_dishes(&self, _id: Uuid) -> Result<u64, RepoError> {
            Ok(self.usage)
        }
    }

    #[derive(Default)]
    struct RecordingCategoriesWriter {
        deleted: Mutex<Vec<Uuid>>,
    }

    #[async_trait]
    impl CategoriesWriteRepo for RecordingCategoriesWriter {
        async fn create_category(
            &self,
            params: CreateCategoryParams,
        ) -> Result<CategoryRecord, RepoError> {
            let now = OffsetDateTime::now_utc();
            Ok(CategoryRecord {
                id: Uuid::new_v4(),
                name: params.name,
                kind: params.kind,
                sort_order: params.sort_order,
                created_at: now,
                updated_at: now,
            })
        }

        async fn update_category(
            &self,
            _params: UpdateCategoryParams,
        ) -> Result<CategoryRecord, RepoError> {
            unreachable!("not used in these tests")
        }

        async fn delete_category(&self, id: Uuid) -> Result<(), RepoError> {
            self.deleted.lock().unwrap().push(id);
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeAuditRepo;

    #[async_trait]
    impl AuditRepo for FakeAuditRepo {
        async fn append_log(&self, _record: AuditLogRecord) -> Result<(), RepoError> {
            Ok(())
        }

        async fn list_recent(&self, _limit: u32) -> Result<Vec<AuditLogRecord>, RepoError> {
            Ok(Vec::new())
        }
    }

    fn sample_category(id: Uuid, name: &str) -> CategoryRecord {
        let now = OffsetDateTime::now_utc();
        CategoryRecord {
            id,
            name: name.to_string(),
            kind: CategoryKind::Dish,
            sort_order: 0,
            created_at: now,
            updated_at: now,
        }
    }

    fn service(reader: StubCategoriesRepo) -> (AdminCategoryService, Arc<RecordingCategoriesWriter>) {
        let writer_ref = Arc::new(RecordingCategoriesWriter::default());
        let writer: Arc<dyn CategoriesWriteRepo> = writer_ref.clone();
        let audit = AdminAuditService::new(Arc::new(FakeAuditRepo));
        (
            AdminCategoryService::new(Arc::new(reader), writer, audit),
            writer_ref,
        )
    }

    #[tokio::test]
    async fn delete_category_rejects_when_in_use() {
        let id = Uuid::new_v4();
        let reader = StubCategoriesRepo {
            usage: 7,
            record: Some(sample_category(id, "Mains")),
        };
        let (service, _) = service(reader);

        let result = service.delete_category("tester", id).await;
        match result {
            Err(AdminCategoryError::InUse { count }) => assert_eq!(count, 7),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn delete_category_allows_when_unused() {
        let id = Uuid::new_v4();
        let reader = StubCategoriesRepo {
            usage: 0,
            record: Some(sample_category(id, "Mains")),
        };
        let (service, writer) = service(reader);

        service
            .delete_category("tester", id)
            .await
            .expect("delete succeeds");

        assert_eq!(writer.deleted.lock().unwrap().as_slice(), &[id]);
    }

    #[tokio::test]
    async fn create_category_trims_name() {
        let (service, _) = service(StubCategoriesRepo::default());

        let created = service
            .create_category(
                "tester",
                CreateCategoryCommand {
                    name: "  Drinks  ".to_string(),
                    kind: CategoryKind::Dish,
                    sort_order: 3,
                },
            )
            .await
            .expect("create succeeds");

        assert_eq!(created.name, "Drinks");
    }

    #[tokio::test]
    async fn create_category_rejects_blank_name() {
        let (service, _) = service(StubCategoriesRepo::default());

        let result = service
            .create_category(
                "tester",
                CreateCategoryCommand {
                    name: "   ".to_string(),
                    kind: CategoryKind::Dish,
                    sort_order: 0,
                },
            )
            .await;

        assert!(matches!(
            result,
            Err(AdminCategoryError::ConstraintViolation("name"))
        ));
    }

    #[tokio::test]
    async fn create_category_rejects_duplicate_name() {
        let reader = StubCategoriesRepo {
            usage: 0,
            record: Some(sample_category(Uuid::new_v4(), "Mains")),
        };
        let (service, _) = service(reader);

        let result = service
            .create_category(
                "tester",
                CreateCategoryCommand {
                    name: "Mains".to_string(),
                    kind: CategoryKind::Dish,
                    sort_order: 0,
                },
            )
            .await;

        assert!(matches!(
            result,
            Err(AdminCategoryError::DuplicateName { .. })
        ));
    }
}
