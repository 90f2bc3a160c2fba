//! Router-level tests over stub repositories.
//!
//! These drive the JSON API end to end, including the cache
//! invalidation loop, without a database.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use time::OffsetDateTime;
use tower::ServiceExt;
use uuid::Uuid;

use comanda::application::admin::audit::AdminAuditService;
use comanda::application::admin::categories::AdminCategoryService;
use comanda::application::admin::dishes::AdminDishService;
use comanda::application::pagination::{Page, PageRequest};
use comanda::application::repos::{
    AuditRepo, CategoriesRepo, CategoriesWriteRepo, CategoryQueryFilter, CreateCategoryParams,
    CreateDishParams, DishListRecord, DishQueryFilter, DishesRepo, DishesWriteRepo, FlavorInput,
    FlavorsRepo, HealthRepo, RepoError, UpdateCategoryParams, UpdateDishParams,
};
use comanda::cache::{
    CacheConfig, CacheConsumer, CacheState, CacheStore, CacheTrigger, EventQueue,
};
use comanda::domain::entities::{
    AuditLogRecord, CategoryRecord, DishFlavorRecord, DishRecord, DishWithFlavors,
};
use comanda::domain::types::{CategoryKind, DishStatus};
use comanda::infra::http::{ApiState, build_api_router};

#[derive(Default)]
struct InMemoryCategories {
    records: Mutex<HashMap<Uuid, CategoryRecord>>,
    dish_counts: Mutex<HashMap<Uuid, u64>>,
}

impl InMemoryCategories {
    fn insert(&self, record: CategoryRecord) {
        self.records.lock().unwrap().insert(record.id, record);
    }

    fn set_dish_count(&self, id: Uuid, count: u64) {
        self.dish_counts.lock().unwrap().insert(id, count);
    }
}

#[async_trait]
impl CategoriesRepo for InMemoryCategories {
    async fn list_all(&self, kind: Option<CategoryKind>) -> Result<Vec<CategoryRecord>, RepoError> {
        let mut records: Vec<CategoryRecord> = self
            .records
            .lock()
            .unwrap()
            .values()
            .filter(|record| kind.is_none_or(|kind| record.kind == kind))
            .cloned()
            .collect();
        records.sort_by_key(|record| record.sort_order);
        Ok(records)
    }

    async fn list_page(
        &self,
        filter: &CategoryQueryFilter,
        page: PageRequest,
    ) -> Result<Page<CategoryRecord>, RepoError> {
        let records = self.list_all(filter.kind).await?;
        let total = records.len() as u64;
        Ok(Page::new(records, total, page))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<CategoryRecord>, RepoError> {
        Ok(self.records.lock().unwrap().get(&id).cloned())
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<CategoryRecord>, RepoError> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .values()
            .find(|record| record.name == name)
            .cloned())
    }

    async fn count_dishes(&self, id: Uuid) -> Result<u64, RepoError> {
        Ok(self.dish_counts.lock().unwrap().get(&id).copied().unwrap_or(0))
    }
}

#[async_trait]
impl CategoriesWriteRepo for InMemoryCategories {
    async fn create_category(
        &self,
        params: CreateCategoryParams,
    ) -> Result<CategoryRecord, RepoError> {
        let now = OffsetDateTime::now_utc();
        let record = CategoryRecord {
            id: Uuid::new_v4(),
            name: params.name,
            kind: params.kind,
            sort_order: params.sort_order,
            created_at: now,
            updated_at: now,
        };
        self.insert(record.clone());
        Ok(record)
    }

    async fn update_category(
        &self,
        params: UpdateCategoryParams,
    ) -> Result<CategoryRecord, RepoError> {
        let mut records = self.records.lock().unwrap();
        let record = records.get_mut(&params.id).ok_or(RepoError::NotFound)?;
        record.name = params.name;
        record.sort_order = params.sort_order;
        record.updated_at = OffsetDateTime::now_utc();
        Ok(record.clone())
    }

    async fn delete_category(&self, id: Uuid) -> Result<(), RepoError> {
        self.records.lock().unwrap().remove(&id);
        Ok(())
    }
}

#[derive(Default)]
struct StubDishes {
    menu: Mutex<Vec<DishWithFlavors>>,
    menu_calls: AtomicUsize,
}

#[async_trait]
impl DishesRepo for StubDishes {
    async fn list_page(
        &self,
        _filter: &DishQueryFilter,
        page: PageRequest,
    ) -> Result<Page<DishListRecord>, RepoError> {
        Ok(Page::empty(page))
    }

    async fn find_by_id(&self, _id: Uuid) -> Result<Option<DishRecord>, RepoError> {
        Ok(None)
    }

    async fn find_by_name(&self, _name: &str) -> Result<Option<DishRecord>, RepoError> {
        Ok(None)
    }

    async fn list_for_menu(
        &self,
        _category_id: Uuid,
        _status: DishStatus,
    ) -> Result<Vec<DishWithFlavors>, RepoError> {
        self.menu_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.menu.lock().unwrap().clone())
    }
}

#[async_trait]
impl DishesWriteRepo for StubDishes {
    async fn create_dish(
        &self,
        _params: CreateDishParams,
        _flavors: &[FlavorInput],
    ) -> Result<DishRecord, RepoError> {
        unreachable!("not driven by these tests")
    }

    async fn update_dish(
        &self,
        _params: UpdateDishParams,
        _flavors: &[FlavorInput],
    ) -> Result<DishRecord, RepoError> {
        unreachable!("not driven by these tests")
    }

    async fn update_status(&self, ids: &[Uuid], _status: DishStatus) -> Result<u64, RepoError> {
        Ok(ids.len() as u64)
    }

    async fn mark_deleted(&self, ids: &[Uuid]) -> Result<u64, RepoError> {
        Ok(ids.len() as u64)
    }
}

struct NoFlavors;

#[async_trait]
impl FlavorsRepo for NoFlavors {
    async fn list_flavors(&self, _dish_id: Uuid) -> Result<Vec<DishFlavorRecord>, RepoError> {
        Ok(Vec::new())
    }
}

#[derive(Default)]
struct RecordingAudit {
    records: Mutex<Vec<AuditLogRecord>>,
}

#[async_trait]
impl AuditRepo for RecordingAudit {
    async fn append_log(&self, record: AuditLogRecord) -> Result<(), RepoError> {
        self.records.lock().unwrap().push(record);
        Ok(())
    }

    async fn list_recent(&self, limit: u32) -> Result<Vec<AuditLogRecord>, RepoError> {
        let records = self.records.lock().unwrap();
        Ok(records.iter().rev().take(limit as usize).cloned().collect())
    }
}

struct HealthyDb;

#[async_trait]
impl HealthRepo for HealthyDb {
    async fn ping(&self) -> Result<(), RepoError> {
        Ok(())
    }
}

struct TestBackend {
    categories: Arc<InMemoryCategories>,
    dishes: Arc<StubDishes>,
    audit: Arc<RecordingAudit>,
}

impl Default for TestBackend {
    fn default() -> Self {
        Self {
            categories: Arc::new(InMemoryCategories::default()),
            dishes: Arc::new(StubDishes::default()),
            audit: Arc::new(RecordingAudit::default()),
        }
    }
}

fn cache_state() -> CacheState {
    let config = CacheConfig::default();
    let store = Arc::new(CacheStore::new(&config));
    let queue = Arc::new(EventQueue::new());
    let consumer = Arc::new(CacheConsumer::detached(
        config.clone(),
        store.clone(),
        queue.clone(),
    ));
    let trigger = Arc::new(CacheTrigger::new(config.clone(), queue, consumer));
    CacheState {
        config,
        store,
        trigger,
    }
}

fn build_router(backend: &TestBackend) -> Router {
    let cache = cache_state();
    let audit = AdminAuditService::new(backend.audit.clone());

    let categories = Arc::new(
        AdminCategoryService::new(
            backend.categories.clone(),
            backend.categories.clone(),
            audit.clone(),
        )
        .with_cache_opt(Some(cache.clone())),
    );
    let dishes = Arc::new(
        AdminDishService::new(
            backend.dishes.clone(),
            backend.dishes.clone(),
            Arc::new(NoFlavors),
            backend.categories.clone(),
            audit.clone(),
        )
        .with_cache_opt(Some(cache)),
    );

    build_api_router(ApiState {
        categories,
        dishes,
        audit: Arc::new(audit),
        health: Arc::new(HealthyDb),
    })
}

async fn send(router: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(value) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(value.to_string()))
            .expect("request builds"),
        None => builder.body(Body::empty()).expect("request builds"),
    };

    let response = router
        .clone()
        .oneshot(request)
        .await
        .expect("router responds");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body collects")
        .to_bytes();

    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("body is JSON")
    };

    (status, value)
}

fn sample_menu_dish(category_id: Uuid) -> DishWithFlavors {
    let now = OffsetDateTime::now_utc();
    DishWithFlavors {
        dish: DishRecord {
            id: Uuid::new_v4(),
            category_id,
            name: "Mapo Tofu".to_string(),
            code: None,
            price_cents: 1_880,
            image: None,
            description: None,
            status: DishStatus::OnSale,
            sort_order: 1,
            deleted: false,
            created_at: now,
            updated_at: now,
        },
        category_name: "Mains".to_string(),
        flavors: vec![DishFlavorRecord {
            id: Uuid::new_v4(),
            dish_id: Uuid::nil(),
            name: "spiciness".to_string(),
            options_json: "[\"mild\",\"medium\",\"hot\"]".to_string(),
            created_at: now,
            updated_at: now,
        }],
    }
}

#[tokio::test]
async fn healthz_reports_ok() {
    let backend = TestBackend::default();
    let router = build_router(&backend);

    let (status, body) = send(&router, "GET", "/healthz", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn category_create_then_selector_listing() {
    let backend = TestBackend::default();
    let router = build_router(&backend);

    let (status, created) = send(
        &router,
        "POST",
        "/api/v1/categories",
        Some(json!({ "name": "Mains", "kind": "dish", "sort_order": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["name"], "Mains");

    let (status, listed) = send(&router, "GET", "/api/v1/categories/all?kind=dish", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().map(Vec::len), Some(1));

    // The mutation left an audit trail.
    let actions: Vec<String> = backend
        .audit
        .records
        .lock()
        .unwrap()
        .iter()
        .map(|record| record.action.clone())
        .collect();
    assert_eq!(actions, vec!["category.create".to_string()]);
}

#[tokio::test]
async fn duplicate_category_name_conflicts() {
    let backend = TestBackend::default();
    let router = build_router(&backend);

    let payload = json!({ "name": "Drinks", "kind": "dish" });
    let (status, _) = send(&router, "POST", "/api/v1/categories", Some(payload.clone())).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(&router, "POST", "/api/v1/categories", Some(payload)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "duplicate");
}

#[tokio::test]
async fn category_delete_rejected_while_in_use() {
    let backend = TestBackend::default();
    let router = build_router(&backend);

    let (_, created) = send(
        &router,
        "POST",
        "/api/v1/categories",
        Some(json!({ "name": "Mains", "kind": "dish" })),
    )
    .await;
    let id: Uuid = created["id"].as_str().unwrap().parse().unwrap();
    backend.categories.set_dish_count(id, 4);

    let (status, body) = send(&router, "DELETE", &format!("/api/v1/categories/{id}"), None).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "in_use");
}

#[tokio::test]
async fn menu_is_cached_until_a_dish_mutation() {
    let backend = TestBackend::default();
    let category_id = Uuid::new_v4();
    let dish = sample_menu_dish(category_id);
    let dish_id = dish.dish.id;
    *backend.dishes.menu.lock().unwrap() = vec![dish];

    let router = build_router(&backend);
    let menu_uri = format!("/api/v1/dishes/menu?category_id={category_id}&status=on_sale");

    let (status, first) = send(&router, "GET", &menu_uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first.as_array().map(Vec::len), Some(1));
    assert_eq!(first[0]["category_name"], "Mains");
    assert_eq!(first[0]["flavors"][0]["name"], "spiciness");

    let (status, _) = send(&router, "GET", &menu_uri, None).await;
    assert_eq!(status, StatusCode::OK);
    // Second read was served from the cache.
    assert_eq!(backend.dishes.menu_calls.load(Ordering::SeqCst), 1);

    let (status, body) = send(
        &router,
        "POST",
        "/api/v1/dishes/status",
        Some(json!({ "ids": [dish_id], "status": "halted" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["changed"], 1);

    let (status, _) = send(&router, "GET", &menu_uri, None).await;
    assert_eq!(status, StatusCode::OK);
    // The mutation dropped the cached list, forcing a reload.
    assert_eq!(backend.dishes.menu_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn batch_delete_parses_comma_separated_ids() {
    let backend = TestBackend::default();
    let router = build_router(&backend);

    let a = Uuid::new_v4();
    let b = Uuid::new_v4();
    let (status, body) = send(
        &router,
        "DELETE",
        &format!("/api/v1/dishes?ids={a},{b}"),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["changed"], 2);
}

#[tokio::test]
async fn batch_delete_rejects_malformed_ids() {
    let backend = TestBackend::default();
    let router = build_router(&backend);

    let (status, body) = send(&router, "DELETE", "/api/v1/dishes?ids=not-a-uuid", None).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "bad_request");
}

#[tokio::test]
async fn unknown_dish_is_not_found() {
    let backend = TestBackend::default();
    let router = build_router(&backend);

    let (status, body) = send(
        &router,
        "GET",
        &format!("/api/v1/dishes/{}", Uuid::new_v4()),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "not_found");
}

#[tokio::test]
async fn audit_listing_returns_recent_entries() {
    let backend = TestBackend::default();
    let router = build_router(&backend);

    let (_, _) = send(
        &router,
        "POST",
        "/api/v1/categories",
        Some(json!({ "name": "Soups", "kind": "dish" })),
    )
    .await;

    let (status, body) = send(&router, "GET", "/api/v1/audit?limit=10", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().map(Vec::len), Some(1));
    assert_eq!(body[0]["action"], "category.create");
}
