use std::{process, sync::Arc, time::Duration};

use comanda::{
    application::{
        admin::{
            audit::AdminAuditService, categories::AdminCategoryService, dishes::AdminDishService,
        },
        error::AppError,
        repos::{
            AuditRepo, CategoriesRepo, CategoriesWriteRepo, DishesRepo, DishesWriteRepo,
            FlavorsRepo, HealthRepo,
        },
    },
    cache::{CacheConfig, CacheConsumer, CacheState, CacheStore, CacheTrigger, EventQueue},
    config,
    infra::{
        db::PostgresRepositories,
        error::InfraError,
        http::{self, ApiState},
        telemetry,
    },
};
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Migrate(_) => run_migrate(settings).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    let app = build_application_context(repositories, &settings);

    // Queue a warmup event so the first menu reads hit a warm cache.
    if let Some(cache) = &app.cache {
        cache.trigger.warmup_on_startup().await;
    }

    // Background drain for events left behind by latency-sensitive paths.
    let cache_handle = app.cache.clone().map(|cache| {
        let interval_ms = cache.config.auto_consume_interval_ms;
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_millis(interval_ms));
            interval.tick().await; // Skip the first immediate tick
            loop {
                interval.tick().await;
                cache.trigger.consumer().consume().await;
            }
        })
    });

    let result = serve_http(&settings, app.api_state).await;

    if let Some(handle) = cache_handle {
        handle.abort();
        let _ = handle.await;
    }

    result
}

async fn run_migrate(settings: config::Settings) -> Result<(), AppError> {
    let url = database_url(&settings)?;

    let pool = PostgresRepositories::connect(url, settings.database.max_connections.get())
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    info!(target = "comanda::migrate", "Migrations applied");
    Ok(())
}

fn database_url(settings: &config::Settings) -> Result<&str, AppError> {
    settings
        .database
        .url
        .as_deref()
        .ok_or_else(|| AppError::from(InfraError::configuration("database url is not configured")))
}

async fn init_repositories(
    settings: &config::Settings,
) -> Result<Arc<PostgresRepositories>, AppError> {
    let url = database_url(settings)?;

    let pool = PostgresRepositories::connect(url, settings.database.max_connections.get())
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    Ok(Arc::new(PostgresRepositories::new(pool)))
}

struct ApplicationContext {
    api_state: ApiState,
    cache: Option<CacheState>,
}

fn build_application_context(
    repositories: Arc<PostgresRepositories>,
    settings: &config::Settings,
) -> ApplicationContext {
    let categories_repo: Arc<dyn CategoriesRepo> = repositories.clone();
    let categories_write_repo: Arc<dyn CategoriesWriteRepo> = repositories.clone();
    let dishes_repo: Arc<dyn DishesRepo> = repositories.clone();
    let dishes_write_repo: Arc<dyn DishesWriteRepo> = repositories.clone();
    let flavors_repo: Arc<dyn FlavorsRepo> = repositories.clone();
    let audit_repo: Arc<dyn AuditRepo> = repositories.clone();
    let health_repo: Arc<dyn HealthRepo> = repositories.clone();

    // Initialize cache infrastructure
    let cache_config = CacheConfig::from(&settings.cache);
    let cache = if cache_config.is_enabled() {
        let store = Arc::new(CacheStore::new(&cache_config));
        let queue = Arc::new(EventQueue::new());
        let consumer = Arc::new(CacheConsumer::new(
            cache_config.clone(),
            store.clone(),
            queue.clone(),
            repositories.clone(),
        ));
        let trigger = Arc::new(CacheTrigger::new(cache_config.clone(), queue, consumer));
        Some(CacheState {
            config: cache_config,
            store,
            trigger,
        })
    } else {
        None
    };

    let audit_service = AdminAuditService::new(audit_repo);
    let category_service = Arc::new(
        AdminCategoryService::new(
            categories_repo.clone(),
            categories_write_repo,
            audit_service.clone(),
        )
        .with_cache_opt(cache.clone()),
    );
    let dish_service = Arc::new(
        AdminDishService::new(
            dishes_repo,
            dishes_write_repo,
            flavors_repo,
            categories_repo,
            audit_service.clone(),
        )
        .with_cache_opt(cache.clone()),
    );

    let api_state = ApiState {
        categories: category_service,
        dishes: dish_service,
        audit: Arc::new(audit_service),
        health: health_repo,
    };

    ApplicationContext { api_state, cache }
}

async fn serve_http(settings: &config::Settings, api_state: ApiState) -> Result<(), AppError> {
    let router = http::build_api_router(api_state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(addr = %settings.server.addr, "Comanda listening");

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal(settings.server.graceful_shutdown))
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))
}

async fn shutdown_signal(grace: Duration) {
    if let Err(error) = tokio::signal::ctrl_c().await {
        error!(error = %error, "failed to install shutdown signal handler");
        return;
    }

    info!("shutdown signal received; draining connections");

    // Hard stop if draining exceeds the configured grace period.
    tokio::spawn(async move {
        tokio::time::sleep(grace).await;
        error!("graceful shutdown deadline exceeded; exiting");
        process::exit(1);
    });
}
