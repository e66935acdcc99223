use rusty_library_reservations::{
    adapters::{
        logging::LoggingNotificationService, memory::InMemoryLendingStore,
        postgres::PostgresLendingStore,
    },
    api::{handlers::AppState, router::create_router},
    application::lending::ServiceDependencies,
    config::{AppConfig, StorageBackend},
    ports::LendingStore,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().expect("Failed to load configuration");

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.filter.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let lending_store: Arc<dyn LendingStore> = match config.storage.backend {
        StorageBackend::Postgres => {
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(config.database.max_connections)
                .connect(&config.database.url)
                .await
                .expect("Failed to connect to database");

            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .expect("Failed to run database migrations");

            tracing::info!("Connected to database, migrations applied");
            Arc::new(PostgresLendingStore::new(pool))
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage, data is lost on restart");
            Arc::new(InMemoryLendingStore::new())
        }
    };

    let app_state = Arc::new(AppState {
        service_deps: ServiceDependencies { lending_store },
        notification_service: Arc::new(LoggingNotificationService::new()),
    });

    let app = create_router(app_state);

    let addr = config.server.addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .await
        .expect("Failed to start server");
}
