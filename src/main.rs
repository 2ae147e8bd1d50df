use std::sync::Arc;

use actix_web::{web, App, HttpServer};
use anyhow::Context;
use sqlx::MySqlPool;
use tracing_actix_web::TracingLogger;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use scorewatch::config::{AppConfig, Config, LogFormat, StorageBackend};
use scorewatch::modules::commands::services::{
    CommandConsumer, InMemoryResourceStore, InboundCommandAuthorizer,
};
use scorewatch::modules::events::controllers::metrics_controller;
use scorewatch::modules::events::services::{
    DeferredPublisher, EventDistributor, InProcessEventBus, PublishMetrics,
};
use scorewatch::modules::health::controllers::health_controller::{self, HealthState};
use scorewatch::modules::monitoring::controllers::monitoring_controller;
use scorewatch::modules::monitoring::repositories::{
    InMemorySnapshotStore, MonitoredCompanies, MySqlCompanyRepository, MySqlSnapshotRepository,
    SnapshotStore, StaticCompanyDirectory,
};
use scorewatch::modules::monitoring::services::{MonitoringLedger, MonitoringScheduler};
use scorewatch::modules::scoring::controllers::credit_score_controller;
use scorewatch::modules::scoring::repositories::{
    AccountingDataSource, CreditScoreStore, InMemoryCreditScoreStore, MySqlAccountingRepository,
    MySqlCreditScoreRepository, StaticAccountingDataSource,
};
use scorewatch::modules::scoring::services::{
    CreditScoreService, HttpScoringClient, ScoreComputationEngine,
};

/// Persistence ports for the selected backend
struct Storage {
    pool: Option<MySqlPool>,
    scores: Arc<dyn CreditScoreStore>,
    snapshots: Arc<dyn SnapshotStore>,
    accounting: Arc<dyn AccountingDataSource>,
    companies: Arc<dyn MonitoredCompanies>,
}

async fn open_storage(config: &Config) -> anyhow::Result<Storage> {
    match config.monitoring.storage {
        StorageBackend::MySql => {
            let pool = config
                .database
                .create_pool()
                .await
                .context("Failed to create database pool")?;

            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .context("Failed to run database migrations")?;

            tracing::info!(
                max_connections = config.database.max_connections,
                "Database pool initialized"
            );

            Ok(Storage {
                scores: Arc::new(MySqlCreditScoreRepository::new(pool.clone())),
                snapshots: Arc::new(MySqlSnapshotRepository::new(pool.clone())),
                accounting: Arc::new(MySqlAccountingRepository::new(pool.clone())),
                companies: Arc::new(MySqlCompanyRepository::new(pool.clone())),
                pool: Some(pool),
            })
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage, nothing survives a restart");
            Ok(Storage {
                pool: None,
                scores: Arc::new(InMemoryCreditScoreStore::new()),
                snapshots: Arc::new(InMemorySnapshotStore::new()),
                accounting: Arc::new(StaticAccountingDataSource::new()),
                companies: Arc::new(StaticCompanyDirectory::new(Vec::new())),
            })
        }
    }
}

fn init_tracing(app: &AppConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| app.default_log_filter().into());
    let registry = tracing_subscriber::registry().with(filter);

    match app.log_format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("Failed to load configuration")?;
    init_tracing(&config.app);
    config.validate().context("Configuration validation failed")?;

    tracing::info!(
        env = %config.app.env,
        service = %config.app.service_name,
        bind = %config.server.bind_address(),
        "Starting credit scoring service"
    );

    let storage = open_storage(&config).await?;

    // Events
    let bus = Arc::new(InProcessEventBus::new(config.events.channel_capacity));
    let metrics = Arc::new(PublishMetrics::new());
    let distributor = Arc::new(EventDistributor::new(
        bus.clone(),
        storage.scores.clone(),
        config.app.service_name.clone(),
        config.events.schema_version.clone(),
        metrics.clone(),
    ));
    let (deferred, _deferred_worker) =
        DeferredPublisher::spawn(distributor.clone(), config.events.channel_capacity);

    // Scoring: the API path tolerates a slower ML call than the scheduled path
    let api_client = Arc::new(
        HttpScoringClient::new(
            config.scoring.ml_base_url.clone(),
            config.scoring.ml_api_key.clone(),
            config.scoring.api_timeout,
        )
        .context("Failed to build API scoring client")?,
    );
    let feature_client = Arc::new(
        HttpScoringClient::new(
            config.scoring.ml_base_url.clone(),
            config.scoring.ml_api_key.clone(),
            config.scoring.feature_timeout,
        )
        .context("Failed to build scheduled scoring client")?,
    );
    let api_engine = Arc::new(ScoreComputationEngine::new(
        storage.accounting.clone(),
        api_client,
    ));
    let scheduled_engine = Arc::new(ScoreComputationEngine::new(
        storage.accounting.clone(),
        feature_client,
    ));

    let score_service = Arc::new(
        CreditScoreService::new(api_engine, storage.scores.clone(), distributor.clone())
            .with_deferred(deferred),
    );
    tokio::spawn(score_service.clone().start_expiry_sweep(config.monitoring.tick_every));

    // Monitoring
    let ledger = Arc::new(MonitoringLedger::new(storage.snapshots.clone()));
    let scheduler = Arc::new(MonitoringScheduler::new(
        storage.companies.clone(),
        storage.accounting.clone(),
        scheduled_engine,
        storage.scores.clone(),
        ledger.clone(),
        config.scoring.scheduled_method,
    ));
    for interval in &config.monitoring.enabled_intervals {
        tokio::spawn(
            scheduler
                .clone()
                .start(*interval, config.monitoring.tick_every),
        );
    }

    // Inbound commands
    let consumer = Arc::new(CommandConsumer::new(
        InboundCommandAuthorizer::new(),
        Arc::new(InMemoryResourceStore::new()),
        storage.scores.clone(),
        distributor,
    ));
    tokio::spawn(consumer.run(bus.subscribe()));

    let health = HealthState {
        service_name: config.app.service_name.clone(),
        pool: storage.pool.clone(),
    };

    let bind_address = config.server.bind_address();
    let server = HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .app_data(web::Data::new(health.clone()))
            .app_data(web::Data::new(score_service.clone()))
            .app_data(web::Data::new(ledger.clone()))
            .app_data(web::Data::new(metrics.clone()))
            .configure(health_controller::configure)
            .service(
                web::scope("/api")
                    .configure(credit_score_controller::configure)
                    .configure(monitoring_controller::configure)
                    .configure(metrics_controller::configure),
            )
    })
    .bind(&bind_address)
    .with_context(|| format!("Failed to bind {}", bind_address))?
    .run();

    tracing::info!("Server started at http://{}", bind_address);

    server.await.context("HTTP server terminated")?;
    Ok(())
}
