use std::net::SocketAddr;
use std::sync::Arc;

use auth::LoginAttemptTracker;
use auth::PasswordHasher;
use auth::TokenService;
use dashboard_service::config::Config;
use dashboard_service::domain::account::models::CreateAccountCommand;
use dashboard_service::domain::account::models::NewPassword;
use dashboard_service::domain::account::models::Role;
use dashboard_service::domain::account::models::Username;
use dashboard_service::domain::account::ports::AccountServicePort;
use dashboard_service::domain::account::service::AccountService;
use dashboard_service::domain::session::service::spawn_cleanup_task;
use dashboard_service::domain::session::service::SessionService;
use dashboard_service::inbound::http::router::create_router;
use dashboard_service::outbound::repositories::PostgresCredentialRepository;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "dashboard_service=debug,auth=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        service = "dashboard-service",
        version = env!("CARGO_PKG_VERSION"),
        "Service starting"
    );

    let config = Config::load()?;

    tracing::info!(
        http_port = config.server.http_port,
        trust_forwarded_for = config.server.trust_forwarded_for,
        access_token_ttl_secs = config.jwt.access_token_ttl_secs,
        refresh_token_ttl_secs = config.jwt.refresh_token_ttl_secs,
        max_attempts = config.lockout.max_attempts,
        lockout_window_secs = config.lockout.window_secs,
        "Configuration loaded"
    );

    let pg_pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect(&config.database.url)
        .await?;
    tracing::info!(
        max_connections = config.database.max_connections,
        database = "postgresql",
        "Database connection pool created"
    );

    sqlx::migrate!("./migrations").run(&pg_pool).await?;
    tracing::info!(database = "postgresql", "Database migrations completed");

    let password_hasher = Arc::new(PasswordHasher::with_cost(config.hashing_cost())?);
    let token_service = Arc::new(TokenService::new(
        config.jwt.secret.as_bytes(),
        config.token_config(),
    ));
    let attempts = Arc::new(LoginAttemptTracker::new(config.lockout_policy()));
    let credential_repository = Arc::new(PostgresCredentialRepository::new(pg_pool));

    let account_service = Arc::new(AccountService::new(
        Arc::clone(&credential_repository),
        Arc::clone(&password_hasher),
    ));
    let session_service = Arc::new(SessionService::new(
        credential_repository,
        password_hasher,
        token_service,
        attempts,
    ));

    if let Some(bootstrap) = &config.bootstrap {
        let command = CreateAccountCommand::new(
            Role::Admin,
            Username::new(bootstrap.admin_username.clone())?,
            NewPassword::new(bootstrap.admin_password.clone())?,
        );
        let created = account_service.ensure_account(command).await?;
        tracing::info!(
            username = %bootstrap.admin_username,
            created,
            "Bootstrap admin account checked"
        );
    }

    let cleanup_interval = config.cleanup_interval();
    spawn_cleanup_task(Arc::clone(&session_service), cleanup_interval);
    tracing::info!(
        interval_secs = cleanup_interval.as_secs(),
        "Security state cleanup scheduled"
    );

    let http_address = format!("0.0.0.0:{}", config.server.http_port);
    let http_listener = tokio::net::TcpListener::bind(&http_address).await?;
    tracing::info!(
        address = %http_address,
        port = config.server.http_port,
        protocol = "http",
        "Http server listening"
    );

    let http_application = create_router(
        session_service,
        account_service,
        config.server.trust_forwarded_for,
    );

    axum::serve(
        http_listener,
        http_application.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    tracing::info!("Server exited successfully");

    Ok(())
}
