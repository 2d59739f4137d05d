use std::net::SocketAddr;
use std::sync::Arc;

use auth::HashingCost;
use auth::LockoutPolicy;
use auth::LoginAttemptTracker;
use auth::PasswordHasher;
use auth::TokenConfig;
use auth::TokenService;
use dashboard_service::domain::account::models::CreateAccountCommand;
use dashboard_service::domain::account::models::NewPassword;
use dashboard_service::domain::account::models::Role;
use dashboard_service::domain::account::models::Username;
use dashboard_service::domain::account::ports::AccountServicePort;
use dashboard_service::domain::account::service::AccountService;
use dashboard_service::domain::session::service::SessionService;
use dashboard_service::inbound::http::router::create_router;
use dashboard_service::outbound::repositories::InMemoryCredentialRepository;
use serde_json::json;
use serde_json::Value;

pub const ADMIN_USERNAME: &str = "admin";
pub const ADMIN_PASSWORD: &str = "Secret123!";
pub const TEACHER_USERNAME: &str = "ms.frizzle";
pub const TEACHER_PASSWORD: &str = "MagicBus42";

const TEST_SECRET: &[u8] = b"test-secret-key-for-jwt-signing-at-least-32-bytes";

/// Test application that spawns a real server over an in-memory store
pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub api_client: reqwest::Client,
}

impl TestApp {
    /// Spawn the application in a background task and return TestApp
    pub async fn spawn() -> Self {
        // Use random port (0 = OS assigns)
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind random port");
        let port = listener.local_addr().unwrap().port();
        let address = format!("http://127.0.0.1:{}", port);

        // Cheapest Argon2 parameters keep the suite fast
        let password_hasher = Arc::new(
            PasswordHasher::with_cost(HashingCost {
                memory_kib: 1024,
                iterations: 1,
                parallelism: 1,
            })
            .expect("Failed to create password hasher"),
        );
        let token_service = Arc::new(TokenService::new(TEST_SECRET, TokenConfig::default()));
        let attempts = Arc::new(LoginAttemptTracker::new(LockoutPolicy::default()));
        let credential_repository = Arc::new(InMemoryCredentialRepository::new());

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

        seed_account(account_service.as_ref(), Role::Admin, ADMIN_USERNAME, ADMIN_PASSWORD).await;
        seed_account(
            account_service.as_ref(),
            Role::Teacher,
            TEACHER_USERNAME,
            TEACHER_PASSWORD,
        )
        .await;

        let router = create_router(session_service, account_service, false);

        // Spawn server in background
        tokio::spawn(async move {
            axum::serve(
                listener,
                router.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .expect("Server error");
        });

        Self {
            address,
            port,
            api_client: reqwest::Client::builder()
                .build()
                .expect("Failed to create reqwest client"),
        }
    }

    /// Helper to make GET request
    pub fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.api_client.get(format!("{}{}", self.address, path))
    }

    /// Helper to make POST request
    pub fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.api_client.post(format!("{}{}", self.address, path))
    }

    /// Helper to make GET request with Bearer token
    pub fn get_authenticated(&self, path: &str, token: &str) -> reqwest::RequestBuilder {
        self.get(path).bearer_auth(token)
    }

    /// Helper to make POST request with Bearer token
    pub fn post_authenticated(&self, path: &str, token: &str) -> reqwest::RequestBuilder {
        self.post(path).bearer_auth(token)
    }

    /// Submit a login for one role namespace
    pub async fn login(&self, role: &str, username: &str, password: &str) -> reqwest::Response {
        self.post(&format!("/api/auth/{}/login", role))
            .json(&json!({
                "username": username,
                "password": password
            }))
            .send()
            .await
            .expect("Failed to execute request")
    }

    /// Log in as the seeded admin and return the session bundle
    pub async fn admin_session(&self) -> Value {
        let response = self.login("admin", ADMIN_USERNAME, ADMIN_PASSWORD).await;
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        response.json().await.expect("Failed to parse response")
    }

    /// Log in as the seeded teacher and return the session bundle
    pub async fn teacher_session(&self) -> Value {
        let response = self
            .login("teacher", TEACHER_USERNAME, TEACHER_PASSWORD)
            .await;
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        response.json().await.expect("Failed to parse response")
    }
}

async fn seed_account(
    account_service: &dyn AccountServicePort,
    role: Role,
    username: &str,
    password: &str,
) {
    let command = CreateAccountCommand::new(
        role,
        Username::new(username.to_string()).unwrap(),
        NewPassword::new(password.to_string()).unwrap(),
    );
    account_service
        .create_account(command)
        .await
        .expect("Failed to seed account");
}
