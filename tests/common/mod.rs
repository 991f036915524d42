//! Common test utilities for E2E tests

use parlor::{AppState, config};
use serde_json::Value;
use tempfile::TempDir;
use tokio::net::TcpListener;

/// Test server instance
pub struct TestServer {
    pub addr: String,
    pub state: AppState,
    pub _temp_dir: TempDir,
    pub client: reqwest::Client,
}

impl TestServer {
    /// Create a new test server instance
    pub async fn new() -> Self {
        // Create temporary directory for test database
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");

        // Create test configuration
        let config = config::AppConfig {
            server: config::ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0, // Let OS assign port
            },
            database: config::DatabaseConfig {
                path: db_path.clone(),
            },
            storage: config::StorageConfig {
                media: config::MediaStorageConfig {
                    bucket: "test-media".to_string(),
                    public_url: "https://media.test.example.com".to_string(),
                },
            },
            cloudflare: config::CloudflareConfig {
                account_id: "test-account".to_string(),
                r2_access_key_id: "test-key".to_string(),
                r2_secret_access_key: "test-secret".to_string(),
            },
            auth: config::AuthConfig {
                session_secret: "test-secret-key-32-bytes-long!!!".to_string(),
                session_max_age: 604_800,
            },
            feed: config::FeedConfig {
                default_page_size: 10,
                max_page_size: 50,
                comment_preview_count: 3,
            },
            logging: config::LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        };

        // Initialize app state
        let state = AppState::new(config).await.unwrap();

        // Create HTTP client
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap();

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let addr_str = format!("http://{}", addr);

        // Build router
        let app = parlor::build_router(state.clone());

        // Spawn server in background
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait a bit for server to start
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        Self {
            addr: addr_str,
            state,
            _temp_dir: temp_dir,
            client,
        }
    }

    /// Get base URL for API requests
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    /// Register an account through the API
    ///
    /// # Returns
    /// (bearer token, user JSON object)
    pub async fn register_user(&self, username: &str) -> (String, Value) {
        let response = self
            .client
            .post(self.url("/api/auth/register"))
            .json(&serde_json::json!({
                "username": username,
                "email": format!("{}@example.com", username),
                "password": "secret123",
                "displayName": format!("{} Display", username),
            }))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), 201);
        let json: Value = response.json().await.unwrap();
        let token = json["token"].as_str().unwrap().to_string();
        (token, json["user"].clone())
    }

    /// Create a text-only post through the API
    ///
    /// # Returns
    /// The created post JSON object
    pub async fn create_post(&self, token: &str, content: &str) -> Value {
        let form = reqwest::multipart::Form::new().text("content", content.to_string());

        let response = self
            .client
            .post(self.url("/api/posts"))
            .header("Authorization", format!("Bearer {}", token))
            .multipart(form)
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), 201);
        let json: Value = response.json().await.unwrap();
        json["post"].clone()
    }

    /// Create a comment through the API
    ///
    /// # Returns
    /// The created comment JSON object
    pub async fn create_comment(&self, token: &str, post_id: &str, content: &str) -> Value {
        let response = self
            .client
            .post(self.url(&format!("/api/comments/{}", post_id)))
            .header("Authorization", format!("Bearer {}", token))
            .json(&serde_json::json!({ "content": content }))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), 201);
        let json: Value = response.json().await.unwrap();
        json["comment"].clone()
    }
}
