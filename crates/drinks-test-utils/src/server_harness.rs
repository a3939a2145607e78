//! Test server harness for E2E testing
//!
//! Provides `TestDrinksServer` for spawning real drinks service instances
//! in tests, backed by the in-memory store and a mocked JWKS endpoint.

use crate::crypto_fixtures::TestKeypair;
use crate::token_builders::{TestTokenBuilder, TEST_AUDIENCE, TEST_ISSUER};
use drinks_service::auth::{JwksClient, JwtValidator, ValidationPolicy};
use drinks_service::config::Config;
use drinks_service::observability::metrics::init_metrics_recorder;
use drinks_service::repositories::{DrinkStore, InMemoryDrinkStore};
use drinks_service::routes::{self, AppState};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};
use tokio::task::JoinHandle;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Path the mocked provider serves its key set on.
pub const JWKS_PATH: &str = "/.well-known/jwks.json";

/// Global metrics handle for test servers
static TEST_METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn test_metrics_handle() -> PrometheusHandle {
    TEST_METRICS_HANDLE
        .get_or_init(|| {
            init_metrics_recorder()
                .unwrap_or_else(|_| PrometheusBuilder::new().build_recorder().handle())
        })
        .clone()
}

/// Test harness for spawning the drinks service in E2E tests.
///
/// # Example
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_create_flow() -> Result<()> {
///     let server = TestDrinksServer::spawn().await?;
///     let client = reqwest::Client::new();
///
///     let response = client
///         .post(format!("{}/drinks", server.url()))
///         .bearer_auth(server.token(&["post:drinks"]))
///         .json(&serde_json::json!({"title": "Water", "recipe": []}))
///         .send()
///         .await?;
///
///     assert_eq!(response.status(), 200);
///     Ok(())
/// }
/// ```
pub struct TestDrinksServer {
    addr: SocketAddr,
    config: Config,
    store: Arc<InMemoryDrinkStore>,
    keypair: TestKeypair,
    jwks_server: MockServer,
    jwt_validator: Arc<JwtValidator>,
    _handle: JoinHandle<()>,
}

impl TestDrinksServer {
    /// Spawn a server trusting one freshly derived signing key.
    pub async fn spawn() -> Result<Self, anyhow::Error> {
        let keypair = TestKeypair::new(1, "drinks-test-key-1")
            .map_err(|e| anyhow::anyhow!("Failed to create test keypair: {}", e))?;
        Self::spawn_with_jwks(keypair.clone(), serde_json::json!({"keys": [keypair.jwk_json()]}))
            .await
    }

    /// Spawn a server whose provider publishes `jwks`; tokens are signed
    /// with `keypair`.
    ///
    /// The server will:
    /// - Fetch `jwks` once from a wiremock endpoint at startup
    /// - Accept only EdDSA tokens for `TEST_ISSUER` / `TEST_AUDIENCE`
    /// - Bind to a random available port (127.0.0.1:0)
    pub async fn spawn_with_jwks(
        keypair: TestKeypair,
        jwks: serde_json::Value,
    ) -> Result<Self, anyhow::Error> {
        let jwks_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(JWKS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(&jwks))
            .mount(&jwks_server)
            .await;

        let vars = HashMap::from([
            (
                "AUTH_DOMAIN".to_string(),
                "drinks-test.example.com".to_string(),
            ),
            ("API_AUDIENCE".to_string(), TEST_AUDIENCE.to_string()),
            ("AUTH_ISSUER".to_string(), TEST_ISSUER.to_string()),
            (
                "JWKS_URL".to_string(),
                format!("{}{}", jwks_server.uri(), JWKS_PATH),
            ),
            ("JWT_ALGORITHMS".to_string(), "EdDSA".to_string()),
            ("BIND_ADDRESS".to_string(), "127.0.0.1:0".to_string()),
        ]);

        let config = Config::from_vars(&vars)
            .map_err(|e| anyhow::anyhow!("Failed to create config: {}", e))?;

        let jwks_client = Arc::new(JwksClient::new(config.jwks_url.clone()));
        jwks_client
            .refresh()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to load test JWKS: {}", e))?;

        let jwt_validator = Arc::new(JwtValidator::new(
            jwks_client,
            ValidationPolicy::from_config(&config),
        ));

        let store = Arc::new(InMemoryDrinkStore::new());
        let state = Arc::new(AppState {
            store: store.clone() as Arc<dyn DrinkStore>,
            config: config.clone(),
            jwt_validator: jwt_validator.clone(),
        });

        let app = routes::build_routes(state, test_metrics_handle());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            config,
            store,
            keypair,
            jwks_server,
            jwt_validator,
            _handle: handle,
        })
    }

    /// Get the base URL of the test server.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Get the socket address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Get reference to the server configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The store behind the server, for seeding and inspection.
    pub fn store(&self) -> &Arc<InMemoryDrinkStore> {
        &self.store
    }

    /// The key the server's provider signs with.
    pub fn keypair(&self) -> &TestKeypair {
        &self.keypair
    }

    /// The mocked identity provider.
    pub fn jwks_server(&self) -> &MockServer {
        &self.jwks_server
    }

    /// The validator the server uses.
    pub fn jwt_validator(&self) -> &Arc<JwtValidator> {
        &self.jwt_validator
    }

    /// A valid token granting `permissions`.
    pub fn token(&self, permissions: &[&str]) -> String {
        self.sign(&TestTokenBuilder::new().with_permissions(permissions).build())
    }

    /// Sign arbitrary claims with the trusted key.
    pub fn sign(&self, claims: &serde_json::Value) -> String {
        self.keypair.sign(claims)
    }
}

impl Drop for TestDrinksServer {
    fn drop(&mut self) {
        // Explicitly abort the HTTP server task to ensure immediate cleanup
        self._handle.abort();
    }
}
