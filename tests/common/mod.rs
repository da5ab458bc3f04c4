#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::process::{Child, Command, Stdio};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use axum::{
    body::{to_bytes, Body},
    extract::{Request, State},
    http::header,
    middleware::{self, Next},
    response::Response,
    Router,
};
use reqwest::StatusCode;
use vbs_gateway::auth::{Claims, Role, SessionSigner};
use vbs_gateway::config::AppConfig;
use vbs_gateway::registrations::MemoryRegistrationStore;
use vbs_gateway::routes;
use vbs_gateway::state::AppState;

pub const SECRET: &str = "integration-secret";

/// One request as the mock backend saw it.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub authorization: Option<String>,
    pub cookie: Option<String>,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

type Log = Arc<Mutex<Vec<Recorded>>>;

/// Stand-in for the school backend, listening on an ephemeral port.
pub struct MockBackend {
    pub base_url: String,
    log: Log,
}

impl MockBackend {
    pub async fn start(router: Router) -> Result<Self> {
        let log: Log = Arc::default();
        let app = router.layer(middleware::from_fn_with_state(log.clone(), record));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr: SocketAddr = listener.local_addr()?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(Self {
            base_url: format!("http://{}", addr),
            log,
        })
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.log.lock().unwrap().clone()
    }

    pub fn last(&self) -> Recorded {
        self.requests().pop().expect("backend received a request")
    }
}

async fn record(State(log): State<Log>, req: Request, next: Next) -> Response {
    let (parts, body) = req.into_parts();
    let bytes = to_bytes(body, usize::MAX).await.unwrap_or_default();
    let get_header = |name: header::HeaderName| {
        parts
            .headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };

    log.lock().unwrap().push(Recorded {
        method: parts.method.to_string(),
        path: parts.uri.path().to_string(),
        query: parts.uri.query().map(str::to_string),
        authorization: get_header(header::AUTHORIZATION),
        cookie: get_header(header::COOKIE),
        content_type: get_header(header::CONTENT_TYPE),
        body: bytes.to_vec(),
    });

    next.run(Request::from_parts(parts, Body::from(bytes))).await
}

/// The gateway served in-process against `backend_url`.
pub struct Gateway {
    pub base_url: String,
    pub client: reqwest::Client,
}

impl Gateway {
    pub async fn start(backend_url: &str) -> Result<Self> {
        Self::start_with(backend_url, &[]).await
    }

    pub async fn start_with(backend_url: &str, extra: &[(&str, &str)]) -> Result<Self> {
        let mut vars: HashMap<String, String> = HashMap::new();
        vars.insert("API_BASE_URL".into(), backend_url.into());
        vars.insert("JWT_SECRET".into(), SECRET.into());
        vars.insert("UPSTREAM_TIMEOUT_SECS".into(), "5".into());
        for (key, value) in extra {
            vars.insert(key.to_string(), value.to_string());
        }

        let config = AppConfig::from_lookup(|key| vars.get(key).cloned())?;
        let state = AppState::new(config, Arc::new(MemoryRegistrationStore::new()))?;
        let app = routes::app(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self {
            base_url: format!("http://{}", addr),
            client,
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

pub fn token(sub: &str, roles: &[Role]) -> String {
    SessionSigner::new(SECRET)
        .issue(&Claims::new(sub, roles, chrono::Duration::hours(1)))
        .expect("token signs")
}

/// A port nothing listens on, for transport failure tests.
pub fn dead_backend() -> String {
    let port = portpicker::pick_unused_port().expect("free port");
    format!("http://127.0.0.1:{}", port)
}

/// The real server binary, spawned with an explicit environment.
pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    child: Child,
}

impl TestServer {
    pub fn spawn(env: &[(&str, &str)]) -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        let child = server_command(env)
            .env("PORT", port.to_string())
            .stdout(Stdio::null())
            .stderr(Stdio::inherit())
            .spawn()
            .context("failed to spawn server binary")?;

        Ok(Self { port, base_url, child })
    }

    pub async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() > deadline {
                break;
            }
            let url = format!("{}/health", self.base_url);
            if let Ok(resp) = client.get(&url).send().await {
                if resp.status() == StatusCode::OK || resp.status() == StatusCode::SERVICE_UNAVAILABLE {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Command for the server binary with a clean environment.
pub fn server_command(env: &[(&str, &str)]) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_vbs-gateway"));
    cmd.env_clear().stdin(Stdio::null());
    if let Ok(path) = std::env::var("PATH") {
        cmd.env("PATH", path);
    }
    for (key, value) in env {
        cmd.env(key, value);
    }
    cmd
}
