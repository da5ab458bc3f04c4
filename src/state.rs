use std::sync::Arc;

use crate::auth::SessionVerifier;
use crate::config::AppConfig;
use crate::proxy::binary::file_redirect_policy;
use crate::registrations::RegistrationStore;

/// Process-wide, read-only state shared by every request.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub client: reqwest::Client,
    /// Used by the file proxy; redirects must stay on allowed hosts.
    pub file_client: reqwest::Client,
    pub verifier: SessionVerifier,
    pub registrations: Arc<dyn RegistrationStore>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        registrations: Arc<dyn RegistrationStore>,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(config.upstream.timeout())
            .user_agent(concat!("vbs-gateway/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let file_client = reqwest::Client::builder()
            .timeout(config.upstream.timeout())
            .user_agent(concat!("vbs-gateway/", env!("CARGO_PKG_VERSION")))
            .redirect(file_redirect_policy(&config.upstream))
            .build()?;

        Ok(Self {
            verifier: SessionVerifier::new(&config.session.jwt_secret),
            config: Arc::new(config),
            client,
            file_client,
            registrations,
        })
    }
}
