use clap::Subcommand;
use serde_json::json;

use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::config::AppConfig;

#[derive(Subcommand)]
pub enum ConfigCommands {
    #[command(about = "Load configuration the way the server does and print a summary")]
    Check,
}

pub async fn handle(cmd: ConfigCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        ConfigCommands::Check => {
            let _ = dotenvy::dotenv();
            let config = AppConfig::from_env()?;

            let store = match (&config.database.url, config.is_development()) {
                (Some(_), _) => "postgres",
                (None, true) => "memory",
                (None, false) => "missing (DATABASE_URL required outside development)",
            };

            output_success(
                &output_format,
                "Configuration is valid",
                Some(json!({
                    "environment": format!("{:?}", config.environment),
                    "port": config.server.port,
                    "public_dir": config.server.public_dir,
                    "backend": config.upstream.base_url.as_str(),
                    "upstream_timeout_secs": config.upstream.timeout_secs,
                    "session_cookies": config.session.cookie_names,
                    "role_cookie": config.session.role_cookie,
                    "login_path": config.session.login_path,
                    "cors_origins": config.security.cors_origins,
                    "require_https": config.security.require_https,
                    "registration_store": store
                })),
            )
        }
    }
}
