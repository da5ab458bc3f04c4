use anyhow::Context;
use chrono::{Duration, TimeZone, Utc};
use clap::Subcommand;
use serde_json::json;

use crate::auth::{Claims, Role, SessionSigner, SessionVerifier, TokenError};
use crate::cli::utils::{output_error, output_success};
use crate::cli::OutputFormat;

const SECRET_VAR: &str = "JWT_SECRET";

#[derive(Subcommand)]
pub enum TokenCommands {
    #[command(about = "Sign a session token with JWT_SECRET")]
    Issue {
        #[arg(long, help = "Subject (user id)")]
        sub: String,
        #[arg(long = "role", required = true, help = "Role to grant; repeat for several")]
        roles: Vec<String>,
        #[arg(long, help = "Email claim")]
        email: Option<String>,
        #[arg(long, help = "Display name claim")]
        name: Option<String>,
        #[arg(long, default_value_t = 24, help = "Lifetime in hours")]
        ttl_hours: i64,
    },

    #[command(about = "Verify a session token and print its claims")]
    Verify {
        #[arg(help = "Token to verify")]
        token: String,
    },
}

pub async fn handle(cmd: TokenCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let secret = std::env::var(SECRET_VAR)
        .ok()
        .filter(|s| !s.trim().is_empty())
        .with_context(|| format!("{} is not set", SECRET_VAR))?;

    match cmd {
        TokenCommands::Issue {
            sub,
            roles,
            email,
            name,
            ttl_hours,
        } => {
            let roles = parse_roles(&roles)?;
            anyhow::ensure!(ttl_hours > 0, "--ttl-hours must be positive");

            let mut claims = Claims::new(sub, &roles, Duration::hours(ttl_hours));
            claims.email = email;
            claims.name = name;

            let token = SessionSigner::new(&secret).issue(&claims)?;

            match output_format {
                OutputFormat::Json => output_success(
                    &output_format,
                    "Token issued",
                    Some(json!({ "token": token, "exp": claims.exp })),
                ),
                // Plain token so it can be piped into other tools
                OutputFormat::Text => {
                    println!("{}", token);
                    Ok(())
                }
            }
        }
        TokenCommands::Verify { token } => match SessionVerifier::new(&secret).verify(&token) {
            Ok(claims) => {
                let expires = Utc
                    .timestamp_opt(claims.exp, 0)
                    .single()
                    .map(|t| t.to_rfc3339())
                    .unwrap_or_else(|| claims.exp.to_string());
                let roles: Vec<&str> = claims.role_set().iter().map(|r| r.as_str()).collect();

                output_success(
                    &output_format,
                    "Token is valid",
                    Some(json!({
                        "sub": claims.sub,
                        "email": claims.email,
                        "name": claims.name,
                        "roles": roles,
                        "expires": expires
                    })),
                )
            }
            Err(e) => {
                output_error(&output_format, &e.to_string(), Some(failure_code(&e)))?;
                Err(anyhow::anyhow!("token rejected"))
            }
        },
    }
}

fn parse_roles(raw: &[String]) -> anyhow::Result<Vec<Role>> {
    raw.iter()
        .map(|r| Role::parse(r).with_context(|| format!("unknown role '{}'", r)))
        .collect()
}

fn failure_code(err: &TokenError) -> &'static str {
    match err {
        TokenError::InvalidSignature => "INVALID_SIGNATURE",
        TokenError::Expired => "EXPIRED",
        TokenError::Malformed(_) => "MALFORMED",
    }
}
