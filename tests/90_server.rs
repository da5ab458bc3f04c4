mod common;

use std::time::Duration;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::Value;

use common::{server_command, TestServer};

#[tokio::test]
async fn server_refuses_to_start_without_backend_url() -> Result<()> {
    let output = server_command(&[("JWT_SECRET", "s3cret")]).output()?;

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("API_BASE_URL"), "stderr was: {}", stderr);
    Ok(())
}

#[tokio::test]
async fn server_refuses_to_start_without_secret() -> Result<()> {
    let output = server_command(&[("API_BASE_URL", "http://127.0.0.1:1")]).output()?;

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("JWT_SECRET"));
    Ok(())
}

#[tokio::test]
async fn production_requires_a_database() -> Result<()> {
    let output = server_command(&[
        ("APP_ENV", "production"),
        ("API_BASE_URL", "http://127.0.0.1:1"),
        ("JWT_SECRET", "s3cret"),
    ])
    .output()?;

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("DATABASE_URL"));
    Ok(())
}

#[tokio::test]
async fn public_base_url_name_is_honored() -> Result<()> {
    let server = TestServer::spawn(&[
        ("NEXT_PUBLIC_API_BASE_URL", "http://127.0.0.1:1"),
        ("JWT_SECRET", "s3cret"),
    ])?;
    server.wait_ready(Duration::from_secs(10)).await?;

    let res = reqwest::get(format!("{}/health", server.base_url)).await?;
    assert_eq!(res.status(), StatusCode::OK);

    let body: Value = res.json().await?;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["store"], "ok");
    Ok(())
}
