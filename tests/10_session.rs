mod common;

use anyhow::Result;
use axum::{
    http::{header, StatusCode},
    routing::post,
    Json, Router,
};
use serde_json::{json, Value};
use vbs_gateway::auth::Role;

use common::{token, Gateway, MockBackend};

fn auth_backend(issued: String) -> Router {
    Router::new().route(
        "/api/auth/login",
        post(move |Json(body): Json<Value>| {
            let issued = issued.clone();
            async move {
                if body["password"] == "dogru-sifre" {
                    (
                        StatusCode::OK,
                        Json(json!({ "token": issued, "user": { "id": "11", "role": "Parent" } })),
                    )
                } else {
                    (StatusCode::UNAUTHORIZED, Json(json!({ "message": "Hatalı şifre" })))
                }
            }
        }),
    )
}

fn set_cookies(res: &reqwest::Response) -> Vec<String> {
    res.headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(str::to_string)
        .collect()
}

#[tokio::test]
async fn login_sets_http_only_session_cookies() -> Result<()> {
    let issued = token("11", &[Role::Parent]);
    let backend = MockBackend::start(auth_backend(issued.clone())).await?;
    let gateway = Gateway::start(&backend.base_url).await?;

    let res = gateway
        .client
        .post(gateway.url("/api/auth/login"))
        .json(&json!({ "email": "veli@example.com", "password": "dogru-sifre" }))
        .send()
        .await?;

    assert_eq!(res.status(), StatusCode::OK);
    let cookies = set_cookies(&res);
    let session = cookies
        .iter()
        .find(|c| c.starts_with("vbs_session="))
        .expect("session cookie issued");
    assert!(session.contains(&issued));
    assert!(session.contains("HttpOnly"));
    assert!(session.contains("SameSite=Lax"));
    assert!(cookies.iter().any(|c| c.starts_with("vbs_role=Parent;")));

    // The token stays out of script reach.
    let body: Value = res.json().await?;
    assert!(body.get("token").is_none());
    assert_eq!(body["user"]["id"], "11");

    let seen = backend.last();
    assert_eq!(seen.authorization, None);
    assert_eq!(serde_json::from_slice::<Value>(&seen.body)?["email"], "veli@example.com");
    Ok(())
}

#[tokio::test]
async fn login_marks_cookies_secure_when_https_is_required() -> Result<()> {
    let backend = MockBackend::start(auth_backend(token("11", &[Role::Teacher]))).await?;
    let gateway = Gateway::start_with(&backend.base_url, &[("SECURITY_REQUIRE_HTTPS", "true")]).await?;

    let res = gateway
        .client
        .post(gateway.url("/api/auth/login"))
        .json(&json!({ "password": "dogru-sifre" }))
        .send()
        .await?;

    assert!(set_cookies(&res).iter().all(|c| c.ends_with("; Secure")));
    Ok(())
}

#[tokio::test]
async fn failed_login_passes_backend_answer_through() -> Result<()> {
    let backend = MockBackend::start(auth_backend(token("11", &[Role::Parent]))).await?;
    let gateway = Gateway::start(&backend.base_url).await?;

    let res = gateway
        .client
        .post(gateway.url("/api/auth/login"))
        .json(&json!({ "password": "yanlis" }))
        .send()
        .await?;

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert!(set_cookies(&res).is_empty());
    assert_eq!(res.json::<Value>().await?["message"], "Hatalı şifre");
    Ok(())
}

#[tokio::test]
async fn login_rejects_tokens_signed_with_another_secret() -> Result<()> {
    let foreign = vbs_gateway::auth::SessionSigner::new("someone-else")
        .issue(&vbs_gateway::auth::Claims::new("11", &[Role::Parent], chrono::Duration::hours(1)))?;
    let backend = MockBackend::start(auth_backend(foreign)).await?;
    let gateway = Gateway::start(&backend.base_url).await?;

    let res = gateway
        .client
        .post(gateway.url("/api/auth/login"))
        .json(&json!({ "password": "dogru-sifre" }))
        .send()
        .await?;

    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    assert!(set_cookies(&res).is_empty());
    Ok(())
}

#[tokio::test]
async fn session_cookie_opens_role_pages_and_session_endpoint() -> Result<()> {
    let backend = MockBackend::start(Router::new()).await?;
    let gateway = Gateway::start(&backend.base_url).await?;
    let cookie = format!("vbs_session={}", token("21", &[Role::Admin]));

    let res = gateway
        .client
        .get(gateway.url("/api/auth/session"))
        .header(header::COOKIE, &cookie)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.json::<Value>().await?["data"]["roles"], json!(["Admin"]));

    // Admin pages are not redirected (the page bundle itself is absent here).
    let page = gateway
        .client
        .get(gateway.url("/admin/registrations"))
        .header(header::COOKIE, &cookie)
        .send()
        .await?;
    assert_ne!(page.status(), StatusCode::TEMPORARY_REDIRECT);
    Ok(())
}

#[tokio::test]
async fn expired_session_is_sent_to_login() -> Result<()> {
    let backend = MockBackend::start(Router::new()).await?;
    let gateway = Gateway::start(&backend.base_url).await?;
    let expired = vbs_gateway::auth::SessionSigner::new(common::SECRET)
        .issue(&vbs_gateway::auth::Claims::new("3", &[Role::Parent], chrono::Duration::hours(-1)))?;

    let res = gateway
        .client
        .get(gateway.url("/parent"))
        .header(header::COOKIE, format!("vbs_session={}", expired))
        .send()
        .await?;

    assert_eq!(res.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(res.headers()[header::LOCATION], "/login?next=%2Fparent");
    Ok(())
}
