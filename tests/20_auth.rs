mod common;

use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde_json::{json, Value};

use common::PASSWORD;

#[tokio::test]
async fn register_login_and_me() -> Result<()> {
    let app = common::spawn_app().await?;

    let token = app.register("John Doe", "John@Gmail.com", "publisher").await?;
    assert!(!token.is_empty());

    let res = app.login("john@gmail.com", PASSWORD).await?;
    assert_eq!(res.status(), StatusCode::OK);
    let cookie = res
        .headers()
        .get("set-cookie")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(cookie.starts_with("token="));
    assert!(cookie.contains("HttpOnly"));

    let me = app
        .client
        .get(app.api("/auth/me"))
        .bearer_auth(&token)
        .send()
        .await?
        .json::<Value>()
        .await?;
    assert_eq!(me["data"]["email"], "john@gmail.com");
    assert_eq!(me["data"]["role"], "publisher");
    assert!(me["data"].get("password").is_none());
    Ok(())
}

#[tokio::test]
async fn session_cookie_authenticates() -> Result<()> {
    let app = common::spawn_app().await?;
    let token = app.register("Mary Williams", "mary@gmail.com", "user").await?;

    let res = app
        .client
        .get(app.api("/auth/me"))
        .header("cookie", format!("token={}", token))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    let res = app
        .client
        .get(app.api("/auth/me"))
        .header("cookie", format!("theme=dark; token=\"{}\"", token))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn registration_is_validated() -> Result<()> {
    let app = common::spawn_app().await?;

    let res = app
        .client
        .post(app.api("/auth/register"))
        .json(&json!({ "name": "Sneaky", "email": "sneaky@gmail.com", "password": PASSWORD, "role": "admin" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(res.json::<Value>().await?["error"], "Role must be user or publisher");

    let res = app
        .client
        .post(app.api("/auth/register"))
        .json(&json!({ "name": "Short", "email": "short@gmail.com", "password": "123" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(res.json::<Value>().await?["error"], "Password must be at least 6 characters");

    app.register("John Doe", "john@gmail.com", "user").await?;
    let res = app
        .client
        .post(app.api("/auth/register"))
        .json(&json!({ "name": "Other John", "email": "john@gmail.com", "password": PASSWORD }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(res.json::<Value>().await?["error"], "Duplicate field value entered");
    Ok(())
}

#[tokio::test]
async fn login_failures() -> Result<()> {
    let app = common::spawn_app().await?;
    app.register("John Doe", "john@gmail.com", "user").await?;

    let res = app
        .client
        .post(app.api("/auth/login"))
        .json(&json!({ "email": "john@gmail.com" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(res.json::<Value>().await?["error"], "Please provide an email and password");

    let res = app.login("john@gmail.com", "wrong-password").await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(res.json::<Value>().await?["error"], "Invalid credentials");

    let res = app.login("nobody@gmail.com", PASSWORD).await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(res.json::<Value>().await?["error"], "Invalid credentials");
    Ok(())
}

#[tokio::test]
async fn protected_routes_need_a_valid_token() -> Result<()> {
    let app = common::spawn_app().await?;

    let res = app.client.get(app.api("/auth/me")).send().await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(res.json::<Value>().await?["error"], "Not authorized to access this route");

    let res = app
        .client
        .get(app.api("/auth/me"))
        .bearer_auth("not-a-jwt")
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn logout_expires_the_cookie() -> Result<()> {
    let app = common::spawn_app().await?;

    let res = app.client.get(app.api("/auth/logout")).send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    let cookie = res
        .headers()
        .get("set-cookie")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(cookie.starts_with("token=none"));
    assert_eq!(res.json::<Value>().await?["data"], json!({}));
    Ok(())
}

#[tokio::test]
async fn update_details_and_password() -> Result<()> {
    let app = common::spawn_app().await?;
    let token = app.register("John Doe", "john@gmail.com", "user").await?;

    let res = app
        .client
        .put(app.api("/auth/updatedetails"))
        .bearer_auth(&token)
        .json(&json!({ "name": "John Q. Doe", "role": "admin" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body = res.json::<Value>().await?;
    assert_eq!(body["data"]["name"], "John Q. Doe");
    assert_eq!(body["data"]["role"], "user");

    let res = app
        .client
        .put(app.api("/auth/updatepassword"))
        .bearer_auth(&token)
        .json(&json!({ "currentPassword": "nope-nope", "newPassword": "abcdef" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(res.json::<Value>().await?["error"], "Password is incorrect");

    let res = app
        .client
        .put(app.api("/auth/updatepassword"))
        .bearer_auth(&token)
        .json(&json!({ "currentPassword": PASSWORD, "newPassword": "abcdef" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.json::<Value>().await?["token"].is_string());

    assert_eq!(app.login("john@gmail.com", PASSWORD).await?.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(app.login("john@gmail.com", "abcdef").await?.status(), StatusCode::OK);
    Ok(())
}

fn reset_token_from(text: &str) -> Option<String> {
    text.split("/auth/resetpassword/")
        .nth(1)
        .map(|rest| rest.trim().to_string())
}

#[tokio::test]
async fn forgot_and_reset_password() -> Result<()> {
    let app = common::spawn_app().await?;
    app.register("John Doe", "john@gmail.com", "user").await?;

    let res = app
        .client
        .post(app.api("/auth/forgotpassword"))
        .json(&json!({ "email": "nobody@gmail.com" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(res.json::<Value>().await?["error"], "There is no user with that email");

    let res = app
        .client
        .post(app.api("/auth/forgotpassword"))
        .json(&json!({ "email": "john@gmail.com" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.json::<Value>().await?["data"], "Email sent");

    let sent = app.mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "john@gmail.com");
    assert!(sent[0].text.contains(&format!("{}/api/v1/auth/resetpassword/", app.base_url)));
    let token = reset_token_from(&sent[0].text).context("mail carried no reset link")?;

    let res = app
        .client
        .put(app.api(&format!("/auth/resetpassword/{}", token)))
        .json(&json!({ "password": "brand-new" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.json::<Value>().await?["token"].is_string());
    assert_eq!(app.login("john@gmail.com", "brand-new").await?.status(), StatusCode::OK);

    // single use
    let res = app
        .client
        .put(app.api(&format!("/auth/resetpassword/{}", token)))
        .json(&json!({ "password": "again-new" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(res.json::<Value>().await?["error"], "Invalid token");
    Ok(())
}

#[tokio::test]
async fn reset_link_ignores_request_host() -> Result<()> {
    let app = common::spawn_app_with(|config| {
        config.server.public_base_url = "https://devcamper.io".to_string();
    })
    .await?;
    app.register("John Doe", "john@gmail.com", "user").await?;

    let res = app
        .client
        .post(app.api("/auth/forgotpassword"))
        .header("Host", "attacker.example")
        .header("X-Forwarded-Proto", "https")
        .header("X-Forwarded-Host", "attacker.example")
        .json(&json!({ "email": "john@gmail.com" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    let sent = app.mailer.sent();
    assert_eq!(sent.len(), 1);
    assert!(!sent[0].text.contains("attacker.example"));
    assert!(sent[0]
        .text
        .contains("https://devcamper.io/api/v1/auth/resetpassword/"));
    Ok(())
}

#[tokio::test]
async fn failed_delivery_withdraws_the_token() -> Result<()> {
    let app = common::spawn_app().await?;
    app.register("John Doe", "john@gmail.com", "user").await?;
    app.mailer.fail(true);

    let res = app
        .client
        .post(app.api("/auth/forgotpassword"))
        .json(&json!({ "email": "john@gmail.com" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let user = devcamper_api::database::UserStore::find_user_by_email(app.store.as_ref(), "john@gmail.com")
        .await?
        .context("user vanished")?;
    assert!(user.reset_password_token.is_none());
    assert!(user.reset_password_expire.is_none());
    Ok(())
}

#[tokio::test]
async fn passwords_with_markup_survive_sanitizing() -> Result<()> {
    let app = common::spawn_app().await?;
    let password = "<b>secret</b>";

    let res = app
        .client
        .post(app.api("/auth/register"))
        .json(&json!({ "name": "<i>Mary</i>", "email": "mary@gmail.com", "password": password }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let token = common::token_of(res).await?;

    let res = app.login("mary@gmail.com", password).await?;
    assert_eq!(res.status(), StatusCode::OK);

    let me = app
        .client
        .get(app.api("/auth/me"))
        .bearer_auth(&token)
        .send()
        .await?
        .json::<Value>()
        .await?;
    assert_eq!(me["data"]["name"], "&lt;i&gt;Mary&lt;/i&gt;");

    let res = app
        .client
        .put(app.api("/auth/updatepassword"))
        .bearer_auth(&token)
        .json(&json!({ "currentPassword": password, "newPassword": "a<b>c>d" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(app.login("mary@gmail.com", "a<b>c>d").await?.status(), StatusCode::OK);
    Ok(())
}
