#![allow(dead_code)]

use actix_http::Request;
use actix_web::{
    body::MessageBody,
    dev::{Service, ServiceResponse},
    http::{StatusCode, header},
    test,
};
use serde_json::{Value, json};
use timeclock::{
    config::Config,
    db::init_memory_db,
    model::{role::Role, user::User},
    routes::AppState,
};

pub const SECRET: &str = "test-secret";

pub fn test_config() -> Config {
    Config {
        database_url: "sqlite::memory:".into(),
        jwt_secret: SECRET.into(),
        server_addr: "127.0.0.1:0".into(),
        token_ttl: 86400,
        api_prefix: "/api".into(),
        // test requests carry no peer address
        rate_limit_enabled: false,
        rate_login_per_min: 60,
        rate_register_per_min: 30,
        rate_scan_per_min: 120,
        rate_protected_per_min: 1000,
        qr_default_expiry_hours: 24,
        qr_scan_require_auth: false,
        log_dir: "logs".into(),
        log_level: "info".into(),
    }
}

pub async fn state_with(config: Config) -> AppState {
    let pool = init_memory_db().await.expect("in-memory database");
    AppState::new(pool, config)
}

pub async fn state() -> AppState {
    state_with(test_config()).await
}

/// Full route table over `state`, as served in production.
macro_rules! init_app {
    ($state:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .wrap(actix_web::middleware::NormalizePath::trim())
                .configure(|cfg| timeclock::routes::configure(cfg, &$state)),
        )
        .await
    };
}

pub async fn send<S, B>(app: &S, req: Request) -> (StatusCode, Value)
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let resp = test::call_service(app, req).await;
    let status = resp.status();
    let body = test::read_body(resp).await;
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

fn with_token(req: test::TestRequest, token: Option<&str>) -> test::TestRequest {
    match token {
        Some(t) => req.insert_header((header::AUTHORIZATION, format!("Bearer {t}"))),
        None => req,
    }
}

pub async fn get<S, B>(app: &S, uri: &str, token: Option<&str>) -> (StatusCode, Value)
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let req = with_token(test::TestRequest::get().uri(uri), token).to_request();
    send(app, req).await
}

pub async fn post<S, B>(app: &S, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value)
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let req = with_token(test::TestRequest::post().uri(uri), token)
        .set_json(body)
        .to_request();
    send(app, req).await
}

pub async fn put<S, B>(app: &S, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value)
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let req = with_token(test::TestRequest::put().uri(uri), token)
        .set_json(body)
        .to_request();
    send(app, req).await
}

pub async fn delete<S, B>(app: &S, uri: &str, token: Option<&str>) -> (StatusCode, Value)
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let req = with_token(test::TestRequest::delete().uri(uri), token).to_request();
    send(app, req).await
}

pub async fn register<S, B>(app: &S, username: &str, password: &str) -> (StatusCode, Value)
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    post(
        app,
        "/api/auth/register",
        None,
        json!({
            "username": username,
            "password": password,
            "email": format!("{username}@example.com"),
            "first_name": "Test",
            "last_name": username,
        }),
    )
    .await
}

pub async fn login<S, B>(app: &S, username: &str, password: &str) -> String
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let (status, body) = post(
        app,
        "/api/auth/login",
        None,
        json!({ "username": username, "password": password }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed: {body}");

    body["token"].as_str().expect("token").to_string()
}

/// Registers `username` with password `pw123` and logs in. Returns (id, token).
pub async fn sign_up<S, B>(app: &S, username: &str) -> (i64, String)
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let (status, body) = register(app, username, "pw123").await;
    assert_eq!(status, StatusCode::CREATED, "register failed: {body}");

    let id = body["user"]["id"].as_i64().expect("user id");
    (id, login(app, username, "pw123").await)
}

pub async fn promote(state: &AppState, username: &str, role: Role) {
    assert!(
        User::set_role(state.pool.get_ref(), username, role)
            .await
            .expect("set role")
    );
}
