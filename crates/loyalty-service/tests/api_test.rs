//! HTTP API 集成测试
//!
//! 使用内存存储和桩计算系统，通过 `oneshot` 驱动完整路由栈（含认证与可观测性中间件）。

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Request, StatusCode, header},
};
use loyalty_service::{
    LoyaltyService, ReconciliationEngine,
    accrual::{AccrualClient, AccrualError, AccrualResponse, AccrualStatus},
    auth::{JwtConfig, JwtManager, PasswordHasher},
    repository::MemoryStore,
    routes::build_router,
    service::OrderUpdate,
    state::AppState,
    validation::OrderNumberValidator,
};
use loyalty_shared::config::ReconcileConfig;
use parking_lot::Mutex;
use serde_json::{Value, json};
use tower::ServiceExt;

/// 计算系统桩：按订单号返回预设结果，未预设的订单视为未登记
#[derive(Default)]
struct StubAccrual {
    results: Mutex<HashMap<String, (AccrualStatus, Option<f64>)>>,
}

impl StubAccrual {
    fn set(&self, order: &str, status: AccrualStatus, accrual: Option<f64>) {
        self.results
            .lock()
            .insert(order.to_string(), (status, accrual));
    }
}

#[async_trait]
impl AccrualClient for StubAccrual {
    async fn get_order_accrual(&self, order_number: &str) -> Result<AccrualResponse, AccrualError> {
        match self.results.lock().get(order_number) {
            Some((status, accrual)) => Ok(AccrualResponse {
                order: order_number.to_string(),
                status: status.clone(),
                accrual: *accrual,
            }),
            None => Err(AccrualError::NoSuchOrder(order_number.to_string())),
        }
    }
}

struct TestApp {
    router: Router,
    service: Arc<LoyaltyService>,
    accrual: Arc<StubAccrual>,
}

fn create_test_app() -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let accrual = Arc::new(StubAccrual::default());
    let engine = ReconciliationEngine::new(store.clone(), accrual.clone(), &ReconcileConfig::default());
    let service = Arc::new(LoyaltyService::new(
        store,
        engine,
        JwtManager::new(JwtConfig::default()),
        PasswordHasher::new(4),
        OrderNumberValidator::default(),
    ));

    TestApp {
        router: build_router(AppState::new(service.clone())),
        service,
        accrual,
    }
}

impl TestApp {
    async fn send(&self, request: Request<Body>) -> (StatusCode, HeaderMap, Vec<u8>) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, headers, body.to_vec())
    }

    /// 注册用户并返回 Authorization 头的值
    async fn register(&self, login: &str, password: &str) -> String {
        let (status, headers, _) = self
            .send(json_request(
                "/api/user/register",
                json!({ "login": login, "password": password }),
                None,
            ))
            .await;
        assert_eq!(status, StatusCode::OK, "注册应成功: {login}");
        headers[header::AUTHORIZATION].to_str().unwrap().to_string()
    }

    async fn upload(&self, auth: &str, number: &str) -> StatusCode {
        let request = Request::builder()
            .method("POST")
            .uri("/api/user/orders")
            .header(header::CONTENT_TYPE, "text/plain")
            .header(header::AUTHORIZATION, auth)
            .body(Body::from(number.to_string()))
            .unwrap();
        self.send(request).await.0
    }
}

fn json_request(uri: &str, body: Value, auth: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(auth) = auth {
        builder = builder.header(header::AUTHORIZATION, auth);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get_request(uri: &str, auth: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(auth) = auth {
        builder = builder.header(header::AUTHORIZATION, auth);
    }
    builder.body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_register_and_login() {
    let app = create_test_app();

    let auth = app.register("alice", "secret").await;
    assert!(auth.starts_with("Bearer "));

    // 重复注册
    let (status, _, _) = app
        .send(json_request(
            "/api/user/register",
            json!({ "login": "alice", "password": "other" }),
            None,
        ))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // 登录成功，响应体也携带 token
    let (status, headers, body) = app
        .send(json_request(
            "/api/user/login",
            json!({ "login": "alice", "password": "secret" }),
            None,
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(headers.contains_key(header::AUTHORIZATION));
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert!(body["token"].is_string());

    // 密码错误
    let (status, _, _) = app
        .send(json_request(
            "/api/user/login",
            json!({ "login": "alice", "password": "wrong" }),
            None,
        ))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_register_bad_request() {
    let app = create_test_app();

    let request = Request::builder()
        .method("POST")
        .uri("/api/user/register")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, _, body) = app.send(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, _, _) = app
        .send(json_request(
            "/api/user/register",
            json!({ "login": "", "password": "secret" }),
            None,
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_protected_routes_require_token() {
    let app = create_test_app();

    for uri in ["/api/user/orders", "/api/user/balance", "/api/user/withdrawals"] {
        let (status, _, _) = app.send(get_request(uri, None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "缺少 Token 应返回 401: {uri}");

        let (status, _, _) = app.send(get_request(uri, Some("Bearer garbage"))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "非法 Token 应返回 401: {uri}");
    }
}

#[tokio::test]
async fn test_order_upload_status_codes() {
    let app = create_test_app();
    let alice = app.register("alice", "secret").await;
    let bob = app.register("bob", "secret").await;

    assert_eq!(app.upload(&alice, "12345678902").await, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(app.upload(&alice, "abc").await, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(app.upload(&alice, "").await, StatusCode::BAD_REQUEST);

    assert_eq!(app.upload(&alice, "12345678903").await, StatusCode::ACCEPTED);
    assert_eq!(app.upload(&alice, "12345678903").await, StatusCode::OK);
    assert_eq!(app.upload(&bob, "12345678903").await, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_list_orders() {
    let app = create_test_app();
    let alice = app.register("alice", "secret").await;

    let (status, _, _) = app.send(get_request("/api/user/orders", Some(&alice))).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    assert_eq!(app.upload(&alice, "9278923470").await, StatusCode::ACCEPTED);
    assert_eq!(app.upload(&alice, "346436439").await, StatusCode::ACCEPTED);

    app.accrual
        .set("9278923470", AccrualStatus::Processed, Some(500.0));
    let update = app.service.update_order_accrual("9278923470").await.unwrap();
    assert_eq!(update, OrderUpdate::Credited { amount: 500.0 });

    let (status, _, body) = app.send(get_request("/api/user/orders", Some(&alice))).await;
    assert_eq!(status, StatusCode::OK);

    let orders: Vec<Value> = serde_json::from_slice(&body).unwrap();
    assert_eq!(orders.len(), 2);

    // 新上传的订单在前
    assert_eq!(orders[0]["number"], "346436439");
    assert_eq!(orders[0]["status"], "NEW");
    assert!(orders[0].get("accrual").is_none(), "未完结订单不应展示积分");
    assert!(orders[0]["uploaded_at"].is_string());

    assert_eq!(orders[1]["number"], "9278923470");
    assert_eq!(orders[1]["status"], "PROCESSED");
    assert_eq!(orders[1]["accrual"], 500.0);
}

#[tokio::test]
async fn test_balance_and_withdraw_flow() {
    let app = create_test_app();
    let alice = app.register("alice", "secret").await;

    let (status, _, body) = app.send(get_request("/api/user/balance", Some(&alice))).await;
    assert_eq!(status, StatusCode::OK);
    let balance: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(balance["current"], 0.0);
    assert_eq!(balance["withdrawn"], 0.0);

    let (status, _, _) = app.send(get_request("/api/user/withdrawals", Some(&alice))).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    assert_eq!(app.upload(&alice, "79927398713").await, StatusCode::ACCEPTED);
    app.accrual
        .set("79927398713", AccrualStatus::Processed, Some(729.98));
    app.service.update_order_accrual("79927398713").await.unwrap();

    // 余额不足
    let (status, _, _) = app
        .send(json_request(
            "/api/user/balance/withdraw",
            json!({ "order": "2377225624", "sum": 751 }),
            Some(&alice),
        ))
        .await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);

    // 凭证订单号未通过 Luhn 校验
    let (status, _, _) = app
        .send(json_request(
            "/api/user/balance/withdraw",
            json!({ "order": "2377225625", "sum": 10 }),
            Some(&alice),
        ))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    // 金额非法
    let (status, _, _) = app
        .send(json_request(
            "/api/user/balance/withdraw",
            json!({ "order": "2377225624", "sum": 0 }),
            Some(&alice),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _, _) = app
        .send(json_request(
            "/api/user/balance/withdraw",
            json!({ "order": "2377225624", "sum": 229.98 }),
            Some(&alice),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, _, body) = app.send(get_request("/api/user/balance", Some(&alice))).await;
    let balance: Value = serde_json::from_slice(&body).unwrap();
    let current = balance["current"].as_f64().unwrap();
    let withdrawn = balance["withdrawn"].as_f64().unwrap();
    assert!((current - 500.0).abs() < 1e-9, "余额应为 500，实际 {current}");
    assert!((withdrawn - 229.98).abs() < 1e-9, "累计提现应为 229.98，实际 {withdrawn}");

    let (status, _, body) = app.send(get_request("/api/user/withdrawals", Some(&alice))).await;
    assert_eq!(status, StatusCode::OK);
    let withdrawals: Vec<Value> = serde_json::from_slice(&body).unwrap();
    assert_eq!(withdrawals.len(), 1);
    assert_eq!(withdrawals[0]["order"], "2377225624");
    assert!(withdrawals[0]["processed_at"].is_string());
}

#[tokio::test]
async fn test_users_are_isolated() {
    let app = create_test_app();
    let alice = app.register("alice", "secret").await;
    let bob = app.register("bob", "secret").await;

    assert_eq!(app.upload(&alice, "4561261212345467").await, StatusCode::ACCEPTED);

    let (status, _, _) = app.send(get_request("/api/user/orders", Some(&bob))).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_health_and_security_headers() {
    let app = create_test_app();

    let (status, headers, body) = app.send(get_request("/health", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert!(headers.contains_key("x-request-id"));
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["status"], "ok");

    let (status, _, _) = app.send(get_request("/ready", None)).await;
    assert_eq!(status, StatusCode::OK);
}
