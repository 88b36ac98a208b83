use axum::http::StatusCode;
use fundledger::api::{self, AppState, TrustedHeaderIdentity};
use fundledger::config::{CommissionConfig, Config, SettlementConfig};
use fundledger::db::init_db;
use fundledger::Repository;
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use tower::util::ServiceExt;

struct TestApp {
    app: axum::Router,
    _temp: TempDir,
}

async fn setup_test_app() -> TestApp {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir
        .path()
        .join("test.db")
        .to_string_lossy()
        .to_string();
    let pool = init_db(&db_path).await.expect("init_db failed");
    let repo = Arc::new(Repository::new(pool));

    let config = Config {
        port: 0,
        database_path: db_path,
        commission: CommissionConfig::default(),
        settlement: SettlementConfig::default(),
    };

    let state = AppState::new(repo, config, Arc::new(TrustedHeaderIdentity));
    TestApp {
        app: api::create_router(state),
        _temp: temp_dir,
    }
}

/// (user id, role) sent as identity headers, always with KYC completed.
type As<'a> = Option<(&'a str, &'a str)>;

async fn request(
    app: &axum::Router,
    method: &str,
    uri: &str,
    caller: As<'_>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = axum::http::Request::builder().method(method).uri(uri);
    if let Some((id, role)) = caller {
        builder = builder
            .header("x-caller-id", id)
            .header("x-caller-role", role)
            .header("x-caller-kyc", "true");
    }
    let req = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(axum::body::Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(axum::body::Body::empty()).unwrap(),
    };

    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

const ADMIN: As<'static> = Some(("ops", "ADMIN"));
const ACME: As<'static> = Some(("acme", "BUSINESS"));

async fn funded_investor(app: &axum::Router, id: &'static str, amount: &str) {
    let who = Some((id, "INVESTOR"));
    let (status, _) = request(app, "POST", "/v1/wallets", who, None).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = request(
        app,
        "POST",
        "/v1/wallets/me/deposit",
        who,
        Some(json!({"amount": amount})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

async fn approved_project(app: &axum::Router, requested: &str) -> String {
    let (status, project) = request(
        app,
        "POST",
        "/v1/projects",
        ACME,
        Some(json!({
            "title": "Food truck",
            "amountRequested": requested,
            "duration": 12,
            "expectedROI": "15"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(project["status"], "PENDING");
    let id = project["id"].as_str().unwrap().to_string();

    let (status, project) = request(
        app,
        "POST",
        &format!("/v1/projects/{}/decision", id),
        ADMIN,
        Some(json!({"decision": "approve"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(project["status"], "APPROVED");
    id
}

#[tokio::test]
async fn test_health_endpoints() {
    let test_app = setup_test_app().await;
    let (status, body) = request(&test_app.app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_missing_identity_is_unauthorized() {
    let test_app = setup_test_app().await;
    let (status, body) = request(&test_app.app, "GET", "/v1/wallets/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["kind"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_wallet_money_is_decimal_strings() {
    let test_app = setup_test_app().await;
    funded_investor(&test_app.app, "alice", "125.50").await;
    let alice = Some(("alice", "INVESTOR"));

    let (status, wallet) = request(&test_app.app, "GET", "/v1/wallets/me", alice, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(wallet["balance"], "125.5");

    let (status, body) = request(
        &test_app.app,
        "POST",
        "/v1/wallets/me/withdraw",
        alice,
        Some(json!({"amount": "200"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], "INSUFFICIENT_FUNDS");

    let (status, trail) =
        request(&test_app.app, "GET", "/v1/wallets/me/transactions", alice, None).await;
    assert_eq!(status, StatusCode::OK);
    let trail = trail.as_array().unwrap();
    assert_eq!(trail.len(), 1);
    assert_eq!(trail[0]["type"], "DEPOSIT");
    assert_eq!(trail[0]["status"], "COMPLETED");
}

#[tokio::test]
async fn test_invest_and_repay_over_http() {
    let test_app = setup_test_app().await;
    let app = &test_app.app;
    let project_id = approved_project(app, "1000").await;
    funded_investor(app, "a", "300").await;
    funded_investor(app, "b", "700").await;

    for (id, amount) in [("a", "300"), ("b", "700")] {
        let (status, summary) = request(
            app,
            "POST",
            &format!("/v1/projects/{}/investments", project_id),
            Some((id, "INVESTOR")),
            Some(json!({"amount": amount})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(summary["investorBalance"], "0");
    }

    let (status, project) =
        request(app, "GET", &format!("/v1/projects/{}", project_id), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(project["status"], "FUNDED");

    let (status, _) = request(
        app,
        "POST",
        &format!("/v1/projects/{}/repayment", project_id),
        ACME,
        Some(json!({"totalRepayment": "1300"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, report) = request(
        app,
        "POST",
        &format!("/v1/projects/{}/repayment", project_id),
        ADMIN,
        Some(json!({"totalRepayment": "1300"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["completed"], true);
    assert_eq!(report["commission"]["amount"], "15");
    assert_eq!(report["commission"]["type"], "profit");

    let (status, portfolio) = request(
        app,
        "GET",
        "/v1/investments/me/portfolio",
        Some(("b", "INVESTOR")),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(portfolio["realizedReturn"], "210");
    assert_eq!(portfolio["closedCount"], 1);

    let (status, commissions) = request(
        app,
        "GET",
        &format!("/v1/projects/{}/commissions", project_id),
        ACME,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(commissions.as_array().unwrap().len(), 1);

    let (status, audit) = request(app, "GET", "/v1/admin/audit", ADMIN, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(audit["violations"].as_array().unwrap().len(), 0);
    assert_eq!(audit["projectsChecked"], 1);
}

#[tokio::test]
async fn test_error_kinds_map_to_status() {
    let test_app = setup_test_app().await;
    let app = &test_app.app;
    let project_id = approved_project(app, "1000").await;
    funded_investor(app, "a", "2000").await;
    let a = Some(("a", "INVESTOR"));
    let invest_uri = format!("/v1/projects/{}/investments", project_id);

    let (status, body) =
        request(app, "POST", &invest_uri, a, Some(json!({"amount": "1500"}))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "CAPACITY_EXCEEDED");

    let (status, body) =
        request(app, "POST", &invest_uri, a, Some(json!({"amount": "50"}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], "INVALID_AMOUNT");

    let (status, _) = request(app, "POST", &invest_uri, a, Some(json!({"amount": "200"}))).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, body) =
        request(app, "POST", &invest_uri, a, Some(json!({"amount": "200"}))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "DUPLICATE_INVESTMENT");

    let (status, body) = request(app, "GET", "/v1/projects/nope", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "NOT_FOUND");

    let (status, _) = request(app, "GET", "/v1/projects?status=bogus", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, listed) = request(app, "GET", "/v1/projects?status=approved", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);
}
