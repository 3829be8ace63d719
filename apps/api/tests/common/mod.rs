//! Common test utilities and helpers

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use branchline_api::auth::hash_password;
use branchline_api::{build_router, ApiConfig, AppState};
use branchline_core::money::Money;
use branchline_core::schema::{InventoryAddition, NewBranch, NewProduct, NewUser};
use branchline_core::types::Role;
use branchline_db::{Database, DbConfig};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

pub const ADMIN_PASSWORD: &str = "admin-pass";

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
}

impl TestApp {
    pub fn db(&self) -> &Database {
        &self.state.db
    }

    /// Sends a request and returns status plus parsed JSON body
    /// (`Value::Null` for an empty body).
    pub async fn send(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {}", token));
        }

        let request = match body {
            Some(json) => builder
                .header("Content-Type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        (status, json)
    }

    pub async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.send(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, Some(token), Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::PUT, uri, Some(token), Some(body)).await
    }

    /// Issues a token for an existing user without going through login.
    pub async fn token_for(&self, username: &str) -> String {
        let user = self
            .db()
            .users()
            .find_by_username(username)
            .await
            .unwrap()
            .unwrap();
        self.state.jwt.issue(&user).unwrap()
    }

    pub async fn add_user(&self, username: &str, role: Role, branch_id: Option<i64>) -> i64 {
        self.db()
            .users()
            .create(
                &NewUser {
                    username: username.to_string(),
                    password: "unused".to_string(),
                    full_name: format!("{} Tester", username),
                    email: None,
                    role,
                    branch_id,
                },
                // never verifies; these users get tokens via token_for
                "$argon2id$v=19$m=19456,t=2,p=1$c2FsdHNhbHQ$aGFzaGhhc2g",
            )
            .await
            .unwrap()
    }

    pub async fn add_branch(&self, name: &str) -> i64 {
        self.db()
            .branches()
            .create(&NewBranch {
                name: name.to_string(),
                address: format!("{} High Street", name),
                phone: None,
                manager: None,
            })
            .await
            .unwrap()
    }

    pub async fn add_product(&self, name: &str, cents: i64) -> i64 {
        self.db()
            .products()
            .create(&NewProduct {
                name: name.to_string(),
                description: None,
                category: Some("General".to_string()),
                price: Money::from_cents(cents),
            })
            .await
            .unwrap()
    }

    pub async fn add_stock(&self, branch_id: i64, product_id: i64, quantity: i64) {
        self.db()
            .inventory()
            .add(&InventoryAddition {
                branch_id,
                product_id,
                quantity,
            })
            .await
            .unwrap();
    }

    pub async fn stock(&self, branch_id: i64, product_id: i64) -> i64 {
        self.db()
            .inventory()
            .get(branch_id, product_id)
            .await
            .unwrap()
            .map(|r| r.quantity)
            .unwrap_or(0)
    }
}

/// In-memory app with one admin user (`admin` / [`ADMIN_PASSWORD`]).
pub async fn setup_test_app() -> TestApp {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();

    let admin = NewUser {
        username: "admin".to_string(),
        password: ADMIN_PASSWORD.to_string(),
        full_name: "Test Admin".to_string(),
        email: None,
        role: Role::Admin,
        branch_id: None,
    };
    let hash = hash_password(ADMIN_PASSWORD).unwrap();
    db.users().create(&admin, &hash).await.unwrap();

    let config = ApiConfig::from_builder(
        config::Config::builder()
            .set_override("jwt_secret", "integration-test-secret")
            .unwrap(),
    )
    .unwrap();

    let state = AppState::new(db, config);
    TestApp {
        router: build_router(state.clone()),
        state,
    }
}
