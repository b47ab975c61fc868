use actix_web::http::Method;
use actix_web::{test, web, App};
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use daybook_be::dayclock::DayClock;
use daybook_be::{snapshot, transaction};

/// Harness around the real service wired to a throwaway user.
/// Every test gets a fresh random user id, so concurrently running tests
/// never see each other's rows.
pub struct TestApp {
    pub pool: PgPool,
    pub user_id: Uuid,
    pub clock: DayClock,
}

pub struct TestResponse {
    status: u16,
    body: bytes::Bytes,
}

impl TestResponse {
    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("Failed to parse JSON response")
    }
}

impl TestApp {
    /// Connect to DATABASE_URL and run migrations. Returns `None` when no
    /// database is configured so callers can skip instead of failing.
    pub async fn try_new() -> Option<Self> {
        let Ok(database_url) = std::env::var("DATABASE_URL") else {
            eprintln!("DATABASE_URL not set; skipping database-backed test");
            return None;
        };

        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(&database_url)
            .await
            .expect("Failed to connect to database for tests");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("Failed to run migrations");

        Some(TestApp {
            pool,
            user_id: Uuid::new_v4(),
            clock: DayClock::from_offset_hours(9).expect("valid offset"),
        })
    }

    async fn send(&self, method: Method, path: &str, payload: Option<&Value>) -> TestResponse {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(self.pool.clone()))
                .app_data(web::Data::new(self.clock))
                .service(transaction::list_transactions)
                .service(transaction::get_transaction)
                .service(transaction::create_transaction)
                .service(transaction::update_transaction)
                .service(transaction::delete_transaction)
                .service(snapshot::get_daily_snapshot)
                .service(snapshot::get_monthly_snapshots),
        )
        .await;

        let mut req = test::TestRequest::with_uri(path)
            .method(method)
            .insert_header(("X-User-Id", self.user_id.to_string()));
        if let Some(payload) = payload {
            req = req.set_json(payload);
        }

        let resp = test::call_service(&app, req.to_request()).await;
        let status = resp.status().as_u16();
        let body = test::read_body(resp).await;

        TestResponse { status, body }
    }

    pub async fn get(&self, path: &str) -> TestResponse {
        self.send(Method::GET, path, None).await
    }

    pub async fn post(&self, path: &str, payload: &Value) -> TestResponse {
        self.send(Method::POST, path, Some(payload)).await
    }

    pub async fn patch(&self, path: &str, payload: &Value) -> TestResponse {
        self.send(Method::PATCH, path, Some(payload)).await
    }

    pub async fn delete(&self, path: &str) -> TestResponse {
        self.send(Method::DELETE, path, None).await
    }

    /// Seed a category owned by this test's user (category CRUD itself is
    /// outside this service).
    pub async fn seed_category(&self, name: &str, kind: &str) -> Uuid {
        sqlx::query_scalar::<_, Uuid>(
            "INSERT INTO categories (user_id, name, kind) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(self.user_id)
        .bind(name)
        .bind(kind)
        .fetch_one(&self.pool)
        .await
        .expect("Failed to seed category")
    }

    /// Seed a savings goal owned by this test's user.
    pub async fn seed_goal(&self, name: &str, accumulated_amount: i64) -> Uuid {
        sqlx::query_scalar::<_, Uuid>(
            "INSERT INTO savings_goals (user_id, name, accumulated_amount) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(self.user_id)
        .bind(name)
        .bind(accumulated_amount)
        .fetch_one(&self.pool)
        .await
        .expect("Failed to seed savings goal")
    }

    pub async fn goal_amount(&self, goal_id: Uuid) -> i64 {
        sqlx::query_scalar::<_, i64>("SELECT accumulated_amount FROM savings_goals WHERE id = $1")
            .bind(goal_id)
            .fetch_one(&self.pool)
            .await
            .expect("Failed to read goal amount")
    }
}
