use serde_json::{json, Value};

mod common;
use common::TestApp;

async fn create(app: &TestApp, payload: Value) -> String {
    let resp = app.post("/transactions", &payload).await;
    assert_eq!(resp.status(), 201, "create failed: {}", resp.json());
    resp.json()["id"].as_str().unwrap().to_string()
}

fn page_ids(body: &Value) -> Vec<String> {
    body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["id"].as_str().unwrap().to_string())
        .collect()
}

#[actix_rt::test]
async fn test_cursor_pages_stay_stable_under_concurrent_insert() {
    let Some(app) = TestApp::try_new().await else {
        return;
    };

    // Five transactions with strictly increasing event times.
    let mut ids = Vec::new();
    for hour in 1..=5 {
        ids.push(
            create(
                &app,
                json!({
                    "kind": "expense",
                    "amount": 1000 * hour,
                    "occurredAt": format!("2024-06-01T0{hour}:00:00Z")
                }),
            )
            .await,
        );
    }

    let page1 = app.get("/transactions?limit=2").await.json();
    assert_eq!(page_ids(&page1), vec![ids[4].clone(), ids[3].clone()]);
    assert_eq!(page1["hasMore"], true);
    let cursor = page1["nextCursor"].as_str().unwrap().to_string();
    assert_eq!(cursor, ids[3]);

    // A newer transaction lands between page fetches; the next page must not
    // repeat or skip anything relative to the cursor.
    create(
        &app,
        json!({"kind": "expense", "amount": 9999, "occurredAt": "2024-06-01T06:00:00Z"}),
    )
    .await;

    let page2 = app
        .get(&format!("/transactions?limit=2&cursor={cursor}"))
        .await
        .json();
    assert_eq!(page_ids(&page2), vec![ids[2].clone(), ids[1].clone()]);
    assert_eq!(page2["hasMore"], true);

    let cursor = page2["nextCursor"].as_str().unwrap().to_string();
    let page3 = app
        .get(&format!("/transactions?limit=2&cursor={cursor}"))
        .await
        .json();
    assert_eq!(page_ids(&page3), vec![ids[0].clone()]);
    assert_eq!(page3["hasMore"], false);
    assert!(page3["nextCursor"].is_null());
}

#[actix_rt::test]
async fn test_unknown_cursor_is_rejected() {
    let Some(app) = TestApp::try_new().await else {
        return;
    };

    let resp = app
        .get("/transactions?cursor=00000000-0000-0000-0000-000000000001")
        .await;
    assert_eq!(resp.status(), 400);
    assert_eq!(resp.json()["error"], "VALIDATION_ERROR");
}

#[actix_rt::test]
async fn test_kind_filter_excludes_savings_linked_rows() {
    let Some(app) = TestApp::try_new().await else {
        return;
    };
    let goal_id = app.seed_goal("filtering", 0).await;

    let plain = create(
        &app,
        json!({"kind": "expense", "amount": 5000, "occurredAt": "2024-06-02T03:00:00Z"}),
    )
    .await;
    let saved = create(
        &app,
        json!({"amount": 8000, "savingsGoalId": goal_id, "occurredAt": "2024-06-02T04:00:00Z"}),
    )
    .await;

    // Both rows carry kind=expense, but the plain filter hides the goal-linked one.
    let body = app.get("/transactions?kind=expense").await.json();
    assert_eq!(page_ids(&body), vec![plain.clone()]);

    let body = app.get("/transactions?savingsOnly=true").await.json();
    assert_eq!(page_ids(&body), vec![saved]);
}

#[actix_rt::test]
async fn test_search_amount_and_sort_filters() {
    let Some(app) = TestApp::try_new().await else {
        return;
    };

    let groceries = create(
        &app,
        json!({
            "kind": "expense", "amount": 30000,
            "description": "Weekly Groceries run",
            "occurredAt": "2024-06-03T03:00:00Z"
        }),
    )
    .await;
    let coffee = create(
        &app,
        json!({
            "kind": "expense", "amount": 4000,
            "description": "coffee",
            "occurredAt": "2024-06-03T04:00:00Z"
        }),
    )
    .await;
    let rent = create(
        &app,
        json!({
            "kind": "expense", "amount": 500000,
            "description": "rent",
            "occurredAt": "2024-06-03T05:00:00Z"
        }),
    )
    .await;

    // Case-insensitive substring search.
    let body = app.get("/transactions?search=groceries").await.json();
    assert_eq!(page_ids(&body), vec![groceries.clone()]);

    // Inclusive amount bounds.
    let body = app
        .get("/transactions?minAmount=4000&maxAmount=30000&sort=cheapest")
        .await
        .json();
    assert_eq!(page_ids(&body), vec![coffee.clone(), groceries.clone()]);

    let body = app.get("/transactions?sort=expensive").await.json();
    assert_eq!(page_ids(&body), vec![rent, groceries, coffee]);
}

#[actix_rt::test]
async fn test_month_range_uses_local_days_and_beats_legacy_filter() {
    let Some(app) = TestApp::try_new().await else {
        return;
    };

    // 2024-04-30T15:30:00Z is already local May 1st at UTC+9.
    let april = create(
        &app,
        json!({"kind": "expense", "amount": 1000, "occurredAt": "2024-04-10T03:00:00Z"}),
    )
    .await;
    let may_by_offset = create(
        &app,
        json!({"kind": "expense", "amount": 2000, "occurredAt": "2024-04-30T15:30:00Z"}),
    )
    .await;
    let may = create(
        &app,
        json!({"kind": "expense", "amount": 3000, "occurredAt": "2024-05-20T03:00:00Z"}),
    )
    .await;

    let body = app
        .get("/transactions?startYear=2024&startMonth=4&endYear=2024&endMonth=4")
        .await
        .json();
    assert_eq!(page_ids(&body), vec![april.clone()]);

    let body = app
        .get("/transactions?year=2024&month=5&sort=oldest")
        .await
        .json();
    assert_eq!(page_ids(&body), vec![may_by_offset.clone(), may.clone()]);

    // Explicit range wins when both are present.
    let body = app
        .get("/transactions?startYear=2024&startMonth=4&endYear=2024&endMonth=4&year=2024&month=5")
        .await
        .json();
    assert_eq!(page_ids(&body), vec![april]);
}

#[actix_rt::test]
async fn test_category_filter_and_linkage_validation() {
    let Some(app) = TestApp::try_new().await else {
        return;
    };
    let food = app.seed_category("food", "expense").await;
    let salary = app.seed_category("salary", "income").await;

    // Kind/category mismatch is rejected before anything is written.
    let resp = app
        .post(
            "/transactions",
            &json!({"kind": "expense", "amount": 1000, "categoryId": salary}),
        )
        .await;
    assert_eq!(resp.status(), 400);
    assert_eq!(resp.json()["error"], "VALIDATION_ERROR");

    let fed = create(
        &app,
        json!({
            "kind": "expense", "amount": 6000, "categoryId": food,
            "occurredAt": "2024-06-04T03:00:00Z"
        }),
    )
    .await;
    let paid = create(
        &app,
        json!({
            "kind": "income", "amount": 90000, "categoryId": salary,
            "occurredAt": "2024-06-04T04:00:00Z"
        }),
    )
    .await;
    create(
        &app,
        json!({"kind": "expense", "amount": 100, "occurredAt": "2024-06-04T05:00:00Z"}),
    )
    .await;

    let body = app
        .get(&format!("/transactions?categoryIds={food},{salary}&sort=oldest"))
        .await
        .json();
    assert_eq!(page_ids(&body), vec![fed.clone(), paid]);

    // Changing the kind without moving the category re-validates the link.
    let resp = app
        .patch(&format!("/transactions/{fed}"), &json!({"kind": "income"}))
        .await;
    assert_eq!(resp.status(), 400);
}

#[actix_rt::test]
async fn test_patch_distinguishes_null_from_absent_description() {
    let Some(app) = TestApp::try_new().await else {
        return;
    };

    let id = create(
        &app,
        json!({
            "kind": "expense", "amount": 2000, "description": "lunch",
            "occurredAt": "2024-06-06T03:00:00Z"
        }),
    )
    .await;

    // An absent field keeps the existing description.
    let resp = app
        .patch(&format!("/transactions/{id}"), &json!({"amount": 2500}))
        .await;
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.json()["description"], "lunch");

    // An explicit null clears it.
    let resp = app
        .patch(&format!("/transactions/{id}"), &json!({"description": null}))
        .await;
    assert_eq!(resp.status(), 200);
    assert!(resp.json()["description"].is_null());
}

#[actix_rt::test]
async fn test_validation_and_not_found_errors() {
    let Some(app) = TestApp::try_new().await else {
        return;
    };

    let resp = app
        .post("/transactions", &json!({"kind": "expense", "amount": 0}))
        .await;
    assert_eq!(resp.status(), 400);

    let resp = app
        .post("/transactions", &json!({"kind": "expense", "amount": -5}))
        .await;
    assert_eq!(resp.status(), 400);

    let missing = uuid::Uuid::new_v4();
    let resp = app
        .patch(&format!("/transactions/{missing}"), &json!({"amount": 10}))
        .await;
    assert_eq!(resp.status(), 404);

    let resp = app.delete(&format!("/transactions/{missing}")).await;
    assert_eq!(resp.status(), 404);

    // Another user's transaction is invisible.
    let other = TestApp::try_new().await.expect("database available");
    let foreign = create(
        &other,
        json!({"kind": "expense", "amount": 1000, "occurredAt": "2024-06-05T03:00:00Z"}),
    )
    .await;
    let resp = app.get(&format!("/transactions/{foreign}")).await;
    assert_eq!(resp.status(), 404);
}
