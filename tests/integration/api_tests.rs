//! API integration tests
//!
//! Need a running server backed by a database:
//! `cargo test --test api_tests -- --ignored`

use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

const BASE_URL: &str = "http://localhost:8080/api";

/// Create a book and return its id
async fn create_book(client: &Client, body: Value) -> i64 {
    let response = client
        .post(format!("{}/books", BASE_URL))
        .json(&body)
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::CREATED);

    let body: Value = response.json().await.expect("Failed to parse response");
    body["id"].as_i64().expect("No book ID")
}

async fn delete_book(client: &Client, id: i64) -> StatusCode {
    client
        .delete(format!("{}/books/{}", BASE_URL, id))
        .send()
        .await
        .expect("Failed to send request")
        .status()
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_health_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/health", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
#[ignore]
async fn test_lend_and_return_scenario() {
    let client = Client::new();

    let response = client
        .post(format!("{}/books", BASE_URL))
        .json(&json!({
            "title": "Война и мир",
            "author": "Лев Толстой",
            "room": "Гостиная",
            "cabinet": 1,
            "shelf": 1,
            "row": 1
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::CREATED);
    let created: Value = response.json().await.expect("Failed to parse response");
    let id = created["id"].as_i64().expect("No book ID");
    assert!(id > 0);
    assert_eq!(created["status"], "available");

    // Read back what was stored
    let fetched: Value = client
        .get(format!("{}/books/{}", BASE_URL, id))
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    assert_eq!(fetched, created);

    // Lend
    let response = client
        .post(format!("{}/books/{}/lend", BASE_URL, id))
        .json(&json!({ "lent_to": "Иван" }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::OK);
    let lent: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(lent["status"], "lent");
    assert_eq!(lent["lent_to"], "Иван");
    assert!(lent["lent_date"].is_string());

    // Lend again
    let response = client
        .post(format!("{}/books/{}/lend", BASE_URL, id))
        .json(&json!({ "lent_to": "Пётр" }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["error"], "Book is already lent");

    // Return
    let response = client
        .post(format!("{}/books/{}/return", BASE_URL, id))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::OK);
    let returned: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(returned["status"], "available");
    assert_eq!(returned["lent_to"], "");
    assert!(returned["lent_date"].is_null());

    // Return again
    let response = client
        .post(format!("{}/books/{}/return", BASE_URL, id))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    assert_eq!(delete_book(&client, id).await, StatusCode::OK);
}

#[tokio::test]
#[ignore]
async fn test_partial_update_keeps_other_fields() {
    let client = Client::new();
    let id = create_book(
        &client,
        json!({
            "title": "Анна Каренина",
            "author": "Лев Толстой",
            "genre": "Роман",
            "room": "Кабинет",
            "cabinet": 2,
            "shelf": 1,
            "row": 2
        }),
    )
    .await;

    let response = client
        .put(format!("{}/books/{}", BASE_URL, id))
        .json(&json!({ "shelf": 3 }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.expect("Failed to parse response");
    let book = &body["book"];
    assert_eq!(book["shelf"], 3);
    assert_eq!(book["cabinet"], 2);
    assert_eq!(book["row"], 2);
    assert_eq!(book["room"], "Кабинет");
    assert_eq!(book["genre"], "Роман");

    assert_eq!(delete_book(&client, id).await, StatusCode::OK);
}

#[tokio::test]
#[ignore]
async fn test_filter_by_author() {
    let client = Client::new();
    let tolstoy = create_book(
        &client,
        json!({ "title": "Воскресение", "author": "Лев Толстой" }),
    )
    .await;
    let chekhov = create_book(
        &client,
        json!({ "title": "Чайка", "author": "Антон Чехов" }),
    )
    .await;

    let body: Value = client
        .get(format!("{}/books", BASE_URL))
        .query(&[("author", "толстой")])
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");

    let books = body.as_array().expect("filtered list is an array");
    assert!(books.iter().any(|b| b["id"].as_i64() == Some(tolstoy)));
    assert!(books.iter().all(|b| b["author"]
        .as_str()
        .is_some_and(|a| a.to_lowercase().contains("толстой"))));

    delete_book(&client, tolstoy).await;
    delete_book(&client, chekhov).await;
}

#[tokio::test]
#[ignore]
async fn test_delete_is_permanent() {
    let client = Client::new();
    let id = create_book(&client, json!({ "title": "Нос", "author": "Николай Гоголь" })).await;

    assert_eq!(delete_book(&client, id).await, StatusCode::OK);
    assert_eq!(delete_book(&client, id).await, StatusCode::NOT_FOUND);

    let response = client
        .get(format!("{}/books/{}", BASE_URL, id))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore]
async fn test_create_invalid_book() {
    let client = Client::new();

    let response = client
        .post(format!("{}/books", BASE_URL))
        .json(&json!({ "title": "", "author": "Лев Толстой" }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
