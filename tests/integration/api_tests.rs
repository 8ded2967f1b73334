//! API integration tests
//!
//! These run against a live server with a fresh database:
//! `cargo test --test api_tests -- --ignored`

use chrono::Utc;
use reqwest::{multipart::Form, Client, StatusCode};
use serde_json::{json, Value};
use uuid::Uuid;

const BASE_URL: &str = "http://localhost:8080/api";
const HEALTH_URL: &str = "http://localhost:8080/health";
const ADMIN_USERNAME: &str = "administrator";
const ADMIN_PASSWORD: &str = "password";

/// Short unique suffix for values that must not collide between runs
fn unique() -> String {
    Uuid::new_v4().simple().to_string()[..10].to_string()
}

fn today() -> String {
    Utc::now().date_naive().to_string()
}

/// Helper to log in and return the access token
async fn login(client: &Client, username: &str, password: &str) -> String {
    let response = client
        .post(format!("{}/account/login", BASE_URL))
        .json(&json!({ "username": username, "password": password }))
        .send()
        .await
        .expect("Failed to send login request");
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.expect("Failed to parse login response");
    body["data"]["access_token"]
        .as_str()
        .expect("No token in response")
        .to_string()
}

async fn admin_token(client: &Client) -> String {
    login(client, ADMIN_USERNAME, ADMIN_PASSWORD).await
}

async fn create_author(client: &Client, token: &str, name: &str) -> String {
    let response = client
        .post(format!("{}/authors", BASE_URL))
        .bearer_auth(token)
        .json(&json!({ "name": name }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::CREATED);

    let body: Value = response.json().await.expect("Failed to parse response");
    body["data"]["id"].as_str().expect("author id").to_string()
}

async fn create_book(client: &Client, token: &str, title: &str, quantity: i32) -> String {
    let author_id = create_author(client, token, &format!("Author {}", unique())).await;
    let form = Form::new()
        .text("title", title.to_string())
        .text("category", "Fiction")
        .text("publisher", "Integration Press")
        .text("quantity", quantity.to_string())
        .text("author_ids", author_id);

    let response = client
        .post(format!("{}/books", BASE_URL))
        .bearer_auth(token)
        .multipart(form)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::CREATED);

    let body: Value = response.json().await.expect("Failed to parse response");
    body["data"]["id"].as_str().expect("book id").to_string()
}

fn member_form(member_number: &str, phones: &[&str]) -> Form {
    let mut form = Form::new()
        .text("member_number", member_number.to_string())
        .text("name", "Test Member")
        .text("address", "12 Library St.")
        .text("email", "member@example.com");
    for phone in phones {
        form = form.text("phones", phone.to_string());
    }
    form
}

async fn create_member(client: &Client, token: &str, member_number: &str, phones: &[&str]) -> String {
    let response = client
        .post(format!("{}/members", BASE_URL))
        .bearer_auth(token)
        .multipart(member_form(member_number, phones))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::CREATED);

    let body: Value = response.json().await.expect("Failed to parse response");
    body["data"]["id"].as_str().expect("member id").to_string()
}

async fn book_quantity(client: &Client, token: &str, book_id: &str) -> i64 {
    let body: Value = client
        .get(format!("{}/books/{}", BASE_URL, book_id))
        .bearer_auth(token)
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    body["data"]["quantity"].as_i64().expect("quantity")
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_health_check() {
    let client = Client::new();

    let response = client.get(HEALTH_URL).send().await.expect("Failed to send request");
    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
#[ignore]
async fn test_login_token_carries_username_and_role() {
    let client = Client::new();
    let token = admin_token(&client).await;

    let mut validation = jsonwebtoken::Validation::default();
    validation.insecure_disable_signature_validation();
    validation.validate_aud = false;
    let data = jsonwebtoken::decode::<Value>(
        &token,
        &jsonwebtoken::DecodingKey::from_secret(&[]),
        &validation,
    )
    .expect("Token should decode");

    assert_eq!(data.claims["sub"], ADMIN_USERNAME);
    assert_eq!(data.claims["role"], "Administrator");
    assert!(data.claims["jti"].is_string());
}

#[tokio::test]
#[ignore]
async fn test_login_with_wrong_password_is_a_validation_error() {
    let client = Client::new();

    let response = client
        .post(format!("{}/account/login", BASE_URL))
        .json(&json!({ "username": ADMIN_USERNAME, "password": "not-the-password" }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["errors"]["username"][0], "Invalid login attempt.");
}

#[tokio::test]
#[ignore]
async fn test_requests_without_token_are_rejected() {
    let client = Client::new();

    let response = client
        .get(format!("{}/books", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore]
async fn test_get_current_account() {
    let client = Client::new();
    let token = admin_token(&client).await;

    let response = client
        .get(format!("{}/account/current", BASE_URL))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["data"]["username"], ADMIN_USERNAME);
    assert!(body["data"].get("password").is_none());
}

fn staff_form(username: &str, staff_number: &str) -> Form {
    Form::new()
        .text("username", username.to_string())
        .text("password", "password123")
        .text("password_confirmation", "password123")
        .text("name", "Desk Staff")
        .text("staff_number", staff_number.to_string())
        .text("access_level", "Staff")
}

async fn create_staff(client: &Client, token: &str, username: &str, staff_number: &str) -> String {
    let response = client
        .post(format!("{}/staffs", BASE_URL))
        .bearer_auth(token)
        .multipart(staff_form(username, staff_number))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::CREATED);
    assert!(response.headers().get("location").is_some());

    let body: Value = response.json().await.expect("Failed to parse response");
    body["data"]["id"].as_str().expect("staff id").to_string()
}

#[tokio::test]
#[ignore]
async fn test_staff_uniqueness_ignores_own_record() {
    let client = Client::new();
    let token = admin_token(&client).await;

    let first_suffix = unique();
    let first_username = format!("staff{}", first_suffix);
    let first_number = format!("S{}", &first_suffix[..8]);
    let first_id = create_staff(&client, &token, &first_username, &first_number).await;

    let second_suffix = unique();
    let second_id = create_staff(
        &client,
        &token,
        &format!("staff{}", second_suffix),
        &format!("S{}", &second_suffix[..8]),
    )
    .await;

    // Keeping its own username and staff number is fine
    let response = client
        .put(format!("{}/staffs/{}", BASE_URL, first_id))
        .bearer_auth(&token)
        .multipart(staff_form(&first_username, &first_number))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::OK);

    // Taking another staff's values is not
    let response = client
        .put(format!("{}/staffs/{}", BASE_URL, second_id))
        .bearer_auth(&token)
        .multipart(staff_form(&first_username, &first_number))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["errors"]["username"].is_array());
    assert!(body["errors"]["staff_number"].is_array());
}

#[tokio::test]
#[ignore]
async fn test_deleting_member_gives_back_outstanding_copies() {
    let client = Client::new();
    let token = admin_token(&client).await;

    let book_id = create_book(&client, &token, &format!("Member Loan {}", unique()), 3).await;
    let member_id = create_member(&client, &token, &format!("M{}", unique()), &["081234567890"]).await;

    let response = client
        .post(format!("{}/loans", BASE_URL))
        .bearer_auth(&token)
        .json(&json!({ "loan_date": today(), "book_id": book_id, "member_id": member_id }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(book_quantity(&client, &token, &book_id).await, 2);

    let response = client
        .delete(format!("{}/members/{}", BASE_URL, member_id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    assert_eq!(book_quantity(&client, &token, &book_id).await, 3);
}

#[tokio::test]
#[ignore]
async fn test_huge_page_number_is_not_found() {
    let client = Client::new();
    let token = admin_token(&client).await;

    let response = client
        .get(format!("{}/books", BASE_URL))
        .bearer_auth(&token)
        .query(&[("page", i64::MAX.to_string()), ("size", "100".to_string())])
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore]
async fn test_staff_role_cannot_manage_staffs() {
    let client = Client::new();
    let token = admin_token(&client).await;
    let suffix = unique();
    let username = format!("staff{}", suffix);

    create_staff(&client, &token, &username, &format!("S{}", &suffix[..8])).await;

    let staff_token = login(&client, &username, "password123").await;
    let response = client
        .delete(format!("{}/staffs/{}", BASE_URL, Uuid::new_v4()))
        .bearer_auth(&staff_token)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Reads stay open to every staff
    let response = client
        .get(format!("{}/staffs", BASE_URL))
        .bearer_auth(&staff_token)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore]
async fn test_loan_takes_a_copy_and_return_gives_it_back() {
    let client = Client::new();
    let token = admin_token(&client).await;

    let book_id = create_book(&client, &token, &format!("Loan Book {}", unique()), 3).await;
    let member_id = create_member(&client, &token, &format!("M{}", unique()), &["081234567890"]).await;

    let response = client
        .post(format!("{}/loans", BASE_URL))
        .bearer_auth(&token)
        .json(&json!({ "loan_date": today(), "book_id": book_id, "member_id": member_id }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = response.json().await.expect("Failed to parse response");
    let loan_id = body["data"]["id"].as_str().expect("loan id").to_string();
    assert_eq!(body["data"]["is_returned"], false);

    assert_eq!(book_quantity(&client, &token, &book_id).await, 2);

    let response = client
        .put(format!("{}/loans/{}", BASE_URL, loan_id))
        .bearer_auth(&token)
        .json(&json!({ "return_date": today(), "book_id": book_id, "member_id": member_id }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["data"]["is_returned"], true);

    assert_eq!(book_quantity(&client, &token, &book_id).await, 3);

    // Updating a returned loan again does not add another copy
    let response = client
        .put(format!("{}/loans/{}", BASE_URL, loan_id))
        .bearer_auth(&token)
        .json(&json!({ "return_date": today(), "book_id": book_id, "member_id": member_id }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(book_quantity(&client, &token, &book_id).await, 3);
}

#[tokio::test]
#[ignore]
async fn test_loan_for_exhausted_book_is_rejected() {
    let client = Client::new();
    let token = admin_token(&client).await;

    let title = format!("Single Copy {}", unique());
    let book_id = create_book(&client, &token, &title, 1).await;
    let member_id = create_member(&client, &token, &format!("M{}", unique()), &["081234567890"]).await;
    let loan = json!({ "loan_date": today(), "book_id": book_id, "member_id": member_id });

    let response = client
        .post(format!("{}/loans", BASE_URL))
        .bearer_auth(&token)
        .json(&loan)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(book_quantity(&client, &token, &book_id).await, 0);

    let response = client
        .post(format!("{}/loans", BASE_URL))
        .bearer_auth(&token)
        .json(&loan)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["errors"]["book_id"].is_array());

    let body: Value = client
        .get(format!("{}/loans", BASE_URL))
        .bearer_auth(&token)
        .query(&[("book_title", title.as_str())])
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    assert_eq!(body["meta"]["total"], 1);
    assert_eq!(book_quantity(&client, &token, &book_id).await, 0);
}

#[tokio::test]
#[ignore]
async fn test_deleting_member_removes_phones() {
    let client = Client::new();
    let token = admin_token(&client).await;

    let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();
    let phone = format!("08{:010}", nanos % 10_000_000_000);
    let member_id = create_member(&client, &token, &format!("M{}", unique()), &[&phone, "+6281234567890"]).await;

    let response = client
        .delete(format!("{}/members/{}", BASE_URL, member_id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = client
        .get(format!("{}/members/{}", BASE_URL, member_id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body: Value = client
        .get(format!("{}/members", BASE_URL))
        .bearer_auth(&token)
        .query(&[("phone", phone.as_str())])
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    assert_eq!(body["meta"]["total"], 0);
}

#[tokio::test]
#[ignore]
async fn test_page_past_the_end_is_not_found() {
    let client = Client::new();
    let token = admin_token(&client).await;

    let name = format!("Paged Author {}", unique());
    create_author(&client, &token, &name).await;

    let response = client
        .get(format!("{}/authors", BASE_URL))
        .bearer_auth(&token)
        .query(&[("name", name.as_str()), ("page", "1")])
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["meta"]["total_page"], 1);
    assert_eq!(body["meta"]["has_next_page"], false);

    let response = client
        .get(format!("{}/authors", BASE_URL))
        .bearer_auth(&token)
        .query(&[("name", name.as_str()), ("page", "2")])
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore]
async fn test_member_number_uniqueness_ignores_own_record() {
    let client = Client::new();
    let token = admin_token(&client).await;

    let first_number = format!("M{}", unique());
    let first_id = create_member(&client, &token, &first_number, &["081234567890"]).await;
    let second_id = create_member(&client, &token, &format!("M{}", unique()), &["081234567890"]).await;

    // Keeping its own number is fine
    let response = client
        .put(format!("{}/members/{}", BASE_URL, first_id))
        .bearer_auth(&token)
        .multipart(member_form(&first_number, &["089876543210"]))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["data"]["phones"], json!(["089876543210"]));

    // Taking another member's number is not
    let response = client
        .put(format!("{}/members/{}", BASE_URL, second_id))
        .bearer_auth(&token)
        .multipart(member_form(&first_number, &["081234567890"]))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["errors"]["member_number"].is_array());
}
