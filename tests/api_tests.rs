//! API integration tests
//!
//! These tests run against a live server on a migrated database. The
//! migrations seed the bootstrap staff account (librarian/librarian);
//! reader accounts are self-registered on first use.

use reqwest::Client;
use serde_json::{json, Value};

const BASE_URL: &str = "http://localhost:8080/api/v1";

/// Helper to authenticate and get a JWT token
async fn get_auth_token(client: &Client, username: &str, password: &str) -> String {
    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({
            "username": username,
            "password": password
        }))
        .send()
        .await
        .expect("Failed to send login request");

    let body: Value = response.json().await.expect("Failed to parse login response");
    body["token"].as_str().expect("No token in response").to_string()
}

async fn staff_token(client: &Client) -> String {
    get_auth_token(client, "librarian", "librarian").await
}

/// Log in as a reader, registering the account first if it does not exist yet
async fn reader_token(client: &Client, username: &str) -> String {
    let response = client
        .post(format!("{}/users", BASE_URL))
        .json(&json!({
            "username": username,
            "password": "password123",
            "email": format!("{}@example.com", username)
        }))
        .send()
        .await
        .expect("Failed to register reader");
    assert!(
        response.status() == 201 || response.status() == 409,
        "unexpected registration status {}",
        response.status()
    );

    get_auth_token(client, username, "password123").await
}

/// Helper to create a book with the given number of copies, returning its ID
async fn create_book(client: &Client, token: &str, title: &str, isbn: &str, copies: i32) -> i64 {
    let response = client
        .post(format!("{}/books", BASE_URL))
        .bearer_auth(token)
        .json(&json!({
            "title": title,
            "author_id": 1,
            "isbn": isbn,
            "publication_year": 2020,
            "total_copies": copies
        }))
        .send()
        .await
        .expect("Failed to create book");

    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.expect("Failed to parse book response");
    body["id"].as_i64().expect("No id in book response")
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
async fn test_login_invalid_credentials() {
    let client = Client::new();

    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({
            "username": "alice",
            "password": "wrong"
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 401);
}

#[tokio::test]
#[ignore]
async fn test_me_requires_token() {
    let client = Client::new();

    let response = client
        .get(format!("{}/auth/me", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 401);
}

#[tokio::test]
#[ignore]
async fn test_list_books_paginated() {
    let client = Client::new();
    let token = reader_token(&client, "alice").await;

    let response = client
        .get(format!("{}/books?page=1&per_page=5", BASE_URL))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["items"].is_array());
    assert!(body["total"].is_number());
    assert_eq!(body["per_page"], 5);
}

#[tokio::test]
#[ignore]
async fn test_reader_cannot_create_book() {
    let client = Client::new();
    let token = reader_token(&client, "alice").await;

    let response = client
        .post(format!("{}/books", BASE_URL))
        .bearer_auth(&token)
        .json(&json!({
            "title": "Forbidden",
            "author_id": 1,
            "isbn": "9780000000010",
            "publication_year": 2020,
            "total_copies": 1
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 403);
}

#[tokio::test]
#[ignore]
async fn test_borrow_and_return() {
    let client = Client::new();
    let staff = staff_token(&client).await;
    let reader = reader_token(&client, "alice").await;

    let book_id = create_book(&client, &staff, "Borrow and Return", "9780000000101", 2).await;

    // Borrow
    let response = client
        .post(format!("{}/books/{}/borrow", BASE_URL, book_id))
        .bearer_auth(&reader)
        .send()
        .await
        .expect("Failed to borrow");
    assert_eq!(response.status(), 201);

    let body: Value = response.json().await.expect("Failed to parse loan");
    let loan_id = body["id"].as_i64().expect("No loan id");
    assert!(body["due_date"].is_string());
    assert_eq!(body["renewals"], 0);

    // Availability decremented
    let book: Value = client
        .get(format!("{}/books/{}", BASE_URL, book_id))
        .bearer_auth(&reader)
        .send()
        .await
        .expect("Failed to fetch book")
        .json()
        .await
        .expect("Failed to parse book");
    assert_eq!(book["available_copies"], 1);
    assert_eq!(book["user_has_loan"], true);

    // Borrowing the same book again is rejected
    let response = client
        .post(format!("{}/books/{}/borrow", BASE_URL, book_id))
        .bearer_auth(&reader)
        .send()
        .await
        .expect("Failed to send second borrow");
    assert_eq!(response.status(), 409);

    // Return
    let response = client
        .post(format!("{}/loans/{}/return", BASE_URL, loan_id))
        .bearer_auth(&reader)
        .send()
        .await
        .expect("Failed to return");
    assert!(response.status().is_success());

    // Availability restored
    let book: Value = client
        .get(format!("{}/books/{}", BASE_URL, book_id))
        .bearer_auth(&reader)
        .send()
        .await
        .expect("Failed to fetch book")
        .json()
        .await
        .expect("Failed to parse book");
    assert_eq!(book["available_copies"], 2);
}

#[tokio::test]
#[ignore]
async fn test_renew_extends_due_date() {
    let client = Client::new();
    let staff = staff_token(&client).await;
    let reader = reader_token(&client, "alice").await;

    let book_id = create_book(&client, &staff, "Renewable", "9780000000102", 1).await;

    let loan: Value = client
        .post(format!("{}/books/{}/borrow", BASE_URL, book_id))
        .bearer_auth(&reader)
        .send()
        .await
        .expect("Failed to borrow")
        .json()
        .await
        .expect("Failed to parse loan");
    let loan_id = loan["id"].as_i64().expect("No loan id");

    // First and second renewal succeed
    for expected in 1..=2 {
        let response = client
            .post(format!("{}/loans/{}/renew", BASE_URL, loan_id))
            .bearer_auth(&reader)
            .send()
            .await
            .expect("Failed to renew");
        assert!(response.status().is_success());
        let body: Value = response.json().await.expect("Failed to parse renewal");
        assert_eq!(body["renewals"], expected);
    }

    // Third renewal hits the limit
    let response = client
        .post(format!("{}/loans/{}/renew", BASE_URL, loan_id))
        .bearer_auth(&reader)
        .send()
        .await
        .expect("Failed to send third renew");
    assert_eq!(response.status(), 422);

    // Cleanup
    client
        .post(format!("{}/loans/{}/return", BASE_URL, loan_id))
        .bearer_auth(&reader)
        .send()
        .await
        .expect("Failed to return");
}

#[tokio::test]
#[ignore]
async fn test_renew_is_borrower_only() {
    let client = Client::new();
    let staff = staff_token(&client).await;
    let alice = reader_token(&client, "alice").await;
    let bob = reader_token(&client, "bob").await;

    let book_id = create_book(&client, &staff, "Private Renewal", "9780000000103", 1).await;

    let loan: Value = client
        .post(format!("{}/books/{}/borrow", BASE_URL, book_id))
        .bearer_auth(&alice)
        .send()
        .await
        .expect("Failed to borrow")
        .json()
        .await
        .expect("Failed to parse loan");
    let loan_id = loan["id"].as_i64().expect("No loan id");

    let response = client
        .post(format!("{}/loans/{}/renew", BASE_URL, loan_id))
        .bearer_auth(&bob)
        .send()
        .await
        .expect("Failed to send renew");
    assert_eq!(response.status(), 404);

    client
        .post(format!("{}/loans/{}/return", BASE_URL, loan_id))
        .bearer_auth(&alice)
        .send()
        .await
        .expect("Failed to return");
}

#[tokio::test]
#[ignore]
async fn test_reserve_available_book_rejected() {
    let client = Client::new();
    let staff = staff_token(&client).await;
    let reader = reader_token(&client, "alice").await;

    let book_id = create_book(&client, &staff, "On The Shelf", "9780000000104", 3).await;

    let response = client
        .post(format!("{}/books/{}/reserve", BASE_URL, book_id))
        .bearer_auth(&reader)
        .send()
        .await
        .expect("Failed to send reserve");
    assert_eq!(response.status(), 409);
}

/// Full lifecycle: the last copy is borrowed, a second reader queues up,
/// the return promotes the reservation, staff fulfills it into a loan.
#[tokio::test]
#[ignore]
async fn test_reservation_lifecycle() {
    let client = Client::new();
    let staff = staff_token(&client).await;
    let alice = reader_token(&client, "alice").await;
    let bob = reader_token(&client, "bob").await;

    let book_id = create_book(&client, &staff, "Last Copy", "9780000000105", 1).await;

    // Alice takes the last copy
    let loan: Value = client
        .post(format!("{}/books/{}/borrow", BASE_URL, book_id))
        .bearer_auth(&alice)
        .send()
        .await
        .expect("Failed to borrow")
        .json()
        .await
        .expect("Failed to parse loan");
    let loan_id = loan["id"].as_i64().expect("No loan id");

    // Bob cannot borrow
    let response = client
        .post(format!("{}/books/{}/borrow", BASE_URL, book_id))
        .bearer_auth(&bob)
        .send()
        .await
        .expect("Failed to send borrow");
    assert_eq!(response.status(), 409);

    // Bob reserves and is first in the queue
    let response = client
        .post(format!("{}/books/{}/reserve", BASE_URL, book_id))
        .bearer_auth(&bob)
        .send()
        .await
        .expect("Failed to reserve");
    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.expect("Failed to parse reservation");
    let reservation_id = body["reservation"]["id"].as_i64().expect("No reservation id");
    assert_eq!(body["reservation"]["priority"], 1);
    assert_eq!(body["reservation"]["status"], "pending");

    // A duplicate reservation is rejected
    let response = client
        .post(format!("{}/books/{}/reserve", BASE_URL, book_id))
        .bearer_auth(&bob)
        .send()
        .await
        .expect("Failed to send duplicate reserve");
    assert_eq!(response.status(), 409);

    // Alice returns; Bob's reservation is promoted
    let response = client
        .post(format!("{}/loans/{}/return", BASE_URL, loan_id))
        .bearer_auth(&alice)
        .send()
        .await
        .expect("Failed to return");
    assert!(response.status().is_success());

    let reservations: Value = client
        .get(format!("{}/reservations/mine", BASE_URL))
        .bearer_auth(&bob)
        .send()
        .await
        .expect("Failed to list reservations")
        .json()
        .await
        .expect("Failed to parse reservations");
    let promoted = reservations
        .as_array()
        .expect("Expected array")
        .iter()
        .find(|r| r["id"].as_i64() == Some(reservation_id))
        .expect("Reservation missing");
    assert_eq!(promoted["status"], "available");

    // Staff fulfills it into a loan for Bob
    let response = client
        .post(format!("{}/reservations/{}/manage", BASE_URL, reservation_id))
        .bearer_auth(&staff)
        .json(&json!({ "action": "fulfill" }))
        .send()
        .await
        .expect("Failed to fulfill");
    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse fulfillment");
    assert_eq!(body["reservation"]["status"], "fulfilled");
    let bob_loan_id = body["loan"]["id"].as_i64().expect("No loan created");

    // The copy is out again
    let book: Value = client
        .get(format!("{}/books/{}", BASE_URL, book_id))
        .bearer_auth(&bob)
        .send()
        .await
        .expect("Failed to fetch book")
        .json()
        .await
        .expect("Failed to parse book");
    assert_eq!(book["available_copies"], 0);

    // Cleanup
    client
        .post(format!("{}/loans/{}/return", BASE_URL, bob_loan_id))
        .bearer_auth(&bob)
        .send()
        .await
        .expect("Failed to return");
}

#[tokio::test]
#[ignore]
async fn test_cancel_reservation_requires_owner_or_staff() {
    let client = Client::new();
    let staff = staff_token(&client).await;
    let alice = reader_token(&client, "alice").await;
    let bob = reader_token(&client, "bob").await;

    let book_id = create_book(&client, &staff, "Contested Hold", "9780000000106", 1).await;

    // Empty the shelf so the book can be reserved
    let loan: Value = client
        .post(format!("{}/books/{}/borrow", BASE_URL, book_id))
        .bearer_auth(&alice)
        .send()
        .await
        .expect("Failed to borrow")
        .json()
        .await
        .expect("Failed to parse loan");
    let loan_id = loan["id"].as_i64().expect("No loan id");

    let reservation: Value = client
        .post(format!("{}/books/{}/reserve", BASE_URL, book_id))
        .bearer_auth(&bob)
        .send()
        .await
        .expect("Failed to reserve")
        .json()
        .await
        .expect("Failed to parse reservation");
    let reservation_id = reservation["reservation"]["id"].as_i64().expect("No id");

    // Alice is neither holder nor staff
    let response = client
        .post(format!("{}/reservations/{}/cancel", BASE_URL, reservation_id))
        .bearer_auth(&alice)
        .send()
        .await
        .expect("Failed to send cancel");
    assert_eq!(response.status(), 403);

    // Bob cancels his own reservation
    let response = client
        .post(format!("{}/reservations/{}/cancel", BASE_URL, reservation_id))
        .bearer_auth(&bob)
        .send()
        .await
        .expect("Failed to cancel");
    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse cancellation");
    assert_eq!(body["reservation"]["status"], "cancelled");

    client
        .post(format!("{}/loans/{}/return", BASE_URL, loan_id))
        .bearer_auth(&alice)
        .send()
        .await
        .expect("Failed to return");
}

#[tokio::test]
#[ignore]
async fn test_stats_dashboard_staff_only() {
    let client = Client::new();
    let reader = reader_token(&client, "alice").await;

    let response = client
        .get(format!("{}/stats/dashboard", BASE_URL))
        .bearer_auth(&reader)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 403);

    let staff = staff_token(&client).await;
    let response = client
        .get(format!("{}/stats/dashboard", BASE_URL))
        .bearer_auth(&staff)
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse stats");
    assert!(body["total_books"].is_number());
    assert!(body["utilization_rate"].is_number());
}

#[tokio::test]
#[ignore]
async fn test_notification_preferences_roundtrip() {
    let client = Client::new();
    let reader = reader_token(&client, "alice").await;

    let response = client
        .put(format!("{}/notifications/preferences", BASE_URL))
        .bearer_auth(&reader)
        .json(&json!({ "email_due_reminders": false }))
        .send()
        .await
        .expect("Failed to update preferences");
    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse preferences");
    assert_eq!(body["email_due_reminders"], false);

    let body: Value = client
        .get(format!("{}/notifications/preferences", BASE_URL))
        .bearer_auth(&reader)
        .send()
        .await
        .expect("Failed to fetch preferences")
        .json()
        .await
        .expect("Failed to parse preferences");
    assert_eq!(body["email_due_reminders"], false);
}

#[tokio::test]
#[ignore]
async fn test_seeded_librarian_is_staff() {
    let client = Client::new();
    let staff = staff_token(&client).await;

    let body: Value = client
        .get(format!("{}/auth/me", BASE_URL))
        .bearer_auth(&staff)
        .send()
        .await
        .expect("Failed to fetch profile")
        .json()
        .await
        .expect("Failed to parse profile");
    assert_eq!(body["role"], "librarian");
}

#[tokio::test]
#[ignore]
async fn test_loan_listing_tolerates_out_of_range_pagination() {
    let client = Client::new();
    let staff = staff_token(&client).await;

    for query in ["page=0", "page=0&per_page=0", "per_page=10000"] {
        let response = client
            .get(format!("{}/loans?{}", BASE_URL, query))
            .bearer_auth(&staff)
            .send()
            .await
            .expect("Failed to list loans");
        assert!(
            response.status().is_success(),
            "listing with {} returned {}",
            query,
            response.status()
        );
    }
}
