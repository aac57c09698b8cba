//! Library API integration tests: users, authors, books and borrows.

mod common;

use axum::{http::StatusCode, Router};
use common::{error_message, send, test_app};
use rowboat::error::CONFLICT_MESSAGE;
use rowboat::App;
use serde_json::{json, Value};

async fn seed(app: &Router) {
    send(app, "POST", "/users/", Some(json!({"name": "Ann", "email": "ann@x.io"}))).await;
    send(app, "POST", "/authors/", Some(json!({"name": "A"}))).await;
    send(app, "POST", "/books/", Some(json!({"title": "B", "author_id": 1}))).await;
}

#[tokio::test]
async fn author_and_book_round_trip() {
    let (app, _dir) = test_app(App::Library).await;

    let (status, body) = send(&app, "POST", "/authors/", Some(json!({"name": "A"}))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body, json!({"id": 1, "name": "A"}));

    let (status, body) = send(&app, "POST", "/books/", Some(json!({"title": "B", "author_id": 1}))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body, json!({"id": 1, "title": "B", "author_id": 1}));

    let (status, body) = send(&app, "GET", "/books/author/1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([{"id": 1, "title": "B"}]));

    let (status, body) = send(&app, "GET", "/authors/1/books", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([{"id": 1, "title": "B"}]));
}

#[tokio::test]
async fn books_of_unknown_author() {
    let (app, _dir) = test_app(App::Library).await;

    let (status, body) = send(&app, "GET", "/books/author/9", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));

    let (status, _) = send(&app, "GET", "/authors/9/books", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn collections_answer_with_and_without_trailing_slash() {
    let (app, _dir) = test_app(App::Library).await;

    let (status, _) = send(&app, "POST", "/users", Some(json!({"name": "Ann", "email": "ann@x.io"}))).await;
    assert_eq!(status, StatusCode::CREATED);

    for uri in ["/users", "/users/", "/authors", "/authors/", "/books/", "/borrow/"] {
        let (status, body) = send(&app, "GET", uri, None).await;
        assert_eq!(status, StatusCode::OK, "{}", uri);
        assert!(body.is_array(), "{}", uri);
    }
}

#[tokio::test]
async fn create_and_fetch_user() {
    let (app, _dir) = test_app(App::Library).await;

    let (status, body) = send(&app, "POST", "/users/", Some(json!({"name": "Ann", "email": "ann@x.io"}))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body, json!({"id": 1, "name": "Ann", "email": "ann@x.io"}));

    let (status, body) = send(&app, "GET", "/users/1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Ann");
    assert_eq!(body["email"], "ann@x.io");
}

#[tokio::test]
async fn duplicate_email_is_a_bad_request() {
    let (app, _dir) = test_app(App::Library).await;
    send(&app, "POST", "/users/", Some(json!({"name": "Ann", "email": "ann@x.io"}))).await;

    let (status, body) = send(&app, "POST", "/users/", Some(json!({"name": "Bob", "email": "ann@x.io"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_message(&body), "Email already exists");
}

#[tokio::test]
async fn email_taken_on_update_hits_the_unique_index() {
    let (app, _dir) = test_app(App::Library).await;
    send(&app, "POST", "/users/", Some(json!({"name": "Ann", "email": "ann@x.io"}))).await;
    send(&app, "POST", "/users/", Some(json!({"name": "Bob", "email": "bob@x.io"}))).await;

    let (status, body) = send(&app, "PUT", "/users/2", Some(json!({"email": "ann@x.io"}))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "conflict");
    assert_eq!(error_message(&body), CONFLICT_MESSAGE);

    let (_, body) = send(&app, "GET", "/users/2", None).await;
    assert_eq!(body["email"], "bob@x.io");
}

#[tokio::test]
async fn missing_fields_are_rejected() {
    let (app, _dir) = test_app(App::Library).await;

    let (status, body) = send(&app, "POST", "/users/", Some(json!({"name": "Ann"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_message(&body), "Missing required fields");

    let (status, _) = send(&app, "POST", "/books/", Some(json!({"title": "B"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, "POST", "/borrow/", Some(json!({"user_id": 1}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn partial_update_returns_the_row() {
    let (app, _dir) = test_app(App::Library).await;
    seed(&app).await;

    let (status, body) = send(&app, "PUT", "/users/1", Some(json!({"name": "Annie"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"id": 1, "name": "Annie", "email": "ann@x.io"}));

    let (status, body) = send(&app, "PUT", "/books/1", Some(json!({"title": "B2"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"id": 1, "title": "B2", "author_id": 1}));
}

#[tokio::test]
async fn borrow_flow() {
    let (app, _dir) = test_app(App::Library).await;
    seed(&app).await;

    let (status, borrow) = send(&app, "POST", "/borrow/", Some(json!({"user_id": 1, "book_id": 1}))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(borrow["id"], 1);
    assert_eq!(borrow["user_id"], 1);
    assert_eq!(borrow["book_id"], 1);
    let borrow_date = borrow["borrow_date"].as_str().unwrap().to_string();
    assert!(chrono::DateTime::parse_from_rfc3339(&borrow_date).is_ok(), "{}", borrow_date);

    let (status, body) = send(&app, "GET", "/users/1/borrowed_books", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([{"id": 1, "title": "B", "borrow_date": borrow_date}]));

    let (status, body) = send(&app, "GET", "/books/1/borrowers", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([{"id": 1, "name": "Ann", "borrow_date": borrow_date}]));

    let (status, body) = send(&app, "GET", "/borrow/1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, borrow);
}

#[tokio::test]
async fn borrow_date_is_assigned_by_the_server() {
    let (app, _dir) = test_app(App::Library).await;
    seed(&app).await;

    for supplied in [Value::Null, json!("not a date")] {
        let body = json!({"user_id": 1, "book_id": 1, "borrow_date": supplied.clone()});
        let (status, borrow) = send(&app, "POST", "/borrow/", Some(body)).await;
        assert_eq!(status, StatusCode::CREATED, "{}", supplied);
        let borrow_date = borrow["borrow_date"].as_str().unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(borrow_date).is_ok(), "{}", borrow_date);
    }

    let (_, body) = send(&app, "GET", "/users/1/borrowed_books", None).await;
    let rows = body.as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|r| r["borrow_date"] != "not a date"));
}

#[tokio::test]
async fn borrows_are_read_only() {
    let (app, _dir) = test_app(App::Library).await;
    seed(&app).await;
    send(&app, "POST", "/borrow/", Some(json!({"user_id": 1, "book_id": 1}))).await;

    let (status, _) = send(&app, "PUT", "/borrow/1", Some(json!({"book_id": 1}))).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    let (status, _) = send(&app, "DELETE", "/borrow/1", None).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn borrow_of_unknown_book_is_rejected() {
    let (app, _dir) = test_app(App::Library).await;
    seed(&app).await;

    let (status, _) = send(&app, "POST", "/borrow/", Some(json!({"user_id": 1, "book_id": 7}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = send(&app, "GET", "/borrow/", None).await;
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn referenced_rows_cannot_be_deleted() {
    let (app, _dir) = test_app(App::Library).await;
    seed(&app).await;
    send(&app, "POST", "/borrow/", Some(json!({"user_id": 1, "book_id": 1}))).await;

    for uri in ["/users/1", "/books/1", "/authors/1"] {
        let (status, body) = send(&app, "DELETE", uri, None).await;
        assert_eq!(status, StatusCode::CONFLICT, "{}", uri);
        assert_eq!(body["error"]["code"], "conflict");
        let (status, _) = send(&app, "GET", uri, None).await;
        assert_eq!(status, StatusCode::OK, "{}", uri);
    }
}

#[tokio::test]
async fn delete_then_not_found() {
    let (app, _dir) = test_app(App::Library).await;
    seed(&app).await;

    let (status, body) = send(&app, "DELETE", "/books/1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"message": "Book deleted successfully"}));
    let (status, _) = send(&app, "GET", "/books/1", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&app, "DELETE", "/authors/1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"message": "Author deleted successfully"}));

    let (status, body) = send(&app, "DELETE", "/users/1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"message": "User deleted successfully"}));
    let (status, _) = send(&app, "GET", "/users/1", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unknown_ids_answer_not_found() {
    let (app, _dir) = test_app(App::Library).await;

    for uri in ["/users/5", "/authors/5", "/books/5", "/borrow/5"] {
        let (status, body): (StatusCode, Value) = send(&app, "GET", uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{}", uri);
        assert_eq!(body["error"]["code"], "not_found");
    }
    let (status, body) = send(&app, "GET", "/books/author/99999999999999999999", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));

    for uri in ["/users/5/borrowed_books", "/books/5/borrowers", "/authors/99999999999999999999/books"] {
        let (status, _) = send(&app, "GET", uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{}", uri);
    }
}
