//! Library relation routes. Merged next to the entity routes; static segments
//! ("/books/author/:id") take priority over "/books/:id".

use crate::handlers::library::{author_books, book_borrowers, books_by_author, user_borrowed_books};
use crate::state::AppState;
use axum::{routing::get, Router};

pub fn library_routes(state: AppState) -> Router {
    Router::new()
        .route("/books/author/:id", get(books_by_author))
        .route("/books/:id/borrowers", get(book_borrowers))
        .route("/authors/:id/books", get(author_books))
        .route("/users/:id/borrowed_books", get(user_borrowed_books))
        .with_state(state)
}
