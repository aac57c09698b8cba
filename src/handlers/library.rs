//! Library relation handlers: books by author, borrowed books, borrowers.
//!
//! Relations are walked through the declared navigations (`authors.books`, `users.borrows`,
//! `borrow.book`, ...) with batch lookups (`fetch_where_column_in`) joined in memory, one
//! query per side.

use crate::config::{IncludeSpec, ResolvedEntity};
use crate::error::{AppError, ConfigError};
use crate::handlers::entity::{entity_for, parse_id};
use crate::service::CrudService;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    Json,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Deserialize)]
struct UserRow {
    id: i64,
    name: String,
}

#[derive(Debug, Deserialize)]
struct BookRow {
    id: i64,
    title: String,
}

#[derive(Debug, Deserialize)]
struct BorrowRow {
    borrow_date: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct BookSummary {
    pub id: i64,
    pub title: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct BorrowedBook {
    pub id: i64,
    pub title: String,
    pub borrow_date: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct Borrower {
    pub id: i64,
    pub name: String,
    pub borrow_date: String,
}

fn from_row<T: DeserializeOwned>(row: &Value) -> Result<T, AppError> {
    T::deserialize(row).map_err(AppError::from)
}

fn navigation<'a>(entity: &'a ResolvedEntity, name: &str) -> Result<&'a IncludeSpec, AppError> {
    entity.include(name).ok_or_else(|| {
        AppError::Config(ConfigError::MissingReference {
            kind: "navigation",
            id: format!("{}.{}", entity.path_segment, name),
        })
    })
}

/// Rows of the navigation's related entity whose join column matches one of `keys`.
async fn follow(state: &AppState, nav: &IncludeSpec, keys: &[Value]) -> Result<Vec<Value>, AppError> {
    let related = entity_for(state, &nav.related_path_segment)?;
    CrudService::fetch_where_column_in(&state.pool, related, &nav.their_key_column, keys).await
}

/// Walk a to-many navigation from `owner_id`, then a to-one navigation from each link row.
/// Returns (link, target) pairs in link order; one pair per link row.
async fn through(
    state: &AppState,
    owner: &ResolvedEntity,
    owner_id: &Value,
    to_links: &str,
    to_target: &str,
) -> Result<Vec<(Value, Value)>, AppError> {
    let links_nav = navigation(owner, to_links)?;
    let links = follow(state, links_nav, std::slice::from_ref(owner_id)).await?;
    let link_entity = entity_for(state, &links_nav.related_path_segment)?;
    let target_nav = navigation(link_entity, to_target)?;

    let mut keys: Vec<Value> = links
        .iter()
        .filter_map(|l| l.get(&target_nav.our_key_column))
        .filter(|v| !v.is_null())
        .cloned()
        .collect();
    keys.sort_by_key(|v| v.to_string());
    keys.dedup();
    let targets: HashMap<String, Value> = follow(state, target_nav, &keys)
        .await?
        .into_iter()
        .filter_map(|t| Some((t.get(&target_nav.their_key_column)?.to_string(), t)))
        .collect();

    Ok(links
        .into_iter()
        .filter_map(|l| {
            let target = targets.get(&l.get(&target_nav.our_key_column)?.to_string())?.clone();
            Some((l, target))
        })
        .collect())
}

async fn books_of_author(state: &AppState, author_id: &Value) -> Result<Vec<BookSummary>, AppError> {
    let authors = entity_for(state, "authors")?;
    let rows = follow(state, navigation(authors, "books")?, std::slice::from_ref(author_id)).await?;
    rows.iter().map(from_row).collect()
}

/// Ensure the owner row exists so unknown ids answer 404 rather than an empty list.
async fn require<'a>(
    state: &'a AppState,
    path_segment: &str,
    id_str: &str,
) -> Result<(&'a ResolvedEntity, Value), AppError> {
    let entity = entity_for(state, path_segment)?;
    let id = parse_id(id_str, entity.pk_type)?;
    CrudService::read(&state.pool, entity, &id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("{} {}", entity.label, id_str)))?;
    Ok((entity, id))
}

/// GET /books/author/:id. An unknown author yields an empty list.
pub async fn books_by_author(
    State(state): State<AppState>,
    Path(id_str): Path<String>,
) -> Result<Json<Vec<BookSummary>>, AppError> {
    let authors = entity_for(&state, "authors")?;
    let author_id = match parse_id(&id_str, authors.pk_type) {
        Ok(id) => id,
        Err(AppError::NotFound(_)) => return Ok(Json(Vec::new())),
        Err(e) => return Err(e),
    };
    Ok(Json(books_of_author(&state, &author_id).await?))
}

/// GET /authors/:id/books.
pub async fn author_books(
    State(state): State<AppState>,
    Path(id_str): Path<String>,
) -> Result<Json<Vec<BookSummary>>, AppError> {
    let (_, author_id) = require(&state, "authors", &id_str).await?;
    Ok(Json(books_of_author(&state, &author_id).await?))
}

/// GET /users/:id/borrowed_books: one entry per borrow record, oldest first.
pub async fn user_borrowed_books(
    State(state): State<AppState>,
    Path(id_str): Path<String>,
) -> Result<Json<Vec<BorrowedBook>>, AppError> {
    let (users, user_id) = require(&state, "users", &id_str).await?;
    let pairs = through(&state, users, &user_id, "borrows", "book").await?;
    let out = pairs
        .iter()
        .map(|(borrow, book)| {
            let borrow: BorrowRow = from_row(borrow)?;
            let book: BookRow = from_row(book)?;
            Ok(BorrowedBook {
                id: book.id,
                title: book.title,
                borrow_date: borrow.borrow_date,
            })
        })
        .collect::<Result<Vec<_>, AppError>>()?;
    Ok(Json(out))
}

/// GET /books/:id/borrowers: one entry per borrow record, oldest first.
pub async fn book_borrowers(
    State(state): State<AppState>,
    Path(id_str): Path<String>,
) -> Result<Json<Vec<Borrower>>, AppError> {
    let (books, book_id) = require(&state, "books", &id_str).await?;
    let pairs = through(&state, books, &book_id, "borrows", "user").await?;
    let out = pairs
        .iter()
        .map(|(borrow, user)| {
            let borrow: BorrowRow = from_row(borrow)?;
            let user: UserRow = from_row(user)?;
            Ok(Borrower {
                id: user.id,
                name: user.name,
                borrow_date: borrow.borrow_date,
            })
        })
        .collect::<Result<Vec<_>, AppError>>()?;
    Ok(Json(out))
}
