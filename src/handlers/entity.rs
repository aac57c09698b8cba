//! Entity CRUD handlers: list, create, read, update, delete.
//!
//! Handlers are shared by every declared entity; the entity is resolved from the first
//! segment of the matched route ("/users/:id" -> "users"), so routers must not be nested
//! under a prefix.

use crate::config::{PkType, ResolvedEntity, WriteResponse};
use crate::error::AppError;
use crate::response::{message, ok};
use crate::service::{CrudService, RequestValidator};
use crate::state::AppState;
use axum::{
    extract::{MatchedPath, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;
use std::collections::HashMap;
use std::num::{IntErrorKind, ParseIntError};

/// Path id as a key value. A well-formed integer outside the i64 range cannot name a row: 404.
pub(crate) fn parse_id(id_str: &str, pk_type: PkType) -> Result<Value, AppError> {
    Ok(match pk_type {
        PkType::Int => {
            let n: i64 = id_str.parse().map_err(|e: ParseIntError| match e.kind() {
                IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => AppError::NotFound(format!("id {}", id_str)),
                _ => AppError::BadRequest("invalid id".into()),
            })?;
            Value::Number(n.into())
        }
        PkType::Text => Value::String(id_str.to_string()),
    })
}

pub(crate) fn entity_for<'a>(state: &'a AppState, path_segment: &str) -> Result<&'a ResolvedEntity, AppError> {
    state
        .model
        .entity_by_path(path_segment)
        .ok_or_else(|| AppError::NotFound(path_segment.to_string()))
}

fn matched_entity<'a>(state: &'a AppState, matched: &MatchedPath) -> Result<&'a ResolvedEntity, AppError> {
    let segment = matched
        .as_str()
        .trim_start_matches('/')
        .split('/')
        .next()
        .unwrap_or_default();
    entity_for(state, segment)
}

fn body_to_map(value: Value) -> Result<HashMap<String, Value>, AppError> {
    match value {
        Value::Object(m) => Ok(m.into_iter().collect()),
        _ => Err(AppError::BadRequest("body must be a JSON object".into())),
    }
}

fn write_response(entity: &ResolvedEntity, row: Value, action: &str) -> Response {
    match entity.write_response {
        WriteResponse::Row => Json(row).into_response(),
        WriteResponse::Message => Json(message(&entity.label, action)).into_response(),
    }
}

pub async fn list(
    State(state): State<AppState>,
    matched: MatchedPath,
) -> Result<impl IntoResponse, AppError> {
    let entity = matched_entity(&state, &matched)?;
    let rows = CrudService::list(&state.pool, entity).await?;
    Ok(ok(rows))
}

pub async fn create(
    State(state): State<AppState>,
    matched: MatchedPath,
    Json(body): Json<Value>,
) -> Result<Response, AppError> {
    let entity = matched_entity(&state, &matched)?;
    let body = body_to_map(body)?;
    RequestValidator::validate(&body, &entity.validation)?;
    let row = CrudService::create(&state.pool, entity, &body).await?;
    Ok((StatusCode::CREATED, write_response(entity, row, "created")).into_response())
}

pub async fn read(
    State(state): State<AppState>,
    matched: MatchedPath,
    Path(id_str): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let entity = matched_entity(&state, &matched)?;
    let id = parse_id(&id_str, entity.pk_type)?;
    let row = CrudService::read(&state.pool, entity, &id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("{} {}", entity.label, id_str)))?;
    Ok(ok(row))
}

pub async fn update(
    State(state): State<AppState>,
    matched: MatchedPath,
    Path(id_str): Path<String>,
    Json(body): Json<Value>,
) -> Result<Response, AppError> {
    let entity = matched_entity(&state, &matched)?;
    let id = parse_id(&id_str, entity.pk_type)?;
    let mut body = body_to_map(body)?;
    body.retain(|col, _| !entity.immutable_columns.contains(col));
    RequestValidator::validate_partial(&body, &entity.validation)?;
    let row = CrudService::update(&state.pool, entity, &id, &body)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("{} {}", entity.label, id_str)))?;
    Ok(write_response(entity, row, "updated"))
}

pub async fn delete(
    State(state): State<AppState>,
    matched: MatchedPath,
    Path(id_str): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let entity = matched_entity(&state, &matched)?;
    let id = parse_id(&id_str, entity.pk_type)?;
    CrudService::delete(&state.pool, entity, &id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("{} {}", entity.label, id_str)))?;
    Ok(ok(message(&entity.label, "deleted")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_ids_by_pk_type() {
        assert_eq!(parse_id("42", PkType::Int).unwrap(), json!(42));
        assert_eq!(parse_id("abc", PkType::Text).unwrap(), json!("abc"));
        assert!(matches!(parse_id("abc", PkType::Int), Err(AppError::BadRequest(_))));
        assert!(matches!(parse_id("", PkType::Int), Err(AppError::BadRequest(_))));
        assert!(matches!(
            parse_id("99999999999999999999", PkType::Int),
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            parse_id("-99999999999999999999", PkType::Int),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn body_must_be_an_object() {
        assert!(body_to_map(json!([1, 2])).is_err());
        assert_eq!(body_to_map(json!({"a": 1})).unwrap()["a"], json!(1));
    }
}
