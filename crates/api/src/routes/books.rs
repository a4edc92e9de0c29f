//! Catalog endpoints. Reads are public; changes need an admin caller.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use store::{Book, BookId, Money, NewBook, Store};

use crate::auth::Identity;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct BookRequest {
    pub title: String,
    pub author: String,
    pub genre: String,
    pub price_cents: i64,
    pub stock: u32,
}

impl From<BookRequest> for NewBook {
    fn from(req: BookRequest) -> Self {
        NewBook::new(
            req.title,
            req.author,
            req.genre,
            Money::from_cents(req.price_cents),
            req.stock,
        )
    }
}

#[derive(Debug, Serialize)]
pub struct BookResponse {
    pub id: BookId,
    pub title: String,
    pub author: String,
    pub genre: String,
    pub price_cents: i64,
    pub price: String,
    pub stock: u32,
}

impl From<Book> for BookResponse {
    fn from(book: Book) -> Self {
        Self {
            id: book.id,
            title: book.title,
            author: book.author,
            genre: book.genre,
            price_cents: book.price.cents(),
            price: book.price.to_string(),
            stock: book.stock,
        }
    }
}

/// GET /books
#[tracing::instrument(skip(state))]
pub async fn list<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<BookResponse>>, ApiError> {
    let books = state.catalog.list_books().await?;
    Ok(Json(books.into_iter().map(BookResponse::from).collect()))
}

/// GET /books/{id}
#[tracing::instrument(skip(state))]
pub async fn get<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<i64>,
) -> Result<Json<BookResponse>, ApiError> {
    let book = state.catalog.get_book(BookId::new(id)).await?;
    Ok(Json(book.into()))
}

/// POST /books
#[tracing::instrument(skip(state, req))]
pub async fn create<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Identity(caller): Identity,
    Json(req): Json<BookRequest>,
) -> Result<(StatusCode, Json<BookResponse>), ApiError> {
    let book = state.catalog.add_book(&caller, req.into()).await?;
    Ok((StatusCode::CREATED, Json(book.into())))
}

/// PUT /books/{id}
#[tracing::instrument(skip(state, req))]
pub async fn update<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Identity(caller): Identity,
    Path(id): Path<i64>,
    Json(req): Json<BookRequest>,
) -> Result<Json<BookResponse>, ApiError> {
    let book = state
        .catalog
        .update_book(&caller, BookId::new(id), req.into())
        .await?;
    Ok(Json(book.into()))
}

/// DELETE /books/{id}
#[tracing::instrument(skip(state))]
pub async fn delete<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Identity(caller): Identity,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.catalog.delete_book(&caller, BookId::new(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
