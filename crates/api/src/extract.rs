//! Request body extraction.

use axum::extract::FromRequest;

use crate::error::AppError;

/// `axum::Json` whose rejections (malformed JSON, wrong field types, a
/// missing `Content-Type`, an oversized body) use the `{error, code}`
/// envelope.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct JsonBody<T>(pub T);
