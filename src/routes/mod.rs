use axum::extract::{FromRequest, FromRequestParts};

use crate::error::AppError;

pub mod api;
pub mod arena;

/// `Json` whose rejections surface as [`AppError`] bodies.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct JsonBody<T>(pub T);

/// `Query` whose rejections surface as [`AppError`] bodies.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct QueryParams<T>(pub T);
