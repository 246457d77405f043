//! Extractors whose rejections use the service error format

use axum::extract::{FromRequest, FromRequestParts};

use crate::utils::errors::FixedAssetError;

/// JSON request body
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(FixedAssetError))]
pub struct JsonBody<T>(pub T);

/// Query string parameters
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(FixedAssetError))]
pub struct QueryParams<T>(pub T);
