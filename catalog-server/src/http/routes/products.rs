//! Product endpoints

use std::sync::Arc;

use axum::extract::State;
use axum::{http::StatusCode, routing::get, Json, Router};
use serde::Deserialize;

use crate::db::SessionProvider;
use crate::http::error::ApiError;
use crate::http::extractors::{ValidJson, ValidProductId};
use crate::http::server::AppState;
use crate::models::{NewProduct, Product, ProductPatch, ValidationError};

/// Create product request; every field is required
#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    pub name: String,
    pub description: String,
    pub price: i32,
}

impl TryFrom<CreateProductRequest> for NewProduct {
    type Error = ValidationError;

    fn try_from(req: CreateProductRequest) -> Result<Self, Self::Error> {
        NewProduct::new(req.name, req.description, req.price)
    }
}

/// Update product request; omitted (or null) fields stay unchanged
#[derive(Debug, Default, Deserialize)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<i32>,
}

impl TryFrom<UpdateProductRequest> for ProductPatch {
    type Error = ValidationError;

    fn try_from(req: UpdateProductRequest) -> Result<Self, Self::Error> {
        ProductPatch::new(req.name, req.description, req.price)
    }
}

/// GET /products - list all products
async fn list_products<P: SessionProvider>(
    State(state): State<Arc<AppState<P>>>,
) -> Result<Json<Vec<Product>>, ApiError> {
    let products = state.product_use_cases().await?;
    Ok(Json(products.list_products().await?))
}

/// GET /products/{id} - get a single product
async fn get_product<P: SessionProvider>(
    State(state): State<Arc<AppState<P>>>,
    ValidProductId(id): ValidProductId,
) -> Result<Json<Product>, ApiError> {
    let products = state.product_use_cases().await?;

    products
        .get_product(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("product", id))
}

/// POST /products - create a product
async fn create_product<P: SessionProvider>(
    State(state): State<Arc<AppState<P>>>,
    ValidJson(req): ValidJson<CreateProductRequest>,
) -> Result<(StatusCode, Json<Product>), ApiError> {
    let product = NewProduct::try_from(req)?;

    let products = state.product_use_cases().await?;
    let created = products.create_product(product).await?;

    Ok((StatusCode::CREATED, Json(created)))
}

/// PUT /products/{id} - partially update a product
async fn update_product<P: SessionProvider>(
    State(state): State<Arc<AppState<P>>>,
    ValidProductId(id): ValidProductId,
    ValidJson(req): ValidJson<UpdateProductRequest>,
) -> Result<Json<Product>, ApiError> {
    let patch = ProductPatch::try_from(req)?;

    let products = state.product_use_cases().await?;
    products
        .update_product(id, patch)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("product", id))
}

/// DELETE /products/{id} - remove a product
async fn delete_product<P: SessionProvider>(
    State(state): State<Arc<AppState<P>>>,
    ValidProductId(id): ValidProductId,
) -> Result<StatusCode, ApiError> {
    let products = state.product_use_cases().await?;

    if products.delete_product(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found("product", id))
    }
}

/// Product routes. The collection answers with and without a trailing slash.
pub fn router<P: SessionProvider>() -> Router<Arc<AppState<P>>> {
    Router::new()
        .route(
            "/products",
            get(list_products::<P>).post(create_product::<P>),
        )
        .route(
            "/products/",
            get(list_products::<P>).post(create_product::<P>),
        )
        .route(
            "/products/{id}",
            get(get_product::<P>)
                .put(update_product::<P>)
                .delete(delete_product::<P>),
        )
}
