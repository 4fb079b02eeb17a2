// HTTP handlers for the product catalog

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    response::Json,
};
use validator::Validate;

use crate::{
    auth::AuthenticatedUser,
    db,
    error::ApiError,
    products::models::{CreateProduct, Product, UpdateProduct},
    AppState,
};

const PRODUCT_COLUMNS: &str = "id, name, description, price, stock, created_at, updated_at";

fn not_found(id: i64) -> ApiError {
    ApiError::NotFound {
        resource: "Product".to_string(),
        id: id.to_string(),
    }
}

/// Handler for GET /api/products
#[utoipa::path(
    get,
    path = "/api/products",
    responses(
        (status = 200, description = "List of all products", body = Vec<Product>),
        (status = 500, description = "Internal server error")
    ),
    tag = "products"
)]
pub async fn list_products(State(state): State<AppState>) -> Result<Json<Vec<Product>>, ApiError> {
    let products = sqlx::query_as::<_, Product>(&format!(
        "SELECT {} FROM products ORDER BY id",
        PRODUCT_COLUMNS
    ))
    .fetch_all(&state.db)
    .await?;

    tracing::debug!("Retrieved {} products", products.len());
    Ok(Json(products))
}

/// Handler for GET /api/products/:id
#[utoipa::path(
    get,
    path = "/api/products/{id}",
    params(
        ("id" = i64, Path, description = "Product ID")
    ),
    responses(
        (status = 200, description = "Product found", body = Product),
        (status = 400, description = "Malformed product id"),
        (status = 404, description = "Product not found")
    ),
    tag = "products"
)]
pub async fn get_product(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Product>, ApiError> {
    let Path(id) = id?;
    let product = sqlx::query_as::<_, Product>(&format!(
        "SELECT {} FROM products WHERE id = $1",
        PRODUCT_COLUMNS
    ))
    .bind(id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| not_found(id))?;

    Ok(Json(product))
}

/// Handler for POST /api/products (admin only)
#[utoipa::path(
    post,
    path = "/api/products",
    request_body = CreateProduct,
    responses(
        (status = 201, description = "Product created", body = Product),
        (status = 400, description = "Invalid input data"),
        (status = 401, description = "Missing, expired or invalid token"),
        (status = 403, description = "Account deactivated or not an administrator"),
        (status = 409, description = "Product name already in use")
    ),
    security(("bearer" = [])),
    tag = "products"
)]
pub async fn create_product(
    State(state): State<AppState>,
    AuthenticatedUser(admin): AuthenticatedUser,
    payload: Result<Json<CreateProduct>, JsonRejection>,
) -> Result<(StatusCode, Json<Product>), ApiError> {
    let Json(payload) = payload?;
    let payload = payload.normalized();
    payload.validate()?;

    if db::check_duplicate_product(&state.db, &payload.name).await? {
        return Err(ApiError::Conflict {
            message: format!("product '{}' already exists", payload.name),
        });
    }

    let product = sqlx::query_as::<_, Product>(&format!(
        r#"
        INSERT INTO products (name, description, price, stock)
        VALUES ($1, $2, $3, $4)
        RETURNING {}
        "#,
        PRODUCT_COLUMNS
    ))
    .bind(&payload.name)
    .bind(&payload.description)
    .bind(payload.price)
    .bind(payload.stock)
    .fetch_one(&state.db)
    .await?;

    tracing::info!(product_id = product.id, admin_id = admin.id, "Product created");
    Ok((StatusCode::CREATED, Json(product)))
}

/// Handler for PUT /api/products/:id (admin only)
#[utoipa::path(
    put,
    path = "/api/products/{id}",
    params(
        ("id" = i64, Path, description = "Product ID")
    ),
    request_body = UpdateProduct,
    responses(
        (status = 200, description = "Product updated", body = Product),
        (status = 400, description = "Invalid input data"),
        (status = 404, description = "Product not found"),
        (status = 409, description = "Product name already in use")
    ),
    security(("bearer" = [])),
    tag = "products"
)]
pub async fn update_product(
    State(state): State<AppState>,
    AuthenticatedUser(admin): AuthenticatedUser,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<UpdateProduct>, JsonRejection>,
) -> Result<Json<Product>, ApiError> {
    let Path(id) = id?;
    let Json(payload) = payload?;
    let payload = payload.normalized();
    payload.validate()?;

    let mut tx = state.db.begin().await?;

    let existing = sqlx::query_as::<_, Product>(&format!(
        "SELECT {} FROM products WHERE id = $1 FOR UPDATE",
        PRODUCT_COLUMNS
    ))
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| not_found(id))?;

    if let Some(ref new_name) = payload.name {
        if !new_name.eq_ignore_ascii_case(&existing.name)
            && db::check_duplicate_product_excluding_id(&mut *tx, new_name, id).await?
        {
            return Err(ApiError::Conflict {
                message: format!("product '{}' already exists", new_name),
            });
        }
    }

    let updated = sqlx::query_as::<_, Product>(&format!(
        r#"
        UPDATE products
        SET name = $1,
            description = $2,
            price = $3,
            stock = $4,
            updated_at = NOW()
        WHERE id = $5
        RETURNING {}
        "#,
        PRODUCT_COLUMNS
    ))
    .bind(payload.name.unwrap_or(existing.name))
    .bind(payload.description.unwrap_or(existing.description))
    .bind(payload.price.unwrap_or(existing.price))
    .bind(payload.stock.unwrap_or(existing.stock))
    .bind(id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!(product_id = id, admin_id = admin.id, "Product updated");
    Ok(Json(updated))
}

/// Handler for DELETE /api/products/:id (admin only)
#[utoipa::path(
    delete,
    path = "/api/products/{id}",
    params(
        ("id" = i64, Path, description = "Product ID")
    ),
    responses(
        (status = 204, description = "Product deleted"),
        (status = 404, description = "Product not found")
    ),
    security(("bearer" = [])),
    tag = "products"
)]
pub async fn delete_product(
    State(state): State<AppState>,
    AuthenticatedUser(admin): AuthenticatedUser,
    id: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = id?;
    let result = sqlx::query("DELETE FROM products WHERE id = $1")
        .bind(id)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(not_found(id));
    }

    tracing::info!(product_id = id, admin_id = admin.id, "Product deleted");
    Ok(StatusCode::NO_CONTENT)
}
