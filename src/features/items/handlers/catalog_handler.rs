use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Path, Query, Request, State},
    http::{header, HeaderValue},
    response::Response,
    Json,
};
use tower::ServiceExt;
use tower_http::services::ServeFile;

use crate::core::error::{AppError, Result};
use crate::features::items::dtos::{
    CategoryArchiveDto, ItemResponseDto, PublicItemsQuery, TagArchiveDto,
};
use crate::features::items::services::{CatalogPage, CatalogQueryService, ItemService};
use crate::shared::types::{ApiResponse, Meta, PaginationQuery};

/// State for public catalog handlers
#[derive(Clone)]
pub struct CatalogState {
    pub catalog: Arc<CatalogQueryService>,
    pub items: Arc<ItemService>,
    /// Page size when the request does not ask for one
    pub items_per_page: i64,
}

fn into_dtos(page: CatalogPage) -> (Vec<ItemResponseDto>, Meta) {
    (
        page.entries.into_iter().map(ItemResponseDto::from).collect(),
        page.meta,
    )
}

/// List catalog items
///
/// Newest first. Filters are combined: `search` matches the name or any tag
/// (case-insensitive), `categoryId` matches exactly and `tag` is normalized
/// before it is matched.
#[utoipa::path(
    get,
    path = "/api/items",
    params(PublicItemsQuery),
    responses(
        (status = 200, description = "Page of items", body = ApiResponse<Vec<ItemResponseDto>>),
    ),
    tag = "items"
)]
pub async fn list_items(
    State(state): State<CatalogState>,
    Query(query): Query<PublicItemsQuery>,
) -> Result<Json<ApiResponse<Vec<ItemResponseDto>>>> {
    let page = query.pagination().resolve(state.items_per_page);
    let listing = state.catalog.list_items(&query.filter(), page).await?;

    let (items, meta) = into_dtos(listing);
    Ok(Json(ApiResponse::success(Some(items), None, Some(meta))))
}

/// Get item by slug
#[utoipa::path(
    get,
    path = "/api/items/{slug}",
    params(
        ("slug" = String, Path, description = "Item slug")
    ),
    responses(
        (status = 200, description = "Item found", body = ApiResponse<ItemResponseDto>),
        (status = 404, description = "Item not found")
    ),
    tag = "items"
)]
pub async fn get_item(
    State(state): State<CatalogState>,
    Path(slug): Path<String>,
) -> Result<Json<ApiResponse<ItemResponseDto>>> {
    let entry = state.catalog.get_item(&slug).await?;
    Ok(Json(ApiResponse::success(Some(entry.into()), None, None)))
}

/// Download the product file of an item
///
/// Served as an attachment named after the item slug.
#[utoipa::path(
    get,
    path = "/api/items/{slug}/download",
    params(
        ("slug" = String, Path, description = "Item slug")
    ),
    responses(
        (status = 200, description = "Product file", content_type = "application/octet-stream"),
        (status = 404, description = "Item or file not found")
    ),
    tag = "items"
)]
pub async fn download_item(
    State(state): State<CatalogState>,
    Path(slug): Path<String>,
    request: Request,
) -> Result<Response> {
    let target = state.items.resolve_download(&slug).await?;

    let disposition = HeaderValue::from_str(&format!(
        "attachment; filename=\"{}\"",
        target.filename
    ))
    .map_err(|e| AppError::Internal(format!("Invalid download filename: {}", e)))?;

    let response = ServeFile::new(&target.path)
        .oneshot(request)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to serve download: {}", e)))?;

    let mut response = response.map(Body::new);
    if response.status().is_success() {
        response
            .headers_mut()
            .insert(header::CONTENT_DISPOSITION, disposition);
        tracing::info!("Serving download {} for item '{}'", target.filename, slug);
    }

    Ok(response)
}

/// List items of a category
#[utoipa::path(
    get,
    path = "/api/categories/{slug}/items",
    params(
        ("slug" = String, Path, description = "Category slug"),
        PaginationQuery
    ),
    responses(
        (status = 200, description = "Category with a page of its items", body = ApiResponse<CategoryArchiveDto>),
        (status = 404, description = "Category not found")
    ),
    tag = "items"
)]
pub async fn category_items(
    State(state): State<CatalogState>,
    Path(slug): Path<String>,
    Query(pagination): Query<PaginationQuery>,
) -> Result<Json<ApiResponse<CategoryArchiveDto>>> {
    let page = pagination.resolve(state.items_per_page);
    let (category, listing) = state.catalog.category_archive(&slug, page).await?;

    let (items, meta) = into_dtos(listing);
    Ok(Json(ApiResponse::success(
        Some(CategoryArchiveDto {
            category: category.into(),
            items,
        }),
        None,
        Some(meta),
    )))
}

/// List items carrying a tag
#[utoipa::path(
    get,
    path = "/api/tags/{tag}/items",
    params(
        ("tag" = String, Path, description = "Tag, normalized before matching"),
        PaginationQuery
    ),
    responses(
        (status = 200, description = "A page of tagged items", body = ApiResponse<TagArchiveDto>),
    ),
    tag = "items"
)]
pub async fn tag_items(
    State(state): State<CatalogState>,
    Path(tag): Path<String>,
    Query(pagination): Query<PaginationQuery>,
) -> Result<Json<ApiResponse<TagArchiveDto>>> {
    let page = pagination.resolve(state.items_per_page);
    let (tag, listing) = state.catalog.tag_archive(&tag, page).await?;

    let (items, meta) = into_dtos(listing);
    Ok(Json(ApiResponse::success(
        Some(TagArchiveDto { tag, items }),
        None,
        Some(meta),
    )))
}
