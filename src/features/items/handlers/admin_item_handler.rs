use std::sync::Arc;

use axum::{
    extract::{multipart::Field, Multipart, Path, State},
    http::StatusCode,
    Json,
};
use tokio::io::AsyncWriteExt;
use tracing::debug;
use uuid::Uuid;
use validator::Validate;

use crate::core::error::{AppError, Result};
use crate::core::extractor::AppJson;
use crate::features::auth::guards::RequireAdmin;
use crate::features::items::dtos::{
    AdminItemResponseDto, CreateItemDto, UpsertItemFormDto, UpsertItemResponseDto,
};
use crate::features::items::services::ItemService;
use crate::modules::storage::{AssetKind, StagedUpload, UploadManifest};
use crate::shared::constants::{FIELD_NEW_IMAGES, FIELD_PRODUCT_FILE, MAX_NEW_IMAGES};
use crate::shared::form::FormValues;
use crate::shared::types::ApiResponse;

/// Multipart field of the screenshot upload
pub const FIELD_IMAGE: &str = "image";

/// State for admin item handlers
#[derive(Clone)]
pub struct AdminItemsState {
    pub items: Arc<ItemService>,
    /// Per-file upload ceiling in bytes
    pub max_upload_size: usize,
}

/// List all items (admin)
#[utoipa::path(
    get,
    path = "/api/admin/items",
    responses(
        (status = 200, description = "All items, newest first", body = ApiResponse<Vec<AdminItemResponseDto>>),
        (status = 401, description = "Admin credentials required")
    ),
    security(("basic_auth" = [])),
    tag = "admin"
)]
pub async fn admin_list_items(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AdminItemsState>,
) -> Result<Json<ApiResponse<Vec<AdminItemResponseDto>>>> {
    let items = state.items.list_all().await?;
    let items = items.into_iter().map(AdminItemResponseDto::from).collect();
    Ok(Json(ApiResponse::success(Some(items), None, None)))
}

/// Create an item skeleton
///
/// Only the name is needed; everything else is filled in through the upsert
/// endpoint.
#[utoipa::path(
    post,
    path = "/api/admin/items",
    request_body = CreateItemDto,
    responses(
        (status = 201, description = "Item created", body = ApiResponse<AdminItemResponseDto>),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Admin credentials required")
    ),
    security(("basic_auth" = [])),
    tag = "admin"
)]
pub async fn create_item(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AdminItemsState>,
    AppJson(dto): AppJson<CreateItemDto>,
) -> Result<(StatusCode, Json<ApiResponse<AdminItemResponseDto>>)> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let item = state.items.create_item(&dto.name).await?;
    debug!("Item {} created by {}", item.id, admin.username);

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(
            Some(item.into()),
            Some("Item created".to_string()),
            None,
        )),
    ))
}

/// Get item by id (admin)
#[utoipa::path(
    get,
    path = "/api/admin/items/{id}",
    params(
        ("id" = Uuid, Path, description = "Item id")
    ),
    responses(
        (status = 200, description = "Item found", body = ApiResponse<AdminItemResponseDto>),
        (status = 401, description = "Admin credentials required"),
        (status = 404, description = "Item not found")
    ),
    security(("basic_auth" = [])),
    tag = "admin"
)]
pub async fn admin_get_item(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AdminItemsState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<AdminItemResponseDto>>> {
    let item = state.items.get_item(id).await?;
    Ok(Json(ApiResponse::success(Some(item.into()), None, None)))
}

/// Delete an item and every file it owns
///
/// Deleting an item that does not exist succeeds.
#[utoipa::path(
    delete,
    path = "/api/admin/items/{id}",
    params(
        ("id" = Uuid, Path, description = "Item id")
    ),
    responses(
        (status = 200, description = "Item deleted"),
        (status = 401, description = "Admin credentials required")
    ),
    security(("basic_auth" = [])),
    tag = "admin"
)]
pub async fn delete_item(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AdminItemsState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>> {
    let message = if state.items.delete_item(id).await? {
        "Item deleted"
    } else {
        "Item already deleted"
    };
    Ok(Json(ApiResponse::success(None, Some(message.to_string()), None)))
}

/// Save an editor submission
///
/// Accepts multipart/form-data with the text fields of the item, the
/// `existingImages` to keep and up to 10 `newImages` plus one `productFile`.
/// Dropped images and a replaced product file are deleted once the record is
/// saved.
#[utoipa::path(
    post,
    path = "/api/admin/items/{id}/upsert",
    params(
        ("id" = Uuid, Path, description = "Item id")
    ),
    request_body(
        content = UpsertItemFormDto,
        content_type = "multipart/form-data",
        description = "Item fields and uploads",
    ),
    responses(
        (status = 200, description = "Item saved", body = ApiResponse<UpsertItemResponseDto>),
        (status = 400, description = "Invalid form or unexpected file field"),
        (status = 401, description = "Admin credentials required"),
        (status = 404, description = "Item not found"),
        (status = 413, description = "File too large")
    ),
    security(("basic_auth" = [])),
    tag = "admin"
)]
pub async fn upsert_item(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AdminItemsState>,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<UpsertItemResponseDto>>> {
    let mut form = FormValues::new();
    let mut manifest = UploadManifest::default();

    if let Err(e) = read_submission(&state, &mut multipart, &mut form, &mut manifest).await {
        state.items.discard_uploads(&manifest).await;
        return Err(e);
    }

    let outcome = state.items.upsert_item(id, &form, manifest).await?;
    Ok(Json(ApiResponse::success(
        Some(outcome.into()),
        Some("Item saved".to_string()),
        None,
    )))
}

/// Attach a generated screenshot
///
/// Accepts multipart/form-data with a single `image` file that is appended
/// to the item's images.
#[utoipa::path(
    post,
    path = "/api/admin/items/{id}/images",
    params(
        ("id" = Uuid, Path, description = "Item id")
    ),
    request_body(
        content = String,
        content_type = "multipart/form-data",
        description = "`image` file field",
    ),
    responses(
        (status = 200, description = "Image attached", body = ApiResponse<UpsertItemResponseDto>),
        (status = 400, description = "Missing image"),
        (status = 401, description = "Admin credentials required"),
        (status = 404, description = "Item not found"),
        (status = 413, description = "File too large")
    ),
    security(("basic_auth" = [])),
    tag = "admin"
)]
pub async fn attach_image(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AdminItemsState>,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<UpsertItemResponseDto>>> {
    let mut staged: Option<StagedUpload> = None;

    let read: Result<()> = async {
        while let Some(field) = next_field(&mut multipart).await? {
            let name = field.name().unwrap_or("").to_string();
            let file_name = field.file_name().map(str::to_string);

            match file_name {
                Some(file_name) if name == FIELD_IMAGE && staged.is_none() => {
                    let (upload, file) = state.items.open_upload(AssetKind::Image, &file_name).await?;
                    staged = Some(upload);
                    stream_to_file(field, file, state.max_upload_size).await?;
                }
                Some(_) => {
                    return Err(AppError::BadRequest(format!(
                        "Unexpected file field '{}'",
                        name
                    )))
                }
                None => debug!("Ignoring text field: {}", name),
            }
        }
        Ok(())
    }
    .await;

    if let Err(e) = read {
        if let Some(upload) = staged {
            let mut manifest = UploadManifest::default();
            manifest.push(upload);
            state.items.discard_uploads(&manifest).await;
        }
        return Err(e);
    }

    let staged = staged
        .ok_or_else(|| AppError::BadRequest(format!("File field '{}' is required", FIELD_IMAGE)))?;
    let outcome = state.items.attach_generated_image(id, staged).await?;

    Ok(Json(ApiResponse::success(
        Some(outcome.into()),
        Some("Image attached".to_string()),
        None,
    )))
}

async fn next_field<'a>(multipart: &'a mut Multipart) -> Result<Option<Field<'a>>> {
    multipart.next_field().await.map_err(|e| {
        debug!("Failed to read multipart field: {}", e);
        AppError::BadRequest(format!("Failed to read multipart data: {}", e))
    })
}

/// Split a multipart submission into text fields and staged uploads.
///
/// Each staged file is recorded in the manifest before it is written, so the
/// caller can roll back everything on error.
async fn read_submission(
    state: &AdminItemsState,
    multipart: &mut Multipart,
    form: &mut FormValues,
    manifest: &mut UploadManifest,
) -> Result<()> {
    while let Some(field) = next_field(multipart).await? {
        let name = field.name().unwrap_or("").to_string();
        let name = name.strip_suffix("[]").unwrap_or(&name).to_string();

        let Some(file_name) = field.file_name().map(str::to_string) else {
            let value = field.text().await.map_err(|e| {
                AppError::BadRequest(format!("Failed to read field '{}': {}", name, e))
            })?;
            form.push(name, value);
            continue;
        };

        let kind = match name.as_str() {
            FIELD_NEW_IMAGES => AssetKind::Image,
            FIELD_PRODUCT_FILE => AssetKind::ProductFile,
            other => {
                return Err(AppError::BadRequest(format!(
                    "Unexpected file field '{}'",
                    other
                )))
            }
        };

        // An untouched file input arrives as an empty part without a name
        if file_name.is_empty() {
            continue;
        }

        match kind {
            AssetKind::Image if manifest.new_images.len() >= MAX_NEW_IMAGES => {
                return Err(AppError::BadRequest(format!(
                    "At most {} new images per submission",
                    MAX_NEW_IMAGES
                )));
            }
            AssetKind::ProductFile if manifest.product_file.is_some() => {
                return Err(AppError::BadRequest(
                    "Only one product file per submission".to_string(),
                ));
            }
            _ => {}
        }

        let (staged, file) = state.items.open_upload(kind, &file_name).await?;
        manifest.push(staged);
        stream_to_file(field, file, state.max_upload_size).await?;
    }

    Ok(())
}

/// Copy a multipart file field to disk chunk by chunk, enforcing the size ceiling
async fn stream_to_file(
    mut field: Field<'_>,
    mut file: tokio::fs::File,
    max_size: usize,
) -> Result<()> {
    let mut written = 0usize;

    while let Some(chunk) = field.chunk().await.map_err(|e| {
        debug!("Failed to read file chunk: {}", e);
        AppError::BadRequest(format!("Failed to read file data: {}", e))
    })? {
        written += chunk.len();
        if written > max_size {
            return Err(AppError::PayloadTooLarge(format!(
                "File too large. Maximum size is {} bytes ({} MB)",
                max_size,
                max_size / 1024 / 1024
            )));
        }
        file.write_all(&chunk).await?;
    }

    file.flush().await?;
    Ok(())
}
