use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::features::items::handlers::{self, AdminItemsState, CatalogState};
use crate::features::items::services::{CatalogQueryService, ItemService};
use crate::shared::constants::MAX_NEW_IMAGES;

/// Headroom for multipart boundaries and text fields
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

/// Create public catalog routes
///
/// Note: This feature is public (no authentication required)
pub fn routes(
    catalog: Arc<CatalogQueryService>,
    items: Arc<ItemService>,
    items_per_page: i64,
) -> Router {
    let state = CatalogState {
        catalog,
        items,
        items_per_page,
    };

    Router::new()
        .route("/api/items", get(handlers::list_items))
        .route("/api/items/{slug}", get(handlers::get_item))
        .route("/api/items/{slug}/download", get(handlers::download_item))
        .route("/api/categories/{slug}/items", get(handlers::category_items))
        .route("/api/tags/{tag}/items", get(handlers::tag_items))
        .with_state(state)
}

/// Create admin routes for item management
///
/// Must be mounted behind the admin gate. Upload bodies may carry every
/// allowed file at the configured per-file ceiling.
pub fn admin_routes(items: Arc<ItemService>, max_upload_size: usize) -> Router {
    let state = AdminItemsState {
        items,
        max_upload_size,
    };
    let upsert_limit = max_upload_size
        .saturating_mul(MAX_NEW_IMAGES + 1)
        .saturating_add(MULTIPART_OVERHEAD);
    let image_limit = max_upload_size.saturating_add(MULTIPART_OVERHEAD);

    Router::new()
        .route(
            "/api/admin/items",
            get(handlers::admin_list_items).post(handlers::create_item),
        )
        .route(
            "/api/admin/items/{id}",
            get(handlers::admin_get_item).delete(handlers::delete_item),
        )
        .route(
            "/api/admin/items/{id}/upsert",
            post(handlers::upsert_item).layer(DefaultBodyLimit::max(upsert_limit)),
        )
        .route(
            "/api/admin/items/{id}/images",
            post(handlers::attach_image).layer(DefaultBodyLimit::max(image_limit)),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::middleware::admin_auth_middleware;
    use crate::features::items::dtos::{AdminItemResponseDto, ItemResponseDto, UpsertItemResponseDto};
    use crate::shared::test_helpers::{admin_basic_auth, admin_credentials, test_stores, TestStores};
    use crate::shared::types::ApiResponse;
    use axum::http::{header, HeaderValue, StatusCode};
    use axum_test::multipart::{MultipartForm, Part};
    use axum_test::TestServer;
    use serde_json::json;

    const MAX_UPLOAD: usize = 1024;

    fn server(stores: &TestStores) -> TestServer {
        let items = Arc::new(ItemService::new(stores.record_store(), stores.assets.clone()));
        let catalog = Arc::new(CatalogQueryService::new(stores.record_store()));

        let admin = admin_routes(Arc::clone(&items), MAX_UPLOAD).layer(
            axum::middleware::from_fn_with_state(admin_credentials(), admin_auth_middleware),
        );
        let app = Router::new().merge(routes(catalog, items, 9)).merge(admin);
        TestServer::new(app).unwrap()
    }

    fn auth() -> HeaderValue {
        HeaderValue::from_str(&admin_basic_auth()).unwrap()
    }

    async fn create(server: &TestServer, name: &str) -> AdminItemResponseDto {
        let response = server
            .post("/api/admin/items")
            .add_header(header::AUTHORIZATION, auth())
            .json(&json!({ "name": name }))
            .await;
        response.assert_status(StatusCode::CREATED);
        let body: ApiResponse<AdminItemResponseDto> = response.json();
        body.data.unwrap()
    }

    fn image(bytes: &'static [u8], name: &str) -> Part {
        Part::bytes(bytes).file_name(name).mime_type("image/png")
    }

    #[tokio::test]
    async fn test_admin_requires_credentials() {
        let stores = test_stores().await;
        let server = server(&stores);

        server
            .get("/api/admin/items")
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_upsert_then_public_views() {
        let stores = test_stores().await;
        let server = server(&stores);
        let created = create(&server, "Hero Kit").await;

        let form = MultipartForm::new()
            .add_text("name", "Hero Kit")
            .add_text("tags", "Landing, Dark Mode")
            .add_text("content", "Hello")
            .add_part("newImages", image(b"one", "one.png"))
            .add_part("newImages[]", image(b"two", "two.png"))
            .add_part(
                "productFile",
                Part::bytes(&b"zip"[..]).file_name("kit.zip").mime_type("application/zip"),
            );
        let response = server
            .post(&format!("/api/admin/items/{}/upsert", created.id))
            .add_header(header::AUTHORIZATION, auth())
            .multipart(form)
            .await;
        response.assert_status_ok();
        let saved: ApiResponse<UpsertItemResponseDto> = response.json();
        let saved = saved.data.unwrap().item;
        assert_eq!(saved.images.len(), 2);
        assert_eq!(saved.tags, vec!["landing".to_string(), "dark-mode".to_string()]);

        let response = server.get("/api/items/hero-kit").await;
        response.assert_status_ok();
        let public: ApiResponse<ItemResponseDto> = response.json();
        let public = public.data.unwrap();
        assert_eq!(public.thumbnail.as_deref(), Some(saved.images[0].as_str()));
        assert_eq!(public.download_url.as_deref(), Some("/api/items/hero-kit/download"));

        let response = server.get("/api/items/hero-kit/download").await;
        response.assert_status_ok();
        assert_eq!(
            response.header(header::CONTENT_DISPOSITION),
            "attachment; filename=\"hero-kit.zip\""
        );
        assert_eq!(response.as_bytes().as_ref(), b"zip");

        let response = server.get("/api/tags/Dark%20Mode/items").await;
        response.assert_status_ok();
        let listing: ApiResponse<serde_json::Value> = response.json();
        assert_eq!(listing.meta.unwrap().total_items, 1);
    }

    #[tokio::test]
    async fn test_upsert_rejects_unknown_file_field_and_cleans_up() {
        let stores = test_stores().await;
        let server = server(&stores);
        let created = create(&server, "Kit").await;

        let form = MultipartForm::new()
            .add_text("name", "Kit")
            .add_part("newImages", image(b"one", "one.png"))
            .add_part("avatar", image(b"x", "x.png"));
        let response = server
            .post(&format!("/api/admin/items/{}/upsert", created.id))
            .add_header(header::AUTHORIZATION, auth())
            .multipart(form)
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let leftovers = std::fs::read_dir(stores.dir.path().join("uploads/images"))
            .unwrap()
            .count();
        assert_eq!(leftovers, 0);
    }

    #[tokio::test]
    async fn test_upsert_rejects_oversized_file() {
        let stores = test_stores().await;
        let server = server(&stores);
        let created = create(&server, "Big").await;

        let form = MultipartForm::new()
            .add_text("name", "Big")
            .add_part(
                "productFile",
                Part::bytes(vec![0u8; MAX_UPLOAD + 1]).file_name("big.bin"),
            );
        let response = server
            .post(&format!("/api/admin/items/{}/upsert", created.id))
            .add_header(header::AUTHORIZATION, auth())
            .multipart(form)
            .await;

        response.assert_status(StatusCode::PAYLOAD_TOO_LARGE);
        let leftovers = std::fs::read_dir(stores.dir.path().join("uploads/files"))
            .unwrap()
            .count();
        assert_eq!(leftovers, 0);
    }

    #[tokio::test]
    async fn test_public_listing_paginates() {
        let stores = test_stores().await;
        let server = server(&stores);
        for i in 0..23 {
            create(&server, &format!("Item {}", i)).await;
        }

        let response = server
            .get("/api/items")
            .add_query_param("page", "3")
            .await;
        response.assert_status_ok();
        let body: ApiResponse<Vec<ItemResponseDto>> = response.json();
        assert_eq!(body.data.unwrap().len(), 5);
        let meta = body.meta.unwrap();
        assert_eq!(meta.total_pages, 3);
        assert!(!meta.has_next);

        // Garbage pagination falls back to the defaults
        let response = server
            .get("/api/items")
            .add_query_param("page", "abc")
            .add_query_param("limit", "-1")
            .await;
        let body: ApiResponse<Vec<ItemResponseDto>> = response.json();
        assert_eq!(body.data.unwrap().len(), 9);
        assert_eq!(body.meta.unwrap().current_page, 1);
    }

    #[tokio::test]
    async fn test_delete_item_twice() {
        let stores = test_stores().await;
        let server = server(&stores);
        let created = create(&server, "Temp").await;

        for _ in 0..2 {
            server
                .delete(&format!("/api/admin/items/{}", created.id))
                .add_header(header::AUTHORIZATION, auth())
                .await
                .assert_status_ok();
        }

        server
            .get("/api/items/temp")
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_attach_image_appends() {
        let stores = test_stores().await;
        let server = server(&stores);
        let created = create(&server, "Shots").await;

        let response = server
            .post(&format!("/api/admin/items/{}/images", created.id))
            .add_header(header::AUTHORIZATION, auth())
            .multipart(MultipartForm::new().add_part("image", image(b"shot", "shot.png")))
            .await;

        response.assert_status_ok();
        let body: ApiResponse<UpsertItemResponseDto> = response.json();
        assert_eq!(body.data.unwrap().item.images.len(), 1);
    }
}
