use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::features::categories::{dtos as categories_dtos, handlers as categories_handlers};
use crate::features::items::{dtos as items_dtos, handlers as items_handlers};
use crate::shared::types::{ApiResponse, Meta};

#[derive(OpenApi)]
#[openapi(
    paths(
        // Catalog (public)
        items_handlers::list_items,
        items_handlers::get_item,
        items_handlers::download_item,
        items_handlers::category_items,
        items_handlers::tag_items,
        // Categories (public)
        categories_handlers::list_categories,
        categories_handlers::get_category,
        // Admin - Items
        items_handlers::admin_list_items,
        items_handlers::create_item,
        items_handlers::admin_get_item,
        items_handlers::delete_item,
        items_handlers::upsert_item,
        items_handlers::attach_image,
        // Admin - Categories
        categories_handlers::admin_list_categories,
        categories_handlers::admin_get_category,
        categories_handlers::create_category,
        categories_handlers::update_category,
        categories_handlers::delete_category,
    ),
    components(
        schemas(
            Meta,
            // Categories
            categories_dtos::CreateCategoryDto,
            categories_dtos::UpdateCategoryDto,
            categories_dtos::CategoryResponseDto,
            categories_dtos::CategorySummaryDto,
            ApiResponse<categories_dtos::CategoryResponseDto>,
            ApiResponse<Vec<categories_dtos::CategoryResponseDto>>,
            // Items
            items_dtos::CreateItemDto,
            items_dtos::UpsertItemFormDto,
            items_dtos::ItemResponseDto,
            items_dtos::AdminItemResponseDto,
            items_dtos::UpsertItemResponseDto,
            items_dtos::CategoryArchiveDto,
            items_dtos::TagArchiveDto,
            ApiResponse<items_dtos::ItemResponseDto>,
            ApiResponse<Vec<items_dtos::ItemResponseDto>>,
            ApiResponse<items_dtos::AdminItemResponseDto>,
            ApiResponse<Vec<items_dtos::AdminItemResponseDto>>,
            ApiResponse<items_dtos::UpsertItemResponseDto>,
            ApiResponse<items_dtos::CategoryArchiveDto>,
            ApiResponse<items_dtos::TagArchiveDto>,
        )
    ),
    tags(
        (name = "items", description = "Catalog items, archives and downloads (public)"),
        (name = "categories", description = "Item categories (public)"),
        (name = "admin", description = "Catalog management (HTTP Basic)"),
    ),
    modifiers(&SecurityAddon),
    info(
        title = "Catalog API",
        version = "0.1.0",
        description = "API documentation for the catalog",
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "basic_auth",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Basic).build()),
            );
        }
    }
}

/// Modifier to override OpenAPI info from config
pub struct SwaggerInfoModifier {
    pub title: String,
    pub version: String,
    pub description: String,
}

impl Modify for SwaggerInfoModifier {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        openapi.info.title = self.title.clone();
        openapi.info.version = self.version.clone();
        openapi.info.description = Some(self.description.clone());
    }
}
