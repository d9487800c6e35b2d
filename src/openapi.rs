use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Dispatch API",
        version = "0.1.0",
        description = r#"
# Dispatch Tracking API

Tracks physical goods leaving a facility. A dispatch groups one or more
inventory line items bound for a destination; creating a dispatch atomically
reserves stock across the manufacturing and bought-out ledgers, and deleting
it restores what was consumed.

## Authentication

All `/api/v1` endpoints require a bearer token obtained from `/auth/login`:

```
Authorization: Bearer <token>
```

## Pagination

List endpoints accept `page` and `limit` query parameters and return
pagination metadata (total count, current page, total pages, limit).
"#,
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    paths(
        crate::auth::login,
        crate::auth::verify,
        crate::handlers::dispatches::list_dispatches,
        crate::handlers::dispatches::get_dispatch,
        crate::handlers::dispatches::create_dispatch,
        crate::handlers::dispatches::update_dispatch,
        crate::handlers::dispatches::delete_dispatch,
        crate::handlers::dispatches::dispatch_details,
        crate::handlers::dispatches::dispatch_stats,
        crate::handlers::inventory::list_inventory,
        crate::handlers::inventory::get_inventory,
        crate::handlers::inventory::create_inventory,
        crate::handlers::inventory::adjust_inventory,
    ),
    components(schemas(
        crate::ApiResponse<serde_json::Value>,
        crate::PaginatedResponse<serde_json::Value>,
        crate::errors::ErrorResponse,
        crate::auth::LoginRequest,
        crate::auth::LoginResponse,
        crate::auth::VerifyResponse,
        crate::handlers::dispatches::CreateDispatchRequest,
        crate::handlers::dispatches::DispatchLineRequest,
        crate::handlers::dispatches::UpdateDispatchRequest,
        crate::handlers::dispatches::DispatchSummary,
        crate::handlers::dispatches::DispatchLineSummary,
        crate::handlers::dispatches::DeleteDispatchResponse,
        crate::handlers::dispatches::ReconciliationWarningResponse,
        crate::handlers::inventory::CreateInventoryItemRequest,
        crate::handlers::inventory::AdjustInventoryRequest,
        crate::handlers::inventory::InventoryItemSummary,
        crate::services::reporting::DispatchLineDetail,
        crate::services::reporting::DispatchStatsSummary,
        crate::services::reporting::DispatchTotals,
        crate::services::reporting::StatusBucket,
        crate::services::reporting::MonthlyBucket,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Token issuance and verification"),
        (name = "dispatches", description = "Dispatch lifecycle and reporting"),
        (name = "inventory", description = "Inventory record management")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

/// Swagger UI mounted at `/docs`, serving the OpenAPI document.
pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_document_builds() {
        let doc = ApiDoc::openapi();
        let json = serde_json::to_string(&doc).expect("document should serialize");
        assert!(json.contains("/api/v1/dispatches"));
        assert!(json.contains("/auth/login"));
    }
}
