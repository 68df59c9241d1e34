use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Apotek API",
        version = "0.1.0",
        description = r#"
# Apotek Pharmacy API

Point-of-sale and inventory backend for a pharmacy: product catalog with
category-prefixed codes, stock tracking, checkout with date-scoped invoice
numbers, supplier records, an append-only activity audit trail, and the
owner's reporting dashboard.

## Authentication

Requests are authenticated by the gateway in front of this service; the
resolved identity is forwarded as `x-user-id`, `x-user-name`, and
`x-user-role` headers. Catalog mutation needs the `warehouse` role, sales
need `admin` or `owner`, reports and the audit trail need `owner`.

## Errors

Failures return a JSON envelope with the status category, a human-readable
message, the request id, and a timestamp.
"#
    ),
    components(schemas(
        crate::errors::ErrorResponse,
        crate::auth::Role,
        crate::entities::product::StockStatus,
        crate::entities::sale::PaymentMethod,
        crate::services::activity_log::ActivityType,
    )),
    tags(
        (name = "products", description = "Product catalog"),
        (name = "categories", description = "Category management"),
        (name = "sales", description = "Checkout and sales history"),
        (name = "suppliers", description = "Supplier records"),
        (name = "reports", description = "Owner dashboard aggregates"),
        (name = "activity-logs", description = "Audit trail"),
    )
)]
pub struct ApiDoc;

/// Swagger UI mounted at /docs, spec served at /api-docs/openapi.json
pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi())
}
