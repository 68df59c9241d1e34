//! Best-effort audit trail over authenticated API requests.
//!
//! Requests are classified by the router's own route template (a closed set),
//! not by matching raw URLs. Failures to write a log row are warned about and
//! never fail the request being described.

use crate::{
    auth::identity_from_headers,
    handlers::AppState,
    services::activity_log::{ActivityRecord, ActivityType},
};
use axum::{
    extract::{MatchedPath, OriginalUri, Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use tracing::warn;

/// Paths outside the audited API surface: probes, docs, static assets
const SKIP_PREFIXES: &[&str] = &[
    "/status",
    "/health",
    "/metrics",
    "/docs",
    "/api-docs",
    "/assets",
    "/uploads",
    "/favicon.ico",
    "/api/v1/status",
    "/api/v1/health",
];

fn should_skip(path: &str) -> bool {
    SKIP_PREFIXES.iter().any(|prefix| path.starts_with(prefix)) || !path.starts_with("/api/")
}

/// Closed classification of (method, route template) into an activity tag.
/// Route templates come from the router itself, so this match is exhaustive
/// over the API surface; anything unrecognized is the generic fallback.
pub fn classify(method: &str, route: &str) -> ActivityType {
    match (method, route) {
        ("GET", "/api/v1/products")
        | ("GET", "/api/v1/products/:id")
        | ("GET", "/api/v1/products/search")
        | ("GET", "/api/v1/products/last-code")
        | ("GET", "/api/v1/products/next-code") => ActivityType::ProductView,
        ("POST", "/api/v1/products") => ActivityType::ProductCreate,
        ("POST", "/api/v1/products/generate-codes") => ActivityType::ProductView,
        ("PUT", "/api/v1/products/:id") => ActivityType::ProductUpdate,
        ("DELETE", "/api/v1/products/:id") => ActivityType::ProductDelete,

        ("GET", "/api/v1/categories") | ("GET", "/api/v1/categories/:id") => {
            ActivityType::CategoryView
        }
        ("POST", "/api/v1/categories") => ActivityType::CategoryCreate,
        ("PUT", "/api/v1/categories/:id") => ActivityType::CategoryUpdate,
        ("DELETE", "/api/v1/categories/:id") => ActivityType::CategoryDelete,

        ("GET", "/api/v1/sales") | ("GET", "/api/v1/sales/:id") => ActivityType::SaleView,
        ("POST", "/api/v1/sales") => ActivityType::SaleCreate,
        ("GET", "/api/v1/sales/:id/invoice") => ActivityType::Export,

        ("GET", "/api/v1/suppliers") | ("GET", "/api/v1/suppliers/:id") => {
            ActivityType::SupplierView
        }
        ("POST", "/api/v1/suppliers") => ActivityType::SupplierCreate,
        ("PUT", "/api/v1/suppliers/:id") => ActivityType::SupplierUpdate,
        ("DELETE", "/api/v1/suppliers/:id") => ActivityType::SupplierDelete,

        ("GET", route) if route.starts_with("/api/v1/reports") => ActivityType::ReportView,
        ("GET", "/api/v1/activity-logs") => ActivityType::ReportView,

        _ => ActivityType::Other,
    }
}

/// Extracts the client IP, preferring proxy-forwarded headers
fn client_ip(request: &Request) -> Option<String> {
    let headers = request.headers();
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        })
        .filter(|v| !v.is_empty())
}

pub async fn activity_log_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    // Nested routers see a stripped Uri; OriginalUri keeps the public path
    let path = request
        .extensions()
        .get::<OriginalUri>()
        .map(|uri| uri.path().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());
    let identity = identity_from_headers(request.headers());

    // Anonymous traffic is the auth gateway's problem; skipped paths are noise
    let audit = match identity {
        Some(user) if !should_skip(&path) => Some(user),
        _ => None,
    };

    let record = audit.map(|user| {
        let route = request
            .extensions()
            .get::<MatchedPath>()
            .map(|m| m.as_str().to_string())
            .unwrap_or_else(|| path.clone());
        let method = request.method().as_str().to_string();
        let activity_type = classify(&method, &route);
        let body_size = request
            .headers()
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(0);

        ActivityRecord {
            user_id: user.id,
            activity_type,
            method,
            path,
            query: request.uri().query().map(str::to_string),
            ip_address: client_ip(&request),
            user_agent: request
                .headers()
                .get(header::USER_AGENT)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
            body_size,
        }
    });

    let response = next.run(request).await;

    if let Some(record) = record {
        if let Err(e) = state.services.activity_logs.record(record).await {
            // The audit trail must never fail the request it describes
            warn!(error = %e, "Failed to write activity log entry");
        }
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_resource_routes() {
        assert_eq!(
            classify("POST", "/api/v1/sales"),
            ActivityType::SaleCreate
        );
        assert_eq!(
            classify("GET", "/api/v1/products/:id"),
            ActivityType::ProductView
        );
        assert_eq!(
            classify("DELETE", "/api/v1/categories/:id"),
            ActivityType::CategoryDelete
        );
        assert_eq!(
            classify("GET", "/api/v1/sales/:id/invoice"),
            ActivityType::Export
        );
        assert_eq!(
            classify("GET", "/api/v1/reports/dashboard"),
            ActivityType::ReportView
        );
    }

    #[test]
    fn unknown_routes_fall_back_to_generic_tag() {
        assert_eq!(classify("PATCH", "/api/v1/products"), ActivityType::Other);
        assert_eq!(classify("GET", "/api/v2/widgets"), ActivityType::Other);
    }

    #[test]
    fn skips_probe_and_static_paths() {
        assert!(should_skip("/health"));
        assert!(should_skip("/status"));
        assert!(should_skip("/docs/index.html"));
        assert!(should_skip("/favicon.ico"));
        assert!(should_skip("/anything-not-api"));
        assert!(should_skip("/api/v1/health"));
        assert!(!should_skip("/api/v1/products"));
    }
}
