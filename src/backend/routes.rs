use axum::middleware;
use axum::routing::{delete, get, post};
use axum::Router;

use crate::backend::{auth, handlers, AppState};

pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/api/projects",
            post(handlers::create_project).get(handlers::list_projects),
        )
        .route(
            "/api/projects/{id}",
            get(handlers::get_project)
                .put(handlers::update_project)
                .delete(handlers::delete_project),
        )
        .route("/api/projects/{id}/stats", get(handlers::get_project_stats))
        .route("/api/projects/{id}/export", get(handlers::export_project))
        .route(
            "/api/employees",
            post(handlers::create_employee).get(handlers::list_employees),
        )
        .route(
            "/api/employees/{id}",
            axum::routing::put(handlers::update_employee).delete(handlers::deactivate_employee),
        )
        .route(
            "/api/projects/{id}/categories",
            post(handlers::create_category).get(handlers::list_categories),
        )
        .route("/api/categories/{id}", delete(handlers::delete_category))
        .route(
            "/api/projects/{id}/timesheets",
            post(handlers::create_timesheet).get(handlers::list_timesheets),
        )
        .route("/api/timesheets/{id}", delete(handlers::delete_timesheet))
        .route(
            "/api/projects/{id}/equipment-logs",
            post(handlers::create_equipment_log).get(handlers::list_equipment_logs),
        )
        .route(
            "/api/equipment-logs/{id}",
            delete(handlers::delete_equipment_log),
        )
        .route(
            "/api/projects/{id}/subcontractors",
            post(handlers::create_subcontractor_entry).get(handlers::list_subcontractor_entries),
        )
        .route(
            "/api/subcontractors/{id}",
            delete(handlers::delete_subcontractor_entry),
        )
        .route(
            "/api/projects/{id}/overheads",
            post(handlers::create_overhead_entry).get(handlers::list_overhead_entries),
        )
        .route("/api/overheads/{id}", delete(handlers::delete_overhead_entry))
        .route(
            "/api/projects/{id}/reports",
            post(handlers::create_progress_report).get(handlers::list_progress_reports),
        )
        .route("/api/reports/{id}", delete(handlers::delete_progress_report))
        .route(
            "/api/projects/{id}/change-orders",
            post(handlers::create_change_order).get(handlers::list_change_orders),
        )
        .route(
            "/api/change-orders/{id}",
            axum::routing::put(handlers::update_change_order).delete(handlers::delete_change_order),
        )
        .route(
            "/api/projects/{id}/receipts",
            post(handlers::upload_receipt).get(handlers::list_receipts),
        )
        .route(
            "/api/receipts/{id}",
            get(handlers::get_receipt).delete(handlers::delete_receipt),
        )
        .route(
            "/api/receipts/{id}/links",
            post(handlers::create_receipt_link).get(handlers::list_receipt_links),
        )
        .route(
            "/api/receipt-links/{id}",
            delete(handlers::delete_receipt_link),
        )
        .route(
            "/api/gmail-connection",
            get(handlers::get_gmail_connection).post(handlers::create_gmail_connection),
        )
        .route(
            "/api/gmail-connection/{id}",
            delete(handlers::disconnect_gmail),
        )
        .route(
            "/api/gmail-connection/{id}/scan",
            post(handlers::start_gmail_scan),
        )
        .layer(middleware::from_fn_with_state(state, auth::require_bearer))
}
