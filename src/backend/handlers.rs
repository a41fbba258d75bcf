use axum::extract::{Multipart, Path, State};
use axum::http::{header, StatusCode};
use axum::response::Response;
use axum::Json;
use chrono::{Local, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;

use crate::backend::{not_found, ApiError, AppState};
use crate::database::db::{gmail, queries};
use crate::database::models::{
    Category, ChangeOrder, Employee, EntryKind, EquipmentLog, GmailConnection, Material,
    NewCategory, NewChangeOrder, NewEmployee, NewEquipmentLog, NewGmailConnection,
    NewOverheadEntry, NewProgressReport, NewProject, NewSubcontractorEntry, NewTimesheet,
    OverheadEntry, ProgressReport, Project, Receipt, ReceiptLink, SubcontractorEntry, Timesheet,
    UpdateProject,
};
use crate::services::{gmail as gmail_scan, sanitize_filename, vision};
use crate::{export, stats};

fn require_non_negative(name: &str, value: Decimal) -> Result<(), ApiError> {
    if value < Decimal::ZERO {
        return Err(ApiError::Validation(format!("{name} must not be negative")));
    }
    Ok(())
}

/*==========Project Handlers=========== */

const PROJECT_STATUSES: [&str; 3] = ["active", "on_hold", "completed"];

pub async fn create_project(
    State(state): State<AppState>,
    Json(new): Json<NewProject>,
) -> Result<(StatusCode, Json<Project>), ApiError> {
    if new.project_name.trim().is_empty() {
        return Err(ApiError::Validation("project_name must not be empty".into()));
    }
    // Zero budgets are rejected here so percent_used never divides by zero.
    if new.total_budget <= Decimal::ZERO {
        return Err(ApiError::Validation("total_budget must be positive".into()));
    }
    for (name, value) in [
        ("labor_budget", new.labor_budget),
        ("materials_budget", new.materials_budget),
        ("equipment_budget", new.equipment_budget),
        ("subcontractors_budget", new.subcontractors_budget),
        ("overhead_budget", new.overhead_budget),
    ] {
        require_non_negative(name, value)?;
    }
    if let Some(end) = new.end_date {
        if end < new.start_date {
            return Err(ApiError::Validation("end_date is before start_date".into()));
        }
    }

    let project = queries::create_project(&state.db, &new).await?;
    Ok((StatusCode::CREATED, Json(project)))
}

pub async fn list_projects(
    State(state): State<AppState>,
) -> Result<Json<Vec<Project>>, ApiError> {
    Ok(Json(queries::list_projects(&state.db).await?))
}

pub async fn get_project(
    State(state): State<AppState>,
    Path(project_id): Path<i64>,
) -> Result<Json<Project>, ApiError> {
    let project = queries::get_project(&state.db, project_id)
        .await
        .map_err(not_found("project"))?;
    Ok(Json(project))
}

pub async fn update_project(
    State(state): State<AppState>,
    Path(project_id): Path<i64>,
    Json(update): Json<UpdateProject>,
) -> Result<Json<Project>, ApiError> {
    if let Some(status) = update.status.as_deref() {
        if !PROJECT_STATUSES.contains(&status) {
            return Err(ApiError::Validation(format!("unknown project status '{status}'")));
        }
    }

    let project = queries::update_project(&state.db, project_id, &update)
        .await
        .map_err(not_found("project"))?;
    Ok(Json(project))
}

pub async fn delete_project(
    State(state): State<AppState>,
    Path(project_id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    if queries::delete_project(&state.db, project_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("project"))
    }
}

pub async fn get_project_stats(
    State(state): State<AppState>,
    Path(project_id): Path<i64>,
) -> Result<Json<stats::BudgetStats>, ApiError> {
    let snapshot = stats::project_stats(&state.db, project_id)
        .await
        .map_err(not_found("project"))?;
    Ok(Json(snapshot))
}

pub async fn export_project(
    State(state): State<AppState>,
    Path(project_id): Path<i64>,
) -> Result<Response, ApiError> {
    let project = queries::get_project(&state.db, project_id)
        .await
        .map_err(not_found("project"))?;
    let records = stats::load_cost_records(&state.db, project_id).await?;

    let body = export::cost_entries_csv(&records)?;
    let filename = format!("{}-costs.csv", sanitize_filename(&project.project_name));

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/csv; charset=utf-8")
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{filename}\""),
        )
        .body(body.into())
        .map_err(|err| ApiError::Io(std::io::Error::other(err)))
}

/*==========Employee Handlers=========== */

#[derive(Debug, Deserialize)]
pub struct UpdateEmployee {
    pub employee_name: Option<String>,
    pub trade: Option<String>,
    pub hourly_rate: Option<Decimal>,
}

pub async fn create_employee(
    State(state): State<AppState>,
    Json(new): Json<NewEmployee>,
) -> Result<(StatusCode, Json<Employee>), ApiError> {
    if new.employee_name.trim().is_empty() {
        return Err(ApiError::Validation("employee_name must not be empty".into()));
    }
    require_non_negative("hourly_rate", new.hourly_rate)?;

    let employee = queries::create_employee(&state.db, &new).await?;
    Ok((StatusCode::CREATED, Json(employee)))
}

pub async fn list_employees(
    State(state): State<AppState>,
) -> Result<Json<Vec<Employee>>, ApiError> {
    Ok(Json(queries::list_employees(&state.db).await?))
}

pub async fn update_employee(
    State(state): State<AppState>,
    Path(employee_id): Path<i64>,
    Json(update): Json<UpdateEmployee>,
) -> Result<Json<Employee>, ApiError> {
    if let Some(rate) = update.hourly_rate {
        require_non_negative("hourly_rate", rate)?;
    }

    let employee = queries::update_employee(
        &state.db,
        employee_id,
        update.employee_name.as_deref(),
        update.trade.as_deref(),
        update.hourly_rate,
    )
    .await
    .map_err(not_found("employee"))?;
    Ok(Json(employee))
}

pub async fn deactivate_employee(
    State(state): State<AppState>,
    Path(employee_id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    if queries::deactivate_employee(&state.db, employee_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("employee"))
    }
}

/*==========Category Handlers=========== */

pub async fn create_category(
    State(state): State<AppState>,
    Path(project_id): Path<i64>,
    Json(new): Json<NewCategory>,
) -> Result<(StatusCode, Json<Category>), ApiError> {
    if new.category_name.trim().is_empty() {
        return Err(ApiError::Validation("category_name must not be empty".into()));
    }
    queries::get_project(&state.db, project_id)
        .await
        .map_err(not_found("project"))?;

    let category = queries::create_category(&state.db, project_id, &new).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn list_categories(
    State(state): State<AppState>,
    Path(project_id): Path<i64>,
) -> Result<Json<Vec<Category>>, ApiError> {
    queries::get_project(&state.db, project_id)
        .await
        .map_err(not_found("project"))?;
    Ok(Json(queries::list_categories(&state.db, project_id).await?))
}

// Cost entries that referenced the category survive with a null category_id.
pub async fn delete_category(
    State(state): State<AppState>,
    Path(category_id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    if queries::delete_category(&state.db, category_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("category"))
    }
}

/*==========Timesheet Handlers=========== */

pub async fn create_timesheet(
    State(state): State<AppState>,
    Path(project_id): Path<i64>,
    Json(new): Json<NewTimesheet>,
) -> Result<(StatusCode, Json<Timesheet>), ApiError> {
    require_non_negative("hours", new.hours)?;
    if let Some(rate) = new.pay_rate {
        require_non_negative("pay_rate", rate)?;
    }
    queries::get_project(&state.db, project_id)
        .await
        .map_err(not_found("project"))?;

    let timesheet = queries::create_timesheet(&state.db, project_id, &new)
        .await
        .map_err(not_found("employee"))?;
    Ok((StatusCode::CREATED, Json(timesheet)))
}

pub async fn list_timesheets(
    State(state): State<AppState>,
    Path(project_id): Path<i64>,
) -> Result<Json<Vec<Timesheet>>, ApiError> {
    queries::get_project(&state.db, project_id)
        .await
        .map_err(not_found("project"))?;
    Ok(Json(queries::list_timesheets(&state.db, project_id).await?))
}

pub async fn delete_timesheet(
    State(state): State<AppState>,
    Path(timesheet_id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    if queries::delete_timesheet(&state.db, timesheet_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("timesheet"))
    }
}

/*==========Equipment Log Handlers=========== */

pub async fn create_equipment_log(
    State(state): State<AppState>,
    Path(project_id): Path<i64>,
    Json(new): Json<NewEquipmentLog>,
) -> Result<(StatusCode, Json<EquipmentLog>), ApiError> {
    if new.equipment_name.trim().is_empty() {
        return Err(ApiError::Validation("equipment_name must not be empty".into()));
    }
    require_non_negative("fuel_cost", new.fuel_cost)?;
    require_non_negative("rental_cost", new.rental_cost)?;
    queries::get_project(&state.db, project_id)
        .await
        .map_err(not_found("project"))?;

    let log = queries::create_equipment_log(&state.db, project_id, &new).await?;
    Ok((StatusCode::CREATED, Json(log)))
}

pub async fn list_equipment_logs(
    State(state): State<AppState>,
    Path(project_id): Path<i64>,
) -> Result<Json<Vec<EquipmentLog>>, ApiError> {
    queries::get_project(&state.db, project_id)
        .await
        .map_err(not_found("project"))?;
    Ok(Json(queries::list_equipment_logs(&state.db, project_id).await?))
}

pub async fn delete_equipment_log(
    State(state): State<AppState>,
    Path(equipment_log_id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    if queries::delete_equipment_log(&state.db, equipment_log_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("equipment log"))
    }
}

/*==========Subcontractor Entry Handlers=========== */

pub async fn create_subcontractor_entry(
    State(state): State<AppState>,
    Path(project_id): Path<i64>,
    Json(new): Json<NewSubcontractorEntry>,
) -> Result<(StatusCode, Json<SubcontractorEntry>), ApiError> {
    if new.company_name.trim().is_empty() {
        return Err(ApiError::Validation("company_name must not be empty".into()));
    }
    require_non_negative("cost", new.cost)?;
    queries::get_project(&state.db, project_id)
        .await
        .map_err(not_found("project"))?;

    let entry = queries::create_subcontractor_entry(&state.db, project_id, &new).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

pub async fn list_subcontractor_entries(
    State(state): State<AppState>,
    Path(project_id): Path<i64>,
) -> Result<Json<Vec<SubcontractorEntry>>, ApiError> {
    queries::get_project(&state.db, project_id)
        .await
        .map_err(not_found("project"))?;
    Ok(Json(queries::list_subcontractor_entries(&state.db, project_id).await?))
}

pub async fn delete_subcontractor_entry(
    State(state): State<AppState>,
    Path(subcontractor_entry_id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    if queries::delete_subcontractor_entry(&state.db, subcontractor_entry_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("subcontractor entry"))
    }
}

/*==========Overhead Entry Handlers=========== */

pub async fn create_overhead_entry(
    State(state): State<AppState>,
    Path(project_id): Path<i64>,
    Json(new): Json<NewOverheadEntry>,
) -> Result<(StatusCode, Json<OverheadEntry>), ApiError> {
    require_non_negative("cost", new.cost)?;
    queries::get_project(&state.db, project_id)
        .await
        .map_err(not_found("project"))?;

    let entry = queries::create_overhead_entry(&state.db, project_id, &new).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

pub async fn list_overhead_entries(
    State(state): State<AppState>,
    Path(project_id): Path<i64>,
) -> Result<Json<Vec<OverheadEntry>>, ApiError> {
    queries::get_project(&state.db, project_id)
        .await
        .map_err(not_found("project"))?;
    Ok(Json(queries::list_overhead_entries(&state.db, project_id).await?))
}

pub async fn delete_overhead_entry(
    State(state): State<AppState>,
    Path(overhead_entry_id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    if queries::delete_overhead_entry(&state.db, overhead_entry_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("overhead entry"))
    }
}

/*==========Progress Report Handlers=========== */

#[derive(Debug, serde::Serialize)]
pub struct ReportWithMaterials {
    #[serde(flatten)]
    pub report: ProgressReport,
    pub materials: Vec<Material>,
}

pub async fn create_progress_report(
    State(state): State<AppState>,
    Path(project_id): Path<i64>,
    Json(new): Json<NewProgressReport>,
) -> Result<(StatusCode, Json<ReportWithMaterials>), ApiError> {
    if !(0..=100).contains(&new.percent_complete) {
        return Err(ApiError::Validation("percent_complete must be between 0 and 100".into()));
    }
    for material in &new.materials {
        if material.material_name.trim().is_empty() {
            return Err(ApiError::Validation("material_name must not be empty".into()));
        }
        require_non_negative("cost", material.cost)?;
    }
    queries::get_project(&state.db, project_id)
        .await
        .map_err(not_found("project"))?;

    let (report, materials) =
        queries::create_report_with_materials(&state.db, project_id, &new).await?;
    Ok((StatusCode::CREATED, Json(ReportWithMaterials { report, materials })))
}

pub async fn list_progress_reports(
    State(state): State<AppState>,
    Path(project_id): Path<i64>,
) -> Result<Json<Vec<ProgressReport>>, ApiError> {
    queries::get_project(&state.db, project_id)
        .await
        .map_err(not_found("project"))?;
    Ok(Json(queries::list_progress_reports(&state.db, project_id).await?))
}

pub async fn delete_progress_report(
    State(state): State<AppState>,
    Path(report_id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    if queries::delete_progress_report(&state.db, report_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("progress report"))
    }
}

/*==========Change Order Handlers=========== */

const CHANGE_ORDER_STATUSES: [&str; 3] = ["pending", "approved", "rejected"];

#[derive(Debug, Deserialize)]
pub struct UpdateChangeOrder {
    pub status: String,
}

pub async fn create_change_order(
    State(state): State<AppState>,
    Path(project_id): Path<i64>,
    Json(new): Json<NewChangeOrder>,
) -> Result<(StatusCode, Json<ChangeOrder>), ApiError> {
    if new.description.trim().is_empty() {
        return Err(ApiError::Validation("description must not be empty".into()));
    }
    queries::get_project(&state.db, project_id)
        .await
        .map_err(not_found("project"))?;

    let order = queries::create_change_order(&state.db, project_id, &new).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

pub async fn list_change_orders(
    State(state): State<AppState>,
    Path(project_id): Path<i64>,
) -> Result<Json<Vec<ChangeOrder>>, ApiError> {
    queries::get_project(&state.db, project_id)
        .await
        .map_err(not_found("project"))?;
    Ok(Json(queries::list_change_orders(&state.db, project_id).await?))
}

pub async fn update_change_order(
    State(state): State<AppState>,
    Path(change_order_id): Path<i64>,
    Json(update): Json<UpdateChangeOrder>,
) -> Result<Json<ChangeOrder>, ApiError> {
    if !CHANGE_ORDER_STATUSES.contains(&update.status.as_str()) {
        return Err(ApiError::Validation(format!(
            "unknown change order status '{}'",
            update.status
        )));
    }

    let order = queries::update_change_order_status(&state.db, change_order_id, &update.status)
        .await
        .map_err(not_found("change order"))?;
    Ok(Json(order))
}

pub async fn delete_change_order(
    State(state): State<AppState>,
    Path(change_order_id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    if queries::delete_change_order(&state.db, change_order_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("change order"))
    }
}

/*==========Receipt Handlers=========== */

pub async fn upload_receipt(
    State(state): State<AppState>,
    Path(project_id): Path<i64>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<Receipt>), ApiError> {
    queries::get_project(&state.db, project_id)
        .await
        .map_err(not_found("project"))?;

    let mut upload: Option<(String, Vec<u8>)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| ApiError::Validation(err.to_string()))?
    {
        if field.name() == Some("file") {
            let filename = field.file_name().unwrap_or("receipt").to_string();
            let data = field
                .bytes()
                .await
                .map_err(|err| ApiError::Validation(err.to_string()))?;
            upload = Some((filename, data.to_vec()));
        }
    }

    let Some((filename, data)) = upload else {
        return Err(ApiError::Validation("multipart field 'file' is required".into()));
    };
    if data.is_empty() {
        return Err(ApiError::Validation("uploaded file is empty".into()));
    }

    let stored_name = format!(
        "{}_{}",
        Utc::now().timestamp_millis(),
        sanitize_filename(&filename)
    );
    let path = state.config.upload_dir.join(&stored_name);
    tokio::fs::write(&path, &data).await?;

    let receipt = queries::insert_receipt(
        &state.db,
        project_id,
        "upload",
        path.to_string_lossy().as_ref(),
        Some(&filename),
        None,
    )
    .await?;

    // Analysis runs in the background; the row is returned as pending and the
    // client polls it. Analysis failures land on the row, never on the upload.
    let task_state = state.clone();
    let receipt_id = receipt.receipt_id;
    tokio::spawn(async move {
        let mime = vision::mime_for(&filename);
        let _ = vision::process_receipt(&task_state, receipt_id, &data, mime).await;
    });

    Ok((StatusCode::CREATED, Json(receipt)))
}

pub async fn list_receipts(
    State(state): State<AppState>,
    Path(project_id): Path<i64>,
) -> Result<Json<Vec<Receipt>>, ApiError> {
    queries::get_project(&state.db, project_id)
        .await
        .map_err(not_found("project"))?;
    Ok(Json(queries::list_receipts(&state.db, project_id).await?))
}

pub async fn get_receipt(
    State(state): State<AppState>,
    Path(receipt_id): Path<i64>,
) -> Result<Json<Receipt>, ApiError> {
    let receipt = queries::get_receipt(&state.db, receipt_id)
        .await
        .map_err(not_found("receipt"))?;
    Ok(Json(receipt))
}

pub async fn delete_receipt(
    State(state): State<AppState>,
    Path(receipt_id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    if queries::delete_receipt(&state.db, receipt_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("receipt"))
    }
}

/*==========Receipt Link Handlers=========== */

#[derive(Debug, Deserialize)]
pub struct NewReceiptLink {
    pub entry_kind: EntryKind,
    pub entry_id: i64,
}

pub async fn create_receipt_link(
    State(state): State<AppState>,
    Path(receipt_id): Path<i64>,
    Json(new): Json<NewReceiptLink>,
) -> Result<(StatusCode, Json<ReceiptLink>), ApiError> {
    queries::get_receipt(&state.db, receipt_id)
        .await
        .map_err(not_found("receipt"))?;

    // The kind is already constrained by the enum; the id still has to point
    // at a live row of that kind.
    if !queries::entry_exists(&state.db, new.entry_kind, new.entry_id).await? {
        return Err(ApiError::Validation(format!(
            "{} {} does not exist",
            new.entry_kind, new.entry_id
        )));
    }

    let link =
        queries::create_receipt_link(&state.db, receipt_id, new.entry_kind, new.entry_id).await?;
    Ok((StatusCode::CREATED, Json(link)))
}

pub async fn list_receipt_links(
    State(state): State<AppState>,
    Path(receipt_id): Path<i64>,
) -> Result<Json<Vec<ReceiptLink>>, ApiError> {
    queries::get_receipt(&state.db, receipt_id)
        .await
        .map_err(not_found("receipt"))?;
    Ok(Json(queries::list_receipt_links(&state.db, receipt_id).await?))
}

pub async fn delete_receipt_link(
    State(state): State<AppState>,
    Path(link_id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    if queries::delete_receipt_link(&state.db, link_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("receipt link"))
    }
}

/*==========Gmail Connection Handlers=========== */

pub async fn get_gmail_connection(
    State(state): State<AppState>,
) -> Result<Json<GmailConnection>, ApiError> {
    gmail::get_active(&state.db)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("active gmail connection"))
}

pub async fn create_gmail_connection(
    State(state): State<AppState>,
    Json(new): Json<NewGmailConnection>,
) -> Result<(StatusCode, Json<GmailConnection>), ApiError> {
    if !new.gmail_email.contains('@') {
        return Err(ApiError::Validation("gmail_email is not an email address".into()));
    }
    if new.access_token.is_empty() {
        return Err(ApiError::Validation("access_token must not be empty".into()));
    }

    let connection = gmail::create_active(&state.db, &new).await?;
    Ok((StatusCode::CREATED, Json(connection)))
}

pub async fn disconnect_gmail(
    State(state): State<AppState>,
    Path(connection_id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    if gmail::deactivate(&state.db, connection_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("gmail connection"))
    }
}

#[derive(Debug, Deserialize)]
pub struct ScanRequest {
    pub project_id: i64,
    pub since: Option<NaiveDate>,
}

/// Kick off an inbox scan and return immediately; progress is observable via
/// the connection's sync_status and the receipts it writes.
pub async fn start_gmail_scan(
    State(state): State<AppState>,
    Path(connection_id): Path<i64>,
    Json(request): Json<ScanRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let connection = gmail::get_by_id(&state.db, connection_id)
        .await
        .map_err(not_found("gmail connection"))?;
    if !connection.is_active {
        return Err(ApiError::Validation("gmail connection is disconnected".into()));
    }
    queries::get_project(&state.db, request.project_id)
        .await
        .map_err(not_found("project"))?;

    let since = request
        .since
        .unwrap_or_else(|| Local::now().date_naive() - chrono::Duration::days(30));

    let task_state = state.clone();
    tokio::spawn(async move {
        gmail_scan::run_scan(task_state, connection, request.project_id, since).await;
    });

    Ok((StatusCode::ACCEPTED, Json(json!({ "status": "scan started" }))))
}
