use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{Pool, Postgres};

use crate::database::models::{
    Category, ChangeOrder, Employee, EntryKind, EquipmentLog, Material, NewCategory,
    NewChangeOrder, NewEmployee, NewEquipmentLog, NewOverheadEntry, NewProgressReport, NewProject,
    NewSubcontractorEntry, NewTimesheet, OverheadEntry, ProgressReport, Project, Receipt,
    ReceiptLink, ReceiptStatus, SubcontractorEntry, Timesheet, UpdateProject,
};

/*
This file contains the PostgreSQL CRUD logic for every entity except the
Gmail connection (see gmail.rs, which needs its own serialization rules).
 */

const PROJECT_COLS: &str = "project_id, project_name, client_name, address, total_budget, \
     labor_budget, materials_budget, equipment_budget, subcontractors_budget, overhead_budget, \
     start_date, end_date, status, created_at";

/*==========Project Queries=========== */

pub async fn create_project(pool: &Pool<Postgres>, new: &NewProject) -> Result<Project, sqlx::Error> {
    sqlx::query_as::<_, Project>(&format!(
        r#"
        INSERT INTO projects (
            project_name, client_name, address, total_budget,
            labor_budget, materials_budget, equipment_budget, subcontractors_budget, overhead_budget,
            start_date, end_date
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        RETURNING {PROJECT_COLS}
        "#
    ))
    .bind(&new.project_name)
    .bind(&new.client_name)
    .bind(&new.address)
    .bind(new.total_budget)
    .bind(new.labor_budget)
    .bind(new.materials_budget)
    .bind(new.equipment_budget)
    .bind(new.subcontractors_budget)
    .bind(new.overhead_budget)
    .bind(new.start_date)
    .bind(new.end_date)
    .fetch_one(pool)
    .await
}

// Fails with RowNotFound for missing or soft-deleted projects.
pub async fn get_project(pool: &Pool<Postgres>, project_id: i64) -> Result<Project, sqlx::Error> {
    sqlx::query_as::<_, Project>(&format!(
        "SELECT {PROJECT_COLS} FROM projects WHERE project_id = $1 AND deleted_at IS NULL"
    ))
    .bind(project_id)
    .fetch_one(pool)
    .await
}

pub async fn list_projects(pool: &Pool<Postgres>) -> Result<Vec<Project>, sqlx::Error> {
    sqlx::query_as::<_, Project>(&format!(
        "SELECT {PROJECT_COLS} FROM projects WHERE deleted_at IS NULL ORDER BY project_id ASC"
    ))
    .fetch_all(pool)
    .await
}

// Budgets are immutable after creation; only descriptive fields change here.
pub async fn update_project(
    pool: &Pool<Postgres>,
    project_id: i64,
    update: &UpdateProject,
) -> Result<Project, sqlx::Error> {
    sqlx::query_as::<_, Project>(&format!(
        r#"
        UPDATE projects
        SET project_name = COALESCE($2, project_name),
            client_name  = COALESCE($3, client_name),
            address      = COALESCE($4, address),
            status       = COALESCE($5, status),
            end_date     = COALESCE($6, end_date)
        WHERE project_id = $1 AND deleted_at IS NULL
        RETURNING {PROJECT_COLS}
        "#
    ))
    .bind(project_id)
    .bind(&update.project_name)
    .bind(&update.client_name)
    .bind(&update.address)
    .bind(&update.status)
    .bind(update.end_date)
    .fetch_one(pool)
    .await
}

pub async fn delete_project(pool: &Pool<Postgres>, project_id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE projects SET deleted_at = NOW() WHERE project_id = $1 AND deleted_at IS NULL",
    )
    .bind(project_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/*==========Employee Queries=========== */

pub async fn create_employee(pool: &Pool<Postgres>, new: &NewEmployee) -> Result<Employee, sqlx::Error> {
    sqlx::query_as::<_, Employee>(
        r#"
        INSERT INTO employees (employee_name, trade, hourly_rate)
        VALUES ($1, $2, $3)
        RETURNING employee_id, employee_name, trade, hourly_rate, is_active, created_at
        "#,
    )
    .bind(&new.employee_name)
    .bind(&new.trade)
    .bind(new.hourly_rate)
    .fetch_one(pool)
    .await
}

pub async fn list_employees(pool: &Pool<Postgres>) -> Result<Vec<Employee>, sqlx::Error> {
    sqlx::query_as::<_, Employee>(
        r#"
        SELECT employee_id, employee_name, trade, hourly_rate, is_active, created_at
        FROM employees
        ORDER BY employee_name ASC
        "#,
    )
    .fetch_all(pool)
    .await
}

pub async fn update_employee(
    pool: &Pool<Postgres>,
    employee_id: i64,
    employee_name: Option<&str>,
    trade: Option<&str>,
    hourly_rate: Option<Decimal>,
) -> Result<Employee, sqlx::Error> {
    sqlx::query_as::<_, Employee>(
        r#"
        UPDATE employees
        SET employee_name = COALESCE($2, employee_name),
            trade         = COALESCE($3, trade),
            hourly_rate   = COALESCE($4, hourly_rate)
        WHERE employee_id = $1
        RETURNING employee_id, employee_name, trade, hourly_rate, is_active, created_at
        "#,
    )
    .bind(employee_id)
    .bind(employee_name)
    .bind(trade)
    .bind(hourly_rate)
    .fetch_one(pool)
    .await
}

pub async fn deactivate_employee(pool: &Pool<Postgres>, employee_id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE employees SET is_active = FALSE WHERE employee_id = $1")
        .bind(employee_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/*==========Category Queries=========== */

pub async fn create_category(
    pool: &Pool<Postgres>,
    project_id: i64,
    new: &NewCategory,
) -> Result<Category, sqlx::Error> {
    sqlx::query_as::<_, Category>(
        r#"
        INSERT INTO categories (project_id, category_name, color)
        VALUES ($1, $2, COALESCE($3, '#888888'))
        RETURNING category_id, project_id, category_name, color
        "#,
    )
    .bind(project_id)
    .bind(&new.category_name)
    .bind(&new.color)
    .fetch_one(pool)
    .await
}

pub async fn list_categories(pool: &Pool<Postgres>, project_id: i64) -> Result<Vec<Category>, sqlx::Error> {
    sqlx::query_as::<_, Category>(
        r#"
        SELECT category_id, project_id, category_name, color
        FROM categories
        WHERE project_id = $1
        ORDER BY category_name ASC
        "#,
    )
    .bind(project_id)
    .fetch_all(pool)
    .await
}

// Hard delete. The ON DELETE SET NULL constraints leave tagged cost entries
// in place with a null category, so they fall into the uncategorized bucket.
pub async fn delete_category(pool: &Pool<Postgres>, category_id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM categories WHERE category_id = $1")
        .bind(category_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/*==========Timesheet Queries=========== */

const TIMESHEET_COLS: &str = "timesheet_id, project_id, employee_id, category_id, work_date, \
     hours, pay_rate, notes, created_at";

pub async fn create_timesheet(
    pool: &Pool<Postgres>,
    project_id: i64,
    new: &NewTimesheet,
) -> Result<Timesheet, sqlx::Error> {
    // Missing pay rate falls back to the employee's current hourly rate.
    let pay_rate = match new.pay_rate {
        Some(rate) => rate,
        None => {
            sqlx::query_scalar::<_, Decimal>(
                "SELECT hourly_rate FROM employees WHERE employee_id = $1",
            )
            .bind(new.employee_id)
            .fetch_one(pool)
            .await?
        }
    };

    sqlx::query_as::<_, Timesheet>(&format!(
        r#"
        INSERT INTO timesheets (project_id, employee_id, category_id, work_date, hours, pay_rate, notes)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING {TIMESHEET_COLS}
        "#
    ))
    .bind(project_id)
    .bind(new.employee_id)
    .bind(new.category_id)
    .bind(new.work_date)
    .bind(new.hours)
    .bind(pay_rate)
    .bind(&new.notes)
    .fetch_one(pool)
    .await
}

pub async fn list_timesheets(pool: &Pool<Postgres>, project_id: i64) -> Result<Vec<Timesheet>, sqlx::Error> {
    sqlx::query_as::<_, Timesheet>(&format!(
        r#"
        SELECT {TIMESHEET_COLS}
        FROM timesheets
        WHERE project_id = $1 AND deleted_at IS NULL
        ORDER BY work_date DESC, timesheet_id DESC
        "#
    ))
    .bind(project_id)
    .fetch_all(pool)
    .await
}

pub async fn delete_timesheet(pool: &Pool<Postgres>, timesheet_id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE timesheets SET deleted_at = NOW() WHERE timesheet_id = $1 AND deleted_at IS NULL",
    )
    .bind(timesheet_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/*==========Equipment Log Queries=========== */

const EQUIPMENT_COLS: &str = "equipment_log_id, project_id, category_id, equipment_name, \
     log_date, fuel_cost, rental_cost, notes, created_at";

pub async fn create_equipment_log(
    pool: &Pool<Postgres>,
    project_id: i64,
    new: &NewEquipmentLog,
) -> Result<EquipmentLog, sqlx::Error> {
    sqlx::query_as::<_, EquipmentLog>(&format!(
        r#"
        INSERT INTO equipment_logs (project_id, category_id, equipment_name, log_date, fuel_cost, rental_cost, notes)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING {EQUIPMENT_COLS}
        "#
    ))
    .bind(project_id)
    .bind(new.category_id)
    .bind(&new.equipment_name)
    .bind(new.log_date)
    .bind(new.fuel_cost)
    .bind(new.rental_cost)
    .bind(&new.notes)
    .fetch_one(pool)
    .await
}

pub async fn list_equipment_logs(
    pool: &Pool<Postgres>,
    project_id: i64,
) -> Result<Vec<EquipmentLog>, sqlx::Error> {
    sqlx::query_as::<_, EquipmentLog>(&format!(
        r#"
        SELECT {EQUIPMENT_COLS}
        FROM equipment_logs
        WHERE project_id = $1 AND deleted_at IS NULL
        ORDER BY log_date DESC, equipment_log_id DESC
        "#
    ))
    .bind(project_id)
    .fetch_all(pool)
    .await
}

pub async fn delete_equipment_log(pool: &Pool<Postgres>, equipment_log_id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE equipment_logs SET deleted_at = NOW() WHERE equipment_log_id = $1 AND deleted_at IS NULL",
    )
    .bind(equipment_log_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/*==========Subcontractor Entry Queries=========== */

const SUBCONTRACTOR_COLS: &str = "subcontractor_entry_id, project_id, category_id, company_name, \
     entry_date, cost, description, created_at";

pub async fn create_subcontractor_entry(
    pool: &Pool<Postgres>,
    project_id: i64,
    new: &NewSubcontractorEntry,
) -> Result<SubcontractorEntry, sqlx::Error> {
    sqlx::query_as::<_, SubcontractorEntry>(&format!(
        r#"
        INSERT INTO subcontractor_entries (project_id, category_id, company_name, entry_date, cost, description)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING {SUBCONTRACTOR_COLS}
        "#
    ))
    .bind(project_id)
    .bind(new.category_id)
    .bind(&new.company_name)
    .bind(new.entry_date)
    .bind(new.cost)
    .bind(&new.description)
    .fetch_one(pool)
    .await
}

pub async fn list_subcontractor_entries(
    pool: &Pool<Postgres>,
    project_id: i64,
) -> Result<Vec<SubcontractorEntry>, sqlx::Error> {
    sqlx::query_as::<_, SubcontractorEntry>(&format!(
        r#"
        SELECT {SUBCONTRACTOR_COLS}
        FROM subcontractor_entries
        WHERE project_id = $1 AND deleted_at IS NULL
        ORDER BY entry_date DESC, subcontractor_entry_id DESC
        "#
    ))
    .bind(project_id)
    .fetch_all(pool)
    .await
}

pub async fn delete_subcontractor_entry(
    pool: &Pool<Postgres>,
    subcontractor_entry_id: i64,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE subcontractor_entries SET deleted_at = NOW() WHERE subcontractor_entry_id = $1 AND deleted_at IS NULL",
    )
    .bind(subcontractor_entry_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/*==========Overhead Entry Queries=========== */

const OVERHEAD_COLS: &str =
    "overhead_entry_id, project_id, category_id, entry_date, cost, description, created_at";

pub async fn create_overhead_entry(
    pool: &Pool<Postgres>,
    project_id: i64,
    new: &NewOverheadEntry,
) -> Result<OverheadEntry, sqlx::Error> {
    sqlx::query_as::<_, OverheadEntry>(&format!(
        r#"
        INSERT INTO overhead_entries (project_id, category_id, entry_date, cost, description)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING {OVERHEAD_COLS}
        "#
    ))
    .bind(project_id)
    .bind(new.category_id)
    .bind(new.entry_date)
    .bind(new.cost)
    .bind(&new.description)
    .fetch_one(pool)
    .await
}

pub async fn list_overhead_entries(
    pool: &Pool<Postgres>,
    project_id: i64,
) -> Result<Vec<OverheadEntry>, sqlx::Error> {
    sqlx::query_as::<_, OverheadEntry>(&format!(
        r#"
        SELECT {OVERHEAD_COLS}
        FROM overhead_entries
        WHERE project_id = $1 AND deleted_at IS NULL
        ORDER BY entry_date DESC, overhead_entry_id DESC
        "#
    ))
    .bind(project_id)
    .fetch_all(pool)
    .await
}

pub async fn delete_overhead_entry(pool: &Pool<Postgres>, overhead_entry_id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE overhead_entries SET deleted_at = NOW() WHERE overhead_entry_id = $1 AND deleted_at IS NULL",
    )
    .bind(overhead_entry_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/*==========Progress Report / Material Queries=========== */

const REPORT_COLS: &str = "report_id, project_id, report_date, percent_complete, notes, created_at";

const MATERIAL_COLS: &str = "m.material_id, m.report_id, m.category_id, m.material_name, \
     m.quantity, m.unit, m.cost, r.report_date, m.created_at";

/* The report and its material lines are one atomic unit: if any material
insert fails, the whole report rolls back. */
pub async fn create_report_with_materials(
    pool: &Pool<Postgres>,
    project_id: i64,
    new: &NewProgressReport,
) -> Result<(ProgressReport, Vec<Material>), sqlx::Error> {
    let mut tx = pool.begin().await?;

    let report = sqlx::query_as::<_, ProgressReport>(&format!(
        r#"
        INSERT INTO progress_reports (project_id, report_date, percent_complete, notes)
        VALUES ($1, $2, $3, $4)
        RETURNING {REPORT_COLS}
        "#
    ))
    .bind(project_id)
    .bind(new.report_date)
    .bind(new.percent_complete)
    .bind(&new.notes)
    .fetch_one(&mut *tx)
    .await?;

    for material in &new.materials {
        sqlx::query(
            r#"
            INSERT INTO materials (report_id, category_id, material_name, quantity, unit, cost)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(report.report_id)
        .bind(material.category_id)
        .bind(&material.material_name)
        .bind(material.quantity)
        .bind(&material.unit)
        .bind(material.cost)
        .execute(&mut *tx)
        .await?;
    }

    let materials = sqlx::query_as::<_, Material>(&format!(
        r#"
        SELECT {MATERIAL_COLS}
        FROM materials m
        JOIN progress_reports r ON r.report_id = m.report_id
        WHERE m.report_id = $1
        ORDER BY m.material_id ASC
        "#
    ))
    .bind(report.report_id)
    .fetch_all(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok((report, materials))
}

pub async fn list_progress_reports(
    pool: &Pool<Postgres>,
    project_id: i64,
) -> Result<Vec<ProgressReport>, sqlx::Error> {
    sqlx::query_as::<_, ProgressReport>(&format!(
        r#"
        SELECT {REPORT_COLS}
        FROM progress_reports
        WHERE project_id = $1 AND deleted_at IS NULL
        ORDER BY report_date DESC, created_at DESC
        "#
    ))
    .bind(project_id)
    .fetch_all(pool)
    .await
}

pub async fn delete_progress_report(pool: &Pool<Postgres>, report_id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE progress_reports SET deleted_at = NOW() WHERE report_id = $1 AND deleted_at IS NULL",
    )
    .bind(report_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

// Materials belong to a project through their progress report.
pub async fn list_materials(pool: &Pool<Postgres>, project_id: i64) -> Result<Vec<Material>, sqlx::Error> {
    sqlx::query_as::<_, Material>(&format!(
        r#"
        SELECT {MATERIAL_COLS}
        FROM materials m
        JOIN progress_reports r ON r.report_id = m.report_id
        WHERE r.project_id = $1 AND r.deleted_at IS NULL
        ORDER BY r.report_date DESC, m.material_id DESC
        "#
    ))
    .bind(project_id)
    .fetch_all(pool)
    .await
}

/*==========Receipt Queries=========== */

const RECEIPT_COLS: &str = "receipt_id, project_id, source, file_path, original_filename, \
     gmail_message_id, status, vendor, receipt_date, subtotal, tax, total, line_items, \
     error_message, created_at";

pub async fn insert_receipt(
    pool: &Pool<Postgres>,
    project_id: i64,
    source: &str,
    file_path: &str,
    original_filename: Option<&str>,
    gmail_message_id: Option<&str>,
) -> Result<Receipt, sqlx::Error> {
    sqlx::query_as::<_, Receipt>(&format!(
        r#"
        INSERT INTO receipts (project_id, source, file_path, original_filename, gmail_message_id)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING {RECEIPT_COLS}
        "#
    ))
    .bind(project_id)
    .bind(source)
    .bind(file_path)
    .bind(original_filename)
    .bind(gmail_message_id)
    .fetch_one(pool)
    .await
}

pub async fn get_receipt(pool: &Pool<Postgres>, receipt_id: i64) -> Result<Receipt, sqlx::Error> {
    sqlx::query_as::<_, Receipt>(&format!(
        "SELECT {RECEIPT_COLS} FROM receipts WHERE receipt_id = $1 AND deleted_at IS NULL"
    ))
    .bind(receipt_id)
    .fetch_one(pool)
    .await
}

pub async fn list_receipts(pool: &Pool<Postgres>, project_id: i64) -> Result<Vec<Receipt>, sqlx::Error> {
    sqlx::query_as::<_, Receipt>(&format!(
        r#"
        SELECT {RECEIPT_COLS}
        FROM receipts
        WHERE project_id = $1 AND deleted_at IS NULL
        ORDER BY receipt_id DESC
        "#
    ))
    .bind(project_id)
    .fetch_all(pool)
    .await
}

pub async fn delete_receipt(pool: &Pool<Postgres>, receipt_id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE receipts SET deleted_at = NOW() WHERE receipt_id = $1 AND deleted_at IS NULL",
    )
    .bind(receipt_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

#[allow(clippy::too_many_arguments)]
pub async fn mark_receipt_processed(
    pool: &Pool<Postgres>,
    receipt_id: i64,
    vendor: Option<&str>,
    receipt_date: Option<NaiveDate>,
    subtotal: Option<Decimal>,
    tax: Option<Decimal>,
    total: Option<Decimal>,
    line_items: &serde_json::Value,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE receipts
        SET status = $2, vendor = $3, receipt_date = $4, subtotal = $5, tax = $6, total = $7,
            line_items = $8, error_message = NULL
        WHERE receipt_id = $1
        "#,
    )
    .bind(receipt_id)
    .bind(ReceiptStatus::Processed.as_str())
    .bind(vendor)
    .bind(receipt_date)
    .bind(subtotal)
    .bind(tax)
    .bind(total)
    .bind(line_items)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

// Analysis failures land in the receipt row, not on the uploader.
pub async fn mark_receipt_error(
    pool: &Pool<Postgres>,
    receipt_id: i64,
    message: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE receipts SET status = $2, error_message = $3 WHERE receipt_id = $1")
        .bind(receipt_id)
        .bind(ReceiptStatus::Error.as_str())
        .bind(message)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn gmail_receipt_exists(
    pool: &Pool<Postgres>,
    gmail_message_id: &str,
    filename: &str,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM receipts WHERE gmail_message_id = $1 AND original_filename = $2)",
    )
    .bind(gmail_message_id)
    .bind(filename)
    .fetch_one(pool)
    .await
}

/*==========Receipt Link Queries=========== */

pub async fn entry_exists(pool: &Pool<Postgres>, kind: EntryKind, entry_id: i64) -> Result<bool, sqlx::Error> {
    let sql = match kind {
        EntryKind::Timesheet => {
            "SELECT EXISTS(SELECT 1 FROM timesheets WHERE timesheet_id = $1 AND deleted_at IS NULL)"
        }
        EntryKind::EquipmentLog => {
            "SELECT EXISTS(SELECT 1 FROM equipment_logs WHERE equipment_log_id = $1 AND deleted_at IS NULL)"
        }
        EntryKind::SubcontractorEntry => {
            "SELECT EXISTS(SELECT 1 FROM subcontractor_entries WHERE subcontractor_entry_id = $1 AND deleted_at IS NULL)"
        }
        EntryKind::OverheadEntry => {
            "SELECT EXISTS(SELECT 1 FROM overhead_entries WHERE overhead_entry_id = $1 AND deleted_at IS NULL)"
        }
        EntryKind::Material => "SELECT EXISTS(SELECT 1 FROM materials WHERE material_id = $1)",
    };

    sqlx::query_scalar::<_, bool>(sql).bind(entry_id).fetch_one(pool).await
}

pub async fn create_receipt_link(
    pool: &Pool<Postgres>,
    receipt_id: i64,
    kind: EntryKind,
    entry_id: i64,
) -> Result<ReceiptLink, sqlx::Error> {
    sqlx::query_as::<_, ReceiptLink>(
        r#"
        INSERT INTO receipt_links (receipt_id, entry_kind, entry_id)
        VALUES ($1, $2, $3)
        RETURNING link_id, receipt_id, entry_kind, entry_id, created_at
        "#,
    )
    .bind(receipt_id)
    .bind(kind.as_str())
    .bind(entry_id)
    .fetch_one(pool)
    .await
}

pub async fn list_receipt_links(pool: &Pool<Postgres>, receipt_id: i64) -> Result<Vec<ReceiptLink>, sqlx::Error> {
    sqlx::query_as::<_, ReceiptLink>(
        r#"
        SELECT link_id, receipt_id, entry_kind, entry_id, created_at
        FROM receipt_links
        WHERE receipt_id = $1
        ORDER BY link_id ASC
        "#,
    )
    .bind(receipt_id)
    .fetch_all(pool)
    .await
}

pub async fn delete_receipt_link(pool: &Pool<Postgres>, link_id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM receipt_links WHERE link_id = $1")
        .bind(link_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/*==========Change Order Queries=========== */

const CHANGE_ORDER_COLS: &str =
    "change_order_id, project_id, description, amount, status, order_date, created_at";

pub async fn create_change_order(
    pool: &Pool<Postgres>,
    project_id: i64,
    new: &NewChangeOrder,
) -> Result<ChangeOrder, sqlx::Error> {
    sqlx::query_as::<_, ChangeOrder>(&format!(
        r#"
        INSERT INTO change_orders (project_id, description, amount, order_date)
        VALUES ($1, $2, $3, $4)
        RETURNING {CHANGE_ORDER_COLS}
        "#
    ))
    .bind(project_id)
    .bind(&new.description)
    .bind(new.amount)
    .bind(new.order_date)
    .fetch_one(pool)
    .await
}

pub async fn list_change_orders(pool: &Pool<Postgres>, project_id: i64) -> Result<Vec<ChangeOrder>, sqlx::Error> {
    sqlx::query_as::<_, ChangeOrder>(&format!(
        r#"
        SELECT {CHANGE_ORDER_COLS}
        FROM change_orders
        WHERE project_id = $1 AND deleted_at IS NULL
        ORDER BY order_date DESC, change_order_id DESC
        "#
    ))
    .bind(project_id)
    .fetch_all(pool)
    .await
}

pub async fn update_change_order_status(
    pool: &Pool<Postgres>,
    change_order_id: i64,
    status: &str,
) -> Result<ChangeOrder, sqlx::Error> {
    sqlx::query_as::<_, ChangeOrder>(&format!(
        r#"
        UPDATE change_orders
        SET status = $2
        WHERE change_order_id = $1 AND deleted_at IS NULL
        RETURNING {CHANGE_ORDER_COLS}
        "#
    ))
    .bind(change_order_id)
    .bind(status)
    .fetch_one(pool)
    .await
}

pub async fn delete_change_order(pool: &Pool<Postgres>, change_order_id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE change_orders SET deleted_at = NOW() WHERE change_order_id = $1 AND deleted_at IS NULL",
    )
    .bind(change_order_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}
