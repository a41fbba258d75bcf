use chrono::{Local, NaiveDate};
use dotenvy::dotenv;
use rust_decimal::Decimal;
use std::str::FromStr;

use construction_budget_tracker::database::db::connection::get_db_pool;
use construction_budget_tracker::database::db::gmail::{self, ConnectionError};
use construction_budget_tracker::database::db::queries;
use construction_budget_tracker::database::models::{
    EntryKind, NewCategory, NewChangeOrder, NewEmployee, NewEquipmentLog, NewGmailConnection,
    NewMaterial, NewOverheadEntry, NewProgressReport, NewProject, NewSubcontractorEntry,
    NewTimesheet,
};
use construction_budget_tracker::stats;

/* Manual smoke test against a live Postgres (DATABASE_URL). Walks every
query path once, then hammers the Gmail singleton with concurrent creators. */

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let pool = get_db_pool().await?;

    sqlx::migrate!("./migrations").run(&pool).await?;
    println!("Migrations ran successfully!");

    let today: NaiveDate = Local::now().date_naive();
    let dec = |s: &str| Decimal::from_str(s).unwrap();

    // ----------------------------------------------------
    // TEST: CREATE PROJECT
    // ----------------------------------------------------
    println!("\n--- Testing: create_project ---");
    let project = queries::create_project(
        &pool,
        &NewProject {
            project_name: "Riverside Warehouse".to_string(),
            client_name: Some("Riverside Logistics".to_string()),
            address: None,
            total_budget: dec("100000"),
            labor_budget: dec("40000"),
            materials_budget: dec("25000"),
            equipment_budget: dec("15000"),
            subcontractors_budget: dec("15000"),
            overhead_budget: dec("5000"),
            start_date: today,
            end_date: None,
        },
    )
    .await?;
    println!("   > Project created, ID: {}", project.project_id);
    assert!(project.project_id > 0, "Failed to create Project, ID invalid.");

    let fetched = queries::get_project(&pool, project.project_id).await?;
    assert_eq!(fetched.project_name, "Riverside Warehouse");
    assert_eq!(fetched.total_budget, dec("100000"));

    // ----------------------------------------------------
    // TEST: EMPLOYEES
    // ----------------------------------------------------
    println!("\n--- Testing: create_employee / update_employee ---");
    let employee = queries::create_employee(
        &pool,
        &NewEmployee {
            employee_name: "Dana Cole".to_string(),
            trade: Some("carpenter".to_string()),
            hourly_rate: dec("32.50"),
        },
    )
    .await?;
    println!("   > Employee created, ID: {}", employee.employee_id);

    let employee =
        queries::update_employee(&pool, employee.employee_id, None, Some("site lead"), None).await?;
    assert_eq!(employee.trade.as_deref(), Some("site lead"));
    assert_eq!(employee.hourly_rate, dec("32.50"), "rate must survive a partial update");

    // ----------------------------------------------------
    // TEST: CATEGORIES
    // ----------------------------------------------------
    println!("\n--- Testing: create_category ---");
    let category = queries::create_category(
        &pool,
        project.project_id,
        &NewCategory {
            category_name: "Framing".to_string(),
            color: Some("#aa3300".to_string()),
        },
    )
    .await?;
    println!("   > Category created, ID: {}", category.category_id);

    // ----------------------------------------------------
    // TEST: COST ENTRIES
    // ----------------------------------------------------
    println!("\n--- Testing: create_timesheet (pay rate defaulted) ---");
    let timesheet = queries::create_timesheet(
        &pool,
        project.project_id,
        &NewTimesheet {
            employee_id: employee.employee_id,
            category_id: Some(category.category_id),
            work_date: today,
            hours: dec("8"),
            pay_rate: None,
            notes: None,
        },
    )
    .await?;
    assert_eq!(timesheet.pay_rate, dec("32.50"), "pay rate should come from the employee");
    assert_eq!(timesheet.amount(), dec("260"));

    println!("\n--- Testing: create_equipment_log ---");
    queries::create_equipment_log(
        &pool,
        project.project_id,
        &NewEquipmentLog {
            category_id: None,
            equipment_name: "excavator".to_string(),
            log_date: today,
            fuel_cost: dec("120.25"),
            rental_cost: dec("800"),
            notes: None,
        },
    )
    .await?;

    println!("\n--- Testing: create_subcontractor_entry ---");
    queries::create_subcontractor_entry(
        &pool,
        project.project_id,
        &NewSubcontractorEntry {
            category_id: None,
            company_name: "ACME Electric".to_string(),
            entry_date: today,
            cost: dec("4500"),
            description: Some("rough-in wiring".to_string()),
        },
    )
    .await?;

    println!("\n--- Testing: create_overhead_entry ---");
    queries::create_overhead_entry(
        &pool,
        project.project_id,
        &NewOverheadEntry {
            category_id: None,
            entry_date: today,
            cost: dec("99.99"),
            description: Some("site insurance".to_string()),
        },
    )
    .await?;

    // ----------------------------------------------------
    // TEST: PROGRESS REPORT WITH MATERIALS (atomic)
    // ----------------------------------------------------
    println!("\n--- Testing: create_report_with_materials ---");
    let (report, materials) = queries::create_report_with_materials(
        &pool,
        project.project_id,
        &NewProgressReport {
            report_date: today,
            percent_complete: 50,
            notes: None,
            materials: vec![
                NewMaterial {
                    category_id: Some(category.category_id),
                    material_name: "rebar".to_string(),
                    quantity: Some(dec("40")),
                    unit: Some("ea".to_string()),
                    cost: dec("500"),
                },
                NewMaterial {
                    category_id: None,
                    material_name: "concrete mix".to_string(),
                    quantity: None,
                    unit: None,
                    cost: dec("250.01"),
                },
            ],
        },
    )
    .await?;
    println!("   > Report {} with {} materials", report.report_id, materials.len());
    assert_eq!(materials.len(), 2);

    let listed = queries::list_materials(&pool, project.project_id).await?;
    assert_eq!(listed.len(), 2);

    // ----------------------------------------------------
    // TEST: STATS
    // ----------------------------------------------------
    println!("\n--- Testing: project_stats ---");
    let snapshot = stats::project_stats(&pool, project.project_id).await?;
    assert_eq!(snapshot.labor_spent, dec("260"));
    assert_eq!(snapshot.equipment_spent, dec("920.25"));
    assert_eq!(snapshot.subcontractors_spent, dec("4500"));
    assert_eq!(snapshot.overhead_spent, dec("99.99"));
    assert_eq!(snapshot.materials_spent, dec("750.01"));
    assert_eq!(snapshot.total_spent, dec("6530.25"));
    assert_eq!(snapshot.remaining, dec("93469.75"));
    assert_eq!(snapshot.percent_complete, 50);
    assert_eq!(snapshot.projected_final_cost, dec("13060.50"));
    assert_eq!(snapshot.spent_today, dec("6530.25"));
    assert_eq!(snapshot.days_since_start, 1);
    println!("   > total_spent = {}", snapshot.total_spent);

    let missing = stats::project_stats(&pool, 999_999_999).await;
    assert!(matches!(missing, Err(sqlx::Error::RowNotFound)), "missing project must be NotFound");

    // ----------------------------------------------------
    // TEST: CATEGORY DELETE LEAVES ENTRIES IN PLACE
    // ----------------------------------------------------
    println!("\n--- Testing: delete_category ---");
    assert!(queries::delete_category(&pool, category.category_id).await?);

    let snapshot = stats::project_stats(&pool, project.project_id).await?;
    assert_eq!(snapshot.total_spent, dec("6530.25"), "spend must survive category deletion");
    let uncategorized = snapshot
        .categories
        .iter()
        .find(|c| c.category_id.is_none())
        .expect("uncategorized bucket");
    assert_eq!(uncategorized.spent, snapshot.total_spent);
    println!("   > entries fell back to uncategorized");

    // ----------------------------------------------------
    // TEST: RECEIPTS AND LINKS
    // ----------------------------------------------------
    println!("\n--- Testing: receipts + links ---");
    let receipt = queries::insert_receipt(
        &pool,
        project.project_id,
        "upload",
        "./uploads/smoke-receipt.jpg",
        Some("smoke-receipt.jpg"),
        None,
    )
    .await?;
    assert_eq!(receipt.status, "pending");

    assert!(queries::entry_exists(&pool, EntryKind::Timesheet, timesheet.timesheet_id).await?);
    assert!(!queries::entry_exists(&pool, EntryKind::Material, 999_999_999).await?);

    let link = queries::create_receipt_link(
        &pool,
        receipt.receipt_id,
        EntryKind::Timesheet,
        timesheet.timesheet_id,
    )
    .await?;
    println!("   > Link created, ID: {}", link.link_id);

    let duplicate = queries::create_receipt_link(
        &pool,
        receipt.receipt_id,
        EntryKind::Timesheet,
        timesheet.timesheet_id,
    )
    .await;
    assert!(duplicate.is_err(), "duplicate link must hit the unique constraint");

    // ----------------------------------------------------
    // TEST: CHANGE ORDERS
    // ----------------------------------------------------
    println!("\n--- Testing: change orders ---");
    let order = queries::create_change_order(
        &pool,
        project.project_id,
        &NewChangeOrder {
            description: "additional loading dock".to_string(),
            amount: dec("12000"),
            order_date: today,
        },
    )
    .await?;
    let order = queries::update_change_order_status(&pool, order.change_order_id, "approved").await?;
    assert_eq!(order.status, "approved");

    // ----------------------------------------------------
    // TEST: GMAIL SINGLETON
    // ----------------------------------------------------
    println!("\n--- Testing: gmail create_active replaces the active row ---");
    let first = gmail::create_active(
        &pool,
        &NewGmailConnection {
            gmail_email: "office-a@example.com".to_string(),
            access_token: "token-a".to_string(),
            refresh_token: None,
        },
    )
    .await?;
    let second = gmail::create_active(
        &pool,
        &NewGmailConnection {
            gmail_email: "office-b@example.com".to_string(),
            access_token: "token-b".to_string(),
            refresh_token: None,
        },
    )
    .await?;

    let active = gmail::get_active(&pool).await?.expect("an active connection");
    assert_eq!(active.connection_id, second.connection_id);
    let replaced = gmail::get_by_id(&pool, first.connection_id).await?;
    assert!(!replaced.is_active, "previous connection must be deactivated");

    assert!(gmail::deactivate(&pool, second.connection_id).await?);
    assert!(gmail::get_active(&pool).await?.is_none());

    // ----------------------------------------------------
    // TEST: GMAIL SINGLETON UNDER CONCURRENCY
    // ----------------------------------------------------
    println!("\n--- Testing: 50 concurrent create_active calls ---");
    let mut tasks = tokio::task::JoinSet::new();
    for i in 0..50 {
        let pool = pool.clone();
        tasks.spawn(async move {
            gmail::create_active(
                &pool,
                &NewGmailConnection {
                    gmail_email: format!("racer-{i}@example.com"),
                    access_token: format!("token-{i}"),
                    refresh_token: None,
                },
            )
            .await
        });
    }

    let mut winners = 0;
    let mut contended = 0;
    while let Some(joined) = tasks.join_next().await {
        match joined? {
            Ok(_) => winners += 1,
            Err(ConnectionError::LockUnavailable) => contended += 1,
            Err(ConnectionError::Db(err)) => return Err(err.into()),
        }
    }

    let active_count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM gmail_connections WHERE is_active")
            .fetch_one(&pool)
            .await?;
    assert_eq!(active_count, 1, "singleton invariant violated under concurrency");
    println!("   > {winners} succeeded, {contended} gave up on the lock, exactly 1 active row");

    println!("\n--- All tests passed! ---");
    Ok(())
}
