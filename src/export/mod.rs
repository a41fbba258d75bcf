use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::HashMap;

use crate::stats::CostRecords;

/// Renders every cost entry of a project as CSV, one row per entry in date
/// order, closing with a totals row. Category names are resolved the same way
/// the stats breakdown resolves them: missing or deleted categories read as
/// "uncategorized".
pub fn cost_entries_csv(records: &CostRecords) -> Result<Vec<u8>, csv::Error> {
    let category_names: HashMap<i64, &str> = records
        .categories
        .iter()
        .map(|c| (c.category_id, c.category_name.as_str()))
        .collect();
    let category_of = |category_id: Option<i64>| -> String {
        category_id
            .and_then(|id| category_names.get(&id).copied())
            .unwrap_or("uncategorized")
            .to_string()
    };

    let mut rows: Vec<(NaiveDate, &'static str, String, String, Decimal)> = Vec::new();
    for t in &records.timesheets {
        rows.push((
            t.work_date,
            "timesheet",
            format!("{} h @ {}/h", t.hours, t.pay_rate),
            category_of(t.category_id),
            t.amount(),
        ));
    }
    for e in &records.equipment_logs {
        rows.push((
            e.log_date,
            "equipment",
            e.equipment_name.clone(),
            category_of(e.category_id),
            e.amount(),
        ));
    }
    for e in &records.subcontractor_entries {
        rows.push((
            e.entry_date,
            "subcontractor",
            e.company_name.clone(),
            category_of(e.category_id),
            e.cost,
        ));
    }
    for e in &records.overhead_entries {
        rows.push((
            e.entry_date,
            "overhead",
            e.description.clone().unwrap_or_else(|| "overhead".to_string()),
            category_of(e.category_id),
            e.cost,
        ));
    }
    for m in &records.materials {
        rows.push((
            m.report_date,
            "material",
            m.material_name.clone(),
            category_of(m.category_id),
            m.cost,
        ));
    }
    rows.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["date", "kind", "description", "category", "amount"])?;

    let mut total = Decimal::ZERO;
    for (date, kind, description, category, amount) in &rows {
        total += *amount;
        writer.write_record([
            date.to_string().as_str(),
            kind,
            description,
            category,
            amount.to_string().as_str(),
        ])?;
    }
    writer.write_record(["", "total", "", "", total.to_string().as_str()])?;

    writer.flush()?;
    writer
        .into_inner()
        .map_err(|err| csv::Error::from(err.into_error()))
}
