use chrono::{Local, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{Pool, Postgres};
use std::collections::HashMap;
use tokio::try_join;

use crate::database::db::queries;
use crate::database::models::{
    Category, EquipmentLog, Material, OverheadEntry, ProgressReport, Project, SubcontractorEntry,
    Timesheet,
};

/*
Budget-health snapshot for one project. Reads are fanned out concurrently and
the arithmetic runs over the fetched rows in one pass; everything is Decimal
so a thousand small entries sum to the same cents a calculator would give.
The computation is read-only and safe to re-run at any time.
 */

#[derive(Debug, Clone, Serialize)]
pub struct BudgetStats {
    pub project_id: i64,
    pub total_budget: Decimal,
    pub total_spent: Decimal,
    pub labor_spent: Decimal,
    pub equipment_spent: Decimal,
    pub subcontractors_spent: Decimal,
    pub overhead_spent: Decimal,
    pub materials_spent: Decimal,
    pub remaining: Decimal,
    pub percent_used: Decimal,
    pub percent_complete: i32,
    pub spent_today: Decimal,
    pub daily_burn_rate: Decimal,
    pub projected_final_cost: Decimal,
    pub variance: Decimal,
    pub days_since_start: i64,
    pub days_remaining: i64,
    pub budget_lines: Vec<BudgetLine>,
    pub categories: Vec<CategorySpend>,
}

/// One of the five built-in cost categories with its budget and spend.
#[derive(Debug, Clone, Serialize)]
pub struct BudgetLine {
    pub name: &'static str,
    pub budget: Decimal,
    pub spent: Decimal,
}

/// Per user-defined category spend; `category_id` None is the uncategorized
/// bucket, which also absorbs entries whose category was deleted.
#[derive(Debug, Clone, Serialize)]
pub struct CategorySpend {
    pub category_id: Option<i64>,
    pub category_name: String,
    pub color: Option<String>,
    pub spent: Decimal,
}

/// All cost-bearing rows of one project, as loaded by [`load_cost_records`].
pub struct CostRecords {
    pub timesheets: Vec<Timesheet>,
    pub equipment_logs: Vec<EquipmentLog>,
    pub subcontractor_entries: Vec<SubcontractorEntry>,
    pub overhead_entries: Vec<OverheadEntry>,
    pub progress_reports: Vec<ProgressReport>,
    pub materials: Vec<Material>,
    pub categories: Vec<Category>,
}

/// Fetch the project's cost-bearing rows with the reads running concurrently.
/// Each read covers a disjoint table, so no ordering between them matters.
pub async fn load_cost_records(
    pool: &Pool<Postgres>,
    project_id: i64,
) -> Result<CostRecords, sqlx::Error> {
    let (
        timesheets,
        equipment_logs,
        subcontractor_entries,
        overhead_entries,
        progress_reports,
        materials,
        categories,
    ) = try_join!(
        queries::list_timesheets(pool, project_id),
        queries::list_equipment_logs(pool, project_id),
        queries::list_subcontractor_entries(pool, project_id),
        queries::list_overhead_entries(pool, project_id),
        queries::list_progress_reports(pool, project_id),
        queries::list_materials(pool, project_id),
        queries::list_categories(pool, project_id),
    )?;

    Ok(CostRecords {
        timesheets,
        equipment_logs,
        subcontractor_entries,
        overhead_entries,
        progress_reports,
        materials,
        categories,
    })
}

/// Load and compute the stats for one project. Fails with `RowNotFound` when
/// the project does not exist; any read failure propagates as-is, no partial
/// results.
pub async fn project_stats(pool: &Pool<Postgres>, project_id: i64) -> Result<BudgetStats, sqlx::Error> {
    let project = queries::get_project(pool, project_id).await?;
    let records = load_cost_records(pool, project_id).await?;

    Ok(compute(&project, &records, Local::now().date_naive()))
}

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

pub fn compute(project: &Project, records: &CostRecords, today: NaiveDate) -> BudgetStats {
    let labor_spent: Decimal = records.timesheets.iter().map(Timesheet::amount).sum();
    let equipment_spent: Decimal = records.equipment_logs.iter().map(EquipmentLog::amount).sum();
    let subcontractors_spent: Decimal = records.subcontractor_entries.iter().map(|e| e.cost).sum();
    let overhead_spent: Decimal = records.overhead_entries.iter().map(|e| e.cost).sum();
    let materials_spent: Decimal = records.materials.iter().map(|m| m.cost).sum();

    let total_spent =
        labor_spent + equipment_spent + subcontractors_spent + overhead_spent + materials_spent;
    let remaining = project.total_budget - total_spent;

    // A zero or negative budget would divide by zero here. Creation rejects
    // those, and any row that slips through reports 0% rather than NaN.
    let percent_used = if project.total_budget > Decimal::ZERO {
        (total_spent / project.total_budget * HUNDRED).round_dp(2)
    } else {
        Decimal::ZERO
    };

    // Newest report wins; same-day reports tie-break on creation time.
    let percent_complete = records
        .progress_reports
        .iter()
        .max_by_key(|r| (r.report_date, r.created_at, r.report_id))
        .map(|r| r.percent_complete)
        .unwrap_or(0);

    let spent_today = sum_for_date(records, today);

    // Day one counts as one elapsed day, so the rate never divides by zero.
    let days_since_start = (today - project.start_date).num_days().max(1);
    let daily_burn_rate = (total_spent / Decimal::from(days_since_start)).round_dp(2);

    // Linear extrapolation from reported progress. With no progress yet the
    // best estimate is the budget itself.
    let projected_final_cost = if percent_complete == 0 {
        project.total_budget
    } else {
        (total_spent / Decimal::from(percent_complete) * HUNDRED).round_dp(2)
    };
    let variance = projected_final_cost - project.total_budget;

    let days_remaining = project
        .end_date
        .map(|end| (end - today).num_days().max(0))
        .unwrap_or(0);

    let budget_lines = vec![
        BudgetLine { name: "labor", budget: project.labor_budget, spent: labor_spent },
        BudgetLine { name: "materials", budget: project.materials_budget, spent: materials_spent },
        BudgetLine { name: "equipment", budget: project.equipment_budget, spent: equipment_spent },
        BudgetLine {
            name: "subcontractors",
            budget: project.subcontractors_budget,
            spent: subcontractors_spent,
        },
        BudgetLine { name: "overhead", budget: project.overhead_budget, spent: overhead_spent },
    ];

    BudgetStats {
        project_id: project.project_id,
        total_budget: project.total_budget,
        total_spent,
        labor_spent,
        equipment_spent,
        subcontractors_spent,
        overhead_spent,
        materials_spent,
        remaining,
        percent_used,
        percent_complete,
        spent_today,
        daily_burn_rate,
        projected_final_cost,
        variance,
        days_since_start,
        days_remaining,
        budget_lines,
        categories: category_breakdown(records),
    }
}

fn sum_for_date(records: &CostRecords, date: NaiveDate) -> Decimal {
    let mut sum = Decimal::ZERO;
    sum += records
        .timesheets
        .iter()
        .filter(|t| t.work_date == date)
        .map(Timesheet::amount)
        .sum::<Decimal>();
    sum += records
        .equipment_logs
        .iter()
        .filter(|e| e.log_date == date)
        .map(EquipmentLog::amount)
        .sum::<Decimal>();
    sum += records
        .subcontractor_entries
        .iter()
        .filter(|e| e.entry_date == date)
        .map(|e| e.cost)
        .sum::<Decimal>();
    sum += records
        .overhead_entries
        .iter()
        .filter(|e| e.entry_date == date)
        .map(|e| e.cost)
        .sum::<Decimal>();
    sum += records
        .materials
        .iter()
        .filter(|m| m.report_date == date)
        .map(|m| m.cost)
        .sum::<Decimal>();
    sum
}

/// Group every cost entry by its user category. Entries without one (or whose
/// category has since been deleted) land in the uncategorized bucket.
fn category_breakdown(records: &CostRecords) -> Vec<CategorySpend> {
    let mut by_category: HashMap<Option<i64>, Decimal> = HashMap::new();

    let mut add = |category_id: Option<i64>, amount: Decimal| {
        *by_category.entry(category_id).or_insert(Decimal::ZERO) += amount;
    };

    for t in &records.timesheets {
        add(t.category_id, t.amount());
    }
    for e in &records.equipment_logs {
        add(e.category_id, e.amount());
    }
    for e in &records.subcontractor_entries {
        add(e.category_id, e.cost);
    }
    for e in &records.overhead_entries {
        add(e.category_id, e.cost);
    }
    for m in &records.materials {
        add(m.category_id, m.cost);
    }

    let known: HashMap<i64, &Category> =
        records.categories.iter().map(|c| (c.category_id, c)).collect();

    let mut breakdown: Vec<CategorySpend> = records
        .categories
        .iter()
        .map(|c| CategorySpend {
            category_id: Some(c.category_id),
            category_name: c.category_name.clone(),
            color: Some(c.color.clone()),
            spent: by_category.get(&Some(c.category_id)).copied().unwrap_or(Decimal::ZERO),
        })
        .collect();

    // Spend tagged with an id no longer in the categories table counts as
    // uncategorized too.
    let uncategorized: Decimal = by_category
        .iter()
        .filter(|(id, _)| match id {
            Some(id) => !known.contains_key(id),
            None => true,
        })
        .map(|(_, amount)| *amount)
        .sum();

    breakdown.push(CategorySpend {
        category_id: None,
        category_name: "uncategorized".to_string(),
        color: None,
        spent: uncategorized,
    });

    breakdown
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::from_str(s).unwrap()
    }

    fn project(total_budget: &str, start: &str, end: Option<&str>) -> Project {
        Project {
            project_id: 1,
            project_name: "Riverside Warehouse".to_string(),
            client_name: None,
            address: None,
            total_budget: dec(total_budget),
            labor_budget: Decimal::ZERO,
            materials_budget: Decimal::ZERO,
            equipment_budget: Decimal::ZERO,
            subcontractors_budget: Decimal::ZERO,
            overhead_budget: Decimal::ZERO,
            start_date: date(start),
            end_date: end.map(date),
            status: "active".to_string(),
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    fn empty_records() -> CostRecords {
        CostRecords {
            timesheets: vec![],
            equipment_logs: vec![],
            subcontractor_entries: vec![],
            overhead_entries: vec![],
            progress_reports: vec![],
            materials: vec![],
            categories: vec![],
        }
    }

    fn timesheet(id: i64, hours: &str, pay_rate: &str, work_date: &str, category_id: Option<i64>) -> Timesheet {
        Timesheet {
            timesheet_id: id,
            project_id: 1,
            employee_id: 1,
            category_id,
            work_date: date(work_date),
            hours: dec(hours),
            pay_rate: dec(pay_rate),
            notes: None,
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap(),
        }
    }

    fn report(id: i64, percent: i32, report_date: &str, created_hour: u32) -> ProgressReport {
        ProgressReport {
            report_id: id,
            project_id: 1,
            report_date: date(report_date),
            percent_complete: percent,
            notes: None,
            created_at: Utc.with_ymd_and_hms(2024, 6, 1, created_hour, 0, 0).unwrap(),
        }
    }

    #[test]
    fn empty_project_has_zero_spend_and_full_budget_remaining() {
        let stats = compute(&project("100000", "2024-01-01", None), &empty_records(), date("2024-03-01"));

        assert_eq!(stats.total_spent, Decimal::ZERO);
        assert_eq!(stats.remaining, dec("100000"));
        assert_eq!(stats.percent_used, Decimal::ZERO);
        assert_eq!(stats.percent_complete, 0);
        assert_eq!(stats.spent_today, Decimal::ZERO);
        assert_eq!(stats.daily_burn_rate, Decimal::ZERO);
        // No progress reported: projection is the budget itself.
        assert_eq!(stats.projected_final_cost, dec("100000"));
        assert_eq!(stats.variance, Decimal::ZERO);
    }

    #[test]
    fn single_timesheet_scenario() {
        // 8h at 25/h on a 100 000 budget.
        let mut records = empty_records();
        records.timesheets.push(timesheet(1, "8", "25", "2024-01-01", None));

        let stats = compute(&project("100000", "2024-01-01", None), &records, date("2024-01-01"));

        assert_eq!(stats.labor_spent, dec("200"));
        assert_eq!(stats.total_spent, dec("200"));
        assert_eq!(stats.remaining, dec("99800"));
        assert_eq!(stats.percent_used, dec("0.2"));
        // Entry dated today counts into spent_today.
        assert_eq!(stats.spent_today, dec("200"));
    }

    #[test]
    fn total_spent_is_sum_of_the_five_category_sums() {
        let mut records = empty_records();
        records.timesheets.push(timesheet(1, "10", "30.50", "2024-02-01", None));
        records.equipment_logs.push(EquipmentLog {
            equipment_log_id: 1,
            project_id: 1,
            category_id: None,
            equipment_name: "excavator".to_string(),
            log_date: date("2024-02-02"),
            fuel_cost: dec("120.25"),
            rental_cost: dec("800"),
            notes: None,
            created_at: Utc.with_ymd_and_hms(2024, 2, 2, 0, 0, 0).unwrap(),
        });
        records.subcontractor_entries.push(SubcontractorEntry {
            subcontractor_entry_id: 1,
            project_id: 1,
            category_id: None,
            company_name: "ACME Electric".to_string(),
            entry_date: date("2024-02-03"),
            cost: dec("4500.10"),
            description: None,
            created_at: Utc.with_ymd_and_hms(2024, 2, 3, 0, 0, 0).unwrap(),
        });
        records.overhead_entries.push(OverheadEntry {
            overhead_entry_id: 1,
            project_id: 1,
            category_id: None,
            entry_date: date("2024-02-04"),
            cost: dec("99.99"),
            description: None,
            created_at: Utc.with_ymd_and_hms(2024, 2, 4, 0, 0, 0).unwrap(),
        });
        records.materials.push(Material {
            material_id: 1,
            report_id: 1,
            category_id: None,
            material_name: "rebar".to_string(),
            quantity: None,
            unit: None,
            cost: dec("750.01"),
            report_date: date("2024-02-05"),
            created_at: Utc.with_ymd_and_hms(2024, 2, 5, 0, 0, 0).unwrap(),
        });

        let stats = compute(&project("100000", "2024-01-01", None), &records, date("2024-03-01"));

        assert_eq!(
            stats.total_spent,
            stats.labor_spent
                + stats.equipment_spent
                + stats.subcontractors_spent
                + stats.overhead_spent
                + stats.materials_spent
        );
        assert_eq!(stats.labor_spent, dec("305"));
        assert_eq!(stats.equipment_spent, dec("920.25"));
        assert_eq!(stats.total_spent, dec("6575.35"));
    }

    #[test]
    fn percent_used_never_decreases_when_entries_are_added() {
        let p = project("50000", "2024-01-01", None);
        let mut records = empty_records();
        let mut last = Decimal::ZERO;

        for id in 1..=20 {
            records.timesheets.push(timesheet(id, "3.5", "41.75", "2024-02-01", None));
            let stats = compute(&p, &records, date("2024-03-01"));
            assert!(stats.percent_used >= last);
            last = stats.percent_used;
        }
    }

    #[test]
    fn projection_scenario_fifty_percent_complete() {
        // 30 000 spent at 50% complete on a 50 000 budget.
        let mut records = empty_records();
        records.overhead_entries.push(OverheadEntry {
            overhead_entry_id: 1,
            project_id: 1,
            category_id: None,
            entry_date: date("2024-02-01"),
            cost: dec("30000"),
            description: None,
            created_at: Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap(),
        });
        records.progress_reports.push(report(1, 50, "2024-06-01", 9));

        let stats = compute(&project("50000", "2024-01-01", None), &records, date("2024-06-02"));

        assert_eq!(stats.projected_final_cost, dec("60000"));
        assert_eq!(stats.variance, dec("10000"));
    }

    #[test]
    fn projection_falls_back_to_budget_at_zero_percent() {
        let mut records = empty_records();
        records.overhead_entries.push(OverheadEntry {
            overhead_entry_id: 1,
            project_id: 1,
            category_id: None,
            entry_date: date("2024-02-01"),
            cost: dec("42000"),
            description: None,
            created_at: Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap(),
        });
        records.progress_reports.push(report(1, 0, "2024-06-01", 9));

        let stats = compute(&project("50000", "2024-01-01", None), &records, date("2024-06-02"));

        assert_eq!(stats.projected_final_cost, dec("50000"));
        assert_eq!(stats.variance, Decimal::ZERO);
    }

    #[test]
    fn burn_rate_divides_by_at_least_one_day() {
        let mut records = empty_records();
        records.timesheets.push(timesheet(1, "8", "25", "2024-01-01", None));

        // Project started today: one elapsed day, not zero.
        let stats = compute(&project("100000", "2024-01-01", None), &records, date("2024-01-01"));
        assert_eq!(stats.days_since_start, 1);
        assert_eq!(stats.daily_burn_rate, dec("200"));

        // Ten days in, the same spend averages out.
        let stats = compute(&project("100000", "2024-01-01", None), &records, date("2024-01-11"));
        assert_eq!(stats.days_since_start, 10);
        assert_eq!(stats.daily_burn_rate, dec("20"));
    }

    #[test]
    fn newest_report_wins_and_same_day_ties_break_on_creation_time() {
        let mut records = empty_records();
        records.progress_reports.push(report(1, 30, "2024-05-01", 9));
        records.progress_reports.push(report(2, 45, "2024-06-01", 9));
        records.progress_reports.push(report(3, 40, "2024-06-01", 8));

        let stats = compute(&project("50000", "2024-01-01", None), &records, date("2024-06-02"));

        // Report 2 is newest by (date, created_at).
        assert_eq!(stats.percent_complete, 45);
    }

    #[test]
    fn zero_budget_reports_zero_percent_used_instead_of_dividing() {
        let mut p = project("100000", "2024-01-01", None);
        p.total_budget = Decimal::ZERO;
        let mut records = empty_records();
        records.timesheets.push(timesheet(1, "8", "25", "2024-01-01", None));

        let stats = compute(&p, &records, date("2024-01-02"));

        assert_eq!(stats.percent_used, Decimal::ZERO);
        assert_eq!(stats.remaining, dec("-200"));
    }

    #[test]
    fn days_remaining_clamps_at_zero_after_the_end_date() {
        let stats = compute(
            &project("100000", "2024-01-01", Some("2024-06-01")),
            &empty_records(),
            date("2024-07-01"),
        );
        assert_eq!(stats.days_remaining, 0);

        let stats = compute(
            &project("100000", "2024-01-01", Some("2024-06-01")),
            &empty_records(),
            date("2024-05-22"),
        );
        assert_eq!(stats.days_remaining, 10);
    }

    #[test]
    fn breakdown_buckets_by_category_with_uncategorized_fallback() {
        let mut records = empty_records();
        records.categories.push(Category {
            category_id: 7,
            project_id: 1,
            category_name: "Foundation".to_string(),
            color: "#aa3300".to_string(),
        });
        records.timesheets.push(timesheet(1, "8", "25", "2024-02-01", Some(7)));
        records.timesheets.push(timesheet(2, "4", "25", "2024-02-01", None));
        // Entry tagged with a category that was deleted since.
        records.timesheets.push(timesheet(3, "2", "50", "2024-02-01", Some(99)));

        let stats = compute(&project("100000", "2024-01-01", None), &records, date("2024-03-01"));

        let foundation = stats
            .categories
            .iter()
            .find(|c| c.category_id == Some(7))
            .expect("known category present");
        assert_eq!(foundation.spent, dec("200"));
        assert_eq!(foundation.color.as_deref(), Some("#aa3300"));

        let uncategorized = stats
            .categories
            .iter()
            .find(|c| c.category_id.is_none())
            .expect("uncategorized bucket present");
        assert_eq!(uncategorized.spent, dec("200"));
    }

    #[test]
    fn budget_lines_carry_the_per_category_budgets() {
        let mut p = project("100000", "2024-01-01", None);
        p.labor_budget = dec("40000");
        let mut records = empty_records();
        records.timesheets.push(timesheet(1, "8", "25", "2024-02-01", None));

        let stats = compute(&p, &records, date("2024-03-01"));

        let labor = stats.budget_lines.iter().find(|l| l.name == "labor").unwrap();
        assert_eq!(labor.budget, dec("40000"));
        assert_eq!(labor.spent, dec("200"));
    }
}
