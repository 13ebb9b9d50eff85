//! Dashboard aggregates over interventions.
//!
//! The Postgres store computes the same figures in SQL; these functions are
//! the reference used by the in-memory store and by tests.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use fieldops_core::Money;

use crate::intervention::Intervention;
use crate::status::InterventionStatus;

/// Window for counting a client as active.
pub const ACTIVE_CLIENT_MONTHS: u32 = 6;
/// Window for the monthly revenue chart.
pub const REVENUE_WINDOW_MONTHS: u32 = 12;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statistics {
    pub total_interventions: i64,
    pub interventions_this_month: i64,
    /// Completed or invoiced.
    pub completed_interventions: i64,
    /// Planned or in progress.
    pub pending_interventions: i64,
    /// Urgent and not yet completed.
    pub urgent_interventions: i64,
    /// Sum of `total_cost` over invoiced interventions.
    pub total_revenue: Money,
    pub revenue_this_month: Money,
    pub active_clients: i64,
    pub low_stock_items: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyRevenue {
    pub year: i32,
    pub month: u32,
    pub revenue: Money,
    pub intervention_count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeCount {
    #[serde(rename = "type")]
    pub kind: String,
    pub count: i64,
}

fn same_month(a: NaiveDate, b: NaiveDate) -> bool {
    a.year() == b.year() && a.month() == b.month()
}

fn count_where(interventions: &[Intervention], pred: impl Fn(&Intervention) -> bool) -> i64 {
    interventions.iter().filter(|i| pred(*i)).count() as i64
}

fn months_before(today: NaiveDate, months: u32) -> NaiveDate {
    today
        .checked_sub_months(Months::new(months))
        .unwrap_or(NaiveDate::MIN)
}

pub fn summarize(
    interventions: &[Intervention],
    low_stock_items: i64,
    today: NaiveDate,
) -> Statistics {
    let invoiced = || {
        interventions
            .iter()
            .filter(|i| i.status == InterventionStatus::Invoiced)
    };
    let active_since = months_before(today, ACTIVE_CLIENT_MONTHS);

    Statistics {
        total_interventions: interventions.len() as i64,
        interventions_this_month: count_where(interventions, |i| same_month(i.intervention_date, today)),
        completed_interventions: count_where(interventions, |i| i.status.is_closed()),
        pending_interventions: count_where(interventions, |i| i.status.is_pending()),
        urgent_interventions: count_where(interventions, |i| i.is_urgent && !i.status.is_closed()),
        total_revenue: invoiced().map(|i| i.total_cost).sum(),
        revenue_this_month: invoiced()
            .filter(|i| same_month(i.intervention_date, today))
            .map(|i| i.total_cost)
            .sum(),
        active_clients: interventions
            .iter()
            .filter(|i| i.intervention_date >= active_since)
            .map(|i| i.client_id)
            .collect::<HashSet<_>>()
            .len() as i64,
        low_stock_items,
    }
}

/// Invoiced revenue of the last twelve months, newest month first.
pub fn monthly_revenue(interventions: &[Intervention], today: NaiveDate) -> Vec<MonthlyRevenue> {
    let since = months_before(today, REVENUE_WINDOW_MONTHS);
    let mut buckets: BTreeMap<(i32, u32), (Money, i64)> = BTreeMap::new();
    for i in interventions
        .iter()
        .filter(|i| i.status == InterventionStatus::Invoiced && i.intervention_date >= since)
    {
        let key = (i.intervention_date.year(), i.intervention_date.month());
        let entry = buckets.entry(key).or_insert((Money::ZERO, 0));
        entry.0 = entry.0 + i.total_cost;
        entry.1 += 1;
    }
    buckets
        .into_iter()
        .rev()
        .map(|((year, month), (revenue, intervention_count))| MonthlyRevenue {
            year,
            month,
            revenue,
            intervention_count,
        })
        .collect()
}

/// Count per intervention type, most frequent first; ties by type name.
pub fn interventions_by_type(interventions: &[Intervention]) -> Vec<TypeCount> {
    let mut counts: HashMap<&str, i64> = HashMap::new();
    for i in interventions {
        *counts.entry(i.kind.as_str()).or_default() += 1;
    }
    let mut rows: Vec<TypeCount> = counts
        .into_iter()
        .map(|(kind, count)| TypeCount {
            kind: kind.to_string(),
            count,
        })
        .collect();
    rows.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.kind.cmp(&b.kind)));
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intervention::InterventionDraft;
    use chrono::Utc;
    use fieldops_core::{ClientId, InterventionId};
    use serde_json::json;

    fn intervention(
        client: ClientId,
        date: &str,
        kind: &str,
        status: InterventionStatus,
        urgent: bool,
        labor: i64,
    ) -> Intervention {
        let draft: InterventionDraft = serde_json::from_value(json!({
            "client_id": client.to_string(),
            "intervention_date": date,
            "type": kind,
            "status": status.as_str(),
            "problem_description": "x",
            "labor_cost": labor,
            "is_urgent": urgent,
        }))
        .unwrap();
        Intervention::new(InterventionId::new(), &draft.validate().unwrap(), Utc::now())
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()
    }

    fn sample() -> Vec<Intervention> {
        let a = ClientId::new();
        let b = ClientId::new();
        let c = ClientId::new();
        vec![
            intervention(a, "2026-10-02", "Fuite", InterventionStatus::Invoiced, false, 100),
            intervention(a, "2026-10-10", "Fuite", InterventionStatus::Planned, true, 40),
            intervention(b, "2026-09-20", "Chaudière", InterventionStatus::Invoiced, false, 250),
            intervention(b, "2026-09-21", "Chaudière", InterventionStatus::Completed, true, 60),
            intervention(c, "2025-01-05", "Débouchage", InterventionStatus::Invoiced, false, 80),
        ]
    }

    #[test]
    fn summary_counts() {
        let stats = summarize(&sample(), 3, today());
        assert_eq!(
            stats,
            Statistics {
                total_interventions: 5,
                interventions_this_month: 2,
                completed_interventions: 4,
                pending_interventions: 1,
                urgent_interventions: 1,
                total_revenue: Money::from_major(430),
                revenue_this_month: Money::from_major(100),
                active_clients: 2,
                low_stock_items: 3,
            }
        );
    }

    #[test]
    fn monthly_revenue_is_newest_first_and_windowed() {
        let rows = monthly_revenue(&sample(), today());
        assert_eq!(
            rows,
            vec![
                MonthlyRevenue {
                    year: 2026,
                    month: 10,
                    revenue: Money::from_major(100),
                    intervention_count: 1,
                },
                MonthlyRevenue {
                    year: 2026,
                    month: 9,
                    revenue: Money::from_major(250),
                    intervention_count: 1,
                },
            ]
        );
    }

    #[test]
    fn by_type_is_most_frequent_first() {
        let rows = interventions_by_type(&sample());
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].count, 2);
        assert_eq!(rows[2].kind, "Débouchage");
        assert_eq!(rows[2].count, 1);
    }

    #[test]
    fn empty_input_is_all_zero() {
        assert_eq!(summarize(&[], 0, today()), Statistics::default());
        assert!(monthly_revenue(&[], today()).is_empty());
    }
}
