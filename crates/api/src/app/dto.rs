use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use fieldops_auth::UserProfile;
use fieldops_clients::Client;
use fieldops_core::{ClientId, DomainError, DomainResult};
use fieldops_interventions::{Intervention, InterventionFilter, InterventionStatus};
use fieldops_inventory::InventoryFilter;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Default, Deserialize)]
pub struct InventoryQuery {
    pub search: Option<String>,
    pub low_stock: Option<bool>,
}

impl From<InventoryQuery> for InventoryFilter {
    fn from(q: InventoryQuery) -> Self {
        InventoryFilter {
            search: non_empty(q.search),
            low_stock_only: q.low_stock.unwrap_or(false),
        }
    }
}

/// Query string of `GET /interventions`; empty values are ignored.
#[derive(Debug, Default, Deserialize)]
pub struct InterventionQuery {
    pub status: Option<String>,
    pub client_id: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub urgent: Option<bool>,
}

impl InterventionQuery {
    pub fn into_filter(self) -> DomainResult<InterventionFilter> {
        let status = non_empty(self.status)
            .map(|s| {
                s.parse::<InterventionStatus>()
                    .map_err(|e| DomainError::validation(e.to_string()))
            })
            .transpose()?;
        let client_id = non_empty(self.client_id)
            .map(|s| s.parse::<ClientId>())
            .transpose()?;

        Ok(InterventionFilter {
            status,
            client_id,
            start_date: parse_date("start_date", self.start_date)?,
            end_date: parse_date("end_date", self.end_date)?,
            urgent_only: self.urgent.unwrap_or(false),
        })
    }
}

fn parse_date(name: &str, raw: Option<String>) -> DomainResult<Option<NaiveDate>> {
    non_empty(raw)
        .map(|s| {
            NaiveDate::parse_from_str(&s, "%Y-%m-%d")
                .map_err(|_| DomainError::validation(format!("{name} must be YYYY-MM-DD")))
        })
        .transpose()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserProfile,
}

#[derive(Debug, Serialize)]
pub struct ClientWithInterventions {
    #[serde(flatten)]
    pub client: Client,
    pub interventions: Vec<Intervention>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_query_values_are_ignored() {
        let q = InterventionQuery {
            status: Some(String::new()),
            client_id: Some("  ".to_string()),
            ..Default::default()
        };
        assert_eq!(q.into_filter().unwrap(), InterventionFilter::default());
    }

    #[test]
    fn query_values_are_parsed() {
        let q = InterventionQuery {
            status: Some("in_progress".to_string()),
            start_date: Some("2026-10-01".to_string()),
            urgent: Some(true),
            ..Default::default()
        };
        let filter = q.into_filter().unwrap();
        assert_eq!(filter.status, Some(InterventionStatus::InProgress));
        assert_eq!(filter.start_date, NaiveDate::from_ymd_opt(2026, 10, 1));
        assert!(filter.urgent_only);
    }

    #[test]
    fn bad_status_or_date_is_a_validation_error() {
        let q = InterventionQuery {
            status: Some("lost".to_string()),
            ..Default::default()
        };
        assert!(matches!(q.into_filter(), Err(DomainError::Validation(_))));

        let q = InterventionQuery {
            end_date: Some("18/10/2026".to_string()),
            ..Default::default()
        };
        assert!(matches!(q.into_filter(), Err(DomainError::Validation(_))));
    }
}
