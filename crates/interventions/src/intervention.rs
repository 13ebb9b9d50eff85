use core::cmp::Ordering;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use fieldops_clients::Client;
use fieldops_core::{
    is_present, require_fields, ClientId, DomainError, DomainResult, Entity, InterventionId,
    Money, UserId,
};

use crate::costing::{compute_costs, Costs};
use crate::material::{MaterialDetail, MaterialLine, MaterialRecord};
use crate::status::InterventionStatus;

/// A field-service work order.
///
/// `materials_cost` and `total_cost` are derived from the material list and
/// recomputed on every create and update; they are never taken from input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intervention {
    pub id: InterventionId,
    pub client_id: ClientId,
    pub assigned_to: Option<UserId>,
    pub intervention_date: NaiveDate,
    pub intervention_time: Option<NaiveTime>,
    #[serde(rename = "type")]
    pub kind: String,
    pub status: InterventionStatus,
    pub problem_description: String,
    pub work_done: Option<String>,
    /// Hours on site.
    pub time_spent: Option<f64>,
    pub labor_cost: Option<Money>,
    pub materials_cost: Money,
    pub total_cost: Money,
    pub is_urgent: bool,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Intervention {
    /// A fresh intervention; status defaults to `planned`.
    pub fn new(id: InterventionId, fields: &InterventionFields, now: DateTime<Utc>) -> Self {
        let costs = fields.costs();
        Self {
            id,
            client_id: fields.client_id,
            assigned_to: fields.assigned_to,
            intervention_date: fields.intervention_date,
            intervention_time: fields.intervention_time,
            kind: fields.kind.clone(),
            status: fields.status.unwrap_or_default(),
            problem_description: fields.problem_description.clone(),
            work_done: fields.work_done.clone(),
            time_spent: fields.time_spent,
            labor_cost: fields.labor_cost,
            materials_cost: costs.materials_cost,
            total_cost: costs.total_cost,
            is_urgent: fields.is_urgent,
            notes: fields.notes.clone(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Replace every editable field and recompute the derived costs.
    ///
    /// An absent status keeps the current one.
    pub fn apply(&mut self, fields: &InterventionFields, now: DateTime<Utc>) {
        let status = fields.status.unwrap_or(self.status);
        let created_at = self.created_at;
        *self = Self::new(self.id, fields, now);
        self.status = status;
        self.created_at = created_at;
    }

    pub fn costs(&self) -> Costs {
        Costs {
            labor_cost: self.labor_cost.unwrap_or(Money::ZERO),
            materials_cost: self.materials_cost,
            total_cost: self.total_cost,
        }
    }
}

impl Entity for Intervention {
    type Id = InterventionId;

    fn id(&self) -> InterventionId {
        self.id
    }
}

/// Raw intervention payload as submitted by the office or a plumber.
///
/// Loosely typed on purpose: browser forms send numbers as strings and empty
/// strings for cleared fields.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InterventionDraft {
    pub client_id: Option<String>,
    pub assigned_to: Option<String>,
    pub intervention_date: Option<String>,
    pub intervention_time: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub status: Option<String>,
    pub problem_description: Option<String>,
    pub work_done: Option<String>,
    pub time_spent: Option<Value>,
    pub labor_cost: Option<Value>,
    pub is_urgent: Option<bool>,
    pub notes: Option<String>,
    pub materials: Option<Vec<MaterialLine>>,
}

/// Validated intervention fields plus the requested material list.
#[derive(Debug, Clone, PartialEq)]
pub struct InterventionFields {
    pub client_id: ClientId,
    pub assigned_to: Option<UserId>,
    pub intervention_date: NaiveDate,
    pub intervention_time: Option<NaiveTime>,
    pub kind: String,
    pub status: Option<InterventionStatus>,
    pub problem_description: String,
    pub work_done: Option<String>,
    pub time_spent: Option<f64>,
    pub labor_cost: Option<Money>,
    pub is_urgent: bool,
    pub notes: Option<String>,
    /// Full replacement list; an omitted list is treated as empty.
    pub materials: Vec<MaterialLine>,
}

impl InterventionFields {
    pub fn costs(&self) -> Costs {
        compute_costs(self.labor_cost, &self.materials)
    }
}

impl InterventionDraft {
    pub fn validate(self) -> DomainResult<InterventionFields> {
        require_fields(&[
            ("client_id", is_present(&self.client_id)),
            ("intervention_date", is_present(&self.intervention_date)),
            ("type", is_present(&self.kind)),
            ("problem_description", is_present(&self.problem_description)),
        ])?;

        let client_id = self.client_id.unwrap_or_default().parse::<ClientId>()?;
        let assigned_to = match optional(self.assigned_to) {
            Some(raw) => Some(raw.parse::<UserId>()?),
            None => None,
        };

        let date_raw = self.intervention_date.unwrap_or_default();
        let intervention_date = parse_date(&date_raw)
            .ok_or_else(|| DomainError::validation(format!("invalid intervention_date `{date_raw}`")))?;
        let intervention_time = match optional(self.intervention_time) {
            Some(raw) => Some(parse_time(&raw).ok_or_else(|| {
                DomainError::validation(format!("invalid intervention_time `{raw}`"))
            })?),
            None => None,
        };

        let status = match optional(self.status) {
            Some(raw) => Some(
                raw.parse::<InterventionStatus>()
                    .map_err(|e| DomainError::validation(e.to_string()))?,
            ),
            None => None,
        };

        let labor_cost = match self.labor_cost {
            Some(v) if !is_blank(&v) => Some(Money::from_json(&v).ok_or_else(|| {
                DomainError::validation("labor_cost must be a non-negative amount")
            })?),
            _ => None,
        };
        let time_spent = match self.time_spent {
            Some(v) if !is_blank(&v) => Some(parse_hours(&v).ok_or_else(|| {
                DomainError::validation("time_spent must be a non-negative number of hours")
            })?),
            _ => None,
        };

        let materials = self.materials.unwrap_or_default();
        if let Some(bad) = materials.iter().find(|line| line.quantity <= 0) {
            return Err(DomainError::validation(format!(
                "material quantity must be positive (inventory item {})",
                bad.inventory_id
            )));
        }

        Ok(InterventionFields {
            client_id,
            assigned_to,
            intervention_date,
            intervention_time,
            kind: self.kind.unwrap_or_default().trim().to_string(),
            status,
            problem_description: self.problem_description.unwrap_or_default().trim().to_string(),
            work_done: optional(self.work_done),
            time_spent,
            labor_cost,
            is_urgent: self.is_urgent.unwrap_or(false),
            notes: optional(self.notes),
            materials,
        })
    }
}

fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// Accepts `YYYY-MM-DD`, optionally followed by a time part (`2024-03-01T00:00:00Z`).
fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let day = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

fn parse_time(raw: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(raw, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
        .ok()
}

fn parse_hours(value: &Value) -> Option<f64> {
    let hours = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    (hours.is_finite() && hours >= 0.0).then_some(hours)
}

/// An intervention together with its persisted material lines.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InterventionWithMaterials {
    #[serde(flatten)]
    pub intervention: Intervention,
    pub materials: Vec<MaterialRecord>,
}

/// The plumber an intervention is assigned to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignee {
    pub id: UserId,
    pub first_name: String,
    pub last_name: String,
}

impl Assignee {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Listing row: the intervention plus who it is for and who does it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InterventionSummary {
    #[serde(flatten)]
    pub intervention: Intervention,
    pub client_first_name: String,
    pub client_last_name: String,
    pub client_phone: String,
    pub client_address: String,
    pub plumber_first_name: Option<String>,
    pub plumber_last_name: Option<String>,
}

impl InterventionSummary {
    pub fn new(intervention: Intervention, client: &Client, plumber: Option<&Assignee>) -> Self {
        Self {
            intervention,
            client_first_name: client.first_name.clone(),
            client_last_name: client.last_name.clone(),
            client_phone: client.phone.clone(),
            client_address: client.address.clone(),
            plumber_first_name: plumber.map(|p| p.first_name.clone()),
            plumber_last_name: plumber.map(|p| p.last_name.clone()),
        }
    }
}

/// Full intervention record, as shown on the detail page and in the report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InterventionDetail {
    #[serde(flatten)]
    pub intervention: Intervention,
    pub client: Client,
    pub plumber: Option<Assignee>,
    pub materials: Vec<MaterialDetail>,
}

/// Listing filter; every criterion is optional and they combine with AND.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InterventionFilter {
    pub status: Option<InterventionStatus>,
    pub client_id: Option<ClientId>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub urgent_only: bool,
}

impl InterventionFilter {
    pub fn matches(&self, intervention: &Intervention) -> bool {
        self.status.is_none_or(|s| intervention.status == s)
            && self.client_id.is_none_or(|c| intervention.client_id == c)
            && self
                .start_date
                .is_none_or(|d| intervention.intervention_date >= d)
            && self.end_date.is_none_or(|d| intervention.intervention_date <= d)
            && (!self.urgent_only || intervention.is_urgent)
    }
}

/// Most recent first: date descending, then time descending with untimed
/// interventions after timed ones on the same day.
pub fn listing_order(a: &Intervention, b: &Intervention) -> Ordering {
    b.intervention_date
        .cmp(&a.intervention_date)
        .then_with(|| match (a.intervention_time, b.intervention_time) {
            (Some(ta), Some(tb)) => tb.cmp(&ta),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
}
