//! Field-service interventions.
//!
//! Work orders, their material lines and the derived cost fields, plus the
//! read-side helpers built on them (listing filter, statistics, printable
//! report). Everything here is deterministic; persistence and the
//! inventory reconciliation transaction live in `fieldops-infra`.

pub mod costing;
pub mod intervention;
pub mod material;
pub mod report;
pub mod statistics;
pub mod status;

pub use costing::{compute_costs, Costs};
pub use intervention::{
    listing_order, Assignee, Intervention, InterventionDetail, InterventionDraft,
    InterventionFields, InterventionFilter, InterventionSummary, InterventionWithMaterials,
};
pub use material::{MaterialDetail, MaterialLine, MaterialRecord};
pub use report::{render_report, ReportOptions};
pub use statistics::{
    interventions_by_type, monthly_revenue, summarize, MonthlyRevenue, Statistics, TypeCount,
};
pub use status::{InterventionStatus, UnknownStatus};
