use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use fieldops_core::{require_fields, DomainError, DomainResult, Entity, InventoryItemId, Money};

/// Reorder threshold applied when the office does not give one.
pub const DEFAULT_MIN_QUANTITY: i64 = 5;

/// A stocked part.
///
/// `quantity` is the on-hand count. Material usage by interventions moves it
/// through [`InventoryItem::adjust`]; nothing clamps it at zero, so overselling
/// shows up as a negative count rather than a refused intervention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub id: InventoryItemId,
    pub name: String,
    pub reference: Option<String>,
    pub description: Option<String>,
    pub quantity: i64,
    pub min_quantity: i64,
    pub unit_price: Option<Money>,
    pub category: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InventoryItem {
    pub fn new(id: InventoryItemId, fields: ItemFields, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: fields.name,
            reference: fields.reference,
            description: fields.description,
            quantity: fields.quantity,
            min_quantity: fields.min_quantity,
            unit_price: fields.unit_price,
            category: fields.category,
            created_at: now,
            updated_at: now,
        }
    }

    /// Replace every editable field (PUT semantics), including the count.
    pub fn apply(&mut self, fields: ItemFields, now: DateTime<Utc>) {
        let created_at = self.created_at;
        *self = Self::new(self.id, fields, now);
        self.created_at = created_at;
    }

    /// Move the on-hand count by `delta` (negative when parts are consumed).
    ///
    /// Leaves the item untouched when the result does not fit in an `i64`.
    pub fn adjust(&mut self, delta: i64, now: DateTime<Utc>) -> DomainResult<()> {
        self.quantity = self.quantity.checked_add(delta).ok_or_else(|| {
            DomainError::invariant(format!(
                "stock of {} cannot move by {delta} from {}",
                self.id, self.quantity
            ))
        })?;
        self.updated_at = now;
        Ok(())
    }

    /// At or below the reorder threshold.
    pub fn is_low_stock(&self) -> bool {
        self.quantity <= self.min_quantity
    }
}

impl Entity for InventoryItem {
    type Id = InventoryItemId;

    fn id(&self) -> InventoryItemId {
        self.id
    }
}

/// Raw item payload as submitted by the office.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItemDetails {
    pub name: Option<String>,
    pub reference: Option<String>,
    pub description: Option<String>,
    pub quantity: Option<i64>,
    pub min_quantity: Option<i64>,
    pub unit_price: Option<serde_json::Value>,
    pub category: Option<String>,
}

/// Validated item fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemFields {
    pub name: String,
    pub reference: Option<String>,
    pub description: Option<String>,
    pub quantity: i64,
    pub min_quantity: i64,
    pub unit_price: Option<Money>,
    pub category: Option<String>,
}

impl ItemDetails {
    pub fn validate(self) -> DomainResult<ItemFields> {
        require_fields(&[
            ("name", self.name.as_deref().is_some_and(|n| !n.trim().is_empty())),
            ("quantity", self.quantity.is_some()),
        ])?;

        let min_quantity = self.min_quantity.unwrap_or(DEFAULT_MIN_QUANTITY);
        if min_quantity < 0 {
            return Err(DomainError::validation("min_quantity cannot be negative"));
        }

        let unit_price = match self.unit_price {
            None | Some(serde_json::Value::Null) => None,
            Some(v) => Some(Money::from_json(&v).ok_or_else(|| {
                DomainError::validation("unit_price must be a non-negative amount")
            })?),
        };

        Ok(ItemFields {
            name: self.name.unwrap_or_default().trim().to_string(),
            reference: optional(self.reference),
            description: optional(self.description),
            quantity: self.quantity.unwrap_or_default(),
            min_quantity,
            unit_price,
            category: optional(self.category),
        })
    }
}

fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Inventory listing filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InventoryFilter {
    pub search: Option<String>,
    pub low_stock_only: bool,
}

impl InventoryFilter {
    /// Case-insensitive substring match on name, reference and category.
    pub fn matches(&self, item: &InventoryItem) -> bool {
        if self.low_stock_only && !item.is_low_stock() {
            return false;
        }
        let Some(needle) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) else {
            return true;
        };
        let needle = needle.to_lowercase();
        [
            Some(item.name.as_str()),
            item.reference.as_deref(),
            item.category.as_deref(),
        ]
        .into_iter()
        .flatten()
        .any(|field| field.to_lowercase().contains(&needle))
    }

    /// SQL `ILIKE` pattern for the search term, if any.
    pub fn like_pattern(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{s}%"))
    }
}
