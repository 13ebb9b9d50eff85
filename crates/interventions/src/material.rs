use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use fieldops_core::{InterventionId, InventoryItemId, MaterialLineId, Money};

/// One requested material usage: `quantity` units of an inventory item at a
/// snapshot price.
///
/// The price is whatever the form sent; a missing or unusable price counts as
/// zero rather than rejecting the line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialLine {
    pub inventory_id: InventoryItemId,
    pub quantity: i64,
    #[serde(default, deserialize_with = "fieldops_core::money::lenient")]
    pub unit_price: Money,
}

impl MaterialLine {
    pub fn line_total(&self) -> Money {
        self.unit_price.times(self.quantity)
    }
}

/// A persisted material line attached to an intervention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialRecord {
    pub id: MaterialLineId,
    pub intervention_id: InterventionId,
    pub inventory_id: InventoryItemId,
    pub quantity: i64,
    pub unit_price: Money,
    pub created_at: DateTime<Utc>,
}

impl MaterialRecord {
    pub fn new(
        intervention_id: InterventionId,
        line: &MaterialLine,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: MaterialLineId::new(),
            intervention_id,
            inventory_id: line.inventory_id,
            quantity: line.quantity,
            unit_price: line.unit_price,
            created_at: now,
        }
    }

    pub fn line(&self) -> MaterialLine {
        MaterialLine {
            inventory_id: self.inventory_id,
            quantity: self.quantity,
            unit_price: self.unit_price,
        }
    }

    pub fn line_total(&self) -> Money {
        self.unit_price.times(self.quantity)
    }
}

/// A material line joined with the inventory item it draws from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MaterialDetail {
    #[serde(flatten)]
    pub record: MaterialRecord,
    pub name: String,
    pub reference: Option<String>,
    /// The item's current catalogue price, next to the snapshot.
    pub item_unit_price: Option<Money>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_or_bad_price_counts_as_free() {
        let id = InventoryItemId::new();
        let line: MaterialLine =
            serde_json::from_value(json!({ "inventory_id": id, "quantity": 3 })).unwrap();
        assert_eq!(line.unit_price, Money::ZERO);

        let line: MaterialLine = serde_json::from_value(
            json!({ "inventory_id": id, "quantity": 3, "unit_price": "abc" }),
        )
        .unwrap();
        assert_eq!(line.line_total(), Money::ZERO);

        let line: MaterialLine = serde_json::from_value(
            json!({ "inventory_id": id, "quantity": 3, "unit_price": -4 }),
        )
        .unwrap();
        assert_eq!(line.unit_price, Money::ZERO);
    }

    #[test]
    fn string_prices_are_accepted() {
        let line: MaterialLine = serde_json::from_value(json!({
            "inventory_id": InventoryItemId::new(),
            "quantity": 2,
            "unit_price": "12.50"
        }))
        .unwrap();
        assert_eq!(line.line_total(), Money::from_cents(2500));
    }

    #[test]
    fn record_keeps_the_snapshot() {
        let line = MaterialLine {
            inventory_id: InventoryItemId::new(),
            quantity: 4,
            unit_price: Money::from_major(3),
        };
        let record = MaterialRecord::new(InterventionId::new(), &line, Utc::now());
        assert_eq!(record.line(), line);
        assert_eq!(record.line_total(), Money::from_major(12));
    }
}
