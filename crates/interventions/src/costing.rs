//! Derived cost fields.

use serde::Serialize;

use fieldops_core::Money;

use crate::material::MaterialLine;

/// Cost breakdown stored on an intervention.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Costs {
    pub labor_cost: Money,
    pub materials_cost: Money,
    pub total_cost: Money,
}

/// `materials_cost = Σ quantity × unit_price`, `total_cost = labor + materials`.
///
/// Absent labor counts as zero.
pub fn compute_costs(labor_cost: Option<Money>, materials: &[MaterialLine]) -> Costs {
    let labor_cost = labor_cost.unwrap_or(Money::ZERO);
    let materials_cost: Money = materials.iter().map(MaterialLine::line_total).sum();
    Costs {
        labor_cost,
        materials_cost,
        total_cost: labor_cost + materials_cost,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldops_core::InventoryItemId;
    use proptest::prelude::*;

    fn line(quantity: i64, unit_price: Money) -> MaterialLine {
        MaterialLine {
            inventory_id: InventoryItemId::new(),
            quantity,
            unit_price,
        }
    }

    #[test]
    fn labor_plus_materials() {
        let costs = compute_costs(
            Some(Money::from_major(50)),
            &[line(2, Money::from_major(5)), line(1, Money::from_major(20))],
        );
        assert_eq!(costs.materials_cost, Money::from_major(30));
        assert_eq!(costs.total_cost, Money::from_major(80));
    }

    #[test]
    fn no_labor_no_materials_is_zero() {
        assert_eq!(compute_costs(None, &[]), Costs::default());
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        #[test]
        fn total_is_labor_plus_line_totals(
            labor in proptest::option::of(0i64..1_000_000),
            lines in proptest::collection::vec((1i64..500, 0i64..100_000), 0..15),
        ) {
            let materials: Vec<_> = lines
                .iter()
                .map(|(qty, cents)| line(*qty, Money::from_cents(*cents)))
                .collect();
            let costs = compute_costs(labor.map(Money::from_cents), &materials);

            let expected_materials: i64 = lines.iter().map(|(q, c)| q * c).sum();
            prop_assert_eq!(costs.materials_cost.cents(), expected_materials);
            prop_assert_eq!(
                costs.total_cost.cents(),
                labor.unwrap_or(0) + expected_materials
            );
        }
    }
}
