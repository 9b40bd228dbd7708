//! GYA distribution: how a sale's revenue splits into cost, freight and
//! profit, and how much of that split has been earned at a given payment
//! state.
//!
//! The full split is fixed when the sale is written:
//!
//! - `cost    = unit_cost_price    × quantity` → capital vault
//! - `freight = unit_freight_price × quantity` → `flete_sur` (0 when freight does not apply)
//! - `profit  = unit_sale_price × quantity − cost − freight` → `utilidades`
//!
//! While the sale is partially paid only the *effective* share is credited:
//! each component scaled by `amount_paid / total_revenue`, rounded half away
//! from zero. A later payment credits the difference between the effective
//! share at the new cumulative amount and at the previous one, never a share
//! computed from the payment alone, so rounding cannot accumulate and the
//! cumulative credit equals the full split exactly once the sale is paid.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, ResultEngine};

/// One sold line, prices in minor units.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleItem {
    pub product: String,
    pub quantity: i64,
    pub unit_sale_price: i64,
    pub unit_cost_price: i64,
    #[serde(default)]
    pub unit_freight_price: i64,
    #[serde(default)]
    pub source_purchase_order_id: Option<Uuid>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Distribution {
    pub cost: i64,
    pub freight: i64,
    pub profit: i64,
}

impl Distribution {
    pub fn total(&self) -> i64 {
        self.cost + self.freight + self.profit
    }

    pub fn is_zero(&self) -> bool {
        self.cost == 0 && self.freight == 0 && self.profit == 0
    }

    /// Component-wise `self - rhs`; `None` on overflow.
    pub fn checked_sub(&self, rhs: &Distribution) -> Option<Distribution> {
        Some(Distribution {
            cost: self.cost.checked_sub(rhs.cost)?,
            freight: self.freight.checked_sub(rhs.freight)?,
            profit: self.profit.checked_sub(rhs.profit)?,
        })
    }

    /// Returns `true` when no component of `self` exceeds the one in `bound`.
    pub fn within(&self, bound: &Distribution) -> bool {
        self.cost <= bound.cost && self.freight <= bound.freight && self.profit <= bound.profit
    }
}

/// Result of splitting a list of sale items.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleBreakdown {
    pub total_revenue: i64,
    pub full: Distribution,
}

fn checked_line(unit: i64, quantity: i64) -> ResultEngine<i64> {
    unit.checked_mul(quantity)
        .ok_or_else(|| EngineError::Validation("sale amount overflow".to_string()))
}

fn checked_sum(a: i64, b: i64) -> ResultEngine<i64> {
    a.checked_add(b)
        .ok_or_else(|| EngineError::Validation("sale amount overflow".to_string()))
}

/// Split `items` into cost, freight and profit.
///
/// Rejects empty sales, non-positive quantities, negative prices, any line
/// sold at or below cost, and an aggregate loss.
pub fn compute_full_distribution(
    items: &[SaleItem],
    freight_applies: bool,
) -> ResultEngine<SaleBreakdown> {
    if items.is_empty() {
        return Err(EngineError::Validation(
            "a sale needs at least one item".to_string(),
        ));
    }

    let mut total_revenue = 0i64;
    let mut full = Distribution::default();
    for item in items {
        if item.product.trim().is_empty() {
            return Err(EngineError::Validation(
                "item product must not be empty".to_string(),
            ));
        }
        if item.quantity <= 0 {
            return Err(EngineError::Validation(format!(
                "quantity for '{}' must be > 0",
                item.product
            )));
        }
        if item.unit_sale_price < 0 || item.unit_cost_price < 0 || item.unit_freight_price < 0 {
            return Err(EngineError::Validation(format!(
                "prices for '{}' must be >= 0",
                item.product
            )));
        }
        if item.unit_sale_price <= item.unit_cost_price {
            return Err(EngineError::NegativeProfit(format!(
                "'{}' is sold at {} but costs {}",
                item.product, item.unit_sale_price, item.unit_cost_price
            )));
        }

        let revenue = checked_line(item.unit_sale_price, item.quantity)?;
        let cost = checked_line(item.unit_cost_price, item.quantity)?;
        let freight = if freight_applies {
            checked_line(item.unit_freight_price, item.quantity)?
        } else {
            0
        };

        total_revenue = checked_sum(total_revenue, revenue)?;
        full.cost = checked_sum(full.cost, cost)?;
        full.freight = checked_sum(full.freight, freight)?;
        full.profit = checked_sum(full.profit, revenue - cost - freight)?;
    }

    if full.profit < 0 {
        return Err(EngineError::NegativeProfit(format!(
            "freight exceeds margin: sale profit would be {}",
            full.profit
        )));
    }

    Ok(SaleBreakdown {
        total_revenue,
        full,
    })
}

/// `round(component × paid / total)`, half away from zero.
fn scale(component: i64, amount_paid: i64, total_revenue: i64) -> ResultEngine<i64> {
    let numerator = i128::from(component) * i128::from(amount_paid);
    let denominator = i128::from(total_revenue);
    let quotient = numerator / denominator;
    let remainder = numerator % denominator;
    let rounded = if 2 * remainder.abs() >= denominator {
        quotient + numerator.signum()
    } else {
        quotient
    };
    i64::try_from(rounded)
        .map_err(|_| EngineError::Validation("distribution overflow".to_string()))
}

/// The share of `full` earned once `amount_paid` of `total_revenue` has been
/// received.
pub fn compute_effective_distribution(
    full: &Distribution,
    amount_paid: i64,
    total_revenue: i64,
) -> ResultEngine<Distribution> {
    if amount_paid < 0 {
        return Err(EngineError::Validation(
            "amount paid must be >= 0".to_string(),
        ));
    }
    if total_revenue <= 0 {
        return Ok(Distribution::default());
    }
    if amount_paid > total_revenue {
        return Err(EngineError::Overpayment(format!(
            "paid {amount_paid} exceeds sale total {total_revenue}"
        )));
    }
    if amount_paid == total_revenue {
        return Ok(*full);
    }
    Ok(Distribution {
        cost: scale(full.cost, amount_paid, total_revenue)?,
        freight: scale(full.freight, amount_paid, total_revenue)?,
        profit: scale(full.profit, amount_paid, total_revenue)?,
    })
}

/// What a payment moving the cumulative amount from `previous_paid` to
/// `new_paid` must credit.
pub fn incremental_distribution(
    full: &Distribution,
    total_revenue: i64,
    previous_paid: i64,
    new_paid: i64,
) -> ResultEngine<Distribution> {
    if new_paid < previous_paid {
        return Err(EngineError::Validation(
            "cumulative payment cannot decrease".to_string(),
        ));
    }
    let before = compute_effective_distribution(full, previous_paid, total_revenue)?;
    let after = compute_effective_distribution(full, new_paid, total_revenue)?;
    after
        .checked_sub(&before)
        .ok_or_else(|| EngineError::Validation("distribution overflow".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn item(quantity: i64, sale: i64, cost: i64, freight: i64) -> SaleItem {
        SaleItem {
            product: "Cartucho 9mm".to_string(),
            quantity,
            unit_sale_price: sale,
            unit_cost_price: cost,
            unit_freight_price: freight,
            source_purchase_order_id: None,
        }
    }

    #[test]
    fn full_split_of_a_single_line() {
        let breakdown = compute_full_distribution(&[item(100, 50, 30, 5)], true).unwrap();
        assert_eq!(breakdown.total_revenue, 5_000);
        assert_eq!(
            breakdown.full,
            Distribution {
                cost: 3_000,
                freight: 500,
                profit: 1_500
            }
        );
    }

    #[test]
    fn freight_can_be_switched_off() {
        let breakdown = compute_full_distribution(&[item(100, 50, 30, 5)], false).unwrap();
        assert_eq!(breakdown.full.freight, 0);
        assert_eq!(breakdown.full.profit, 2_000);
    }

    #[test]
    fn line_at_cost_is_negative_profit() {
        let err = compute_full_distribution(&[item(1, 30, 30, 0)], true).unwrap_err();
        assert!(matches!(err, EngineError::NegativeProfit(_)));
    }

    #[test]
    fn freight_eating_the_margin_is_negative_profit() {
        let err = compute_full_distribution(&[item(10, 50, 45, 10)], true).unwrap_err();
        assert!(matches!(err, EngineError::NegativeProfit(_)));
    }

    #[test]
    fn malformed_items_are_validation_errors() {
        assert!(matches!(
            compute_full_distribution(&[], true),
            Err(EngineError::Validation(_))
        ));
        assert!(matches!(
            compute_full_distribution(&[item(0, 50, 30, 5)], true),
            Err(EngineError::Validation(_))
        ));
        assert!(matches!(
            compute_full_distribution(&[item(1, 50, -1, 5)], true),
            Err(EngineError::Validation(_))
        ));
    }

    #[test]
    fn half_payment_earns_half_of_each_component() {
        let full = Distribution {
            cost: 3_000,
            freight: 500,
            profit: 1_500,
        };
        let effective = compute_effective_distribution(&full, 2_500, 5_000).unwrap();
        assert_eq!(
            effective,
            Distribution {
                cost: 1_500,
                freight: 250,
                profit: 750
            }
        );
        let rest = incremental_distribution(&full, 5_000, 2_500, 5_000).unwrap();
        assert_eq!(rest, effective);
    }

    #[test]
    fn rounding_is_half_away_from_zero() {
        let full = Distribution {
            cost: 1,
            freight: 1,
            profit: 1,
        };
        // 1 × 1/2 = 0.5 → 1
        let effective = compute_effective_distribution(&full, 1, 2).unwrap();
        assert_eq!(effective.cost, 1);
        // 1 × 1/3 = 0.33 → 0
        let effective = compute_effective_distribution(&full, 1, 3).unwrap();
        assert_eq!(effective.cost, 0);
    }

    #[test]
    fn paying_more_than_the_total_is_overpayment() {
        let full = Distribution {
            cost: 10,
            freight: 0,
            profit: 10,
        };
        assert!(matches!(
            compute_effective_distribution(&full, 21, 20),
            Err(EngineError::Overpayment(_))
        ));
    }

    fn items_strategy() -> impl Strategy<Value = Vec<SaleItem>> {
        prop::collection::vec(
            (1i64..500, 0i64..10_000, 1i64..10_000).prop_flat_map(|(quantity, cost, margin)| {
                (0i64..margin).prop_map(move |freight| item(quantity, cost + margin, cost, freight))
            }),
            1..6,
        )
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: the full split always adds back up to the revenue and
        /// never reports a loss.
        #[test]
        fn full_split_sums_to_revenue(items in items_strategy(), freight_applies in any::<bool>()) {
            let breakdown = compute_full_distribution(&items, freight_applies).unwrap();
            prop_assert_eq!(breakdown.full.total(), breakdown.total_revenue);
            prop_assert!(breakdown.full.profit >= 0);
        }

        /// Property: crediting the increments of any sequence of partial
        /// payments never overshoots the full split and lands on it exactly
        /// when the sale is paid off.
        #[test]
        fn cumulative_increments_converge_to_full(
            items in items_strategy(),
            cuts in prop::collection::vec(1u32..100, 1..12),
        ) {
            let breakdown = compute_full_distribution(&items, true).unwrap();
            let total = breakdown.total_revenue;
            let weights: u64 = cuts.iter().map(|c| u64::from(*c)).sum();

            let mut paid = 0i64;
            let mut credited = Distribution::default();
            let mut acc = 0u64;
            for cut in &cuts {
                acc += u64::from(*cut);
                let target = i64::try_from(
                    i128::from(total) * i128::from(acc) / i128::from(weights)
                ).unwrap();
                let step = incremental_distribution(&breakdown.full, total, paid, target).unwrap();
                prop_assert!(step.cost >= 0 && step.freight >= 0 && step.profit >= 0);
                credited.cost += step.cost;
                credited.freight += step.freight;
                credited.profit += step.profit;
                paid = target;
                prop_assert!(credited.within(&breakdown.full));
            }
            prop_assert_eq!(paid, total);
            prop_assert_eq!(credited, breakdown.full);
        }
    }
}
