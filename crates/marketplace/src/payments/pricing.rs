//! Pricing breakdown shown on a receipt.

use domain::{PricingRow, CENTS_PER_DOLLAR};

/// One applied discount.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscountLine {
    pub coupon_name: String,
    pub percent_off: Option<f64>,
    pub amount_in_cents: i64,
}

/// Amounts reported for a checkout session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionAmounts {
    pub amount_total: Option<i64>,
    pub amount_subtotal: Option<i64>,
    pub discounts: Vec<DiscountLine>,
    /// Refunded amount from the expanded charge, when available
    pub refunded_in_cents: Option<i64>,
}

fn dollars(cents: i64) -> f64 {
    cents as f64 / CENTS_PER_DOLLAR as f64
}

fn row(label: impl Into<String>, cents: i64, emphasized: bool) -> PricingRow {
    PricingRow {
        label: label.into(),
        amount_in_dollars: dollars(cents),
        emphasized,
    }
}

/// Build the pricing rows for a purchase.
///
/// Discounts and a refund are listed as negative amounts between a subtotal and
/// the emphasized total. Without any of them only the total is shown.
pub fn pricing_rows(
    price_paid_in_cents: i32,
    refunded: bool,
    amounts: &SessionAmounts,
) -> Vec<PricingRow> {
    let price_paid = i64::from(price_paid_in_cents);
    let refund = match amounts.refunded_in_cents {
        Some(cents) => cents,
        None if refunded => price_paid,
        None => 0,
    };
    let total = amounts.amount_total.unwrap_or(price_paid) - refund;
    let subtotal = amounts.amount_subtotal.unwrap_or(price_paid);

    let mut adjustments: Vec<PricingRow> = amounts
        .discounts
        .iter()
        .map(|discount| {
            let label = match discount.percent_off {
                Some(percent) => format!("{} ({percent}% off)", discount.coupon_name),
                None => discount.coupon_name.clone(),
            };
            row(label, -discount.amount_in_cents, false)
        })
        .collect();
    if refund != 0 {
        adjustments.push(row("Refund", -refund, false));
    }

    if adjustments.is_empty() {
        return vec![row("Total", total, true)];
    }

    let mut rows = Vec::with_capacity(adjustments.len() + 2);
    rows.push(row("Subtotal", subtotal, false));
    rows.extend(adjustments);
    rows.push(row("Total", total, true));
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_purchase_shows_only_total() {
        let amounts = SessionAmounts {
            amount_total: Some(4900),
            amount_subtotal: Some(4900),
            ..Default::default()
        };
        let rows = pricing_rows(4900, false, &amounts);

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].label, "Total");
        assert_eq!(rows[0].amount_in_dollars, 49.0);
        assert!(rows[0].emphasized);
    }

    #[test]
    fn test_discount_rows_sit_between_subtotal_and_total() {
        let amounts = SessionAmounts {
            amount_total: Some(4000),
            amount_subtotal: Some(5000),
            discounts: vec![DiscountLine {
                coupon_name: "LAUNCH".into(),
                percent_off: Some(20.0),
                amount_in_cents: 1000,
            }],
            refunded_in_cents: None,
        };
        let rows = pricing_rows(4000, false, &amounts);

        let labels: Vec<&str> = rows.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, ["Subtotal", "LAUNCH (20% off)", "Total"]);
        assert_eq!(rows[1].amount_in_dollars, -10.0);
        assert_eq!(rows[2].amount_in_dollars, 40.0);
        assert!(!rows[0].emphasized);
    }

    #[test]
    fn test_refund_without_expanded_charge_uses_price_paid() {
        let rows = pricing_rows(2500, true, &SessionAmounts::default());

        let labels: Vec<&str> = rows.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, ["Subtotal", "Refund", "Total"]);
        assert_eq!(rows[0].amount_in_dollars, 25.0);
        assert_eq!(rows[1].amount_in_dollars, -25.0);
        assert_eq!(rows[2].amount_in_dollars, 0.0);
    }

    #[test]
    fn test_partial_refund_from_charge() {
        let amounts = SessionAmounts {
            amount_total: Some(3000),
            refunded_in_cents: Some(1000),
            ..Default::default()
        };
        let rows = pricing_rows(3000, false, &amounts);

        assert_eq!(rows.last().map(|r| r.amount_in_dollars), Some(20.0));
        assert!(rows.iter().any(|r| r.label == "Refund" && r.amount_in_dollars == -10.0));
    }
}
