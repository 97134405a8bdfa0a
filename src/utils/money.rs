/// Money helpers.
///
/// Amounts are stored as whole units of the listing currency (XAF has no
/// minor unit). Gateways that bill in minor units get converted at the edge.

/// Visit fee charged when a listing enables visits without setting an amount.
pub const DEFAULT_VISIT_FEE: i64 = 15_000;

/// Platform share of a visit fee, in percent.
pub const PLATFORM_FEE_PERCENT: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeSplit {
    pub visit_fee_amount: i64,
    pub platform_fee: i64,
    pub seller_payout: i64,
}

/// Splits a visit fee between the platform and the seller.
///
/// The platform fee is rounded half-up; the seller gets the remainder so the
/// two parts always add back to the original amount.
pub fn split_visit_fee(visit_fee_amount: i64) -> FeeSplit {
    let amount = visit_fee_amount.max(0);
    let platform_fee = (amount * PLATFORM_FEE_PERCENT + 50) / 100;

    FeeSplit {
        visit_fee_amount: amount,
        platform_fee,
        seller_payout: amount - platform_fee,
    }
}

/// Converts whole units to the minor unit a card gateway expects.
pub fn to_minor_units(amount: i64, currency: &str) -> i64 {
    if zero_decimal_currency(currency) {
        amount
    } else {
        amount * 100
    }
}

/// Inverse of [`to_minor_units`].
pub fn from_minor_units(amount: i64, currency: &str) -> i64 {
    if zero_decimal_currency(currency) {
        amount
    } else {
        amount / 100
    }
}

fn zero_decimal_currency(currency: &str) -> bool {
    matches!(
        currency.to_ascii_uppercase().as_str(),
        "XAF" | "XOF" | "JPY" | "KRW" | "RWF" | "UGX"
    )
}

pub fn format_amount(amount: i64, currency: &str) -> String {
    let digits = amount.abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let sign = if amount < 0 { "-" } else { "" };
    format!("{}{} {}", sign, grouped, currency.to_ascii_uppercase())
}
