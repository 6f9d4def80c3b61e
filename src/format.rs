//! Display formatting for amounts, dates and period tags.
//!
//! Numbers follow vi-VN conventions: `.` groups thousands, `,` separates
//! decimals. Currency is the dong, shown without fraction digits.

use chrono::NaiveDate;

/// Decimal places kept by `format_number`.
const DISPLAY_SCALE: f64 = 1000.0;

/// `value` rounded to the precision `format_number` shows.
pub fn round_for_display(value: f64) -> f64 {
    (value * DISPLAY_SCALE).round() / DISPLAY_SCALE
}

/// Group thousands with `.`, keep up to three decimals after a `,`.
pub fn format_number(value: f64) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }

    let scaled = (value.abs() * DISPLAY_SCALE).round() as u128;
    let whole = scaled / 1000;
    let fraction = scaled % 1000;

    let mut out = group_thousands(whole);
    if fraction > 0 {
        let digits = format!("{:03}", fraction);
        out.push(',');
        out.push_str(digits.trim_end_matches('0'));
    }
    if value < 0.0 && scaled > 0 {
        out.insert(0, '-');
    }
    out
}

/// Whole-dong amount with the currency sign, e.g. `15.234.500 ₫`.
pub fn format_currency(amount: f64) -> String {
    format!("{} ₫", format_number(amount.round()))
}

/// `DD/MM/YYYY`.
pub fn format_date(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

/// Compact `YYYYMMDD` token used to group and filter records.
pub fn period_tag(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

/// Period a new debt is filed under: first day of the current month.
pub fn default_debt_period(today: NaiveDate) -> String {
    today.format("%Y%m01").to_string()
}

/// Parse an ISO `YYYY-MM-DD` form value.
pub fn parse_iso_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok()
}

fn group_thousands(n: u128) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push('.');
        }
        out.push(ch);
    }
    out
}
