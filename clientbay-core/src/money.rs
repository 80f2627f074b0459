//! Minor-unit currency formatting.
//!
//! All stored and computed amounts are integer minor units; this module is
//! the only place that divides by the minor-unit factor, and it exists for
//! display only.

/// Format a minor-unit amount for display, e.g. `format_minor(10000, "USD")`
/// is `"$100.00"`.
pub fn format_minor(amount: i64, currency: &str) -> String {
    let sign = if amount < 0 { "-" } else { "" };
    let major = (amount / 100).abs();
    let cents = (amount % 100).abs();
    match currency {
        "USD" => format!("{sign}${major}.{cents:02}"),
        "EUR" => format!("{sign}\u{20ac}{major}.{cents:02}"),
        "GBP" => format!("{sign}\u{a3}{major}.{cents:02}"),
        other => format!("{sign}{major}.{cents:02} {other}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_cents_with_two_digits() {
        assert_eq!(format_minor(10000, "USD"), "$100.00");
        assert_eq!(format_minor(5, "USD"), "$0.05");
        assert_eq!(format_minor(250, "EUR"), "\u{20ac}2.50");
    }

    #[test]
    fn unknown_currency_falls_back_to_code_suffix() {
        assert_eq!(format_minor(1999, "SEK"), "19.99 SEK");
    }

    #[test]
    fn negative_amounts_keep_the_sign_up_front() {
        assert_eq!(format_minor(-150, "USD"), "-$1.50");
    }
}
