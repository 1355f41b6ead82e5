//! Price snapshots and display formatting.

use std::collections::HashMap;

/// Latest price per uppercase base asset (e.g. "BTC" -> 65000.0).
pub type PriceMap = HashMap<String, f64>;

/// Pair identifier per uppercase base asset (e.g. "BTC" -> "BTCUSDT").
pub type SymbolMap = HashMap<String, String>;

/// Format a quoted price for chat display.
///
/// Prices below 1 keep 8 decimals so small caps stay readable; everything
/// else gets 2 decimals. The integer part is grouped with commas.
pub fn format_price(price: f64) -> String {
    let decimals = if price.abs() < 1.0 { 8 } else { 2 };
    format_grouped(price, decimals)
}

/// Format `value` with a fixed number of decimals and comma thousand separators.
pub fn format_grouped(value: f64, decimals: usize) -> String {
    if !value.is_finite() {
        return value.to_string();
    }

    let formatted = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match formatted.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (formatted.as_str(), None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if value < 0.0 && formatted.chars().any(|c| c != '0' && c != '.') {
        "-"
    } else {
        ""
    };

    match frac_part {
        Some(frac) => format!("{}{}.{}", sign, grouped, frac),
        None => format!("{}{}", sign, grouped),
    }
}
