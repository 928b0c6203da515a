// Formatting utilities shared by the chart and the table

use chrono::{DateTime, Local};

/// Arrival time as shown on the chart axis and in the table
pub fn format_time(timestamp: DateTime<Local>) -> String {
    timestamp.format("%H:%M:%S").to_string()
}

/// Format USD price for display
pub fn format_price(price: f64) -> String {
    format!("{:.2}", price)
}

/// Format fee rate (per KB) for display
pub fn format_fee(fee: f64) -> String {
    if fee.fract() == 0.0 {
        format!("{:.0}", fee)
    } else {
        format!("{:.2}", fee)
    }
}
