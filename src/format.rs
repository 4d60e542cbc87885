//! Display helpers shared by the marketplace pages.

use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;

use crate::error::Error;

/// Whole Kenyan shillings with thousands separators, e.g. `KES 12,500`.
///
/// Fractional amounts round to the nearest shilling.
#[must_use]
pub fn format_currency(amount: f64) -> String {
    let rounded = amount.round();
    let sign = if rounded < 0.0 { "-" } else { "" };
    // Saturating cast; amounts never approach u64::MAX.
    let whole = rounded.abs() as u64;
    format!("{sign}KES {}", group_thousands(whole))
}

fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Long date such as `October 18, 2026`.
pub fn format_date(at: OffsetDateTime) -> Result<String, Error> {
    Ok(at.format(format_description!(
        "[month repr:long] [day padding:none], [year]"
    ))?)
}

/// 24-hour clock such as `14:05`.
pub fn format_time(at: OffsetDateTime) -> Result<String, Error> {
    Ok(at.format(format_description!("[hour]:[minute]"))?)
}

/// Parse the backend's RFC 3339 timestamps.
pub fn parse_timestamp(raw: &str) -> Result<OffsetDateTime, Error> {
    Ok(OffsetDateTime::parse(raw, &Rfc3339)?)
}

/// Keep the first `limit` characters, marking the cut with `...`.
#[must_use]
pub fn truncate_text(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_owned(),
    }
}

/// Click-to-chat link opening WhatsApp with `message` prefilled.
#[must_use]
pub fn whatsapp_url(phone: &str, message: &str) -> String {
    format!(
        "https://wa.me/{}?text={}",
        phone.trim_start_matches('+'),
        urlencoding::encode(message)
    )
}
