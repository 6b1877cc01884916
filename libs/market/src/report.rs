use std::fmt::Write as _;

use chrono::{DateTime, TimeZone};

use crate::tracker::Quote;

pub const LIVE_TITLE: &str = "💹 Live Market Prices";
pub const UPDATE_TITLE: &str = "📊 Market Update";
pub const DISCLAIMER: &str = "🚨 Trade Safely!";

const UNAVAILABLE_TAG: &str = "⚠️";

/// Render a snapshot as a chat message: header with timestamp, one line per
/// instrument, trailing disclaimer.
pub fn format_report<Tz>(quotes: &[Quote], title: &str, at: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let mut message = format!("{} ({}):\n\n", title, at.format("%Y-%m-%d %H:%M:%S"));

    for quote in quotes {
        let pair = quote.instrument.pair();
        let glyph = quote.trend.glyph();
        // writing into a String cannot fail
        let _ = match quote.price {
            Some(price) => writeln!(
                message,
                "{} {}: ${} {}",
                quote.instrument.tag,
                pair,
                format_usd(price),
                glyph
            ),
            None => writeln!(message, "{} {}: N/A {}", UNAVAILABLE_TAG, pair, glyph),
        };
    }

    message.push('\n');
    message.push_str(DISCLAIMER);
    message
}

/// `1234567.891` -> `1,234,567.89`
pub fn format_usd(amount: f64) -> String {
    let fixed = format!("{:.2}", amount.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if amount < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("{sign}{grouped}.{frac_part}")
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use chrono_tz::Asia::Bangkok;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{Instrument, Trend};

    fn quote(code: &str, tag: &str, price: Option<f64>, trend: Trend) -> Quote {
        Quote {
            instrument: Instrument::new(code, format!("{code}-USD"), tag),
            price,
            trend,
        }
    }

    #[test]
    fn groups_thousands() {
        assert_eq!(format_usd(0.5), "0.50");
        assert_eq!(format_usd(999.999), "1,000.00");
        assert_eq!(format_usd(64_123.4), "64,123.40");
        assert_eq!(format_usd(1_234_567.891), "1,234,567.89");
        assert_eq!(format_usd(-1234.5), "-1,234.50");
    }

    #[test]
    fn renders_full_report() {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 5).unwrap();
        let quotes = vec![
            quote("BTC", "💰", Some(64_123.4), Trend::Up),
            quote("ETH", "💎", Some(3_100.0), Trend::FirstSeen),
            quote("XAU", "🏅", None, Trend::Unknown),
        ];

        let expected = "📊 Market Update (2024-03-01 09:00:05):\n\n\
                        💰 BTC/USD: $64,123.40 🔼\n\
                        💎 ETH/USD: $3,100.00 ➡️\n\
                        ⚠️ XAU/USD: N/A ❓\n\
                        \n\
                        🚨 Trade Safely!";

        assert_eq!(format_report(&quotes, UPDATE_TITLE, &at), expected);
    }

    #[test]
    fn timestamp_uses_given_zone() {
        let at = Utc
            .with_ymd_and_hms(2024, 3, 1, 23, 30, 0)
            .unwrap()
            .with_timezone(&Bangkok);

        let text = format_report(&[], LIVE_TITLE, &at);
        assert!(text.starts_with("💹 Live Market Prices (2024-03-02 06:30:00):"));
        assert!(text.ends_with(DISCLAIMER));
    }
}
