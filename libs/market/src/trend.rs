#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Trend {
    Up,
    Down,
    Flat,
    FirstSeen,
    Unknown,
}

impl Trend {
    /// Compare a fresh price against the last stored observation.
    pub fn between(previous: Option<f64>, current: f64) -> Self {
        match previous {
            None => Trend::FirstSeen,
            Some(prev) if current > prev => Trend::Up,
            Some(prev) if current < prev => Trend::Down,
            Some(_) => Trend::Flat,
        }
    }

    pub fn glyph(&self) -> &'static str {
        match self {
            Trend::Up => "🔼",
            Trend::Down => "🔽",
            Trend::Flat | Trend::FirstSeen => "➡️",
            Trend::Unknown => "❓",
        }
    }
}

/// Round half away from zero to 2 decimals.
pub fn round_price(price: f64) -> f64 {
    (price * 100.0).round() / 100.0
}
