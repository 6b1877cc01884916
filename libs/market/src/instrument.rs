/// A tracked market, identified by a short code and quoted through an
/// external symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instrument {
    pub code: String,
    pub symbol: String,
    pub tag: String,
}

impl Instrument {
    pub fn new(code: impl Into<String>, symbol: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            symbol: symbol.into(),
            tag: tag.into(),
        }
    }

    /// Label used in reports, e.g. `BTC/USD`.
    pub fn pair(&self) -> String {
        format!("{}/USD", self.code)
    }

    /// The fixed set of instruments reported by the bot.
    pub fn defaults() -> Vec<Instrument> {
        [
            ("BTC", "BTC-USD", "💰"),
            ("ETH", "ETH-USD", "💎"),
            ("BNB", "BNB-USD", "🟡"),
            ("SOL", "SOL-USD", "🟣"),
            // gold futures
            ("XAU", "GC=F", "🏅"),
        ]
        .into_iter()
        .map(|(code, symbol, tag)| Instrument::new(code, symbol, tag))
        .collect()
    }
}
