use anyhow::{Error, Result, bail};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{
    Client,
    header::{HeaderMap, HeaderValue, USER_AGENT},
};
use serde::Deserialize;

pub const DEFAULT_BASE_API: &str = "https://query1.finance.yahoo.com";

// only the latest close is ever read
const RECENT_RANGE: &str = "1d";
const RECENT_INTERVAL: &str = "1m";

const BROWSER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// Anything that can tell us the latest close for an external symbol.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    /// `Ok(None)` means the source answered but had no data.
    async fn latest_close(&self, symbol: &str) -> Result<Option<f64>>;
}

#[derive(Clone)]
pub struct QuoteClient {
    client: Client,
    base_api: String,
}

impl QuoteClient {
    pub fn new(base_api: String) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_AGENT));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(15))
            .build()?;

        Ok(Self { client, base_api })
    }

    /// Reads QUOTE_API_BASE_URL, falling back to the public Yahoo endpoint.
    pub fn from_env() -> Result<Self> {
        let base_api =
            std::env::var("QUOTE_API_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_API.to_string());
        Self::new(base_api)
    }

    /// The chart request for the most recent trading day at one-minute bars.
    pub fn request(&self, symbol: &str) -> reqwest::Result<reqwest::Request> {
        let url = format!(
            "{}/v8/finance/chart/{}",
            self.base_api.trim_end_matches('/'),
            symbol
        );

        self.client
            .get(url)
            .query(&[("range", RECENT_RANGE), ("interval", RECENT_INTERVAL)])
            .build()
    }

    pub async fn fetch_price(&self, symbol: &str) -> Result<Vec<Bar>, Error> {
        let req = self.request(symbol)?;

        let res: ChartResponse = self
            .client
            .execute(req)
            .await?
            .error_for_status()?
            .json()
            .await?;

        res.into_bars()
    }
}

#[async_trait]
impl QuoteSource for QuoteClient {
    async fn latest_close(&self, symbol: &str) -> Result<Option<f64>> {
        let bars = self.fetch_price(symbol).await?;
        Ok(bars.last().map(|b| b.close))
    }
}

//
// Match Yahoo chart API JSON
// GET /v8/finance/chart/{symbol}?range=1d&interval=1m
//
#[derive(Debug, Deserialize, Clone)]
pub struct ChartResponse {
    pub chart: Chart,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Chart {
    pub result: Option<Vec<ChartResult>>,
    pub error: Option<ChartError>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChartError {
    pub code: String,
    pub description: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChartResult {
    #[serde(default)]
    pub timestamp: Vec<i64>,
    pub indicators: Indicators,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Indicators {
    #[serde(default)]
    pub quote: Vec<QuoteSeries>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct QuoteSeries {
    #[serde(default)]
    pub close: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub close: f64,
}

impl ChartResponse {
    /// Flatten the first result into bars, dropping intervals without a close.
    pub fn into_bars(self) -> Result<Vec<Bar>> {
        if let Some(err) = self.chart.error {
            bail!("quote source error {}: {}", err.code, err.description);
        }

        let Some(result) = self.chart.result.and_then(|r| r.into_iter().next()) else {
            return Ok(Vec::new());
        };

        let closes = result
            .indicators
            .quote
            .into_iter()
            .next()
            .map(|q| q.close)
            .unwrap_or_default();

        let bars = result
            .timestamp
            .into_iter()
            .zip(closes)
            .filter_map(|(ts, close)| {
                Some(Bar {
                    timestamp: DateTime::from_timestamp(ts, 0)?,
                    close: close?,
                })
            })
            .collect();

        Ok(bars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(body: &str) -> Result<Vec<Bar>> {
        serde_json::from_str::<ChartResponse>(body)?.into_bars()
    }

    #[test]
    fn skips_intervals_without_close() {
        let bars = parse(
            r#"{"chart":{"result":[{"meta":{"symbol":"BTC-USD"},
                "timestamp":[1700000000,1700000060,1700000120],
                "indicators":{"quote":[{"close":[36500.5,null,36512.25],"open":[1,2,3]}]}}],
                "error":null}}"#,
        )
        .unwrap();

        assert_eq!(bars.len(), 2);
        assert_eq!(bars[1].close, 36512.25);
        assert_eq!(bars[1].timestamp.timestamp(), 1700000120);
    }

    #[test]
    fn missing_series_is_empty_not_error() {
        let bars = parse(
            r#"{"chart":{"result":[{"meta":{},"indicators":{"quote":[{}]}}],"error":null}}"#,
        )
        .unwrap();
        assert!(bars.is_empty());

        let bars = parse(r#"{"chart":{"result":null,"error":null}}"#).unwrap();
        assert!(bars.is_empty());
    }

    #[test]
    fn chart_error_is_reported() {
        let err = parse(
            r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("Not Found"));
    }

    #[test]
    fn request_targets_latest_day_of_minute_bars() {
        let client = QuoteClient::new("http://localhost:1/".to_string()).unwrap();
        let req = client.request("GC=F").unwrap();

        assert_eq!(req.method(), reqwest::Method::GET);
        assert_eq!(
            req.url().as_str(),
            "http://localhost:1/v8/finance/chart/GC=F?range=1d&interval=1m"
        );
    }
}
