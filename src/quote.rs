//! Client for the stock quote provider used by `/ticker`.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_QUOTE_API_URL: &str = "https://query1.finance.yahoo.com";

#[derive(Debug, Error)]
pub enum QuoteError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("provider returned HTTP {0}")]
    Status(u16),
    #[error("unexpected content type '{0}'")]
    ContentType(String),
    #[error("could not decode provider response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// A single quote as reported by the provider.
#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    pub symbol: String,
    pub name: String,
    pub price: f64,
    pub change_percent: f64,
    pub previous_close: f64,
    pub market_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteEnvelope {
    quote_response: QuoteResponse,
}

#[derive(Debug, Deserialize)]
struct QuoteResponse {
    #[serde(default)]
    result: Vec<RawQuote>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawQuote {
    symbol: String,
    long_name: Option<String>,
    short_name: Option<String>,
    regular_market_price: Option<f64>,
    #[serde(default)]
    regular_market_change_percent: f64,
    #[serde(default)]
    regular_market_previous_close: f64,
    regular_market_time: Option<i64>,
}

impl RawQuote {
    fn into_quote(self) -> Option<Quote> {
        let price = self.regular_market_price?;
        let name = self
            .long_name
            .or(self.short_name)
            .unwrap_or_else(|| self.symbol.clone());
        Some(Quote {
            symbol: self.symbol,
            name,
            price,
            change_percent: self.regular_market_change_percent,
            previous_close: self.regular_market_previous_close,
            market_time: self
                .regular_market_time
                .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0)),
        })
    }
}

#[derive(Clone, Debug)]
pub struct QuoteClient {
    http: reqwest::Client,
    base_url: String,
}

impl QuoteClient {
    /// Build a client against `base_url`. A zero `timeout` disables the
    /// request deadline.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> reqwest::Result<Self> {
        let mut builder = reqwest::Client::builder();
        if !timeout.is_zero() {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            http: builder.build()?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Look up `symbol`. `Ok(None)` means the provider knows nothing
    /// tradeable under that symbol.
    pub async fn fetch(&self, symbol: &str) -> Result<Option<Quote>, QuoteError> {
        let url = format!("{}/v7/finance/quote", self.base_url);
        let resp = self
            .http
            .get(&url)
            .query(&[("symbols", symbol)])
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(QuoteError::Status(status.as_u16()));
        }
        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        if !content_type.starts_with("application/json") {
            return Err(QuoteError::ContentType(content_type));
        }
        let text = resp.text().await?;
        let envelope: QuoteEnvelope = serde_json::from_str(&text)?;
        Ok(envelope
            .quote_response
            .result
            .into_iter()
            .find(|q| q.symbol.eq_ignore_ascii_case(symbol))
            .and_then(RawQuote::into_quote))
    }
}
