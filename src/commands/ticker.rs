//! `/ticker [-period=<N>d|<N>Y] [-interval=<N>] SYMBOL`: current quote plus a chart.

use std::fmt;

use axum::response::Response;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

use super::{CommandHandler, Invocation};
use crate::delivery::Rendered;
use crate::error::CommandError;
use crate::payload::{Attachment, ResponsePayload};
use crate::quote::{Quote, QuoteClient, QuoteError};

const USAGE: &str = "Usage: /ticker [-period=<N>d|<N>Y] [-interval=<N>] [symbol]";

static SYMBOL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z0-9.]+$").unwrap());

/// Chart time span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Days(u32),
    Years(u32),
}

impl Default for Period {
    fn default() -> Self {
        Period::Days(1)
    }
}

impl Period {
    fn parse(raw: &str) -> Option<Self> {
        let split = raw.len().checked_sub(1)?;
        if !raw.is_char_boundary(split) {
            return None;
        }
        let (count, unit) = raw.split_at(split);
        let count: u32 = count.parse().ok().filter(|n| *n > 0)?;
        match unit {
            "d" | "D" => Some(Period::Days(count)),
            "y" | "Y" => Some(Period::Years(count)),
            _ => None,
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Period::Days(n) => write!(f, "{}d", n),
            Period::Years(n) => write!(f, "{}y", n),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickerRequest {
    pub symbol: String,
    pub period: Period,
    /// Chart data interval. `None` leaves it to the chart service.
    pub interval: Option<u32>,
}

/// Parse the argument text of a `/ticker` invocation.
///
/// Options come first and accept both `-period=5d` and `-period 5d`;
/// `-interval` takes a non-negative integer the same way.
pub fn parse_ticker_command(text: &str) -> Result<TickerRequest, CommandError> {
    let mut tokens = text.split_whitespace().peekable();
    let mut period = Period::default();
    let mut interval = None;

    while let Some(token) = tokens.next_if(|t| t.len() > 1 && t.starts_with('-')) {
        let flag = token.trim_start_matches('-');
        let (name, inline_value) = match flag.split_once('=') {
            Some((name, value)) => (name, Some(value)),
            None => (flag, None),
        };
        if !matches!(name, "period" | "interval") {
            return Err(CommandError::bad_request(format!(
                "Unknown option '{}'",
                token
            )));
        }
        let value = match inline_value {
            Some(v) => v,
            None => tokens.next().ok_or_else(|| CommandError::bad_request(USAGE))?,
        };
        match name {
            "period" => {
                period = Period::parse(value).ok_or_else(|| {
                    CommandError::bad_request(format!(
                        "Invalid period '{}' (expected e.g. 1d, 5d, 1Y, 5Y)",
                        value
                    ))
                })?;
            }
            _ => {
                interval = Some(value.parse::<u32>().map_err(|_| {
                    CommandError::bad_request(format!(
                        "Invalid interval '{}' (expected a non-negative integer)",
                        value
                    ))
                })?);
            }
        }
    }

    let symbols: Vec<&str> = tokens.collect();
    let symbol = match symbols.as_slice() {
        [] => return Err(CommandError::bad_request(USAGE)),
        [one] => one.to_uppercase(),
        _ => {
            return Err(CommandError::bad_request(
                "Only one ticker symbol may be requested",
            ))
        }
    };
    if !SYMBOL_RE.is_match(&symbol) {
        return Err(CommandError::bad_request(
            "Invalid ticker symbol (letters, numbers, and '.' only)",
        ));
    }
    Ok(TickerRequest {
        symbol,
        period,
        interval,
    })
}

/// Turn a quote lookup into something presentable.
pub fn render_quote(
    req: &TickerRequest,
    lookup: Result<Option<Quote>, QuoteError>,
    now: DateTime<Utc>,
) -> Rendered {
    let quote = match lookup {
        Err(err) => {
            return Rendered::Failed(format!(
                "Ticker symbol lookup failed for `{}`: {}",
                req.symbol, err
            ))
        }
        Ok(None) => return Rendered::Failed(format!("Unknown ticker symbol `{}`", req.symbol)),
        Ok(Some(quote)) => quote,
    };

    let (emoji, color) = if quote.change_percent < 0.0 {
        (":chart_with_downwards_trend:", "danger")
    } else {
        (":chart_with_upwards_trend:", "good")
    };
    let as_of = quote
        .market_time
        .map(|t| t.format("%H:%M UTC %Y-%m-%d").to_string())
        .unwrap_or_else(|| "an unknown time".to_string());
    let change = format!(
        "{:+.2}% from previous close of {:.2}",
        quote.change_percent, quote.previous_close
    );

    Rendered::Ready(ResponsePayload::in_channel(vec![Attachment {
        fallback: Some(format!(
            "{} ({}): {:.2} ({}) as of {}",
            quote.symbol, quote.name, quote.price, change, as_of
        )),
        pretext: Some(format!(
            "{} *<https://finance.yahoo.com/quote/{}|{} - {}>*",
            emoji, quote.symbol, quote.symbol, quote.name
        )),
        text: Some(format!("*{:.2}* _({})_\n{}", quote.price, change, as_of)),
        color: Some(color.to_string()),
        // `fresh` defeats caching of the chart image.
        image_url: Some(format!(
            "https://chart.finance.yahoo.com/z?s={}&t={}&q=l&z=l{}&fresh={}",
            quote.symbol,
            req.period,
            req.interval.map(|i| format!("&i={}", i)).unwrap_or_default(),
            now.timestamp()
        )),
        mrkdwn_in: vec!["text".to_string(), "pretext".to_string()],
    }]))
}

pub struct TickerCommand {
    quotes: QuoteClient,
}

impl TickerCommand {
    pub fn new(quotes: QuoteClient) -> Self {
        Self { quotes }
    }
}

#[async_trait::async_trait]
impl CommandHandler for TickerCommand {
    async fn handle(&self, invocation: &Invocation<'_>) -> Result<Response, CommandError> {
        let req = parse_ticker_command(invocation.form.text.as_deref().unwrap_or(""))?;
        let quotes = self.quotes.clone();
        let request_id = invocation.context.request_id;
        invocation
            .deliver(async move {
                let lookup = quotes.fetch(&req.symbol).await;
                if let Err(err) = &lookup {
                    tracing::warn!(request_id, symbol = %req.symbol, error = %err, "quote lookup failed");
                }
                render_quote(&req, lookup, Utc::now())
            })
            .await
    }
}
