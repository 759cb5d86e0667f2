//! Yahoo Finance market data adapter.
//!
//! Fetches OHLCV tables from Yahoo's v8 chart API using its `range` and
//! `interval` query parameters, with retries and exponential backoff.
//! Yahoo has no official API and may change the response format without
//! notice; the CSV adapter is the offline fallback.

use crate::domain::config_validation::timeout_from_secs;
use crate::domain::error::TickerCompareError;
use crate::domain::ohlcv::{Interval, Period, PriceRow, PriceTable};
use crate::ports::config_port::ConfigPort;
use crate::ports::market_data_port::MarketDataPort;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_BASE_URL: &str = "https://query2.finance.yahoo.com";

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

pub struct YahooAdapter {
    client: reqwest::blocking::Client,
    base_url: String,
    max_retries: u32,
    base_delay: Duration,
}

impl YahooAdapter {
    pub fn new(base_url: &str, timeout: Duration, max_retries: u32) -> Result<Self, TickerCompareError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()
            .map_err(|e| TickerCompareError::Retrieval {
                symbol: String::new(),
                reason: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            max_retries,
            base_delay: Duration::from_millis(500),
        })
    }

    /// Build from the `[yahoo]` config section.
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, TickerCompareError> {
        let base_url = config
            .get_string("yahoo", "base_url")
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let timeout = config.get_double("yahoo", "timeout_secs", 30.0);
        let max_retries = config.get_int("yahoo", "max_retries", 3).max(0) as u32;
        let timeout = timeout_from_secs("yahoo", "timeout_secs", timeout)?;
        Self::new(&base_url, timeout, max_retries)
    }

    fn chart_url(&self, symbol: &str, period: Period, interval: Interval) -> String {
        format!(
            "{}/v8/finance/chart/{symbol}?range={period}&interval={interval}",
            self.base_url
        )
    }

    fn fetch_with_retry(
        &self,
        symbol: &str,
        period: Period,
        interval: Interval,
    ) -> Result<PriceTable, TickerCompareError> {
        let url = self.chart_url(symbol, period, interval);
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = self.base_delay * 2u32.pow(attempt - 1);
                debug!(symbol, attempt, ?delay, "retrying chart request");
                std::thread::sleep(delay);
            }

            let resp = match self.client.get(&url).send() {
                Ok(resp) => resp,
                Err(e) if e.is_connect() || e.is_timeout() => {
                    warn!(symbol, error = %e, "chart request failed");
                    last_error = Some(retrieval(symbol, e.to_string()));
                    continue;
                }
                Err(e) => return Err(retrieval(symbol, e.to_string())),
            };

            let status = resp.status();
            if status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                warn!(symbol, %status, "chart request rejected");
                last_error = Some(retrieval(symbol, format!("HTTP {status} for {symbol}")));
                continue;
            }

            // Yahoo reports unknown symbols as 404 with a chart error body,
            // so only bail on statuses that carry no parseable payload.
            let body = resp.text().map_err(|e| retrieval(symbol, e.to_string()))?;
            let chart: ChartResponse = serde_json::from_str(&body).map_err(|e| {
                if status.is_success() {
                    retrieval(symbol, format!("failed to parse response for {symbol}: {e}"))
                } else {
                    retrieval(symbol, format!("HTTP {status} for {symbol}"))
                }
            })?;
            return parse_response(symbol, chart);
        }

        Err(last_error.unwrap_or_else(|| retrieval(symbol, "max retries exceeded".into())))
    }
}

fn retrieval(symbol: &str, reason: String) -> TickerCompareError {
    TickerCompareError::Retrieval {
        symbol: symbol.to_string(),
        reason,
    }
}

fn parse_response(symbol: &str, resp: ChartResponse) -> Result<PriceTable, TickerCompareError> {
    let result = match (resp.chart.result, resp.chart.error) {
        (_, Some(err)) => {
            return Err(retrieval(symbol, format!("{}: {}", err.code, err.description)));
        }
        (Some(result), None) => result,
        (None, None) => return Err(retrieval(symbol, "empty result with no error".into())),
    };

    let Some(data) = result.into_iter().next() else {
        return Ok(PriceTable::default());
    };

    // No timestamps means no bars in the requested range.
    let Some(timestamps) = data.timestamp else {
        return Ok(PriceTable::default());
    };

    let quote = data
        .indicators
        .quote
        .into_iter()
        .next()
        .ok_or_else(|| retrieval(symbol, "no quote data".into()))?;

    let mut rows = Vec::with_capacity(timestamps.len());
    for (i, &ts) in timestamps.iter().enumerate() {
        let date = chrono::DateTime::from_timestamp(ts, 0)
            .map(|dt| dt.naive_utc().date())
            .ok_or_else(|| retrieval(symbol, format!("invalid timestamp: {ts}")))?;

        let row = PriceRow {
            date,
            open: quote.open.get(i).copied().flatten(),
            high: quote.high.get(i).copied().flatten(),
            low: quote.low.get(i).copied().flatten(),
            close: quote.close.get(i).copied().flatten(),
            volume: quote.volume.get(i).copied().flatten(),
        };

        // Rows where every value is null are non-trading days.
        if row.open.is_none()
            && row.high.is_none()
            && row.low.is_none()
            && row.close.is_none()
            && row.volume.is_none()
        {
            continue;
        }
        rows.push(row);
    }

    Ok(PriceTable::new(rows))
}

impl MarketDataPort for YahooAdapter {
    fn fetch_table(
        &self,
        symbol: &str,
        period: Period,
        interval: Interval,
    ) -> Result<PriceTable, TickerCompareError> {
        self.fetch_with_retry(symbol, period, interval)
    }
}
