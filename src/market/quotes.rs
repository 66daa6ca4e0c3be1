//! Finance API client: availability probe and quote fetching.
//!
//! The API is addressed through a named connection whose `extra` carries the
//! probe endpoint and auth headers. Responses are the provider's nested JSON;
//! the fields this pipeline depends on are `finance.result` (availability
//! probe) and `chart.result[0]` (quote data).

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

/// Timeout for individual API requests.
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors that can occur talking to the finance API.
#[derive(Debug, Error)]
pub enum MarketError {
    #[error("Invalid header in connection extras: {0}")]
    InvalidHeader(String),

    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Malformed API response: {0}")]
    MalformedResponse(String),

    #[error("No price data for symbol '{0}'")]
    SymbolMissing(String),
}

/// Builds an HTTP client carrying the connection's auth headers on every
/// request.
///
/// # Errors
///
/// Returns `MarketError::InvalidHeader` if a header name or value is not
/// representable, and `MarketError::Request` if the client cannot be built.
pub fn build_client(headers: &HashMap<String, String>) -> Result<Client, MarketError> {
    let mut header_map = HeaderMap::new();
    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| MarketError::InvalidHeader(format!("{name}: {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| MarketError::InvalidHeader(format!("{name}: {e}")))?;
        header_map.insert(name, value);
    }

    let client = Client::builder()
        .default_headers(header_map)
        .timeout(HTTP_TIMEOUT)
        .build()?;

    Ok(client)
}

/// Evaluates the availability condition on a probe response.
///
/// The probe endpoint reports a null `finance.result` exactly when the API is
/// serving; a populated result is an error payload.
///
/// # Errors
///
/// Returns `MarketError::MalformedResponse` if the nesting is absent.
pub fn availability_condition(response: &Value) -> Result<bool, MarketError> {
    let result = response
        .get("finance")
        .ok_or_else(|| MarketError::MalformedResponse("missing 'finance' field".to_string()))?
        .get("result")
        .ok_or_else(|| MarketError::MalformedResponse("missing 'finance.result' field".to_string()))?;

    Ok(result.is_null())
}

/// Extracts the quote record from a chart response.
///
/// # Errors
///
/// Returns `MarketError::MalformedResponse` for responses without the
/// `chart.result` nesting and `MarketError::SymbolMissing` when the result is
/// null or empty (unknown symbol).
pub fn extract_quote(response: &Value, symbol: &str) -> Result<Value, MarketError> {
    let result = response
        .get("chart")
        .ok_or_else(|| MarketError::MalformedResponse("missing 'chart' field".to_string()))?
        .get("result")
        .ok_or_else(|| MarketError::MalformedResponse("missing 'chart.result' field".to_string()))?;

    if result.is_null() {
        return Err(MarketError::SymbolMissing(symbol.to_string()));
    }

    result
        .get(0)
        .cloned()
        .ok_or_else(|| MarketError::SymbolMissing(symbol.to_string()))
}

/// Probes the API and reports whether it is available.
pub async fn probe_api(client: &Client, url: &str) -> Result<bool, MarketError> {
    let response: Value = client.get(url).send().await?.json().await?;
    availability_condition(&response)
}

/// Fetches one year of daily prices for the symbol.
///
/// The caller supplies the chart base URL published by the availability
/// sensor; the symbol and query parameters are appended here.
pub async fn fetch_stock_prices(
    client: &Client,
    url: &str,
    symbol: &str,
) -> Result<Value, MarketError> {
    let request_url = format!("{url}{symbol}?metrics=high&interval=1d&range=1y");
    let response: Value = client.get(&request_url).send().await?.json().await?;
    extract_quote(&response, symbol)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_build_client_with_headers() {
        let mut headers = HashMap::new();
        headers.insert("User-Agent".to_string(), "stockflow".to_string());
        headers.insert("X-Api-Key".to_string(), "secret".to_string());

        assert!(build_client(&headers).is_ok());
    }

    #[test]
    fn test_build_client_rejects_bad_header() {
        let mut headers = HashMap::new();
        headers.insert("bad header name".to_string(), "v".to_string());

        let result = build_client(&headers);
        assert!(matches!(result, Err(MarketError::InvalidHeader(_))));
    }

    #[test]
    fn test_availability_condition_available() {
        let response = json!({"finance": {"result": null, "error": null}});
        assert!(availability_condition(&response).unwrap());
    }

    #[test]
    fn test_availability_condition_unavailable() {
        let response = json!({"finance": {"result": {"status": "degraded"}}});
        assert!(!availability_condition(&response).unwrap());
    }

    #[test]
    fn test_availability_condition_malformed() {
        let result = availability_condition(&json!({"unexpected": true}));
        assert!(matches!(result, Err(MarketError::MalformedResponse(_))));

        let result = availability_condition(&json!({"finance": {}}));
        assert!(matches!(result, Err(MarketError::MalformedResponse(_))));
    }

    #[test]
    fn test_extract_quote() {
        let response = json!({
            "chart": {
                "result": [{
                    "meta": {"symbol": "AAPL", "currency": "USD"},
                    "timestamp": [1700000000],
                    "indicators": {"quote": [{"close": [191.2]}]}
                }],
                "error": null
            }
        });

        let quote = extract_quote(&response, "AAPL").unwrap();
        assert_eq!(quote["meta"]["symbol"], "AAPL");
        assert_eq!(quote["timestamp"][0], 1700000000);
    }

    #[test]
    fn test_extract_quote_unknown_symbol() {
        let response = json!({"chart": {"result": null, "error": {"code": "Not Found"}}});
        let result = extract_quote(&response, "NOPE");
        assert!(matches!(result, Err(MarketError::SymbolMissing(ref s)) if s == "NOPE"));

        let response = json!({"chart": {"result": []}});
        let result = extract_quote(&response, "NOPE");
        assert!(matches!(result, Err(MarketError::SymbolMissing(_))));
    }

    #[test]
    fn test_extract_quote_malformed() {
        let result = extract_quote(&json!({"finance": {}}), "AAPL");
        assert!(matches!(result, Err(MarketError::MalformedResponse(_))));
    }
}
