use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::model::bar::Bar;
use crate::model::tick::Tick;

/// Keys under `Result` that may hold the history bar array, in lookup order.
const HISTORY_ARRAY_KEYS: [&str; 5] = ["Bars", "Items", "History", "Data", "Quotes"];

/// Deserialize an optional number that may also arrive as a numeric string.
pub fn opt_string_or_number_to_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Option::<Value>::deserialize(deserializer)?;
    match v {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(serde::de::Error::custom),
        Some(Value::Number(n)) => n
            .as_f64()
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom("invalid number")),
        _ => Err(serde::de::Error::custom("invalid numeric value")),
    }
}

/// Same as [`opt_string_or_number_to_f64`] for integer millisecond timestamps.
pub fn opt_string_or_number_to_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Option::<Value>::deserialize(deserializer)?;
    match v {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => {
            let s = s.trim();
            s.parse::<i64>()
                .or_else(|_| s.parse::<f64>().map(|f| f as i64))
                .map(Some)
                .map_err(serde::de::Error::custom)
        }
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom("invalid number")),
        _ => Err(serde::de::Error::custom("invalid timestamp value")),
    }
}

/// Outgoing request envelope: `{"Id": ..., "Request": ..., "Params": {...}}`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct FxRequest<P> {
    pub id: String,
    pub request: String,
    pub params: P,
}

impl<P: Serialize> FxRequest<P> {
    pub fn new(id: &str, request: &str, params: P) -> Self {
        Self {
            id: id.to_string(),
            request: request.to_string(),
            params,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct LoginParams {
    pub auth_type: String,
    pub web_api_id: String,
    pub web_api_key: String,
    pub timestamp: i64,
    pub signature: String,
    pub device_id: String,
    pub app_session_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct QuoteHistoryBarsParams {
    pub symbol: String,
    pub periodicity: String,
    pub price_type: String,
    pub timestamp: i64,
    /// Negative: count bars backwards from `timestamp`.
    pub count: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct FeedSubscribeParams {
    pub subscribe: Vec<SymbolSubscription>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SymbolSubscription {
    pub symbol: String,
    pub book_depth: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct BarFeedSubscribeParams {
    pub subscribe: Vec<BarSubscription>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct BarSubscription {
    pub symbol: String,
    pub bar_params: Vec<BarParams>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct BarParams {
    pub periodicity: String,
    pub price_type: String,
}

/// Incoming message envelope. Replies echo the request `Id`; pushed feed
/// messages carry `Response` = `FeedTick` / `FeedBarUpdate`.
#[derive(Debug, Deserialize)]
pub struct FxResponse {
    #[serde(rename = "Id", default)]
    pub id: Option<String>,
    #[serde(rename = "Response", default)]
    pub response: Option<String>,
    #[serde(rename = "Result", default)]
    pub result: Option<Value>,
    #[serde(rename = "Error", default)]
    pub error: Option<Value>,
}

impl FxResponse {
    pub fn is_error(&self) -> bool {
        self.response.as_deref() == Some("Error")
    }

    pub fn error_message(&self) -> String {
        match &self.error {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => "unknown error".to_string(),
        }
    }

    pub fn is_push(&self) -> bool {
        matches!(
            self.response.as_deref(),
            Some("FeedTick") | Some("FeedBarUpdate")
        )
    }
}

/// One bar row as sent in history results and bar updates. Long and short
/// key spellings may both be present; the long one wins.
#[derive(Debug, Deserialize)]
pub struct FxBar {
    #[serde(rename = "Time", default, deserialize_with = "opt_string_or_number_to_i64")]
    pub time: Option<i64>,
    #[serde(rename = "Timestamp", default, deserialize_with = "opt_string_or_number_to_i64")]
    pub timestamp: Option<i64>,
    #[serde(rename = "T", default, deserialize_with = "opt_string_or_number_to_i64")]
    pub t: Option<i64>,
    #[serde(rename = "Open", default, deserialize_with = "opt_string_or_number_to_f64")]
    pub open: Option<f64>,
    #[serde(rename = "O", default, deserialize_with = "opt_string_or_number_to_f64")]
    pub o: Option<f64>,
    #[serde(rename = "High", default, deserialize_with = "opt_string_or_number_to_f64")]
    pub high: Option<f64>,
    #[serde(rename = "H", default, deserialize_with = "opt_string_or_number_to_f64")]
    pub h: Option<f64>,
    #[serde(rename = "Low", default, deserialize_with = "opt_string_or_number_to_f64")]
    pub low: Option<f64>,
    #[serde(rename = "L", default, deserialize_with = "opt_string_or_number_to_f64")]
    pub l: Option<f64>,
    #[serde(rename = "Close", default, deserialize_with = "opt_string_or_number_to_f64")]
    pub close: Option<f64>,
    #[serde(rename = "C", default, deserialize_with = "opt_string_or_number_to_f64")]
    pub c: Option<f64>,
}

impl FxBar {
    pub fn to_bar(&self) -> Option<Bar> {
        Some(Bar::new(
            self.time.or(self.timestamp).or(self.t)?,
            self.open.or(self.o)?,
            self.high.or(self.h)?,
            self.low.or(self.l)?,
            self.close.or(self.c)?,
        ))
    }
}

#[derive(Debug, Deserialize)]
pub struct FxFeedTick {
    #[serde(rename = "Timestamp", default, deserialize_with = "opt_string_or_number_to_i64")]
    pub timestamp: Option<i64>,
    #[serde(rename = "BestBid", default)]
    pub best_bid: Option<FxBestPrice>,
}

#[derive(Debug, Deserialize)]
pub struct FxBestPrice {
    #[serde(rename = "Price", default, deserialize_with = "opt_string_or_number_to_f64")]
    pub price: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct FxBarUpdate {
    #[serde(rename = "Updates", default)]
    pub updates: Option<Vec<Value>>,
}

fn parse_bar_row(row: &Value) -> Option<Bar> {
    match FxBar::deserialize(row) {
        Ok(raw) => raw.to_bar(),
        Err(e) => {
            tracing::debug!(error = %e, "Skipping malformed bar row");
            None
        }
    }
}

/// Extract history bars from a `QuoteHistoryBars` result, sorted ascending
/// and de-duplicated by start time (the later row wins).
pub fn parse_history(result: &Value) -> Vec<Bar> {
    let rows = HISTORY_ARRAY_KEYS
        .iter()
        .find_map(|key| result.get(*key).and_then(Value::as_array))
        .or_else(|| result.as_array());

    let mut bars: Vec<Bar> = rows
        .map(|rows| rows.iter().filter_map(parse_bar_row).collect())
        .unwrap_or_default();
    bars.sort_by_key(|b| b.start_time_ms);

    let mut deduped: Vec<Bar> = Vec::with_capacity(bars.len());
    for bar in bars {
        match deduped.last_mut() {
            Some(last) if last.start_time_ms == bar.start_time_ms => *last = bar,
            _ => deduped.push(bar),
        }
    }
    deduped
}

/// Best-bid tick from a `FeedTick` result. `None` if timestamp or price is missing.
pub fn parse_feed_tick(result: &Value) -> Option<Tick> {
    let raw = FxFeedTick::deserialize(result).ok()?;
    let price = raw.best_bid?.price?;
    Some(Tick::new(raw.timestamp?, price))
}

/// The most recent bar of a `FeedBarUpdate` result.
pub fn parse_bar_update(result: &Value) -> Option<Bar> {
    let raw = FxBarUpdate::deserialize(result).ok()?;
    raw.updates?.last().and_then(parse_bar_row)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn login_request_serializes_pascal_case() {
        let req = FxRequest::new(
            "login",
            "Login",
            LoginParams {
                auth_type: "HMAC".to_string(),
                web_api_id: "id".to_string(),
                web_api_key: "key".to_string(),
                timestamp: 42,
                signature: "sig".to_string(),
                device_id: "dev".to_string(),
                app_session_id: "QuotesSession".to_string(),
            },
        );
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(v["Id"], "login");
        assert_eq!(v["Request"], "Login");
        assert_eq!(v["Params"]["WebApiId"], "id");
        assert_eq!(v["Params"]["AppSessionId"], "QuotesSession");
        assert_eq!(v["Params"]["Timestamp"], 42);
    }

    #[test]
    fn history_accepts_short_keys_and_strings() {
        let result = json!({
            "Items": [
                {"T": "120000", "O": "1.2", "H": 1.3, "L": 1.1, "C": "1.25"},
                {"Time": 60000, "Open": 1.0, "High": 1.1, "Low": 0.9, "Close": 1.05}
            ]
        });
        let bars = parse_history(&result);
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].start_time_ms, 60_000);
        assert!((bars[1].close - 1.25).abs() < f64::EPSILON);
    }

    #[test]
    fn history_row_with_duplicate_time_keys_is_kept() {
        let result = json!({
            "Bars": [
                {"Time": 120_000, "Timestamp": 999, "T": 1, "Open": 1.0, "O": 9.0, "H": 1.2, "Low": 0.9, "C": 1.1}
            ]
        });
        assert_eq!(
            parse_history(&result),
            vec![Bar::new(120_000, 1.0, 1.2, 0.9, 1.1)]
        );
    }

    #[test]
    fn history_result_may_be_bare_array() {
        let result = json!([{"Time": 0, "Open": 1, "High": 1, "Low": 1, "Close": 1}]);
        assert_eq!(parse_history(&result).len(), 1);
    }

    #[test]
    fn history_skips_incomplete_rows_and_dedups() {
        let result = json!({
            "Bars": [
                {"Time": 60000, "Open": 1.0, "High": 1.0, "Low": 1.0, "Close": 1.0},
                {"Open": 1.0, "High": 1.0, "Low": 1.0, "Close": 1.0},
                {"Time": 120000, "Open": 1.0, "High": 1.0, "Low": 1.0},
                {"Time": 60000, "Open": 2.0, "High": 2.0, "Low": 2.0, "Close": 2.0}
            ]
        });
        let bars = parse_history(&result);
        assert_eq!(bars, vec![Bar::new(60_000, 2.0, 2.0, 2.0, 2.0)]);
    }

    #[test]
    fn feed_tick_reads_best_bid() {
        let tick = parse_feed_tick(&json!({
            "Symbol": "EURUSD",
            "Timestamp": 1_700_000_000_000_i64,
            "BestBid": {"Price": 1.0871, "Volume": 1000000},
            "BestAsk": {"Price": 1.0872}
        }))
        .unwrap();
        assert_eq!(tick.timestamp_ms, 1_700_000_000_000);
        assert!((tick.price - 1.0871).abs() < f64::EPSILON);

        assert!(parse_feed_tick(&json!({"Timestamp": 1, "BestBid": null})).is_none());
        assert!(parse_feed_tick(&json!({"BestBid": {"Price": 1.0}})).is_none());
    }

    #[test]
    fn bar_update_uses_last_entry() {
        let bar = parse_bar_update(&json!({
            "Updates": [
                {"Time": 0, "Open": 1.0, "High": 1.0, "Low": 1.0, "Close": 1.0},
                {"Time": 60000, "Open": 2.0, "High": 3.0, "Low": 1.5, "Close": 2.5}
            ]
        }))
        .unwrap();
        assert_eq!(bar, Bar::new(60_000, 2.0, 3.0, 1.5, 2.5));
        assert!(parse_bar_update(&json!({"Updates": []})).is_none());
    }

    #[test]
    fn error_response_message() {
        let resp: FxResponse =
            serde_json::from_str(r#"{"Id":"login","Response":"Error","Error":"Invalid signature"}"#)
                .unwrap();
        assert!(resp.is_error());
        assert_eq!(resp.error_message(), "Invalid signature");
    }
}
