use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use hmac::{Hmac, Mac};
use serde::Serialize;
use sha2::Sha256;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio_tungstenite::{tungstenite, MaybeTlsStream, WebSocketStream};

use super::types::{
    parse_bar_update, parse_feed_tick, parse_history, BarFeedSubscribeParams, BarParams,
    BarSubscription, FeedSubscribeParams, FxRequest, FxResponse, LoginParams,
    QuoteHistoryBarsParams, SymbolSubscription,
};
use crate::config::FeedConfig;
use crate::error::AppError;
use crate::event::FeedStatus;
use crate::feed::FeedHandler;
use crate::model::bar::Bar;
use crate::session_filter::is_outside_session;

const PING_INTERVAL: Duration = Duration::from_secs(20);

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsWrite = SplitSink<WsStream, tungstenite::Message>;
type WsRead = SplitStream<WsStream>;

/// FXOpen Web API feed client: HMAC login, bar history, tick and bar
/// subscriptions for one symbol.
#[derive(Debug, Clone)]
pub struct FxOpenWsClient {
    url: String,
    web_api_id: String,
    web_api_key: String,
    web_api_secret: String,
    device_id: String,
    app_session_id: String,
    symbol: String,
    periodicity: String,
    price_type: String,
    history_bars: usize,
}

impl FxOpenWsClient {
    pub fn new(config: &FeedConfig) -> Self {
        Self {
            url: config.url.clone(),
            web_api_id: config.web_api_id.clone(),
            web_api_key: config.web_api_key.clone(),
            web_api_secret: config.web_api_secret.clone(),
            device_id: config.device_id.clone(),
            app_session_id: config.app_session_id.clone(),
            symbol: config.symbol.clone(),
            periodicity: config.periodicity.clone(),
            price_type: config.price_type.clone(),
            history_bars: config.history_bars,
        }
    }

    /// base64(HMAC-SHA256(secret, "{timestamp}{id}{key}"))
    pub fn sign(&self, timestamp_ms: i64) -> String {
        let message = format!("{}{}{}", timestamp_ms, self.web_api_id, self.web_api_key);
        let mut mac = Hmac::<Sha256>::new_from_slice(self.web_api_secret.as_bytes())
            .expect("HMAC accepts keys of any length");
        mac.update(message.as_bytes());
        BASE64.encode(mac.finalize().into_bytes())
    }

    /// Connect, log in, deliver history and then stream ticks and bars into
    /// `handler` until the connection ends or shutdown is signalled.
    pub async fn run<H: FeedHandler>(
        &self,
        handler: &mut H,
        status_tx: &watch::Sender<FeedStatus>,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<()> {
        tracing::info!(url = %self.url, symbol = %self.symbol, "Connecting to feed");
        let (ws_stream, _resp) = tokio_tungstenite::connect_async(&self.url)
            .await
            .context("WebSocket connect failed")?;
        let _ = status_tx.send(FeedStatus::Connected);

        let (mut write, mut read) = ws_stream.split();

        self.login(&mut write, &mut read, handler).await?;
        tracing::info!("Feed login OK");

        let bars = self.history(&mut write, &mut read, handler).await?;
        let _ = status_tx.send(FeedStatus::HistoryLoaded(bars.len()));
        handler.on_history(bars);

        self.subscribe(&mut write, &mut read, handler).await?;
        let _ = status_tx.send(FeedStatus::Subscribed);
        tracing::info!(
            symbol = %self.symbol,
            periodicity = %self.periodicity,
            "Subscribed to ticks and bars"
        );

        let mut ping = tokio::time::interval(PING_INTERVAL);
        ping.tick().await;

        loop {
            tokio::select! {
                msg = read.next() => {
                    match msg {
                        Some(Ok(tungstenite::Message::Text(text))) => {
                            match serde_json::from_str::<FxResponse>(&text) {
                                Ok(resp) => {
                                    if !dispatch_push(&resp, handler) {
                                        tracing::debug!(
                                            response = ?resp.response,
                                            "Ignoring unsolicited message"
                                        );
                                    }
                                }
                                Err(e) => {
                                    tracing::debug!(error = %e, "Failed to parse WS message");
                                }
                            }
                        }
                        Some(Ok(tungstenite::Message::Close(frame))) => {
                            tracing::info!(?frame, "Feed closed by server");
                            return Err(AppError::WebSocket("closed by server".to_string()).into());
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            return Err(AppError::WebSocket(format!("read error: {}", e)).into());
                        }
                        None => {
                            return Err(AppError::WebSocket("stream ended".to_string()).into());
                        }
                    }
                }
                _ = ping.tick() => {
                    write
                        .send(tungstenite::Message::Ping(Vec::new()))
                        .await
                        .context("failed to send ping")?;
                }
                _ = shutdown.changed() => {
                    let _ = write.send(tungstenite::Message::Close(None)).await;
                    return Ok(());
                }
            }
        }
    }

    async fn login<H: FeedHandler>(
        &self,
        write: &mut WsWrite,
        read: &mut WsRead,
        handler: &mut H,
    ) -> Result<()> {
        let timestamp = chrono::Utc::now().timestamp_millis();
        let req = FxRequest::new(
            "login",
            "Login",
            LoginParams {
                auth_type: "HMAC".to_string(),
                web_api_id: self.web_api_id.clone(),
                web_api_key: self.web_api_key.clone(),
                timestamp,
                signature: self.sign(timestamp),
                device_id: self.device_id.clone(),
                app_session_id: self.app_session_id.clone(),
            },
        );
        request(write, read, &req, handler).await?;
        Ok(())
    }

    async fn history<H: FeedHandler>(
        &self,
        write: &mut WsWrite,
        read: &mut WsRead,
        handler: &mut H,
    ) -> Result<Vec<Bar>> {
        let req = FxRequest::new(
            "history",
            "QuoteHistoryBars",
            QuoteHistoryBarsParams {
                symbol: self.symbol.clone(),
                periodicity: self.periodicity.clone(),
                price_type: self.price_type.clone(),
                timestamp: chrono::Utc::now().timestamp_millis(),
                count: -(self.history_bars as i64),
            },
        );
        let resp = request(write, read, &req, handler).await?;
        let mut bars = resp.result.as_ref().map(parse_history).unwrap_or_default();
        bars.retain(|b| !is_outside_session(b.start_time_ms));
        tracing::info!(count = bars.len(), "Fetched history bars");
        Ok(bars)
    }

    async fn subscribe<H: FeedHandler>(
        &self,
        write: &mut WsWrite,
        read: &mut WsRead,
        handler: &mut H,
    ) -> Result<()> {
        let ticks = FxRequest::new(
            "sub_ticks",
            "FeedSubscribe",
            FeedSubscribeParams {
                subscribe: vec![SymbolSubscription {
                    symbol: self.symbol.clone(),
                    book_depth: 1,
                }],
            },
        );
        request(write, read, &ticks, handler).await?;

        let bars = FxRequest::new(
            "sub_bars",
            "BarFeedSubscribe",
            BarFeedSubscribeParams {
                subscribe: vec![BarSubscription {
                    symbol: self.symbol.clone(),
                    bar_params: vec![BarParams {
                        periodicity: self.periodicity.clone(),
                        price_type: "Bid".to_string(),
                    }],
                }],
            },
        );
        request(write, read, &bars, handler).await?;
        Ok(())
    }
}

/// Send one request and wait for its reply. Feed pushes arriving in the
/// meantime are handed to `handler`.
async fn request<P: Serialize, H: FeedHandler>(
    write: &mut WsWrite,
    read: &mut WsRead,
    req: &FxRequest<P>,
    handler: &mut H,
) -> Result<FxResponse> {
    let body = serde_json::to_string(req).map_err(AppError::Json)?;
    write
        .send(tungstenite::Message::Text(body))
        .await
        .with_context(|| format!("failed to send {}", req.request))?;

    loop {
        let text = match read.next().await {
            Some(Ok(tungstenite::Message::Text(text))) => text,
            Some(Ok(tungstenite::Message::Close(_))) | None => {
                return Err(AppError::WebSocket(format!(
                    "connection closed while waiting for {}",
                    req.request
                ))
                .into());
            }
            Some(Ok(_)) => continue,
            Some(Err(e)) => {
                return Err(AppError::WebSocket(format!("read error: {}", e)).into());
            }
        };

        let resp: FxResponse = match serde_json::from_str(&text) {
            Ok(resp) => resp,
            Err(e) => {
                tracing::debug!(error = %e, "Failed to parse WS message");
                continue;
            }
        };
        if dispatch_push(&resp, handler) {
            continue;
        }
        if resp.id.as_deref().is_some_and(|id| id != req.id) {
            tracing::debug!(id = ?resp.id, waiting_for = %req.id, "Skipping reply to other request");
            continue;
        }
        if resp.is_error() {
            return Err(AppError::FeedApi {
                request: req.request.clone(),
                msg: resp.error_message(),
            }
            .into());
        }
        return Ok(resp);
    }
}

/// Route a pushed `FeedTick` / `FeedBarUpdate` to the handler. Returns false
/// for anything that is not a feed push.
fn dispatch_push<H: FeedHandler>(resp: &FxResponse, handler: &mut H) -> bool {
    if !resp.is_push() {
        return false;
    }
    let Some(result) = resp.result.as_ref() else {
        return true;
    };
    match resp.response.as_deref() {
        Some("FeedTick") => {
            if let Some(tick) = parse_feed_tick(result) {
                if !is_outside_session(tick.timestamp_ms) {
                    handler.on_tick(tick.timestamp_ms, tick.price);
                }
            }
        }
        Some("FeedBarUpdate") => {
            if let Some(bar) = parse_bar_update(result) {
                if !is_outside_session(bar.start_time_ms) {
                    handler.on_server_bar(bar);
                }
            }
        }
        _ => {}
    }
    true
}
