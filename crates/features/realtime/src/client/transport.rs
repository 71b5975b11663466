use super::listeners::Dispatcher;
use crate::error::{RealtimeError, RealtimeErrorExt};
use crate::protocol::{self, SessionOpened};
use futures_util::{SinkExt, StreamExt};
use leadhub_kernel::domain::events::{ClientEvent, ServerEvent};
use reqwest::StatusCode;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};
use url::Url;

const OUTBOUND_CAPACITY: usize = 64;
const CLOSE_GRACE: Duration = Duration::from_secs(5);
/// Consecutive failed polls tolerated before the link is given up.
const MAX_POLL_FAILURES: u32 = 5;
const POLL_RETRY_DELAY: Duration = Duration::from_millis(250);

/// Wire transport used by an [`crate::EventClient`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportKind {
    WebSocket,
    Polling,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::WebSocket => "websocket",
            Self::Polling => "polling",
        })
    }
}

/// A live connection: outbound queue plus the I/O tasks serving it.
#[derive(Debug)]
pub(crate) struct Link {
    pub(crate) kind: TransportKind,
    outbound: Option<mpsc::Sender<ClientEvent>>,
    connected: Arc<AtomicBool>,
    /// Drains `outbound`; finishes on its own once the sender is dropped.
    driver: JoinHandle<()>,
    /// Inbound-only loop, aborted on close.
    pump: Option<JoinHandle<()>>,
}

impl Link {
    pub(crate) fn is_alive(&self) -> bool {
        self.connected.load(Ordering::Acquire) && !self.driver.is_finished()
    }

    /// Queues an event; `false` if the link is down or its queue is full.
    pub(crate) fn send(&self, event: ClientEvent) -> bool {
        let Some(outbound) = &self.outbound else {
            return false;
        };
        match outbound.try_send(event) {
            Ok(()) => true,
            Err(e) => {
                warn!(transport = %self.kind, error = %e, "Outbound event dropped");
                false
            },
        }
    }

    /// Lets the driver flush and say goodbye, then stops everything.
    pub(crate) async fn close(mut self) {
        self.outbound.take();
        if let Some(pump) = &self.pump {
            pump.abort();
        }
        if tokio::time::timeout(CLOSE_GRACE, &mut self.driver).await.is_err() {
            debug!(transport = %self.kind, "Transport did not stop in time; aborting");
        }
        self.connected.store(false, Ordering::Release);
    }
}

impl Drop for Link {
    fn drop(&mut self) {
        self.driver.abort();
        if let Some(pump) = &self.pump {
            pump.abort();
        }
    }
}

/// `http(s)://host/base` + `/socket` → `ws(s)://host/socket`.
pub(crate) fn websocket_url(base: &Url, path: &str) -> Result<Url, RealtimeError> {
    let mut url = base.join(path).context("Joining socket path")?;
    let scheme = if matches!(url.scheme(), "https" | "wss") { "wss" } else { "ws" };
    url.set_scheme(scheme).map_err(|()| RealtimeError::InvalidConfig {
        message: format!("cannot derive a WebSocket URL from '{base}'").into(),
        context: None,
    })?;
    Ok(url)
}

pub(crate) async fn open_websocket(
    base: &Url,
    path: &str,
    dispatcher: Arc<Dispatcher>,
) -> Result<Link, RealtimeError> {
    let url = websocket_url(base, path)?;
    let (stream, _) = connect_async(url.as_str()).await?;
    let (mut sink, mut source) = stream.split();
    let (outbound, mut queue) = mpsc::channel::<ClientEvent>(OUTBOUND_CAPACITY);
    let connected = Arc::new(AtomicBool::new(true));
    let flag = Arc::clone(&connected);

    let driver = tokio::spawn(async move {
        loop {
            tokio::select! {
                next = queue.recv() => {
                    let Some(event) = next else {
                        let _ = sink.send(Message::Close(None)).await;
                        break;
                    };
                    match protocol::encode(&event) {
                        Ok(frame) => {
                            if let Err(e) = sink.send(Message::text(frame)).await {
                                debug!(error = %e, "WebSocket write failed");
                                break;
                            }
                        },
                        Err(e) => warn!(event = event.name(), error = %e, "Failed to encode event"),
                    }
                },
                frame = source.next() => match frame {
                    Some(Ok(Message::Text(text))) => match protocol::decode_server(text.as_str()) {
                        Ok(event) => dispatcher.deliver(event),
                        Err(e) => warn!(error = %e, "Ignoring malformed server frame"),
                    },
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {},
                    Some(Err(e)) => {
                        debug!(error = %e, "WebSocket read failed");
                        break;
                    },
                },
            }
        }
        flag.store(false, Ordering::Release);
        info!(transport = %TransportKind::WebSocket, "Disconnected");
    });

    Ok(Link {
        kind: TransportKind::WebSocket,
        outbound: Some(outbound),
        connected,
        driver,
        pump: None,
    })
}

pub(crate) async fn open_polling(
    http: &reqwest::Client,
    base: &Url,
    path: &str,
    dispatcher: Arc<Dispatcher>,
) -> Result<Link, RealtimeError> {
    let path = path.trim_end_matches('/');
    let open_url = base.join(&format!("{path}/poll")).context("Joining polling path")?;
    let opened: SessionOpened = http
        .post(open_url)
        .send()
        .await
        .context("Opening polling session")?
        .error_for_status()
        .context("Opening polling session")?
        .json()
        .await
        .context("Reading polling session")?;
    let session =
        base.join(&format!("{path}/poll/{}", opened.sid)).context("Joining session path")?;
    debug!(sid = %opened.sid, "Polling session opened");

    let connected = Arc::new(AtomicBool::new(true));
    let (outbound, mut queue) = mpsc::channel::<ClientEvent>(OUTBOUND_CAPACITY);

    let pump = {
        let (http, session, flag) = (http.clone(), session.clone(), Arc::clone(&connected));
        tokio::spawn(async move {
            let mut failures = 0;
            while flag.load(Ordering::Acquire) {
                match fetch(&http, &session).await {
                    Ok(Some(batch)) => {
                        failures = 0;
                        batch.into_iter().for_each(|event| dispatcher.deliver(event));
                    },
                    Ok(None) => break,
                    Err(e) => {
                        failures += 1;
                        if failures >= MAX_POLL_FAILURES {
                            warn!(error = %e, failures, "Polling failed; giving up");
                            break;
                        }
                        warn!(error = %e, failures, "Polling failed; retrying");
                        tokio::time::sleep(POLL_RETRY_DELAY * failures).await;
                    },
                }
            }
            flag.store(false, Ordering::Release);
            info!(transport = %TransportKind::Polling, "Disconnected");
        })
    };

    let driver = {
        let (http, flag) = (http.clone(), Arc::clone(&connected));
        tokio::spawn(async move {
            while let Some(event) = queue.recv().await {
                let sent = http.post(session.clone()).json(&event).send().await;
                match sent.and_then(reqwest::Response::error_for_status) {
                    Ok(_) => {},
                    Err(e)
                        if matches!(
                            e.status(),
                            Some(StatusCode::NOT_FOUND | StatusCode::GONE)
                        ) =>
                    {
                        debug!(error = %e, "Polling session gone");
                        flag.store(false, Ordering::Release);
                        return;
                    },
                    Err(e) => warn!(event = event.name(), error = %e, "Failed to send event"),
                }
            }
            if let Err(e) = http.delete(session).send().await {
                debug!(error = %e, "Closing polling session failed");
            }
            flag.store(false, Ordering::Release);
        })
    };

    Ok(Link {
        kind: TransportKind::Polling,
        outbound: Some(outbound),
        connected,
        driver,
        pump: Some(pump),
    })
}

/// One long-poll round trip. `Ok(None)` means the session is over.
async fn fetch(
    http: &reqwest::Client,
    session: &Url,
) -> Result<Option<Vec<ServerEvent>>, RealtimeError> {
    let response = http.get(session.clone()).send().await.context("Polling")?;
    match response.status() {
        StatusCode::OK => {
            let body = response.text().await.context("Reading poll response")?;
            decode_batch(&body).map(Some)
        },
        StatusCode::NOT_FOUND | StatusCode::GONE => Ok(None),
        status => Err(RealtimeError::NotConnected {
            message: format!("unexpected poll status {status}").into(),
            context: None,
        }),
    }
}

/// Decodes a poll response, skipping envelopes this client cannot read.
///
/// # Errors
/// Fails only if `body` is not a JSON array.
fn decode_batch(body: &str) -> Result<Vec<ServerEvent>, RealtimeError> {
    let raw: Vec<serde_json::Value> =
        serde_json::from_str(body).context("Decoding poll response")?;
    Ok(raw
        .into_iter()
        .filter_map(|envelope| {
            serde_json::from_value(envelope)
                .inspect_err(|e| warn!(error = %e, "Ignoring malformed server envelope"))
                .ok()
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn malformed_envelopes_are_skipped_within_a_batch() {
        let body = json!([
            { "event": "lead:status", "data": { "leadId": "1", "status": "NEW" } },
            { "event": "lead:exploded", "data": {} },
            { "event": "lead:status", "data": { "leadId": "2" } },
            { "event": "lead:status", "data": { "leadId": "3", "status": "CONTACTED" } },
        ])
        .to_string();

        let batch = decode_batch(&body).expect("array decodes");
        let names: Vec<&str> = batch.iter().map(ServerEvent::name).collect();
        assert_eq!(names, ["lead:status", "lead:status"]);
    }

    #[test]
    fn non_array_poll_body_is_an_error() {
        assert!(decode_batch(r#"{"event":"lead:status"}"#).is_err());
        assert!(decode_batch("").is_err());
    }

    #[test]
    fn websocket_url_follows_the_http_scheme() {
        let plain = Url::parse("http://localhost:3000").expect("url");
        assert_eq!(
            websocket_url(&plain, "/socket").expect("ws").as_str(),
            "ws://localhost:3000/socket"
        );

        let tls = Url::parse("https://leads.example.com/app/").expect("url");
        assert_eq!(
            websocket_url(&tls, "/socket").expect("wss").as_str(),
            "wss://leads.example.com/socket"
        );
    }
}
