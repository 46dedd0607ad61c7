//! Gateway Connection Manager
//!
//! Owns the single logical connection to the gateway. One reader task and
//! one writer task serve each TCP connection; requests are correlated with
//! responses by id. Session state is published on a `watch` channel so the
//! coordinator and background services observe every transition.
//!
//! ```text
//!  send() ──► outbound mpsc ──► writer task ──► TCP
//!  pending[id] ◄── reader task ◄── TCP   (responses)
//!  pushes mpsc ◄── reader task           (order events, quotes)
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::{mpsc, oneshot, watch};
use tokio_util::codec::{FramedRead, FramedWrite};
use tokio_util::sync::CancellationToken;

use super::codec::{Command, GatewayCodec, InboundFrame, OutboundFrame};
use super::heartbeat::{HeartbeatConfig, HeartbeatState};
use super::reconnect::{ReconnectConfig, ReconnectPolicy};
use crate::application::ports::{GatewayError, GatewayPush};
use crate::config::GatewayConfig;
use crate::domain::environment::TradeEnvironment;
use crate::domain::instrument::Market;
use crate::domain::session::{SessionSnapshot, SessionState};
use crate::observability::record_gateway_reconnect;

const OUTBOUND_QUEUE: usize = 256;

type PendingMap = HashMap<u64, oneshot::Sender<Result<Value, GatewayError>>>;

struct Link {
    generation: u64,
    outbound: mpsc::Sender<OutboundFrame>,
    cancel: CancellationToken,
}

/// Supervises the gateway session.
pub struct ConnectionManager {
    config: GatewayConfig,
    environment: TradeEnvironment,
    markets: Vec<Market>,
    heartbeat_config: HeartbeatConfig,
    reconnect_config: ReconnectConfig,
    session: watch::Sender<SessionSnapshot>,
    heartbeat: HeartbeatState,
    link: Mutex<Option<Link>>,
    generation: AtomicU64,
    pending: Mutex<PendingMap>,
    next_request_id: AtomicU64,
    pushes: mpsc::Sender<GatewayPush>,
    reconnect_gate: tokio::sync::Mutex<()>,
}

impl ConnectionManager {
    /// Create a disconnected manager. Pushed events are forwarded to `pushes`.
    #[must_use]
    pub fn new(
        config: GatewayConfig,
        environment: TradeEnvironment,
        markets: Vec<Market>,
        pushes: mpsc::Sender<GatewayPush>,
    ) -> Arc<Self> {
        let (session, _) = watch::channel(SessionSnapshot::disconnected());
        Arc::new(Self {
            heartbeat_config: HeartbeatConfig::from_gateway_config(&config),
            reconnect_config: ReconnectConfig::from_gateway_config(&config),
            config,
            environment,
            markets,
            session,
            heartbeat: HeartbeatState::new(),
            link: Mutex::new(None),
            generation: AtomicU64::new(0),
            pending: Mutex::new(HashMap::new()),
            next_request_id: AtomicU64::new(1),
            pushes,
            reconnect_gate: tokio::sync::Mutex::new(()),
        })
    }

    /// Current session state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.session.borrow().state
    }

    /// Current session snapshot.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        *self.session.borrow()
    }

    /// Observe session transitions.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.session.subscribe()
    }

    /// Establish the session.
    ///
    /// Fails with [`GatewayError::Connection`] if the gateway does not accept
    /// within the connect timeout.
    pub async fn connect(self: &Arc<Self>) -> Result<(), GatewayError> {
        let address = self.config.address();
        let timeout = self.config.connect_timeout();
        let stream = match tokio::time::timeout(timeout, TcpStream::connect(&address)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => return Err(GatewayError::Connection(format!("{address}: {e}"))),
            Err(_) => {
                return Err(GatewayError::Connection(format!(
                    "{address}: no answer within {timeout:?}"
                )));
            }
        };
        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!(error = %e, "Could not disable Nagle on gateway socket");
        }
        let (read_half, write_half) = stream.into_split();

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let cancel = CancellationToken::new();
        let (outbound, outbound_rx) = mpsc::channel(OUTBOUND_QUEUE);
        if let Some(old) = self.link.lock().replace(Link {
            generation,
            outbound,
            cancel: cancel.clone(),
        }) {
            old.cancel.cancel();
        }

        tokio::spawn(Arc::clone(self).write_loop(write_half, outbound_rx, cancel.clone(), generation));
        tokio::spawn(Arc::clone(self).read_loop(read_half, cancel, generation));

        self.heartbeat.reset();
        self.publish(SessionState::Connected);
        tracing::info!(address = %address, "Connected to gateway");

        self.unlock_trade().await;
        Ok(())
    }

    /// Return the session state, reconnecting first when the session is down
    /// or its heartbeat has lapsed.
    ///
    /// Reconnection uses bounded exponential backoff; when attempts run out
    /// the session is `DISCONNECTED`.
    pub async fn ensure_connected(self: &Arc<Self>) -> SessionState {
        let _gate = self.reconnect_gate.lock().await;
        let state = self.state();
        if state == SessionState::Connected {
            if !self.heartbeat.is_expired(self.heartbeat_config.timeout) {
                return state;
            }
            self.degrade_current("heartbeat missed");
        }

        let mut policy = ReconnectPolicy::new(self.reconnect_config.clone());
        loop {
            match self.connect().await {
                Ok(()) => return SessionState::Connected,
                Err(e) => {
                    let Some(delay) = policy.next_delay() else {
                        self.publish(SessionState::Disconnected);
                        tracing::error!(
                            attempts = policy.attempts(),
                            error = %e,
                            "Gateway unreachable, giving up until the next cycle"
                        );
                        return SessionState::Disconnected;
                    };
                    record_gateway_reconnect();
                    let attempts = policy.attempts();
                    self.session.send_modify(|s| s.reconnect_attempts = attempts);
                    tracing::warn!(
                        attempt = attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Gateway connect failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// Forward a command and wait for its response payload.
    ///
    /// Fails with [`GatewayError::Unavailable`] when not connected. A
    /// transport failure degrades the session and surfaces as
    /// [`GatewayError::Transient`].
    pub async fn send(&self, command: Command) -> Result<Value, GatewayError> {
        let state = self.state();
        if state != SessionState::Connected {
            return Err(GatewayError::Unavailable { state });
        }
        let Some((generation, outbound)) = self
            .link
            .lock()
            .as_ref()
            .map(|l| (l.generation, l.outbound.clone()))
        else {
            return Err(GatewayError::Unavailable {
                state: SessionState::Disconnected,
            });
        };

        let request_id = self.next_request_id.fetch_add(1, Ordering::Relaxed);
        let name = command.name();
        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(request_id, tx);
        tracing::debug!(request_id, command = name, "Gateway request");

        if outbound
            .send(OutboundFrame::Request {
                request_id,
                command,
            })
            .await
            .is_err()
        {
            self.pending.lock().remove(&request_id);
            self.on_transport_error(generation, "outbound queue closed");
            return Err(GatewayError::Transient(format!("{name}: connection lost")));
        }

        let timeout = self.config.request_timeout();
        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(GatewayError::Transient(format!(
                "{name}: connection dropped before the response"
            ))),
            Err(_) => {
                self.pending.lock().remove(&request_id);
                tracing::warn!(request_id, command = name, "Gateway request timed out");
                Err(GatewayError::Timeout(timeout))
            }
        }
    }

    /// Keep the session alive until `cancel` fires: reconnect when down,
    /// ping on the heartbeat interval, degrade on a missed heartbeat.
    pub async fn run_supervisor(self: Arc<Self>, cancel: CancellationToken) {
        let mut session_rx = self.subscribe();
        let mut ticker = tokio::time::interval(self.heartbeat_config.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        tracing::info!(
            interval_secs = self.heartbeat_config.interval.as_secs(),
            timeout_secs = self.heartbeat_config.timeout.as_secs(),
            "Gateway supervisor started"
        );

        loop {
            if self.state() != SessionState::Connected {
                let state = tokio::select! {
                    () = cancel.cancelled() => break,
                    state = self.ensure_connected() => state,
                };
                if state != SessionState::Connected {
                    tokio::select! {
                        () = cancel.cancelled() => break,
                        () = tokio::time::sleep(self.reconnect_config.max_delay) => continue,
                    }
                }
                ticker.reset();
            }

            tokio::select! {
                () = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    if self.heartbeat.is_expired(self.heartbeat_config.timeout) {
                        tracing::warn!(
                            silence_secs = self.heartbeat.silence().as_secs(),
                            "Gateway heartbeat missed"
                        );
                        self.degrade_current("heartbeat missed");
                        continue;
                    }
                    self.ping().await;
                }
                changed = session_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        self.disconnect();
        tracing::info!("Gateway supervisor stopped");
    }

    /// Drop the connection and fail in-flight requests.
    pub fn disconnect(&self) {
        if let Some(link) = self.link.lock().take() {
            link.cancel.cancel();
        }
        self.fail_pending(&GatewayError::Unavailable {
            state: SessionState::Disconnected,
        });
        self.publish(SessionState::Disconnected);
    }

    async fn ping(&self) {
        let outbound = self.link.lock().as_ref().map(|l| l.outbound.clone());
        if let Some(outbound) = outbound
            && outbound
                .send(OutboundFrame::Ping {
                    sent_at: Utc::now(),
                })
                .await
                .is_ok()
        {
            self.heartbeat.mark_ping_sent();
        }
    }

    async fn unlock_trade(&self) {
        if !self.environment.is_real() {
            return;
        }
        let Some(password) = self.config.trade_password.clone() else {
            tracing::error!("No trade password configured, REAL orders will be refused by the gateway");
            return;
        };
        for market in &self.markets {
            let command = Command::UnlockTrade {
                password: password.clone(),
                market: *market,
                environment: self.environment,
            };
            match self.send(command).await {
                Ok(_) => tracing::info!(market = %market, "Trade unlocked"),
                Err(e) => tracing::error!(market = %market, error = %e, "Trade unlock failed"),
            }
        }
    }

    async fn write_loop(
        self: Arc<Self>,
        write_half: OwnedWriteHalf,
        mut outbound: mpsc::Receiver<OutboundFrame>,
        cancel: CancellationToken,
        generation: u64,
    ) {
        let mut sink = FramedWrite::new(write_half, GatewayCodec::new());
        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                frame = outbound.recv() => {
                    let Some(frame) = frame else { break };
                    if let Err(e) = sink.send(frame).await {
                        self.on_transport_error(generation, &format!("write failed: {e}"));
                        break;
                    }
                }
            }
        }
    }

    async fn read_loop(self: Arc<Self>, read_half: OwnedReadHalf, cancel: CancellationToken, generation: u64) {
        let mut frames = FramedRead::new(read_half, GatewayCodec::new());
        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                frame = frames.next() => match frame {
                    Some(Ok(frame)) => self.handle_frame(frame).await,
                    Some(Err(e)) => {
                        self.on_transport_error(generation, &format!("read failed: {e}"));
                        break;
                    }
                    None => {
                        self.on_transport_error(generation, "gateway closed the connection");
                        break;
                    }
                },
            }
        }
    }

    async fn handle_frame(&self, frame: InboundFrame) {
        match frame {
            InboundFrame::Response {
                request_id,
                ok,
                payload,
                error,
            } => {
                let Some(waiter) = self.pending.lock().remove(&request_id) else {
                    tracing::debug!(request_id, "Response for abandoned request");
                    return;
                };
                let result = if ok {
                    Ok(payload)
                } else {
                    Err(error.map_or_else(
                        || GatewayError::Rejected("unspecified gateway error".to_string()),
                        |e| e.into_gateway_error(),
                    ))
                };
                let _ = waiter.send(result);
            }
            InboundFrame::Event { event } => {
                if self.pushes.send(event).await.is_err() {
                    tracing::debug!("Push receiver dropped, discarding gateway event");
                }
            }
            InboundFrame::Pong { .. } => {
                let at = self.heartbeat.record_pong();
                self.session.send_modify(|s| s.last_heartbeat = Some(at));
            }
        }
    }

    fn current_generation(&self) -> Option<u64> {
        self.link.lock().as_ref().map(|l| l.generation)
    }

    fn degrade_current(&self, reason: &str) {
        if let Some(generation) = self.current_generation() {
            self.on_transport_error(generation, reason);
        }
    }

    /// Degrade the session if `generation` is still the live connection.
    fn on_transport_error(&self, generation: u64, reason: &str) {
        let link = {
            let mut guard = self.link.lock();
            match guard.as_ref() {
                Some(link) if link.generation == generation => guard.take(),
                _ => None,
            }
        };
        let Some(link) = link else { return };
        link.cancel.cancel();
        self.fail_pending(&GatewayError::Transient(reason.to_string()));
        self.publish(SessionState::Degraded);
        tracing::warn!(reason, "Gateway session degraded");
    }

    fn fail_pending(&self, error: &GatewayError) {
        let drained: Vec<_> = self.pending.lock().drain().collect();
        for (_, waiter) in drained {
            let _ = waiter.send(Err(error.clone()));
        }
    }

    fn publish(&self, state: SessionState) {
        self.session.send_if_modified(|s| {
            let changed = s.state != state;
            if changed {
                tracing::info!(from = %s.state, to = %state, "Session state changed");
                s.state = state;
            }
            if state == SessionState::Connected && s.reconnect_attempts != 0 {
                s.reconnect_attempts = 0;
                return true;
            }
            changed
        });
    }
}
