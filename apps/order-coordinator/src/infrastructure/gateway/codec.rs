//! Gateway bridge wire protocol.
//!
//! Frames are JSON objects, one per line. Outbound frames are requests and
//! pings; inbound frames are responses (matched by `request_id`), pushed
//! events and pongs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder, LinesCodec, LinesCodecError};

use crate::application::ports::{CancelOrderRequest, GatewayError, GatewayPush, PlaceOrderRequest};
use crate::config::TradePassword;
use crate::domain::environment::TradeEnvironment;
use crate::domain::instrument::{InstrumentCode, Market};

/// Longest accepted frame.
pub const MAX_FRAME_BYTES: usize = 1024 * 1024;

/// Gateway command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum Command {
    /// Unlock trading for one market.
    UnlockTrade {
        /// Trade password.
        password: TradePassword,
        /// Market to unlock.
        market: Market,
        /// Environment.
        environment: TradeEnvironment,
    },
    /// Place an order.
    PlaceOrder(PlaceOrderRequest),
    /// Cancel an order.
    CancelOrder(CancelOrderRequest),
    /// Today's orders.
    OrderList {
        /// Environment.
        environment: TradeEnvironment,
    },
    /// Account funds and positions.
    AccountInfo {
        /// Environment.
        environment: TradeEnvironment,
        /// Market context.
        market: Market,
    },
    /// Latest quote.
    Quote {
        /// Instrument.
        code: InstrumentCode,
    },
    /// Bid and ask levels.
    OrderBook {
        /// Instrument.
        code: InstrumentCode,
        /// Levels per side.
        depth: usize,
    },
    /// Static instrument data.
    StockInfo {
        /// Instrument.
        code: InstrumentCode,
    },
}

impl Command {
    /// Command name for logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::UnlockTrade { .. } => "unlock_trade",
            Self::PlaceOrder(_) => "place_order",
            Self::CancelOrder(_) => "cancel_order",
            Self::OrderList { .. } => "order_list",
            Self::AccountInfo { .. } => "account_info",
            Self::Quote { .. } => "quote",
            Self::OrderBook { .. } => "order_book",
            Self::StockInfo { .. } => "stock_info",
        }
    }
}

/// Frame sent to the gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundFrame {
    /// Request expecting a response with the same id.
    Request {
        /// Correlation id.
        request_id: u64,
        /// Command.
        command: Command,
    },
    /// Liveness probe.
    Ping {
        /// Send time.
        sent_at: DateTime<Utc>,
    },
}

/// Error carried by a failed response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireError {
    /// Gateway error code.
    pub code: String,
    /// Message.
    pub message: String,
}

impl WireError {
    /// Map to the port error.
    #[must_use]
    pub fn into_gateway_error(self) -> GatewayError {
        match self.code.as_str() {
            "UNKNOWN_INSTRUMENT" => GatewayError::UnknownInstrument(self.message),
            "BUSY" | "RATE_LIMITED" | "TIMEOUT" | "DISCONNECTED" => {
                GatewayError::Transient(format!("{}: {}", self.code, self.message))
            }
            _ => GatewayError::Rejected(format!("{}: {}", self.code, self.message)),
        }
    }
}

/// Frame received from the gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundFrame {
    /// Response to a request.
    Response {
        /// Correlation id.
        request_id: u64,
        /// Success flag.
        ok: bool,
        /// Result payload.
        #[serde(default)]
        payload: serde_json::Value,
        /// Failure detail.
        #[serde(default)]
        error: Option<WireError>,
    },
    /// Pushed event.
    Event {
        /// Event.
        event: GatewayPush,
    },
    /// Ping reply.
    Pong {
        /// Echo of the ping's send time.
        #[serde(default)]
        sent_at: Option<DateTime<Utc>>,
    },
}

/// Codec error.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Line framing failed.
    #[error("framing error: {0}")]
    Lines(#[from] LinesCodecError),
    /// Frame could not be serialized.
    #[error("encode error: {0}")]
    Json(#[from] serde_json::Error),
    /// Socket error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Newline-delimited JSON codec for gateway frames.
///
/// Lines that fail to parse are logged and skipped so one bad frame does not
/// tear down the session.
#[derive(Debug, Clone)]
pub struct GatewayCodec {
    lines: LinesCodec,
}

impl Default for GatewayCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl GatewayCodec {
    /// Create a codec with the default frame limit.
    #[must_use]
    pub fn new() -> Self {
        Self {
            lines: LinesCodec::new_with_max_length(MAX_FRAME_BYTES),
        }
    }

    fn parse(line: &str) -> Option<InboundFrame> {
        if line.trim().is_empty() {
            return None;
        }
        match serde_json::from_str(line) {
            Ok(frame) => Some(frame),
            Err(e) => {
                tracing::warn!(error = %e, bytes = line.len(), "Skipping malformed gateway frame");
                None
            }
        }
    }
}

impl Decoder for GatewayCodec {
    type Item = InboundFrame;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        while let Some(line) = self.lines.decode(src)? {
            if let Some(frame) = Self::parse(&line) {
                return Ok(Some(frame));
            }
        }
        Ok(None)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        while let Some(line) = self.lines.decode_eof(src)? {
            if let Some(frame) = Self::parse(&line) {
                return Ok(Some(frame));
            }
        }
        Ok(None)
    }
}

impl Encoder<OutboundFrame> for GatewayCodec {
    type Error = CodecError;

    fn encode(&mut self, item: OutboundFrame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let line = serde_json::to_string(&item)?;
        self.lines.encode(line, dst)?;
        Ok(())
    }
}
