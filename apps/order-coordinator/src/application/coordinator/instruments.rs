//! Resolved-instrument registry.
//!
//! Lot and tick sizes change rarely, so an instrument is resolved from the
//! gateway once and kept for the life of the process.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::application::ports::{GatewayError, GatewayPort};
use crate::domain::instrument::{Instrument, InstrumentCode};

/// Cache of resolved instruments.
#[derive(Debug, Default)]
pub struct InstrumentRegistry {
    resolved: RwLock<HashMap<InstrumentCode, Arc<Instrument>>>,
    extended_hours: HashSet<InstrumentCode>,
}

impl InstrumentRegistry {
    /// Create a registry. Codes in `extended_hours` may trade pre/post market.
    #[must_use]
    pub fn new(extended_hours: HashSet<InstrumentCode>) -> Self {
        Self {
            resolved: RwLock::new(HashMap::new()),
            extended_hours,
        }
    }

    /// Whether `code` is flagged for extended-hours trading.
    #[must_use]
    pub fn extended_hours(&self, code: &InstrumentCode) -> bool {
        self.extended_hours.contains(code)
    }

    /// Cached instrument, if resolved.
    #[must_use]
    pub fn get(&self, code: &InstrumentCode) -> Option<Arc<Instrument>> {
        self.resolved.read().get(code).cloned()
    }

    /// Return the cached instrument or resolve it through the gateway.
    pub async fn resolve<G: GatewayPort + ?Sized>(
        &self,
        gateway: &G,
        code: &InstrumentCode,
    ) -> Result<Arc<Instrument>, GatewayError> {
        if let Some(instrument) = self.get(code) {
            return Ok(instrument);
        }
        let instrument = gateway
            .resolve_instrument(code.clone())
            .await?
            .with_extended_hours(self.extended_hours(code));
        let instrument = Arc::new(instrument);
        self.resolved
            .write()
            .insert(code.clone(), Arc::clone(&instrument));
        tracing::debug!(
            code = %code,
            lot_size = %instrument.lot_size(),
            tick_size = %instrument.tick_size(),
            "Resolved instrument"
        );
        Ok(instrument)
    }
}
