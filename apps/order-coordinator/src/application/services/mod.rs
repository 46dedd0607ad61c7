//! Application Services
//!
//! Background tasks that drive the coordinator: routing gateway pushes to
//! per-order workers, periodic reconciliation, and day-order expiry at
//! session close. Each runs until its cancellation token fires.

mod event_router;
mod reconciliation_loop;
mod session_close;

pub use event_router::EventRouter;
pub use reconciliation_loop::ReconciliationLoop;
pub use session_close::SessionCloseSweeper;
