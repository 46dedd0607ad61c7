//! Gateway push routing.
//!
//! Quotes go straight to the cache. Order events are queued per gateway
//! order id and drained by one worker task per order, so events for one
//! order apply in arrival order while different orders proceed in parallel.
//! A worker exits after sitting idle and is respawned on the next event;
//! the replacement starts only after the old worker has drained its queue.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::application::coordinator::OrderCoordinator;
use crate::application::ports::{GatewayPort, GatewayPush};
use crate::domain::order_execution::GatewayOrderEvent;
use crate::domain::shared::GatewayOrderId;

const WORKER_QUEUE: usize = 64;

struct Worker {
    tx: mpsc::Sender<GatewayOrderEvent>,
    handle: JoinHandle<()>,
}

impl Worker {
    fn is_gone(&self) -> bool {
        self.tx.is_closed() && self.handle.is_finished()
    }
}

/// Routes gateway pushes into the coordinator.
pub struct EventRouter<G: GatewayPort + ?Sized + 'static> {
    coordinator: Arc<OrderCoordinator<G>>,
    workers: HashMap<GatewayOrderId, Worker>,
    tracker: TaskTracker,
    idle_timeout: Duration,
}

impl<G: GatewayPort + ?Sized + 'static> EventRouter<G> {
    /// Create a router.
    #[must_use]
    pub fn new(coordinator: Arc<OrderCoordinator<G>>) -> Self {
        Self {
            coordinator,
            workers: HashMap::new(),
            tracker: TaskTracker::new(),
            idle_timeout: Duration::from_secs(300),
        }
    }

    /// Override how long an idle worker lingers.
    #[must_use]
    pub const fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    /// Drain `pushes` until the channel closes or `cancel` fires, then wait
    /// for workers to finish their queues.
    pub async fn run(mut self, mut pushes: mpsc::Receiver<GatewayPush>, cancel: CancellationToken) {
        tracing::info!("Event router started");
        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                push = pushes.recv() => match push {
                    Some(GatewayPush::Quote(snapshot)) => {
                        self.coordinator.on_quote(snapshot);
                    }
                    Some(GatewayPush::Order(event)) => self.dispatch(event).await,
                    None => break,
                },
            }
        }
        self.workers.clear();
        self.tracker.close();
        self.tracker.wait().await;
        tracing::info!("Event router stopped");
    }

    async fn dispatch(&mut self, event: GatewayOrderEvent) {
        let key = event.gateway_order_id.clone();
        let event = match self.workers.get(&key) {
            Some(worker) => match worker.tx.send(event).await {
                Ok(()) => return,
                Err(mpsc::error::SendError(event)) => event,
            },
            None => event,
        };

        // An idle worker may still be draining; it must finish first.
        if let Some(previous) = self.workers.remove(&key)
            && let Err(e) = previous.handle.await
        {
            tracing::error!(gateway_order_id = %key, error = %e, "Order worker failed");
        }
        self.workers.retain(|_, worker| !worker.is_gone());

        let worker = self.spawn_worker(key.clone());
        if worker.tx.send(event).await.is_err() {
            tracing::warn!(gateway_order_id = %key, "Order worker closed before first event");
        }
        self.workers.insert(key, worker);
    }

    fn spawn_worker(&self, key: GatewayOrderId) -> Worker {
        let (tx, mut rx) = mpsc::channel::<GatewayOrderEvent>(WORKER_QUEUE);
        let coordinator = Arc::clone(&self.coordinator);
        let idle_timeout = self.idle_timeout;
        let handle = self.tracker.spawn(async move {
            loop {
                match tokio::time::timeout(idle_timeout, rx.recv()).await {
                    Ok(Some(event)) => {
                        coordinator.on_gateway_event(event).await;
                    }
                    Ok(None) => break,
                    Err(_) => {
                        rx.close();
                        while let Ok(event) = rx.try_recv() {
                            coordinator.on_gateway_event(event).await;
                        }
                        break;
                    }
                }
            }
            tracing::trace!(gateway_order_id = %key, "Order worker exited");
        });
        Worker { tx, handle }
    }
}
