//! Event bus – typed, synchronous, in-process publish/subscribe.
//!
//! ## Dispatch model
//!
//! ```text
//! host hook point
//!   └── EventBus::publish(&E)
//!         ├── read-lock registry, clone Arc snapshot for TypeId::of::<E>()
//!         ├── release lock
//!         └── for each subscriber in registration order:
//!               catch_unwind(handle(&E))  → Err / panic logged, loop continues
//! ```
//!
//! Each event type owns an immutable handler list. `subscribe` builds a new
//! list and swaps it in under the write lock, so a publish in progress keeps
//! iterating the snapshot it already holds and never blocks on registration.
//!
//! One bus is constructed at startup and shared by reference (`Arc<EventBus>`)
//! between the hook adapters and whoever registers subscribers. There is no
//! process-wide registry.

use crate::error::SubscriberFailure;
use crate::events::BridgeEvent;
use log::{debug, warn};
use parking_lot::RwLock;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

// ---------------------------------------------------------------------------
// Subscriber interface
// ---------------------------------------------------------------------------

/// What a handler returns. An `Err` is logged by the bus and goes no further.
pub type HandlerResult = anyhow::Result<()>;

/// Receives every published event of type `E`.
///
/// Runs inline on the host's processing loop: implementations that do slow
/// work (network, disk) must hand the event to their own worker and return.
pub trait Subscriber<E>: Send + Sync {
    fn handle(&self, event: &E) -> HandlerResult;
}

struct FnSubscriber<F>(F);

impl<E, F> Subscriber<E> for FnSubscriber<F>
where
    F: Fn(&E) -> HandlerResult + Send + Sync,
{
    fn handle(&self, event: &E) -> HandlerResult {
        (self.0)(event)
    }
}

type HandlerList<E> = Vec<Arc<dyn Subscriber<E>>>;

// ---------------------------------------------------------------------------
// Delivery report
// ---------------------------------------------------------------------------

/// Outcome of one [`EventBus::publish`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Delivery {
    /// Handlers that returned `Ok`.
    pub delivered: usize,
    /// Handlers that returned `Err` or panicked.
    pub failed: usize,
}

impl Delivery {
    pub fn attempted(&self) -> usize {
        self.delivered + self.failed
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct EventBus {
    registry: RwLock<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `subscriber` for events of type `E`.
    ///
    /// Handlers run in registration order. The same subscriber may be
    /// registered for several event types.
    pub fn subscribe<E, S>(&self, subscriber: Arc<S>)
    where
        E: BridgeEvent,
        S: Subscriber<E> + 'static,
    {
        let subscriber: Arc<dyn Subscriber<E>> = subscriber;
        let mut registry = self.registry.write();

        let mut handlers: HandlerList<E> = registry
            .get(&TypeId::of::<E>())
            .and_then(|slot| slot.clone().downcast::<HandlerList<E>>().ok())
            .map(|current| (*current).clone())
            .unwrap_or_default();
        handlers.push(subscriber);

        debug!("Subscriber #{} registered for {}", handlers.len(), E::KIND);
        registry.insert(TypeId::of::<E>(), Arc::new(handlers));
    }

    /// Register a closure for events of type `E`.
    pub fn subscribe_fn<E, F>(&self, handler: F)
    where
        E: BridgeEvent,
        F: Fn(&E) -> HandlerResult + Send + Sync + 'static,
    {
        self.subscribe::<E, _>(Arc::new(FnSubscriber(handler)));
    }

    pub fn subscriber_count<E: BridgeEvent>(&self) -> usize {
        self.snapshot::<E>().map_or(0, |handlers| handlers.len())
    }

    /// Deliver `event` to every subscriber of `E`, synchronously and in
    /// registration order.
    ///
    /// Never fails and never unwinds: handler errors and panics are logged
    /// and counted in the returned [`Delivery`].
    pub fn publish<E: BridgeEvent>(&self, event: &E) -> Delivery {
        let mut delivery = Delivery::default();
        let Some(handlers) = self.snapshot::<E>() else {
            return delivery;
        };

        for (index, handler) in handlers.iter().enumerate() {
            match invoke(&**handler, event) {
                Ok(()) => delivery.delivered += 1,
                Err(failure) => {
                    delivery.failed += 1;
                    warn!("Subscriber #{} for {} failed: {}", index + 1, E::KIND, failure);
                }
            }
        }

        delivery
    }

    fn snapshot<E: BridgeEvent>(&self) -> Option<Arc<HandlerList<E>>> {
        // Clone the Arc under the read lock, then release before dispatch.
        let slot = self.registry.read().get(&TypeId::of::<E>()).cloned()?;
        slot.downcast::<HandlerList<E>>().ok()
    }
}

fn invoke<E>(handler: &dyn Subscriber<E>, event: &E) -> Result<(), SubscriberFailure> {
    match panic::catch_unwind(AssertUnwindSafe(|| handler.handle(event))) {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(SubscriberFailure::Failed(e)),
        Err(payload) => Err(SubscriberFailure::Panicked(panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
