//! Named-event publish/subscribe bus.
//!
//! # Responsibility
//! - Keep an ordered list of handler registrations per event name.
//! - Fan out `emit` calls synchronously on the caller's stack.
//!
//! # Invariants
//! - Handlers run in registration order.
//! - `emit` snapshots the handler list before invoking anything: registrations
//!   added during an emission run only on the next emission, registrations
//!   removed during an emission still run for the in-flight one.
//! - The first handler error aborts the rest of that emission and is returned
//!   to the emitter.
//! - No borrow of the registration table is held while a handler runs, so
//!   handlers may re-enter `subscribe`/`unsubscribe`/`emit`.

use crate::error::{BoxError, InvalidArgument};
use log::{debug, trace};
use serde_json::Value;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

// Shared by every bus so a handle never matches a registration on another bus.
static NEXT_SUBSCRIPTION_ID: AtomicU64 = AtomicU64::new(1);

/// Result returned by one handler invocation.
pub type HandlerResult = Result<(), BoxError>;

/// Shared handler reference.
///
/// The same `Handler` may be subscribed several times; it is invoked once per
/// registration and [`EventBus::unsubscribe_handler`] removes all of them.
pub type Handler = Rc<dyn Fn(&EventBus, &[Value]) -> HandlerResult>;

/// Wraps a closure into a reusable [`Handler`].
pub fn handler<F>(f: F) -> Handler
where
    F: Fn(&EventBus, &[Value]) -> HandlerResult + 'static,
{
    Rc::new(f)
}

/// Identifies exactly one registration; ids are unique across all buses.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle {
    event: String,
    id: u64,
}

impl SubscriptionHandle {
    pub fn event(&self) -> &str {
        &self.event
    }

    pub fn id(&self) -> u64 {
        self.id
    }
}

struct Registration {
    id: u64,
    handler: Handler,
}

/// Synchronous in-process event bus.
#[derive(Default)]
pub struct EventBus {
    registrations: RefCell<BTreeMap<String, Vec<Registration>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for every future emission of `event`.
    ///
    /// # Errors
    /// - [`InvalidArgument::EmptyEventName`] when `event` is blank.
    pub fn subscribe(
        &self,
        event: &str,
        handler: Handler,
    ) -> Result<SubscriptionHandle, InvalidArgument> {
        if event.trim().is_empty() {
            return Err(InvalidArgument::EmptyEventName);
        }

        let id = NEXT_SUBSCRIPTION_ID.fetch_add(1, Ordering::Relaxed);
        self.registrations
            .borrow_mut()
            .entry(event.to_string())
            .or_default()
            .push(Registration { id, handler });

        trace!("event=subscribe module=bus status=ok name={event} subscription_id={id}");
        Ok(SubscriptionHandle {
            event: event.to_string(),
            id,
        })
    }

    /// Closure convenience over [`EventBus::subscribe`].
    pub fn on<F>(&self, event: &str, f: F) -> Result<SubscriptionHandle, InvalidArgument>
    where
        F: Fn(&EventBus, &[Value]) -> HandlerResult + 'static,
    {
        self.subscribe(event, handler(f))
    }

    /// Removes the registration behind `handle`.
    ///
    /// Returns the number of removed registrations (`0` or `1`). Removing a
    /// registration that no longer exists is a no-op.
    pub fn unsubscribe(&self, handle: &SubscriptionHandle) -> usize {
        self.remove_where(handle.event(), |registration| registration.id == handle.id)
    }

    /// Removes every registration of `handler` under `event`.
    ///
    /// Returns the number of removed registrations; `0` when none matched.
    pub fn unsubscribe_handler(&self, event: &str, handler: &Handler) -> usize {
        self.remove_where(event, |registration| {
            Rc::ptr_eq(&registration.handler, handler)
        })
    }

    /// Invokes every handler registered for `event` with `args`.
    ///
    /// Returns the number of handlers invoked. An event without subscribers is
    /// `Ok(0)`.
    ///
    /// # Errors
    /// - [`HandlerError`] from the first failing handler; the handlers after it
    ///   are not invoked for this emission.
    pub fn emit(&self, event: &str, args: &[Value]) -> Result<usize, HandlerError> {
        let snapshot: Vec<(u64, Handler)> = match self.registrations.borrow().get(event) {
            Some(registrations) => registrations
                .iter()
                .map(|registration| (registration.id, Rc::clone(&registration.handler)))
                .collect(),
            None => {
                trace!("event=emit module=bus status=skipped name={event} handlers=0");
                return Ok(0);
            }
        };

        debug!(
            "event=emit module=bus status=start name={event} handlers={} args={}",
            snapshot.len(),
            args.len()
        );
        for (position, (subscription_id, handler)) in snapshot.iter().enumerate() {
            if let Err(source) = handler(self, args) {
                debug!(
                    "event=emit module=bus status=error name={event} subscription_id={subscription_id} position={position}"
                );
                return Err(HandlerError {
                    event: event.to_string(),
                    subscription_id: *subscription_id,
                    position,
                    source,
                });
            }
        }
        Ok(snapshot.len())
    }

    /// Number of live registrations for `event`.
    pub fn handler_count(&self, event: &str) -> usize {
        self.registrations
            .borrow()
            .get(event)
            .map_or(0, |registrations| registrations.len())
    }

    pub fn has_subscribers(&self, event: &str) -> bool {
        self.handler_count(event) > 0
    }

    /// Event names with at least one registration, sorted.
    pub fn event_names(&self) -> Vec<String> {
        self.registrations.borrow().keys().cloned().collect()
    }

    fn remove_where(&self, event: &str, matches: impl Fn(&Registration) -> bool) -> usize {
        let mut registrations = self.registrations.borrow_mut();
        let Some(list) = registrations.get_mut(event) else {
            return 0;
        };

        let before = list.len();
        list.retain(|registration| !matches(registration));
        let removed = before - list.len();
        if list.is_empty() {
            registrations.remove(event);
        }
        if removed > 0 {
            trace!("event=unsubscribe module=bus status=ok name={event} removed={removed}");
        }
        removed
    }
}

impl Debug for EventBus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let counts: BTreeMap<String, usize> = self
            .registrations
            .borrow()
            .iter()
            .map(|(event, list)| (event.clone(), list.len()))
            .collect();
        f.debug_struct("EventBus")
            .field("registrations", &counts)
            .finish()
    }
}

/// Failure raised by a handler during [`EventBus::emit`].
#[derive(Debug)]
pub struct HandlerError {
    /// Event being emitted.
    pub event: String,
    /// Registration whose handler failed.
    pub subscription_id: u64,
    /// Zero-based position of the failing handler within the emission.
    pub position: usize,
    pub source: BoxError,
}

impl Display for HandlerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "handler #{} (subscription {}) for event `{}` failed: {}",
            self.position, self.subscription_id, self.event, self.source
        )
    }
}

impl Error for HandlerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&*self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::{handler, EventBus, HandlerResult};
    use crate::error::InvalidArgument;
    use serde_json::{json, Value};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn recorder(log: &Rc<RefCell<Vec<String>>>, tag: &'static str) -> super::Handler {
        let log = Rc::clone(log);
        handler(move |_bus, args| -> HandlerResult {
            log.borrow_mut().push(format!("{tag}:{}", Value::from(args.to_vec())));
            Ok(())
        })
    }

    #[test]
    fn emits_in_registration_order_with_same_args() {
        let bus = EventBus::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        bus.subscribe("save", recorder(&log, "a")).expect("subscribe a");
        bus.subscribe("save", recorder(&log, "b")).expect("subscribe b");
        bus.subscribe("save", recorder(&log, "c")).expect("subscribe c");

        let invoked = bus.emit("save", &[json!(1), json!("x")]).expect("emit");
        assert_eq!(invoked, 3);
        assert_eq!(
            *log.borrow(),
            vec![
                "a:[1,\"x\"]".to_string(),
                "b:[1,\"x\"]".to_string(),
                "c:[1,\"x\"]".to_string(),
            ]
        );
    }

    #[test]
    fn rejects_blank_event_name() {
        let bus = EventBus::new();
        let err = bus
            .on("  ", |_bus, _args| Ok(()))
            .expect_err("blank event must be rejected");
        assert_eq!(err, InvalidArgument::EmptyEventName);
    }

    #[test]
    fn emit_without_subscribers_is_noop() {
        let bus = EventBus::new();
        assert_eq!(bus.emit("nobody-listens", &[]).expect("emit"), 0);
    }

    #[test]
    fn same_handler_registered_twice_runs_twice_and_is_removed_together() {
        let bus = EventBus::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let shared = recorder(&log, "dup");
        bus.subscribe("tick", Rc::clone(&shared)).expect("first");
        bus.subscribe("tick", Rc::clone(&shared)).expect("second");

        bus.emit("tick", &[]).expect("emit");
        assert_eq!(log.borrow().len(), 2);

        assert_eq!(bus.unsubscribe_handler("tick", &shared), 2);
        assert!(!bus.has_subscribers("tick"));
    }

    #[test]
    fn unsubscribe_by_handle_removes_only_that_registration() {
        let bus = EventBus::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let shared = recorder(&log, "h");
        let first = bus.subscribe("tick", Rc::clone(&shared)).expect("first");
        bus.subscribe("tick", shared).expect("second");

        assert_eq!(bus.unsubscribe(&first), 1);
        assert_eq!(bus.unsubscribe(&first), 0);
        assert_eq!(bus.handler_count("tick"), 1);
    }

    #[test]
    fn handle_from_another_bus_removes_nothing() {
        let first = EventBus::new();
        let second = EventBus::new();
        let handle = first.on("tick", |_bus, _args| Ok(())).expect("first bus");
        second.on("tick", |_bus, _args| Ok(())).expect("second bus");

        assert_eq!(second.unsubscribe(&handle), 0);
        assert_eq!(second.handler_count("tick"), 1);
        assert_eq!(first.unsubscribe(&handle), 1);
        assert_eq!(first.handler_count("tick"), 0);
    }

    #[test]
    fn unsubscribe_of_unknown_handler_is_noop() {
        let bus = EventBus::new();
        let stranger = handler(|_bus, _args| Ok(()));
        assert_eq!(bus.unsubscribe_handler("tick", &stranger), 0);
    }

    #[test]
    fn debug_output_lists_counts() {
        let bus = EventBus::new();
        bus.on("a", |_bus, _args| Ok(())).expect("subscribe");
        let rendered = format!("{bus:?}");
        assert!(rendered.contains("\"a\": 1"));
    }

    #[test]
    fn event_names_are_sorted_and_pruned() {
        let bus = EventBus::new();
        let handle = bus.on("zeta", |_bus, _args| Ok(())).expect("zeta");
        bus.on("alpha", |_bus, _args| Ok(())).expect("alpha");
        assert_eq!(bus.event_names(), vec!["alpha".to_string(), "zeta".to_string()]);

        bus.unsubscribe(&handle);
        assert_eq!(bus.event_names(), vec!["alpha".to_string()]);
    }
}
