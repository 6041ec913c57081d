//! Typed subscriptions to protocol events.
//!
//! A subscription is registered for one method and receives every matching
//! event as an `Arc<dyn Event>` over an unbounded channel; the
//! [`EventStream`] on the receiving half restores the concrete payload type.

use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::channel::mpsc::{UnboundedReceiver, UnboundedSender};
use futures::Stream;

use chromite_cdp::cdp::{Event, EventKind, IntoEventKind};
use chromite_types::MethodId;

/// The registry of active subscriptions of one event source, grouped by the
/// method they are interested in.
///
/// Delivery is eager: dispatching hands the event to every matching
/// subscription right away, and subscriptions whose receiving half was
/// dropped are pruned in the same step.
#[derive(Debug, Default)]
pub struct Subscriptions {
    entries: HashMap<MethodId, Vec<Subscription>>,
}

impl Subscriptions {
    /// Register a subscription.
    pub fn add(&mut self, subscription: Subscription) {
        self.entries
            .entry(subscription.method.clone())
            .or_default()
            .push(subscription);
    }

    /// Deliver a built-in event to every subscription of its method.
    pub fn dispatch<T: Event>(&mut self, event: T) {
        if let Some(subscriptions) = self.entries.get_mut(&T::method_id()) {
            let event: Arc<dyn Event> = Arc::new(event);
            subscriptions.retain(|subscription| subscription.deliver(&event));
        }
    }

    /// Decode and deliver an event the crate has no static payload type for.
    ///
    /// The conversion registered by the first custom subscription for the
    /// method decides the payload type; without one the event is dropped.
    pub fn dispatch_custom(
        &mut self,
        method: &str,
        params: serde_json::Value,
    ) -> serde_json::Result<()> {
        let Some(subscriptions) = self.entries.get_mut(method) else {
            return Ok(());
        };
        let Some(convert) = subscriptions.iter().find_map(|subscription| {
            match &subscription.kind {
                EventKind::Custom(convert) => Some(convert),
                EventKind::BuiltIn => None,
            }
        }) else {
            return Ok(());
        };
        let event = convert(params)?;
        subscriptions
            .retain(|subscription| !subscription.kind.is_custom() || subscription.deliver(&event));
        Ok(())
    }
}

/// A single registered subscription: where to deliver, and how to decode
/// payloads the crate does not know statically.
pub struct Subscription {
    sender: UnboundedSender<Arc<dyn Event>>,
    method: MethodId,
    kind: EventKind,
}

impl Subscription {
    pub fn new<T: IntoEventKind>(sender: UnboundedSender<Arc<dyn Event>>) -> Self {
        Self {
            sender,
            method: T::method_id(),
            kind: T::event_kind(),
        }
    }

    /// Hand the event over; reports whether the receiver is still alive.
    fn deliver(&self, event: &Arc<dyn Event>) -> bool {
        self.sender.unbounded_send(Arc::clone(event)).is_ok()
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("method", &self.method)
            .field("kind", &self.kind)
            .finish()
    }
}

/// The receiving half of a subscription, yielding events as their concrete
/// type.
pub struct EventStream<T> {
    incoming: UnboundedReceiver<Arc<dyn Event>>,
    _marker: PhantomData<T>,
}

impl<T> EventStream<T> {
    pub fn new(incoming: UnboundedReceiver<Arc<dyn Event>>) -> Self {
        Self {
            incoming,
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for EventStream<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream").finish()
    }
}

impl<T: IntoEventKind + Unpin> Stream for EventStream<T> {
    type Item = Arc<T>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let pin = self.get_mut();
        // payloads of a different type than requested are skipped, the
        // stream keeps looking for the next matching one
        loop {
            match Pin::new(&mut pin.incoming).poll_next(cx) {
                Poll::Ready(Some(event)) => {
                    if let Ok(event) = event.into_any_arc().downcast::<T>() {
                        return Poll::Ready(Some(event));
                    }
                }
                Poll::Ready(None) => return Poll::Ready(None),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use futures::channel::mpsc::unbounded;
    use futures::executor::block_on;
    use futures::StreamExt;

    use chromite_cdp::cdp::browser_protocol::page::{EventFrameDetached, EventLifecycleEvent};
    use chromite_cdp::cdp::CustomEvent;
    use chromite_types::{MethodId, MethodType};

    use super::*;

    fn lifecycle(name: &str) -> EventLifecycleEvent {
        EventLifecycleEvent {
            frame_id: "frame".into(),
            loader_id: "loader".into(),
            name: name.to_string(),
            timestamp: None,
        }
    }

    #[test]
    fn every_subscription_of_a_method_receives_the_event() {
        let mut subscriptions = Subscriptions::default();
        let (tx_a, rx_a) = unbounded();
        let (tx_b, rx_b) = unbounded();
        subscriptions.add(Subscription::new::<EventLifecycleEvent>(tx_a));
        subscriptions.add(Subscription::new::<EventLifecycleEvent>(tx_b));

        subscriptions.dispatch(lifecycle("load"));
        drop(subscriptions);

        for rx in [rx_a, rx_b] {
            let mut stream = EventStream::<EventLifecycleEvent>::new(rx);
            assert_eq!(block_on(stream.next()).unwrap().name, "load");
            assert!(block_on(stream.next()).is_none());
        }
    }

    #[test]
    fn events_only_reach_subscriptions_of_their_method() {
        let mut subscriptions = Subscriptions::default();
        let (tx, rx) = unbounded();
        subscriptions.add(Subscription::new::<EventFrameDetached>(tx));

        subscriptions.dispatch(lifecycle("load"));
        drop(subscriptions);

        let mut stream = EventStream::<EventFrameDetached>::new(rx);
        assert!(block_on(stream.next()).is_none());
    }

    #[test]
    fn dropped_receivers_are_pruned_on_dispatch() {
        let mut subscriptions = Subscriptions::default();
        let (tx_dead, rx_dead) = unbounded();
        let (tx_live, rx_live) = unbounded();
        subscriptions.add(Subscription::new::<EventLifecycleEvent>(tx_dead));
        subscriptions.add(Subscription::new::<EventLifecycleEvent>(tx_live));
        drop(rx_dead);

        subscriptions.dispatch(lifecycle("init"));
        assert_eq!(subscriptions.entries["Page.lifecycleEvent"].len(), 1);

        subscriptions.dispatch(lifecycle("load"));
        drop(subscriptions);

        let mut stream = EventStream::<EventLifecycleEvent>::new(rx_live);
        assert_eq!(block_on(stream.next()).unwrap().name, "init");
        assert_eq!(block_on(stream.next()).unwrap().name, "load");
        assert!(block_on(stream.next()).is_none());
    }

    #[test]
    fn custom_payloads_are_decoded_through_the_registered_conversion() {
        use serde::Deserialize;

        #[derive(Debug, Clone, PartialEq, Deserialize)]
        struct DataCollected {
            value: Vec<u32>,
        }

        impl MethodType for DataCollected {
            fn method_id() -> MethodId {
                "Tracing.dataCollected".into()
            }
        }
        impl CustomEvent for DataCollected {}

        let mut subscriptions = Subscriptions::default();
        let (tx, rx) = unbounded();
        subscriptions.add(Subscription::new::<DataCollected>(tx));

        subscriptions
            .dispatch_custom(
                "Tracing.dataCollected",
                serde_json::json!({"value": [1, 2, 3]}),
            )
            .unwrap();
        // a payload the conversion cannot decode is an error, not a panic
        assert!(subscriptions
            .dispatch_custom("Tracing.dataCollected", serde_json::json!(42))
            .is_err());
        drop(subscriptions);

        let mut stream = EventStream::<DataCollected>::new(rx);
        assert_eq!(block_on(stream.next()).unwrap().value, vec![1, 2, 3]);
        assert!(block_on(stream.next()).is_none());
    }
}
