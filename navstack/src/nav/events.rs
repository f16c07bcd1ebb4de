use anyhow::Result;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use crate::nav::{Params, RevisitMode, ScreenRef};

/// Notification channels raised by the navigator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    Navigating,
    AnimationStarted,
    Navigated,
    Revisiting,
    Revisited,
    HardwareBack,
}

/// A navigation lifecycle notification
#[derive(Debug)]
pub enum NavEvent {
    /// Raised before the stacks are mutated
    Navigating { from: Option<ScreenRef>, to: ScreenRef },

    /// Page-to-page animation began; `duration` is the animation that plays
    AnimationStarted {
        from: ScreenRef,
        to: ScreenRef,
        duration: Duration,
    },

    /// Raised after the transition completed
    Navigated { from: Option<ScreenRef>, to: ScreenRef },

    /// A cached screen is about to be shown again
    Revisiting {
        screen: ScreenRef,
        params: Params,
        mode: RevisitMode,
    },

    /// A cached screen has been shown again
    Revisited {
        screen: ScreenRef,
        params: Params,
        mode: RevisitMode,
    },

    /// Physical back button; listeners may cancel the default handling
    HardwareBack(HardwareBackArgs),
}

impl NavEvent {
    pub fn topic(&self) -> Topic {
        match self {
            NavEvent::Navigating { .. } => Topic::Navigating,
            NavEvent::AnimationStarted { .. } => Topic::AnimationStarted,
            NavEvent::Navigated { .. } => Topic::Navigated,
            NavEvent::Revisiting { .. } => Topic::Revisiting,
            NavEvent::Revisited { .. } => Topic::Revisited,
            NavEvent::HardwareBack(_) => Topic::HardwareBack,
        }
    }
}

/// Cancellation flag carried by [`NavEvent::HardwareBack`]
#[derive(Debug, Default)]
pub struct HardwareBackArgs {
    cancel: AtomicBool,
}

impl HardwareBackArgs {
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }
}

pub type Handler = Arc<dyn Fn(&NavEvent) -> Result<()> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Topic-based publish/subscribe for navigation notifications.
///
/// Handlers run inline on the publishing task, in subscription order, so the
/// per-call sequence `Navigating → AnimationStarted → Navigated` holds.
#[derive(Default)]
pub struct EventBus {
    handlers: RwLock<HashMap<Topic, Vec<(SubscriptionId, Handler)>>>,
    next_id: AtomicU64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, topic: Topic, handler: F) -> SubscriptionId
    where
        F: Fn(&NavEvent) -> Result<()> + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.handlers
            .write()
            .entry(topic)
            .or_default()
            .push((id, Arc::new(handler)));
        log::debug!("Subscribed {:?} to {:?}", id, topic);
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut handlers = self.handlers.write();
        let mut removed = false;
        for list in handlers.values_mut() {
            let before = list.len();
            list.retain(|(sub_id, _)| *sub_id != id);
            removed |= list.len() != before;
        }
        removed
    }

    pub fn has_listeners(&self, topic: Topic) -> bool {
        self.handlers.read().get(&topic).is_some_and(|list| !list.is_empty())
    }

    /// Deliver `event` to every handler of its topic.
    ///
    /// A failing handler does not stop delivery; all failures are returned.
    pub fn publish(&self, event: &NavEvent) -> Vec<anyhow::Error> {
        // Snapshot so handlers can subscribe/unsubscribe without deadlocking
        let handlers: Vec<Handler> = self
            .handlers
            .read()
            .get(&event.topic())
            .map(|list| list.iter().map(|(_, handler)| handler.clone()).collect())
            .unwrap_or_default();

        log::trace!("Publishing {:?} to {} handler(s)", event.topic(), handlers.len());

        handlers
            .iter()
            .filter_map(|handler| handler(event).err())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_failing_handler_does_not_stop_delivery() {
        let bus = EventBus::new();
        let delivered = Arc::new(AtomicUsize::new(0));

        bus.subscribe(Topic::HardwareBack, |_| anyhow::bail!("listener blew up"));
        let counter = delivered.clone();
        bus.subscribe(Topic::HardwareBack, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        let failures = bus.publish(&NavEvent::HardwareBack(HardwareBackArgs::default()));
        assert_eq!(failures.len(), 1);
        assert_eq!(delivered.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_cancel_flag_visible_to_publisher() {
        let bus = EventBus::new();
        bus.subscribe(Topic::HardwareBack, |event| {
            if let NavEvent::HardwareBack(args) = event {
                args.cancel();
            }
            Ok(())
        });

        let event = NavEvent::HardwareBack(HardwareBackArgs::default());
        bus.publish(&event);
        let NavEvent::HardwareBack(args) = &event else {
            unreachable!()
        };
        assert!(args.is_cancelled());
    }

    #[test]
    fn test_unsubscribe() {
        let bus = EventBus::new();
        let id = bus.subscribe(Topic::Navigated, |_| Ok(()));
        assert!(bus.has_listeners(Topic::Navigated));
        assert!(bus.unsubscribe(id));
        assert!(!bus.has_listeners(Topic::Navigated));
        assert!(!bus.unsubscribe(id));
    }
}
