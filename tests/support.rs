#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use osc_address::Interface;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

/// Counts `WARN` events seen while it is the active subscriber.
#[derive(Clone, Default)]
pub struct WarningCounter(Arc<AtomicUsize>);

impl WarningCounter {
    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    /// Runs `f` with this counter installed for the current thread.
    pub fn watch<T>(&self, f: impl FnOnce() -> T) -> T {
        let subscriber = tracing_subscriber::registry().with(self.clone());
        tracing::subscriber::with_default(subscriber, f)
    }
}

impl<S: Subscriber> Layer<S> for WarningCounter {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() == Level::WARN {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }
}

pub fn interfaces() -> Vec<Interface> {
    vec![
        Interface::new("lo", "127.0.0.1".parse().unwrap()),
        Interface::new("lo", "::1".parse().unwrap()),
        Interface::new("en0", "fe80::aede:48ff:fe00:1122".parse().unwrap()),
        Interface::new("en0", "192.168.0.20".parse().unwrap()),
    ]
}
