//! The controlling proxy: sole strong owner of an [`Instance`].
//!
//! Handles share ownership of the proxy, never of the instance directly, so
//! "start once, stop once on last release" holds however many handles exist.

use crate::instance::Instance;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub(crate) struct Proxy {
    instance: Arc<Instance>,
    started: AtomicBool,
}

impl Proxy {
    pub fn new(instance: Arc<Instance>) -> Self {
        Self {
            instance,
            started: AtomicBool::new(false),
        }
    }

    pub fn instance(&self) -> &Arc<Instance> {
        &self.instance
    }

    pub fn start(&self) {
        if !self.started.swap(true, Ordering::AcqRel) {
            self.instance.start();
        }
    }
}

impl Drop for Proxy {
    fn drop(&mut self) {
        if self.started.load(Ordering::Acquire) {
            self.instance.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{LifecycleError, Outcome};
    use crate::executor::ExecutorContext;
    use crate::lifecycle::Event;
    use crate::mock::MockTimer;
    use parking_lot::Mutex;

    fn proxy() -> Proxy {
        Proxy::new(Instance::new(
            "fgumschak!".into(),
            ExecutorContext::new("proxy-test"),
            Arc::new(MockTimer::new()),
            None,
        ))
    }

    fn record(log: &Arc<Mutex<Vec<Outcome>>>) -> Event {
        let log = log.clone();
        Event::RequestDeathNotification(Box::new(move |outcome| log.lock().push(outcome)))
    }

    #[test]
    fn test_started_proxy_stops_instance_on_drop() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let proxy = proxy();
        proxy.start();
        proxy.start();
        proxy.instance().process_event(record(&log));
        let weak = Arc::downgrade(proxy.instance());

        drop(proxy);
        assert_eq!(*log.lock(), vec![Err(LifecycleError::Aborted)]);
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn test_unstarted_proxy_does_not_stop() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let proxy = proxy();
        proxy.instance().process_event(record(&log));

        drop(proxy);
        // Never stopped: the handler is dropped with the instance, unfired.
        assert!(log.lock().is_empty());
    }
}
