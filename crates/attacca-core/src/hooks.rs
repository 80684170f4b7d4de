use attacca_ports::transport::TransportObserver;
use parking_lot::Mutex;

/// Observer lists for transport lifecycle events. Observers run
/// synchronously on the thread that calls `notify_*`, outside the
/// registration lock so they may re-register.
#[derive(Default)]
pub struct TransportHooks {
    after_load: Mutex<Vec<TransportObserver>>,
    after_stop: Mutex<Vec<TransportObserver>>,
}

impl TransportHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_after_load(&self, observer: TransportObserver) {
        self.after_load.lock().push(observer);
    }

    pub fn on_after_stop(&self, observer: TransportObserver) {
        self.after_stop.lock().push(observer);
    }

    pub fn notify_after_load(&self) {
        let observers = self.after_load.lock().clone();
        for observer in observers {
            observer();
        }
    }

    pub fn notify_after_stop(&self) {
        let observers = self.after_stop.lock().clone();
        for observer in observers {
            observer();
        }
    }
}
