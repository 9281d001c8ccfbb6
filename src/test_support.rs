use crate::delegate::{Delegate, DelegateResult};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// One observed call on a [`StubDelegate`].
#[derive(Debug, Clone)]
pub(crate) struct CallRecord {
    pub input: String,
    pub force_structured: bool,
    /// Logical clock reading when the call started.
    pub started: usize,
    /// Logical clock reading when the call returned.
    pub finished: usize,
}

/// In-process delegate that answers through a closure and instruments calls.
///
/// Tracks the peak number of concurrent calls and stamps each call with a
/// logical clock so tests can check ordering between calls.
pub(crate) struct StubDelegate<F> {
    respond: F,
    delay: Duration,
    clock: AtomicUsize,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    calls: Mutex<Vec<CallRecord>>,
}

impl<F> StubDelegate<F>
where
    F: Fn(&str) -> DelegateResult + Send + Sync,
{
    pub(crate) fn new(respond: F) -> Self {
        Self {
            respond,
            delay: Duration::ZERO,
            clock: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Hold every call open for `delay` so concurrent calls overlap.
    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub(crate) fn calls(&self) -> Vec<CallRecord> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub(crate) fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

impl<F> Delegate for StubDelegate<F>
where
    F: Fn(&str) -> DelegateResult + Send + Sync,
{
    fn delegate(&self, input: &str, force_structured: bool) -> DelegateResult {
        let started = self.clock.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        let result = (self.respond)(input);

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        let finished = self.clock.fetch_add(1, Ordering::SeqCst);
        self.calls.lock().unwrap().push(CallRecord {
            input: input.to_string(),
            force_structured,
            started,
            finished,
        });

        result
    }
}

/// Stub that answers every request with the request itself.
pub(crate) fn echo_delegate() -> StubDelegate<impl Fn(&str) -> DelegateResult + Send + Sync> {
    StubDelegate::new(|input: &str| DelegateResult::Ok(input.to_string()))
}
