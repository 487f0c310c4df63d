use crate::services::service_name;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Outcome of probing a single port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortResult {
    port: u16,
    open: bool,
    service: &'static str,
}

impl PortResult {
    /// Names the service from the well-known port table.
    pub const fn new(port: u16, open: bool) -> Self {
        Self {
            port,
            open,
            service: service_name(port),
        }
    }

    pub const fn port(&self) -> u16 {
        self.port
    }

    pub const fn is_open(&self) -> bool {
        self.open
    }

    pub const fn service(&self) -> &'static str {
        self.service
    }
}

impl std::fmt::Display for PortResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.open {
            write!(f, "Port {} is open ({})", self.port, self.service)
        } else {
            write!(f, "Port {} is closed", self.port)
        }
    }
}

#[derive(Debug, Default)]
struct Tally {
    open: Vec<PortResult>,
    completed: usize,
}

/// Shared sink every worker records its result into.
///
/// The open-port list and the completed counter sit behind one lock, so a
/// reader never sees a port counted without its entry or the reverse.
#[derive(Debug, Default)]
pub struct ResultAggregator {
    tally: Mutex<Tally>,
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one finished port and keeps it if open. Returns the number of
    /// ports completed so far, including this one.
    pub fn record(&self, result: PortResult) -> usize {
        let mut tally = self.lock();
        tally.completed += 1;
        if result.open {
            tally.open.push(result);
        }
        tally.completed
    }

    /// Open ports in the order they were recorded.
    pub fn snapshot(&self) -> Vec<PortResult> {
        self.lock().open.clone()
    }

    pub fn completed(&self) -> usize {
        self.lock().completed
    }

    /// Consistent copy of both the open ports and the completed count.
    pub(crate) fn freeze(&self) -> (Vec<PortResult>, usize) {
        let tally = self.lock();
        (tally.open.clone(), tally.completed)
    }

    // A worker can only poison the lock by panicking between two plain field
    // updates, so the data behind it is still usable.
    fn lock(&self) -> MutexGuard<'_, Tally> {
        self.tally.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
