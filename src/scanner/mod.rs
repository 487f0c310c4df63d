//! Core functionality for actual scanning behaviour.
use crate::address::ScanTarget;
use crate::tui::ProgressReporter;
use log::{debug, warn};

mod aggregator;
mod limiter;
mod probe;
mod session;

pub use aggregator::{PortResult, ResultAggregator};
pub use limiter::{ConcurrencyLimiter, Slot};
pub use probe::{Probe, TcpProbe};
pub use session::{ScanSession, ScanState};

use std::{future::Future, net::SocketAddr, sync::Arc};
use tokio::task::{JoinError, JoinSet};

/// Highest number of probes in flight at once unless told otherwise.
pub const MAX_CONCURRENT: usize = 5000;

/// Every TCP port a full scan covers.
pub const FULL_RANGE: std::ops::RangeInclusive<u16> = 1..=u16::MAX;

/// Drives a port list through the admission gate against one target.
///
/// Ports are dispatched in ascending order, one task per port, never more
/// than the limiter's capacity at once. Each task probes once, records its
/// result, advances the progress line and then gives its slot back.
#[derive(Debug)]
pub struct Scanner<P> {
    target: ScanTarget,
    ports: Vec<u16>,
    limiter: ConcurrencyLimiter,
    probe: Arc<P>,
    reporter: ProgressReporter,
}

impl<P: Probe + 'static> Scanner<P> {
    /// Scanner over `ports`, deduplicated and sorted ascending. Port 0 is
    /// never scanned.
    pub fn new(target: ScanTarget, ports: Vec<u16>, max_concurrent: usize, probe: P) -> Self {
        let mut ports = ports;
        ports.retain(|&port| port != 0);
        ports.sort_unstable();
        ports.dedup();

        let reporter = ProgressReporter::hidden(ports.len() as u64);
        Self {
            target,
            ports,
            limiter: ConcurrencyLimiter::new(max_concurrent),
            probe: Arc::new(probe),
            reporter,
        }
    }

    /// Scanner over every port from 1 to 65535.
    pub fn full_range(target: ScanTarget, max_concurrent: usize, probe: P) -> Self {
        Self::new(target, FULL_RANGE.collect(), max_concurrent, probe)
    }

    /// Replaces the default hidden progress reporter.
    #[must_use]
    pub fn with_reporter(mut self, reporter: ProgressReporter) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn ports(&self) -> &[u16] {
        &self.ports
    }

    pub const fn limiter(&self) -> &ConcurrencyLimiter {
        &self.limiter
    }

    /// Runs the scan until every port completed or `cancel` resolves.
    ///
    /// On completion the session is [`ScanState::Completed`] and accounts for
    /// every port. Once `cancel` resolves no further probe is dispatched,
    /// in-flight probes are aborted and the partial session comes back as
    /// [`ScanState::Interrupted`].
    pub async fn run<F>(&self, cancel: F) -> ScanSession
    where
        F: Future<Output = ()>,
    {
        let mut session = ScanSession::new(self.target, self.ports.len());
        let aggregator = session.aggregator();
        let mut workers = JoinSet::new();
        tokio::pin!(cancel);

        debug!(
            "Start scanning sockets. \nBatch size {}\nTarget {}\nNumber of ports {}\nTimeout {:?}",
            self.limiter.capacity(),
            self.target.address(),
            self.ports.len(),
            self.target.timeout(),
        );

        session.start();
        let mut interrupted = false;

        for &port in &self.ports {
            let slot = tokio::select! {
                biased;
                () = &mut cancel => {
                    interrupted = true;
                    break;
                }
                slot = self.limiter.acquire() => slot,
            };
            let Ok(slot) = slot else {
                debug!("Admission gate closed before port {port}");
                interrupted = true;
                break;
            };

            let socket = SocketAddr::new(self.target.address(), port);
            let probe = Arc::clone(&self.probe);
            let aggregator = Arc::clone(&aggregator);
            let reporter = self.reporter.clone();

            workers.spawn(async move {
                let open = probe.probe(socket).await;
                let completed = aggregator.record(PortResult::new(port, open));
                reporter.advance(completed as u64);
                slot.release();
            });

            // Reap finished workers so the set only holds what is in flight.
            while let Some(joined) = workers.try_join_next() {
                log_lost_worker(joined);
            }
        }

        if !interrupted {
            let barrier = async {
                while let Some(joined) = workers.join_next().await {
                    log_lost_worker(joined);
                }
            };
            tokio::select! {
                biased;
                () = &mut cancel => interrupted = true,
                () = barrier => {}
            }
        }

        // A worker that panicked never recorded its port.
        if !interrupted && session.completed() < session.total() {
            warn!(
                "Only {} of {} ports completed, the scan is incomplete",
                session.completed(),
                session.total()
            );
            interrupted = true;
        }

        if interrupted {
            self.limiter.close();
            workers.abort_all();
            session.finish(ScanState::Interrupted);
            self.reporter.abandon();
            debug!(
                "Scan interrupted after {} of {} ports",
                session.completed(),
                session.total()
            );
        } else {
            session.finish(ScanState::Completed);
            self.reporter.finish();
            debug!("Open Sockets found: {:?}", session.open_ports());
        }

        session
    }
}

fn log_lost_worker(joined: Result<(), JoinError>) {
    if let Err(e) = joined {
        warn!("A scan worker did not finish: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn localhost() -> ScanTarget {
        ScanTarget::new(IpAddr::V4(Ipv4Addr::LOCALHOST), Duration::from_millis(100)).unwrap()
    }

    /// Reports a fixed set of ports as open without touching the network.
    struct FixedProbe {
        open: Vec<u16>,
        calls: AtomicUsize,
    }

    impl Probe for FixedProbe {
        fn probe(&self, socket: SocketAddr) -> impl Future<Output = bool> + Send {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let open = self.open.contains(&socket.port());
            async move { open }
        }
    }

    /// Panics on one port, like a probe with a bug would.
    struct PanicOnPort(u16);

    impl Probe for PanicOnPort {
        fn probe(&self, socket: SocketAddr) -> impl Future<Output = bool> + Send {
            let port = self.0;
            async move {
                assert_ne!(socket.port(), port, "failing on purpose");
                false
            }
        }
    }

    #[test]
    fn ports_are_sorted_and_deduplicated() {
        let probe = FixedProbe {
            open: vec![],
            calls: AtomicUsize::new(0),
        };
        let scanner = Scanner::new(localhost(), vec![443, 0, 22, 443, 80], 10, probe);
        assert_eq!(scanner.ports(), &[22, 80, 443]);
    }

    #[tokio::test]
    async fn scanner_reports_fixed_open_ports() {
        let probe = FixedProbe {
            open: vec![22, 8080],
            calls: AtomicUsize::new(0),
        };
        let scanner = Scanner::new(localhost(), (1..=1_000).chain([8080]).collect(), 10, probe);
        let session = scanner.run(std::future::pending()).await;

        assert!(session.is_complete());
        assert_eq!(session.completed(), 1_001);
        assert_eq!(scanner.probe.calls.load(Ordering::SeqCst), 1_001);
        let mut open: Vec<u16> = session.open_ports().iter().map(PortResult::port).collect();
        open.sort_unstable();
        assert_eq!(open, vec![22, 8080]);
        assert!(session
            .open_ports()
            .iter()
            .any(|result| result.port() == 22 && result.service() == "ssh"));
    }

    #[tokio::test]
    async fn panicked_worker_leaves_the_scan_incomplete() {
        let scanner = Scanner::new(localhost(), (1..=10).collect(), 4, PanicOnPort(7));
        let session = scanner.run(std::future::pending()).await;

        assert_eq!(session.completed(), 9);
        assert_eq!(session.state(), ScanState::Interrupted);
        assert!(!session.is_complete());
    }

    #[tokio::test]
    async fn scanner_runs() {
        // Makes sure a real scan of a small range completes.
        let probe = TcpProbe::new(Duration::from_millis(100));
        let scanner = Scanner::new(localhost(), (1..=1_000).collect(), 10, probe);
        let session = scanner.run(std::future::pending()).await;
        assert_eq!(session.completed(), 1_000);
        assert_eq!(scanner.limiter().in_flight(), 0);
    }

    #[tokio::test]
    async fn ipv6_scanner_runs() {
        let target = ScanTarget::parse(Some("::1"), Duration::from_millis(100)).unwrap();
        let probe = TcpProbe::new(target.timeout());
        let scanner = Scanner::new(target, (1..=1_000).collect(), 10, probe);
        let session = scanner.run(std::future::pending()).await;
        assert!(session.is_complete());
    }

    #[tokio::test]
    async fn cancelled_before_start_dispatches_nothing() {
        let probe = FixedProbe {
            open: vec![22],
            calls: AtomicUsize::new(0),
        };
        let scanner = Scanner::full_range(localhost(), 100, probe);
        let session = scanner.run(std::future::ready(())).await;

        assert_eq!(session.state(), ScanState::Interrupted);
        assert_eq!(scanner.probe.calls.load(Ordering::SeqCst), 0);
        assert_eq!(session.completed(), 0);
        assert!(scanner.limiter().is_closed());
    }
}
