use super::aggregator::{PortResult, ResultAggregator};
use crate::address::ScanTarget;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Lifecycle of a scan: `Idle -> Running -> {Completed | Interrupted}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    Idle,
    Running,
    Completed,
    Interrupted,
}

/// Everything one scan run produced.
///
/// While the scan runs, workers write through the shared
/// [`ResultAggregator`]. Finishing the session copies the aggregator's
/// contents once; anything recorded afterwards by an abandoned worker is
/// not part of the session.
#[derive(Debug)]
pub struct ScanSession {
    target: ScanTarget,
    total: usize,
    state: ScanState,
    started: Option<Instant>,
    elapsed: Duration,
    results: Arc<ResultAggregator>,
    frozen: Option<(Vec<PortResult>, usize)>,
}

impl ScanSession {
    pub(crate) fn new(target: ScanTarget, total: usize) -> Self {
        Self {
            target,
            total,
            state: ScanState::Idle,
            started: None,
            elapsed: Duration::ZERO,
            results: Arc::new(ResultAggregator::new()),
            frozen: None,
        }
    }

    pub(crate) fn start(&mut self) {
        debug_assert_eq!(self.state, ScanState::Idle);
        self.state = ScanState::Running;
        self.started = Some(Instant::now());
    }

    /// Shared handle handed to workers.
    pub(crate) fn aggregator(&self) -> Arc<ResultAggregator> {
        Arc::clone(&self.results)
    }

    pub(crate) fn finish(&mut self, state: ScanState) {
        debug_assert_eq!(self.state, ScanState::Running);
        self.state = state;
        self.elapsed = self.started.map_or(Duration::ZERO, |started| started.elapsed());
        self.frozen = Some(self.results.freeze());
    }

    pub const fn target(&self) -> &ScanTarget {
        &self.target
    }

    pub const fn state(&self) -> ScanState {
        self.state
    }

    /// Number of ports the scan set out to probe.
    pub const fn total(&self) -> usize {
        self.total
    }

    /// Ports that finished probing, open or closed.
    pub fn completed(&self) -> usize {
        self.frozen
            .as_ref()
            .map_or_else(|| self.results.completed(), |(_, completed)| *completed)
    }

    /// Open ports in discovery order.
    pub fn open_ports(&self) -> Vec<PortResult> {
        self.frozen
            .as_ref()
            .map_or_else(|| self.results.snapshot(), |(open, _)| open.clone())
    }

    /// Time from the first dispatch until the barrier released or the scan
    /// was interrupted. Zero until the session is finished.
    pub const fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn is_complete(&self) -> bool {
        self.state == ScanState::Completed
    }
}

#[cfg(test)]
mod tests {
    use super::{ScanSession, ScanState};
    use crate::address::ScanTarget;
    use crate::scanner::PortResult;
    use std::time::Duration;

    fn session() -> ScanSession {
        let target = ScanTarget::parse(Some("127.0.0.1"), Duration::from_millis(100)).unwrap();
        ScanSession::new(target, 3)
    }

    #[test]
    fn lifecycle_runs_idle_to_completed() {
        let mut session = session();
        assert_eq!(session.state(), ScanState::Idle);

        session.start();
        assert_eq!(session.state(), ScanState::Running);

        session.finish(ScanState::Completed);
        assert!(session.is_complete());
    }

    #[test]
    fn finished_session_ignores_late_records() {
        let mut session = session();
        session.start();
        let aggregator = session.aggregator();
        aggregator.record(PortResult::new(22, true));

        session.finish(ScanState::Interrupted);
        aggregator.record(PortResult::new(80, true));

        assert_eq!(session.completed(), 1);
        assert_eq!(session.open_ports(), vec![PortResult::new(22, true)]);
        assert_eq!(session.total(), 3);
    }

    #[test]
    fn running_session_reads_through_to_the_aggregator() {
        let mut session = session();
        session.start();
        session.aggregator().record(PortResult::new(443, true));

        assert_eq!(session.completed(), 1);
        assert_eq!(session.open_ports().len(), 1);
        assert_eq!(session.elapsed(), Duration::ZERO);
    }
}
