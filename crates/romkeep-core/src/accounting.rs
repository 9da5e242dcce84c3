//! Playtime accounting for one game process
//!
//! The launch script runs `romkeep account <file> <pid>` next to the
//! emulator. The accountant samples the emulator's scheduler state at a
//! fixed interval, counts only the intervals it was running (a suspended
//! game is not being played), and writes a single session record once the
//! process is gone.

use romkeep_api::RomRecord;
use romkeep_host_api::{ProcessHost, ProcessState};
use romkeep_store::RomRepository;
use romkeep_util::RomFile;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Step machine fed one observed process state per interval
#[derive(Debug, Clone)]
pub struct PlaytimeAccountant {
    file: RomFile,
    pid: i32,
    interval: Duration,
    elapsed: Duration,
    finished: bool,
}

impl PlaytimeAccountant {
    pub fn new(file: RomFile, pid: i32, interval: Duration) -> Self {
        Self {
            file,
            pid,
            interval,
            elapsed: Duration::ZERO,
            finished: false,
        }
    }

    /// Feed one observation; returns false once the process is gone
    pub fn observe(&mut self, state: ProcessState) -> bool {
        if self.finished {
            return false;
        }
        match state {
            ProcessState::Running => self.elapsed += self.interval,
            ProcessState::Stopped => {}
            ProcessState::Gone => self.finished = true,
        }
        !self.finished
    }

    /// Sample the host once
    pub fn poll(&mut self, host: &dyn ProcessHost) -> bool {
        let state = host.poll_state(self.pid);
        debug!(pid = self.pid, ?state, elapsed_secs = self.elapsed_secs(), "Accounting sample");
        self.observe(state)
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn elapsed_secs(&self) -> i64 {
        self.elapsed.as_secs() as i64
    }

    /// The session write for what was measured so far
    pub fn record(&self) -> RomRecord {
        RomRecord::session(self.file.clone(), self.elapsed_secs())
    }
}

/// Sample `pid` every `interval` until it is gone, then save the session.
///
/// Returns the measured seconds.
pub async fn run_accounting(
    host: Arc<dyn ProcessHost>,
    repo: RomRepository,
    file: RomFile,
    pid: i32,
    interval: Duration,
) -> i64 {
    info!(file = %file, pid, interval_secs = interval.as_secs(), "Accounting started");

    let mut accountant = PlaytimeAccountant::new(file.clone(), pid, interval);
    loop {
        tokio::time::sleep(interval).await;
        if !accountant.poll(host.as_ref()) {
            break;
        }
    }

    let elapsed = accountant.elapsed_secs();
    repo.save(&accountant.record());
    info!(file = %file, pid, elapsed_secs = elapsed, "Accounting finished");
    elapsed
}

#[cfg(test)]
mod tests {
    use super::*;
    use romkeep_host_api::MockHost;
    use romkeep_store::SqliteStore;

    const FIVE: Duration = Duration::from_secs(5);

    #[test]
    fn only_running_intervals_count() {
        let mut accountant = PlaytimeAccountant::new(RomFile::new("/roms/GBA/a.gba"), 7, FIVE);
        let states = [
            ProcessState::Running,
            ProcessState::Running,
            ProcessState::Stopped,
            ProcessState::Stopped,
            ProcessState::Running,
        ];
        for state in states {
            assert!(accountant.observe(state));
        }
        assert!(!accountant.observe(ProcessState::Gone));
        assert!(accountant.is_finished());
        assert_eq!(accountant.elapsed_secs(), 15);

        // nothing counts after the end
        assert!(!accountant.observe(ProcessState::Running));
        assert_eq!(accountant.elapsed_secs(), 15);
    }

    #[test]
    fn record_is_a_session_write() {
        let mut accountant = PlaytimeAccountant::new(RomFile::new("/roms/GBA/a.gba"), 7, FIVE);
        accountant.observe(ProcessState::Running);
        let record = accountant.record();
        assert_eq!(record.time, 5);
        assert!(!record.is_touch());
        assert!(!record.favorite.is_known());
    }

    #[test]
    fn poll_reads_host_state() {
        let host = MockHost::new();
        host.insert_process(42, ProcessState::Running);
        host.script_states(42, [ProcessState::Running, ProcessState::Stopped]);

        let mut accountant = PlaytimeAccountant::new(RomFile::new("/roms/GBA/a.gba"), 42, FIVE);
        assert!(accountant.poll(&host));
        assert!(accountant.poll(&host));
        assert!(accountant.poll(&host));
        assert_eq!(accountant.elapsed_secs(), 10);

        // unknown pids read as gone
        let mut orphan = PlaytimeAccountant::new(RomFile::new("/roms/GBA/b.gba"), 99, FIVE);
        assert!(!orphan.poll(&host));
    }

    #[tokio::test(start_paused = true)]
    async fn runner_saves_one_session() {
        let host = Arc::new(MockHost::new());
        host.insert_process(42, ProcessState::Gone);
        host.script_states(
            42,
            [
                ProcessState::Running,
                ProcessState::Stopped,
                ProcessState::Running,
                ProcessState::Running,
            ],
        );

        let repo = RomRepository::new(Arc::new(SqliteStore::in_memory().unwrap()));
        let file = RomFile::new("/roms/GBA/a.gba");

        let elapsed = run_accounting(host.clone(), repo.clone(), file.clone(), 42, FIVE).await;
        assert_eq!(elapsed, 15);

        let record = repo.load(&file).unwrap();
        assert_eq!(record.count, 1);
        assert_eq!(record.time, 15);
        assert_eq!(record.last_session_time, 15);
        assert!(!record.last.is_empty());
    }
}
