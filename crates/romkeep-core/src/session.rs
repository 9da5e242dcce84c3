//! Session manager: one suspendable process group per running game

use chrono::{DateTime, Local};
use romkeep_api::{SessionState, WaitOutcome};
use romkeep_config::Config;
use romkeep_host_api::{
    ExitStatus, HostError, ProcessHandle, ProcessHost, SignalKind, SpawnOptions, SwitchCombo,
};
use romkeep_util::{
    ROMKEEP_DATA_DIR_ENV, ROMKEEP_FILE_ENV, Result, RomFile, RomkeepError, SessionId,
};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::{HotkeyMarker, RecoveryFile, RomEntity};

/// Exit status of a launcher that could not execute its emulator
pub const LAUNCH_FAILED_STATUS: i32 = 127;

const DEFAULT_WAIT_POLL: Duration = Duration::from_millis(100);

/// A live session
#[derive(Debug, Clone)]
pub struct Session {
    pub id: SessionId,
    pub handle: ProcessHandle,
    pub state: SessionState,
    pub started_at: DateTime<Local>,
    /// Whether the hotkey marker existed when the session was last suspended
    pub hotkey_marker_was_present: bool,
}

impl Session {
    /// Wall-clock seconds since launch, suspended time included
    pub fn uptime_secs(&self) -> i64 {
        (romkeep_util::now() - self.started_at).num_seconds()
    }
}

/// Owns every live session and the recovery file that mirrors them
pub struct SessionManager {
    host: Arc<dyn ProcessHost>,
    sessions: HashMap<RomFile, Session>,
    /// Recovery set in insertion order
    active: Vec<RomFile>,
    recovery: RecoveryFile,
    hotkey: HotkeyMarker,
    wait_poll: Duration,
    spawn_env: Vec<(String, String)>,
    launcher_log: Option<PathBuf>,
    /// Groups we terminated whose leader is not reaped yet
    terminated: Vec<ProcessHandle>,
}

impl SessionManager {
    /// The recovery set starts out as whatever the recovery file lists
    pub fn new(host: Arc<dyn ProcessHost>, recovery: RecoveryFile, hotkey: HotkeyMarker) -> Self {
        let active = recovery.read().unwrap_or_else(|e| {
            warn!(path = %recovery.path().display(), error = %e, "Failed to read recovery file");
            Vec::new()
        });

        Self {
            host,
            sessions: HashMap::new(),
            active,
            recovery,
            hotkey,
            wait_poll: DEFAULT_WAIT_POLL,
            spawn_env: Vec::new(),
            launcher_log: None,
            terminated: Vec::new(),
        }
    }

    pub fn from_config(host: Arc<dyn ProcessHost>, config: &Config) -> Self {
        Self::new(
            host,
            RecoveryFile::new(&config.paths.recovery_file),
            HotkeyMarker::new(&config.paths.hotkey_marker),
        )
        .with_wait_poll(config.session.wait_poll)
        .with_env(
            ROMKEEP_DATA_DIR_ENV,
            config.data_dir().to_string_lossy().into_owned(),
        )
        .with_launcher_log(config.paths.launcher_log.clone())
    }

    pub fn with_wait_poll(mut self, wait_poll: Duration) -> Self {
        self.wait_poll = wait_poll;
        self
    }

    /// Extra environment for every launcher
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.spawn_env.push((key.into(), value.into()));
        self
    }

    pub fn with_launcher_log(mut self, path: Option<PathBuf>) -> Self {
        self.launcher_log = path;
        self
    }

    /// Start a new session, or resume the existing one
    pub fn start(&mut self, entity: &mut RomEntity) -> Result<SessionState> {
        self.reap_terminated();

        if let Some(session) = self.sessions.get_mut(&entity.file) {
            self.host
                .signal_group(session.handle.pgid, SignalKind::Cont)
                .map_err(host_error)?;
            if session.hotkey_marker_was_present {
                if let Err(e) = self.hotkey.create() {
                    warn!(path = %self.hotkey.path().display(), error = %e, "Failed to restore hotkey marker");
                }
            }
            session.state = SessionState::Running;
            entity.pid = session.handle.pid;
            entity.process_group_id = session.handle.pgid;

            info!(session_id = %session.id, file = %entity.file, pid = entity.pid, "Session resumed");
            return Ok(SessionState::Running);
        }

        if entity.is_running() {
            debug!(file = %entity.file, pid = entity.pid, "Dropping stale process ids");
            entity.clear_runtime();
        }
        self.check_launchable(entity)?;

        let mut options = SpawnOptions {
            env: self.spawn_env.clone(),
            log_path: self.launcher_log.clone(),
        };
        options
            .env
            .push((ROMKEEP_FILE_ENV.to_string(), entity.file.to_string()));

        let handle = self
            .host
            .spawn(Path::new(&entity.launcher), &entity.file, &options)
            .map_err(host_error)?;

        let session = Session {
            id: SessionId::new(),
            handle,
            state: SessionState::Running,
            started_at: romkeep_util::now(),
            hotkey_marker_was_present: false,
        };
        info!(
            session_id = %session.id,
            file = %entity.file,
            launcher = %entity.launcher,
            pid = handle.pid,
            pgid = handle.pgid,
            "Session started"
        );

        entity.pid = handle.pid;
        entity.process_group_id = handle.pgid;
        self.sessions.insert(entity.file.clone(), session);
        if !self.active.contains(&entity.file) {
            self.active.push(entity.file.clone());
        }
        self.persist();

        Ok(SessionState::Running)
    }

    /// Whether `start` can bring `entity` up: a live session can always be
    /// resumed, otherwise the file must exist and have a launcher
    pub fn check_launchable(&self, entity: &RomEntity) -> Result<()> {
        if self.sessions.contains_key(&entity.file) {
            return Ok(());
        }
        if !entity.file.exists() {
            return Err(RomkeepError::FileMissing(entity.file.clone()));
        }
        if entity.launcher.is_empty() {
            return Err(RomkeepError::NoLauncher {
                system: entity.system.clone(),
            });
        }
        Ok(())
    }

    /// Stop the whole process group; no-op without a session
    pub fn suspend(&mut self, entity: &mut RomEntity) -> Result<SessionState> {
        if !entity.is_running() {
            return Ok(SessionState::NotRunning);
        }
        let Some(session) = self.sessions.get_mut(&entity.file) else {
            entity.clear_runtime();
            return Ok(SessionState::NotRunning);
        };
        if session.state == SessionState::Suspended {
            return Ok(SessionState::Suspended);
        }

        session.hotkey_marker_was_present = self.hotkey.is_present();
        self.host
            .signal_group(session.handle.pgid, SignalKind::Stop)
            .map_err(host_error)?;
        if let Err(e) = self.hotkey.remove() {
            warn!(path = %self.hotkey.path().display(), error = %e, "Failed to remove hotkey marker");
        }
        session.state = SessionState::Suspended;

        info!(session_id = %session.id, file = %entity.file, pgid = session.handle.pgid, "Session suspended");
        Ok(SessionState::Suspended)
    }

    /// Terminate the process group and forget the session; no-op without one
    pub fn stop(&mut self, entity: &mut RomEntity) -> Result<SessionState> {
        if !entity.is_running() {
            return Ok(SessionState::NotRunning);
        }
        let Some(session) = self.sessions.remove(&entity.file) else {
            entity.clear_runtime();
            return Ok(SessionState::NotRunning);
        };

        let pgid = session.handle.pgid;
        // a stopped group only acts on TERM once continued
        let signalled = self
            .host
            .signal_group(pgid, SignalKind::Cont)
            .and_then(|_| self.host.signal_group(pgid, SignalKind::Term));

        self.active.retain(|f| f != &entity.file);
        self.persist();
        entity.clear_runtime();
        self.terminated.push(session.handle);

        info!(
            session_id = %session.id,
            file = %entity.file,
            pgid,
            uptime_secs = session.uptime_secs(),
            "Session terminated"
        );
        signalled.map_err(host_error)?;
        Ok(SessionState::Terminated)
    }

    /// One non-blocking wait step; `None` while the game keeps running
    pub fn poll(
        &mut self,
        entity: &mut RomEntity,
        combo: &mut dyn SwitchCombo,
    ) -> Result<Option<WaitOutcome>> {
        self.reap_terminated();

        let Some(session) = self.sessions.get(&entity.file) else {
            return Err(RomkeepError::NoSession(entity.file.clone()));
        };
        let handle = session.handle;
        let state = session.state;

        match self.host.try_wait(&handle) {
            Ok(Some(status)) => {
                let outcome = classify_exit(&status);
                self.finish(entity, outcome);
                return Ok(Some(outcome));
            }
            Ok(None) => {}
            Err(HostError::ProcessNotFound(pid)) => {
                warn!(file = %entity.file, pid, "Session leader vanished without an exit status");
                let outcome = WaitOutcome::Exited { code: -1 };
                self.finish(entity, outcome);
                return Ok(Some(outcome));
            }
            Err(e) => return Err(host_error(e)),
        }

        if state == SessionState::Running && combo.pressed() {
            self.suspend(entity)?;
            return Ok(Some(WaitOutcome::SwitchRequested));
        }
        Ok(None)
    }

    /// Block until the game exits or the switch combo is pressed
    pub fn wait(
        &mut self,
        entity: &mut RomEntity,
        combo: &mut dyn SwitchCombo,
    ) -> Result<WaitOutcome> {
        loop {
            if let Some(outcome) = self.poll(entity, combo)? {
                return Ok(outcome);
            }
            std::thread::sleep(self.wait_poll);
        }
    }

    pub fn state_of(&self, file: &RomFile) -> SessionState {
        self.sessions
            .get(file)
            .map(|s| s.state)
            .unwrap_or(SessionState::NotRunning)
    }

    pub fn session(&self, file: &RomFile) -> Option<&Session> {
        self.sessions.get(file)
    }

    /// The recovery set, oldest insertion first
    pub fn active_files(&self) -> &[RomFile] {
        &self.active
    }

    /// Files with a live session in this process, in recovery set order
    pub fn live_files(&self) -> Vec<RomFile> {
        self.active
            .iter()
            .filter(|f| self.sessions.get(*f).is_some_and(|s| s.state.is_live()))
            .cloned()
            .collect()
    }

    /// Drop a file from the recovery set without touching any process
    pub fn forget(&mut self, file: &RomFile) {
        let before = self.active.len();
        self.active.retain(|f| f != file);
        if self.active.len() != before {
            self.persist();
        }
    }

    pub fn recovery(&self) -> &RecoveryFile {
        &self.recovery
    }

    pub fn hotkey_marker(&self) -> &HotkeyMarker {
        &self.hotkey
    }

    fn finish(&mut self, entity: &mut RomEntity, outcome: WaitOutcome) {
        if let Some(session) = self.sessions.remove(&entity.file) {
            info!(
                session_id = %session.id,
                file = %entity.file,
                ?outcome,
                uptime_secs = session.uptime_secs(),
                "Session ended"
            );
        }
        if !outcome.keeps_recovery_entry() {
            self.active.retain(|f| f != &entity.file);
            self.persist();
        }
        entity.clear_runtime();
    }

    fn reap_terminated(&mut self) {
        self.terminated
            .retain(|handle| matches!(self.host.try_wait(handle), Ok(None)));
    }

    fn persist(&self) {
        if let Err(e) = self.recovery.write(&self.active) {
            warn!(path = %self.recovery.path().display(), error = %e, "Failed to write recovery file");
        }
    }
}

/// Map a reaped leader's status to a wait outcome
pub fn classify_exit(status: &ExitStatus) -> WaitOutcome {
    if status.signaled {
        return WaitOutcome::Killed {
            signal: status.signal.unwrap_or_default(),
        };
    }
    match status.code {
        Some(LAUNCH_FAILED_STATUS) => WaitOutcome::LaunchFailed,
        Some(code) => WaitOutcome::Exited { code },
        None => WaitOutcome::Exited { code: -1 },
    }
}

fn host_error(e: HostError) -> RomkeepError {
    RomkeepError::host(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NO_PID;
    use romkeep_api::RomRecord;
    use romkeep_host_api::{MockHost, NoCombo, ProcessState, ScriptedCombo};
    use std::fs;
    use tempfile::TempDir;

    struct Fixture {
        dir: TempDir,
        host: Arc<MockHost>,
        manager: SessionManager,
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let host = Arc::new(MockHost::new());
        let manager = SessionManager::new(
            host.clone(),
            RecoveryFile::new(dir.path().join("resume.txt")),
            HotkeyMarker::new(dir.path().join("hotkeys.disabled")),
        )
        .with_wait_poll(Duration::ZERO);
        Fixture { dir, host, manager }
    }

    impl Fixture {
        fn rom(&self, name: &str) -> RomEntity {
            let system = self.dir.path().join("GBA");
            fs::create_dir_all(&system).unwrap();
            let path = system.join(name);
            fs::write(&path, b"rom").unwrap();

            let record = RomRecord::new(path.to_string_lossy().into_owned());
            let mut entity = RomEntity::from_record(record, &Config::default());
            entity.launcher = "/opt/emus/GBA/launch.sh".into();
            entity
        }

        fn recovery_entries(&self) -> Vec<RomFile> {
            self.manager.recovery().read().unwrap()
        }
    }

    #[test]
    fn start_spawns_and_records_recovery() {
        let mut f = fixture();
        let mut game = f.rom("a.gba");

        let state = f.manager.start(&mut game).unwrap();
        assert_eq!(state, SessionState::Running);
        assert!(game.is_running());
        assert_eq!(game.pid, game.process_group_id);
        assert_eq!(f.host.launched_files(), vec![game.file.clone()]);
        assert_eq!(f.manager.active_files(), &[game.file.clone()]);
        assert_eq!(f.recovery_entries(), vec![game.file.clone()]);
    }

    #[test]
    fn missing_file_changes_nothing() {
        let mut f = fixture();
        let mut game = f.rom("gone.gba");
        fs::remove_file(game.file.as_path()).unwrap();

        let err = f.manager.start(&mut game).unwrap_err();
        assert!(matches!(err, RomkeepError::FileMissing(_)));
        assert_eq!(game.pid, NO_PID);
        assert!(f.host.launched_files().is_empty());
        assert!(f.manager.active_files().is_empty());
        assert!(!f.manager.recovery().path().exists());
    }

    #[test]
    fn missing_launcher_is_reported() {
        let mut f = fixture();
        let mut game = f.rom("a.gba");
        game.launcher.clear();

        let err = f.manager.start(&mut game).unwrap_err();
        assert!(matches!(err, RomkeepError::NoLauncher { ref system } if system == "GBA"));
        assert!(f.host.launched_files().is_empty());
    }

    #[test]
    fn spawn_failure_leaves_no_session() {
        let mut f = fixture();
        let mut game = f.rom("a.gba");
        *f.host.fail_spawn.lock().unwrap() = true;

        assert!(f.manager.start(&mut game).is_err());
        assert!(!game.is_running());
        assert_eq!(f.manager.state_of(&game.file), SessionState::NotRunning);
    }

    #[test]
    fn suspend_and_resume_restore_hotkey_marker() {
        let mut f = fixture();
        let mut game = f.rom("a.gba");
        f.manager.start(&mut game).unwrap();
        f.manager.hotkey_marker().create().unwrap();

        let state = f.manager.suspend(&mut game).unwrap();
        assert_eq!(state, SessionState::Suspended);
        assert!(!f.manager.hotkey_marker().is_present());
        assert_eq!(f.host.state_of(game.pid), ProcessState::Stopped);

        // suspending twice keeps the first marker snapshot
        f.manager.suspend(&mut game).unwrap();

        f.manager.start(&mut game).unwrap();
        assert!(f.manager.hotkey_marker().is_present());
        assert_eq!(f.host.state_of(game.pid), ProcessState::Running);
        assert_eq!(
            f.host.signals_to(game.process_group_id),
            vec![SignalKind::Stop, SignalKind::Cont]
        );
        // resuming does not launch a second copy
        assert_eq!(f.host.launched_files().len(), 1);
    }

    #[test]
    fn resume_without_marker_does_not_create_it() {
        let mut f = fixture();
        let mut game = f.rom("a.gba");
        f.manager.start(&mut game).unwrap();
        f.manager.suspend(&mut game).unwrap();
        f.manager.start(&mut game).unwrap();
        assert!(!f.manager.hotkey_marker().is_present());
    }

    #[test]
    fn suspend_and_stop_without_pid_are_noops() {
        let mut f = fixture();
        let mut game = f.rom("a.gba");

        assert_eq!(f.manager.suspend(&mut game).unwrap(), SessionState::NotRunning);
        assert_eq!(f.manager.stop(&mut game).unwrap(), SessionState::NotRunning);
        assert!(f.host.signals().is_empty());
        assert_eq!(game.pid, NO_PID);
    }

    #[test]
    fn stop_continues_then_terminates() {
        let mut f = fixture();
        let mut game = f.rom("a.gba");
        f.manager.start(&mut game).unwrap();
        f.manager.suspend(&mut game).unwrap();
        let pgid = game.process_group_id;

        let state = f.manager.stop(&mut game).unwrap();
        assert_eq!(state, SessionState::Terminated);
        assert_eq!(game.pid, NO_PID);
        assert_eq!(
            f.host.signals_to(pgid),
            vec![SignalKind::Stop, SignalKind::Cont, SignalKind::Term]
        );
        assert!(f.manager.active_files().is_empty());
        assert!(!f.manager.recovery().path().exists());
        assert_eq!(f.host.state_of(pgid), ProcessState::Gone);
    }

    #[test]
    fn normal_exit_drops_recovery_entry() {
        let mut f = fixture();
        let mut game = f.rom("a.gba");
        f.manager.start(&mut game).unwrap();
        f.host.simulate_exit(game.pid, ExitStatus::success());

        let outcome = f.manager.wait(&mut game, &mut NoCombo).unwrap();
        assert_eq!(outcome, WaitOutcome::Exited { code: 0 });
        assert_eq!(game.pid, NO_PID);
        assert!(f.recovery_entries().is_empty());
    }

    #[test]
    fn exec_failure_is_launch_failed() {
        let mut f = fixture();
        let mut game = f.rom("a.gba");
        f.manager.start(&mut game).unwrap();
        f.host
            .simulate_exit(game.pid, ExitStatus::with_code(LAUNCH_FAILED_STATUS));

        let outcome = f.manager.wait(&mut game, &mut NoCombo).unwrap();
        assert_eq!(outcome, WaitOutcome::LaunchFailed);
        assert!(f.manager.active_files().is_empty());
    }

    #[test]
    fn killed_session_stays_recoverable() {
        let mut f = fixture();
        let mut game = f.rom("a.gba");
        f.manager.start(&mut game).unwrap();
        f.host.simulate_exit(game.pid, ExitStatus::signaled(9));

        let outcome = f.manager.wait(&mut game, &mut NoCombo).unwrap();
        assert_eq!(outcome, WaitOutcome::Killed { signal: 9 });
        assert_eq!(game.pid, NO_PID);
        assert_eq!(f.manager.state_of(&game.file), SessionState::NotRunning);
        assert_eq!(f.recovery_entries(), vec![game.file.clone()]);
    }

    #[test]
    fn combo_suspends_and_reports_switch() {
        let mut f = fixture();
        let mut game = f.rom("a.gba");
        f.manager.start(&mut game).unwrap();

        let mut combo = ScriptedCombo::pressed_after(3);
        let outcome = f.manager.wait(&mut game, &mut combo).unwrap();
        assert_eq!(outcome, WaitOutcome::SwitchRequested);
        assert_eq!(f.manager.state_of(&game.file), SessionState::Suspended);
        assert!(game.is_running());
        assert_eq!(f.recovery_entries(), vec![game.file.clone()]);
    }

    #[test]
    fn poll_without_session_errors() {
        let mut f = fixture();
        let mut game = f.rom("a.gba");
        let err = f.manager.poll(&mut game, &mut NoCombo).unwrap_err();
        assert!(matches!(err, RomkeepError::NoSession(_)));
    }

    #[test]
    fn active_files_keep_insertion_order() {
        let mut f = fixture();
        let mut a = f.rom("a.gba");
        let mut b = f.rom("b.gba");
        let mut c = f.rom("c.gba");
        f.manager.start(&mut b).unwrap();
        f.manager.start(&mut a).unwrap();
        f.manager.start(&mut c).unwrap();
        f.manager.stop(&mut a).unwrap();

        assert_eq!(f.manager.active_files(), &[b.file.clone(), c.file.clone()]);
        assert_eq!(f.manager.live_files(), vec![b.file.clone(), c.file.clone()]);
    }

    #[test]
    fn new_manager_adopts_recovery_file() {
        let f = fixture();
        let recovery = RecoveryFile::new(f.dir.path().join("resume.txt"));
        recovery
            .write(&[RomFile::new("/roms/GBA/x.gba"), RomFile::new("/roms/GBA/y.gba")])
            .unwrap();

        let mut manager = SessionManager::new(
            f.host.clone(),
            recovery,
            HotkeyMarker::new(f.dir.path().join("hotkeys.disabled")),
        );
        assert_eq!(manager.active_files().len(), 2);
        assert!(manager.live_files().is_empty());

        manager.forget(&RomFile::new("/roms/GBA/x.gba"));
        assert_eq!(
            manager.recovery().read().unwrap(),
            vec![RomFile::new("/roms/GBA/y.gba")]
        );
    }

    #[test]
    fn classify_exit_statuses() {
        assert_eq!(
            classify_exit(&ExitStatus::with_code(3)),
            WaitOutcome::Exited { code: 3 }
        );
        assert_eq!(
            classify_exit(&ExitStatus::with_code(127)),
            WaitOutcome::LaunchFailed
        );
        assert_eq!(
            classify_exit(&ExitStatus::signaled(15)),
            WaitOutcome::Killed { signal: 15 }
        );
    }
}
