//! Integration tests for romkeep
//!
//! These tests drive the library, the accountant and the hosts together
//! against an on-disk store, the way the separate romkeep processes share it.

use romkeep_api::{ActivityQuery, FilterMode, RomRecord, SessionState, SortKey, TriState, WaitOutcome};
use romkeep_config::{Config, parse_config};
use romkeep_core::{Library, PlaytimeAccountant, RecoveryFile, run_accounting};
use romkeep_host_api::{ExitStatus, MockHost, NoCombo, ProcessHost, ProcessState, SignalKind};
use romkeep_host_linux::{LinuxHost, read_process_state};
use romkeep_store::{RomRepository, SqliteStore};
use romkeep_util::RomFile;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::TempDir;

fn write_launcher(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("launch.sh");
    fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn make_test_config(dir: &Path, launcher: &Path) -> Config {
    let toml = format!(
        r#"
config_version = 1

[paths]
data_dir = "{data}"
recovery_file = "{data}/resume.txt"
hotkey_marker = "{run}/hotkeys.disabled"

[systems.GBA]
launcher = "{launcher}"

[session]
grace_period_ms = 0
wait_poll_ms = 1

[accounting]
poll_interval_secs = 5
"#,
        data = dir.join("data").display(),
        run = dir.join("run").display(),
        launcher = launcher.display(),
    );
    parse_config(&toml).unwrap()
}

fn make_rom(dir: &Path, name: &str) -> RomFile {
    let system = dir.join("Roms/GBA");
    fs::create_dir_all(&system).unwrap();
    let path = system.join(name);
    fs::write(&path, b"rom").unwrap();
    RomFile::new(path.to_string_lossy().into_owned())
}

fn open_library(config: &Config, host: Arc<dyn ProcessHost>) -> Library {
    Library::new(config.clone(), RomRepository::open(config.db_path()), host)
}

fn wait_for_state(pid: i32, wanted: ProcessState) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if read_process_state(pid) == wanted {
            return true;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    false
}

#[test]
fn test_config_drives_launcher_resolution() {
    let dir = TempDir::new().unwrap();
    let config = make_test_config(dir.path(), Path::new("/opt/emus/GBA/launch.sh"));
    let host = Arc::new(MockHost::new());
    let mut library = open_library(&config, host.clone());

    let file = make_rom(dir.path(), "Golden Sun.gba");
    let entity = library.add(file.clone());
    assert_eq!(entity.launcher, "/opt/emus/GBA/launch.sh");
    assert_eq!(entity.system, "GBA");
    assert_eq!(entity.name, "Golden Sun");
}

#[tokio::test]
async fn test_session_lifecycle_with_mock_host() {
    let dir = TempDir::new().unwrap();
    let config = make_test_config(dir.path(), Path::new("/opt/emus/GBA/launch.sh"));
    let host = Arc::new(MockHost::new());
    let mut library = open_library(&config, host.clone());
    let file = make_rom(dir.path(), "a.gba");
    let recovery = RecoveryFile::new(&config.paths.recovery_file);

    assert_eq!(library.start(&file).unwrap(), SessionState::Running);
    let pgid = library.entity(&file).unwrap().process_group_id;
    assert_eq!(recovery.read().unwrap(), vec![file.clone()]);

    assert_eq!(library.suspend(&file).unwrap(), SessionState::Suspended);
    assert_eq!(library.start(&file).unwrap(), SessionState::Running);
    assert_eq!(host.signals_to(pgid), vec![SignalKind::Stop, SignalKind::Cont]);

    host.simulate_exit(pgid, ExitStatus::success());
    assert_eq!(
        library.wait_foreground(&mut NoCombo).await,
        Some(WaitOutcome::Exited { code: 0 })
    );
    assert!(!library.entity(&file).unwrap().is_running());
    assert!(!recovery.path().exists());
}

#[tokio::test(start_paused = true)]
async fn test_crash_recovery_relaunches_sessions() {
    let dir = TempDir::new().unwrap();
    let config = make_test_config(dir.path(), Path::new("/opt/emus/GBA/launch.sh"));
    let first = make_rom(dir.path(), "first.gba");
    let second = make_rom(dir.path(), "second.gba");

    {
        let host = Arc::new(MockHost::new());
        let mut library = open_library(&config, host);
        library.start(&first).unwrap();
        library.start(&second).unwrap();
        // dropped without stopping anything, as on a power loss
    }

    let host = Arc::new(MockHost::new());
    let mut library = open_library(&config, host.clone());
    let foreground = library.auto_resume().await;

    assert_eq!(host.launched_files().len(), 2);
    assert!(foreground.is_some());
    let running: Vec<_> = [&first, &second]
        .into_iter()
        .filter(|f| library.sessions().state_of(f) == SessionState::Running)
        .collect();
    assert_eq!(running.len(), 1);
}

#[test]
fn test_playtime_and_metadata_merge_across_processes() {
    let dir = TempDir::new().unwrap();
    let config = make_test_config(dir.path(), Path::new("/opt/emus/GBA/launch.sh"));
    let mut library = open_library(&config, Arc::new(MockHost::new()));
    let file = make_rom(dir.path(), "a.gba");
    library.add(file.clone());

    // two accounting processes, each with its own connection
    for secs in [120, 30] {
        let writer = RomRepository::new(Arc::new(SqliteStore::open(config.db_path()).unwrap()));
        writer.save(&RomRecord::session(file.clone(), secs));
    }
    library.toggle_favorite(&file);

    assert!(library.refresh_if_changed());
    let entity = library.entity(&file).unwrap();
    assert_eq!(entity.count, 2);
    assert_eq!(entity.time, 150);
    assert_eq!(entity.last_session_time, 30);
    assert_eq!(entity.favorite, TriState::True);
    assert_eq!(entity.total_time, "2m 30s");
    assert_eq!(entity.average_time, "1m 15s");
}

#[test]
fn test_accountant_skips_suspended_time() {
    let mut accountant = PlaytimeAccountant::new(RomFile::new("/roms/GBA/a.gba"), 1, Duration::from_secs(5));
    let trace = [
        ProcessState::Running,
        ProcessState::Stopped,
        ProcessState::Stopped,
        ProcessState::Running,
    ];
    for state in trace {
        accountant.observe(state);
    }
    accountant.observe(ProcessState::Gone);
    assert_eq!(accountant.record().time, 10);
}

#[tokio::test(start_paused = true)]
async fn test_accounting_runner_feeds_activity_list() {
    let dir = TempDir::new().unwrap();
    let config = make_test_config(dir.path(), Path::new("/opt/emus/GBA/launch.sh"));
    let short = make_rom(dir.path(), "short.gba");
    let long = make_rom(dir.path(), "long.gba");

    let host = Arc::new(MockHost::new());
    host.insert_process(10, ProcessState::Gone);
    host.script_states(10, [ProcessState::Running]);
    host.insert_process(11, ProcessState::Gone);
    host.script_states(11, [ProcessState::Running; 3]);

    let repo = RomRepository::open(config.db_path());
    run_accounting(host.clone(), repo.clone(), short.clone(), 10, config.accounting.poll_interval).await;
    run_accounting(host.clone(), repo.clone(), long.clone(), 11, config.accounting.poll_interval).await;

    let library = open_library(&config, host);
    let by_count = ActivityQuery {
        sort: SortKey::Count,
        ..Default::default()
    };
    assert_eq!(library.view(&by_count).len(), 2);

    let mut favorites = ActivityQuery::default();
    favorites.filters.favorite = FilterMode::Match;
    assert!(library.view(&favorites).is_empty());

    assert_eq!(library.entity(&short).unwrap().time, 5);
    assert_eq!(library.entity(&long).unwrap().time, 15);
}

#[test]
fn test_real_process_suspend_resume_stop() {
    let dir = TempDir::new().unwrap();
    let launcher = write_launcher(dir.path(), "exec sleep 30");
    let config = make_test_config(dir.path(), &launcher);
    let file = make_rom(dir.path(), "a.gba");
    let mut library = open_library(&config, Arc::new(LinuxHost::new()));

    library.start(&file).unwrap();
    let pid = library.entity(&file).unwrap().pid;
    assert!(pid > 0);
    assert!(wait_for_state(pid, ProcessState::Running));

    library.suspend(&file).unwrap();
    assert!(wait_for_state(pid, ProcessState::Stopped));

    library.start(&file).unwrap();
    assert!(wait_for_state(pid, ProcessState::Running));

    assert_eq!(library.stop(&file).unwrap(), SessionState::Terminated);
    assert!(!library.entity(&file).unwrap().is_running());
    assert!(library.sessions().active_files().is_empty());
}

#[tokio::test]
async fn test_real_launcher_exec_failure() {
    let dir = TempDir::new().unwrap();
    let launcher = write_launcher(dir.path(), "exit 127");
    let config = make_test_config(dir.path(), &launcher);
    let file = make_rom(dir.path(), "a.gba");
    let mut library = open_library(&config, Arc::new(LinuxHost::new()));

    library.start(&file).unwrap();
    assert_eq!(
        library.wait_foreground(&mut NoCombo).await,
        Some(WaitOutcome::LaunchFailed)
    );
    assert!(library.sessions().active_files().is_empty());
}

#[tokio::test]
async fn test_launcher_receives_file_and_environment() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("launched.txt");
    let launcher = write_launcher(
        dir.path(),
        &format!(
            "echo \"$1|$ROMKEEP_FILE|$ROMKEEP_DATA_DIR\" > \"{}\"",
            out.display()
        ),
    );
    let config = make_test_config(dir.path(), &launcher);
    let file = make_rom(dir.path(), "a.gba");
    let mut library = open_library(&config, Arc::new(LinuxHost::new()));

    library.start(&file).unwrap();
    assert_eq!(
        library.wait_foreground(&mut NoCombo).await,
        Some(WaitOutcome::Exited { code: 0 })
    );

    let line = fs::read_to_string(&out).unwrap();
    let expected = format!(
        "{}|{}|{}",
        file,
        file,
        config.data_dir().display()
    );
    assert_eq!(line.trim_end(), expected);
}
