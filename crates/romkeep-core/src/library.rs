//! Library facade: what the menu and the CLI drive

use romkeep_api::{ActivityQuery, RomRecord, SessionState, TriState, WaitOutcome};
use romkeep_config::Config;
use romkeep_host_api::{ProcessHost, SwitchCombo};
use romkeep_store::RomRepository;
use romkeep_util::{Result, RomFile, RomkeepError};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::{RomEntity, SessionManager, derive_view, systems};

/// Owns the repository, the entity snapshot and the session manager.
///
/// At most one session is in the foreground: the one the player is in,
/// which the caller polls for an exit or a switch request.
pub struct Library {
    config: Config,
    repo: RomRepository,
    sessions: SessionManager,
    entities: Vec<RomEntity>,
    foreground: Option<RomFile>,
}

impl Library {
    pub fn new(config: Config, repo: RomRepository, host: Arc<dyn ProcessHost>) -> Self {
        let sessions = SessionManager::from_config(host, &config);
        Self::with_sessions(config, repo, sessions)
    }

    pub fn with_sessions(config: Config, repo: RomRepository, sessions: SessionManager) -> Self {
        let mut library = Self {
            config,
            repo,
            sessions,
            entities: Vec::new(),
            foreground: None,
        };
        library.refresh();
        library
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn repository(&self) -> &RomRepository {
        &self.repo
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    pub fn entities(&self) -> &[RomEntity] {
        &self.entities
    }

    pub fn entity(&self, file: &RomFile) -> Option<&RomEntity> {
        self.entities.iter().find(|e| &e.file == file)
    }

    pub fn foreground(&self) -> Option<&RomFile> {
        self.foreground.as_ref()
    }

    /// Reload every record, keeping the process ids of live sessions
    pub fn refresh(&mut self) {
        let mut fresh: Vec<RomEntity> = self
            .repo
            .load_all()
            .into_iter()
            .map(|record| RomEntity::from_record(record, &self.config))
            .collect();

        for entity in &mut fresh {
            if let Some(session) = self.sessions.session(&entity.file) {
                entity.pid = session.handle.pid;
                entity.process_group_id = session.handle.pgid;
            }
        }
        // a live session stays listed even when its record cannot be read
        for old in self.entities.drain(..) {
            if self.sessions.session(&old.file).is_some()
                && !fresh.iter().any(|e| e.file == old.file)
            {
                fresh.push(old);
            }
        }

        self.entities = fresh;
        debug!(count = self.entities.len(), "Library refreshed");
    }

    /// Refresh only when another process wrote to the store
    pub fn refresh_if_changed(&mut self) -> bool {
        if !self.repo.is_external_change_pending() {
            return false;
        }
        info!("Store changed externally, refreshing library");
        self.refresh();
        true
    }

    pub fn view(&self, query: &ActivityQuery) -> Vec<RomEntity> {
        derive_view(&self.entities, query)
    }

    pub fn systems(&self) -> Vec<String> {
        systems(&self.entities)
    }

    /// Create a record for `file` unless one exists
    pub fn add(&mut self, file: impl Into<RomFile>) -> &RomEntity {
        let file = file.into();
        let index = self.ensure_entity(&file);
        &self.entities[index]
    }

    /// Remove a game from the library, terminating its session first
    pub fn delete(&mut self, file: &RomFile) -> bool {
        let Some(index) = self.position(file) else {
            return false;
        };

        if let Err(e) = self.sessions.stop(&mut self.entities[index]) {
            warn!(file = %file, error = %e, "Failed to stop session of deleted game");
        }
        self.sessions.forget(file);
        if self.foreground.as_ref() == Some(file) {
            self.foreground = None;
        }
        self.repo.remove(file);
        self.entities.remove(index);

        info!(file = %file, "Game deleted");
        true
    }

    pub fn toggle_favorite(&mut self, file: &RomFile) -> Option<TriState> {
        let index = self.position(file)?;
        let value = self.entities[index].favorite.toggled();
        self.repo
            .save(&RomRecord::favorite_touch(file.clone(), value.is_true()));
        self.entities[index].favorite = value;
        Some(value)
    }

    pub fn toggle_completed(&mut self, file: &RomFile) -> Option<TriState> {
        let index = self.position(file)?;
        let value = self.entities[index].completed.toggled();
        self.repo
            .save(&RomRecord::completed_touch(file.clone(), value.is_true()));
        self.entities[index].completed = value;
        Some(value)
    }

    /// Start or resume `file` and make it the foreground session.
    ///
    /// A game that cannot be launched leaves the current foreground
    /// session running.
    pub fn start(&mut self, file: &RomFile) -> Result<SessionState> {
        let index = match self.position(file) {
            Some(index) => index,
            None if !file.exists() => return Err(RomkeepError::FileMissing(file.clone())),
            None => self.ensure_entity(file),
        };
        self.sessions.check_launchable(&self.entities[index])?;

        let previous = self.foreground.clone().filter(|f| f != file);
        if let Some(previous) = &previous {
            if let Err(e) = self.suspend(previous) {
                warn!(file = %previous, error = %e, "Failed to suspend previous foreground session");
            }
        }

        match self.sessions.start(&mut self.entities[index]) {
            Ok(state) => {
                self.foreground = Some(file.clone());
                Ok(state)
            }
            Err(e) => {
                if let Some(previous) = previous {
                    self.restore_foreground(previous);
                }
                Err(e)
            }
        }
    }

    fn restore_foreground(&mut self, file: RomFile) {
        let Some(index) = self.position(&file) else {
            return;
        };
        match self.sessions.start(&mut self.entities[index]) {
            Ok(_) => self.foreground = Some(file),
            Err(e) => warn!(file = %file, error = %e, "Failed to resume previous foreground session"),
        }
    }

    pub fn suspend(&mut self, file: &RomFile) -> Result<SessionState> {
        let Some(index) = self.position(file) else {
            return Ok(SessionState::NotRunning);
        };
        let state = self.sessions.suspend(&mut self.entities[index])?;
        if self.foreground.as_ref() == Some(file) {
            self.foreground = None;
        }
        Ok(state)
    }

    pub fn stop(&mut self, file: &RomFile) -> Result<SessionState> {
        let Some(index) = self.position(file) else {
            return Ok(SessionState::NotRunning);
        };
        if self.foreground.as_ref() == Some(file) {
            self.foreground = None;
        }
        self.sessions.stop(&mut self.entities[index])
    }

    /// One non-blocking check of the foreground session.
    ///
    /// Any outcome hands control back to the caller and clears the
    /// foreground.
    pub fn poll_foreground(&mut self, combo: &mut dyn SwitchCombo) -> Option<WaitOutcome> {
        let file = self.foreground.clone()?;
        let Some(index) = self.position(&file) else {
            self.foreground = None;
            return None;
        };

        match self.sessions.poll(&mut self.entities[index], combo) {
            Ok(None) => None,
            Ok(Some(outcome)) => {
                info!(file = %file, ?outcome, "Foreground session returned");
                self.foreground = None;
                Some(outcome)
            }
            Err(e) => {
                warn!(file = %file, error = %e, "Lost track of foreground session");
                self.foreground = None;
                None
            }
        }
    }

    /// Wait on the foreground session; `None` if there is none
    pub async fn wait_foreground(&mut self, combo: &mut dyn SwitchCombo) -> Option<WaitOutcome> {
        while self.foreground.is_some() {
            if let Some(outcome) = self.poll_foreground(combo) {
                return Some(outcome);
            }
            tokio::time::sleep(self.config.session.wait_poll).await;
        }
        None
    }

    /// Resume the live session after `after`, wrapping around
    pub fn switch_next(&mut self, after: Option<&RomFile>) -> Option<RomFile> {
        let live = self.sessions.live_files();
        if live.is_empty() {
            return None;
        }
        let next = match after.and_then(|f| live.iter().position(|l| l == f)) {
            Some(i) => live[(i + 1) % live.len()].clone(),
            None => live[0].clone(),
        };

        match self.start(&next) {
            Ok(_) => Some(next),
            Err(e) => {
                warn!(file = %next, error = %e, "Failed to switch session");
                None
            }
        }
    }

    /// Relaunch every session listed in the recovery file.
    ///
    /// All but the most recently played are started, given the grace
    /// period to initialise, then suspended. The most recent one is left
    /// running in the foreground and returned.
    pub async fn auto_resume(&mut self) -> Option<RomFile> {
        let files = self.sessions.active_files().to_vec();
        if files.is_empty() {
            return None;
        }
        info!(count = files.len(), "Resuming sessions from recovery file");

        let mut ordered: Vec<(String, RomFile)> = Vec::with_capacity(files.len());
        for file in files {
            let index = self.ensure_entity(&file);
            ordered.push((self.entities[index].last.clone(), file));
        }
        ordered.sort_by(|a, b| a.0.cmp(&b.0));
        let (_, newest) = ordered.pop()?;

        for (_, file) in ordered {
            match self.start(&file) {
                Ok(_) => {
                    tokio::time::sleep(self.config.session.grace_period).await;
                    if let Err(e) = self.suspend(&file) {
                        warn!(file = %file, error = %e, "Failed to suspend resumed session");
                    }
                }
                Err(e) => {
                    warn!(file = %file, error = %e, "Skipping unrecoverable session");
                    self.sessions.forget(&file);
                }
            }
        }

        match self.start(&newest) {
            Ok(_) => Some(newest),
            Err(e) => {
                warn!(file = %newest, error = %e, "Skipping unrecoverable session");
                self.sessions.forget(&newest);
                None
            }
        }
    }

    fn position(&self, file: &RomFile) -> Option<usize> {
        self.entities.iter().position(|e| &e.file == file)
    }

    fn ensure_entity(&mut self, file: &RomFile) -> usize {
        if let Some(index) = self.position(file) {
            return index;
        }

        self.repo.save(&RomRecord::new(file.clone()));
        let record = self
            .repo
            .load(file)
            .unwrap_or_else(|| RomRecord::new(file.clone()));
        self.entities.push(RomEntity::from_record(record, &self.config));
        debug!(file = %file, "Game added");
        self.entities.len() - 1
    }
}
