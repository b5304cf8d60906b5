use crate::error::CoreError;
use crate::executor::CommandExecutor;
use crate::path::join_path;
use crate::state::{LogLevel, SessionState};
use crate::transfer::{Direction, TransferOrigin, TransferRequest};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

pub struct Browser {
    executor: Arc<CommandExecutor>,
    preview_lines: usize,
}

impl Browser {
    pub fn new(executor: Arc<CommandExecutor>, preview_lines: usize) -> Self {
        Self {
            executor,
            preview_lines,
        }
    }

    pub fn executor(&self) -> &Arc<CommandExecutor> {
        &self.executor
    }

    pub async fn refresh(&self, state: &mut SessionState) {
        let path = state.current_path().to_string();
        state.selected = None;
        state.preview = None;
        state.listing = match self.executor.try_list(&path).await {
            Ok(entries) => entries,
            Err(err) => {
                state
                    .log
                    .push(LogLevel::Warning, format!("Could not list {path}: {err}"));
                Vec::new()
            }
        };
        debug!(path = %path, entries = state.listing.len(), "listing refreshed");
    }

    pub async fn navigate(&self, state: &mut SessionState, path: &str, fresh_branch: bool) {
        state.history.navigate_to(path, fresh_branch);
        self.refresh(state).await;
    }

    pub async fn open(&self, state: &mut SessionState, name: &str) -> Result<(), CoreError> {
        match state.entry(name).map(|e| e.is_dir()) {
            Some(true) => {
                let target = join_path(state.current_path(), name);
                self.navigate(state, &target, true).await;
                Ok(())
            }
            Some(false) => Err(CoreError::Command(format!("{name} is not a directory"))),
            None => Err(CoreError::Command(format!("no entry named {name}"))),
        }
    }

    pub async fn back(&self, state: &mut SessionState) -> bool {
        if !state.history.go_back() {
            return false;
        }
        self.refresh(state).await;
        true
    }

    pub async fn forward(&self, state: &mut SessionState) -> bool {
        if !state.history.go_forward() {
            return false;
        }
        self.refresh(state).await;
        true
    }

    pub async fn select(&self, state: &mut SessionState, name: &str) -> bool {
        let Some(entry) = state.entry(name).cloned() else {
            return false;
        };
        let preview = self
            .executor
            .preview(state.current_path(), &entry, self.preview_lines)
            .await;
        state.selected = Some(entry.name);
        state.preview = Some(preview);
        true
    }

    /// Builds a user download of one listed file. A destination that is an
    /// existing local directory receives the file under its own name.
    pub fn download_request(
        &self,
        state: &SessionState,
        name: &str,
        destination: &str,
    ) -> Result<TransferRequest, CoreError> {
        let entry = state
            .entry(name)
            .ok_or_else(|| CoreError::Command(format!("no entry named {name}")))?;
        if entry.is_dir() {
            return Err(CoreError::Transfer(
                "directory download is not supported".to_string(),
            ));
        }
        let destination = if Path::new(destination).is_dir() {
            Path::new(destination).join(name).to_string_lossy().to_string()
        } else {
            destination.to_string()
        };
        Ok(TransferRequest::new(
            join_path(state.current_path(), name),
            destination,
            Direction::ToClient,
            TransferOrigin::User,
        ))
    }
}
