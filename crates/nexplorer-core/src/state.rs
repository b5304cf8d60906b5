use crate::backend::ConnectionMode;
use crate::executor::Preview;
use crate::history::NavigationHistory;
use crate::listing::DirectoryEntry;
use chrono::{DateTime, Local};
use std::collections::VecDeque;
use tracing::{error, info, warn};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogLevel {
    User,
    Ai,
    System,
    Success,
    Warning,
    Error,
}

impl LogLevel {
    pub fn label(&self) -> &'static str {
        match self {
            LogLevel::User => "You",
            LogLevel::Ai => "AI",
            LogLevel::System => "System",
            LogLevel::Success => "Success",
            LogLevel::Warning => "Warning",
            LogLevel::Error => "Error",
        }
    }
}

#[derive(Clone, Debug)]
pub struct LogEntry {
    pub seq: u64,
    pub at: DateTime<Local>,
    pub level: LogLevel,
    pub message: String,
}

#[derive(Debug)]
pub struct ActivityLog {
    entries: VecDeque<LogEntry>,
    max: usize,
    next_seq: u64,
}

impl ActivityLog {
    pub fn new(max: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            max: max.max(1),
            next_seq: 0,
        }
    }

    pub fn push(&mut self, level: LogLevel, message: impl Into<String>) {
        let message = message.into();
        match level {
            LogLevel::Warning => warn!(target: "activity", level = level.label(), "{message}"),
            LogLevel::Error => error!(target: "activity", level = level.label(), "{message}"),
            _ => info!(target: "activity", level = level.label(), "{message}"),
        }
        if self.entries.len() == self.max {
            self.entries.pop_front();
        }
        self.entries.push_back(LogEntry {
            seq: self.next_seq,
            at: Local::now(),
            level,
            message,
        });
        self.next_seq += 1;
    }

    pub fn entries(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    pub fn since(&self, from: u64) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter().filter(move |e| e.seq >= from)
    }

    pub fn next_seq(&self) -> u64 {
        self.next_seq
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.entries.iter().any(|e| e.message.contains(needle))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RouterPhase {
    Idle,
    AwaitingModelResponse { request_id: Uuid },
    Dispatching,
}

#[derive(Debug)]
pub struct SessionState {
    pub mode: ConnectionMode,
    pub home: String,
    pub history: NavigationHistory,
    pub overview: String,
    pub listing: Vec<DirectoryEntry>,
    pub selected: Option<String>,
    pub preview: Option<Preview>,
    pub phase: RouterPhase,
    pub log: ActivityLog,
}

impl SessionState {
    pub fn new(
        mode: ConnectionMode,
        home: impl Into<String>,
        start_path: impl Into<String>,
        overview: impl Into<String>,
        log: ActivityLog,
    ) -> Self {
        Self {
            mode,
            home: home.into(),
            history: NavigationHistory::new(start_path),
            overview: overview.into(),
            listing: Vec::new(),
            selected: None,
            preview: None,
            phase: RouterPhase::Idle,
            log,
        }
    }

    pub fn current_path(&self) -> &str {
        self.history.current()
    }

    pub fn is_busy(&self) -> bool {
        !matches!(self.phase, RouterPhase::Idle)
    }

    pub fn entry(&self, name: &str) -> Option<&DirectoryEntry> {
        self.listing.iter().find(|e| e.name == name)
    }
}
