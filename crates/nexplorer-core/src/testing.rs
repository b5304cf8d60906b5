use crate::backend::{invocation, ConnectionMode, ShellBackend};
use crate::error::CoreError;
use crate::permission::{Confirmer, Prompt};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

pub struct FakeBackend {
    home: String,
    overview: String,
    listings: HashMap<String, String>,
    searches: HashMap<(String, String), String>,
    failures: Vec<(String, String, String)>,
    files: Mutex<HashMap<String, Vec<u8>>>,
    executed: Mutex<Vec<String>>,
    byte_calls: AtomicUsize,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self {
            home: "/home/user".to_string(),
            overview: "/home/user\n/home/user/docs".to_string(),
            listings: HashMap::new(),
            searches: HashMap::new(),
            failures: Vec::new(),
            files: Mutex::new(HashMap::new()),
            executed: Mutex::new(Vec::new()),
            byte_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_listing(mut self, path: &str, raw: &str) -> Self {
        self.listings.insert(path.to_string(), raw.to_string());
        self
    }

    pub fn with_search(mut self, query: &str, base: &str, raw: &str) -> Self {
        self.searches
            .insert((query.to_string(), base.to_string()), raw.to_string());
        self
    }

    /// Makes `command` fail with `reason` whenever `arg` is among its arguments.
    pub fn with_failure(mut self, command: &str, arg: &str, reason: &str) -> Self {
        self.failures
            .push((command.to_string(), arg.to_string(), reason.to_string()));
        self
    }

    pub fn with_file(self, path: &str, data: &[u8]) -> Self {
        self.files
            .lock()
            .unwrap()
            .insert(path.to_string(), data.to_vec());
        self
    }

    pub fn stored(&self, path: &str) -> Option<Vec<u8>> {
        self.files.lock().unwrap().get(path).cloned()
    }

    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }

    pub fn byte_calls(&self) -> usize {
        self.byte_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ShellBackend for FakeBackend {
    fn mode(&self) -> ConnectionMode {
        ConnectionMode::Remote
    }

    async fn execute(&self, command: &str, args: &[&str]) -> Result<String, CoreError> {
        self.executed
            .lock()
            .unwrap()
            .push(invocation(command, args));
        if let Some((_, _, reason)) = self
            .failures
            .iter()
            .find(|(c, a, _)| c == command && args.contains(&a.as_str()))
        {
            return Err(CoreError::Command(reason.clone()));
        }
        match (command, args) {
            ("fs_home", []) => Ok(self.home.clone()),
            ("fs_overview", []) => Ok(self.overview.clone()),
            ("fs_list", [path]) => self
                .listings
                .get(*path)
                .cloned()
                .ok_or_else(|| CoreError::Command(format!("fs_list: not a directory: {path}"))),
            ("fs_search", [query, base]) => Ok(self
                .searches
                .get(&(query.to_string(), base.to_string()))
                .cloned()
                .unwrap_or_default()),
            ("head", ["-n", count, path]) => {
                let count: usize = count.parse().unwrap();
                let files = self.files.lock().unwrap();
                let data = files
                    .get(*path)
                    .ok_or_else(|| CoreError::Command(format!("head: {path}: No such file")))?;
                Ok(String::from_utf8_lossy(data)
                    .lines()
                    .take(count)
                    .collect::<Vec<_>>()
                    .join("\n"))
            }
            _ => Err(CoreError::Command(format!("{command}: command not found"))),
        }
    }

    async fn fetch_bytes(&self, path: &str) -> Result<Vec<u8>, CoreError> {
        self.byte_calls.fetch_add(1, Ordering::SeqCst);
        self.stored(path)
            .ok_or_else(|| CoreError::Transfer(format!("{path}: no such file")))
    }

    async fn store_bytes(&self, path: &str, data: &[u8]) -> Result<(), CoreError> {
        self.byte_calls.fetch_add(1, Ordering::SeqCst);
        self.files
            .lock()
            .unwrap()
            .insert(path.to_string(), data.to_vec());
        Ok(())
    }
}

pub struct ScriptedConfirmer {
    answers: Mutex<VecDeque<bool>>,
    asked: Mutex<Vec<Prompt>>,
}

impl ScriptedConfirmer {
    pub fn new(answers: impl IntoIterator<Item = bool>) -> Self {
        Self {
            answers: Mutex::new(answers.into_iter().collect()),
            asked: Mutex::new(Vec::new()),
        }
    }

    pub fn asked(&self) -> Vec<Prompt> {
        self.asked.lock().unwrap().clone()
    }
}

#[async_trait]
impl Confirmer for ScriptedConfirmer {
    async fn confirm(&self, prompt: &Prompt) -> bool {
        self.asked.lock().unwrap().push(prompt.clone());
        self.answers.lock().unwrap().pop_front().unwrap_or(false)
    }
}
