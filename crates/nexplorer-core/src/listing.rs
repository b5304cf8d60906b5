use serde::Serialize;

pub const UNKNOWN_SIZE: &str = "?";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum EntryKind {
    Dir,
    File,
}

impl EntryKind {
    fn from_token(token: &str) -> Self {
        if token == "d" {
            EntryKind::Dir
        } else {
            EntryKind::File
        }
    }

    fn token(&self) -> &'static str {
        match self {
            EntryKind::Dir => "d",
            EntryKind::File => "f",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DirectoryEntry {
    pub kind: EntryKind,
    pub name: String,
    pub size_display: String,
}

impl DirectoryEntry {
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Dir
    }

    pub fn to_line(&self) -> String {
        format!("{}|{}|{}", self.kind.token(), self.name, self.size_display)
    }
}

/// Parses `TYPE|NAME|SIZE` lines in emission order. Lines with fewer than two
/// fields are dropped.
pub fn parse_listing(raw: &str) -> Vec<DirectoryEntry> {
    raw.lines().filter_map(parse_line).collect()
}

pub fn parse_line(line: &str) -> Option<DirectoryEntry> {
    let line = line.trim_end_matches('\r');
    if line.is_empty() {
        return None;
    }
    let mut parts = line.split('|');
    let kind = parts.next()?;
    let name = parts.next()?;
    let size = parts.next().unwrap_or(UNKNOWN_SIZE);
    Some(DirectoryEntry {
        kind: EntryKind::from_token(kind),
        name: name.to_string(),
        size_display: size.to_string(),
    })
}
