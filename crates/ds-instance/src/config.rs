use std::fs;
use std::path::{Path, PathBuf};

use tracing::warn;

/// A value that can be stored in a [`ConfigFile`] entry.
///
/// Parsing is deliberately forgiving: anything that does not parse is
/// reported as absent, and callers fall back to their own default.
pub trait ConfigValue: Sized {
    fn from_entry(raw: &str) -> Option<Self>;
    fn to_entry(&self) -> String;
}

impl ConfigValue for String {
    fn from_entry(raw: &str) -> Option<Self> {
        Some(raw.to_string())
    }

    fn to_entry(&self) -> String {
        self.clone()
    }
}

impl ConfigValue for bool {
    /// Accepts both the textual and the numeric form; older launchers wrote
    /// booleans as `0`/`1`.
    fn from_entry(raw: &str) -> Option<Self> {
        match raw.trim() {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => None,
        }
    }

    fn to_entry(&self) -> String {
        self.to_string()
    }
}

impl ConfigValue for i64 {
    fn from_entry(raw: &str) -> Option<Self> {
        raw.trim().parse().ok()
    }

    fn to_entry(&self) -> String {
        self.to_string()
    }
}

/// One physical line of the file. Anything that is not a `key=value` pair
/// (comments, blank lines) is kept verbatim so a rewrite never drops content
/// other tooling put there.
#[derive(Debug, Clone)]
enum Line {
    Pair { key: String, value: String },
    Raw(String),
}

/// Flat `key=value` settings file, one entry per line.
///
/// Every set writes the whole file back; unrecognized keys survive the
/// round-trip untouched. I/O failures degrade to a warning, never an error.
#[derive(Debug)]
pub struct ConfigFile {
    path: PathBuf,
    lines: Vec<Line>,
}

impl ConfigFile {
    /// Open `path`, creating an empty file when none exists yet.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let lines = match fs::read_to_string(&path) {
            Ok(text) => text.lines().map(Line::parse).collect(),
            Err(_) => {
                if let Err(e) = fs::write(&path, "") {
                    warn!("could not create {}: {e}", path.display());
                }
                Vec::new()
            }
        };
        Self { path, lines }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.raw_value(key).is_some()
    }

    /// Read `key`, falling back to `default` when the key is absent or its
    /// stored text does not parse as a `T`.
    pub fn get<T: ConfigValue>(&self, key: &str, default: T) -> T {
        self.raw_value(key)
            .and_then(|raw| T::from_entry(&unescape(raw)))
            .unwrap_or(default)
    }

    /// Store `key` and write the file back. A set that does not change the
    /// stored text leaves the file untouched.
    pub fn set<T: ConfigValue>(&mut self, key: &str, value: T) {
        let value = escape(&value.to_entry());
        let existing = self.lines.iter_mut().find_map(|line| match line {
            Line::Pair { key: k, value: v } if k == key => Some(v),
            _ => None,
        });
        match existing {
            Some(v) if *v == value => return,
            Some(v) => *v = value,
            None => self.lines.push(Line::Pair {
                key: key.to_string(),
                value,
            }),
        }
        self.save();
    }

    fn raw_value(&self, key: &str) -> Option<&str> {
        self.lines.iter().find_map(|line| match line {
            Line::Pair { key: k, value } if k == key => Some(value.as_str()),
            _ => None,
        })
    }

    fn save(&self) {
        let mut text = String::new();
        for line in &self.lines {
            match line {
                Line::Pair { key, value } => {
                    text.push_str(key);
                    text.push('=');
                    text.push_str(value);
                }
                Line::Raw(raw) => text.push_str(raw),
            }
            text.push('\n');
        }
        if let Err(e) = fs::write(&self.path, text) {
            warn!("could not write {}: {e}", self.path.display());
        }
    }
}

impl Line {
    fn parse(raw: &str) -> Self {
        let trimmed = raw.trim_start();
        if trimmed.starts_with('#') || trimmed.starts_with(';') {
            return Self::Raw(raw.to_string());
        }
        match raw.split_once('=') {
            Some((key, value)) => Self::Pair {
                key: key.trim().to_string(),
                value: value.to_string(),
            },
            None => Self::Raw(raw.to_string()),
        }
    }
}

// Values live on a single line; only the newline and the escape character
// itself need encoding.
fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\n', "\\n")
}

fn unescape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}
