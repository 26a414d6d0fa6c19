//! In-memory edit buffer with pattern find/replace.
//!
//! The search text is a regular expression in both operations; replacement
//! text may reference capture groups as `$1` or `${name}`. A group reference
//! followed by name characters must be braced: `$1a` names a group `1a` and
//! expands to nothing, while `${1}a` is group 1 then `a`. `$$` is a literal `$`.

use regex::Regex;

use crate::error::{ClientError, Result};

/// One search hit in the buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    /// Byte offset of the first matched byte
    pub start: usize,
    /// Byte offset one past the last matched byte
    pub end: usize,
    /// 1-based line number of `start`
    pub line: usize,
    /// 1-based column of `start`, counted in characters
    pub column: usize,
}

/// The open file's text. Holds at most one file at a time.
#[derive(Debug, Default, Clone)]
pub struct EditBuffer {
    file: Option<String>,
    text: String,
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| ClientError::InvalidPattern(e.to_string()))
}

impl EditBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Key of the open file, if any
    pub fn file(&self) -> Option<&str> {
        self.file.as_deref()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    /// Replace the buffer with `text` from `file`.
    pub fn open(&mut self, file: impl Into<String>, text: impl Into<String>) {
        self.file = Some(file.into());
        self.text = text.into();
    }

    /// Point the buffer at a new key without touching its text.
    pub fn retarget(&mut self, file: impl Into<String>) {
        self.file = Some(file.into());
    }

    pub fn close(&mut self) {
        self.file = None;
        self.text.clear();
    }

    /// Every match of `pattern`, in order. The first is the one to reveal.
    ///
    /// An empty pattern finds nothing.
    pub fn find(&self, pattern: &str) -> Result<Vec<Match>> {
        if pattern.is_empty() {
            return Ok(Vec::new());
        }
        let regex = compile(pattern)?;

        let mut matches = Vec::new();
        let mut line = 1;
        let mut line_start = 0;
        let mut scanned = 0;

        for m in regex.find_iter(&self.text) {
            // Advance line tracking up to this match
            for (offset, c) in self.text[scanned..m.start()].char_indices() {
                if c == '\n' {
                    line += 1;
                    line_start = scanned + offset + 1;
                }
            }
            scanned = m.start();

            matches.push(Match {
                start: m.start(),
                end: m.end(),
                line,
                column: self.text[line_start..m.start()].chars().count() + 1,
            });
        }

        Ok(matches)
    }

    /// Replace every match of `pattern` with `replacement`.
    ///
    /// Returns the number of replacements. An invalid pattern leaves the
    /// buffer untouched. Write `${1}` rather than `$1` when the reference is
    /// followed by letters, digits or `_`.
    pub fn replace_all(&mut self, pattern: &str, replacement: &str) -> Result<usize> {
        let regex = compile(pattern)?;
        let count = regex.find_iter(&self.text).count();
        if count > 0 {
            self.text = regex.replace_all(&self.text, replacement).into_owned();
        }
        Ok(count)
    }
}
