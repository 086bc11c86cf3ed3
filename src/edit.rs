use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use xxhash_rust::xxh3::xxh3_64;

/// A single verified byte-span replacement.
///
/// Insertions are zero-length spans. Every patch step compiles its change
/// down to one or more of these, grouped per file in a [`FileEdits`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    /// Starting byte offset (inclusive)
    pub byte_start: usize,
    /// Ending byte offset (exclusive)
    pub byte_end: usize,
    /// Text spliced into [byte_start, byte_end)
    pub new_text: String,
    /// What the span must contain before the edit is applied
    pub expected_before: EditVerification,
}

/// Verification strategy for edit safety.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditVerification {
    /// Exact text match required
    ExactMatch(String),
    /// xxh3 hash of expected text (faster for large spans)
    Hash(u64),
}

impl EditVerification {
    pub fn matches(&self, text: &str) -> bool {
        match self {
            EditVerification::ExactMatch(expected) => text == expected,
            EditVerification::Hash(expected_hash) => xxh3_64(text.as_bytes()) == *expected_hash,
        }
    }

    /// Create verification from text, using hash for text over 1KB.
    pub fn from_text(text: &str) -> Self {
        if text.len() > 1024 {
            EditVerification::Hash(xxh3_64(text.as_bytes()))
        } else {
            EditVerification::ExactMatch(text.to_string())
        }
    }
}

/// State of a target file at planning time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Baseline {
    /// File did not exist; it is created from the edits alone.
    Missing,
    /// File contents the edits were planned against.
    Content(EditVerification),
}

impl Baseline {
    pub fn of(content: Option<&str>) -> Self {
        match content {
            Some(text) => Baseline::Content(EditVerification::Hash(xxh3_64(text.as_bytes()))),
            None => Baseline::Missing,
        }
    }
}

#[derive(Error, Debug)]
pub enum EditError {
    #[error("Before-text verification failed at {file}:{byte_start}")]
    BeforeTextMismatch {
        file: PathBuf,
        byte_start: usize,
        byte_end: usize,
        found: String,
    },

    #[error("Invalid byte range: [{byte_start}, {byte_end}) in file of length {file_len}")]
    InvalidByteRange {
        byte_start: usize,
        byte_end: usize,
        file_len: usize,
    },

    #[error("Edits overlap at byte {byte_start} in {file}")]
    Overlapping { file: PathBuf, byte_start: usize },

    #[error("{file} changed since the patch was planned")]
    BaselineChanged { file: PathBuf },

    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result of writing a file's edits.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "EditResult should be checked for success/already-applied"]
pub enum EditResult {
    Applied { file: PathBuf, bytes_changed: usize },
    /// The edits produced the content already on disk.
    AlreadyApplied { file: PathBuf },
}

impl Edit {
    /// Zero-length insertion at `offset`.
    pub fn insertion(offset: usize, text: impl Into<String>) -> Self {
        Self {
            byte_start: offset,
            byte_end: offset,
            new_text: text.into(),
            expected_before: EditVerification::ExactMatch(String::new()),
        }
    }

    pub fn replacement(
        byte_start: usize,
        byte_end: usize,
        new_text: impl Into<String>,
        expected_before: &str,
    ) -> Self {
        Self {
            byte_start,
            byte_end,
            new_text: new_text.into(),
            expected_before: EditVerification::from_text(expected_before),
        }
    }

    fn validate(&self, file: &Path, content: &str) -> Result<(), EditError> {
        if self.byte_start > self.byte_end
            || self.byte_end > content.len()
            || !content.is_char_boundary(self.byte_start)
            || !content.is_char_boundary(self.byte_end)
        {
            return Err(EditError::InvalidByteRange {
                byte_start: self.byte_start,
                byte_end: self.byte_end,
                file_len: content.len(),
            });
        }

        let current = &content[self.byte_start..self.byte_end];
        if !self.expected_before.matches(current) {
            return Err(EditError::BeforeTextMismatch {
                file: file.to_path_buf(),
                byte_start: self.byte_start,
                byte_end: self.byte_end,
                found: current.to_string(),
            });
        }

        Ok(())
    }
}

/// All edits destined for one file, plus the baseline they were planned on.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "FileEdits does nothing until apply() is called"]
pub struct FileEdits {
    pub file: PathBuf,
    pub baseline: Baseline,
    pub edits: Vec<Edit>,
}

impl FileEdits {
    pub fn new(file: impl Into<PathBuf>, baseline: Baseline, edits: Vec<Edit>) -> Self {
        Self {
            file: file.into(),
            baseline,
            edits,
        }
    }

    /// Apply the edits to `content` in memory.
    ///
    /// Edits are applied bottom-to-top so earlier offsets stay valid.
    pub fn preview(&self, content: &str) -> Result<String, EditError> {
        let mut ordered: Vec<&Edit> = self.edits.iter().collect();
        ordered.sort_by(|a, b| b.byte_start.cmp(&a.byte_start));

        for edit in &ordered {
            edit.validate(&self.file, content)?;
        }

        // Sorted descending: the later edit must start at or after the earlier one's end
        for window in ordered.windows(2) {
            let (later, earlier) = (window[0], window[1]);
            if earlier.byte_end > later.byte_start
                || (earlier.byte_start == later.byte_start && earlier.byte_end == later.byte_end)
            {
                return Err(EditError::Overlapping {
                    file: self.file.clone(),
                    byte_start: later.byte_start,
                });
            }
        }

        let mut out = content.to_string();
        for edit in ordered {
            out.replace_range(edit.byte_start..edit.byte_end, &edit.new_text);
        }
        Ok(out)
    }

    /// Re-read the file, check it still matches the baseline, and write the
    /// patched contents atomically.
    pub fn apply(&self) -> Result<EditResult, EditError> {
        let current = match fs::read_to_string(&self.file) {
            Ok(text) => Some(text),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => None,
            Err(err) => return Err(err.into()),
        };

        let baseline_holds = match (&self.baseline, current.as_deref()) {
            (Baseline::Missing, None) => true,
            (Baseline::Content(verify), Some(text)) => verify.matches(text),
            _ => false,
        };
        if !baseline_holds {
            return Err(EditError::BaselineChanged {
                file: self.file.clone(),
            });
        }

        let original = current.unwrap_or_default();
        let patched = self.preview(&original)?;

        if matches!(self.baseline, Baseline::Content(_)) && original == patched {
            return Ok(EditResult::AlreadyApplied {
                file: self.file.clone(),
            });
        }

        atomic_write(&self.file, patched.as_bytes())?;

        // Xcode and Gradle both key incremental work off mtime
        let now = filetime::FileTime::now();
        filetime::set_file_mtime(&self.file, now)?;

        Ok(EditResult::Applied {
            file: self.file.clone(),
            bytes_changed: self.edits.iter().map(|e| e.new_text.len()).sum(),
        })
    }
}

/// Atomic file write: tempfile + fsync + rename.
pub(crate) fn atomic_write(path: &Path, content: &[u8]) -> Result<(), EditError> {
    // Same directory keeps the rename on one filesystem
    let parent = path.parent().ok_or_else(|| {
        EditError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "Path has no parent directory",
        ))
    })?;

    let mut temp = tempfile::NamedTempFile::new_in(parent)?;
    temp.write_all(content)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;

    Ok(())
}
