//! Text-anchor insertion.
//!
//! Locates the first occurrence of an anchor substring in a document and
//! splices new content next to it. Everything here is a pure function of its
//! inputs; callers turn an [`AnchorInsertion`] into an [`Edit`](crate::edit::Edit)
//! to get it onto disk.

use serde::Deserialize;

/// Minimum similarity for [`closest_line`] to report a suggestion.
const SUGGESTION_THRESHOLD: f64 = 0.6;

/// Where inserted content lands relative to the anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Placement {
    /// Immediately before the first byte of the anchor.
    #[default]
    Before,
    /// At the start of the line following the anchor's line.
    After,
}

/// What a call site does when its anchor is absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnchorPolicy {
    /// Leave the document untouched and report the miss.
    #[default]
    Noop,
    /// Abort the pipeline.
    Fail,
}

/// A located insertion: splice `text` at byte `offset`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnchorInsertion {
    pub offset: usize,
    pub text: String,
}

impl AnchorInsertion {
    /// Produce the patched document. `document` must be the one this
    /// insertion was planned against.
    pub fn apply_to(&self, document: &str) -> String {
        let mut out = String::with_capacity(document.len() + self.text.len());
        out.push_str(&document[..self.offset]);
        out.push_str(&self.text);
        out.push_str(&document[self.offset..]);
        out
    }
}

/// Byte index of the first occurrence of `anchor`, if any.
///
/// An empty anchor never matches.
pub fn locate(document: &str, anchor: &str) -> Option<usize> {
    if anchor.is_empty() {
        return None;
    }
    document.find(anchor)
}

/// Plan the insertion of `insert` (plus a newline) next to the first
/// occurrence of `anchor`.
pub fn plan_insertion(
    insert: &str,
    anchor: &str,
    document: &str,
    placement: Placement,
) -> Option<AnchorInsertion> {
    let start = locate(document, anchor)?;

    match placement {
        Placement::Before => Some(AnchorInsertion {
            offset: start,
            text: format!("{insert}\n"),
        }),
        Placement::After => {
            let anchor_end = start + anchor.len();
            match document[anchor_end..].find('\n') {
                Some(rel) => Some(AnchorInsertion {
                    offset: anchor_end + rel + 1,
                    text: format!("{insert}\n"),
                }),
                // Anchor sits on an unterminated last line
                None => Some(AnchorInsertion {
                    offset: document.len(),
                    text: format!("\n{insert}"),
                }),
            }
        }
    }
}

/// Insert `insert` and a newline immediately before the first occurrence of
/// `anchor`. Returns `document` unchanged when the anchor is absent.
///
/// ```
/// use wmelon_prebuild::anchor::patch;
///
/// let out = patch(
///     "import X;",
///     "import java.util.List;",
///     "import java.util.List;\nclass Foo {}",
/// );
/// assert_eq!(out, "import X;\nimport java.util.List;\nclass Foo {}");
/// ```
pub fn patch(insert: &str, anchor: &str, document: &str) -> String {
    match plan_insertion(insert, anchor, document, Placement::Before) {
        Some(insertion) => insertion.apply_to(document),
        None => document.to_string(),
    }
}

/// Line of `document` most similar to `anchor`, for "did you mean" output.
pub fn closest_line(document: &str, anchor: &str) -> Option<String> {
    let wanted = anchor.trim();
    if wanted.is_empty() {
        return None;
    }

    document
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| (line, strsim::normalized_levenshtein(wanted, line)))
        .filter(|(_, score)| *score >= SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(line, _)| line.to_string())
}
