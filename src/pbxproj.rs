//! Xcode `project.pbxproj` build configurations.
//!
//! Only the `XCBuildConfiguration` section is parsed. Every parsed setting
//! keeps the byte span of its `key = value;` statement, so changes made to the
//! in-memory tree are written back as span [`Edit`]s and the rest of the file
//! stays byte-for-byte identical.

use crate::edit::Edit;
use std::ops::Range;
use thiserror::Error;

const SECTION_BEGIN: &str = "/* Begin XCBuildConfiguration section */";
const SECTION_END: &str = "/* End XCBuildConfiguration section */";

/// Build setting that excludes architectures for simulator SDKs.
pub const SIMULATOR_EXCLUDED_ARCHS: &str = "EXCLUDED_ARCHS[sdk=iphonesimulator*]";
pub const PRODUCT_NAME: &str = "PRODUCT_NAME";

const DEFAULT_SETTING_INDENT: &str = "\t\t\t\t";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PbxprojError {
    #[error("no XCBuildConfiguration section found")]
    MissingSection,

    #[error("syntax error at byte {offset}: {message}")]
    Syntax { offset: usize, message: String },
}

/// A parsed plist value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingValue {
    Scalar(String),
    List(Vec<String>),
}

impl SettingValue {
    fn render(&self) -> String {
        match self {
            SettingValue::Scalar(s) => quote_if_needed(s),
            SettingValue::List(items) => {
                let mut out = String::from("(");
                for item in items {
                    out.push_str(&quote_if_needed(item));
                    out.push_str(", ");
                }
                out.push(')');
                out
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Setting {
    pub key: String,
    pub value: SettingValue,
    /// Span of the original statement; `None` for settings added in memory.
    span: Option<Range<usize>>,
    dirty: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSettings {
    settings: Vec<Setting>,
    /// Where new statements go: start of the closing brace's line.
    insert_at: usize,
    /// Whether the closing brace sits on its own line.
    brace_on_own_line: bool,
    indent: String,
}

impl BuildSettings {
    pub fn get(&self, key: &str) -> Option<&SettingValue> {
        self.settings.iter().find(|s| s.key == key).map(|s| &s.value)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Set `key`, replacing an existing statement or queueing a new one.
    /// Returns whether anything changed.
    pub fn set(&mut self, key: &str, value: SettingValue) -> bool {
        if let Some(existing) = self.settings.iter_mut().find(|s| s.key == key) {
            if existing.value == value {
                return false;
            }
            existing.value = value;
            existing.dirty = true;
            return true;
        }

        self.settings.push(Setting {
            key: key.to_string(),
            value,
            span: None,
            dirty: true,
        });
        true
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildConfiguration {
    pub id: String,
    pub name: Option<String>,
    pub build_settings: Option<BuildSettings>,
}

/// The build-configuration tree of one Xcode project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PbxProject {
    pub configurations: Vec<BuildConfiguration>,
}

impl PbxProject {
    pub fn parse(source: &str) -> Result<Self, PbxprojError> {
        let begin = source
            .find(SECTION_BEGIN)
            .ok_or(PbxprojError::MissingSection)?
            + SECTION_BEGIN.len();
        let end = source[begin..]
            .find(SECTION_END)
            .ok_or(PbxprojError::MissingSection)?
            + begin;

        let mut parser = Parser::new(source, begin, end);
        let mut configurations = Vec::new();

        loop {
            parser.skip_trivia();
            if parser.at_end() {
                break;
            }
            let (id, _) = parser.scalar()?;
            parser.expect('=')?;
            let dict = match parser.value()? {
                Node::Dict(dict) => dict,
                _ => return Err(parser.error("expected object dictionary")),
            };
            parser.expect(';')?;
            configurations.push(build_configuration(source, id, dict));
        }

        Ok(Self { configurations })
    }

    /// Number of settings changed in memory and not yet written.
    pub fn pending_changes(&self) -> usize {
        self.settings().filter(|s| s.dirty).count()
    }

    /// Span edits that persist every in-memory change against the text the
    /// tree was parsed from.
    pub fn edits(&self, source: &str) -> Vec<Edit> {
        let mut edits = Vec::new();

        for settings in self
            .configurations
            .iter()
            .filter_map(|c| c.build_settings.as_ref())
        {
            let mut inserted = String::new();

            for setting in settings.settings.iter().filter(|s| s.dirty) {
                let statement = format!(
                    "{} = {};",
                    quote_if_needed(&setting.key),
                    setting.value.render()
                );
                match &setting.span {
                    Some(span) => edits.push(Edit::replacement(
                        span.start,
                        span.end,
                        statement,
                        &source[span.clone()],
                    )),
                    None if settings.brace_on_own_line => {
                        inserted.push_str(&settings.indent);
                        inserted.push_str(&statement);
                        inserted.push('\n');
                    }
                    None => {
                        inserted.push_str(&statement);
                        inserted.push(' ');
                    }
                }
            }

            if !inserted.is_empty() {
                edits.push(Edit::insertion(settings.insert_at, inserted));
            }
        }

        edits
    }

    fn settings(&self) -> impl Iterator<Item = &Setting> {
        self.configurations
            .iter()
            .filter_map(|c| c.build_settings.as_ref())
            .flat_map(|b| b.settings.iter())
    }
}

/// Exclude `arch` from simulator builds in every configuration that names a
/// product. Configurations without `PRODUCT_NAME` are left alone.
pub fn exclude_simulator_architectures(mut project: PbxProject, arch: &str) -> PbxProject {
    for config in &mut project.configurations {
        let Some(settings) = config.build_settings.as_mut() else {
            continue;
        };
        if !settings.contains(PRODUCT_NAME) {
            continue;
        }
        if settings.set(
            SIMULATOR_EXCLUDED_ARCHS,
            SettingValue::Scalar(arch.to_string()),
        ) {
            tracing::debug!(
                id = %config.id,
                name = ?config.name,
                arch,
                "excluding simulator architecture"
            );
        }
    }
    project
}

fn build_configuration(source: &str, id: String, dict: Dict) -> BuildConfiguration {
    let mut name = None;
    let mut build_settings = None;

    for entry in dict.entries {
        match (entry.key.as_str(), entry.value) {
            ("name", Node::Scalar(value)) => name = Some(value),
            ("buildSettings", Node::Dict(settings)) => {
                build_settings = Some(build_settings_from(source, settings));
            }
            _ => {}
        }
    }

    BuildConfiguration {
        id,
        name,
        build_settings,
    }
}

fn build_settings_from(source: &str, dict: Dict) -> BuildSettings {
    let line_start = source[..dict.close].rfind('\n').map_or(0, |i| i + 1);
    let brace_on_own_line = source[line_start..dict.close].trim().is_empty();

    let indent = dict
        .entries
        .first()
        .map(|entry| {
            let entry_line = source[..entry.span.start].rfind('\n').map_or(0, |i| i + 1);
            source[entry_line..entry.span.start].to_string()
        })
        .filter(|indent| indent.trim().is_empty() && !indent.is_empty())
        .unwrap_or_else(|| DEFAULT_SETTING_INDENT.to_string());

    let settings = dict
        .entries
        .into_iter()
        .filter_map(|entry| {
            let value = match entry.value {
                Node::Scalar(s) => SettingValue::Scalar(s),
                Node::Array(items) => SettingValue::List(
                    items
                        .into_iter()
                        .filter_map(|n| match n {
                            Node::Scalar(s) => Some(s),
                            _ => None,
                        })
                        .collect(),
                ),
                // Nested dictionaries do not occur in build settings
                Node::Dict(_) => return None,
            };
            Some(Setting {
                key: entry.key,
                value,
                span: Some(entry.span),
                dirty: false,
            })
        })
        .collect();

    BuildSettings {
        settings,
        insert_at: if brace_on_own_line {
            line_start
        } else {
            dict.close
        },
        brace_on_own_line,
        indent,
    }
}

fn is_bare_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '$' | '/' | ':' | '.' | '-')
}

fn quote_if_needed(value: &str) -> String {
    if !value.is_empty() && value.chars().all(is_bare_char) {
        return value.to_string();
    }
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out.push('"');
    out
}

#[derive(Debug)]
enum Node {
    Scalar(String),
    Array(Vec<Node>),
    Dict(Dict),
}

#[derive(Debug)]
struct Dict {
    entries: Vec<Entry>,
    /// Offset of the closing `}`
    close: usize,
}

#[derive(Debug)]
struct Entry {
    key: String,
    value: Node,
    /// From the first byte of the key through the terminating `;`
    span: Range<usize>,
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
    end: usize,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str, pos: usize, end: usize) -> Self {
        Self { src, pos, end }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.end
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..self.end]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn error(&self, message: impl Into<String>) -> PbxprojError {
        PbxprojError::Syntax {
            offset: self.pos,
            message: message.into(),
        }
    }

    fn skip_trivia(&mut self) {
        loop {
            let rest = self.rest();
            let trimmed = rest.trim_start();
            self.pos += rest.len() - trimmed.len();

            if trimmed.starts_with("/*") {
                match trimmed.find("*/") {
                    Some(close) => self.pos += close + 2,
                    None => self.pos = self.end,
                }
            } else if trimmed.starts_with("//") {
                match trimmed.find('\n') {
                    Some(nl) => self.pos += nl + 1,
                    None => self.pos = self.end,
                }
            } else {
                return;
            }
        }
    }

    fn expect(&mut self, wanted: char) -> Result<(), PbxprojError> {
        self.skip_trivia();
        if self.peek() == Some(wanted) {
            self.pos += wanted.len_utf8();
            Ok(())
        } else {
            Err(self.error(format!("expected '{wanted}'")))
        }
    }

    /// Quoted or bare string. Returns the unquoted value and its start offset.
    fn scalar(&mut self) -> Result<(String, usize), PbxprojError> {
        self.skip_trivia();
        let start = self.pos;

        if self.peek() == Some('"') {
            let mut value = String::new();
            let mut chars = self.rest().char_indices().skip(1);
            while let Some((idx, c)) = chars.next() {
                match c {
                    '"' => {
                        self.pos += idx + 1;
                        return Ok((value, start));
                    }
                    '\\' => match chars.next() {
                        Some((_, 'n')) => value.push('\n'),
                        Some((_, 't')) => value.push('\t'),
                        Some((_, escaped)) => value.push(escaped),
                        None => break,
                    },
                    other => value.push(other),
                }
            }
            return Err(self.error("unterminated string"));
        }

        let len = self
            .rest()
            .find(|c: char| c.is_whitespace() || "{}();=,\"".contains(c))
            .unwrap_or(self.end - self.pos);
        if len == 0 {
            return Err(self.error("expected a value"));
        }
        let value = self.rest()[..len].to_string();
        self.pos += len;
        Ok((value, start))
    }

    fn value(&mut self) -> Result<Node, PbxprojError> {
        self.skip_trivia();
        match self.peek() {
            Some('{') => {
                self.pos += 1;
                self.dict_body().map(Node::Dict)
            }
            Some('(') => {
                self.pos += 1;
                let mut items = Vec::new();
                loop {
                    self.skip_trivia();
                    match self.peek() {
                        Some(')') => {
                            self.pos += 1;
                            return Ok(Node::Array(items));
                        }
                        Some(',') => self.pos += 1,
                        Some(_) => items.push(self.value()?),
                        None => return Err(self.error("unterminated list")),
                    }
                }
            }
            Some(_) => self.scalar().map(|(s, _)| Node::Scalar(s)),
            None => Err(self.error("unexpected end of section")),
        }
    }

    /// Entries up to and including the closing brace.
    fn dict_body(&mut self) -> Result<Dict, PbxprojError> {
        let mut entries = Vec::new();
        loop {
            self.skip_trivia();
            match self.peek() {
                Some('}') => {
                    let close = self.pos;
                    self.pos += 1;
                    return Ok(Dict { entries, close });
                }
                Some(_) => {
                    let (key, start) = self.scalar()?;
                    self.expect('=')?;
                    let value = self.value()?;
                    self.expect(';')?;
                    entries.push(Entry {
                        key,
                        value,
                        span: start..self.pos,
                    });
                }
                None => return Err(self.error("unterminated dictionary")),
            }
        }
    }
}
