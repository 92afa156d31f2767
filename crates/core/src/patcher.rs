//! Line-oriented patching of the ecosystem YAML.
//!
//! An entry starts at a `- name: "..."` line and runs until the next one.
//! Inside an entry whose name is known, the `website:`, `twitter:` and
//! `discord:` lines are rewritten; every other line is copied through.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::{ExtractedRecord, ExtractedRecordIndex, SocialField};

const ENTRY_START: &str = "- name:";

// Group 1 is a double-quoted name, group 2 a single-quoted one
static NAME_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"- name:\s*(?:"((?:[^"\\]|\\.)+)"|'((?:[^']|'')+)')"#)
        .expect("Invalid regex pattern")
});

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PatchOptions {
    /// Leave `twitter:`/`discord:` lines alone when the source never
    /// mentions the link, instead of blanking them
    pub keep_unmentioned: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Website,
    Twitter,
    Discord,
}

impl Field {
    pub fn as_str(self) -> &'static str {
        match self {
            Field::Website => "website",
            Field::Twitter => "twitter",
            Field::Discord => "discord",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldUpdate {
    pub field: Field,
    pub value: String,
    /// 1-based line number in the target
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryOutcome {
    /// `None` when the name line did not carry a quoted name
    pub name: Option<String>,
    pub line: usize,
    pub matched: bool,
    pub updates: Vec<FieldUpdate>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatchReport {
    pub entries: Vec<EntryOutcome>,
    /// Rewritten lines whose bytes actually changed
    pub changed_lines: usize,
}

impl PatchReport {
    pub fn matched(&self) -> usize {
        self.entries.iter().filter(|e| e.matched).count()
    }

    pub fn unmatched(&self) -> usize {
        self.entries.len() - self.matched()
    }

    pub fn is_unchanged(&self) -> bool {
        self.changed_lines == 0
    }
}

#[derive(Debug, Clone)]
pub struct PatchOutcome {
    pub text: String,
    pub report: PatchReport,
}

pub fn is_entry_start(line: &str) -> bool {
    line.trim().starts_with(ENTRY_START)
}

/// The unescaped name on a `- name:` line, if it is quoted
pub fn entry_name(line: &str) -> Option<String> {
    let caps = NAME_LINE.captures(line)?;
    if let Some(double) = caps.get(1) {
        return Some(unescape_double_quoted(double.as_str()));
    }
    caps.get(2).map(|single| single.as_str().replace("''", "'"))
}

fn unescape_double_quoted(raw: &str) -> String {
    let mut name = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            name.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => name.push('\n'),
            Some('t') => name.push('\t'),
            Some('r') => name.push('\r'),
            Some(other) => name.push(other),
            None => {}
        }
    }
    name
}

/// Rewrites `text` in a single forward pass.
///
/// The result has the same number of lines, in the same order, as the input.
pub fn patch_text(
    text: &str,
    index: &ExtractedRecordIndex,
    options: PatchOptions,
) -> PatchOutcome {
    let lines: Vec<&str> = text.split('\n').collect();
    let mut output: Vec<String> = Vec::with_capacity(lines.len());
    let mut report = PatchReport::default();

    let mut i = 0;
    while i < lines.len() {
        let line = lines[i];
        output.push(line.to_string());
        i += 1;

        if !is_entry_start(line) {
            continue;
        }

        let name = entry_name(line);
        let record = name.as_deref().and_then(|n| index.get(n));
        let mut outcome = EntryOutcome {
            name,
            line: i,
            matched: record.is_some(),
            updates: Vec::new(),
        };

        if let Some(record) = record {
            while i < lines.len() && !is_entry_start(lines[i]) {
                let current = lines[i];
                match rewrite_attribute(current, record, options) {
                    Some((field, value, rewritten)) => {
                        if rewritten != current {
                            report.changed_lines += 1;
                        }
                        outcome.updates.push(FieldUpdate {
                            field,
                            value,
                            line: i + 1,
                        });
                        output.push(rewritten);
                    }
                    None => output.push(current.to_string()),
                }
                i += 1;
            }
        }

        report.entries.push(outcome);
    }

    PatchOutcome {
        text: output.join("\n"),
        report,
    }
}

// First matching rule wins: website (only if the record has one), then
// twitter, then discord.
fn rewrite_attribute(
    line: &str,
    record: &ExtractedRecord,
    options: PatchOptions,
) -> Option<(Field, String, String)> {
    let (field, value) = match (&record.website, line) {
        (Some(website), l) if l.contains("website:") => (Field::Website, website.as_str()),
        (_, l) if l.contains("twitter:") => (Field::Twitter, social_value(&record.socials.x, options)?),
        (_, l) if l.contains("discord:") => {
            (Field::Discord, social_value(&record.socials.discord, options)?)
        }
        _ => return None,
    };
    Some((field, value.to_string(), render_line(line, field, value)))
}

fn social_value(social: &SocialField, options: PatchOptions) -> Option<&str> {
    if options.keep_unmentioned && !social.is_mentioned() {
        return None;
    }
    Some(social.patch_value())
}

// Keeps the original indentation and a trailing `\r`
fn render_line(original: &str, field: Field, value: &str) -> String {
    let indent_len = original.len() - original.trim_start_matches(|c| c == ' ' || c == '\t').len();
    let indent = &original[..indent_len];
    let cr = if original.ends_with('\r') { "\r" } else { "" };
    format!("{indent}{field}: \"{}\"{cr}", escape_double_quoted(value))
}

fn escape_double_quoted(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            c => escaped.push(c),
        }
    }
    escaped
}
