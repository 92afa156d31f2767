//! Pulls app records out of a TypeScript data module.
//!
//! Two ways of finding the records are supported:
//!
//! * [`ExtractStrategy::Container`] finds `MARKER = [ ... ]` and reads every
//!   object element of that array. An element that does not parse (an
//!   unbalanced brace, a stray token) is dropped and reading resumes at the
//!   next `{` that opens a line.
//! * [`ExtractStrategy::Scan`] reads every object in the file whose first key
//!   is the anchor field (usually `id`), wherever it sits.
//!
//! Only `name`, `website` and `socials.{x,discord}` are looked at.

use tracing::debug;

use crate::domain::{ExtractedRecord, SocialField, Socials};
use crate::error::FormatError;
use crate::literal::{tokenize, Reader, Token, TokenKind, Value};

pub const DEFAULT_CONTAINER: &str = "APPS_DATA";
pub const DEFAULT_ANCHOR: &str = "id";

const UNDEFINED_MARKER: &str = "undefined";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractStrategy {
    Container { marker: String },
    Scan { anchor: String },
}

impl Default for ExtractStrategy {
    fn default() -> Self {
        ExtractStrategy::Container {
            marker: DEFAULT_CONTAINER.to_string(),
        }
    }
}

impl ExtractStrategy {
    // The scan heuristic treats `x: ""` as if the key were absent
    fn empty_social_is_missing(&self) -> bool {
        matches!(self, ExtractStrategy::Scan { .. })
    }
}

/// Extracts every named record from `source`, in source order
pub fn extract_records(
    source: &str,
    strategy: &ExtractStrategy,
) -> Result<Vec<ExtractedRecord>, FormatError> {
    let tokens = tokenize(source);
    let objects = match strategy {
        ExtractStrategy::Container { marker } => container_objects(&tokens, marker)?,
        ExtractStrategy::Scan { anchor } => anchored_objects(&tokens, anchor),
    };

    let empty_is_missing = strategy.empty_social_is_missing();
    Ok(objects
        .iter()
        .filter_map(|object| record_from_object(object, empty_is_missing))
        .collect())
}

fn container_objects(tokens: &[Token], marker: &str) -> Result<Vec<Value>, FormatError> {
    let open = find_container(tokens, marker).ok_or_else(|| FormatError::ContainerNotFound {
        marker: marker.to_string(),
    })?;
    let close = container_end(tokens, open);
    let body = &tokens[open + 1..close];

    let mut objects = Vec::new();
    let mut pos = 0;
    while pos < body.len() {
        if body[pos].kind != TokenKind::LBrace {
            pos += 1;
            continue;
        }

        let mut reader = Reader::new(body, pos);
        match reader.read_object() {
            Ok(object) => {
                objects.push(object);
                pos = reader.position();
            }
            Err(err) => {
                debug!(offset = body[pos].offset, error = %err, "Skipping malformed record");
                pos = next_record_opening(body, pos + 1);
            }
        }
    }
    Ok(objects)
}

// Index of the `[` in `MARKER ... = [`, skipping any type annotation.
// The `=` has to sit on the marker's own line.
fn find_container(tokens: &[Token], marker: &str) -> Option<usize> {
    let is_marker = |t: &Token| matches!(&t.kind, TokenKind::Ident(name) if name == marker);

    tokens
        .iter()
        .enumerate()
        .filter(|(_, token)| is_marker(*token))
        .find_map(|(at, _)| {
            let rest = &tokens[at + 1..];
            let equals = rest.iter().position(|t| {
                t.line_start || matches!(t.kind, TokenKind::Equals | TokenKind::Semicolon)
            })?;
            if rest[equals].kind != TokenKind::Equals {
                return None;
            }
            match rest.get(equals + 1) {
                Some(t) if t.kind == TokenKind::LBracket => Some(at + equals + 2),
                _ => None,
            }
        })
}

// Index of the `]` closing the container. Falls back to the first `];`
// when the brackets never balance, then to end of input.
fn container_end(tokens: &[Token], open: usize) -> usize {
    let mut depth = 0usize;
    for (at, token) in tokens.iter().enumerate().skip(open) {
        match token.kind {
            TokenKind::LBracket => depth += 1,
            TokenKind::RBracket => {
                depth -= 1;
                if depth == 0 {
                    return at;
                }
            }
            _ => {}
        }
    }

    tokens
        .windows(2)
        .enumerate()
        .skip(open)
        .find(|(_, pair)| pair[0].kind == TokenKind::RBracket && pair[1].kind == TokenKind::Semicolon)
        .map_or(tokens.len(), |(at, _)| at)
}

fn next_record_opening(tokens: &[Token], from: usize) -> usize {
    tokens
        .iter()
        .enumerate()
        .skip(from)
        .find(|(_, t)| t.kind == TokenKind::LBrace && t.line_start)
        .map_or(tokens.len(), |(at, _)| at)
}

fn anchored_objects(tokens: &[Token], anchor: &str) -> Vec<Value> {
    let mut objects = Vec::new();
    let mut pos = 0;
    while pos < tokens.len() {
        if !opens_anchored_object(&tokens[pos..], anchor) {
            pos += 1;
            continue;
        }

        let mut reader = Reader::new(tokens, pos);
        match reader.read_object() {
            Ok(object) => {
                objects.push(object);
                pos = reader.position();
            }
            Err(err) => {
                debug!(offset = tokens[pos].offset, error = %err, "Skipping malformed record");
                pos += 1;
            }
        }
    }
    objects
}

fn opens_anchored_object(tokens: &[Token], anchor: &str) -> bool {
    match tokens {
        [open, key, colon, ..] => {
            open.kind == TokenKind::LBrace
                && colon.kind == TokenKind::Colon
                && matches!(&key.kind, TokenKind::Ident(k) | TokenKind::Str(k) if k == anchor)
        }
        _ => false,
    }
}

fn record_from_object(object: &Value, empty_social_is_missing: bool) -> Option<ExtractedRecord> {
    let name = object.get("name").and_then(Value::as_str).filter(|n| !n.is_empty())?;

    let website = object
        .get("website")
        .and_then(Value::as_str)
        .map(str::to_string);

    let socials = match object.get("socials") {
        Some(socials @ Value::Object(_)) => Socials {
            x: social_field(socials.get("x"), empty_social_is_missing),
            discord: social_field(socials.get("discord"), empty_social_is_missing),
        },
        _ => Socials::default(),
    };

    Some(ExtractedRecord {
        name: name.to_string(),
        website,
        socials,
    })
}

fn social_field(value: Option<&Value>, empty_is_missing: bool) -> SocialField {
    match value {
        Some(Value::Str(s)) if s.is_empty() && empty_is_missing => SocialField::NotMentioned,
        Some(Value::Str(s)) => SocialField::Present(s.clone()),
        Some(Value::Ident(ident)) if ident == UNDEFINED_MARKER => SocialField::Cleared,
        _ => SocialField::NotMentioned,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const APPS_TS: &str = r#"
import type { App } from "./types";

export const APPS_DATA: App[] = [
  {
    id: "foo",
    name: "Foo",
    website: "https://a.io",
    socials: {
      x: "@foo",
      discord: undefined,
    },
  },
  {
    socials: { discord: "https://discord.gg/bar" },
    website: "https://bar.xyz",
    name: 'Bar',
    id: "bar",
  },
  {
    id: "nameless",
    website: "https://nobody.io",
  },
];

export default APPS_DATA;
"#;

    fn container() -> ExtractStrategy {
        ExtractStrategy::default()
    }

    fn scan() -> ExtractStrategy {
        ExtractStrategy::Scan {
            anchor: DEFAULT_ANCHOR.to_string(),
        }
    }

    fn names(records: &[ExtractedRecord]) -> Vec<&str> {
        records.iter().map(|r| r.name.as_str()).collect()
    }

    #[test]
    fn test_container_extracts_named_records_in_order() {
        let records = extract_records(APPS_TS, &container()).unwrap();
        assert_eq!(names(&records), vec!["Foo", "Bar"]);

        let foo = &records[0];
        assert_eq!(foo.website.as_deref(), Some("https://a.io"));
        assert_eq!(foo.socials.x, SocialField::Present("@foo".into()));
        assert_eq!(foo.socials.discord, SocialField::Cleared);
    }

    #[test]
    fn test_field_order_does_not_matter() {
        let records = extract_records(APPS_TS, &container()).unwrap();
        let bar = &records[1];
        assert_eq!(bar.website.as_deref(), Some("https://bar.xyz"));
        assert_eq!(bar.socials.x, SocialField::NotMentioned);
        assert_eq!(
            bar.socials.discord,
            SocialField::Present("https://discord.gg/bar".into())
        );
    }

    #[test]
    fn test_cleared_is_distinct_from_not_mentioned() {
        let source = r#"const APPS_DATA = [
  { name: "A", socials: { x: undefined } },
  { name: "B", socials: {} },
  { name: "C" },
];"#;
        let records = extract_records(source, &container()).unwrap();
        assert_eq!(records[0].socials.x, SocialField::Cleared);
        assert_eq!(records[1].socials.x, SocialField::NotMentioned);
        assert_eq!(records[2].socials.x, SocialField::NotMentioned);
    }

    #[test]
    fn test_missing_container_is_format_error() {
        let err = extract_records("export const OTHER = [];", &container()).unwrap_err();
        assert_eq!(
            err,
            FormatError::ContainerNotFound {
                marker: "APPS_DATA".into()
            }
        );
    }

    #[test]
    fn test_marker_without_array_is_format_error() {
        let source = "export default APPS_DATA;\nconst APPS_DATA = loadApps();";
        assert!(extract_records(source, &container()).is_err());
    }

    #[test]
    fn test_custom_container_marker() {
        let source = r#"const TOOLS = [{ name: "Hammer" }];"#;
        let strategy = ExtractStrategy::Container {
            marker: "TOOLS".into(),
        };
        let records = extract_records(source, &strategy).unwrap();
        assert_eq!(names(&records), vec!["Hammer"]);
    }

    #[test]
    fn test_unbalanced_record_is_skipped() {
        let source = r#"const APPS_DATA = [
  {
    name: "Broken",
    socials: { x: "@broken",
  },
  {
    name: "Good",
    socials: { x: "@good" },
  },
];"#;
        let records = extract_records(source, &container()).unwrap();
        assert_eq!(names(&records), vec!["Good"]);
        assert_eq!(records[0].socials.x, SocialField::Present("@good".into()));
    }

    #[test]
    fn test_malformed_record_before_the_last_is_skipped() {
        let source = r#"const APPS_DATA = [
  { name: "First" },
  {
    name: "Broken",
    socials: { x: "@broken" }
  {
    name: "Last",
    socials: { x: "@last" },
  },
];"#;
        let records = extract_records(source, &container()).unwrap();
        assert_eq!(names(&records), vec!["First", "Last"]);
        assert_eq!(records[1].socials.x, SocialField::Present("@last".into()));
    }

    #[test]
    fn test_computed_keys_keep_the_record() {
        let source = r#"const APPS_DATA = [
  {
    name: "Foo",
    chains: { [Chain.Plasma]: true },
    [FEATURED]: true,
    website: "https://a.io",
  },
];"#;
        let records = extract_records(source, &container()).unwrap();
        assert_eq!(names(&records), vec!["Foo"]);
        assert_eq!(records[0].website.as_deref(), Some("https://a.io"));
    }

    #[test]
    fn test_methods_keep_the_record() {
        let source = r#"const APPS_DATA = [
  {
    id: "foo",
    name: "Foo",
    label() { return "x"; },
    get slug() { return this.id; },
    socials: { x: "@foo" },
  },
];"#;
        for strategy in [container(), scan()] {
            let records = extract_records(source, &strategy).unwrap();
            assert_eq!(names(&records), vec!["Foo"]);
            assert_eq!(records[0].socials.x, SocialField::Present("@foo".into()));
        }
    }

    #[test]
    fn test_records_after_container_are_ignored() {
        let source = r#"const APPS_DATA = [
  { name: "Inside" },
];
const LEGACY = [
  { name: "Outside" },
];"#;
        let records = extract_records(source, &container()).unwrap();
        assert_eq!(names(&records), vec!["Inside"]);
    }

    #[test]
    fn test_container_keeps_empty_social_values() {
        let source = r#"const APPS_DATA = [{ name: "A", socials: { x: "" } }];"#;
        let records = extract_records(source, &container()).unwrap();
        assert_eq!(records[0].socials.x, SocialField::Present(String::new()));
    }

    #[test]
    fn test_scan_finds_anchored_objects_anywhere() {
        let records = extract_records(APPS_TS, &scan()).unwrap();
        // Bar's first key is `socials`, so the anchor does not match it
        assert_eq!(names(&records), vec!["Foo"]);
    }

    #[test]
    fn test_scan_has_no_container_precondition() {
        let source = r#"
export const featured = { id: "a", name: "Alpha" };
export const more = [{ id: "b", name: "Beta", socials: { x: "" } }];
"#;
        let records = extract_records(source, &scan()).unwrap();
        assert_eq!(names(&records), vec!["Alpha", "Beta"]);
        assert_eq!(records[1].socials.x, SocialField::NotMentioned);

        assert!(extract_records("nothing here", &scan()).unwrap().is_empty());
    }

    #[test]
    fn test_scan_tolerates_closing_brace_inside_strings() {
        let source = r#"[{ id: "q", name: "Quirky}", website: "https://q.io/{x}", socials: { x: "@q" } }]"#;
        let records = extract_records(source, &scan()).unwrap();
        assert_eq!(names(&records), vec!["Quirky}"]);
        assert_eq!(records[0].website.as_deref(), Some("https://q.io/{x}"));
        assert_eq!(records[0].socials.x, SocialField::Present("@q".into()));
    }

    #[test]
    fn test_nested_name_does_not_leak_into_record() {
        let source = r#"const APPS_DATA = [
  { id: "x", owner: { name: "Someone" }, username: "nope" },
];"#;
        let records = extract_records(source, &container()).unwrap();
        assert!(records.is_empty());
    }
}
