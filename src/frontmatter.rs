//! Extraction and parsing of the `---` delimited metadata block at the head
//! of a document.

use std::collections::BTreeMap;

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref FRONTMATTER_RE: Regex = Regex::new(r"(?s)\A---\s*\n(.*?)\n---\s*\n").unwrap();
}

/// A single frontmatter value: a scalar or a list of strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Text(String),
    List(Vec<String>),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            Value::List(_) => None,
        }
    }
}

/// Keys are unique per document.
pub type Mapping = BTreeMap<String, Value>;

/// Result of looking for a metadata block at the head of a document.
#[derive(Debug)]
pub enum FrontMatter {
    /// A block was found and yielded at least one key.
    Parsed(Mapping),
    /// No usable metadata. `warning` is set when a block was present but
    /// could not be parsed.
    Empty { warning: Option<String> },
}

/// Splits a raw document into its metadata mapping and body text.
///
/// A missing block is not an error: the mapping is empty and the body is the
/// document unchanged. A block that yields no `key: value` pair is reported
/// through the `Empty` variant, also with the original text untouched.
pub fn extract(raw: &str) -> (FrontMatter, &str) {
    let captures = match FRONTMATTER_RE.captures(raw) {
        Some(captures) => captures,
        None => return (FrontMatter::Empty { warning: None }, raw),
    };

    let mapping = parse_block(captures.get(1).unwrap().as_str());
    if mapping.is_empty() {
        let warning = "metadata block contains no 'key: value' entry".to_string();
        return (FrontMatter::Empty { warning: Some(warning) }, raw);
    }

    let body = &raw[captures.get(0).unwrap().end()..];
    (FrontMatter::Parsed(mapping), body)
}

fn parse_block(block: &str) -> Mapping {
    let mut mapping = Mapping::new();

    for line in block.lines() {
        if let Some((key, value)) = line.split_once(':') {
            let key = key.trim();
            if key.is_empty() {
                continue;
            }
            let value = strip_quotes(value.trim());
            mapping.insert(key.to_string(), parse_value(value));
        }
    }

    mapping
}

fn parse_value(value: &str) -> Value {
    if value.starts_with('[') && value.ends_with(']') {
        Value::List(parse_list(value))
    } else {
        Value::Text(value.to_string())
    }
}

/// Bracketed lists are JSON-ish. Single quotes are swapped for double quotes
/// before a strict parse; anything that still fails is split on commas with
/// quote-stripping.
fn parse_list(value: &str) -> Vec<String> {
    let as_json = value.replace('\'', "\"");
    if let Ok(items) = serde_json::from_str::<Vec<String>>(&as_json) {
        return items;
    }

    value[1..value.len() - 1]
        .split(',')
        .map(|item| strip_quotes(item.trim()).to_string())
        .collect()
}

fn strip_quotes(value: &str) -> &str {
    value.trim_matches('"').trim_matches('\'')
}
