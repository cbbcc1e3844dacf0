use std::collections::HashSet;

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref WORD_BOUNDARY: Regex = Regex::new(r"([\p{Ll}\d])(\p{Lu})|(\p{Lu})(\p{Lu}\p{Ll})").unwrap();
    static ref IDENTIFIER:    Regex = Regex::new(r"^[\p{L}_][\p{L}\p{N}_]*$").unwrap();
}

/// JSON-style quoting for names inside diagnostics.
pub fn quote(text: &str) -> String {
    serde_json::to_string(text).unwrap_or_else(|_| format!("\"{}\"", text))
}

pub fn is_identifier(text: &str) -> bool {
    IDENTIFIER.is_match(text)
}

/// Split on underscores and lower-to-upper case changes; acronyms stay whole
/// (`sessionID` → `session`, `ID`; `HTTPServer` → `HTTP`, `Server`).
pub fn split_words(s: &str) -> Vec<String> {
    let separated = WORD_BOUNDARY.replace_all(s, |caps: &regex::Captures| {
        if let (Some(a), Some(b)) = (caps.get(1), caps.get(2)) {
            format!("{}_{}", a.as_str(), b.as_str())
        } else {
            let a = caps.get(3).map_or("", |m| m.as_str());
            let b = caps.get(4).map_or("", |m| m.as_str());
            format!("{}_{}", a, b)
        }
    });
    separated
        .split('_')
        .filter(|word| !word.is_empty())
        .map(str::to_string)
        .collect()
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
    }
}

pub fn to_snake_case(s: &str) -> String {
    split_words(s)
        .iter()
        .map(|word| word.to_lowercase())
        .collect::<Vec<_>>()
        .join("_")
}

pub fn to_pascal_case(s: &str) -> String {
    split_words(s).iter().map(|word| capitalize(word)).collect()
}

pub fn to_lower_camel_case(s: &str) -> String {
    split_words(s)
        .iter()
        .enumerate()
        .map(|(i, word)| if i == 0 { word.to_lowercase() } else { capitalize(word) })
        .collect()
}

/// The HTTP route a procedure is served on.
pub fn route_path(procedure: &str) -> String {
    format!("/{}", to_snake_case(procedure))
}

/// Hands out distinct names within one generated scope.
///
/// A name already taken, or reserved up front, gets the smallest free
/// numeric suffix from 2 upwards.
#[derive(Debug, Default)]
pub struct NameSet {
    taken: HashSet<String>,
}

impl NameSet {
    pub fn with_reserved(names: &[&str]) -> NameSet {
        NameSet {
            taken: names.iter().map(|name| name.to_string()).collect(),
        }
    }

    pub fn claim(&mut self, base: &str, separator: &str) -> String {
        let mut name = base.to_string();
        let mut n = 2;
        while self.taken.contains(&name) {
            name = format!("{}{}{}", base, separator, n);
            n += 1;
        }
        self.taken.insert(name.clone());
        name
    }
}

/// Patch up a case-converted name so it is still an identifier: empty
/// names become `fallback`, names starting with a digit gain a leading `_`.
pub fn identifier_or(converted: String, fallback: &str) -> String {
    match converted.chars().next() {
        None => fallback.to_string(),
        Some(first) if first.is_numeric() => format!("_{}", converted),
        Some(_) => converted,
    }
}
