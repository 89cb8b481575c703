//! Compiles a `<placeholder>` line format into an anchored matcher and pulls
//! the message body (and any header field) out of raw log lines.
use crate::error::ConfigError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

/// `<name>` markers inside a format spec
static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<([^<>]+)>").expect("placeholder pattern is valid"));

static WHITESPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

static FIELD_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("field name pattern is valid")
});

/// A log format spec such as `"<date> <time> <level> <message>"`, compiled
/// into a whole-line regex with one named group per placeholder.
#[derive(Debug, Clone)]
pub struct CompiledFormat {
    spec: String,
    pattern: Regex,
    fields: Vec<String>,
}

impl CompiledFormat {
    /// Compile a format spec.
    ///
    /// Literal text between placeholders is escaped, and every whitespace run
    /// in it matches one-or-more whitespace characters so irregular spacing in
    /// the log still lines up. Placeholders become non-greedy named groups.
    pub fn compile(spec: &str) -> Result<Self, ConfigError> {
        let mut pattern = String::from("^");
        let mut fields: Vec<String> = Vec::new();
        let mut last_end = 0;

        for caps in PLACEHOLDER.captures_iter(spec) {
            let (Some(marker), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };

            pattern.push_str(&literal_pattern(&spec[last_end..marker.start()]));

            let name = name.as_str();
            if !FIELD_NAME.is_match(name) {
                return Err(ConfigError::InvalidPlaceholderName(name.to_string()));
            }
            if fields.iter().any(|f| f == name) {
                return Err(ConfigError::DuplicatePlaceholder(name.to_string()));
            }

            pattern.push_str(&format!("(?P<{}>.*?)", name));
            fields.push(name.to_string());
            last_end = marker.end();
        }

        if fields.is_empty() {
            return Err(ConfigError::NoPlaceholders(spec.to_string()));
        }

        pattern.push_str(&literal_pattern(&spec[last_end..]));
        pattern.push('$');

        let pattern = Regex::new(&pattern).map_err(ConfigError::InvalidFormat)?;

        Ok(Self {
            spec: spec.to_string(),
            pattern,
            fields,
        })
    }

    /// Placeholder names in the order they appear in the format
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f == name)
    }

    pub fn spec(&self) -> &str {
        &self.spec
    }

    /// The compiled line pattern, for diagnostics.
    pub fn as_regex(&self) -> &Regex {
        &self.pattern
    }

    /// Return the value of `field` for a conforming line, or `None` when the
    /// line does not match the format. A mismatch is ordinary traffic.
    pub fn extract_content<'a>(&self, line: &'a str, field: &str) -> Option<&'a str> {
        self.pattern
            .captures(line.trim())
            .and_then(|caps| caps.name(field))
            .map(|m| m.as_str())
    }

    /// Every named field of a conforming line.
    pub fn extract_fields<'a>(&self, line: &'a str) -> Option<HashMap<&str, &'a str>> {
        let caps = self.pattern.captures(line.trim())?;

        Some(
            self.fields
                .iter()
                .filter_map(|name| caps.name(name).map(|m| (name.as_str(), m.as_str())))
                .collect(),
        )
    }
}

fn literal_pattern(literal: &str) -> String {
    WHITESPACE
        .split(literal)
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(r"\s+")
}
