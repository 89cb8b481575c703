//! Pre-masks substrings whose shape already marks them as variable data
//! (addresses, numbers, caller-supplied patterns) before a line is tokenized.
use crate::error::ConfigError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Marker that stands in for a dynamic token, both in masked content and in
/// rendered templates.
pub const PLACEHOLDER: &str = "<*>";

/// `host.name:port` style addresses, ASCII host labels only
static URL_WITH_PORT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([A-Za-z0-9_-]+\.)+[A-Za-z0-9_-]+(:[0-9]+)").expect("url pattern is valid")
});

/// IPv4 with optional port and an optional trailing colon
static IPV4: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"/?([0-9]+\.){3}[0-9]+(:[0-9]+)?:?").expect("ipv4 pattern is valid")
});

static DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9]+").expect("digit pattern is valid"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaskSource {
    /// Matched by a pattern from the configuration
    User,
    /// Matched by one of the built-in shapes
    BuiltIn,
}

/// One replaced span.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaskedToken {
    /// `user_N` or `builtin_N`, numbered per source in match order
    pub label: String,
    pub source: MaskSource,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskedContent {
    /// The content with every match replaced by [`PLACEHOLDER`]. Carries the
    /// single leading space added before matching.
    pub content: String,
    pub masked: Vec<MaskedToken>,
}

impl MaskedContent {
    pub fn tokens(&self) -> Vec<String> {
        tokenize(&self.content)
    }

    /// Look a masked value up by its label.
    pub fn get(&self, label: &str) -> Option<&str> {
        self.masked
            .iter()
            .find(|t| t.label == label)
            .map(|t| t.value.as_str())
    }
}

/// Split masked content into tokens.
pub fn tokenize(content: &str) -> Vec<String> {
    content.split_whitespace().map(str::to_string).collect()
}

#[derive(Debug, Clone)]
pub struct DynamicTokenMasker {
    user_patterns: Vec<Regex>,
}

impl DynamicTokenMasker {
    /// Compile the caller's patterns; they run before the built-ins, in the
    /// order given.
    pub fn new<S: AsRef<str>>(user_patterns: &[S]) -> Result<Self, ConfigError> {
        let user_patterns = user_patterns
            .iter()
            .map(|p| {
                Regex::new(p.as_ref()).map_err(|source| ConfigError::InvalidPattern {
                    pattern: p.as_ref().to_string(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { user_patterns })
    }

    pub fn user_pattern_count(&self) -> usize {
        self.user_patterns.len()
    }

    pub fn mask(&self, content: &str) -> MaskedContent {
        let mut recorder = Recorder::default();

        // A leading delimiter keeps start-of-line numbers boundary-checked
        // the same way as the rest of the line.
        let mut line = format!(" {}", content);

        for pattern in &self.user_patterns {
            line = recorder.replace_all(pattern, &line, MaskSource::User);
        }

        line = recorder.replace_all(&URL_WITH_PORT, &line, MaskSource::BuiltIn);
        line = recorder.replace_all(&IPV4, &line, MaskSource::BuiltIn);
        line = recorder.replace_spans(&line, &number_spans(&line), MaskSource::BuiltIn);

        MaskedContent {
            content: line,
            masked: recorder.masked,
        }
    }
}

#[derive(Default)]
struct Recorder {
    masked: Vec<MaskedToken>,
    user_count: usize,
    builtin_count: usize,
}

impl Recorder {
    fn record(&mut self, source: MaskSource, value: &str) {
        let label = match source {
            MaskSource::User => {
                self.user_count += 1;
                format!("user_{}", self.user_count)
            }
            MaskSource::BuiltIn => {
                self.builtin_count += 1;
                format!("builtin_{}", self.builtin_count)
            }
        };

        self.masked.push(MaskedToken {
            label,
            source,
            value: value.to_string(),
        });
    }

    fn replace_all(&mut self, pattern: &Regex, line: &str, source: MaskSource) -> String {
        let spans: Vec<(usize, usize)> = pattern
            .find_iter(line)
            .filter(|m| !m.is_empty())
            .map(|m| (m.start(), m.end()))
            .collect();

        self.replace_spans(line, &spans, source)
    }

    fn replace_spans(&mut self, line: &str, spans: &[(usize, usize)], source: MaskSource) -> String {
        if spans.is_empty() {
            return line.to_string();
        }

        let mut out = String::with_capacity(line.len());
        let mut last_end = 0;

        for &(start, end) in spans {
            out.push_str(&line[last_end..start]);
            out.push_str(PLACEHOLDER);
            self.record(source, &line[start..end]);
            last_end = end;
        }
        out.push_str(&line[last_end..]);

        out
    }
}

/// Spans of bare integers: an optionally signed (`-`, `+`, or `-+`) digit
/// run with no ASCII letter or digit directly on either side, or any digit
/// run that ends the line. `_` and other punctuation count as separators.
fn number_spans(line: &str) -> Vec<(usize, usize)> {
    let bytes = line.as_bytes();
    let separator_at = |i: usize| !bytes[i].is_ascii_alphanumeric();

    DIGITS
        .find_iter(line)
        .filter_map(|m| {
            let (start, end) = (m.start(), m.end());

            if end == bytes.len() {
                return Some((start, end));
            }
            if !separator_at(end) || start == 0 {
                return None;
            }

            // Leftmost sign prefix whose own left neighbour is a separator
            if start >= 3 && &bytes[start - 2..start] == b"-+" && separator_at(start - 3) {
                return Some((start - 2, end));
            }
            if start >= 2 && matches!(bytes[start - 1], b'-' | b'+') && separator_at(start - 2) {
                return Some((start - 1, end));
            }
            if separator_at(start - 1) {
                return Some((start, end));
            }

            None
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn masker() -> DynamicTokenMasker {
        DynamicTokenMasker::new::<&str>(&[]).unwrap()
    }

    #[test]
    fn test_user_pattern_and_builtin_ip() {
        let masker = DynamicTokenMasker::new(&["User"]).unwrap();
        let masked = masker.mask("User logged in from 192.168.1.1");

        assert!(!masked.content.contains("User"));
        assert!(!masked.content.contains("192.168.1.1"));
        assert_eq!(masked.content.matches(PLACEHOLDER).count(), 2);

        assert_eq!(masked.get("user_1"), Some("User"));
        assert_eq!(masked.get("builtin_1"), Some("192.168.1.1"));
        assert_eq!(masked.masked[0].source, MaskSource::User);
        assert_eq!(masked.masked[1].source, MaskSource::BuiltIn);
    }

    #[test]
    fn test_case_insensitive_user_pattern() {
        let masker = DynamicTokenMasker::new(&["(?i)user"]).unwrap();
        let masked = masker.mask("User logged in from IP 192.168.1.1");

        assert_eq!(masked.get("user_1"), Some("User"));
    }

    #[test]
    fn test_unmatched_content_only_gains_leading_space() {
        let line = "Static log message without dynamic content";
        let masked = masker().mask(line);

        assert_eq!(masked.content, format!(" {}", line));
        assert!(masked.masked.is_empty());
    }

    #[test]
    fn test_every_match_is_replaced() {
        let masked = masker().mask("retry 3 of 5 after 250 ms");

        assert_eq!(masked.content, " retry <*> of <*> after <*> ms");
        let values: Vec<&str> = masked.masked.iter().map(|t| t.value.as_str()).collect();
        assert_eq!(values, ["3", "5", "250"]);
        assert_eq!(masked.masked[2].label, "builtin_3");
    }

    #[test]
    fn test_host_port_and_ip_port() {
        let masked = masker().mask("connect db.internal.example:5432 via 10.0.0.7:8080");

        assert_eq!(masked.content, " connect <*> via <*>");
        assert_eq!(masked.get("builtin_1"), Some("db.internal.example:5432"));
        assert_eq!(masked.get("builtin_2"), Some("10.0.0.7:8080"));
    }

    #[test]
    fn test_numbers_inside_alphanumeric_runs_are_kept() {
        let masked = masker().mask("worker2 started v2beta ok");

        assert_eq!(masked.content, " worker2 started v2beta ok");
        assert!(masked.masked.is_empty());
    }

    #[test]
    fn test_underscore_separates_numbers() {
        let masked = masker().mask("deleting blk_38 ok");
        assert_eq!(masked.content, " deleting blk_<*> ok");
        assert_eq!(masked.get("builtin_1"), Some("38"));

        let masked = masker().mask("deleting blk_-42 ok");
        assert_eq!(masked.content, " deleting blk_<*> ok");
        assert_eq!(masked.get("builtin_1"), Some("-42"));

        let masked = masker().mask("id 38_x done");
        assert_eq!(masked.content, " id <*>_x done");
        assert_eq!(masked.get("builtin_1"), Some("38"));
    }

    #[test]
    fn test_url_host_labels_are_ascii() {
        let masked = masker().mask("connect café.local:8080 now");

        // the host is left alone, only the port number is masked
        assert_eq!(masked.content, " connect café.local:<*> now");
        assert_eq!(masked.get("builtin_1"), Some("8080"));
    }

    #[test]
    fn test_trailing_number_is_masked_even_inside_a_word() {
        let masked = masker().mask("session sess42");
        assert_eq!(masked.content, " session sess<*>");
        assert_eq!(masked.get("builtin_1"), Some("42"));
    }

    #[test]
    fn test_signed_numbers() {
        let masked = masker().mask("delta -5 and +7 then x-9 done");

        assert_eq!(masked.content, " delta <*> and <*> then x-<*> done");
        let values: Vec<&str> = masked.masked.iter().map(|t| t.value.as_str()).collect();
        assert_eq!(values, ["-5", "+7", "9"]);
    }

    #[test]
    fn test_leading_number_is_masked() {
        let masked = masker().mask("42 requests served");
        assert_eq!(masked.content, " <*> requests served");
    }

    #[test]
    fn test_tokens_split_on_whitespace() {
        let masked = masker().mask("took 12 ms");
        assert_eq!(masked.tokens(), ["took", "<*>", "ms"]);
    }

    #[test]
    fn test_invalid_user_pattern() {
        let err = DynamicTokenMasker::new(&["(unclosed"]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPattern { pattern, .. } if pattern == "(unclosed"));
    }
}
