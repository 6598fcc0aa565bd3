//! Log sanitization for survey answers and identifiers.
//!
//! Redacts, from any formatted log line:
//! - survey answers (`phq_total`, `gad_total`, `k10_total`, `phq_item9`,
//!   `asq_any_yes`) in `key=value`, `key: value` and JSON forms
//! - UUID-like identifiers
//! - e-mail addresses
//! - long hex tokens behind a secret-like key
//!
//! The primary protection is that request payloads never reach logging calls;
//! this is the fallback for the ones that do.
//!
//! # Performance
//!
//! `sanitize()` caps its input (see `MINDRISK_SANITIZE_MAX_BYTES`, default
//! 16 KiB) so a huge log line cannot stall the writer.

use regex::{Regex, RegexSet};
use std::sync::OnceLock;
use tracing_subscriber::fmt::MakeWriter;

static PATTERNS: OnceLock<Patterns> = OnceLock::new();

const DEFAULT_SANITIZE_MAX_BYTES: usize = 16 * 1024;

/// Name of the environment variable overriding the sanitizer input cap.
pub const MAX_BYTES_ENV: &str = "MINDRISK_SANITIZE_MAX_BYTES";

struct Rule {
    regex: Regex,
    replacement: &'static str,
}

struct Patterns {
    any: RegexSet,
    rules: Vec<Rule>,
}

fn truncate_to_char_boundary(input: &str, max_bytes: usize) -> (&str, bool) {
    if input.len() <= max_bytes {
        return (input, false);
    }
    let mut end = max_bytes;
    while end > 0 && !input.is_char_boundary(end) {
        end -= 1;
    }
    (&input[..end], true)
}

fn max_sanitize_bytes() -> usize {
    std::env::var(MAX_BYTES_ENV)
        .ok()
        .and_then(|v| v.trim().parse::<usize>().ok())
        .filter(|&v| v > 0)
        .unwrap_or(DEFAULT_SANITIZE_MAX_BYTES)
}

fn patterns() -> &'static Patterns {
    PATTERNS.get_or_init(|| {
        let table: [(&'static str, &'static str); 4] = [
            // Survey answers; the key is kept so log lines stay readable.
            (
                r#"(?i)("?\b(?:phq_total|gad_total|k10_total|phq_item9|asq_any_yes)\b"?\s*[:=]\s*)"?[A-Za-z0-9.+-]+"?"#,
                "${1}[REDACTED]",
            ),
            (
                r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}",
                "[REDACTED-UUID]",
            ),
            (
                r"(?i)\b[a-z0-9](?:[a-z0-9._%+-]{0,62}[a-z0-9])?@(?:[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?\.)+[a-z]{2,}\b",
                "[REDACTED-EMAIL]",
            ),
            (
                r"(?i)\b(?:api[_-]?key|token|secret|password)\b\s*[:=]\s*[0-9a-zA-Z+/]{16,}={0,2}",
                "[REDACTED-SECRET]",
            ),
        ];

        let any = RegexSet::new(table.iter().map(|(p, _)| *p)).expect("Valid regex set");
        let rules = table
            .into_iter()
            .map(|(pattern, replacement)| Rule {
                regex: Regex::new(pattern).expect("Valid regex"),
                replacement,
            })
            .collect();
        Patterns { any, rules }
    })
}

/// Redact sensitive values from one piece of log text.
#[must_use]
pub fn sanitize(input: &str) -> String {
    sanitize_with_limit(input, max_sanitize_bytes())
}

fn sanitize_with_limit(input: &str, max_bytes: usize) -> String {
    let patterns = patterns();
    let (prefix, truncated) = truncate_to_char_boundary(input, max_bytes);

    let mut result = prefix.to_string();
    for idx in &patterns.any.matches(prefix) {
        let rule = &patterns.rules[idx];
        result = rule.regex.replace_all(&result, rule.replacement).into_owned();
    }
    if truncated {
        result.push_str(" [TRUNCATED]");
        // The cut removed the record terminator; restore it.
        if input.ends_with('\n') {
            result.push('\n');
        }
    }
    result
}

/// True if the text holds anything `sanitize` would redact.
#[must_use]
pub fn contains_sensitive(input: &str) -> bool {
    let (prefix, _) = truncate_to_char_boundary(input, max_sanitize_bytes());
    patterns().any.is_match(prefix)
}

/// `MakeWriter` wrapper that sanitizes every formatted line before it reaches
/// the underlying sink.
#[derive(Debug, Clone)]
pub struct SanitizingMakeWriter<M> {
    inner: M,
}

impl<M> SanitizingMakeWriter<M> {
    #[must_use]
    pub fn new(inner: M) -> Self {
        Self { inner }
    }
}

/// Line-buffering writer produced by [`SanitizingMakeWriter`].
pub struct SanitizingWriter<W> {
    inner: W,
    buffer: Vec<u8>,
}

impl<W: std::io::Write> SanitizingWriter<W> {
    fn write_sanitized(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        let text = String::from_utf8_lossy(bytes);
        self.inner.write_all(sanitize(&text).as_bytes())
    }

    fn flush_lines(&mut self) -> std::io::Result<()> {
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            self.write_sanitized(&line)?;
        }
        Ok(())
    }
}

impl<W: std::io::Write> std::io::Write for SanitizingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buffer.extend_from_slice(buf);

        // A line with no newline in sight is flushed early rather than buffered forever.
        if self.buffer.len() > max_sanitize_bytes().saturating_mul(2) {
            let pending = std::mem::take(&mut self.buffer);
            self.write_sanitized(&pending)?;
            self.inner.write_all(b"\n")?;
            return Ok(buf.len());
        }

        self.flush_lines()?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flush_lines()?;
        if !self.buffer.is_empty() {
            let pending = std::mem::take(&mut self.buffer);
            self.write_sanitized(&pending)?;
        }
        self.inner.flush()
    }
}

impl<'a, M> MakeWriter<'a> for SanitizingMakeWriter<M>
where
    M: MakeWriter<'a>,
{
    type Writer = SanitizingWriter<M::Writer>;

    fn make_writer(&'a self) -> Self::Writer {
        SanitizingWriter {
            inner: self.inner.make_writer(),
            buffer: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_redacts_survey_key_value() {
        let out = sanitize("request phq_total=14 gad_total=9 asq_any_yes=true ok");
        assert_eq!(
            out,
            "request phq_total=[REDACTED] gad_total=[REDACTED] asq_any_yes=[REDACTED] ok"
        );
    }

    #[test]
    fn test_redacts_survey_json_and_debug() {
        let json = sanitize(r#"{"phq_total": 14, "k10_total":31, "phq_item9": 2}"#);
        assert!(!json.contains("14"));
        assert!(!json.contains("31"));
        assert!(json.contains(r#""phq_total": [REDACTED]"#));

        let debug = sanitize("FeatureVector { phq_total: 3, gad_total: 4 }");
        assert!(!debug.contains(": 3"));
        assert!(debug.contains("gad_total: [REDACTED]"));
    }

    #[test]
    fn test_redacts_uuid_and_email() {
        let out = sanitize("run 550e8400-e29b-41d4-a716-446655440000 by ops@clinic.org");
        assert!(out.contains("[REDACTED-UUID]"));
        assert!(out.contains("[REDACTED-EMAIL]"));
        assert!(!out.contains("550e8400"));
    }

    #[test]
    fn test_leaves_metrics_alone() {
        let line = "[suicidal] cal_rf: PR AUC=0.4123 ROC AUC=0.8811";
        assert_eq!(sanitize(line), line);
        assert!(!contains_sensitive(line));
        assert!(contains_sensitive("phq_item9=1"));
    }

    #[test]
    fn test_truncates_large_inputs() {
        let out = sanitize_with_limit("phq_total=12 and then a long tail", 14);
        assert!(out.ends_with("[TRUNCATED]"));
        assert!(!out.contains("12"));
    }

    #[test]
    fn test_truncation_keeps_line_terminator() {
        let out = sanitize_with_limit("phq_total=12 and then a long tail\n", 14);
        assert!(out.ends_with(" [TRUNCATED]\n"), "{out:?}");
        assert_eq!(out.matches('\n').count(), 1);

        let out = sanitize_with_limit("no terminator here at all", 5);
        assert!(out.ends_with("[TRUNCATED]"));
    }

    #[test]
    fn test_truncation_respects_utf8() {
        let (prefix, truncated) = truncate_to_char_boundary("ééé", 3);
        assert!(truncated);
        assert_eq!(prefix, "é");
    }

    #[test]
    fn test_writer_sanitizes_each_line() {
        let mut sink = Vec::new();
        {
            let mut writer = SanitizingWriter {
                inner: &mut sink,
                buffer: Vec::new(),
            };
            writer.write_all(b"first phq_total=20\nsecond ").unwrap();
            writer.write_all(b"k10_total=40\n").unwrap();
            writer.flush().unwrap();
        }
        let text = String::from_utf8(sink).unwrap();
        assert_eq!(
            text,
            "first phq_total=[REDACTED]\nsecond k10_total=[REDACTED]\n"
        );
    }
}
