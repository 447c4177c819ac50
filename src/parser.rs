//! Decoding of function results into metric families.
//!
//! A function result is a JSON object whose `result` field holds a document
//! in the Prometheus text exposition format. [`parse_payload`] decodes both
//! layers; any failure rejects the whole payload.

use std::collections::BTreeMap;

use serde::Deserialize;
use thiserror::Error;

use crate::encoding::{is_valid_label_name, is_valid_legacy_char, is_valid_metric_name};
use crate::metrics::MetricType;

/// A named group of samples sharing a type and a help string.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricFamily {
    name: String,
    help: String,
    metric_type: MetricType,
    samples: Vec<Sample>,
}

impl MetricFamily {
    /// Create a family without samples.
    pub fn new(name: impl Into<String>, help: impl Into<String>, metric_type: MetricType) -> Self {
        Self {
            name: name.into(),
            help: help.into(),
            metric_type,
            samples: Vec::new(),
        }
    }

    /// Append a sample, builder style.
    pub fn with_sample(mut self, sample: Sample) -> Self {
        self.samples.push(sample);
        self
    }

    /// Name of the family.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Help text, empty when the document carried no `# HELP` line.
    pub fn help(&self) -> &str {
        &self.help
    }

    /// Type announced by `# TYPE`, [`MetricType::Untyped`] otherwise.
    pub fn metric_type(&self) -> MetricType {
        self.metric_type
    }

    /// Samples in document order.
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }
}

/// One sample line of a family.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    suffix: &'static str,
    labels: Vec<(String, String)>,
    value: f64,
    timestamp_ms: Option<i64>,
}

impl Sample {
    /// Create a sample with the given labels and value.
    pub fn new<N, V>(labels: impl IntoIterator<Item = (N, V)>, value: f64) -> Self
    where
        N: Into<String>,
        V: Into<String>,
    {
        Self {
            suffix: "",
            labels: labels
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
            value,
            timestamp_ms: None,
        }
    }

    /// Series suffix of histogram and summary samples (`_bucket`, `_sum`,
    /// `_count`), empty otherwise.
    pub fn suffix(&self) -> &'static str {
        self.suffix
    }

    /// Label pairs in document order.
    pub fn labels(&self) -> &[(String, String)] {
        &self.labels
    }

    /// Value of the label `name`, if present.
    pub fn label(&self, name: &str) -> Option<&str> {
        self.labels
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Sample value.
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Optional timestamp in milliseconds since the epoch.
    pub fn timestamp_ms(&self) -> Option<i64> {
        self.timestamp_ms
    }
}

/// Error raised for a malformed exposition document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("text format parsing error in line {line}: {kind}")]
pub struct ParseError {
    line: usize,
    kind: ParseErrorKind,
}

impl ParseError {
    /// 1-based line number of the offending line.
    pub fn line(&self) -> usize {
        self.line
    }

    /// What went wrong.
    pub fn kind(&self) -> &ParseErrorKind {
        &self.kind
    }
}

/// Kinds of [`ParseError`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[allow(missing_docs)]
pub enum ParseErrorKind {
    #[error("invalid metric name {0:?}")]
    InvalidMetricName(String),
    #[error("invalid label name {0:?}")]
    InvalidLabelName(String),
    #[error("duplicate label name {0:?}")]
    DuplicateLabelName(String),
    #[error("expected {expected}, found {found:?}")]
    Unexpected {
        expected: &'static str,
        found: String,
    },
    #[error("unterminated label value")]
    UnterminatedLabelValue,
    #[error("invalid escape sequence '\\{0}'")]
    InvalidEscape(char),
    #[error("missing sample value")]
    MissingValue,
    #[error("invalid sample value {0:?}")]
    InvalidValue(String),
    #[error("invalid timestamp {0:?}")]
    InvalidTimestamp(String),
    #[error("unknown metric type {0:?}")]
    UnknownType(String),
    #[error("second HELP line for metric name {0:?}")]
    DuplicateHelp(String),
    #[error("second TYPE line for metric name {0:?}")]
    DuplicateType(String),
    #[error("TYPE line for metric name {0:?} must come before its first sample")]
    TypeAfterSamples(String),
}

#[derive(Deserialize)]
struct LambdaResult {
    #[serde(alias = "Result")]
    result: String,
}

/// Extract the exposition document from a function result.
pub fn decode_payload(payload: &[u8]) -> Result<String, serde_json::Error> {
    let decoded: LambdaResult = serde_json::from_slice(payload)?;
    Ok(decoded.result)
}

/// Decode a function result and parse the embedded exposition document.
pub fn parse_payload(payload: &[u8]) -> crate::Result<BTreeMap<String, MetricFamily>> {
    let text = decode_payload(payload)?;
    Ok(parse_text(&text)?)
}

/// Parse a document in the text exposition format, keyed by family name.
///
/// Families announced by `# HELP` or `# TYPE` without any sample are left
/// out of the result.
pub fn parse_text(text: &str) -> Result<BTreeMap<String, MetricFamily>, ParseError> {
    let mut parser = Parser::default();
    for (i, line) in text.lines().enumerate() {
        parser
            .parse_line(line)
            .map_err(|kind| ParseError { line: i + 1, kind })?;
    }
    Ok(parser.finish())
}

#[derive(Debug)]
struct FamilyState {
    family: MetricFamily,
    help_seen: bool,
    type_seen: bool,
}

#[derive(Debug, Default)]
struct Parser {
    families: BTreeMap<String, FamilyState>,
}

impl Parser {
    fn finish(self) -> BTreeMap<String, MetricFamily> {
        self.families
            .into_iter()
            .filter(|(_, state)| !state.family.samples.is_empty())
            .map(|(name, state)| (name, state.family))
            .collect()
    }

    fn family(&mut self, name: &str) -> &mut FamilyState {
        self.families
            .entry(name.to_owned())
            .or_insert_with(|| FamilyState {
                family: MetricFamily::new(name, "", MetricType::Untyped),
                help_seen: false,
                type_seen: false,
            })
    }

    fn parse_line(&mut self, line: &str) -> Result<(), ParseErrorKind> {
        let mut cursor = Cursor::new(line);
        cursor.skip_blank();
        match cursor.peek() {
            None => Ok(()),
            Some('#') => {
                cursor.bump();
                self.parse_comment(cursor)
            }
            Some(_) => self.parse_sample(cursor),
        }
    }

    fn parse_comment(&mut self, mut cursor: Cursor<'_>) -> Result<(), ParseErrorKind> {
        cursor.skip_blank();
        let keyword = cursor.token();
        if keyword != "HELP" && keyword != "TYPE" {
            return Ok(());
        }
        cursor.skip_blank();
        if cursor.is_empty() {
            // A bare `# HELP` is an ordinary comment.
            return Ok(());
        }

        let name = cursor.token();
        if !is_valid_metric_name(name) {
            return Err(ParseErrorKind::InvalidMetricName(name.to_owned()));
        }
        cursor.skip_blank();

        if keyword == "HELP" {
            let help = unescape_help(cursor.rest())?;
            let state = self.family(name);
            if state.help_seen {
                return Err(ParseErrorKind::DuplicateHelp(name.to_owned()));
            }
            state.help_seen = true;
            state.family.help = help;
        } else {
            let keyword = cursor.rest().trim_end();
            let metric_type = MetricType::from_keyword(&keyword.to_ascii_lowercase())
                .ok_or_else(|| ParseErrorKind::UnknownType(keyword.to_owned()))?;
            let state = self.family(name);
            if state.type_seen {
                return Err(ParseErrorKind::DuplicateType(name.to_owned()));
            }
            if !state.family.samples.is_empty() {
                return Err(ParseErrorKind::TypeAfterSamples(name.to_owned()));
            }
            state.type_seen = true;
            state.family.metric_type = metric_type;
        }

        Ok(())
    }

    fn parse_sample(&mut self, mut cursor: Cursor<'_>) -> Result<(), ParseErrorKind> {
        let name = cursor.take_while(is_valid_legacy_char);
        if name.is_empty() {
            return Err(ParseErrorKind::InvalidMetricName(cursor.token().to_owned()));
        }
        let (family_name, suffix) = self.resolve_family(name);

        cursor.skip_blank();
        let mut labels = Vec::new();
        if cursor.peek() == Some('{') {
            cursor.bump();
            parse_labels(&mut cursor, &mut labels)?;
            cursor.skip_blank();
        }

        let value = cursor.token();
        if value.is_empty() {
            if cursor.is_empty() {
                return Err(ParseErrorKind::MissingValue);
            }
            return Err(ParseErrorKind::InvalidValue(cursor.rest().to_owned()));
        }
        let value = parse_float(value)?;

        cursor.skip_blank();
        let timestamp_ms = if cursor.is_empty() {
            None
        } else {
            let token = cursor.token();
            let timestamp = token
                .parse::<i64>()
                .map_err(|_| ParseErrorKind::InvalidTimestamp(token.to_owned()))?;
            Some(timestamp)
        };

        cursor.skip_blank();
        if !cursor.is_empty() {
            return Err(ParseErrorKind::Unexpected {
                expected: "end of line",
                found: cursor.rest().to_owned(),
            });
        }

        let family_name = family_name.to_owned();
        self.family(&family_name).family.samples.push(Sample {
            suffix,
            labels,
            value,
            timestamp_ms,
        });

        Ok(())
    }

    /// Maps `x_bucket`, `x_sum` and `x_count` onto family `x` when `x` was
    /// declared as a histogram or summary.
    fn resolve_family<'n>(&self, name: &'n str) -> (&'n str, &'static str) {
        const SUFFIXES: [(&str, &[MetricType]); 3] = [
            ("_bucket", &[MetricType::Histogram]),
            ("_sum", &[MetricType::Histogram, MetricType::Summary]),
            ("_count", &[MetricType::Histogram, MetricType::Summary]),
        ];

        for (suffix, types) in SUFFIXES {
            let Some(base) = name.strip_suffix(suffix) else {
                continue;
            };
            if let Some(state) = self.families.get(base) {
                if types.contains(&state.family.metric_type) {
                    return (base, suffix);
                }
            }
        }

        (name, "")
    }
}

fn parse_labels(
    cursor: &mut Cursor<'_>,
    labels: &mut Vec<(String, String)>,
) -> Result<(), ParseErrorKind> {
    loop {
        cursor.skip_blank();
        if cursor.peek() == Some('}') {
            cursor.bump();
            return Ok(());
        }

        let name =
            cursor.take_while(|c, _| !matches!(c, '=' | ',' | '}' | '"' | ' ' | '\t'));
        if !is_valid_label_name(name) {
            return Err(ParseErrorKind::InvalidLabelName(name.to_owned()));
        }

        cursor.skip_blank();
        cursor.expect('=', "'=' after label name")?;
        cursor.skip_blank();
        cursor.expect('"', "'\"' opening the label value")?;
        let value = read_label_value(cursor)?;

        if labels.iter().any(|(n, _)| n == name) {
            return Err(ParseErrorKind::DuplicateLabelName(name.to_owned()));
        }
        labels.push((name.to_owned(), value));

        cursor.skip_blank();
        match cursor.bump() {
            Some(',') => continue,
            Some('}') => return Ok(()),
            other => {
                return Err(ParseErrorKind::Unexpected {
                    expected: "',' or '}' after label value",
                    found: other.map(String::from).unwrap_or_default(),
                })
            }
        }
    }
}

fn read_label_value(cursor: &mut Cursor<'_>) -> Result<String, ParseErrorKind> {
    let mut value = String::new();
    loop {
        match cursor.bump() {
            None => return Err(ParseErrorKind::UnterminatedLabelValue),
            Some('"') => return Ok(value),
            Some('\\') => match cursor.bump() {
                Some('\\') => value.push('\\'),
                Some('"') => value.push('"'),
                Some('n') => value.push('\n'),
                Some(c) => return Err(ParseErrorKind::InvalidEscape(c)),
                None => return Err(ParseErrorKind::UnterminatedLabelValue),
            },
            Some(c) => value.push(c),
        }
    }
}

fn unescape_help(raw: &str) -> Result<String, ParseErrorKind> {
    let mut help = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            help.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => help.push('\\'),
            Some('n') => help.push('\n'),
            Some(c) => return Err(ParseErrorKind::InvalidEscape(c)),
            None => help.push('\\'),
        }
    }
    Ok(help)
}

fn parse_float(token: &str) -> Result<f64, ParseErrorKind> {
    match token {
        "+Inf" | "Inf" => Ok(f64::INFINITY),
        "-Inf" => Ok(f64::NEG_INFINITY),
        "NaN" => Ok(f64::NAN),
        _ => token
            .parse::<f64>()
            .map_err(|_| ParseErrorKind::InvalidValue(token.to_owned())),
    }
}

/// Position within one line of input.
#[derive(Debug)]
struct Cursor<'a> {
    line: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(line: &'a str) -> Self {
        Self { line, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.line[self.pos..]
    }

    fn is_empty(&self) -> bool {
        self.pos >= self.line.len()
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn expect(&mut self, expected: char, what: &'static str) -> Result<(), ParseErrorKind> {
        match self.peek() {
            Some(c) if c == expected => {
                self.bump();
                Ok(())
            }
            _ => Err(ParseErrorKind::Unexpected {
                expected: what,
                found: self.rest().to_owned(),
            }),
        }
    }

    fn skip_blank(&mut self) {
        while matches!(self.peek(), Some(' ' | '\t')) {
            self.pos += 1;
        }
    }

    fn take_while(&mut self, mut accept: impl FnMut(char, usize) -> bool) -> &'a str {
        let start = self.pos;
        let mut i = 0;
        while let Some(c) = self.peek() {
            if !accept(c, i) {
                break;
            }
            self.pos += c.len_utf8();
            i += 1;
        }
        &self.line[start..self.pos]
    }

    fn token(&mut self) -> &'a str {
        self.take_while(|c, _| c != ' ' && c != '\t')
    }
}
