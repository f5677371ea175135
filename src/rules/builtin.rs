//! Built-in, serializable cleaning rules.

use super::CleaningRule;
use crate::table::{ColumnKind, RowView, Value};
use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt::{self, Write as _};

/// Configurable per-field rule. JSON form is tagged by `kind`:
///
/// ```json
/// { "kind": "range_midpoint", "strip": "()cC.s' " }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Rule {
    /// Remove leading/trailing whitespace
    Trim,

    /// Remove every occurrence of each listed character
    StripChars { chars: String },

    /// Literal substring replacement
    Replace { from: String, to: String },

    /// Regex replacement of all matches
    RegexReplace { pattern: Pattern, replacement: String },

    Lowercase,

    Uppercase,

    /// Capitalize the first letter of each alphabetic run, lowercase the rest
    TitleCase,

    /// Turn the listed strings into `Null`
    NullIf { values: Vec<String> },

    /// Strip the listed characters, then parse an integer
    ToInteger {
        #[serde(default)]
        strip: String,
    },

    /// Strip the listed characters, then parse a float
    ToFloat {
        #[serde(default)]
        strip: String,
    },

    /// Match against true/false word lists (case-insensitive)
    ToBool {
        #[serde(default = "default_true_values")]
        true_values: Vec<String>,
        #[serde(default = "default_false_values")]
        false_values: Vec<String>,
    },

    /// Strip the listed characters, then parse a year or the rounded
    /// midpoint of a `start-end` range
    RangeMidpoint {
        #[serde(default)]
        strip: String,
        #[serde(default = "default_range_separator")]
        separator: char,
    },

    /// Split on `separator` and keep one part; negative indices count from the end
    SplitPart { separator: String, index: isize },

    /// First capture group (or whole match) of `pattern`, parsed as a float
    ExtractNumber {
        #[serde(default = "default_number_pattern")]
        pattern: Pattern,
    },

    /// Lookup table; unmatched values take `default`, or stay as they are
    MapValues {
        mapping: BTreeMap<String, Value>,
        #[serde(default)]
        default: Option<Value>,
    },

    /// Label a number by the bucket with the greatest lower bound not above it
    Bucket { buckets: Vec<Bucket> },

    /// Parse a date or timestamp with a `strftime` format and render it again
    /// with `output` (ISO 8601 when absent)
    ParseDate {
        format: String,
        #[serde(default)]
        output: Option<String>,
    },
}

/// One labelled range of a [`Rule::Bucket`]. A missing `from` is unbounded below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bucket {
    #[serde(default)]
    pub from: Option<f64>,
    pub label: String,
}

impl Bucket {
    pub fn new(from: Option<f64>, label: impl Into<String>) -> Self {
        Self {
            from,
            label: label.into(),
        }
    }
}

/// A compiled regex that serializes as its source text.
#[derive(Debug, Clone)]
pub struct Pattern(Regex);

impl Pattern {
    /// # Errors
    ///
    /// Returns the regex compile error for an invalid pattern.
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Regex::new(pattern).map(Self)
    }

    pub fn as_regex(&self) -> &Regex {
        &self.0
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.0.as_str() == other.0.as_str()
    }
}

impl Serialize for Pattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.0.as_str())
    }
}

impl<'de> Deserialize<'de> for Pattern {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let source = String::deserialize(deserializer)?;
        Self::new(&source).map_err(serde::de::Error::custom)
    }
}

fn default_true_values() -> Vec<String> {
    ["true", "yes", "1"].map(str::to_owned).to_vec()
}

fn default_false_values() -> Vec<String> {
    ["false", "no", "0"].map(str::to_owned).to_vec()
}

fn default_range_separator() -> char {
    '-'
}

fn default_number_pattern() -> Pattern {
    Pattern(Regex::new(r"(\d+)").expect("number pattern is valid"))
}

impl CleaningRule for Rule {
    fn name(&self) -> &str {
        match self {
            Self::Trim => "trim",
            Self::StripChars { .. } => "strip_chars",
            Self::Replace { .. } => "replace",
            Self::RegexReplace { .. } => "regex_replace",
            Self::Lowercase => "lowercase",
            Self::Uppercase => "uppercase",
            Self::TitleCase => "title_case",
            Self::NullIf { .. } => "null_if",
            Self::ToInteger { .. } => "to_integer",
            Self::ToFloat { .. } => "to_float",
            Self::ToBool { .. } => "to_bool",
            Self::RangeMidpoint { .. } => "range_midpoint",
            Self::SplitPart { .. } => "split_part",
            Self::ExtractNumber { .. } => "extract_number",
            Self::MapValues { .. } => "map_values",
            Self::Bucket { .. } => "bucket",
            Self::ParseDate { .. } => "parse_date",
        }
    }

    fn clean(&self, value: &Value, _row: &RowView<'_>) -> Result<Value, String> {
        match self {
            Self::Trim => Ok(text(value)?.trim().into()),
            Self::StripChars { chars } => Ok(strip_chars(text(value)?, chars).into()),
            Self::Replace { from, to } => Ok(text(value)?.replace(from.as_str(), to).into()),
            Self::RegexReplace {
                pattern,
                replacement,
            } => Ok(pattern
                .as_regex()
                .replace_all(text(value)?, replacement.as_str())
                .into_owned()
                .into()),
            Self::Lowercase => Ok(text(value)?.to_lowercase().into()),
            Self::Uppercase => Ok(text(value)?.to_uppercase().into()),
            Self::TitleCase => Ok(title_case(text(value)?).into()),
            Self::NullIf { values } => Ok(match value.as_str() {
                Some(s) if values.iter().any(|v| v == s) => Value::Null,
                _ => value.clone(),
            }),
            Self::ToInteger { strip } => to_integer(value, strip),
            Self::ToFloat { strip } => to_float(value, strip),
            Self::ToBool {
                true_values,
                false_values,
            } => to_bool(value, true_values, false_values),
            Self::RangeMidpoint { strip, separator } => match value {
                Value::Int(i) => Ok(Value::Int(*i)),
                _ => range_midpoint(strip_chars(text(value)?, strip).trim(), *separator)
                    .map(Value::Int),
            },
            Self::SplitPart { separator, index } => split_part(text(value)?, separator, *index),
            Self::ExtractNumber { pattern } => extract_number(value, pattern),
            Self::MapValues { mapping, default } => {
                let key = value.to_string();
                Ok(match (mapping.get(&key), default) {
                    (Some(mapped), _) => mapped.clone(),
                    (None, Some(fallback)) => fallback.clone(),
                    (None, None) => value.clone(),
                })
            }
            Self::Bucket { buckets } => bucket(value, buckets),
            Self::ParseDate { format, output } => parse_date(value, format, output.as_deref()),
        }
    }

    fn output_kind(&self) -> Option<ColumnKind> {
        match self {
            Self::ToInteger { .. } | Self::RangeMidpoint { .. } => Some(ColumnKind::Integer),
            Self::ToFloat { .. } | Self::ExtractNumber { .. } => Some(ColumnKind::Float),
            Self::ToBool { .. } => Some(ColumnKind::Boolean),
            Self::Bucket { .. } => Some(ColumnKind::Categorical),
            Self::Trim
            | Self::StripChars { .. }
            | Self::Replace { .. }
            | Self::RegexReplace { .. }
            | Self::Lowercase
            | Self::Uppercase
            | Self::TitleCase
            | Self::SplitPart { .. }
            | Self::ParseDate { .. } => Some(ColumnKind::String),
            Self::NullIf { .. } | Self::MapValues { .. } => None,
        }
    }
}

fn text(value: &Value) -> Result<&str, String> {
    value
        .as_str()
        .ok_or_else(|| format!("expected text, found {}", value.type_name()))
}

fn strip_chars(s: &str, chars: &str) -> String {
    s.chars().filter(|c| !chars.contains(*c)).collect()
}

fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_word = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if in_word {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(c);
            in_word = false;
        }
    }
    out
}

fn parse_int(s: &str) -> Result<i64, String> {
    s.trim()
        .parse::<i64>()
        .map_err(|e| format!("'{s}' is not an integer: {e}"))
}

fn to_integer(value: &Value, strip: &str) -> Result<Value, String> {
    match value {
        Value::Int(i) => Ok(Value::Int(*i)),
        Value::Float(f) if f.fract() == 0.0 && f.is_finite() => {
            format!("{f:.0}").parse::<i64>().map(Value::Int).map_err(|e| e.to_string())
        }
        Value::Float(f) => Err(format!("{f} is not a whole number")),
        _ => parse_int(&strip_chars(text(value)?, strip)).map(Value::Int),
    }
}

fn to_float(value: &Value, strip: &str) -> Result<Value, String> {
    let parsed = match value {
        Value::Float(f) => *f,
        Value::Int(_) => return Ok(Value::Float(value.as_f64().unwrap_or_default())),
        _ => {
            let s = strip_chars(text(value)?, strip);
            s.trim()
                .parse::<f64>()
                .map_err(|e| format!("'{s}' is not a number: {e}"))?
        }
    };
    if parsed.is_finite() {
        Ok(Value::Float(parsed))
    } else {
        Err(format!("{parsed} is not a finite number"))
    }
}

fn to_bool(value: &Value, true_values: &[String], false_values: &[String]) -> Result<Value, String> {
    if let Value::Bool(b) = value {
        return Ok(Value::Bool(*b));
    }
    let s = value.to_string();
    let s = s.trim();
    if true_values.iter().any(|t| t.eq_ignore_ascii_case(s)) {
        Ok(Value::Bool(true))
    } else if false_values.iter().any(|f| f.eq_ignore_ascii_case(s)) {
        Ok(Value::Bool(false))
    } else {
        Err(format!("'{s}' is not a recognised boolean"))
    }
}

/// Parse a year, or the midpoint of a `start<sep>end` range.
///
/// The midpoint rounds half away from zero, so `"1990-1999"` gives 1995.
/// The separator is only looked for after the first character, which keeps a
/// leading minus sign intact. Only the first two parts of a range are used.
///
/// # Errors
///
/// Returns a reason if either bound is not an integer.
pub fn range_midpoint(s: &str, separator: char) -> Result<i64, String> {
    let Some((start, rest)) = split_after_first(s, separator) else {
        return parse_int(s);
    };
    // Anything after a second separator is ignored: `1913-1923-1930` is 1918.
    let end = split_after_first(rest, separator).map_or(rest, |(end, _)| end);
    let start = parse_int(start)?;
    let end = parse_int(end)?;

    let sum = i128::from(start) + i128::from(end);
    // Remainder carries the sign of `sum`, which rounds .5 away from zero.
    let mid = sum / 2 + sum % 2;
    i64::try_from(mid).map_err(|e| e.to_string())
}

/// Split at the first `separator` that is not the leading character.
fn split_after_first(s: &str, separator: char) -> Option<(&str, &str)> {
    let (i, _) = s.char_indices().skip(1).find(|&(_, c)| c == separator)?;
    let (head, tail) = s.split_at(i);
    Some((head, tail.strip_prefix(separator).unwrap_or(tail)))
}

fn parse_date(value: &Value, format: &str, output: Option<&str>) -> Result<Value, String> {
    let s = text(value)?.trim();
    let rendered = if let Ok(timestamp) = NaiveDateTime::parse_from_str(s, format) {
        render(timestamp.format(output.unwrap_or("%Y-%m-%d %H:%M:%S")))?
    } else {
        let date = NaiveDate::parse_from_str(s, format)
            .map_err(|e| format!("'{s}' does not match '{format}': {e}"))?;
        render(date.format(output.unwrap_or("%Y-%m-%d")))?
    };
    Ok(Value::Str(rendered))
}

fn render(formatted: impl fmt::Display) -> Result<String, String> {
    let mut out = String::new();
    write!(out, "{formatted}").map_err(|e| format!("invalid output format: {e}"))?;
    Ok(out)
}

fn split_part(s: &str, separator: &str, index: isize) -> Result<Value, String> {
    let parts: Vec<&str> = s.split(separator).collect();
    let resolved = if index < 0 {
        isize::try_from(parts.len())
            .ok()
            .and_then(|len| usize::try_from(len + index).ok())
    } else {
        usize::try_from(index).ok()
    };
    resolved
        .and_then(|i| parts.get(i))
        .map(|p| Value::from(*p))
        .ok_or_else(|| format!("no part {index} after splitting on '{separator}'"))
}

fn extract_number(value: &Value, pattern: &Pattern) -> Result<Value, String> {
    if let Some(x) = value.as_f64() {
        return Ok(Value::Float(x));
    }
    let s = value.to_string();
    let caps = pattern
        .as_regex()
        .captures(&s)
        .ok_or_else(|| format!("no number in '{s}'"))?;
    let matched = caps
        .get(1)
        .or_else(|| caps.get(0))
        .map(|m| m.as_str())
        .unwrap_or_default();
    matched
        .parse::<f64>()
        .map(Value::Float)
        .map_err(|e| format!("'{matched}' is not a number: {e}"))
}

fn bucket(value: &Value, buckets: &[Bucket]) -> Result<Value, String> {
    let x = value
        .as_f64()
        .ok_or_else(|| format!("expected number, found {}", value.type_name()))?;
    if x.is_nan() {
        return Err("cannot bucket NaN".to_owned());
    }
    buckets
        .iter()
        .filter(|b| b.from.is_none_or(|from| from <= x))
        .max_by(|a, b| {
            let a = a.from.unwrap_or(f64::NEG_INFINITY);
            let b = b.from.unwrap_or(f64::NEG_INFINITY);
            a.total_cmp(&b)
        })
        .map(|b| Value::from(b.label.as_str()))
        .ok_or_else(|| format!("{x} is below every bucket"))
}

#[cfg(test)]
mod tests {
    #![expect(clippy::unwrap_used)]
    use super::*;
    use crate::table::Header;

    fn run(rule: &Rule, value: impl Into<Value>) -> Result<Value, String> {
        let header = Header::default();
        rule.clean(&value.into(), &RowView::new(&header, &[]))
    }

    const BAD_CHARS: &str = "()cC.s' ";

    #[test]
    fn test_range_midpoint_examples() {
        assert_eq!(range_midpoint("1913-1923", '-'), Ok(1918));
        assert_eq!(range_midpoint("1990-1999", '-'), Ok(1995));
        assert_eq!(range_midpoint("1957-1959", '-'), Ok(1958));
        assert_eq!(range_midpoint("1912", '-'), Ok(1912));
        assert_eq!(range_midpoint("-3", '-'), Ok(-3));
        assert_eq!(range_midpoint("-3--4", '-'), Ok(-4));
        assert!(range_midpoint("1913-", '-').is_err());
    }

    #[test]
    fn test_range_midpoint_uses_first_two_parts() {
        assert_eq!(range_midpoint("1913-1923-1930", '-'), Ok(1918));
        assert_eq!(range_midpoint("-3--4--9", '-'), Ok(-4));
    }

    #[test]
    fn test_moma_dates() {
        let rule = Rule::RangeMidpoint {
            strip: BAD_CHARS.to_owned(),
            separator: '-',
        };
        let cases = [
            ("1912", 1912),
            ("1913-1923", 1918),
            ("(1951)", 1951),
            ("c. 1915", 1915),
            ("c. 1955.", 1955),
            ("c. 1970's", 1970),
            ("C. 1990-1999", 1995),
        ];
        for (input, expected) in cases {
            assert_eq!(run(&rule, input), Ok(Value::Int(expected)), "input {input}");
        }
    }

    #[test]
    fn test_strip_is_idempotent() {
        let rule = Rule::StripChars {
            chars: BAD_CHARS.to_owned(),
        };
        for input in ["c. 1970's", "(1988)", "C. 1990-1999", "plain"] {
            let once = run(&rule, input).unwrap();
            let twice = run(&rule, once.clone()).unwrap();
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn test_to_integer_strips_currency() {
        let rule = Rule::ToInteger {
            strip: "$,".to_owned(),
        };
        assert_eq!(run(&rule, "$5,000"), Ok(Value::Int(5000)));
        assert_eq!(run(&rule, Value::Float(12.0)), Ok(Value::Int(12)));
        assert!(run(&rule, "").is_err());
        assert!(run(&rule, "5,000km").is_err());
        assert!(run(&rule, Value::Float(1.5)).is_err());
    }

    #[test]
    fn test_to_float() {
        let rule = Rule::ToFloat {
            strip: String::new(),
        };
        assert_eq!(run(&rule, "2012"), Ok(Value::Float(2012.0)));
        assert_eq!(run(&rule, Value::Int(3)), Ok(Value::Float(3.0)));
        assert!(run(&rule, "NaN").is_err());
    }

    #[test]
    fn test_title_case_matches_word_boundaries() {
        assert_eq!(run(&Rule::TitleCase, "AMERICAN"), Ok(Value::from("American")));
        assert_eq!(
            run(&Rule::TitleCase, "gender unknown/other"),
            Ok(Value::from("Gender Unknown/Other"))
        );
        assert_eq!(run(&Rule::TitleCase, "o'keeffe"), Ok(Value::from("O'Keeffe")));
    }

    #[test]
    fn test_text_rules_reject_numbers() {
        assert_eq!(
            run(&Rule::Trim, Value::Int(3)),
            Err("expected text, found integer".to_owned())
        );
    }

    #[test]
    fn test_split_part_negative_index() {
        let rule = Rule::SplitPart {
            separator: "/".to_owned(),
            index: -1,
        };
        assert_eq!(run(&rule, "05/2012"), Ok(Value::from("2012")));
        assert_eq!(run(&rule, "2010"), Ok(Value::from("2010")));

        let rule = Rule::SplitPart {
            separator: "-".to_owned(),
            index: 0,
        };
        assert_eq!(
            run(&rule, "Resignation-Other reasons"),
            Ok(Value::from("Resignation"))
        );

        let rule = Rule::SplitPart {
            separator: "-".to_owned(),
            index: 3,
        };
        assert!(run(&rule, "a-b").is_err());
    }

    #[test]
    fn test_extract_number() {
        let rule = Rule::ExtractNumber {
            pattern: default_number_pattern(),
        };
        assert_eq!(run(&rule, "Less than 1 year"), Ok(Value::Float(1.0)));
        assert_eq!(run(&rule, "11-20"), Ok(Value::Float(11.0)));
        assert_eq!(run(&rule, Value::Float(7.0)), Ok(Value::Float(7.0)));
        assert!(run(&rule, "More than twenty").is_err());
    }

    #[test]
    fn test_map_values_with_default() {
        let rule = Rule::MapValues {
            mapping: BTreeMap::from([("-".to_owned(), Value::Bool(false))]),
            default: Some(Value::Bool(true)),
        };
        assert_eq!(run(&rule, "-"), Ok(Value::Bool(false)));
        assert_eq!(run(&rule, "Job Dissatisfaction"), Ok(Value::Bool(true)));
    }

    #[test]
    fn test_parse_date_extracts_hour() {
        let rule = Rule::ParseDate {
            format: "%m/%d/%Y %H:%M".to_owned(),
            output: Some("%H".to_owned()),
        };
        assert_eq!(run(&rule, "8/4/2016 11:52"), Ok(Value::from("11")));
        assert_eq!(run(&rule, "01/26/2016 08:05"), Ok(Value::from("08")));

        let err = run(&rule, "2016-08-04 11:52").unwrap_err();
        assert!(err.contains("does not match"), "{err}");
    }

    #[test]
    fn test_parse_date_defaults_to_iso() {
        let timestamp = Rule::ParseDate {
            format: "%Y-%m-%d %H:%M:%S".to_owned(),
            output: None,
        };
        assert_eq!(
            run(&timestamp, "2016-03-26 17:47:46"),
            Ok(Value::from("2016-03-26 17:47:46"))
        );

        let date = Rule::ParseDate {
            format: "%d/%m/%Y".to_owned(),
            output: None,
        };
        assert_eq!(run(&date, "26/03/2016"), Ok(Value::from("2016-03-26")));
        assert!(run(&date, "31/02/2016").is_err());
        assert!(run(&date, Value::Int(2016)).is_err());
    }

    #[test]
    fn test_bucket_service_length() {
        let rule = Rule::Bucket {
            buckets: vec![
                Bucket::new(None, "New"),
                Bucket::new(Some(3.0), "Experienced"),
                Bucket::new(Some(7.0), "Established"),
                Bucket::new(Some(11.0), "Veteran"),
            ],
        };
        assert_eq!(run(&rule, Value::Float(0.5)), Ok(Value::from("New")));
        assert_eq!(run(&rule, Value::Float(3.0)), Ok(Value::from("Experienced")));
        assert_eq!(run(&rule, Value::Int(10)), Ok(Value::from("Established")));
        assert_eq!(run(&rule, Value::Int(11)), Ok(Value::from("Veteran")));
        assert!(run(&rule, "11").is_err());
    }

    #[test]
    fn test_to_bool_default_words() {
        let rule: Rule = serde_json::from_str(r#"{"kind": "to_bool"}"#).unwrap();
        assert_eq!(run(&rule, "Yes"), Ok(Value::Bool(true)));
        assert_eq!(run(&rule, "0"), Ok(Value::Bool(false)));
        assert!(run(&rule, "maybe").is_err());
    }

    #[test]
    fn test_rule_json_roundtrip_keeps_pattern() {
        let json = r#"{"kind": "regex_replace", "pattern": "\\s+", "replacement": " "}"#;
        let rule: Rule = serde_json::from_str(json).unwrap();
        assert_eq!(run(&rule, "a   b"), Ok(Value::from("a b")));
        let back = serde_json::to_string(&rule).unwrap();
        assert!(back.contains(r#""pattern":"\\s+""#));

        let bad = serde_json::from_str::<Rule>(r#"{"kind": "regex_replace", "pattern": "(", "replacement": ""}"#);
        assert!(bad.is_err());
    }
}
