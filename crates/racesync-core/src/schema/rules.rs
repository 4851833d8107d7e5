//! Declarative field rules

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate};
use regex::Regex;
use serde_json::{Map, Value};

use super::FieldError;

static TIME_OF_DAY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([01]\d|2[0-3]):[0-5]\d$").expect("Invalid regex"));

static CHECKSUM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9a-fA-F]{64}$").expect("Invalid regex"));

/// Shape a field value must have
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Non-empty string
    Text,
    /// Any string, including empty
    FreeText,
    /// Number or non-empty string
    Identifier,
    PositiveInteger,
    NonNegativeInteger,
    /// One of a fixed set of strings
    Enumeration(&'static [&'static str]),
    /// `HH:MM`, 24-hour clock
    TimeOfDay,
    /// `YYYY-MM-DD`
    Date,
    /// RFC 3339 timestamp
    Timestamp,
    /// 64 hex characters
    Checksum,
    Array,
    Object,
    Any,
}

impl FieldKind {
    /// Error message when `value` does not have this shape
    pub fn check(self, value: &Value) -> Option<String> {
        let ok = match self {
            Self::Text => value.as_str().is_some_and(|text| !text.trim().is_empty()),
            Self::FreeText => value.is_string(),
            Self::Identifier => match value {
                Value::Number(_) => true,
                Value::String(text) => !text.trim().is_empty(),
                _ => false,
            },
            Self::PositiveInteger => value.as_u64().is_some_and(|number| number >= 1),
            Self::NonNegativeInteger => value.as_u64().is_some(),
            Self::Enumeration(allowed) => value.as_str().is_some_and(|text| allowed.contains(&text)),
            Self::TimeOfDay => value.as_str().is_some_and(|text| TIME_OF_DAY.is_match(text)),
            Self::Date => value
                .as_str()
                .is_some_and(|text| NaiveDate::parse_from_str(text, "%Y-%m-%d").is_ok()),
            Self::Timestamp => value
                .as_str()
                .is_some_and(|text| DateTime::parse_from_rfc3339(text).is_ok()),
            Self::Checksum => value.as_str().is_some_and(|text| CHECKSUM.is_match(text)),
            Self::Array => value.is_array(),
            Self::Object => value.is_object(),
            Self::Any => true,
        };

        if ok {
            None
        } else {
            Some(self.expectation())
        }
    }

    fn expectation(self) -> String {
        match self {
            Self::Text => "must be a non-empty string".to_string(),
            Self::FreeText => "must be a string".to_string(),
            Self::Identifier => "must be a number or non-empty string".to_string(),
            Self::PositiveInteger => "must be a positive integer".to_string(),
            Self::NonNegativeInteger => "must be a non-negative integer".to_string(),
            Self::Enumeration(allowed) => format!("must be one of {}", allowed.join(", ")),
            Self::TimeOfDay => "must be a time of day in HH:MM format".to_string(),
            Self::Date => "must be a date in YYYY-MM-DD format".to_string(),
            Self::Timestamp => "must be an ISO-8601 timestamp".to_string(),
            Self::Checksum => "must be exactly 64 hex characters".to_string(),
            Self::Array => "must be an array".to_string(),
            Self::Object => "must be an object".to_string(),
            Self::Any => String::new(),
        }
    }
}

/// Rule for one named field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldRule {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
}

impl FieldRule {
    pub const fn required(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            required: true,
        }
    }

    /// Optional fields may be absent or `null`
    pub const fn optional(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            required: false,
        }
    }
}

/// Cross-field check run once every field rule passes
pub type Refinement = fn(&Map<String, Value>) -> Vec<FieldError>;

/// Structural rules for one entity type
#[derive(Debug, Clone, Copy)]
pub struct EntitySchema {
    pub name: &'static str,
    pub fields: &'static [FieldRule],
    pub refine: Option<Refinement>,
}

impl EntitySchema {
    /// Every rule violation in `value`, with paths relative to the value
    pub fn check(&self, value: &Value) -> Vec<FieldError> {
        let Some(object) = value.as_object() else {
            return vec![FieldError::new("", format!("must be a {} object", self.name))];
        };

        let mut errors = Vec::new();
        for rule in self.fields {
            match object.get(rule.name) {
                None | Some(Value::Null) => {
                    if rule.required {
                        errors.push(FieldError::new(rule.name, "is required"));
                    }
                }
                Some(field) => {
                    if let Some(message) = rule.kind.check(field) {
                        errors.push(FieldError::new(rule.name, message));
                    }
                }
            }
        }

        if errors.is_empty() {
            if let Some(refine) = self.refine {
                errors.extend(refine(object));
            }
        }
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn time_of_day_requires_two_digit_24h_clock() {
        assert_eq!(FieldKind::TimeOfDay.check(&json!("07:05")), None);
        assert_eq!(FieldKind::TimeOfDay.check(&json!("23:59")), None);
        assert!(FieldKind::TimeOfDay.check(&json!("7:05")).is_some());
        assert!(FieldKind::TimeOfDay.check(&json!("24:00")).is_some());
        assert!(FieldKind::TimeOfDay.check(&json!("12:60")).is_some());
        assert!(FieldKind::TimeOfDay.check(&json!(1205)).is_some());
    }

    #[test]
    fn integers_reject_fractions_and_strings() {
        assert_eq!(FieldKind::PositiveInteger.check(&json!(3)), None);
        assert!(FieldKind::PositiveInteger.check(&json!(0)).is_some());
        assert!(FieldKind::PositiveInteger.check(&json!(-4)).is_some());
        assert!(FieldKind::PositiveInteger.check(&json!(2.5)).is_some());
        assert!(FieldKind::PositiveInteger.check(&json!("3")).is_some());
        assert_eq!(FieldKind::NonNegativeInteger.check(&json!(0)), None);
    }

    #[test]
    fn checksum_requires_exactly_64_hex_chars() {
        assert_eq!(FieldKind::Checksum.check(&json!("a".repeat(64))), None);
        assert!(FieldKind::Checksum.check(&json!("a".repeat(63))).is_some());
        assert!(FieldKind::Checksum.check(&json!("g".repeat(64))).is_some());
    }

    #[test]
    fn enumeration_message_lists_allowed_values() {
        let kind = FieldKind::Enumeration(&["pending", "completed"]);
        assert_eq!(kind.check(&json!("pending")), None);
        assert_eq!(
            kind.check(&json!("done")).as_deref(),
            Some("must be one of pending, completed")
        );
    }

    #[test]
    fn optional_fields_accept_null() {
        static SCHEMA: EntitySchema = EntitySchema {
            name: "sample",
            fields: &[
                FieldRule::required("id", FieldKind::PositiveInteger),
                FieldRule::optional("notes", FieldKind::FreeText),
            ],
            refine: None,
        };

        assert!(SCHEMA.check(&json!({"id": 1, "notes": null})).is_empty());
        let errors = SCHEMA.check(&json!({"notes": 4}));
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0], FieldError::new("id", "is required"));
        assert_eq!(errors[1], FieldError::new("notes", "must be a string"));
    }
}
