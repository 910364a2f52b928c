//! Typed view of feature property values.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use strfmt::DisplayStr;

/// Value of a feature property as read from GeoJSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    /// JSON `null` or a missing property.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Any JSON number.
    Number(f64),
    /// Text value.
    String(String),
    /// Arrays and objects, kept as their JSON text.
    Other(serde_json::Value),
}

impl Display for PropertyValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            PropertyValue::Null => Ok(()),
            PropertyValue::Bool(v) => write!(f, "{v}"),
            PropertyValue::Number(v) => write!(f, "{v}"),
            PropertyValue::String(v) => write!(f, "{v}"),
            PropertyValue::Other(v) => write!(f, "{v}"),
        }
    }
}

impl DisplayStr for PropertyValue {
    fn display_str(&self, f: &mut strfmt::Formatter) -> strfmt::Result<()> {
        f.str(&self.to_string())?;
        Ok(())
    }
}

impl From<&serde_json::Value> for PropertyValue {
    fn from(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(v) => Self::Bool(*v),
            serde_json::Value::Number(n) => n.as_f64().map_or(Self::Null, Self::Number),
            serde_json::Value::String(s) => Self::String(s.clone()),
            other => Self::Other(other.clone()),
        }
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl PropertyValue {
    /// Reads property `name` from a GeoJSON properties object. Missing properties are `Null`.
    pub fn get(properties: &serde_json::Map<String, serde_json::Value>, name: &str) -> Self {
        properties.get(name).map(Self::from).unwrap_or(Self::Null)
    }

    /// Returns true for `null`, missing values and strings that are empty or whitespace.
    pub fn is_empty(&self) -> bool {
        match self {
            PropertyValue::Null => true,
            PropertyValue::String(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Numeric value, parsing strings when they hold a number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PropertyValue::Number(v) => Some(*v),
            PropertyValue::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Interprets the value as a flag: `true`, non-zero numbers and the strings `true`, `yes`,
    /// `y` and `1` are truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            PropertyValue::Bool(v) => *v,
            PropertyValue::Number(v) => *v != 0.0,
            PropertyValue::String(s) => matches!(
                s.trim().to_ascii_lowercase().as_str(),
                "true" | "yes" | "y" | "1"
            ),
            _ => false,
        }
    }

    /// Compares the value with a configuration literal.
    pub fn eq_literal(&self, literal: &serde_json::Value) -> bool {
        match (self, literal) {
            (PropertyValue::Null, serde_json::Value::Null) => true,
            (PropertyValue::Bool(a), serde_json::Value::Bool(b)) => a == b,
            (value, serde_json::Value::Number(n)) => value.as_f64() == n.as_f64(),
            (value, serde_json::Value::String(s)) => value.eq_str(s),
            _ => false,
        }
    }

    /// Compares the value with a string, converting the string to the value's type.
    pub fn eq_str(&self, str_value: &str) -> bool {
        match &self {
            PropertyValue::String(s) => s == str_value,
            PropertyValue::Number(v) => str_value.trim().parse::<f64>() == Ok(*v),
            PropertyValue::Bool(v) => str_value.parse::<bool>() == Ok(*v),
            PropertyValue::Null => str_value.is_empty(),
            PropertyValue::Other(v) => v.to_string() == str_value,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn reads_missing_as_null() {
        let props = json!({"name": "Alderville", "population": 1200});
        let props = props.as_object().unwrap();

        assert_eq!(PropertyValue::get(props, "name"), PropertyValue::from("Alderville"));
        assert_eq!(PropertyValue::get(props, "population"), PropertyValue::Number(1200.0));
        assert_eq!(PropertyValue::get(props, "missing"), PropertyValue::Null);
        assert!(PropertyValue::get(props, "missing").is_empty());
    }

    #[test]
    fn literal_comparison_crosses_types() {
        assert!(PropertyValue::String("3".into()).eq_literal(&json!(3)));
        assert!(PropertyValue::Number(3.0).eq_literal(&json!("3")));
        assert!(PropertyValue::Bool(true).eq_literal(&json!(true)));
        assert!(!PropertyValue::String("yes".into()).eq_literal(&json!("no")));
    }

    #[test]
    fn displays_integers_without_fraction() {
        assert_eq!(PropertyValue::Number(2024.0).to_string(), "2024");
        assert_eq!(PropertyValue::Number(1.5).to_string(), "1.5");
        assert_eq!(PropertyValue::Null.to_string(), "");
    }

    #[test]
    fn truthiness() {
        assert!(PropertyValue::String("Yes".into()).is_truthy());
        assert!(PropertyValue::Number(1.0).is_truthy());
        assert!(!PropertyValue::String("no".into()).is_truthy());
        assert!(!PropertyValue::Null.is_truthy());
    }
}
