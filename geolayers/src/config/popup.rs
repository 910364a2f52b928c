use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ConfigError;
use crate::value::PropertyValue;

/// Popup shown when a feature of the layer is clicked.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PopupConfig {
    /// Literal title, used when `title_field` is absent or resolves to an empty value.
    #[serde(default)]
    pub title: Option<String>,
    /// Property (or fallback list of properties) the title is read from.
    #[serde(default)]
    pub title_field: Option<FieldRef>,
    /// Rows of the popup, in display order.
    #[serde(default)]
    pub fields: Vec<PopupFieldSpec>,
}

impl PopupConfig {
    /// Checks that every row has a value source and sane limits.
    pub fn validate(&self, layer: &str) -> Result<(), ConfigError> {
        for (index, field) in self.fields.iter().enumerate() {
            if field.field.is_none() && field.template.is_none() && field.calculate_ha_from.is_none()
            {
                return Err(ConfigError::malformed(
                    layer,
                    format!("popup.fields[{index}] has neither field nor template"),
                ));
            }

            if let Some(FieldRef::Fallback(names)) = &field.field {
                if names.is_empty() {
                    return Err(ConfigError::malformed(
                        layer,
                        format!("popup.fields[{index}] has an empty field list"),
                    ));
                }
            }

            if field.truncate == Some(0) {
                return Err(ConfigError::malformed(
                    layer,
                    format!("popup.fields[{index}].truncate must be positive"),
                ));
            }
        }

        Ok(())
    }
}

/// Reference to a feature property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldRef {
    /// Single property name.
    Single(String),
    /// Property names tried in order; the first non-empty value wins.
    Fallback(Vec<String>),
}

impl FieldRef {
    /// Resolves the reference against feature properties.
    pub fn resolve(&self, properties: &Map<String, Value>) -> PropertyValue {
        match self {
            FieldRef::Single(name) => PropertyValue::get(properties, name),
            FieldRef::Fallback(names) => names
                .iter()
                .map(|name| PropertyValue::get(properties, name))
                .find(|value| !value.is_empty())
                .unwrap_or(PropertyValue::Null),
        }
    }

    /// Name of the first referenced property.
    pub fn primary(&self) -> Option<&str> {
        match self {
            FieldRef::Single(name) => Some(name),
            FieldRef::Fallback(names) => names.first().map(String::as_str),
        }
    }
}

/// How a popup row value is emitted.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderKind {
    /// Escaped text.
    #[default]
    #[serde(alias = "text")]
    Plain,
    /// Hyperlink with the value as target.
    #[serde(alias = "url", alias = "hyperlink")]
    Link,
}

/// One row of a feature popup.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PopupFieldSpec {
    /// Row label. Falls back to the property name.
    #[serde(default)]
    pub label: Option<String>,
    /// Property the value is read from.
    #[serde(default, alias = "fields")]
    pub field: Option<FieldRef>,
    /// Template with `{property}` placeholders. Takes precedence over `field`.
    #[serde(default)]
    pub template: Option<String>,
    /// Numeric format applied to numeric values.
    #[serde(default)]
    pub format: Option<NumberFormat>,
    /// Text used when the value is empty.
    #[serde(default)]
    pub default: Option<String>,
    /// Skip the row when the value is empty and no default is set.
    #[serde(default)]
    pub optional: bool,
    /// Maximum number of characters before the value is cut and an ellipsis appended.
    #[serde(default)]
    pub truncate: Option<usize>,
    /// Rendering kind.
    #[serde(default, rename = "type", alias = "render")]
    pub kind: RenderKind,
    /// Anchor text for links. The link target is shown when absent.
    #[serde(default)]
    pub link_text: Option<String>,
    /// Text shown for truthy values.
    #[serde(default, alias = "true_text")]
    pub active_text: Option<String>,
    /// Text shown for falsy values.
    #[serde(default, alias = "false_text")]
    pub inactive_text: Option<String>,
    /// Row is hidden when the value equals this literal.
    #[serde(default)]
    pub hide_if: Option<Value>,
    /// Areal property in square metres shown converted to hectares.
    #[serde(default)]
    pub calculate_ha_from: Option<String>,
}

impl PopupFieldSpec {
    /// Label of the row.
    pub fn label(&self) -> &str {
        if let Some(label) = &self.label {
            return label;
        }

        self.field
            .as_ref()
            .and_then(FieldRef::primary)
            .or(self.calculate_ha_from.as_deref())
            .unwrap_or_default()
    }
}

/// Number formatting of popup values.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "RawNumberFormat")]
pub struct NumberFormat {
    /// Digits after the decimal point.
    pub decimals: usize,
    /// Group thousands with `,`.
    pub thousands_separator: bool,
    /// Text before the number.
    pub prefix: String,
    /// Text after the number.
    pub suffix: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawNumberFormat {
    Named(NamedFormat),
    Custom {
        #[serde(default)]
        decimals: usize,
        #[serde(default)]
        thousands_separator: bool,
        #[serde(default)]
        prefix: String,
        #[serde(default)]
        suffix: String,
    },
}

#[derive(Deserialize)]
#[serde(rename_all = "lowercase")]
enum NamedFormat {
    Integer,
    Number,
    Decimal,
    Percent,
    Currency,
}

impl From<RawNumberFormat> for NumberFormat {
    fn from(value: RawNumberFormat) -> Self {
        match value {
            RawNumberFormat::Named(named) => named.into(),
            RawNumberFormat::Custom {
                decimals,
                thousands_separator,
                prefix,
                suffix,
            } => Self {
                decimals,
                thousands_separator,
                prefix,
                suffix,
            },
        }
    }
}

impl From<NamedFormat> for NumberFormat {
    fn from(value: NamedFormat) -> Self {
        let (decimals, thousands_separator, prefix, suffix) = match value {
            NamedFormat::Integer => (0, true, "", ""),
            NamedFormat::Number => (2, true, "", ""),
            NamedFormat::Decimal => (2, false, "", ""),
            NamedFormat::Percent => (1, false, "", "%"),
            NamedFormat::Currency => (2, true, "$", ""),
        };

        Self {
            decimals,
            thousands_separator,
            prefix: prefix.to_owned(),
            suffix: suffix.to_owned(),
        }
    }
}

impl NumberFormat {
    /// Formats `value`.
    pub fn apply(&self, value: f64) -> String {
        let formatted = format!("{:.*}", self.decimals, value.abs());
        let (integer, fraction) = match formatted.split_once('.') {
            Some((integer, fraction)) => (integer, Some(fraction)),
            None => (formatted.as_str(), None),
        };

        let mut result = String::with_capacity(formatted.len() + self.prefix.len() + 8);
        if value < 0.0 && formatted.chars().any(|c| c.is_ascii_digit() && c != '0') {
            result.push('-');
        }
        result.push_str(&self.prefix);

        if self.thousands_separator {
            for (index, digit) in integer.chars().enumerate() {
                if index > 0 && (integer.len() - index) % 3 == 0 {
                    result.push(',');
                }
                result.push(digit);
            }
        } else {
            result.push_str(integer);
        }

        if let Some(fraction) = fraction {
            result.push('.');
            result.push_str(fraction);
        }

        result.push_str(&self.suffix);
        result
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;

    fn format(value: Value) -> NumberFormat {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn named_formats() {
        assert_eq!(format(json!("integer")).apply(1234567.4), "1,234,567");
        assert_eq!(format(json!("number")).apply(1234.5), "1,234.50");
        assert_eq!(format(json!("decimal")).apply(1234.5), "1234.50");
        assert_eq!(format(json!("percent")).apply(42.24), "42.2%");
        assert_eq!(format(json!("currency")).apply(-1500.0), "-$1,500.00");
    }

    #[test]
    fn custom_format() {
        let format = format(json!({"decimals": 1, "suffix": " km", "thousands_separator": true}));
        assert_eq!(format.apply(12345.67), "12,345.7 km");
        assert_eq!(format.apply(-0.01), "0.0 km");
    }

    #[test]
    fn fallback_field_takes_first_non_empty() {
        let field: FieldRef = serde_json::from_value(json!(["name", "alt_name", "id"])).unwrap();
        let properties = json!({"name": "", "alt_name": "Curve Lake", "id": 3});
        let Value::Object(properties) = properties else {
            unreachable!()
        };

        assert_eq!(field.resolve(&properties), PropertyValue::from("Curve Lake"));
    }

    #[test]
    fn label_falls_back_to_field_name() {
        let spec: PopupFieldSpec = serde_json::from_value(json!({"field": "area"})).unwrap();
        assert_eq!(spec.label(), "area");
    }

    #[test]
    fn field_without_source_is_rejected() {
        let popup: PopupConfig =
            serde_json::from_value(json!({"fields": [{"label": "Nothing"}]})).unwrap();
        assert_matches!(popup.validate("fire"), Err(ConfigError::Malformed { .. }));
    }
}
