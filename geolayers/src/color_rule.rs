//! Color rules map a property or pixel value to a [`Color`].
//!
//! Rules are decoded once, when a layer is activated, into the [`ColorRule`] union. Both
//! feature rendering (through [`ColorRule::to_expression`]) and raster colorization (through
//! [`ColorRule::resolve_number`]) work from the decoded rule, so a malformed rule is rejected
//! before any data is loaded.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer};
use serde_json::{json, Value};

use crate::error::ConfigError;
use crate::value::PropertyValue;
use crate::Color;

/// How a value is turned into a color.
#[derive(Debug, Clone, PartialEq)]
pub enum ColorRule {
    /// Fixed color.
    Literal(Color),
    /// Enumerated values of `field` mapped to colors.
    Categorical {
        /// Property the rule reads.
        field: String,
        /// Value (as text) to color pairs.
        values: Vec<(String, Color)>,
        /// Color of values not listed in `values`.
        default: Color,
    },
    /// Ordered equality tests on `field`. The first test that matches wins.
    Conditional {
        /// Property the rule reads.
        field: String,
        /// Tests in declaration order.
        conditions: Vec<Condition>,
        /// Color used when no test matches.
        default: Color,
    },
    /// Linear interpolation between numeric breakpoints of `field`.
    Interpolate {
        /// Property the rule reads.
        field: String,
        /// Breakpoints in ascending order.
        stops: Vec<(f64, Color)>,
    },
    /// Step function over ascending thresholds.
    ///
    /// Configuration calls this scale "continuous", but the colors are not blended: a value
    /// takes the color of the greatest threshold not exceeding it, and values below the first
    /// threshold take the first color.
    ContinuousSteps {
        /// Thresholds in ascending order.
        stops: Vec<(f64, Color)>,
    },
    /// Discrete class codes of a raster.
    CategoricalRaster {
        /// Classes in matching order: exact codes first, then ranges by their lower bound.
        classes: Vec<(RasterClass, Color)>,
        /// Color of values that belong to no class.
        default: Color,
    },
}

/// Single equality test of a [`ColorRule::Conditional`] rule.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Condition {
    /// Literal the property is compared with.
    #[serde(alias = "value")]
    pub equals: Value,
    /// Color used on match.
    pub color: Color,
}

/// Key of a [`ColorRule::CategoricalRaster`] rule.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum RasterClass {
    /// Single code, e.g. `"3"`.
    Exact(f64),
    /// Inclusive range, e.g. `"1-4"`.
    Range {
        /// Lower bound (inclusive).
        low: f64,
        /// Upper bound (inclusive).
        high: f64,
    },
}

impl RasterClass {
    /// Parses `"N"` or `"low-high"`. Negative bounds are allowed (`"-10--5"`).
    pub fn parse(key: &str) -> Option<Self> {
        let key = key.trim();
        if let Ok(value) = key.parse::<f64>() {
            return Some(Self::Exact(value));
        }

        let split = key.get(1..)?.find('-')? + 1;
        let low = key[..split].trim().parse::<f64>().ok()?;
        let high = key[split + 1..].trim().parse::<f64>().ok()?;
        if low > high {
            return None;
        }

        Some(Self::Range { low, high })
    }

    /// Returns true if `value` belongs to the class.
    pub fn contains(&self, value: f64) -> bool {
        match *self {
            RasterClass::Exact(code) => value == code,
            RasterClass::Range { low, high } => low <= value && value <= high,
        }
    }

    fn match_order(&self, other: &Self) -> std::cmp::Ordering {
        let key = |class: &Self| match *class {
            RasterClass::Exact(code) => (0u8, code),
            RasterClass::Range { low, .. } => (1u8, low),
        };
        let (a, b) = (key(self), key(other));
        a.0.cmp(&b.0).then(a.1.total_cmp(&b.1))
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawStop {
    Pair(f64, Color),
    Object { value: f64, color: Color },
}

impl From<RawStop> for (f64, Color) {
    fn from(value: RawStop) -> Self {
        match value {
            RawStop::Pair(v, c) => (v, c),
            RawStop::Object { value, color } => (value, color),
        }
    }
}

fn default_color() -> Color {
    Color::TRANSPARENT
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", deny_unknown_fields)]
enum TaggedRule {
    #[serde(alias = "match")]
    Categorical {
        field: String,
        values: BTreeMap<String, Color>,
        #[serde(default = "default_color")]
        default: Color,
    },
    #[serde(alias = "case")]
    Conditional {
        field: String,
        conditions: Vec<Condition>,
        #[serde(default = "default_color")]
        default: Color,
    },
    Interpolate {
        field: String,
        stops: Vec<RawStop>,
    },
    #[serde(alias = "continuous_steps", alias = "steps")]
    Continuous { stops: Vec<RawStop> },
    #[serde(alias = "categorical-raster")]
    CategoricalRaster {
        values: BTreeMap<String, Color>,
        #[serde(default = "default_color")]
        default: Color,
    },
}

impl ColorRule {
    /// Decodes a rule from its configuration form: a color string, or an object with a `type`
    /// tag.
    pub fn from_value(value: &Value) -> Result<Self, ConfigError> {
        if value.is_string() || value.is_array() {
            let color = Color::deserialize(value)
                .map_err(|err| ConfigError::InvalidColorRule(err.to_string()))?;
            return Ok(Self::Literal(color));
        }

        let tagged = TaggedRule::deserialize(value)
            .map_err(|err| ConfigError::InvalidColorRule(err.to_string()))?;

        let rule = match tagged {
            TaggedRule::Categorical {
                field,
                values,
                default,
            } => Self::Categorical {
                field,
                values: values.into_iter().collect(),
                default,
            },
            TaggedRule::Conditional {
                field,
                conditions,
                default,
            } => Self::Conditional {
                field,
                conditions,
                default,
            },
            TaggedRule::Interpolate { field, stops } => Self::Interpolate {
                field,
                stops: sorted_stops(stops)?,
            },
            TaggedRule::Continuous { stops } => Self::ContinuousSteps {
                stops: sorted_stops(stops)?,
            },
            TaggedRule::CategoricalRaster { values, default } => {
                let mut classes = values
                    .into_iter()
                    .map(|(key, color)| {
                        RasterClass::parse(&key)
                            .map(|class| (class, color))
                            .ok_or_else(|| {
                                ConfigError::InvalidColorRule(format!(
                                    "invalid raster class key {key:?}"
                                ))
                            })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                classes.sort_by(|(a, _), (b, _)| a.match_order(b));
                Self::CategoricalRaster { classes, default }
            }
        };

        Ok(rule)
    }

    /// Property the rule reads, if any.
    pub fn field(&self) -> Option<&str> {
        match self {
            ColorRule::Categorical { field, .. }
            | ColorRule::Conditional { field, .. }
            | ColorRule::Interpolate { field, .. } => Some(field),
            _ => None,
        }
    }

    /// Returns true for rules that only make sense for raster pixels.
    pub fn is_raster_rule(&self) -> bool {
        matches!(
            self,
            ColorRule::ContinuousSteps { .. } | ColorRule::CategoricalRaster { .. }
        )
    }

    /// Resolves the color of a single value.
    pub fn resolve(&self, value: &PropertyValue) -> Color {
        match self {
            ColorRule::Literal(color) => *color,
            ColorRule::Categorical {
                values, default, ..
            } => values
                .iter()
                .find(|(key, _)| value.eq_str(key))
                .map_or(*default, |(_, color)| *color),
            ColorRule::Conditional {
                conditions,
                default,
                ..
            } => conditions
                .iter()
                .find(|condition| value.eq_literal(&condition.equals))
                .map_or(*default, |condition| condition.color),
            ColorRule::Interpolate { stops, .. } => match value.as_f64() {
                Some(v) => interpolate(stops, v),
                None => stops.first().map_or(Color::TRANSPARENT, |(_, c)| *c),
            },
            ColorRule::ContinuousSteps { .. } | ColorRule::CategoricalRaster { .. } => value
                .as_f64()
                .map_or(Color::TRANSPARENT, |v| self.resolve_number(v)),
        }
    }

    /// Resolves the color of a numeric value. This is the per-pixel entry point used for
    /// rasters.
    pub fn resolve_number(&self, value: f64) -> Color {
        match self {
            ColorRule::Literal(color) => *color,
            ColorRule::Interpolate { stops, .. } => interpolate(stops, value),
            ColorRule::ContinuousSteps { stops } => step(stops, value),
            ColorRule::CategoricalRaster { classes, default } => classes
                .iter()
                .find(|(class, _)| class.contains(value))
                .map_or(*default, |(_, color)| *color),
            ColorRule::Categorical { .. } | ColorRule::Conditional { .. } => {
                self.resolve(&PropertyValue::Number(value))
            }
        }
    }

    /// Resolves the color of a feature by reading the rule's field from its properties.
    pub fn resolve_feature(&self, properties: &serde_json::Map<String, Value>) -> Color {
        match self.field() {
            Some(field) => self.resolve(&PropertyValue::get(properties, field)),
            None => self.resolve(&PropertyValue::Null),
        }
    }

    /// Converts the rule into a map engine paint expression.
    ///
    /// Raster-only rules have no expression form and return an error.
    pub fn to_expression(&self) -> Result<Value, ConfigError> {
        let expression = match self {
            ColorRule::Literal(color) => json!(color.to_css()),
            ColorRule::Categorical {
                field,
                values,
                default,
            } => {
                if values.is_empty() {
                    return Ok(json!(default.to_css()));
                }

                let mut expression = vec![json!("match"), json!(["to-string", ["get", field]])];
                for (key, color) in values {
                    expression.push(json!(key));
                    expression.push(json!(color.to_css()));
                }
                expression.push(json!(default.to_css()));
                Value::Array(expression)
            }
            ColorRule::Conditional {
                field,
                conditions,
                default,
            } => {
                if conditions.is_empty() {
                    return Ok(json!(default.to_css()));
                }

                let mut expression = vec![json!("case")];
                for condition in conditions {
                    expression.push(json!(["==", ["get", field], condition.equals]));
                    expression.push(json!(condition.color.to_css()));
                }
                expression.push(json!(default.to_css()));
                Value::Array(expression)
            }
            ColorRule::Interpolate { field, stops } => {
                if let [(_, only)] = stops.as_slice() {
                    return Ok(json!(only.to_css()));
                }

                let mut expression = vec![
                    json!("interpolate"),
                    json!(["linear"]),
                    json!(["to-number", ["get", field]]),
                ];
                for (value, color) in stops {
                    expression.push(json!(value));
                    expression.push(json!(color.to_css()));
                }
                Value::Array(expression)
            }
            ColorRule::ContinuousSteps { .. } | ColorRule::CategoricalRaster { .. } => {
                return Err(ConfigError::InvalidColorRule(
                    "raster color scales cannot be used for vector features".into(),
                ))
            }
        };

        Ok(expression)
    }
}

impl<'de> Deserialize<'de> for ColorRule {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(&value).map_err(serde::de::Error::custom)
    }
}

fn sorted_stops(stops: Vec<RawStop>) -> Result<Vec<(f64, Color)>, ConfigError> {
    if stops.is_empty() {
        return Err(ConfigError::InvalidColorRule(
            "color scale has no stops".into(),
        ));
    }

    let mut stops: Vec<(f64, Color)> = stops.into_iter().map(Into::into).collect();
    if stops.iter().any(|(value, _)| !value.is_finite()) {
        return Err(ConfigError::InvalidColorRule(
            "color scale stops must be finite numbers".into(),
        ));
    }

    stops.sort_by(|a, b| a.0.total_cmp(&b.0));
    Ok(stops)
}

fn step(stops: &[(f64, Color)], value: f64) -> Color {
    let Some((_, first)) = stops.first() else {
        return Color::TRANSPARENT;
    };

    stops
        .iter()
        .rev()
        .find(|(threshold, _)| *threshold <= value)
        .map_or(*first, |(_, color)| *color)
}

fn interpolate(stops: &[(f64, Color)], value: f64) -> Color {
    let (Some(first), Some(last)) = (stops.first(), stops.last()) else {
        return Color::TRANSPARENT;
    };

    if value <= first.0 {
        return first.1;
    }
    if value >= last.0 {
        return last.1;
    }

    for pair in stops.windows(2) {
        let (low, high) = (pair[0], pair[1]);
        if value >= low.0 && value <= high.0 {
            let span = high.0 - low.0;
            if span <= 0.0 {
                return high.1;
            }
            return low.1.lerp(high.1, (value - low.0) / span);
        }
    }

    last.1
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    const A: Color = Color::rgba(1, 1, 1, 255);
    const B: Color = Color::rgba(2, 2, 2, 255);
    const C: Color = Color::rgba(3, 3, 3, 255);

    fn rule(value: Value) -> ColorRule {
        ColorRule::from_value(&value).expect("valid rule")
    }

    #[test]
    fn categorical_raster_matches_codes_and_ranges() {
        let rule = rule(json!({
            "type": "categorical_raster",
            "values": {"0": [1, 1, 1, 255], "1-4": [2, 2, 2, 255]},
            "default": [3, 3, 3, 255],
        }));

        assert_eq!(rule.resolve_number(0.0), A);
        assert_eq!(rule.resolve_number(2.0), B);
        assert_eq!(rule.resolve_number(4.0), B);
        assert_eq!(rule.resolve_number(5.0), C);
    }

    #[test]
    fn continuous_scale_is_a_step_function() {
        let rule = rule(json!({
            "type": "continuous",
            "stops": [[150, [2, 2, 2, 255]], [75, [1, 1, 1, 255]], [300, [3, 3, 3, 255]]],
        }));

        assert_eq!(rule.resolve_number(10.0), A);
        assert_eq!(rule.resolve_number(75.0), A);
        assert_eq!(rule.resolve_number(150.0), B);
        assert_eq!(rule.resolve_number(299.0), B);
        assert_eq!(rule.resolve_number(300.0), C);
        assert_eq!(rule.resolve_number(10000.0), C);
    }

    #[test]
    fn interpolate_blends_between_breakpoints() {
        let rule = rule(json!({
            "type": "interpolate",
            "field": "density",
            "stops": [{"value": 0, "color": "#000000"}, {"value": 100, "color": "#FFFFFF"}],
        }));

        assert_eq!(rule.resolve_number(-5.0), Color::BLACK);
        assert_eq!(rule.resolve_number(50.0), Color::rgba(128, 128, 128, 255));
        assert_eq!(rule.resolve_number(500.0), Color::WHITE);
        assert_eq!(
            rule.resolve_feature(json!({"density": "100"}).as_object().unwrap()),
            Color::WHITE
        );
    }

    #[test]
    fn categorical_and_conditional_rules() {
        let categorical = rule(json!({
            "type": "categorical",
            "field": "status",
            "values": {"active": "#FF0000", "closed": "#0000FF"},
            "default": "#808080",
        }));
        let props = json!({"status": "closed"});
        assert_eq!(
            categorical.resolve_feature(props.as_object().unwrap()),
            Color::BLUE
        );
        assert_eq!(categorical.resolve(&"unknown".into()), Color::GRAY);

        let conditional = rule(json!({
            "type": "conditional",
            "field": "advisory",
            "conditions": [{"equals": "boil", "color": "#FF0000"}, {"equals": 2, "color": "#0000FF"}],
            "default": "#00FF00",
        }));
        assert_eq!(conditional.resolve(&"boil".into()), Color::RED);
        assert_eq!(conditional.resolve(&PropertyValue::Number(2.0)), Color::BLUE);
        assert_eq!(conditional.resolve(&PropertyValue::Null), Color::GREEN);
    }

    #[test]
    fn literal_rule_from_string() {
        assert_eq!(rule(json!("#ff0000")), ColorRule::Literal(Color::RED));
        assert_eq!(
            rule(json!("#ff0000")).resolve(&PropertyValue::Null),
            Color::RED
        );
    }

    #[test]
    fn expressions_for_vector_rules() {
        let categorical = rule(json!({
            "type": "categorical",
            "field": "kind",
            "values": {"a": "#FF0000"},
            "default": "#000000",
        }));
        assert_eq!(
            categorical.to_expression().unwrap(),
            json!(["match", ["to-string", ["get", "kind"]], "a", "#FF0000", "#000000"])
        );

        let interpolate = rule(json!({
            "type": "interpolate",
            "field": "pop",
            "stops": [[0, "#000000"], [10, "#FFFFFF"]],
        }));
        assert_eq!(
            interpolate.to_expression().unwrap(),
            json!(["interpolate", ["linear"], ["to-number", ["get", "pop"]], 0.0, "#000000", 10.0, "#FFFFFF"])
        );

        let raster = rule(json!({"type": "continuous", "stops": [[0, "#000000"]]}));
        assert!(raster.to_expression().is_err());
    }

    #[test]
    fn rejects_malformed_rules() {
        assert!(ColorRule::from_value(&json!("#zzzzzz")).is_err());
        assert!(ColorRule::from_value(&json!({"type": "continuous", "stops": []})).is_err());
        assert!(ColorRule::from_value(&json!({"type": "gradient"})).is_err());
        assert!(ColorRule::from_value(&json!({
            "type": "categorical_raster",
            "values": {"one-two": "#000000"},
        }))
        .is_err());
    }

    #[test]
    fn parses_raster_class_keys() {
        assert_eq!(RasterClass::parse("3"), Some(RasterClass::Exact(3.0)));
        assert_eq!(
            RasterClass::parse("1-4"),
            Some(RasterClass::Range { low: 1.0, high: 4.0 })
        );
        assert_eq!(
            RasterClass::parse("-10--5"),
            Some(RasterClass::Range {
                low: -10.0,
                high: -5.0
            })
        );
        assert_eq!(RasterClass::parse("-3"), Some(RasterClass::Exact(-3.0)));
        assert_eq!(RasterClass::parse("4-1"), None);
    }
}
