use serde::{Deserialize, Serialize};

use crate::Color;

/// Legend shown in the layer panel while the layer is visible.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LegendConfig {
    /// Continuous color ramp with labels at both ends.
    Gradient {
        /// Legend heading.
        #[serde(default)]
        title: Option<String>,
        /// Ramp colors from minimum to maximum.
        colors: Vec<Color>,
        /// Label of the low end.
        #[serde(default)]
        min_label: Option<String>,
        /// Label of the high end.
        #[serde(default)]
        max_label: Option<String>,
    },
    /// List of swatches.
    #[serde(alias = "items", alias = "categorical")]
    Itemized {
        /// Legend heading.
        #[serde(default)]
        title: Option<String>,
        /// Swatches in display order.
        items: Vec<LegendItem>,
    },
}

/// Single legend swatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegendItem {
    /// Swatch color.
    pub color: Color,
    /// Swatch label.
    pub label: String,
}

impl LegendConfig {
    /// Legend heading.
    pub fn title(&self) -> Option<&str> {
        match self {
            LegendConfig::Gradient { title, .. } | LegendConfig::Itemized { title, .. } => {
                title.as_deref()
            }
        }
    }

    /// CSS `linear-gradient` for gradient legends.
    pub fn css_gradient(&self) -> Option<String> {
        let LegendConfig::Gradient { colors, .. } = self else {
            return None;
        };

        let stops: Vec<String> = colors.iter().map(Color::to_css).collect();
        Some(format!("linear-gradient(to right, {})", stops.join(", ")))
    }
}
