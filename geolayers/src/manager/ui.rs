use crate::config::LegendConfig;
use crate::popup::escape_html;

use super::LayerManager;

/// Category section of the layer panel.
#[derive(Debug, Clone, PartialEq)]
pub struct PanelGroup {
    /// Category id.
    pub id: String,
    /// Category display name.
    pub name: String,
    /// Layer entries in declaration order.
    pub layers: Vec<PanelEntry>,
}

/// Checkbox entry of a single layer.
#[derive(Debug, Clone, PartialEq)]
pub struct PanelEntry {
    /// Layer id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Checkbox state.
    pub checked: bool,
    /// Status note.
    pub status: Option<String>,
    /// Description.
    pub description: Option<String>,
    /// Legend, if configured.
    pub legend: Option<LegendConfig>,
    /// Whether the legend is shown initially.
    pub legend_visible: bool,
}

impl LayerManager {
    /// Builds the layer panel model: listed layers grouped by category, with checkbox state
    /// taken from the recorded visibility.
    pub fn generate_ui(&self) -> Vec<PanelGroup> {
        let registry = self.registry.read();
        registry
            .layers_by_category()
            .into_iter()
            .map(|group| PanelGroup {
                id: group.category.id.clone(),
                name: group.category.name.clone(),
                layers: group
                    .layers
                    .into_iter()
                    .map(|layer| {
                        let config = layer.config();
                        let checked = registry
                            .state(layer.id())
                            .is_some_and(|state| state.visible);
                        PanelEntry {
                            id: config.id.clone(),
                            name: config.name.clone(),
                            checked,
                            status: config.status.clone(),
                            description: config.description.clone(),
                            legend: config.legend.clone(),
                            legend_visible: checked && config.legend.is_some(),
                        }
                    })
                    .collect(),
            })
            .collect()
    }
}

/// Renders the panel model as HTML with one checkbox per layer.
pub fn render_panel_html(groups: &[PanelGroup]) -> String {
    let mut html = String::new();
    for group in groups {
        html.push_str(&format!(
            "<div class=\"layer-category\" data-category=\"{}\"><h4>{}</h4>",
            escape_html(&group.id),
            escape_html(&group.name)
        ));

        for entry in &group.layers {
            let id = escape_html(&entry.id);
            html.push_str(&format!(
                "<label class=\"layer-toggle\"><input type=\"checkbox\" data-layer=\"{id}\"{}> {}</label>",
                if entry.checked { " checked" } else { "" },
                escape_html(&entry.name)
            ));

            if let Some(status) = &entry.status {
                html.push_str(&format!(
                    "<span class=\"layer-status\">{}</span>",
                    escape_html(status)
                ));
            }

            if let Some(legend) = &entry.legend {
                render_legend(&mut html, &id, legend, entry.legend_visible);
            }
        }

        html.push_str("</div>");
    }

    html
}

fn render_legend(html: &mut String, id: &str, legend: &LegendConfig, visible: bool) {
    let style = if visible { "" } else { " style=\"display:none\"" };
    html.push_str(&format!("<div class=\"legend\" id=\"legend-{id}\"{style}>"));
    if let Some(title) = legend.title() {
        html.push_str(&format!("<div class=\"legend-title\">{}</div>", escape_html(title)));
    }

    match legend {
        LegendConfig::Gradient {
            min_label,
            max_label,
            ..
        } => {
            let gradient = legend.css_gradient().unwrap_or_default();
            html.push_str(&format!(
                "<div class=\"legend-gradient\" style=\"background: {gradient}\"></div>\
                 <div class=\"legend-labels\"><span>{}</span><span>{}</span></div>",
                escape_html(min_label.as_deref().unwrap_or_default()),
                escape_html(max_label.as_deref().unwrap_or_default())
            ));
        }
        LegendConfig::Itemized { items, .. } => {
            for item in items {
                html.push_str(&format!(
                    "<div class=\"legend-item\"><span class=\"legend-swatch\" style=\"background: {}\"></span>{}</div>",
                    item.color.to_css(),
                    escape_html(&item.label)
                ));
            }
        }
    }

    html.push_str("</div>");
}
