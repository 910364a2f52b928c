//! Feature popups.
//!
//! [`format_popup`] turns the properties of a clicked feature into a [`Popup`] following the
//! layer's [`PopupConfig`]. Each row goes through the same steps in a fixed order: the value is
//! resolved (property, fallback list, template or hectare conversion), skip rules are checked,
//! then active/inactive text, numeric format, default, truncation and link wrapping are applied.
//! Escaping happens last, in [`Popup::to_html`].

use serde_json::{Map, Value};
use strfmt::DisplayStr;

use crate::config::{PopupConfig, PopupFieldSpec, RenderKind};
use crate::value::PropertyValue;

const SQUARE_METRES_PER_HECTARE: f64 = 10_000.0;
const ELLIPSIS: char = '…';

/// Formatted popup of a single feature.
#[derive(Debug, Clone, PartialEq)]
pub struct Popup {
    /// Popup heading.
    pub title: String,
    /// Rows in configuration order. Skipped fields are not present.
    pub rows: Vec<PopupRow>,
}

/// Labelled popup row.
#[derive(Debug, Clone, PartialEq)]
pub struct PopupRow {
    /// Row label.
    pub label: String,
    /// Row value.
    pub value: PopupValue,
}

/// Value of a popup row, not yet escaped.
#[derive(Debug, Clone, PartialEq)]
pub enum PopupValue {
    /// Plain text.
    Text(String),
    /// Hyperlink.
    Link {
        /// Link target.
        href: String,
        /// Anchor text.
        text: String,
    },
}

impl PopupValue {
    /// Text shown to the user.
    pub fn text(&self) -> &str {
        match self {
            PopupValue::Text(text) | PopupValue::Link { text, .. } => text,
        }
    }
}

enum Resolved {
    Property(PropertyValue),
    Derived(String),
}

impl Resolved {
    fn is_empty(&self) -> bool {
        match self {
            Resolved::Property(value) => value.is_empty(),
            Resolved::Derived(text) => text.trim().is_empty(),
        }
    }

    fn matches(&self, literal: &Value) -> bool {
        match self {
            Resolved::Property(value) => value.eq_literal(literal),
            Resolved::Derived(text) => match literal {
                Value::String(s) => s == text,
                _ => false,
            },
        }
    }
}

/// Builds the popup of a feature.
///
/// The title is read from `title_field` when it resolves to a non-empty value, then from the
/// literal `title`, and falls back to `layer_name`.
pub fn format_popup(config: &PopupConfig, layer_name: &str, properties: &Map<String, Value>) -> Popup {
    let title = config
        .title_field
        .as_ref()
        .map(|field| field.resolve(properties))
        .filter(|value| !value.is_empty())
        .map(|value| value.to_string())
        .or_else(|| config.title.clone())
        .unwrap_or_else(|| layer_name.to_owned());

    let rows = config
        .fields
        .iter()
        .filter_map(|spec| format_row(spec, properties))
        .collect();

    Popup { title, rows }
}

fn format_row(spec: &PopupFieldSpec, properties: &Map<String, Value>) -> Option<PopupRow> {
    let resolved = resolve(spec, properties);

    if let Some(hide_if) = &spec.hide_if {
        if resolved.matches(hide_if) {
            return None;
        }
    }

    let is_empty = resolved.is_empty();
    if is_empty && spec.optional && spec.default.is_none() {
        return None;
    }

    let mut text = match &resolved {
        Resolved::Derived(text) => text.clone(),
        Resolved::Property(value) => {
            let flag_text = if spec.active_text.is_some() || spec.inactive_text.is_some() {
                match (is_empty, value.is_truthy()) {
                    (true, _) => None,
                    (false, true) => spec.active_text.clone(),
                    (false, false) => spec.inactive_text.clone(),
                }
            } else {
                None
            };

            match (flag_text, &spec.format, value.as_f64()) {
                (Some(text), _, _) => text,
                (None, Some(format), Some(number)) => format.apply(number),
                _ => value.to_string(),
            }
        }
    };

    let mut is_default = false;
    if text.trim().is_empty() {
        text = spec.default.clone().unwrap_or_default();
        is_default = true;
    }

    let full_text = text.clone();
    if let Some(limit) = spec.truncate {
        if text.chars().count() > limit {
            text = text.chars().take(limit).collect();
            text.push(ELLIPSIS);
        }
    }

    let value = match spec.kind {
        RenderKind::Link if !is_default && !text.is_empty() && is_safe_link(&full_text) => {
            PopupValue::Link {
                href: full_text,
                text: spec.link_text.clone().unwrap_or(text),
            }
        }
        RenderKind::Link if !is_default && !text.is_empty() => {
            log::debug!("Not linking {full_text:?}: unsupported scheme");
            PopupValue::Text(text)
        }
        _ => PopupValue::Text(text),
    };

    Some(PopupRow {
        label: spec.label().to_owned(),
        value,
    })
}

/// Only web and mail links are rendered as anchors. Relative links resolve against the page.
fn is_safe_link(href: &str) -> bool {
    match url::Url::parse(href) {
        Ok(url) => matches!(url.scheme(), "http" | "https" | "mailto"),
        Err(url::ParseError::RelativeUrlWithoutBase) => true,
        Err(_) => false,
    }
}

fn resolve(spec: &PopupFieldSpec, properties: &Map<String, Value>) -> Resolved {
    if let Some(area_field) = &spec.calculate_ha_from {
        let area = PropertyValue::get(properties, area_field).as_f64();
        return match area {
            Some(area) => {
                let hectares = area / SQUARE_METRES_PER_HECTARE;
                let number = match &spec.format {
                    Some(format) => format.apply(hectares),
                    None => format!("{hectares:.2}"),
                };
                Resolved::Derived(format!("{number} ha"))
            }
            None => Resolved::Property(PropertyValue::Null),
        };
    }

    if let Some(template) = &spec.template {
        return Resolved::Derived(render_template(template, properties));
    }

    match &spec.field {
        Some(field) => Resolved::Property(field.resolve(properties)),
        None => Resolved::Property(PropertyValue::Null),
    }
}

/// Substitutes `{property}` placeholders. Missing properties render as empty text.
pub fn render_template(template: &str, properties: &Map<String, Value>) -> String {
    let result = strfmt::strfmt_map(template, |mut fmt: strfmt::Formatter| {
        PropertyValue::get(properties, fmt.key).display_str(&mut fmt)
    });

    match result {
        Ok(text) => text,
        Err(err) => {
            log::warn!("Invalid popup template {template:?}: {err}");
            template.to_owned()
        }
    }
}

/// Escapes text for insertion into HTML content or a quoted attribute.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }

    escaped
}

impl Popup {
    /// Renders the popup as an HTML fragment. All text is escaped.
    pub fn to_html(&self) -> String {
        let mut html = String::from("<div class=\"popup-content\">");
        html.push_str(&format!("<h3>{}</h3>", escape_html(&self.title)));

        for row in &self.rows {
            let value = match &row.value {
                PopupValue::Text(text) => escape_html(text),
                PopupValue::Link { href, text } => format!(
                    "<a href=\"{}\" target=\"_blank\" rel=\"noopener noreferrer\">{}</a>",
                    escape_html(href),
                    escape_html(text)
                ),
            };

            html.push_str(&format!(
                "<p><strong>{}:</strong> {value}</p>",
                escape_html(&row.label)
            ));
        }

        html.push_str("</div>");
        html
    }
}
