//! Attribute popup rendering.
//!
//! Produces the HTML shown when a feature is clicked or located by a search:
//! a two-column label/value table over the feature's attributes.

use std::fmt;
use std::str::FromStr;

use serde_json::{Map, Value};

/// Attributes whose key starts with this marker are internal and never shown.
pub const INTERNAL_KEY_PREFIX: char = '_';

/// Digit grouping and decimal conventions for numeric attribute values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NumberLocale {
    /// `1 234 567,5` (narrow no-break space, decimal comma)
    #[default]
    Fr,
    /// `1,234,567.5`
    En,
    /// `1.234.567,5`
    De,
}

impl NumberLocale {
    fn group_separator(&self) -> &'static str {
        match self {
            NumberLocale::Fr => "\u{202f}",
            NumberLocale::En => ",",
            NumberLocale::De => ".",
        }
    }

    fn decimal_separator(&self) -> &'static str {
        match self {
            NumberLocale::Fr | NumberLocale::De => ",",
            NumberLocale::En => ".",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NumberLocale::Fr => "fr",
            NumberLocale::En => "en",
            NumberLocale::De => "de",
        }
    }

    /// Formats a number with grouping, keeping at most three fraction digits.
    pub fn format_number(&self, n: f64) -> String {
        if !n.is_finite() {
            return n.to_string();
        }

        let rounded = format!("{:.3}", n.abs());
        let (int_part, frac_part) = rounded.split_once('.').unwrap_or((rounded.as_str(), ""));
        let frac_part = frac_part.trim_end_matches('0');

        let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3 * 3);
        for (i, digit) in int_part.chars().enumerate() {
            if i > 0 && (int_part.len() - i) % 3 == 0 {
                grouped.push_str(self.group_separator());
            }
            grouped.push(digit);
        }

        let negative = n < 0.0 && (int_part != "0" || !frac_part.is_empty());
        let mut out = String::new();
        if negative {
            out.push('-');
        }
        out.push_str(&grouped);
        if !frac_part.is_empty() {
            out.push_str(self.decimal_separator());
            out.push_str(frac_part);
        }
        out
    }
}

impl FromStr for NumberLocale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fr" | "fr-fr" => Ok(NumberLocale::Fr),
            "en" | "en-us" | "en-gb" => Ok(NumberLocale::En),
            "de" | "de-de" => Ok(NumberLocale::De),
            other => Err(format!("unsupported locale '{}'", other)),
        }
    }
}

impl fmt::Display for NumberLocale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Popup presentation options.
#[derive(Debug, Clone, PartialEq)]
pub struct PopupOptions {
    pub max_width: u32,
    pub class_name: String,
    pub locale: NumberLocale,
}

impl Default for PopupOptions {
    fn default() -> Self {
        Self {
            max_width: 300,
            class_name: "custom-popup".to_string(),
            locale: NumberLocale::default(),
        }
    }
}

/// One label/value row of a popup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopupRow {
    pub label: String,
    pub value: String,
}

/// Turns an attribute key into a display label: `num_lot` → `Num Lot`.
pub fn humanize_key(key: &str) -> String {
    key.split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Rows shown for a set of attributes, in attribute order.
///
/// Internal keys, nulls and empty strings are skipped.
pub fn popup_rows(properties: &Map<String, Value>, locale: NumberLocale) -> Vec<PopupRow> {
    properties
        .iter()
        .filter(|(key, _)| !key.starts_with(INTERNAL_KEY_PREFIX))
        .filter_map(|(key, value)| {
            let rendered = match value {
                Value::Null => return None,
                Value::String(s) if s.is_empty() => return None,
                Value::String(s) => s.clone(),
                Value::Number(n) => match n.as_f64() {
                    Some(f) => locale.format_number(f),
                    None => n.to_string(),
                },
                Value::Bool(b) => b.to_string(),
                other => other.to_string(),
            };
            Some(PopupRow {
                label: humanize_key(key),
                value: rendered,
            })
        })
        .collect()
}

/// Renders the popup HTML for a feature's attributes.
pub fn render_popup(properties: &Map<String, Value>, options: &PopupOptions) -> String {
    let mut html = format!(
        "<div class=\"{}\" style=\"max-width:{}px\"><table>",
        escape_html(&options.class_name),
        options.max_width
    );
    for row in popup_rows(properties, options.locale) {
        html.push_str("<tr><th>");
        html.push_str(&escape_html(&row.label));
        html.push_str("</th><td>");
        html.push_str(&escape_html(&row.value));
        html.push_str("</td></tr>");
    }
    html.push_str("</table></div>");
    html
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn props(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_popup_skips_internal_and_empty() {
        let attrs = props(json!({"num_lot": "12", "_internal": "x", "note": ""}));
        let html = render_popup(&attrs, &PopupOptions::default());

        assert!(html.contains("<tr><th>Num Lot</th><td>12</td></tr>"));
        assert!(!html.contains("Internal"));
        assert!(!html.contains("Note"));
    }

    #[test]
    fn test_popup_skips_null() {
        let rows = popup_rows(&props(json!({"owner": null, "area": 12})), NumberLocale::En);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].label, "Area");
    }

    #[test]
    fn test_popup_wraps_with_options() {
        let options = PopupOptions {
            max_width: 250,
            class_name: "lot-popup".to_string(),
            locale: NumberLocale::En,
        };
        let html = render_popup(&Map::new(), &options);
        assert_eq!(
            html,
            "<div class=\"lot-popup\" style=\"max-width:250px\"><table></table></div>"
        );
    }

    #[test]
    fn test_popup_escapes_values() {
        let rows = props(json!({"name": "<b>A & B</b>"}));
        let html = render_popup(&rows, &PopupOptions::default());
        assert!(html.contains("&lt;b&gt;A &amp; B&lt;/b&gt;"));
    }

    #[test]
    fn test_humanize_key() {
        assert_eq!(humanize_key("num_lot"), "Num Lot");
        assert_eq!(humanize_key("surface"), "Surface");
        assert_eq!(humanize_key("date__maj"), "Date Maj");
    }

    #[test]
    fn test_number_grouping_en() {
        assert_eq!(NumberLocale::En.format_number(1234567.0), "1,234,567");
        assert_eq!(NumberLocale::En.format_number(999.0), "999");
        assert_eq!(NumberLocale::En.format_number(-1234.5), "-1,234.5");
        assert_eq!(NumberLocale::En.format_number(0.125), "0.125");
    }

    #[test]
    fn test_number_grouping_fr_and_de() {
        assert_eq!(NumberLocale::Fr.format_number(1234.25), "1\u{202f}234,25");
        assert_eq!(NumberLocale::De.format_number(1234567.0), "1.234.567");
    }

    #[test]
    fn test_numeric_attribute_is_grouped() {
        let rows = popup_rows(&props(json!({"surface": 15230})), NumberLocale::En);
        assert_eq!(rows[0].value, "15,230");
    }

    #[test]
    fn test_locale_parse() {
        assert_eq!("FR".parse::<NumberLocale>(), Ok(NumberLocale::Fr));
        assert_eq!("en-US".parse::<NumberLocale>(), Ok(NumberLocale::En));
        assert!("xx".parse::<NumberLocale>().is_err());
    }
}
