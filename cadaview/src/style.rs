//! Path styles for vector features.
//!
//! A layer carries one configured base style. Every other look a feature can
//! take (hover, search highlight, filter match, filter dimmed) is derived
//! from that base or is a fixed constant defined here.

use std::fmt;

/// How a feature outline and fill are painted.
#[derive(Debug, Clone, PartialEq)]
pub struct PathStyle {
    /// Outline color (CSS color string).
    pub color: String,
    /// Outline width in pixels.
    pub weight: f64,
    /// Outline opacity, 0.0 to 1.0.
    pub opacity: f64,
    /// Fill color (CSS color string).
    pub fill_color: String,
    /// Fill opacity, 0.0 to 1.0.
    pub fill_opacity: f64,
}

impl Default for PathStyle {
    fn default() -> Self {
        Self {
            color: "#3388ff".to_string(),
            weight: 2.0,
            opacity: 1.0,
            fill_color: "#3388ff".to_string(),
            fill_opacity: 0.2,
        }
    }
}

/// Outline width added while a feature is hovered.
pub const HOVER_WEIGHT_INCREASE: f64 = 2.0;

/// Fill opacity added while a feature is hovered.
pub const HOVER_FILL_OPACITY_INCREASE: f64 = 0.3;

/// Outline opacity of features matching an active filter.
pub const FILTER_MATCH_OPACITY: f64 = 0.9;
/// Fill opacity of features matching an active filter.
pub const FILTER_MATCH_FILL_OPACITY: f64 = 0.5;

/// Outline opacity of features excluded by an active filter.
pub const FILTER_DIMMED_OPACITY: f64 = 0.2;
/// Fill opacity of features excluded by an active filter.
pub const FILTER_DIMMED_FILL_OPACITY: f64 = 0.05;

impl PathStyle {
    /// Emphasised variant shown while the pointer is over a feature.
    pub fn hovered(&self) -> PathStyle {
        PathStyle {
            weight: self.weight + HOVER_WEIGHT_INCREASE,
            fill_opacity: (self.fill_opacity + HOVER_FILL_OPACITY_INCREASE).min(1.0),
            ..self.clone()
        }
    }

    /// Fixed style of the feature located by a search.
    pub fn highlight() -> PathStyle {
        PathStyle {
            color: "#ff0000".to_string(),
            weight: 4.0,
            opacity: 1.0,
            fill_color: "#ffff00".to_string(),
            fill_opacity: 0.6,
        }
    }

    /// Style of a feature that matches the active filter.
    pub fn filter_match(&self) -> PathStyle {
        PathStyle {
            opacity: FILTER_MATCH_OPACITY,
            fill_opacity: FILTER_MATCH_FILL_OPACITY,
            ..self.clone()
        }
    }

    /// Style of a feature that the active filter excludes.
    pub fn filter_dimmed(&self) -> PathStyle {
        PathStyle {
            opacity: FILTER_DIMMED_OPACITY,
            fill_opacity: FILTER_DIMMED_FILL_OPACITY,
            ..self.clone()
        }
    }

    /// Base style with the outline fully opaque; used when a filter is cleared.
    pub fn opaque(&self) -> PathStyle {
        PathStyle {
            opacity: 1.0,
            ..self.clone()
        }
    }
}

impl fmt::Display for PathStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "stroke {} {}px @{:.2}, fill {} @{:.2}",
            self.color, self.weight, self.opacity, self.fill_color, self.fill_opacity
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hovered_thickens_and_fills() {
        let base = PathStyle::default();
        let hover = base.hovered();
        assert_eq!(hover.weight, base.weight + 2.0);
        assert!((hover.fill_opacity - 0.5).abs() < 1e-9);
        assert_eq!(hover.color, base.color);
    }

    #[test]
    fn test_hovered_fill_opacity_is_capped() {
        let base = PathStyle {
            fill_opacity: 0.9,
            ..PathStyle::default()
        };
        assert_eq!(base.hovered().fill_opacity, 1.0);
    }

    #[test]
    fn test_filter_styles_keep_colors() {
        let base = PathStyle {
            color: "#123456".to_string(),
            ..PathStyle::default()
        };
        assert_eq!(base.filter_dimmed().color, "#123456");
        assert_eq!(base.filter_dimmed().opacity, FILTER_DIMMED_OPACITY);
        assert_eq!(base.filter_match().opacity, FILTER_MATCH_OPACITY);
    }

    #[test]
    fn test_opaque_restores_full_opacity() {
        let base = PathStyle {
            opacity: 0.4,
            ..PathStyle::default()
        };
        assert_eq!(base.opaque().opacity, 1.0);
        assert_eq!(base.opaque().fill_opacity, base.fill_opacity);
    }

    #[test]
    fn test_highlight_differs_from_default() {
        assert_ne!(PathStyle::highlight(), PathStyle::default());
    }
}
