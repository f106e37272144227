//! Rendering context - the display conditions thumbnails are rasterized for.

use serde::{Deserialize, Serialize};

/// Light or dark display appearance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Appearance {
    /// Dark ink on a light page.
    #[default]
    Light,
    /// Light ink on a dark page.
    Dark,
}

impl std::str::FromStr for Appearance {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "light" => Ok(Self::Light),
            "dark" => Ok(Self::Dark),
            other => Err(format!("unknown appearance '{other}' (expected light or dark)")),
        }
    }
}

/// Describes the display a cached preview was rendered for.
///
/// Any change to the context invalidates every cached thumbnail.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RenderContext {
    /// Light or dark appearance.
    pub appearance: Appearance,
    /// Device pixels per logical point.
    pub pixel_density: f32,
}

impl RenderContext {
    /// Create a context.
    #[must_use]
    pub const fn new(appearance: Appearance, pixel_density: f32) -> Self {
        Self {
            appearance,
            pixel_density,
        }
    }

    /// Same density, different appearance.
    #[must_use]
    pub const fn with_appearance(self, appearance: Appearance) -> Self {
        Self {
            appearance,
            pixel_density: self.pixel_density,
        }
    }
}

impl Default for RenderContext {
    fn default() -> Self {
        Self::new(Appearance::Light, 2.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_appearance_from_str() {
        assert_eq!("Dark".parse::<Appearance>(), Ok(Appearance::Dark));
        assert_eq!("light".parse::<Appearance>(), Ok(Appearance::Light));
        assert!("sepia".parse::<Appearance>().is_err());
    }

    #[test]
    fn test_context_equality_tracks_appearance() {
        let light = RenderContext::default();
        let dark = light.with_appearance(Appearance::Dark);
        assert_ne!(light, dark);
        assert_eq!(dark.with_appearance(Appearance::Light), light);
    }
}
