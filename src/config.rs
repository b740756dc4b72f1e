use std::sync::OnceLock;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::classifier::is_eligible;
use crate::page::Rgba;

/// Theme manifest compiled into the crate. There is no runtime configuration
/// file; changing behavior means shipping a new build.
const BUILTIN_MANIFEST: &str = include_str!("../theme/mahsunkids.json");

static MANIFEST: OnceLock<ThemeManifest> = OnceLock::new();

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ThemeManifest {
    pub tenant: String,
    pub allowed_hosts: Vec<String>,
    pub header: HeaderConfig,
    pub overlay: OverlayConfig,
}

impl Default for ThemeManifest {
    fn default() -> Self {
        Self {
            tenant: "mahsunkids".into(),
            allowed_hosts: vec!["mahsunkids.com.br".into(), "www.mahsunkids.com.br".into()],
            header: HeaderConfig::default(),
            overlay: OverlayConfig::default(),
        }
    }
}

impl ThemeManifest {
    /// The manifest embedded at build time, parsed once per process.
    pub fn builtin() -> Result<&'static ThemeManifest> {
        if let Some(manifest) = MANIFEST.get() {
            return Ok(manifest);
        }
        let parsed =
            Self::from_json(BUILTIN_MANIFEST).context("built-in theme manifest is invalid")?;
        Ok(MANIFEST.get_or_init(|| parsed))
    }

    pub fn from_json(contents: &str) -> Result<Self> {
        let manifest: ThemeManifest =
            serde_json::from_str(contents).context("failed to parse theme manifest")?;
        manifest.validate()?;
        Ok(manifest)
    }

    pub fn validate(&self) -> Result<()> {
        if self.tenant.trim().is_empty() {
            bail!("theme manifest has no tenant");
        }
        self.header.validate()?;
        self.overlay.validate()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HeaderConfig {
    /// Master switch for the transparent treatment. When off the header is
    /// still pinned and kept solid.
    pub enabled: bool,
    pub restrict_to_eligible_pages: bool,
    pub eligible_paths: Vec<String>,
    /// Pixels of scroll after which the header turns solid.
    pub scroll_threshold: i64,
    pub solid_color: String,
    pub target_selector: String,
    /// Nested region mirrored with the header background, looked up inside
    /// the header.
    pub sub_bar_selector: String,
    /// Class present while the header is solid.
    pub scrolled_marker: String,
    pub stacking_order: i32,
    pub timing: TimingConfig,
    pub menu: MenuConfig,
}

impl Default for HeaderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            restrict_to_eligible_pages: true,
            eligible_paths: vec!["/mah-sun-kids".into(), "/teste".into(), "/home-nova".into()],
            scroll_threshold: 50,
            solid_color: "#ffffff".into(),
            target_selector: "#header-react-app".into(),
            sub_bar_selector: ".sub-bar".into(),
            scrolled_marker: "header-scrolled".into(),
            stacking_order: 999,
            timing: TimingConfig::default(),
            menu: MenuConfig::default(),
        }
    }
}

impl HeaderConfig {
    /// Whether the transparent treatment may apply on `path` at all.
    pub fn transparency_allowed(&self, path: &str) -> bool {
        if !self.enabled {
            return false;
        }
        !self.restrict_to_eligible_pages || is_eligible(path, &self.eligible_paths)
    }

    pub fn solid_rgba(&self) -> Result<Rgba> {
        Rgba::parse(&self.solid_color)
            .ok_or_else(|| anyhow!("solid color {:?} is not a color", self.solid_color))
    }

    pub fn validate(&self) -> Result<()> {
        let solid = self.solid_rgba()?;
        if solid.is_transparent() {
            bail!("solid color {:?} is transparent", self.solid_color);
        }
        if self.target_selector.trim().is_empty() {
            bail!("header target selector is empty");
        }
        if self.scrolled_marker.trim().is_empty() {
            bail!("scrolled marker class is empty");
        }
        self.timing.validate()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TimingConfig {
    pub poll_interval_ms: u64,
    pub trailing_recheck_ms: u64,
    pub mutation_recheck_ms: u64,
    pub bootstrap_attempts: u32,
    pub bootstrap_interval_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 100,
            trailing_recheck_ms: 150,
            mutation_recheck_ms: 10,
            bootstrap_attempts: 50,
            bootstrap_interval_ms: 100,
        }
    }
}

impl TimingConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn trailing_recheck(&self) -> Duration {
        Duration::from_millis(self.trailing_recheck_ms)
    }

    pub fn mutation_recheck(&self) -> Duration {
        Duration::from_millis(self.mutation_recheck_ms)
    }

    pub fn bootstrap_interval(&self) -> Duration {
        Duration::from_millis(self.bootstrap_interval_ms)
    }

    fn validate(&self) -> Result<()> {
        if self.poll_interval_ms == 0 {
            bail!("poll interval must be greater than zero");
        }
        if self.bootstrap_attempts == 0 {
            bail!("bootstrap needs at least one attempt");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MenuConfig {
    pub enabled: bool,
    pub item_selector: String,
    pub link_selector: String,
    pub container_selector: String,
    pub text_color: String,
    pub container_background: String,
    /// Theme utility classes that would otherwise recolor menu text.
    pub stripped_classes: Vec<String>,
    pub initial_delay_ms: u64,
    pub refresh_interval_ms: u64,
    pub hover_delay_ms: u64,
}

impl Default for MenuConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            item_selector: "#nav-root > li".into(),
            link_selector: ".container-menu a, .container-menu span.menu-text".into(),
            container_selector: ".container-menu".into(),
            text_color: "#333333".into(),
            container_background: "#ffffff".into(),
            stripped_classes: vec![
                "text-cor-texto".into(),
                "dark:text-secondary-50".into(),
                "dark:text-secondary-300".into(),
                "dark:hover:text-secondary-300".into(),
            ],
            initial_delay_ms: 500,
            refresh_interval_ms: 1000,
            hover_delay_ms: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OverlayConfig {
    pub enabled: bool,
    pub restrict_to_eligible_pages: bool,
    pub eligible_paths: Vec<String>,
    pub opacity: f32,
    /// `"r, g, b"` triple spliced into `rgba(..)`.
    pub color: String,
    pub banner_selector: String,
    pub slide_selector: String,
    pub overlay_class: String,
    pub initial_delay_ms: u64,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            restrict_to_eligible_pages: true,
            eligible_paths: vec![
                "/".into(),
                "/index.html".into(),
                "/mah-sun-kids".into(),
                "/teste".into(),
                "/home-nova".into(),
            ],
            opacity: 0.3,
            color: "0, 0, 0".into(),
            banner_selector: ".bt-section-banner".into(),
            slide_selector: ".bt-section-banner .swiper-slide".into(),
            overlay_class: "banner-overlay".into(),
            initial_delay_ms: 500,
        }
    }
}

impl OverlayConfig {
    pub fn applies_to(&self, path: &str) -> bool {
        if !self.enabled {
            return false;
        }
        !self.restrict_to_eligible_pages || is_eligible(path, &self.eligible_paths)
    }

    pub fn overlay_color(&self) -> String {
        format!("rgba({}, {})", self.color, self.opacity)
    }

    fn validate(&self) -> Result<()> {
        if Rgba::parse(&self.overlay_color()).is_none() {
            bail!("overlay color {:?} is not an rgb triple", self.color);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_manifest_matches_defaults() {
        let manifest = ThemeManifest::builtin().unwrap();
        let defaults = ThemeManifest::default();
        assert_eq!(manifest.tenant, defaults.tenant);
        assert_eq!(manifest.allowed_hosts, defaults.allowed_hosts);
        assert_eq!(manifest.header.eligible_paths, defaults.header.eligible_paths);
        assert_eq!(manifest.header.scroll_threshold, 50);
        assert_eq!(manifest.header.timing.poll_interval(), Duration::from_millis(100));
        assert_eq!(manifest.header.menu.stripped_classes.len(), 4);
        assert_eq!(manifest.overlay.eligible_paths, defaults.overlay.eligible_paths);
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let manifest =
            ThemeManifest::from_json(r#"{"tenant": "acme", "header": {"scrollThreshold": 80}}"#)
                .unwrap();
        assert_eq!(manifest.tenant, "acme");
        assert_eq!(manifest.header.scroll_threshold, 80);
        assert_eq!(manifest.header.solid_color, "#ffffff");
        assert_eq!(manifest.header.timing.bootstrap_attempts, 50);
    }

    #[test]
    fn rejects_unusable_colors() {
        assert!(ThemeManifest::from_json(r#"{"header": {"solidColor": "transparent"}}"#).is_err());
        assert!(ThemeManifest::from_json(r#"{"header": {"solidColor": "chartreuse"}}"#).is_err());
        assert!(ThemeManifest::from_json(r#"{"overlay": {"color": "0, 0"}}"#).is_err());
    }

    #[test]
    fn transparency_respects_switches() {
        let mut config = HeaderConfig::default();
        assert!(config.transparency_allowed("/teste/abc"));
        assert!(!config.transparency_allowed("/produtos"));

        config.restrict_to_eligible_pages = false;
        assert!(config.transparency_allowed("/produtos"));

        config.enabled = false;
        assert!(!config.transparency_allowed("/teste"));
    }

    #[test]
    fn overlay_color_is_rgba() {
        assert_eq!(OverlayConfig::default().overlay_color(), "rgba(0, 0, 0, 0.3)");
    }
}
