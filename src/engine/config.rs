// src/engine/config.rs
//
// Platform capabilities and engine configuration.
// Capabilities are probed once at startup and passed explicitly into the
// components that need them; nothing here is lazily initialized global state.

use bitflags::bitflags;
use std::time::Duration;

bitflags! {
    /// What the hosting platform can do.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct Capabilities: u32 {
        /// The accelerated (SIMD, off-thread capable) drawing surface may be used.
        const ACCELERATED_SURFACE = 1 << 0;
        /// Mobile/touch form factor: smaller batches, longer yields, share-first saves.
        const MOBILE = 1 << 1;
        /// The platform can hand files to a native share sheet.
        const SHARE_FILES = 1 << 2;
    }
}

/// User-agent tokens that mark a mobile form factor.
const MOBILE_UA_TOKENS: &[&str] = &[
    "android",
    "webos",
    "iphone",
    "ipad",
    "ipod",
    "blackberry",
    "iemobile",
    "opera mini",
    "mobile",
];

impl Capabilities {
    /// Desktop defaults: accelerated surface, no mobile, no share sheet.
    pub fn desktop() -> Self {
        Capabilities::ACCELERATED_SURFACE
    }

    /// Derive capabilities from a user-agent string.
    pub fn from_user_agent(user_agent: &str) -> Self {
        let ua = user_agent.to_lowercase();
        let mut caps = Capabilities::ACCELERATED_SURFACE;
        if MOBILE_UA_TOKENS.iter().any(|token| ua.contains(token)) {
            caps |= Capabilities::MOBILE;
        }
        caps
    }

    pub fn is_mobile(&self) -> bool {
        self.contains(Capabilities::MOBILE)
    }

    pub fn can_share_files(&self) -> bool {
        self.contains(Capabilities::SHARE_FILES)
    }

    pub fn accelerated_surface(&self) -> bool {
        self.contains(Capabilities::ACCELERATED_SURFACE)
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::desktop()
    }
}

/// Default spacing between consecutive saves in a batch download.
/// Empirical throttle against download-manager limits; tunable.
pub const DEFAULT_DOWNLOAD_DELAY: Duration = Duration::from_millis(400);
/// Longest edge of a low-fidelity resize preview.
pub const DEFAULT_PREVIEW_MAX_EDGE: u32 = 800;
/// Encoder quality for resize output.
pub const DEFAULT_RESIZE_QUALITY: f32 = 0.95;

/// Engine configuration, resolved once and passed explicitly.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    pub capabilities: Capabilities,
    pub download_delay: Duration,
    pub preview_max_edge: u32,
    pub resize_quality: f32,
    /// Losslessly recompress full-quality PNG output.
    pub optimize_png: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            capabilities: Capabilities::default(),
            download_delay: DEFAULT_DOWNLOAD_DELAY,
            preview_max_edge: DEFAULT_PREVIEW_MAX_EDGE,
            resize_quality: DEFAULT_RESIZE_QUALITY,
            optimize_png: true,
        }
    }
}

impl EngineConfig {
    pub fn with_capabilities(capabilities: Capabilities) -> Self {
        Self {
            capabilities,
            ..Self::default()
        }
    }

    /// Resolve configuration from the process environment.
    ///
    /// Recognized variables: `GRIDCUT_USER_AGENT`, `GRIDCUT_MOBILE`,
    /// `GRIDCUT_DISABLE_ACCELERATED`, `GRIDCUT_SHARE_FILES`,
    /// `GRIDCUT_DOWNLOAD_DELAY_MS`, `GRIDCUT_PREVIEW_MAX_EDGE`.
    /// Unparsable values fall back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(ua) = lookup("GRIDCUT_USER_AGENT") {
            config.capabilities = Capabilities::from_user_agent(&ua);
        }
        if let Some(mobile) = lookup("GRIDCUT_MOBILE").and_then(|v| parse_flag(&v)) {
            config.capabilities.set(Capabilities::MOBILE, mobile);
        }
        if let Some(disable) = lookup("GRIDCUT_DISABLE_ACCELERATED").and_then(|v| parse_flag(&v)) {
            config
                .capabilities
                .set(Capabilities::ACCELERATED_SURFACE, !disable);
        }
        if let Some(share) = lookup("GRIDCUT_SHARE_FILES").and_then(|v| parse_flag(&v)) {
            config.capabilities.set(Capabilities::SHARE_FILES, share);
        }
        if let Some(ms) = lookup("GRIDCUT_DOWNLOAD_DELAY_MS").and_then(|v| v.trim().parse().ok()) {
            config.download_delay = Duration::from_millis(ms);
        }
        if let Some(edge) = lookup("GRIDCUT_PREVIEW_MAX_EDGE")
            .and_then(|v| v.trim().parse::<u32>().ok())
            .filter(|&edge| edge > 0)
        {
            config.preview_max_edge = edge;
        }

        tracing::debug!(
            capabilities = ?config.capabilities,
            download_delay_ms = config.download_delay.as_millis() as u64,
            preview_max_edge = config.preview_max_edge,
            "resolved engine config"
        );
        config
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn user_agent_detection() {
        let iphone = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) AppleWebKit/605.1.15";
        assert!(Capabilities::from_user_agent(iphone).is_mobile());
        let desktop = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 Chrome/120.0";
        assert!(!Capabilities::from_user_agent(desktop).is_mobile());
        assert!(Capabilities::from_user_agent(desktop).accelerated_surface());
    }

    #[test]
    fn defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.download_delay, Duration::from_millis(400));
        assert_eq!(config.preview_max_edge, 800);
        assert_eq!(config.resize_quality, 0.95);
        assert!(!config.capabilities.is_mobile());
    }

    #[test]
    fn env_overrides() {
        let config = EngineConfig::from_lookup(lookup_from(&[
            ("GRIDCUT_MOBILE", "1"),
            ("GRIDCUT_DISABLE_ACCELERATED", "true"),
            ("GRIDCUT_SHARE_FILES", "yes"),
            ("GRIDCUT_DOWNLOAD_DELAY_MS", "0"),
            ("GRIDCUT_PREVIEW_MAX_EDGE", "640"),
        ]));
        assert!(config.capabilities.is_mobile());
        assert!(!config.capabilities.accelerated_surface());
        assert!(config.capabilities.can_share_files());
        assert_eq!(config.download_delay, Duration::ZERO);
        assert_eq!(config.preview_max_edge, 640);
    }

    #[test]
    fn unparsable_env_values_keep_defaults() {
        let config = EngineConfig::from_lookup(lookup_from(&[
            ("GRIDCUT_MOBILE", "maybe"),
            ("GRIDCUT_DOWNLOAD_DELAY_MS", "soon"),
            ("GRIDCUT_PREVIEW_MAX_EDGE", "0"),
        ]));
        assert!(!config.capabilities.is_mobile());
        assert_eq!(config.download_delay, DEFAULT_DOWNLOAD_DELAY);
        assert_eq!(config.preview_max_edge, DEFAULT_PREVIEW_MAX_EDGE);
    }
}
