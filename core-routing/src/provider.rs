//! Provider registry: the fixed, ordered catalog of music providers.
//!
//! Every provider owns one or more link patterns. Patterns are matched as
//! case-insensitive substrings of a link, and the registry refuses to be built
//! when a pattern of one provider overlaps a pattern of another, so a link
//! resolves to at most one provider regardless of order.

use crate::error::{Result, RoutingError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Stable provider identifiers of the built-in catalog.
pub mod ids {
    pub const APPLE_MUSIC: &str = "apple_music";
    pub const SPOTIFY: &str = "spotify";
    pub const ANGHAMI: &str = "anghami";
    pub const YT_MUSIC: &str = "yt_music";
    pub const DEEZER: &str = "deezer";
}

/// One music provider and what is needed to recognise and open it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Stable id, also the persisted value of the chosen provider.
    pub id: String,
    pub display_name: String,
    /// Substrings recognising a link from this provider. The first one is the
    /// canonical match string.
    pub link_patterns: Vec<String>,
    /// Android package to target when redirecting.
    pub package_id: String,
    pub search_url_template: String,
}

impl ProviderConfig {
    pub fn new(
        id: impl Into<String>,
        display_name: impl Into<String>,
        link_patterns: &[&str],
        package_id: impl Into<String>,
        search_url_template: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            link_patterns: link_patterns.iter().map(|p| p.to_string()).collect(),
            package_id: package_id.into(),
            search_url_template: search_url_template.into(),
        }
    }

    /// The canonical link match string.
    pub fn primary_pattern(&self) -> Option<&str> {
        self.link_patterns.first().map(String::as_str)
    }

    /// Case-insensitive pattern match against an already lower-cased link.
    fn matches_lowercase(&self, link: &str) -> bool {
        self.link_patterns
            .iter()
            .any(|pattern| link.contains(&pattern.to_lowercase()))
    }
}

fn builtin_providers() -> Vec<ProviderConfig> {
    vec![
        ProviderConfig::new(
            ids::APPLE_MUSIC,
            "Apple Music",
            &["music.apple.com"],
            "com.apple.android.music",
            "https://music.apple.com/search?term=",
        ),
        ProviderConfig::new(
            ids::SPOTIFY,
            "Spotify",
            &["open.spotify.com", "spotify:"],
            "com.spotify.music",
            "spotify:search:",
        ),
        ProviderConfig::new(
            ids::ANGHAMI,
            "Anghami",
            &["anghami.com"],
            "com.anghami",
            "https://play.anghami.com/search/",
        ),
        ProviderConfig::new(
            ids::YT_MUSIC,
            "YT Music",
            &["music.youtube.com"],
            "com.google.android.apps.youtube.music",
            "https://music.youtube.com/search?q=",
        ),
        ProviderConfig::new(
            ids::DEEZER,
            "Deezer",
            &["deezer.com", "deezer.page.link"],
            "deezer.android.app",
            "https://www.deezer.com/search/",
        ),
    ]
}

/// Ordered, validated provider catalog.
#[derive(Debug, Clone)]
pub struct ProviderRegistry {
    providers: Vec<ProviderConfig>,
    index: HashMap<String, usize>,
}

impl ProviderRegistry {
    /// Builds a registry from `providers`, keeping their order.
    ///
    /// # Errors
    ///
    /// Returns [`RoutingError::InvalidRegistry`] when the list is empty, an id
    /// is blank or repeated, a provider has no usable pattern, or a pattern of
    /// one provider contains (or is contained in) a pattern of another.
    pub fn new(providers: Vec<ProviderConfig>) -> Result<Self> {
        if providers.is_empty() {
            return Err(RoutingError::InvalidRegistry(
                "registry must contain at least one provider".to_string(),
            ));
        }

        for provider in &providers {
            if provider.id.trim().is_empty() {
                return Err(RoutingError::InvalidRegistry(format!(
                    "provider '{}' has an empty id",
                    provider.display_name
                )));
            }
            if provider.link_patterns.is_empty()
                || provider.link_patterns.iter().any(|p| p.trim().is_empty())
            {
                return Err(RoutingError::InvalidRegistry(format!(
                    "provider '{}' needs at least one non-empty link pattern",
                    provider.id
                )));
            }
        }

        for (i, left) in providers.iter().enumerate() {
            for right in &providers[i + 1..] {
                if left.id == right.id {
                    return Err(RoutingError::InvalidRegistry(format!(
                        "duplicate provider id '{}'",
                        left.id
                    )));
                }
                if let Some((a, b)) = overlapping_patterns(left, right) {
                    return Err(RoutingError::InvalidRegistry(format!(
                        "pattern '{}' of '{}' overlaps pattern '{}' of '{}'",
                        a, left.id, b, right.id
                    )));
                }
            }
        }

        Ok(Self::from_validated(providers))
    }

    /// The built-in catalog: Apple Music, Spotify, Anghami, YT Music, Deezer.
    pub fn builtin() -> Self {
        Self::from_validated(builtin_providers())
    }

    fn from_validated(providers: Vec<ProviderConfig>) -> Self {
        let index = providers
            .iter()
            .enumerate()
            .map(|(position, provider)| (provider.id.clone(), position))
            .collect();
        Self { providers, index }
    }

    /// Finds the provider that produced `uri`, first match in registry order.
    pub fn resolve_provider(&self, uri: &str) -> Option<&ProviderConfig> {
        let link = uri.to_lowercase();
        self.providers
            .iter()
            .find(|provider| provider.matches_lowercase(&link))
    }

    pub fn lookup(&self, id: &str) -> Result<&ProviderConfig> {
        self.get(id)
            .ok_or_else(|| RoutingError::UnknownProvider(id.to_string()))
    }

    pub fn get(&self, id: &str) -> Option<&ProviderConfig> {
        self.index.get(id).map(|&position| &self.providers[position])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn providers(&self) -> &[ProviderConfig] {
        &self.providers
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.providers.iter().map(|p| p.id.as_str())
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Maps a persisted chosen-provider value to a registry id.
    ///
    /// Ids are returned as-is. With `accept_legacy` set, a value containing
    /// one of a provider's link patterns (older installs stored the link
    /// match string) maps to that provider. Anything else is returned
    /// unchanged, trimmed, so the engine can report it.
    pub fn normalize_provider_value(&self, raw: &str, accept_legacy: bool) -> String {
        let value = raw.trim();
        if value.is_empty() || self.contains(value) {
            return value.to_string();
        }

        if accept_legacy {
            if let Some(provider) = self.resolve_provider(value) {
                return provider.id.clone();
            }
        }

        value.to_string()
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

fn overlapping_patterns<'a>(
    left: &'a ProviderConfig,
    right: &'a ProviderConfig,
) -> Option<(&'a str, &'a str)> {
    for a in &left.link_patterns {
        let a_lower = a.to_lowercase();
        for b in &right.link_patterns {
            let b_lower = b.to_lowercase();
            if a_lower.contains(&b_lower) || b_lower.contains(&a_lower) {
                return Some((a.as_str(), b.as_str()));
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_passes_validation() {
        let registry = ProviderRegistry::new(builtin_providers()).unwrap();
        assert_eq!(registry.len(), 5);
    }

    #[test]
    fn test_builtin_order() {
        let registry = ProviderRegistry::builtin();
        let ids: Vec<&str> = registry.ids().collect();
        assert_eq!(
            ids,
            vec![
                ids::APPLE_MUSIC,
                ids::SPOTIFY,
                ids::ANGHAMI,
                ids::YT_MUSIC,
                ids::DEEZER
            ]
        );
    }

    #[test]
    fn test_resolve_provider() {
        let registry = ProviderRegistry::builtin();

        let cases = [
            ("https://music.apple.com/us/album/x/123", ids::APPLE_MUSIC),
            ("https://open.spotify.com/track/abc", ids::SPOTIFY),
            ("spotify:playlist:37i9dQZF1DX", ids::SPOTIFY),
            ("https://play.anghami.com/song/1", ids::ANGHAMI),
            ("https://music.youtube.com/watch?v=abc", ids::YT_MUSIC),
            ("https://www.deezer.com/fr/album/302127", ids::DEEZER),
            ("https://deezer.page.link/xyz", ids::DEEZER),
        ];

        for (link, expected) in cases {
            let provider = registry.resolve_provider(link).unwrap();
            assert_eq!(provider.id, expected, "link {}", link);
        }
    }

    #[test]
    fn test_resolve_is_case_insensitive() {
        let registry = ProviderRegistry::builtin();
        let provider = registry
            .resolve_provider("HTTPS://OPEN.SPOTIFY.COM/ALBUM/1")
            .unwrap();
        assert_eq!(provider.id, ids::SPOTIFY);
    }

    #[test]
    fn test_resolve_unknown_link() {
        let registry = ProviderRegistry::builtin();
        assert!(registry
            .resolve_provider("https://www.youtube.com/watch?v=abc")
            .is_none());
        assert!(registry.resolve_provider("").is_none());
    }

    #[test]
    fn test_lookup() {
        let registry = ProviderRegistry::builtin();

        let spotify = registry.lookup(ids::SPOTIFY).unwrap();
        assert_eq!(spotify.package_id, "com.spotify.music");
        assert_eq!(spotify.search_url_template, "spotify:search:");
        assert_eq!(spotify.primary_pattern(), Some("open.spotify.com"));

        assert!(matches!(
            registry.lookup("tidal"),
            Err(RoutingError::UnknownProvider(id)) if id == "tidal"
        ));
    }

    #[test]
    fn test_rejects_duplicate_ids() {
        let providers = vec![
            ProviderConfig::new("a", "A", &["a.example"], "pkg.a", "https://a/"),
            ProviderConfig::new("a", "A2", &["b.example"], "pkg.b", "https://b/"),
        ];
        assert!(matches!(
            ProviderRegistry::new(providers),
            Err(RoutingError::InvalidRegistry(_))
        ));
    }

    #[test]
    fn test_rejects_overlapping_patterns() {
        let providers = vec![
            ProviderConfig::new("yt", "YouTube", &["youtube.com"], "pkg.yt", "https://y/"),
            ProviderConfig::new(
                "ytm",
                "YT Music",
                &["music.youtube.com"],
                "pkg.ytm",
                "https://m/",
            ),
        ];
        let err = ProviderRegistry::new(providers).unwrap_err();
        assert!(err.to_string().contains("overlaps"));
    }

    #[test]
    fn test_rejects_empty_ids_and_patterns() {
        let blank_id = vec![ProviderConfig::new(" ", "X", &["x.example"], "pkg", "u")];
        assert!(ProviderRegistry::new(blank_id).is_err());

        let no_pattern = vec![ProviderConfig::new("x", "X", &[], "pkg", "u")];
        assert!(ProviderRegistry::new(no_pattern).is_err());

        assert!(ProviderRegistry::new(Vec::new()).is_err());
    }

    #[test]
    fn test_normalize_provider_value() {
        let registry = ProviderRegistry::builtin();

        assert_eq!(registry.normalize_provider_value("spotify", true), "spotify");
        assert_eq!(
            registry.normalize_provider_value("open.spotify.com", true),
            "spotify"
        );
        assert_eq!(
            registry.normalize_provider_value(" music.apple.com ", true),
            "apple_music"
        );
        assert_eq!(
            registry.normalize_provider_value("open.spotify.com", false),
            "open.spotify.com"
        );
        assert_eq!(registry.normalize_provider_value("tidal", true), "tidal");
        assert_eq!(registry.normalize_provider_value("", true), "");
    }
}
