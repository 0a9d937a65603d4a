//! Link classification.
//!
//! Only the *kind* of a link is derived here; nothing is fetched and no
//! provider-specific identifier is resolved.

use serde::{Deserialize, Serialize};
use std::fmt;
use url::{ParseError, Url};

/// What a link points at, as far as redirect toggles are concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkKind {
    Playlist,
    Album,
    Other,
}

impl LinkKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkKind::Playlist => "playlist",
            LinkKind::Album => "album",
            LinkKind::Other => "other",
        }
    }
}

impl fmt::Display for LinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// YT Music serves albums as auto-generated playlists with this list prefix.
const ALBUM_LIST_PREFIX: &str = "OLAK5uy_";
/// YT Music album browse ids.
const ALBUM_BROWSE_PREFIX: &str = "mpreb_";

/// Classifies `uri`. Never fails: anything unrecognised is [`LinkKind::Other`].
pub fn classify(uri: &str) -> LinkKind {
    match ParsedLink::parse(uri) {
        Some(link) => link.kind(),
        None => LinkKind::Other,
    }
}

/// Lower-cased path tokens plus raw query pairs.
struct ParsedLink {
    tokens: Vec<String>,
    query: Vec<(String, String)>,
}

impl ParsedLink {
    fn parse(uri: &str) -> Option<Self> {
        let trimmed = uri.trim();
        if trimmed.is_empty() {
            return None;
        }

        let url = match Url::parse(trimmed) {
            Ok(url) => url,
            // Shared links are often pasted without a scheme.
            Err(ParseError::RelativeUrlWithoutBase) => {
                Url::parse(&format!("https://{}", trimmed)).ok()?
            }
            Err(_) => return None,
        };

        let tokens = if url.cannot_be_a_base() {
            // Opaque URIs such as `spotify:album:4aawyAB9vmqN3uQ7FjRGTy`
            let path = url.path();
            path.split(':')
                .filter(|part| !part.is_empty())
                .map(str::to_lowercase)
                .collect()
        } else {
            url.path_segments()
                .map(|segments| {
                    segments
                        .filter(|segment| !segment.is_empty())
                        .map(str::to_lowercase)
                        .collect()
                })
                .unwrap_or_default()
        };

        let query = url
            .query_pairs()
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();

        Some(Self { tokens, query })
    }

    fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    fn has_token(&self, candidates: &[&str]) -> bool {
        self.tokens
            .iter()
            .any(|token| candidates.contains(&token.as_str()))
    }

    fn kind(&self) -> LinkKind {
        if self
            .query_value("list")
            .is_some_and(|list| list.starts_with(ALBUM_LIST_PREFIX))
        {
            return LinkKind::Album;
        }

        if self
            .tokens
            .windows(2)
            .any(|pair| pair[0] == "browse" && pair[1].starts_with(ALBUM_BROWSE_PREFIX))
        {
            return LinkKind::Album;
        }

        if self.has_token(&["playlist", "playlists"]) {
            return LinkKind::Playlist;
        }

        if self.has_token(&["album", "albums"]) {
            // Apple Music shares a single song as an album link with `?i=<track>`.
            if self.query_value("i").is_some() {
                return LinkKind::Other;
            }
            return LinkKind::Album;
        }

        LinkKind::Other
    }
}
