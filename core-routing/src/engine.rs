//! # Decision Engine
//!
//! Pure function from `(link, snapshot)` to an [`Outcome`]. Rules are checked
//! in order and the first one that applies settles the outcome:
//!
//! 0. No provider chosen yet (never set, or preferences not loaded):
//!    [`Outcome::SameApp`].
//! 1. Resolve the originating provider from the link (may be none).
//! 2. Origin is the chosen provider: [`Outcome::SameApp`].
//! 3. Origin has its override flag set: [`Outcome::SameApp`].
//! 4. Playlist with playlist redirects off, or album with album redirects
//!    off: [`Outcome::SameApp`].
//! 5. Otherwise redirect to the chosen provider.
//!
//! Links from no known provider skip rules 2 and 3 and are redirected unless
//! a toggle keeps them.

use crate::classifier::{classify, LinkKind};
use crate::error::Result;
use crate::preferences::PreferenceSnapshot;
use crate::provider::ProviderRegistry;
use bridge_traits::LaunchRequest;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// What the host should do with a link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Outcome {
    /// Let the link open where it was headed.
    SameApp,
    /// Open the chosen provider instead.
    DifferentApp {
        package_id: String,
        search_url: String,
    },
}

impl Outcome {
    pub fn is_redirect(&self) -> bool {
        matches!(self, Outcome::DifferentApp { .. })
    }

    pub fn launch_request(&self) -> Option<LaunchRequest> {
        match self {
            Outcome::SameApp => None,
            Outcome::DifferentApp {
                package_id,
                search_url,
            } => Some(LaunchRequest::new(package_id.clone(), search_url.clone())),
        }
    }
}

/// The rule that settled an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    NoChosenProvider,
    AlreadyChosenProvider,
    ProviderOverride,
    PlaylistRedirectDisabled,
    AlbumRedirectDisabled,
    Redirect,
}

impl Rule {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rule::NoChosenProvider => "no_chosen_provider",
            Rule::AlreadyChosenProvider => "already_chosen_provider",
            Rule::ProviderOverride => "provider_override",
            Rule::PlaylistRedirectDisabled => "playlist_redirect_disabled",
            Rule::AlbumRedirectDisabled => "album_redirect_disabled",
            Rule::Redirect => "redirect",
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An outcome together with how it was reached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    /// Id of the provider that produced the link.
    pub origin: Option<String>,
    pub kind: LinkKind,
    pub rule: Rule,
    pub outcome: Outcome,
}

/// Stateless decision engine over a provider registry.
#[derive(Debug, Clone)]
pub struct DecisionEngine {
    registry: Arc<ProviderRegistry>,
}

impl DecisionEngine {
    pub fn new(registry: Arc<ProviderRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<ProviderRegistry> {
        &self.registry
    }

    /// Decides where `uri` should open under `snapshot`.
    ///
    /// # Errors
    ///
    /// [`RoutingError::UnknownProvider`](crate::RoutingError::UnknownProvider)
    /// when the link is to be redirected but the chosen provider id is not in
    /// the registry. An empty chosen provider is not an error; the link stays
    /// where it was headed.
    pub fn decide(&self, uri: &str, snapshot: &PreferenceSnapshot) -> Result<Outcome> {
        self.explain(uri, snapshot).map(|decision| decision.outcome)
    }

    /// Same as [`decide`](Self::decide) but reports origin, kind and rule.
    ///
    /// `kind` is always filled in; it only influences the outcome when
    /// neither the chosen-provider nor the override rule applied.
    pub fn explain(&self, uri: &str, snapshot: &PreferenceSnapshot) -> Result<Decision> {
        let origin = self.registry.resolve_provider(uri);
        let kind = classify(uri);

        let decision = |rule: Rule, outcome: Outcome| Decision {
            origin: origin.map(|provider| provider.id.clone()),
            kind,
            rule,
            outcome,
        };

        if !snapshot.has_chosen_provider() {
            return Ok(decision(Rule::NoChosenProvider, Outcome::SameApp));
        }

        if let Some(origin) = origin {
            if origin.id == snapshot.chosen_provider {
                return Ok(decision(Rule::AlreadyChosenProvider, Outcome::SameApp));
            }
            if snapshot.override_for(&origin.id) {
                return Ok(decision(Rule::ProviderOverride, Outcome::SameApp));
            }
        }

        match kind {
            LinkKind::Playlist if !snapshot.redirect_playlists => {
                return Ok(decision(Rule::PlaylistRedirectDisabled, Outcome::SameApp));
            }
            LinkKind::Album if !snapshot.redirect_albums => {
                return Ok(decision(Rule::AlbumRedirectDisabled, Outcome::SameApp));
            }
            _ => {}
        }

        let target = self.registry.lookup(&snapshot.chosen_provider)?;
        Ok(decision(
            Rule::Redirect,
            Outcome::DifferentApp {
                package_id: target.package_id.clone(),
                search_url: target.search_url_template.clone(),
            },
        ))
    }
}

impl Default for DecisionEngine {
    fn default() -> Self {
        Self::new(Arc::new(ProviderRegistry::builtin()))
    }
}
