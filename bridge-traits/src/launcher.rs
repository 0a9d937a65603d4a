//! App Launch Abstraction
//!
//! When the routing core decides a link belongs in a different provider, the
//! host is asked to open that provider. On Android this becomes an
//! `ACTION_VIEW` intent pinned to the package; on desktop there is no package
//! manager, so implementations fall back to opening the URL.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Target of a redirect.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LaunchRequest {
    /// Platform package/bundle identifier (e.g. `com.spotify.music`)
    pub package_id: String,
    /// URL handed to the target app
    pub url: String,
}

impl LaunchRequest {
    pub fn new(package_id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            package_id: package_id.into(),
            url: url.into(),
        }
    }
}

/// Opens a provider application.
///
/// Implementations should return promptly; the deep-link handler awaits the
/// call before it reports the launch.
#[async_trait]
pub trait AppLauncher: Send + Sync {
    /// Open `request.url` in the app identified by `request.package_id`.
    async fn launch(&self, request: LaunchRequest) -> Result<()>;
}
