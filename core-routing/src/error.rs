use bridge_traits::BridgeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RoutingError {
    /// The id is not part of the provider registry. For a chosen provider this
    /// means the stored preference and the registry disagree.
    #[error("Unknown provider: '{0}'")]
    UnknownProvider(String),

    #[error("Invalid provider registry: {0}")]
    InvalidRegistry(String),

    #[error("Preference store error: {0}")]
    Preferences(#[source] BridgeError),

    #[error("Launch error: {0}")]
    Launch(#[source] BridgeError),
}

pub type Result<T> = std::result::Result<T, RoutingError>;
