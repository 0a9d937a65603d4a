//! URL launcher using the platform opener

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    launcher::{AppLauncher, LaunchRequest},
};
use tokio::process::Command;
use tracing::{debug, warn};

/// Opens redirect URLs with the desktop's default handler.
///
/// Desktop systems have no notion of an Android package, so `package_id` is
/// only logged; the URL is handed to `open` (macOS), `xdg-open` (Linux/BSD)
/// or `cmd /C start` (Windows).
#[derive(Debug, Clone)]
pub struct SystemUrlLauncher {
    program: String,
    args: Vec<String>,
}

impl SystemUrlLauncher {
    pub fn new() -> Self {
        let (program, args): (&str, &[&str]) = if cfg!(target_os = "macos") {
            ("open", &[])
        } else if cfg!(target_os = "windows") {
            ("cmd", &["/C", "start", ""])
        } else {
            ("xdg-open", &[])
        };

        Self::with_command(program, args.iter().map(|a| a.to_string()).collect())
    }

    /// Use a custom opener. The URL is appended as the last argument.
    pub fn with_command(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

impl Default for SystemUrlLauncher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AppLauncher for SystemUrlLauncher {
    async fn launch(&self, request: LaunchRequest) -> Result<()> {
        debug!(
            package_id = %request.package_id,
            program = %self.program,
            "Opening redirect URL"
        );

        let status = Command::new(&self.program)
            .args(&self.args)
            .arg(&request.url)
            .status()
            .await
            .map_err(|e| BridgeError::LaunchFailed {
                package_id: request.package_id.clone(),
                message: format!("Failed to spawn {}: {}", self.program, e),
            })?;

        if !status.success() {
            warn!(package_id = %request.package_id, ?status, "Opener exited with failure");
            return Err(BridgeError::LaunchFailed {
                package_id: request.package_id,
                message: format!("{} exited with {}", self.program, status),
            });
        }

        Ok(())
    }
}
