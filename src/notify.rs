use std::process::Stdio;

use tokio::process::Command;
use tokio::runtime::Handle;

use crate::core::engine::Firing;
use crate::error::{OrbitError, Result};

/// Shows a firing to the user. Called once per firing; a failed delivery is
/// not retried.
pub trait Notifier: Send + Sync {
    fn notify(&self, firing: &Firing) -> Result<()>;
}

/// Writes firings to the log only.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, firing: &Firing) -> Result<()> {
        log::info!("Marker {:?} reached (cycle {})", firing.text, firing.cycle + 1);
        Ok(())
    }
}

/// Desktop notifications through `notify-send`.
pub struct DesktopNotifier {
    program: String,
    app_name: String,
}

impl Default for DesktopNotifier {
    fn default() -> Self {
        Self::new("notify-send")
    }
}

impl DesktopNotifier {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            app_name: "orbit".into(),
        }
    }

    fn args(&self, firing: &Firing) -> Vec<String> {
        vec![
            "--app-name".into(),
            self.app_name.clone(),
            firing.text.clone(),
            format!("Loop cycle {}", firing.cycle + 1),
        ]
    }
}

impl Notifier for DesktopNotifier {
    /// Spawns the program and returns without waiting for it. A program that
    /// cannot be started is a delivery error; its exit status is only logged.
    fn notify(&self, firing: &Firing) -> Result<()> {
        log::info!("Marker {:?} reached (cycle {})", firing.text, firing.cycle + 1);
        let handle = Handle::try_current()
            .map_err(|e| OrbitError::Delivery(format!("{}: {}", self.program, e)))?;
        let _guard = handle.enter();

        let mut child = Command::new(&self.program)
            .args(self.args(firing))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| OrbitError::Delivery(format!("{}: {}", self.program, e)))?;

        let program = self.program.clone();
        handle.spawn(async move {
            match child.wait().await {
                Ok(status) if status.success() => {}
                Ok(status) => log::warn!("{} exited with {}", program, status),
                Err(e) => log::warn!("Failed to wait for {}: {}", program, e),
            }
        });
        Ok(())
    }
}
