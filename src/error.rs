use std::process::ExitCode;

use thiserror::Error;

/// Conditions that end the run before any posting happens.
///
/// Everything downstream of login (create/feature/list/unfeature) is
/// best-effort and logged instead of propagated.
#[derive(Debug, Error)]
pub enum FatalError {
    #[error("no settings found (do you need to create settings.json?)")]
    ConfigNotFound(#[source] anyhow::Error),
    #[error("log in failed")]
    AuthFailed(#[source] anyhow::Error),
}

impl FatalError {
    /// Distinct exit codes so cron wrappers can tell the failure modes apart
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::ConfigNotFound(_) => ExitCode::from(2),
            Self::AuthFailed(_) => ExitCode::from(3),
        }
    }
}
