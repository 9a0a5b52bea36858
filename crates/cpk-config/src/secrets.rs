//! Runtime secret resolution.
//!
//! Config YAML stores only env var NAMES (`database.url_env`,
//! `alerts.credential_env`). Binaries call [`resolve_secrets`] once at startup
//! and pass the result to constructors. Errors name the variable, never its
//! value, and `Debug` output is redacted.

use anyhow::{bail, Result};

use crate::EngineConfig;

/// Which secrets the caller cannot run without.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SecretRequirements {
    pub database_url: bool,
    /// Only all-tenant alert batches need the batch credential.
    pub batch_credential: bool,
}

#[derive(Clone)]
pub struct ResolvedSecrets {
    pub database_url: Option<String>,
    pub batch_credential: Option<String>,
}

impl std::fmt::Debug for ResolvedSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedSecrets")
            .field(
                "database_url",
                &self.database_url.as_ref().map(|_| "<REDACTED>"),
            )
            .field(
                "batch_credential",
                &self.batch_credential.as_ref().map(|_| "<REDACTED>"),
            )
            .finish()
    }
}

/// Unset and blank both resolve to `None`.
fn resolve_env(var_name: &str) -> Option<String> {
    match std::env::var(var_name) {
        Ok(v) if !v.trim().is_empty() => Some(v),
        _ => None,
    }
}

pub fn resolve_secrets(cfg: &EngineConfig, required: SecretRequirements) -> Result<ResolvedSecrets> {
    let url_env = cfg.database.url_env.trim();
    let database_url = resolve_env(url_env);
    if required.database_url && database_url.is_none() {
        bail!(
            "SECRETS_MISSING: required env var '{}' (database url) is not set or empty",
            url_env
        );
    }

    let batch_credential = cfg.alerts.credential_env.as_deref().and_then(resolve_env);
    if required.batch_credential {
        if let (Some(name), None) = (&cfg.alerts.credential_env, &batch_credential) {
            bail!(
                "SECRETS_MISSING: required env var '{}' (alert batch credential) is not set or empty",
                name
            );
        }
    }

    Ok(ResolvedSecrets {
        database_url,
        batch_credential,
    })
}
