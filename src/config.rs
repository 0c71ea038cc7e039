//! Solver license settings, read from the environment.

use crate::error::{Error, Result};

pub const ENV_WLS_ACCESS_ID: &str = "GRB_WLSACCESSID";
pub const ENV_WLS_SECRET: &str = "GRB_WLSSECRET";
pub const ENV_LICENSE_ID: &str = "GRB_LICENSEID";

/// Gurobi Web License Service credentials.
///
/// Either all three values are set or none is; with none, the solver falls back to
/// its own license lookup (`gurobi.lic`, token server, ...).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LicenseConfig {
    pub wls_access_id: Option<String>,
    pub wls_secret: Option<String>,
    pub license_id: Option<i32>,
}

impl LicenseConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let wls_access_id = get(ENV_WLS_ACCESS_ID);
        let wls_secret = get(ENV_WLS_SECRET);
        let license_id = match get(ENV_LICENSE_ID) {
            Some(raw) => Some(
                raw.parse::<i32>()
                    .map_err(|_| Error::config(format!("{} must be an integer, got `{}`", ENV_LICENSE_ID, raw)))?,
            ),
            None => None,
        };

        let set = [wls_access_id.is_some(), wls_secret.is_some(), license_id.is_some()];
        if set.iter().any(|&s| s) && !set.iter().all(|&s| s) {
            return Err(Error::config(format!(
                "incomplete license settings: set all of {}, {} and {}, or none",
                ENV_WLS_ACCESS_ID, ENV_WLS_SECRET, ENV_LICENSE_ID
            )));
        }

        Ok(LicenseConfig { wls_access_id, wls_secret, license_id })
    }

    pub fn is_configured(&self) -> bool {
        self.license_id.is_some()
    }
}
