//! Export configuration, read from flags or the environment.

use std::fmt;
use std::time::Duration;

use clap::Args;

use crate::export::callback::DEFAULT_CALLBACK_RPC;

/// Hosting-API and callback settings for the export pipeline.
///
/// Required values default to empty strings instead of failing parsing: a
/// missing value is reported once at startup via [`Self::missing_required`]
/// and the calls that depend on it fail at run time.
#[derive(Clone, Args)]
pub struct ExportConfig {
    /// Token used as the bearer credential for the hosting API.
    #[arg(long, env = "GITHUB_TOKEN", default_value = "", hide_env_values = true)]
    pub github_token: String,

    /// Owner (user or organisation) of the target repository.
    #[arg(long = "repo-owner", env = "GITHUB_REPO_OWNER", default_value = "")]
    pub repo_owner: String,

    /// Name of the target repository.
    #[arg(long = "repo-name", env = "GITHUB_REPO_NAME", default_value = "")]
    pub repo_name: String,

    /// Branch that export branches fork from and pull requests target.
    #[arg(long, env = "GITHUB_DEFAULT_BRANCH", default_value = "main")]
    pub default_branch: String,

    /// Base URL of the hosting REST API.
    #[arg(long, env = "GITHUB_API_URL", default_value = "https://api.github.com")]
    pub github_api_url: String,

    /// Base URL of the database REST endpoint that hosts the callback RPC.
    #[arg(long, env = "SUPABASE_URL", default_value = "")]
    pub supabase_url: String,

    /// Service credential for the callback RPC.
    #[arg(
        long = "service-role-key",
        env = "SUPABASE_SERVICE_ROLE_KEY",
        default_value = "",
        hide_env_values = true
    )]
    pub service_role_key: String,

    /// RPC that receives export status callbacks.
    #[arg(long, env = "GIT_EXPORT_CALLBACK_RPC", default_value = DEFAULT_CALLBACK_RPC)]
    pub callback_rpc: String,

    /// Upper bound for any single outbound call, in seconds.
    #[arg(long, env = "GIT_EXPORT_CALL_TIMEOUT_SECS", default_value_t = 30)]
    pub call_timeout_secs: u64,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            github_token: String::new(),
            repo_owner: String::new(),
            repo_name: String::new(),
            default_branch: "main".to_string(),
            github_api_url: "https://api.github.com".to_string(),
            supabase_url: String::new(),
            service_role_key: String::new(),
            callback_rpc: DEFAULT_CALLBACK_RPC.to_string(),
            call_timeout_secs: 30,
        }
    }
}

impl ExportConfig {
    /// Environment names of required settings that are empty.
    #[must_use]
    pub fn missing_required(&self) -> Vec<&'static str> {
        [
            ("SUPABASE_URL", &self.supabase_url),
            ("SUPABASE_SERVICE_ROLE_KEY", &self.service_role_key),
            ("GITHUB_TOKEN", &self.github_token),
            ("GITHUB_REPO_OWNER", &self.repo_owner),
            ("GITHUB_REPO_NAME", &self.repo_name),
        ]
        .into_iter()
        .filter(|(_, value)| value.is_empty())
        .map(|(name, _)| name)
        .collect()
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.missing_required().is_empty()
    }

    #[must_use]
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }
}

impl fmt::Debug for ExportConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |s: &str| if s.is_empty() { "" } else { "***" };
        f.debug_struct("ExportConfig")
            .field("github_token", &redact(&self.github_token))
            .field("repo_owner", &self.repo_owner)
            .field("repo_name", &self.repo_name)
            .field("default_branch", &self.default_branch)
            .field("github_api_url", &self.github_api_url)
            .field("supabase_url", &self.supabase_url)
            .field("service_role_key", &redact(&self.service_role_key))
            .field("callback_rpc", &self.callback_rpc)
            .field("call_timeout_secs", &self.call_timeout_secs)
            .finish()
    }
}
