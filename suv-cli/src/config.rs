//! Configuration resolution from CLI args and environment

use crate::cli::Args;
use crate::error::CliError;
use std::path::{Path, PathBuf};
use std::time::Duration;
use suv_http_client::SuvClient;
use zeroize::Zeroizing;

const HOST_VAR: &str = "SUV_HOST";
const USER_VAR: &str = "SUV_USER";
const PASSWORD_VAR: &str = "SUV_PASSWORD";
const SESSION_VAR: &str = "SUV_SESSION";

/// Resolved runtime configuration
pub struct Config {
    /// Portal host
    pub host: String,
    /// Where the session token is saved
    pub session_file: PathBuf,
    /// Per-request timeout
    pub timeout: Duration,
    /// Trace requests and responses
    pub detailed: bool,
    /// JSON output
    pub json: bool,
    /// Token from SUV_SESSION, overrides the session file
    pub env_session: Option<Zeroizing<String>>,
}

impl Config {
    /// Build config from CLI args and the environment
    pub fn from_args(args: &Args) -> Result<Self, CliError> {
        let env = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());
        Self::resolve(args, env)
    }

    fn resolve(args: &Args, env: impl Fn(&str) -> Option<String>) -> Result<Self, CliError> {
        let host = args
            .host
            .clone()
            .filter(|h| !h.trim().is_empty())
            .or_else(|| env(HOST_VAR))
            .ok_or_else(|| {
                CliError::Config(format!("No portal host given; use --host or set {}", HOST_VAR))
            })?;

        Ok(Config {
            host,
            session_file: expand_tilde(&args.session_file),
            timeout: args.timeout,
            detailed: args.detailed,
            json: args.json,
            env_session: env(SESSION_VAR).map(Zeroizing::new),
        })
    }

    /// Build a portal client for this configuration
    pub fn client(&self) -> Result<SuvClient, CliError> {
        Ok(SuvClient::builder()
            .host(&self.host)?
            .timeout(self.timeout)
            .detailed(self.detailed)
            .build()?)
    }
}

/// Expand ~ to home directory
fn expand_tilde(path: &Path) -> PathBuf {
    if let Some(path_str) = path.to_str()
        && (path_str.starts_with("~/") || path_str == "~")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(path_str.trim_start_matches('~').trim_start_matches('/'));
    }
    path.to_path_buf()
}

/// User code from the flag, SUV_USER, or a prompt
pub fn resolve_user_code(provided: Option<String>) -> Result<String, CliError> {
    if let Some(user) = provided.filter(|u| !u.trim().is_empty()) {
        return Ok(user.trim().to_string());
    }
    if let Ok(user) = std::env::var(USER_VAR)
        && !user.trim().is_empty()
    {
        return Ok(user.trim().to_string());
    }
    prompt_user_code()
}

fn prompt_user_code() -> Result<String, CliError> {
    use std::io::Write;
    print!("User code: ");
    std::io::stdout().flush().ok();

    let mut input = String::new();
    std::io::stdin()
        .read_line(&mut input)
        .map_err(|e| CliError::Config(format!("Failed to read user code: {}", e)))?;

    let user = input.trim();
    if user.is_empty() {
        return Err(CliError::Config("User code is required.".to_string()));
    }
    Ok(user.to_string())
}

/// Password from SUV_PASSWORD or a hidden prompt
pub fn resolve_password() -> Result<Zeroizing<String>, CliError> {
    if let Ok(password) = std::env::var(PASSWORD_VAR)
        && !password.is_empty()
    {
        return Ok(Zeroizing::new(password));
    }
    let password = Zeroizing::new(
        rpassword::prompt_password("Password: ")
            .map_err(|e| CliError::Config(format!("Failed to read password: {}", e)))?,
    );
    if password.is_empty() {
        return Err(CliError::Config("Password is required.".to_string()));
    }
    Ok(password)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["suvctl"];
        argv.extend_from_slice(extra);
        argv.push("status");
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_host_flag_wins_over_env() {
        let config = Config::resolve(&args(&["--host", "flag.example.edu"]), |name| {
            (name == HOST_VAR).then(|| "env.example.edu".to_string())
        })
        .unwrap();
        assert_eq!(config.host, "flag.example.edu");
    }

    #[test]
    fn test_host_from_env() {
        let config = Config::resolve(&args(&[]), |name| {
            (name == HOST_VAR).then(|| "env.example.edu".to_string())
        })
        .unwrap();
        assert_eq!(config.host, "env.example.edu");
        assert!(config.env_session.is_none());
    }

    #[test]
    fn test_missing_host_is_config_error() {
        let result = Config::resolve(&args(&[]), |_| None);
        assert!(matches!(result, Err(CliError::Config(_))));
    }

    #[test]
    fn test_env_session_picked_up() {
        let config = Config::resolve(&args(&["--host", "h"]), |name| {
            (name == SESSION_VAR).then(|| "abc123".to_string())
        })
        .unwrap();
        assert_eq!(config.env_session.unwrap().as_str(), "abc123");
    }

    #[test]
    fn test_client_targets_portal_path() {
        let config = Config::resolve(&args(&["--host", "portal.example.edu"]), |_| None).unwrap();
        let client = config.client().unwrap();
        assert_eq!(client.base_url().as_str(), "http://portal.example.edu/portal");
    }

    #[test]
    fn test_expand_tilde() {
        let plain = expand_tilde(Path::new("/tmp/session"));
        assert_eq!(plain, PathBuf::from("/tmp/session"));

        if let Some(home) = dirs::home_dir() {
            let expanded = expand_tilde(Path::new("~/.cache/suvctl/session"));
            assert_eq!(expanded, home.join(".cache/suvctl/session"));
        }
    }
}
