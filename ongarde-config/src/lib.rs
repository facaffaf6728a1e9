//! Config loader: reads `config.yaml` plus a small set of
//! environment variables into an immutable in-memory record, validating
//! every configured upstream against SSRF ranges at load time.

pub mod ssrf;

use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

/// `scanner.mode`: `full` runs regex + NLP, `lite` is regex-only.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ScannerMode {
    #[default]
    Full,
    Lite,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxySection {
    pub host: String,
    pub port: u16,
}

impl Default for ProxySection {
    fn default() -> Self {
        ProxySection {
            host: "127.0.0.1".to_string(),
            port: 4242,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ScannerSection {
    pub mode: ScannerMode,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditSection {
    pub retention_days: u32,
    pub path: PathBuf,
}

impl Default for AuditSection {
    fn default() -> Self {
        AuditSection {
            retention_days: 30,
            path: default_state_dir().join("audit.db"),
        }
    }
}

/// Raw, on-disk shape of `config.yaml`.
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
#[serde(default)]
struct RawConfig {
    version: u32,
    upstream: HashMap<String, String>,
    proxy: ProxySection,
    scanner: ScannerSection,
    audit: AuditSection,
    strict_mode: bool,
    allowlist_path: Option<PathBuf>,
}

/// The immutable, validated configuration shared read-only for the life of
/// the process. Mutation requires a restart.
#[derive(Clone, Debug)]
pub struct Config {
    pub version: u32,
    pub upstream: HashMap<String, String>,
    pub proxy_host: String,
    pub proxy_port: u16,
    pub scanner_mode: ScannerMode,
    pub audit_retention_days: u32,
    pub audit_path: PathBuf,
    pub strict_mode: bool,
    pub allowlist_path: PathBuf,
    pub state_dir: PathBuf,
    pub auth_required: bool,
    pub body_cap_bytes: u64,
    pub max_connections: usize,
    pub tcp_backlog: u32,
    pub keepalive_idle: Duration,
    pub upstream_connection_pool: usize,
}

pub const BODY_CAP_BYTES: u64 = 1024 * 1024; // 1 MiB
pub const MAX_CONNECTIONS: usize = 100;
pub const TCP_BACKLOG: u32 = 50;
pub const KEY_MGMT_RATE_LIMIT_PER_MIN: u32 = 20;

fn default_state_dir() -> PathBuf {
    if let Ok(home) = env::var("ONGARDE_HOME") {
        return PathBuf::from(home);
    }
    dirs_home().join(".ongarde")
}

fn dirs_home() -> PathBuf {
    env::var("HOME").map(PathBuf::from).unwrap_or_else(|_| PathBuf::from("."))
}

impl Config {
    /// Loads config from `path` (or `ONGARDE_CONFIG`, or
    /// `<state_dir>/config.yaml`), overlays environment variables, then
    /// validates every upstream URL against SSRF ranges.
    pub fn load(explicit_path: Option<&Path>) -> Result<Config> {
        let state_dir = default_state_dir();
        let path = explicit_path
            .map(PathBuf::from)
            .or_else(|| env::var("ONGARDE_CONFIG").ok().map(PathBuf::from))
            .unwrap_or_else(|| state_dir.join("config.yaml"));

        let raw: RawConfig = if path.exists() {
            ongarde_core::statedir::harden_file(&path);
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("reading config file {}", path.display()))?;
            serde_yaml::from_str(&text).with_context(|| format!("parsing config file {}", path.display()))?
        } else {
            RawConfig::default()
        };

        if raw.version > 1 {
            bail!("unsupported config version {}", raw.version);
        }

        for (provider, url) in &raw.upstream {
            ssrf::validate_upstream_url(url)
                .map_err(|reason| anyhow::anyhow!("upstream '{provider}' rejected: {reason}"))?;
        }

        let port = env::var("ONGARDE_PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(raw.proxy.port);

        let auth_required = env::var("ONGARDE_AUTH_REQUIRED")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(true);

        if raw.strict_mode {
            tracing::warn!("strict_mode is a reserved stub and currently changes no behavior");
        }

        let allowlist_path = raw.allowlist_path.unwrap_or_else(|| state_dir.join("allowlist.yaml"));
        let audit_path = if raw.audit.path == AuditSection::default().path {
            state_dir.join("audit.db")
        } else {
            raw.audit.path
        };

        Ok(Config {
            version: raw.version,
            upstream: raw.upstream,
            proxy_host: raw.proxy.host,
            proxy_port: port,
            scanner_mode: raw.scanner.mode,
            audit_retention_days: raw.audit.retention_days,
            audit_path,
            strict_mode: raw.strict_mode,
            allowlist_path,
            state_dir,
            auth_required,
            body_cap_bytes: BODY_CAP_BYTES,
            max_connections: MAX_CONNECTIONS,
            tcp_backlog: TCP_BACKLOG,
            keepalive_idle: Duration::from_secs(5),
            upstream_connection_pool: MAX_CONNECTIONS,
        })
    }

    pub fn upstream_for(&self, path: &str) -> Option<&str> {
        let provider = if path.starts_with("/v1/messages") {
            "anthropic"
        } else {
            "openai"
        };
        self.upstream.get(provider).map(String::as_str)
    }

    pub fn provider_for(&self, path: &str) -> &'static str {
        if path.starts_with("/v1/messages") { "anthropic" } else { "openai" }
    }

    /// The credential dispatched upstream in place of the client's OnGarde
    /// key — the Authorization header is replaced with this before the
    /// request leaves the proxy. Read from `ONGARDE_UPSTREAM_<PROVIDER>_KEY`
    /// rather than the YAML file so the secret never sits on disk alongside
    /// the rest of the config.
    pub fn upstream_credential(&self, provider: &str) -> Option<String> {
        env::var(format!("ONGARDE_UPSTREAM_{}_KEY", provider.to_uppercase())).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_defaults_when_no_file_present() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config::load(Some(&dir.path().join("missing.yaml"))).unwrap();
        assert_eq!(cfg.proxy_port, 4242);
        assert_eq!(cfg.proxy_host, "127.0.0.1");
        assert_eq!(cfg.scanner_mode, ScannerMode::Full);
    }

    #[test]
    fn rejects_ssrf_upstream_at_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "version: 1").unwrap();
        writeln!(f, "upstream:").unwrap();
        writeln!(f, "  openai: http://169.254.169.254/latest").unwrap();
        drop(f);
        let err = Config::load(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("rejected"));
    }

    #[test]
    fn env_port_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "version: 1\nproxy:\n  port: 5000\n").unwrap();
        unsafe {
            env::set_var("ONGARDE_PORT", "9999");
        }
        let cfg = Config::load(Some(&path)).unwrap();
        unsafe {
            env::remove_var("ONGARDE_PORT");
        }
        assert_eq!(cfg.proxy_port, 9999);
    }
}
