//! Upstream URL SSRF validation.
//!
//! Rejects any upstream whose resolved host is a literal private, link-local
//! or metadata IP address. `localhost`/`127.0.0.1` are explicitly exempted so
//! a locally-hosted LLM runtime remains reachable.

use std::net::IpAddr;

use ipnet::{Ipv4Net, Ipv6Net};
use url::Url;

/// Returns `Ok(())` if `url`'s host is safe to dial, `Err(reason)` otherwise.
pub fn validate_upstream_url(url: &str) -> Result<(), String> {
    let parsed = Url::parse(url).map_err(|e| format!("invalid upstream URL {url}: {e}"))?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(format!("unsupported scheme in upstream URL {url}"));
    }
    let host = parsed
        .host_str()
        .ok_or_else(|| format!("upstream URL {url} has no host"))?;

    if host.eq_ignore_ascii_case("localhost") {
        return Ok(());
    }

    let Ok(ip) = host.parse::<IpAddr>() else {
        // A DNS name: we can't resolve it at load time without doing network
        // I/O during config load, so hostnames are accepted here and the
        // runtime resolver/connector is expected to re-validate on connect.
        return Ok(());
    };

    if is_forbidden_ip(ip) {
        return Err(format!(
            "upstream URL {url} resolves to a disallowed private/metadata address {ip}"
        ));
    }
    Ok(())
}

fn is_forbidden_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            if v4.is_loopback() {
                return false;
            }
            const PRIVATE_RANGES: &[&str] = &["10.0.0.0/8", "172.16.0.0/12", "192.168.0.0/16", "169.254.0.0/16"];
            PRIVATE_RANGES
                .iter()
                .map(|c| c.parse::<Ipv4Net>().expect("static cidr parses"))
                .any(|net| net.contains(&v4))
        },
        IpAddr::V6(v6) => {
            if v6.is_loopback() {
                return false;
            }
            const PRIVATE_RANGES: &[&str] = &["fc00::/7", "fe80::/10"];
            PRIVATE_RANGES
                .iter()
                .map(|c| c.parse::<Ipv6Net>().expect("static cidr parses"))
                .any(|net| net.contains(&v6))
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_rfc1918_ranges() {
        for url in [
            "http://10.0.0.5:8000/v1",
            "http://172.16.5.5/v1",
            "http://192.168.1.1/v1",
            "http://169.254.169.254/latest/meta-data",
        ] {
            assert!(validate_upstream_url(url).is_err(), "{url} should be rejected");
        }
    }

    #[test]
    fn rejects_ipv6_private_ranges() {
        assert!(validate_upstream_url("http://[fc00::1]/v1").is_err());
        assert!(validate_upstream_url("http://[fe80::1]/v1").is_err());
    }

    #[test]
    fn allows_loopback_and_localhost() {
        assert!(validate_upstream_url("http://127.0.0.1:11434/v1").is_ok());
        assert!(validate_upstream_url("http://localhost:11434/v1").is_ok());
        assert!(validate_upstream_url("http://[::1]:11434/v1").is_ok());
    }

    #[test]
    fn allows_public_hostnames() {
        assert!(validate_upstream_url("https://api.openai.com/v1").is_ok());
        assert!(validate_upstream_url("https://api.anthropic.com/v1").is_ok());
    }

    #[test]
    fn allows_public_ip_literals() {
        assert!(validate_upstream_url("https://1.1.1.1/v1").is_ok());
    }
}
