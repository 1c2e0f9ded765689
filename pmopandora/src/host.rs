//! Validation de l'hôte et normalisation de l'URL de base

use crate::error::{PandoraError, Result};
use std::net::{IpAddr, Ipv6Addr};
use url::Url;

/// Vrai si `host` est une adresse IP ou un nom d'hôte syntaxiquement valide
pub fn host_valid(host: &str) -> bool {
    let bare = host.trim_start_matches('[').trim_end_matches(']');
    if bare.parse::<IpAddr>().is_ok() {
        return true;
    }

    !host.is_empty()
        && host
            .split('.')
            .all(|label| !label.is_empty() && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-'))
}

/// Transforme l'hôte saisi en URL de base du contrôleur
///
/// Accepte `host`, `host:port`, une IPv6 nue ou une URL `http(s)://`
/// complète. Le résultat ne se termine jamais par un slash.
pub fn base_url(host: &str) -> Result<String> {
    let trimmed = host.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(PandoraError::InvalidHost("empty host".to_string()));
    }

    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else if trimmed.parse::<Ipv6Addr>().is_ok() {
        // une IPv6 nue doit être entre crochets dans une URL
        format!("http://[{}]", trimmed)
    } else {
        format!("http://{}", trimmed)
    };

    let url = Url::parse(&candidate)
        .map_err(|e| PandoraError::InvalidHost(format!("{}: {}", host, e)))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(PandoraError::InvalidHost(format!(
            "{}: unsupported scheme {}",
            host,
            url.scheme()
        )));
    }

    match url.host_str() {
        Some(name) if host_valid(name) => {}
        _ => return Err(PandoraError::InvalidHost(host.to_string())),
    }

    Ok(url.as_str().trim_end_matches('/').to_string())
}
