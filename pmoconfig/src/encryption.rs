//! Chiffrement des secrets de configuration avec une clé liée à la machine
//!
//! Les mots de passe et jetons de session sont stockés sous la forme
//! `encrypted:BASE64(nonce || ciphertext)` (AES-256-GCM). La clé est dérivée
//! de l'identifiant matériel de la machine : un fichier copié ailleurs ne se
//! déchiffre plus. Les valeurs sans préfixe sont lues telles quelles.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use anyhow::{anyhow, Result};
use base64::{engine::general_purpose::STANDARD, Engine};
use sha2::{Digest, Sha256};

/// Préfixe des valeurs chiffrées
pub const ENCRYPTED_PREFIX: &str = "encrypted:";

const NONCE_LEN: usize = 12;
const KEY_SALT: &[u8] = b"pmomusic-config-encryption-v1";
const NONCE_SALT: &[u8] = b"pmomusic-nonce-v1";

/// Identifiant matériel de la machine
#[cfg(target_os = "linux")]
fn machine_id() -> Result<String> {
    ["/etc/machine-id", "/var/lib/dbus/machine-id"]
        .iter()
        .filter_map(|path| std::fs::read_to_string(path).ok())
        .map(|id| id.trim().to_string())
        .find(|id| !id.is_empty())
        .ok_or_else(|| anyhow!("Failed to read machine-id"))
}

#[cfg(target_os = "macos")]
fn machine_id() -> Result<String> {
    let output = std::process::Command::new("ioreg")
        .args(["-d2", "-c", "IOPlatformExpertDevice"])
        .output()?;

    // "IOPlatformUUID" = "XXXXXXXX-XXXX-XXXX-XXXX-XXXXXXXXXXXX"
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .find(|line| line.contains("IOPlatformUUID"))
        .and_then(|line| line.split('"').nth(3))
        .map(str::to_string)
        .ok_or_else(|| anyhow!("Failed to extract IOPlatformUUID from ioreg"))
}

#[cfg(target_os = "windows")]
fn machine_id() -> Result<String> {
    let output = std::process::Command::new("wmic")
        .args(["csproduct", "get", "UUID"])
        .output()?;

    String::from_utf8_lossy(&output.stdout)
        .lines()
        .nth(1)
        .map(|line| line.trim().to_string())
        .filter(|id| !id.is_empty())
        .ok_or_else(|| anyhow!("Failed to extract UUID from wmic"))
}

#[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
fn machine_id() -> Result<String> {
    Err(anyhow!("Unsupported platform for machine id extraction"))
}

fn cipher() -> Result<Aes256Gcm> {
    let key = Sha256::new()
        .chain_update(machine_id()?.as_bytes())
        .chain_update(KEY_SALT)
        .finalize();
    Aes256Gcm::new_from_slice(&key).map_err(|e| anyhow!("Failed to create cipher: {}", e))
}

/// Indique si la clé machine est disponible sur cette plateforme
pub fn machine_key_available() -> bool {
    machine_id().is_ok()
}

/// Chiffre `secret` avec la clé machine
///
/// Le nonce est dérivé du secret : une même valeur donne toujours le même
/// texte chiffré, et réécrire un secret inchangé ne modifie pas le fichier.
pub fn encrypt_secret(secret: &str) -> Result<String> {
    let cipher = cipher()?;

    let digest = Sha256::new()
        .chain_update(secret.as_bytes())
        .chain_update(NONCE_SALT)
        .finalize();
    let nonce = Nonce::from_slice(&digest[..NONCE_LEN]);

    let ciphertext = cipher
        .encrypt(nonce, secret.as_bytes())
        .map_err(|e| anyhow!("Encryption failed: {}", e))?;

    let mut payload = nonce.to_vec();
    payload.extend_from_slice(&ciphertext);
    Ok(format!("{}{}", ENCRYPTED_PREFIX, STANDARD.encode(payload)))
}

/// Déchiffre une valeur `encrypted:...`
///
/// # Errors
///
/// Préfixe absent, base64 invalide, ou clé différente (autre machine)
pub fn decrypt_secret(encrypted: &str) -> Result<String> {
    let encoded = encrypted
        .strip_prefix(ENCRYPTED_PREFIX)
        .ok_or_else(|| anyhow!("Invalid encrypted value (missing prefix)"))?;

    let payload = STANDARD
        .decode(encoded)
        .map_err(|e| anyhow!("Invalid base64: {}", e))?;
    if payload.len() < NONCE_LEN {
        return Err(anyhow!("Invalid ciphertext (too short)"));
    }
    let (nonce, ciphertext) = payload.split_at(NONCE_LEN);

    let plaintext = cipher()?
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|e| anyhow!("Decryption failed (wrong machine or corrupted data): {}", e))?;

    String::from_utf8(plaintext).map_err(|e| anyhow!("Invalid UTF-8: {}", e))
}

pub fn is_encrypted(value: &str) -> bool {
    value.starts_with(ENCRYPTED_PREFIX)
}

/// Valeur en clair, qu'elle soit stockée chiffrée ou non
pub fn reveal_secret(value: &str) -> Result<String> {
    if is_encrypted(value) {
        decrypt_secret(value)
    } else {
        Ok(value.to_string())
    }
}
