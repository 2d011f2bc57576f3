//! Stable per-machine identifier used for license binding and hardware-bound
//! key derivation (spec component C1).
//!
//! Built only from attributes readable without elevated privileges: hostname,
//! logical CPU count, and the OS/arch platform string. None of these require
//! a MAC address lookup or vendor-specific SMBIOS access, so the fingerprint
//! works the same way in a container as on bare metal.

use sha2::{Digest, Sha256};

/// Computes a stable hex-encoded fingerprint for the current host.
pub fn generate_fingerprint() -> String {
    let hostname = hostname_best_effort();
    let cpu_count = num_cpus_best_effort();
    let platform = format!("{}-{}", std::env::consts::OS, std::env::consts::ARCH);

    let material = format!("{hostname}-{cpu_count}-{platform}");
    hex::encode(Sha256::digest(material.as_bytes()))
}

fn hostname_best_effort() -> String {
    std::env::var("HOSTNAME")
        .or_else(|_| std::env::var("COMPUTERNAME"))
        .unwrap_or_else(|_| "unknown-host".to_string())
}

fn num_cpus_best_effort() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_deterministic_within_a_process() {
        assert_eq!(generate_fingerprint(), generate_fingerprint());
    }

    #[test]
    fn fingerprint_is_a_64_char_hex_string() {
        let fp = generate_fingerprint();
        assert_eq!(fp.len(), 64);
        assert!(fp.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
