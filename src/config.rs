//! Timing constants, SSH algorithm sets and server configuration.
//!
//! The timing values reproduce the fixed-delay behaviour automation built on
//! this service relies on: commands are given a settle window and whatever the
//! device printed in that window is the output.

use std::time::Duration;

use russh::keys::{Algorithm, EcdsaCurve, HashAlg};
use russh::{cipher, compression, kex, mac};

use crate::session::ConnectionSecurityOptions;

pub const DEFAULT_SSH_PORT: u16 = 22;
pub const DEFAULT_TELNET_PORT: u16 = 23;

/// Connect timeout used when a request does not carry one.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Wait between writing a command and draining its output.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(1);

/// Wait after each step of the `enable` exchange.
pub const ENABLE_STEP_DELAY: Duration = Duration::from_millis(500);

/// How long Telnet escalation waits for the `Password:` prompt.
pub const ENABLE_PROMPT_TIMEOUT: Duration = Duration::from_secs(3);

/// How long Telnet login waits for each of `login:` and `Password:`.
pub const LOGIN_PROMPT_TIMEOUT: Duration = Duration::from_secs(5);

/// Banner wait after the SSH shell is opened.
pub const SSH_BANNER_DELAY: Duration = Duration::from_secs(1);

/// Banner wait after Telnet credentials have been written.
pub const TELNET_BANNER_DELAY: Duration = Duration::from_secs(2);

/// Pause between drain polls; draining stops after a poll that yields nothing.
pub const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

pub const READ_CHUNK_SIZE: usize = 65535;

/// Devices handled concurrently by one batch request.
pub const DEFAULT_BATCH_PARALLEL: usize = 4;

pub const DEFAULT_BIND: &str = "0.0.0.0";
pub const DEFAULT_HTTP_PORT: u16 = 5000;

/// Modern key exchange only.
pub const SECURE_KEX_ORDER: &[kex::Name] = &[
    kex::CURVE25519,
    kex::CURVE25519_PRE_RFC_8731,
    kex::ECDH_SHA2_NISTP256,
    kex::ECDH_SHA2_NISTP384,
    kex::ECDH_SHA2_NISTP521,
    kex::DH_G16_SHA512,
    kex::DH_G14_SHA256,
];

pub const BALANCED_KEX_ORDER: &[kex::Name] = &[
    kex::CURVE25519,
    kex::CURVE25519_PRE_RFC_8731,
    kex::ECDH_SHA2_NISTP256,
    kex::ECDH_SHA2_NISTP384,
    kex::DH_GEX_SHA256,
    kex::DH_G14_SHA256,
    kex::DH_G14_SHA1,
];

/// Includes SHA-1 group exchanges still shipped on older switch firmware.
pub const LEGACY_KEX_ORDER: &[kex::Name] = &[
    kex::CURVE25519,
    kex::ECDH_SHA2_NISTP256,
    kex::DH_GEX_SHA256,
    kex::DH_G14_SHA256,
    kex::DH_GEX_SHA1,
    kex::DH_G14_SHA1,
    kex::DH_G1_SHA1,
];

pub const SECURE_CIPHERS: &[cipher::Name] = &[
    cipher::CHACHA20_POLY1305,
    cipher::AES_256_GCM,
    cipher::AES_256_CTR,
    cipher::AES_192_CTR,
    cipher::AES_128_CTR,
];

pub const BALANCED_CIPHERS: &[cipher::Name] = &[
    cipher::CHACHA20_POLY1305,
    cipher::AES_256_GCM,
    cipher::AES_256_CTR,
    cipher::AES_192_CTR,
    cipher::AES_128_CTR,
    cipher::AES_256_CBC,
];

pub const LEGACY_CIPHERS: &[cipher::Name] = &[
    cipher::AES_128_CTR,
    cipher::AES_192_CTR,
    cipher::AES_256_CTR,
    cipher::AES_256_GCM,
    cipher::CHACHA20_POLY1305,
    cipher::AES_128_CBC,
    cipher::AES_192_CBC,
    cipher::AES_256_CBC,
];

pub const SECURE_MAC_ALGORITHMS: &[mac::Name] = &[
    mac::HMAC_SHA512_ETM,
    mac::HMAC_SHA256_ETM,
    mac::HMAC_SHA512,
    mac::HMAC_SHA256,
];

pub const BALANCED_MAC_ALGORITHMS: &[mac::Name] = &[
    mac::HMAC_SHA512_ETM,
    mac::HMAC_SHA256_ETM,
    mac::HMAC_SHA512,
    mac::HMAC_SHA256,
    mac::HMAC_SHA1,
];

pub const LEGACY_MAC_ALGORITHMS: &[mac::Name] = &[
    mac::HMAC_SHA256,
    mac::HMAC_SHA512,
    mac::HMAC_SHA1,
    mac::HMAC_SHA256_ETM,
    mac::HMAC_SHA512_ETM,
    mac::HMAC_SHA1_ETM,
];

pub const DEFAULT_COMPRESSION_ALGORITHMS: &[compression::Name] = &[
    compression::NONE,
    compression::ZLIB,
    compression::ZLIB_LEGACY,
];

pub const SECURE_KEY_TYPES: &[Algorithm] = &[
    Algorithm::Ed25519,
    Algorithm::Ecdsa {
        curve: EcdsaCurve::NistP256,
    },
    Algorithm::Ecdsa {
        curve: EcdsaCurve::NistP384,
    },
    Algorithm::Rsa {
        hash: Some(HashAlg::Sha512),
    },
    Algorithm::Rsa {
        hash: Some(HashAlg::Sha256),
    },
];

pub const BALANCED_KEY_TYPES: &[Algorithm] = &[
    Algorithm::Ed25519,
    Algorithm::Ecdsa {
        curve: EcdsaCurve::NistP256,
    },
    Algorithm::Ecdsa {
        curve: EcdsaCurve::NistP384,
    },
    Algorithm::Ecdsa {
        curve: EcdsaCurve::NistP521,
    },
    Algorithm::Rsa {
        hash: Some(HashAlg::Sha512),
    },
    Algorithm::Rsa {
        hash: Some(HashAlg::Sha256),
    },
    Algorithm::Rsa { hash: None },
];

/// Plain `ssh-rsa` and DSA host keys are common on optical transport nodes.
pub const LEGACY_KEY_TYPES: &[Algorithm] = &[
    Algorithm::Ed25519,
    Algorithm::Ecdsa {
        curve: EcdsaCurve::NistP256,
    },
    Algorithm::Ecdsa {
        curve: EcdsaCurve::NistP384,
    },
    Algorithm::Ecdsa {
        curve: EcdsaCurve::NistP521,
    },
    Algorithm::Rsa {
        hash: Some(HashAlg::Sha512),
    },
    Algorithm::Rsa {
        hash: Some(HashAlg::Sha256),
    },
    Algorithm::Rsa { hash: None },
    Algorithm::Dsa,
];

/// Runtime settings for the HTTP server and the executor behind it.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
    /// Upper bound on devices connected at once during a batch.
    pub batch_parallel: usize,
    pub settle_delay: Duration,
    pub security: ConnectionSecurityOptions,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            port: DEFAULT_HTTP_PORT,
            batch_parallel: DEFAULT_BATCH_PARALLEL,
            settle_delay: DEFAULT_SETTLE_DELAY,
            security: ConnectionSecurityOptions::default(),
        }
    }
}

impl ServerConfig {
    /// `host:port` string suitable for `TcpListener::bind`.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_server_config_listens_on_5000() {
        let config = ServerConfig::default();
        assert_eq!(config.listen_addr(), "0.0.0.0:5000");
        assert_eq!(config.batch_parallel, DEFAULT_BATCH_PARALLEL);
        assert_eq!(config.settle_delay, Duration::from_secs(1));
    }

    #[test]
    fn legacy_sets_are_supersets_of_old_firmware_needs() {
        assert!(LEGACY_KEX_ORDER.contains(&kex::DH_G1_SHA1));
        assert!(LEGACY_CIPHERS.contains(&cipher::AES_128_CBC));
        assert!(LEGACY_KEY_TYPES.contains(&Algorithm::Dsa));
        assert!(!SECURE_KEX_ORDER.contains(&kex::DH_G1_SHA1));
    }
}
