use super::*;

/// Security level used for SSH algorithm selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityLevel {
    /// Strict modern algorithms.
    Secure,
    /// Good security with broader compatibility.
    Balanced,
    /// Maximum compatibility with legacy devices (default).
    LegacyCompatible,
}

impl std::str::FromStr for SecurityLevel {
    type Err = ExecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "secure" => Ok(SecurityLevel::Secure),
            "balanced" => Ok(SecurityLevel::Balanced),
            "legacy" | "legacy_compatible" => Ok(SecurityLevel::LegacyCompatible),
            other => Err(ExecError::validation(format!(
                "unknown security level '{other}'"
            ))),
        }
    }
}

/// Connection security options for SSH establishment.
///
/// The default accepts any host key and offers legacy algorithms. Every
/// connect made without host key verification logs a warning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSecurityOptions {
    /// SSH algorithm policy.
    pub level: SecurityLevel,
    /// Server host key verification method.
    pub server_check: ServerCheckMethod,
}

impl Default for ConnectionSecurityOptions {
    fn default() -> Self {
        Self::legacy_compatible()
    }
}

impl ConnectionSecurityOptions {
    /// Modern algorithms, host key checked against `~/.ssh/known_hosts`.
    pub fn secure_default() -> Self {
        Self {
            level: SecurityLevel::Secure,
            server_check: ServerCheckMethod::DefaultKnownHostsFile,
        }
    }

    /// Balanced profile for mixed environments.
    pub fn balanced() -> Self {
        Self {
            level: SecurityLevel::Balanced,
            server_check: ServerCheckMethod::DefaultKnownHostsFile,
        }
    }

    /// Legacy compatibility profile; host keys are not verified.
    pub fn legacy_compatible() -> Self {
        Self {
            level: SecurityLevel::LegacyCompatible,
            server_check: ServerCheckMethod::NoCheck,
        }
    }

    /// Profile for `level`, with host key verification switched on or off.
    pub fn with_level(level: SecurityLevel, verify_host_keys: bool) -> Self {
        let server_check = if verify_host_keys {
            ServerCheckMethod::DefaultKnownHostsFile
        } else {
            ServerCheckMethod::NoCheck
        };
        Self {
            level,
            server_check,
        }
    }

    pub fn verifies_host_keys(&self) -> bool {
        !matches!(self.server_check, ServerCheckMethod::NoCheck)
    }

    pub(super) fn preferred(&self) -> Preferred {
        match self.level {
            SecurityLevel::Secure => Preferred {
                kex: Cow::Borrowed(config::SECURE_KEX_ORDER),
                key: Cow::Borrowed(config::SECURE_KEY_TYPES),
                cipher: Cow::Borrowed(config::SECURE_CIPHERS),
                mac: Cow::Borrowed(config::SECURE_MAC_ALGORITHMS),
                compression: Cow::Borrowed(config::DEFAULT_COMPRESSION_ALGORITHMS),
            },
            SecurityLevel::Balanced => Preferred {
                kex: Cow::Borrowed(config::BALANCED_KEX_ORDER),
                key: Cow::Borrowed(config::BALANCED_KEY_TYPES),
                cipher: Cow::Borrowed(config::BALANCED_CIPHERS),
                mac: Cow::Borrowed(config::BALANCED_MAC_ALGORITHMS),
                compression: Cow::Borrowed(config::DEFAULT_COMPRESSION_ALGORITHMS),
            },
            SecurityLevel::LegacyCompatible => Preferred {
                kex: Cow::Borrowed(config::LEGACY_KEX_ORDER),
                key: Cow::Borrowed(config::LEGACY_KEY_TYPES),
                cipher: Cow::Borrowed(config::LEGACY_CIPHERS),
                mac: Cow::Borrowed(config::LEGACY_MAC_ALGORITHMS),
                compression: Cow::Borrowed(config::DEFAULT_COMPRESSION_ALGORITHMS),
            },
        }
    }
}
