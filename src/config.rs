//! Where durable state lives. The cryptographic modules take no configuration; only the record store does.

use std::env;
use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::identity::{MAX_RSA_BITS, MIN_RSA_BITS};

/// DATA_DIR_VAR overrides the data directory
pub const DATA_DIR_VAR: &str = "COURIER_DATA_DIR";
/// RSA_BITS_VAR overrides the modulus size for newly generated keys
pub const RSA_BITS_VAR: &str = "COURIER_RSA_BITS";
/// DEFAULT_DATA_DIR is relative to the working directory
pub const DEFAULT_DATA_DIR: &str = "data";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Root for durable state. User records go under `users/`.
    pub data_dir: PathBuf,
    /// Modulus size for identity and conversation keys generated from now on
    pub rsa_bits: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            rsa_bits: MIN_RSA_BITS,
        }
    }
}

impl Config {
    /// with_data_dir keeps the default key size
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    /// from_env reads COURIER_DATA_DIR and COURIER_RSA_BITS, falling back to defaults when unset
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Some(dir) = env::var_os(DATA_DIR_VAR) {
            config.data_dir = PathBuf::from(dir);
        }
        if let Ok(bits) = env::var(RSA_BITS_VAR) {
            config.rsa_bits = parse_bits(&bits)?;
        }
        Ok(config)
    }

    /// users_dir holds one `<user_id>.json` per local user
    pub fn users_dir(&self) -> PathBuf {
        self.data_dir.join("users")
    }
}

fn parse_bits(text: &str) -> Result<usize> {
    let bits: usize = text
        .trim()
        .parse()
        .map_err(|_| Error::MalformedKey(format!("{} is not a number: {:?}", RSA_BITS_VAR, text)))?;
    if bits < MIN_RSA_BITS {
        return Err(Error::MalformedKey(format!("{} must be at least {}, got {}", RSA_BITS_VAR, MIN_RSA_BITS, bits)));
    }
    if bits > MAX_RSA_BITS {
        return Err(Error::MalformedKey(format!("{} must be at most {}, got {}", RSA_BITS_VAR, MAX_RSA_BITS, bits)));
    }
    Ok(bits)
}

/* ------------------------------------------------------------------------- */

// TESTS

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.rsa_bits, 2048);
        assert_eq!(config.users_dir(), PathBuf::from("data").join("users"));
        assert_eq!(Config::with_data_dir("/tmp/x").users_dir(), PathBuf::from("/tmp/x/users"));
    }

    #[test]
    fn bits_parsing() {
        assert_eq!(parse_bits("4096").unwrap(), 4096);
        assert_eq!(parse_bits(" 3072\n").unwrap(), 3072);
        assert!(parse_bits("1024").is_err());
        assert!(matches!(parse_bits("4160"), Err(Error::MalformedKey(_))));
        assert!(parse_bits("lots").is_err());
    }
}
