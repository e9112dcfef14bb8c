use anyhow::Result;
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub cipher: CipherConfig,
}

/// Programs (with arguments) that encrypt and decrypt passwords.
#[derive(Debug, Default, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct CipherConfig {
    #[serde(default)]
    pub encrypt: Vec<String>,
    #[serde(default)]
    pub decrypt: Vec<String>,
}

impl TryFrom<&str> for Config {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self> {
        let config = toml::from_str(value)?;
        Ok(config)
    }
}

impl Config {
    /// # Errors
    /// If the string is not a valid config file.
    pub fn read_from_string(value: &str) -> Result<Self> {
        Self::try_from(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_parses() {
        let config = Config::read_from_string(include_str!("../assets/default-config.toml"))
            .expect("bundled config should parse");
        assert_eq!(config, Config::default());
    }

    #[test]
    fn reads_cipher_commands() {
        let config = Config::read_from_string(
            r#"
            [cipher]
            encrypt = ["vault-cli", "encrypt"]
            decrypt = ["vault-cli", "decrypt"]
            "#,
        )
        .unwrap();

        assert_eq!(config.cipher.encrypt, vec!["vault-cli", "encrypt"]);
        assert_eq!(config.cipher.decrypt, vec!["vault-cli", "decrypt"]);
    }

    #[test]
    fn missing_sections_default() {
        let config = Config::read_from_string("").unwrap();
        assert!(config.cipher.encrypt.is_empty());
    }
}
