use crate::{config::CipherConfig, error::CipherError};
use std::{
    fmt::Debug,
    io::Write,
    process::{Command, Stdio},
};

/// A plaintext password. Kept out of `Debug` output so that signals can be
/// logged freely.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    #[must_use]
    pub const fn new(plaintext: String) -> Self {
        Self(plaintext)
    }

    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Secret(******)")
    }
}

impl From<&str> for Secret {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Turns passwords into something that can be stored, and back. Calls may
/// block; the cipher client runs them off the session's thread.
pub trait Cipher: Debug + Send + Sync {
    /// # Errors
    /// If the service could not encrypt the input.
    fn encrypt(&self, plaintext: &Secret) -> Result<String, CipherError>;

    /// # Errors
    /// If the service could not decrypt the input.
    fn decrypt(&self, ciphertext: &str) -> Result<Secret, CipherError>;
}

/// A cipher backed by external programs. Each call runs the configured
/// command, writes the input to its stdin and reads the result from stdout.
#[derive(Debug, Clone, Default)]
pub struct CommandCipher {
    encrypt: Vec<String>,
    decrypt: Vec<String>,
}

impl CommandCipher {
    #[must_use]
    pub fn from_config(config: &CipherConfig) -> Self {
        Self {
            encrypt: config.encrypt.clone(),
            decrypt: config.decrypt.clone(),
        }
    }

    fn run(argv: &[String], input: &str) -> Result<String, String> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| "no command configured".to_string())?;

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|err| format!("could not start `{program}`: {err}"))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(input.as_bytes())
                .map_err(|err| format!("could not write to `{program}`: {err}"))?;
        }

        let output = child
            .wait_with_output()
            .map_err(|err| format!("`{program}` did not finish: {err}"))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(format!("`{program}` failed: {}", stderr.trim()));
        }

        let stdout = String::from_utf8(output.stdout)
            .map_err(|_| format!("`{program}` wrote something that isn't UTF-8"))?;
        Ok(stdout.trim_end_matches(['\r', '\n']).to_string())
    }
}

impl Cipher for CommandCipher {
    fn encrypt(&self, plaintext: &Secret) -> Result<String, CipherError> {
        Self::run(&self.encrypt, plaintext.expose()).map_err(CipherError::Encrypt)
    }

    fn decrypt(&self, ciphertext: &str) -> Result<Secret, CipherError> {
        Self::run(&self.decrypt, ciphertext)
            .map(Secret::new)
            .map_err(CipherError::Decrypt)
    }
}
