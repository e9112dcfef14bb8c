use crate::{
    cipher::{Cipher, Secret},
    error::CipherError,
};

/// Encrypts by prefixing `ENC:`. Decrypting anything without the prefix
/// fails, as does every call once `broken` is set.
#[derive(Debug, Default)]
pub struct MockCipher {
    pub broken: bool,
}

impl Cipher for MockCipher {
    fn encrypt(&self, plaintext: &Secret) -> Result<String, CipherError> {
        if self.broken {
            return Err(CipherError::Encrypt("cipher unavailable".to_string()));
        }
        Ok(format!("ENC:{}", plaintext.expose()))
    }

    fn decrypt(&self, ciphertext: &str) -> Result<Secret, CipherError> {
        if self.broken {
            return Err(CipherError::Decrypt("cipher unavailable".to_string()));
        }
        ciphertext
            .strip_prefix("ENC:")
            .map(Secret::from)
            .ok_or_else(|| CipherError::Decrypt(format!("unknown ciphertext `{ciphertext}`")))
    }
}
