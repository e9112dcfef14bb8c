use crate::{cipher::Secret, exchange::CipherToken};

#[derive(Debug, Clone, strum_macros::Display)]
pub enum CipherAction {
    Encrypt {
        token: CipherToken,
        plaintext: Secret,
    },
    Decrypt {
        token: CipherToken,
        ciphertext: String,
    },
}

#[derive(Debug, Clone, strum_macros::Display)]
enum Action {
    CipherAction(CipherAction),
}

#[derive(Debug, Clone)]
pub struct Message(Action);

impl Message {
    #[must_use]
    pub const fn to_cipher(action: CipherAction) -> Self {
        Self(Action::CipherAction(action))
    }

    #[must_use]
    pub const fn read_as_cipher(&self) -> Option<&CipherAction> {
        let Action::CipherAction(action) = &self.0;
        Some(action)
    }
}

impl std::fmt::Display for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
