//! The two cipher round trips of an editing session.
//!
//! Both sides keep a single pending slot keyed by a [`CipherToken`]. A
//! response is applied only if its token is the one in the slot; anything else
//! belongs to a request that was cancelled or superseded and is dropped.

use crate::{
    cipher::Secret,
    error::{CipherError, Error, Result, ValidationReport},
    grammar,
    model::{buffer::EditBuffer, descriptor::Selection},
    sync,
};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CipherToken(u64);

impl fmt::Display for CipherToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Hands out tokens that are unique within one session.
#[derive(Debug, Default)]
pub struct TokenSource {
    next: u64,
}

impl TokenSource {
    pub const fn issue(&mut self) -> CipherToken {
        self.next += 1;
        CipherToken(self.next)
    }
}

/// What a save will write: the record it targets and a snapshot of the form
/// taken when the save started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveDraft {
    pub selection: Selection,
    pub buffer: EditBuffer,
}

/// A draft that is ready to be persisted, together with the stored form of
/// its password (empty when there is none).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    pub draft: SaveDraft,
    pub secret: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, strum_macros::Display)]
pub enum SaveState {
    #[default]
    Idle,
    ValidatingFields,
    Invalid(ValidationReport),
    SecretPending,
    AwaitingCipher {
        token: CipherToken,
        draft: Box<SaveDraft>,
    },
    Committed,
}

/// The outcome of starting a save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveStep {
    Invalid(ValidationReport),
    /// The caller must send exactly this request to the cipher service.
    Encrypt {
        token: CipherToken,
        plaintext: Secret,
    },
    Commit(Commit),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncryptOutcome {
    /// Not the response the coordinator is waiting for.
    Stale,
    Failed(CipherError),
    Commit(Commit),
}

#[derive(Debug, Default)]
pub struct SaveCoordinator {
    state: SaveState,
}

impl SaveCoordinator {
    #[must_use]
    pub const fn state(&self) -> &SaveState {
        &self.state
    }

    #[must_use]
    pub const fn is_busy(&self) -> bool {
        matches!(self.state, SaveState::AwaitingCipher { .. })
    }

    fn transition(&mut self, state: SaveState) {
        tracing::debug!("Save: {} -> {}", self.state, state);
        self.state = state;
    }

    /// Validates the form and decides whether the save has to wait for the
    /// cipher service. Records the field verdicts on `buffer`.
    ///
    /// # Errors
    /// If a save is already waiting on the cipher service.
    pub fn begin(
        &mut self,
        selection: Selection,
        buffer: &mut EditBuffer,
        tokens: &mut TokenSource,
    ) -> Result<SaveStep> {
        if self.is_busy() {
            tracing::warn!("Rejected a save while another one is waiting on the cipher");
            return Err(Error::SaveInProgress);
        }

        self.transition(SaveState::ValidatingFields);
        if let Err(report) = sync::validate(buffer) {
            self.transition(SaveState::Invalid(report.clone()));
            return Ok(SaveStep::Invalid(report));
        }

        let draft = SaveDraft {
            selection,
            buffer: buffer.clone(),
        };

        if buffer.auth_mode.needs_credentials() && !buffer.password.is_empty() {
            self.transition(SaveState::SecretPending);
            let token = tokens.issue();
            let plaintext = Secret::new(buffer.password.clone());
            self.transition(SaveState::AwaitingCipher {
                token,
                draft: Box::new(draft),
            });
            return Ok(SaveStep::Encrypt { token, plaintext });
        }

        self.transition(SaveState::Committed);
        Ok(SaveStep::Commit(Commit {
            draft,
            secret: String::new(),
        }))
    }

    /// Takes the cipher's answer to the pending encrypt request.
    pub fn on_encrypted(
        &mut self,
        token: CipherToken,
        result: std::result::Result<String, CipherError>,
    ) -> EncryptOutcome {
        let draft = match std::mem::take(&mut self.state) {
            SaveState::AwaitingCipher {
                token: pending,
                draft,
            } if pending == token => draft,
            state => {
                tracing::debug!("Dropped encrypt response {token} while {state}");
                self.state = state;
                return EncryptOutcome::Stale;
            }
        };

        match result {
            Ok(ciphertext) => {
                let mut draft = *draft;
                draft.buffer.connection_string =
                    grammar::strip_password(&draft.buffer.connection_string);
                self.transition(SaveState::Committed);
                EncryptOutcome::Commit(Commit {
                    draft,
                    secret: ciphertext,
                })
            }
            Err(err) => {
                tracing::warn!("Save aborted: {err}");
                self.transition(SaveState::Idle);
                EncryptOutcome::Failed(err)
            }
        }
    }

    /// Forgets any pending save. A response that arrives later is stale.
    pub fn reset(&mut self) {
        if self.is_busy() {
            tracing::debug!("Cancelled a save waiting on the cipher");
        }
        self.transition(SaveState::Idle);
    }
}

/// The one-shot decrypt that runs when an existing record is selected.
#[derive(Debug, Default)]
pub struct DecryptExchange {
    pending: Option<CipherToken>,
}

impl DecryptExchange {
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Starts a decrypt for `ciphertext`, replacing any request still pending.
    /// Returns `None` when there is nothing to decrypt.
    pub fn request(&mut self, ciphertext: &str, tokens: &mut TokenSource) -> Option<CipherToken> {
        if ciphertext.is_empty() {
            self.pending = None;
            return None;
        }
        let token = tokens.issue();
        self.pending = Some(token);
        Some(token)
    }

    /// The plaintext to show, if this is the awaited response and it carries
    /// a password.
    pub fn on_decrypted(
        &mut self,
        token: CipherToken,
        result: std::result::Result<Secret, CipherError>,
    ) -> Option<Secret> {
        if self.pending != Some(token) {
            tracing::debug!("Dropped decrypt response {token}");
            return None;
        }
        self.pending = None;

        match result {
            Ok(plaintext) if !plaintext.is_empty() => Some(plaintext),
            Ok(_) => {
                tracing::debug!("Decrypt returned an empty password");
                None
            }
            Err(err) => {
                tracing::warn!("Leaving the password blank: {err}");
                None
            }
        }
    }

    pub fn cancel(&mut self) {
        if self.pending.take().is_some() {
            tracing::debug!("Cancelled a pending decrypt");
        }
    }
}
