use crate::{
    cipher::Secret,
    error::{CipherError, ValidationReport},
    exchange::CipherToken,
    model::{
        buffer::FieldChange,
        descriptor::{ConnectionDescriptor, DescriptorId, Selection},
    },
};

#[derive(Debug, Clone, strum_macros::Display)]
pub enum Event {
    /// Emitted every loop iteration to give components (eg. the cipher client)
    /// an opportunity to check for and process async process results
    Tick,

    SessionOpened(Selection),
    FieldChanged(FieldChange),

    PasswordEncrypted {
        token: CipherToken,
        result: Result<String, CipherError>,
    },
    PasswordDecrypted {
        token: CipherToken,
        result: Result<Secret, CipherError>,
    },

    DescriptorCommitted(ConnectionDescriptor),
    DescriptorDeleted(DescriptorId),
    ValidationFailed(ValidationReport),
    EditorClosed,

    ErrorOccurred(String),
}
