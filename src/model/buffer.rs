use super::descriptor::{AuthMode, ConnectionDescriptor};
use crate::grammar;
use std::collections::HashMap;
use strum_macros::{Display, EnumIter};

/// The editable fields of a connection, in form order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum Field {
    Name,
    Server,
    AuthMode,
    Username,
    Password,
    ConnectionString,
    Database,
    Timeout,
    ConfirmBeforeExecute,
}

/// A single edit coming from the form.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum FieldChange {
    Name(String),
    Server(String),
    AuthMode(AuthMode),
    Username(String),
    Password(String),
    ConnectionString(String),
    Database(String),
    Timeout(String),
    ConfirmBeforeExecute(bool),
}

impl FieldChange {
    #[must_use]
    pub const fn field(&self) -> Field {
        match self {
            Self::Name(_) => Field::Name,
            Self::Server(_) => Field::Server,
            Self::AuthMode(_) => Field::AuthMode,
            Self::Username(_) => Field::Username,
            Self::Password(_) => Field::Password,
            Self::ConnectionString(_) => Field::ConnectionString,
            Self::Database(_) => Field::Database,
            Self::Timeout(_) => Field::Timeout,
            Self::ConfirmBeforeExecute(_) => Field::ConfirmBeforeExecute,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Validity {
    #[default]
    Unchecked,
    Valid,
    Invalid,
}

/// The form's current values. The timeout is kept as typed so that a
/// non-numeric entry can be flagged instead of lost.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditBuffer {
    pub name: String,
    pub server: String,
    pub auth_mode: AuthMode,
    pub username: String,
    pub password: String,
    pub connection_string: String,
    pub database: String,
    pub timeout: String,
    pub confirm_before_execute: bool,

    pub(crate) validity: HashMap<Field, Validity>,
}

impl EditBuffer {
    /// Loads a stored record for editing. The password stays blank until the
    /// stored ciphertext has been decrypted.
    #[must_use]
    pub fn from_descriptor(descriptor: &ConnectionDescriptor) -> Self {
        Self {
            name: descriptor.name.clone(),
            server: descriptor.server.clone(),
            auth_mode: descriptor.auth_mode(),
            username: descriptor.username.clone(),
            password: String::new(),
            connection_string: grammar::strip_password(&descriptor.raw_string),
            database: descriptor.database.clone(),
            timeout: descriptor
                .timeout_seconds
                .map(|timeout| timeout.to_string())
                .unwrap_or_default(),
            confirm_before_execute: descriptor.confirm_before_execute,
            validity: HashMap::new(),
        }
    }

    #[must_use]
    pub fn validity(&self, field: Field) -> Validity {
        self.validity.get(&field).copied().unwrap_or_default()
    }

    pub fn set_validity(&mut self, field: Field, validity: Validity) {
        self.validity.insert(field, validity);
    }

    /// Credentials are disabled unless the mode needs them.
    #[must_use]
    pub const fn is_enabled(&self, field: Field) -> bool {
        match field {
            Field::Username | Field::Password => self.auth_mode.needs_credentials(),
            _ => true,
        }
    }

    /// The timeout as a number of seconds, if one was entered.
    #[must_use]
    pub fn timeout_seconds(&self) -> Option<u32> {
        self.timeout.trim().parse().ok().filter(|seconds| *seconds > 0)
    }
}
