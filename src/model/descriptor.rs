use serde::{Deserialize, Deserializer, Serialize};
use std::{convert::Infallible, fmt, str::FromStr};
use strum_macros::{Display, EnumIter, EnumString};
use uuid::Uuid;

#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    Deserialize,
    Serialize,
    Display,
    EnumIter,
    EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum AuthMode {
    #[default]
    Sql,
    Windows,
    AzureAd,
}

impl AuthMode {
    /// Only SQL authentication takes a user name and password.
    #[must_use]
    pub const fn needs_credentials(self) -> bool {
        matches!(self, Self::Sql)
    }

    /// Records written before auth modes existed only carried a boolean.
    #[must_use]
    pub const fn from_legacy(integrated_security: bool) -> Self {
        if integrated_security {
            Self::Windows
        } else {
            Self::Sql
        }
    }
}

/// Identifies a stored record. Opaque: files written by older tools use short
/// generated strings, new records get a UUID.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(transparent)]
pub struct DescriptorId(String);

impl DescriptorId {
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DescriptorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for DescriptorId {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<&str> for DescriptorId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Which record an editing session works on. `new` is reserved for a record
/// that doesn't exist yet.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Selection {
    #[default]
    New,
    Existing(DescriptorId),
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::New => write!(f, "new"),
            Self::Existing(id) => write!(f, "{id}"),
        }
    }
}

impl FromStr for Selection {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "new" {
            Ok(Self::New)
        } else {
            Ok(Self::Existing(DescriptorId::from(s)))
        }
    }
}

impl From<DescriptorId> for Selection {
    fn from(id: DescriptorId) -> Self {
        Self::Existing(id)
    }
}

/// Older files store the timeout as whatever the form held: a number, a
/// numeric string, or an empty string.
fn timeout_from_any<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Stored {
        Number(u32),
        Text(String),
    }

    let seconds = match Option::<Stored>::deserialize(deserializer)? {
        Some(Stored::Number(seconds)) => Some(seconds),
        Some(Stored::Text(text)) => text.trim().parse().ok(),
        None => None,
    };
    Ok(seconds.filter(|seconds| *seconds > 0))
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionDescriptor {
    #[serde(default = "DescriptorId::generate")]
    id: DescriptorId,
    pub name: String,
    #[serde(default)]
    pub server: String,

    /// Missing on records from before auth modes; see [`Self::normalize`].
    #[serde(default, alias = "authType", skip_serializing_if = "Option::is_none")]
    auth_mode: Option<AuthMode>,

    /// Still written so that older readers see the right mode.
    #[serde(default)]
    pub integrated_security: bool,

    #[serde(default)]
    pub username: String,

    /// Ciphertext once persisted.
    #[serde(default)]
    pub password: String,

    #[serde(default)]
    pub database: String,
    #[serde(
        default,
        alias = "timeout",
        deserialize_with = "timeout_from_any",
        skip_serializing_if = "Option::is_none"
    )]
    pub timeout_seconds: Option<u32>,
    #[serde(default, alias = "confirmSql")]
    pub confirm_before_execute: bool,

    /// Never contains a password segment once persisted.
    #[serde(default, alias = "raw")]
    pub raw_string: String,
}

impl ConnectionDescriptor {
    #[must_use]
    pub fn new(name: String) -> Self {
        Self {
            id: DescriptorId::generate(),
            name,
            auth_mode: Some(AuthMode::default()),
            ..Default::default()
        }
    }

    #[must_use]
    pub const fn id(&self) -> &DescriptorId {
        &self.id
    }

    /// The stored mode, or the one implied by the legacy flag.
    #[must_use]
    pub const fn auth_mode(&self) -> AuthMode {
        match self.auth_mode {
            Some(mode) => mode,
            None => AuthMode::from_legacy(self.integrated_security),
        }
    }

    pub const fn set_auth_mode(&mut self, mode: AuthMode) {
        self.auth_mode = Some(mode);
        self.integrated_security = matches!(mode, AuthMode::Windows);
    }

    #[must_use]
    pub const fn is_normalized(&self) -> bool {
        self.auth_mode.is_some()
    }

    /// Fills in the auth mode of a legacy record. Does nothing to a record that
    /// already has one.
    pub const fn normalize(&mut self) {
        if self.auth_mode.is_none() {
            self.auth_mode = Some(AuthMode::from_legacy(self.integrated_security));
        }
    }

    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.normalize();
        self
    }
}
