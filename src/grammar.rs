use crate::{
    error::ParseError,
    model::descriptor::{AuthMode, ConnectionDescriptor},
};
use itertools::Itertools;
use std::ops::Range;
use strum::IntoEnumIterator;
use strum_macros::EnumIter;

pub const AZURE_AD_MARKER: &str = "Active Directory Default";

/// The connection-string keys that carry descriptor fields. Anything else in a
/// string is kept as-is but never interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
pub enum Key {
    DataSource,
    UserId,
    Password,
    IntegratedSecurity,
    Authentication,
    InitialCatalog,
    ConnectTimeout,
}

impl Key {
    /// The spelling used whenever a segment for this key is written.
    #[must_use]
    pub const fn canonical(self) -> &'static str {
        match self {
            Self::DataSource => "Data Source",
            Self::UserId => "User ID",
            Self::Password => "Password",
            Self::IntegratedSecurity => "Integrated Security",
            Self::Authentication => "Authentication",
            Self::InitialCatalog => "Initial Catalog",
            Self::ConnectTimeout => "Connect Timeout",
        }
    }

    #[must_use]
    pub const fn aliases(self) -> &'static [&'static str] {
        match self {
            Self::DataSource => &["Data Source", "Server"],
            Self::UserId => &["User ID"],
            Self::Password => &["Password"],
            Self::IntegratedSecurity => &["Integrated Security", "Trusted_Connection"],
            Self::Authentication => &["Authentication"],
            Self::InitialCatalog => &["Initial Catalog", "Database"],
            Self::ConnectTimeout => &["Connection Timeout", "Connect Timeout"],
        }
    }

    /// Whether `name` is one of this key's aliases. Case and surrounding
    /// whitespace are ignored.
    #[must_use]
    pub fn matches(self, name: &str) -> bool {
        let name = name.trim();
        self.aliases()
            .iter()
            .any(|alias| alias.eq_ignore_ascii_case(name))
    }

    #[must_use]
    pub fn lookup(name: &str) -> Option<Self> {
        Self::iter().find(|key| key.matches(name))
    }
}

/// One `name=value;` piece of a connection string, located by its byte span
/// in the source text. The span covers the terminating `;` when there is one.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Segment<'a> {
    span: Range<usize>,
    name: &'a str,
    value: Option<&'a str>,
}

fn segments(text: &str) -> impl Iterator<Item = Segment<'_>> {
    let mut start = 0;
    std::iter::from_fn(move || {
        while start < text.len() {
            let rest = &text[start..];
            let (body_len, span_len) = rest
                .find(';')
                .map_or((rest.len(), rest.len()), |idx| (idx, idx + 1));
            let body = &rest[..body_len];
            let leading = body.len() - body.trim_start().len();
            let span = start + leading..start + span_len;
            start += span_len;

            if body.trim().is_empty() {
                continue;
            }

            let (name, value) = match body.split_once('=') {
                Some((name, value)) => (name, Some(value)),
                None => (body, None),
            };
            return Some(Segment { span, name, value });
        }
        None
    })
}

fn find(text: &str, key: Key) -> Option<Segment<'_>> {
    segments(text).find(|segment| segment.value.is_some() && key.matches(segment.name))
}

/// The value of the first segment for `key`, untrimmed.
#[must_use]
pub fn find_value(text: &str, key: Key) -> Option<&str> {
    find(text, key).and_then(|segment| segment.value)
}

/// Writes `key=value;` over the first existing segment for `key`, or puts it in
/// front of the string if there is none. Everything else is left untouched.
#[must_use]
pub fn upsert(text: &str, key: Key, value: &str) -> String {
    match find(text, key) {
        Some(segment) => format!(
            "{}{}={value};{}",
            &text[..segment.span.start],
            key.canonical(),
            &text[segment.span.end..]
        ),
        None => prepend(text, key, value),
    }
}

/// Puts `key=value;` in front of the string without looking for an existing
/// segment.
#[must_use]
pub fn prepend(text: &str, key: Key, value: &str) -> String {
    format!("{}={value};{text}", key.canonical())
}

/// Drops the first segment for `key`, if any.
#[must_use]
pub fn remove(text: &str, key: Key) -> String {
    match find(text, key) {
        Some(segment) => format!(
            "{}{}",
            &text[..segment.span.start],
            &text[segment.span.end..]
        ),
        None => text.to_string(),
    }
}

/// Drops every password segment. Unlike the other edits this does not stop at
/// the first match: a persisted string must never carry a password.
#[must_use]
pub fn strip_password(text: &str) -> String {
    let mut out = text.to_string();
    while find(&out, Key::Password).is_some() {
        out = remove(&out, Key::Password);
    }
    out
}

/// `Integrated Security` accepts the same truthy spellings as the SQL Server
/// client libraries.
#[must_use]
pub fn is_truthy(value: &str) -> bool {
    ["true", "yes", "sspi"]
        .iter()
        .any(|truthy| truthy.eq_ignore_ascii_case(value.trim()))
}

/// Decodes a connection string into its ordered entries.
///
/// # Errors
/// If a segment has no `=` or an empty key.
pub fn parse(text: &str) -> Result<ConnectionMap, ParseError> {
    let mut entries = vec![];

    for (index, segment) in segments(text).enumerate() {
        let Some(value) = segment.value else {
            return Err(ParseError::MissingEquals {
                index,
                segment: segment.name.trim().to_string(),
            });
        };

        let name = segment.name.trim();
        if name.is_empty() {
            return Err(ParseError::EmptyKey { index });
        }

        entries.push((name.to_string(), value.trim().to_string()));
    }

    Ok(ConnectionMap { entries })
}

/// Ordered `name=value` pairs of a connection string. Names keep the spelling
/// they were written with; lookups go through the alias table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionMap {
    entries: Vec<(String, String)>,
}

impl ConnectionMap {
    /// The canonical mapping for a descriptor's non-secret fields, auth marker
    /// first.
    #[must_use]
    pub fn from_descriptor(descriptor: &ConnectionDescriptor) -> Self {
        let mut map = Self::default();

        match descriptor.auth_mode() {
            AuthMode::Windows => map.push(Key::IntegratedSecurity, "True"),
            AuthMode::AzureAd => map.push(Key::Authentication, AZURE_AD_MARKER),
            AuthMode::Sql => {}
        }

        map.push(Key::DataSource, &descriptor.server);

        if descriptor.auth_mode().needs_credentials() && !descriptor.username.is_empty() {
            map.push(Key::UserId, &descriptor.username);
        }
        if !descriptor.database.is_empty() {
            map.push(Key::InitialCatalog, &descriptor.database);
        }
        if let Some(timeout) = descriptor.timeout_seconds {
            map.push(Key::ConnectTimeout, &timeout.to_string());
        }

        map
    }

    pub fn push(&mut self, key: Key, value: &str) {
        self.entries
            .push((key.canonical().to_string(), value.to_string()));
    }

    /// The value of the first entry for `key`.
    #[must_use]
    pub fn get(&self, key: Key) -> Option<&str> {
        self.entries
            .iter()
            .find(|(name, _)| key.matches(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Authentication wins over integrated security; with neither the string
    /// describes SQL authentication.
    #[must_use]
    pub fn auth_mode(&self) -> AuthMode {
        if self
            .get(Key::Authentication)
            .is_some_and(|value| value.to_lowercase().contains("active directory"))
        {
            AuthMode::AzureAd
        } else if self.get(Key::IntegratedSecurity).is_some_and(is_truthy) {
            AuthMode::Windows
        } else {
            AuthMode::Sql
        }
    }

    #[must_use]
    pub fn render(&self) -> String {
        self.entries
            .iter()
            .map(|(name, value)| format!("{name}={value};"))
            .join("")
    }
}
