//! Keeps the structured fields of an [`EditBuffer`] and its connection string
//! in step.
//!
//! Propagation only ever runs one way per edit: a structured field does a
//! single targeted rewrite of the string, and a string edit re-derives every
//! structured field without touching the string again.

use crate::{
    error::{FieldError, ParseError, ValidationReport},
    grammar::{self, Key, AZURE_AD_MARKER},
    model::{
        buffer::{EditBuffer, Field, FieldChange, Validity},
        descriptor::AuthMode,
    },
};
use strum::IntoEnumIterator;

/// Applies one edit to the buffer and propagates it.
///
/// # Errors
/// If the edit is a connection string that doesn't parse. The string is
/// still stored (and flagged invalid); every other field keeps its value.
#[tracing::instrument(skip_all, fields(field = %change.field()))]
pub fn apply(buffer: &mut EditBuffer, change: FieldChange) -> Result<(), ParseError> {
    let field = change.field();

    match change {
        FieldChange::Name(name) => buffer.name = name,
        FieldChange::Server(server) => {
            buffer.connection_string =
                grammar::upsert(&buffer.connection_string, Key::DataSource, &server);
            buffer.server = server;
        }
        FieldChange::Username(username) => {
            buffer.connection_string =
                grammar::upsert(&buffer.connection_string, Key::UserId, &username);
            buffer.username = username;
        }
        // never written to the string
        FieldChange::Password(password) => buffer.password = password,
        FieldChange::Database(database) => {
            buffer.connection_string =
                upsert_or_remove(&buffer.connection_string, Key::InitialCatalog, &database);
            buffer.database = database;
        }
        FieldChange::Timeout(timeout) => {
            buffer.connection_string =
                upsert_or_remove(&buffer.connection_string, Key::ConnectTimeout, &timeout);
            buffer.timeout = timeout;
        }
        FieldChange::AuthMode(mode) => set_auth_mode(buffer, mode),
        FieldChange::ConfirmBeforeExecute(confirm) => buffer.confirm_before_execute = confirm,
        FieldChange::ConnectionString(text) => return reparse(buffer, text),
    }

    revalidate(buffer, field);
    Ok(())
}

/// An empty value removes the segment rather than writing `Key=;`.
fn upsert_or_remove(text: &str, key: Key, value: &str) -> String {
    if value.is_empty() {
        grammar::remove(text, key)
    } else {
        grammar::upsert(text, key, value)
    }
}

fn set_auth_mode(buffer: &mut EditBuffer, mode: AuthMode) {
    let text = grammar::remove(&buffer.connection_string, Key::IntegratedSecurity);
    let text = grammar::remove(&text, Key::Authentication);

    buffer.connection_string = match mode {
        AuthMode::Windows => grammar::prepend(&text, Key::IntegratedSecurity, "True"),
        AuthMode::AzureAd => grammar::prepend(&text, Key::Authentication, AZURE_AD_MARKER),
        AuthMode::Sql => text,
    };
    buffer.auth_mode = mode;

    buffer.set_validity(Field::Username, Validity::Unchecked);
    buffer.set_validity(Field::Password, Validity::Unchecked);
}

fn reparse(buffer: &mut EditBuffer, text: String) -> Result<(), ParseError> {
    buffer.connection_string = text;

    if buffer.connection_string.trim().is_empty() {
        buffer.set_validity(Field::ConnectionString, Validity::Unchecked);
        return Ok(());
    }

    let map = match grammar::parse(&buffer.connection_string) {
        Ok(map) => map,
        Err(err) => {
            tracing::debug!("Connection string did not parse: {err}");
            buffer.set_validity(Field::ConnectionString, Validity::Invalid);
            return Err(err);
        }
    };
    buffer.set_validity(Field::ConnectionString, Validity::Valid);

    let value = |key| map.get(key).unwrap_or_default().to_string();

    buffer.server = value(Key::DataSource);
    if buffer.name.is_empty() {
        buffer.name.clone_from(&buffer.server);
    }
    buffer.username = value(Key::UserId);
    if let Some(password) = map.get(Key::Password) {
        buffer.password = password.to_string();
    }
    buffer.database = value(Key::InitialCatalog);
    buffer.timeout = value(Key::ConnectTimeout);

    let mode = map.auth_mode();
    if mode != buffer.auth_mode {
        buffer.auth_mode = mode;
        buffer.set_validity(Field::Username, Validity::Unchecked);
        buffer.set_validity(Field::Password, Validity::Unchecked);
    }

    // fields the user has already been shown a verdict for get a fresh one
    for field in Field::iter() {
        if buffer.validity(field) != Validity::Unchecked && field != Field::ConnectionString {
            revalidate(buffer, field);
        }
    }

    Ok(())
}

/// Why `field` currently blocks a save, if it does. Disabled fields never do.
#[must_use]
pub fn field_error(buffer: &EditBuffer, field: Field) -> Option<&'static str> {
    if !buffer.is_enabled(field) {
        return None;
    }

    match field {
        Field::Name if buffer.name.trim().is_empty() => Some("a name is required"),
        Field::Server if buffer.server.trim().is_empty() => Some("a server is required"),
        Field::Username if buffer.username.is_empty() => {
            Some("a user name is required for SQL authentication")
        }
        Field::Password if buffer.password.is_empty() => {
            Some("a password is required for SQL authentication")
        }
        Field::Timeout
            if !buffer.timeout.trim().is_empty() && buffer.timeout_seconds().is_none() =>
        {
            Some("the timeout must be a positive whole number of seconds")
        }
        _ => None,
    }
}

fn revalidate(buffer: &mut EditBuffer, field: Field) {
    let validity = match field {
        Field::AuthMode | Field::ConfirmBeforeExecute | Field::ConnectionString => return,
        _ if !buffer.is_enabled(field) => Validity::Unchecked,
        _ if field_error(buffer, field).is_some() => Validity::Invalid,
        _ => Validity::Valid,
    };
    buffer.set_validity(field, validity);
}

/// Checks every enabled field and records the verdicts on the buffer. The
/// connection string is not part of this: a string that fails to parse
/// doesn't block saving the structured fields.
///
/// # Errors
/// With every failing field, in form order.
pub fn validate(buffer: &mut EditBuffer) -> Result<(), ValidationReport> {
    let mut errors = vec![];

    for field in Field::iter().filter(|field| *field != Field::ConnectionString) {
        revalidate(buffer, field);
        if let Some(reason) = field_error(buffer, field) {
            errors.push(FieldError { field, reason });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidationReport { errors })
    }
}
