use crate::{
    error::{Error, Result, ValidationReport},
    exchange::SaveDraft,
    grammar,
    model::{
        buffer::EditBuffer,
        descriptor::{ConnectionDescriptor, DescriptorId, Selection},
    },
    sync,
    utils::storage::Storage,
};
use std::{cell::RefCell, rc::Rc};

/// A record loaded into the form, plus the stored ciphertext that still has to
/// be decrypted before the password can be shown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selected {
    pub buffer: EditBuffer,
    pub stored_secret: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Committed {
    pub descriptor: ConnectionDescriptor,
    /// New records close the editor once saved; updates keep it open.
    pub closes_editor: bool,
}

/// Owns the set of stored descriptors. Every write goes to the store first and
/// only touches the in-memory set once the store has accepted it.
#[derive(Debug, Clone)]
pub struct DescriptorManager {
    descriptors: Rc<RefCell<Vec<ConnectionDescriptor>>>,
    storage: Rc<dyn Storage>,
}

impl DescriptorManager {
    pub fn new(descriptors: Vec<ConnectionDescriptor>, storage: Rc<dyn Storage>) -> Self {
        let descriptors = descriptors
            .into_iter()
            .map(ConnectionDescriptor::normalized)
            .collect();

        Self {
            descriptors: Rc::new(RefCell::new(descriptors)),
            storage,
        }
    }

    /// # Errors
    /// If the store cannot list its descriptors.
    pub fn load(storage: Rc<dyn Storage>) -> anyhow::Result<Self> {
        let descriptors = storage.list_descriptors()?;
        tracing::debug!("Loaded {} connections", descriptors.len());
        Ok(Self::new(descriptors, storage))
    }

    #[must_use]
    pub fn descriptors(&self) -> Vec<ConnectionDescriptor> {
        self.descriptors
            .borrow()
            .iter()
            .cloned()
            .map(ConnectionDescriptor::normalized)
            .collect()
    }

    #[must_use]
    pub fn find(&self, id: &DescriptorId) -> Option<ConnectionDescriptor> {
        self.descriptors
            .borrow()
            .iter()
            .find(|descriptor| descriptor.id() == id)
            .cloned()
            .map(ConnectionDescriptor::normalized)
    }

    /// # Errors
    /// If an existing record is selected that isn't in the set.
    pub fn select_for_edit(&self, selection: &Selection) -> Result<Selected> {
        match selection {
            Selection::New => Ok(Selected {
                buffer: EditBuffer::default(),
                stored_secret: None,
            }),
            Selection::Existing(id) => {
                let descriptor = self
                    .find(id)
                    .ok_or_else(|| Error::NotFound(id.clone()))?;
                let stored_secret =
                    Some(descriptor.password.clone()).filter(|secret| !secret.is_empty());
                Ok(Selected {
                    buffer: EditBuffer::from_descriptor(&descriptor),
                    stored_secret,
                })
            }
        }
    }

    /// # Errors
    /// With every field that blocks a save.
    pub fn validate(buffer: &mut EditBuffer) -> std::result::Result<(), ValidationReport> {
        sync::validate(buffer)
    }

    /// Writes a draft. `secret` is the password exactly as it should be
    /// stored, i.e. already encrypted.
    ///
    /// # Errors
    /// If the target record no longer exists or the store rejects the write.
    #[tracing::instrument(skip_all, fields(selection = %draft.selection))]
    pub fn commit(&self, draft: &SaveDraft, secret: String) -> Result<Committed> {
        let (mut descriptor, closes_editor) = match &draft.selection {
            Selection::New => (
                ConnectionDescriptor::new(draft.buffer.name.clone()),
                true,
            ),
            Selection::Existing(id) => (
                self.find(id)
                    .ok_or_else(|| Error::NotFound(id.clone()))?,
                false,
            ),
        };

        fill_from_buffer(&mut descriptor, &draft.buffer, secret);
        self.storage.persist(&descriptor)?;

        let mut descriptors = self.descriptors.borrow_mut();
        match descriptors.iter_mut().find(|d| d.id() == descriptor.id()) {
            Some(stored) => *stored = descriptor.clone(),
            None => descriptors.push(descriptor.clone()),
        }
        tracing::info!("Saved connection {}", descriptor.id());

        Ok(Committed {
            descriptor,
            closes_editor,
        })
    }

    /// Removes a stored record. Returns the removed id, or `None` for a
    /// record that was never saved.
    ///
    /// # Errors
    /// If the record isn't in the set or the store rejects the removal.
    pub fn delete(&self, selection: &Selection) -> Result<Option<DescriptorId>> {
        let Selection::Existing(id) = selection else {
            return Ok(None);
        };
        if self.find(id).is_none() {
            return Err(Error::NotFound(id.clone()));
        }

        self.storage.remove(id)?;
        self.descriptors
            .borrow_mut()
            .retain(|descriptor| descriptor.id() != id);
        tracing::info!("Deleted connection {id}");

        Ok(Some(id.clone()))
    }
}

fn fill_from_buffer(descriptor: &mut ConnectionDescriptor, buffer: &EditBuffer, secret: String) {
    let credentials = buffer.auth_mode.needs_credentials();

    descriptor.name.clone_from(&buffer.name);
    descriptor.server.clone_from(&buffer.server);
    descriptor.set_auth_mode(buffer.auth_mode);
    descriptor.username = if credentials {
        buffer.username.clone()
    } else {
        String::new()
    };
    descriptor.password = if credentials { secret } else { String::new() };
    descriptor.database.clone_from(&buffer.database);
    descriptor.timeout_seconds = buffer.timeout_seconds();
    descriptor.confirm_before_execute = buffer.confirm_before_execute;
    descriptor.raw_string = grammar::strip_password(&buffer.connection_string);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        model::{buffer::Field, descriptor::AuthMode},
        testing::mock_storage::MockStorage,
    };

    fn manager_with(descriptors: Vec<ConnectionDescriptor>) -> (DescriptorManager, Rc<MockStorage>) {
        let storage = Rc::new(MockStorage::with_descriptors(descriptors.clone()));
        (DescriptorManager::new(descriptors, storage.clone()), storage)
    }

    fn draft(selection: Selection, buffer: EditBuffer) -> SaveDraft {
        SaveDraft { selection, buffer }
    }

    fn filled_buffer() -> EditBuffer {
        EditBuffer {
            name: "local".to_string(),
            server: "srv".to_string(),
            username: "sa".to_string(),
            password: "plaintext".to_string(),
            timeout: "30".to_string(),
            connection_string: "Password=x;Data Source=srv;User ID=sa;Connect Timeout=30;"
                .to_string(),
            ..Default::default()
        }
    }

    fn legacy(name: &str, integrated_security: bool) -> ConnectionDescriptor {
        serde_json::from_value(serde_json::json!({
            "id": "c1k2j3",
            "name": name,
            "integratedSecurity": integrated_security,
        }))
        .unwrap()
    }

    #[test]
    fn every_read_path_normalizes() {
        let old = legacy("old", true);
        let (manager, _) = manager_with(vec![old.clone()]);

        assert!(manager.descriptors().iter().all(ConnectionDescriptor::is_normalized));
        let found = manager.find(old.id()).unwrap();
        assert!(found.is_normalized());
        assert_eq!(found.auth_mode(), AuthMode::Windows);
        assert_eq!(found.clone().normalized(), found);
    }

    #[test]
    fn select_new_gives_blank_form() {
        let (manager, _) = manager_with(vec![]);
        let selected = manager.select_for_edit(&Selection::New).unwrap();

        assert_eq!(selected.buffer, EditBuffer::default());
        assert_eq!(selected.stored_secret, None);
    }

    #[test]
    fn select_existing_hands_back_ciphertext() {
        let mut descriptor = ConnectionDescriptor::new("prod".to_string());
        descriptor.password = "c1ph3r".to_string();
        let (manager, _) = manager_with(vec![descriptor.clone()]);

        let selected = manager
            .select_for_edit(&Selection::Existing(descriptor.id().clone()))
            .unwrap();

        assert_eq!(selected.stored_secret.as_deref(), Some("c1ph3r"));
        assert_eq!(selected.buffer.password, "");
        assert_eq!(selected.buffer.name, "prod");
    }

    #[test]
    fn select_unknown_id_fails() {
        let (manager, _) = manager_with(vec![]);
        let id = DescriptorId::generate();
        assert_eq!(
            manager.select_for_edit(&Selection::Existing(id.clone())),
            Err(Error::NotFound(id))
        );
    }

    #[test]
    fn validate_delegates_to_field_rules() {
        let mut buffer = EditBuffer::default();
        let report = DescriptorManager::validate(&mut buffer).unwrap_err();
        assert_eq!(report.first_focus(), Some(Field::Name));
    }

    #[test]
    fn commit_new_assigns_id_and_strips_password() {
        let (manager, storage) = manager_with(vec![]);

        let committed = manager
            .commit(&draft(Selection::New, filled_buffer()), "ENC".to_string())
            .unwrap();

        assert!(committed.closes_editor);
        assert_eq!(committed.descriptor.password, "ENC");
        assert_eq!(committed.descriptor.timeout_seconds, Some(30));
        assert_eq!(
            committed.descriptor.raw_string,
            "Data Source=srv;User ID=sa;Connect Timeout=30;"
        );
        assert!(!committed.descriptor.id().as_str().is_empty());
        assert_eq!(manager.descriptors(), vec![committed.descriptor.clone()]);
        assert_eq!(storage.stored(), vec![committed.descriptor]);
    }

    #[test]
    fn commit_existing_updates_in_place() {
        let original = ConnectionDescriptor::new("before".to_string());
        let other = ConnectionDescriptor::new("other".to_string());
        let (manager, _) = manager_with(vec![original.clone(), other.clone()]);

        let mut buffer = filled_buffer();
        buffer.name = "after".to_string();
        let committed = manager
            .commit(
                &draft(Selection::Existing(original.id().clone()), buffer),
                "ENC".to_string(),
            )
            .unwrap();

        assert!(!committed.closes_editor);
        assert_eq!(committed.descriptor.id(), original.id());

        let names: Vec<_> = manager.descriptors().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["after", "other"]);
    }

    #[test]
    fn commit_without_credentials_stores_no_secret() {
        let (manager, _) = manager_with(vec![]);
        let mut buffer = filled_buffer();
        buffer.auth_mode = AuthMode::Windows;

        let committed = manager
            .commit(&draft(Selection::New, buffer), "ignored".to_string())
            .unwrap();

        assert_eq!(committed.descriptor.password, "");
        assert_eq!(committed.descriptor.username, "");
        assert!(committed.descriptor.integrated_security);
    }

    #[test]
    fn failed_write_leaves_set_untouched() {
        let original = ConnectionDescriptor::new("before".to_string());
        let (manager, storage) = manager_with(vec![original.clone()]);
        storage.fail_writes(true);

        let result = manager.commit(
            &draft(Selection::Existing(original.id().clone()), filled_buffer()),
            "ENC".to_string(),
        );

        assert!(matches!(result, Err(Error::Storage(_))));
        assert_eq!(manager.descriptors(), vec![original]);
    }

    #[test]
    fn delete_removes_and_ignores_new() {
        let descriptor = ConnectionDescriptor::new("gone".to_string());
        let (manager, storage) = manager_with(vec![descriptor.clone()]);

        assert_eq!(manager.delete(&Selection::New), Ok(None));
        assert_eq!(manager.descriptors().len(), 1);

        assert_eq!(
            manager.delete(&Selection::Existing(descriptor.id().clone())),
            Ok(Some(descriptor.id().clone()))
        );
        assert!(manager.descriptors().is_empty());
        assert!(storage.stored().is_empty());
    }
}
