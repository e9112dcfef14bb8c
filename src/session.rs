use crate::{
    cipher::Secret,
    component::Component,
    error::{CipherError, Error},
    exchange::{
        CipherToken, Commit, DecryptExchange, EncryptOutcome, SaveCoordinator, SaveStep,
        TokenSource,
    },
    grammar::{self, Key},
    manager::{Committed, DescriptorManager},
    model::{
        buffer::{EditBuffer, Field, FieldChange, Validity},
        descriptor::Selection,
    },
    sync,
    system::{
        command::Command,
        event::Event,
        message::{CipherAction, Message},
        signal::SignalQueue,
    },
};

/// What the presentation layer needs to draw the form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionView {
    pub selection: Selection,
    pub buffer: EditBuffer,
    pub string_validity: Validity,
    pub can_save: bool,
    pub can_delete: bool,
    pub busy: bool,
}

/// One open editor: the record being edited, its form, and the two cipher
/// exchanges that may be in flight for it.
#[derive(Debug)]
pub struct EditSession {
    manager: DescriptorManager,
    selection: Selection,
    open: bool,
    buffer: EditBuffer,
    save: SaveCoordinator,
    decrypt: DecryptExchange,
    tokens: TokenSource,
}

impl EditSession {
    #[must_use]
    pub fn new(manager: DescriptorManager) -> Self {
        Self {
            manager,
            selection: Selection::New,
            open: false,
            buffer: EditBuffer::default(),
            save: SaveCoordinator::default(),
            decrypt: DecryptExchange::default(),
            tokens: TokenSource::default(),
        }
    }

    #[must_use]
    pub const fn manager(&self) -> &DescriptorManager {
        &self.manager
    }

    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.open
    }

    /// True while either cipher exchange is waiting for a response.
    #[must_use]
    pub const fn is_waiting(&self) -> bool {
        self.save.is_busy() || self.decrypt.is_pending()
    }

    /// `busy` covers both exchanges; saving and deleting are only blocked by a
    /// pending save.
    #[must_use]
    pub fn view(&self) -> SessionView {
        let saving = self.save.is_busy();
        SessionView {
            selection: self.selection.clone(),
            buffer: self.buffer.clone(),
            string_validity: self.buffer.validity(Field::ConnectionString),
            can_save: self.open && !saving,
            can_delete: self.open && !saving && matches!(self.selection, Selection::Existing(_)),
            busy: self.is_waiting(),
        }
    }

    #[tracing::instrument(skip(self, queue))]
    fn open_session(&mut self, selection: Selection, queue: &mut SignalQueue) {
        let selected = match self.manager.select_for_edit(&selection) {
            Ok(selected) => selected,
            Err(err) => {
                tracing::warn!("Could not open connection: {err}");
                queue.push(Event::ErrorOccurred(err.to_string()));
                return;
            }
        };

        self.save.reset();
        self.decrypt.cancel();
        self.selection = selection;
        self.buffer = selected.buffer;
        self.open = true;

        if let Some(ciphertext) = selected.stored_secret {
            if let Some(token) = self.decrypt.request(&ciphertext, &mut self.tokens) {
                tracing::debug!("Requesting decrypt {token}");
                queue.push(Message::to_cipher(CipherAction::Decrypt { token, ciphertext }));
            }
        }
    }

    fn change_field(&mut self, change: &FieldChange) {
        if let Err(err) = sync::apply(&mut self.buffer, change.clone()) {
            tracing::debug!("Kept an unparseable connection string: {err}");
            return;
        }

        // a password that was actually applied wins over the stored one
        let overwrote_password = match change {
            FieldChange::Password(_) => true,
            FieldChange::ConnectionString(text) => {
                grammar::find_value(text, Key::Password).is_some()
            }
            _ => false,
        };
        if overwrote_password {
            self.decrypt.cancel();
        }
    }

    fn start_save(&mut self, queue: &mut SignalQueue) {
        match self
            .save
            .begin(self.selection.clone(), &mut self.buffer, &mut self.tokens)
        {
            Ok(SaveStep::Invalid(report)) => queue.push(Event::ValidationFailed(report)),
            Ok(SaveStep::Encrypt { token, plaintext }) => {
                tracing::debug!("Requesting encrypt {token}");
                queue.push(Message::to_cipher(CipherAction::Encrypt { token, plaintext }));
            }
            Ok(SaveStep::Commit(commit)) => self.commit(commit, queue),
            Err(err) => queue.push(Event::ErrorOccurred(err.to_string())),
        }
    }

    fn on_encrypted(
        &mut self,
        token: CipherToken,
        result: Result<String, CipherError>,
        queue: &mut SignalQueue,
    ) {
        match self.save.on_encrypted(token, result) {
            EncryptOutcome::Stale => {}
            EncryptOutcome::Failed(err) => {
                queue.push(Event::ErrorOccurred(Error::from(err).to_string()));
            }
            EncryptOutcome::Commit(commit) => self.commit(commit, queue),
        }
    }

    fn on_decrypted(&mut self, token: CipherToken, result: Result<Secret, CipherError>) {
        if let Some(plaintext) = self.decrypt.on_decrypted(token, result) {
            self.buffer.password = plaintext.into_inner();
        }
    }

    fn commit(&mut self, commit: Commit, queue: &mut SignalQueue) {
        let Commit { draft, secret } = commit;

        match self.manager.commit(&draft, secret) {
            Ok(Committed {
                descriptor,
                closes_editor,
            }) => {
                self.selection = Selection::Existing(descriptor.id().clone());
                queue.push(Event::DescriptorCommitted(descriptor));

                if closes_editor {
                    self.close(queue);
                } else {
                    // keeps anything typed while the cipher was busy
                    self.buffer.connection_string =
                        grammar::strip_password(&self.buffer.connection_string);
                }
            }
            Err(err) => {
                tracing::error!("Save failed: {err}");
                self.save.reset();
                queue.push(Event::ErrorOccurred(err.to_string()));
            }
        }
    }

    fn delete(&mut self, queue: &mut SignalQueue) {
        if self.save.is_busy() {
            queue.push(Event::ErrorOccurred(Error::SaveInProgress.to_string()));
            return;
        }

        match self.manager.delete(&self.selection) {
            Ok(Some(id)) => {
                self.decrypt.cancel();
                self.save.reset();
                self.selection = Selection::New;
                self.buffer = EditBuffer::default();
                queue.push(Event::DescriptorDeleted(id));
            }
            Ok(None) => {}
            Err(err) => queue.push(Event::ErrorOccurred(err.to_string())),
        }
    }

    fn close(&mut self, queue: &mut SignalQueue) {
        self.decrypt.cancel();
        self.save.reset();
        self.selection = Selection::New;
        self.buffer = EditBuffer::default();
        self.open = false;
        queue.push(Event::EditorClosed);
    }
}

impl Component for EditSession {
    fn handle_command(&mut self, command: &Command, queue: &mut SignalQueue) {
        if !self.open {
            tracing::debug!("Ignored {command} on a closed session");
            return;
        }

        match command {
            Command::Save => self.start_save(queue),
            Command::Delete => self.delete(queue),
            Command::Close => self.close(queue),
        }
    }

    fn handle_event(&mut self, event: &Event, queue: &mut SignalQueue) {
        match event {
            Event::SessionOpened(selection) => self.open_session(selection.clone(), queue),
            Event::FieldChanged(change) if self.open => self.change_field(change),
            Event::PasswordEncrypted { token, result } => {
                self.on_encrypted(*token, result.clone(), queue);
            }
            Event::PasswordDecrypted { token, result } => {
                self.on_decrypted(*token, result.clone());
            }
            _ => (),
        }
    }
}
