use crate::{
    client::CipherClient,
    component::Component,
    session::EditSession,
    system::{
        command::Command,
        event::Event,
        signal::{Signal, SignalQueue},
    },
};
use std::time::Duration;

const TICK: Duration = Duration::from_millis(20);

/// Wires an editing session to the cipher client. Events go to both; messages
/// (cipher requests) go to the client only.
#[derive(Debug)]
pub struct App {
    session: EditSession,
    client: CipherClient,
    outbox: Vec<Event>,
}

impl App {
    #[must_use]
    pub const fn new(session: EditSession, client: CipherClient) -> Self {
        Self {
            session,
            client,
            outbox: Vec::new(),
        }
    }

    #[must_use]
    pub const fn session(&self) -> &EditSession {
        &self.session
    }

    pub fn dispatch_command(&mut self, command: Command) {
        tracing::debug!("Command: {command}");
        let mut queue = SignalQueue::default();
        self.session.handle_command(&command, &mut queue);
        self.process_signals(queue);
    }

    pub fn dispatch_event(&mut self, event: Event) {
        let mut queue = SignalQueue::default();
        queue.push(event);
        self.process_signals(queue);
    }

    fn process_signals(&mut self, mut queue: SignalQueue) {
        while let Some(signal) = queue.pop() {
            let mut new_queue = SignalQueue::default();

            match &signal {
                Signal::Event(event) => {
                    self.session.handle_event(event, &mut new_queue);
                    self.client.handle_event(event, &mut new_queue);
                }
                Signal::Message(message) => self.client.handle_message(message, &mut new_queue),
            }

            while let Some(new_signal) = new_queue.pop() {
                queue.push(new_signal);
            }

            if let Signal::Event(event) = signal {
                if !matches!(event, Event::Tick) {
                    tracing::debug!("Event: {event}");
                    self.outbox.push(event);
                }
            }
        }
    }

    /// Events handled since the last call, oldest first.
    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.outbox)
    }

    /// Ticks until no cipher request is outstanding.
    pub async fn settle(&mut self) {
        while self.session.is_waiting() || self.client.in_flight() > 0 {
            self.dispatch_event(Event::Tick);
            tokio::time::sleep(TICK).await;
        }
        self.dispatch_event(Event::Tick);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        manager::DescriptorManager,
        model::{
            buffer::FieldChange,
            descriptor::{ConnectionDescriptor, Selection},
        },
        testing::{mock_cipher::MockCipher, mock_storage::MockStorage},
    };
    use std::{rc::Rc, sync::Arc};

    fn app_with(
        descriptors: Vec<ConnectionDescriptor>,
        cipher: MockCipher,
    ) -> (App, Rc<MockStorage>) {
        let storage = Rc::new(MockStorage::with_descriptors(descriptors.clone()));
        let manager = DescriptorManager::new(descriptors, storage.clone());
        let app = App::new(
            EditSession::new(manager),
            CipherClient::new(Arc::new(cipher)),
        );
        (app, storage)
    }

    #[tokio::test]
    async fn saves_through_the_cipher() {
        let (mut app, storage) = app_with(vec![], MockCipher::default());

        app.dispatch_event(Event::SessionOpened(Selection::New));
        for change in [
            FieldChange::Name("local".to_string()),
            FieldChange::Server("srv".to_string()),
            FieldChange::Username("sa".to_string()),
            FieldChange::Password("pw".to_string()),
        ] {
            app.dispatch_event(Event::FieldChanged(change));
        }
        app.dispatch_command(Command::Save);
        app.settle().await;

        let events = app.take_events();
        assert!(events
            .iter()
            .any(|event| matches!(event, Event::DescriptorCommitted(d) if d.password == "ENC:pw")));
        assert!(events.iter().any(|event| matches!(event, Event::EditorClosed)));
        assert_eq!(storage.stored()[0].password, "ENC:pw");
    }

    #[tokio::test]
    async fn opening_a_record_fills_in_its_password() {
        let mut record = ConnectionDescriptor::new("prod".to_string());
        record.server = "srv".to_string();
        record.password = "ENC:hunter2".to_string();
        let (mut app, _) = app_with(vec![record.clone()], MockCipher::default());

        app.dispatch_event(Event::SessionOpened(Selection::Existing(record.id().clone())));
        app.settle().await;

        assert_eq!(app.session().view().buffer.password, "hunter2");
    }

    #[tokio::test]
    async fn broken_cipher_saves_nothing() {
        let (mut app, storage) = app_with(vec![], MockCipher { broken: true });

        app.dispatch_event(Event::SessionOpened(Selection::New));
        for change in [
            FieldChange::Name("local".to_string()),
            FieldChange::Server("srv".to_string()),
            FieldChange::Username("sa".to_string()),
            FieldChange::Password("pw".to_string()),
        ] {
            app.dispatch_event(Event::FieldChanged(change));
        }
        app.dispatch_command(Command::Save);
        app.settle().await;

        assert!(app
            .take_events()
            .iter()
            .any(|event| matches!(event, Event::ErrorOccurred(_))));
        assert!(storage.stored().is_empty());
        assert!(app.session().is_open());
    }
}
