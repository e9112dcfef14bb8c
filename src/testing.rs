use crate::{
    component::Component,
    system::{
        command::Command,
        event::Event,
        message::Message,
        signal::{Signal, SignalQueue},
    },
};

pub mod mock_cipher;
pub mod mock_storage;

/// Drives a single component and records every signal it handled.
pub struct ComponentTestHarness<C: Component> {
    component: C,
    events: Vec<Event>,
    messages: Vec<Message>,
}

impl<C: Component> ComponentTestHarness<C> {
    pub const fn new(component: C) -> Self {
        Self {
            component,
            events: Vec::new(),
            messages: Vec::new(),
        }
    }

    pub const fn component(&self) -> &C {
        &self.component
    }

    pub fn given_command(&mut self, command: Command) {
        let mut queue = SignalQueue::default();
        self.component.handle_command(&command, &mut queue);
        self.process_signals(queue);
    }

    pub fn given_event(&mut self, event: Event) {
        let mut queue = SignalQueue::default();
        queue.push(event);
        self.process_signals(queue);
    }

    fn process_signals(&mut self, mut queue: SignalQueue) {
        while let Some(signal) = queue.pop() {
            let mut new_queue = SignalQueue::default();

            match &signal {
                Signal::Event(event) => self.component.handle_event(event, &mut new_queue),
                Signal::Message(message) => self.component.handle_message(message, &mut new_queue),
            }

            while let Some(new_signal) = new_queue.pop() {
                queue.push(new_signal);
            }

            match signal {
                Signal::Event(event) => self.events.push(event),
                Signal::Message(message) => self.messages.push(message),
            }
        }
    }

    /// Forgets what has been recorded so far.
    pub fn clear(&mut self) {
        self.events.clear();
        self.messages.clear();
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn expect_event<P: FnMut(&&Event) -> bool>(&self, predicate: P) {
        let event = self.events.iter().find(predicate);
        assert!(
            event.is_some(),
            "Matching event not found. These events were recorded:\n{:?}",
            self.events
        );
    }

    pub fn expect_no_event<P: FnMut(&&Event) -> bool>(&self, predicate: P) {
        let event = self.events.iter().find(predicate);
        assert!(
            event.is_none(),
            "Unexpected event {event:?}. These events were recorded:\n{:?}",
            self.events
        );
    }

    pub fn expect_message<P: FnMut(&&Message) -> bool>(&self, predicate: P) {
        let message = self.messages.iter().find(predicate);
        assert!(
            message.is_some(),
            "Matching message not found. These message were recorded:\n{:?}",
            self.messages
        );
    }

    pub fn expect_no_messages(&self) {
        assert!(
            self.messages.is_empty(),
            "Message list not empty. These message were recorded:\n{:?}",
            self.messages
        );
    }
}
