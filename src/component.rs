use crate::system::{command::Command, event::Event, message::Message, signal::SignalQueue};

/// Something that reacts to signals. Handlers push whatever they emit onto the
/// queue instead of calling other components directly, which keeps every
/// propagation path acyclic.
pub trait Component {
    fn handle_command(&mut self, _command: &Command, _queue: &mut SignalQueue) {}

    fn handle_event(&mut self, _event: &Event, _queue: &mut SignalQueue) {}

    fn handle_message(&mut self, _message: &Message, _queue: &mut SignalQueue) {}
}
