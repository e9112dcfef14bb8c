/// Commands represent user intentions coming from the form: save, delete and
/// close. Each command is passed to the editing session.
pub mod command;

/// Events represent things that happen within the program. Events are emitted
/// by the form (field edits, a session being opened), by the session as a
/// result of handling a command or another event, or when an async process
/// (such as a cipher round trip) has completed. Every component receives
/// every event.
pub mod event;

/// Messages represent direct imperative communications between components.
/// Unlike events, messages are tagged with a recipient and are only handled by
/// that component. The session uses them to hand work to the cipher client.
pub mod message;

/// Signal utilities including the Signal enum and `SignalQueue` for managing
/// the communication between components in the event-driven system.
pub mod signal;
