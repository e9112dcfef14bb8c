use crate::{
    cipher::Cipher,
    component::Component,
    system::{
        event::Event,
        message::{CipherAction, Message},
        signal::SignalQueue,
    },
};
use std::sync::{
    mpsc::{self, Receiver, Sender},
    Arc,
};

/// Runs cipher requests in the background and hands the responses back as
/// events on the next tick.
#[derive(Debug)]
pub struct CipherClient {
    cipher: Arc<dyn Cipher>,
    in_flight: usize,

    response_send: Sender<Event>,
    response_recv: Receiver<Event>,
}

impl CipherClient {
    pub fn new(cipher: Arc<dyn Cipher>) -> Self {
        let (response_send, response_recv) = mpsc::channel::<Event>();
        Self {
            cipher,
            in_flight: 0,
            response_send,
            response_recv,
        }
    }

    /// Requests sent but not yet handed back.
    #[must_use]
    pub const fn in_flight(&self) -> usize {
        self.in_flight
    }

    fn exec(&mut self, action: CipherAction) {
        let cipher = self.cipher.clone();
        let sender = self.response_send.clone();
        self.in_flight += 1;

        tokio::task::spawn_blocking(move || {
            let response = match action {
                CipherAction::Encrypt { token, plaintext } => Event::PasswordEncrypted {
                    token,
                    result: cipher.encrypt(&plaintext),
                },
                CipherAction::Decrypt { token, ciphertext } => Event::PasswordDecrypted {
                    token,
                    result: cipher.decrypt(&ciphertext),
                },
            };

            if sender.send(response).is_err() {
                tracing::warn!("Cipher response dropped, the session is gone");
            }
        });
    }
}

impl Component for CipherClient {
    fn handle_event(&mut self, event: &Event, queue: &mut SignalQueue) {
        if matches!(event, Event::Tick) {
            while let Ok(response) = self.response_recv.try_recv() {
                self.in_flight = self.in_flight.saturating_sub(1);
                queue.push(response);
            }
        }
    }

    fn handle_message(&mut self, message: &Message, _queue: &mut SignalQueue) {
        if let Some(action) = message.read_as_cipher() {
            tracing::debug!("Running cipher request {action}");
            self.exec(action.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        cipher::Secret,
        exchange::TokenSource,
        system::signal::Signal,
        testing::mock_cipher::MockCipher,
    };
    use std::time::Duration;

    async fn drain(client: &mut CipherClient) -> Vec<Event> {
        let mut events = vec![];
        for _ in 0..100 {
            let mut queue = SignalQueue::default();
            client.handle_event(&Event::Tick, &mut queue);
            while let Some(signal) = queue.pop() {
                if let Signal::Event(event) = signal {
                    events.push(event);
                }
            }
            if client.in_flight() == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        events
    }

    #[tokio::test]
    async fn answers_with_the_request_token() {
        let mut client = CipherClient::new(Arc::new(MockCipher::default()));
        let mut tokens = TokenSource::default();
        let token = tokens.issue();

        let message = Message::to_cipher(CipherAction::Encrypt {
            token,
            plaintext: Secret::from("pw"),
        });
        client.handle_message(&message, &mut SignalQueue::default());
        assert_eq!(client.in_flight(), 1);

        let events = drain(&mut client).await;

        assert!(matches!(
            events.as_slice(),
            [Event::PasswordEncrypted { token: t, result: Ok(ciphertext) }]
                if *t == token && ciphertext == "ENC:pw"
        ));
    }

    #[tokio::test]
    async fn failures_come_back_as_events() {
        let mut client = CipherClient::new(Arc::new(MockCipher { broken: true }));
        let mut tokens = TokenSource::default();
        let token = tokens.issue();

        let message = Message::to_cipher(CipherAction::Decrypt {
            token,
            ciphertext: "ENC:pw".to_string(),
        });
        client.handle_message(&message, &mut SignalQueue::default());

        let events = drain(&mut client).await;

        assert!(matches!(
            events.as_slice(),
            [Event::PasswordDecrypted { result: Err(_), .. }]
        ));
    }

    #[test]
    fn other_events_do_not_drain() {
        let mut client = CipherClient::new(Arc::new(MockCipher::default()));
        let mut queue = SignalQueue::default();

        client.handle_event(&Event::EditorClosed, &mut queue);

        assert!(queue.is_empty());
    }
}
