use async_trait::async_trait;
use std::sync::{Arc, Mutex, PoisonError};

use crate::email::{EmailError, EmailMessage, SendEmail};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SentEmail {
    pub destination: String,
    pub subject: String,
    pub body: String,
    pub is_html: bool,
}

/// Stands in for a real relay when email is disabled. Clones share one outbox, so a test
/// can keep a clone around and inspect what the server sent.
#[derive(Clone, Default)]
pub struct MockSender {
    outbox: Arc<Mutex<Vec<SentEmail>>>,
    fail_sends: bool,
}

impl MockSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every send returns an error and nothing lands in the outbox.
    pub fn failing() -> Self {
        Self {
            outbox: Arc::new(Mutex::new(Vec::new())),
            fail_sends: true,
        }
    }

    pub fn sent_messages(&self) -> Vec<SentEmail> {
        self.outbox
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl SendEmail for MockSender {
    async fn send<'a>(&self, message: EmailMessage<'a>) -> Result<(), EmailError> {
        if self.fail_sends {
            return Err(EmailError::RelayConnectionFailed(String::from(
                "Mock sender is configured to fail",
            )));
        }

        self.outbox
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(SentEmail {
                destination: String::from(message.destination),
                subject: String::from(message.subject),
                body: message.body,
                is_html: message.is_html,
            });

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use lettre::message::Mailbox;

    fn message(destination: &str) -> EmailMessage<'_> {
        EmailMessage {
            body: String::from("<p>Hello</p>"),
            subject: "Greetings",
            from: "Sender <sender@example.com>".parse::<Mailbox>().unwrap(),
            reply_to: "reply@example.com".parse::<Mailbox>().unwrap(),
            destination,
            is_html: true,
        }
    }

    #[tokio::test]
    async fn test_clones_share_outbox() {
        let sender = MockSender::new();
        let boxed: Box<dyn SendEmail> = Box::new(sender.clone());

        boxed.send(message("first@example.com")).await.unwrap();
        boxed.send(message("second@example.com")).await.unwrap();

        let sent = sender.sent_messages();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].destination, "first@example.com");
        assert_eq!(sent[0].subject, "Greetings");
        assert_eq!(sent[0].body, "<p>Hello</p>");
        assert!(sent[0].is_html);
        assert_eq!(sent[1].destination, "second@example.com");
    }

    #[tokio::test]
    async fn test_failing_sender() {
        let sender = MockSender::failing();

        assert!(matches!(
            sender.send(message("someone@example.com")).await,
            Err(EmailError::RelayConnectionFailed(_))
        ));
        assert!(sender.sent_messages().is_empty());
    }
}
