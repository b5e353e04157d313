//! Recording transports for unit tests.

use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use voyage_core::templates::RenderedEmail;

use super::email::{EmailError, Mailer};
use super::push::{PushError, PushMessage, PushTransport};

#[derive(Default)]
pub struct FakePushTransport {
    sent: Mutex<Vec<PushMessage>>,
    failing_tokens: HashSet<String>,
    delay: Option<Duration>,
}

impl FakePushTransport {
    pub fn failing(tokens: &[&str]) -> Self {
        Self {
            failing_tokens: tokens.iter().map(|t| t.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Default::default()
        }
    }

    pub fn sent(&self) -> Vec<PushMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl PushTransport for FakePushTransport {
    async fn send(&self, message: &PushMessage) -> Result<(), PushError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing_tokens.contains(message.token()) {
            return Err(PushError::HttpStatus(503));
        }
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeMailer {
    sent: Mutex<Vec<(String, RenderedEmail)>>,
    fail: bool,
}

impl FakeMailer {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn sent(&self) -> Vec<(String, RenderedEmail)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for FakeMailer {
    async fn send(&self, to: &str, email: &RenderedEmail) -> Result<(), EmailError> {
        if self.fail {
            return Err(EmailError::Build("relay rejected message".into()));
        }
        self.sent.lock().unwrap().push((to.to_string(), email.clone()));
        Ok(())
    }
}
