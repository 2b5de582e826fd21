//! Concrete [`Deliver`] transports.
//!
//! - [`HttpDelivery`] POSTs `{"chat_id", "text"}` JSON to an endpoint. Pointed
//!   at `https://api.telegram.org/bot<token>/sendMessage` it speaks the
//!   Telegram Bot API directly.
//! - [`LogDelivery`] writes messages to the log, for running without a chat
//!   transport.

use crate::traits::Deliver;
use crate::types::{NotifierError, Recipient, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::info;

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
}

pub struct HttpDelivery {
    client: Client,
    endpoint: String,
}

impl HttpDelivery {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl Deliver for HttpDelivery {
    async fn deliver(&self, recipient: &Recipient, message: &str) -> Result<()> {
        let body = SendMessage {
            chat_id: recipient.as_str(),
            text: message,
        };

        let response = self.client.post(&self.endpoint).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(NotifierError::Delivery {
                recipient: recipient.to_string(),
                reason: format!("HTTP {}: {}", status.as_u16(), detail),
            });
        }

        Ok(())
    }

    fn name(&self) -> &str {
        "http"
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LogDelivery;

#[async_trait]
impl Deliver for LogDelivery {
    async fn deliver(&self, recipient: &Recipient, message: &str) -> Result<()> {
        info!(recipient = %recipient, "{}", message);
        Ok(())
    }

    fn name(&self) -> &str {
        "log"
    }
}
