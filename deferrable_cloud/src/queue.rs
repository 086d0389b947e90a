use async_trait::async_trait;
use aws_sdk_sqs::types::QueueAttributeName;
use deferrable_codec::Item;
use deferrable_queue::{Queue, QueueStats};
use tokio::sync::OnceCell;
use tracing::warn;

use crate::config::{CloudQueueConfig, MAX_BATCH_SIZE, MAX_DELAY_SECONDS};
use crate::error::CloudQueueError;
use crate::lazy::{default_client_factory, ClientFactory, LazyClient};

/// An at-least-once [`Queue`] backed by an SQS-shaped cloud message bus.
///
/// The client connection is resolved lazily (see [`crate::lazy`]):
/// constructing a `CloudQueue` never touches the network.
pub struct CloudQueue {
    client: LazyClient,
    queue_name: String,
    config: CloudQueueConfig,
    queue_url: OnceCell<String>,
}

impl CloudQueue {
    /// Builds a `CloudQueue` named `queue_name`, using the default AWS
    /// configuration chain on first use.
    pub fn new(queue_name: impl Into<String>, config: CloudQueueConfig) -> Self {
        Self::with_client_factory(queue_name, config, default_client_factory())
    }

    /// Builds a `CloudQueue` using a caller-supplied client factory (tests,
    /// or a non-default region/credentials chain).
    pub fn with_client_factory(
        queue_name: impl Into<String>,
        config: CloudQueueConfig,
        factory: ClientFactory,
    ) -> Self {
        Self {
            client: LazyClient::new(factory),
            queue_name: queue_name.into(),
            config,
            queue_url: OnceCell::new(),
        }
    }

    /// Builds the main/error queue pair sharing one lazily-resolved client,
    /// per spec.md §4.3.3's "sibling queue named `<group>_error`".
    pub fn paired(group: impl Into<String>, config: CloudQueueConfig) -> (Self, Self) {
        let factory = default_client_factory();
        let group = group.into();
        let main = Self::with_client_factory(group.clone(), config.clone(), factory.clone());
        let error = Self::with_client_factory(format!("{group}_error"), config, factory);
        (main, error)
    }

    async fn resolve_queue_url(&self) -> Result<String, CloudQueueError> {
        let client = self.client.get().await;

        let lookup = client
            .get_queue_url()
            .queue_name(&self.queue_name)
            .send()
            .await;

        let does_not_exist = match &lookup {
            Err(error) => error
                .as_service_error()
                .map(|service_error| service_error.is_queue_does_not_exist())
                .unwrap_or(false),
            Ok(_) => false,
        };

        match lookup {
            Ok(output) => Ok(output.queue_url().unwrap_or_default().to_string()),
            Err(_) if does_not_exist && self.config.create_if_missing => {
                let mut create = client.create_queue().queue_name(&self.queue_name);
                if let Some(redrive) = &self.config.redrive {
                    let policy = serde_json::json!({
                        "deadLetterTargetArn": redrive.dead_letter_queue_name,
                        "maxReceiveCount": redrive.max_receive_count,
                    });
                    create = create.attributes(
                        QueueAttributeName::RedrivePolicy,
                        policy.to_string(),
                    );
                }
                let output = create.send().await?;
                Ok(output.queue_url().unwrap_or_default().to_string())
            }
            Err(_) if does_not_exist => Err(CloudQueueError::QueueNotFound(self.queue_name.clone())),
            Err(error) => Err(CloudQueueError::from(error)),
        }
    }

    async fn queue_url(&self) -> Result<&str, CloudQueueError> {
        let url = self
            .queue_url
            .get_or_try_init(|| self.resolve_queue_url())
            .await?;
        Ok(url.as_str())
    }

    /// Drains this queue by popping and completing items one at a time,
    /// since SQS's `PurgeQueue` is rate-limited to once per 60 seconds.
    pub async fn slow_flush(&self) -> Result<u64, CloudQueueError> {
        let mut drained = 0u64;
        while let Some((envelope, _item)) = self.pop().await? {
            self.complete(envelope).await?;
            drained += 1;
        }
        Ok(drained)
    }

    /// Extends the visibility timeout of an in-flight receive, so a worker
    /// doing long work can avoid a premature redelivery.
    pub async fn extend_visibility(
        &self,
        receipt_handle: &str,
        visibility_timeout_seconds: u32,
    ) -> Result<(), CloudQueueError> {
        let client = self.client.get().await;
        let queue_url = self.queue_url().await?.to_string();
        client
            .change_message_visibility()
            .queue_url(queue_url)
            .receipt_handle(receipt_handle)
            .visibility_timeout(visibility_timeout_seconds as i32)
            .send()
            .await?;
        Ok(())
    }
}

#[async_trait]
impl Queue for CloudQueue {
    const FIFO: bool = false;
    const SUPPORTS_DELAY: bool = true;

    type Envelope = String;
    type Error = CloudQueueError;

    async fn push(&self, item: Item) -> Result<(), Self::Error> {
        let delay = item.effective_delay().min(MAX_DELAY_SECONDS);
        let body = serde_json::to_string(&item)?;

        let client = self.client.get().await;
        let queue_url = self.queue_url().await?.to_string();
        client
            .send_message()
            .queue_url(queue_url)
            .message_body(body)
            .delay_seconds(delay as i32)
            .send()
            .await?;
        Ok(())
    }

    async fn pop(&self) -> Result<Option<(Self::Envelope, Item)>, Self::Error> {
        let client = self.client.get().await;
        let queue_url = self.queue_url().await?.to_string();
        let output = client
            .receive_message()
            .queue_url(queue_url)
            .max_number_of_messages(1)
            .wait_time_seconds(self.config.wait_time_seconds as i32)
            .visibility_timeout(self.config.visibility_timeout_seconds as i32)
            .send()
            .await?;

        let Some(message) = output.messages.unwrap_or_default().into_iter().next() else {
            return Ok(None);
        };
        let receipt_handle = message.receipt_handle.unwrap_or_default();
        let body = message.body.unwrap_or_default();
        let item: Item = serde_json::from_str(&body)?;
        Ok(Some((receipt_handle, item)))
    }

    async fn complete(&self, envelope: Self::Envelope) -> Result<(), Self::Error> {
        let client = self.client.get().await;
        let queue_url = self.queue_url().await?.to_string();
        client
            .delete_message()
            .queue_url(queue_url)
            .receipt_handle(envelope)
            .send()
            .await?;
        Ok(())
    }

    async fn flush(&self) -> Result<(), Self::Error> {
        let client = self.client.get().await;
        let queue_url = self.queue_url().await?.to_string();
        if let Err(error) = client.purge_queue().queue_url(queue_url).send().await {
            warn!(error = %error, "purge_queue failed, falling back to slow_flush");
            self.slow_flush().await?;
        }
        Ok(())
    }

    async fn stats(&self) -> Result<QueueStats, Self::Error> {
        let client = self.client.get().await;
        let queue_url = self.queue_url().await?.to_string();
        let output = client
            .get_queue_attributes()
            .queue_url(queue_url)
            .attribute_names(QueueAttributeName::ApproximateNumberOfMessages)
            .attribute_names(QueueAttributeName::ApproximateNumberOfMessagesNotVisible)
            .send()
            .await?;

        let attributes = output.attributes.unwrap_or_default();
        let parse = |name: &QueueAttributeName| {
            attributes
                .get(name)
                .and_then(|value| value.parse::<u64>().ok())
        };

        Ok(QueueStats {
            available: parse(&QueueAttributeName::ApproximateNumberOfMessages),
            in_flight: parse(&QueueAttributeName::ApproximateNumberOfMessagesNotVisible),
            // Real SQS exposes no "delayed" count; see SPEC_FULL.md open question 3.
            delayed: None,
        })
    }

    async fn push_batch(&self, items: Vec<Item>) -> Result<Vec<bool>, Self::Error> {
        let client = self.client.get().await;
        let queue_url = self.queue_url().await?.to_string();
        let mut results = Vec::with_capacity(items.len());

        for chunk in items.chunks(MAX_BATCH_SIZE) {
            let mut request = client.send_message_batch().queue_url(&queue_url);
            let mut entry_ids = Vec::with_capacity(chunk.len());
            for (index, item) in chunk.iter().enumerate() {
                let id = index.to_string();
                let body = match serde_json::to_string(item) {
                    Ok(body) => body,
                    Err(_) => {
                        entry_ids.push(None);
                        continue;
                    }
                };
                let entry = aws_sdk_sqs::types::SendMessageBatchRequestEntry::builder()
                    .id(&id)
                    .message_body(body)
                    .delay_seconds(item.effective_delay().min(MAX_DELAY_SECONDS) as i32)
                    .build()
                    .expect("id and message_body are set");
                request = request.entries(entry);
                entry_ids.push(Some(id));
            }

            let succeeded: Vec<String> = match request.send().await {
                Ok(output) => output
                    .successful
                    .unwrap_or_default()
                    .into_iter()
                    .map(|entry| entry.id)
                    .collect(),
                Err(_) => Vec::new(),
            };

            for id in entry_ids {
                results.push(id.map(|id| succeeded.contains(&id)).unwrap_or(false));
            }
        }

        Ok(results)
    }

    async fn complete_batch(&self, envelopes: Vec<Self::Envelope>) -> Result<Vec<bool>, Self::Error> {
        let client = self.client.get().await;
        let queue_url = self.queue_url().await?.to_string();
        let mut results = Vec::with_capacity(envelopes.len());

        for chunk in envelopes.chunks(MAX_BATCH_SIZE) {
            let mut request = client.delete_message_batch().queue_url(&queue_url);
            let ids: Vec<String> = (0..chunk.len()).map(|index| index.to_string()).collect();
            for (id, receipt_handle) in ids.iter().zip(chunk.iter()) {
                let entry = aws_sdk_sqs::types::DeleteMessageBatchRequestEntry::builder()
                    .id(id)
                    .receipt_handle(receipt_handle)
                    .build()
                    .expect("id and receipt_handle are set");
                request = request.entries(entry);
            }

            let succeeded: Vec<String> = match request.send().await {
                Ok(output) => output
                    .successful
                    .unwrap_or_default()
                    .into_iter()
                    .map(|entry| entry.id)
                    .collect(),
                Err(_) => Vec::new(),
            };

            for id in ids {
                results.push(succeeded.contains(&id));
            }
        }

        Ok(results)
    }
}
