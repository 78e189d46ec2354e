//! Asynchronous queue trigger.
//!
//! Consumes trigger payloads from a durable subscription. An undecodable
//! payload is negative-acknowledged for broker redelivery; once a payload
//! decodes, the invocation is attempted at most once and the message is
//! acknowledged regardless of outcome. Failures after decode are logged,
//! never retried — there is no result channel back to the publisher.

use std::sync::Arc;

use async_nats::jetstream;
use async_nats::jetstream::AckKind;
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::cluster::ExecStatus;
use crate::config::QueueConfig;
use crate::error::{BridgeError, Result};
use crate::pipeline::{Bridge, CommandRequest};

/// What the consumer should tell the broker about one delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Consume the message; it will not be redelivered.
    Ack,
    /// Request redelivery; only used for payloads that failed to decode.
    Nak,
}

/// Decide the fate of one delivery and run the pipeline when it decodes.
///
/// Split out from the consumer loop so the decode/ack policy is testable
/// without a broker.
pub async fn handle_payload(bridge: &Bridge, payload: &[u8]) -> Disposition {
    let request: CommandRequest = match serde_json::from_slice(payload) {
        Ok(request) => request,
        Err(e) => {
            tracing::warn!(error = %e, "Undecodable queue payload, requesting redelivery");
            return Disposition::Nak;
        }
    };

    match bridge.run(&request).await {
        Ok(result) => match result.status {
            ExecStatus::Success => {
                tracing::info!(
                    username = %request.username,
                    "Queue-triggered command succeeded"
                );
            }
            ExecStatus::RemoteCommandError => {
                tracing::warn!(
                    username = %request.username,
                    stderr = %result.stderr_utf8().trim(),
                    "Queue-triggered command reported failure"
                );
            }
        },
        Err(e) => {
            tracing::error!(error = %e, "Queue-triggered invocation failed");
        }
    }

    // At-most-once after decode: the attempt is spent whether it worked or
    // not, so the message is always consumed.
    Disposition::Ack
}

/// Run the durable consumer until the shutdown token fires.
///
/// # Errors
///
/// Returns `Upstream` when the broker connection, stream or consumer cannot
/// be set up. Per-message failures are handled inline and never abort the
/// loop.
pub async fn run_consumer(
    bridge: Arc<Bridge>,
    config: &QueueConfig,
    shutdown: CancellationToken,
) -> Result<()> {
    let client = async_nats::connect(&config.url)
        .await
        .map_err(|e| BridgeError::Upstream(format!("queue connect failed: {}", e)))?;

    let jetstream = jetstream::new(client);

    let stream = jetstream
        .get_or_create_stream(jetstream::stream::Config {
            name: config.stream.clone(),
            subjects: vec![config.subject.clone()],
            ..Default::default()
        })
        .await
        .map_err(|e| BridgeError::Upstream(format!("queue stream setup failed: {}", e)))?;

    let consumer = stream
        .get_or_create_consumer(
            &config.durable_name,
            jetstream::consumer::pull::Config {
                durable_name: Some(config.durable_name.clone()),
                ..Default::default()
            },
        )
        .await
        .map_err(|e| BridgeError::Upstream(format!("queue consumer setup failed: {}", e)))?;

    let mut messages = consumer
        .messages()
        .await
        .map_err(|e| BridgeError::Upstream(format!("queue subscription failed: {}", e)))?;

    tracing::info!(
        subject = %config.subject,
        durable = %config.durable_name,
        "Starting queue trigger"
    );

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                tracing::info!("Queue trigger draining");
                break;
            }
            next = messages.next() => {
                let message = match next {
                    Some(Ok(message)) => message,
                    Some(Err(e)) => {
                        tracing::warn!(error = %e, "Queue delivery error");
                        continue;
                    }
                    None => {
                        tracing::info!("Queue subscription closed");
                        break;
                    }
                };

                match handle_payload(&bridge, &message.payload).await {
                    Disposition::Ack => {
                        if let Err(e) = message.ack().await {
                            tracing::warn!(error = %e, "Failed to ack queue message");
                        }
                    }
                    Disposition::Nak => {
                        if let Err(e) = message.ack_with(AckKind::Nak(None)).await {
                            tracing::warn!(error = %e, "Failed to nak queue message");
                        }
                    }
                }
            }
        }
    }

    Ok(())
}
