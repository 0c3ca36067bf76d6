// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Publish boundary towards the two pub/sub transports.
//!
//! Subscribers exist on a legacy in-process bus and on a newer broker-backed
//! bus; a notification only counts as delivered when it went out on both.
//! [`EventPublisher`] takes the canonical [`EmailEvent`] and fans it out:
//! the modern transport receives the tagged envelope, the legacy transport a
//! flat camelCase object keyed by class-style event name. Both transports
//! are at-least-once; publish failures are logged and never fail the
//! calling business flow.

use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, warn};

use async_trait::async_trait;
use roster_email_core::EmailEvent;

use crate::error::Result;

/// One pub/sub transport. Implementations wrap the actual bus client.
#[async_trait]
pub trait EventTransport: Send + Sync {
	async fn publish(&self, event_type: &str, payload: Value) -> Result<()>;
}

/// Fans each logical event out to the legacy and the modern transport.
pub struct EventPublisher {
	legacy: Arc<dyn EventTransport>,
	modern: Arc<dyn EventTransport>,
}

impl EventPublisher {
	#[must_use]
	pub fn new(legacy: Arc<dyn EventTransport>, modern: Arc<dyn EventTransport>) -> Self {
		Self { legacy, modern }
	}

	/// Publish `event` on both transports. Not awaited for downstream
	/// handling; a transport refusing the message is logged and otherwise
	/// ignored.
	pub async fn publish(&self, event: EmailEvent) {
		let modern_payload = match serde_json::to_value(&event) {
			Ok(payload) => payload,
			Err(error) => {
				warn!(event_type = event.event_type(), %error, "failed to serialize event");
				return;
			}
		};

		if let Err(error) = self.modern.publish(event.event_type(), modern_payload).await {
			warn!(event_type = event.event_type(), %error, "modern transport rejected event");
		}

		let legacy_payload = legacy_payload(&event);
		if let Err(error) = self.legacy.publish(event.legacy_type(), legacy_payload).await {
			warn!(event_type = event.legacy_type(), %error, "legacy transport rejected event");
		}

		debug!(event_type = event.event_type(), "event published");
	}
}

/// Flat camelCase rendering of an event for the legacy transport. Carries
/// the same fields as the modern envelope.
fn legacy_payload(event: &EmailEvent) -> Value {
	match event {
		EmailEvent::MarkedForDeletion(data) => json!({
			"event": event.legacy_type(),
			"personId": data.person_id,
			"username": data.username,
			"oxUserId": data.ox_account_id,
			"emailAddressId": data.address_id,
			"status": data.status,
			"address": data.address,
		}),
		EmailEvent::Purged(data) => json!({
			"event": event.legacy_type(),
			"personId": data.person_id,
			"username": data.username,
			"oxUserId": data.ox_account_id,
		}),
		EmailEvent::LdapDeleted(data) => json!({
			"event": event.legacy_type(),
			"personId": data.person_id,
			"username": data.username,
			"address": data.address,
		}),
		EmailEvent::OxDeleted(data) => json!({
			"event": event.legacy_type(),
			"personId": data.person_id,
			"username": data.username,
			"oxUserId": data.ox_account_id,
			"address": data.address,
		}),
		EmailEvent::DatabaseDeleted(data) => json!({
			"event": event.legacy_type(),
			"personId": data.person_id,
			"oxUserId": data.ox_account_id,
			"emailAddressId": data.address_id,
			"status": data.status,
			"address": data.address,
		}),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use roster_email_core::{
		EmailAddressId, EmailAddressStatus, EmailAddressesPurged, OxAccountId, PersonId,
	};
	use std::sync::Mutex;

	#[derive(Default)]
	struct RecordingTransport {
		published: Mutex<Vec<(String, Value)>>,
	}

	#[async_trait]
	impl EventTransport for RecordingTransport {
		async fn publish(&self, event_type: &str, payload: Value) -> Result<()> {
			self.published
				.lock()
				.unwrap()
				.push((event_type.to_string(), payload));
			Ok(())
		}
	}

	struct FailingTransport;

	#[async_trait]
	impl EventTransport for FailingTransport {
		async fn publish(&self, _event_type: &str, _payload: Value) -> Result<()> {
			Err(crate::error::EmailServerError::Publish("bus down".to_string()))
		}
	}

	fn purged_event() -> EmailEvent {
		EmailEvent::Purged(EmailAddressesPurged {
			person_id: Some(PersonId::new()),
			username: Some("emusterfrau".to_string()),
			ox_account_id: OxAccountId(42),
		})
	}

	#[tokio::test]
	async fn test_publish_reaches_both_transports() {
		let legacy = Arc::new(RecordingTransport::default());
		let modern = Arc::new(RecordingTransport::default());
		let publisher = EventPublisher::new(legacy.clone(), modern.clone());

		publisher.publish(purged_event()).await;

		let legacy_events = legacy.published.lock().unwrap();
		let modern_events = modern.published.lock().unwrap();
		assert_eq!(legacy_events.len(), 1);
		assert_eq!(modern_events.len(), 1);
		assert_eq!(legacy_events[0].0, "EmailAddressesPurgedEvent");
		assert_eq!(modern_events[0].0, "email.addresses.purged");
	}

	#[tokio::test]
	async fn test_legacy_shape_is_flat_camel_case() {
		let legacy = Arc::new(RecordingTransport::default());
		let modern = Arc::new(RecordingTransport::default());
		let publisher = EventPublisher::new(legacy.clone(), modern);

		publisher
			.publish(EmailEvent::MarkedForDeletion(
				roster_email_core::EmailAddressMarkedForDeletion {
					person_id: None,
					username: None,
					ox_account_id: OxAccountId(7),
					address_id: EmailAddressId::new(),
					status: EmailAddressStatus::ToBeDeleted,
					address: "a@b.c".to_string(),
				},
			))
			.await;

		let events = legacy.published.lock().unwrap();
		let payload = &events[0].1;
		assert_eq!(payload["event"], "EmailAddressMarkedForDeletionEvent");
		assert_eq!(payload["oxUserId"], 7);
		assert_eq!(payload["address"], "a@b.c");
		assert!(payload.get("data").is_none());
	}

	#[tokio::test]
	async fn test_one_failing_transport_does_not_block_the_other() {
		let legacy = Arc::new(RecordingTransport::default());
		let publisher = EventPublisher::new(legacy.clone(), Arc::new(FailingTransport));

		publisher.publish(purged_event()).await;

		assert_eq!(legacy.published.lock().unwrap().len(), 1);
	}

	#[test]
	fn test_legacy_and_modern_payloads_carry_the_same_fields() {
		let event = purged_event();
		let modern = serde_json::to_value(&event).unwrap();
		let legacy = legacy_payload(&event);

		assert_eq!(legacy["personId"], modern["data"]["person_id"]);
		assert_eq!(legacy["username"], modern["data"]["username"]);
		assert_eq!(legacy["oxUserId"], modern["data"]["ox_account_id"]);
	}
}
