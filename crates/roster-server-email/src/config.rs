// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration for the email lifecycle engine.

use serde::{Deserialize, Serialize};

/// Tunables for address generation and deletion batching. Loaded and wired
/// by the server's configuration layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailLifecycleConfig {
	/// Domain new addresses are generated under.
	pub domain: String,

	/// Addresses whose last update is older than this are picked up by the
	/// deletion batch even without a terminal-pending status.
	pub staleness_days: i64,

	/// Upper bound of addresses handled per deletion batch.
	pub batch_limit: u32,
}

impl Default for EmailLifecycleConfig {
	fn default() -> Self {
		Self {
			domain: "example.org".to_string(),
			staleness_days: 30,
			batch_limit: 100,
		}
	}
}
