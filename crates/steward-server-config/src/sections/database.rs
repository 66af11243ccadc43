// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Database configuration.

use serde::{Deserialize, Serialize};

/// Database configuration (runtime, fully resolved).
///
/// Without a URL the job history is kept in memory only.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatabaseConfig {
	pub url: Option<String>,
}

/// Database configuration layer (partial, for merging).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DatabaseConfigLayer {
	#[serde(default)]
	pub url: Option<String>,
}

impl DatabaseConfigLayer {
	pub fn merge(&mut self, other: DatabaseConfigLayer) {
		if other.url.is_some() {
			self.url = other.url;
		}
	}

	pub fn finalize(self) -> DatabaseConfig {
		DatabaseConfig { url: self.url }
	}
}
