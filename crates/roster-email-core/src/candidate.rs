// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Local-part candidate construction from a person's name.
//!
//! A candidate is `cleaned_given_name + "." + cleaned_family_name`, where
//! cleaning folds the name to a searchable lowercase form and strips
//! everything outside `[a-z-]`. Whether a candidate is actually free on a
//! domain is decided by the probing generator in the server crate; this
//! module owns only the pure construction and comparison rules.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::error::{EmailError, Result};

/// Longest local part a candidate may have.
const MAX_LOCAL_PART_LEN: usize = 64;

/// Shortest raw name accepted for candidate construction.
const MIN_NAME_LEN: usize = 2;

/// Contract for the character-set validation applied to raw names before
/// cleaning. The production validator is owned by the directory service;
/// [`LatinNameCharacterSet`] covers local wiring and tests.
pub trait NameCharacterSet: Send + Sync {
	fn is_permitted(&self, name: &str) -> bool;
}

/// Permits Latin-script names: alphabetic characters plus space, hyphen and
/// apostrophe.
#[derive(Debug, Clone, Copy, Default)]
pub struct LatinNameCharacterSet;

impl NameCharacterSet for LatinNameCharacterSet {
	fn is_permitted(&self, name: &str) -> bool {
		name.chars()
			.all(|c| c.is_alphabetic() || matches!(c, ' ' | '-' | '\''))
	}
}

/// Fold a name into its searchable form: decomposed, accent-free lowercase
/// with everything outside `[a-z-]` removed, and empty hyphen segments
/// collapsed.
#[must_use]
pub fn clean_name(name: &str) -> String {
	let folded: String = name
		.nfkd()
		.filter(|c| !is_combining_mark(*c))
		.flat_map(char::to_lowercase)
		.filter(|c| c.is_ascii_lowercase() || *c == '-')
		.collect();

	folded
		.split('-')
		.filter(|segment| !segment.is_empty())
		.collect::<Vec<_>>()
		.join("-")
}

/// Build the canonical local-part candidate for a person's name.
pub fn local_part(
	validator: &dyn NameCharacterSet,
	given_name: &str,
	family_name: &str,
) -> Result<String> {
	if given_name.chars().count() < MIN_NAME_LEN || family_name.chars().count() < MIN_NAME_LEN {
		return Err(EmailError::InvalidLength);
	}
	if !validator.is_permitted(given_name) || !validator.is_permitted(family_name) {
		return Err(EmailError::InvalidCharacterSet);
	}

	let cleaned_given = clean_name(given_name);
	let cleaned_family = clean_name(family_name);
	if cleaned_given.is_empty() || cleaned_family.is_empty() {
		return Err(EmailError::InvalidName);
	}

	let candidate = format!("{cleaned_given}.{cleaned_family}");
	if candidate.len() > MAX_LOCAL_PART_LEN {
		return Err(EmailError::InvalidName);
	}

	Ok(candidate)
}

/// Whether `address` is exactly the canonical candidate for the given name.
///
/// The comparison is against the literal's local part when a domain is
/// attached, otherwise against the whole literal. A name that yields no
/// candidate matches nothing.
pub fn is_equal(
	validator: &dyn NameCharacterSet,
	address: &str,
	given_name: &str,
	family_name: &str,
) -> bool {
	match local_part(validator, given_name, family_name) {
		Ok(candidate) => address_local_part(address) == candidate,
		Err(_) => false,
	}
}

/// Like [`is_equal`], but also accepts the candidate followed by an
/// all-digit suffix. The probing loop resolves collisions by appending a
/// counter, so historical addresses legitimately carry such suffixes.
pub fn is_equal_ignore_count(
	validator: &dyn NameCharacterSet,
	address: &str,
	given_name: &str,
	family_name: &str,
) -> bool {
	let Ok(candidate) = local_part(validator, given_name, family_name) else {
		return false;
	};
	let local = address_local_part(address);
	match local.strip_prefix(candidate.as_str()) {
		Some("") => true,
		Some(rest) => rest.chars().all(|c| c.is_ascii_digit()),
		None => false,
	}
}

fn address_local_part(address: &str) -> &str {
	match address.find('@') {
		Some(at) => &address[..at],
		None => address,
	}
}
