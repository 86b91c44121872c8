// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! Per-subject cool-down for credential generation.
//!
//! A subject that holds an unexpired entry is refused new credentials until
//! the entry lapses. Acquisition is atomic per subject key: the check and the
//! insert happen under the lock of the key's shard, so two simultaneous
//! requests for the same subject cannot both get through, while requests for
//! different subjects do not wait on each other.
//!
//! A TTL too large to represent as an [`Instant`] starts a window that never
//! lapses.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::commands::Environment;

#[derive(Debug, Default)]
pub struct CooldownGate {
    /// `None` marks a window without an end.
    entries: DashMap<String, Option<Instant>>,
}

fn is_unexpired(expires_at: Option<Instant>, now: Instant) -> bool {
    expires_at.is_none_or(|expires_at| expires_at > now)
}

impl CooldownGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cool-down key for a requester's credentials in one account.
    pub fn subject_key(nick: &str, environment: Environment) -> String {
        format!("{nick}_{environment}_aws_creds_valid")
    }

    /// Grants a permit and starts the window if `subject_key` has no
    /// unexpired entry. Returns `false` without touching the entry otherwise.
    pub fn try_acquire(&self, subject_key: &str, ttl: Duration) -> bool {
        self.try_acquire_at(subject_key, ttl, Instant::now())
    }

    pub(crate) fn try_acquire_at(&self, subject_key: &str, ttl: Duration, now: Instant) -> bool {
        let expires_at = now.checked_add(ttl);

        match self.entries.entry(subject_key.to_string()) {
            Entry::Occupied(mut entry) => {
                if is_unexpired(*entry.get(), now) {
                    return false;
                }
                entry.insert(expires_at);
                true
            }
            Entry::Vacant(entry) => {
                entry.insert(expires_at);
                true
            }
        }
    }

    /// Drops lapsed entries and returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        self.purge_expired_at(Instant::now())
    }

    pub(crate) fn purge_expired_at(&self, now: Instant) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, expires_at| is_unexpired(*expires_at, now));
        before.saturating_sub(self.entries.len())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
