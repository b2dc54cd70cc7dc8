// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use civica_app::TabId;
use time::OffsetDateTime;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivationRequest {
    pub target_tab: TabId,
    pub created_at: OffsetDateTime,
}

impl ActivationRequest {
    pub fn new(target_tab: TabId) -> Self {
        Self::at(target_tab, OffsetDateTime::now_utc())
    }

    pub const fn at(target_tab: TabId, created_at: OffsetDateTime) -> Self {
        Self {
            target_tab,
            created_at,
        }
    }
}

/// Probes run so far by one activation cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AttemptCounter {
    attempts_made: u32,
}

impl AttemptCounter {
    pub const fn attempts_made(self) -> u32 {
        self.attempts_made
    }

    /// Counts a probe and returns its 1-based attempt number.
    pub fn record(&mut self) -> u32 {
        self.attempts_made = self.attempts_made.saturating_add(1);
        self.attempts_made
    }
}
