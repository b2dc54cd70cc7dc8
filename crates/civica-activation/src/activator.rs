// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::{
    ActivationRequest, AttemptCounter, ChatTrigger, ProbeDue, ProbeScheduler, RetryPolicy,
    WidgetLocator,
};
use civica_app::{ActivationGeneration, ProbeTaskId, TabId};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivationPhase {
    Idle,
    Probing(TabId),
    Activated(TabId),
    Exhausted(TabId),
}

impl ActivationPhase {
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Probing(_) => "probing",
            Self::Activated(_) => "activated",
            Self::Exhausted(_) => "exhausted",
        }
    }

    pub const fn is_probing(&self) -> bool {
        matches!(self, Self::Probing(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeFailure {
    Unavailable,
    SelectionRejected(String),
}

impl ProbeFailure {
    pub fn describe(&self) -> String {
        match self {
            Self::Unavailable => "chat widget not mounted".to_owned(),
            Self::SelectionRejected(reason) => format!("tab selection rejected: {reason}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivationEvent {
    Started {
        tab: TabId,
        generation: ActivationGeneration,
    },
    AlreadyProbing {
        tab: TabId,
        attempts_made: u32,
    },
    Superseded {
        previous: TabId,
        next: TabId,
    },
    ProbeFailed {
        tab: TabId,
        attempt: u32,
        failure: ProbeFailure,
    },
    RetryScheduled {
        tab: TabId,
        next_attempt: u32,
        delay: Duration,
    },
    Activated {
        tab: TabId,
        attempts: u32,
    },
    Exhausted {
        tab: TabId,
        attempts: u32,
    },
    Cancelled {
        tab: TabId,
    },
}

#[derive(Debug)]
struct ActivationCycle {
    request: ActivationRequest,
    generation: ActivationGeneration,
    attempts: AttemptCounter,
    pending: Option<ProbeTaskId>,
}

/// Opens the chat widget and selects a tab once the widget can be reached.
///
/// The activator never blocks. Each probe either selects the tab or asks the
/// scheduler for a later [`ProbeDue`], which the owning loop passes back into
/// [`TabActivator::handle_probe`]. Probes from a superseded or cancelled cycle
/// carry a stale generation and are dropped.
pub struct TabActivator<L, T, S>
where
    L: WidgetLocator,
    T: ChatTrigger,
    S: ProbeScheduler,
{
    policy: RetryPolicy,
    locator: L,
    trigger: T,
    scheduler: S,
    generation: ActivationGeneration,
    phase: ActivationPhase,
    cycle: Option<ActivationCycle>,
}

impl<L, T, S> TabActivator<L, T, S>
where
    L: WidgetLocator,
    T: ChatTrigger,
    S: ProbeScheduler,
{
    pub fn new(policy: RetryPolicy, locator: L, trigger: T, scheduler: S) -> Self {
        Self {
            policy,
            locator,
            trigger,
            scheduler,
            generation: ActivationGeneration::default(),
            phase: ActivationPhase::Idle,
            cycle: None,
        }
    }

    pub const fn policy(&self) -> RetryPolicy {
        self.policy
    }

    pub const fn phase(&self) -> &ActivationPhase {
        &self.phase
    }

    pub const fn generation(&self) -> ActivationGeneration {
        self.generation
    }

    pub fn current_request(&self) -> Option<&ActivationRequest> {
        self.cycle.as_ref().map(|cycle| &cycle.request)
    }

    pub fn attempts_made(&self) -> Option<u32> {
        self.cycle
            .as_ref()
            .map(|cycle| cycle.attempts.attempts_made())
    }

    pub fn pending_probe(&self) -> Option<ProbeTaskId> {
        self.cycle.as_ref().and_then(|cycle| cycle.pending)
    }

    pub fn open(&mut self, target: impl Into<TabId>) -> Vec<ActivationEvent> {
        let target = target.into();
        if target.is_empty() {
            tracing::debug!("ignoring chat activation without a target tab");
            return Vec::new();
        }

        let mut events = Vec::new();
        if let Some(cycle) = &self.cycle {
            if cycle.request.target_tab == target {
                let attempts_made = cycle.attempts.attempts_made();
                self.trigger.request_open();
                tracing::debug!(tab = %target, attempts_made, "chat activation already in flight");
                return vec![ActivationEvent::AlreadyProbing {
                    tab: target,
                    attempts_made,
                }];
            }

            if let Some(previous) = self.abandon_cycle() {
                tracing::debug!(previous = %previous, next = %target, "chat activation superseded");
                events.push(ActivationEvent::Superseded {
                    previous,
                    next: target.clone(),
                });
            }
        }

        self.generation = self.generation.next();
        self.cycle = Some(ActivationCycle {
            request: ActivationRequest::new(target.clone()),
            generation: self.generation,
            attempts: AttemptCounter::default(),
            pending: None,
        });
        self.phase = ActivationPhase::Probing(target.clone());
        tracing::debug!(tab = %target, generation = self.generation.get(), "chat activation started");
        events.push(ActivationEvent::Started {
            tab: target,
            generation: self.generation,
        });

        self.probe(&mut events);
        events
    }

    pub fn handle_probe(&mut self, due: ProbeDue) -> Vec<ActivationEvent> {
        let current = self.cycle.as_ref().is_some_and(|cycle| {
            cycle.generation == due.generation && cycle.pending == Some(due.task)
        });
        if !current {
            tracing::debug!(
                generation = due.generation.get(),
                task = due.task.get(),
                "dropping stale chat probe"
            );
            return Vec::new();
        }

        let mut events = Vec::new();
        self.probe(&mut events);
        events
    }

    pub fn cancel(&mut self) -> Vec<ActivationEvent> {
        let Some(tab) = self.abandon_cycle() else {
            return Vec::new();
        };
        self.generation = self.generation.next();
        self.phase = ActivationPhase::Idle;
        tracing::debug!(tab = %tab, "chat activation cancelled");
        vec![ActivationEvent::Cancelled { tab }]
    }

    fn probe(&mut self, events: &mut Vec<ActivationEvent>) {
        let Some(cycle) = self.cycle.as_mut() else {
            return;
        };
        cycle.pending = None;
        let attempt = cycle.attempts.record();
        let tab = cycle.request.target_tab.clone();

        self.trigger.request_open();
        let outcome = match self.locator.locate() {
            Some(mut handle) => handle
                .select_tab(&tab)
                .map_err(|error| ProbeFailure::SelectionRejected(format!("{error:#}"))),
            None => Err(ProbeFailure::Unavailable),
        };

        let failure = match outcome {
            Ok(()) => {
                self.finish(ActivationPhase::Activated(tab.clone()));
                tracing::info!(tab = %tab, attempts = attempt, "chat tab activated");
                events.push(ActivationEvent::Activated {
                    tab,
                    attempts: attempt,
                });
                return;
            }
            Err(failure) => failure,
        };

        tracing::debug!(tab = %tab, attempt, reason = %failure.describe(), "chat probe failed");
        events.push(ActivationEvent::ProbeFailed {
            tab: tab.clone(),
            attempt,
            failure,
        });

        if attempt >= self.policy.max_probes() {
            self.exhaust(tab, attempt, events);
            return;
        }

        let generation = cycle.generation;
        match self.scheduler.schedule(self.policy.retry_interval, generation) {
            Ok(task) => {
                cycle.pending = Some(task);
                events.push(ActivationEvent::RetryScheduled {
                    tab,
                    next_attempt: attempt + 1,
                    delay: self.policy.retry_interval,
                });
            }
            Err(error) => {
                let error = format!("{error:#}");
                tracing::warn!(tab = %tab, error = %error, "could not schedule chat probe");
                self.exhaust(tab, attempt, events);
            }
        }
    }

    fn exhaust(&mut self, tab: TabId, attempts: u32, events: &mut Vec<ActivationEvent>) {
        self.finish(ActivationPhase::Exhausted(tab.clone()));
        tracing::warn!(tab = %tab, attempts, "chat widget never became ready; giving up");
        events.push(ActivationEvent::Exhausted { tab, attempts });
    }

    fn finish(&mut self, phase: ActivationPhase) {
        self.cycle = None;
        self.phase = phase;
    }

    fn abandon_cycle(&mut self) -> Option<TabId> {
        let cycle = self.cycle.take()?;
        if let Some(task) = cycle.pending {
            self.scheduler.cancel(task);
        }
        Some(cycle.request.target_tab)
    }
}

impl<L, T, S> Drop for TabActivator<L, T, S>
where
    L: WidgetLocator,
    T: ChatTrigger,
    S: ProbeScheduler,
{
    fn drop(&mut self) {
        self.abandon_cycle();
    }
}
