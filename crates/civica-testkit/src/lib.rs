// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, anyhow};
use civica_activation::{
    ActivationEvent, ChatTrigger, ProbeDue, ProbeScheduler, RetryPolicy, TabActivator,
    TabSelector, WidgetHandle, WidgetLocator,
};
use civica_app::{ActivationGeneration, ProbeTaskId, TabId};
use std::cell::{Cell, RefCell, RefMut};
use std::rc::Rc;
use std::time::Duration;

const RUN_UNTIL_IDLE_LIMIT: usize = 10_000;

#[derive(Debug, Default)]
struct ManualClock {
    now: Duration,
    next_task: ProbeTaskId,
    pending: Vec<(Duration, ProbeDue)>,
    cancelled: Vec<ProbeTaskId>,
    scheduled: usize,
    fail_next: bool,
}

/// Probe scheduler on a virtual clock. Nothing fires until the test advances
/// time.
#[derive(Debug, Clone, Default)]
pub struct ManualScheduler {
    clock: Rc<RefCell<ManualClock>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> Duration {
        self.clock.borrow().now
    }

    pub fn pending(&self) -> Vec<ProbeDue> {
        let clock = self.clock.borrow();
        let mut entries = clock.pending.clone();
        entries.sort_by_key(|(due_at, probe)| (*due_at, probe.task));
        entries.into_iter().map(|(_, probe)| probe).collect()
    }

    pub fn pending_len(&self) -> usize {
        self.clock.borrow().pending.len()
    }

    pub fn scheduled_count(&self) -> usize {
        self.clock.borrow().scheduled
    }

    pub fn cancelled(&self) -> Vec<ProbeTaskId> {
        self.clock.borrow().cancelled.clone()
    }

    /// Makes the next `schedule` call fail, as a dead timer thread would.
    pub fn fail_next_schedule(&self) {
        self.clock.borrow_mut().fail_next = true;
    }

    /// Jumps to the earliest pending probe and hands it out.
    pub fn advance_to_next(&self) -> Option<ProbeDue> {
        let mut clock = self.clock.borrow_mut();
        let index = clock
            .pending
            .iter()
            .enumerate()
            .min_by_key(|(_, (due_at, probe))| (*due_at, probe.task))
            .map(|(index, _)| index)?;
        let (due_at, probe) = clock.pending.remove(index);
        clock.now = clock.now.max(due_at);
        Some(probe)
    }

    /// Moves the clock forward and returns every probe that came due.
    pub fn advance_by(&self, by: Duration) -> Vec<ProbeDue> {
        let mut clock = self.clock.borrow_mut();
        let target = clock.now + by;
        let mut due = clock
            .pending
            .iter()
            .filter(|(due_at, _)| *due_at <= target)
            .copied()
            .collect::<Vec<_>>();
        due.sort_by_key(|(due_at, probe)| (*due_at, probe.task));
        clock.pending.retain(|(due_at, _)| *due_at > target);
        clock.now = target;
        due.into_iter().map(|(_, probe)| probe).collect()
    }
}

impl ProbeScheduler for ManualScheduler {
    fn schedule(
        &mut self,
        delay: Duration,
        generation: ActivationGeneration,
    ) -> Result<ProbeTaskId> {
        let mut clock = self.clock.borrow_mut();
        if clock.fail_next {
            clock.fail_next = false;
            return Err(anyhow!("manual scheduler refused probe"));
        }
        clock.next_task = clock.next_task.next();
        clock.scheduled += 1;
        let probe = ProbeDue {
            generation,
            task: clock.next_task,
        };
        let due_at = clock.now + delay;
        clock.pending.push((due_at, probe));
        Ok(probe.task)
    }

    fn cancel(&mut self, task: ProbeTaskId) {
        let mut clock = self.clock.borrow_mut();
        clock.pending.retain(|(_, probe)| probe.task != task);
        clock.cancelled.push(task);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountPlan {
    Never,
    Mounted,
    /// Mounted from the given 1-based probe onward.
    OnProbe(u32),
}

#[derive(Debug)]
struct WidgetScript {
    mount: MountPlan,
    probes: u32,
    rejected_tabs: Vec<String>,
    selections: Vec<TabId>,
    rejections: Vec<TabId>,
}

impl WidgetScript {
    fn is_mounted(&self) -> bool {
        match self.mount {
            MountPlan::Never => false,
            MountPlan::Mounted => true,
            MountPlan::OnProbe(probe) => self.probes >= probe,
        }
    }
}

struct MountedWidget<'a>(RefMut<'a, WidgetScript>);

impl TabSelector for MountedWidget<'_> {
    fn select_tab(&mut self, tab: &TabId) -> Result<()> {
        if self.0.rejected_tabs.iter().any(|key| key == tab.as_str()) {
            self.0.rejections.push(tab.clone());
            return Err(anyhow!("chat widget has no tab {tab}"));
        }
        self.0.selections.push(tab.clone());
        Ok(())
    }
}

/// Chat widget whose mount timing is scripted per probe.
#[derive(Debug, Clone)]
pub struct ScriptedWidget {
    script: Rc<RefCell<WidgetScript>>,
}

impl ScriptedWidget {
    pub fn new(mount: MountPlan) -> Self {
        Self {
            script: Rc::new(RefCell::new(WidgetScript {
                mount,
                probes: 0,
                rejected_tabs: Vec::new(),
                selections: Vec::new(),
                rejections: Vec::new(),
            })),
        }
    }

    pub fn set_mount(&self, mount: MountPlan) {
        self.script.borrow_mut().mount = mount;
    }

    pub fn reject_tab(&self, key: &str) {
        self.script.borrow_mut().rejected_tabs.push(key.to_owned());
    }

    pub fn probe_count(&self) -> u32 {
        self.script.borrow().probes
    }

    pub fn selections(&self) -> Vec<TabId> {
        self.script.borrow().selections.clone()
    }

    pub fn rejections(&self) -> Vec<TabId> {
        self.script.borrow().rejections.clone()
    }
}

impl WidgetLocator for ScriptedWidget {
    fn locate(&mut self) -> Option<WidgetHandle<'_>> {
        let mut script = self.script.borrow_mut();
        script.probes += 1;
        if !script.is_mounted() {
            return None;
        }
        Some(WidgetHandle::new(MountedWidget(script)))
    }
}

#[derive(Debug, Clone, Default)]
pub struct RecordingTrigger {
    opens: Rc<Cell<u32>>,
}

impl RecordingTrigger {
    pub fn open_requests(&self) -> u32 {
        self.opens.get()
    }
}

impl ChatTrigger for RecordingTrigger {
    fn request_open(&mut self) {
        self.opens.set(self.opens.get() + 1);
    }
}

pub type TestActivator = TabActivator<ScriptedWidget, RecordingTrigger, ManualScheduler>;

/// An activator wired to scripted collaborators, plus handles to inspect them.
pub struct ActivationHarness {
    pub activator: TestActivator,
    pub widget: ScriptedWidget,
    pub trigger: RecordingTrigger,
    pub scheduler: ManualScheduler,
}

impl ActivationHarness {
    pub fn new(policy: RetryPolicy, mount: MountPlan) -> Self {
        let widget = ScriptedWidget::new(mount);
        let trigger = RecordingTrigger::default();
        let scheduler = ManualScheduler::new();
        let activator = TabActivator::new(
            policy,
            widget.clone(),
            trigger.clone(),
            scheduler.clone(),
        );
        Self {
            activator,
            widget,
            trigger,
            scheduler,
        }
    }

    /// Fires the next pending probe, if any.
    pub fn step(&mut self) -> Option<Vec<ActivationEvent>> {
        let due = self.scheduler.advance_to_next()?;
        Some(self.activator.handle_probe(due))
    }

    pub fn run_until_idle(&mut self) -> Vec<ActivationEvent> {
        let mut events = Vec::new();
        for _ in 0..RUN_UNTIL_IDLE_LIMIT {
            match self.step() {
                Some(batch) => events.extend(batch),
                None => return events,
            }
        }
        panic!("probe loop did not settle after {RUN_UNTIL_IDLE_LIMIT} steps");
    }
}

#[derive(Debug, Clone)]
struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    fn new(seed: u64) -> Self {
        let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
        if state == 0 {
            state = 0xA409_3822_299F_31D0;
        }
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);

        let mut x = self.state;
        x ^= x >> 13;
        x ^= x << 7;
        x ^= x >> 17;
        x
    }

    fn int_n(&mut self, n: u64) -> u64 {
        if n <= 1 {
            return 0;
        }
        self.next_u64() % n
    }
}

/// Seeded retry policies and mount plans for sweeping the activator.
#[derive(Debug, Clone)]
pub struct ScenarioFaker {
    rng: DeterministicRng,
}

impl ScenarioFaker {
    pub fn new(seed: u64) -> Self {
        let normalized = if seed == 0 { 1 } else { seed };
        Self {
            rng: DeterministicRng::new(normalized),
        }
    }

    pub fn policy(&mut self) -> RetryPolicy {
        let interval_ms = self.rng.int_n(8) * 50;
        let max_retries = self.rng.int_n(8) as u32;
        RetryPolicy::from_millis(interval_ms, max_retries)
    }

    /// Mount plan that succeeds somewhere inside the policy's probe budget.
    pub fn reachable_mount(&mut self, policy: RetryPolicy) -> MountPlan {
        let probe = self.rng.int_n(u64::from(policy.max_probes())) as u32 + 1;
        MountPlan::OnProbe(probe)
    }
}

#[cfg(test)]
mod tests {
    use super::{ManualScheduler, MountPlan, ScenarioFaker, ScriptedWidget};
    use anyhow::Result;
    use civica_activation::{ProbeScheduler, WidgetLocator};
    use civica_app::{ActivationGeneration, TabId};
    use std::time::Duration;

    #[test]
    fn manual_scheduler_orders_by_deadline() -> Result<()> {
        let mut scheduler = ManualScheduler::new();
        let generation = ActivationGeneration::new(1);
        let late = scheduler.schedule(Duration::from_millis(300), generation)?;
        let early = scheduler.schedule(Duration::from_millis(100), generation)?;

        assert_eq!(scheduler.advance_to_next().map(|due| due.task), Some(early));
        assert_eq!(scheduler.now(), Duration::from_millis(100));
        assert_eq!(scheduler.advance_to_next().map(|due| due.task), Some(late));
        assert_eq!(scheduler.now(), Duration::from_millis(300));
        assert_eq!(scheduler.advance_to_next(), None);
        Ok(())
    }

    #[test]
    fn manual_scheduler_cancel_removes_pending() -> Result<()> {
        let mut scheduler = ManualScheduler::new();
        let task = scheduler.schedule(Duration::from_millis(50), ActivationGeneration::new(1))?;
        scheduler.cancel(task);

        assert_eq!(scheduler.pending_len(), 0);
        assert_eq!(scheduler.cancelled(), vec![task]);
        assert!(scheduler.advance_by(Duration::from_secs(1)).is_empty());
        assert_eq!(scheduler.now(), Duration::from_secs(1));
        Ok(())
    }

    #[test]
    fn manual_scheduler_can_refuse_once() -> Result<()> {
        let mut scheduler = ManualScheduler::new();
        scheduler.fail_next_schedule();
        assert!(scheduler.schedule(Duration::ZERO, ActivationGeneration::default()).is_err());
        scheduler.schedule(Duration::ZERO, ActivationGeneration::default())?;
        assert_eq!(scheduler.scheduled_count(), 1);
        Ok(())
    }

    #[test]
    fn scripted_widget_mounts_on_requested_probe() -> Result<()> {
        let mut widget = ScriptedWidget::new(MountPlan::OnProbe(2));
        assert!(widget.locate().is_none());

        let mut handle = widget.locate().expect("mounted on second probe");
        handle.select_tab(&TabId::new("paa"))?;
        drop(handle);

        assert_eq!(widget.probe_count(), 2);
        assert_eq!(widget.selections(), vec![TabId::new("paa")]);
        Ok(())
    }

    #[test]
    fn scripted_widget_rejects_configured_tabs() {
        let mut widget = ScriptedWidget::new(MountPlan::Mounted);
        widget.reject_tab("vacinacao");

        let mut handle = widget.locate().expect("mounted");
        assert!(handle.select_tab(&TabId::new("vacinacao")).is_err());
        drop(handle);

        assert!(widget.selections().is_empty());
        assert_eq!(widget.rejections(), vec![TabId::new("vacinacao")]);
    }

    #[test]
    fn reachable_mount_stays_inside_budget() {
        for seed in 0_u64..50 {
            let mut faker = ScenarioFaker::new(seed);
            let policy = faker.policy();
            match faker.reachable_mount(policy) {
                MountPlan::OnProbe(probe) => {
                    assert!(probe >= 1 && probe <= policy.max_probes(), "seed {seed}");
                }
                other => panic!("unexpected plan {other:?}"),
            }
        }
    }
}
