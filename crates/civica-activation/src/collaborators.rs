// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use civica_app::{ActivationGeneration, ProbeTaskId, TabId};
use std::time::Duration;

/// Tab-selection capability of a mounted chat widget.
pub trait TabSelector {
    fn select_tab(&mut self, tab: &TabId) -> Result<()>;
}

impl<S: TabSelector + ?Sized> TabSelector for &mut S {
    fn select_tab(&mut self, tab: &TabId) -> Result<()> {
        (**self).select_tab(tab)
    }
}

/// Borrowed access to the widget's tab selector. Valid for one probe only.
pub struct WidgetHandle<'a> {
    selector: Box<dyn TabSelector + 'a>,
}

impl<'a> WidgetHandle<'a> {
    pub fn new(selector: impl TabSelector + 'a) -> Self {
        Self {
            selector: Box::new(selector),
        }
    }

    pub fn select_tab(&mut self, tab: &TabId) -> Result<()> {
        self.selector.select_tab(tab)
    }
}

/// Finds the chat widget if it is currently mounted.
pub trait WidgetLocator {
    fn locate(&mut self) -> Option<WidgetHandle<'_>>;
}

/// Asks the host to show the chat widget. Must tolerate repeated calls.
pub trait ChatTrigger {
    fn request_open(&mut self);
}

impl<F: FnMut()> ChatTrigger for F {
    fn request_open(&mut self) {
        self()
    }
}

/// Delivered back to the activator when a scheduled probe is due.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeDue {
    pub generation: ActivationGeneration,
    pub task: ProbeTaskId,
}

/// Deferred probe delivery. Implementations hand the [`ProbeDue`] back to the
/// loop that owns the activator; they never call into it directly.
pub trait ProbeScheduler {
    fn schedule(&mut self, delay: Duration, generation: ActivationGeneration)
    -> Result<ProbeTaskId>;
    fn cancel(&mut self, task: ProbeTaskId);
}

#[cfg(test)]
mod tests {
    use super::{ChatTrigger, TabSelector, WidgetHandle};
    use anyhow::{Result, bail};
    use civica_app::TabId;

    #[derive(Default)]
    struct Tabs {
        selected: Vec<String>,
    }

    impl TabSelector for Tabs {
        fn select_tab(&mut self, tab: &TabId) -> Result<()> {
            if tab.as_str() == "nope" {
                bail!("unknown tab {tab}");
            }
            self.selected.push(tab.to_string());
            Ok(())
        }
    }

    #[test]
    fn handle_forwards_to_borrowed_selector() -> Result<()> {
        let mut tabs = Tabs::default();
        {
            let mut handle = WidgetHandle::new(&mut tabs);
            handle.select_tab(&TabId::new("paa"))?;
            assert!(handle.select_tab(&TabId::new("nope")).is_err());
        }
        assert_eq!(tabs.selected, vec!["paa".to_owned()]);
        Ok(())
    }

    #[test]
    fn closures_act_as_triggers() {
        let mut opened = 0;
        {
            let mut trigger = || opened += 1;
            trigger.request_open();
            trigger.request_open();
        }
        assert_eq!(opened, 2);
    }
}
