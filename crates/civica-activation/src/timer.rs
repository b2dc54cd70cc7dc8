// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::{ProbeDue, ProbeScheduler};
use anyhow::{Context, Result, anyhow};
use civica_app::{ActivationGeneration, ProbeTaskId};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

enum TimerCommand {
    Schedule { due_at: Instant, probe: ProbeDue },
    Cancel(ProbeTaskId),
    Shutdown,
}

struct PendingProbe {
    due_at: Instant,
    probe: ProbeDue,
}

/// Probe scheduler backed by one timer thread. Due probes are sent into the
/// UI loop's channel as `E`; cancelled probes are removed before they fire.
pub struct ThreadScheduler {
    commands: Sender<TimerCommand>,
    next_task: ProbeTaskId,
    worker: Option<JoinHandle<()>>,
}

impl ThreadScheduler {
    pub fn spawn<E>(sink: Sender<E>) -> Result<Self>
    where
        E: From<ProbeDue> + Send + 'static,
    {
        let (commands, inbox) = mpsc::channel();
        let worker = thread::Builder::new()
            .name("civica-probe-timer".to_owned())
            .spawn(move || run_timer(inbox, sink))
            .context("spawn chat probe timer thread")?;
        Ok(Self {
            commands,
            next_task: ProbeTaskId::default(),
            worker: Some(worker),
        })
    }
}

impl ProbeScheduler for ThreadScheduler {
    fn schedule(
        &mut self,
        delay: Duration,
        generation: ActivationGeneration,
    ) -> Result<ProbeTaskId> {
        let due_at = Instant::now()
            .checked_add(delay)
            .ok_or_else(|| anyhow!("chat probe delay {delay:?} out of range"))?;
        self.next_task = self.next_task.next();
        let probe = ProbeDue {
            generation,
            task: self.next_task,
        };
        self.commands
            .send(TimerCommand::Schedule { due_at, probe })
            .map_err(|_| anyhow!("chat probe timer thread stopped"))?;
        Ok(probe.task)
    }

    fn cancel(&mut self, task: ProbeTaskId) {
        // A stopped timer has nothing left to fire.
        let _ = self.commands.send(TimerCommand::Cancel(task));
    }
}

impl Drop for ThreadScheduler {
    fn drop(&mut self) {
        let _ = self.commands.send(TimerCommand::Shutdown);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn run_timer<E>(inbox: Receiver<TimerCommand>, sink: Sender<E>)
where
    E: From<ProbeDue>,
{
    let mut pending: Vec<PendingProbe> = Vec::new();
    loop {
        let now = Instant::now();
        let mut index = 0;
        while index < pending.len() {
            if pending[index].due_at <= now {
                let fired = pending.remove(index);
                if sink.send(E::from(fired.probe)).is_err() {
                    return;
                }
            } else {
                index += 1;
            }
        }

        let next_due = pending.iter().map(|entry| entry.due_at).min();
        let command = match next_due {
            Some(due_at) => match inbox.recv_timeout(due_at.saturating_duration_since(now)) {
                Ok(command) => command,
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => return,
            },
            None => match inbox.recv() {
                Ok(command) => command,
                Err(_) => return,
            },
        };

        match command {
            TimerCommand::Schedule { due_at, probe } => {
                pending.push(PendingProbe { due_at, probe });
            }
            TimerCommand::Cancel(task) => {
                pending.retain(|entry| entry.probe.task != task);
            }
            TimerCommand::Shutdown => return,
        }
    }
}
