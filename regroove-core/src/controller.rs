//! Single owner of the sync engine.
//!
//! Control actions arrive on a channel and are applied in arrival order;
//! finished generator builds arrive on the orchestrator's feedback channel.
//! Resulting events go out on `events_tx`.

use crossbeam_channel::{Receiver, Sender};

use regroove_types::{ControlAction, OutboundEvent};

use crate::dispatch::{dispatch_action, DispatchResult};
use crate::sync::{CommitGate, SyncEngine};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Queued,
    /// Gated action arrived while a commit was running.
    Dropped,
    /// The controller has shut down.
    Disconnected,
}

/// Ingress handle. Drops triggers and recalls while a commit holds the gate
/// instead of queueing them behind it.
#[derive(Clone)]
pub struct ControlSender {
    tx: Sender<ControlAction>,
    gate: CommitGate,
}

impl ControlSender {
    pub fn send(&self, action: ControlAction) -> SendOutcome {
        if action.is_gated() && self.gate.is_held() {
            log::debug!(target: "sync", "{} dropped: commit in progress", action.name());
            return SendOutcome::Dropped;
        }
        match self.tx.send(action) {
            Ok(()) => SendOutcome::Queued,
            Err(_) => SendOutcome::Disconnected,
        }
    }
}

pub struct Controller {
    engine: SyncEngine,
    rx: Receiver<ControlAction>,
    events_tx: Sender<OutboundEvent>,
}

impl Controller {
    pub fn new(engine: SyncEngine, events_tx: Sender<OutboundEvent>) -> (Self, ControlSender) {
        let (tx, rx) = crossbeam_channel::unbounded();
        let sender = ControlSender {
            tx,
            gate: engine.gate().clone(),
        };
        (
            Self {
                engine,
                rx,
                events_tx,
            },
            sender,
        )
    }

    pub fn engine(&self) -> &SyncEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut SyncEngine {
        &mut self.engine
    }

    /// Reinstall the last committed pattern and send it to the host.
    pub fn startup(&mut self) {
        let events = self.engine.restore_origin();
        self.forward(events);
    }

    pub fn handle(&mut self, action: &ControlAction) -> DispatchResult {
        let mut result = dispatch_action(action, &mut self.engine);
        self.forward(std::mem::take(&mut result.events));
        result
    }

    fn forward(&self, events: Vec<OutboundEvent>) {
        for event in events {
            if self.events_tx.send(event).is_err() {
                log::debug!(target: "sync", "event receiver gone");
                return;
            }
        }
    }

    /// Process actions until every `ControlSender` is dropped. Returns the
    /// engine for inspection.
    pub fn run(mut self) -> SyncEngine {
        let control = self.rx.clone();
        let feedback = self.engine.generator().feedback_receiver().clone();

        loop {
            crossbeam_channel::select! {
                recv(control) -> msg => match msg {
                    Ok(action) => {
                        self.handle(&action);
                    }
                    Err(_) => break,
                },
                recv(feedback) -> msg => {
                    if let Ok(build) = msg {
                        let events = self.engine.handle_generation_feedback(build);
                        self.forward(events);
                    }
                }
            }
        }
        log::info!("control channel closed, stopping");
        self.engine
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    use crossbeam_channel::bounded;

    use crate::archive::{ArchiveError, MemoryArchive, PatternArchive};
    use crate::generation::{GenerationOrchestrator, VariationModel};
    use crate::state::EngineSettings;
    use regroove_types::PatternTriple;

    const WAIT: Duration = Duration::from_secs(5);

    struct BlockingArchive {
        entered: Sender<()>,
        release: Receiver<()>,
        inner: MemoryArchive,
    }

    impl PatternArchive for BlockingArchive {
        fn save(&mut self, name: &str, triple: &PatternTriple) -> Result<(), ArchiveError> {
            let _ = self.entered.send(());
            let _ = self.release.recv();
            self.inner.save(name, triple)
        }

        fn load(&self, name: &str) -> Result<PatternTriple, ArchiveError> {
            self.inner.load(name)
        }

        fn contains(&self, name: &str) -> bool {
            self.inner.contains(name)
        }
    }

    fn engine(archive: Box<dyn PatternArchive>) -> SyncEngine {
        let mut settings = EngineSettings::default();
        settings.params.generator.num_samples = 9;
        let generator = GenerationOrchestrator::new(Box::new(VariationModel::seeded(3)), None);
        SyncEngine::new(settings, generator, archive)
    }

    fn recv_ready(events: &Receiver<OutboundEvent>) {
        loop {
            match events.recv_timeout(WAIT).unwrap() {
                OutboundEvent::GeneratorReady { .. } => return,
                _ => continue,
            }
        }
    }

    #[test]
    fn build_feedback_reaches_host() {
        let (events_tx, events_rx) = crossbeam_channel::unbounded();
        let (controller, sender) = Controller::new(engine(Box::new(MemoryArchive::new())), events_tx);
        let handle = thread::spawn(move || controller.run());

        assert_eq!(sender.send(ControlAction::Generate), SendOutcome::Queued);
        recv_ready(&events_rx);

        sender.send(ControlAction::SyncOn(1));
        sender.send(ControlAction::WaitSync(0));
        assert!(matches!(
            events_rx.recv_timeout(WAIT).unwrap(),
            OutboundEvent::FillOnsets(_)
        ));

        drop(sender);
        let engine = handle.join().unwrap();
        assert_eq!(engine.history().len(), 1);
        assert!(engine.store().source().is_some());
    }

    #[test]
    fn triggers_during_commit_are_dropped_at_ingress() {
        let (entered_tx, entered_rx) = bounded(1);
        let (release_tx, release_rx) = bounded(1);
        let archive = BlockingArchive {
            entered: entered_tx,
            release: release_rx,
            inner: MemoryArchive::new(),
        };
        let (events_tx, events_rx) = crossbeam_channel::unbounded();
        let (controller, sender) = Controller::new(engine(Box::new(archive)), events_tx);
        let handle = thread::spawn(move || controller.run());

        sender.send(ControlAction::Generate);
        recv_ready(&events_rx);
        sender.send(ControlAction::SyncMode(1));
        sender.send(ControlAction::SyncOn(1));
        sender.send(ControlAction::SyncTrigger);

        // first trigger is now blocked inside its commit
        entered_rx.recv_timeout(WAIT).unwrap();
        assert_eq!(sender.send(ControlAction::SyncTrigger), SendOutcome::Dropped);
        assert_eq!(sender.send(ControlAction::GetCachedPattern), SendOutcome::Dropped);
        // parameter changes still queue
        assert_eq!(sender.send(ControlAction::Density(0.5)), SendOutcome::Queued);

        release_tx.send(()).unwrap();
        drop(sender);
        let engine = handle.join().unwrap();
        assert_eq!(engine.history().len(), 1);
        // the dropped trigger never toggled the snap alternation
        assert!(!engine.sync_state().snap_armed);
    }

    #[test]
    fn send_after_shutdown_reports_disconnect() {
        let (events_tx, _events_rx) = crossbeam_channel::unbounded();
        let (controller, sender) = Controller::new(engine(Box::new(MemoryArchive::new())), events_tx);
        drop(controller);
        assert_eq!(sender.send(ControlAction::Generate), SendOutcome::Disconnected);
    }

    #[test]
    fn startup_emits_origin() {
        let mut archive = MemoryArchive::new();
        archive.save("origin", &PatternTriple::default()).unwrap();
        let (events_tx, events_rx) = crossbeam_channel::unbounded();
        let (mut controller, _sender) = Controller::new(engine(Box::new(archive)), events_tx);
        controller.startup();
        assert_eq!(events_rx.try_iter().count(), 4);
    }
}
