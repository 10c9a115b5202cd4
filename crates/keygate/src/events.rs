//! Progress milestones published by the engine.
//!
//! Control flow never depends on whether anyone is listening: events are
//! fire-and-forget, and a lagging subscriber only loses old events.

use keygate_core::{Address, Domain, RitualId};
use tokio::sync::broadcast;

use crate::error::ErrorCategory;
use crate::playback::TrackId;
use crate::store::ContentId;

/// A named step in an encrypt, decrypt, or playback flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    ConditionValidated { kind: String },
    FetchingParameters { domain: Domain, ritual: RitualId },
    ParametersFetched { ritual: RitualId, threshold: u16 },
    Encrypting { bytes: usize },
    Encrypted { bytes: usize },
    Uploaded { cid: ContentId },
    RequestingIdentity,
    IdentityAsserted { address: Address },
    PetitioningNetwork { attempt: u32 },
    RetryScheduled { attempt: u32, delay_ms: u64, reason: String },
    Granted,
    Denied { reason: String },
    Failed { category: ErrorCategory },
    SessionActivated { track: TrackId, generation: u64 },
    PlaybackToggled { track: TrackId, playing: bool },
    SessionTornDown { track: TrackId, generation: u64 },
}

/// Broadcast fan-out for [`EngineEvent`]s. Clones share the channel.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<EngineEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.sender.subscribe()
    }

    /// Publish an event. Having no subscribers is not an error.
    pub fn emit(&self, event: EngineEvent) {
        let _ = self.sender.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_without_subscribers() {
        let bus = EventBus::new(4);
        bus.emit(EngineEvent::Granted);
    }

    #[tokio::test]
    async fn test_subscribers_receive_in_order() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();

        bus.emit(EngineEvent::Encrypting { bytes: 10 });
        bus.emit(EngineEvent::Encrypted { bytes: 26 });

        assert_eq!(rx.recv().await.unwrap(), EngineEvent::Encrypting { bytes: 10 });
        assert_eq!(rx.recv().await.unwrap(), EngineEvent::Encrypted { bytes: 26 });
    }
}
