//! Shared state for one match: the participant registry, the start gate and
//! line-oriented delivery to registered connections
//!
//! One `MatchState` is built per server instance and handed to every session
//! behind an `Arc`. All registry mutations and the gate-open check go through
//! a single `RwLock`; network writes never happen while it is held.

use crate::gate::MatchGate;
use crate::registry::{ParticipantId, Registry, RegistryError, SharedWriter, TargetSet};
use log::{debug, info, warn};
use shared::{ServerMessage, MAX_PARTICIPANTS};
use std::io;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::RwLock;

/// Writes one message followed by a line terminator and flushes it.
pub async fn write_line<W>(writer: &mut W, message: &ServerMessage) -> io::Result<()>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let line = format!("{}\n", message);
    writer.write_all(line.as_bytes()).await?;
    writer.flush().await
}

pub struct MatchState {
    registry: RwLock<Registry>,
    gate: MatchGate,
}

impl MatchState {
    pub fn new() -> Self {
        Self {
            registry: RwLock::new(Registry::new(MAX_PARTICIPANTS)),
            gate: MatchGate::new(),
        }
    }

    pub fn gate(&self) -> &MatchGate {
        &self.gate
    }

    /// Registers a connection and, under the same lock, opens the gate once
    /// the match holds [`MAX_PARTICIPANTS`] participants.
    pub async fn register(
        &self,
        writer: SharedWriter,
    ) -> Result<(ParticipantId, String), RegistryError> {
        let mut registry = self.registry.write().await;
        let registered = registry.register(writer)?;

        if registry.len() >= MAX_PARTICIPANTS && self.gate.open() {
            info!("Match is full, releasing waiting players");
        }

        Ok(registered)
    }

    pub async fn assign_targets(
        &self,
        id: ParticipantId,
        targets: TargetSet,
    ) -> Result<(), RegistryError> {
        self.registry.write().await.assign_targets(id, targets)
    }

    pub async fn find_opponent(&self, id: ParticipantId) -> Option<ParticipantId> {
        self.registry.read().await.find_opponent(id)
    }

    pub async fn opponent_targets(&self, id: ParticipantId) -> (Option<ParticipantId>, TargetSet) {
        self.registry.read().await.opponent_targets(id)
    }

    pub async fn claim_victory(&self, id: ParticipantId) -> bool {
        self.registry.write().await.claim_victory(id)
    }

    pub async fn winner(&self) -> Option<ParticipantId> {
        self.registry.read().await.winner()
    }

    pub async fn contains(&self, id: ParticipantId) -> bool {
        self.registry.read().await.contains(id)
    }

    pub async fn participant_count(&self) -> usize {
        self.registry.read().await.len()
    }

    /// Sends a message to a single registered participant.
    pub async fn send_to(&self, id: ParticipantId, message: &ServerMessage) -> io::Result<()> {
        let writer = self.registry.read().await.writer(id).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotConnected,
                format!("participant {} is not registered", id),
            )
        })?;

        let mut writer = writer.lock().await;
        write_line(&mut *writer, message).await
    }

    /// Sends a message to every registered participant.
    ///
    /// The connection list is snapshotted under the read lock, written to
    /// without it, and any participant whose write failed is removed
    /// afterwards. Returns the number of successful deliveries.
    pub async fn broadcast(&self, message: &ServerMessage) -> usize {
        let writers = self.registry.read().await.writers();

        let mut delivered = 0;
        let mut failed = Vec::new();
        for (id, writer) in writers {
            let mut writer = writer.lock().await;
            match write_line(&mut *writer, message).await {
                Ok(()) => delivered += 1,
                Err(e) => {
                    warn!("Failed to deliver {:?} to participant {}: {}", message.to_string(), id, e);
                    failed.push(id);
                }
            }
        }

        for id in failed {
            self.remove(id).await;
        }

        debug!("Broadcast {:?} to {} participants", message.to_string(), delivered);
        delivered
    }

    /// Removes a participant and closes its connection.
    ///
    /// Safe to call repeatedly and for unknown IDs; only the first call for a
    /// registered participant closes anything. Returns whether it did.
    pub async fn remove(&self, id: ParticipantId) -> bool {
        let removed = self.registry.write().await.remove(id);

        match removed {
            Some(participant) => {
                let mut writer = participant.writer.lock().await;
                if let Err(e) = writer.shutdown().await {
                    debug!("Error closing connection of {}: {}", participant.name, e);
                }
                true
            }
            None => false,
        }
    }

    /// Removes and closes every registered connection.
    pub async fn close_all(&self) {
        let participants = self.registry.write().await.drain();

        for participant in participants {
            let mut writer = participant.writer.lock().await;
            let _ = writer.shutdown().await;
            info!("Closed connection of {}", participant.name);
        }
    }
}

impl Default for MatchState {
    fn default() -> Self {
        Self::new()
    }
}
