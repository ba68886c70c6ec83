//! Participant bookkeeping for the single match hosted by a server
//!
//! This module tracks every registered connection and its per-connection
//! session state:
//! - Join order and monotonic participant IDs (`Player-0`, `Player-1`, ...)
//! - The outbound half of each connection, shared with broadcast
//! - The hidden target set assigned once during setup
//! - The match winner, recorded at most once
//!
//! The registry itself is plain data. `MatchState` wraps it in a single lock so
//! that registration, target assignment, opponent lookup and removal are
//! mutually exclusive.

use log::info;
use shared::{Coordinate, REQUIRED_TARGETS};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::io::AsyncWrite;
use tokio::sync::Mutex;

pub type ParticipantId = u32;
pub type TargetSet = HashSet<Coordinate>;
pub type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;
/// Outbound half of a connection. Session replies and broadcasts both lock it
/// per message, never while holding the registry lock.
pub type SharedWriter = Arc<Mutex<BoxedWriter>>;

pub fn shared_writer<W>(writer: W) -> SharedWriter
where
    W: AsyncWrite + Send + Unpin + 'static,
{
    Arc::new(Mutex::new(Box::new(writer)))
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("target set must contain exactly {expected} distinct coordinates, got {actual}")]
    InvalidTargets { expected: usize, actual: usize },
    #[error("participant {0} is not registered")]
    UnknownParticipant(ParticipantId),
    #[error("match already has {0} participants")]
    MatchFull(usize),
}

/// A registered connection and the state its session has published
pub struct Participant {
    pub id: ParticipantId,
    pub name: String,
    pub writer: SharedWriter,
    /// Assigned once during setup, immutable afterwards
    pub targets: Option<TargetSet>,
    pub joined_at: Instant,
}

impl Participant {
    pub fn new(id: ParticipantId, writer: SharedWriter) -> Self {
        Self {
            id,
            name: format!("Player-{}", id),
            writer,
            targets: None,
            joined_at: Instant::now(),
        }
    }
}

/// Registered participants in join order
pub struct Registry {
    participants: HashMap<ParticipantId, Participant>,
    order: Vec<ParticipantId>,
    next_id: ParticipantId,
    capacity: usize,
    winner: Option<ParticipantId>,
}

impl Registry {
    /// Creates an empty registry admitting at most `capacity` connections at once.
    ///
    /// IDs start at 0 and are never reused, even after a participant leaves.
    pub fn new(capacity: usize) -> Self {
        Self {
            participants: HashMap::new(),
            order: Vec::new(),
            next_id: 0,
            capacity,
            winner: None,
        }
    }

    /// Registers a new connection and returns its ID and display name.
    ///
    /// Fails without consuming an ID when the match is already full.
    pub fn register(&mut self, writer: SharedWriter) -> Result<(ParticipantId, String), RegistryError> {
        if self.participants.len() >= self.capacity {
            return Err(RegistryError::MatchFull(self.participants.len()));
        }

        let id = self.next_id;
        self.next_id += 1;

        let participant = Participant::new(id, writer);
        let name = participant.name.clone();
        info!("{} registered ({} active)", name, self.participants.len() + 1);

        self.participants.insert(id, participant);
        self.order.push(id);

        Ok((id, name))
    }

    /// Stores the participant's hidden targets.
    ///
    /// The set must hold exactly [`REQUIRED_TARGETS`] coordinates. On failure
    /// the registry is left untouched.
    pub fn assign_targets(
        &mut self,
        id: ParticipantId,
        targets: TargetSet,
    ) -> Result<(), RegistryError> {
        if targets.len() != REQUIRED_TARGETS {
            return Err(RegistryError::InvalidTargets {
                expected: REQUIRED_TARGETS,
                actual: targets.len(),
            });
        }

        let participant = self
            .participants
            .get_mut(&id)
            .ok_or(RegistryError::UnknownParticipant(id))?;
        participant.targets = Some(targets);
        Ok(())
    }

    /// First other registered participant in join order.
    ///
    /// A linear scan; a match never holds more than two entries.
    pub fn find_opponent(&self, id: ParticipantId) -> Option<ParticipantId> {
        self.order.iter().copied().find(|other| *other != id)
    }

    /// The opponent, if any, together with a copy of its targets.
    ///
    /// An opponent that has not finished setup yields an empty set.
    pub fn opponent_targets(&self, id: ParticipantId) -> (Option<ParticipantId>, TargetSet) {
        let opponent = self.find_opponent(id);
        let targets = opponent
            .and_then(|opponent| self.participants.get(&opponent))
            .and_then(|participant| participant.targets.clone())
            .unwrap_or_default();
        (opponent, targets)
    }

    /// Removes a participant. Returns `None` for unknown or already removed IDs.
    pub fn remove(&mut self, id: ParticipantId) -> Option<Participant> {
        let participant = self.participants.remove(&id)?;
        self.order.retain(|other| *other != id);
        info!(
            "{} removed after {:.1}s ({} active)",
            participant.name,
            participant.joined_at.elapsed().as_secs_f32(),
            self.participants.len()
        );
        Some(participant)
    }

    /// Takes every participant out of the registry, in join order.
    pub fn drain(&mut self) -> Vec<Participant> {
        let order = std::mem::take(&mut self.order);
        order
            .into_iter()
            .filter_map(|id| self.participants.remove(&id))
            .collect()
    }

    /// Records `id` as the winner unless the match has already been decided.
    pub fn claim_victory(&mut self, id: ParticipantId) -> bool {
        if self.winner.is_some() {
            return false;
        }
        self.winner = Some(id);
        true
    }

    pub fn winner(&self) -> Option<ParticipantId> {
        self.winner
    }

    pub fn get(&self, id: ParticipantId) -> Option<&Participant> {
        self.participants.get(&id)
    }

    pub fn writer(&self, id: ParticipantId) -> Option<SharedWriter> {
        self.participants
            .get(&id)
            .map(|participant| Arc::clone(&participant.writer))
    }

    /// Snapshot of every outbound half, in join order
    pub fn writers(&self) -> Vec<(ParticipantId, SharedWriter)> {
        self.order
            .iter()
            .filter_map(|id| {
                self.participants
                    .get(id)
                    .map(|participant| (*id, Arc::clone(&participant.writer)))
            })
            .collect()
    }

    pub fn contains(&self, id: ParticipantId) -> bool {
        self.participants.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::MAX_PARTICIPANTS;

    fn sink_writer() -> SharedWriter {
        shared_writer(tokio::io::sink())
    }

    fn targets(line: &str) -> TargetSet {
        line.split_whitespace().map(Coordinate::normalize).collect()
    }

    #[test]
    fn test_register_assigns_sequential_names() {
        let mut registry = Registry::new(MAX_PARTICIPANTS);

        let (id0, name0) = registry.register(sink_writer()).unwrap();
        let (id1, name1) = registry.register(sink_writer()).unwrap();

        assert_eq!((id0, name0.as_str()), (0, "Player-0"));
        assert_eq!((id1, name1.as_str()), (1, "Player-1"));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_ids_are_not_reused_after_removal() {
        let mut registry = Registry::new(MAX_PARTICIPANTS);

        let (id0, _) = registry.register(sink_writer()).unwrap();
        registry.remove(id0);
        let (id1, name1) = registry.register(sink_writer()).unwrap();

        assert_eq!(id1, 1);
        assert_eq!(name1, "Player-1");
    }

    #[test]
    fn test_register_rejects_when_full() {
        let mut registry = Registry::new(MAX_PARTICIPANTS);
        registry.register(sink_writer()).unwrap();
        registry.register(sink_writer()).unwrap();

        let result = registry.register(sink_writer());
        assert_eq!(result, Err(RegistryError::MatchFull(2)));
        assert_eq!(registry.len(), 2);

        // The refused connection did not burn an ID
        registry.remove(0);
        let (id, _) = registry.register(sink_writer()).unwrap();
        assert_eq!(id, 2);
    }

    #[test]
    fn test_assign_targets_accepts_five() {
        let mut registry = Registry::new(MAX_PARTICIPANTS);
        let (id, _) = registry.register(sink_writer()).unwrap();

        assert!(registry.get(id).unwrap().targets.is_none());
        registry
            .assign_targets(id, targets("A1 B2 C3 D4 E5"))
            .unwrap();
        assert!(registry.get(id).unwrap().targets.is_some());
    }

    #[test]
    fn test_assign_targets_wrong_size_leaves_state_untouched() {
        let mut registry = Registry::new(MAX_PARTICIPANTS);
        let (id, _) = registry.register(sink_writer()).unwrap();

        for line in ["", "A1 B2 C3 D4", "A1 B2 C3 D4 E5 F6", "A1 A1 B2 C3 D4"] {
            let result = registry.assign_targets(id, targets(line));
            assert!(
                matches!(result, Err(RegistryError::InvalidTargets { expected: 5, .. })),
                "{:?} should be rejected",
                line
            );
            assert!(registry.get(id).unwrap().targets.is_none());
        }
    }

    #[test]
    fn test_assign_targets_unknown_participant() {
        let mut registry = Registry::new(MAX_PARTICIPANTS);
        let result = registry.assign_targets(7, targets("A1 B2 C3 D4 E5"));
        assert_eq!(result, Err(RegistryError::UnknownParticipant(7)));
    }

    #[test]
    fn test_find_opponent() {
        let mut registry = Registry::new(MAX_PARTICIPANTS);
        let (id0, _) = registry.register(sink_writer()).unwrap();
        assert_eq!(registry.find_opponent(id0), None);

        let (id1, _) = registry.register(sink_writer()).unwrap();
        assert_eq!(registry.find_opponent(id0), Some(id1));
        assert_eq!(registry.find_opponent(id1), Some(id0));

        registry.remove(id1);
        assert_eq!(registry.find_opponent(id0), None);
    }

    #[test]
    fn test_opponent_targets() {
        let mut registry = Registry::new(MAX_PARTICIPANTS);
        let (id0, _) = registry.register(sink_writer()).unwrap();
        let (id1, _) = registry.register(sink_writer()).unwrap();

        let (opponent, set) = registry.opponent_targets(id0);
        assert_eq!(opponent, Some(id1));
        assert!(set.is_empty());

        registry
            .assign_targets(id1, targets("B1 B2 B3 B4 B5"))
            .unwrap();
        let (_, set) = registry.opponent_targets(id0);
        assert!(set.contains(&Coordinate::normalize("B3")));
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut registry = Registry::new(MAX_PARTICIPANTS);
        let (id, _) = registry.register(sink_writer()).unwrap();

        assert!(registry.remove(id).is_some());
        assert!(registry.remove(id).is_none());
        assert!(registry.remove(42).is_none());
        assert!(registry.is_empty());
        assert!(registry.writers().is_empty());
    }

    #[test]
    fn test_writers_follow_join_order() {
        let mut registry = Registry::new(MAX_PARTICIPANTS);
        let (id0, _) = registry.register(sink_writer()).unwrap();
        let (id1, _) = registry.register(sink_writer()).unwrap();

        let ids: Vec<_> = registry.writers().into_iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![id0, id1]);
        assert!(registry.writer(id1).is_some());
        assert!(registry.writer(99).is_none());
    }

    #[test]
    fn test_claim_victory_once() {
        let mut registry = Registry::new(MAX_PARTICIPANTS);
        assert_eq!(registry.winner(), None);
        assert!(registry.claim_victory(1));
        assert!(!registry.claim_victory(0));
        assert_eq!(registry.winner(), Some(1));
    }

    #[test]
    fn test_drain() {
        let mut registry = Registry::new(MAX_PARTICIPANTS);
        registry.register(sink_writer()).unwrap();
        registry.register(sink_writer()).unwrap();

        let drained = registry.drain();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].name, "Player-0");
        assert!(registry.is_empty());
    }
}
