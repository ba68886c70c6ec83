//! Per-connection session driving one participant through a match
//!
//! Each accepted connection gets its own `Session`, running as an independent
//! task. The session owns the inbound half of the connection; the outbound
//! half lives in the registry so broadcasts can reach it.
//!
//! ```text
//! Connected -> AwaitingTargets -> Ready -> AwaitingOpponent -> Playing -> Finished
//!      \______________\______________\___________\_______________\-> Disconnected
//! ```
//!
//! Whatever way the session ends, [`Session::run`] removes the participant
//! from the registry exactly once before returning.

use crate::match_state::MatchState;
use crate::registry::{ParticipantId, RegistryError, TargetSet};
use crate::turn::resolve_turn;
use log::{debug, info, warn};
use shared::{parse_coordinates, Coordinate, ServerMessage, MAX_LINE_LENGTH};
use std::io;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connected,
    AwaitingTargets,
    Ready,
    AwaitingOpponent,
    Playing,
    Finished,
    Disconnected,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("transport error: {0}")]
    Io(#[from] io::Error),
    #[error("connection closed by peer")]
    Closed,
    #[error("invalid setup: {0}")]
    InvalidSetup(String),
    #[error("no opponent joined within {0:?}")]
    NoOpponent(Duration),
    #[error("line longer than {0} bytes")]
    LineTooLong(usize),
    #[error("participant is no longer registered")]
    Unregistered,
}

pub struct Session<R> {
    id: ParticipantId,
    name: String,
    reader: R,
    state: Arc<MatchState>,
    opponent_timeout: Option<Duration>,
    phase: SessionState,
    hits: usize,
}

impl<R> Session<R>
where
    R: AsyncBufRead + Unpin,
{
    /// Creates a session for a participant that has already been registered.
    pub fn new(
        id: ParticipantId,
        name: String,
        reader: R,
        state: Arc<MatchState>,
        opponent_timeout: Option<Duration>,
    ) -> Self {
        Self {
            id,
            name,
            reader,
            state,
            opponent_timeout,
            phase: SessionState::Connected,
            hits: 0,
        }
    }

    /// Drives the session to a terminal state and cleans up after it.
    pub async fn run(mut self) -> SessionState {
        let result = self.drive().await;
        let left_mid_game = self.phase == SessionState::Playing;

        let terminal = match result {
            Ok(()) => SessionState::Finished,
            Err(SessionError::Closed) => {
                info!("{} disconnected", self.name);
                SessionState::Disconnected
            }
            Err(e) => {
                warn!("{} dropped: {}", self.name, e);
                SessionState::Disconnected
            }
        };
        self.transition(terminal);

        self.state.remove(self.id).await;

        if terminal == SessionState::Disconnected
            && left_mid_game
            && self.state.winner().await.is_none()
        {
            self.state
                .broadcast(&ServerMessage::OpponentDisconnected)
                .await;
        }

        terminal
    }

    async fn drive(&mut self) -> Result<(), SessionError> {
        self.transition(SessionState::AwaitingTargets);
        self.place_targets().await?;
        self.await_opponent().await?;
        self.play().await
    }

    async fn place_targets(&mut self) -> Result<(), SessionError> {
        self.send(&ServerMessage::SetupPrompt).await?;
        let line = match self.read_line().await {
            Ok(Some(line)) => line,
            Ok(None) => return Err(SessionError::Closed),
            Err(SessionError::LineTooLong(limit)) => {
                return self.reject(format!("setup line exceeds {} bytes", limit)).await
            }
            Err(e) => return Err(e),
        };

        let targets: TargetSet = match parse_coordinates(&line) {
            Ok(coordinates) => coordinates.into_iter().collect(),
            Err(e) => return self.reject(e.to_string()).await,
        };

        if let Err(e) = self.state.assign_targets(self.id, targets).await {
            return match e {
                RegistryError::UnknownParticipant(_) => Err(SessionError::Unregistered),
                e => self.reject(e.to_string()).await,
            };
        }

        self.transition(SessionState::Ready);
        info!("{} placed mines", self.name);
        self.state
            .broadcast(&ServerMessage::Ready {
                player: self.name.clone(),
            })
            .await;
        Ok(())
    }

    /// Tells only this participant its setup was refused.
    async fn reject(&mut self, reason: String) -> Result<(), SessionError> {
        debug!("{} sent invalid setup: {}", self.name, reason);
        self.send(&ServerMessage::InvalidInput).await?;
        Err(SessionError::InvalidSetup(reason))
    }

    async fn await_opponent(&mut self) -> Result<(), SessionError> {
        self.transition(SessionState::AwaitingOpponent);

        if !self.state.gate().is_open() {
            self.send(&ServerMessage::WaitingForOpponent).await?;
            if self
                .state
                .gate()
                .wait_timeout(self.opponent_timeout)
                .await
                .is_err()
            {
                let limit = self.opponent_timeout.unwrap_or_default();
                self.send(&ServerMessage::NoOpponent).await?;
                return Err(SessionError::NoOpponent(limit));
            }
        }

        self.transition(SessionState::Playing);
        self.send(&ServerMessage::GameStart).await?;
        Ok(())
    }

    async fn play(&mut self) -> Result<(), SessionError> {
        loop {
            let line = match self.read_line().await? {
                Some(line) => line,
                None => {
                    // Leaving after the match was decided is a normal finish
                    return if self.state.winner().await.is_some() {
                        Ok(())
                    } else {
                        Err(SessionError::Closed)
                    };
                }
            };

            if self.state.winner().await.is_some() {
                return Ok(());
            }

            let token = line.trim();
            if token.is_empty() {
                continue;
            }

            // A failed broadcast may have pruned this participant
            if !self.state.contains(self.id).await {
                return Err(SessionError::Unregistered);
            }

            let guess = Coordinate::normalize(token);
            let (opponent, targets) = self.state.opponent_targets(self.id).await;
            let outcome = resolve_turn(&guess, &targets, self.hits);
            self.hits = outcome.hits;

            debug!("{} guessed {}: {:?}", self.name, guess, outcome.shot);
            self.state
                .broadcast(&ServerMessage::TurnResult {
                    player: self.name.clone(),
                    coordinate: guess,
                    shot: outcome.shot,
                })
                .await;

            if outcome.victory && self.state.claim_victory(self.id).await {
                info!("{} won the match", self.name);
                self.state
                    .broadcast(&ServerMessage::Victory {
                        player: self.name.clone(),
                    })
                    .await;

                if let Some(opponent) = opponent {
                    if let Err(e) = self.state.send_to(opponent, &ServerMessage::Defeat).await {
                        debug!("Could not notify participant {} of defeat: {}", opponent, e);
                    }
                }
                return Ok(());
            }
        }
    }

    async fn send(&mut self, message: &ServerMessage) -> io::Result<()> {
        self.state.send_to(self.id, message).await
    }

    /// Reads one line of at most [`MAX_LINE_LENGTH`] bytes. `None` means the
    /// peer closed the connection.
    async fn read_line(&mut self) -> Result<Option<String>, SessionError> {
        let mut buf = Vec::new();
        let n = (&mut self.reader)
            .take(MAX_LINE_LENGTH as u64 + 1)
            .read_until(b'\n', &mut buf)
            .await?;
        if n == 0 {
            return Ok(None);
        }
        if !buf.ends_with(b"\n") && buf.len() > MAX_LINE_LENGTH {
            return Err(SessionError::LineTooLong(MAX_LINE_LENGTH));
        }
        Ok(Some(String::from_utf8_lossy(&buf).into_owned()))
    }

    fn transition(&mut self, next: SessionState) {
        debug!("{}: {:?} -> {:?}", self.name, self.phase, next);
        self.phase = next;
    }
}
