//! Player input validation and setup generation

use rand::seq::SliceRandom;
use rand::Rng;
use shared::{
    parse_target_line, Coordinate, CoordinateError, ServerMessage, TargetError, REQUIRED_TARGETS,
};
use thiserror::Error;

/// Where the client is in the match, as far as input handling is concerned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Mines not sent yet
    Setup,
    /// Mines sent, game not started
    Waiting,
    Playing,
}

impl Phase {
    /// Advances the phase in response to a server message.
    pub fn on_message(self, message: &ServerMessage) -> Phase {
        match message {
            ServerMessage::GameStart => Phase::Playing,
            _ => self,
        }
    }

    pub fn prompt(self) -> &'static str {
        match self {
            Phase::Setup => "Your mines (e.g. A1 B2 C3 D4 E5): ",
            Phase::Waiting => "Waiting for the game to start...",
            Phase::Playing => "Your move (e.g. A5): ",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("The game has not started yet")]
    NotYourTurnYet,
    #[error("Invalid mines: {0}")]
    Setup(TargetError),
    #[error("Invalid input! Use format A1-J9 ({0})")]
    Move(CoordinateError),
}

/// Turns a line typed by the player into the line to send, if it is valid
/// for the current phase.
pub fn outgoing_line(phase: Phase, typed: &str) -> Result<String, InputError> {
    match phase {
        Phase::Setup => {
            let mut targets: Vec<Coordinate> = parse_target_line(typed)
                .map_err(InputError::Setup)?
                .into_iter()
                .collect();
            targets.sort();
            Ok(join(&targets))
        }
        Phase::Waiting => Err(InputError::NotYourTurnYet),
        Phase::Playing => Coordinate::parse(typed)
            .map(|coordinate| coordinate.to_string())
            .map_err(InputError::Move),
    }
}

/// Picks [`REQUIRED_TARGETS`] distinct cells at random.
pub fn random_targets<R: Rng + ?Sized>(rng: &mut R) -> Vec<Coordinate> {
    let cells = Coordinate::all();
    let mut targets: Vec<Coordinate> = cells
        .choose_multiple(rng, REQUIRED_TARGETS)
        .cloned()
        .collect();
    targets.sort();
    targets
}

pub fn random_setup_line() -> String {
    join(&random_targets(&mut rand::thread_rng()))
}

fn join(targets: &[Coordinate]) -> String {
    targets
        .iter()
        .map(Coordinate::as_str)
        .collect::<Vec<_>>()
        .join(" ")
}
