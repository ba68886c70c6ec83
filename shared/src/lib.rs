//! Protocol vocabulary shared by the minefield server and its terminal client.
//!
//! The wire format is plain text, one message per line. Clients send either a
//! setup line of space separated coordinates or a single guessed coordinate;
//! the server answers with the lines modelled by [`ServerMessage`].

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Number of hidden targets every participant places during setup.
pub const REQUIRED_TARGETS: usize = 5;
/// Participants in a single match.
pub const MAX_PARTICIPANTS: usize = 2;
pub const DEFAULT_PORT: u16 = 65432;
/// Longest line, in bytes and excluding the terminator, a peer may send.
pub const MAX_LINE_LENGTH: usize = 1024;

pub const FIRST_COLUMN: char = 'A';
pub const LAST_COLUMN: char = 'J';
pub const FIRST_ROW: u8 = 1;
pub const LAST_ROW: u8 = 9;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoordinateError {
    #[error("coordinate `{0}` must be one column letter followed by one row digit")]
    Malformed(String),
    #[error("column `{0}` is outside A-J")]
    ColumnOutOfRange(char),
    #[error("row `{0}` is outside 1-9")]
    RowOutOfRange(char),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TargetError {
    #[error("expected 5 coordinates, got {0}")]
    WrongCount(usize),
    #[error("coordinate {0} was given more than once")]
    Duplicate(Coordinate),
    #[error(transparent)]
    Coordinate(#[from] CoordinateError),
}

/// A board cell token such as `B7`, always stored upper-cased.
///
/// [`Coordinate::normalize`] accepts any token (moves are trusted and simply
/// miss when they name a cell outside the board), while [`Coordinate::parse`]
/// also enforces the board bounds.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Coordinate(String);

impl Coordinate {
    pub fn normalize(raw: &str) -> Self {
        Coordinate(raw.trim().to_ascii_uppercase())
    }

    pub fn parse(raw: &str) -> Result<Self, CoordinateError> {
        let coordinate = Self::normalize(raw);
        let mut chars = coordinate.0.chars();
        let (column, row) = match (chars.next(), chars.next(), chars.next()) {
            (Some(column), Some(row), None) => (column, row),
            _ => return Err(CoordinateError::Malformed(coordinate.0)),
        };

        if !(FIRST_COLUMN..=LAST_COLUMN).contains(&column) {
            return Err(CoordinateError::ColumnOutOfRange(column));
        }

        match row.to_digit(10) {
            Some(digit) if (FIRST_ROW as u32..=LAST_ROW as u32).contains(&digit) => {
                Ok(coordinate)
            }
            _ => Err(CoordinateError::RowOutOfRange(row)),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Every cell on the board, column-major.
    pub fn all() -> Vec<Coordinate> {
        (FIRST_COLUMN..=LAST_COLUMN)
            .flat_map(|column| {
                (FIRST_ROW..=LAST_ROW).map(move |row| Coordinate(format!("{}{}", column, row)))
            })
            .collect()
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Parses every whitespace separated token of a setup line as an in-bounds coordinate.
pub fn parse_coordinates(line: &str) -> Result<Vec<Coordinate>, CoordinateError> {
    line.split_whitespace().map(Coordinate::parse).collect()
}

/// Strict setup validation: exactly [`REQUIRED_TARGETS`] distinct in-bounds coordinates.
pub fn parse_target_line(line: &str) -> Result<HashSet<Coordinate>, TargetError> {
    let coordinates = parse_coordinates(line)?;
    if coordinates.len() != REQUIRED_TARGETS {
        return Err(TargetError::WrongCount(coordinates.len()));
    }

    let mut targets = HashSet::with_capacity(REQUIRED_TARGETS);
    for coordinate in coordinates {
        if targets.contains(&coordinate) {
            return Err(TargetError::Duplicate(coordinate));
        }
        targets.insert(coordinate);
    }
    Ok(targets)
}

/// Outcome of a single guess as reported on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shot {
    Hit { hits: usize },
    Miss,
}

/// Every line the server can send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    SetupPrompt,
    InvalidInput,
    Ready { player: String },
    WaitingForOpponent,
    GameStart,
    TurnResult {
        player: String,
        coordinate: Coordinate,
        shot: Shot,
    },
    Victory { player: String },
    Defeat,
    MatchFull,
    NoOpponent,
    OpponentDisconnected,
}

impl ServerMessage {
    /// Whether the receiving client should stop after this message.
    pub fn ends_session(&self) -> bool {
        matches!(
            self,
            ServerMessage::InvalidInput
                | ServerMessage::Victory { .. }
                | ServerMessage::Defeat
                | ServerMessage::MatchFull
                | ServerMessage::NoOpponent
        )
    }
}

impl fmt::Display for ServerMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerMessage::SetupPrompt => write!(
                f,
                "SET MINES ({} coordinates, e.g. A1 B2):",
                REQUIRED_TARGETS
            ),
            ServerMessage::InvalidInput => f.write_str("INVALID_INPUT"),
            ServerMessage::Ready { player } => write!(f, "{} READY", player),
            ServerMessage::WaitingForOpponent => f.write_str("WAITING_FOR_OPPONENT"),
            ServerMessage::GameStart => f.write_str("GAME_START"),
            ServerMessage::TurnResult {
                player,
                coordinate,
                shot: Shot::Hit { hits },
            } => write!(
                f,
                "{} -> {}: HIT ({}/{})",
                player, coordinate, hits, REQUIRED_TARGETS
            ),
            ServerMessage::TurnResult {
                player,
                coordinate,
                shot: Shot::Miss,
            } => write!(f, "{} -> {}: MISS", player, coordinate),
            ServerMessage::Victory { player } => write!(f, "{} VICTORY", player),
            ServerMessage::Defeat => f.write_str("DEFEAT"),
            ServerMessage::MatchFull => f.write_str("MATCH_FULL"),
            ServerMessage::NoOpponent => f.write_str("NO_OPPONENT"),
            ServerMessage::OpponentDisconnected => f.write_str("OPPONENT_DISCONNECTED"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognised server message: {0:?}")]
pub struct ParseMessageError(pub String);

impl FromStr for ServerMessage {
    type Err = ParseMessageError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let unknown = || ParseMessageError(line.to_string());

        match line {
            "INVALID_INPUT" => return Ok(ServerMessage::InvalidInput),
            "WAITING_FOR_OPPONENT" => return Ok(ServerMessage::WaitingForOpponent),
            "GAME_START" => return Ok(ServerMessage::GameStart),
            "DEFEAT" => return Ok(ServerMessage::Defeat),
            "MATCH_FULL" => return Ok(ServerMessage::MatchFull),
            "NO_OPPONENT" => return Ok(ServerMessage::NoOpponent),
            "OPPONENT_DISCONNECTED" => return Ok(ServerMessage::OpponentDisconnected),
            _ => {}
        }

        if line.starts_with("SET MINES") {
            return Ok(ServerMessage::SetupPrompt);
        }

        if let Some((player, rest)) = line.split_once(" -> ") {
            let (coordinate, verdict) = rest.split_once(": ").ok_or_else(unknown)?;
            let shot = if verdict == "MISS" {
                Shot::Miss
            } else {
                let hits = verdict
                    .strip_prefix("HIT (")
                    .and_then(|tail| tail.split_once('/'))
                    .and_then(|(hits, _)| hits.parse().ok())
                    .ok_or_else(unknown)?;
                Shot::Hit { hits }
            };
            return Ok(ServerMessage::TurnResult {
                player: player.to_string(),
                coordinate: Coordinate::normalize(coordinate),
                shot,
            });
        }

        if let Some(player) = line.strip_suffix(" READY") {
            return Ok(ServerMessage::Ready {
                player: player.to_string(),
            });
        }

        if let Some(player) = line.strip_suffix(" VICTORY") {
            return Ok(ServerMessage::Victory {
                player: player.to_string(),
            });
        }

        Err(unknown())
    }
}
