//! Scoring of a single guess against the opponent's hidden targets

use crate::registry::TargetSet;
use shared::{Coordinate, Shot, REQUIRED_TARGETS};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnOutcome {
    /// Hit count after this guess
    pub hits: usize,
    pub shot: Shot,
    /// True only on the guess that brings the hit count to [`REQUIRED_TARGETS`]
    pub victory: bool,
}

/// Resolves `guess` against `opponent_targets` given the guesser's current hit count.
///
/// Guesses are not de-duplicated: guessing the same target again scores again.
pub fn resolve_turn(guess: &Coordinate, opponent_targets: &TargetSet, hits: usize) -> TurnOutcome {
    if !opponent_targets.contains(guess) {
        return TurnOutcome {
            hits,
            shot: Shot::Miss,
            victory: false,
        };
    }

    let new_hits = hits + 1;
    TurnOutcome {
        hits: new_hits,
        shot: Shot::Hit { hits: new_hits },
        victory: hits < REQUIRED_TARGETS && new_hits >= REQUIRED_TARGETS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn targets() -> TargetSet {
        ["A1", "B2", "C3", "D4", "E5"]
            .iter()
            .map(|c| Coordinate::normalize(c))
            .collect()
    }

    #[test]
    fn test_hit_increments() {
        let outcome = resolve_turn(&Coordinate::normalize("A1"), &targets(), 0);
        assert_eq!(outcome.hits, 1);
        assert_eq!(outcome.shot, Shot::Hit { hits: 1 });
        assert!(!outcome.victory);
    }

    #[test]
    fn test_miss_keeps_count() {
        let outcome = resolve_turn(&Coordinate::normalize("Z9"), &targets(), 2);
        assert_eq!(outcome.hits, 2);
        assert_eq!(outcome.shot, Shot::Miss);
        assert!(!outcome.victory);
    }

    #[test]
    fn test_miss_against_empty_targets() {
        let outcome = resolve_turn(&Coordinate::normalize("A1"), &TargetSet::new(), 0);
        assert_eq!(outcome.shot, Shot::Miss);
    }

    #[test]
    fn test_victory_exactly_on_fifth_hit() {
        let targets = targets();
        let mut hits = 0;
        let mut victories = Vec::new();

        for guess in ["A1", "B2", "C3", "D4", "E5"] {
            let outcome = resolve_turn(&Coordinate::normalize(guess), &targets, hits);
            hits = outcome.hits;
            victories.push(outcome.victory);
        }

        assert_eq!(hits, REQUIRED_TARGETS);
        assert_eq!(victories, vec![false, false, false, false, true]);
    }

    #[test]
    fn test_no_second_victory_after_threshold() {
        let outcome = resolve_turn(&Coordinate::normalize("A1"), &targets(), REQUIRED_TARGETS);
        assert_eq!(outcome.hits, REQUIRED_TARGETS + 1);
        assert!(!outcome.victory);
    }

    #[test]
    fn test_repeated_guess_scores_each_time() {
        let targets = targets();
        let guess = Coordinate::normalize("C3");
        let mut hits = 0;

        for expected in 1..=REQUIRED_TARGETS {
            let outcome = resolve_turn(&guess, &targets, hits);
            hits = outcome.hits;
            assert_eq!(outcome.shot, Shot::Hit { hits: expected });
            assert_eq!(outcome.victory, expected == REQUIRED_TARGETS);
        }
    }
}
