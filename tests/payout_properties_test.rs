//! Property tests for board generation and the payout curve

use hiwa_mines::gaming::{BoardGenerator, GameRules, GameSession, PayoutModel, Position, SessionState};
use hiwa_mines::Error;
use proptest::prelude::*;

proptest! {
    #[test]
    fn board_has_exact_bomb_count(seed in any::<u64>(), mines in 3u8..=24) {
        let board = BoardGenerator::seeded(seed).generate(mines).unwrap();
        let bombs = board.iter().filter(|(_, t)| t.is_bomb()).count();
        prop_assert_eq!(board.iter().count(), 25);
        prop_assert_eq!(bombs, mines as usize);
        prop_assert_eq!(board.revealed_count(), 0);
    }

    #[test]
    fn multiplier_increases_with_gems(mines in 3u8..=24, edge in 0.0f64..0.1) {
        let model = PayoutModel::new(edge).unwrap();
        let safe = 25 - mines;
        let mut previous = model.multiplier_after(mines, 0);
        prop_assert_eq!(previous, 1.0);
        for gems in 1..=safe {
            let next = model.multiplier_after(mines, gems);
            prop_assert!(next > previous, "mines={} gems={} {} !> {}", mines, gems, next, previous);
            previous = next;
        }
    }

    #[test]
    fn multiplier_increases_with_mines(gems in 1u8..=21, mines in 3u8..24) {
        let model = PayoutModel::default();
        prop_assume!(gems <= 25 - (mines + 1));
        prop_assert!(model.multiplier_after(mines + 1, gems) > model.multiplier_after(mines, gems));
    }

    #[test]
    fn bomb_always_loses(seed in any::<u64>(), mines in 3u8..=24, pick in any::<prop::sample::Index>()) {
        let board = BoardGenerator::seeded(seed).generate(mines).unwrap();
        let bombs: Vec<Position> = board.iter().filter(|(_, t)| t.is_bomb()).map(|(p, _)| p).collect();
        let gems: Vec<Position> = board.iter().filter(|(_, t)| !t.is_bomb()).map(|(p, _)| p).collect();

        let mut session = GameSession::new(1, 10, board, PayoutModel::default(), &GameRules::default()).unwrap();
        // Reveal some gems first, stopping short of clearing the board
        for gem in gems.iter().take(gems.len().saturating_sub(1).min(3)) {
            session.reveal(*gem).unwrap();
        }
        let before = session.multiplier();
        let bomb = bombs[pick.index(bombs.len())];

        prop_assert!(!session.reveal(bomb).unwrap().is_safe());
        prop_assert_eq!(session.state(), SessionState::Lost);
        prop_assert_eq!(session.multiplier(), before);
        prop_assert!(matches!(session.cash_out(), Err(Error::NoActiveGame)));
    }
}
