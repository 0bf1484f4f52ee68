//! Integration tests for the auto2048 library public API

use auto2048::{
    game::{apply_move, encode_state, ClassicRules, Direction, GameState, Grid},
    memory::Memory,
    search::{rank_moves, IncrementalSearch, SearchHyperparameters},
    training::{bellman_target, decay_epsilon, RewardShaping, INVALID_MOVE_PENALTY},
    Auto2048Error, Result, DESCRIPTION, NAME, VERSION,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;

fn state(rows: [[u32; 4]; 4], score: u64) -> GameState {
    GameState::from_rows(rows, score, &ClassicRules::default()).unwrap()
}

fn random_board(rng: &mut StdRng) -> GameState {
    let mut rows = [[0u32; 4]; 4];
    for row in rows.iter_mut() {
        for cell in row.iter_mut() {
            if rng.random_bool(0.6) {
                *cell = 1u32 << rng.random_range(1u32..=6);
            }
        }
    }
    state(rows, rng.random_range(0..5000))
}

#[test]
fn test_library_metadata() {
    assert!(!VERSION.is_empty());
    assert_eq!(NAME, "auto2048");
    assert!(!DESCRIPTION.is_empty());
}

#[test]
fn test_result_type_alias() {
    let success: Result<i32> = Ok(42);
    assert_eq!(success.unwrap(), 42);

    let failure: Result<i32> = Err(Auto2048Error::NoValidMove);
    assert!(failure.is_err());
}

#[test]
fn test_direction_index_and_key_code_round_trip() {
    for k in 0..4 {
        let direction = Direction::from_index(k).unwrap();
        let key = direction.key_code();
        assert_eq!(Direction::from_key_code(key).unwrap().index(), k);
    }
    assert!(Direction::from_index(4).is_none());
    assert!(Direction::from_key_code(13).is_none());
}

#[test]
fn test_apply_move_leaves_input_untouched() {
    let rules = ClassicRules::default();
    let mut rng = StdRng::seed_from_u64(21);
    for _ in 0..50 {
        let board = random_board(&mut rng);
        let before = board.clone();
        for direction in Direction::ALL {
            let _ = apply_move(&board, direction, &rules);
            assert_eq!(board, before);
        }
    }
}

#[test]
fn test_encoding_is_deterministic_and_local() {
    let a = state([[2, 0, 0, 4], [0, 8, 0, 0], [0; 4], [0, 0, 0, 2048]], 0);
    let b = a.clone();
    assert_eq!(encode_state(&a), encode_state(&b));

    let c = state([[2, 0, 0, 4], [0, 8, 0, 0], [0, 0, 16, 0], [0, 0, 0, 2048]], 0);
    let (ea, ec) = (encode_state(&a), encode_state(&c));
    let differing: Vec<usize> = (0..16).filter(|&i| ea[i] != ec[i]).collect();
    assert_eq!(differing, vec![2 * 4 + 2]);
    assert_eq!(ec[10], 4.0);
    assert_eq!(ea[15], 11.0);
}

#[test]
fn test_ranking_is_always_a_full_permutation() {
    let rules = ClassicRules::default();
    let params = SearchHyperparameters::with_depth(3);
    let mut rng = StdRng::seed_from_u64(5);
    let mut incremental = IncrementalSearch::new(SearchHyperparameters {
        incremental: true,
        ..SearchHyperparameters::with_depth(3)
    });

    let stuck = state([[2, 4, 2, 4], [4, 2, 4, 2], [2, 4, 2, 4], [4, 2, 4, 2]], 0);
    let single = state([[0, 0, 0, 0], [0, 2, 0, 0], [0; 4], [0; 4]], 0);
    let mut boards = vec![stuck, single];
    boards.extend((0..20).map(|_| random_board(&mut rng)));

    for board in &boards {
        let ranking = rank_moves(board, &rules, &params, &mut rng);
        assert_eq!(ranking.iter().collect::<HashSet<_>>().len(), 4);

        let ranking = incremental.rank_moves(board, &rules, &mut rng).unwrap();
        assert_eq!(ranking.iter().collect::<HashSet<_>>().len(), 4);
    }
}

#[test]
fn test_epsilon_decay_bounds_and_monotonicity() {
    let (min, max, speed) = (0.001, 0.9, 1e-5);
    let mut previous = f64::INFINITY;
    for t in (0..2_000_000u64).step_by(10_007) {
        let epsilon = decay_epsilon(min, max, speed, t);
        assert!(epsilon >= min && epsilon <= max + 1e-12, "t={t} eps={epsilon}");
        assert!(epsilon <= previous);
        previous = epsilon;
    }
}

#[test]
fn test_memory_never_exceeds_capacity() {
    let mut rng = StdRng::seed_from_u64(99);
    let mut fifo = Memory::new(17);
    let mut best: Memory<u32> = Memory::keep_best(17, |v| f64::from(*v), 0.3);
    for i in 0..500u32 {
        fifo.add(i);
        best.add(rng.random_range(0..1000));
        assert!(fifo.len() <= fifo.capacity());
        assert!(best.len() <= best.capacity());

        let n = rng.random_range(0..40);
        let recalled = fifo.recall_randomly(n, &mut rng);
        assert_eq!(recalled.len(), n.min(fifo.len()));
        let distinct: HashSet<*const u32> = recalled.iter().map(|v| *v as *const u32).collect();
        assert_eq!(distinct.len(), recalled.len());
    }
}

#[test]
fn test_terminal_target_is_the_reward() {
    for reward in [-1.0f32, 0.0, 1.0, 0.37] {
        assert_eq!(bellman_target(reward, None, 0.95), reward);
        assert!((bellman_target(reward, Some(2.0), 0.95) - (reward + 1.9)).abs() < 1e-6);
    }
}

#[test]
fn test_single_pair_merge_scenario() {
    let rules = ClassicRules::default();
    let board = state([[0, 0, 0, 0], [8, 0, 0, 0], [8, 0, 0, 0], [0; 4]], 100);

    let merged = apply_move(&board, Direction::Up, &rules);
    assert!(merged.was_moved);
    assert_eq!(merged.score_delta, 16);
    assert_eq!(merged.state.score, 116);
    assert_eq!(merged.state.grid.value_at(0, 0), 16);
    assert_eq!(
        RewardShaping::TileCount.reward_for(&board, Some(&merged.state)),
        1.0
    );

    // The pair already touches the left wall.
    let blocked = apply_move(&board, Direction::Left, &rules);
    assert!(!blocked.was_moved);
    assert_eq!(blocked.score_delta, 0);
    assert_eq!(blocked.state.grid, board.grid);
    assert_eq!(
        RewardShaping::TileCount.reward_for(&board, None),
        INVALID_MOVE_PENALTY
    );

    let down = apply_move(&board, Direction::Down, &rules);
    assert!(down.was_moved);
    assert_eq!(down.score_delta, 16);
}

#[test]
fn test_horizontal_pair_in_corner() {
    let rules = ClassicRules::default();
    let board = state([[4, 4, 0, 0], [0; 4], [0; 4], [0; 4]], 0);

    for (direction, moved, delta) in [
        (Direction::Left, true, 8),
        (Direction::Right, true, 8),
        (Direction::Up, false, 0),
        (Direction::Down, true, 0),
    ] {
        let outcome = apply_move(&board, direction, &rules);
        assert_eq!(outcome.was_moved, moved, "{direction}");
        assert_eq!(outcome.score_delta, delta, "{direction}");
    }
}

#[test]
fn test_grid_rejects_bad_values() {
    assert!(matches!(
        Grid::from_rows([[6, 0, 0, 0], [0; 4], [0; 4], [0; 4]]),
        Err(Auto2048Error::Game(_))
    ));
}
