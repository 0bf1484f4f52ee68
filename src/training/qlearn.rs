//! Self-play Q-learning over a value network with a lagging target copy.

use crate::game::direction::Direction;
use crate::game::game_state::GameState;
use crate::game::rules::{ClassicRules, GameRules};
use crate::game::simulator::{apply_move, encode_state, play_move};
use crate::memory::{GameMemory, Memory, Transition};
use crate::neural::network::{max_q, rank_by_q, QNetwork, TrainingBatch};
use crate::search::heuristic::{random_ranking, IncrementalSearch, Ranking};
use crate::training::config::{ExplorationStrategy, QLearnConfig};
use crate::training::stats::EpisodeResult;
use crate::{Auto2048Error, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio_util::sync::CancellationToken;

/// Bellman target: the raw reward for terminal transitions, otherwise the
/// reward plus the discounted best value of the next state.
pub fn bellman_target(reward: f32, next_max_q: Option<f32>, discount: f64) -> f32 {
    match next_max_q {
        Some(future) => reward + (discount as f32) * future,
        None => reward,
    }
}

/// First move of `ranking` that changes the board.
pub fn first_valid_move<R: GameRules + ?Sized>(
    ranking: &Ranking,
    state: &GameState,
    rules: &R,
) -> Result<Direction> {
    ranking
        .iter()
        .copied()
        .find(|&direction| apply_move(state, direction, rules).was_moved)
        .ok_or(Auto2048Error::NoValidMove)
}

/// Rotate `ranking` one step when it would repeat `previous` first.
pub fn avoid_repeat(mut ranking: Ranking, previous: Option<Direction>) -> Ranking {
    if previous.is_some() && ranking.first().copied() == previous {
        ranking.rotate_left(1);
    }
    ranking
}

pub struct QLearn<N: QNetwork, R: GameRules = ClassicRules> {
    config: QLearnConfig,
    rules: R,
    online: N,
    target: N,
    game_memory: Memory<GameMemory>,
    search: IncrementalSearch,
    rng: StdRng,
    play_count: u64,
    learn_steps: u64,
    last_exploratory_move: Option<Direction>,
}

impl<N: QNetwork, R: GameRules> QLearn<N, R> {
    /// The target network starts as a copy of `online`.
    pub fn new(config: QLearnConfig, rules: R, online: N, seed: Option<u64>) -> Result<Self> {
        config.validate()?;
        let target = online.try_clone()?;
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Ok(Self {
            game_memory: Memory::new(config.game_memory_size),
            search: IncrementalSearch::new(config.search.clone()),
            config,
            rules,
            online,
            target,
            rng,
            play_count: 0,
            learn_steps: 0,
            last_exploratory_move: None,
        })
    }

    pub fn config(&self) -> &QLearnConfig {
        &self.config
    }

    pub fn rules(&self) -> &R {
        &self.rules
    }

    pub fn online(&self) -> &N {
        &self.online
    }

    pub fn online_mut(&mut self) -> &mut N {
        &mut self.online
    }

    pub fn target(&self) -> &N {
        &self.target
    }

    pub fn epsilon(&self) -> f64 {
        self.config.epsilon
    }

    /// Cumulative self-play steps, the `t` of epsilon decay.
    pub fn play_count(&self) -> u64 {
        self.play_count
    }

    pub fn learn_steps(&self) -> u64 {
        self.learn_steps
    }

    pub fn game_memory(&self) -> &Memory<GameMemory> {
        &self.game_memory
    }

    pub fn new_game(&mut self) -> GameState {
        GameState::new_game(&self.rules, &mut self.rng)
    }

    /// Copy the online weights into the target network.
    pub fn sync_target(&mut self) -> Result<()> {
        self.target.copy_weights_from(&self.online)
    }

    /// Moves ordered by the online network's predicted values.
    pub fn greedy_ranking(&self, state: &GameState) -> Result<Ranking> {
        let values = self.online.predict_one(&encode_state(state))?;
        Ok(rank_by_q(&values))
    }

    /// Best valid move according to the online network.
    pub fn best_move(&self, state: &GameState) -> Result<Direction> {
        let ranking = self.greedy_ranking(state)?;
        first_valid_move(&ranking, state, &self.rules)
    }

    /// Ranking for the next self-play move and whether it was exploratory.
    pub fn rank_actions(&mut self, state: &GameState) -> Result<(Ranking, bool)> {
        if self.rng.random::<f64>() >= self.config.epsilon {
            return Ok((self.greedy_ranking(state)?, false));
        }

        let ranking = match self.config.exploration {
            ExplorationStrategy::Heuristic => {
                self.search.rank_moves(state, &self.rules, &mut self.rng)?
            }
            ExplorationStrategy::Random => avoid_repeat(
                random_ranking(&mut self.rng),
                self.last_exploratory_move,
            ),
        };
        self.last_exploratory_move = ranking.first().copied();
        Ok((ranking, true))
    }

    /// Play one game from `start` to the end, recording its transitions.
    ///
    /// The episode is committed to game memory only once it finishes; when
    /// `cancel` fires at a yield point the partial episode is dropped and
    /// `None` is returned.
    pub async fn play_once(
        &mut self,
        start: GameState,
        cancel: &CancellationToken,
    ) -> Result<Option<EpisodeResult>> {
        let mut game = start;
        let mut memory = GameMemory::new(self.config.move_memory_size);
        let mut steps = 0usize;
        let mut invalid_steps = 0usize;

        self.search.reset();

        while !game.is_terminated() {
            if steps > 0 && steps % self.config.yield_every_steps == 0 {
                tokio::task::yield_now().await;
                if cancel.is_cancelled() {
                    log::debug!("episode cancelled after {steps} steps, discarding");
                    return Ok(None);
                }
            }

            let (ranking, exploratory) = self.rank_actions(&game)?;
            let encoded = encode_state(&game);

            let mut chosen = None;
            for direction in ranking {
                let preview = apply_move(&game, direction, &self.rules);
                let after = preview.was_moved.then_some(&preview.state);
                let reward = self.config.reward.reward_for(&game, after);
                if preview.was_moved {
                    chosen = Some((direction, reward));
                    break;
                }
                invalid_steps += 1;
                if self.config.record_invalid_moves {
                    memory.record(Transition {
                        state: encoded,
                        action: direction,
                        reward,
                        next_state: Some(encoded),
                    });
                }
            }
            let (direction, reward) = chosen.ok_or(Auto2048Error::NoValidMove)?;

            play_move(&mut game, direction, &self.rules, &mut self.rng);
            let next_state = if game.is_terminated() {
                None
            } else {
                Some(encode_state(&game))
            };
            memory.record(Transition {
                state: encoded,
                action: direction,
                reward,
                next_state,
            });

            log::trace!(
                "step {steps}: {direction} (exploratory={exploratory}) reward={reward} score={}",
                game.score
            );
            steps += 1;
            self.play_count += 1;
        }

        memory.final_score = game.score;
        let (biggest_tile, _) = game.biggest_tile();
        let result = EpisodeResult {
            steps,
            invalid_steps,
            total_reward: memory.total_reward,
            score: game.score,
            biggest_tile,
            won: game.won,
        };

        self.config.decay(self.play_count);
        self.game_memory.add(memory);
        log::debug!(
            "episode done: score={} steps={} invalid={} reward={:.2} eps={:.4}",
            result.score,
            result.steps,
            result.invalid_steps,
            result.total_reward,
            self.config.epsilon
        );
        Ok(Some(result))
    }

    /// One gradient step on transitions sampled from the best stored games.
    ///
    /// Returns the loss, or `None` when there is nothing to learn from yet.
    pub fn learn(&mut self) -> Result<Option<f64>> {
        let games = self
            .game_memory
            .recall_top_by(GameMemory::total_reward, self.config.top_game_fraction);

        let mut sampled: Vec<&Transition> = Vec::new();
        for game in games {
            sampled.extend(game.moves.recall_randomly(self.config.batch_size, &mut self.rng));
        }
        if sampled.is_empty() {
            return Ok(None);
        }

        let next_states: Vec<_> = sampled.iter().filter_map(|t| t.next_state).collect();
        let next_values = self.target.predict(&next_states)?;
        let mut next_max = next_values.iter().map(max_q);

        let mut batch = TrainingBatch::with_capacity(sampled.len());
        for transition in &sampled {
            let future = match transition.next_state {
                Some(_) => Some(next_max.next().ok_or_else(|| {
                    Auto2048Error::Network("target network returned too few rows".to_string())
                })?),
                None => None,
            };
            let target = bellman_target(transition.reward, future, self.config.learning_discount);
            batch.push(transition.state, transition.action, target);
        }

        let metrics = self.online.fit(&batch)?;
        self.learn_steps += 1;
        if self.learn_steps % self.config.target_sync_interval as u64 == 0 {
            self.sync_target()?;
            log::debug!("target network synced after {} learn steps", self.learn_steps);
        }
        log::debug!(
            "learn step {}: {} samples, loss={:.6}",
            self.learn_steps,
            metrics.samples,
            metrics.loss
        );
        Ok(Some(metrics.loss))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::grid::Grid;
    use crate::neural::network::{FitMetrics, QValues};
    use crate::game::simulator::EncodedState;
    use crate::training::reward::{RewardShaping, INVALID_MOVE_PENALTY};
    use assert_matches::assert_matches;
    use std::path::Path;

    /// Prefers Left, then Up, Right, Down; counts fit calls.
    #[derive(Clone, Default)]
    struct FixedNetwork {
        fits: usize,
        last_targets: Vec<f32>,
    }

    impl QNetwork for FixedNetwork {
        fn predict(&self, states: &[EncodedState]) -> Result<Vec<QValues>> {
            Ok(states.iter().map(|_| [0.5, 0.25, 0.0, 1.0]).collect())
        }

        fn fit(&mut self, batch: &TrainingBatch) -> Result<FitMetrics> {
            self.fits += 1;
            self.last_targets = batch.targets.clone();
            Ok(FitMetrics {
                loss: 0.0,
                samples: batch.len(),
            })
        }

        fn copy_weights_from(&mut self, _source: &Self) -> Result<()> {
            Ok(())
        }

        fn try_clone(&self) -> Result<Self> {
            Ok(self.clone())
        }

        fn save(&self, _path: &Path) -> Result<()> {
            Ok(())
        }

        fn load(&mut self, _path: &Path) -> Result<()> {
            Ok(())
        }
    }

    fn greedy_config() -> QLearnConfig {
        QLearnConfig {
            epsilon: 0.0,
            min_epsilon: 0.0,
            max_epsilon: 0.0,
            ..QLearnConfig::default()
        }
    }

    fn agent(config: QLearnConfig) -> QLearn<FixedNetwork> {
        QLearn::new(config, ClassicRules::default(), FixedNetwork::default(), Some(7)).unwrap()
    }

    fn state(rows: [[u32; 4]; 4]) -> GameState {
        GameState::new(Grid::from_rows(rows).unwrap(), 0)
    }

    #[test]
    fn test_bellman_target() {
        assert_eq!(bellman_target(1.0, None, 0.95), 1.0);
        assert!((bellman_target(1.0, Some(2.0), 0.5) - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_first_valid_move_skips_invalid() {
        let rules = ClassicRules::default();
        let board = state([[2, 0, 0, 0], [0; 4], [0; 4], [0; 4]]);
        let ranking = [Direction::Left, Direction::Up, Direction::Down, Direction::Right];
        assert_eq!(first_valid_move(&ranking, &board, &rules).unwrap(), Direction::Down);
    }

    #[test]
    fn test_first_valid_move_errors_when_stuck() {
        let rules = ClassicRules::default();
        let board = state([[2, 4, 2, 4], [4, 2, 4, 2], [2, 4, 2, 4], [4, 2, 4, 2]]);
        assert_matches!(
            first_valid_move(&Direction::ALL, &board, &rules),
            Err(Auto2048Error::NoValidMove)
        );
    }

    #[test]
    fn test_avoid_repeat_rotates() {
        let ranking = [Direction::Up, Direction::Left, Direction::Down, Direction::Right];
        let rotated = avoid_repeat(ranking, Some(Direction::Up));
        assert_eq!(rotated, [Direction::Left, Direction::Down, Direction::Right, Direction::Up]);
        assert_eq!(avoid_repeat(ranking, Some(Direction::Down)), ranking);
        assert_eq!(avoid_repeat(ranking, None), ranking);
    }

    #[test]
    fn test_greedy_ranking_follows_network() {
        let agent = agent(greedy_config());
        let board = state([[0, 0, 0, 0], [0, 2, 0, 0], [0; 4], [0; 4]]);
        assert_eq!(
            agent.greedy_ranking(&board).unwrap(),
            [Direction::Left, Direction::Up, Direction::Right, Direction::Down]
        );
        assert_eq!(agent.best_move(&board).unwrap(), Direction::Left);
    }

    #[tokio::test]
    async fn test_play_once_records_terminal_last() {
        let mut agent = agent(greedy_config());
        let start = agent.new_game();
        let result = agent
            .play_once(start, &CancellationToken::new())
            .await
            .unwrap()
            .expect("episode not cancelled");

        assert!(result.steps > 0);
        assert_eq!(agent.play_count(), result.steps as u64);
        assert_eq!(agent.game_memory().len(), 1);

        let game = agent.game_memory().iter().next().unwrap();
        let last = game.moves.iter().last().unwrap();
        assert!(last.is_terminal());
        assert_eq!(game.final_score, result.score);
    }

    #[tokio::test]
    async fn test_invalid_attempts_are_counted_and_penalised() {
        let mut agent = agent(QLearnConfig {
            move_memory_size: 100_000,
            reward: RewardShaping::TileCount,
            ..greedy_config()
        });
        // Left and Up are ranked first but cannot move the corner tile.
        let start = state([[2, 0, 0, 0], [0; 4], [0; 4], [0; 4]]);
        let encoded = encode_state(&start);
        let result = agent
            .play_once(start, &CancellationToken::new())
            .await
            .unwrap()
            .unwrap();
        assert!(result.invalid_steps >= 2);

        let game = agent.game_memory().iter().next().unwrap();
        let moves: Vec<&Transition> = game.moves.iter().collect();
        assert_eq!(moves.len(), result.steps + result.invalid_steps);
        assert_eq!(moves[0].action, Direction::Left);
        assert_eq!(moves[1].action, Direction::Up);
        for invalid in &moves[..2] {
            assert_eq!(invalid.reward, INVALID_MOVE_PENALTY);
            assert_eq!(invalid.state, encoded);
            assert_eq!(invalid.next_state, Some(encoded));
        }
        assert_eq!(moves[2].action, Direction::Right);
        assert_ne!(moves[2].next_state, Some(encoded));

        let penalised = moves
            .iter()
            .filter(|t| t.reward == INVALID_MOVE_PENALTY)
            .count();
        assert_eq!(penalised, result.invalid_steps);
    }

    #[tokio::test]
    async fn test_unrecorded_invalid_attempts_still_count() {
        let mut agent = agent(QLearnConfig {
            move_memory_size: 100_000,
            record_invalid_moves: false,
            ..greedy_config()
        });
        let start = state([[2, 0, 0, 0], [0; 4], [0; 4], [0; 4]]);
        let result = agent
            .play_once(start, &CancellationToken::new())
            .await
            .unwrap()
            .unwrap();
        assert!(result.invalid_steps >= 2);
        let game = agent.game_memory().iter().next().unwrap();
        assert_eq!(game.moves.len(), result.steps);
    }

    #[tokio::test]
    async fn test_won_game_without_keep_playing_ends_the_episode() {
        let mut agent = agent(greedy_config());
        let mut start = state([[2048, 0, 0, 0], [0; 4], [0; 4], [0; 4]]);
        start.won = true;
        start.keep_playing = false;
        let result = agent
            .play_once(start, &CancellationToken::new())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(result.steps, 0);
        assert!(result.won);
        assert_eq!(agent.play_count(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_episode_is_discarded() {
        let mut agent = agent(QLearnConfig {
            yield_every_steps: 1,
            ..greedy_config()
        });
        let cancel = CancellationToken::new();
        cancel.cancel();
        let start = agent.new_game();
        let result = agent.play_once(start, &cancel).await.unwrap();
        assert!(result.is_none());
        assert!(agent.game_memory().is_empty());
    }

    #[tokio::test]
    async fn test_learn_uses_reward_only_for_terminal() {
        let mut agent = agent(QLearnConfig {
            record_invalid_moves: false,
            ..greedy_config()
        });
        assert_eq!(agent.learn().unwrap(), None);

        let start = agent.new_game();
        agent
            .play_once(start, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(agent.learn().unwrap(), Some(0.0));
        assert_eq!(agent.online().fits, 1);
        assert_eq!(agent.learn_steps(), 1);

        let game = agent.game_memory().iter().next().unwrap();
        let terminal_rewards: Vec<f32> = game
            .moves
            .iter()
            .filter(|t| t.is_terminal())
            .map(|t| t.reward)
            .collect();
        assert_eq!(terminal_rewards.len(), 1);
        // Every bootstrapped target adds 0.95 * 1.0 to a reward in {-1, 0, 1}.
        for target in &agent.online().last_targets {
            let fractional = (target - target.round()).abs();
            assert!(fractional < 1e-6 || (fractional - 0.05).abs() < 1e-5);
        }
    }
}
