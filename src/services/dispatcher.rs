//! Move dispatcher: turns requests into moves or training runs.
//!
//! The dispatcher owns the training session and serves one request at a
//! time from an mpsc channel, answering each through its oneshot sender.

use crate::game::direction::Direction;
use crate::game::game_state::GameState;
use crate::game::simulator::play_move;
use crate::neural::network::QNetwork;
use crate::search::heuristic::{random_ranking, IncrementalSearch, Ranking};
use crate::search::hyperparameters::SearchHyperparameters;
use crate::services::protocol::{Request, Response, Strategy};
use crate::training::qlearn::first_valid_move;
use crate::training::trainer::Trainer;
use crate::{Auto2048Error, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

/// A request together with where its reply goes.
pub struct Envelope {
    pub request: Request,
    pub reply: oneshot::Sender<Result<Response>>,
}

/// Cloneable sending side of the dispatcher channel.
#[derive(Clone)]
pub struct DispatcherHandle {
    tx: mpsc::Sender<Envelope>,
}

pub fn channel(capacity: usize) -> (DispatcherHandle, mpsc::Receiver<Envelope>) {
    let (tx, rx) = mpsc::channel(capacity);
    (DispatcherHandle { tx }, rx)
}

impl DispatcherHandle {
    /// Send `request` and wait for its reply.
    pub async fn request(&self, request: Request) -> Result<Response> {
        let (reply, answer) = oneshot::channel();
        self.tx
            .send(Envelope { request, reply })
            .await
            .map_err(|_| dispatcher_gone())?;
        answer.await.map_err(|_| dispatcher_gone())?
    }
}

fn dispatcher_gone() -> Auto2048Error {
    Auto2048Error::Io(std::io::Error::new(
        std::io::ErrorKind::BrokenPipe,
        "dispatcher stopped",
    ))
}

/// Result of a locally played game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSummary {
    pub score: u64,
    pub biggest_tile: u32,
    pub moves: usize,
    pub won: bool,
}

pub struct Dispatcher<N: QNetwork> {
    trainer: Trainer<N>,
    search: IncrementalSearch,
    rng: StdRng,
    cancel: CancellationToken,
}

impl<N: QNetwork> Dispatcher<N> {
    pub fn new(trainer: Trainer<N>, search: SearchHyperparameters, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            trainer,
            search: IncrementalSearch::new(search),
            rng,
            cancel: CancellationToken::new(),
        }
    }

    pub fn trainer(&self) -> &Trainer<N> {
        &self.trainer
    }

    pub fn trainer_mut(&mut self) -> &mut Trainer<N> {
        &mut self.trainer
    }

    /// Token that stops a running `train` request at the next game boundary.
    /// Once it fires, later `train` requests fail with `Cancelled`.
    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn into_trainer(self) -> Trainer<N> {
        self.trainer
    }

    /// Full ordering of the four moves for `state` under `strategy`.
    pub fn ranking(&mut self, state: &GameState, strategy: Strategy) -> Result<Ranking> {
        match strategy {
            Strategy::Random => Ok(random_ranking(&mut self.rng)),
            Strategy::Heuristic => {
                let rules = self.trainer.agent().rules();
                self.search.rank_moves(state, rules, &mut self.rng)
            }
            Strategy::TrainedNetwork => self.trainer.ranking(state),
        }
    }

    /// Exactly one valid move for `state`.
    pub fn next_move(&mut self, state: &GameState, strategy: Strategy) -> Result<Direction> {
        let ranking = self.ranking(state, strategy)?;
        first_valid_move(&ranking, state, self.trainer.agent().rules())
    }

    pub async fn handle(&mut self, request: Request) -> Result<Response> {
        match request {
            Request::GetMove { state, strategy } => {
                let state = state.into_state(self.trainer.agent().rules())?;
                let direction = self.next_move(&state, strategy)?;
                log::debug!("get-move ({strategy:?}): {direction} score={}", state.score);
                Ok(Response::for_move(direction))
            }
            Request::Train { episodes } => {
                if self.cancel.is_cancelled() {
                    return Err(Auto2048Error::Cancelled);
                }
                log::info!("🎓 training {episodes} games on request");
                let stats = self.trainer.train(episodes, &self.cancel).await?;
                log::info!("{stats}");
                Ok(Response::Stats { stats })
            }
        }
    }

    /// Serve requests until every handle is dropped, then hand the trainer
    /// back for disposal.
    pub async fn serve(mut self, mut rx: mpsc::Receiver<Envelope>) -> Trainer<N> {
        while let Some(Envelope { request, reply }) = rx.recv().await {
            let outcome = self.handle(request).await;
            if let Err(e) = &outcome {
                log::warn!("request failed: {e}");
            }
            if reply.send(outcome).is_err() {
                log::debug!("requester went away before the reply");
            }
        }
        log::info!("dispatcher channel closed");
        self.trainer
    }

    /// Play a fresh local game to the end with `strategy`.
    pub fn play_game(&mut self, strategy: Strategy) -> Result<GameSummary> {
        let mut state = self.trainer.agent_mut().new_game();
        self.search.reset();
        let mut moves = 0usize;

        while !state.is_terminated() {
            let direction = self.next_move(&state, strategy)?;
            let rules = self.trainer.agent().rules();
            play_move(&mut state, direction, rules, &mut self.rng);
            moves += 1;
        }
        log::debug!("local game finished after {moves} moves, score={}", state.score);

        let (biggest_tile, _) = state.biggest_tile();
        Ok(GameSummary {
            score: state.score,
            biggest_tile,
            moves,
            won: state.won,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::grid::Grid;
    use crate::game::simulator::EncodedState;
    use crate::neural::network::{FitMetrics, QValues, TrainingBatch};
    use crate::services::protocol::BoardInput;
    use crate::training::trainer::TrainerOptions;
    use assert_matches::assert_matches;
    use std::collections::HashSet;
    use std::path::Path;
    use tokio_test::{assert_pending, assert_ready, task};

    #[derive(Clone, Default)]
    struct PrefersUp;

    impl QNetwork for PrefersUp {
        fn predict(&self, states: &[EncodedState]) -> Result<Vec<QValues>> {
            Ok(states.iter().map(|_| [1.0, 0.0, -1.0, 0.5]).collect())
        }

        fn fit(&mut self, batch: &TrainingBatch) -> Result<FitMetrics> {
            Ok(FitMetrics {
                loss: 0.0,
                samples: batch.len(),
            })
        }

        fn copy_weights_from(&mut self, _source: &Self) -> Result<()> {
            Ok(())
        }

        fn try_clone(&self) -> Result<Self> {
            Ok(PrefersUp)
        }

        fn save(&self, _path: &Path) -> Result<()> {
            Ok(())
        }

        fn load(&mut self, _path: &Path) -> Result<()> {
            Ok(())
        }
    }

    fn dispatcher() -> Dispatcher<PrefersUp> {
        let trainer = Trainer::init(
            TrainerOptions {
                seed: Some(11),
                ..TrainerOptions::default()
            },
            PrefersUp,
        )
        .unwrap();
        Dispatcher::new(trainer, SearchHyperparameters::default(), Some(5))
    }

    fn board(rows: [[u32; 4]; 4]) -> BoardInput {
        BoardInput::from(Grid::from_rows(rows).unwrap())
    }

    #[tokio::test]
    async fn test_get_move_every_strategy_is_valid() {
        let mut dispatcher = dispatcher();
        // Only Down and Right move anything here.
        let rows = [[2, 4, 0, 0], [4, 2, 0, 0], [0; 4], [0; 4]];
        for strategy in [Strategy::Random, Strategy::Heuristic, Strategy::TrainedNetwork] {
            let response = dispatcher
                .handle(Request::GetMove {
                    state: board(rows),
                    strategy,
                })
                .await
                .unwrap();
            assert_matches!(
                response,
                Response::Move { direction: Direction::Down | Direction::Right, .. }
            );
        }
    }

    #[tokio::test]
    async fn test_trained_network_follows_prediction() {
        let mut dispatcher = dispatcher();
        let response = dispatcher
            .handle(Request::GetMove {
                state: board([[0; 4], [0; 4], [0, 2, 0, 0], [0; 4]]),
                strategy: Strategy::TrainedNetwork,
            })
            .await
            .unwrap();
        assert_eq!(response, Response::for_move(Direction::Up));
    }

    #[tokio::test]
    async fn test_get_move_on_stuck_board_errors() {
        let mut dispatcher = dispatcher();
        let result = dispatcher
            .handle(Request::GetMove {
                state: board([[2, 4, 2, 4], [4, 2, 4, 2], [2, 4, 2, 4], [4, 2, 4, 2]]),
                strategy: Strategy::Heuristic,
            })
            .await;
        assert_matches!(result, Err(Auto2048Error::NoValidMove));
    }

    #[test]
    fn test_random_ranking_is_permutation() {
        let mut dispatcher = dispatcher();
        let state = GameState::new(Grid::from_rows([[2, 0, 0, 0], [0; 4], [0; 4], [0; 4]]).unwrap(), 0);
        let ranking = dispatcher.ranking(&state, Strategy::Random).unwrap();
        assert_eq!(ranking.iter().collect::<HashSet<_>>().len(), 4);
    }

    #[test]
    fn test_play_game_reaches_the_end() {
        let mut dispatcher = dispatcher();
        let summary = dispatcher.play_game(Strategy::Random).unwrap();
        assert!(summary.moves > 0);
        assert!(summary.biggest_tile >= 4);
    }

    #[tokio::test]
    async fn test_train_after_interrupt_is_rejected() {
        let mut dispatcher = dispatcher();
        dispatcher.cancellation().cancel();
        let result = dispatcher.handle(Request::Train { episodes: 3 }).await;
        assert_matches!(result, Err(Auto2048Error::Cancelled));
        assert_eq!(dispatcher.trainer().total_games(), 0);

        // Moves are still served after an interrupt.
        let response = dispatcher
            .handle(Request::GetMove {
                state: board([[2, 2, 0, 0], [0; 4], [0; 4], [0; 4]]),
                strategy: Strategy::TrainedNetwork,
            })
            .await
            .unwrap();
        assert_matches!(response, Response::Move { .. });
    }

    #[test]
    fn test_request_waits_for_the_dispatcher() {
        let (handle, mut rx) = channel(1);
        let mut pending =
            task::spawn(async move { handle.request(Request::Train { episodes: 1 }).await });
        assert_pending!(pending.poll());

        let envelope = rx.try_recv().unwrap();
        assert_eq!(envelope.request, Request::Train { episodes: 1 });
        assert_pending!(pending.poll());

        let stats = crate::training::stats::TrainingStats::default();
        envelope
            .reply
            .send(Ok(Response::Stats { stats: stats.clone() }))
            .unwrap();
        assert!(pending.is_woken());
        let response = assert_ready!(pending.poll()).unwrap();
        assert_eq!(response, Response::Stats { stats });
    }

    #[tokio::test]
    async fn test_serve_over_channel() {
        let (handle, rx) = channel(4);
        let server = dispatcher().serve(rx);
        let client = async move {
            let response = handle
                .request(Request::Train { episodes: 1 })
                .await
                .unwrap();
            assert_matches!(response, Response::Stats { ref stats } if stats.games == 1);
            let response = handle
                .request(Request::GetMove {
                    state: board([[2, 2, 0, 0], [0; 4], [0; 4], [0; 4]]),
                    strategy: Strategy::Heuristic,
                })
                .await
                .unwrap();
            assert_matches!(response, Response::Move { .. });
        };
        let (trainer, ()) = tokio::join!(server, client);
        assert_eq!(trainer.total_games(), 1);
    }
}
