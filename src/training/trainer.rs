//! Training session: owns the agent, its checkpoints and its statistics.

use crate::game::direction::Direction;
use crate::game::game_state::GameState;
use crate::game::rules::{ClassicRules, GameRules};
use crate::neural::network::QNetwork;
use crate::recording::stats_writer::StatsWriter;
use crate::search::heuristic::Ranking;
use crate::training::config::QLearnConfig;
use crate::training::qlearn::QLearn;
use crate::training::stats::{EpisodeResult, TrainingStats};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Default)]
pub struct TrainerOptions {
    pub qlearn: QLearnConfig,
    /// Weights are loaded from here on `init` and checkpointed here.
    pub model_path: Option<PathBuf>,
    /// Per-batch statistics are appended to this CSV file.
    pub stats_csv: Option<PathBuf>,
    pub seed: Option<u64>,
}

/// Why a batch ended with the online network being persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Checkpoint {
    /// The batch beat the best average reward seen so far.
    Improved,
    /// Too many batches passed without an improvement.
    Forced,
}

impl Checkpoint {
    pub fn as_str(self) -> &'static str {
        match self {
            Checkpoint::Improved => "improved",
            Checkpoint::Forced => "forced",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub batch: usize,
    pub stats: TrainingStats,
    /// Best batch average reward so far; never decreases.
    pub best_average_reward: f64,
    pub checkpoint: Option<Checkpoint>,
}

pub struct Trainer<N: QNetwork, R: GameRules = ClassicRules> {
    agent: QLearn<N, R>,
    model_path: Option<PathBuf>,
    stats_writer: Option<StatsWriter>,
    best_average_reward: Option<f64>,
    batches_without_improvement: usize,
    batches_run: usize,
    total_games: usize,
}

impl<N: QNetwork> Trainer<N, ClassicRules> {
    pub fn init(options: TrainerOptions, online: N) -> Result<Self> {
        Self::init_with_rules(options, ClassicRules::default(), online)
    }
}

impl<N: QNetwork, R: GameRules> Trainer<N, R> {
    /// Start a session, restoring weights from `model_path` when the file
    /// exists.
    pub fn init_with_rules(options: TrainerOptions, rules: R, mut online: N) -> Result<Self> {
        log::info!("🧠 Initializing Q-learning trainer...");
        match &options.model_path {
            Some(path) if path.exists() => {
                online.load(path)?;
                log::info!("✅ Loaded network weights from {}", path.display());
            }
            Some(path) => {
                log::warn!(
                    "⚠️ No weights at {}, starting from random initialization",
                    path.display()
                );
            }
            None => log::info!("🆕 No model path, weights will not be persisted"),
        }

        let stats_writer = match &options.stats_csv {
            Some(path) => Some(StatsWriter::open(path)?),
            None => None,
        };

        Ok(Self {
            agent: QLearn::new(options.qlearn, rules, online, options.seed)?,
            model_path: options.model_path,
            stats_writer,
            best_average_reward: None,
            batches_without_improvement: 0,
            batches_run: 0,
            total_games: 0,
        })
    }

    pub fn agent(&self) -> &QLearn<N, R> {
        &self.agent
    }

    pub fn agent_mut(&mut self) -> &mut QLearn<N, R> {
        &mut self.agent
    }

    pub fn model_path(&self) -> Option<&Path> {
        self.model_path.as_deref()
    }

    pub fn best_average_reward(&self) -> Option<f64> {
        self.best_average_reward
    }

    pub fn total_games(&self) -> usize {
        self.total_games
    }

    pub fn ranking(&self, state: &GameState) -> Result<Ranking> {
        self.agent.greedy_ranking(state)
    }

    /// Best valid move for `state` according to the trained network.
    pub fn get_move(&self, state: &GameState) -> Result<Direction> {
        self.agent.best_move(state)
    }

    /// Play up to `episodes` self-play games, learning after each one.
    ///
    /// Stops early when `cancel` fires; games cut short are not counted.
    /// A network failure aborts the remaining games of the call.
    pub async fn train(
        &mut self,
        episodes: usize,
        cancel: &CancellationToken,
    ) -> Result<TrainingStats> {
        let mut results = Vec::with_capacity(episodes);
        let mut losses = Vec::new();

        for episode in 0..episodes {
            if cancel.is_cancelled() {
                log::info!("training cancelled after {episode} of {episodes} games");
                break;
            }
            match self.play_and_learn(cancel, &mut losses).await {
                Ok(Some(result)) => results.push(result),
                Ok(None) => {
                    log::info!("training cancelled during game {}", episode + 1);
                    break;
                }
                Err(e) => {
                    log::error!("❌ training aborted at game {}: {}", episode + 1, e);
                    return Err(e);
                }
            }
        }

        self.total_games += results.len();
        let stats = TrainingStats::from_episodes(&results, self.agent.epsilon(), &losses);
        log::debug!("{stats}");
        Ok(stats)
    }

    async fn play_and_learn(
        &mut self,
        cancel: &CancellationToken,
        losses: &mut Vec<f64>,
    ) -> Result<Option<EpisodeResult>> {
        let start = self.agent.new_game();
        let Some(result) = self.agent.play_once(start, cancel).await? else {
            return Ok(None);
        };
        for _ in 0..self.agent.config().learn_steps_per_game {
            if let Some(loss) = self.agent.learn()? {
                losses.push(loss);
            }
        }
        Ok(Some(result))
    }

    /// Run `batches` batches of `games_per_batch` games, checkpointing the
    /// online network when a batch beats the best average reward or when
    /// `max_batches_without_improvement` batches went by without one.
    pub async fn train_batches(
        &mut self,
        batches: usize,
        cancel: &CancellationToken,
    ) -> Result<Vec<BatchReport>> {
        let games_per_batch = self.agent.config().games_per_batch;
        let mut reports = Vec::with_capacity(batches);

        for _ in 0..batches {
            let stats = self.train(games_per_batch, cancel).await?;
            if stats.games < games_per_batch {
                log::info!(
                    "stopping: batch cut short after {} of {} games",
                    stats.games,
                    games_per_batch
                );
                break;
            }
            self.batches_run += 1;

            let checkpoint = self.update_best(stats.average_reward);
            if checkpoint.is_some() {
                self.checkpoint()?;
            }

            let report = BatchReport {
                batch: self.batches_run,
                best_average_reward: self.best_average_reward.unwrap_or(stats.average_reward),
                stats,
                checkpoint,
            };
            log::info!(
                "📊 batch {} | {} | best avg reward={:.3}{}",
                report.batch,
                report.stats,
                report.best_average_reward,
                checkpoint.map_or(String::new(), |c| format!(" | checkpoint: {}", c.as_str()))
            );
            if let Some(writer) = self.stats_writer.as_mut() {
                writer.write_batch(
                    report.batch,
                    &report.stats,
                    checkpoint.map(Checkpoint::as_str),
                )?;
            }
            reports.push(report);
        }
        Ok(reports)
    }

    fn update_best(&mut self, average_reward: f64) -> Option<Checkpoint> {
        let improved = self
            .best_average_reward
            .map_or(true, |best| average_reward > best);
        if improved {
            self.best_average_reward = Some(average_reward);
            self.batches_without_improvement = 0;
            return Some(Checkpoint::Improved);
        }

        self.batches_without_improvement += 1;
        let limit = self.agent.config().max_batches_without_improvement;
        if limit > 0 && self.batches_without_improvement >= limit {
            self.batches_without_improvement = 0;
            return Some(Checkpoint::Forced);
        }
        None
    }

    fn checkpoint(&self) -> Result<()> {
        if let Some(path) = &self.model_path {
            self.save(path)?;
        }
        Ok(())
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        self.agent.online().save(path)?;
        log::info!("💾 Saved network weights to {}", path.display());
        Ok(())
    }

    /// Replace the online weights and resync the target network.
    pub fn load(&mut self, path: &Path) -> Result<()> {
        self.agent.online_mut().load(path)?;
        self.agent.sync_target()?;
        log::info!("📂 Loaded network weights from {}", path.display());
        Ok(())
    }

    /// End the session, persisting the online network when a model path
    /// is set.
    pub fn dispose(self) -> Result<()> {
        self.checkpoint()?;
        log::info!(
            "trainer disposed after {} games ({} batches)",
            self.total_games,
            self.batches_run
        );
        Ok(())
    }
}
