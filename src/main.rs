use auto2048::logging::{setup_console_logging, setup_file_logging};
use auto2048::neural::{NetworkConfig, TchQNetwork};
use auto2048::services::{serve_lines, Dispatcher, Strategy};
use auto2048::training::{QLearnConfig, Trainer, TrainerOptions};
use auto2048::{Auto2048Error, NAME, VERSION};
use clap::Parser;
use std::path::PathBuf;
use tch::Device;
use tokio::io::BufReader;

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Mode {
    /// Play local games and report the results
    Play,
    /// Run self-play training batches
    Train,
    /// Answer JSON requests read line by line from stdin
    Serve,
}

#[derive(Parser, Debug)]
#[command(name = "auto2048", version)]
struct Config {
    #[arg(long, value_enum, default_value = "play")]
    mode: Mode,

    /// Move source for play and serve modes
    #[arg(long, value_enum, default_value = "heuristic")]
    strategy: Strategy,

    /// Games to play in play mode
    #[arg(long, default_value_t = 1)]
    games: usize,

    /// Training batches to run in train mode
    #[arg(long, default_value_t = 100)]
    batches: usize,

    /// Self-play games per training batch
    #[arg(long)]
    games_per_batch: Option<usize>,

    /// Network weights, loaded when present and written on checkpoints
    #[arg(long, default_value = "model_weights/qnet.safetensors")]
    model_path: PathBuf,

    /// Q-learning hyperparameters as JSON
    #[arg(long)]
    config: Option<PathBuf>,

    /// Lookahead depth of the heuristic search
    #[arg(long)]
    search_depth: Option<usize>,

    #[arg(long)]
    seed: Option<u64>,

    /// Append per-batch training statistics to this CSV file
    #[arg(long)]
    stats_csv: Option<PathBuf>,

    #[arg(long, default_value = "info")]
    log_level: String,

    /// Also write rotating log files into this directory
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

fn load_qlearn_config(config: &Config) -> Result<QLearnConfig, Auto2048Error> {
    let mut qlearn = match &config.config {
        Some(path) => QLearnConfig::from_json_file(path)?,
        None => QLearnConfig::default(),
    };
    if let Some(games) = config.games_per_batch {
        qlearn.games_per_batch = games;
    }
    if let Some(depth) = config.search_depth {
        qlearn.search.max_depth = depth;
    }
    qlearn.validate()?;
    Ok(qlearn)
}

fn run_play(
    dispatcher: &mut Dispatcher<TchQNetwork>,
    strategy: Strategy,
    games: usize,
) -> Result<(), Auto2048Error> {
    let mut best = 0u64;
    for game in 1..=games {
        let summary = dispatcher.play_game(strategy)?;
        best = best.max(summary.score);
        log::info!(
            "🎮 game {}/{} ({:?}): score={} biggest tile={} moves={}{}",
            game,
            games,
            strategy,
            summary.score,
            summary.biggest_tile,
            summary.moves,
            if summary.won { " 🏆" } else { "" }
        );
        println!("{}", serde_json::to_string(&summary)?);
    }
    log::info!("best score over {games} games: {best}");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::parse();

    let _logger = match &config.log_dir {
        Some(dir) => setup_file_logging(dir, &config.log_level)?,
        None => setup_console_logging(&config.log_level)?,
    };
    log::info!("🚀 {NAME} v{VERSION} starting in {:?} mode", config.mode);

    let qlearn = load_qlearn_config(&config)?;
    let network = TchQNetwork::new(NetworkConfig {
        device: Device::cuda_if_available(),
        learning_rate: qlearn.learning_rate,
    })?;
    let search = qlearn.search.clone();
    let trainer = Trainer::init(
        TrainerOptions {
            qlearn,
            model_path: Some(config.model_path.clone()),
            stats_csv: config.stats_csv.clone(),
            seed: config.seed,
        },
        network,
    )?;
    let mut dispatcher = Dispatcher::new(trainer, search, config.seed);

    let cancel = dispatcher.cancellation();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("⏹️ interrupt received, stopping after the current game");
            cancel.cancel();
        }
    });

    match config.mode {
        Mode::Play => {
            run_play(&mut dispatcher, config.strategy, config.games)?;
        }
        Mode::Train => {
            let cancel = dispatcher.cancellation();
            let reports = dispatcher
                .trainer_mut()
                .train_batches(config.batches, &cancel)
                .await?;
            if let Some(best) = dispatcher.trainer().best_average_reward() {
                log::info!(
                    "🏁 {} batches done, best average reward {:.3}",
                    reports.len(),
                    best
                );
            }
            dispatcher.into_trainer().dispose()?;
        }
        Mode::Serve => {
            let stdin = BufReader::new(tokio::io::stdin());
            serve_lines(dispatcher, stdin, tokio::io::stdout()).await?;
        }
    }

    Ok(())
}
