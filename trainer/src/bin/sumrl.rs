// BioASQ summarization RL CLI
use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use bioasq_rl::baseline::{run_baseline, test_indices_from_eval_log};
use bioasq_rl::corpus::Corpus;
use bioasq_rl::env::EnvConfig;
use bioasq_rl::export::export_rouge_csv;
use bioasq_rl::rouge::RougeScorer;
use bioasq_rl::trainer::{baseline_over_split, train, ReinforceConfig};

#[derive(Parser)]
#[command(name = "sumrl")]
#[command(version = "0.1.0")]
#[command(about = "REINFORCE training for extractive BioASQ summarization", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train the REINFORCE policy
    Train {
        /// Corpus JSON file (BioASQ training set)
        #[arg(value_name = "CORPUS")]
        corpus: PathBuf,

        /// Stop after this many episodes (default: run until stopped)
        #[arg(long)]
        episodes: Option<usize>,

        /// Hidden-layer width
        #[arg(long, default_value_t = 200)]
        hidden: usize,

        /// Base exploration noise
        #[arg(long, default_value_t = 0.2)]
        noise: f64,

        /// Checkpoint-and-evaluate interval, in episodes
        #[arg(long, default_value_t = 200)]
        save_every: usize,

        /// Per-episode cap on the candidate list
        #[arg(long, default_value_t = 30)]
        max_candidates: usize,

        /// Seed for the split shuffle, init, and sampling
        #[arg(long)]
        seed: Option<u64>,

        /// Checkpoint file
        #[arg(long, default_value = "checkpoints/reinforce.json")]
        checkpoint: PathBuf,

        /// Training log (CSV)
        #[arg(long, default_value = "logs/reinforce_log.csv")]
        train_log: PathBuf,

        /// Evaluation log (CSV)
        #[arg(long, default_value = "logs/reinforce_eval.csv")]
        eval_log: PathBuf,

        /// Resume from the checkpoint instead of initializing fresh
        #[arg(long)]
        restore: bool,
    },

    /// Evaluate the first-N baseline on the held-out split
    Baseline {
        /// Corpus JSON file
        #[arg(value_name = "CORPUS")]
        corpus: PathBuf,

        /// Recover held-out QIDs from an existing evaluation log
        /// instead of re-deriving the split from the seed
        #[arg(long)]
        eval_log: Option<PathBuf>,

        /// Per-episode cap on the candidate list
        #[arg(long, default_value_t = 30)]
        max_candidates: usize,

        /// Seed used to re-derive the held-out split
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Export per-sentence ROUGE-L scores for offline analysis
    ExportRouge {
        /// Corpus JSON file
        #[arg(value_name = "CORPUS")]
        corpus: PathBuf,

        /// Output CSV file
        #[arg(short, long, default_value = "rouge_scores.csv")]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Train {
            corpus,
            episodes,
            hidden,
            noise,
            save_every,
            max_candidates,
            seed,
            checkpoint,
            train_log,
            eval_log,
            restore,
        } => {
            println!("Loading corpus {}", corpus.display());
            let corpus = Corpus::from_json_file(&corpus)?;
            println!("Loaded {} questions", corpus.len());

            let cfg = ReinforceConfig {
                hidden,
                noise,
                save_every,
                max_episodes: episodes,
                seed,
                checkpoint_path: checkpoint,
                train_log,
                eval_log,
                restore,
                env: EnvConfig { max_candidates },
                ..ReinforceConfig::default()
            };
            let report = train(&corpus, &cfg)?;
            println!(
                "Finished: {} episodes, mean training reward {:.6}",
                report.episodes, report.mean_train_reward
            );
            if let Some(mean) = report.last_eval_mean {
                println!("Last evaluation mean: {mean:.6}");
            }
        }

        Commands::Baseline {
            corpus,
            eval_log,
            max_candidates,
            seed,
        } => {
            println!("Loading corpus {}", corpus.display());
            let corpus = Corpus::from_json_file(&corpus)?;
            println!("Loaded {} questions", corpus.len());

            let env_cfg = EnvConfig { max_candidates };
            let report = match eval_log {
                Some(path) => {
                    let indices = test_indices_from_eval_log(&path)?;
                    println!("Recovered {} held-out questions from {}", indices.len(), path.display());
                    run_baseline(&corpus, &RougeScorer::new(), env_cfg, &indices)?
                }
                None => {
                    let cfg = ReinforceConfig {
                        seed,
                        env: env_cfg,
                        ..ReinforceConfig::default()
                    };
                    baseline_over_split(&corpus, &cfg)?
                }
            };
            println!(
                "Baseline over {} questions: mean reward {:.6}",
                report.n_questions, report.mean_reward
            );
        }

        Commands::ExportRouge { corpus, output } => {
            println!("Loading corpus {}", corpus.display());
            let corpus = Corpus::from_json_file(&corpus)?;
            println!("Loaded {} questions", corpus.len());

            export_rouge_csv(&corpus, &RougeScorer::new(), &output)?;
            println!("Wrote {}", output.display());
        }
    }

    Ok(())
}
