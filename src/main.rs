//! Skilltrace - Entry Point
//!
//! Loads a trial dataset and (optionally) cross-validation folds, then runs
//! one MCMC chain per (replication, fold) pair and writes predictions, skill
//! assignments, and a JSON run summary.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use clap::Parser;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use skilltrace::core::error::Result;
use skilltrace::data::{Dataset, FoldAssignments};
use skilltrace::model::Sampler;
use skilltrace::report::{self, RunSummary};

/// Discover latent skills from longitudinal student response data
#[derive(Parser, Debug)]
#[command(name = "skilltrace")]
#[command(about = "Infer item-to-skill assignments and recall predictions via WCRP+BKT MCMC")]
struct Args {
    /// Whitespace-delimited dataset: student id, item id, expert skill id, recall
    #[arg(long)]
    datafile: PathBuf,

    /// Training/test splits: one line per replication, one fold id per student.
    /// Without it a single all-training replication is run.
    #[arg(long)]
    foldfile: Option<PathBuf>,

    /// Output stem; results land in <stem>.predictions.tsv etc.
    #[arg(long)]
    outfile: PathBuf,

    /// Initial value of beta (how deterministically expert labels are followed)
    #[arg(long, default_value_t = 0.5)]
    init_beta: f64,

    /// Infer the value of beta
    #[arg(long)]
    infer_beta: bool,

    /// Keep alpha' fixed at this value; inferred when absent
    #[arg(long)]
    fixed_alpha_prime: Option<f64>,

    /// Number of MCMC sweeps to run
    #[arg(long, default_value_t = 200)]
    num_iterations: usize,

    /// Number of initial sweeps to discard
    #[arg(long, default_value_t = 100)]
    burn: usize,

    /// Number of auxiliary prior draws when pricing new skills
    #[arg(long, default_value_t = 2000)]
    num_subsamples: usize,

    /// Save the skill assignments too
    #[arg(long)]
    dump_skills: bool,

    /// Random seed for deterministic runs
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    run(Args::parse())
}

fn run(args: Args) -> Result<()> {
    let dataset = Dataset::load(&args.datafile)?;
    tracing::info!(
        "dataset: {} students, {} items, {} expert skills, {} trials",
        dataset.num_students,
        dataset.num_items,
        dataset.num_expert_skills,
        dataset.num_trials()
    );

    let folds = match &args.foldfile {
        Some(path) => FoldAssignments::load(path, dataset.num_students)?,
        None => FoldAssignments::single_fold(dataset.num_students),
    };
    tracing::info!(
        "{} replications, {} folds per replication",
        folds.num_replications(),
        folds.num_folds
    );

    let infer_alpha_prime = args.fixed_alpha_prime.is_none();
    if infer_alpha_prime {
        tracing::info!("alpha' will be inferred");
    } else {
        tracing::info!("alpha' fixed at {}", args.fixed_alpha_prime.unwrap_or_default());
    }

    let mut rng = match args.seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_entropy(),
    };

    let mut predictions = BufWriter::new(File::create(with_suffix(
        &args.outfile,
        ".predictions.tsv",
    ))?);
    let mut summaries = Vec::new();

    for replication in 0..folds.num_replications() {
        for test_fold in 0..folds.num_folds {
            let (train, test) = folds.split(replication, test_fold);
            tracing::info!(
                "replication {}, fold {}: {} training / {} held-out students",
                replication,
                test_fold,
                train.len(),
                test.len()
            );

            let mut sampler = Sampler::new(
                &mut rng,
                &dataset,
                train,
                test,
                args.init_beta,
                args.fixed_alpha_prime,
                args.num_subsamples,
            )?;
            sampler.run(
                &mut rng,
                args.num_iterations,
                args.burn,
                args.infer_beta,
                infer_alpha_prime,
            )?;

            report::write_predictions(&mut predictions, &sampler, replication, test_fold)?;

            if args.dump_skills {
                let suffix = format!(".rep{}_fold{}", replication, test_fold);
                let mut map_file = BufWriter::new(File::create(with_suffix(
                    &args.outfile,
                    &format!("{}.map_labels.txt", suffix),
                ))?);
                report::write_map_labels(&mut map_file, &sampler)?;
                map_file.flush()?;

                let mut samples_file = BufWriter::new(File::create(with_suffix(
                    &args.outfile,
                    &format!("{}.samples.txt", suffix),
                ))?);
                report::write_sampled_labels(&mut samples_file, &sampler)?;
                samples_file.flush()?;
            }

            summaries.push(RunSummary::from_sampler(&sampler, replication, test_fold));
        }
    }

    predictions.flush()?;
    report::write_summaries(&with_suffix(&args.outfile, ".summary.json"), &summaries)?;

    tracing::info!("done: {} chains completed", summaries.len());
    Ok(())
}

/// Append a suffix to the file name of `stem`.
fn with_suffix(stem: &Path, suffix: &str) -> PathBuf {
    let mut name = stem
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(suffix);
    stem.with_file_name(name)
}
