//! Result serialization
//!
//! Thin writers around the sampler's query methods: per-trial predicted
//! recall probabilities, MAP skill labels, raw label samples, and a JSON
//! run summary. Formats are line-oriented so downstream analysis can stream
//! them.

use std::fs;
use std::io::Write;
use std::path::Path;

use serde::Serialize;

use crate::core::error::Result;
use crate::model::sampler::Sampler;

/// One line per (replication, fold, student, trial) with the posterior-mean
/// predicted recall probability.
pub fn write_predictions<W: Write>(
    writer: &mut W,
    sampler: &Sampler,
    replication: usize,
    fold: usize,
) -> Result<()> {
    for student in 0..sampler.num_students() {
        for trial in 0..sampler.sequence_len(student) {
            let p = sampler.estimated_recall_probability(student, trial)?;
            writeln!(
                writer,
                "{}\t{}\t{}\t{}\t{:.6}",
                replication, fold, student, trial, p
            )?;
        }
    }
    Ok(())
}

/// One line per item: the skill label from the maximum-likelihood sample.
pub fn write_map_labels<W: Write>(writer: &mut W, sampler: &Sampler) -> Result<()> {
    for label in sampler.most_likely_skill_labels()? {
        writeln!(writer, "{}", label)?;
    }
    Ok(())
}

/// One line per recorded sample: space-separated skill labels, one per item.
pub fn write_sampled_labels<W: Write>(writer: &mut W, sampler: &Sampler) -> Result<()> {
    for labels in sampler.sampled_skill_labels() {
        let fields: Vec<String> = labels.iter().map(|label| label.to_string()).collect();
        writeln!(writer, "{}", fields.join(" "))?;
    }
    Ok(())
}

/// Summary of one (replication, fold) chain for the JSON report
#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub replication: usize,
    pub fold: usize,
    pub num_samples: usize,
    pub beta: f64,
    pub alpha_prime: f64,
    pub num_skills: usize,
    pub best_train_log_likelihood: f64,
}

impl RunSummary {
    pub fn from_sampler(sampler: &Sampler, replication: usize, fold: usize) -> Self {
        let best = sampler
            .train_log_likelihoods()
            .iter()
            .cloned()
            .fold(f64::NEG_INFINITY, f64::max);
        Self {
            replication,
            fold,
            num_samples: sampler.num_samples(),
            beta: sampler.beta(),
            alpha_prime: sampler.alpha_prime(),
            num_skills: sampler.num_skills(),
            best_train_log_likelihood: best,
        }
    }
}

/// Write all run summaries as pretty-printed JSON.
pub fn write_summaries(path: &Path, summaries: &[RunSummary]) -> Result<()> {
    let json = serde_json::to_string_pretty(summaries)?;
    fs::write(path, json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::dataset::Dataset;
    use ahash::AHashSet;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn run_small_sampler() -> Sampler {
        let rows = vec![
            (0, 0, 0, true),
            (0, 1, 1, false),
            (1, 1, 1, true),
            (1, 0, 0, true),
        ];
        let dataset = Dataset::from_trials(&rows).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(21);
        let train: AHashSet<usize> = (0..dataset.num_students).collect();
        let mut sampler = Sampler::new(
            &mut rng,
            &dataset,
            train,
            AHashSet::new(),
            0.0,
            Some(1.0),
            5,
        )
        .unwrap();
        sampler.run(&mut rng, 6, 2, false, false).unwrap();
        sampler
    }

    #[test]
    fn test_prediction_lines_cover_every_trial() {
        let sampler = run_small_sampler();
        let mut out = Vec::new();
        write_predictions(&mut out, &sampler, 0, 1).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().count(), 4);
        for line in text.lines() {
            let fields: Vec<&str> = line.split('\t').collect();
            assert_eq!(fields.len(), 5);
            assert_eq!(fields[0], "0");
            assert_eq!(fields[1], "1");
            let p: f64 = fields[4].parse().unwrap();
            assert!(p > 0.0 && p < 1.0);
        }
    }

    #[test]
    fn test_sampled_label_lines_match_sample_count() {
        let sampler = run_small_sampler();
        let mut out = Vec::new();
        write_sampled_labels(&mut out, &sampler).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().count(), sampler.num_samples());
    }

    #[test]
    fn test_map_labels_one_line_per_item() {
        let sampler = run_small_sampler();
        let mut out = Vec::new();
        write_map_labels(&mut out, &sampler).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().count(), sampler.num_items());
    }
}
