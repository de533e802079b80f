//! Dataset loading and validation
//!
//! The on-disk format is one whitespace-delimited row per trial:
//! `student_id  item_id  expert_skill_id  recall` with all ids contiguous
//! from 0 and recall in {0, 1}. Rows are ordered; a student's rows form
//! their trial sequence in study order.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::core::error::{ModelError, Result};
use crate::core::types::{ItemId, StudentId};

/// A longitudinal student response dataset
#[derive(Debug, Clone)]
pub struct Dataset {
    /// Per-student recall outcomes, one entry per trial in study order
    pub recall_sequences: Vec<Vec<bool>>,
    /// Per-student item ids, aligned with `recall_sequences`
    pub item_sequences: Vec<Vec<ItemId>>,
    /// Expert-provided skill label per item
    pub expert_labels: Vec<usize>,
    pub num_students: usize,
    pub num_items: usize,
    pub num_expert_skills: usize,
}

impl Dataset {
    /// Load a dataset from a whitespace-delimited trial file.
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);

        let mut rows: Vec<(StudentId, ItemId, usize, bool)> = Vec::new();
        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let fields: Vec<&str> = trimmed.split_whitespace().collect();
            if fields.len() != 4 {
                return Err(ModelError::Dataset(format!(
                    "line {}: expected 4 fields, found {}",
                    line_no + 1,
                    fields.len()
                )));
            }
            let parse = |s: &str, what: &str| -> Result<usize> {
                s.parse::<usize>().map_err(|_| {
                    ModelError::Dataset(format!("line {}: bad {}: {:?}", line_no + 1, what, s))
                })
            };
            let student = parse(fields[0], "student id")?;
            let item = parse(fields[1], "item id")?;
            let skill = parse(fields[2], "skill id")?;
            let recall = match fields[3] {
                "0" => false,
                "1" => true,
                other => {
                    return Err(ModelError::Dataset(format!(
                        "line {}: recall must be 0 or 1, found {:?}",
                        line_no + 1,
                        other
                    )))
                }
            };
            rows.push((student, item, skill, recall));
        }

        Self::from_trials(&rows)
    }

    /// Build a dataset from in-memory trial rows, validating id contiguity.
    pub fn from_trials(rows: &[(StudentId, ItemId, usize, bool)]) -> Result<Self> {
        if rows.is_empty() {
            return Err(ModelError::Dataset("no trials".into()));
        }

        let num_students = 1 + rows.iter().map(|r| r.0).max().unwrap_or(0);
        let num_items = 1 + rows.iter().map(|r| r.1).max().unwrap_or(0);
        let num_expert_skills = 1 + rows.iter().map(|r| r.2).max().unwrap_or(0);

        let mut recall_sequences = vec![Vec::new(); num_students];
        let mut item_sequences = vec![Vec::new(); num_students];
        let mut expert_labels = vec![usize::MAX; num_items];
        let mut skill_seen = vec![false; num_expert_skills];

        for &(student, item, skill, recall) in rows {
            recall_sequences[student].push(recall);
            item_sequences[student].push(item);
            // last occurrence wins, matching the row-ordered file format
            expert_labels[item] = skill;
            skill_seen[skill] = true;
        }

        // ids must be contiguous: every index below the maximum must occur
        for (student, seq) in item_sequences.iter().enumerate() {
            if seq.is_empty() {
                return Err(ModelError::Dataset(format!(
                    "student {} has no trials (ids must be contiguous)",
                    student
                )));
            }
        }
        for (item, &label) in expert_labels.iter().enumerate() {
            if label == usize::MAX {
                return Err(ModelError::Dataset(format!(
                    "item {} never occurs (ids must be contiguous)",
                    item
                )));
            }
        }
        for (skill, &seen) in skill_seen.iter().enumerate() {
            if !seen {
                return Err(ModelError::Dataset(format!(
                    "expert skill {} never occurs (ids must be contiguous)",
                    skill
                )));
            }
        }

        Ok(Self {
            recall_sequences,
            item_sequences,
            expert_labels,
            num_students,
            num_items,
            num_expert_skills,
        })
    }

    /// Total number of trials across all students.
    pub fn num_trials(&self) -> usize {
        self.item_sequences.iter().map(|s| s.len()).sum()
    }
}
