//! Train/test split bookkeeping for cross-validation
//!
//! The fold file has one line per replication, each containing one fold id
//! per student, whitespace-separated. For a given (replication, test_fold)
//! pair, students in the test fold are held out and everyone else trains.
//! With a single fold there is no held-out set and all students train.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use ahash::AHashSet;

use crate::core::error::{ModelError, Result};
use crate::core::types::StudentId;

/// Per-replication fold assignments for every student
#[derive(Debug, Clone)]
pub struct FoldAssignments {
    /// `fold_ids[replication][student]` = fold number
    pub fold_ids: Vec<Vec<usize>>,
    pub num_folds: usize,
}

impl FoldAssignments {
    /// Load fold assignments, validating one fold id per student per line.
    pub fn load(path: &Path, num_students: usize) -> Result<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);

        let mut fold_ids = Vec::new();
        let mut num_folds = 0;
        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let mut row = Vec::with_capacity(num_students);
            for field in trimmed.split_whitespace() {
                let fold = field.parse::<usize>().map_err(|_| {
                    ModelError::Folds(format!("line {}: bad fold id {:?}", line_no + 1, field))
                })?;
                num_folds = num_folds.max(fold + 1);
                row.push(fold);
            }
            if row.len() != num_students {
                return Err(ModelError::Folds(format!(
                    "line {}: expected {} fold ids, found {}",
                    line_no + 1,
                    num_students,
                    row.len()
                )));
            }
            fold_ids.push(row);
        }

        if fold_ids.is_empty() {
            return Err(ModelError::Folds("no replications".into()));
        }

        Ok(Self { fold_ids, num_folds })
    }

    /// A single trivial replication: everyone trains, nothing is held out.
    pub fn single_fold(num_students: usize) -> Self {
        Self {
            fold_ids: vec![vec![0; num_students]],
            num_folds: 1,
        }
    }

    pub fn num_replications(&self) -> usize {
        self.fold_ids.len()
    }

    /// Split students into (train, test) sets for one replication and fold.
    ///
    /// The sets are disjoint and cover all students. With a single fold the
    /// test set is empty.
    pub fn split(
        &self,
        replication: usize,
        test_fold: usize,
    ) -> (AHashSet<StudentId>, AHashSet<StudentId>) {
        let mut train = AHashSet::new();
        let mut test = AHashSet::new();
        for (student, &fold) in self.fold_ids[replication].iter().enumerate() {
            if fold == test_fold && self.num_folds > 1 {
                test.insert(student);
            } else {
                train.insert(student);
            }
        }
        (train, test)
    }
}
