//! The item-to-skill partition and the skill record arena
//!
//! Skills ("tables" under the restaurant metaphor) live in a slab arena
//! addressed by stable integer handles, with a free list for reclaimed
//! slots. A skill is created when an item must start a new one and dies the
//! instant its last item is removed. The seating vector and the arena must
//! only be mutated through the matched assign/remove operations; everything
//! else in the sampler reads them.

use ahash::AHashMap;

use crate::core::types::{ItemId, SkillHandle, StudentId, TrialIndex};
use crate::model::bkt::BktParams;

/// One skill's mutable state
#[derive(Debug, Clone)]
pub struct SkillRecord {
    pub params: BktParams,
    /// Number of items currently assigned to this skill
    pub size: usize,
    /// Per-student sorted trial indices attributable to this skill
    pub trials: AHashMap<StudentId, Vec<TrialIndex>>,
}

/// Which items an expert-concordance count ranges over
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConcordanceScope {
    /// Only items with index below the query item: replaying the generative
    /// seating order for seating-probability evaluation
    Generative,
    /// All currently seated items: live resampling, where the query item has
    /// already been removed from its table
    Live,
}

/// The mutable assignment of items to skills
#[derive(Debug, Clone)]
pub struct Partition {
    seating: Vec<Option<SkillHandle>>,
    slots: Vec<Option<SkillRecord>>,
    free: Vec<usize>,
    num_skills: usize,
}

impl Partition {
    pub fn new(num_items: usize) -> Self {
        Self {
            seating: vec![None; num_items],
            slots: Vec::new(),
            free: Vec::new(),
            num_skills: 0,
        }
    }

    pub fn num_items(&self) -> usize {
        self.seating.len()
    }

    /// Number of currently live skills.
    pub fn num_skills(&self) -> usize {
        self.num_skills
    }

    /// Arena capacity; dense per-slot buffers should be sized by this.
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn seat_of(&self, item: ItemId) -> Option<SkillHandle> {
        self.seating[item]
    }

    /// Live handles in slot order.
    pub fn live_handles(&self) -> impl Iterator<Item = SkillHandle> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_some())
            .map(|(idx, _)| SkillHandle(idx))
    }

    pub fn record(&self, handle: SkillHandle) -> Option<&SkillRecord> {
        self.slots[handle.0].as_ref()
    }

    pub fn params(&self, handle: SkillHandle) -> &BktParams {
        &self.slots[handle.0].as_ref().expect("dead skill handle").params
    }

    pub fn params_mut(&mut self, handle: SkillHandle) -> &mut BktParams {
        &mut self.slots[handle.0].as_mut().expect("dead skill handle").params
    }

    pub fn size(&self, handle: SkillHandle) -> usize {
        self.slots[handle.0].as_ref().expect("dead skill handle").size
    }

    pub fn trials(&self, handle: SkillHandle) -> &AHashMap<StudentId, Vec<TrialIndex>> {
        &self.slots[handle.0].as_ref().expect("dead skill handle").trials
    }

    /// Seat `item` at a fresh skill with the given parameters.
    ///
    /// `item_trials` lists, per training student who studied the item, the
    /// sorted trial indices of that item.
    pub fn assign_new(
        &mut self,
        item: ItemId,
        params: BktParams,
        item_trials: &[(StudentId, Vec<TrialIndex>)],
    ) -> SkillHandle {
        debug_assert!(self.seating[item].is_none(), "item already seated");
        let mut trials = AHashMap::with_capacity(item_trials.len());
        for (student, indices) in item_trials {
            trials.insert(*student, indices.clone());
        }
        let record = SkillRecord {
            params,
            size: 1,
            trials,
        };
        let handle = match self.free.pop() {
            Some(idx) => {
                self.slots[idx] = Some(record);
                SkillHandle(idx)
            }
            None => {
                self.slots.push(Some(record));
                SkillHandle(self.slots.len() - 1)
            }
        };
        self.seating[item] = Some(handle);
        self.num_skills += 1;
        handle
    }

    /// Seat `item` at an existing skill, merging its trial indices into the
    /// skill's per-student lists.
    pub fn assign(
        &mut self,
        item: ItemId,
        handle: SkillHandle,
        item_trials: &[(StudentId, Vec<TrialIndex>)],
    ) {
        debug_assert!(self.seating[item].is_none(), "item already seated");
        let record = self.slots[handle.0].as_mut().expect("dead skill handle");
        record.size += 1;
        for (student, indices) in item_trials {
            let merged = match record.trials.get(student) {
                Some(existing) => merge_sorted(existing, indices),
                None => indices.clone(),
            };
            record.trials.insert(*student, merged);
        }
        self.seating[item] = Some(handle);
    }

    /// Detach `item` from a skill, deleting the skill if it becomes empty.
    ///
    /// Returns true if the skill died.
    pub fn remove(
        &mut self,
        item: ItemId,
        handle: SkillHandle,
        item_trials: &[(StudentId, Vec<TrialIndex>)],
    ) -> bool {
        debug_assert_eq!(self.seating[item], Some(handle), "item not seated here");
        self.seating[item] = None;

        let record = self.slots[handle.0].as_mut().expect("dead skill handle");
        record.size -= 1;
        if record.size == 0 {
            self.slots[handle.0] = None;
            self.free.push(handle.0);
            self.num_skills -= 1;
            return true;
        }

        for (student, indices) in item_trials {
            let existing = record
                .trials
                .get(student)
                .expect("trial bookkeeping out of sync");
            if existing.len() == indices.len() {
                // the item carried all of this student's trials for the skill
                record.trials.remove(student);
            } else {
                let remaining = subtract_sorted(existing, indices);
                record.trials.insert(*student, remaining);
            }
        }
        false
    }

    /// The expert-label concordance weight `K` from the seating equation.
    ///
    /// Counts, among the items seated at `handle` within `scope` (excluding
    /// `item` itself), how many share each expert label; the returned ratio
    /// contrasts the item's own label count against the maximum count,
    /// exponentiated by `gamma`.
    pub fn expert_concordance(
        &self,
        item: ItemId,
        handle: SkillHandle,
        expert_labels: &[usize],
        num_expert_skills: usize,
        gamma: f64,
        scope: ConcordanceScope,
    ) -> f64 {
        debug_assert!(
            scope == ConcordanceScope::Generative || self.seating[item].is_none(),
            "live concordance expects the item to be unseated"
        );
        let end = match scope {
            ConcordanceScope::Generative => item,
            ConcordanceScope::Live => self.seating.len(),
        };
        let item_label = expert_labels[item];

        // label -> count of items at this table with that label; a Vec keeps
        // the summation order deterministic
        let mut counts: Vec<(usize, usize)> = Vec::new();
        let mut max_count = 0usize;
        for other in 0..end {
            if other == item || self.seating[other] != Some(handle) {
                continue;
            }
            let label = expert_labels[other];
            let count = match counts.iter().position(|&(l, _)| l == label) {
                Some(idx) => {
                    counts[idx].1 += 1;
                    counts[idx].1
                }
                None => {
                    counts.push((label, 1));
                    1
                }
            };
            max_count = max_count.max(count);
        }

        let own_count = counts
            .iter()
            .find(|(l, _)| *l == item_label)
            .map(|(_, c)| *c);
        let numerator = match own_count {
            Some(c) => gamma.powi((max_count - c) as i32),
            None => gamma.powi(max_count as i32),
        };
        let mut denominator =
            (num_expert_skills - counts.len()) as f64 * gamma.powi(max_count as i32);
        for &(_, count) in &counts {
            denominator += gamma.powi((max_count - count) as i32);
        }
        numerator / denominator
    }
}

/// Merge two sorted index lists into one sorted list without duplicates.
fn merge_sorted(a: &[TrialIndex], b: &[TrialIndex]) -> Vec<TrialIndex> {
    let mut out = Vec::with_capacity(a.len() + b.len());
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        if a[i] < b[j] {
            out.push(a[i]);
            i += 1;
        } else if b[j] < a[i] {
            out.push(b[j]);
            j += 1;
        } else {
            out.push(a[i]);
            i += 1;
            j += 1;
        }
    }
    out.extend_from_slice(&a[i..]);
    out.extend_from_slice(&b[j..]);
    out
}

/// Remove every index in sorted `b` from sorted `a`.
fn subtract_sorted(a: &[TrialIndex], b: &[TrialIndex]) -> Vec<TrialIndex> {
    let mut out = Vec::with_capacity(a.len().saturating_sub(b.len()));
    let mut j = 0;
    for &value in a {
        if j < b.len() && value == b[j] {
            j += 1;
        } else {
            out.push(value);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> BktParams {
        BktParams {
            psi: 0.4,
            mu: 0.1,
            pi1: 0.8,
            prop0: 0.3,
        }
    }

    fn trials_of(entries: &[(usize, &[usize])]) -> Vec<(StudentId, Vec<TrialIndex>)> {
        entries
            .iter()
            .map(|(s, t)| (*s, t.to_vec()))
            .collect()
    }

    #[test]
    fn test_assign_remove_roundtrip() {
        let mut partition = Partition::new(2);
        let t0 = trials_of(&[(0, &[0, 2]), (1, &[1])]);
        let t1 = trials_of(&[(0, &[1, 3])]);

        let h = partition.assign_new(0, params(), &t0);
        assert_eq!(partition.size(h), 1);

        partition.assign(1, h, &t1);
        assert_eq!(partition.size(h), 2);
        assert_eq!(partition.trials(h).get(&0).unwrap(), &vec![0, 1, 2, 3]);
        assert_eq!(partition.trials(h).get(&1).unwrap(), &vec![1]);

        let died = partition.remove(1, h, &t1);
        assert!(!died);
        assert_eq!(partition.size(h), 1);
        assert_eq!(partition.trials(h).get(&0).unwrap(), &vec![0, 2]);
        assert_eq!(partition.trials(h).get(&1).unwrap(), &vec![1]);

        let died = partition.remove(0, h, &t0);
        assert!(died);
        assert_eq!(partition.num_skills(), 0);
        assert!(partition.seat_of(0).is_none());
    }

    #[test]
    fn test_free_slot_reused() {
        let mut partition = Partition::new(2);
        let t = trials_of(&[(0, &[0])]);
        let h0 = partition.assign_new(0, params(), &t);
        partition.remove(0, h0, &t);
        let h1 = partition.assign_new(1, params(), &trials_of(&[(0, &[1])]));
        assert_eq!(h0, h1);
        assert_eq!(partition.slot_count(), 1);
    }

    #[test]
    fn test_sizes_sum_to_seated_items() {
        let mut partition = Partition::new(4);
        let empty = trials_of(&[]);
        let h0 = partition.assign_new(0, params(), &empty);
        partition.assign(1, h0, &empty);
        let h1 = partition.assign_new(2, params(), &empty);
        partition.assign(3, h1, &empty);

        let total: usize = partition.live_handles().map(|h| partition.size(h)).sum();
        assert_eq!(total, 4);
        assert_eq!(partition.num_skills(), 2);
    }

    #[test]
    fn test_concordance_uniform_when_table_empty() {
        let mut partition = Partition::new(3);
        let empty = trials_of(&[]);
        let h = partition.assign_new(0, params(), &empty);
        partition.remove(0, h, &empty);
        let h = partition.assign_new(1, params(), &empty);

        // table holds only item 1; for item 0 in generative scope nothing is
        // seated below it, so K = 1 / num_expert_skills
        let k = partition.expert_concordance(0, h, &[0, 1, 0], 2, 0.5, ConcordanceScope::Generative);
        assert!((k - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_concordance_favors_matching_label() {
        let mut partition = Partition::new(4);
        let empty = trials_of(&[]);
        let h = partition.assign_new(1, params(), &empty);
        partition.assign(2, h, &empty);
        // items 1 and 2 share expert label 0; item 3 carries label 1
        let labels = [0, 0, 0, 1];
        let gamma = 0.25;

        let k_match =
            partition.expert_concordance(0, h, &labels, 2, gamma, ConcordanceScope::Live);
        let k_other =
            partition.expert_concordance(3, h, &labels, 2, gamma, ConcordanceScope::Live);
        assert!(k_match > k_other);
        // K values are normalized across labels: numerator cases sum within
        // the shared denominator, so both lie in (0, 1)
        assert!(k_match > 0.0 && k_match < 1.0);
        assert!(k_other > 0.0 && k_other < 1.0);
    }
}
