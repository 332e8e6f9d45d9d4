// Candidate enumeration for the search pipeline.
//
// Two streaming generators, applied in sequence:
//
// 1. `ClosedCombinations` walks every non-decreasing multiset of a fixed
//    interval alphabet whose elements sum to exactly zero (the melody ends
//    where it began). It is a depth-first walk with an explicit stack, and
//    it prunes a prefix as soon as the remaining slots can no longer bring
//    the sum back to zero: filling every remaining slot with the current
//    element gives the smallest reachable sum, filling them with the
//    largest element gives the largest.
//
// 2. `StepwiseClosings` expands one multiset into its distinct orderings
//    whose last two intervals are both seconds. It picks each feasible
//    tail pair first, then runs the classic lexicographic next-permutation
//    over the sorted remainder, so every ordering it yields is distinct
//    without a dedup set.
//
// Both are plain iterators with no shared state; `search.rs` drives the
// first on one thread and fans the second out across a rayon pool.

use crate::melody::STEP;

/// Non-decreasing multisets of `slots` elements drawn from an alphabet, with
/// sum exactly zero, in lexicographic order.
#[derive(Debug, Clone)]
pub struct ClosedCombinations {
    alphabet: Vec<i32>,
    slots: usize,
    /// Alphabet indices chosen so far (non-decreasing).
    chosen: Vec<usize>,
    /// Next alphabet index to try at depth `chosen.len()`.
    cursor: usize,
    sum: i64,
}

impl ClosedCombinations {
    /// The alphabet is sorted and deduplicated. Zero slots yield nothing.
    pub fn new(alphabet: &[i32], slots: usize) -> Self {
        let mut alphabet = alphabet.to_vec();
        alphabet.sort_unstable();
        alphabet.dedup();
        let cursor = if slots == 0 { alphabet.len() } else { 0 };
        ClosedCombinations {
            alphabet,
            slots,
            chosen: Vec::with_capacity(slots),
            cursor,
            sum: 0,
        }
    }

    fn max_element(&self) -> i64 {
        self.alphabet.last().copied().map_or(0, i64::from)
    }
}

impl Iterator for ClosedCombinations {
    type Item = Vec<i32>;

    fn next(&mut self) -> Option<Vec<i32>> {
        loop {
            if self.cursor >= self.alphabet.len() {
                // This depth is exhausted; back up one slot.
                let last = self.chosen.pop()?;
                self.sum -= i64::from(self.alphabet[last]);
                self.cursor = last + 1;
                continue;
            }

            let index = self.cursor;
            let value = i64::from(self.alphabet[index]);
            let remaining = (self.slots - self.chosen.len() - 1) as i64;
            let sum = self.sum + value;
            let lowest = sum + remaining * value;
            let highest = sum + remaining * self.max_element();

            if lowest > 0 {
                // Larger elements only raise the floor.
                self.cursor = self.alphabet.len();
                continue;
            }
            if highest < 0 {
                self.cursor += 1;
                continue;
            }

            self.chosen.push(index);
            self.sum = sum;
            if self.chosen.len() == self.slots {
                // remaining == 0 here, so lowest == highest == sum == 0.
                let combination = self.chosen.iter().map(|&i| self.alphabet[i]).collect();
                self.chosen.pop();
                self.sum -= value;
                self.cursor = index + 1;
                return Some(combination);
            }
            self.cursor = index;
        }
    }
}

/// Number of seconds (unit steps, either direction) in `intervals`.
pub fn count_steps(intervals: &[i32]) -> usize {
    intervals.iter().filter(|iv| iv.abs() == STEP).count()
}

/// Rearrange `values` into the next lexicographically greater permutation.
/// Returns false (leaving `values` sorted ascending) once the last
/// permutation has been passed.
pub fn next_permutation(values: &mut [i32]) -> bool {
    let n = values.len();
    if n < 2 {
        return false;
    }
    let mut i = n - 1;
    while i > 0 && values[i - 1] >= values[i] {
        i -= 1;
    }
    if i == 0 {
        values.reverse();
        return false;
    }
    let mut j = n - 1;
    while values[j] <= values[i - 1] {
        j -= 1;
    }
    values.swap(i - 1, j);
    values[i..].reverse();
    true
}

/// Distinct orderings of a multiset that end in two seconds.
#[derive(Debug, Clone)]
pub struct StepwiseClosings {
    tails: std::vec::IntoIter<(Vec<i32>, [i32; 2])>,
    current: Option<(Vec<i32>, [i32; 2])>,
}

impl StepwiseClosings {
    pub fn new(multiset: &[i32]) -> Self {
        let mut tails = Vec::new();
        for first in [-STEP, STEP] {
            for second in [-STEP, STEP] {
                let mut rest = multiset.to_vec();
                if remove_one(&mut rest, first) && remove_one(&mut rest, second) {
                    rest.sort_unstable();
                    tails.push((rest, [first, second]));
                }
            }
        }
        StepwiseClosings {
            tails: tails.into_iter(),
            current: None,
        }
    }
}

fn remove_one(values: &mut Vec<i32>, target: i32) -> bool {
    match values.iter().position(|&v| v == target) {
        Some(pos) => {
            values.swap_remove(pos);
            true
        }
        None => false,
    }
}

impl Iterator for StepwiseClosings {
    type Item = Vec<i32>;

    fn next(&mut self) -> Option<Vec<i32>> {
        loop {
            if let Some((rest, tail)) = &mut self.current {
                let mut ordering = Vec::with_capacity(rest.len() + 2);
                ordering.extend_from_slice(rest);
                ordering.extend_from_slice(tail);
                let exhausted = !next_permutation(rest);
                if exhausted {
                    self.current = None;
                }
                return Some(ordering);
            }
            self.current = Some(self.tails.next()?);
        }
    }
}
