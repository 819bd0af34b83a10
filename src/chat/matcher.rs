//! Approximate string matching with the Ratcliff/Obershelp ratio.
//!
//! `ratio(a, b) = 2·M / T`, where `M` is the number of characters in the
//! matching blocks (the longest common run, then recursively the longest runs
//! to its left and right) and `T` is the total length of both strings.

use std::collections::HashMap;

use super::error::{ChatError, ChatResult};

/// Minimum similarity for the chat responder to accept a question.
pub const DEFAULT_THRESHOLD: f64 = 0.6;
pub const DEFAULT_MAX_RESULTS: usize = 1;

/// A candidate that cleared the threshold.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Match<'a> {
    pub candidate: &'a str,
    pub score: f64,
    /// Position in the candidate list.
    pub index: usize,
}

/// Threshold and result limit for fuzzy lookups.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Matcher {
    threshold: f64,
    max_results: usize,
}

impl Default for Matcher {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            max_results: DEFAULT_MAX_RESULTS,
        }
    }
}

impl Matcher {
    pub fn new(threshold: f64, max_results: usize) -> ChatResult<Self> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ChatError::InvalidMatcher(format!(
                "threshold must be within [0, 1], got {threshold}"
            )));
        }
        if max_results == 0 {
            return Err(ChatError::InvalidMatcher(
                "max_results must be at least 1".into(),
            ));
        }
        Ok(Self {
            threshold,
            max_results,
        })
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn max_results(&self) -> usize {
        self.max_results
    }

    /// Candidates scoring at least the threshold, best first, at most
    /// `max_results` of them. Equal scores keep candidate order.
    pub fn close_matches<'a, I>(&self, input: &str, candidates: I) -> Vec<Match<'a>>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let b = Sequence::new(input);
        let mut hits: Vec<Match<'a>> = candidates
            .into_iter()
            .enumerate()
            .filter_map(|(index, candidate)| {
                let a: Vec<char> = candidate.chars().collect();
                if real_quick_ratio(&a, &b.chars) < self.threshold
                    || quick_ratio(&a, &b) < self.threshold
                {
                    return None;
                }
                let score = b.ratio_with(&a);
                (score >= self.threshold).then_some(Match {
                    candidate,
                    score,
                    index,
                })
            })
            .collect();

        // Stable sort: ties stay in first-seen order.
        hits.sort_by(|x, y| y.score.total_cmp(&x.score));
        hits.truncate(self.max_results);
        hits
    }

    /// The single closest candidate above the threshold, if any.
    pub fn best_match<'a, I>(&self, input: &str, candidates: I) -> Option<&'a str>
    where
        I: IntoIterator<Item = &'a str>,
    {
        self.close_matches(input, candidates)
            .first()
            .map(|m| m.candidate)
    }
}

/// Similarity of `a` and `b` in `[0, 1]`. Two empty strings score 1.0.
pub fn ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    Sequence::new(b).ratio_with(&a)
}

/// The input side of a comparison, indexed once and reused for every candidate.
struct Sequence {
    chars: Vec<char>,
    /// Positions of each char, ascending.
    positions: HashMap<char, Vec<usize>>,
    counts: HashMap<char, usize>,
}

impl Sequence {
    fn new(s: &str) -> Self {
        let chars: Vec<char> = s.chars().collect();
        let mut positions: HashMap<char, Vec<usize>> = HashMap::new();
        for (j, c) in chars.iter().enumerate() {
            positions.entry(*c).or_default().push(j);
        }
        let counts = positions.iter().map(|(c, v)| (*c, v.len())).collect();
        Self {
            chars,
            positions,
            counts,
        }
    }

    fn ratio_with(&self, a: &[char]) -> f64 {
        let total = a.len() + self.chars.len();
        if total == 0 {
            return 1.0;
        }
        2.0 * self.matched_len(a) as f64 / total as f64
    }

    /// Sum of the matching block sizes between `a` and this sequence.
    fn matched_len(&self, a: &[char]) -> usize {
        let mut matched = 0;
        let mut queue = vec![(0, a.len(), 0, self.chars.len())];
        while let Some((alo, ahi, blo, bhi)) = queue.pop() {
            let (i, j, k) = self.longest_match(a, alo, ahi, blo, bhi);
            if k == 0 {
                continue;
            }
            matched += k;
            if alo < i && blo < j {
                queue.push((alo, i, blo, j));
            }
            if i + k < ahi && j + k < bhi {
                queue.push((i + k, ahi, j + k, bhi));
            }
        }
        matched
    }

    /// Longest common run of `a[alo..ahi]` and `self[blo..bhi]` as
    /// `(start_in_a, start_in_b, len)`. Among equally long runs the one
    /// starting earliest in `a`, then earliest in `b`, wins.
    fn longest_match(
        &self,
        a: &[char],
        alo: usize,
        ahi: usize,
        blo: usize,
        bhi: usize,
    ) -> (usize, usize, usize) {
        let (mut best_i, mut best_j, mut best_len) = (alo, blo, 0);
        // run length of the match ending at b[j], for the previous row of a
        let mut run_ending_at: HashMap<usize, usize> = HashMap::new();

        for (i, c) in a.iter().enumerate().take(ahi).skip(alo) {
            let mut next: HashMap<usize, usize> = HashMap::new();
            if let Some(js) = self.positions.get(c) {
                for &j in js {
                    if j < blo {
                        continue;
                    }
                    if j >= bhi {
                        break;
                    }
                    let k = j
                        .checked_sub(1)
                        .and_then(|prev| run_ending_at.get(&prev))
                        .copied()
                        .unwrap_or(0)
                        + 1;
                    next.insert(j, k);
                    if k > best_len {
                        best_i = i + 1 - k;
                        best_j = j + 1 - k;
                        best_len = k;
                    }
                }
            }
            run_ending_at = next;
        }
        (best_i, best_j, best_len)
    }
}

/// Upper bound on the ratio from lengths alone.
fn real_quick_ratio(a: &[char], b: &[char]) -> f64 {
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    2.0 * a.len().min(b.len()) as f64 / total as f64
}

/// Upper bound on the ratio from shared character counts, ignoring order.
fn quick_ratio(a: &[char], b: &Sequence) -> f64 {
    let total = a.len() + b.chars.len();
    if total == 0 {
        return 1.0;
    }
    let mut remaining = b.counts.clone();
    let mut shared = 0;
    for c in a {
        if let Some(n) = remaining.get_mut(c) {
            if *n > 0 {
                *n -= 1;
                shared += 1;
            }
        }
    }
    2.0 * shared as f64 / total as f64
}
