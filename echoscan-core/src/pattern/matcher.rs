//! Repetition matcher: longest tail-anchored repeat search.
//!
//! Given a symbol sequence of length N, find the largest L such that the last
//! L symbols occur earlier as a contiguous run lying entirely inside
//! `[0, N - L)`, and report the rightmost such occurrence.
//!
//! Two implementations with identical results:
//! - [`find_tail_repeat_naive`]: direct transcription of the search rule,
//!   trying L = N, N-1, ..., 1 with a right-to-left window scan.
//! - [`find_tail_repeat`]: linear time via the Z-function of the reversed
//!   sequence. This is what the scan loop uses.

use serde::{Deserialize, Serialize};

use crate::domain::{Symbol, SymbolSequence};

/// A recurring tail and the prior occurrence selected for it.
///
/// Invariants: `seq[anchor..anchor + L] == combo == seq[N - L..]` and
/// `anchor + L <= N - L`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    /// Start index of the selected prior occurrence.
    pub anchor: usize,
    /// The recurring tail.
    pub combo: SymbolSequence,
}

impl Match {
    fn from_tail(seq: &[Symbol], anchor: usize, len: usize) -> Self {
        Self {
            anchor,
            combo: SymbolSequence::new(seq[seq.len() - len..].to_vec()),
        }
    }

    /// Length of the combo (the signal strength).
    pub fn combo_len(&self) -> usize {
        self.combo.len()
    }

    /// Index just past the prior occurrence: where its continuation starts.
    pub fn continuation_start(&self) -> usize {
        self.anchor + self.combo_len()
    }
}

/// Find the longest recurring tail, linear time.
///
/// Let `lcs(e)` be the length of the longest common suffix of `seq[..e]`
/// and `seq`. An occurrence of the length-L tail ending at `e` qualifies iff
/// `lcs(e) >= L` and `e <= N - L`, so the answer is `max_e min(lcs(e), N - e)`
/// and the rightmost occurrence is the one with the largest such `e`.
/// `lcs(N - k)` is `z[k]` of the reversed sequence.
pub fn find_tail_repeat(seq: &[Symbol]) -> Option<Match> {
    let n = seq.len();
    if n < 2 {
        return None;
    }

    let reversed: Vec<Symbol> = seq.iter().rev().copied().collect();
    let z = z_function(&reversed);

    // k = N - e is the distance of the occurrence end from the sequence end.
    let best_len = (1..n).map(|k| z[k].min(k)).max().unwrap_or(0);
    if best_len == 0 {
        return None;
    }

    // Smallest k is the largest e, i.e. the rightmost occurrence.
    let k = (best_len..n).find(|&k| z[k] >= best_len)?;
    let anchor = n - k - best_len;
    Some(Match::from_tail(seq, anchor, best_len))
}

/// Reference matcher: the search rule applied literally.
///
/// Quadratic-to-cubic in N; kept for equivalence tests and benchmarks.
pub fn find_tail_repeat_naive(seq: &[Symbol]) -> Option<Match> {
    let n = seq.len();
    for len in (1..=n).rev() {
        let tail = &seq[n - len..];
        let haystack = &seq[..n - len];
        if haystack.len() < len {
            continue;
        }
        if let Some(anchor) = haystack.windows(len).rposition(|w| w == tail) {
            return Some(Match::from_tail(seq, anchor, len));
        }
    }
    None
}

/// `z[i]` = length of the longest common prefix of `s` and `s[i..]`.
fn z_function<T: PartialEq>(s: &[T]) -> Vec<usize> {
    let n = s.len();
    let mut z = vec![0; n];
    if n == 0 {
        return z;
    }
    z[0] = n;
    // [left, right) is the rightmost segment known to match a prefix.
    let (mut left, mut right) = (0, 0);
    for i in 1..n {
        if i < right {
            z[i] = (right - i).min(z[i - left]);
        }
        while i + z[i] < n && s[z[i]] == s[i + z[i]] {
            z[i] += 1;
        }
        if i + z[i] > right {
            left = i;
            right = i + z[i];
        }
    }
    z
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seq(s: &str) -> SymbolSequence {
        s.parse().unwrap()
    }

    fn both(s: &str) -> Option<Match> {
        let input = seq(s);
        let fast = find_tail_repeat(&input);
        let slow = find_tail_repeat_naive(&input);
        assert_eq!(fast, slow, "matchers disagree on {s}");
        fast
    }

    #[test]
    fn repeated_half_matches_at_start() {
        let m = both("UUUDDDUUUDDD").unwrap();
        assert_eq!(m.combo_len(), 6);
        assert_eq!(m.anchor, 0);
        assert_eq!(m.combo.to_string(), "UUUDDD");
    }

    #[test]
    fn empty_and_single_have_no_match() {
        assert!(both("").is_none());
        assert!(both("U").is_none());
    }

    #[test]
    fn two_distinct_symbols_have_no_match() {
        assert!(both("UD").is_none());
        assert!(both("FUD").is_none());
    }

    #[test]
    fn two_equal_symbols_match_length_one() {
        let m = both("DD").unwrap();
        assert_eq!(m.combo_len(), 1);
        assert_eq!(m.anchor, 0);
    }

    #[test]
    fn rightmost_prior_occurrence_wins() {
        // "UD" occurs at 0 and 2 before the tail window at 6..8.
        let m = both("UDUDFFUD").unwrap();
        assert_eq!(m.combo.to_string(), "UD");
        assert_eq!(m.anchor, 2);
    }

    #[test]
    fn single_symbol_run_respects_non_overlap() {
        // N = 7: L = 3 is the largest with anchor + L <= N - L.
        let m = both("FFFFFFF").unwrap();
        assert_eq!(m.combo_len(), 3);
        assert_eq!(m.anchor, 1);
    }

    #[test]
    fn occurrence_may_touch_tail_window() {
        // "DU" at 2..4 ends exactly where the tail window starts.
        let m = both("FUDUDU").unwrap();
        assert_eq!(m.combo.to_string(), "DU");
        assert_eq!(m.anchor, 2);
    }

    #[test]
    fn falls_back_to_shorter_tail() {
        // Only the last symbol recurs.
        let m = both("UUFFDU").unwrap();
        assert_eq!(m.combo_len(), 1);
        assert_eq!(m.anchor, 1);
    }

    #[test]
    fn continuation_starts_after_anchor_occurrence() {
        let m = both("UDFFUD").unwrap();
        assert_eq!(m.anchor, 0);
        assert_eq!(m.continuation_start(), 2);
    }

    #[test]
    fn z_function_basics() {
        let z = z_function(&[1, 1, 2, 1, 1]);
        assert_eq!(z, vec![5, 1, 0, 2, 1]);
        assert!(z_function::<u8>(&[]).is_empty());
    }
}
