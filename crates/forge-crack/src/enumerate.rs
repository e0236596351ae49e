//! Closed-form bijection between an index and the password it names,
//! used for the random-enumeration tail of a cracking job.
//!
//! Passwords are enumerated length-then-lexicographically: all
//! length-1 strings, then all length-2 strings, and so on. This is
//! the bijective base-`B` numeral system (digits `1..=B` rather than
//! `0..=B-1`), which is why `index_to_password` works from `i + 1`
//! instead of `i`.

/// Number of non-empty strings of length strictly less than `len`
/// over a charset of size `base`, plus one for the empty string:
/// `sum_{k=0..len-1} base^k`.
pub fn total(base: u64, len: u32) -> u64 {
    (0..len).fold(0u64, |acc, k| acc + base.pow(k))
}

/// Maps a global index (0-based, across the whole length-then-lex
/// enumeration) to the password it names.
pub fn index_to_password(index: u64, charset: &[char]) -> String {
    let base = charset.len() as u64;
    let mut n = index + 1;
    let mut digits = Vec::new();
    while n > 0 {
        let digit = (n - 1) % base;
        digits.push(charset[digit as usize]);
        n = (n - 1) / base;
    }
    digits.into_iter().rev().collect()
}

/// The `[skip, skip + n_total)` index range a random-enumeration job
/// must cover to produce every password of length `min_len..=max_len`
/// exactly once.
pub fn index_range(base: u64, min_len: u32, max_len: u32) -> (u64, u64) {
    let skip = total(base, min_len) - 1;
    let n_total: u64 = (min_len..=max_len).map(|k| base.pow(k)).sum();
    (skip, n_total)
}

/// Splits `[start, start + count)` into `worker_count` contiguous
/// ranges of size `ceil(count / worker_count)`, the last one clamped
/// to the global end.
pub fn partition_range(start: u64, count: u64, worker_count: usize) -> Vec<(u64, u64)> {
    if worker_count == 0 || count == 0 {
        return Vec::new();
    }
    let chunk = count.div_ceil(worker_count as u64);
    let end = start + count;
    (0..worker_count)
        .map(|w| {
            let lo = (start + w as u64 * chunk).min(end);
            let hi = (lo + chunk).min(end);
            (lo, hi)
        })
        .filter(|&(lo, hi)| lo < hi)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_scenario_indices_to_expected_passwords() {
        let charset: Vec<char> = "ab".chars().collect();
        let (skip, n_total) = index_range(2, 1, 3);
        assert_eq!(skip, 0);
        assert_eq!(n_total, 14);
        assert_eq!(index_to_password(0, &charset), "a");
        assert_eq!(index_to_password(1, &charset), "b");
        assert_eq!(index_to_password(2, &charset), "aa");
        assert_eq!(index_to_password(13, &charset), "bbb");
    }

    #[test]
    fn skip_rebases_to_first_password_of_min_len() {
        let charset: Vec<char> = "ab".chars().collect();
        let (skip, n_total) = index_range(2, 2, 3);
        // lengths 2 and 3 only: 4 + 8 = 12 candidates, starting after
        // the two length-1 prefix slots "a" and "b" would have occupied.
        assert_eq!(skip, 2);
        assert_eq!(n_total, 12);
        assert_eq!(index_to_password(skip, &charset), "aa");
        assert_eq!(index_to_password(skip + n_total - 1, &charset), "bbb");
    }

    #[test]
    fn partitions_are_contiguous_and_cover_the_whole_range() {
        let ranges = partition_range(10, 14, 3);
        assert_eq!(ranges, vec![(10, 15), (15, 20), (20, 24)]);
        let covered: u64 = ranges.iter().map(|(lo, hi)| hi - lo).sum();
        assert_eq!(covered, 14);
    }

    #[test]
    fn partition_of_empty_range_is_empty() {
        assert!(partition_range(0, 0, 4).is_empty());
    }
}
