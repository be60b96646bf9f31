//! Token-sort string similarity
//!
//! Scores two names from 0 to 100 ignoring case, punctuation and word
//! order: both strings are normalized, their tokens sorted and rejoined,
//! and the results compared by normalized indel similarity.

/// Drop non-ASCII, lowercase, turn everything but letters and digits into
/// spaces, and trim
pub fn process(s: &str) -> String {
    let mapped: String = s
        .chars()
        .filter(char::is_ascii)
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                ' '
            }
        })
        .collect();
    mapped.trim().to_string()
}

/// Processed tokens in sorted order joined by single spaces
pub fn token_sort(s: &str) -> String {
    let processed = process(s);
    let mut tokens: Vec<&str> = processed.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

fn lcs_len(a: &[u8], b: &[u8]) -> usize {
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];

    for &x in a {
        for (j, &y) in b.iter().enumerate() {
            curr[j + 1] = if x == y {
                prev[j] + 1
            } else {
                curr[j].max(prev[j + 1])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// Normalized indel similarity of two strings as a percentage
pub fn ratio(a: &str, b: &str) -> f64 {
    let total = a.len() + b.len();
    if total == 0 {
        return 100.0;
    }
    let distance = total - 2 * lcs_len(a.as_bytes(), b.as_bytes());
    (1.0 - distance as f64 / total as f64) * 100.0
}

/// Word-order-insensitive similarity rounded half-to-even
///
/// Returns 0 when either name has no letters or digits.
pub fn token_sort_ratio(a: &str, b: &str) -> u8 {
    let a = token_sort(a);
    let b = token_sort(b);
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    ratio(&a, &b).round_ties_even() as u8
}
