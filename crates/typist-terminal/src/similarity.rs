//! Jaro-Winkler similarity used to suggest or auto-invoke a likely
//! intended command when no handler claims the input.

/// Jaro score at or above which the common-prefix bonus applies.
const BOOST_THRESHOLD: f64 = 0.7;

/// Longest common prefix rewarded by the Winkler adjustment.
const MAX_PREFIX: usize = 4;

/// Weight of each common-prefix character.
const PREFIX_SCALE: f64 = 0.1;

/// Best trigger found for an unrecognized verb.
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityResult {
    pub best_trigger: Option<String>,
    /// In `[0, 1]`; `1.0` means an exact match.
    pub score: f64,
}

impl SimilarityResult {
    /// No candidate at all.
    pub fn none() -> Self {
        Self {
            best_trigger: None,
            score: 0.0,
        }
    }

    /// Whether the best trigger equals the input.
    pub fn is_exact(&self) -> bool {
        self.best_trigger.is_some() && self.score >= 1.0
    }
}

/// Plain Jaro similarity of two strings, compared by `char`.
pub fn jaro(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let window = (a.len().max(b.len()) / 2).saturating_sub(1);
    let mut a_matched = vec![false; a.len()];
    let mut b_matched = vec![false; b.len()];
    let mut matches = 0usize;

    for (i, ca) in a.iter().enumerate() {
        let start = i.saturating_sub(window);
        let end = (i + window + 1).min(b.len());
        for j in start..end {
            if !b_matched[j] && b[j] == *ca {
                a_matched[i] = true;
                b_matched[j] = true;
                matches += 1;
                break;
            }
        }
    }
    if matches == 0 {
        return 0.0;
    }

    let a_seq = a.iter().zip(&a_matched).filter(|(_, m)| **m).map(|(c, _)| c);
    let b_seq = b.iter().zip(&b_matched).filter(|(_, m)| **m).map(|(c, _)| c);
    let half_transpositions = a_seq.zip(b_seq).filter(|(x, y)| x != y).count();

    let m = matches as f64;
    let t = (half_transpositions / 2) as f64;
    (m / a.len() as f64 + m / b.len() as f64 + (m - t) / m) / 3.0
}

/// Jaro-Winkler similarity: Jaro boosted by the length of the common prefix.
pub fn jaro_winkler(a: &str, b: &str) -> f64 {
    let j = jaro(a, b);
    if j < BOOST_THRESHOLD {
        return j;
    }
    let prefix = a
        .chars()
        .zip(b.chars())
        .take_while(|(x, y)| x == y)
        .take(MAX_PREFIX)
        .count();
    j + prefix as f64 * PREFIX_SCALE * (1.0 - j)
}

/// Find the trigger most similar to `verb`. Ties keep the earliest trigger.
pub fn most_similar<'a, I>(verb: &str, triggers: I) -> SimilarityResult
where
    I: IntoIterator<Item = &'a str>,
{
    let verb = verb.to_lowercase();
    let mut best = SimilarityResult::none();
    for trigger in triggers {
        let score = jaro_winkler(&trigger.to_lowercase(), &verb);
        if score > best.score {
            best = SimilarityResult {
                best_trigger: Some(trigger.to_string()),
                score,
            };
        }
    }
    best
}
