//! Blocked-word filter applied to raw input before dispatch.

/// Case-insensitive whole-word filter with leetspeak folding.
#[derive(Debug, Clone, Default)]
pub struct BlockedWords {
    words: Vec<String>,
}

impl BlockedWords {
    /// Build a filter from a word list. Words are matched case-insensitively.
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let words = words
            .into_iter()
            .map(|w| w.as_ref().trim().to_lowercase())
            .filter(|w| !w.is_empty())
            .collect();
        Self { words }
    }

    /// Whether no words are blocked.
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Return the first blocked word found in `input`, if any.
    pub fn check(&self, input: &str) -> Option<&str> {
        if self.words.is_empty() {
            return None;
        }
        let folded = fold_leet(&input.to_lowercase());
        let cleaned = strip_comment_markers(&folded);
        let tokens: Vec<&str> = cleaned.split_whitespace().collect();
        self.words
            .iter()
            .find(|word| tokens.iter().any(|t| t == word))
            .map(String::as_str)
    }
}

/// Map common digit and symbol substitutions back to letters.
fn fold_leet(input: &str) -> String {
    input
        .chars()
        .map(|c| match c {
            '4' | '@' | '^' => 'a',
            '8' | '6' => 'b',
            '(' | '<' | '{' => 'c',
            '3' | '&' => 'e',
            '}' => 'f',
            '9' => 'g',
            '#' => 'h',
            '1' | '!' | '|' => 'i',
            ']' => 'j',
            '7' => 'l',
            '~' => 'n',
            '0' => 'o',
            '?' => 'p',
            '2' => 'r',
            '$' | '5' => 's',
            '+' => 't',
            '%' => 'z',
            other => other,
        })
        .collect()
}

fn strip_comment_markers(input: &str) -> String {
    input
        .replace("//", "")
        .replace("/*", "")
        .replace("*/", "")
        .replace('*', "")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_filter_never_blocks() {
        let filter = BlockedWords::default();
        assert!(filter.is_empty());
        assert_eq!(filter.check("anything at all"), None);
    }

    #[test]
    fn whole_word_match_only() {
        let filter = BlockedWords::new(["heck"]);
        assert_eq!(filter.check("what the heck"), Some("heck"));
        assert_eq!(filter.check("checked out"), None);
    }

    #[test]
    fn case_insensitive() {
        let filter = BlockedWords::new(["Heck"]);
        assert_eq!(filter.check("HECK no"), Some("heck"));
    }

    #[test]
    fn leet_is_folded() {
        let filter = BlockedWords::new(["heck", "darn"]);
        assert_eq!(filter.check("h3ck"), Some("heck"));
        assert_eq!(filter.check("d4rn it"), Some("darn"));
    }

    #[test]
    fn comment_markers_are_ignored() {
        let filter = BlockedWords::new(["heck"]);
        assert_eq!(filter.check("/*heck*/"), Some("heck"));
        assert_eq!(filter.check("he*ck"), Some("heck"));
    }

    #[test]
    fn blank_entries_dropped() {
        let filter = BlockedWords::new(["", "  "]);
        assert!(filter.is_empty());
    }
}
