//! Local keyword extraction.
//!
//! Pipeline: clean → tokenize → stopword/length filter → frequency count.
//! The stopword lexicon is embedded at compile time, so extraction is pure
//! and needs no external corpus. Function words double as a crude
//! part-of-speech filter: what survives is overwhelmingly noun-like.

use std::collections::{HashMap, HashSet};

/// English stopwords and function words dropped before counting.
const STOPWORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of",
    "with", "by", "from", "is", "are", "was", "were", "be", "been", "being",
    "am", "have", "has", "had", "do", "does", "did", "done", "will", "would",
    "could", "should", "may", "might", "shall", "must", "can", "cannot",
    "this", "that", "these", "those", "there", "here", "where", "when", "who",
    "whom", "whose", "which", "what", "why", "how", "it", "its", "itself",
    "he", "him", "his", "she", "her", "hers", "they", "them", "their",
    "theirs", "we", "us", "our", "ours", "you", "your", "yours", "i", "me",
    "my", "mine", "not", "no", "nor", "so", "if", "than", "then", "too",
    "very", "just", "also", "only", "own", "same", "such", "both", "each",
    "few", "more", "most", "other", "some", "any", "all", "every", "again",
    "further", "once", "about", "above", "after", "against", "before",
    "below", "between", "during", "into", "through", "under", "until", "up",
    "down", "out", "off", "over", "while", "because", "as", "now", "quite",
    "rather", "get", "got", "make", "made", "becoming", "become", "becomes",
];

/// Word and sentence counts reported alongside each analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextStats {
    /// Significant (non-stopword) tokens.
    pub word_count: usize,
    /// Segments bounded by `.`, `!` or `?` containing at least one letter or digit.
    pub sentence_count: usize,
}

/// Stopword-filtered frequency extractor.
///
/// Construct once at startup and share behind an `Arc` — all methods take
/// `&self` and allocate only their results.
#[derive(Debug)]
pub struct KeywordExtractor {
    stop_words: HashSet<&'static str>,
    min_word_length: usize,
}

impl Default for KeywordExtractor {
    fn default() -> Self {
        Self::new(2)
    }
}

impl KeywordExtractor {
    /// `min_word_length` — tokens must be strictly longer than this to count
    /// as keywords.
    pub fn new(min_word_length: usize) -> Self {
        Self {
            stop_words: STOPWORDS.iter().copied().collect(),
            min_word_length,
        }
    }

    /// Lowercase, replace non-alphanumerics with spaces, collapse whitespace.
    pub fn clean_text(&self, text: &str) -> String {
        let lowered = text.to_lowercase();
        let replaced: String = lowered
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { ' ' })
            .collect();
        replaced.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    fn tokens(&self, text: &str) -> Vec<String> {
        self.clean_text(text)
            .split_whitespace()
            .map(str::to_string)
            .collect()
    }

    fn is_stopword(&self, word: &str) -> bool {
        self.stop_words.contains(word)
    }

    /// Tokens that survive the stopword and length filters, in input order.
    pub fn significant_tokens(&self, text: &str) -> Vec<String> {
        self.tokens(text)
            .into_iter()
            .filter(|w| w.chars().count() > self.min_word_length && !self.is_stopword(w))
            .collect()
    }

    /// The `top_n` most frequent significant tokens with their counts,
    /// highest count first. Ties break lexicographically so results are
    /// deterministic.
    pub fn keyword_frequency(&self, text: &str, top_n: usize) -> Vec<(String, usize)> {
        let mut freq: HashMap<String, usize> = HashMap::new();
        for word in self.significant_tokens(text) {
            *freq.entry(word).or_insert(0) += 1;
        }

        let mut ranked: Vec<(String, usize)> = freq.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(top_n);
        ranked
    }

    /// Extract the top `top_n` keywords, most frequent first.
    pub fn extract_keywords(&self, text: &str, top_n: usize) -> Vec<String> {
        self.keyword_frequency(text, top_n)
            .into_iter()
            .map(|(word, _)| word)
            .collect()
    }

    /// Count significant words (stopwords excluded, no length filter).
    pub fn word_count(&self, text: &str) -> usize {
        self.tokens(text)
            .iter()
            .filter(|w| !self.is_stopword(w))
            .count()
    }

    /// Count sentences by `.`, `!`, `?` boundaries.
    pub fn sentence_count(&self, text: &str) -> usize {
        text.split(['.', '!', '?'])
            .filter(|segment| segment.chars().any(char::is_alphanumeric))
            .count()
    }

    /// Word and sentence counts in one pass over the cleaned text.
    pub fn stats(&self, text: &str) -> TextStats {
        TextStats {
            word_count: self.word_count(text),
            sentence_count: self.sentence_count(text),
        }
    }
}
