//! Sentence ranking for extractive summaries.
//!
//! The scorer splits a document into sentences and gives each eligible
//! sentence an additive score built from four components: position,
//! lexical salience, length preference and discourse markers. The top
//! sentences are then put back into document order.
//!
//! # Example
//!
//! ```rust
//! use readcast_core::scoring::{ScorerConfig, TextScorer};
//!
//! let scorer = TextScorer::new(ScorerConfig::default());
//! let selection = scorer.select("Too short to rank.");
//! assert_eq!(selection.texts(), vec!["Too short to rank."]);
//! ```

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace pattern"));

static SENTENCE_BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?]+\s+|[.!?]+$|\n\n+").expect("valid sentence boundary pattern"));

static NON_LETTER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\p{L}\s]").expect("valid letter pattern"));

/// Importance markers for Vietnamese articles.
pub const VIETNAMESE_MARKERS: &[&str] = &[
    "quan trọng",
    "chính",
    "kết luận",
    "tóm lại",
    "đầu tiên",
    "cuối cùng",
    "theo",
    "cho biết",
    "nhấn mạnh",
    "đặc biệt",
];

/// Importance markers for English articles.
pub const ENGLISH_MARKERS: &[&str] = &[
    "importantly",
    "in conclusion",
    "in summary",
    "firstly",
    "finally",
    "according to",
    "notably",
    "emphasized",
    "key",
    "especially",
];

/// Configuration for the sentence scorer
#[derive(Debug, Clone)]
pub struct ScorerConfig {
    /// Number of sentences to keep (N)
    pub summary_length: usize,
    /// Normalized documents shorter than this are returned unsegmented
    pub short_text_threshold: usize,
    /// Fragments with at most this many characters are dropped during segmentation
    pub min_fragment_chars: usize,
    /// Sentences with at most this many characters are not eligible for scoring
    pub min_sentence_chars: usize,
    /// Lowercase phrases that signal an important sentence
    pub markers: Vec<String>,
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            summary_length: 5,
            short_text_threshold: 100,
            min_fragment_chars: 10,
            min_sentence_chars: 20,
            markers: VIETNAMESE_MARKERS.iter().map(|m| m.to_string()).collect(),
        }
    }
}

impl ScorerConfig {
    /// Default configuration with the English marker list.
    pub fn english() -> Self {
        Self { markers: ENGLISH_MARKERS.iter().map(|m| m.to_string()).collect(), ..Self::default() }
    }
}

/// A sentence together with its position in the document and its score
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredSentence {
    /// Index among the eligible sentences, in document order
    pub original_index: usize,
    /// Trimmed sentence text without its terminal punctuation
    pub text: String,
    /// Combined score (0.0 when scoring was skipped)
    pub score: f64,
}

/// Outcome of selecting sentences from a document
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    /// The document was too short to segment; holds the normalized text.
    Unsegmented(String),
    /// No more eligible sentences than requested; all of them, unscored.
    All(Vec<ScoredSentence>),
    /// The highest scoring sentences, in document order.
    Ranked(Vec<ScoredSentence>),
}

impl Selection {
    /// Selected sentence texts in output order.
    pub fn texts(&self) -> Vec<&str> {
        match self {
            Selection::Unsegmented(text) => vec![text.as_str()],
            Selection::All(sentences) | Selection::Ranked(sentences) => {
                sentences.iter().map(|s| s.text.as_str()).collect()
            }
        }
    }

    /// Whether the sentences went through scoring.
    pub fn is_ranked(&self) -> bool {
        matches!(self, Selection::Ranked(_))
    }
}

/// Ranks document sentences by importance.
#[derive(Debug, Clone, Default)]
pub struct TextScorer {
    config: ScorerConfig,
}

impl TextScorer {
    pub fn new(config: ScorerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScorerConfig {
        &self.config
    }

    /// Selects the summary sentences for a document.
    pub fn select(&self, document: &str) -> Selection {
        let normalized = normalize_whitespace(document);
        if normalized.chars().count() < self.config.short_text_threshold {
            return Selection::Unsegmented(normalized);
        }

        let sentences = self.eligible_sentences(&normalized);
        if sentences.len() <= self.config.summary_length {
            let all = sentences
                .into_iter()
                .enumerate()
                .map(|(original_index, text)| ScoredSentence { original_index, text, score: 0.0 })
                .collect();
            return Selection::All(all);
        }

        let scored = self.score_sentences(&normalized, sentences);
        Selection::Ranked(top_in_document_order(scored, self.config.summary_length))
    }

    /// Scores every eligible sentence of a document, in document order.
    ///
    /// Unlike [`TextScorer::select`] this always scores, regardless of how
    /// many sentences there are. Short documents yield a single unscored
    /// sentence.
    pub fn score(&self, document: &str) -> Vec<ScoredSentence> {
        let normalized = normalize_whitespace(document);
        if normalized.chars().count() < self.config.short_text_threshold {
            return vec![ScoredSentence { original_index: 0, text: normalized, score: 0.0 }];
        }

        let sentences = self.eligible_sentences(&normalized);
        self.score_sentences(&normalized, sentences)
    }

    fn eligible_sentences(&self, normalized: &str) -> Vec<String> {
        split_sentences(normalized, self.config.min_fragment_chars)
            .into_iter()
            .filter(|s| s.chars().count() > self.config.min_sentence_chars)
            .collect()
    }

    fn score_sentences(&self, normalized: &str, sentences: Vec<String>) -> Vec<ScoredSentence> {
        let frequency = word_frequency(normalized);
        let total = sentences.len();

        sentences
            .into_iter()
            .enumerate()
            .map(|(index, text)| {
                let score = position_score(index, total)
                    + salience_score(&text, &frequency)
                    + length_score(&text)
                    + marker_score(&text, &self.config.markers);
                ScoredSentence { original_index: index, text, score }
            })
            .collect()
    }
}

/// Collapse whitespace runs into single spaces and trim the ends
pub fn normalize_whitespace(text: &str) -> String {
    WHITESPACE.replace_all(text, " ").trim().to_string()
}

/// Split text into trimmed sentences longer than `min_chars` characters
///
/// Boundaries are runs of `.`, `!` or `?` followed by whitespace or the end of
/// the text, and blank lines. The punctuation itself is dropped.
pub fn split_sentences(text: &str, min_chars: usize) -> Vec<String> {
    SENTENCE_BOUNDARY
        .split(text)
        .map(str::trim)
        .filter(|s| !s.is_empty() && s.chars().count() > min_chars)
        .map(str::to_string)
        .collect()
}

/// Lowercased letter-only words longer than two characters
fn qualifying_words(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    NON_LETTER
        .replace_all(&lowered, " ")
        .split_whitespace()
        .filter(|w| w.chars().count() > 2)
        .map(str::to_string)
        .collect()
}

/// Count occurrences of each qualifying word in the document
pub fn word_frequency(text: &str) -> HashMap<String, usize> {
    let mut frequency = HashMap::new();
    for word in qualifying_words(text) {
        *frequency.entry(word).or_insert(0) += 1;
    }
    frequency
}

/// Position bonus for the sentence at `index` out of `total`
///
/// - first sentence: +2.0
/// - second and third: +1.5
/// - last two: +1.0
/// - anything else: +0.5
pub fn position_score(index: usize, total: usize) -> f64 {
    if index == 0 {
        2.0
    } else if index < 3 {
        1.5
    } else if index + 2 >= total {
        1.0
    } else {
        0.5
    }
}

/// Mean document frequency of the sentence's words, scaled by 1/5 and capped at 3.0
pub fn salience_score(sentence: &str, frequency: &HashMap<String, usize>) -> f64 {
    let words = qualifying_words(sentence);
    if words.is_empty() {
        return 0.0;
    }

    let total: usize = words.iter().map(|w| frequency.get(w).copied().unwrap_or(0)).sum();
    let mean = total as f64 / words.len() as f64;
    (mean / 5.0).min(3.0)
}

/// Preference for medium length sentences
pub fn length_score(sentence: &str) -> f64 {
    let length = sentence.chars().count();
    if (50..=200).contains(&length) {
        1.5
    } else if (30..=300).contains(&length) {
        1.0
    } else {
        0.3
    }
}

/// +1.0 for any marker phrase, +0.5 for any digit
pub fn marker_score(sentence: &str, markers: &[String]) -> f64 {
    let lowered = sentence.to_lowercase();
    let mut score = 0.0;

    if markers.iter().any(|m| lowered.contains(m.as_str())) {
        score += 1.0;
    }

    if sentence.chars().any(|c| c.is_ascii_digit()) {
        score += 0.5;
    }

    score
}

/// Keep the `n` best sentences (ties go to the earlier one) and restore document order
fn top_in_document_order(mut scored: Vec<ScoredSentence>, n: usize) -> Vec<ScoredSentence> {
    scored.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.original_index.cmp(&b.original_index))
    });
    scored.truncate(n);
    scored.sort_by_key(|s| s.original_index);
    scored
}
