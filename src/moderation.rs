//! Offensive-language pre-filter for chat messages.
//!
//! A matched message never reaches retrieval or the language model; the chat
//! pipeline answers it with a fixed polite deflection instead.

use crate::config::ModerationConfig;

/// Decides whether a message should be deflected.
pub trait ContentFilter: Send + Sync {
    fn is_offensive(&self, text: &str) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// A term must match whole tokens. "classic" does not match "ass".
    /// Attached Arabic prefixes (article, conjunctions, vocative) are
    /// ignored, so "الغبي" and "ياغبي" match "غبي".
    Word,
    /// Case-insensitive substring match anywhere in the message.
    Substring,
}

impl MatchMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "word" => Some(MatchMode::Word),
            "substring" => Some(MatchMode::Substring),
            _ => None,
        }
    }
}

/// Denylist matcher over lowercased text.
pub struct DenylistFilter {
    mode: MatchMode,
    /// Lowercased terms, each pre-split into tokens for word matching.
    terms: Vec<(String, Vec<String>)>,
}

impl DenylistFilter {
    pub fn new<I, S>(terms: I, mode: MatchMode) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let terms = terms
            .into_iter()
            .map(|t| t.as_ref().trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .map(|t| {
                let tokens = tokenize(&t);
                (t, tokens)
            })
            .collect();
        Self { mode, terms }
    }

    pub fn from_config(config: &ModerationConfig) -> Self {
        let mode = MatchMode::parse(&config.match_mode).unwrap_or(MatchMode::Word);
        Self::new(&config.terms, mode)
    }
}

impl ContentFilter for DenylistFilter {
    fn is_offensive(&self, text: &str) -> bool {
        let lowered = text.to_lowercase();
        match self.mode {
            MatchMode::Substring => self.terms.iter().any(|(term, _)| lowered.contains(term)),
            MatchMode::Word => {
                let forms: Vec<Vec<String>> =
                    tokenize(&lowered).iter().map(|t| token_forms(t)).collect();
                self.terms.iter().any(|(_, term_tokens)| {
                    !term_tokens.is_empty()
                        && forms.windows(term_tokens.len()).any(|window| {
                            window
                                .iter()
                                .zip(term_tokens)
                                .all(|(forms, term)| forms.contains(term))
                        })
                })
            }
        }
    }
}

/// Splits on anything that is not a letter or digit, in any script.
fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Prefixes that Arabic writes attached to the following word, longest first.
const ARABIC_PREFIXES: [&str; 12] = [
    "وال", "بال", "فال", "كال", "لل", "ال", "يا", "و", "ب", "ل", "ف", "ك",
];

/// The token itself plus every form left after stripping up to two attached
/// prefixes. A stripped form must keep at least two characters.
fn token_forms(token: &str) -> Vec<String> {
    let mut forms = vec![token.to_string()];
    let mut frontier = vec![token];
    for _ in 0..2 {
        let mut next = Vec::new();
        for form in frontier {
            for prefix in ARABIC_PREFIXES {
                if let Some(rest) = form.strip_prefix(prefix) {
                    if rest.chars().count() >= 2 && !forms.iter().any(|f| f == rest) {
                        forms.push(rest.to_string());
                        next.push(rest);
                    }
                }
            }
        }
        frontier = next;
    }
    forms
}
