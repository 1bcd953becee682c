//! Keyword-driven intent classification.
//!
//! The dialogue protocol branches on whether a short Korean reply affirms,
//! denies, or says something else. The keyword lists live in data on the
//! lexicon so deployments can tune slang variants without touching the
//! state machine.

use serde::{Deserialize, Serialize};

/// Classification of a free-text reply against the lexicon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Affirm,
    Deny,
    Other,
}

/// Swappable keyword lists used by [`IntentLexicon::classify`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentLexicon {
    /// Substrings that count as agreement ("응", "네", "맞아", ...).
    pub affirmations: Vec<String>,
    /// Substrings that count as refusal / "no such thing".
    pub denials: Vec<String>,
    /// Additional go-tokens accepted when asking to start the search.
    pub start_words: Vec<String>,
    /// Bare acknowledgement tokens that are never worth storing verbatim.
    pub acknowledgements: Vec<String>,
}

impl Default for IntentLexicon {
    fn default() -> Self {
        let list = |words: &[&str]| words.iter().map(|w| (*w).to_string()).collect();
        Self {
            affirmations: list(&[
                "응", "네", "맞아", "ㅇㅇ", "예", "그래", "어", "어어", "웅", "당연", "확인",
                "마즘", "마자", "조아", "좋아",
            ]),
            denials: list(&[
                "없어", "아니", "ㄴㄴ", "괜찮", "없음", "몰라", "아냐", "노노", "업서", "안해",
                "없구만", "업음",
            ]),
            start_words: list(&["찾아", "검색", "해줘", "고", "ㄱㄱ", "스타트", "시작", "출발"]),
            acknowledgements: list(&["네", "응", "ㅇㅇ", "어", "예"]),
        }
    }
}

impl IntentLexicon {
    /// Classify a message by keyword membership. Denial wins over
    /// affirmation when both match ("아니 맞아" reads as a correction).
    pub fn classify(&self, message: &str) -> Intent {
        if self.denials.iter().any(|w| message.contains(w.as_str())) {
            Intent::Deny
        } else if self.affirmations.iter().any(|w| message.contains(w.as_str())) {
            Intent::Affirm
        } else {
            Intent::Other
        }
    }

    /// Whether the message asks to kick off the search (affirmation or an
    /// explicit go-token).
    pub fn wants_search(&self, message: &str) -> bool {
        self.affirmations.iter().any(|w| message.contains(w.as_str()))
            || self.start_words.iter().any(|w| message.contains(w.as_str()))
    }

    /// Whether the trimmed message is nothing but a bare acknowledgement.
    pub fn is_acknowledgement(&self, message: &str) -> bool {
        let trimmed = message.trim();
        self.acknowledgements.iter().any(|w| w == trimmed)
    }
}
