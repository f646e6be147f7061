//! Content moderation: whole-word profanity masking plus the warning and
//! ban escalation that follows a flagged submission.

use regex::Regex;
use tracing::{info, warn};

use crate::storage::UserStore;

/// Baseline term list; deployments can override it through configuration.
pub const DEFAULT_TERMS: &[&str] = &[
    "ass",
    "asshole",
    "bastard",
    "bitch",
    "bullshit",
    "crap",
    "damn",
    "dick",
    "douche",
    "dumbass",
    "fuck",
    "fucking",
    "motherfucker",
    "piss",
    "shit",
    "whore",
];

/// Result of screening one piece of text: the text with flagged words masked,
/// and whether anything was flagged in the original.
pub struct ModerationOutcome {
    pub text: String,
    pub flagged: bool,
}

/// One compiled pattern per term, built once at construction. Matching is
/// case-insensitive with ASCII `\b` boundaries: letters, digits and
/// underscore extend a word, anything else (including accented letters)
/// ends it.
pub struct ProfanityFilter {
    patterns: Vec<(Regex, String)>,
}

impl ProfanityFilter {
    pub fn new<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = terms
            .into_iter()
            .filter_map(|term| {
                let term = term.as_ref().trim().to_lowercase();
                if term.is_empty() {
                    return None;
                }
                let pattern = format!(r"(?i)(?-u:\b){}(?-u:\b)", regex::escape(&term));
                let regex = Regex::new(&pattern).expect("escaped term pattern is valid");
                let mask = "*".repeat(term.chars().count());
                Some((regex, mask))
            })
            .collect();
        Self { patterns }
    }

    /// Whether the text contains any listed term as a whole word.
    pub fn detect(&self, text: &str) -> bool {
        self.patterns.iter().any(|(regex, _)| regex.is_match(text))
    }

    /// Replace each listed whole word with asterisks of equal length. Text
    /// length and the position of everything else are preserved.
    pub fn filter(&self, text: &str) -> String {
        let mut filtered = text.to_string();
        for (regex, mask) in &self.patterns {
            filtered = regex.replace_all(&filtered, mask.as_str()).into_owned();
        }
        filtered
    }

    /// Detect on the original text, then mask. Detection runs first so the
    /// flag reflects what the author actually wrote.
    pub fn screen(&self, text: &str) -> ModerationOutcome {
        let flagged = self.detect(text);
        let text = if flagged {
            self.filter(text)
        } else {
            text.to_string()
        };
        ModerationOutcome { text, flagged }
    }
}

impl Default for ProfanityFilter {
    fn default() -> Self {
        Self::new(DEFAULT_TERMS.iter().copied())
    }
}

/// Apply the warning escalation for a flagged submission. The content is
/// already persisted at this point, so a storage failure here is logged and
/// swallowed rather than surfaced to the author.
pub async fn escalate_if_flagged<S>(storage: &S, user_id: i32, flagged: bool, ban_threshold: i32)
where
    S: UserStore + ?Sized,
{
    if !flagged {
        return;
    }
    match storage.escalate_warnings(user_id, 1, ban_threshold).await {
        Ok(user) => {
            if user.is_banned {
                warn!(user_id, warnings = user.warning_count, "user banned after repeated violations");
            } else {
                info!(user_id, warnings = user.warning_count, "warning issued for flagged content");
            }
        }
        Err(e) => warn!(user_id, error = %e, "failed to record content warning"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_case_insensitively() {
        let f = ProfanityFilter::default();
        assert!(f.detect("what the FUCK"));
        assert!(f.detect("Damn potholes"));
        assert!(!f.detect("please fix the streetlight"));
    }

    #[test]
    fn masks_with_equal_length() {
        let f = ProfanityFilter::default();
        assert_eq!(f.filter("this is crap"), "this is ****");
        assert_eq!(f.filter("Damn road"), "**** road");
    }

    #[test]
    fn whole_words_only() {
        let f = ProfanityFilter::default();
        // "ass" embedded in larger words must survive.
        assert!(!f.detect("a classic assessment of the passage"));
        assert_eq!(
            f.filter("a classic assessment of the passage"),
            "a classic assessment of the passage"
        );
    }

    #[test]
    fn punctuation_is_a_boundary() {
        let f = ProfanityFilter::default();
        assert_eq!(f.filter("crap! total crap."), "****! total ****.");
    }

    #[test]
    fn accented_neighbor_does_not_hide_a_term() {
        let f = ProfanityFilter::default();
        assert!(f.detect("crapé road"));
        assert_eq!(f.filter("crapé road"), "****é road");
    }

    #[test]
    fn underscore_joins_words() {
        let f = ProfanityFilter::default();
        assert!(!f.detect("crap_pile"));
    }

    #[test]
    fn empty_text() {
        let f = ProfanityFilter::default();
        assert!(!f.detect(""));
        assert_eq!(f.filter(""), "");
    }

    #[test]
    fn screen_reports_flag_and_masks() {
        let f = ProfanityFilter::default();
        let out = f.screen("fix this shit");
        assert!(out.flagged);
        assert_eq!(out.text, "fix this ****");

        let out = f.screen("fix this pothole");
        assert!(!out.flagged);
        assert_eq!(out.text, "fix this pothole");
    }
}
