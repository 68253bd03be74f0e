//! Local keyword fallback used when the conversation backend is unreachable.
//!
//! Rules are checked in priority order against the lower-cased transcript;
//! the first rule with a matching substring wins.

use std::fmt;

use ezcaters_core::types::DialogueReply;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FallbackRule {
    Italian,
    Mexican,
    Chinese,
    BostonArea,
    Affirmation,
    Help,
    Clarification,
}

/// Keyword rules in priority order. `Clarification` is the catch-all.
const PRIORITY: [FallbackRule; 6] = [
    FallbackRule::Italian,
    FallbackRule::Mexican,
    FallbackRule::Chinese,
    FallbackRule::BostonArea,
    FallbackRule::Affirmation,
    FallbackRule::Help,
];

impl FallbackRule {
    /// Pick the first rule whose keywords occur in `transcript`.
    pub fn classify(transcript: &str) -> Self {
        let lower = transcript.to_lowercase();
        PRIORITY
            .into_iter()
            .find(|rule| rule.keywords().iter().any(|k| lower.contains(k)))
            .unwrap_or(FallbackRule::Clarification)
    }

    pub fn keywords(self) -> &'static [&'static str] {
        match self {
            FallbackRule::Italian => &["italian", "pasta", "pizza"],
            FallbackRule::Mexican => &["mexican", "taco", "burrito"],
            FallbackRule::Chinese => &["chinese", "lo mein", "fried rice"],
            FallbackRule::BostonArea => &["boston", "cambridge", "somerville"],
            FallbackRule::Affirmation => &["yes", "sure", "okay"],
            FallbackRule::Help => &["help", "what", "how"],
            FallbackRule::Clarification => &[],
        }
    }

    pub fn reply(self) -> &'static str {
        match self {
            FallbackRule::Italian => "Great choice! I found Bella's Italian Catering that specializes in Italian cuisine. They're rated 4.8 stars and are located in Boston, MA. They specialize in pasta, pizza, sandwiches, and salads. Would you like their contact information or should I help you find more options?",
            FallbackRule::Mexican => "Excellent! I found Taco Fiesta Catering that offers fresh Mexican food. They're rated 4.6 stars, located in Cambridge, MA, and specialize in tacos, burritos, nachos, and fajitas. They also have great vegetarian options. Would you like me to connect you with them?",
            FallbackRule::Chinese => "Perfect! Golden Dragon Chinese offers traditional Chinese dishes with modern presentation. They're rated 4.7 stars, located in Somerville, MA, and specialize in lo mein, fried rice, dumplings, and sweet and sour dishes. Their minimum order is $30. Would you like their contact information?",
            FallbackRule::BostonArea => "I found several great caterers in the Boston area! The closest options include Bella's Italian Catering in Boston, Taco Fiesta Catering in Cambridge, and Golden Dragon Chinese in Somerville. All are highly rated and offer different cuisine types. Which type of food are you interested in?",
            FallbackRule::Affirmation => "Great! I'll be happy to help you with that. Can you provide me with any additional details about what you're looking for?",
            FallbackRule::Help => "Welcome to EZCaters! I'm here to help you find the perfect catering service for your needs. I can help you search by cuisine type like Italian, Mexican, or Chinese, by your location, or by specific menu items you're craving. What type of catering are you looking for today?",
            FallbackRule::Clarification => "I understand you're looking for catering services. Could you tell me what type of cuisine you're interested in, your location, or specific menu items you'd like? For example, you could say 'I need Italian food in Boston' or 'I want tacos for my event'.",
        }
    }
}

impl fmt::Display for FallbackRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FallbackRule::Italian => "italian",
            FallbackRule::Mexican => "mexican",
            FallbackRule::Chinese => "chinese",
            FallbackRule::BostonArea => "boston-area",
            FallbackRule::Affirmation => "affirmation",
            FallbackRule::Help => "help",
            FallbackRule::Clarification => "clarification",
        };
        f.write_str(name)
    }
}

/// Produce the canned local reply for `transcript`.
pub fn local_reply(transcript: &str) -> DialogueReply {
    let rule = FallbackRule::classify(transcript);
    tracing::debug!(rule = %rule, "Local fallback rule matched");
    DialogueReply::local(rule.reply())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use ezcaters_core::types::ReplySource;

    #[test]
    fn test_each_rule_matches_its_keywords() {
        for rule in PRIORITY {
            for keyword in rule.keywords() {
                let transcript = format!("um {keyword} please");
                let matched = FallbackRule::classify(&transcript);
                // A keyword can also satisfy an earlier rule; it must never land later.
                let expected_pos = PRIORITY.iter().position(|r| *r == rule).unwrap();
                let matched_pos = PRIORITY.iter().position(|r| *r == matched).unwrap();
                assert!(matched_pos <= expected_pos, "{keyword} -> {matched}");
            }
        }
    }

    #[test]
    fn test_first_match_wins() {
        assert_eq!(
            FallbackRule::classify("I want pizza in Boston"),
            FallbackRule::Italian
        );
        assert_eq!(
            FallbackRule::classify("Chinese food in Cambridge"),
            FallbackRule::Chinese
        );
        assert_eq!(
            FallbackRule::classify("yes, what about tacos"),
            FallbackRule::Mexican
        );
        assert_eq!(
            FallbackRule::classify("okay how does this work"),
            FallbackRule::Affirmation
        );
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(FallbackRule::classify("PASTA"), FallbackRule::Italian);
        assert_eq!(FallbackRule::classify("Fried Rice"), FallbackRule::Chinese);
        assert_eq!(FallbackRule::classify("SOMERVILLE"), FallbackRule::BostonArea);
    }

    #[test]
    fn test_multi_word_keywords() {
        assert_eq!(FallbackRule::classify("some lo mein"), FallbackRule::Chinese);
        assert_eq!(FallbackRule::classify("lo  mein"), FallbackRule::Clarification);
    }

    #[test]
    fn test_substring_semantics() {
        // "burritos" contains "burrito"; "show" contains "how".
        assert_eq!(FallbackRule::classify("burritos"), FallbackRule::Mexican);
        assert_eq!(FallbackRule::classify("show me"), FallbackRule::Help);
    }

    #[test]
    fn test_clarification_default() {
        assert_eq!(
            FallbackRule::classify("I need catering for 20 people"),
            FallbackRule::Clarification
        );
        assert_eq!(FallbackRule::classify(""), FallbackRule::Clarification);
    }

    #[test]
    fn test_local_reply_is_tagged_local() {
        let reply = local_reply("Find Mexican restaurants");
        assert_eq!(reply.source, ReplySource::LocalFallback);
        assert!(reply.text.starts_with("Excellent! I found Taco Fiesta Catering"));
    }

    #[test]
    fn test_replies_are_distinct() {
        let all = [
            FallbackRule::Italian,
            FallbackRule::Mexican,
            FallbackRule::Chinese,
            FallbackRule::BostonArea,
            FallbackRule::Affirmation,
            FallbackRule::Help,
            FallbackRule::Clarification,
        ];
        let replies: std::collections::HashSet<_> = all.iter().map(|r| r.reply()).collect();
        assert_eq!(replies.len(), all.len());
    }
}
