//! Pattern Classifier
//!
//! Stateless rule tables deciding whether a turn is in scope, a crisis, or
//! an emergency. Every rule set is an ordered list of pattern strings
//! compiled once on first use.
//!
//! Scope checks lean towards inclusion: a wrongly answered off-topic question
//! is cheap, a silenced request for support is not. Crisis and emergency
//! rules lean towards recall for the same reason.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

/// Topics the bot refuses to engage with
pub static OFF_TOPIC_PATTERNS: &[&str] = &[
    r"\b(weather|temperature|forecast|rain|snow|sunny)\b",
    r"\b(recipe|cook|food|restaurant|menu)\b",
    r"\b(sports|football|basketball|cricket|soccer|match|game score)\b",
    r"\b(movie|film|tv show|series|netflix|watch)\b",
    r"\b(math|calculate|equation|solve|formula)\b",
    r"\b(code|programming|python|javascript|html|css)\b",
    r"\b(news|politics|election|president|government)\b",
    r"\b(stock|market|invest|crypto|bitcoin|trading)\b",
    r"\b(translate|translation|language|dictionary)\b",
    r"\b(history|historical|ancient|war|battle)\b",
    r"\b(science|physics|chemistry|biology|experiment)\b",
    r"\b(geography|capital|country|continent|ocean)\b",
    r"\b(shopping|buy|purchase|amazon|store)\b",
    r"\b(travel|vacation|hotel|flight|booking)\b",
    // Riddles about objects
    r"(bought.*car|red car|blue car|what color)",
    r"(riddle|puzzle|brain teaser|logic problem)",
];

/// Openers that are always let through
pub static GREETING_PATTERNS: &[&str] = &[
    r"^(hi|hello|hey|good morning|good evening|good afternoon)\b",
    r"^(how are you|what['’]?s up|sup)\b",
    r"^(thanks|thank you|ok|okay|yes|no)\b",
];

/// Vocabulary that marks a message as in scope.
///
/// Matched anywhere in the text, so "distressed" hits "stress".
pub static MENTAL_HEALTH_KEYWORDS: &[&str] = &[
    "anxious", "anxiety", "stress", "worried", "nervous", "panic",
    "sad", "depressed", "depression", "down", "hopeless", "empty", "worthless",
    "angry", "mad", "furious", "frustrated", "rage", "irritated",
    "lonely", "alone", "isolated", "nobody",
    "sleep", "insomnia", "tired", "exhausted", "nightmare",
    "relationship", "breakup", "broke up", "left me", "dumped", "divorce",
    "trauma", "ptsd", "abuse", "violence", "hurt",
    "suicide", "suicidal", "kill myself", "self-harm", "cutting",
    "therapy", "therapist", "counseling", "medication",
    "bipolar", "schizophrenia", "ocd", "adhd", "eating disorder",
    "grief", "loss", "death", "died", "mourning",
    "fear", "phobia", "scared", "terrified",
    "overwhelmed", "burnout", "pressure",
    "self-esteem", "confidence", "insecure",
    "addiction", "substance", "alcohol", "drugs",
    "mental health", "emotional", "feeling", "feelings", "emotion",
    "cope", "coping", "struggling", "suffering",
    "help", "support", "talk", "listen",
];

/// People, relationships and loaded verbs that usually mean the user is
/// talking about their own life. Matched at the start of a word, so
/// "friends" hits "friend" but "the" does not hit "he".
pub static EMOTIONAL_CONTEXT_WORDS: &[&str] = &[
    "girl", "boy", "guy", "friend", "boyfriend", "girlfriend", "partner",
    "she", "he", "they", "them", "her", "him",
    "fucked", "messed", "screwed", "ruined", "destroyed",
    "mentioned", "told", "said", "talked",
    "feel", "feeling", "felt", "think", "thought",
    "problem", "issue", "situation", "thing", "whole thing",
];

pub static QUESTION_WORDS: &[&str] = &[
    "what", "how", "when", "where", "who", "why", "which",
    "can you", "tell me", "calculate", "solve",
];

pub static FACTUAL_INDICATORS: &[&str] = &[
    "capital of", "what is", "how many", "when did", "where is",
    "calculate", "solve", "formula",
];

/// Self-harm and suicidal intent
pub static CRISIS_PATTERNS: &[&str] = &[
    r"\b(kill|hurt|harm)\s+(myself|me)\b",
    r"\bsuicid(e|al)\b",
    r"\bend\s+(my|it\s+all)\b",
    r"\bdon['’]?t\s+want\s+to\s+live\b",
    r"\bwant\s+to\s+die\b",
    r"\bcut(ting)?\s+(myself|me)\b",
    r"\bno\s+reason\s+to\s+live\b",
    r"\bbetter\s+off\s+dead\b",
    r"\bself[\s-]?harm\b",
];

/// Immediate physical danger. Kept narrow: these bypass the AI entirely.
pub static EMERGENCY_PATTERNS: &[&str] = &[
    r"\bsomeone.*following\s+me\b",
    r"\b(gun|knife|weapon).*\b(at|pointed|threatening|has)\b",
    r"\bafraid\b.*\bfollowing\b",
    r"\bin\s+(immediate\s+)?danger\b",
    r"\bstalking\s+me\b",
    r"\battack(ing|ed)\s+me\b",
    r"\bthreaten(ing|ed)\s+(me|my)\b",
    r"\babuse.*happening\b",
];

/// Messages shorter than this (in chars, trimmed) are always in scope
const SHORT_MESSAGE_CHARS: usize = 10;

/// Word count above which a question is considered a factual lookup
const FACTUAL_QUESTION_MIN_WORDS: usize = 5;

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(&format!("(?i){}", p)).unwrap())
        .collect()
}

/// How a literal word list is anchored in the text
#[derive(Clone, Copy)]
enum Anchor {
    Anywhere,
    WordStart,
    WholeWord,
}

/// One alternation over literal words
fn word_set(words: &[&str], anchor: Anchor) -> Regex {
    let alternation = words
        .iter()
        .map(|w| regex::escape(w))
        .collect::<Vec<_>>()
        .join("|");
    let (head, tail) = match anchor {
        Anchor::Anywhere => ("", ""),
        Anchor::WordStart => (r"\b", ""),
        Anchor::WholeWord => (r"\b", r"\b"),
    };
    Regex::new(&format!(r"(?i){}(?:{}){}", head, alternation, tail)).unwrap()
}

static OFF_TOPIC_RULES: Lazy<Vec<Regex>> = Lazy::new(|| compile(OFF_TOPIC_PATTERNS));
static GREETING_RULES: Lazy<Vec<Regex>> = Lazy::new(|| compile(GREETING_PATTERNS));
static CRISIS_RULES: Lazy<Vec<Regex>> = Lazy::new(|| compile(CRISIS_PATTERNS));
static EMERGENCY_RULES: Lazy<Vec<Regex>> = Lazy::new(|| compile(EMERGENCY_PATTERNS));
static MENTAL_HEALTH_RULE: Lazy<Regex> = Lazy::new(|| word_set(MENTAL_HEALTH_KEYWORDS, Anchor::Anywhere));
static EMOTIONAL_CONTEXT_RULE: Lazy<Regex> = Lazy::new(|| word_set(EMOTIONAL_CONTEXT_WORDS, Anchor::WordStart));
static QUESTION_RULE: Lazy<Regex> = Lazy::new(|| word_set(QUESTION_WORDS, Anchor::WholeWord));

/// Outcome of classifying one turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Classification {
    pub is_mental_health_related: bool,
    pub is_crisis: bool,
    pub is_emergency: bool,
}

/// Why a message was (or was not) considered in scope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeReason {
    Greeting,
    ShortMessage,
    MentalHealthKeyword,
    EmotionalContext,
    OffTopicRule,
    FactualQuestion,
    DefaultAllow,
}

impl ScopeReason {
    pub fn allows(&self) -> bool {
        !matches!(self, Self::OffTopicRule | Self::FactualQuestion)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Greeting => "greeting",
            Self::ShortMessage => "short_message",
            Self::MentalHealthKeyword => "mental_health_keyword",
            Self::EmotionalContext => "emotional_context",
            Self::OffTopicRule => "off_topic_rule",
            Self::FactualQuestion => "factual_question",
            Self::DefaultAllow => "default_allow",
        }
    }
}

/// Run all checks on a turn
pub fn classify(message: &str) -> Classification {
    let reason = scope_reason(message);
    let result = Classification {
        is_mental_health_related: reason.allows(),
        is_crisis: is_crisis(message),
        is_emergency: is_emergency(message),
    };

    debug!(
        "Classified turn: scope={} crisis={} emergency={}",
        reason.as_str(),
        result.is_crisis,
        result.is_emergency
    );

    result
}

/// Hard topic-exclusion rules
pub fn is_off_topic_by_hard_rule(message: &str) -> bool {
    let lower = message.to_lowercase();
    OFF_TOPIC_RULES.iter().any(|re| re.is_match(&lower))
}

/// Whether a message falls within the bot's support scope
pub fn is_mental_health_related(message: &str) -> bool {
    scope_reason(message).allows()
}

/// Evaluate the scope rules in priority order; the first that fires decides.
pub fn scope_reason(message: &str) -> ScopeReason {
    let lower = message.trim().to_lowercase();

    if GREETING_RULES.iter().any(|re| re.is_match(&lower)) {
        return ScopeReason::Greeting;
    }

    if lower.chars().count() < SHORT_MESSAGE_CHARS {
        return ScopeReason::ShortMessage;
    }

    if MENTAL_HEALTH_RULE.is_match(&lower) {
        return ScopeReason::MentalHealthKeyword;
    }

    if EMOTIONAL_CONTEXT_RULE.is_match(&lower) {
        return ScopeReason::EmotionalContext;
    }

    if is_off_topic_by_hard_rule(&lower) {
        return ScopeReason::OffTopicRule;
    }

    let has_question = QUESTION_RULE.is_match(&lower);
    if has_question && lower.split_whitespace().count() > FACTUAL_QUESTION_MIN_WORDS {
        if FACTUAL_INDICATORS.iter().any(|ind| lower.contains(ind)) {
            return ScopeReason::FactualQuestion;
        }
    }

    ScopeReason::DefaultAllow
}

/// Self-harm or suicidal language
pub fn is_crisis(message: &str) -> bool {
    let lower = message.to_lowercase();
    CRISIS_RULES.iter().any(|re| re.is_match(&lower))
}

/// Immediate physical danger
pub fn is_emergency(message: &str) -> bool {
    let lower = message.to_lowercase();
    EMERGENCY_RULES.iter().any(|re| re.is_match(&lower))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crisis_messages_detected() {
        let crisis = [
            "I want to kill myself",
            "I'm going to hurt myself",
            "I don't want to live anymore",
            "I'm thinking about suicide",
            "I want to end it all",
            "I've been cutting myself",
            "There's no reason to live",
            "I'd be better off dead",
            "I'm planning to harm myself",
            "I keep thinking about self-harm",
        ];
        for msg in crisis {
            assert!(is_crisis(msg), "should detect crisis: {}", msg);
        }
    }

    #[test]
    fn test_benign_messages_not_crisis() {
        let benign = [
            "I'm feeling really anxious today",
            "I'm sad and don't know why",
            "I feel overwhelmed with work",
            "I'm lonely and isolated",
            "I'm stressed about my relationship",
        ];
        for msg in benign {
            assert!(!is_crisis(msg), "false crisis positive: {}", msg);
        }
    }

    #[test]
    fn test_emergency_detection() {
        assert!(is_emergency("someone is following me"));
        assert!(is_emergency("He has a knife and is threatening me"));
        assert!(is_emergency("I think I'm in immediate danger"));
        assert!(is_emergency("my ex keeps stalking me"));
        assert!(!is_emergency("I'm anxious about my exam"));
        assert!(!is_emergency("I feel like everyone is judging me"));
    }

    #[test]
    fn test_curly_apostrophe_crisis() {
        assert!(is_crisis("I don’t want to live"));
    }

    #[test]
    fn test_short_messages_always_in_scope() {
        for msg in ["weather", "2+2=?", "movie", "bitcoin", "", "   ", "css"] {
            assert!(is_mental_health_related(msg), "short message rejected: {:?}", msg);
        }
    }

    #[test]
    fn test_greetings_in_scope() {
        assert_eq!(scope_reason("Hello there, what's the weather"), ScopeReason::Greeting);
        assert_eq!(scope_reason("good morning to you all"), ScopeReason::Greeting);
        assert_eq!(scope_reason("thanks for that recipe idea"), ScopeReason::Greeting);
    }

    #[test]
    fn test_keyword_beats_off_topic() {
        // "stock market" alone is off-topic, anxiety about it is not
        assert_eq!(
            scope_reason("The stock market makes me so anxious"),
            ScopeReason::MentalHealthKeyword
        );
    }

    #[test]
    fn test_emotional_context_beats_off_topic() {
        assert_eq!(
            scope_reason("My girlfriend wants to watch a movie"),
            ScopeReason::EmotionalContext
        );
    }

    #[test]
    fn test_emotional_context_anchored_at_word_start() {
        // "the" must not count as "he"
        assert!(!EMOTIONAL_CONTEXT_RULE.is_match("what's the capital of france?"));
        assert!(EMOTIONAL_CONTEXT_RULE.is_match("he left"));
        assert!(EMOTIONAL_CONTEXT_RULE.is_match("my friends left"));
        assert!(EMOTIONAL_CONTEXT_RULE.is_match("it feels wrong"));
    }

    #[test]
    fn test_keywords_match_inside_words() {
        assert!(MENTAL_HEALTH_RULE.is_match("so distressed"));
        assert!(MENTAL_HEALTH_RULE.is_match("unsupported at work"));
    }

    #[test]
    fn test_inflected_emotional_words_beat_off_topic() {
        assert_eq!(
            scope_reason("My friends ignore me at the restaurant"),
            ScopeReason::EmotionalContext
        );
        assert_eq!(
            scope_reason("It feels pointless reading the news every day"),
            ScopeReason::EmotionalContext
        );
        assert_eq!(
            scope_reason("My thoughts keep going back to the war documentary"),
            ScopeReason::EmotionalContext
        );
        assert_eq!(
            scope_reason("So distressed about my python code"),
            ScopeReason::MentalHealthKeyword
        );
    }

    #[test]
    fn test_capital_question_off_topic() {
        assert_eq!(scope_reason("What's the capital of France?"), ScopeReason::OffTopicRule);
        assert!(!is_mental_health_related("What's the capital of France?"));
    }

    #[test]
    fn test_riddle_off_topic() {
        assert!(!is_mental_health_related("Can you solve this riddle for me"));
        assert!(is_off_topic_by_hard_rule("what color is the sky"));
    }

    #[test]
    fn test_factual_question_rejected() {
        assert_eq!(
            scope_reason("How many people live in the biggest city"),
            ScopeReason::FactualQuestion
        );
    }

    #[test]
    fn test_short_question_default_allow() {
        // Too few words for the factual heuristic
        assert_eq!(scope_reason("how many times now"), ScopeReason::DefaultAllow);
    }

    #[test]
    fn test_ambiguous_default_allow() {
        assert_eq!(scope_reason("Everything is just a lot lately"), ScopeReason::DefaultAllow);
        assert!(is_mental_health_related("Everything is just a lot lately"));
    }

    #[test]
    fn test_classify_combines_checks() {
        let c = classify("Someone is following me and I want to die");
        assert!(c.is_mental_health_related);
        assert!(c.is_emergency);
        assert!(c.is_crisis);

        let c = classify("What's the capital of France?");
        assert_eq!(c, Classification::default());
    }

    #[test]
    fn test_all_rule_tables_compile() {
        assert_eq!(OFF_TOPIC_RULES.len(), OFF_TOPIC_PATTERNS.len());
        assert_eq!(GREETING_RULES.len(), GREETING_PATTERNS.len());
        assert_eq!(CRISIS_RULES.len(), CRISIS_PATTERNS.len());
        assert_eq!(EMERGENCY_RULES.len(), EMERGENCY_PATTERNS.len());
    }
}
