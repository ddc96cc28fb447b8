//! Canned Responses
//!
//! Fixed texts for the non-AI branches plus the keyword-driven fallback used
//! whenever the language model is unavailable.
//!
//! `**bold**` markup is rendered to Telegram HTML by [`crate::format`].

pub const OFF_TOPIC_RESPONSE: &str = "I'm specifically designed to provide mental health and emotional support. \
I can't help with that particular topic.\n\n\
If you're dealing with stress, anxiety, relationship issues, or any emotional challenges, \
I'm here to listen and support you. 💙\n\n\
What's on your mind emotionally?";

pub const EMERGENCY_RESPONSE: &str = "🚨 **This sounds like an immediate emergency!**\n\n\
**Call emergency services NOW:**\n\
• **911** (US) | **112** (EU) | **100** (India) | **999** (UK)\n\n\
**If you're in immediate danger:**\n\
• Get to a safe, public place\n\
• Call police immediately\n\
• Stay on the phone with emergency services\n\n\
**Your safety is the priority. Get help now!**";

pub const CRISIS_RESPONSE: &str = "🫂 I hear that you're going through an incredibly difficult time right now, \
and I'm truly concerned about your safety.\n\n\
**Please reach out to someone who can help immediately:**\n\n\
🆘 **Emergency Services:** Call 911 (US) or your local emergency number\n\
📞 **National Suicide Prevention Lifeline (US):** 988 or 1-800-273-8255\n\
💬 **Crisis Text Line:** Text HOME to 741741\n\
🌍 **International:** https://findahelpline.com\n\n\
You don't have to face this alone. These trained professionals are available \
24/7 and truly want to help. Your life has value, and there are people who care.";

pub const WELCOME_MESSAGE: &str = "🌟 **Welcome to Your Mental Health Support Companion** 🌟\n\n\
I'm here to listen and provide emotional support whenever you need it. \
This is a safe, judgment-free space where you can share what's on your mind.\n\n\
**Important Disclaimer:**\n\
• I provide emotional support, not medical or professional advice\n\
• I'm not a replacement for licensed mental health professionals\n\
• In crisis situations, please contact emergency services immediately\n\n\
**Available Commands:**\n\
/help - Show available commands\n\
/resources - Crisis helplines and mental health resources\n\n\
💙 Feel free to share what's on your mind. I'm here to listen.";

pub const HELP_MESSAGE: &str = "**Available Commands:**\n\n\
/start - Welcome message and introduction\n\
/help - Show this help message\n\
/resources - Crisis helplines and mental health resources\n\n\
**How to Use:**\n\
Simply send me a message about what's on your mind, and I'll respond with \
empathetic support. I remember our recent conversation to provide better context.\n\n\
**Privacy:**\n\
Your messages are processed in memory only and not permanently stored. \
Your privacy and safety are my top priorities.";

pub const RESOURCES_MESSAGE: &str = "🆘 **Crisis Helplines & Mental Health Resources**\n\n\
**Immediate Crisis Support:**\n\
• **988 Suicide & Crisis Lifeline (US):** Call/Text 988\n\
• **National Suicide Prevention Lifeline:** 1-800-273-8255\n\
• **Crisis Text Line:** Text HOME to 741741\n\
• **Emergency Services:** 911 (US) or local emergency number\n\n\
**International Resources:**\n\
• **Find A Helpline:** https://findahelpline.com\n\
• **Befrienders Worldwide:** https://befrienders.org\n\n\
**Mental Health Support:**\n\
• **NAMI Helpline:** 1-800-950-6264 (Mon-Fri, 10am-10pm ET)\n\
• **SAMHSA National Helpline:** 1-800-662-4357 (24/7)\n\
• **Therapy Resources:** https://psychologytoday.com\n\n\
**Online Communities:**\n\
• **7 Cups:** https://7cups.com (free emotional support)\n\
• **r/SuicideWatch:** Reddit support community\n\n\
💙 Remember: Reaching out for help is a sign of strength, not weakness.";

/// Reply when an image arrives but the vision model is not configured
pub const IMAGE_UNAVAILABLE_RESPONSE: &str = "I can see you shared an image. While I can't analyze it right now, \
I'm here to listen. What would you like to tell me about it?";

/// Reply when handling a photo fails outright
pub const IMAGE_ERROR_RESPONSE: &str = "I can see you shared an image with me. \
What would you like to tell me about it? I'm here to listen.";

/// Fallback template categories, in match priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FallbackCategory {
    Anxiety,
    Sadness,
    Anger,
    Loneliness,
    Focus,
    Sleep,
    Relationship,
    Financial,
    Work,
    Family,
    General,
}

/// (category, trigger words, 3-line template)
static FALLBACK_RULES: &[(FallbackCategory, &[&str], &str)] = &[
    (
        FallbackCategory::Anxiety,
        &["anxious", "anxiety", "worried", "stress", "nervous"],
        "I hear that you're feeling anxious.\nThat's a really difficult feeling to carry.\nWhat's weighing on your mind?",
    ),
    (
        FallbackCategory::Sadness,
        &["sad", "depressed", "down", "hopeless", "empty"],
        "I can sense you're going through a tough time.\nYour feelings are valid and real.\nWhat's been happening?",
    ),
    (
        FallbackCategory::Anger,
        &["angry", "mad", "furious", "frustrated", "rage", "fuck", "pissed", "hate"],
        "I hear your anger and frustration.\nThose feelings are completely valid.\nI'm here when you're ready to talk.",
    ),
    (
        FallbackCategory::Loneliness,
        &["lonely", "alone", "isolated", "nobody"],
        "Feeling alone is one of the hardest things.\nI'm here with you right now.\nYou're not alone in this moment.",
    ),
    (
        FallbackCategory::Focus,
        &["focus", "concentrate", "study", "distracted", "productivity"],
        "Struggling to focus is really common.\nLet's talk about what's making it hard.\nWhat's going on?",
    ),
    (
        FallbackCategory::Sleep,
        &["sleep", "insomnia", "tired", "exhausted", "can't sleep"],
        "Sleep troubles can affect everything.\nYour exhaustion is real.\nWhat's keeping you up?",
    ),
    (
        FallbackCategory::Relationship,
        &["relationship", "breakup", "broke up", "left me", "dumped"],
        "Heartbreak is incredibly painful.\nYour feelings are completely valid.\nWant to talk about it?",
    ),
    (
        FallbackCategory::Financial,
        &["money", "bill", "debt", "broke", "financial", "afford", "pay", "expensive"],
        "Financial stress is overwhelming.\nThat pressure is real and heavy.\nWhat's happening with your situation?",
    ),
    (
        FallbackCategory::Work,
        &["work", "job", "boss", "fired", "unemployed", "career"],
        "Work stress can consume everything.\nYour feelings about this are valid.\nWhat's going on at work?",
    ),
    (
        FallbackCategory::Family,
        &["family", "parents", "mom", "dad", "sibling"],
        "Family issues cut deep.\nThose relationships are complicated.\nWhat's happening?",
    ),
];

const GENERAL_FALLBACK: &str = "I'm here to listen and support you.\nYour feelings matter.\nWhat's on your mind?";

/// Pick the fallback category for a message
pub fn fallback_category(message: &str) -> FallbackCategory {
    let lower = message.to_lowercase();
    FALLBACK_RULES
        .iter()
        .find(|(_, words, _)| words.iter().any(|w| lower.contains(w)))
        .map(|(category, _, _)| *category)
        .unwrap_or(FallbackCategory::General)
}

/// Template text for a category
pub fn fallback_template(category: FallbackCategory) -> &'static str {
    FALLBACK_RULES
        .iter()
        .find(|(c, _, _)| *c == category)
        .map(|(_, _, template)| *template)
        .unwrap_or(GENERAL_FALLBACK)
}

/// Deterministic 3-line reply used when the language model is unavailable
pub fn fallback_response(message: &str) -> &'static str {
    fallback_template(fallback_category(message))
}

/// Reply synthesized from an image caption when the vision model fails
pub fn image_caption_fallback(caption: &str) -> &'static str {
    let lower = caption.to_lowercase();
    if lower.contains("left") {
        "I hear the pain in your words.\nLosing someone changes us deeply.\nI'm here with you through this."
    } else if lower.contains("sad") || lower.contains("hurt") {
        "Your pain is real and valid.\nIt's okay to feel what you're feeling.\nI'm here to listen."
    } else {
        "Thank you for sharing this with me.\nI can sense this means something to you.\nWant to tell me more about it?"
    }
}
