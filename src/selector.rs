//! Response Selector
//!
//! Picks which branch answers a classified turn. Priority is fixed:
//! off-topic, then emergency, then crisis, then the AI generator. An
//! off-topic turn never reaches the model or the conversation memory.

use crate::classifier::Classification;
use crate::notifier::AlertKind;
use crate::responses::{CRISIS_RESPONSE, EMERGENCY_RESPONSE, OFF_TOPIC_RESPONSE};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseBranch {
    OffTopic,
    Emergency,
    Crisis,
    Ai,
}

impl ResponseBranch {
    /// Fixed text for the canned branches
    pub fn canned_text(&self) -> Option<&'static str> {
        match self {
            Self::OffTopic => Some(OFF_TOPIC_RESPONSE),
            Self::Emergency => Some(EMERGENCY_RESPONSE),
            Self::Crisis => Some(CRISIS_RESPONSE),
            Self::Ai => None,
        }
    }

    /// Admin alert raised alongside this branch, if any
    pub fn alert(&self) -> Option<AlertKind> {
        match self {
            Self::Emergency => Some(AlertKind::Emergency),
            Self::Crisis => Some(AlertKind::Crisis),
            Self::OffTopic | Self::Ai => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OffTopic => "off_topic",
            Self::Emergency => "emergency",
            Self::Crisis => "crisis",
            Self::Ai => "ai",
        }
    }
}

pub fn select(classification: &Classification) -> ResponseBranch {
    if !classification.is_mental_health_related {
        ResponseBranch::OffTopic
    } else if classification.is_emergency {
        ResponseBranch::Emergency
    } else if classification.is_crisis {
        ResponseBranch::Crisis
    } else {
        ResponseBranch::Ai
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::classify;

    fn c(related: bool, crisis: bool, emergency: bool) -> Classification {
        Classification {
            is_mental_health_related: related,
            is_crisis: crisis,
            is_emergency: emergency,
        }
    }

    #[test]
    fn test_off_topic_wins_over_everything() {
        assert_eq!(select(&c(false, true, true)), ResponseBranch::OffTopic);
    }

    #[test]
    fn test_emergency_before_crisis() {
        assert_eq!(select(&c(true, true, true)), ResponseBranch::Emergency);
        assert_eq!(select(&c(true, true, false)), ResponseBranch::Crisis);
        assert_eq!(select(&c(true, false, false)), ResponseBranch::Ai);
    }

    #[test]
    fn test_branch_payloads() {
        assert_eq!(ResponseBranch::Ai.canned_text(), None);
        assert_eq!(ResponseBranch::OffTopic.alert(), None);
        assert_eq!(ResponseBranch::Crisis.alert(), Some(AlertKind::Crisis));
        assert_eq!(ResponseBranch::Emergency.canned_text(), Some(EMERGENCY_RESPONSE));
    }

    #[test]
    fn test_end_to_end_selection() {
        assert_eq!(select(&classify("I want to kill myself")), ResponseBranch::Crisis);
        assert_eq!(select(&classify("What's the capital of France?")), ResponseBranch::OffTopic);
        assert_eq!(select(&classify("I've been feeling anxious lately")), ResponseBranch::Ai);
    }
}
