use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde_json::Value;
use url::Url;

use crate::config_value::{array_field, non_empty_str_field, str_field, string_list_field};
use crate::models::{ProofType, Quest, QuestType};
use crate::validation::quiz::{quiz_questions, score_quiz};

/// Validates a user's submitted proof against a quest's verification
/// requirements and type-specific rules. Both layers always run and their
/// errors are concatenated, so the response names everything wrong with the
/// submission at once.
pub fn validate_submission(quest: &Quest, submission: &Value) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    if quest.verification.proof_required {
        check_proof_shape(&mut errors, quest.verification.proof_type, submission);
    }
    check_type_rules(&mut errors, quest.quest_type, &quest.config, submission);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Layer 1: the submission must carry the kind of proof the quest asks for.
/// Shape only; whether a screenshot shows anything real is a manual-review
/// (or downstream) concern.
fn check_proof_shape(errors: &mut Vec<String>, proof_type: ProofType, submission: &Value) {
    let result = match proof_type {
        ProofType::Screenshot => non_empty_str_field(submission, "screenshot_url").map(|_| ()),
        ProofType::Url => match non_empty_str_field(submission, "url") {
            Ok(raw) => {
                if Url::parse(raw).is_err() {
                    Err("field `url` must be a valid URL".to_string())
                } else {
                    Ok(())
                }
            }
            Err(e) => Err(e),
        },
        ProofType::TransactionHash => {
            non_empty_str_field(submission, "transaction_hash").map(|_| ())
        }
        ProofType::Code => non_empty_str_field(submission, "verification_code").map(|_| ()),
        ProofType::Text => non_empty_str_field(submission, "text").map(|_| ()),
    };
    if let Err(e) = result {
        errors.push(e);
    }
}

/// Layer 2: type-specific rules, such as platform hostname allowlists for
/// URL-bearing proofs, answer counts and grading for quizzes, referral id
/// lists for referral quests.
fn check_type_rules(
    errors: &mut Vec<String>,
    quest_type: QuestType,
    config: &Value,
    submission: &Value,
) {
    if let Some(hosts) = quest_type.platform_hosts() {
        // Hostname check only applies when a parseable URL was submitted;
        // syntax errors belong to the proof-shape layer.
        if let Ok(raw) = str_field(submission, "url") {
            if let Ok(parsed) = Url::parse(raw) {
                let host = parsed.host_str().unwrap_or("");
                if !hosts.iter().any(|allowed| host_matches(host, allowed)) {
                    errors.push(format!(
                        "field `url` must point to one of: {}",
                        hosts.join(", ")
                    ));
                }
            }
        }
    }

    match quest_type {
        // Content-creation tasks: when the config names required hashtags and
        // the submission carries the post text, every tag must appear in it.
        QuestType::TwitterPost
        | QuestType::InstagramPost
        | QuestType::InstagramStory
        | QuestType::TiktokVideo => {
            if config.get("required_hashtags").is_some() {
                if let (Ok(required), Ok(text)) = (
                    string_list_field(config, "required_hashtags"),
                    str_field(submission, "text"),
                ) {
                    let check = check_required_tags(text, &required);
                    if !check.valid {
                        errors.push(format!(
                            "missing required hashtags: {}",
                            check.missing.join(", ")
                        ));
                    }
                }
            }
        }
        QuestType::Quiz => check_quiz_submission(errors, config, submission),
        QuestType::Referral | QuestType::InviteFriends => {
            if let Err(e) = array_field(submission, "referral_ids") {
                errors.push(e);
            }
        }
        _ => {}
    }
}

fn check_quiz_submission(errors: &mut Vec<String>, config: &Value, submission: &Value) {
    let questions = match quiz_questions(config) {
        Ok(q) => q,
        Err(e) => {
            errors.push(e);
            return;
        }
    };

    let answers: Vec<usize> = match array_field(submission, "answers") {
        Ok(items) => {
            let mut answers = Vec::with_capacity(items.len());
            for item in items {
                match item.as_u64() {
                    Some(n) => answers.push(n as usize),
                    None => {
                        errors.push(
                            "field `answers` must be an array of option indexes".to_string(),
                        );
                        return;
                    }
                }
            }
            answers
        }
        Err(e) => {
            errors.push(e);
            return;
        }
    };

    if answers.len() != questions.len() {
        errors.push(format!(
            "field `answers` must have exactly {} entries, got {}",
            questions.len(),
            answers.len()
        ));
        return;
    }

    let score = score_quiz(&questions, &answers);
    if !score.passed {
        errors.push(format!(
            "quiz not passed: {} of {} correct, {} required",
            score.correct, score.total, score.min_required
        ));
    }
}

/// Host equality that also accepts subdomains, so `www.twitter.com` passes a
/// `twitter.com` allowlist entry without an explicit listing.
fn host_matches(host: &str, allowed: &str) -> bool {
    host.eq_ignore_ascii_case(allowed)
        || host
            .to_ascii_lowercase()
            .ends_with(&format!(".{}", allowed))
}

/// Result of a required-strings containment check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagCheck {
    pub valid: bool,
    pub missing: Vec<String>,
}

/// Case-insensitive substring containment of every required entry, reporting
/// exactly the ones absent. Used for hashtags, mentions, and keywords alike.
pub fn check_required_tags(text: &str, required: &[String]) -> TagCheck {
    let haystack = text.to_lowercase();
    let missing: Vec<String> = required
        .iter()
        .filter(|tag| !haystack.contains(&tag.to_lowercase()))
        .cloned()
        .collect();
    TagCheck { valid: missing.is_empty(), missing }
}

/// `floor(base * multiplier)`, exact for rational multipliers. Results
/// outside the i64 range saturate rather than silently awarding zero.
pub fn reward_points(base: i64, multiplier: Decimal) -> i64 {
    match Decimal::from(base).checked_mul(multiplier) {
        Some(product) => {
            let floored = product.floor();
            floored.to_i64().unwrap_or_else(|| {
                tracing::warn!(base, %multiplier, "reward exceeds the i64 range, saturating");
                if floored.is_sign_negative() {
                    i64::MIN
                } else {
                    i64::MAX
                }
            })
        }
        None => {
            tracing::warn!(base, %multiplier, "reward computation overflowed, saturating");
            if (base < 0) != multiplier.is_sign_negative() {
                i64::MIN
            } else {
                i64::MAX
            }
        }
    }
}
