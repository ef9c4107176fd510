use serde_json::Value;

use crate::config_value::{array_field, non_empty_str_field, opt_u64_field, string_list_field, u64_field};
use crate::models::QuestType;

/// Structural validation of a quest's type-specific config, run on the admin
/// create/update path. Collects every violation instead of stopping at the
/// first so the whole config can be fixed in one round. Never calls out to
/// external systems; custom/unknown types always pass.
pub fn validate_quest_config(quest_type: QuestType, config: &Value) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    match quest_type {
        // Follow/subscribe tasks need a target account.
        QuestType::TwitterFollow
        | QuestType::InstagramFollow
        | QuestType::FacebookFollow
        | QuestType::TiktokFollow => {
            push_err(&mut errors, non_empty_str_field(config, "username"));
        }
        QuestType::YoutubeSubscribe => {
            push_err(&mut errors, non_empty_str_field(config, "channel_url"));
        }

        // Interactions with a specific post.
        QuestType::TwitterLike
        | QuestType::TwitterRetweet
        | QuestType::TwitterComment
        | QuestType::TwitterQuote => {
            push_err(&mut errors, non_empty_str_field(config, "tweet_url"));
        }
        QuestType::InstagramLike
        | QuestType::InstagramComment
        | QuestType::FacebookLike
        | QuestType::FacebookShare
        | QuestType::FacebookComment => {
            push_err(&mut errors, non_empty_str_field(config, "post_url"));
        }

        // Original-content tasks: no mandatory target, but the tag list must
        // be well-formed when present.
        QuestType::TwitterPost
        | QuestType::InstagramPost
        | QuestType::InstagramStory
        | QuestType::TiktokVideo => {
            check_optional_tag_list(&mut errors, config, "required_hashtags");
        }

        // Community joins need an invite.
        QuestType::TelegramJoin | QuestType::DiscordJoin => {
            push_err(&mut errors, non_empty_str_field(config, "invite_link"));
        }
        QuestType::TelegramMessage | QuestType::TelegramShare | QuestType::DiscordMessage => {
            push_err(&mut errors, non_empty_str_field(config, "channel"));
        }
        QuestType::DiscordRole => {
            push_err(&mut errors, non_empty_str_field(config, "role_name"));
        }

        // Video tasks: a watch-time floor below one second is meaningless.
        QuestType::YoutubeWatch | QuestType::WatchVideo => {
            push_err(&mut errors, non_empty_str_field(config, "video_url"));
            match opt_u64_field(config, "min_watch_time") {
                Ok(Some(secs)) if secs < 1 => {
                    errors.push("field `min_watch_time` must be at least 1 second".to_string());
                }
                Ok(_) => {}
                Err(e) => errors.push(e),
            }
        }
        QuestType::YoutubeLike | QuestType::YoutubeComment | QuestType::TiktokLike
        | QuestType::TiktokShare => {
            push_err(&mut errors, non_empty_str_field(config, "video_url"));
        }

        // On-chain tasks only name their target; the chain itself is never
        // inspected here.
        QuestType::TokenHold | QuestType::TokenSwap | QuestType::StakeTokens => {
            push_err(&mut errors, non_empty_str_field(config, "token_address"));
        }
        QuestType::NftMint | QuestType::NftHold | QuestType::ContractInteraction => {
            push_err(&mut errors, non_empty_str_field(config, "contract_address"));
        }
        QuestType::WalletConnect | QuestType::SendTransaction => {}

        QuestType::DownloadApp => {
            push_err(&mut errors, non_empty_str_field(config, "app_url"));
        }
        QuestType::ReadArticle => {
            push_err(&mut errors, non_empty_str_field(config, "article_url"));
        }
        QuestType::VisitPage => {
            push_err(&mut errors, non_empty_str_field(config, "page_url"));
        }
        QuestType::DailyCheckin | QuestType::CompleteProfile => {}

        QuestType::Quiz => validate_question_list(&mut errors, config, true),
        QuestType::Survey | QuestType::Poll => validate_question_list(&mut errors, config, false),

        QuestType::Referral | QuestType::InviteFriends => {
            match opt_u64_field(config, "min_referrals") {
                Ok(Some(0)) => {
                    errors.push("field `min_referrals` must be at least 1".to_string());
                }
                Ok(_) => {}
                Err(e) => errors.push(e),
            }
        }

        QuestType::Custom => {}
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn push_err<T>(errors: &mut Vec<String>, result: Result<T, String>) {
    if let Err(e) = result {
        errors.push(e);
    }
}

fn check_optional_tag_list(errors: &mut Vec<String>, config: &Value, key: &str) {
    if config.get(key).is_some() {
        match string_list_field(config, key) {
            Ok(tags) if tags.is_empty() => {
                errors.push(format!("field `{}` must not be empty", key));
            }
            Ok(_) => {}
            Err(e) => errors.push(e),
        }
    }
}

/// Quizzes need at least one question, each with at least two answer options;
/// only graded quizzes additionally need a correct-answer index.
fn validate_question_list(errors: &mut Vec<String>, config: &Value, graded: bool) {
    let questions = match array_field(config, "questions") {
        Ok(q) => q,
        Err(e) => {
            errors.push(e);
            return;
        }
    };

    if questions.is_empty() {
        errors.push("field `questions` must not be empty".to_string());
        return;
    }

    for (index, question) in questions.iter().enumerate() {
        if let Err(e) = non_empty_str_field(question, "question") {
            errors.push(format!("questions[{}]: {}", index, e));
        }
        match array_field(question, "options") {
            Ok(options) if options.len() < 2 => {
                errors.push(format!(
                    "questions[{}]: field `options` must have at least 2 entries",
                    index
                ));
            }
            Ok(_) => {}
            Err(e) => errors.push(format!("questions[{}]: {}", index, e)),
        }
        if graded {
            if let Err(e) = u64_field(question, "correct_answer_index") {
                errors.push(format!("questions[{}]: {}", index, e));
            }
        }
    }
}
