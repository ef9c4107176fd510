use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Closed set of quest types, grouped by platform. Serialized as snake_case
/// strings; an unknown string parses to `Custom`, which carries no
/// type-specific rules. Adding a type means one variant here plus match arms
/// in the config and submission validators (the compiler flags the rest).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum QuestType {
    // Twitter / X
    TwitterFollow,
    TwitterLike,
    TwitterRetweet,
    TwitterComment,
    TwitterQuote,
    TwitterPost,
    // Instagram
    InstagramFollow,
    InstagramLike,
    InstagramComment,
    InstagramPost,
    InstagramStory,
    // Facebook
    FacebookFollow,
    FacebookLike,
    FacebookShare,
    FacebookComment,
    // Telegram
    TelegramJoin,
    TelegramMessage,
    TelegramShare,
    // Discord
    DiscordJoin,
    DiscordRole,
    DiscordMessage,
    // YouTube
    YoutubeSubscribe,
    YoutubeWatch,
    YoutubeLike,
    YoutubeComment,
    // TikTok
    TiktokFollow,
    TiktokLike,
    TiktokShare,
    TiktokVideo,
    // On-chain
    WalletConnect,
    TokenHold,
    TokenSwap,
    NftMint,
    NftHold,
    StakeTokens,
    SendTransaction,
    ContractInteraction,
    // Engagement
    DailyCheckin,
    CompleteProfile,
    DownloadApp,
    ReadArticle,
    WatchVideo,
    VisitPage,
    // Quiz / survey / referral
    Quiz,
    Survey,
    Poll,
    Referral,
    InviteFriends,
    // Generic
    Custom,
}

impl QuestType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestType::TwitterFollow => "twitter_follow",
            QuestType::TwitterLike => "twitter_like",
            QuestType::TwitterRetweet => "twitter_retweet",
            QuestType::TwitterComment => "twitter_comment",
            QuestType::TwitterQuote => "twitter_quote",
            QuestType::TwitterPost => "twitter_post",
            QuestType::InstagramFollow => "instagram_follow",
            QuestType::InstagramLike => "instagram_like",
            QuestType::InstagramComment => "instagram_comment",
            QuestType::InstagramPost => "instagram_post",
            QuestType::InstagramStory => "instagram_story",
            QuestType::FacebookFollow => "facebook_follow",
            QuestType::FacebookLike => "facebook_like",
            QuestType::FacebookShare => "facebook_share",
            QuestType::FacebookComment => "facebook_comment",
            QuestType::TelegramJoin => "telegram_join",
            QuestType::TelegramMessage => "telegram_message",
            QuestType::TelegramShare => "telegram_share",
            QuestType::DiscordJoin => "discord_join",
            QuestType::DiscordRole => "discord_role",
            QuestType::DiscordMessage => "discord_message",
            QuestType::YoutubeSubscribe => "youtube_subscribe",
            QuestType::YoutubeWatch => "youtube_watch",
            QuestType::YoutubeLike => "youtube_like",
            QuestType::YoutubeComment => "youtube_comment",
            QuestType::TiktokFollow => "tiktok_follow",
            QuestType::TiktokLike => "tiktok_like",
            QuestType::TiktokShare => "tiktok_share",
            QuestType::TiktokVideo => "tiktok_video",
            QuestType::WalletConnect => "wallet_connect",
            QuestType::TokenHold => "token_hold",
            QuestType::TokenSwap => "token_swap",
            QuestType::NftMint => "nft_mint",
            QuestType::NftHold => "nft_hold",
            QuestType::StakeTokens => "stake_tokens",
            QuestType::SendTransaction => "send_transaction",
            QuestType::ContractInteraction => "contract_interaction",
            QuestType::DailyCheckin => "daily_checkin",
            QuestType::CompleteProfile => "complete_profile",
            QuestType::DownloadApp => "download_app",
            QuestType::ReadArticle => "read_article",
            QuestType::WatchVideo => "watch_video",
            QuestType::VisitPage => "visit_page",
            QuestType::Quiz => "quiz",
            QuestType::Survey => "survey",
            QuestType::Poll => "poll",
            QuestType::Referral => "referral",
            QuestType::InviteFriends => "invite_friends",
            QuestType::Custom => "custom",
        }
    }

    pub fn parse(s: &str) -> QuestType {
        match s {
            "twitter_follow" => QuestType::TwitterFollow,
            "twitter_like" => QuestType::TwitterLike,
            "twitter_retweet" => QuestType::TwitterRetweet,
            "twitter_comment" => QuestType::TwitterComment,
            "twitter_quote" => QuestType::TwitterQuote,
            "twitter_post" => QuestType::TwitterPost,
            "instagram_follow" => QuestType::InstagramFollow,
            "instagram_like" => QuestType::InstagramLike,
            "instagram_comment" => QuestType::InstagramComment,
            "instagram_post" => QuestType::InstagramPost,
            "instagram_story" => QuestType::InstagramStory,
            "facebook_follow" => QuestType::FacebookFollow,
            "facebook_like" => QuestType::FacebookLike,
            "facebook_share" => QuestType::FacebookShare,
            "facebook_comment" => QuestType::FacebookComment,
            "telegram_join" => QuestType::TelegramJoin,
            "telegram_message" => QuestType::TelegramMessage,
            "telegram_share" => QuestType::TelegramShare,
            "discord_join" => QuestType::DiscordJoin,
            "discord_role" => QuestType::DiscordRole,
            "discord_message" => QuestType::DiscordMessage,
            "youtube_subscribe" => QuestType::YoutubeSubscribe,
            "youtube_watch" => QuestType::YoutubeWatch,
            "youtube_like" => QuestType::YoutubeLike,
            "youtube_comment" => QuestType::YoutubeComment,
            "tiktok_follow" => QuestType::TiktokFollow,
            "tiktok_like" => QuestType::TiktokLike,
            "tiktok_share" => QuestType::TiktokShare,
            "tiktok_video" => QuestType::TiktokVideo,
            "wallet_connect" => QuestType::WalletConnect,
            "token_hold" => QuestType::TokenHold,
            "token_swap" => QuestType::TokenSwap,
            "nft_mint" => QuestType::NftMint,
            "nft_hold" => QuestType::NftHold,
            "stake_tokens" => QuestType::StakeTokens,
            "send_transaction" => QuestType::SendTransaction,
            "contract_interaction" => QuestType::ContractInteraction,
            "daily_checkin" => QuestType::DailyCheckin,
            "complete_profile" => QuestType::CompleteProfile,
            "download_app" => QuestType::DownloadApp,
            "read_article" => QuestType::ReadArticle,
            "watch_video" => QuestType::WatchVideo,
            "visit_page" => QuestType::VisitPage,
            "quiz" => QuestType::Quiz,
            "survey" => QuestType::Survey,
            "poll" => QuestType::Poll,
            "referral" => QuestType::Referral,
            "invite_friends" => QuestType::InviteFriends,
            _ => QuestType::Custom,
        }
    }

    /// Hostnames a URL proof for this quest type must resolve to, when the
    /// type is bound to a platform. Matching accepts the bare host and any
    /// subdomain (so `www.` works without listing it).
    pub fn platform_hosts(&self) -> Option<&'static [&'static str]> {
        match self {
            QuestType::TwitterFollow
            | QuestType::TwitterLike
            | QuestType::TwitterRetweet
            | QuestType::TwitterComment
            | QuestType::TwitterQuote
            | QuestType::TwitterPost => Some(&["twitter.com", "x.com"]),
            QuestType::InstagramFollow
            | QuestType::InstagramLike
            | QuestType::InstagramComment
            | QuestType::InstagramPost
            | QuestType::InstagramStory => Some(&["instagram.com"]),
            QuestType::FacebookFollow
            | QuestType::FacebookLike
            | QuestType::FacebookShare
            | QuestType::FacebookComment => Some(&["facebook.com", "fb.com"]),
            QuestType::TelegramJoin | QuestType::TelegramMessage | QuestType::TelegramShare => {
                Some(&["t.me", "telegram.me"])
            }
            QuestType::DiscordJoin | QuestType::DiscordRole | QuestType::DiscordMessage => {
                Some(&["discord.gg", "discord.com"])
            }
            QuestType::YoutubeSubscribe
            | QuestType::YoutubeWatch
            | QuestType::YoutubeLike
            | QuestType::YoutubeComment => Some(&["youtube.com", "youtu.be"]),
            QuestType::TiktokFollow
            | QuestType::TiktokLike
            | QuestType::TiktokShare
            | QuestType::TiktokVideo => Some(&["tiktok.com"]),
            _ => None,
        }
    }
}

impl From<String> for QuestType {
    fn from(s: String) -> Self {
        QuestType::parse(&s)
    }
}

impl From<QuestType> for String {
    fn from(t: QuestType) -> Self {
        t.as_str().to_string()
    }
}

impl std::fmt::Display for QuestType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestStatus {
    Active,
    Inactive,
    Expired,
    Scheduled,
}

impl QuestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestStatus::Active => "active",
            QuestStatus::Inactive => "inactive",
            QuestStatus::Expired => "expired",
            QuestStatus::Scheduled => "scheduled",
        }
    }

    pub fn parse(s: &str) -> Option<QuestStatus> {
        match s {
            "active" => Some(QuestStatus::Active),
            "inactive" => Some(QuestStatus::Inactive),
            "expired" => Some(QuestStatus::Expired),
            "scheduled" => Some(QuestStatus::Scheduled),
            _ => None,
        }
    }
}

/// What a submission must carry as proof of completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProofType {
    Screenshot,
    Url,
    TransactionHash,
    Code,
    Text,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationConfig {
    #[serde(default)]
    pub proof_required: bool,
    #[serde(default = "default_proof_type")]
    pub proof_type: ProofType,
    /// When set, a valid submission completes the quest in the same call,
    /// with no manual approval step.
    #[serde(default)]
    pub auto_verify: bool,
}

fn default_proof_type() -> ProofType {
    ProofType::Text
}

impl Default for VerificationConfig {
    fn default() -> Self {
        VerificationConfig {
            proof_required: false,
            proof_type: ProofType::Text,
            auto_verify: false,
        }
    }
}

/// An administrator-defined, completable unit of work with a reward.
/// Mutated only through the admin edit path; the completion workflow
/// treats it as read-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quest {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub quest_type: QuestType,
    pub reward_points: i64,
    pub status: QuestStatus,
    pub config: serde_json::Value,
    pub verification: VerificationConfig,
    pub is_repeatable: bool,
    pub max_completions: Option<i32>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub prerequisite_quest_ids: Vec<i64>,
    pub reward_multiplier: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}
