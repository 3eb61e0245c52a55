use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Scraped tweet with its classification
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Tweet {
    pub tweet_id: String,
    pub tweet_user: Option<String>,
    pub tweet_date: Option<NaiveDateTime>,
    pub text: Option<String>,
    pub comments: Option<i32>,
    pub retweets: Option<i32>,
    pub quotes: Option<i32>,
    pub likes: Option<i32>,
    pub pictures: Option<String>,
    pub videos: Option<String>,
    pub gifs: Option<String>,
    /// `ticket` or `player`
    pub category: Option<String>,
    /// `positive`, `negative` or `neutral`
    pub sentiment: Option<String>,
    /// Search input that matched the tweet (the player name for player tweets)
    pub input: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TweetCategory {
    Ticket,
    Player,
}

impl TweetCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            TweetCategory::Ticket => "ticket",
            TweetCategory::Player => "player",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

impl Sentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Negative => "negative",
            Sentiment::Neutral => "neutral",
        }
    }
}

impl fmt::Display for TweetCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Sentiment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "positive" => Ok(Sentiment::Positive),
            "negative" => Ok(Sentiment::Negative),
            "neutral" => Ok(Sentiment::Neutral),
            other => Err(format!("unknown sentiment: {}", other)),
        }
    }
}

/// Sentiment breakdown of a set of tweets
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, sqlx::FromRow, PartialEq, Eq)]
pub struct SentimentStats {
    pub count: i64,
    pub positive: i64,
    pub neutral: i64,
    pub negative: i64,
}

/// Sentiment breakdown for one player
#[derive(Debug, Clone, sqlx::FromRow, PartialEq, Eq)]
pub struct PlayerStatRow {
    pub player: String,
    #[sqlx(flatten)]
    pub stats: SentimentStats,
}
