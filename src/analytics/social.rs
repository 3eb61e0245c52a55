use crate::db::models::{SentimentStats, Tweet};
use crate::db::repositories::SocialSnapshot;
use serde::Serialize;
use std::collections::BTreeMap;

pub const LATEST_TWEET_LIMIT: i64 = 60;
pub const PLAYER_TWEET_LIMIT: usize = 20;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PlayerDetail {
    pub stats: SentimentStats,
    pub tweets: Vec<Tweet>,
}

/// Social sentiment overview
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SocialSummary {
    pub latest_tweets: Vec<Tweet>,
    pub total_count: SentimentStats,
    pub ticket_count: i64,
    pub player_count: SentimentStats,
    pub players: BTreeMap<String, PlayerDetail>,
}

/// Shape a snapshot for the social page.
///
/// Only players that appear in the grouped stats receive tweets, at most
/// `PLAYER_TWEET_LIMIT` each, in the order of `player_tweets` (newest first).
pub fn build_summary(snapshot: SocialSnapshot) -> SocialSummary {
    let mut players: BTreeMap<String, PlayerDetail> = snapshot
        .player_stats
        .into_iter()
        .filter(|row| !row.player.is_empty())
        .map(|row| {
            (
                row.player,
                PlayerDetail {
                    stats: row.stats,
                    tweets: Vec::new(),
                },
            )
        })
        .collect();

    for tweet in snapshot.player_tweets {
        let Some(player) = tweet.input.as_deref() else {
            continue;
        };
        if let Some(detail) = players.get_mut(player) {
            if detail.tweets.len() < PLAYER_TWEET_LIMIT {
                detail.tweets.push(tweet);
            }
        }
    }

    let mut latest_tweets = snapshot.latest;
    latest_tweets.truncate(LATEST_TWEET_LIMIT as usize);

    SocialSummary {
        latest_tweets,
        total_count: snapshot.totals,
        ticket_count: snapshot.ticket_count,
        player_count: snapshot.player_totals,
        players,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::PlayerStatRow;

    fn tweet(id: usize, player: Option<&str>) -> Tweet {
        Tweet {
            tweet_id: format!("t{}", id),
            tweet_user: Some("fan".to_string()),
            tweet_date: None,
            text: Some("what a match".to_string()),
            comments: None,
            retweets: None,
            quotes: None,
            likes: None,
            pictures: None,
            videos: None,
            gifs: None,
            category: Some("player".to_string()),
            sentiment: Some("positive".to_string()),
            input: player.map(str::to_string),
        }
    }

    fn stats(count: i64) -> SentimentStats {
        SentimentStats {
            count,
            positive: count,
            neutral: 0,
            negative: 0,
        }
    }

    #[test]
    fn test_build_summary_caps_player_tweets() {
        let mut player_tweets: Vec<Tweet> = (0..25).map(|i| tweet(i, Some("Kohli"))).collect();
        player_tweets.push(tweet(99, Some("Unknown")));
        player_tweets.push(tweet(100, None));

        let snapshot = SocialSnapshot {
            latest: (0..70).map(|i| tweet(i, None)).collect(),
            totals: stats(70),
            ticket_count: 4,
            player_totals: stats(27),
            player_stats: vec![PlayerStatRow {
                player: "Kohli".to_string(),
                stats: stats(25),
            }],
            player_tweets,
        };

        let summary = build_summary(snapshot);

        assert_eq!(summary.latest_tweets.len(), 60);
        assert_eq!(summary.players.len(), 1);
        let kohli = &summary.players["Kohli"];
        assert_eq!(kohli.tweets.len(), PLAYER_TWEET_LIMIT);
        assert_eq!(kohli.tweets[0].tweet_id, "t0");
        assert_eq!(kohli.stats.count, 25);
    }

    #[test]
    fn test_summary_json_shape() {
        let value = serde_json::to_value(build_summary(SocialSnapshot::default())).unwrap();
        assert_eq!(value["ticketCount"], 0);
        assert_eq!(value["totalCount"]["count"], 0);
        assert_eq!(value["playerCount"]["negative"], 0);
        assert!(value["latestTweets"].as_array().unwrap().is_empty());
        assert!(value["players"].as_object().unwrap().is_empty());
    }
}
