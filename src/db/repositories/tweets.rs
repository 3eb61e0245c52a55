use crate::{
    db::models::{PlayerStatRow, SentimentStats, Tweet, TweetCategory},
    error::Error,
};
use anyhow::Result;
use sqlx::{PgConnection, PgPool};
use std::sync::Arc;
use tracing::{debug, info};

const TWEET_COLUMNS: &str = "tweet_id, tweet_user, tweet_date, text, comments, retweets, \
                             quotes, likes, pictures, videos, gifs, category, sentiment, input";

/// Everything the social page needs, read from one consistent snapshot
#[derive(Debug, Clone, Default)]
pub struct SocialSnapshot {
    pub latest: Vec<Tweet>,
    pub totals: SentimentStats,
    pub ticket_count: i64,
    pub player_totals: SentimentStats,
    pub player_stats: Vec<PlayerStatRow>,
    pub player_tweets: Vec<Tweet>,
}

/// Tweets repository for the social sentiment views
#[derive(Clone)]
pub struct TweetsRepository {
    pool: Arc<PgPool>,
}

impl TweetsRepository {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// Run every social read inside a single transaction
    pub async fn social_snapshot(&self, latest_limit: i64) -> Result<SocialSnapshot> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| Error::Database(format!("Failed to begin transaction: {}", e)))?;

        let snapshot = SocialSnapshot {
            latest: latest(&mut tx, latest_limit).await?,
            totals: sentiment_totals(&mut tx, None).await?,
            ticket_count: count_by_category(&mut tx, TweetCategory::Ticket).await?,
            player_totals: sentiment_totals(&mut tx, Some(TweetCategory::Player)).await?,
            player_stats: player_stats(&mut tx).await?,
            player_tweets: player_tweets(&mut tx).await?,
        };

        tx.commit()
            .await
            .map_err(|e| Error::Database(format!("Failed to commit social snapshot: {}", e)))?;

        debug!(
            "Social snapshot: {} latest, {} players, {} player tweets",
            snapshot.latest.len(),
            snapshot.player_stats.len(),
            snapshot.player_tweets.len()
        );

        Ok(snapshot)
    }

    /// Insert tweets in one transaction, ignoring ids that already exist
    pub async fn insert_many(&self, tweets: &[Tweet]) -> Result<u64> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| Error::Database(format!("Failed to begin transaction: {}", e)))?;

        let sql = format!(
            "INSERT INTO tweets ({}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14) \
             ON CONFLICT (tweet_id) DO NOTHING",
            TWEET_COLUMNS
        );

        let mut inserted = 0;
        for tweet in tweets {
            let result = sqlx::query(&sql)
                .bind(&tweet.tweet_id)
                .bind(&tweet.tweet_user)
                .bind(tweet.tweet_date)
                .bind(&tweet.text)
                .bind(tweet.comments)
                .bind(tweet.retweets)
                .bind(tweet.quotes)
                .bind(tweet.likes)
                .bind(&tweet.pictures)
                .bind(&tweet.videos)
                .bind(&tweet.gifs)
                .bind(&tweet.category)
                .bind(&tweet.sentiment)
                .bind(&tweet.input)
                .execute(&mut *tx)
                .await
                .map_err(|e| Error::Database(format!("Failed to insert tweet: {}", e)))?;

            inserted += result.rows_affected();
        }

        tx.commit()
            .await
            .map_err(|e| Error::Database(format!("Failed to commit tweets: {}", e)))?;

        info!("Inserted {} of {} tweets", inserted, tweets.len());

        Ok(inserted)
    }
}

async fn latest(conn: &mut PgConnection, limit: i64) -> Result<Vec<Tweet>> {
    let sql = format!(
        "SELECT {} FROM tweets ORDER BY tweet_date DESC NULLS LAST LIMIT $1",
        TWEET_COLUMNS
    );

    let result = sqlx::query_as::<_, Tweet>(&sql)
        .bind(limit)
        .fetch_all(conn)
        .await
        .map_err(|e| Error::Database(format!("Failed to get latest tweets: {}", e)))?;

    Ok(result)
}

async fn sentiment_totals(
    conn: &mut PgConnection,
    category: Option<TweetCategory>,
) -> Result<SentimentStats> {
    let result = sqlx::query_as::<_, SentimentStats>(
        r#"
        SELECT
            COUNT(*) AS count,
            COUNT(CASE WHEN sentiment = 'positive' THEN 1 END) AS positive,
            COUNT(CASE WHEN sentiment = 'neutral' THEN 1 END) AS neutral,
            COUNT(CASE WHEN sentiment = 'negative' THEN 1 END) AS negative
        FROM tweets
        WHERE ($1::TEXT IS NULL OR category = $1)
        "#,
    )
    .bind(category.map(|c| c.as_str()))
    .fetch_one(conn)
    .await
    .map_err(|e| Error::Database(format!("Failed to count tweet sentiment: {}", e)))?;

    Ok(result)
}

async fn count_by_category(conn: &mut PgConnection, category: TweetCategory) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tweets WHERE category = $1")
        .bind(category.as_str())
        .fetch_one(conn)
        .await
        .map_err(|e| Error::Database(format!("Failed to count {} tweets: {}", category, e)))?;

    Ok(count)
}

async fn player_stats(conn: &mut PgConnection) -> Result<Vec<PlayerStatRow>> {
    let result = sqlx::query_as::<_, PlayerStatRow>(
        r#"
        SELECT
            input AS player,
            COUNT(*) AS count,
            COUNT(CASE WHEN sentiment = 'positive' THEN 1 END) AS positive,
            COUNT(CASE WHEN sentiment = 'neutral' THEN 1 END) AS neutral,
            COUNT(CASE WHEN sentiment = 'negative' THEN 1 END) AS negative
        FROM tweets
        WHERE category = 'player'
        GROUP BY input
        HAVING input IS NOT NULL
        ORDER BY input
        "#,
    )
    .fetch_all(conn)
    .await
    .map_err(|e| Error::Database(format!("Failed to get player stats: {}", e)))?;

    Ok(result)
}

async fn player_tweets(conn: &mut PgConnection) -> Result<Vec<Tweet>> {
    let sql = format!(
        "SELECT {} FROM tweets WHERE category = 'player' ORDER BY tweet_date DESC NULLS LAST",
        TWEET_COLUMNS
    );

    let result = sqlx::query_as::<_, Tweet>(&sql)
        .fetch_all(conn)
        .await
        .map_err(|e| Error::Database(format!("Failed to get player tweets: {}", e)))?;

    Ok(result)
}
