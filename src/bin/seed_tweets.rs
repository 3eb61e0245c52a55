use anyhow::Result;
use chrono::{Duration, NaiveDateTime, Utc};
use clap::Parser;
use log::info;
use rand::seq::SliceRandom;
use rand::Rng;
use stadium_monitor::config::DatabaseConfig;
use stadium_monitor::db::models::{Sentiment, Tweet, TweetCategory};
use stadium_monitor::db::repositories::TweetsRepository;
use stadium_monitor::db::DatabaseService;
use std::sync::Arc;
use uuid::Uuid;

const PLAYERS: &[&str] = &[
    "Virat Kohli",
    "Rohit Sharma",
    "MS Dhoni",
    "Jasprit Bumrah",
    "Hardik Pandya",
    "Shubman Gill",
];

const HANDLES: &[&str] = &["cricfan_99", "stands_north", "matchday_live", "gate7_regular", "boundary_rope"];

const TICKET_LINES: &[&str] = &[
    "Queue at the ticket counter is barely moving",
    "Got my tickets for tonight, gates open early",
    "Resale prices for the final are out of control",
    "Box office says walk-in tickets are sold out",
];

const PLAYER_LINES: &[&str] = &[
    "what a knock from",
    "dropped catch again by",
    "crowd going wild for",
    "steady spell from",
];

/// Fill the tweets table with random sample data for the dashboard
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Number of tweets to create
    #[arg(long, default_value_t = 50)]
    count: usize,

    #[arg(long, env = "DATABASE_URL")]
    database_url: String,
}

fn random_tweet<R: Rng>(rng: &mut R, now: NaiveDateTime) -> Tweet {
    let category = if rng.gen_bool(0.5) {
        TweetCategory::Ticket
    } else {
        TweetCategory::Player
    };
    let sentiment = *[Sentiment::Positive, Sentiment::Negative, Sentiment::Neutral]
        .choose(rng)
        .unwrap_or(&Sentiment::Neutral);

    let (text, input) = match category {
        TweetCategory::Ticket => {
            let line = TICKET_LINES.choose(rng).copied().unwrap_or_default();
            (line.to_string(), "tickets".to_string())
        }
        TweetCategory::Player => {
            let player = PLAYERS.choose(rng).copied().unwrap_or_default();
            let line = PLAYER_LINES.choose(rng).copied().unwrap_or_default();
            (format!("{} {}", line, player), player.to_string())
        }
    };

    Tweet {
        tweet_id: Uuid::new_v4().to_string(),
        tweet_user: HANDLES.choose(rng).map(|h| h.to_string()),
        tweet_date: Some(now - Duration::minutes(rng.gen_range(0..24 * 60))),
        text: Some(text),
        comments: Some(rng.gen_range(0..100)),
        retweets: Some(rng.gen_range(0..100)),
        quotes: Some(rng.gen_range(0..50)),
        likes: Some(rng.gen_range(0..1000)),
        pictures: None,
        videos: None,
        gifs: None,
        category: Some(category.as_str().to_string()),
        sentiment: Some(sentiment.as_str().to_string()),
        input: Some(input),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let database = DatabaseService::new(&DatabaseConfig {
        url: args.database_url,
        auto_migrate: false,
        ..DatabaseConfig::default()
    })
    .await?;

    let mut rng = rand::thread_rng();
    let now = Utc::now().naive_utc();
    let tweets: Vec<Tweet> = (0..args.count).map(|_| random_tweet(&mut rng, now)).collect();

    let repo = TweetsRepository::new(Arc::clone(&database.pool));
    let inserted = repo.insert_many(&tweets).await?;

    info!("Seeded {} tweets", inserted);

    Ok(())
}
