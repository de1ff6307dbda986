//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `LessonStore` port from the `core` crate. It persists lessons in SQLite
//! using `sqlx`.

use async_trait::async_trait;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    FromRow, SqlitePool,
};
use std::str::FromStr;
use tutorial_core::domain::{Lesson, LessonId, VideoRef};
use tutorial_core::ports::{LessonStore, PortError, PortResult};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `LessonStore` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: SqlitePool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Opens (and creates if needed) the database at `database_url`.
    pub async fn connect(database_url: &str) -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;
        Ok(Self::new(pool))
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Fills an empty store with the sample tutorials. Returns how many were added.
    pub async fn seed_sample_lessons(&self) -> PortResult<usize> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM lessons")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        if count > 0 {
            return Ok(0);
        }

        let samples = sample_lessons();
        // Oldest first, so the first sample ends up on top.
        for lesson in samples.iter().rev() {
            self.create(lesson).await?;
        }
        Ok(samples.len())
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct LessonRecord {
    id: String,
    title: String,
    description: String,
    steps: String,
    created_at: String,
    thumbnail_url: String,
    video_url: Option<String>,
}

impl LessonRecord {
    fn to_domain(self) -> PortResult<Lesson> {
        let id = LessonId::from_str(&self.id)
            .map_err(|e| PortError::Unexpected(format!("Corrupt lesson id {}: {}", self.id, e)))?;
        let steps: Vec<String> = serde_json::from_str(&self.steps).map_err(|e| {
            PortError::Unexpected(format!("Corrupt steps for lesson {}: {}", self.id, e))
        })?;
        Ok(Lesson {
            id,
            title: self.title,
            description: self.description,
            steps,
            created_at: self.created_at,
            thumbnail_url: self.thumbnail_url,
            video_url: self.video_url.and_then(VideoRef::new),
        })
    }
}

const SELECT_LESSON: &str =
    "SELECT id, title, description, steps, created_at, thumbnail_url, video_url FROM lessons";

//=========================================================================================
// `LessonStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl LessonStore for DbAdapter {
    async fn create(&self, lesson: &Lesson) -> PortResult<()> {
        let steps = serde_json::to_string(&lesson.steps)
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        sqlx::query(
            "INSERT INTO lessons (id, title, description, steps, created_at, thumbnail_url, video_url) VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(lesson.id.to_string())
        .bind(&lesson.title)
        .bind(&lesson.description)
        .bind(steps)
        .bind(&lesson.created_at)
        .bind(&lesson.thumbnail_url)
        .bind(lesson.video_url.as_ref().map(VideoRef::as_str))
        .execute(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                PortError::Conflict(format!("Lesson {} already exists", lesson.id))
            }
            _ => PortError::Unexpected(e.to_string()),
        })?;
        Ok(())
    }

    async fn list(&self) -> PortResult<Vec<Lesson>> {
        let records = sqlx::query_as::<_, LessonRecord>(&format!("{SELECT_LESSON} ORDER BY seq DESC"))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        records.into_iter().map(LessonRecord::to_domain).collect()
    }

    async fn get_by_id(&self, id: &LessonId) -> PortResult<Option<Lesson>> {
        let record = sqlx::query_as::<_, LessonRecord>(&format!("{SELECT_LESSON} WHERE id = ?"))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        record.map(LessonRecord::to_domain).transpose()
    }
}

//=========================================================================================
// Sample Content
//=========================================================================================

fn sample_lessons() -> Vec<Lesson> {
    let sample = |title: &str, description: &str, created_at: &str, thumb: u32, video: &str| Lesson {
        id: LessonId::new(),
        title: title.to_string(),
        description: description.to_string(),
        steps: Vec::new(),
        created_at: created_at.to_string(),
        thumbnail_url: format!("https://picsum.photos/id/{}/400/800", thumb),
        video_url: VideoRef::new(format!(
            "https://storage.googleapis.com/gtv-videos-bucket/sample/{}.mp4",
            video
        )),
    };
    vec![
        sample(
            "How to share a photo",
            "Learn how to share your favorite photos with friends and family.",
            "June 15",
            1,
            "ForBiggerBlazes",
        ),
        sample(
            "How to send a text message",
            "A simple guide to sending SMS messages.",
            "June 12",
            2,
            "ForBiggerEscapes",
        ),
        sample(
            "Finding directions on Maps",
            "Never get lost again with this maps tutorial.",
            "June 10",
            3,
            "ForBiggerFun",
        ),
    ]
}
