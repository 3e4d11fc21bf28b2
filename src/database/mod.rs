//! SQLite persistence for submissions, engagement snapshots and verdicts.
//!
//! ## Tables
//!
//! - `submissions` - one row per submission with its lifecycle status
//! - `engagement_metrics` - append-only metric snapshots per post
//! - `validation_results` - typed verdicts (`authenticity`, `gaming`, ...)
//! - `social_posts` - latest authenticity verdict per (post, platform)
//!
//! The coordinator only depends on [`SubmissionStore`]; [`Database`] is the
//! SQLite implementation and adds query, retention and backup helpers.

pub mod pool;
pub mod schema;

use crate::clock::{self, Clock};
use crate::engagement::EngagementMetrics;
use crate::error::{Error, Result};
use pool::ConnectionPool;
use rusqlite::{params, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Lifecycle state of a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionStatus {
    /// Tag issued, post not yet processed.
    Pending,
    /// Post carried a valid tag and engagement looked organic.
    Verified,
    /// Post failed authenticity verification.
    Rejected,
    /// Post is authentic but engagement looks gamed.
    Flagged,
    /// Processing was refused by the rate limiter; retry later.
    Deferred,
}

impl SubmissionStatus {
    /// Stored representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Verified => "verified",
            Self::Rejected => "rejected",
            Self::Flagged => "flagged",
            Self::Deferred => "deferred",
        }
    }
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubmissionStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(Self::Pending),
            "verified" => Ok(Self::Verified),
            "rejected" => Ok(Self::Rejected),
            "flagged" => Ok(Self::Flagged),
            "deferred" => Ok(Self::Deferred),
            other => Err(Error::Invalid(format!("unknown submission status {other:?}"))),
        }
    }
}

/// A stored submission.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionRecord {
    /// Submission identifier.
    pub submission_id: String,
    /// Artifact reference (e.g. content hash), if one was recorded.
    pub artifact: Option<String>,
    /// Current status.
    pub status: SubmissionStatus,
    /// Creation time in epoch seconds.
    pub created_at: f64,
    /// Last status change in epoch seconds.
    pub updated_at: f64,
}

/// Engagement counters captured at one point in time.
#[derive(Debug, Clone, PartialEq)]
pub struct EngagementSnapshot {
    /// Platform post identifier.
    pub post_id: String,
    /// Platform name.
    pub platform: String,
    /// View count.
    pub views: i64,
    /// Like count.
    pub likes: i64,
    /// Comment count.
    pub comments: i64,
    /// Share count.
    pub shares: i64,
    /// Capture time in epoch seconds.
    pub timestamp: f64,
}

impl EngagementSnapshot {
    /// Snapshot normalized metrics, truncating fractional counts.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn from_metrics(
        post_id: &str,
        platform: &str,
        metrics: &EngagementMetrics,
        timestamp: f64,
    ) -> Self {
        Self {
            post_id: post_id.to_string(),
            platform: platform.to_string(),
            views: metrics.views as i64,
            likes: metrics.likes as i64,
            comments: metrics.comments as i64,
            shares: metrics.shares as i64,
            timestamp,
        }
    }
}

/// Authenticity verdict for one post.
#[derive(Debug, Clone, PartialEq)]
pub struct SocialPostRecord {
    /// Submission the post belongs to.
    pub submission_id: String,
    /// Platform post identifier.
    pub post_id: String,
    /// Platform name.
    pub platform: String,
    /// Verification verdict.
    pub valid: bool,
    /// Check time in epoch seconds.
    pub checked_at: f64,
}

/// A typed validation verdict.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationRecord {
    /// Submission identifier.
    pub submission_id: String,
    /// Kind of check, e.g. `authenticity` or `gaming`.
    pub validation_type: String,
    /// Outcome label, e.g. `pass` or `fail`.
    pub result: String,
    /// Score in `[0, 1]`.
    pub score: f64,
    /// Record time in epoch seconds.
    pub timestamp: f64,
}

/// Persistence seam used by the coordinator.
pub trait SubmissionStore: Send + Sync {
    /// Insert the submission with `status` or update the status of an existing one.
    fn upsert_submission_status(&self, submission_id: &str, status: SubmissionStatus)
        -> Result<()>;

    /// Current status of a submission, `None` if it was never recorded.
    fn submission_status(&self, submission_id: &str) -> Result<Option<SubmissionStatus>>;

    /// Append an engagement snapshot.
    fn insert_engagement_snapshot(&self, snapshot: &EngagementSnapshot) -> Result<()>;

    /// Record the verdict for a post, replacing any earlier verdict for it.
    fn upsert_social_post(&self, record: &SocialPostRecord) -> Result<()>;

    /// Append a validation verdict.
    fn insert_validation_result(&self, record: &ValidationRecord) -> Result<()>;
}

/// Rows removed by [`Database::cleanup_old_records`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupReport {
    /// Submissions removed.
    pub submissions: usize,
    /// Engagement snapshots removed.
    pub snapshots: usize,
    /// Validation results removed.
    pub validations: usize,
    /// Social post verdicts removed.
    pub social_posts: usize,
}

impl CleanupReport {
    /// Total rows removed.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.submissions + self.snapshots + self.validations + self.social_posts
    }
}

/// Connection pool statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    /// Idle connections.
    pub idle: usize,
    /// Overflow connections opened since start.
    pub overflow_opened: u64,
}

/// SQLite-backed [`SubmissionStore`].
pub struct Database {
    pool: ConnectionPool,
    clock: Arc<dyn Clock>,
}

impl Database {
    /// Open or create the database file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or the schema cannot be created.
    pub fn open(path: &Path, pool_size: usize) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        info!("Opening SQLite database at {}", path.display());

        let pool = ConnectionPool::open(path.to_string_lossy(), pool_size.max(1))?;
        pool.get()?
            .execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        Self::init(pool)
    }

    /// Open a private in-memory database shared by all pooled connections.
    ///
    /// # Errors
    ///
    /// Returns an error if the schema cannot be created.
    pub fn open_in_memory(pool_size: usize) -> Result<Self> {
        let name = hex::encode(rand::random::<[u8; 8]>());
        let uri = format!("file:tensorflix-{name}?mode=memory&cache=shared");
        debug!("Opening in-memory SQLite database {}", uri);

        // The database lives as long as one connection stays open, so keep at least one idle.
        let pool = ConnectionPool::open(uri, pool_size.max(1))?;
        Self::init(pool)
    }

    fn init(pool: ConnectionPool) -> Result<Self> {
        schema::init_schema(&*pool.get()?)?;
        Ok(Self {
            pool,
            clock: clock::system(),
        })
    }

    /// Use `clock` for record timestamps.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Insert a new submission.
    ///
    /// # Errors
    ///
    /// Returns an error if the submission already exists.
    pub fn insert_submission(
        &self,
        submission_id: &str,
        artifact: &str,
        status: SubmissionStatus,
    ) -> Result<()> {
        let now = self.clock.now();
        self.pool.get()?.execute(
            "INSERT INTO submissions (submission_id, artifact, status, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)",
            params![submission_id, artifact, status.as_str(), now],
        )?;
        Ok(())
    }

    /// Fetch one submission.
    ///
    /// # Errors
    ///
    /// Returns an error on database failure or an unreadable status.
    pub fn submission(&self, submission_id: &str) -> Result<Option<SubmissionRecord>> {
        let conn = self.pool.get()?;
        let row = conn
            .query_row(
                "SELECT submission_id, artifact, status, created_at, updated_at
                 FROM submissions WHERE submission_id = ?1",
                [submission_id],
                raw_submission,
            )
            .optional()?;
        row.map(RawSubmission::into_record).transpose()
    }

    /// Submissions still awaiting processing, as `(submission_id, artifact)`.
    ///
    /// # Errors
    ///
    /// Returns an error on database failure.
    pub fn pending_submissions(&self) -> Result<Vec<(String, Option<String>)>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT submission_id, artifact FROM submissions
             WHERE status = ?1 ORDER BY created_at",
        )?;
        let rows = stmt
            .query_map([SubmissionStatus::Pending.as_str()], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Most recent submissions first.
    ///
    /// # Errors
    ///
    /// Returns an error on database failure or an unreadable status.
    pub fn submission_history(&self, limit: usize) -> Result<Vec<SubmissionRecord>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT submission_id, artifact, status, created_at, updated_at
             FROM submissions ORDER BY created_at DESC, id DESC LIMIT ?1",
        )?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = stmt
            .query_map([limit], raw_submission)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(RawSubmission::into_record).collect()
    }

    /// Stored verdict for a post, if it was ever checked.
    ///
    /// # Errors
    ///
    /// Returns an error on database failure.
    pub fn social_post_validity(&self, post_id: &str, platform: &str) -> Result<Option<bool>> {
        let conn = self.pool.get()?;
        let valid = conn
            .query_row(
                "SELECT valid FROM social_posts WHERE post_id = ?1 AND platform = ?2",
                [post_id, platform],
                |row| row.get(0),
            )
            .optional()?;
        Ok(valid)
    }

    /// Most recent engagement snapshot for a post.
    ///
    /// # Errors
    ///
    /// Returns an error on database failure.
    pub fn latest_snapshot(
        &self,
        post_id: &str,
        platform: &str,
    ) -> Result<Option<EngagementSnapshot>> {
        let conn = self.pool.get()?;
        let snapshot = conn
            .query_row(
                "SELECT post_id, platform, views, likes, comments, shares, timestamp
                 FROM engagement_metrics WHERE post_id = ?1 AND platform = ?2
                 ORDER BY timestamp DESC, id DESC LIMIT 1",
                [post_id, platform],
                |row| {
                    Ok(EngagementSnapshot {
                        post_id: row.get(0)?,
                        platform: row.get(1)?,
                        views: row.get(2)?,
                        likes: row.get(3)?,
                        comments: row.get(4)?,
                        shares: row.get(5)?,
                        timestamp: row.get(6)?,
                    })
                },
            )
            .optional()?;
        Ok(snapshot)
    }

    /// All validation verdicts for a submission, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error on database failure.
    pub fn validation_results(&self, submission_id: &str) -> Result<Vec<ValidationRecord>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT submission_id, validation_type, result, score, timestamp
             FROM validation_results WHERE submission_id = ?1 ORDER BY timestamp, id",
        )?;
        let rows = stmt
            .query_map([submission_id], |row| {
                Ok(ValidationRecord {
                    submission_id: row.get(0)?,
                    validation_type: row.get(1)?,
                    result: row.get(2)?,
                    score: row.get(3)?,
                    timestamp: row.get(4)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Delete records older than `max_age`.
    ///
    /// # Errors
    ///
    /// Returns an error on database failure; the deletion is all-or-nothing.
    pub fn cleanup_old_records(&self, max_age: Duration) -> Result<CleanupReport> {
        let cutoff = self.clock.now() - max_age.as_secs_f64();
        let mut conn = self.pool.get()?;
        let tx = conn.transaction()?;
        let report = CleanupReport {
            submissions: tx.execute("DELETE FROM submissions WHERE created_at < ?1", [cutoff])?,
            snapshots: tx.execute("DELETE FROM engagement_metrics WHERE timestamp < ?1", [cutoff])?,
            validations: tx
                .execute("DELETE FROM validation_results WHERE timestamp < ?1", [cutoff])?,
            social_posts: tx.execute("DELETE FROM social_posts WHERE checked_at < ?1", [cutoff])?,
        };
        tx.commit()?;

        if report.total() > 0 {
            info!("Removed {} database records older than {:?}", report.total(), max_age);
        }
        Ok(report)
    }

    /// Write a consistent copy of the database to `dest`.
    ///
    /// # Errors
    ///
    /// Returns an error if `dest` already exists or the copy fails.
    pub fn backup(&self, dest: &Path) -> Result<()> {
        if dest.exists() {
            return Err(Error::Invalid(format!(
                "backup target {} already exists",
                dest.display()
            )));
        }
        let target = dest.to_string_lossy().into_owned();
        self.pool.get()?.execute("VACUUM INTO ?1", [target])?;
        info!("Backed up database to {}", dest.display());
        Ok(())
    }

    /// Connection pool statistics.
    #[must_use]
    pub fn pool_stats(&self) -> PoolStats {
        PoolStats {
            idle: self.pool.idle_count(),
            overflow_opened: self.pool.overflow_opened(),
        }
    }
}

impl SubmissionStore for Database {
    fn upsert_submission_status(
        &self,
        submission_id: &str,
        status: SubmissionStatus,
    ) -> Result<()> {
        let now = self.clock.now();
        self.pool.get()?.execute(
            "INSERT INTO submissions (submission_id, status, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?3)
             ON CONFLICT(submission_id) DO UPDATE
             SET status = excluded.status, updated_at = excluded.updated_at",
            params![submission_id, status.as_str(), now],
        )?;
        debug!("Submission {} is now {}", submission_id, status);
        Ok(())
    }

    fn submission_status(&self, submission_id: &str) -> Result<Option<SubmissionStatus>> {
        Ok(self.submission(submission_id)?.map(|record| record.status))
    }

    fn insert_engagement_snapshot(&self, snapshot: &EngagementSnapshot) -> Result<()> {
        self.pool.get()?.execute(
            "INSERT INTO engagement_metrics
             (post_id, platform, views, likes, comments, shares, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                snapshot.post_id,
                snapshot.platform,
                snapshot.views,
                snapshot.likes,
                snapshot.comments,
                snapshot.shares,
                snapshot.timestamp,
            ],
        )?;
        Ok(())
    }

    fn upsert_social_post(&self, record: &SocialPostRecord) -> Result<()> {
        self.pool.get()?.execute(
            "INSERT INTO social_posts (submission_id, post_id, platform, valid, checked_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(post_id, platform) DO UPDATE
             SET submission_id = excluded.submission_id,
                 valid = excluded.valid,
                 checked_at = excluded.checked_at",
            params![
                record.submission_id,
                record.post_id,
                record.platform,
                record.valid,
                record.checked_at,
            ],
        )?;
        Ok(())
    }

    fn insert_validation_result(&self, record: &ValidationRecord) -> Result<()> {
        self.pool.get()?.execute(
            "INSERT INTO validation_results
             (submission_id, validation_type, result, score, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                record.submission_id,
                record.validation_type,
                record.result,
                record.score,
                record.timestamp,
            ],
        )?;
        Ok(())
    }
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("pool", &self.pool_stats())
            .finish_non_exhaustive()
    }
}

struct RawSubmission {
    submission_id: String,
    artifact: Option<String>,
    status: String,
    created_at: f64,
    updated_at: f64,
}

impl RawSubmission {
    fn into_record(self) -> Result<SubmissionRecord> {
        Ok(SubmissionRecord {
            status: self.status.parse()?,
            submission_id: self.submission_id,
            artifact: self.artifact,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

fn raw_submission(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawSubmission> {
    Ok(RawSubmission {
        submission_id: row.get(0)?,
        artifact: row.get(1)?,
        status: row.get(2)?,
        created_at: row.get(3)?,
        updated_at: row.get(4)?,
    })
}
