use chrono::{DateTime, Duration, Utc};
use mobc::{Manager, Pool};
use rusqlite::{params, Connection, Result as SqliteResult};
use serde::Serialize;
use std::path::Path;
use tracing::{debug, error, info};

use crate::ingest::dedupe::content_hash;
use crate::models::{ContactStatus, Lead, LeadQuality};
use crate::outreach::state::{CloseReason, OutreachState};

fn log_rusqlite_error(context: &str, err: &rusqlite::Error) {
    error!("🔥 SQLite error in {}: {:?}", context, err);
}

pub struct SqliteManager {
    db_path: String,
}

impl SqliteManager {
    pub fn new(db_path: String) -> Self {
        debug!("🔧 Creating SqliteManager for path: {}", db_path);
        Self { db_path }
    }
}

#[async_trait::async_trait]
impl Manager for SqliteManager {
    type Connection = Connection;
    type Error = rusqlite::Error;

    async fn connect(&self) -> Result<Self::Connection, Self::Error> {
        debug!("🔌 Opening database: {}", self.db_path);
        let conn = Connection::open(&self.db_path)?;

        // Some PRAGMA statements return a row; query_row swallows it
        let exec_pragma = |conn: &Connection, pragma: &str| -> Result<(), rusqlite::Error> {
            match conn.execute(pragma, []) {
                Ok(_) => Ok(()),
                Err(rusqlite::Error::ExecuteReturnedResults) => {
                    conn.query_row(pragma, [], |_| Ok(())).map(|_| ())
                }
                Err(e) => Err(e),
            }
        };

        exec_pragma(&conn, "PRAGMA journal_mode=WAL")?;
        exec_pragma(&conn, "PRAGMA synchronous=NORMAL")?;
        exec_pragma(&conn, "PRAGMA cache_size=1000000")?;
        exec_pragma(&conn, "PRAGMA temp_store=memory")?;

        if let Err(e) = init_database(&conn) {
            log_rusqlite_error("init_database", &e);
            return Err(e);
        }
        debug!("✅ Database ready");
        Ok(conn)
    }

    async fn check(&self, conn: Self::Connection) -> Result<Self::Connection, Self::Error> {
        conn.query_row("SELECT 1", [], |_| Ok(()))?;
        Ok(conn)
    }
}

pub fn init_database(conn: &Connection) -> SqliteResult<()> {
    create_leads_table(conn)?;
    create_sent_emails_table(conn)?;
    create_daily_counts_table(conn)?;
    create_indexes(conn)?;
    Ok(())
}

pub type DbPool = Pool<SqliteManager>;

pub async fn create_db_pool(
    db_path: &str,
) -> Result<DbPool, Box<dyn std::error::Error + Send + Sync>> {
    if let Some(parent) = Path::new(db_path).parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let manager = SqliteManager::new(db_path.to_string());
    let pool = Pool::builder().max_open(10).max_idle(5).build(manager);

    info!("✓ SQLite connection pool created: {}", db_path);
    Ok(pool)
}

fn create_leads_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute(
        r#"
        CREATE TABLE IF NOT EXISTS leads (
            id TEXT PRIMARY KEY,
            business_name TEXT NOT NULL,
            contact_name TEXT,
            category TEXT,
            phone_raw TEXT,
            phone_e164 TEXT,
            email TEXT,
            website TEXT,
            address TEXT,
            rating REAL,
            review_count INTEGER,
            lead_quality TEXT NOT NULL,
            scraped_date TEXT,
            tags TEXT,
            contact_status TEXT NOT NULL DEFAULT 'never_contacted',
            last_contacted TEXT,
            created_at TEXT NOT NULL,
            last_updated TEXT NOT NULL
        )
        "#,
        [],
    )?;
    Ok(())
}

fn create_sent_emails_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute(
        r#"
        CREATE TABLE IF NOT EXISTS sent_emails (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            email TEXT NOT NULL,
            thread_id TEXT NOT NULL,
            subject TEXT NOT NULL,
            state TEXT NOT NULL,
            sent_at TEXT,
            follow_up_at TEXT,
            follow_up_count INTEGER NOT NULL DEFAULT 0,
            last_follow_up_at TEXT,
            replied_at TEXT,
            closed_at TEXT,
            close_reason TEXT,
            opened_count INTEGER NOT NULL DEFAULT 0,
            clicked_count INTEGER NOT NULL DEFAULT 0,
            interest_score INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            last_updated TEXT NOT NULL,
            UNIQUE(user_id, email)
        )
        "#,
        [],
    )?;
    Ok(())
}

fn create_daily_counts_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute(
        r#"
        CREATE TABLE IF NOT EXISTS daily_email_counts (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            day TEXT NOT NULL,
            sent_count INTEGER NOT NULL DEFAULT 0,
            quota INTEGER NOT NULL,
            created_at TEXT NOT NULL,
            last_updated TEXT NOT NULL
        )
        "#,
        [],
    )?;
    Ok(())
}

fn create_indexes(conn: &Connection) -> SqliteResult<()> {
    let indexes = [
        "CREATE INDEX IF NOT EXISTS idx_leads_email ON leads(email)",
        "CREATE INDEX IF NOT EXISTS idx_leads_quality ON leads(lead_quality)",
        "CREATE INDEX IF NOT EXISTS idx_leads_status ON leads(contact_status)",
        "CREATE INDEX IF NOT EXISTS idx_sent_emails_user ON sent_emails(user_id)",
        "CREATE INDEX IF NOT EXISTS idx_sent_emails_state ON sent_emails(state)",
        "CREATE INDEX IF NOT EXISTS idx_sent_emails_thread ON sent_emails(thread_id)",
        "CREATE INDEX IF NOT EXISTS idx_sent_emails_follow_up_at ON sent_emails(follow_up_at)",
        "CREATE INDEX IF NOT EXISTS idx_daily_counts_user_day ON daily_email_counts(user_id, day)",
    ];

    for index_sql in indexes.iter() {
        conn.execute(index_sql, [])?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Leads

pub async fn upsert_lead(
    pool: &DbPool,
    lead: &Lead,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let conn = pool.get().await?;
    upsert_lead_conn(&conn, lead)
}

pub fn upsert_lead_conn(
    conn: &Connection,
    lead: &Lead,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let now = Utc::now();
    let id = content_hash(lead);

    // Scraped fields refresh on re-ingest; contact_status and
    // last_contacted belong to the outreach side and are preserved.
    match conn.execute(
        r#"
        INSERT INTO leads (
            id, business_name, contact_name, category, phone_raw, phone_e164,
            email, website, address, rating, review_count, lead_quality,
            scraped_date, tags, contact_status, created_at, last_updated
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?16)
        ON CONFLICT (id) DO UPDATE SET
            contact_name = COALESCE(NULLIF(excluded.contact_name, ''), contact_name),
            category = COALESCE(NULLIF(excluded.category, ''), category),
            phone_raw = COALESCE(NULLIF(excluded.phone_raw, ''), phone_raw),
            website = COALESCE(NULLIF(excluded.website, ''), website),
            address = COALESCE(NULLIF(excluded.address, ''), address),
            rating = COALESCE(excluded.rating, rating),
            review_count = COALESCE(excluded.review_count, review_count),
            lead_quality = excluded.lead_quality,
            scraped_date = COALESCE(NULLIF(excluded.scraped_date, ''), scraped_date),
            tags = COALESCE(NULLIF(excluded.tags, ''), tags),
            last_updated = excluded.last_updated
        "#,
        params![
            id,
            lead.business_name,
            lead.contact_name.as_deref().unwrap_or(""),
            lead.category.as_deref().unwrap_or(""),
            lead.phone_raw.as_deref().unwrap_or(""),
            lead.phone_e164.as_deref().unwrap_or(""),
            lead.email.as_deref().unwrap_or(""),
            lead.website.as_deref().unwrap_or(""),
            lead.address.as_deref().unwrap_or(""),
            lead.rating,
            lead.review_count,
            lead.lead_quality.as_str(),
            lead.scraped_date.as_deref().unwrap_or(""),
            lead.tags.join(","),
            lead.contact_status.as_str(),
            now.to_rfc3339(),
        ],
    ) {
        Ok(_) => Ok(()),
        Err(e) => {
            log_rusqlite_error("upsert_lead", &e);
            Err(Box::new(e))
        }
    }
}

fn lead_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Lead> {
    let opt = |idx: usize| -> rusqlite::Result<Option<String>> {
        Ok(row
            .get::<_, Option<String>>(idx)?
            .filter(|s| !s.is_empty()))
    };

    let quality: String = row.get(11)?;
    let status: String = row.get(14)?;
    let tags: Option<String> = opt(13)?;

    Ok(Lead {
        business_name: row.get(1)?,
        contact_name: opt(2)?,
        category: opt(3)?,
        phone_raw: opt(4)?,
        phone_e164: opt(5)?,
        email: opt(6)?,
        website: opt(7)?,
        address: opt(8)?,
        rating: row.get(9)?,
        review_count: row.get(10)?,
        lead_quality: LeadQuality::parse(&quality),
        scraped_date: opt(12)?,
        tags: tags
            .map(|t| t.split(',').map(str::to_string).collect())
            .unwrap_or_default(),
        contact_status: ContactStatus::parse(&status),
    })
}

const LEAD_COLUMNS: &str = "id, business_name, contact_name, category, phone_raw, phone_e164, \
     email, website, address, rating, review_count, lead_quality, \
     scraped_date, tags, contact_status, last_contacted";

pub async fn get_leads(
    pool: &DbPool,
    quality: Option<LeadQuality>,
    status: Option<ContactStatus>,
    limit: usize,
    offset: usize,
) -> Result<Vec<Lead>, Box<dyn std::error::Error + Send + Sync>> {
    let conn = pool.get().await?;

    let mut where_conditions: Vec<String> = Vec::new();
    let mut params_vec: Vec<String> = Vec::new();
    if let Some(q) = quality {
        where_conditions.push("lead_quality = ?".to_string());
        params_vec.push(q.as_str().to_string());
    }
    if let Some(s) = status {
        where_conditions.push("contact_status = ?".to_string());
        params_vec.push(s.as_str().to_string());
    }
    let where_clause = if where_conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", where_conditions.join(" AND "))
    };

    let query = format!(
        "SELECT {} FROM leads {} ORDER BY \
         CASE lead_quality WHEN 'HOT' THEN 0 WHEN 'WARM' THEN 1 ELSE 2 END, \
         business_name LIMIT {} OFFSET {}",
        LEAD_COLUMNS, where_clause, limit, offset
    );

    let mut stmt = conn.prepare(&query)?;
    let lead_iter = stmt.query_map(rusqlite::params_from_iter(params_vec.iter()), lead_from_row)?;

    let mut leads = Vec::new();
    for lead in lead_iter {
        leads.push(lead?);
    }
    debug!("✅ Fetched {} leads", leads.len());
    Ok(leads)
}

pub async fn get_leads_by_emails(
    pool: &DbPool,
    emails: &[String],
) -> Result<Vec<Lead>, Box<dyn std::error::Error + Send + Sync>> {
    let conn = pool.get().await?;
    let mut leads = Vec::new();

    let query = format!("SELECT {} FROM leads WHERE email = ?", LEAD_COLUMNS);
    let mut stmt = conn.prepare(&query)?;
    for email in emails {
        let mut iter = stmt.query_map([email.to_lowercase()], lead_from_row)?;
        if let Some(lead) = iter.next() {
            leads.push(lead?);
        }
    }
    Ok(leads)
}

pub async fn mark_lead_contacted(
    pool: &DbPool,
    email: &str,
    at: DateTime<Utc>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let conn = pool.get().await?;
    conn.execute(
        "UPDATE leads SET contact_status = 'contacted', last_contacted = ?1, last_updated = ?1 \
         WHERE email = ?2",
        params![at.to_rfc3339(), email.to_lowercase()],
    )?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Sent email records

#[derive(Debug, Clone, Serialize)]
pub struct SentEmailRecord {
    pub id: String,
    pub user_id: String,
    pub email: String,
    pub thread_id: String,
    pub subject: String,
    pub state: OutreachState,
    pub follow_up_count: u8,
    pub opened_count: i64,
    pub clicked_count: i64,
    pub interest_score: i64,
}

pub fn record_id(user_id: &str, email: &str) -> String {
    format!("{}_{}", user_id, email.to_lowercase())
}

pub async fn insert_sent_record(
    pool: &DbPool,
    record: &SentEmailRecord,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let conn = pool.get().await?;
    insert_sent_record_conn(&conn, record)
}

pub fn insert_sent_record_conn(
    conn: &Connection,
    record: &SentEmailRecord,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let now = Utc::now().to_rfc3339();
    let (sent_at, follow_up_at) = match &record.state {
        OutreachState::Sent {
            sent_at,
            follow_up_at,
        } => (sent_at.to_rfc3339(), follow_up_at.to_rfc3339()),
        other => return Err(format!("new record must be in sent state, got {}", other.tag()).into()),
    };

    conn.execute(
        r#"
        INSERT INTO sent_emails (
            id, user_id, email, thread_id, subject, state, sent_at,
            follow_up_at, follow_up_count, opened_count, clicked_count,
            interest_score, created_at, last_updated
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 0, 0, 0, 0, ?9, ?9)
        "#,
        params![
            record.id,
            record.user_id,
            record.email.to_lowercase(),
            record.thread_id,
            record.subject,
            record.state.tag(),
            sent_at,
            follow_up_at,
            now,
        ],
    )?;
    Ok(())
}

fn parse_ts(s: Option<String>, column: &str) -> Result<DateTime<Utc>, String> {
    let s = s.ok_or_else(|| format!("missing {}", column))?;
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("bad {}: {}", column, e))
}

fn record_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<SentEmailRecord> {
    let tag: String = row.get(5)?;
    let sent_at: Option<String> = row.get(6)?;
    let follow_up_at: Option<String> = row.get(7)?;
    let follow_up_count: u8 = row.get::<_, i64>(8)?.clamp(0, u8::MAX as i64) as u8;
    let last_follow_up_at: Option<String> = row.get(9)?;
    let replied_at: Option<String> = row.get(10)?;
    let closed_at: Option<String> = row.get(11)?;
    let close_reason: Option<String> = row.get(12)?;

    let bad = |msg: String| {
        rusqlite::Error::InvalidColumnType(5, msg, rusqlite::types::Type::Text)
    };

    let state = match tag.as_str() {
        "sent" => OutreachState::Sent {
            sent_at: parse_ts(sent_at, "sent_at").map_err(bad)?,
            follow_up_at: parse_ts(follow_up_at, "follow_up_at").map_err(bad)?,
        },
        "followed_up" => OutreachState::FollowedUp {
            sent_at: parse_ts(sent_at, "sent_at").map_err(bad)?,
            count: follow_up_count,
            last_follow_up_at: parse_ts(last_follow_up_at, "last_follow_up_at").map_err(bad)?,
            follow_up_at: parse_ts(follow_up_at, "follow_up_at").map_err(bad)?,
        },
        "replied" => OutreachState::Replied {
            sent_at: parse_ts(sent_at, "sent_at").map_err(bad)?,
            replied_at: parse_ts(replied_at, "replied_at").map_err(bad)?,
        },
        "closed" => OutreachState::Closed {
            closed_at: parse_ts(closed_at, "closed_at").map_err(bad)?,
            reason: close_reason
                .as_deref()
                .and_then(CloseReason::parse)
                .ok_or_else(|| bad("bad close_reason".to_string()))?,
        },
        "new" => OutreachState::New,
        other => return Err(bad(format!("unknown state tag '{}'", other))),
    };

    Ok(SentEmailRecord {
        id: row.get(0)?,
        user_id: row.get(1)?,
        email: row.get(2)?,
        thread_id: row.get(3)?,
        subject: row.get(4)?,
        state,
        follow_up_count,
        opened_count: row.get(13)?,
        clicked_count: row.get(14)?,
        interest_score: row.get(15)?,
    })
}

const RECORD_COLUMNS: &str = "id, user_id, email, thread_id, subject, state, sent_at, \
     follow_up_at, follow_up_count, last_follow_up_at, replied_at, closed_at, \
     close_reason, opened_count, clicked_count, interest_score";

pub async fn get_sent_record(
    pool: &DbPool,
    user_id: &str,
    email: &str,
) -> Result<Option<SentEmailRecord>, Box<dyn std::error::Error + Send + Sync>> {
    let conn = pool.get().await?;
    get_sent_record_conn(&conn, user_id, email)
}

pub fn get_sent_record_conn(
    conn: &Connection,
    user_id: &str,
    email: &str,
) -> Result<Option<SentEmailRecord>, Box<dyn std::error::Error + Send + Sync>> {
    let query = format!("SELECT {} FROM sent_emails WHERE id = ?", RECORD_COLUMNS);
    let mut stmt = conn.prepare(&query)?;
    let mut iter = stmt.query_map([record_id(user_id, email)], record_from_row)?;
    match iter.next() {
        Some(record) => Ok(Some(record?)),
        None => Ok(None),
    }
}

pub async fn get_record_by_id(
    pool: &DbPool,
    id: &str,
) -> Result<Option<SentEmailRecord>, Box<dyn std::error::Error + Send + Sync>> {
    let conn = pool.get().await?;
    let query = format!("SELECT {} FROM sent_emails WHERE id = ?", RECORD_COLUMNS);
    let mut stmt = conn.prepare(&query)?;
    let mut iter = stmt.query_map([id], record_from_row)?;
    match iter.next() {
        Some(record) => Ok(Some(record?)),
        None => Ok(None),
    }
}

pub async fn get_record_by_thread(
    pool: &DbPool,
    thread_id: &str,
) -> Result<Option<SentEmailRecord>, Box<dyn std::error::Error + Send + Sync>> {
    let conn = pool.get().await?;
    let query = format!("SELECT {} FROM sent_emails WHERE thread_id = ?", RECORD_COLUMNS);
    let mut stmt = conn.prepare(&query)?;
    let mut iter = stmt.query_map([thread_id], record_from_row)?;
    match iter.next() {
        Some(record) => Ok(Some(record?)),
        None => Ok(None),
    }
}

/// Persist a state transition. The row is a projection of the enum; the
/// scalar columns are refreshed from whichever variant is current.
pub async fn update_record_state(
    pool: &DbPool,
    id: &str,
    state: &OutreachState,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let conn = pool.get().await?;
    update_record_state_conn(&conn, id, state)
}

pub fn update_record_state_conn(
    conn: &Connection,
    id: &str,
    state: &OutreachState,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let now = Utc::now().to_rfc3339();

    let (follow_up_at, follow_up_count, last_follow_up_at, replied_at, closed_at, close_reason) =
        match state {
            OutreachState::Sent { follow_up_at, .. } => {
                (Some(follow_up_at.to_rfc3339()), None, None, None, None, None)
            }
            OutreachState::FollowedUp {
                count,
                last_follow_up_at,
                follow_up_at,
                ..
            } => (
                Some(follow_up_at.to_rfc3339()),
                Some(*count as i64),
                Some(last_follow_up_at.to_rfc3339()),
                None,
                None,
                None,
            ),
            OutreachState::Replied { replied_at, .. } => (
                None,
                None,
                None,
                Some(replied_at.to_rfc3339()),
                None,
                None,
            ),
            OutreachState::Closed { closed_at, reason } => (
                None,
                None,
                None,
                None,
                Some(closed_at.to_rfc3339()),
                Some(reason.as_str().to_string()),
            ),
            OutreachState::New => (None, None, None, None, None, None),
        };

    // follow_up_count only moves forward; a close after the third
    // follow-up keeps the counter at its final value.
    conn.execute(
        r#"
        UPDATE sent_emails SET
            state = ?2,
            follow_up_at = ?3,
            follow_up_count = COALESCE(?4, follow_up_count),
            last_follow_up_at = COALESCE(?5, last_follow_up_at),
            replied_at = COALESCE(?6, replied_at),
            closed_at = COALESCE(?7, closed_at),
            close_reason = COALESCE(?8, close_reason),
            last_updated = ?9
        WHERE id = ?1
        "#,
        params![
            id,
            state.tag(),
            follow_up_at,
            follow_up_count,
            last_follow_up_at,
            replied_at,
            closed_at,
            close_reason,
            now,
        ],
    )?;
    Ok(())
}

/// Records whose follow-up is due, most interested recipients first.
pub async fn get_followup_candidates(
    pool: &DbPool,
    user_id: &str,
    now: DateTime<Utc>,
) -> Result<Vec<SentEmailRecord>, Box<dyn std::error::Error + Send + Sync>> {
    let conn = pool.get().await?;
    let query = format!(
        "SELECT {} FROM sent_emails \
         WHERE user_id = ?1 AND state IN ('sent', 'followed_up') AND follow_up_at <= ?2 \
         ORDER BY interest_score DESC, follow_up_at ASC",
        RECORD_COLUMNS
    );
    let mut stmt = conn.prepare(&query)?;
    let iter = stmt.query_map(params![user_id, now.to_rfc3339()], record_from_row)?;

    let mut records = Vec::new();
    for record in iter {
        records.push(record?);
    }
    Ok(records)
}

/// All records still awaiting a reply, for the reply-check poll.
pub async fn get_open_records(
    pool: &DbPool,
    user_id: &str,
) -> Result<Vec<SentEmailRecord>, Box<dyn std::error::Error + Send + Sync>> {
    let conn = pool.get().await?;
    let query = format!(
        "SELECT {} FROM sent_emails \
         WHERE user_id = ?1 AND state IN ('sent', 'followed_up')",
        RECORD_COLUMNS
    );
    let mut stmt = conn.prepare(&query)?;
    let iter = stmt.query_map([user_id], record_from_row)?;

    let mut records = Vec::new();
    for record in iter {
        records.push(record?);
    }
    Ok(records)
}

pub async fn record_open(
    pool: &DbPool,
    id: &str,
) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
    let conn = pool.get().await?;
    let changed = conn.execute(
        "UPDATE sent_emails SET \
             opened_count = opened_count + 1, \
             interest_score = MIN(100, interest_score + 5), \
             last_updated = ?2 \
         WHERE id = ?1",
        params![id, Utc::now().to_rfc3339()],
    )?;
    Ok(changed > 0)
}

pub async fn record_click(
    pool: &DbPool,
    id: &str,
) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
    let conn = pool.get().await?;
    let changed = conn.execute(
        "UPDATE sent_emails SET \
             clicked_count = clicked_count + 1, \
             interest_score = MIN(100, interest_score + 15), \
             last_updated = ?2 \
         WHERE id = ?1",
        params![id, Utc::now().to_rfc3339()],
    )?;
    Ok(changed > 0)
}

/// The follow-up counter tracks sends, not states, so the closing
/// follow-up still counts.
pub async fn increment_follow_up_count(
    pool: &DbPool,
    id: &str,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let conn = pool.get().await?;
    increment_follow_up_count_conn(&conn, id)
}

pub fn increment_follow_up_count_conn(
    conn: &Connection,
    id: &str,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    conn.execute(
        "UPDATE sent_emails SET follow_up_count = follow_up_count + 1, last_updated = ?2 \
         WHERE id = ?1",
        params![id, Utc::now().to_rfc3339()],
    )?;
    Ok(())
}

pub async fn bump_interest_for_reply(
    pool: &DbPool,
    id: &str,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let conn = pool.get().await?;
    conn.execute(
        "UPDATE sent_emails SET \
             interest_score = MIN(100, interest_score + 50), \
             last_updated = ?2 \
         WHERE id = ?1",
        params![id, Utc::now().to_rfc3339()],
    )?;
    Ok(())
}

/// Delete terminal records 30+ days past closure. Returns how many went.
pub async fn purge_closed_records(
    pool: &DbPool,
    now: DateTime<Utc>,
    retention: Duration,
) -> Result<usize, Box<dyn std::error::Error + Send + Sync>> {
    let conn = pool.get().await?;
    purge_closed_records_conn(&conn, now, retention)
}

pub fn purge_closed_records_conn(
    conn: &Connection,
    now: DateTime<Utc>,
    retention: Duration,
) -> Result<usize, Box<dyn std::error::Error + Send + Sync>> {
    let cutoff = (now - retention).to_rfc3339();
    let deleted = conn.execute(
        "DELETE FROM sent_emails WHERE \
             (state = 'replied' AND replied_at <= ?1) OR \
             (state = 'closed' AND closed_at <= ?1)",
        [cutoff],
    )?;
    if deleted > 0 {
        info!("🧹 Purged {} closed outreach records", deleted);
    }
    Ok(deleted)
}

// ---------------------------------------------------------------------------
// Daily quota

/// Atomically reserve one send slot for the user's current day.
///
/// A single conditional upsert: the counter row is created on first use and
/// incremented only while below the quota, so concurrent requests cannot
/// overshoot. Returns false when the day's budget is exhausted.
pub async fn try_reserve_send_slot(
    pool: &DbPool,
    user_id: &str,
    day: &str,
    quota: i64,
) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
    let conn = pool.get().await?;
    try_reserve_send_slot_conn(&conn, user_id, day, quota)
}

pub fn try_reserve_send_slot_conn(
    conn: &Connection,
    user_id: &str,
    day: &str,
    quota: i64,
) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
    if quota <= 0 {
        return Ok(false);
    }

    let id = format!("{}_{}", user_id, day);
    let now = Utc::now().to_rfc3339();

    let changed = conn.execute(
        r#"
        INSERT INTO daily_email_counts (id, user_id, day, sent_count, quota, created_at, last_updated)
        VALUES (?1, ?2, ?3, 1, ?4, ?5, ?5)
        ON CONFLICT (id) DO UPDATE SET
            sent_count = sent_count + 1,
            last_updated = excluded.last_updated
        WHERE daily_email_counts.sent_count < daily_email_counts.quota
        "#,
        params![id, user_id, day, quota, now],
    )?;

    Ok(changed > 0)
}

pub async fn get_daily_sent(
    pool: &DbPool,
    user_id: &str,
    day: &str,
) -> Result<i64, Box<dyn std::error::Error + Send + Sync>> {
    let conn = pool.get().await?;
    get_daily_sent_conn(&conn, user_id, day)
}

pub fn get_daily_sent_conn(
    conn: &Connection,
    user_id: &str,
    day: &str,
) -> Result<i64, Box<dyn std::error::Error + Send + Sync>> {
    let count = conn
        .query_row(
            "SELECT sent_count FROM daily_email_counts WHERE id = ?",
            [format!("{}_{}", user_id, day)],
            |row| row.get::<_, i64>(0),
        )
        .unwrap_or(0);
    Ok(count)
}

// ---------------------------------------------------------------------------
// Stats

#[derive(Debug, Serialize)]
pub struct DatabaseStats {
    pub total_leads: i64,
    pub leads_with_email: i64,
    pub leads_with_phone: i64,
    pub hot_leads: i64,
    pub warm_leads: i64,
    pub cold_leads: i64,
    pub contacted_leads: i64,
    pub records_open: i64,
    pub records_replied: i64,
    pub records_closed: i64,
    pub total_opens: i64,
    pub total_clicks: i64,
    pub avg_interest_score: f64,
}

pub async fn get_database_stats(
    pool: &DbPool,
) -> Result<DatabaseStats, Box<dyn std::error::Error + Send + Sync>> {
    let conn = pool.get().await?;

    let count = |query: &str| -> Result<i64, rusqlite::Error> {
        conn.query_row(query, [], |row| row.get(0))
    };

    let stats = DatabaseStats {
        total_leads: count("SELECT COUNT(*) FROM leads")?,
        leads_with_email: count("SELECT COUNT(*) FROM leads WHERE email IS NOT NULL AND email != ''")?,
        leads_with_phone: count(
            "SELECT COUNT(*) FROM leads WHERE phone_e164 IS NOT NULL AND phone_e164 != ''",
        )?,
        hot_leads: count("SELECT COUNT(*) FROM leads WHERE lead_quality = 'HOT'")?,
        warm_leads: count("SELECT COUNT(*) FROM leads WHERE lead_quality = 'WARM'")?,
        cold_leads: count("SELECT COUNT(*) FROM leads WHERE lead_quality = 'COLD'")?,
        contacted_leads: count("SELECT COUNT(*) FROM leads WHERE contact_status = 'contacted'")?,
        records_open: count(
            "SELECT COUNT(*) FROM sent_emails WHERE state IN ('sent', 'followed_up')",
        )?,
        records_replied: count("SELECT COUNT(*) FROM sent_emails WHERE state = 'replied'")?,
        records_closed: count("SELECT COUNT(*) FROM sent_emails WHERE state = 'closed'")?,
        total_opens: count("SELECT COALESCE(SUM(opened_count), 0) FROM sent_emails")?,
        total_clicks: count("SELECT COALESCE(SUM(clicked_count), 0) FROM sent_emails")?,
        avg_interest_score: conn
            .query_row(
                "SELECT AVG(CAST(interest_score AS REAL)) FROM sent_emails",
                [],
                |row| row.get::<_, Option<f64>>(0),
            )?
            .unwrap_or(0.0),
    };

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ContactStatus, LeadQuality};
    use chrono::TimeZone;

    fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        init_database(&conn).unwrap();
        conn
    }

    fn lead(name: &str, email: &str) -> Lead {
        Lead {
            business_name: name.to_string(),
            contact_name: None,
            category: None,
            phone_raw: None,
            phone_e164: Some("+919876543210".to_string()),
            email: Some(email.to_string()),
            website: None,
            address: None,
            rating: None,
            review_count: None,
            lead_quality: LeadQuality::Warm,
            scraped_date: None,
            tags: Vec::new(),
            contact_status: ContactStatus::NeverContacted,
        }
    }

    #[test]
    fn quota_reservation_stops_at_the_ceiling() {
        let conn = test_conn();
        for _ in 0..3 {
            assert!(try_reserve_send_slot_conn(&conn, "u1", "2025-06-01", 3).unwrap());
        }
        // at the limit: rejected, and the counter does not move
        assert!(!try_reserve_send_slot_conn(&conn, "u1", "2025-06-01", 3).unwrap());
        assert_eq!(get_daily_sent_conn(&conn, "u1", "2025-06-01").unwrap(), 3);
    }

    #[test]
    fn quota_is_scoped_per_user_and_day() {
        let conn = test_conn();
        assert!(try_reserve_send_slot_conn(&conn, "u1", "2025-06-01", 1).unwrap());
        assert!(!try_reserve_send_slot_conn(&conn, "u1", "2025-06-01", 1).unwrap());
        // other user, other day: unaffected
        assert!(try_reserve_send_slot_conn(&conn, "u2", "2025-06-01", 1).unwrap());
        assert!(try_reserve_send_slot_conn(&conn, "u1", "2025-06-02", 1).unwrap());
    }

    #[test]
    fn zero_quota_rejects_without_inserting() {
        let conn = test_conn();
        assert!(!try_reserve_send_slot_conn(&conn, "u1", "2025-06-01", 0).unwrap());
        assert_eq!(get_daily_sent_conn(&conn, "u1", "2025-06-01").unwrap(), 0);
    }

    #[test]
    fn reingest_upserts_instead_of_duplicating() {
        let conn = test_conn();
        upsert_lead_conn(&conn, &lead("Acme", "a@b.com")).unwrap();
        upsert_lead_conn(&conn, &lead("Acme", "a@b.com")).unwrap();
        let total: i64 = conn
            .query_row("SELECT COUNT(*) FROM leads", [], |r| r.get(0))
            .unwrap();
        assert_eq!(total, 1);
    }

    #[test]
    fn record_round_trips_through_state_transitions() {
        let conn = test_conn();
        let t0 = Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap();
        let interval = Duration::hours(48);

        let state = OutreachState::New.send(t0, interval).unwrap();
        let record = SentEmailRecord {
            id: record_id("u1", "a@b.com"),
            user_id: "u1".to_string(),
            email: "a@b.com".to_string(),
            thread_id: "thread-1".to_string(),
            subject: "Hello".to_string(),
            state: state.clone(),
            follow_up_count: 0,
            opened_count: 0,
            clicked_count: 0,
            interest_score: 0,
        };
        insert_sent_record_conn(&conn, &record).unwrap();

        let loaded = get_sent_record_conn(&conn, "u1", "a@b.com").unwrap().unwrap();
        assert_eq!(loaded.state, state);

        // follow up twice, then verify the stored projection
        let fu1 = state.follow_up(t0 + interval, interval, 3).unwrap();
        update_record_state_conn(&conn, &record.id, &fu1).unwrap();
        let fu2 = fu1
            .follow_up(t0 + interval * 2, interval, 3)
            .unwrap();
        update_record_state_conn(&conn, &record.id, &fu2).unwrap();

        let loaded = get_sent_record_conn(&conn, "u1", "a@b.com").unwrap().unwrap();
        assert_eq!(loaded.follow_up_count, 2);
        assert_eq!(loaded.state, fu2);

        // the third follow-up closes the record and still counts as a send
        let closed = fu2.follow_up(t0 + interval * 3, interval, 3).unwrap();
        update_record_state_conn(&conn, &record.id, &closed).unwrap();
        increment_follow_up_count_conn(&conn, &record.id).unwrap();
        let loaded = get_sent_record_conn(&conn, "u1", "a@b.com").unwrap().unwrap();
        assert_eq!(loaded.state.tag(), "closed");
        assert_eq!(loaded.follow_up_count, 3);
    }

    #[test]
    fn purge_removes_only_expired_terminal_records() {
        let conn = test_conn();
        let t0 = Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap();
        let interval = Duration::hours(48);

        let mk = |id: &str, email: &str| SentEmailRecord {
            id: id.to_string(),
            user_id: "u1".to_string(),
            email: email.to_string(),
            thread_id: format!("thread-{}", email),
            subject: "Hello".to_string(),
            state: OutreachState::New.send(t0, interval).unwrap(),
            follow_up_count: 0,
            opened_count: 0,
            clicked_count: 0,
            interest_score: 0,
        };

        insert_sent_record_conn(&conn, &mk("u1_old@x.com", "old@x.com")).unwrap();
        insert_sent_record_conn(&conn, &mk("u1_new@x.com", "new@x.com")).unwrap();
        insert_sent_record_conn(&conn, &mk("u1_open@x.com", "open@x.com")).unwrap();

        let replied_old = OutreachState::New
            .send(t0, interval)
            .unwrap()
            .reply(t0 + Duration::hours(2))
            .unwrap();
        update_record_state_conn(&conn, "u1_old@x.com", &replied_old).unwrap();

        let replied_recent = OutreachState::New
            .send(t0, interval)
            .unwrap()
            .reply(t0 + Duration::days(25))
            .unwrap();
        update_record_state_conn(&conn, "u1_new@x.com", &replied_recent).unwrap();

        let deleted =
            purge_closed_records_conn(&conn, t0 + Duration::days(31), Duration::days(30)).unwrap();
        assert_eq!(deleted, 1);

        let remaining: i64 = conn
            .query_row("SELECT COUNT(*) FROM sent_emails", [], |r| r.get(0))
            .unwrap();
        assert_eq!(remaining, 2);
    }
}
