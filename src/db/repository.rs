use std::collections::{HashMap, HashSet};

use chrono::{DateTime, TimeDelta, Utc};
use rusqlite::{params, OptionalExtension, Row};
use tokio_rusqlite::Connection;

use crate::error::{AppError, Result};
use crate::models::{
    ActivityEntry, ActivityKind, ContentIdea, Draft, DraftStatus, IdeaSource, IdeaStatus,
    ImagePayload, StyleGuide,
};
use crate::store::{ContentState, DraftStore, IdeaStore};

use super::schema::SCHEMA;

/// A daemon that has not refreshed its lock for this long is presumed dead.
const DAEMON_LOCK_TTL_SECS: i64 = 30;

pub struct Repository {
    conn: Connection,
}

/// A draft row with its keyword list already encoded for storage.
struct StoredDraft {
    draft: Draft,
    keywords_json: String,
}

enum GuideChange {
    Unchanged,
    Set(String),
    Cleared,
}

impl Repository {
    pub async fn new(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path).await?;

        conn.call(|conn| {
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await?;

        Ok(Self { conn })
    }

    // State snapshot

    pub async fn load_state(&self) -> Result<ContentState> {
        let (ideas, drafts, guide_json) = self
            .conn
            .call(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, title, status, source, created_at FROM ideas ORDER BY id DESC",
                )?;
                let ideas = stmt
                    .query_map([], idea_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;

                let mut stmt = conn.prepare(
                    r#"SELECT id, title, content, meta_title, meta_description, focus_keywords,
                              image_mime, image_data, created_at, status, scheduled_for,
                              published_at, url
                       FROM drafts ORDER BY id DESC"#,
                )?;
                let drafts = stmt
                    .query_map([], draft_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;

                let guide: Option<String> = conn
                    .query_row("SELECT guide FROM style_guide WHERE id = 1", [], |row| {
                        row.get(0)
                    })
                    .optional()?;
                Ok((ideas, drafts, guide))
            })
            .await?;

        let style_guide = match guide_json {
            Some(json) => Some(serde_json::from_str::<StyleGuide>(&json)?),
            None => None,
        };
        tracing::debug!(
            "Loaded {} ideas, {} drafts from database",
            ideas.len(),
            drafts.len()
        );

        Ok(ContentState {
            ideas: IdeaStore::restore(ideas),
            drafts: DraftStore::restore(drafts),
            style_guide,
        })
    }

    /// Write what changed between `previous` (the state last loaded or
    /// saved through this handle) and `current`. Rows this handle never
    /// touched are left alone.
    pub async fn save_state(&self, previous: &ContentState, current: &ContentState) -> Result<()> {
        let before: HashMap<i64, &ContentIdea> = previous.ideas.all().map(|i| (i.id, i)).collect();
        let ideas: Vec<ContentIdea> = current
            .ideas
            .all()
            .filter(|i| before.get(&i.id).copied() != Some(*i))
            .cloned()
            .collect();
        let kept: HashSet<i64> = current.ideas.all().map(|i| i.id).collect();
        let removed_ideas: Vec<i64> = before.keys().copied().filter(|id| !kept.contains(id)).collect();

        let drafts = current
            .drafts
            .iter()
            .filter(|d| previous.drafts.get(d.id) != Some(*d))
            .map(|d| -> Result<StoredDraft> {
                Ok(StoredDraft {
                    keywords_json: serde_json::to_string(&d.focus_keywords)?,
                    draft: d.clone(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let removed_drafts: Vec<i64> = previous
            .drafts
            .iter()
            .filter(|d| current.drafts.get(d.id).is_none())
            .map(|d| d.id)
            .collect();

        let guide = if previous.style_guide == current.style_guide {
            GuideChange::Unchanged
        } else {
            match &current.style_guide {
                Some(guide) => GuideChange::Set(serde_json::to_string(guide)?),
                None => GuideChange::Cleared,
            }
        };

        if ideas.is_empty()
            && removed_ideas.is_empty()
            && drafts.is_empty()
            && removed_drafts.is_empty()
            && matches!(guide, GuideChange::Unchanged)
        {
            return Ok(());
        }
        tracing::debug!(
            "Saving {} ideas ({} removed), {} drafts ({} removed)",
            ideas.len(),
            removed_ideas.len(),
            drafts.len(),
            removed_drafts.len()
        );

        self.conn
            .call(move |conn| {
                let tx = conn.transaction()?;

                {
                    let mut upsert_idea = tx.prepare(
                        r#"INSERT INTO ideas (id, title, status, source, created_at)
                           VALUES (?1, ?2, ?3, ?4, ?5)
                           ON CONFLICT(id) DO UPDATE SET
                               title = excluded.title,
                               status = excluded.status,
                               source = excluded.source,
                               created_at = excluded.created_at"#,
                    )?;
                    for idea in &ideas {
                        upsert_idea.execute(params![
                            idea.id,
                            idea.title,
                            idea.status.as_str(),
                            idea.source.as_str(),
                            idea.created_at.to_rfc3339(),
                        ])?;
                    }

                    let mut delete_idea = tx.prepare("DELETE FROM ideas WHERE id = ?1")?;
                    for id in &removed_ideas {
                        delete_idea.execute(params![id])?;
                    }

                    let mut upsert_draft = tx.prepare(
                        r#"INSERT INTO drafts (id, title, content, meta_title, meta_description,
                                               focus_keywords, image_mime, image_data, created_at,
                                               status, scheduled_for, published_at, url)
                           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
                           ON CONFLICT(id) DO UPDATE SET
                               title = excluded.title,
                               content = excluded.content,
                               meta_title = excluded.meta_title,
                               meta_description = excluded.meta_description,
                               focus_keywords = excluded.focus_keywords,
                               image_mime = excluded.image_mime,
                               image_data = excluded.image_data,
                               created_at = excluded.created_at,
                               status = excluded.status,
                               scheduled_for = excluded.scheduled_for,
                               published_at = excluded.published_at,
                               url = excluded.url"#,
                    )?;
                    for StoredDraft { draft, keywords_json } in &drafts {
                        upsert_draft.execute(params![
                            draft.id,
                            draft.title,
                            draft.content,
                            draft.meta_title,
                            draft.meta_description,
                            keywords_json,
                            draft.featured_image.mime_type,
                            draft.featured_image.data,
                            draft.created_at.to_rfc3339(),
                            draft.status.as_str(),
                            draft.scheduled_for.map(|dt| dt.to_rfc3339()),
                            draft.published_at.map(|dt| dt.to_rfc3339()),
                            draft.url,
                        ])?;
                    }

                    let mut delete_draft = tx.prepare("DELETE FROM drafts WHERE id = ?1")?;
                    for id in &removed_drafts {
                        delete_draft.execute(params![id])?;
                    }
                }

                match guide {
                    GuideChange::Set(guide) => {
                        tx.execute(
                            r#"INSERT INTO style_guide (id, guide) VALUES (1, ?1)
                               ON CONFLICT(id) DO UPDATE SET
                                   guide = excluded.guide,
                                   updated_at = datetime('now')"#,
                            params![guide],
                        )?;
                    }
                    GuideChange::Cleared => {
                        tx.execute("DELETE FROM style_guide", [])?;
                    }
                    GuideChange::Unchanged => {}
                }

                tx.commit()?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    // Daemon lock

    /// Claim the database for a `--run` process. Fails while another live
    /// daemon holds it; a holder whose heartbeat went stale is replaced.
    pub async fn acquire_daemon_lock(&self, pid: u32) -> Result<()> {
        self.acquire_daemon_lock_at(pid, Utc::now()).await
    }

    async fn acquire_daemon_lock_at(&self, pid: u32, now: DateTime<Utc>) -> Result<()> {
        let holder = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                let current: Option<(u32, String)> = tx
                    .query_row("SELECT pid, heartbeat FROM daemon_lock WHERE id = 1", [], |row| {
                        Ok((row.get(0)?, row.get(1)?))
                    })
                    .optional()?;
                if let Some((holder, heartbeat)) = current {
                    if holder != pid && is_fresh(&heartbeat, now) {
                        return Ok(Some(holder));
                    }
                }
                tx.execute(
                    r#"INSERT INTO daemon_lock (id, pid, heartbeat) VALUES (1, ?1, ?2)
                       ON CONFLICT(id) DO UPDATE SET
                           pid = excluded.pid,
                           heartbeat = excluded.heartbeat"#,
                    params![pid, now.to_rfc3339()],
                )?;
                tx.commit()?;
                Ok(None)
            })
            .await?;

        match holder {
            Some(holder) => Err(AppError::DaemonRunning(holder)),
            None => Ok(()),
        }
    }

    pub async fn refresh_daemon_lock(&self, pid: u32) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "UPDATE daemon_lock SET heartbeat = ?1 WHERE pid = ?2",
                    params![now, pid],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    pub async fn release_daemon_lock(&self, pid: u32) -> Result<()> {
        self.conn
            .call(move |conn| {
                conn.execute("DELETE FROM daemon_lock WHERE pid = ?1", params![pid])?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    /// Pid of the daemon currently holding the database, if it is alive.
    pub async fn running_daemon(&self) -> Result<Option<u32>> {
        let now = Utc::now();
        let holder = self
            .conn
            .call(|conn| {
                let row: Option<(u32, String)> = conn
                    .query_row("SELECT pid, heartbeat FROM daemon_lock WHERE id = 1", [], |row| {
                        Ok((row.get(0)?, row.get(1)?))
                    })
                    .optional()?;
                Ok(row)
            })
            .await?;
        Ok(holder
            .filter(|(_, heartbeat)| is_fresh(heartbeat, now))
            .map(|(pid, _)| pid))
    }

    // Activity log

    pub async fn append_activity(&self, entry: &ActivityEntry) -> Result<()> {
        let kind = entry.kind.as_str();
        let message = entry.message.clone();
        let at = entry.at.to_rfc3339();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO activity_log (kind, message, created_at) VALUES (?1, ?2, ?3)",
                    params![kind, message, at],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    /// Newest first. Rows with an unknown kind are skipped.
    pub async fn recent_activity(&self, limit: usize) -> Result<Vec<ActivityEntry>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let entries = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT kind, message, created_at FROM activity_log ORDER BY id DESC LIMIT ?1",
                )?;
                let rows = stmt
                    .query_map(params![limit], |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, String>(2)?,
                        ))
                    })?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await?;

        Ok(entries
            .into_iter()
            .filter_map(|(kind, message, at)| {
                Some(ActivityEntry {
                    kind: ActivityKind::parse(&kind)?,
                    message,
                    at: parse_datetime(&at).unwrap_or_else(Utc::now),
                })
            })
            .collect())
    }
}

fn is_fresh(heartbeat: &str, now: DateTime<Utc>) -> bool {
    parse_datetime(heartbeat)
        .is_some_and(|at| now - at < TimeDelta::seconds(DAEMON_LOCK_TTL_SECS))
}

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // SQLite's datetime('now') default
    if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    None
}

fn optional_datetime(row: &Row, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    Ok(row
        .get::<_, Option<String>>(idx)?
        .and_then(|s| parse_datetime(&s)))
}

fn idea_from_row(row: &Row) -> rusqlite::Result<ContentIdea> {
    Ok(ContentIdea {
        id: row.get(0)?,
        title: row.get(1)?,
        status: IdeaStatus::parse(&row.get::<_, String>(2)?).unwrap_or_default(),
        source: IdeaSource::parse(&row.get::<_, String>(3)?).unwrap_or(IdeaSource::Manual),
        created_at: optional_datetime(row, 4)?.unwrap_or_else(Utc::now),
    })
}

fn draft_from_row(row: &Row) -> rusqlite::Result<Draft> {
    let keywords: String = row.get(5)?;
    Ok(Draft {
        id: row.get(0)?,
        title: row.get(1)?,
        content: row.get(2)?,
        meta_title: row.get(3)?,
        meta_description: row.get(4)?,
        focus_keywords: serde_json::from_str(&keywords).unwrap_or_default(),
        featured_image: ImagePayload {
            mime_type: row.get(6)?,
            data: row.get(7)?,
        },
        created_at: optional_datetime(row, 8)?.unwrap_or_else(Utc::now),
        status: DraftStatus::parse(&row.get::<_, String>(9)?).unwrap_or(DraftStatus::Draft),
        scheduled_for: optional_datetime(row, 10)?,
        published_at: optional_datetime(row, 11)?,
        url: row.get(12)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{sample_draft, sample_style_guide};

    async fn repository(dir: &tempfile::TempDir) -> Repository {
        let path = dir.path().join("content.db");
        Repository::new(path.to_str().unwrap()).await.unwrap()
    }

    #[tokio::test]
    async fn empty_database_loads_empty_state() {
        let dir = tempfile::tempdir().unwrap();
        let state = repository(&dir).await.load_state().await.unwrap();

        assert!(state.ideas.active().is_empty());
        assert!(state.drafts.is_empty());
        assert!(state.style_guide.is_none());
    }

    #[tokio::test]
    async fn state_survives_a_reopen() {
        let dir = tempfile::tempdir().unwrap();

        let mut state = ContentState::default();
        state.drafts = DraftStore::restore(vec![{
            let mut post = sample_draft(42, "Hello World");
            post.status = DraftStatus::Published;
            post.url = Some("/blog/hello-world-42".to_string());
            post.published_at = Some(Utc::now());
            post
        }]);
        let kept = state
            .ideas
            .add("SEO Tips", IdeaSource::Manual, &state.drafts)
            .unwrap();
        let gone = state
            .ideas
            .add("Old Topic", IdeaSource::Ai, &state.drafts)
            .unwrap();
        state.ideas.archive(gone.id).unwrap();
        state.style_guide = Some(sample_style_guide());

        repository(&dir)
            .await
            .save_state(&ContentState::default(), &state)
            .await
            .unwrap();
        let loaded = repository(&dir).await.load_state().await.unwrap();

        assert_eq!(loaded.ideas.active(), std::slice::from_ref(&kept));
        assert_eq!(loaded.ideas.archived().len(), 1);
        assert_eq!(loaded.ideas.archived()[0].status, IdeaStatus::Archived);

        let post = loaded.drafts.get(42).unwrap();
        assert!(post.is_published());
        assert_eq!(post.url.as_deref(), Some("/blog/hello-world-42"));
        assert_eq!(post.focus_keywords, ["sample"]);
        assert_eq!(post.featured_image.mime_type, "image/png");

        assert_eq!(loaded.style_guide.map(|g| g.tone), Some("friendly".to_string()));
    }

    #[tokio::test]
    async fn saving_applies_changes_since_previous_state() {
        let dir = tempfile::tempdir().unwrap();
        let repo = repository(&dir).await;

        let mut state = ContentState::default();
        state.drafts = DraftStore::restore(vec![sample_draft(1, "First")]);
        state.style_guide = Some(sample_style_guide());
        repo.save_state(&ContentState::default(), &state).await.unwrap();

        repo.save_state(&state, &ContentState::default()).await.unwrap();
        let loaded = repo.load_state().await.unwrap();

        assert!(loaded.drafts.is_empty());
        assert!(loaded.style_guide.is_none());
    }

    #[tokio::test]
    async fn concurrent_handles_keep_each_others_rows() {
        let dir = tempfile::tempdir().unwrap();
        let daemon = repository(&dir).await;
        let cli = repository(&dir).await;

        let daemon_base = daemon.load_state().await.unwrap();
        let mut daemon_state = daemon_base.clone();

        let cli_base = cli.load_state().await.unwrap();
        let mut cli_state = cli_base.clone();
        let drafts = cli_state.drafts.clone();
        cli_state
            .ideas
            .add("CLI Idea", IdeaSource::Manual, &drafts)
            .unwrap();
        cli.save_state(&cli_base, &cli_state).await.unwrap();

        daemon_state.drafts = DraftStore::restore(vec![sample_draft(7, "Daemon Post")]);
        daemon.save_state(&daemon_base, &daemon_state).await.unwrap();

        let loaded = cli.load_state().await.unwrap();
        let titles: Vec<&str> = loaded.ideas.active().iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, ["CLI Idea"]);
        assert!(loaded.drafts.get(7).is_some());
    }

    #[tokio::test]
    async fn promoted_idea_row_is_removed() {
        let dir = tempfile::tempdir().unwrap();
        let repo = repository(&dir).await;

        let base = ContentState::default();
        let mut state = base.clone();
        let drafts = state.drafts.clone();
        let idea = state.ideas.add("SEO Tips", IdeaSource::Manual, &drafts).unwrap();
        repo.save_state(&base, &state).await.unwrap();

        let mut next = state.clone();
        next.ideas.take(idea.id).unwrap();
        repo.save_state(&state, &next).await.unwrap();

        assert!(repo.load_state().await.unwrap().ideas.active().is_empty());
    }

    #[tokio::test]
    async fn daemon_lock_blocks_a_second_daemon_until_released() {
        let dir = tempfile::tempdir().unwrap();
        let repo = repository(&dir).await;
        assert_eq!(repo.running_daemon().await.unwrap(), None);

        repo.acquire_daemon_lock(100).await.unwrap();
        assert_eq!(repo.running_daemon().await.unwrap(), Some(100));
        assert!(matches!(
            repository(&dir).await.acquire_daemon_lock(200).await,
            Err(AppError::DaemonRunning(100))
        ));

        repo.release_daemon_lock(100).await.unwrap();
        assert_eq!(repo.running_daemon().await.unwrap(), None);
        repo.acquire_daemon_lock(200).await.unwrap();
    }

    #[tokio::test]
    async fn stale_daemon_lock_is_taken_over() {
        let dir = tempfile::tempdir().unwrap();
        let repo = repository(&dir).await;

        let long_ago = Utc::now() - TimeDelta::minutes(5);
        repo.acquire_daemon_lock_at(100, long_ago).await.unwrap();
        assert_eq!(repo.running_daemon().await.unwrap(), None);

        repo.acquire_daemon_lock(200).await.unwrap();
        assert_eq!(repo.running_daemon().await.unwrap(), Some(200));
    }

    #[tokio::test]
    async fn activity_is_listed_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let repo = repository(&dir).await;

        repo.append_activity(&ActivityEntry::new(ActivityKind::IdeaAdded, "first"))
            .await
            .unwrap();
        repo.append_activity(&ActivityEntry::new(ActivityKind::PostPublished, "second"))
            .await
            .unwrap();

        let entries = repo.recent_activity(10).await.unwrap();
        let messages: Vec<&str> = entries.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, ["second", "first"]);
        assert_eq!(entries[0].kind, ActivityKind::PostPublished);

        assert_eq!(repo.recent_activity(1).await.unwrap().len(), 1);
    }
}
