use chrono::Utc;

use crate::error::{AppError, Result};
use crate::models::{ContentIdea, IdeaSource, IdeaStatus};

use super::{title_key, DraftStore, IdGenerator};

/// Active ideas, newest first, plus a read-only archive.
#[derive(Debug, Clone, Default)]
pub struct IdeaStore {
    active: Vec<ContentIdea>,
    archived: Vec<ContentIdea>,
    ids: IdGenerator,
}

impl IdeaStore {
    /// Rebuild from persisted ideas. Ordering is restored newest first.
    pub fn restore(ideas: Vec<ContentIdea>) -> Self {
        let max_id = ideas.iter().map(|i| i.id).max().unwrap_or(0);
        let (mut archived, mut active): (Vec<_>, Vec<_>) = ideas
            .into_iter()
            .partition(|i| i.status == IdeaStatus::Archived);

        // An interrupted draft run leaves nothing in flight after a restart.
        for idea in &mut active {
            if idea.status == IdeaStatus::Active {
                idea.status = IdeaStatus::New;
            }
        }
        active.sort_by(|a, b| b.id.cmp(&a.id));
        archived.sort_by(|a, b| b.id.cmp(&a.id));

        Self {
            active,
            archived,
            ids: IdGenerator::seeded(max_id),
        }
    }

    pub fn add(&mut self, title: &str, source: IdeaSource, drafts: &DraftStore) -> Result<ContentIdea> {
        let title = title.trim();
        if title.is_empty() {
            return Err(AppError::EmptyTitle);
        }

        let key = title_key(title);
        if self.contains_title(&key) || drafts.contains_title(&key) {
            return Err(AppError::DuplicateTitle(title.to_string()));
        }

        let idea = ContentIdea {
            id: self.ids.next_id(),
            title: title.to_string(),
            status: IdeaStatus::New,
            source,
            created_at: Utc::now(),
        };
        self.active.insert(0, idea.clone());
        Ok(idea)
    }

    pub fn archive(&mut self, id: i64) -> Result<ContentIdea> {
        let mut idea = self.take(id)?;
        idea.status = IdeaStatus::Archived;
        self.archived.insert(0, idea.clone());
        Ok(idea)
    }

    /// Renames in place. Uniqueness is only enforced when an idea is created.
    pub fn update_title(&mut self, id: i64, new_title: &str) -> Result<&ContentIdea> {
        let new_title = new_title.trim();
        if new_title.is_empty() {
            return Err(AppError::EmptyTitle);
        }
        let idea = self
            .active
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or(AppError::IdeaNotFound(id))?;
        idea.title = new_title.to_string();
        Ok(idea)
    }

    pub fn set_status(&mut self, id: i64, status: IdeaStatus) -> Result<()> {
        let idea = self
            .active
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or(AppError::IdeaNotFound(id))?;
        idea.status = status;
        Ok(())
    }

    /// Remove an idea from the active set, e.g. for promotion to a draft.
    pub fn take(&mut self, id: i64) -> Result<ContentIdea> {
        let index = self
            .active
            .iter()
            .position(|i| i.id == id)
            .ok_or(AppError::IdeaNotFound(id))?;
        Ok(self.active.remove(index))
    }

    pub fn get(&self, id: i64) -> Option<&ContentIdea> {
        self.active.iter().find(|i| i.id == id)
    }

    pub fn contains_title(&self, key: &str) -> bool {
        self.active.iter().any(|i| title_key(&i.title) == key)
    }

    pub fn active(&self) -> &[ContentIdea] {
        &self.active
    }

    pub fn archived(&self) -> &[ContentIdea] {
        &self.archived
    }

    /// Active and archived ideas together.
    pub fn all(&self) -> impl Iterator<Item = &ContentIdea> {
        self.active.iter().chain(&self.archived)
    }
}
