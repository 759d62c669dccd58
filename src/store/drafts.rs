use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::error::{AppError, Result};
use crate::models::{clamp_keywords, Draft, DraftEdit, DraftStatus, GeneratedPost};

use super::{title_key, IdGenerator, IdeaStore};

/// Drafts and published posts keyed by id. Nothing is ever removed.
#[derive(Debug, Clone, Default)]
pub struct DraftStore {
    drafts: BTreeMap<i64, Draft>,
    ids: IdGenerator,
}

impl DraftStore {
    pub fn restore(drafts: Vec<Draft>) -> Self {
        let max_id = drafts.iter().map(|d| d.id).max().unwrap_or(0);
        Self {
            drafts: drafts.into_iter().map(|d| (d.id, d)).collect(),
            ids: IdGenerator::seeded(max_id),
        }
    }

    /// Turn an idea into a draft, removing the idea from `ideas`.
    pub fn promote(
        &mut self,
        ideas: &mut IdeaStore,
        idea_id: i64,
        generated: GeneratedPost,
    ) -> Result<Draft> {
        let idea = ideas.take(idea_id)?;
        let GeneratedPost {
            content,
            featured_image,
        } = generated;

        // The model may rename the post, but never onto a title in use.
        let generated_title = content.title.trim();
        let key = title_key(generated_title);
        let title = if generated_title.is_empty()
            || ideas.contains_title(&key)
            || self.contains_title(&key)
        {
            idea.title
        } else {
            generated_title.to_string()
        };
        let meta_title = if content.meta_title.trim().is_empty() {
            title.clone()
        } else {
            content.meta_title
        };

        let draft = Draft {
            id: self.ids.next_id(),
            title,
            content: content.content,
            meta_title,
            meta_description: content.meta_description,
            focus_keywords: clamp_keywords(content.focus_keywords),
            featured_image,
            created_at: Utc::now(),
            status: DraftStatus::Draft,
            scheduled_for: None,
            published_at: None,
            url: None,
        };
        self.drafts.insert(draft.id, draft.clone());
        Ok(draft)
    }

    pub fn schedule(&mut self, id: i64, at: DateTime<Utc>) -> Result<&Draft> {
        let draft = self.pending_mut(id)?;
        draft.scheduled_for = Some(at);
        Ok(draft)
    }

    pub fn update(&mut self, id: i64, edit: DraftEdit) -> Result<&Draft> {
        let draft = self
            .drafts
            .get_mut(&id)
            .ok_or(AppError::DraftNotFound(id))?;

        if let Some(title) = edit.title {
            let title = title.trim();
            if title.is_empty() {
                return Err(AppError::EmptyTitle);
            }
            draft.title = title.to_string();
        }
        if let Some(content) = edit.content {
            draft.content = content;
        }
        if let Some(meta_title) = edit.meta_title {
            draft.meta_title = meta_title;
        }
        if let Some(meta_description) = edit.meta_description {
            draft.meta_description = meta_description;
        }
        if let Some(keywords) = edit.focus_keywords {
            draft.focus_keywords = clamp_keywords(keywords);
        }
        Ok(draft)
    }

    /// `draft -> published`. Scheduling no longer applies once live.
    pub fn mark_published(&mut self, id: i64, url: String, at: DateTime<Utc>) -> Result<Draft> {
        let draft = self.pending_mut(id)?;
        draft.status = DraftStatus::Published;
        draft.published_at = Some(at);
        draft.scheduled_for = None;
        draft.url = Some(url);
        Ok(draft.clone())
    }

    fn pending_mut(&mut self, id: i64) -> Result<&mut Draft> {
        let draft = self
            .drafts
            .get_mut(&id)
            .ok_or(AppError::DraftNotFound(id))?;
        if draft.is_published() {
            return Err(AppError::AlreadyPublished(id));
        }
        Ok(draft)
    }

    pub fn get(&self, id: i64) -> Option<&Draft> {
        self.drafts.get(&id)
    }

    pub fn contains_title(&self, key: &str) -> bool {
        self.drafts.values().any(|d| title_key(&d.title) == key)
    }

    /// Newest first.
    pub fn iter(&self) -> impl Iterator<Item = &Draft> {
        self.drafts.values().rev()
    }

    pub fn published(&self) -> impl Iterator<Item = &Draft> {
        self.iter().filter(|d| d.is_published())
    }

    pub fn len(&self) -> usize {
        self.drafts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drafts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DraftContent, IdeaSource, ImagePayload};
    use crate::testing::sample_draft;

    fn generated(title: &str) -> GeneratedPost {
        GeneratedPost {
            content: DraftContent {
                title: title.to_string(),
                content: "<p>Body</p>".to_string(),
                meta_title: String::new(),
                meta_description: "Desc".to_string(),
                focus_keywords: (1..=7).map(|i| format!("kw{i}")).collect(),
            },
            featured_image: ImagePayload {
                mime_type: "image/png".to_string(),
                data: "aGVsbG8=".to_string(),
            },
        }
    }

    #[test]
    fn promote_consumes_the_idea() {
        let mut drafts = DraftStore::default();
        let mut ideas = IdeaStore::default();
        let idea = ideas.add("SEO Tips", IdeaSource::Manual, &drafts).unwrap();

        let draft = drafts.promote(&mut ideas, idea.id, generated("")).unwrap();

        assert_eq!(draft.status, DraftStatus::Draft);
        assert_eq!(draft.title, "SEO Tips");
        assert_eq!(draft.meta_title, "SEO Tips");
        assert_eq!(draft.focus_keywords.len(), 5);
        assert!(ideas.get(idea.id).is_none());
        assert_eq!(drafts.get(draft.id), Some(&draft));
    }

    #[test]
    fn promote_keeps_idea_title_when_generated_title_is_taken() {
        let mut drafts = DraftStore::restore(vec![sample_draft(1, "Hello World")]);
        let mut ideas = IdeaStore::default();
        ideas.add("Taken Idea", IdeaSource::Ai, &drafts).unwrap();
        let idea = ideas.add("SEO Tips", IdeaSource::Manual, &drafts).unwrap();

        let draft = drafts
            .promote(&mut ideas, idea.id, generated("Hello World"))
            .unwrap();
        assert_eq!(draft.title, "SEO Tips");
        let hello = drafts
            .iter()
            .filter(|d| title_key(&d.title) == "hello world")
            .count();
        assert_eq!(hello, 1);

        let third = ideas.add("Third", IdeaSource::Manual, &drafts).unwrap();
        let draft = drafts
            .promote(&mut ideas, third.id, generated("  taken idea "))
            .unwrap();
        assert_eq!(draft.title, "Third");
    }

    #[test]
    fn promote_accepts_a_fresh_generated_title() {
        let mut drafts = DraftStore::default();
        let mut ideas = IdeaStore::default();
        let idea = ideas.add("SEO Tips", IdeaSource::Manual, &drafts).unwrap();

        let draft = drafts
            .promote(&mut ideas, idea.id, generated("10 SEO Tips That Work"))
            .unwrap();
        assert_eq!(draft.title, "10 SEO Tips That Work");
    }

    #[test]
    fn promote_unknown_idea_leaves_store_unchanged() {
        let mut drafts = DraftStore::default();
        let mut ideas = IdeaStore::default();

        let err = drafts.promote(&mut ideas, 99, generated("X")).unwrap_err();
        assert!(matches!(err, AppError::IdeaNotFound(99)));
        assert!(drafts.is_empty());
    }

    #[test]
    fn schedule_is_a_property_not_a_status() {
        let mut drafts = DraftStore::restore(vec![sample_draft(5, "Later")]);
        let at = Utc::now() + chrono::Duration::days(2);

        let draft = drafts.schedule(5, at).unwrap();
        assert_eq!(draft.status, DraftStatus::Draft);
        assert_eq!(draft.scheduled_for, Some(at));
        assert!(draft.is_scheduled());
    }

    #[test]
    fn publish_sets_timestamp_and_clears_schedule() {
        let mut drafts = DraftStore::restore(vec![sample_draft(42, "Hello World")]);
        drafts.schedule(42, Utc::now()).unwrap();

        let now = Utc::now();
        let published = drafts
            .mark_published(42, "/blog/hello-world-42".into(), now)
            .unwrap();
        assert_eq!(published.status, DraftStatus::Published);
        assert_eq!(published.published_at, Some(now));
        assert_eq!(published.scheduled_for, None);

        assert!(matches!(
            drafts.mark_published(42, "/again".into(), now),
            Err(AppError::AlreadyPublished(42))
        ));
        assert!(matches!(
            drafts.schedule(42, now),
            Err(AppError::AlreadyPublished(42))
        ));
    }

    #[test]
    fn update_edits_selected_fields() {
        let mut drafts = DraftStore::restore(vec![sample_draft(1, "Original")]);
        let edit = DraftEdit {
            title: Some("Renamed".into()),
            focus_keywords: Some(vec!["rust".into(), "".into()]),
            ..Default::default()
        };

        let draft = drafts.update(1, edit).unwrap();
        assert_eq!(draft.title, "Renamed");
        assert_eq!(draft.focus_keywords, vec!["rust"]);
        assert_eq!(draft.content, "<p>Sample</p>");
        assert!(drafts.contains_title("renamed"));
    }

    #[test]
    fn iter_is_newest_first() {
        let drafts = DraftStore::restore(vec![sample_draft(1, "A"), sample_draft(3, "C"), sample_draft(2, "B")]);
        let ids: Vec<_> = drafts.iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![3, 2, 1]);
    }
}
