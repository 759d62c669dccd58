use std::path::PathBuf;

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::error::{AppError, Result};
use crate::models::{AutomationMode, DraftEdit};

pub const USAGE: &str = "\
content-agent: blog ideas, drafts and publishing with Gemini

USAGE:
    content-agent <COMMAND>

COMMANDS:
    --run                               Run the automation daemon until Ctrl+C
    --list                              Show ideas, drafts and published posts
    --add-idea <title>                  Add an idea by hand
    --generate-ideas [n] [--queries a,b]
                                        Generate ideas, optionally from search queries
    --similar <idea-id> [n]             Generate ideas similar to an existing one
    --archive <idea-id>                 Archive an idea
    --rename <idea-id> <title>          Rename an idea
    --draft <idea-id>                   Write a draft (text and featured image)
    --edit-draft <draft-id> [--title t] [--meta-title t] [--meta-description d]
                 [--keywords a,b] [--content-file path]
                                        Edit a draft
    --schedule <draft-id> <when>        Schedule a draft (RFC 3339 or \"YYYY-MM-DD HH:MM\" UTC)
    --publish <draft-id>                Publish a draft now
    --freshness [draft-id]              Check published posts for outdated content
    --analyze-style                     Rebuild the style guide from existing posts
    --set-mode <manual|semi|full>       Change the automation mode
    --activity [n]                      Show the latest activity (default 20)
    --help                              Show this help
";

const DEFAULT_ACTIVITY_LIMIT: usize = 20;
const DEFAULT_SIMILAR_COUNT: usize = 3;

#[derive(Debug, Clone)]
pub enum AppAction {
    Run,
    List,
    AddIdea(String),
    GenerateIdeas {
        count: Option<usize>,
        queries: Vec<String>,
    },
    Similar {
        idea_id: i64,
        count: usize,
    },
    Archive(i64),
    Rename {
        idea_id: i64,
        title: String,
    },
    Draft(i64),
    EditDraft {
        draft_id: i64,
        edit: DraftEdit,
        content_file: Option<PathBuf>,
    },
    Schedule {
        draft_id: i64,
        at: DateTime<Utc>,
    },
    Publish(i64),
    Freshness(Option<i64>),
    AnalyzeStyle,
    SetMode(AutomationMode),
    Activity(usize),
    Help,
}

impl AppAction {
    /// Commands that change stored ideas, drafts or the style guide. These
    /// are refused while a daemon owns the database.
    pub fn writes_content(&self) -> bool {
        !matches!(
            self,
            AppAction::Run
                | AppAction::List
                | AppAction::Help
                | AppAction::SetMode(_)
                | AppAction::Activity(_)
                | AppAction::Freshness(_)
        )
    }
}

/// Parse the arguments after the program name.
pub fn parse_args(args: &[String]) -> Result<AppAction> {
    let Some((command, rest)) = args.split_first() else {
        return Ok(AppAction::Help);
    };

    let action = match command.as_str() {
        "--run" => AppAction::Run,
        "--list" => AppAction::List,
        "--help" | "-h" => AppAction::Help,
        "--analyze-style" => AppAction::AnalyzeStyle,
        "--add-idea" => AppAction::AddIdea(joined(rest, "--add-idea <title>")?),
        "--generate-ideas" => parse_generate(rest)?,
        "--similar" => AppAction::Similar {
            idea_id: id_arg(rest, "--similar <idea-id> [n]")?,
            count: match rest.get(1) {
                Some(n) => count_arg(n)?,
                None => DEFAULT_SIMILAR_COUNT,
            },
        },
        "--archive" => AppAction::Archive(id_arg(rest, "--archive <idea-id>")?),
        "--rename" => AppAction::Rename {
            idea_id: id_arg(rest, "--rename <idea-id> <title>")?,
            title: joined(&rest[1..], "--rename <idea-id> <title>")?,
        },
        "--draft" => AppAction::Draft(id_arg(rest, "--draft <idea-id>")?),
        "--edit-draft" => parse_edit(rest)?,
        "--schedule" => AppAction::Schedule {
            draft_id: id_arg(rest, "--schedule <draft-id> <when>")?,
            at: parse_when(&rest[1..].join(" "))?,
        },
        "--publish" => AppAction::Publish(id_arg(rest, "--publish <draft-id>")?),
        "--freshness" => AppAction::Freshness(match rest.first() {
            Some(_) => Some(id_arg(rest, "--freshness [draft-id]")?),
            None => None,
        }),
        "--set-mode" => {
            let mode = rest
                .first()
                .ok_or_else(|| usage("--set-mode <manual|semi|full>"))?;
            AppAction::SetMode(
                mode.parse()
                    .map_err(|_| AppError::Usage(format!("unknown mode {:?}", mode)))?,
            )
        }
        "--activity" => AppAction::Activity(match rest.first() {
            Some(n) => count_arg(n)?,
            None => DEFAULT_ACTIVITY_LIMIT,
        }),
        other => return Err(AppError::Usage(format!("unknown command {:?}, try --help", other))),
    };
    Ok(action)
}

fn usage(form: &str) -> AppError {
    AppError::Usage(form.to_string())
}

fn id_arg(rest: &[String], form: &str) -> Result<i64> {
    rest.first()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| usage(form))
}

fn count_arg(value: &str) -> Result<usize> {
    match value.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(AppError::Usage(format!("expected a positive number, got {:?}", value))),
    }
}

/// Remaining words as one title, so quoting is optional.
fn joined(words: &[String], form: &str) -> Result<String> {
    let title = words.join(" ");
    if title.trim().is_empty() {
        return Err(usage(form));
    }
    Ok(title)
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn parse_generate(rest: &[String]) -> Result<AppAction> {
    let mut count = None;
    let mut queries = Vec::new();
    let mut iter = rest.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--queries" => {
                let value = iter
                    .next()
                    .ok_or_else(|| usage("--generate-ideas [n] --queries a,b"))?;
                queries = split_list(value);
            }
            n if count.is_none() => count = Some(count_arg(n)?),
            other => return Err(AppError::Usage(format!("unexpected argument {:?}", other))),
        }
    }
    Ok(AppAction::GenerateIdeas { count, queries })
}

fn parse_edit(rest: &[String]) -> Result<AppAction> {
    const FORM: &str = "--edit-draft <draft-id> [--title t] [--meta-title t] [--meta-description d] [--keywords a,b] [--content-file path]";
    let draft_id = id_arg(rest, FORM)?;

    let mut edit = DraftEdit::default();
    let mut content_file = None;
    let mut iter = rest[1..].iter();
    while let Some(flag) = iter.next() {
        let value = iter.next().ok_or_else(|| usage(FORM))?;
        match flag.as_str() {
            "--title" => edit.title = Some(value.clone()),
            "--meta-title" => edit.meta_title = Some(value.clone()),
            "--meta-description" => edit.meta_description = Some(value.clone()),
            "--keywords" => edit.focus_keywords = Some(split_list(value)),
            "--content-file" => content_file = Some(PathBuf::from(value)),
            other => return Err(AppError::Usage(format!("unknown option {:?}", other))),
        }
    }
    if edit.is_empty() && content_file.is_none() {
        return Err(usage(FORM));
    }

    Ok(AppAction::EditDraft {
        draft_id,
        edit,
        content_file,
    })
}

fn parse_when(value: &str) -> Result<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M")
        .map(|naive| naive.and_utc())
        .map_err(|_| AppError::Usage(format!("cannot read {:?} as a date and time", value)))
}
