use crate::models::{Draft, PostSample, StyleGuide};

use super::IdeaRequest;

pub const EDITOR_SYSTEM_PROMPT: &str = r#"You are an experienced blog editor and SEO strategist.
You always answer with valid JSON only, without markdown fences or commentary."#;

// Content is cut so a long archive does not blow the context window.
const SAMPLE_CHARS: usize = 3000;

pub fn analyze_style(samples: &[PostSample]) -> String {
    let mut prompt = String::from(
        "Analyze the writing style of the following blog posts and describe it.\n\
         Respond with a JSON object with the keys \"tone\", \"sentenceStructure\", \
         \"paragraphLength\", \"formatting\" and \"summary\".\n",
    );

    if samples.is_empty() {
        prompt.push_str(
            "\nThe site has no posts yet. Propose a clear, friendly and practical house style.\n",
        );
    }

    for (i, sample) in samples.iter().enumerate() {
        let content: String = sample.content.chars().take(SAMPLE_CHARS).collect();
        prompt.push_str(&format!(
            "\n--- Post {} ---\nTitle: {}\n{}\n",
            i + 1,
            sample.title,
            content
        ));
    }
    prompt
}

pub fn generate_ideas(request: &IdeaRequest<'_>) -> String {
    let mut prompt = format!(
        "Suggest {} new blog post titles for this site.\n\
         Respond with a JSON array of strings.\n",
        request.count
    );
    push_context(&mut prompt, request);

    if let Some(data) = request.search_data.filter(|d| !d.is_empty()) {
        if !data.top_queries.is_empty() {
            prompt.push_str(&format!(
                "\nTop search queries bringing visitors: {}\n",
                data.top_queries.join(", ")
            ));
        }
        if !data.underperforming_pages.is_empty() {
            prompt.push_str(&format!(
                "Underperforming pages worth a follow-up: {}\n",
                data.underperforming_pages.join(", ")
            ));
        }
        prompt.push_str("Prefer titles that target these search opportunities.\n");
    }
    prompt
}

pub fn generate_similar_ideas(base_title: &str, request: &IdeaRequest<'_>) -> String {
    let mut prompt = format!(
        "Suggest {} blog post titles closely related to \"{}\" but covering a different angle.\n\
         Respond with a JSON array of strings.\n",
        request.count, base_title
    );
    push_context(&mut prompt, request);
    prompt
}

pub fn create_draft(title: &str, style_guide: &StyleGuide) -> String {
    format!(
        "Write a complete blog post titled \"{}\".\n\
         Follow this style guide:\n{}\n\n\
         Respond with a JSON object with the keys \"title\", \"content\" (HTML), \
         \"metaTitle\" (max 60 characters), \"metaDescription\" (max 160 characters) \
         and \"focusKeywords\" (an array of at most 5 keywords).",
        title,
        style_guide.as_prompt()
    )
}

pub fn featured_image(title: &str, keywords: &[String]) -> String {
    let mut prompt = format!(
        "A photographic, text-free featured image for a blog post titled \"{}\".",
        title
    );
    if !keywords.is_empty() {
        prompt.push_str(&format!(" Themes: {}.", keywords.join(", ")));
    }
    prompt
}

pub fn content_freshness(post: &Draft) -> String {
    let content: String = post.content.chars().take(SAMPLE_CHARS * 2).collect();
    let published = post
        .published_at
        .map(|at| at.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "unknown".to_string());
    format!(
        "Assess whether this blog post is still up to date.\n\
         Title: {}\nPublished: {}\n\n{}\n\n\
         Respond with a JSON object with the keys \"score\" (0-100, 100 = fully current), \
         \"needsUpdate\" (boolean) and \"suggestions\" (array of strings).",
        post.title, published, content
    )
}

fn push_context(prompt: &mut String, request: &IdeaRequest<'_>) {
    if let Some(guide) = request.style_guide {
        prompt.push_str(&format!("\nSite style:\n{}\n", guide.as_prompt()));
    }
    if !request.existing_titles.is_empty() {
        prompt.push_str("\nDo not repeat or closely paraphrase any of these existing titles:\n");
        for title in request.existing_titles {
            prompt.push_str(&format!("- {}\n", title));
        }
    }
}
