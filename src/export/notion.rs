//! Notion database publisher.

use super::{NotePublisher, NotionTarget, SummaryDocument};
use crate::error::{Result, SophiaError};
use crate::http::{create_http_client, error_body, DEFAULT_TIMEOUT_SECS};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{info, instrument};

pub const NOTION_API_URL: &str = "https://api.notion.com/v1/pages";
const NOTION_VERSION: &str = "2022-06-28";

/// Notion's rich_text length limit.
const RICH_TEXT_LIMIT: usize = 2000;
const KEYWORDS_LIMIT: usize = 500;
/// Notion rejects arrays of more than 100 children.
const MAX_CHILDREN: usize = 100;
/// Characters of summary inspected when guessing a category.
const CATEGORY_SCAN_CHARS: usize = 500;

/// Select options for the category property.
pub const CATEGORIES: [&str; 9] = [
    "Tutorial",
    "Entertainment",
    "Education",
    "Music",
    "Sports",
    "Technology",
    "News",
    "Health",
    "Other",
];

const CATEGORY_HINTS: &[(&str, &[&str])] = &[
    ("Tutorial", &["tutorial", "how to", "step by step", "learn to"]),
    ("Technology", &["technolog", "software", "programming", "artificial intelligence"]),
    ("Music", &["music", "song", "album", "concert"]),
    ("Sports", &["sport", "football", "soccer", "fitness"]),
    ("Health", &["health", "medicine", "nutrition"]),
    ("News", &["news", "politic", "economy"]),
    ("Education", &["education", "science", "history", "university"]),
    ("Entertainment", &["entertainment", "humor", "vlog", "comedy"]),
];

/// Property names of the target database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotionSchema {
    pub title: String,
    pub video_url: String,
    pub channel: String,
    pub summary: String,
    pub actions: String,
    pub keywords: String,
    pub category: String,
    pub video_date: String,
}

impl Default for NotionSchema {
    fn default() -> Self {
        Self {
            title: "Title".to_string(),
            video_url: "Video URL".to_string(),
            channel: "Channel".to_string(),
            summary: "Summary".to_string(),
            actions: "Actions".to_string(),
            keywords: "Keywords".to_string(),
            category: "Category".to_string(),
            video_date: "Video Date".to_string(),
        }
    }
}

/// Publishes summaries as pages in a Notion database.
pub struct NotionPublisher {
    client: reqwest::Client,
    api_url: String,
    schema: NotionSchema,
}

impl NotionPublisher {
    pub fn new() -> Result<Self> {
        Self::with_config(NotionSchema::default(), Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    pub fn with_config(schema: NotionSchema, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: create_http_client(timeout)?,
            api_url: NOTION_API_URL.to_string(),
            schema,
        })
    }

    pub fn with_api_url(mut self, api_url: &str) -> Self {
        self.api_url = api_url.to_string();
        self
    }
}

/// Body of the `## ` section whose heading contains `heading`, up to the next heading.
pub fn parse_section(text: &str, heading: &str) -> String {
    let mut in_section = false;
    let mut lines = Vec::new();
    for line in text.lines() {
        if line.starts_with("## ") && line.contains(heading) {
            in_section = true;
            continue;
        }
        if in_section {
            if line.starts_with('#') {
                break;
            }
            lines.push(line);
        }
    }
    lines.join("\n").trim().to_string()
}

/// Truncate to `max` characters, ending in `...` when shortened.
pub fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut truncated: String = text.chars().take(max.saturating_sub(3)).collect();
    truncated.push_str("...");
    truncated
}

/// Pick a category: the summary's own Category section when it names a known
/// one, otherwise keyword hints over the title and start of the summary.
pub fn detect_category(title: &str, summary: &str) -> &'static str {
    let declared = parse_section(summary, "Category");
    if let Some(category) = CATEGORIES.iter().find(|c| declared.contains(**c)) {
        return *category;
    }

    let head: String = summary.chars().take(CATEGORY_SCAN_CHARS).collect();
    let text = format!("{} {}", title, head).to_lowercase();
    CATEGORY_HINTS
        .iter()
        .find(|(_, hints)| hints.iter().any(|hint| text.contains(hint)))
        .map(|(category, _)| *category)
        .unwrap_or("Other")
}

fn rich_text(content: &str) -> Value {
    json!([{ "type": "text", "text": { "content": truncate_chars(content, RICH_TEXT_LIMIT) } }])
}

fn text_block(kind: &str, content: &str) -> Value {
    json!({
        "object": "block",
        "type": kind,
        kind: { "rich_text": rich_text(content) }
    })
}

fn divider() -> Value {
    json!({ "object": "block", "type": "divider", "divider": {} })
}

fn summary_block(line: &str) -> Value {
    if line.starts_with("## ") {
        text_block("heading_2", line.trim_start_matches('#').trim())
    } else if line.starts_with("# ") {
        text_block("heading_1", line.trim_start_matches('#').trim())
    } else if line.starts_with("> ") {
        text_block("quote", line.trim_start_matches('>').trim())
    } else if line.starts_with("• ") || line.starts_with("- ") || line.starts_with("* ") {
        text_block(
            "bulleted_list_item",
            line.trim_start_matches(['•', '-', '*', ' ']).trim(),
        )
    } else if line.starts_with("---") {
        divider()
    } else {
        text_block("paragraph", line)
    }
}

/// Page body: summary blocks, a divider, and a toggle holding the transcript.
pub fn build_blocks(summary: &str, transcript: &str) -> Vec<Value> {
    let transcript_chars: Vec<char> = transcript.chars().collect();
    let transcript_blocks: Vec<Value> = transcript_chars
        .chunks(RICH_TEXT_LIMIT)
        .take(MAX_CHILDREN)
        .map(|chunk| text_block("paragraph", &chunk.iter().collect::<String>()))
        .collect();

    let mut blocks: Vec<Value> = summary
        .lines()
        .filter(|line| !line.trim().is_empty())
        .take(MAX_CHILDREN - 2)
        .map(summary_block)
        .collect();

    blocks.push(divider());
    blocks.push(json!({
        "object": "block",
        "type": "toggle",
        "toggle": {
            "rich_text": rich_text("📄 Full transcript (click to expand)"),
            "children": transcript_blocks
        }
    }));
    blocks
}

/// The full `POST /v1/pages` body.
pub fn build_page_request(
    document: &SummaryDocument<'_>,
    database_id: &str,
    schema: &NotionSchema,
) -> Value {
    let summary = document.summary;
    let video = document.video;

    let core_idea = parse_section(summary, "Core Idea");
    let key_points = parse_section(summary, "Key Points");
    let summary_text = match (core_idea.is_empty(), key_points.is_empty()) {
        (false, false) => format!("{}\n\n{}", core_idea, key_points),
        (false, true) => core_idea,
        _ => summary.to_string(),
    };

    let actions = parse_section(summary, "Actionable Ideas");
    let actions_text = if actions.is_empty() { summary.to_string() } else { actions };

    let keywords = parse_section(summary, "Keywords");
    let keywords_text = if keywords.is_empty() {
        video
            .title
            .split_whitespace()
            .filter(|word| word.chars().count() > 3)
            .take(6)
            .collect::<Vec<_>>()
            .join(", ")
    } else {
        truncate_chars(&keywords, KEYWORDS_LIMIT)
    };

    let mut properties = serde_json::Map::new();
    properties.insert(schema.title.clone(), json!({ "title": rich_text(&video.title) }));
    properties.insert(schema.video_url.clone(), json!({ "url": video.url }));
    properties.insert(schema.channel.clone(), json!({ "rich_text": rich_text(&video.channel) }));
    properties.insert(schema.summary.clone(), json!({ "rich_text": rich_text(&summary_text) }));
    properties.insert(schema.actions.clone(), json!({ "rich_text": rich_text(&actions_text) }));
    properties.insert(schema.keywords.clone(), json!({ "rich_text": rich_text(&keywords_text) }));
    properties.insert(
        schema.category.clone(),
        json!({ "select": { "name": detect_category(&video.title, summary) } }),
    );
    if let Some(date) = &video.upload_date {
        properties.insert(schema.video_date.clone(), json!({ "date": { "start": date } }));
    }

    json!({
        "parent": { "database_id": database_id },
        "icon": { "type": "emoji", "emoji": "🎬" },
        "properties": properties,
        "children": build_blocks(summary, document.transcript)
    })
}

#[derive(Debug, Deserialize)]
struct PageResponse {
    #[serde(default)]
    url: String,
}

#[async_trait]
impl NotePublisher for NotionPublisher {
    #[instrument(skip(self, document, target), fields(title = %document.video.title))]
    async fn publish(&self, document: SummaryDocument<'_>, target: &NotionTarget) -> Result<String> {
        let body = build_page_request(&document, &target.database_id, &self.schema);

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&target.api_key)
            .header("Notion-Version", NOTION_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| SophiaError::Notion(format!("Could not reach Notion: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let message = match status {
                reqwest::StatusCode::UNAUTHORIZED => "Invalid Notion API key.".to_string(),
                reqwest::StatusCode::NOT_FOUND => {
                    "Database not found. Check that the database is shared with your integration."
                        .to_string()
                }
                _ => format!("Notion error ({}): {}", status, error_body(response).await),
            };
            return Err(SophiaError::Notion(message));
        }

        let page: PageResponse = response
            .json()
            .await
            .map_err(|e| SophiaError::Notion(format!("Failed to parse Notion response: {}", e)))?;

        if page.url.is_empty() {
            return Err(SophiaError::Notion("Notion response did not include a page URL".into()));
        }

        info!("Created Notion page {}", page.url);
        Ok(page.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio_source::VideoInfo;

    const SUMMARY: &str = "## 🎯 Core Idea\nOwnership replaces the garbage collector.\n\n\
## 📌 Key Points\n• Each value has one owner\n• Borrows are checked at compile time\n\n\
## 💡 Actionable Ideas\n- Prefer &str parameters\n\n\
## 🔖 Keywords\nrust, ownership, borrowing\n\n\
## 🏷 Category\nTechnology\n";

    fn video() -> VideoInfo {
        VideoInfo {
            title: "Understanding Rust Ownership Deeply".to_string(),
            channel: "Ferris".to_string(),
            duration_seconds: 600,
            url: "https://youtu.be/abc12345678".to_string(),
            thumbnail: None,
            description: None,
            upload_date: Some("2024-03-01".to_string()),
        }
    }

    #[test]
    fn test_parse_section() {
        assert_eq!(
            parse_section(SUMMARY, "Key Points"),
            "• Each value has one owner\n• Borrows are checked at compile time"
        );
        assert_eq!(parse_section(SUMMARY, "Missing"), "");
    }

    #[test]
    fn test_truncate_chars_counts_characters() {
        assert_eq!(truncate_chars("short", 10), "short");
        assert_eq!(truncate_chars("ñññññññññ", 6), "ñññ...");
        assert_eq!(truncate_chars(&"x".repeat(2500), 2000).chars().count(), 2000);
    }

    #[test]
    fn test_detect_category() {
        assert_eq!(detect_category("anything", SUMMARY), "Technology");
        assert_eq!(detect_category("Guitar song covers", "no sections"), "Music");
        assert_eq!(detect_category("How to bake bread", ""), "Tutorial");
        assert_eq!(detect_category("Random clip", "nothing relevant"), "Other");
    }

    #[test]
    fn test_build_blocks_shapes() {
        let blocks = build_blocks("# Title\n## Section\n> quote\n• item\n---\nplain", "abc");
        let kinds: Vec<&str> = blocks.iter().map(|b| b["type"].as_str().unwrap()).collect();
        assert_eq!(
            kinds,
            ["heading_1", "heading_2", "quote", "bulleted_list_item", "divider", "paragraph", "divider", "toggle"]
        );
        assert_eq!(blocks[3]["bulleted_list_item"]["rich_text"][0]["text"]["content"], "item");
    }

    #[test]
    fn test_build_blocks_caps_children() {
        let summary = "line\n".repeat(300);
        let transcript = "x".repeat(RICH_TEXT_LIMIT * 150);
        let blocks = build_blocks(&summary, &transcript);
        assert_eq!(blocks.len(), MAX_CHILDREN);
        let toggle = blocks.last().unwrap();
        assert_eq!(toggle["toggle"]["children"].as_array().unwrap().len(), MAX_CHILDREN);
    }

    #[test]
    fn test_page_request_properties() {
        let video = video();
        let doc = SummaryDocument {
            video: &video,
            summary: SUMMARY,
            transcript: "transcript",
        };
        let body = build_page_request(&doc, "db123", &NotionSchema::default());
        let props = &body["properties"];

        assert_eq!(body["parent"]["database_id"], "db123");
        assert_eq!(props["Video URL"]["url"], "https://youtu.be/abc12345678");
        assert_eq!(props["Category"]["select"]["name"], "Technology");
        assert_eq!(props["Video Date"]["date"]["start"], "2024-03-01");
        assert_eq!(
            props["Keywords"]["rich_text"][0]["text"]["content"],
            "rust, ownership, borrowing"
        );
        let summary = props["Summary"]["rich_text"][0]["text"]["content"].as_str().unwrap();
        assert!(summary.starts_with("Ownership replaces the garbage collector.\n\n• Each value"));
    }

    #[test]
    fn test_page_request_fallbacks() {
        let mut video = video();
        video.upload_date = None;
        let doc = SummaryDocument {
            video: &video,
            summary: "Just a paragraph.",
            transcript: "",
        };
        let schema = NotionSchema {
            title: "Name".to_string(),
            ..NotionSchema::default()
        };
        let body = build_page_request(&doc, "db", &schema);
        let props = &body["properties"];

        assert!(props.get("Video Date").is_none());
        assert!(props.get("Name").is_some());
        assert_eq!(
            props["Keywords"]["rich_text"][0]["text"]["content"],
            "Understanding, Rust, Ownership, Deeply"
        );
        assert_eq!(props["Actions"]["rich_text"][0]["text"]["content"], "Just a paragraph.");
    }
}
