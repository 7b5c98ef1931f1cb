//! Summary prompt template.
//!
//! Templates use `{{name}}` placeholders. The standard variables are
//! `video_title`, `channel`, `duration` and `transcript`; custom variables
//! from the config file are available too.

use crate::audio_source::VideoInfo;
use std::collections::HashMap;

/// Default system prompt for summaries.
pub const DEFAULT_SUMMARY_PROMPT: &str = r#"You are an expert content analyst. Your task is to write a structured executive summary of the following YouTube video.

**Video:** {{video_title}}
**Channel:** {{channel}}
**Duration:** {{duration}}

Write the summary in exactly this format:

## 🎯 Core Idea
A single sentence that captures the essence of the video.

## 📌 Key Points
• [Point 1, two lines at most]
• [Point 2, two lines at most]
• [Point 3, two lines at most]
• [Point 4, two lines at most]
• [Point 5, two lines at most]

## 💡 Actionable Ideas
• [A concrete action the viewer can apply today]
• [A second practical action]
• [A third practical action]

## 🔑 Highlighted Quote
> "A memorable verbatim quote from the video"

## 📊 Where to Apply
In 2-3 lines, describe who benefits most from this content and in which situations to apply it.

## 🔖 Keywords
Up to six comma-separated keywords.

## 🏷 Category
Pick ONE category from this list (write only the name, no explanation): Tutorial, Entertainment, Education, Music, Sports, Technology, News, Health, Other

---
Use the following content as the source:

{{transcript}}"#;

/// Render a template, replacing each `{{name}}` found in `vars`.
///
/// Unknown placeholders are left as literal text. Substituted values are not
/// scanned again, so a transcript containing `{{channel}}` stays intact.
pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            out.push_str(&rest[start..]);
            return out;
        };

        let key = &after[..end];
        match vars.get(key) {
            Some(value) => out.push_str(value),
            None => {
                out.push_str("{{");
                out.push_str(key);
                out.push_str("}}");
            }
        }
        rest = &after[end + 2..];
    }

    out.push_str(rest);
    out
}

/// The standard variables for a video and its transcript.
pub fn summary_variables(video: &VideoInfo, transcript: &str) -> HashMap<String, String> {
    HashMap::from([
        ("video_title".to_string(), video.title.clone()),
        ("channel".to_string(), video.channel.clone()),
        ("duration".to_string(), video.formatted_duration()),
        ("transcript".to_string(), transcript.to_string()),
    ])
}

/// Render with custom variables first, then the standard ones on top.
pub fn render_with_custom(
    template: &str,
    custom: &HashMap<String, String>,
    vars: &HashMap<String, String>,
) -> String {
    let mut merged = custom.clone();
    for (key, value) in vars {
        merged.insert(key.clone(), value.clone());
    }
    render(template, &merged)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_render_template() {
        let template = "Hello {{name}}, you have {{count}} messages.";
        let result = render(template, &vars(&[("name", "Alice"), ("count", "5")]));
        assert_eq!(result, "Hello Alice, you have 5 messages.");
    }

    #[test]
    fn test_unknown_placeholder_is_literal() {
        let result = render("{{video_title}} by {{author}}", &vars(&[("video_title", "Intro")]));
        assert_eq!(result, "Intro by {{author}}");
    }

    #[test]
    fn test_values_are_not_rescanned() {
        let result = render(
            "{{transcript}} on {{channel}}",
            &vars(&[("transcript", "say {{channel}}"), ("channel", "Ferris")]),
        );
        assert_eq!(result, "say {{channel}} on Ferris");
    }

    #[test]
    fn test_unclosed_braces_are_kept() {
        assert_eq!(render("a {{b", &HashMap::new()), "a {{b");
    }

    #[test]
    fn test_standard_variables_override_custom() {
        let custom = vars(&[("channel", "custom"), ("tone", "casual")]);
        let standard = vars(&[("channel", "Ferris")]);
        let result = render_with_custom("{{channel}} / {{tone}}", &custom, &standard);
        assert_eq!(result, "Ferris / casual");
    }

    #[test]
    fn test_default_prompt_uses_standard_variables() {
        for name in ["video_title", "channel", "duration", "transcript"] {
            assert!(DEFAULT_SUMMARY_PROMPT.contains(&format!("{{{{{}}}}}", name)));
        }
    }
}
