//! Prompt text for each generation stage.

use crate::db::models::{DesignStyle, TargetSize};

pub fn correction(text: &str) -> String {
    format!(
        "Fix the spelling, grammar, and punctuation of the following text while keeping the \
         original meaning and tone. Return ONLY the corrected text, with no explanations or \
         surrounding quotes:\n\n{}",
        text
    )
}

/// `referenced_files` are attachments the provider cannot read directly; only their names go in.
pub fn research(
    topic: &str,
    instructions: Option<&str>,
    has_attachments: bool,
    referenced_files: &[&str],
) -> String {
    let mut prompt = format!(
        "Gather the latest information, key facts, and current trends about: {}.",
        topic
    );
    if let Some(instructions) = instructions {
        prompt.push_str(&format!(
            "\nKeep these user instructions in mind for context: {}",
            instructions
        ));
    }
    if has_attachments {
        prompt.push_str(
            "\nReference documents and images are attached. Use their content to write a \
             highly relevant summary for a social media post.",
        );
    } else {
        prompt.push_str("\nWrite a concise summary suitable as the basis of a social media post.");
    }
    for name in referenced_files {
        prompt.push_str(&format!("\nReference File Attached: {}", name));
    }
    prompt
}

pub fn templates(topic: &str, styles: &[DesignStyle], count: usize) -> String {
    format!(
        "Find {} specific types of Canva templates that would be perfect for a social media \
         post about \"{}\" using styles like {}. For each suggestion, provide a name, a brief \
         description, and a Canva search URL.",
        count,
        topic,
        DesignStyle::join_labels(styles)
    )
}

pub fn captions(topic: &str, research_summary: &str, instructions: Option<&str>) -> String {
    let mut prompt = format!(
        "Create an engaging social media caption and hashtags for a post about \"{}\".\n\
         Context from research and attachments: {}",
        topic, research_summary
    );
    if let Some(instructions) = instructions {
        prompt.push_str(&format!("\nUser instructions: {}", instructions));
    }
    prompt
}

pub fn image(
    topic: &str,
    styles: &[DesignStyle],
    size: TargetSize,
    instructions: Option<&str>,
    with_reference: bool,
) -> String {
    let styles = DesignStyle::join_labels(styles);
    let mut prompt = if with_reference {
        format!(
            "Using the attached image as inspiration, generate a high-end poster for \"{}\". \
             Style: {}.",
            topic, styles
        )
    } else {
        format!(
            "A premium quality social media poster or advertisement for \"{}\". Style: {}. \
             Suitability: {}.",
            topic,
            styles,
            size.label()
        )
    };
    if let Some(instructions) = instructions {
        prompt.push_str(&format!(" Additional direction: {}", instructions));
    }
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_research_lists_referenced_files() {
        let prompt = research("Solar", Some("be brief"), true, &["deck.pptx", "notes.txt"]);
        assert!(prompt.contains("about: Solar."));
        assert!(prompt.contains("user instructions in mind for context: be brief"));
        assert!(prompt.contains("Reference File Attached: deck.pptx"));
        assert!(prompt.ends_with("Reference File Attached: notes.txt"));
    }

    #[test]
    fn test_image_prompt_switches_on_reference() {
        let styles = [DesignStyle::Retro];
        let scratch = image("Tea", &styles, TargetSize::Square, None, false);
        let guided = image("Tea", &styles, TargetSize::Square, Some("warm"), true);
        assert!(scratch.starts_with("A premium quality"));
        assert!(scratch.contains("Retro & Vintage"));
        assert!(guided.starts_with("Using the attached image"));
        assert!(guided.ends_with("Additional direction: warm"));
    }
}
