//! Prompts for the content-structuring oracle.
//!
//! All prompt text lives here so it can be tuned without touching the retry
//! and validation logic in [`crate::pipeline::oracle`], and so tests can
//! inspect it without a live provider.

use crate::config::{Audience, Tone};

/// System prompt for turning document text into a slide outline.
pub const OUTLINE_SYSTEM_PROMPT: &str = r#"You are an expert presentation writer. You turn long documents into short, well-structured slide decks.

Follow these rules precisely:

1. STRUCTURE
   - The first slide is the title slide: its title names the whole deck
   - Every later slide covers one idea with 3 to 5 short bullets
   - Keep the document's order of topics

2. BULLETS
   - One line each, no trailing punctuation
   - Plain text only: no Markdown, no numbering, no emoji

3. IMAGES
   - When a slide discusses a figure or table, name it in "image_hint"
     exactly as the document does (e.g. "Figure 3", "Table 2")
   - Otherwise describe what kind of picture would fit, or omit the field

4. OUTPUT FORMAT
   - Output ONLY a JSON array starting with '[' and ending with ']'
   - Do NOT wrap it in ```json fences
   - Do NOT add commentary before or after the array"#;

/// Shape the oracle must answer with, quoted verbatim in the user prompt.
pub const RESPONSE_SHAPE: &str = r#"[
  {
    "title": "Slide Title",
    "bullets": ["Point 1", "Point 2"],
    "image_hint": "Figure or context where an image might be relevant"
  }
]"#;

/// User prompt carrying the run parameters and the document itself.
pub fn outline_user_prompt(
    document_text: &str,
    audience: Audience,
    tone: Tone,
    instructions: &str,
) -> String {
    let instructions = if instructions.trim().is_empty() {
        "None"
    } else {
        instructions.trim()
    };
    format!(
        "Create a presentation outline from the following text content.\n\
         Keep the response concise and within reasonable length.\n\n\
         Target Audience: {audience}\n\
         Tone: {tone}\n\
         Additional Instructions: {instructions}\n\n\
         Text Content:\n{document_text}\n\n\
         Response format must be exactly like this:\n{RESPONSE_SHAPE}"
    )
}
