//! Instruction prompts sent to the generative model.
//!
//! Keeping the prompt here means the wording can change without touching the
//! request or validation code, and tests can inspect it directly.
//!
//! Callers can override the default via
//! [`crate::config::ServiceConfig::system_prompt`].

/// Default instruction for turning a PDF into a mind-map JSON tree.
///
/// The shape it asks for is exactly the one [`crate::pipeline::validate`]
/// accepts. The model is asked for UUIDs, but missing ones are backfilled.
pub const MINDMAP_GENERATION_PROMPT: &str = r#"Analyze the content of the provided PDF document. Your goal is to generate a hierarchical mind map representing the key topics and sub-topics discussed.

Follow these steps:
1. Identify the main overarching topic of the document. This will be the root branch.
2. Identify the major sections or primary sub-topics branching off the main topic.
3. For each major section, identify further nested sub-topics if applicable. Create a hierarchy up to a reasonable depth (e.g., 3-4 levels).
4. For EACH topic and sub-topic (including the root), generate a concise, informative summary (1-2 sentences).
5. Structure your ENTIRE output STRICTLY as a single JSON object conforming to the following schema:

{
  "id": "string (generate a unique UUID)",
  "topic": "string (the topic title)",
  "summary": "string (the concise summary)",
  "children": [
    {
      "id": "string (generate a unique UUID)",
      "topic": "string",
      "summary": "string",
      "children": [ ... ]
    }
  ]
}

Important Rules:
- Generate unique UUIDs for all `id` fields.
- Ensure the output is ONLY the JSON object, with no surrounding text, explanations, or markdown formatting (like ```json ... ```).
- If the document content is unclear or insufficient to generate a meaningful mind map, return a JSON object representing a single root node with an appropriate message in the summary. Example:
  {
    "id": "...",
    "topic": "Analysis Error",
    "summary": "Could not extract meaningful topics from the provided PDF.",
    "children": []
  }"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_names_every_schema_field() {
        for field in ["\"id\"", "\"topic\"", "\"summary\"", "\"children\""] {
            assert!(
                MINDMAP_GENERATION_PROMPT.contains(field),
                "prompt is missing {field}"
            );
        }
    }

    #[test]
    fn prompt_demands_bare_json() {
        assert!(MINDMAP_GENERATION_PROMPT.contains("ONLY the JSON object"));
    }
}
