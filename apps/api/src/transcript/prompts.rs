// Prompt template for course extraction from raw transcript text.

use crate::llm_client::prompts::JSON_ONLY_INSTRUCTION;

/// Source text beyond this many characters is not sent to the service.
pub const MAX_PROMPT_SOURCE_CHARS: usize = 10_000;

/// Course extraction template. Replace `{json_only}` and `{transcript}`.
pub const EXTRACTION_PROMPT_TEMPLATE: &str = r#"Extract college courses from this transcript. Return ONLY a JSON array.

Format: [{"courseCode":"MATH 1A","courseName":"Calculus I","units":5,"grade":"A","semester":"Fall 2023"}]

Rules:
- grade must be one of A, A-, B+, B, B-, C+, C, C-, D, F, P
- units is a number (semester units)
- include every completed course exactly once per attempt; repeated courses appear once per attempt
- skip in-progress courses with no grade

{json_only}

Transcript:
{transcript}"#;

/// Renders the extraction prompt. Pure: the same text always yields the same prompt.
pub fn build_extraction_prompt(transcript_text: &str) -> String {
    let source: String = transcript_text
        .chars()
        .take(MAX_PROMPT_SOURCE_CHARS)
        .collect();
    EXTRACTION_PROMPT_TEMPLATE
        .replace("{json_only}", JSON_ONLY_INSTRUCTION)
        .replace("{transcript}", &source)
}
