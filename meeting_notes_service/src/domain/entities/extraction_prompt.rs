/// Instructions sent ahead of the meeting notes.
///
/// The keys listed here must stay in sync with `ExtractionResult`.
const EXTRACTION_INSTRUCTIONS: &str = r#"From the meeting notes below, produce:
1. A 2-3 sentence summary
2. A list of decisions
3. A JSON array of actionItems, each with a "task" and optional "owner" and "due" fields

Return ONLY a JSON object with exactly the keys "summary", "decisions" and "actionItems":
{"summary": "...", "decisions": ["..."], "actionItems": [{"task": "...", "owner": "...", "due": "..."}]}
Do not write any prose around the JSON object and do not wrap it in markdown code fences."#;

/// The full text sent to the completion API for one meeting
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionPrompt(String);

impl ExtractionPrompt {
    /// Embeds the meeting text, untouched, after the extraction instructions
    pub fn build(meeting_text: &str) -> Self {
        Self(format!(
            "{}\n\nMeeting Notes:\n{}\n",
            EXTRACTION_INSTRUCTIONS, meeting_text
        ))
    }
}

impl AsRef<str> for ExtractionPrompt {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ExtractionPrompt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}
