use serde::{Deserialize, Serialize, Serializer};

use crate::domain::services::code_fence::strip_code_fence;

/// What is extracted from a meeting: the body of a successful response.
///
/// The reply is checked against the expected shape, then sent back as the model wrote it.
/// Unknown top-level keys are rejected so that a successful result always has
/// exactly `summary`, `decisions` and `actionItems`.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionResult {
    pub summary: String,
    pub decisions: Vec<String>,
    pub action_items: Vec<ActionItem>,
    reply: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ActionItem {
    pub task: String,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub due: Option<String>,
}

/// Expected shape of the reply
#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct ExtractionFields {
    summary: String,
    decisions: Vec<String>,
    action_items: Vec<ActionItem>,
}

impl ExtractionResult {
    /// Parses the textual reply of the model, after removing any markdown code fence
    pub fn from_reply(reply: &str) -> Result<Self, serde_json::Error> {
        let reply: serde_json::Value = serde_json::from_str(strip_code_fence(reply))?;
        let fields = ExtractionFields::deserialize(&reply)?;

        Ok(Self {
            summary: fields.summary,
            decisions: fields.decisions,
            action_items: fields.action_items,
            reply,
        })
    }
}

impl Serialize for ExtractionResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.reply.serialize(serializer)
    }
}
