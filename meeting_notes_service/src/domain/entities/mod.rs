pub mod extraction_prompt;
pub mod extraction_result;
pub mod meeting_input;
