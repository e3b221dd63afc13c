pub mod gemini_completion_repository;
