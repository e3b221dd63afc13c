pub mod extract_meeting_notes;
