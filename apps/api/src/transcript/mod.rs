// Transcript ingestion: PDF text extraction, course extraction prompts,
// course records, and the course-management endpoints.

pub mod courses;
pub mod extractor;
pub mod handlers;
pub mod prompts;
