pub mod chat;
pub mod checkpoints;
pub mod course;
pub mod gemini;
pub mod itinerary;
pub mod pacing;
pub mod summary;
