// Candidate evaluation: HR requirements + resume text through the
// summarize → compare → advise pipeline.
// All generation calls go through llm_client::TextGenerator.

pub mod handlers;
pub mod pipeline;
pub mod prompts;
pub mod requirements;
pub mod resume;
pub mod submission;
