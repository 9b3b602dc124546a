// Resume/job comparison: the prompt, the canonical result shape, the analyzer
// seam, presentation and the optional textual rewrite.

pub mod analyzer;
pub mod formatter;
pub mod models;
pub mod prompts;
pub mod rewrite;
