mod answer;
mod build;

pub use answer::{answer_question, build_context, QueryInput, QueryOutcome};
pub use build::{build_index, manifest_path, IndexBuildInput, IndexManifest};
