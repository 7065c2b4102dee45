pub mod pipeline;
pub mod router;

pub use pipeline::{build_pipeline, wrap_tree, EdgeDependencies};
pub use router::{ApiTree, ApiVersion, VersionRouter};
