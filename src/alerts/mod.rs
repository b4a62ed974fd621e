pub mod evaluator;
pub mod journal;
pub mod registry;

pub use evaluator::{AlertEvaluator, AlertEvent};
pub use journal::AlertJournal;
pub use registry::{AlertDefinition, AlertRegistry};
