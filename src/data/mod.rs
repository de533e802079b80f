pub mod dataset;
pub mod folds;

pub use dataset::Dataset;
pub use folds::FoldAssignments;
