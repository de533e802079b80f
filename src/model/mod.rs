pub mod bkt;
pub mod partition;
pub mod sampler;
pub mod slice;
pub mod wcrp;

pub use bkt::{BktParam, BktParams};
pub use partition::{ConcordanceScope, Partition};
pub use sampler::Sampler;
