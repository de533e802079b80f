//! Skilltrace - nonparametric Bayesian skill discovery from student data
//!
//! Couples a Weighted Chinese Restaurant Process prior over item-to-skill
//! partitions with a per-skill Bayesian Knowledge Tracing model of learning,
//! and infers both by MCMC.

pub mod core;
pub mod data;
pub mod model;
pub mod report;
