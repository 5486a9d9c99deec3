// Data models for the intra API

pub mod intra;

pub use intra::{Me, ProjectRecord, ProjectStatus};
