pub mod interactive;
pub mod pipelines;
