pub mod builder;
pub mod chunker;
pub mod extractor;
