//! Source-text handling

pub mod splitter;

pub use splitter::split_paragraphs;
