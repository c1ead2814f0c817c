pub mod document;
pub mod recommendation;
