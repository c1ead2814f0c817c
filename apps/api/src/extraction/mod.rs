// Document extraction: upload → backend field extraction → merge → local store.

pub mod client;
pub mod flow;
pub mod handlers;
pub mod merge;
pub mod payload;
