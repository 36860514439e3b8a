mod attributes;
mod chat;
mod common;
mod document;
mod persona;

pub use attributes::*;
pub use chat::*;
pub use common::*;
pub use document::*;
pub use persona::*;
