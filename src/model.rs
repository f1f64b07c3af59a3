//! Domain model shared by every pipeline stage.

pub mod api;
pub mod dead_letter;
pub mod id;
pub mod message;
pub mod outcome;
pub mod request;

pub use api::*;
pub use dead_letter::*;
pub use id::*;
pub use message::*;
pub use outcome::*;
pub use request::*;
