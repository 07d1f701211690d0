mod catalog;
mod chat;
mod profile;
mod stats;


pub use catalog::*;
pub use chat::*;
pub use profile::*;
pub use stats::*;
