mod hierarchy;
mod record;
mod text;
mod types;

pub use hierarchy::*;
pub use record::*;
pub use text::*;
pub use types::*;
