mod clock;
mod config;
mod discover;
mod logging;
mod session_file;
mod terminal;
mod ticker;
mod watch;

pub use clock::*;
pub use config::*;
pub use discover::*;
pub use logging::*;
pub use session_file::*;
pub use terminal::*;
pub use ticker::*;
pub use watch::*;
