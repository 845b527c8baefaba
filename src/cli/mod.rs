pub mod input;
pub mod options;
pub mod output;

pub use input::*;
pub use options::*;
pub use output::*;
