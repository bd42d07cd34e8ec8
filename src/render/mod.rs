pub mod skeleton;
pub mod window;

pub use skeleton::{window_title, Projection};
pub use window::DebugView;
