pub mod reducer;
pub mod session;
pub mod validation;

pub use reducer::{reduce, EditorAction};
pub use session::{EditorError, EditorSession};
