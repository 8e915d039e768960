pub mod header;
pub mod utils;

pub use header::draw_header;
pub use utils::{error_color, error_message, truncate};
