//! Command handlers for the `catalog` binary.

mod handlers;
mod io;
mod print;

pub use handlers::{EditView, PageView, handle};
pub use io::{build_patch, flag_patch, read_patch_file};
pub use print::print_json;
