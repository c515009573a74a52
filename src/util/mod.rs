//! Byte-array compression and whole-file helpers used around compressed lists.

pub mod file;
pub mod gzip;

pub use file::{
    print_string, read_line_at, read_lines, read_object, read_to_string, write_object,
};
pub use gzip::{unzip, zip};
