//! Services that keep file handling out of the compositing logic

pub mod io;

pub use io::ImageIOService;
