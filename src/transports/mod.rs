//! Concrete port implementations

pub mod io;

pub use io::IoPort;
