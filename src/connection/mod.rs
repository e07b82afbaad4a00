//! Connection management: device selection, supersession and commands

mod link;
mod session;


pub use link::MeterLink;
