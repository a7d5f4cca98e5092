//! Console server: the session gate in front of the console pages.

pub mod gate;
pub mod router;
