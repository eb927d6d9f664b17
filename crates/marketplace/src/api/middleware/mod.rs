//! API middleware.

mod viewer;

pub use viewer::viewer_middleware;
