//! Terminal renderers.
//!
//! - [`terminal`]: the client view (summary row, banners, four tabs) and the
//!   offline `scan` report.

pub mod terminal;
