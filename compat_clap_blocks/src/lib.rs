//! Building blocks for [`clap`]-driven configs.
//!
//! They can easily be re-used using `#[clap(flatten)]`.
pub mod catalog;
pub mod credentials;
pub mod logging;
pub mod token;
