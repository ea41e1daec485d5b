//! Core data types for dependencies and scan sessions.
//!
//! - [`Dependency`] - One package identity found in a manifest or lockfile
//! - [`Ecosystem`] - The registry graph a dependency belongs to
//! - [`SourceType`] - Where an npm-family package was resolved from
//! - [`ScanSession`] - The result of one scan, returned to the caller
//!
//! # Example
//!
//! ```
//! use depscan::{Dependency, Ecosystem};
//!
//! let dep = Dependency::new("lodash", "4.17.21", Ecosystem::Npm);
//! assert_eq!(dep.key(), ("lodash", "4.17.21"));
//! ```

mod dependency;
mod session;

pub use dependency::*;
pub use session::*;
