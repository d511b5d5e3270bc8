//! thunderpack - assembles BepInEx mod bundles from Thunderstore package lists
//!
//! A bundle is built in three steps: the dependency closure of the requested
//! packages is resolved ([`resolver`]), every archive is fetched into a local
//! cache ([`cache`], [`download`]), and the archives are laid out into a fresh
//! loader tree in priority order ([`installer`], [`tree`]). [`bundle`] runs the
//! whole pipeline.

pub mod bundle;
pub mod cache;
pub mod cli;
pub mod config;
pub mod download;
pub mod error;
pub mod installer;
pub mod modlist;
pub mod package;
pub mod provider;
pub mod report;
pub mod resolver;
pub mod tree;

pub use error::{BundleError, Result};
