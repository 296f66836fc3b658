pub mod artifact;
pub mod batch;
pub mod classifier;
pub mod cli;
pub mod config;
pub mod cut;
pub mod error;
pub mod extract;
pub mod folder;
pub mod pages;
pub mod reconcile;
pub mod report;
pub mod splitter;
pub mod store;
pub mod usage;
pub mod util;
pub mod verify;
pub mod worker;

pub use error::{Result, SplitError};
