//! graphscore: pulmonary embolism severity scores on arterial obstruction trees.
//!
//! Layers, innermost first:
//! - `domain`: arterial tree, level classification, Mastora and Qanadli scorers
//! - `application`: graph file loading and scoring services
//! - `infrastructure`: filesystem access and service wiring
//! - `cli`: argument parsing, command dispatch and terminal output

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;
