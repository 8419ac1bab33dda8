//! Concrete collaborators for the gridplay engine: media decoding, display
//! backends, label text and the configuration file.

pub mod cli;
pub mod config;
pub mod display;
pub mod label;
pub mod macros;
pub mod media;
