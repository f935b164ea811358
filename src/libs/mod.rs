pub mod align;
pub mod config;
pub mod error;
pub mod gene;
pub mod io;
pub mod jobs;
pub mod matrix;
pub mod pipeline;
pub mod render;
pub mod store;
