pub mod chunk;
pub mod columns;
pub mod config;
pub mod container;
pub mod document;
pub mod logging;
pub mod render;
pub mod theme;
