pub mod app;
pub mod config;
pub mod detect;
pub mod domain;
pub mod error;
pub mod matrix;
pub mod output;
pub mod select;
pub mod store;
pub mod table;
pub mod taxon;
