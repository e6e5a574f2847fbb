pub mod check;
pub mod config;
pub mod detect;
pub mod extract;
