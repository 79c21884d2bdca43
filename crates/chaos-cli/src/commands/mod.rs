pub mod config;
pub mod members;
pub mod run;
pub mod serve;
