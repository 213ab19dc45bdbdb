pub mod algorithm;
pub mod app;
pub mod config;
pub mod errors;
pub mod executor;
pub mod scheduler;
pub mod shutdown;
pub mod sink;
pub mod strategy;

#[cfg(test)]
mod test_utils;
