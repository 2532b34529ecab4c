// Scrapes an election-results page on a schedule and serves the latest extraction as JSON

pub mod config;
pub mod control;
pub mod model;
pub mod normalizer;
pub mod parser;
pub mod scraper;
pub mod server;
pub mod storage;
pub mod updater;
pub mod utils;
