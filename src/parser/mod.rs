// Parser module: turns results-page markup into typed fields.

pub mod dates;
pub mod results_parser;

pub use results_parser::{Parser, ResultsParser};
