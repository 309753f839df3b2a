pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod ledger;
pub mod logging;
pub mod mail;
pub mod organizer;
pub mod report;
pub mod scanner;
