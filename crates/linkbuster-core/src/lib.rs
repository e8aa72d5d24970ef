pub mod config;
pub mod logging;

pub mod bus;
pub mod cache;
pub mod clock;
pub mod heuristic;
pub mod notify;
pub mod orchestrator;
pub mod remote;
pub mod scan;
pub mod service;
pub mod settings;
pub mod stats;
pub mod store;
pub mod url_model;
