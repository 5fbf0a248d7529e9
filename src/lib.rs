pub mod api;
pub mod bootstrap;
pub mod config;
pub mod feed;
pub mod ledger;
pub mod market;
pub mod persistence;
pub mod seed;
pub mod types;
