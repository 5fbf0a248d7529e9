pub mod broker;
pub mod instrument;
pub mod order;
pub mod portfolio;
