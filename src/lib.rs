// Raffle Settlement
// Ticket sale settlement and raffle lifecycle engine for Solana raffles

// Core modules
pub mod config;
pub mod error;
pub mod state;
pub mod utils;

// External collaborators
pub mod chain;
pub mod indexer;
pub mod store;

// Prize selection and purchases
pub mod asset_classifier;
pub mod eligibility;
pub mod payment_instruction;
pub mod processor;
pub mod settlement;

// Lifecycle, notifications and background jobs
pub mod activity;
pub mod draw_scheduler;
pub mod floor_price;
pub mod lifecycle;
pub mod notification;
pub mod seen_outcomes;

pub use config::EngineConfig;
pub use error::EngineError;
pub use processor::Processor;
