pub mod api;
pub mod config;
pub mod dates;
pub mod error;
pub mod events;
pub mod models;
pub mod scheduling;
pub mod services;
pub mod session;
pub mod state;
pub mod store;
pub mod supabase;
pub mod views;
