pub mod catalog;
pub mod client;
pub mod config;
pub mod dto;
pub mod error;
pub mod mailer;
pub mod middleware;
pub mod models;
pub mod money;
pub mod payments;
pub mod response;
pub mod routes;
pub mod services;
pub mod state;
