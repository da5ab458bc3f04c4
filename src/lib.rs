pub mod auth;
pub mod cli;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod proxy;
pub mod registrations;
pub mod routes;
pub mod state;

#[cfg(test)]
pub mod testing;
