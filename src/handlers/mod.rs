// handlers/mod.rs - request handlers grouped by portal resource
//
// Most `/api` handlers are one-liners over a `ProxyEndpoint` descriptor;
// `auth`, `registrations` and `health` are answered by the gateway itself.

pub mod attendance;
pub mod auth;
pub mod classes;
pub mod exams;
pub mod files;
pub mod guidance;
pub mod health;
pub mod homework;
pub mod notifications;
pub mod payments;
pub mod registrations;
pub mod reports;

pub use health::health_get;
