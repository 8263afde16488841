// Session API client modules
//
// Hand-written client for the controller's cookie-authenticated endpoints
// (stat/, cmd/, rest/, self/), all wrapped in the standard
// `{ meta: { rc, msg }, data: [...] }` envelope.

pub mod auth;
pub mod client;
pub mod devices;
pub mod models;
pub mod sites;

pub use client::SessionClient;
