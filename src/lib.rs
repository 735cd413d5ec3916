//! Member registration for the Tenkei Aikidojo website.
//!
//! `registration` holds the rule set and the client-side form validator;
//! `gateway` is the HTTP service that re-validates submissions and proxies
//! them to the registration API.

pub mod config;
pub mod gateway;
pub mod registration;
pub mod turnstile;
pub mod upstream;
