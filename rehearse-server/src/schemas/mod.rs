//! Request / response bodies of the HTTP API.

pub mod chat;
pub mod feedback;
pub mod health;
