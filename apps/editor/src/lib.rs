//! Local-first editing engine for resumes: reducer, local persistence, cloud
//! synchronization, and the signed PDF proxy served by the binary.

pub mod api_client;
pub mod config;
pub mod editor;
pub mod errors;
pub mod identity;
pub mod models;
pub mod pdf_proxy;
pub mod render;
pub mod routes;
pub mod signing;
pub mod state;
pub mod store;
pub mod sync;
