//! Outbound services: the remote API client and the background retry loop

pub mod api_client;
pub mod delivery;
