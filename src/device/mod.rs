//! Time-clock device collaborator
//!
//! The hardware protocol driver is external to this crate; the pipeline
//! talks to it through the [`DeviceConnector`] / [`DeviceSession`] traits.
//! A session is a scoped resource: the device is disabled for the duration
//! of a session and [`DeviceSession::close`] re-enables and releases it, so
//! `close` must run on every path, including errors.

pub mod fixture;
pub mod validator;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::Result;

/// A single timestamped scan event for a user, as reported by the device.
///
/// The device guarantees nothing about uniqueness or ordering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Punch {
    pub user_id: String,
    pub timestamp: NaiveDateTime,
}

/// Privilege level of a directory entry on the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserPrivilege {
    Admin,
    #[default]
    User,
}

/// One entry of the device's user directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceUser {
    pub user_id: String,
    pub name: String,
    #[serde(default)]
    pub privilege: UserPrivilege,
}

/// Validated device identity, as delivered to the remote API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub device_id: String,
    pub device_name: String,
    pub description: DeviceDescription,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceDescription {
    pub serial_number: String,
    pub mac_address: String,
    pub network: NetworkConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub ip: String,
    pub gateway: String,
}

/// An open, exclusive session with the device.
#[async_trait]
pub trait DeviceSession: Send {
    async fn device_name(&mut self) -> Result<String>;
    async fn serial_number(&mut self) -> Result<String>;
    async fn mac_address(&mut self) -> Result<String>;
    async fn network_params(&mut self) -> Result<HashMap<String, String>>;
    async fn users(&mut self) -> Result<Vec<DeviceUser>>;
    async fn punches(&mut self) -> Result<Vec<Punch>>;

    /// Re-enable the device and release the session. Must be called on every
    /// path; the device stays disabled for other readers until it runs.
    async fn close(&mut self) -> Result<()>;
}

/// Factory for device sessions. At most one session is open at a time.
#[async_trait]
pub trait DeviceConnector: Send + Sync {
    type Session: DeviceSession;

    async fn connect(&self) -> Result<Self::Session>;
}
