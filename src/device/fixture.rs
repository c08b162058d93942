//! File-backed device connector
//!
//! Serves a recorded device state (`device.json`, `users.json`,
//! `punches.json`) from a directory. Used by the integration tests and as a
//! development backend when no clock hardware is on the network; a hardware
//! protocol driver plugs into the same [`DeviceConnector`] seam.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::{Error, Result};

use super::{DeviceConnector, DeviceSession, DeviceUser, Punch};

#[derive(Debug, Clone, Deserialize)]
struct FixtureIdentity {
    device_name: String,
    serial_number: String,
    mac_address: String,
    network: HashMap<String, String>,
}

/// Connector that reads the device state from fixture files.
pub struct FixtureConnector {
    dir: PathBuf,
}

impl FixtureConnector {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn read_json<T: serde::de::DeserializeOwned>(&self, name: &str) -> Result<T> {
        let path = self.dir.join(name);
        let text = std::fs::read_to_string(&path)
            .map_err(|e| Error::Device(format!("cannot read fixture {}: {e}", path.display())))?;
        serde_json::from_str(&text)
            .map_err(|e| Error::Device(format!("malformed fixture {}: {e}", path.display())))
    }
}

#[async_trait]
impl DeviceConnector for FixtureConnector {
    type Session = FixtureSession;

    async fn connect(&self) -> Result<FixtureSession> {
        let identity: FixtureIdentity = self.read_json("device.json")?;
        let users: Vec<DeviceUser> = self.read_json("users.json")?;
        let punches: Vec<Punch> = self.read_json("punches.json")?;

        debug!(dir = %self.dir.display(), "fixture device session opened");
        Ok(FixtureSession {
            identity,
            users,
            punches,
            released: false,
        })
    }
}

/// Session over a loaded fixture snapshot.
#[derive(Debug)]
pub struct FixtureSession {
    identity: FixtureIdentity,
    users: Vec<DeviceUser>,
    punches: Vec<Punch>,
    released: bool,
}

impl FixtureSession {
    /// Whether `close` has run; lets tests assert the scoped-release rule.
    pub fn is_released(&self) -> bool {
        self.released
    }
}

#[async_trait]
impl DeviceSession for FixtureSession {
    async fn device_name(&mut self) -> Result<String> {
        Ok(self.identity.device_name.clone())
    }

    async fn serial_number(&mut self) -> Result<String> {
        Ok(self.identity.serial_number.clone())
    }

    async fn mac_address(&mut self) -> Result<String> {
        Ok(self.identity.mac_address.clone())
    }

    async fn network_params(&mut self) -> Result<HashMap<String, String>> {
        Ok(self.identity.network.clone())
    }

    async fn users(&mut self) -> Result<Vec<DeviceUser>> {
        Ok(self.users.clone())
    }

    async fn punches(&mut self) -> Result<Vec<Punch>> {
        Ok(self.punches.clone())
    }

    async fn close(&mut self) -> Result<()> {
        self.released = true;
        debug!("fixture device session released");
        Ok(())
    }
}

/// Write a fixture directory; shared by the integration tests.
pub fn write_fixture(
    dir: &Path,
    device_json: &serde_json::Value,
    users_json: &serde_json::Value,
    punches_json: &serde_json::Value,
) -> Result<()> {
    std::fs::create_dir_all(dir)?;
    std::fs::write(dir.join("device.json"), serde_json::to_vec_pretty(device_json)?)?;
    std::fs::write(dir.join("users.json"), serde_json::to_vec_pretty(users_json)?)?;
    std::fs::write(dir.join("punches.json"), serde_json::to_vec_pretty(punches_json)?)?;
    Ok(())
}
