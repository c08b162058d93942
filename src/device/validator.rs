//! Device identity validation
//!
//! A device with missing identity fields produces documents that cannot be
//! attributed to a clock, so validation failure aborts the cycle instead of
//! shipping unattributable data.

use std::collections::HashMap;

use crate::{Error, Result};

use super::{DeviceDescription, DeviceInfo, NetworkConfig};

/// Validate the raw identity fields read from a session and assemble a
/// [`DeviceInfo`]. The serial number doubles as the device id.
pub fn validate_identity(
    device_name: &str,
    serial_number: &str,
    mac_address: &str,
    network_params: &HashMap<String, String>,
) -> Result<DeviceInfo> {
    if device_name.trim().is_empty() {
        return Err(Error::Validation("device reported an empty name".to_string()));
    }
    if serial_number.trim().is_empty() {
        return Err(Error::Validation("device reported an empty serial number".to_string()));
    }
    if mac_address.trim().is_empty() {
        return Err(Error::Validation("device reported an empty MAC address".to_string()));
    }

    let ip = required_param(network_params, "ip")?;
    let gateway = required_param(network_params, "gateway")?;

    Ok(DeviceInfo {
        device_id: serial_number.to_string(),
        device_name: device_name.to_string(),
        description: DeviceDescription {
            serial_number: serial_number.to_string(),
            mac_address: mac_address.to_string(),
            network: NetworkConfig { ip, gateway },
        },
    })
}

fn required_param(params: &HashMap<String, String>, key: &str) -> Result<String> {
    match params.get(key) {
        Some(value) if !value.trim().is_empty() => Ok(value.clone()),
        _ => Err(Error::Validation(format!("device network params missing '{key}'"))),
    }
}
