//! Startup lookup of the robot in the KubeEdge device registry.

use std::fs;
use std::path::Path;

use padbot_types::{DeviceIdentity, DeviceProfiles, MapperError};
use tracing::{info, warn};

/// Read and parse `deviceProfile.json`.
pub fn load_profiles(path: &Path) -> Result<DeviceProfiles, MapperError> {
    let raw = fs::read_to_string(path).map_err(|e| {
        MapperError::Registry(format!("failed to read device registry at {}: {e}", path.display()))
    })?;
    DeviceProfiles::from_json_str(&raw)
}

/// Resolve `device_name` to its broker identity.
///
/// Warns, without failing, when the instance's model does not declare every
/// property the mapper reports.
pub fn resolve_identity(path: &Path, device_name: &str) -> Result<DeviceIdentity, MapperError> {
    let profiles = load_profiles(path)?;
    let identity = profiles.resolve(device_name)?;

    let undeclared = profiles.undeclared_properties(device_name);
    if !undeclared.is_empty() {
        warn!(
            device = device_name,
            ?undeclared,
            "device model does not declare all reported properties"
        );
    }
    info!(device = device_name, id = %identity, "device resolved from registry");
    Ok(identity)
}
