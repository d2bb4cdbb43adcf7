use crate::{
    error::CycleError,
    model::{DeviceRecord, RECOGNIZED_FIELDS, Reading},
};

/// Pick the device with MAC `mac` and keep only the recognized fields of its
/// latest reading. Fields the device did not report are left out.
pub fn project(devices: &[DeviceRecord], mac: &str) -> Result<Reading, CycleError> {
    if devices.is_empty() {
        return Err(CycleError::NoDevices);
    }

    let device = devices
        .iter()
        .find(|d| d.mac_address == mac)
        .ok_or_else(|| CycleError::DeviceNotFound(mac.to_string()))?;

    let latest = RECOGNIZED_FIELDS
        .iter()
        .filter_map(|&field| device.last_data.get(field).map(|v| (field.to_string(), v.clone())))
        .collect();

    Ok(latest)
}
