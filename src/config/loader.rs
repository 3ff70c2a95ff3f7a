use super::expand_tilde;
use super::types::*;
use crate::device::{Credential, DeviceDescriptor};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Device '{device}' uses platform '{platform}', which has no [platforms.{platform}] entry")]
    PlatformNotFound { device: String, platform: String },

    #[error("Device '{0}' is listed more than once")]
    DuplicateDevice(String),

    #[error("Device '{device}': environment variable '{var}' is not set")]
    MissingEnvVar { device: String, var: String },
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Load and validate configuration from a TOML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let contents = fs::read_to_string(path)?;
    parse_config(&contents)
}

/// Parse and validate configuration from TOML text
pub fn parse_config(contents: &str) -> Result<Config> {
    let config: Config = toml::from_str(contents)?;
    validate_config(&config)?;
    Ok(config)
}

/// Validate the configuration
fn validate_config(config: &Config) -> Result<()> {
    let global = &config.global;

    if global.max_workers == 0 {
        return Err(ConfigError::ValidationError(
            "global.max_workers must be at least 1".to_string(),
        ));
    }

    if global.operation_timeout_seconds == 0 {
        return Err(ConfigError::ValidationError(
            "global.operation_timeout_seconds must be at least 1".to_string(),
        ));
    }

    if global.keep_last == Some(0) {
        return Err(ConfigError::ValidationError(
            "global.keep_last must be at least 1 when set".to_string(),
        ));
    }

    if global.backup_root.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "global.backup_root must not be empty".to_string(),
        ));
    }

    for (tag, platform) in &config.platforms {
        if platform.running_command.trim().is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "Platform '{}': running_command must not be empty",
                tag
            )));
        }
    }

    let mut seen = HashSet::new();
    for device in &config.devices {
        validate_device(device, config)?;
        if !seen.insert(device.hostname.as_str()) {
            return Err(ConfigError::DuplicateDevice(device.hostname.clone()));
        }
    }

    Ok(())
}

fn validate_device(device: &DeviceEntry, config: &Config) -> Result<()> {
    if device.hostname.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "Device with an empty hostname".to_string(),
        ));
    }

    if device.platform.trim().is_empty() {
        return Err(ConfigError::ValidationError(format!(
            "Device '{}': platform must not be empty",
            device.hostname
        )));
    }

    if !config.platforms.contains_key(&device.platform) {
        return Err(ConfigError::PlatformNotFound {
            device: device.hostname.clone(),
            platform: device.platform.clone(),
        });
    }

    let sources = [
        device.password.is_some(),
        device.password_env.is_some(),
        device.key_file.is_some(),
    ]
    .iter()
    .filter(|set| **set)
    .count();

    if sources != 1 {
        return Err(ConfigError::ValidationError(format!(
            "Device '{}': set exactly one of password, password_env, key_file (found {})",
            device.hostname, sources
        )));
    }

    Ok(())
}

/// Resolve one device entry into a descriptor, reading credentials
pub fn resolve_device(device: &DeviceEntry) -> Result<DeviceDescriptor> {
    let credential = if let Some(ref password) = device.password {
        Credential::Password(password.clone())
    } else if let Some(ref var) = device.password_env {
        let password = std::env::var(var).map_err(|_| ConfigError::MissingEnvVar {
            device: device.hostname.clone(),
            var: var.clone(),
        })?;
        Credential::Password(password)
    } else if let Some(ref key_file) = device.key_file {
        Credential::KeyFile(expand_tilde(key_file))
    } else {
        return Err(ConfigError::ValidationError(format!(
            "Device '{}' has no credential",
            device.hostname
        )));
    };

    Ok(DeviceDescriptor {
        hostname: device.hostname.trim().to_string(),
        platform: device.platform.trim().to_string(),
        username: device.username.clone(),
        credential,
        options: device.options.clone(),
    })
}

/// Resolve all devices in configuration order
pub fn resolve_devices(config: &Config) -> Result<Vec<DeviceDescriptor>> {
    config.devices.iter().map(resolve_device).collect()
}
