//! Shell command driver
//!
//! Fulfils the driver contract by running per-platform command templates,
//! e.g. `sshpass -e ssh {username}@{host} 'show running-config'`. The
//! templates may reference `{host}`, `{username}`, `{platform}` and any
//! device option as `{<key>}`. Substituted values containing anything beyond
//! plain hostname characters are single-quoted for `sh`. Secrets never appear
//! on the command line; they are exported as `NETCFG_PASSWORD` or
//! `NETCFG_KEY_FILE`.

use super::{DeviceConfig, DeviceDriver, DriverError, DriverSession, Facts};
use crate::config::PlatformConfig;
use crate::device::{Credential, DeviceDescriptor};
use crate::utils::command::{run_shell_command, CommandError};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, info};

pub const PASSWORD_ENV: &str = "NETCFG_PASSWORD";
pub const KEY_FILE_ENV: &str = "NETCFG_KEY_FILE";

pub struct ShellDriver {
    platform: String,
    commands: PlatformConfig,
}

impl ShellDriver {
    pub fn new(platform: &str, commands: PlatformConfig) -> Self {
        Self {
            platform: platform.to_string(),
            commands,
        }
    }
}

#[async_trait]
impl DeviceDriver for ShellDriver {
    async fn open(&self, device: &DeviceDescriptor) -> Result<Box<dyn DriverSession>, DriverError> {
        let session = ShellSession {
            device: device.clone(),
            platform: self.platform.clone(),
            commands: self.commands.clone(),
        };

        if let Some(ref connect) = self.commands.connect_command {
            session
                .run(connect)
                .await
                .map_err(|e| DriverError::Unreachable(e.to_string()))?;
        }

        info!("Opened shell session to {}", device.hostname);
        Ok(Box::new(session))
    }

    fn name(&self) -> &str {
        "shell"
    }
}

struct ShellSession {
    device: DeviceDescriptor,
    platform: String,
    commands: PlatformConfig,
}

impl ShellSession {
    fn render(&self, template: &str) -> String {
        render_template(template, &self.device, &self.platform)
    }

    async fn run(&self, template: &str) -> Result<String, DriverError> {
        let command = self.render(template);
        let secret_env = match &self.device.credential {
            Credential::Password(password) => (PASSWORD_ENV, password.clone()),
            Credential::KeyFile(path) => (KEY_FILE_ENV, path.display().to_string()),
        };

        run_shell_command(&command, &[(secret_env.0, secret_env.1.as_str())])
            .await
            .map_err(|e| match e {
                CommandError::Spawn(io) => DriverError::Command(io.to_string()),
                CommandError::Failed { .. } => DriverError::Command(e.to_string()),
            })
    }
}

#[async_trait]
impl DriverSession for ShellSession {
    async fn get_config(&mut self) -> Result<DeviceConfig, DriverError> {
        let running = self.run(&self.commands.running_command).await?;

        let startup = match self.commands.startup_command {
            Some(ref template) => Some(self.run(template).await?),
            None => None,
        };

        Ok(DeviceConfig { running, startup })
    }

    async fn get_facts(&mut self) -> Result<Facts, DriverError> {
        let Some(ref template) = self.commands.facts_command else {
            return Ok(Facts::new()
                .with("hostname", self.device.hostname.as_str())
                .with("platform", self.platform.as_str()));
        };

        let output = self.run(template).await?;
        parse_facts(&output)
    }

    async fn close(&mut self) {
        debug!("Closed shell session to {}", self.device.hostname);
    }
}

/// Substitute `{host}`, `{username}`, `{platform}` and option placeholders
pub fn render_template(template: &str, device: &DeviceDescriptor, platform: &str) -> String {
    let mut rendered = template
        .replace("{host}", &shell_quote(&device.hostname))
        .replace("{username}", &shell_quote(&device.username))
        .replace("{platform}", &shell_quote(platform));

    for (key, value) in &device.options {
        rendered = rendered.replace(&format!("{{{}}}", key), &shell_quote(value));
    }

    rendered
}

/// Quote `value` as one `sh` word unless it is made only of safe characters
fn shell_quote(value: &str) -> String {
    let safe = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "@%+=:,./_-".contains(c));
    if safe {
        value.to_string()
    } else {
        format!("'{}'", value.replace('\'', "'\\''"))
    }
}

/// Parse facts command output, which must be a JSON object with a hostname
fn parse_facts(output: &str) -> Result<Facts, DriverError> {
    let map: BTreeMap<String, Value> = serde_json::from_str(output.trim())
        .map_err(|e| DriverError::MalformedResponse(format!("facts are not a JSON object: {}", e)))?;

    let facts = Facts::from(map);
    if facts.hostname().is_none() {
        return Err(DriverError::MalformedResponse(
            "facts do not contain a hostname".to_string(),
        ));
    }

    Ok(facts)
}
