// config/mod.rs
use serde::Deserialize;
use config::Config;

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub metrics: MetricsSettings,
    pub device: DeviceSettings,
}

#[derive(Debug, Deserialize)]
pub struct ServerSettings {
    pub address: String,
    pub max_connections: u32,
}

#[derive(Debug, Deserialize)]
pub struct MetricsSettings {
    pub enabled: bool,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeviceSettings {
    /// Address of the controller, passed as the first script argument.
    pub address: String,
    /// Channel layout handed to colour commands, e.g. "RGB" or "RGBW".
    pub profile: String,
    pub port: u16,
    pub pure_white: bool,
    pub script: String,
    pub timeout_ms: u64,
    pub queue_capacity: usize,
    pub default_brightness: u8,
    /// Periodic reconciliation interval; 0 disables it.
    pub sync_interval_secs: u64,
    pub name: String,
    pub manufacturer: String,
    pub model: String,
    pub serial_number: String,
}

impl Settings {
    pub fn new() -> Result<Self, config::ConfigError> {
        let settings = Config::builder()
            .set_default("server.address", "0.0.0.0:8080")?
            .set_default("server.max_connections", 32)?
            .set_default("metrics.enabled", false)?
            .set_default("metrics.port", 9000)?
            .set_default("device.profile", "RGBW")?
            .set_default("device.port", 5577)?
            .set_default("device.pure_white", false)?
            .set_default("device.script", "./dispatch.py")?
            .set_default("device.timeout_ms", 1000)?
            .set_default("device.queue_capacity", 5)?
            .set_default("device.default_brightness", 100)?
            .set_default("device.sync_interval_secs", 0)?
            .set_default("device.name", "LED Controller")?
            .set_default("device.manufacturer", "ACME Ltd")?
            .set_default("device.model", "HomeStrip LED Controller")?
            .set_default("device.serial_number", "123456789")?
            .add_source(config::File::with_name("config/config").required(false))
            .add_source(config::Environment::with_prefix("HOMESTRIP").separator("__"))
            .build()?;

        let settings: Settings = settings.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), config::ConfigError> {
        let device = &self.device;
        if device.address.trim().is_empty() {
            return Err(config::ConfigError::Message("device.address is required".into()));
        }
        if device.profile.trim().is_empty() {
            return Err(config::ConfigError::Message("device.profile must not be empty".into()));
        }
        if device.queue_capacity == 0 {
            return Err(config::ConfigError::Message(
                "device.queue_capacity must be at least 1".into(),
            ));
        }
        if device.default_brightness > 100 {
            return Err(config::ConfigError::Message(
                "device.default_brightness must be within 0..=100".into(),
            ));
        }
        if device.timeout_ms == 0 {
            return Err(config::ConfigError::Message("device.timeout_ms must be positive".into()));
        }
        Ok(())
    }
}
