//! Service configuration loaded via OrthoConfig.
//!
//! Values come from CLI flags, `COMPANION_*` environment variables or a
//! configuration file. Every key is optional; the accessors supply the
//! defaults and the server picks in-process adapters when an external
//! dependency is not configured.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use chrono::FixedOffset;
use ortho_config::OrthoConfig;
use serde::Deserialize;

use crate::domain::DayBoundary;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_PUSH_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_UPLOAD_DIR: &str = "uploads";
const DEFAULT_UPLOAD_BASE_URL: &str = "/uploads";
const DEFAULT_WS_ALLOWED_ORIGINS: &str = "http://localhost:3000";

/// Invalid configuration values detected after loading.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    /// The bind address is not `host:port`.
    #[error("invalid bind address `{value}`: {message}")]
    BindAddr { value: String, message: String },
    /// The service offset is outside ±24 hours.
    #[error("service UTC offset of {minutes} minutes is out of range")]
    UtcOffset { minutes: i32 },
}

/// Runtime settings for the companion service.
#[derive(Debug, Clone, Default, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "COMPANION")]
pub struct CompanionSettings {
    /// Listen address, `host:port`.
    pub bind_addr: Option<String>,
    /// PostgreSQL URL; in-memory adapters are used when absent.
    pub database_url: Option<String>,
    /// Upper bound on pooled database connections.
    pub database_max_connections: Option<u32>,
    /// Redis URL for shared presence; presence stays in-process when absent.
    pub redis_url: Option<String>,
    /// Firebase project receiving push sends.
    pub fcm_project_id: Option<String>,
    /// Path to the Firebase service-account JSON key.
    pub fcm_service_account_path: Option<PathBuf>,
    /// Per-request push timeout in milliseconds.
    pub push_timeout_ms: Option<u64>,
    /// Directory room images are written to.
    pub upload_dir: Option<PathBuf>,
    /// Public URL prefix for stored room images.
    pub upload_base_url: Option<String>,
    /// Offset from UTC, in minutes, used to split chat history into days.
    pub service_utc_offset_minutes: Option<i32>,
    /// Comma-separated origins allowed to open room WebSockets.
    pub ws_allowed_origins: Option<String>,
}

/// Firebase settings present only when both project and key are configured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FcmSettings {
    pub project_id: String,
    pub service_account_path: PathBuf,
}

impl CompanionSettings {
    /// Return the listen address, falling back to `0.0.0.0:8080`.
    pub fn bind_addr(&self) -> Result<SocketAddr, SettingsError> {
        let value = self.bind_addr.as_deref().unwrap_or(DEFAULT_BIND_ADDR);
        value.parse().map_err(|err: std::net::AddrParseError| {
            SettingsError::BindAddr {
                value: value.to_owned(),
                message: err.to_string(),
            }
        })
    }

    /// Return the database URL when persistence is configured.
    pub fn database_url(&self) -> Option<&str> {
        self.database_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
    }

    /// Return the pool size, falling back to 10.
    pub fn database_max_connections(&self) -> u32 {
        self.database_max_connections
            .unwrap_or(DEFAULT_DATABASE_MAX_CONNECTIONS)
    }

    /// Return the Redis URL when shared presence is configured.
    pub fn redis_url(&self) -> Option<&str> {
        self.redis_url.as_deref().filter(|url| !url.trim().is_empty())
    }

    /// Return Firebase settings when push delivery is configured.
    pub fn fcm(&self) -> Option<FcmSettings> {
        let project_id = self
            .fcm_project_id
            .as_deref()
            .filter(|id| !id.trim().is_empty())?;
        let service_account_path = self.fcm_service_account_path.clone()?;
        Some(FcmSettings {
            project_id: project_id.to_owned(),
            service_account_path,
        })
    }

    /// Return the push request timeout, falling back to five seconds.
    pub fn push_timeout(&self) -> Duration {
        Duration::from_millis(self.push_timeout_ms.unwrap_or(DEFAULT_PUSH_TIMEOUT_MS))
    }

    /// Return the image directory, falling back to `uploads`.
    pub fn upload_dir(&self) -> PathBuf {
        self.upload_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_UPLOAD_DIR))
    }

    /// Return the public image prefix, falling back to `/uploads`.
    pub fn upload_base_url(&self) -> &str {
        self.upload_base_url
            .as_deref()
            .unwrap_or(DEFAULT_UPLOAD_BASE_URL)
    }

    /// Return the calendar-day rule for date dividers.
    pub fn day_boundary(&self) -> Result<DayBoundary, SettingsError> {
        let minutes = self.service_utc_offset_minutes.unwrap_or(0);
        minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .map(DayBoundary::new)
            .ok_or(SettingsError::UtcOffset { minutes })
    }

    /// Return the WebSocket origin allow-list entries.
    pub fn ws_allowed_origins(&self) -> Vec<String> {
        self.ws_allowed_origins
            .as_deref()
            .unwrap_or(DEFAULT_WS_ALLOWED_ORIGINS)
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(str::to_owned)
            .collect()
    }
}
