use std::env;
use std::str::FromStr;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_service_role_key: String,
    pub supabase_jwt_secret: String,
    pub server_port: u16,
    /// Offset of the professional-facing wall clock, in minutes east of UTC.
    pub scheduling_utc_offset_minutes: i32,
    pub expiry_sweep_interval_secs: u64,
    pub completion_sweep_interval_secs: u64,
    pub pending_grace_minutes: i64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_anon_key: env::var("SUPABASE_ANON_PUBLIC_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
                    String::new()
                }),
            supabase_service_role_key: env::var("SUPABASE_SERVICE_ROLE_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_SERVICE_ROLE_KEY not set, requests will use the anon key");
                    String::new()
                }),
            supabase_jwt_secret: env::var("SUPABASE_JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_JWT_SECRET not set, using empty value");
                    String::new()
                }),
            server_port: parse_or("SERVER_PORT", 3000),
            // America/Costa_Rica, no daylight saving
            scheduling_utc_offset_minutes: parse_or("SCHEDULING_UTC_OFFSET_MINUTES", -360),
            expiry_sweep_interval_secs: parse_interval_or("EXPIRY_SWEEP_INTERVAL_SECS", 120),
            completion_sweep_interval_secs: parse_interval_or("COMPLETION_SWEEP_INTERVAL_SECS", 300),
            pending_grace_minutes: parse_or("PENDING_GRACE_MINUTES", 5),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty()
            && !self.supabase_anon_key.is_empty()
            && !self.supabase_jwt_secret.is_empty()
    }

    /// Key sent to PostgREST. The service role key bypasses row level
    /// security, which the background sweeps need since they act for no user.
    pub fn database_key(&self) -> &str {
        if self.supabase_service_role_key.is_empty() {
            &self.supabase_anon_key
        } else {
            &self.supabase_service_role_key
        }
    }
}

fn parse_or<T>(name: &str, default: T) -> T
where
    T: FromStr + Copy + std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{} has invalid value {:?}, using default {}", name, raw, default);
            default
        }),
        Err(_) => default,
    }
}

/// Sweep intervals must be at least one second.
fn parse_interval_or(name: &str, default: u64) -> u64 {
    positive_or(name, parse_or(name, default), default)
}

fn positive_or(name: &str, value: u64, default: u64) -> u64 {
    if value == 0 {
        warn!("{} must be greater than zero, using default {}", name, default);
        return default;
    }
    value
}
