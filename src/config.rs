// Copyright (c) Studydesk.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use std::env;
use std::path::PathBuf;

/// Cap applied to a budget record created implicitly by a first expense,
/// and reported for users with no record at all. Lives here and nowhere else.
pub static DEFAULT_MONTHLY_BUDGET: Lazy<Decimal> = Lazy::new(|| Decimal::from(1000));

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: String,
    /// Explicit database path; falls back to the platform data dir when unset.
    pub db_path: Option<PathBuf>,
    /// Shared secret for HMAC-signed bearer tokens.
    pub auth_secret: Option<String>,
    /// Fixed `token=user` pairs; takes precedence over the HMAC secret.
    pub auth_tokens: Vec<(String, String)>,
    pub default_monthly_budget: Decimal,
    /// CORS origins; `*` allows any.
    pub allowed_origins: Vec<String>,
    pub log_json: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:5000".to_string(),
            db_path: None,
            auth_secret: None,
            auth_tokens: Vec::new(),
            default_monthly_budget: *DEFAULT_MONTHLY_BUDGET,
            allowed_origins: vec!["*".to_string()],
            log_json: false,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            bind: env::var("STUDYDESK_BIND").unwrap_or(defaults.bind),
            db_path: env::var("STUDYDESK_DB").ok().map(PathBuf::from),
            auth_secret: env_nonempty("STUDYDESK_AUTH_SECRET"),
            auth_tokens: env_pairs("STUDYDESK_AUTH_TOKENS"),
            default_monthly_budget: env::var("STUDYDESK_DEFAULT_BUDGET")
                .ok()
                .and_then(|v| v.parse::<Decimal>().ok())
                .filter(|d| d.is_sign_positive() && !d.is_zero())
                .unwrap_or(defaults.default_monthly_budget),
            allowed_origins: env_list("STUDYDESK_ALLOWED_ORIGINS")
                .unwrap_or(defaults.allowed_origins),
            log_json: env_bool("STUDYDESK_LOG_JSON", defaults.log_json),
        }
    }

    pub fn allows_origin(&self, origin: &str) -> bool {
        self.allowed_origins
            .iter()
            .any(|o| o == "*" || o == origin)
    }
}

fn env_bool(name: &str, default: bool) -> bool {
    env::var(name)
        .ok()
        .and_then(|v| match v.as_str() {
            "1" | "true" | "TRUE" | "yes" | "YES" => Some(true),
            "0" | "false" | "FALSE" | "no" | "NO" => Some(false),
            _ => None,
        })
        .unwrap_or(default)
}

fn env_nonempty(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_list(name: &str) -> Option<Vec<String>> {
    let raw = env::var(name).ok()?;
    let items: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    if items.is_empty() { None } else { Some(items) }
}

fn env_pairs(name: &str) -> Vec<(String, String)> {
    env::var(name)
        .unwrap_or_default()
        .split(',')
        .filter_map(|item| {
            let (k, v) = item.split_once('=')?;
            let key = k.trim();
            let value = v.trim();
            if key.is_empty() || value.is_empty() {
                return None;
            }
            Some((key.to_string(), value.to_string()))
        })
        .collect()
}
