use chrono_tz::Tz;
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::time_utils::{resolve_timezone, validate_timezone, TimeUnit};

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Created/closed and label breakdowns for issue-tracker exports
#[derive(Parser, Debug, Clone)]
#[command(
    name = "issue-insights",
    about = "Created/closed and label breakdowns for issue-tracker exports",
    version
)]
pub struct Settings {
    /// Issue export file, or a directory of `.json` exports
    #[arg(long, env = "ISSUE_INSIGHTS_INPUT")]
    pub input: Option<PathBuf>,

    /// Which derived tables to show
    #[arg(long, default_value = "all", value_parser = ["labels", "timeseries", "summary", "all"])]
    pub view: String,

    /// Calendar period for the created/closed series
    #[arg(long, default_value = "month", value_parser = ["hour", "day", "week", "month", "year"])]
    pub unit: String,

    /// Label prefix to break down (e.g. "wcag")
    #[arg(long, default_value = "wcag")]
    pub label_prefix: String,

    /// Timezone used for period boundaries (auto-detected if not specified)
    #[arg(long, default_value = "auto")]
    pub timezone: String,

    /// Output format
    #[arg(long, default_value = "table", value_parser = ["table", "json"])]
    pub format: String,

    /// Keep running and re-render whenever the input changes
    #[arg(long)]
    pub watch: bool,

    /// Refresh rate in seconds for --watch (1-300)
    #[arg(long, default_value = "30", value_parser = clap::value_parser!(u32).range(1..=300))]
    pub refresh_rate: u32,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR"])]
    pub log_level: String,

    /// Log file path
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// Clear saved configuration
    #[arg(long)]
    pub clear: bool,
}

// ── LastUsedParams ─────────────────────────────────────────────────────────────

/// Persisted last-used parameters saved to `~/.issue-insights/last_used.json`.
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq)]
pub struct LastUsedParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub view: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label_prefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_rate: Option<u32>,
}

impl LastUsedParams {
    /// Default path of the persisted config file.
    pub fn config_path() -> PathBuf {
        Self::config_path_in(&dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
    }

    /// Config path rooted at `base_dir`.
    pub fn config_path_in(base_dir: &std::path::Path) -> PathBuf {
        base_dir.join(".issue-insights").join("last_used.json")
    }

    /// Load persisted params from an explicit path.
    /// Returns `Default` when the file is absent or cannot be parsed.
    pub fn load_from(path: &std::path::Path) -> Self {
        let Ok(content) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        serde_json::from_str(&content).unwrap_or_default()
    }

    /// Atomically write params to an explicit path, creating parent
    /// directories if needed.
    pub fn save_to(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;

        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, &json)?;
        std::fs::rename(&tmp, path)?;

        Ok(())
    }

    /// Delete the config file at an explicit path if it exists.
    pub fn clear_at(path: &std::path::Path) -> Result<(), std::io::Error> {
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}

// ── Settings impl ──────────────────────────────────────────────────────────────

impl Settings {
    /// Parse CLI arguments, merge with last-used params where no explicit CLI
    /// value was provided, resolve `"auto"` values, and persist the result.
    pub fn load_with_last_used() -> Self {
        Self::load_with_last_used_impl(
            std::env::args_os().collect(),
            &LastUsedParams::config_path(),
        )
    }

    /// Same as [`Settings::load_with_last_used`] with explicit arguments and
    /// config path.
    pub fn load_with_last_used_impl(
        args: Vec<std::ffi::OsString>,
        config_path: &std::path::Path,
    ) -> Self {
        use clap::{CommandFactory, FromArgMatches};

        let matches = Settings::command().get_matches_from(args);
        let mut settings = match Settings::from_arg_matches(&matches) {
            Ok(settings) => settings,
            Err(e) => e.exit(),
        };

        if settings.clear {
            if let Err(e) = LastUsedParams::clear_at(config_path) {
                tracing::warn!(
                    path = %config_path.display(),
                    error = %e,
                    "failed to clear last-used params"
                );
            }
            return Self::resolve_auto_values(settings);
        }

        let last = LastUsedParams::load_from(config_path);

        // CLI always wins. clap keys args by field name, not flag spelling.
        if !is_arg_explicitly_set(&matches, "input") && settings.input.is_none() {
            settings.input = last.input;
        }
        if !is_arg_explicitly_set(&matches, "view") {
            if let Some(v) = last.view {
                settings.view = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "unit") {
            if let Some(v) = last.unit {
                settings.unit = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "label_prefix") {
            if let Some(v) = last.label_prefix {
                settings.label_prefix = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "timezone") {
            if let Some(v) = last.timezone {
                settings.timezone = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "format") {
            if let Some(v) = last.format {
                settings.format = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "refresh_rate") {
            if let Some(v) = last.refresh_rate {
                settings.refresh_rate = v;
            }
        }

        settings = Self::resolve_auto_values(settings);

        let params = LastUsedParams::from(&settings);
        if let Err(e) = params.save_to(config_path) {
            tracing::warn!(
                path = %config_path.display(),
                error = %e,
                "failed to save last-used params"
            );
        }

        settings
    }

    /// Resolve the `"auto"` timezone, replace an unknown one with UTC, and
    /// apply the `--debug` flag.
    fn resolve_auto_values(mut settings: Settings) -> Settings {
        if settings.timezone == "auto" {
            settings.timezone = crate::time_utils::get_system_timezone();
        }
        if !validate_timezone(&settings.timezone) {
            tracing::warn!("unrecognised timezone \"{}\", using UTC", settings.timezone);
            settings.timezone = "UTC".to_string();
        }

        if settings.debug {
            settings.log_level = "DEBUG".to_string();
        }

        settings
    }

    /// The configured bucket unit; a persisted value that no longer parses
    /// falls back to the default.
    pub fn time_unit(&self) -> TimeUnit {
        self.unit.parse().unwrap_or_default()
    }

    /// The configured timezone as a [`Tz`].
    pub fn tz(&self) -> Tz {
        resolve_timezone(&self.timezone)
    }
}

// ── Conversion ─────────────────────────────────────────────────────────────────

impl From<&Settings> for LastUsedParams {
    fn from(s: &Settings) -> Self {
        LastUsedParams {
            input: s.input.clone(),
            view: Some(s.view.clone()),
            unit: Some(s.unit.clone()),
            label_prefix: Some(s.label_prefix.clone()),
            timezone: Some(s.timezone.clone()),
            format: Some(s.format.clone()),
            refresh_rate: Some(s.refresh_rate),
        }
    }
}

/// Returns `true` when `name` was supplied explicitly on the command line
/// (not via default value or environment variable).
fn is_arg_explicitly_set(matches: &clap::ArgMatches, name: &str) -> bool {
    matches.value_source(name) == Some(clap::parser::ValueSource::CommandLine)
}

// ── Tests ──────────────────────────────────────────────────────────────────────
