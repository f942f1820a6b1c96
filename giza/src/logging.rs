//! Logging initialization using `tracing` and `tracing-subscriber`.
//!
//! Static (non-reloadable) configuration controlled by:
//! - `RUST_LOG`: log level filtering (standard tracing-subscriber behavior)
//! - `GIZA_FORMAT`: output format (compact, full, pretty, json)

use std::str::FromStr;

use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

/// Log output format options, controlled by the `GIZA_FORMAT` environment
/// variable.
#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    /// Human-readable, single-line logs.
    Full,
    /// A variant of the full format optimized for short lines (default).
    Compact,
    /// Multi-line logs for local development and debugging.
    Pretty,
    /// Newline-delimited structured JSON logs.
    Json,
}

impl Default for LogFormat {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            Self::Pretty
        } else {
            Self::Compact
        }
    }
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "full" => Ok(Self::Full),
            "compact" => Ok(Self::Compact),
            "pretty" | "verbose" => Ok(Self::Pretty),
            "json" | "jsonl" => Ok(Self::Json),
            _ => Err(format!(
                "Invalid log format '{s}'. Valid options: full, compact, pretty, json"
            )),
        }
    }
}

/// The filter to use when `RUST_LOG` is unset or names only the binary's
/// own target: the core crate mirrors the binary's level.
pub fn default_filter(env_filter: Option<String>) -> String {
    if let Some(rust_log) = env_filter {
        if rust_log.contains("giza=") && !rust_log.contains("giza_core=") {
            if let Some(level) = rust_log.split(',').find_map(|s| s.strip_prefix("giza=")) {
                format!("{rust_log},giza_core={level}")
            } else {
                rust_log
            }
        } else {
            rust_log
        }
    } else {
        "giza=info,giza_core=info".to_string()
    }
}

/// Initializes the global tracing subscriber for the given filter and
/// format, bridging `log` records into `tracing` events first.
pub fn init_tracing(filter: &str, format: Option<String>) {
    let _ = tracing_log::LogTracer::builder()
        .with_interest_cache(tracing_log::InterestCacheConfig::default())
        .init();

    let env_filter = EnvFilter::from_str(filter).unwrap_or_else(|_| {
        eprintln!("Warning: invalid filter string '{filter}', falling back to 'debug'");
        EnvFilter::new("debug")
    });

    let format = format
        .and_then(|s| {
            s.parse::<LogFormat>()
                .map_err(|e| {
                    eprintln!("Warning: {e}");
                    eprintln!("Falling back to default format (compact)");
                })
                .ok()
        })
        .unwrap_or_default();
    match format {
        LogFormat::Full => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .with_span_events(FmtSpan::NONE)
                .with_filter(env_filter);

            Registry::default().with(fmt_layer).init();
        }
        LogFormat::Compact => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .compact()
                .with_span_events(FmtSpan::NONE)
                .with_filter(env_filter);

            Registry::default().with(fmt_layer).init();
        }
        LogFormat::Pretty => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .pretty()
                .with_filter(env_filter);

            Registry::default().with(fmt_layer).init();
        }
        LogFormat::Json => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .json()
                .with_span_events(FmtSpan::NONE)
                .with_filter(env_filter);

            Registry::default().with(fmt_layer).init();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_mirrors_binary_level() {
        assert_eq!(default_filter(None), "giza=info,giza_core=info");
        assert_eq!(
            default_filter(Some("giza=debug".to_string())),
            "giza=debug,giza_core=debug"
        );
        assert_eq!(
            default_filter(Some("giza=debug,giza_core=warn".to_string())),
            "giza=debug,giza_core=warn"
        );
        assert_eq!(default_filter(Some("warn".to_string())), "warn");
    }
}
