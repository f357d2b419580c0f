//! Logging setup.
//!
//! `LOG_LEVEL` takes `EnvFilter` directives and replaces `DEFAULT_FILTER`
//! entirely. `LOG_FORMAT=json` switches to one JSON object per line; anything
//! else keeps the human-readable format.
//!
//! Targets emitted by this crate:
//! - `sirahpidea`: startup, config loading, sockets, preferences
//! - `generation`: model calls, resolver failures, contract warnings
//! - `chat`: chat turns and fallback replies
//! - `quiz`: scoring
//! - `history`: slot trimming and client eviction

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str =
    "info,sirahpidea=debug,generation=debug,chat=debug,quiz=debug,history=debug,tower_http=info,axum=info";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    fn from_env_value(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }
}

pub fn init_tracing() {
    let filter = EnvFilter::try_from_env("LOG_LEVEL").unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let format = LogFormat::from_env_value(std::env::var("LOG_FORMAT").ok().as_deref());

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    // The two formats produce different subscriber types, so each branch inits its own.
    match format {
        LogFormat::Json => subscriber.json().init(),
        LogFormat::Pretty => subscriber.init(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_format_defaults_to_pretty() {
        assert_eq!(LogFormat::from_env_value(None), LogFormat::Pretty);
        assert_eq!(LogFormat::from_env_value(Some("")), LogFormat::Pretty);
        assert_eq!(LogFormat::from_env_value(Some("pretty")), LogFormat::Pretty);
        assert_eq!(LogFormat::from_env_value(Some(" JSON ")), LogFormat::Json);
    }

    #[test]
    fn default_filter_covers_every_crate_target() {
        for target in ["sirahpidea", "generation", "chat", "quiz", "history"] {
            assert!(DEFAULT_FILTER.contains(&format!("{target}=")), "{target} missing");
        }
        assert!(EnvFilter::try_new(DEFAULT_FILTER).is_ok());
    }
}
