// SPDX-License-Identifier: Apache-2.0

use fundchain_core::ENV_FUNDCHAIN_LOG_LEVEL;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

const DEFAULT_DIRECTIVE: &str = "warn";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogFlags {
    pub quiet: bool,
    pub verbose: u8,
    pub trace: bool,
}

impl LogFlags {
    /// Flag override, if any flag was given.
    #[must_use]
    pub fn directive(self) -> Option<&'static str> {
        if self.trace {
            Some("trace")
        } else if self.verbose > 1 {
            Some("debug")
        } else if self.verbose == 1 {
            Some("info")
        } else if self.quiet {
            Some("error")
        } else {
            None
        }
    }
}

/// Flags, then `FUNDCHAIN_LOG_LEVEL`, then `RUST_LOG`, then `warn`.
#[must_use]
pub fn build_filter(flags: LogFlags) -> EnvFilter {
    if let Some(directive) = flags.directive() {
        return EnvFilter::new(directive);
    }
    if let Some(level) = std::env::var(ENV_FUNDCHAIN_LOG_LEVEL)
        .ok()
        .filter(|v| !v.trim().is_empty())
    {
        return EnvFilter::new(level);
    }
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE))
}

/// Logs go to stderr so stdout stays a clean payload stream.
pub fn init_tracing(flags: LogFlags, log_json: bool) {
    let filter = build_filter(flags);
    let installed = if log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init()
    };
    // A subscriber installed by an embedding host wins.
    let _ = installed;
}
