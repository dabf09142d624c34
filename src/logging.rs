//! Adapters for different logging crates, plus ready-made observers that
//! forward breaker events to the `log` facade.

use crate::core::breaker::CircuitBreaker;
use cfg_if::cfg_if;
pub use log::{debug, error, info, trace, warn};

cfg_if! {
    if #[cfg(feature = "logger_env")] {
        use crate::core::config::DEFAULT_LOG_LEVEL;
        fn init_env_logger() {
            env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(DEFAULT_LOG_LEVEL))
                .init();
        }
        pub fn logger_init(_: Option<String>) {
            init_env_logger();
        }
    }
    else if #[cfg(feature = "logger_log4rs")] {
        use std::path::Path;
        fn init_log4rs(file_name: Option<String>) {
            let file_name = file_name.expect("Must provide a configuration file for log4rs crate");
            let path = Path::new(&file_name);
            if path.exists() {
                log4rs::init_file(path, Default::default()).unwrap();
            }
        }
        pub fn logger_init(file_name: Option<String>) {
            init_log4rs(file_name);
        }
    } else {
        pub fn logger_init(_: Option<String>) {}
    }
}

/// Registers one logging observer per event kind on `breaker`. The engine
/// itself only depends on the `log` facade; this is the stock sink for
/// callers who want every event on the log stream.
pub fn attach_event_loggers(breaker: &CircuitBreaker) {
    breaker.on_state_change(|name, from, to| {
        info!("circuit breaker '{}' state changed: {} -> {}", name, from, to);
    });
    breaker.on_trip(|name, err| match err {
        Some(err) => warn!("circuit breaker '{}' tripped: {}", name, err),
        None => warn!("circuit breaker '{}' tripped", name),
    });
    breaker.on_reset(|name| {
        info!("circuit breaker '{}' reset", name);
    });
    breaker.on_success(|name| {
        debug!("circuit breaker '{}' request succeeded", name);
    });
    breaker.on_failure(|name, err| {
        debug!("circuit breaker '{}' request failed: {}", name, err);
    });
    breaker.on_rejection(|name| {
        debug!("circuit breaker '{}' request rejected", name);
    });
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::core::policy::ThresholdPolicy;
    use crate::core::settings::Settings;

    #[test]
    fn loggers_attach_without_interfering() {
        let breaker = CircuitBreaker::new(Settings {
            failure_threshold: ThresholdPolicy::consecutive(1),
            ..Default::default()
        });
        attach_event_loggers(&breaker);
        let _ = breaker.execute(|| Ok(()));
        let result: crate::Result<()> = breaker.execute(|| Err(anyhow::anyhow!("boom")));
        assert!(result.is_err());
        let _ = breaker.execute(|| Ok(()));
    }
}
