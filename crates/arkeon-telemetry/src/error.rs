//! Failures raised while wiring up console logging and counters.

use prometheus::Error as PrometheusError;
use thiserror::Error;

/// Result alias for telemetry setup and rendering.
pub type Result<T> = std::result::Result<T, TelemetryError>;

/// Reasons the console could not report what its refresh cycles and writes did.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// A global tracing subscriber was already installed.
    #[error("console logging is already initialised")]
    LoggingInstall {
        /// Error returned by `tracing-subscriber`.
        #[source]
        source: tracing_subscriber::util::TryInitError,
    },
    /// A refresh or mutation counter family had an invalid definition.
    #[error("counter `{name}` could not be defined")]
    CounterBuild {
        /// Counter family name.
        name: &'static str,
        /// Error returned by the Prometheus client.
        #[source]
        source: PrometheusError,
    },
    /// A counter family clashed with one already in the console registry.
    #[error("counter `{name}` could not be registered")]
    CounterRegister {
        /// Counter family name.
        name: &'static str,
        /// Error returned by the Prometheus client.
        #[source]
        source: PrometheusError,
    },
    /// The text exposition of the console counters could not be produced.
    #[error("console counters could not be encoded")]
    ExpositionEncode {
        /// Error returned by the Prometheus encoder.
        #[source]
        source: PrometheusError,
    },
    /// The encoder emitted bytes that were not UTF-8.
    #[error("console counter exposition was not utf-8")]
    ExpositionUtf8 {
        /// Conversion failure.
        #[source]
        source: std::string::FromUtf8Error,
    },
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;

    #[test]
    fn counter_failures_name_the_family() {
        let build = TelemetryError::CounterBuild {
            name: "refresh_cycles_total",
            source: PrometheusError::Msg("label mismatch".to_string()),
        };
        assert_eq!(
            build.to_string(),
            "counter `refresh_cycles_total` could not be defined"
        );
        let register = TelemetryError::CounterRegister {
            name: "mutations_total",
            source: PrometheusError::AlreadyReg,
        };
        assert_eq!(
            register.to_string(),
            "counter `mutations_total` could not be registered"
        );
        assert!(build.source().is_some());
        assert!(register.source().is_some());
    }

    #[test]
    fn exposition_failures_keep_their_cause() {
        let utf8 = String::from_utf8(vec![0xff, 0xfe]).unwrap_err();
        let err = TelemetryError::ExpositionUtf8 { source: utf8 };
        assert_eq!(err.to_string(), "console counter exposition was not utf-8");
        assert!(err.source().is_some_and(|cause| cause.to_string().contains("utf-8")));

        let err = TelemetryError::ExpositionEncode {
            source: PrometheusError::Msg("truncated".to_string()),
        };
        assert_eq!(err.to_string(), "console counters could not be encoded");
        assert_eq!(
            err.source().map(ToString::to_string).as_deref(),
            Some("truncated")
        );
    }
}
