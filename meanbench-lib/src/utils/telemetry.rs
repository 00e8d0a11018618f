use std::{io::IsTerminal as _, path::Path};

use rama::{
    error::{BoxError, ErrorContext as _},
    telemetry::tracing::{
        self,
        metadata::LevelFilter,
        subscriber::{
            EnvFilter,
            filter::Directive,
            fmt::writer::BoxMakeWriter,
        },
    },
};

#[derive(Debug, Clone, Default)]
pub struct TelemetryConfig<'a> {
    pub verbose: bool,
    pub pretty: bool,
    pub output: Option<&'a Path>,
}

/// Crates raised to DEBUG by `verbose`, dependencies stay at INFO.
const VERBOSE_DIRECTIVES: &[&str] = &["meanbench=debug", "meanbench_lib=debug"];

/// Configures structured logging with runtime control via `RUST_LOG` environment variable.
///
/// Defaults to INFO level. When `verbose` is set and `RUST_LOG` is not,
/// the meanbench crates log at DEBUG.
/// Use `RUST_LOG=meanbench_lib=trace` to see individual permit waits and latency draws.
pub fn init_tracing(cfg: Option<TelemetryConfig<'_>>) -> Result<(), BoxError> {
    let cfg = cfg.unwrap_or_default();

    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let env_filter = build_env_filter(cfg.verbose, rust_log.as_deref())?;

    let make_writer = match cfg.output {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .append(true)
                .create(true)
                .open(path)
                .context("open log file")?;

            BoxMakeWriter::new(file)
        }
        None => BoxMakeWriter::new(std::io::stderr),
    };

    let subscriber = tracing::subscriber::fmt()
        .with_ansi(cfg.output.is_none() && std::io::stderr().is_terminal())
        .with_env_filter(env_filter)
        .with_writer(make_writer);

    if cfg.pretty {
        subscriber.pretty().try_init()?;
    } else {
        subscriber.try_init()?;
    }

    tracing::info!("Tracing is set up");
    Ok(())
}

fn build_env_filter(verbose: bool, rust_log: Option<&str>) -> Result<EnvFilter, BoxError> {
    let builder = EnvFilter::builder().with_default_directive(LevelFilter::INFO.into());

    if let Some(directives) = rust_log.filter(|d| !d.trim().is_empty()) {
        return Ok(builder.parse_lossy(directives));
    }

    let mut filter = builder.parse_lossy("");
    if verbose {
        for directive in VERBOSE_DIRECTIVES {
            let directive: Directive = directive.parse().context("parse verbose directive")?;
            filter = filter.add_directive(directive);
        }
    }
    Ok(filter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_env_filter() {
        for (verbose, rust_log, contains, not_contains) in [
            (false, None, vec!["info"], vec!["meanbench_lib=debug"]),
            (
                true,
                None,
                vec!["info", "meanbench=debug", "meanbench_lib=debug"],
                vec![],
            ),
            (true, Some(""), vec!["meanbench_lib=debug"], vec![]),
            (
                true,
                Some("meanbench_lib=trace"),
                vec!["meanbench_lib=trace"],
                vec!["meanbench_lib=debug"],
            ),
            (false, Some("warn"), vec!["warn"], vec!["meanbench"]),
        ] {
            let filter = build_env_filter(verbose, rust_log)
                .unwrap()
                .to_string()
                .to_lowercase();
            for s in contains {
                assert!(
                    filter.contains(s),
                    "verbose: {verbose}, rust_log: {rust_log:?}, filter: {filter}"
                );
            }
            for s in not_contains {
                assert!(
                    !filter.contains(s),
                    "verbose: {verbose}, rust_log: {rust_log:?}, filter: {filter}"
                );
            }
        }
    }
}
