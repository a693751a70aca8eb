use crate::cli::args::{Cli, Commands, Selection};
use crate::error::{ProcessingError, Result};
use crate::models::{is_grid_wavelength, Measurement, SiteMeasurements};
use crate::processors::{DataStore, DayFileIndex, IntegrityChecker, ScanPolicy};
use crate::readers::{resolve_path, DailyFileReader};
use crate::settings::Settings;
use crate::utils::constants::SENTINEL_THRESHOLD;
use crate::utils::progress::ProgressReporter;
use crate::utils::time::{format_timestamp, parse_time_bound, Timestamp};
use crate::writers::CsvWriter;
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

pub async fn run(cli: Cli) -> Result<()> {
    setup_logging(cli.verbose);

    let mut settings = Settings::load(cli.config.as_deref())?;
    if let Some(max_workers) = cli.max_workers {
        settings.max_workers = max_workers;
    }
    if cli.mmap {
        settings.use_mmap = true;
    }
    if let Some(timeout) = cli.timeout {
        settings.timeout_secs = Some(timeout);
    }
    settings.validate()?;
    debug!(?settings, "loaded settings");

    let timeout = settings.timeout();

    match cli.command {
        Commands::Index {
            site_dir,
            abort_on_unknown,
        } => {
            let policy = if abort_on_unknown {
                ScanPolicy::Abort
            } else {
                settings.scan_policy
            };
            println!("Indexing {}", site_dir.display());

            let index = run_blocking(timeout, move || {
                let progress = ProgressReporter::new_spinner("Scanning daily files...", false);
                let index = DayFileIndex::build(&site_dir, policy)?;
                progress.finish_with_message(&format!("Indexed {} files", index.len()));
                Ok(index)
            })
            .await?;

            match (index.first_date(), index.last_date()) {
                (Some(first), Some(last)) => {
                    println!("{} daily files from {} to {}", index.len(), first, last)
                }
                _ => println!("No daily files found"),
            }
            println!("Instruments: {}", index.instruments().into_iter().collect::<Vec<_>>().join(", "));
            for handle in index.handles() {
                println!(
                    "  {}  {}  {:<6}  {}",
                    handle.date(),
                    handle.instrument(),
                    handle.stage().as_str(),
                    handle.path.display()
                );
            }

            if !index.skipped().is_empty() {
                println!("\nSkipped {} entries:", index.skipped().len());
                for entry in index.skipped() {
                    println!("  {}: {}", entry.path.display(), entry.reason);
                }
            }
        }

        Commands::Inspect { file } => {
            println!("Inspecting {}", file.display());
            let reader = DailyFileReader::with_mmap(settings.use_mmap);

            let path = file.clone();
            let daily = run_blocking(timeout, move || reader.read(&path)).await?;

            match resolve_path(&file) {
                Ok(handle) => println!(
                    "Instrument {} ({}), {} file, versions output {} / input {}",
                    handle.instrument(),
                    handle.metadata.site.name(),
                    handle.stage().as_str(),
                    handle.metadata.output_version,
                    handle.metadata.input_version
                ),
                Err(e) => println!("File name not recognized: {}", e.root()),
            }

            let header = &daily.header;
            println!(
                "Site {} at lat {}, lon {}, alt {} m",
                header.site, header.latitude, header.longitude, header.altitude
            );
            for (key, value) in &header.extra {
                println!("  {}: {}", key, value);
            }

            println!("{} acquisitions", daily.len());
            if let (Some(first), Some(last)) = (daily.times.first(), daily.times.last()) {
                println!("  {} .. {}", format_timestamp(first), format_timestamp(last));
            }

            let sentinels = daily
                .weather
                .values()
                .chain(daily.weather_errors.values())
                .chain(daily.spectral.values())
                .chain(daily.spectral_errors.values())
                .flatten()
                .filter(|value| **value >= SENTINEL_THRESHOLD)
                .count();
            println!("{} invalid (sentinel) values", sentinels);

            let codes: Vec<&str> = daily.aerosol_types.iter().map(|t| t.code()).collect();
            println!("Aerosol types: {}", codes.join(" "));
        }

        Commands::Query {
            selection,
            measurement,
            wavelength,
            json,
        } => {
            let measurement = measurement
                .as_deref()
                .map(|name| {
                    Measurement::parse(name)
                        .ok_or_else(|| ProcessingError::Config(format!("Unknown measurement: {}", name)))
                })
                .transpose()?;
            if let Some(wl) = wavelength.filter(|wl| !is_grid_wavelength(*wl)) {
                return Err(ProcessingError::Config(format!(
                    "Wavelength {} nm is not on the 400-2500 nm, 10 nm grid",
                    wl
                )));
            }

            let measurements = load_measurements(&settings, &selection, timeout).await?;

            match measurement {
                Some(measurement) => {
                    let series = measurements.series(measurement, wavelength).ok_or_else(|| {
                        ProcessingError::Config(format!(
                            "No data for {}{}",
                            measurement,
                            wavelength.map(|wl| format!(" at {} nm", wl)).unwrap_or_default()
                        ))
                    })?;

                    if json {
                        println!("{}", serde_json::to_string_pretty(&series)?);
                    } else {
                        println!("{}", measurement.display_name());
                        for ((timestamp, value), error) in series
                            .timestamps
                            .iter()
                            .zip(&series.values)
                            .zip(&series.errors)
                        {
                            println!("  {}  {:>10.4} ± {:.4}", format_timestamp(timestamp), value, error);
                        }
                    }
                }
                None if json => {
                    let checker = IntegrityChecker::new();
                    println!("{}", checker.check_integrity(&measurements)?.to_json()?);
                }
                None => print_overview(&measurements),
            }
        }

        Commands::Validate {
            selection,
            strict,
            json,
        } => {
            let measurements = load_measurements(&settings, &selection, timeout).await?;

            let checker = IntegrityChecker::new();
            let report = checker.check_integrity(&measurements)?;

            if json {
                println!("{}", report.to_json()?);
            } else {
                println!("\n{}", checker.generate_summary(&report));
            }

            if report.is_clean() {
                println!("✅ All data passed validation checks");
            } else {
                println!("⚠️  Found {} validation issues", report.violations.len());
                if strict {
                    return Err(ProcessingError::Integrity(format!(
                        "{} integrity violations found",
                        report.violations.len()
                    )));
                }
            }
        }

        Commands::Export {
            selection,
            output_dir,
            delimiter,
            precision,
        } => {
            let delimiter = u8::try_from(delimiter).map_err(|_| {
                ProcessingError::Config(format!("Delimiter must be a single byte: {:?}", delimiter))
            })?;

            let measurements = load_measurements(&settings, &selection, timeout).await?;

            let mut writer = CsvWriter::new().with_delimiter(delimiter);
            if let Some(precision) = precision {
                writer = writer.with_precision(precision);
            }

            let written = writer.write_measurements(&measurements, &output_dir)?;
            println!("Wrote {} rows to {} files:", measurements.weather().len(), written.len());
            for path in written {
                println!("  {}", path.display());
            }
        }
    }

    Ok(())
}

fn setup_logging(verbose: bool) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let log_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("radcalnet_processor={}", log_level)));

    // try_init: a subscriber may already be installed when embedded
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_level(true)
                .with_writer(std::io::stderr),
        )
        .try_init();
}

/// Drive `future` to completion on a new multi-threaded runtime.
///
/// Blocking tasks still running afterwards (a timed out build) are detached, not joined,
/// so the caller gets control back once the future resolves.
pub fn block_on<F: Future>(future: F) -> Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
    let output = runtime.block_on(future);
    runtime.shutdown_background();
    Ok(output)
}

/// Run blocking work off the async runtime, bounded by the configured timeout
async fn run_blocking<T, F>(timeout: Option<Duration>, task: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    let handle = tokio::task::spawn_blocking(task);

    let joined = match timeout {
        Some(limit) => tokio::time::timeout(limit, handle)
            .await
            .map_err(|_| ProcessingError::Timeout(limit))?,
        None => handle.await,
    };

    joined?
}

async fn load_measurements(
    settings: &Settings,
    selection: &Selection,
    timeout: Option<Duration>,
) -> Result<SiteMeasurements> {
    let root: PathBuf = selection
        .root
        .clone()
        .or_else(|| settings.store_root.clone())
        .ok_or_else(|| {
            ProcessingError::Config("No data store root: pass --root or set store_root".to_string())
        })?;
    let from = parse_bound(selection.from.as_deref())?;
    let to = parse_bound(selection.to.as_deref())?;

    println!("Querying site {} in {}", selection.site, root.display());

    let settings = settings.clone();
    let site = selection.site.clone();
    let instrument = selection.instrument.clone();

    run_blocking(timeout, move || {
        let store = DataStore::open(&root, &settings)?;
        let progress = ProgressReporter::new(0, "Building measurements...", false);
        store.get_instrument_measurements(&site, instrument.as_deref(), from, to, Some(&progress))
    })
    .await
}

fn parse_bound(value: Option<&str>) -> Result<Option<Timestamp>> {
    value.map(parse_time_bound).transpose()
}

fn print_overview(measurements: &SiteMeasurements) {
    let metadata = measurements.metadata();
    println!(
        "Instrument: {}",
        metadata.instrument.as_deref().unwrap_or("-")
    );
    if let Some(site) = metadata.site_code() {
        println!("Site: {} ({})", site, site.name());
    }
    if let Some(coordinates) = metadata.coordinates {
        println!(
            "Location: lat {}, lon {}, alt {} m",
            coordinates.latitude, coordinates.longitude, coordinates.altitude
        );
    }

    let weather = measurements.weather();
    match (weather.index().first(), weather.index().last()) {
        (Some(first), Some(last)) => println!(
            "{} acquisitions from {} to {}",
            weather.len(),
            format_timestamp(first),
            format_timestamp(last)
        ),
        _ => println!("No acquisitions in range"),
    }

    println!("  weather       {:>6} rows", weather.len());
    println!("  weather_errs  {:>6} rows", measurements.weather_errors().len());
    for (name, table) in measurements.spectral_tables() {
        println!("  {:<13} {:>6} rows", name, table.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn test_timed_out_work_does_not_hold_the_caller() -> Result<()> {
        let started = Instant::now();

        let result = block_on(run_blocking(Some(Duration::from_millis(100)), || {
            std::thread::sleep(Duration::from_secs(3));
            Ok(())
        }))?;

        assert!(matches!(result, Err(ProcessingError::Timeout(_))));
        assert!(started.elapsed() < Duration::from_secs(2), "{:?}", started.elapsed());
        Ok(())
    }

    #[test]
    fn test_work_within_timeout_completes() -> Result<()> {
        let value = block_on(run_blocking(Some(Duration::from_secs(5)), || Ok(42)))??;
        assert_eq!(value, 42);

        let unbounded = block_on(run_blocking(None, || Ok("done")))??;
        assert_eq!(unbounded, "done");
        Ok(())
    }
}
