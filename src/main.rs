//! WiFi Vitals Agent CLI
//!
//! Presence and vital-sign estimation from radio amplitude.

use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;
use wifi_vitals_agent::{
    config::Config,
    core::detection::parse_sensitivity,
    core::{
        DetectionMode, DirectCorrelation, EngineConfig, EstimateOutcome, ReportBuilder,
        VitalsEngine, VitalsReport,
    },
    pipeline::Pipeline,
    source::SyntheticSource,
    stats::create_shared_stats_with_persistence,
    ACCURACY_NOTICE, VERSION,
};

#[derive(Parser)]
#[command(name = "wifi-vitals")]
#[command(version = VERSION)]
#[command(about = "Presence and vital-sign estimation from radio amplitude", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline on the synthetic radio source
    Start {
        /// Stop after this many seconds (runs until Ctrl+C otherwise)
        #[arg(long)]
        duration: Option<u64>,

        /// Override the synthetic cardiac frequency (Hz)
        #[arg(long)]
        cardiac_hz: Option<f64>,

        /// Override the synthetic respiration frequency (Hz)
        #[arg(long)]
        respiration_hz: Option<f64>,
    },

    /// Show configuration and cumulative statistics
    Status,

    /// Set detection sensitivity (10-100)
    Sensitivity {
        #[arg(allow_negative_numbers = true)]
        value: i64,
    },

    /// Set detection mode (normal, precision, long-range)
    Mode { mode: String },

    /// Enable or disable the noise gate
    NoiseFilter {
        #[arg(value_enum)]
        state: Toggle,
    },

    /// Reset the baseline and restart warm-up
    Calibrate,

    /// Merge exported session reports
    Export {
        /// Directory holding session files
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Export format (json or jsonl)
        #[arg(long, default_value = "json")]
        format: String,
    },

    /// Show configuration
    Config,

    /// Display the accuracy notice
    Notice,
}

#[derive(Clone, Copy, ValueEnum)]
enum Toggle {
    On,
    Off,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Start {
            duration,
            cardiac_hz,
            respiration_hz,
        } => {
            cmd_start(duration, cardiac_hz, respiration_hz);
        }
        Commands::Status => {
            cmd_status();
        }
        Commands::Sensitivity { value } => {
            cmd_sensitivity(value);
        }
        Commands::Mode { mode } => {
            cmd_mode(&mode);
        }
        Commands::NoiseFilter { state } => {
            cmd_noise_filter(matches!(state, Toggle::On));
        }
        Commands::Calibrate => {
            cmd_calibrate();
        }
        Commands::Export { output, format } => {
            cmd_export(output, &format);
        }
        Commands::Config => {
            cmd_config();
        }
        Commands::Notice => {
            cmd_notice();
        }
    }
}

fn cmd_start(duration: Option<u64>, cardiac_hz: Option<f64>, respiration_hz: Option<f64>) {
    println!("WiFi Vitals Agent v{VERSION}");
    println!();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading config: {e}");
            std::process::exit(1);
        }
    };
    if let Err(e) = config.ensure_directories() {
        eprintln!("Warning: Could not create directories: {e}");
    }

    let mut synthetic = config.synthetic_source();
    if let Some(hz) = cardiac_hz {
        synthetic.cardiac_hz = hz;
    }
    if let Some(hz) = respiration_hz {
        synthetic.respiration_hz = hz;
    }

    let engine = match VitalsEngine::new(config.engine.clone(), config.detection) {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("Error creating engine: {e}");
            std::process::exit(1);
        }
    };

    print_engine_summary(&config.engine);
    println!(
        "  Synthetic signal: cardiac {:.2} Hz, respiration {:.2} Hz",
        synthetic.cardiac_hz, synthetic.respiration_hz
    );
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let stats = create_shared_stats_with_persistence(config.data_path.join("stats.json"));

    let mut source = SyntheticSource::new(synthetic);
    let mut pipeline = match Pipeline::spawn(engine, source.receiver().clone(), Arc::clone(&stats))
    {
        Ok(pipeline) => pipeline,
        Err(e) => {
            eprintln!("Error starting pipeline: {e}");
            std::process::exit(1);
        }
    };

    let mut report_builder = ReportBuilder::new();
    println!("Instance ID: {}", report_builder.instance_id());

    if let Err(e) = source.start() {
        eprintln!("Error starting source: {e}");
        std::process::exit(1);
    }

    // Set up Ctrl+C handler
    let running = Arc::new(AtomicBool::new(true));
    ctrlc_handler(Arc::clone(&running));

    let started = Instant::now();
    let deadline = duration.map(Duration::from_secs);
    let mut reports: Vec<VitalsReport> = Vec::new();

    // Poll the config file so the control subcommands can steer a running agent.
    let mut detection = config.detection;
    let mut calibration_epoch = config.calibration_epoch;
    let mut last_config_check = Instant::now();

    while running.load(Ordering::SeqCst) && pipeline.is_running() {
        if deadline.is_some_and(|d| started.elapsed() >= d) {
            break;
        }

        if last_config_check.elapsed() >= Duration::from_secs(1) {
            if let Ok(cfg) = Config::load() {
                if cfg.detection != detection {
                    detection = cfg.detection;
                    println!(
                        "Applying parameters: sensitivity {}, mode {}, noise filter {}",
                        detection.sensitivity,
                        detection.mode,
                        on_off(detection.noise_filter_enabled)
                    );
                    if let Err(e) = pipeline.control().set_parameters(detection) {
                        eprintln!("Warning: Could not apply parameters: {e}");
                    }
                }
                if cfg.calibration_epoch != calibration_epoch {
                    calibration_epoch = cfg.calibration_epoch;
                    println!("Recalibrating...");
                    if let Err(e) = pipeline.control().trigger_calibration() {
                        eprintln!("Warning: Could not trigger calibration: {e}");
                    }
                }
            }
            last_config_check = Instant::now();
        }

        match pipeline.updates().recv_timeout(Duration::from_millis(100)) {
            Ok(outcome) => {
                let outputs = pipeline.outputs();
                match outcome {
                    EstimateOutcome::Updated { vitals, .. } => {
                        println!(
                            "[{}] HR {:5.1} bpm | BR {:4.1} rpm | quality {:5.1}% | present: {} | distance {:5.1}",
                            outputs.updated_at.format("%H:%M:%S"),
                            vitals.heart_rate,
                            vitals.breathing_rate,
                            vitals.signal_quality,
                            if outputs.detection.person_present { "yes" } else { "no" },
                            outputs.detection.distance
                        );
                        reports.push(report_builder.build_from_parts(
                            outputs.updated_at,
                            outputs.vitals,
                            outputs.detection,
                            outputs.calibration,
                            outputs.parameters,
                            outputs.window_full,
                        ));
                    }
                    EstimateOutcome::LowConfidence {
                        collected,
                        required,
                    } => {
                        println!(
                            "[{}] Collecting samples: {collected}/{required} (low confidence)",
                            outputs.updated_at.format("%H:%M:%S")
                        );
                    }
                }
            }
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => {}
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => {
                eprintln!("Pipeline disconnected unexpectedly");
                break;
            }
        }
    }

    println!();
    println!("Stopping pipeline...");
    source.stop();
    pipeline.stop();

    if let Err(e) = stats.save() {
        eprintln!("Warning: Could not save stats: {e}");
    }

    if !reports.is_empty() {
        let export_path = config.export_path.join(format!(
            "session_{}.json",
            Utc::now().format("%Y%m%d_%H%M%S")
        ));

        if let Some(parent) = export_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }

        match serde_json::to_string_pretty(&reports) {
            Ok(json) => {
                if let Err(e) = std::fs::write(&export_path, json) {
                    eprintln!("Error writing reports: {e}");
                } else {
                    println!("Exported {} reports to {:?}", reports.len(), export_path);
                }
            }
            Err(e) => {
                eprintln!("Error serializing reports: {e}");
            }
        }
    }

    println!();
    println!("{}", stats.summary());
}

fn cmd_status() {
    let config = Config::load().unwrap_or_default();

    println!("WiFi Vitals Agent Status");
    println!("========================");
    println!();

    print_engine_summary(&config.engine);
    println!("  Sensitivity: {}", config.detection.sensitivity);
    println!("  Mode: {}", config.detection.mode);
    println!(
        "  Noise filter: {}",
        on_off(config.detection.noise_filter_enabled)
    );
    println!("  Calibration epoch: {}", config.calibration_epoch);
    println!();

    let stats_path = config.data_path.join("stats.json");
    if stats_path.exists() {
        if let Ok(content) = std::fs::read_to_string(&stats_path) {
            if let Ok(stats) = serde_json::from_str::<serde_json::Value>(&content) {
                println!("Cumulative Statistics:");
                if let Some(samples) = stats.get("samples_ingested") {
                    println!("  Samples ingested: {samples}");
                }
                if let Some(rejected) = stats.get("samples_rejected") {
                    println!("  Samples rejected: {rejected}");
                }
                if let Some(estimates) = stats.get("estimates_computed") {
                    println!("  Spectral estimates: {estimates}");
                }
                if let Some(calibrations) = stats.get("calibrations") {
                    println!("  Calibrations: {calibrations}");
                }
            }
        }
    } else {
        println!("No previous session data found.");
    }
}

fn cmd_sensitivity(value: i64) {
    let sensitivity = match parse_sensitivity(value) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };
    update_config(|config| config.detection.sensitivity = sensitivity);
    println!("Sensitivity set to {sensitivity}.");
}

fn cmd_mode(mode: &str) {
    let mode: DetectionMode = match mode.parse() {
        Ok(m) => m,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };
    update_config(|config| config.detection.mode = mode);
    println!(
        "Detection mode set to {mode} (threshold x{}).",
        mode.threshold_multiplier()
    );
}

fn cmd_noise_filter(enabled: bool) {
    update_config(|config| config.detection.noise_filter_enabled = enabled);
    println!("Noise filter {}.", on_off(enabled));
}

fn cmd_calibrate() {
    update_config(|config| config.calibration_epoch = config.calibration_epoch.wrapping_add(1));
    println!("Calibration requested. A running agent restarts warm-up within a second.");
}

fn cmd_export(output: Option<PathBuf>, format: &str) {
    let config = Config::load().unwrap_or_default();
    let export_dir = output.unwrap_or(config.export_path.clone());

    // Only session files; earlier merged exports are skipped
    let session_files: Vec<PathBuf> = std::fs::read_dir(&export_dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| {
                    p.extension().map(|e| e == "json").unwrap_or(false)
                        && p.file_name()
                            .and_then(|n| n.to_str())
                            .map(|n| n.starts_with("session_"))
                            .unwrap_or(false)
                })
                .collect()
        })
        .unwrap_or_default();

    if session_files.is_empty() {
        println!("No session data found in {export_dir:?}");
        println!("Run 'wifi-vitals start' to begin collecting data.");
        return;
    }

    println!(
        "Found {} session file(s) in {:?}",
        session_files.len(),
        export_dir
    );

    let mut all_reports: Vec<VitalsReport> = Vec::new();
    for file in &session_files {
        if let Ok(content) = std::fs::read_to_string(file) {
            if let Ok(reports) = serde_json::from_str::<Vec<VitalsReport>>(&content) {
                all_reports.extend(reports);
            }
        }
    }

    println!("Total reports: {}", all_reports.len());

    let output_path = export_dir.join(format!(
        "export_{}.{}",
        Utc::now().format("%Y%m%d_%H%M%S"),
        if format == "jsonl" { "jsonl" } else { "json" }
    ));

    let result = if format == "jsonl" {
        let lines: Vec<String> = all_reports
            .iter()
            .filter_map(|r| serde_json::to_string(r).ok())
            .collect();
        std::fs::write(&output_path, lines.join("\n"))
    } else {
        match serde_json::to_string_pretty(&all_reports) {
            Ok(json) => std::fs::write(&output_path, json),
            Err(e) => {
                eprintln!("Error serializing: {e}");
                return;
            }
        }
    };

    match result {
        Ok(_) => println!("Exported to {output_path:?}"),
        Err(e) => eprintln!("Error writing export: {e}"),
    }
}

fn cmd_config() {
    let config = Config::load().unwrap_or_default();

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!();
    println!(
        "{}",
        serde_json::to_string_pretty(&config).unwrap_or_else(|_| "Error".to_string())
    );
}

fn cmd_notice() {
    println!("{ACCURACY_NOTICE}");
}

/// Apply a change to the saved configuration, exiting on failure.
fn update_config(change: impl FnOnce(&mut Config)) {
    if let Err(e) = Config::update(change) {
        eprintln!("Error updating config {:?}: {e}", Config::config_path());
        eprintln!("The file was left unchanged.");
        std::process::exit(1);
    }
}

fn print_engine_summary(engine: &EngineConfig) {
    println!("Engine:");
    println!("  Sample rate: {} Hz", engine.sample_rate_hz);
    println!(
        "  Window: {} of {} samples, estimate every {} samples",
        engine.window_size, engine.ring_capacity, engine.decimation
    );
    println!("  Warm-up: {} samples", engine.warmup_samples);

    let estimator = DirectCorrelation::new(engine.window_size, engine.sample_rate_hz);
    print_band("Cardiac", &estimator, estimator.cardiac_bins());
    print_band("Respiration", &estimator, estimator.respiration_bins());
}

fn print_band(
    name: &str,
    estimator: &DirectCorrelation,
    bins: Option<std::ops::RangeInclusive<usize>>,
) {
    match bins {
        Some(bins) => println!(
            "  {name} bins: {}..={} ({:.2}-{:.2} Hz)",
            bins.start(),
            bins.end(),
            estimator.bin_frequency(*bins.start()),
            estimator.bin_frequency(*bins.end())
        ),
        None => println!("  {name} bins: none at this sample rate"),
    }
}

fn on_off(enabled: bool) -> &'static str {
    if enabled {
        "on"
    } else {
        "off"
    }
}

/// Set up Ctrl+C handler.
fn ctrlc_handler(running: Arc<AtomicBool>) {
    if let Err(e) = ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    }) {
        eprintln!("Warning: Could not set Ctrl+C handler: {e}");
    }
}
