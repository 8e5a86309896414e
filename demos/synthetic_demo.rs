//! Demonstration of the vitals engine on a synthetic radio signal.
//!
//! This example shows how to:
//! 1. Build an engine from the default configuration
//! 2. Feed it a synthetic cardiac + respiration signal
//! 3. Change sensitivity and mode while it runs
//! 4. Recalibrate and watch the window refill
//! 5. Produce an exportable report
//!
//! Run with: cargo run --example synthetic_demo

use wifi_vitals_agent::{
    core::{DetectionMode, DetectionParameters, EngineConfig, EstimateOutcome, ReportBuilder},
    source::SyntheticConfig,
    VitalsEngine, ACCURACY_NOTICE,
};

fn main() {
    println!("WiFi Vitals Agent - Synthetic Demo");
    println!("==================================");
    println!();
    println!("{ACCURACY_NOTICE}");

    let config = EngineConfig::default();
    let signal = SyntheticConfig::default();
    println!(
        "Signal: cardiac {:.2} Hz (~{:.0} bpm), respiration {:.2} Hz (~{:.0} rpm)",
        signal.cardiac_hz,
        signal.cardiac_hz * 60.0,
        signal.respiration_hz,
        signal.respiration_hz * 60.0
    );
    println!();

    let mut engine = match VitalsEngine::new(config, DetectionParameters::default()) {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("Error creating engine: {e}");
            return;
        }
    };
    let mut reports = ReportBuilder::new();

    // One minute of samples at 10 Hz, processed without real-time pacing
    for (i, amplitude) in signal.amplitudes(1200).into_iter().enumerate() {
        if i == 600 {
            println!();
            println!("-- sensitivity 80, long-range mode --");
            if let Err(e) = engine.set_sensitivity(80) {
                eprintln!("Error: {e}");
            }
            engine.set_mode(DetectionMode::LongRange);
        }
        if i == 900 {
            println!();
            println!("-- recalibrating --");
            engine.trigger_calibration();
        }

        let (detection, outcome) = engine.process(amplitude, 0.0);
        let Some(outcome) = outcome else { continue };

        // Print every fifth pass
        if (i + 1) % 50 != 0 {
            continue;
        }
        match outcome {
            EstimateOutcome::Updated { vitals, peaks } => println!(
                "  t={:5.1}s HR {:5.1} bpm (raw {:>5}) | BR {:4.1} rpm | quality {:5.1}% | present {}",
                (i + 1) as f64 / 10.0,
                vitals.heart_rate,
                peaks
                    .cardiac
                    .map(|p| format!("{:.1}", p.rate_per_min))
                    .unwrap_or_else(|| "-".to_string()),
                vitals.breathing_rate,
                vitals.signal_quality,
                detection.person_present
            ),
            EstimateOutcome::LowConfidence {
                collected,
                required,
            } => println!(
                "  t={:5.1}s collecting {collected}/{required} samples",
                (i + 1) as f64 / 10.0
            ),
        }
    }

    let report = reports.build(&engine);
    println!();
    println!("Report (truncated):");
    match serde_json::to_string_pretty(&report) {
        Ok(json) => {
            for line in json.lines().take(20) {
                println!("  {line}");
            }
            println!("  ...");
        }
        Err(e) => eprintln!("Error serializing report: {e}"),
    }
}
