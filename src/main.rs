use anyhow::Result;
use log::{debug, error, info, trace, warn};
use serde::Serialize;
use simulation_common::{DeathStats, MutationStats, SimulationConfig, TransitionCounts};
use std::fs::File;
use std::io::Write;
use std::time::Instant;
use tumor_phenotype_engine::PhenotypeSimulation;

/// End-of-run tallies written next to the snapshots.
#[derive(Debug, Serialize)]
struct RunSummary {
    steps: u32,
    final_cell_count: u32,
    divisions: u32,
    deaths: DeathStats,
    mutations: MutationStats,
    transitions: TransitionCounts,
}

fn main() -> Result<()> {
    env_logger::init();

    info!("Starting tumor phenotype engine...");
    let config = SimulationConfig::load("config.toml")?;

    let mut sim = PhenotypeSimulation::new(config)?;
    info!("Lattice initialized with {} cells.", sim.current_cell_count());
    debug!("Simulation parameters: {:#?}", sim.params());

    let total_steps = sim.config().run.total_steps;
    let mut record_interval_steps = sim.config().run.record_interval_steps;
    if record_interval_steps == 0 {
        warn!("record_interval_steps is 0. Recording every step.");
        record_interval_steps = 1;
    }
    info!("Recording snapshot every {} MCS.", record_interval_steps);

    sim.start();
    info!("Recording initial snapshot (MCS 0)...");
    if let Err(e) = sim.record_snapshot() {
        error!("Error recording initial snapshot: {}", e);
        anyhow::bail!("Failed to record initial snapshot.");
    }

    info!("Starting simulation loop for {} MCS...", total_steps);
    let start_time = Instant::now();
    let mut previous_print_time = start_time;

    for step in 0..total_steps {
        let step_start_time = Instant::now();
        let report = match sim.step() {
            Ok(report) => report,
            Err(e) => {
                error!("Error during MCS {}: {}", step + 1, e);
                anyhow::bail!("Simulation step failed.");
            }
        };
        let step_duration = step_start_time.elapsed();

        let current_time = Instant::now();
        let should_print_status = current_time.duration_since(previous_print_time).as_secs_f64() >= 5.0;
        let is_record_step = (step + 1) % record_interval_steps == 0;
        let is_last_step = step + 1 == total_steps;

        if should_print_status || is_record_step || is_last_step {
            info!(
                "MCS [{}/{}] | Cells: {} | Divisions: {} | Deaths: {} | Step Time: {:6.2} ms | Elapsed: {:.2} s",
                step + 1,
                total_steps,
                sim.current_cell_count(),
                report.divisions.len(),
                report.deaths.len(),
                step_duration.as_secs_f64() * 1000.0,
                start_time.elapsed().as_secs_f64()
            );
            previous_print_time = current_time;

            if is_record_step || is_last_step {
                if let Err(e) = sim.record_snapshot() {
                    error!("Error recording snapshot at MCS {}: {}", step + 1, e);
                    anyhow::bail!("Failed to record snapshot.");
                }
            }
        } else {
            trace!(
                "MCS [{}/{}] completed in {:.2} ms",
                step + 1,
                total_steps,
                step_duration.as_secs_f64() * 1000.0
            );
        }
    }

    let total_duration = start_time.elapsed();
    info!("Simulation finished in {:.3} seconds.", total_duration.as_secs_f64());

    info!("Saving recorded data...");
    let base = sim.config().output.base_filename.clone();
    if sim.config().output.save_snapshots {
        let output_format = sim.config().output.format.as_deref().unwrap_or("json");
        save_snapshots(&sim, &base, output_format);
    } else {
        info!("Skipping snapshots as per config (save_snapshots is false).");
    }

    if sim.config().output.save_growth_log {
        let filename = format!("{}_growth_log.csv", base);
        let mut writer = csv::Writer::from_path(&filename)?;
        for record in sim.growth_records() {
            writer.serialize(record)?;
        }
        writer.flush()?;
        info!("Growth log ({} records) saved to {}", sim.growth_records().len(), filename);
    }

    if sim.config().output.save_summary {
        save_summary(&sim, &base)?;
    } else {
        info!("Skipping summaries as per config.");
    }

    info!("Simulation Complete.");
    Ok(())
}

fn save_snapshots(sim: &PhenotypeSimulation, base: &str, output_format: &str) {
    let snapshots = sim.get_recorded_snapshots();
    match output_format {
        "bincode" => {
            let filename = format!("{}_snapshots.bin", base);
            match File::create(&filename) {
                Ok(file) => match bincode::serialize_into(file, snapshots) {
                    Ok(_) => info!("All snapshots saved to {} (binary format)", filename),
                    Err(e) => error!("Error serializing snapshots to bincode: {}", e),
                },
                Err(e) => error!("Error creating snapshot file '{}': {}", filename, e),
            }
        }
        "messagepack" => {
            let filename = format!("{}_snapshots.msgpack", base);
            match &mut File::create(&filename) {
                Ok(file) => match rmp_serde::encode::write(file, snapshots) {
                    Ok(_) => info!("All snapshots saved to {} (MessagePack format)", filename),
                    Err(e) => error!("Error serializing snapshots to MessagePack: {}", e),
                },
                Err(e) => error!("Error creating snapshot file '{}': {}", filename, e),
            }
        }
        other => {
            if other != "json" {
                error!("Unknown output format: {}. Using JSON instead.", other);
            }
            let filename = format!("{}_snapshots.json", base);
            match File::create(&filename) {
                Ok(mut file) => match serde_json::to_string(snapshots) {
                    Ok(json_string) => {
                        if let Err(e) = file.write_all(json_string.as_bytes()) {
                            error!("Error writing snapshot JSON to file '{}': {}", filename, e);
                        } else {
                            info!("All snapshots saved to {}", filename);
                        }
                    }
                    Err(e) => error!("Error serializing snapshots to JSON: {}", e),
                },
                Err(e) => error!("Error creating snapshot file '{}': {}", filename, e),
            }
        }
    }
}

fn save_summary(sim: &PhenotypeSimulation, base: &str) -> Result<()> {
    let filename = format!("{}_final_volumes.csv", base);
    let mut writer = csv::Writer::from_path(&filename)?;
    for record in sim.final_volumes() {
        writer.serialize(record)?;
    }
    writer.flush()?;
    info!("Final volumes saved to {}", filename);

    let filename = format!("{}_death_stats.csv", base);
    let mut writer = csv::Writer::from_path(&filename)?;
    writer.serialize(sim.death_stats())?;
    writer.flush()?;

    let filename = format!("{}_mutation_stats.csv", base);
    let mut writer = csv::Writer::from_path(&filename)?;
    let mutations = sim.mutation_stats();
    writer.write_record(["random_mutations", "forced_switches", "total", "step"])?;
    writer.write_record(&[
        mutations.random_mutations.to_string(),
        mutations.forced_switches.to_string(),
        mutations.total().to_string(),
        mutations.step.to_string(),
    ])?;
    writer.flush()?;

    let filename = format!("{}_transition_counts.csv", base);
    let mut writer = csv::Writer::from_path(&filename)?;
    writer.write_record(["transition", "count"])?;
    for (label, count) in sim.transition_counts().rows() {
        writer.write_record(&[label.to_string(), count.to_string()])?;
    }
    writer.flush()?;

    let summary = RunSummary {
        steps: sim.current_step(),
        final_cell_count: sim.current_cell_count(),
        divisions: sim.division_count(),
        deaths: sim.death_stats(),
        mutations: sim.mutation_stats(),
        transitions: sim.transition_counts(),
    };
    let filename = format!("{}_summary.json", base);
    serde_json::to_writer_pretty(File::create(&filename)?, &summary)?;
    info!(
        "Summaries saved: {} deaths, {} mutations, {} transitions.",
        summary.deaths.total_deaths,
        summary.mutations.total(),
        summary.transitions.total()
    );
    Ok(())
}
