
use contigphase::cli::{Settings, check_settings, get_raw_settings};
use contigphase::contact_map::{ContactMapStats, parse_unpaired_bam_file_with_stats};
use contigphase::data_types::contact_graph::ContactGraph;
use contigphase::data_types::id_registry::IdRegistry;
use contigphase::phase_search::{PhaseSearchConfig, PhaseSearchError, PhaseSearchResult, random_phase_search_with_config};
use contigphase::pinned_partitions::load_pinned_partitions;
use contigphase::writers::contact_writer::ContactWriter;
use contigphase::writers::partition_writer::PartitionWriter;

use log::{LevelFilter, debug, error, info, warn};
use std::time::Instant;

fn main() {
    // get the settings
    let settings: Settings = get_raw_settings();
    let filter_level: LevelFilter = match settings.verbosity {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace
    };

    // immediately setup logging first
    env_logger::builder()
        .format_timestamp_millis()
        .filter_level(filter_level)
        .init();

    // okay, now we can check all the other settings
    let cli_settings: Settings = check_settings(settings);
    let start_time: Instant = Instant::now();

    // build the contact map from the read groups
    info!("Loading contacts from {:?}...", cli_settings.bam_filename);
    let (mut contact_graph, id_map, map_stats): (ContactGraph, IdRegistry<String>, ContactMapStats) = match parse_unpaired_bam_file_with_stats(
        &cli_settings.bam_filename,
        &cli_settings.required_prefix,
        cli_settings.min_mapping_quality
    ) {
        Ok(r) => r,
        Err(e) => {
            error!("Error while loading alignment file: {}", e);
            std::process::exit(exitcode::IOERR);
        }
    };
    info!("Parsed {} records in {} read groups, {} used.", map_stats.num_records, map_stats.num_groups, map_stats.used_records);
    debug!("Skipped records: {} unmapped, {} prefix, {} MAPQ, {} not primary", map_stats.skipped_unmapped, map_stats.skipped_prefix, map_stats.skipped_mapq, map_stats.skipped_not_primary);
    info!("Contact graph: {} contigs, {} edges, {} contacts.", contact_graph.node_count(), contact_graph.edge_count(), map_stats.num_contacts);
    if contact_graph.edge_count() == 0 {
        warn!("No contacts were found between contigs, all labels will be arbitrary.");
    }

    // load any labels that are known ahead of time
    let mut search_config: PhaseSearchConfig = cli_settings.phase_search_config();
    if let Some(ref filename) = cli_settings.pinned_filename {
        search_config.pinned = match load_pinned_partitions(filename, &id_map) {
            Ok(p) => p,
            Err(e) => {
                error!("Error while loading pinned partitions: {}", e);
                std::process::exit(exitcode::IOERR);
            }
        };
        info!("Pinned contigs: {}", search_config.pinned.len());
    }

    let search_result: PhaseSearchResult = match random_phase_search_with_config(&contact_graph, &search_config) {
        Ok(r) => r,
        Err(e) => {
            error!("Error while phasing contigs: {}", e);
            let code = match e {
                PhaseSearchError::NoIterations |
                PhaseSearchError::NoThreads |
                PhaseSearchError::NoPasses => exitcode::USAGE,
                _ => exitcode::SOFTWARE
            };
            std::process::exit(code);
        }
    };
    info!("Best consistency score: {} (trial {} of {})", search_result.score, search_result.trial_index, search_result.trials_run);

    // commit the winner so the writers see it
    if let Err(e) = search_result.apply(&mut contact_graph) {
        error!("Error while applying partitions: {}", e);
        std::process::exit(exitcode::SOFTWARE);
    }

    info!("Saving partitions to {:?}...", cli_settings.partition_filename);
    let mut partition_writer: PartitionWriter = match PartitionWriter::new(&cli_settings.partition_filename) {
        Ok(pw) => pw,
        Err(e) => {
            error!("Error during partition writer creation: {}", e);
            std::process::exit(exitcode::IOERR);
        }
    };
    if let Err(e) = partition_writer.write_partitions(&contact_graph, &id_map) {
        error!("Error while writing partitions file: {}", e);
        std::process::exit(exitcode::IOERR);
    }

    if let Some(ref filename) = cli_settings.contacts_filename {
        info!("Saving contacts to {:?}...", filename);
        let mut contact_writer: ContactWriter = match ContactWriter::new(filename) {
            Ok(cw) => cw,
            Err(e) => {
                error!("Error during contact writer creation: {}", e);
                std::process::exit(exitcode::IOERR);
            }
        };
        if let Err(e) = contact_writer.write_contacts(&contact_graph, &id_map) {
            error!("Error while writing contacts file: {}", e);
            std::process::exit(exitcode::IOERR);
        }
    }

    info!("All contigs finished successfully after {} seconds.", start_time.elapsed().as_secs_f64());
}
