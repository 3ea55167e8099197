
/// Sequential reader that converts alignment file records into our record type
pub mod alignment_reader;
/// CLI functionality and checks
pub mod cli;
/// Builds the contig contact graph from read groups in an alignment file
pub mod contact_map;
/// Contains multiple wrappers for useful data types
pub mod data_types;
/// Parallel randomized local search for the best contig phasing
pub mod phase_search;
/// Loading of contigs with externally known phase labels
pub mod pinned_partitions;
/// Contains all the various output writer functionality
pub mod writers;
