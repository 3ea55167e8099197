
/// Contains the writer for contig-to-contig contact tables
pub mod contact_writer;
/// Contains the writer for the final contig partition table
pub mod partition_writer;
