use crate::data_types::contact_graph::Partition;
use crate::data_types::id_registry::IdRegistry;

use log::{debug, trace, warn};
use rustc_hash::FxHashMap as HashMap;
use serde::Deserialize;
use simple_error::bail;
use std::path::Path;

/// One row of a pinned partition file
#[derive(Debug, Deserialize)]
struct PinnedRow {
    /// the contig name
    contig: String,
    /// the fixed label, -1, 0, or 1
    partition: i8
}

/// Loads contigs with a known phase label from a file with a `contig` and a `partition` column.
/// The file is tab-delimited unless it ends with `.csv`, matching the output writers.
/// Contigs that are not part of the contact graph are skipped with a warning.
/// # Arguments
/// * `filename` - the file to load
/// * `id_map` - the registry from contact map construction
/// # Errors
/// * if the file cannot be opened or a row cannot be parsed
/// * if a partition value is not -1, 0, or 1
/// * if the same contig is pinned twice
pub fn load_pinned_partitions(filename: &Path, id_map: &IdRegistry<String>) -> Result<HashMap<i32, Partition>, Box<dyn std::error::Error>> {
    let is_csv: bool = filename.extension().unwrap_or_default() == "csv";
    let delimiter: u8 = if is_csv { b',' } else { b'\t' };
    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .from_path(filename)?;

    let mut pinned: HashMap<i32, Partition> = Default::default();
    let mut num_skipped: usize = 0;
    for result in csv_reader.deserialize() {
        let row: PinnedRow = result?;
        let partition: Partition = match Partition::from_repr(row.partition) {
            Some(p) => p,
            None => bail!("Invalid partition {} for contig {:?}, expected -1, 0, or 1", row.partition, row.contig)
        };

        let node_id: i32 = match id_map.get_id(&row.contig) {
            Ok(id) => id,
            Err(_) => {
                warn!("Pinned contig {:?} is not in the contact graph, ignoring it", row.contig);
                num_skipped += 1;
                continue;
            }
        };

        trace!("Pinning {} (node {}) to {}", row.contig, node_id, partition);
        if pinned.insert(node_id, partition).is_some() {
            bail!("Contig {:?} is pinned more than once", row.contig);
        }
    }

    debug!("Loaded {} pinned contigs from {:?}, {} skipped", pinned.len(), filename, num_skipped);
    Ok(pinned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn registry() -> IdRegistry<String> {
        let mut id_map: IdRegistry<String> = IdRegistry::new(true);
        for name in ["ctg_a", "ctg_b", "ctg_c"] {
            id_map.try_insert(name.to_string());
        }
        id_map
    }

    #[test]
    fn test_load_pinned() {
        let in_path: PathBuf = "./test_data/pinned.tsv".into();
        let pinned = load_pinned_partitions(&in_path, &registry()).unwrap();
        // ctg_z is not in the registry
        assert_eq!(pinned.len(), 2);
        assert_eq!(pinned[&0], Partition::Haplotype1);
        assert_eq!(pinned[&2], Partition::Unphased);
    }

    #[test]
    fn test_bad_pinned() {
        let id_map = registry();

        let bad_value: PathBuf = std::env::temp_dir().join("contigphase_pinned_bad_value.csv");
        std::fs::write(&bad_value, "contig,partition\nctg_a,2\n").unwrap();
        assert!(load_pinned_partitions(&bad_value, &id_map).is_err());
        std::fs::remove_file(&bad_value).unwrap();

        let duplicate: PathBuf = std::env::temp_dir().join("contigphase_pinned_duplicate.csv");
        std::fs::write(&duplicate, "contig,partition\nctg_a,0\nctg_a,1\n").unwrap();
        assert!(load_pinned_partitions(&duplicate, &id_map).is_err());
        std::fs::remove_file(&duplicate).unwrap();

        let missing: PathBuf = "./test_data/does_not_exist.tsv".into();
        assert!(load_pinned_partitions(&missing, &id_map).is_err());
    }
}
