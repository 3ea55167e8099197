use serde::Serialize;
use std::fs::File;
use std::path::Path;

use crate::data_types::contact_graph::{ContactGraph, GraphError};
use crate::data_types::id_registry::IdRegistry;

/// Writes the final phase label of every contig to a file
pub struct PartitionWriter {
    /// Handle for the CSV writer
    csv_writer: csv::Writer<File>
}

/// Contains all the data written to each row of the partition file
#[derive(Serialize)]
struct PartitionRow {
    /// the contig name
    contig: String,
    /// the integer id assigned to the contig
    node_id: i32,
    /// the phase label, -1 is unphased
    partition: i8,
    /// number of reads supporting the contig
    coverage: i32,
    /// the consistency score of the contig under the current labels
    consistency_score: i64
}

impl PartitionWriter {
    /// Creates a new writer for a given filename
    /// # Arguments
    /// * `filename` - the path to write all partitions to
    pub fn new(filename: &Path) -> csv::Result<PartitionWriter> {
        // modify the delimiter to "," if it ends with .csv
        let is_csv: bool = filename.extension().unwrap_or_default() == "csv";
        let delimiter: u8 = if is_csv { b',' } else { b'\t' };
        let csv_writer: csv::Writer<File> = csv::WriterBuilder::new()
            .delimiter(delimiter)
            .from_path(filename)?;
        Ok(PartitionWriter {
            csv_writer
        })
    }

    /// Writes one row per node, in node id order.
    /// # Arguments
    /// * `contact_graph` - the graph with its final labels
    /// * `id_map` - the registry that issued the node ids
    /// # Errors
    /// * if a node id has no contig name in `id_map`
    /// * if the csv_writer has any errors
    pub fn write_partitions(&mut self, contact_graph: &ContactGraph, id_map: &IdRegistry<String>) -> Result<(), Box<dyn std::error::Error>> {
        for node_id in contact_graph.sorted_node_ids() {
            let contig: String = id_map.get_key(node_id)?.clone();
            let node = contact_graph.get_node(node_id)
                .ok_or(GraphError::NodeNotFound { id: node_id })?;
            let row: PartitionRow = PartitionRow {
                contig,
                node_id,
                partition: node.partition().as_i8(),
                coverage: node.coverage(),
                consistency_score: contact_graph.compute_consistency_score(node_id)?
            };
            self.csv_writer.serialize(&row)?;
        }
        self.csv_writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_types::contact_graph::Partition;
    use std::path::PathBuf;

    fn small_graph() -> (ContactGraph, IdRegistry<String>) {
        let mut id_map: IdRegistry<String> = IdRegistry::new(true);
        let mut graph = ContactGraph::new();
        for (name, partition) in [("ctg_a", Partition::Haplotype0), ("ctg_b", Partition::Haplotype0), ("ctg_c", Partition::Unphased)] {
            let id = id_map.try_insert(name.to_string());
            graph.insert_node(id, partition).unwrap();
            graph.increment_coverage(id, id + 1).unwrap();
        }
        graph.try_insert_edge_with_weight(0, 1, 3).unwrap();
        graph.try_insert_edge_with_weight(1, 2, 2).unwrap();
        (graph, id_map)
    }

    #[test]
    fn test_write_partitions_tsv() {
        let (graph, id_map) = small_graph();
        let out_path: PathBuf = std::env::temp_dir().join("contigphase_partition_writer_test.tsv");
        {
            let mut writer = PartitionWriter::new(&out_path).unwrap();
            writer.write_partitions(&graph, &id_map).unwrap();
        }

        let contents = std::fs::read_to_string(&out_path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines, vec![
            "contig\tnode_id\tpartition\tcoverage\tconsistency_score",
            "ctg_a\t0\t0\t1\t3",
            "ctg_b\t1\t0\t2\t3",
            "ctg_c\t2\t-1\t3\t0"
        ]);
        std::fs::remove_file(&out_path).unwrap();
    }

    #[test]
    fn test_write_partitions_csv() {
        let (graph, id_map) = small_graph();
        let out_path: PathBuf = std::env::temp_dir().join("contigphase_partition_writer_test.csv");
        {
            let mut writer = PartitionWriter::new(&out_path).unwrap();
            writer.write_partitions(&graph, &id_map).unwrap();
        }

        let contents = std::fs::read_to_string(&out_path).unwrap();
        assert_eq!(contents.lines().nth(1).unwrap(), "ctg_a,0,0,1,3");
        std::fs::remove_file(&out_path).unwrap();
    }

    #[test]
    fn test_unknown_node_name() {
        let (graph, _id_map) = small_graph();
        let empty_map: IdRegistry<String> = IdRegistry::new(true);
        let out_path: PathBuf = std::env::temp_dir().join("contigphase_partition_writer_missing.tsv");
        let mut writer = PartitionWriter::new(&out_path).unwrap();
        assert!(writer.write_partitions(&graph, &empty_map).is_err());
        std::fs::remove_file(&out_path).unwrap();
    }
}
