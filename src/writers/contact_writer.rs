use serde::Serialize;
use std::fs::File;
use std::path::Path;

use crate::data_types::contact_graph::ContactGraph;
use crate::data_types::id_registry::IdRegistry;

/// Writes the contig contacts (graph edges) to a file
pub struct ContactWriter {
    /// Handle for the CSV writer
    csv_writer: csv::Writer<File>
}

#[derive(Serialize)]
struct ContactRow {
    contig_a: String,
    contig_b: String,
    weight: i32
}

impl ContactWriter {
    /// Creates a new writer for a given filename
    /// # Arguments
    /// * `filename` - the path to write all contacts to
    pub fn new(filename: &Path) -> csv::Result<ContactWriter> {
        // modify the delimiter to "," if it ends with .csv
        let is_csv: bool = filename.extension().unwrap_or_default() == "csv";
        let delimiter: u8 = if is_csv { b',' } else { b'\t' };
        let csv_writer: csv::Writer<File> = csv::WriterBuilder::new()
            .delimiter(delimiter)
            .from_path(filename)?;
        Ok(ContactWriter {
            csv_writer
        })
    }

    /// Writes every edge once, ordered by the node ids of its endpoints.
    /// # Arguments
    /// * `contact_graph` - the graph to write the edges of
    /// * `id_map` - the registry that issued the node ids
    /// # Errors
    /// * if a node id has no contig name in `id_map`
    /// * if the csv_writer has any errors
    pub fn write_contacts(&mut self, contact_graph: &ContactGraph, id_map: &IdRegistry<String>) -> Result<(), Box<dyn std::error::Error>> {
        let mut edges: Vec<(i32, i32, i32)> = contact_graph.edges().collect();
        edges.sort_unstable();
        for (a, b, weight) in edges.into_iter() {
            let row: ContactRow = ContactRow {
                contig_a: id_map.get_key(a)?.clone(),
                contig_b: id_map.get_key(b)?.clone(),
                weight
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
    use std::path::PathBuf;

    #[test]
    fn test_write_contacts() {
        let mut id_map: IdRegistry<String> = IdRegistry::new(true);
        let mut graph = ContactGraph::new();
        for name in ["ctg_a", "ctg_b", "ctg_c"] {
            let id = id_map.try_insert(name.to_string());
            graph.insert_unphased_node(id).unwrap();
        }
        graph.try_insert_edge_with_weight(2, 0, 4).unwrap();
        graph.try_insert_edge_with_weight(1, 0, 7).unwrap();

        let out_path: PathBuf = std::env::temp_dir().join("contigphase_contact_writer_test.tsv");
        {
            let mut writer = ContactWriter::new(&out_path).unwrap();
            writer.write_contacts(&graph, &id_map).unwrap();
        }

        let contents = std::fs::read_to_string(&out_path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines, vec![
            "contig_a\tcontig_b\tweight",
            "ctg_a\tctg_b\t7",
            "ctg_a\tctg_c\t4"
        ]);
        std::fs::remove_file(&out_path).unwrap();
    }
}
