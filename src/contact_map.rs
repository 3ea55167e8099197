
use crate::alignment_reader::AlignmentReader;
use crate::data_types::alignment::AlignmentRecord;
use crate::data_types::contact_graph::{ContactGraph, GraphError, Partition};
use crate::data_types::id_registry::IdRegistry;

use log::{debug, trace};
use std::path::Path;

/// Filtering criteria applied to each alignment before it contributes to the contact map
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ContactMapConfig {
    /// If non-empty, only contigs whose name starts with this are used (e.g. "PR" for shasta)
    pub required_prefix: String,
    /// Minimum MAPQ for an alignment to be used
    pub min_mapq: u8
}

/// Counters collected while building a contact map
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ContactMapStats {
    /// Every record handed to the builder
    pub num_records: u64,
    /// Number of distinct query-name groups
    pub num_groups: u64,
    /// Records with no reference name
    pub skipped_unmapped: u64,
    /// Records on a contig without the required prefix
    pub skipped_prefix: u64,
    /// Records below the MAPQ threshold
    pub skipped_mapq: u64,
    /// Secondary records
    pub skipped_not_primary: u64,
    /// Records that contributed coverage
    pub used_records: u64,
    /// Pairwise contacts added to edge weights
    pub num_contacts: u64
}

/// Streams query-grouped alignment records into a `ContactGraph`.
/// Records sharing a query name must be contiguous; a group ends whenever the query name changes.
/// Every used record adds one coverage to its contig, and every pair of used records in a group that land on different contigs adds one to that contig pair's edge.
pub struct ContactMapBuilder {
    /// Filtering criteria
    config: ContactMapConfig,
    /// The graph being built
    contact_graph: ContactGraph,
    /// Contig name -> node id
    id_map: IdRegistry<String>,
    /// Query name of the group currently being collected
    current_query: Option<String>,
    /// Records in the current group that passed filtering
    group: Vec<AlignmentRecord>,
    /// Running counters
    stats: ContactMapStats
}

impl ContactMapBuilder {
    pub fn new(config: ContactMapConfig) -> ContactMapBuilder {
        ContactMapBuilder {
            config,
            contact_graph: ContactGraph::new(),
            id_map: IdRegistry::new(true),
            current_query: None,
            group: vec![],
            stats: Default::default()
        }
    }

    /// Adds the next record from the stream.
    /// Filtered records still count toward group boundaries, they just do not contribute.
    /// # Arguments
    /// * `record` - the next alignment, in query-grouped order
    /// # Errors
    /// * if the completed group fails to update the graph
    pub fn add_record(&mut self, record: AlignmentRecord) -> Result<(), GraphError> {
        self.stats.num_records += 1;

        let new_group = match self.current_query.as_deref() {
            Some(query_name) => query_name != record.query_name(),
            None => true
        };
        if new_group {
            self.flush_group()?;
            self.current_query = Some(record.query_name().to_string());
            self.stats.num_groups += 1;
        }

        // no information about the reference contig, this alignment is unusable
        if !record.is_mapped() {
            self.stats.skipped_unmapped += 1;
            return Ok(());
        }

        if !self.config.required_prefix.is_empty() && !record.ref_name().starts_with(&self.config.required_prefix) {
            trace!("Skipping {} on {}: missing prefix", record.query_name(), record.ref_name());
            self.stats.skipped_prefix += 1;
            return Ok(());
        }

        if record.mapq() < self.config.min_mapq {
            self.stats.skipped_mapq += 1;
            return Ok(());
        }

        if !record.is_primary() {
            self.stats.skipped_not_primary += 1;
            return Ok(());
        }

        self.group.push(record);
        Ok(())
    }

    /// Converts the current group into coverage and contacts, then clears it.
    fn flush_group(&mut self) -> Result<(), GraphError> {
        if self.group.is_empty() {
            return Ok(());
        }
        let num_contacts = update_contact_map(&self.group, &mut self.contact_graph, &mut self.id_map)?;
        self.stats.used_records += self.group.len() as u64;
        self.stats.num_contacts += num_contacts;
        self.group.clear();
        Ok(())
    }

    pub fn stats(&self) -> &ContactMapStats {
        &self.stats
    }

    /// Flushes the final group and hands back the finished graph and contig name registry.
    /// # Errors
    /// * if the final group fails to update the graph
    pub fn finish(mut self) -> Result<(ContactGraph, IdRegistry<String>, ContactMapStats), GraphError> {
        self.flush_group()?;
        debug!("Contact map stats: {:?}", self.stats);
        Ok((self.contact_graph, self.id_map, self.stats))
    }
}

/// Adds one group of alignments (all from the same query) to the contact graph.
/// Returns the number of contacts that were added to edge weights.
/// # Arguments
/// * `alignments` - the filtered alignments of one query
/// * `contact_graph` - the graph to update
/// * `id_map` - the contig name registry, new contigs are added as they are seen
/// # Errors
/// * only if the graph fails to find a node or edge that was just inserted
pub fn update_contact_map(
    alignments: &[AlignmentRecord], contact_graph: &mut ContactGraph, id_map: &mut IdRegistry<String>
) -> Result<u64, GraphError> {
    // resolve ids once, all records get a node even if they have no partner
    let ref_ids: Vec<i32> = alignments.iter()
        .map(|a| {
            let ref_id = id_map.try_insert(a.ref_name().to_string());
            contact_graph.try_insert_node(ref_id, Partition::Unphased);
            ref_id
        })
        .collect();

    // one triangle of the all-by-all matrix
    let mut num_contacts: u64 = 0;
    for (i, &ref_id_a) in ref_ids.iter().enumerate() {
        contact_graph.increment_coverage(ref_id_a, 1)?;

        for &ref_id_b in ref_ids[(i + 1)..].iter() {
            if ref_id_a == ref_id_b {
                // two alignments on the same contig are not a contact
                continue;
            }
            contact_graph.try_insert_edge(ref_id_a, ref_id_b)?;
            contact_graph.increment_edge_weight(ref_id_a, ref_id_b, 1)?;
            num_contacts += 1;
        }
    }
    Ok(num_contacts)
}

/// Reads alignments from a query-grouped (e.g. name-sorted or unsorted aligner output) BAM/SAM file and builds a contact map from them.
/// Returns the graph, the contig name registry, and counters from the build.
/// # Arguments
/// * `bam_path` - the alignment file, does not need to be indexed
/// * `required_prefix` - if non-empty, only contigs with names starting with this are used
/// * `min_mapq` - minimum MAPQ for an alignment to be used
/// # Errors
/// * if the file cannot be opened or a record fails to parse
/// * if a read name is not valid utf8
pub fn parse_unpaired_bam_file_with_stats(
    bam_path: &Path, required_prefix: &str, min_mapq: u8
) -> Result<(ContactGraph, IdRegistry<String>, ContactMapStats), Box<dyn std::error::Error>> {
    let alignment_reader = AlignmentReader::from_path(bam_path, false)?;
    let mut builder = ContactMapBuilder::new(ContactMapConfig {
        required_prefix: required_prefix.to_string(),
        min_mapq
    });
    for record_result in alignment_reader {
        builder.add_record(record_result?)?;
    }

    Ok(builder.finish()?)
}

/// Same as `parse_unpaired_bam_file_with_stats`, without the counters.
pub fn parse_unpaired_bam_file(
    bam_path: &Path, required_prefix: &str, min_mapq: u8
) -> Result<(ContactGraph, IdRegistry<String>), Box<dyn std::error::Error>> {
    let (contact_graph, id_map, _stats) = parse_unpaired_bam_file_with_stats(bam_path, required_prefix, min_mapq)?;
    Ok((contact_graph, id_map))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn record(ref_name: &str, query_name: &str, mapq: u8, flag: u16) -> AlignmentRecord {
        AlignmentRecord::new(ref_name.to_string(), query_name.to_string(), mapq, flag)
    }

    fn build(records: Vec<AlignmentRecord>, config: ContactMapConfig) -> (ContactGraph, IdRegistry<String>, ContactMapStats) {
        let mut builder = ContactMapBuilder::new(config);
        for r in records.into_iter() {
            builder.add_record(r).unwrap();
        }
        builder.finish().unwrap()
    }

    fn weight(graph: &ContactGraph, id_map: &IdRegistry<String>, a: &str, b: &str) -> Option<i32> {
        let id_a = id_map.get_id(&a.to_string()).unwrap();
        let id_b = id_map.get_id(&b.to_string()).unwrap();
        graph.edge_weight(id_a, id_b)
    }

    #[test]
    fn test_pairs_and_coverage() {
        let records = vec![
            record("ctg1", "r1", 60, 0x41),
            record("ctg2", "r1", 60, 0x81),
            record("ctg1", "r2", 60, 0x41),
            record("ctg2", "r2", 60, 0x81),
            record("ctg2", "r3", 60, 0x41),
            record("ctg3", "r3", 60, 0x81),
            // last group must not be dropped
            record("ctg3", "r4", 60, 0x41),
            record("ctg1", "r4", 60, 0x81)
        ];
        let (graph, id_map, stats) = build(records, Default::default());

        // ids are dense and in first-seen order
        assert_eq!(id_map.get_id(&"ctg1".to_string()).unwrap(), 0);
        assert_eq!(id_map.get_id(&"ctg2".to_string()).unwrap(), 1);
        assert_eq!(id_map.get_id(&"ctg3".to_string()).unwrap(), 2);

        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 3);
        assert_eq!(weight(&graph, &id_map, "ctg1", "ctg2"), Some(2));
        assert_eq!(weight(&graph, &id_map, "ctg2", "ctg3"), Some(1));
        assert_eq!(weight(&graph, &id_map, "ctg3", "ctg1"), Some(1));

        assert_eq!(graph.get_node(0).unwrap().coverage(), 3);
        assert_eq!(graph.get_node(1).unwrap().coverage(), 3);
        assert_eq!(graph.get_node(2).unwrap().coverage(), 2);
        assert_eq!(graph.get_partition(0).unwrap(), Partition::Unphased);

        assert_eq!(stats.num_records, 8);
        assert_eq!(stats.num_groups, 4);
        assert_eq!(stats.used_records, 8);
        assert_eq!(stats.num_contacts, 4);
    }

    #[test]
    fn test_filters() {
        let records = vec![
            // unmapped mate
            record("PRctg1", "r1", 60, 0x41),
            record("", "r1", 0, 0x85),
            // low mapq mate
            record("PRctg1", "r2", 60, 0x41),
            record("PRctg2", "r2", 3, 0x81),
            // secondary mate
            record("PRctg1", "r3", 60, 0x41),
            record("PRctg2", "r3", 60, 0x181),
            // wrong prefix
            record("PRctg1", "r4", 60, 0x41),
            record("ctg9", "r4", 60, 0x81),
            // supplementary is kept
            record("PRctg1", "r5", 60, 0x41),
            record("PRctg2", "r5", 60, 0x881)
        ];
        let config = ContactMapConfig { required_prefix: "PR".to_string(), min_mapq: 5 };
        let (graph, id_map, stats) = build(records, config);

        assert!(!id_map.contains_key(&"ctg9".to_string()));
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(weight(&graph, &id_map, "PRctg1", "PRctg2"), Some(1));
        assert_eq!(graph.get_node(0).unwrap().coverage(), 5);
        assert_eq!(graph.get_node(1).unwrap().coverage(), 1);

        assert_eq!(stats.skipped_unmapped, 1);
        assert_eq!(stats.skipped_mapq, 1);
        assert_eq!(stats.skipped_not_primary, 1);
        assert_eq!(stats.skipped_prefix, 1);
        assert_eq!(stats.used_records, 6);
    }

    #[test]
    fn test_group_edge_cases() {
        let records = vec![
            // single records and same-contig pairs add no edges
            record("ctg1", "r1", 60, 0),
            record("ctg2", "r2", 60, 0x41),
            record("ctg2", "r2", 60, 0x81),
            // three alignments: one pair on the same contig, two contacts
            record("ctg1", "r3", 60, 0x41),
            record("ctg3", "r3", 60, 0x81),
            record("ctg3", "r3", 60, 0x801)
        ];
        let (graph, id_map, stats) = build(records, Default::default());
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(weight(&graph, &id_map, "ctg1", "ctg3"), Some(2));
        assert_eq!(graph.get_node(1).unwrap().coverage(), 2);
        assert_eq!(stats.num_contacts, 2);
    }

    #[test]
    fn test_empty_stream() {
        let (graph, id_map, stats) = build(vec![], Default::default());
        assert!(graph.is_empty());
        assert!(id_map.is_empty());
        assert_eq!(stats, ContactMapStats::default());
    }

    #[test]
    fn test_parse_sam_file() {
        let sam_path: PathBuf = "./test_data/contacts.sam".into();
        let (graph, id_map, stats) = parse_unpaired_bam_file_with_stats(&sam_path, "", 1).unwrap();

        assert_eq!(stats.num_records, 10);
        assert_eq!(stats.num_groups, 5);
        assert_eq!(stats.skipped_unmapped, 1);
        assert_eq!(stats.skipped_mapq, 1);
        assert_eq!(stats.skipped_not_primary, 1);

        assert_eq!(graph.node_count(), 3);
        assert_eq!(weight(&graph, &id_map, "ctg_a", "ctg_b"), Some(2));
        assert_eq!(weight(&graph, &id_map, "ctg_b", "ctg_c"), None);
        assert_eq!(weight(&graph, &id_map, "ctg_a", "ctg_c"), None);

        // prefix filtering through the same entry point
        let (graph, id_map) = parse_unpaired_bam_file(&sam_path, "ctg_a", 1).unwrap();
        assert_eq!(graph.node_count(), 1);
        assert_eq!(graph.edge_count(), 0);
        assert!(id_map.contains_key(&"ctg_a".to_string()));
    }

    #[test]
    fn test_parse_unmapped_only() {
        let sam_path: PathBuf = "./test_data/unmapped.sam".into();
        let (graph, id_map, stats) = parse_unpaired_bam_file_with_stats(&sam_path, "", 0).unwrap();
        assert!(graph.is_empty());
        assert!(id_map.is_empty());
        assert_eq!(stats.num_records, 2);
        assert_eq!(stats.num_groups, 1);
        assert_eq!(stats.skipped_unmapped, 2);
        assert_eq!(stats.used_records, 0);
    }

    #[test]
    fn test_missing_file() {
        let missing: PathBuf = "./test_data/does_not_exist.bam".into();
        assert!(parse_unpaired_bam_file(&missing, "", 0).is_err());
    }
}
