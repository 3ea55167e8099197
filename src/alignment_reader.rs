
use crate::data_types::alignment::AlignmentRecord;

use log::{debug, warn};
use rust_htslib::bam;
use rust_htslib::bam::Read;
use std::path::Path;

/// Sequential reader over a BAM/SAM/CRAM file that yields `AlignmentRecord`s in file order.
/// No index is required, records come out exactly as stored, so a name-grouped file yields name-grouped records.
pub struct AlignmentReader {
    /// The underlying htslib reader
    bam_reader: bam::Reader,
    /// Header target names, indexed by tid
    target_names: Vec<String>,
    /// Reused record buffer
    record: bam::Record,
    /// If true, CIGAR operations are copied into each record
    parse_cigar: bool
}

impl AlignmentReader {
    /// Opens an alignment file.
    /// # Arguments
    /// * `bam_path` - the alignment file
    /// * `parse_cigar` - if true, each record also carries its CIGAR
    /// A header without reference sequences is allowed, every record is then unmapped.
    /// # Errors
    /// * if the file cannot be opened or its header cannot be parsed
    pub fn from_path(bam_path: &Path, parse_cigar: bool) -> Result<AlignmentReader, Box<dyn std::error::Error>> {
        let bam_reader = bam::Reader::from_path(bam_path)?;
        let mut target_names: Vec<String> = vec![];
        for name in bam_reader.header().target_names().iter() {
            target_names.push(std::str::from_utf8(name)?.to_string());
        }
        if target_names.is_empty() {
            warn!("Alignment file has no reference sequences in the header, all reads are unmapped: {}", bam_path.display());
        }
        debug!("Loaded {} reference names from {:?}", target_names.len(), bam_path);

        Ok(AlignmentReader {
            bam_reader,
            target_names,
            record: bam::Record::new(),
            parse_cigar
        })
    }

    pub fn target_names(&self) -> &[String] {
        &self.target_names
    }

    /// Converts the buffered htslib record into our record type
    fn convert_record(&self) -> Result<AlignmentRecord, Box<dyn std::error::Error>> {
        let record: &bam::Record = &self.record;
        let query_name: String = std::str::from_utf8(record.qname())?.to_string();

        // ref name is empty if the read is unmapped, in which case the tid is out of range
        let tid: i32 = record.tid();
        let ref_name: String = if tid >= 0 && (tid as usize) < self.target_names.len() {
            self.target_names[tid as usize].clone()
        } else {
            String::new()
        };

        let alignment = AlignmentRecord::new(ref_name, query_name, record.mapq(), record.flags());
        if self.parse_cigar {
            Ok(alignment.with_cigar(record.cigar().take()))
        } else {
            Ok(alignment)
        }
    }
}

impl Iterator for AlignmentReader {
    type Item = Result<AlignmentRecord, Box<dyn std::error::Error>>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.bam_reader.read(&mut self.record) {
            Some(Ok(())) => Some(self.convert_record()),
            Some(Err(e)) => Some(Err(e.into())),
            None => None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_htslib::bam::record::Cigar;
    use std::path::PathBuf;

    #[test]
    fn test_read_sam() {
        let sam_path: PathBuf = "./test_data/contacts.sam".into();
        let reader = AlignmentReader::from_path(&sam_path, true).unwrap();
        assert_eq!(reader.target_names(), &["ctg_a".to_string(), "ctg_b".to_string(), "ctg_c".to_string()]);

        let records: Vec<AlignmentRecord> = reader.map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), 10);

        let first = &records[0];
        assert_eq!(first.query_name(), "r1");
        assert_eq!(first.ref_name(), "ctg_a");
        assert_eq!(first.mapq(), 60);
        assert!(first.is_first_mate());
        assert_eq!(first.cigar().unwrap().0, vec![Cigar::Match(4)]);

        // unmapped mate has no reference name
        let unmapped = &records[5];
        assert_eq!(unmapped.query_name(), "r3");
        assert!(!unmapped.is_mapped());

        let secondary = &records[9];
        assert!(!secondary.is_primary());
    }

    #[test]
    fn test_without_cigar() {
        let sam_path: PathBuf = "./test_data/contacts.sam".into();
        let mut reader = AlignmentReader::from_path(&sam_path, false).unwrap();
        let first = reader.next().unwrap().unwrap();
        assert!(first.cigar().is_none());
    }

    #[test]
    fn test_no_references() {
        let sam_path: PathBuf = "./test_data/unmapped.sam".into();
        let reader = AlignmentReader::from_path(&sam_path, false).unwrap();
        assert!(reader.target_names().is_empty());

        let records: Vec<AlignmentRecord> = reader.map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| !r.is_mapped()));
        assert_eq!(records[1].query_name(), "r1");
    }

    #[test]
    fn test_missing_file() {
        let missing: PathBuf = "./test_data/does_not_exist.bam".into();
        assert!(AlignmentReader::from_path(&missing, false).is_err());
    }
}
