
use rust_htslib::bam::record::CigarString;

/// Flag bit marking the first mate of a pair
const FLAG_FIRST_MATE: u16 = 1 << 6;
/// Flag bit marking the second mate of a pair
const FLAG_SECOND_MATE: u16 = 1 << 7;
/// Flag bit marking a secondary (not primary) alignment
const FLAG_NOT_PRIMARY: u16 = 1 << 8;
/// Flag bit marking a supplementary alignment
const FLAG_SUPPLEMENTARY: u16 = 1 << 11;

pub fn is_first_mate(flag: u16) -> bool {
    flag & FLAG_FIRST_MATE != 0
}

pub fn is_second_mate(flag: u16) -> bool {
    flag & FLAG_SECOND_MATE != 0
}

pub fn is_not_primary(flag: u16) -> bool {
    flag & FLAG_NOT_PRIMARY != 0
}

pub fn is_primary(flag: u16) -> bool {
    !is_not_primary(flag)
}

pub fn is_supplementary(flag: u16) -> bool {
    flag & FLAG_SUPPLEMENTARY != 0
}

/// The parts of an alignment record that contact mapping cares about
#[derive(Clone, Debug, PartialEq)]
pub struct AlignmentRecord {
    /// Name of the contig this read is aligned to, empty for unmapped reads
    ref_name: String,
    /// Read name, shared by every alignment of the same read or read pair
    query_name: String,
    /// Mapping quality
    mapq: u8,
    /// SAM flag bits
    flag: u16,
    /// Only populated when requested from the reader
    cigar: Option<CigarString>
}

impl AlignmentRecord {
    /// Creates a new record without CIGAR information.
    /// # Arguments
    /// * `ref_name` - the reference (contig) name, empty if unmapped
    /// * `query_name` - the read name
    /// * `mapq` - mapping quality
    /// * `flag` - the SAM flag
    pub fn new(ref_name: String, query_name: String, mapq: u8, flag: u16) -> AlignmentRecord {
        AlignmentRecord {
            ref_name,
            query_name,
            mapq,
            flag,
            cigar: None
        }
    }

    /// Attaches CIGAR operations to the record
    pub fn with_cigar(mut self, cigar: CigarString) -> AlignmentRecord {
        self.cigar = Some(cigar);
        self
    }

    pub fn ref_name(&self) -> &str {
        &self.ref_name
    }

    pub fn query_name(&self) -> &str {
        &self.query_name
    }

    pub fn mapq(&self) -> u8 {
        self.mapq
    }

    pub fn flag(&self) -> u16 {
        self.flag
    }

    pub fn cigar(&self) -> Option<&CigarString> {
        self.cigar.as_ref()
    }

    pub fn is_mapped(&self) -> bool {
        !self.ref_name.is_empty()
    }

    pub fn is_first_mate(&self) -> bool {
        is_first_mate(self.flag)
    }

    pub fn is_second_mate(&self) -> bool {
        is_second_mate(self.flag)
    }

    pub fn is_primary(&self) -> bool {
        is_primary(self.flag)
    }

    pub fn is_supplementary(&self) -> bool {
        is_supplementary(self.flag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_htslib::bam::record::Cigar;

    #[test]
    fn test_flag_bits() {
        // 0x41 = paired + first mate
        assert!(is_first_mate(0x41));
        assert!(!is_second_mate(0x41));
        assert!(is_primary(0x41));

        // 0x181 = paired + second mate + secondary
        assert!(is_second_mate(0x181));
        assert!(is_not_primary(0x181));
        assert!(!is_primary(0x181));

        // 0x800 supplementary is still primary by this definition
        assert!(is_supplementary(0x800));
        assert!(is_primary(0x800));
        assert!(!is_supplementary(0x100));
    }

    #[test]
    fn test_record() {
        let record = AlignmentRecord::new("ctg1".to_string(), "read_1".to_string(), 60, 0x41)
            .with_cigar(CigarString(vec![Cigar::Match(100), Cigar::SoftClip(20)]));
        assert!(record.is_mapped());
        assert!(record.is_first_mate());
        assert!(record.is_primary());
        assert!(!record.is_supplementary());
        assert_eq!(record.mapq(), 60);
        assert_eq!(record.cigar().unwrap().len(), 2);

        let unmapped = AlignmentRecord::new(String::new(), "read_2".to_string(), 0, 0x4);
        assert!(!unmapped.is_mapped());
        assert!(unmapped.cigar().is_none());
    }
}
