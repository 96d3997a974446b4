use std::fmt::{self, Display};
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::errors::CageError;

/// Genomic strand of a CTSS position.
///
/// Ordering is `+` before `-`, which fixes the iteration order of every
/// (chromosome, strand) partition map in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Strand {
    Plus,
    Minus,
}

impl Strand {
    pub fn symbol(&self) -> char {
        match self {
            Strand::Plus => '+',
            Strand::Minus => '-',
        }
    }
}

impl FromStr for Strand {
    type Err = CageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "+" => Ok(Strand::Plus),
            "-" => Ok(Strand::Minus),
            _ => Err(CageError::Configuration(format!("invalid strand: {}", s))),
        }
    }
}

impl Display for Strand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// A single CAGE transcription start site: one genomic base position with
/// observed 5′-end signal in one sample.
///
/// Keyed uniquely by (chr, strand, pos) within a sample. Produced by an
/// upstream normalization step (which supplies `tpm`) and immutable
/// afterwards; filtering produces new records rather than editing these.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Ctss {
    pub chr: String,
    pub strand: Strand,
    pub pos: u32,
    /// Raw tag count at this position.
    pub count: u32,
    /// Signal normalized to a common library-size basis (tags per million).
    pub tpm: f64,
    /// Whether the position passed the cross-sample signal filter.
    pub included: bool,
}

impl Ctss {
    pub fn as_string(&self) -> String {
        format!(
            "{}\t{}\t{}\t{}\t{}",
            self.chr, self.pos, self.strand, self.count, self.tpm
        )
    }
}

impl Display for Ctss {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    #[test]
    fn test_strand_round_trip() {
        assert_eq!("+".parse::<Strand>().unwrap(), Strand::Plus);
        assert_eq!("-".parse::<Strand>().unwrap(), Strand::Minus);
        assert_eq!(Strand::Plus.to_string(), "+");
        assert!(".".parse::<Strand>().is_err());
    }

    #[test]
    fn test_strand_order_plus_first() {
        assert!(Strand::Plus < Strand::Minus);
    }

    #[test]
    fn test_ctss_as_string() {
        let ctss = Ctss {
            chr: "chr1".to_string(),
            strand: Strand::Minus,
            pos: 100,
            count: 4,
            tpm: 2.5,
            included: true,
        };
        assert_eq!(ctss.to_string(), "chr1\t100\t-\t4\t2.5");
    }
}
