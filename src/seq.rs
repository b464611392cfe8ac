//! DNA sequence helpers shared by the loaders and the aligner.

/// Complement of a single uppercase nucleotide. Ambiguous bases map to `N`.
#[inline(always)]
pub const fn complement(base: u8) -> u8 {
    match base {
        b'A' => b'T',
        b'C' => b'G',
        b'G' => b'C',
        b'T' => b'A',
        _ => b'N',
    }
}

/// Reverse complement of an uppercase DNA string.
pub fn reverse_complement(seq: &str) -> String {
    seq.bytes().rev().map(|b| complement(b) as char).collect()
}

/// Uppercase a sequence in place (ASCII only).
pub fn make_upper_case(seq: &mut String) {
    if seq.bytes().any(|b| b.is_ascii_lowercase()) {
        *seq = seq.to_ascii_uppercase();
    }
}

/// True when every character is one of `A`, `C`, `G`, `T`, `N`.
pub fn is_dna(seq: &str) -> bool {
    seq.bytes().all(|b| matches!(b, b'A' | b'C' | b'G' | b'T' | b'N'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn revcomp_round_trip() {
        let s = "ACGTNACGT";
        assert_eq!(reverse_complement(&reverse_complement(s)), s);
    }

    #[test]
    fn revcomp_pairs() {
        assert_eq!(reverse_complement("ACGT"), "ACGT");
        assert_eq!(reverse_complement("AAGG"), "CCTT");
        assert_eq!(reverse_complement("N"), "N");
    }
}
