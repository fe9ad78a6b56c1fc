use crate::libs::error::{DadaError, Result};

/// Nucleotide codes used throughout the engine.
///
/// The four real bases index directly into 4x4 score and error matrices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Nt {
    A = 0,
    C = 1,
    G = 2,
    T = 3,
    N = 4,
    Gap = 5,
}

pub const NT_BASES: [u8; 4] = [b'A', b'C', b'G', b'T'];

/// Encodes one character, or `None` if it is outside A/C/G/T/N/-.
///
/// ```
/// use dada::libs::nt::{encode, Nt};
/// assert_eq!(encode(b'a'), Some(Nt::A as u8));
/// assert_eq!(encode(b'-'), Some(Nt::Gap as u8));
/// assert_eq!(encode(b'X'), None);
/// ```
pub fn encode(b: u8) -> Option<u8> {
    match b {
        b'A' | b'a' => Some(Nt::A as u8),
        b'C' | b'c' => Some(Nt::C as u8),
        b'G' | b'g' => Some(Nt::G as u8),
        b'T' | b't' => Some(Nt::T as u8),
        b'N' | b'n' => Some(Nt::N as u8),
        b'-' => Some(Nt::Gap as u8),
        _ => None,
    }
}

pub fn decode(code: u8) -> u8 {
    match code {
        0..=3 => NT_BASES[code as usize],
        4 => b'N',
        _ => b'-',
    }
}

/// A, C, G or T
#[inline]
pub fn is_base(code: u8) -> bool {
    code < 4
}

/// Encodes a whole sequence; `index` only labels the error.
pub fn encode_seq(seq: &str, index: usize) -> Result<Vec<u8>> {
    if seq.is_empty() {
        return Err(DadaError::EmptySequence { index });
    }

    seq.bytes()
        .enumerate()
        .map(|(pos, b)| {
            encode(b).ok_or(DadaError::InvalidBase {
                index,
                pos,
                base: b as char,
            })
        })
        .collect()
}

pub fn decode_seq(codes: &[u8]) -> String {
    codes.iter().map(|&c| decode(c) as char).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_roundtrip() {
        let codes = encode_seq("ACGTN-acgt", 0).unwrap();
        assert_eq!(codes, vec![0, 1, 2, 3, 4, 5, 0, 1, 2, 3]);
        assert_eq!(decode_seq(&codes), "ACGTN-ACGT");
    }

    #[test]
    fn test_encode_rejects() {
        match encode_seq("ACGU", 7) {
            Err(DadaError::InvalidBase { index, pos, base }) => {
                assert_eq!(index, 7);
                assert_eq!(pos, 3);
                assert_eq!(base, 'U');
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(
            encode_seq("", 2),
            Err(DadaError::EmptySequence { index: 2 })
        ));
    }
}
