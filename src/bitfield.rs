//! Packing of named sub-fields into a 16-bit word.
//!
//! A [`BitField16`] describes the widths of its fields from the most
//! significant bit down. The DNS flags word is the only user, but the
//! layout is kept generic so the bit arithmetic lives in one place.

/// Ordered field widths of a 16-bit word, MSB first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitField16<const N: usize> {
    widths: [u32; N],
}

impl<const N: usize> BitField16<N> {
    /// Panics (at compile time when used in a const) if the widths do not add up to 16.
    pub const fn new(widths: [u32; N]) -> Self {
        let mut total = 0;
        let mut i = 0;
        while i < N {
            assert!(widths[i] > 0, "field width must be non-zero");
            total += widths[i];
            i += 1;
        }
        assert!(total == 16, "field widths must total 16 bits");

        Self { widths }
    }

    /// Packs `values` into a word. Values wider than their field are truncated.
    pub fn pack(&self, values: [u16; N]) -> u16 {
        let mut word: u32 = 0;
        let mut shift: u32 = 16;

        for (value, width) in values.iter().zip(self.widths.iter()) {
            shift -= width;
            word |= (u32::from(*value) & mask(*width)) << shift;
        }

        word as u16
    }

    pub fn unpack(&self, word: u16) -> [u16; N] {
        let word = u32::from(word);
        let mut values = [0u16; N];
        let mut shift: u32 = 16;

        for (value, width) in values.iter_mut().zip(self.widths.iter()) {
            shift -= width;
            *value = ((word >> shift) & mask(*width)) as u16;
        }

        values
    }
}

fn mask(width: u32) -> u32 {
    (1 << width) - 1
}
