use crate::{
    error::Error,
    pred::{generate_minterms, Pred},
};

/// Index of a minterm within a [`Minterms`] partition.
pub type MintermId = u16;

/// The minterm partition of a compiled regex, with a character→minterm
/// classifier.
///
/// The minterms are the non-empty atoms of the Boolean algebra generated by
/// the predicates occurring in the regex. Every code point belongs to
/// exactly one minterm, so all run-time derivatives can be taken with
/// respect to a minterm's witness code point instead of an arbitrary
/// predicate.
///
/// Classification of BMP code points is a dense table lookup; code points
/// above the BMP fall back to binary search over the remaining ranges.
#[derive(Clone, Debug)]
pub struct Minterms {
    atoms: Vec<Pred>,
    witnesses: Vec<u32>,
    bmp: Box<[MintermId]>,
    astral: Vec<(u32, u32, MintermId)>,
    newline: MintermId,
}

const BMP_LEN: usize = 0x10000;

impl Minterms {
    pub fn new(preds: &[Pred]) -> Result<Minterms, Error> {
        let atoms = generate_minterms(preds);
        if atoms.len() > MintermId::MAX as usize {
            return Err(Error::invalid(format!(
                "too many character classes: {} minterms",
                atoms.len()
            )));
        }

        let witnesses = atoms
            .iter()
            .map(|a| {
                a.min_code().ok_or(Error::Internal { detail: "empty minterm" })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut bmp = vec![0; BMP_LEN].into_boxed_slice();
        let mut astral = Vec::new();
        for (id, atom) in atoms.iter().enumerate() {
            let id = id as MintermId;
            for (lo, hi) in atom.iter() {
                if lo < BMP_LEN as u32 {
                    let end = hi.min(BMP_LEN as u32 - 1);
                    for slot in &mut bmp[lo as usize..=end as usize] {
                        *slot = id;
                    }
                }
                if hi >= BMP_LEN as u32 {
                    astral.push((lo.max(BMP_LEN as u32), hi, id));
                }
            }
        }
        astral.sort_unstable();

        let newline = bmp['\n' as usize];
        Ok(Minterms { atoms, witnesses, bmp, astral, newline })
    }

    /// The number of minterms. Always at least one: with no predicates the
    /// partition is `[⊤]`.
    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// Maps a character to the minterm containing it.
    pub fn classify(&self, c: char) -> MintermId {
        let c = c as u32;
        if c < BMP_LEN as u32 {
            return self.bmp[c as usize];
        }
        let i = self
            .astral
            .partition_point(|&(lo, _, _)| lo <= c)
            .checked_sub(1)
            .unwrap_or(0);
        debug_assert!(self.astral[i].0 <= c && c <= self.astral[i].1);
        self.astral[i].2
    }

    /// A code point belonging to the minterm. Because a minterm is fully
    /// inside or fully outside every predicate of the regex, predicate tests
    /// against the whole minterm reduce to membership of its witness.
    pub(crate) fn witness(&self, id: MintermId) -> u32 {
        self.witnesses[id as usize]
    }

    pub fn pred(&self, id: MintermId) -> &Pred {
        &self.atoms[id as usize]
    }

    /// The minterm containing `\n`, against which line borders fire.
    pub(crate) fn newline(&self) -> MintermId {
        self.newline
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_bmp() {
        let mt = Minterms::new(&[
            Pred::range('a' as u32, 'z' as u32),
            Pred::char('\n'),
        ])
        .unwrap();
        assert_eq!(mt.len(), 3);
        assert_eq!(mt.classify('a'), mt.classify('z'));
        assert_ne!(mt.classify('a'), mt.classify('A'));
        assert_eq!(mt.classify('\n'), mt.newline());
        assert_ne!(mt.classify('x'), mt.newline());
    }

    #[test]
    fn classify_astral() {
        let mt = Minterms::new(&[Pred::range(0x1F600, 0x1F64F)]).unwrap();
        let emoji = mt.classify('\u{1F600}');
        assert_eq!(emoji, mt.classify('\u{1F64F}'));
        assert_ne!(emoji, mt.classify('\u{1F650}'));
        assert_ne!(emoji, mt.classify('a'));
    }

    #[test]
    fn witness_in_own_minterm() {
        let mt = Minterms::new(&[
            Pred::range('0' as u32, '9' as u32),
            Pred::range('5' as u32, 'k' as u32),
        ])
        .unwrap();
        for id in 0..mt.len() as MintermId {
            assert!(mt.pred(id).contains_code(mt.witness(id)));
        }
    }

    #[test]
    fn no_predicates() {
        let mt = Minterms::new(&[]).unwrap();
        assert_eq!(mt.len(), 1);
        assert_eq!(mt.classify('x'), 0);
        assert_eq!(mt.classify('\u{10FFFF}'), 0);
    }
}
