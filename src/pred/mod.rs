/*!
Predicates over the code point alphabet.

A [`Pred`] denotes a computable set of Unicode code points and is the label
type of every character transition in the engine. Internally it is a
canonical sequence of inclusive ranges: sorted ascending, pairwise disjoint
and non-adjacent. Canonicality makes equality structural, which in turn
makes predicates usable as intern-table keys.
*/

use std::{fmt, sync::Arc};

mod minterm;

pub use minterm::{Minterms, MintermId};

/// The largest code point in the alphabet.
pub const MAX_CODE: u32 = 0x10FFFF;

/// A set of code points, kept as canonical ordered disjoint merged ranges.
///
/// Cloning is cheap: the range sequence is reference counted.
///
/// # Example
///
/// ```
/// use symre::pred::Pred;
///
/// let lower = Pred::range('a' as u32, 'z' as u32);
/// let vowels = Pred::ranges([('a' as u32, 'a' as u32), ('e' as u32, 'e' as u32)]);
/// assert!(lower.and(&vowels).equivalent(&vowels));
/// assert!(lower.not().contains('A'));
/// assert!(!lower.not().contains('q'));
/// ```
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Pred {
    ranges: Arc<[(u32, u32)]>,
}

impl Pred {
    /// The empty set ⊥.
    pub fn none() -> Pred {
        Pred { ranges: Arc::from([]) }
    }

    /// The full alphabet ⊤.
    pub fn any() -> Pred {
        Pred { ranges: Arc::from([(0, MAX_CODE)]) }
    }

    /// The set containing exactly `c`.
    pub fn char(c: char) -> Pred {
        let c = c as u32;
        Pred { ranges: Arc::from([(c, c)]) }
    }

    /// The inclusive range `lo..=hi`, clamped to the alphabet. An inverted
    /// range denotes the empty set.
    pub fn range(lo: u32, hi: u32) -> Pred {
        let hi = hi.min(MAX_CODE);
        if lo > hi {
            return Pred::none();
        }
        Pred { ranges: Arc::from([(lo, hi)]) }
    }

    /// Builds a predicate from arbitrary inclusive ranges, canonicalizing
    /// them (sort, clamp, drop inverted, merge overlapping and adjacent).
    pub fn ranges<I>(ranges: I) -> Pred
    where
        I: IntoIterator<Item = (u32, u32)>,
    {
        let mut rs: Vec<(u32, u32)> = ranges
            .into_iter()
            .filter_map(|(lo, hi)| {
                let hi = hi.min(MAX_CODE);
                (lo <= hi).then_some((lo, hi))
            })
            .collect();
        rs.sort_unstable();
        Pred { ranges: coalesce(rs).into() }
    }

    /// Whether the set is non-empty.
    pub fn is_satisfiable(&self) -> bool {
        !self.ranges.is_empty()
    }

    /// Whether the set is the full alphabet.
    pub fn is_full(&self) -> bool {
        *self.ranges == [(0, MAX_CODE)]
    }

    pub fn contains(&self, c: char) -> bool {
        self.contains_code(c as u32)
    }

    pub(crate) fn contains_code(&self, c: u32) -> bool {
        self.ranges
            .binary_search_by(|&(lo, hi)| {
                if c < lo {
                    std::cmp::Ordering::Greater
                } else if c > hi {
                    std::cmp::Ordering::Less
                } else {
                    std::cmp::Ordering::Equal
                }
            })
            .is_ok()
    }

    /// Set intersection.
    pub fn and(&self, other: &Pred) -> Pred {
        let (mut i, mut j) = (0, 0);
        let (a, b) = (&self.ranges, &other.ranges);
        let mut out = Vec::new();
        while i < a.len() && j < b.len() {
            let lo = a[i].0.max(b[j].0);
            let hi = a[i].1.min(b[j].1);
            if lo <= hi {
                out.push((lo, hi));
            }
            // Advance whichever range ends first.
            if a[i].1 < b[j].1 {
                i += 1;
            } else {
                j += 1;
            }
        }
        Pred { ranges: out.into() }
    }

    /// Set union.
    pub fn or(&self, other: &Pred) -> Pred {
        if !self.is_satisfiable() {
            return other.clone();
        }
        if !other.is_satisfiable() {
            return self.clone();
        }
        let mut rs: Vec<(u32, u32)> =
            self.ranges.iter().chain(other.ranges.iter()).copied().collect();
        rs.sort_unstable();
        Pred { ranges: coalesce(rs).into() }
    }

    /// Set complement with respect to the full alphabet.
    pub fn not(&self) -> Pred {
        let mut out = Vec::with_capacity(self.ranges.len() + 1);
        let mut next = 0u32;
        for &(lo, hi) in self.ranges.iter() {
            if lo > next {
                out.push((next, lo - 1));
            }
            if hi >= MAX_CODE {
                return Pred { ranges: out.into() };
            }
            next = hi + 1;
        }
        out.push((next, MAX_CODE));
        Pred { ranges: out.into() }
    }

    /// Set difference `self ∖ other`.
    pub fn diff(&self, other: &Pred) -> Pred {
        self.and(&other.not())
    }

    /// Structural equivalence. Because both sides are canonical, this is
    /// exactly set equality.
    pub fn equivalent(&self, other: &Pred) -> bool {
        self == other
    }

    /// The canonical ranges, in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.ranges.iter().copied()
    }

    /// The smallest code point in the set, used as the witness of a minterm.
    pub(crate) fn min_code(&self) -> Option<u32> {
        self.ranges.first().map(|&(lo, _)| lo)
    }

    /// If the set contains exactly one code point that is a scalar value,
    /// returns it.
    pub(crate) fn as_single_char(&self) -> Option<char> {
        match *self.ranges {
            [(lo, hi)] if lo == hi => char::from_u32(lo),
            _ => None,
        }
    }

    /// The textual range form, e.g. `61-7a,30-39` for `[a-z0-9]`. The empty
    /// string denotes the empty set.
    pub fn serialize(&self) -> String {
        let mut out = String::new();
        self.write_ranges(&mut out);
        out
    }

    /// Parses the [`serialize`](Self::serialize) form back into a predicate.
    pub fn deserialize(s: &str) -> Result<Pred, crate::error::Error> {
        let err = |at: usize| crate::error::Error::InvalidFormat { at };
        if s.is_empty() {
            return Ok(Pred::none());
        }
        let mut ranges = Vec::new();
        let mut offset = 0;
        for part in s.split(',') {
            let (lo, hi) = match part.split_once('-') {
                Some((lo, hi)) => (lo, hi),
                None => (part, part),
            };
            let lo = u32::from_str_radix(lo, 16).map_err(|_| err(offset))?;
            let hi = u32::from_str_radix(hi, 16).map_err(|_| err(offset))?;
            if lo > hi || hi > MAX_CODE {
                return Err(err(offset));
            }
            ranges.push((lo, hi));
            offset += part.len() + 1;
        }
        Ok(Pred::ranges(ranges))
    }

    /// Writes the serialized range form, e.g. `61-7a,30-39` for `[a-z0-9]`.
    pub(crate) fn write_ranges(&self, out: &mut String) {
        use fmt::Write;
        for (i, (lo, hi)) in self.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            if lo == hi {
                write!(out, "{:x}", lo).unwrap();
            } else {
                write!(out, "{:x}-{:x}", lo, hi).unwrap();
            }
        }
    }
}

impl fmt::Debug for Pred {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = String::new();
        if self.is_full() {
            s.push('.');
        } else {
            self.write_ranges(&mut s);
        }
        write!(f, "Pred[{}]", s)
    }
}

/// Merges a sorted range list into canonical form.
fn coalesce(ranges: Vec<(u32, u32)>) -> Vec<(u32, u32)> {
    let mut out: Vec<(u32, u32)> = Vec::with_capacity(ranges.len());
    for (lo, hi) in ranges {
        match out.last_mut() {
            // Overlapping or adjacent ranges merge.
            Some(last) if lo <= last.1.saturating_add(1) => {
                last.1 = last.1.max(hi);
            }
            _ => out.push((lo, hi)),
        }
    }
    out
}

/// Returns the non-empty atoms of the Boolean algebra generated by `preds`:
/// pairwise disjoint predicates whose union is the full alphabet, such that
/// every input predicate is a union of atoms.
///
/// Incremental refinement: start from `[⊤]` and split every atom by each
/// predicate and its complement.
pub fn generate_minterms(preds: &[Pred]) -> Vec<Pred> {
    let mut atoms = vec![Pred::any()];
    for p in preds {
        let mut next = Vec::with_capacity(atoms.len() * 2);
        for atom in &atoms {
            let inside = atom.and(p);
            let outside = atom.diff(p);
            if inside.is_satisfiable() {
                next.push(inside);
            }
            if outside.is_satisfiable() {
                next.push(outside);
            }
        }
        atoms = next;
    }
    atoms
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(ranges: &[(u32, u32)]) -> Pred {
        Pred::ranges(ranges.iter().copied())
    }

    #[test]
    fn canonical_form() {
        // Out of order, overlapping and adjacent input ranges.
        let x = p(&[(10, 20), (5, 12), (21, 30), (40, 41)]);
        assert_eq!(x.iter().collect::<Vec<_>>(), vec![(5, 30), (40, 41)]);
        // Inverted ranges are dropped.
        assert!(!p(&[(9, 3)]).is_satisfiable());
    }

    #[test]
    fn boolean_ops() {
        let az = Pred::range('a' as u32, 'z' as u32);
        let digits = Pred::range('0' as u32, '9' as u32);

        assert!(!az.and(&digits).is_satisfiable());
        let both = az.or(&digits);
        assert!(both.contains('m') && both.contains('7'));
        assert!(!both.contains('A'));

        // ¬¬p = p, p ∨ ¬p = ⊤, p ∧ ¬p = ⊥
        assert_eq!(az.not().not(), az);
        assert!(az.or(&az.not()).is_full());
        assert!(!az.and(&az.not()).is_satisfiable());
    }

    #[test]
    fn complement_edges() {
        assert!(Pred::any().not().iter().next().is_none());
        assert!(Pred::none().not().is_full());
        let from_zero = Pred::range(0, 9);
        assert_eq!(from_zero.not().iter().next(), Some((10, MAX_CODE)));
    }

    #[test]
    fn contains() {
        let x = p(&[(5, 10), (20, 30)]);
        assert!(x.contains_code(5) && x.contains_code(10) && x.contains_code(25));
        assert!(!x.contains_code(4) && !x.contains_code(11) && !x.contains_code(31));
    }

    #[test]
    fn single_char() {
        assert_eq!(Pred::char('x').as_single_char(), Some('x'));
        assert_eq!(Pred::range(5, 6).as_single_char(), None);
        assert_eq!(Pred::none().as_single_char(), None);
    }

    #[test]
    fn serialize_round_trip() {
        for ranges in [
            vec![],
            vec![(0x61, 0x7a)],
            vec![(0x30, 0x39), (0x41, 0x5a), (0x5f, 0x5f)],
            vec![(0, MAX_CODE)],
        ] {
            let p = Pred::ranges(ranges);
            assert_eq!(Pred::deserialize(&p.serialize()).unwrap(), p);
        }
        assert_eq!(Pred::char('a').serialize(), "61");
        assert_eq!(Pred::range(0x30, 0x39).serialize(), "30-39");

        assert!(Pred::deserialize("xyz").is_err());
        assert!(Pred::deserialize("9-3").is_err());
        assert!(Pred::deserialize("61,").is_err());
        assert!(Pred::deserialize("ffffffff").is_err());
    }

    #[test]
    fn minterms_partition() {
        let preds = vec![
            Pred::range('a' as u32, 'z' as u32),
            Pred::range('m' as u32, '~' as u32),
            Pred::char('q'),
        ];
        let minterms = generate_minterms(&preds);

        // Pairwise disjoint.
        for (i, a) in minterms.iter().enumerate() {
            for b in &minterms[i + 1..] {
                assert!(!a.and(b).is_satisfiable(), "{:?} overlaps {:?}", a, b);
            }
        }
        // Union is the full alphabet.
        let mut union = Pred::none();
        for m in &minterms {
            union = union.or(m);
        }
        assert!(union.is_full());
        // Every input predicate is a union of atoms: each atom is either
        // fully inside or fully outside each predicate.
        for m in &minterms {
            for pred in &preds {
                let inter = m.and(pred);
                assert!(!inter.is_satisfiable() || inter == *m);
            }
        }
        assert!(minterms.len() <= 1 << preds.len());
    }

    #[test]
    fn minterms_trivial() {
        assert_eq!(generate_minterms(&[]), vec![Pred::any()]);
        let top_only = generate_minterms(&[Pred::any()]);
        assert_eq!(top_only, vec![Pred::any()]);
    }
}
