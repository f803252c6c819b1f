/*!
Derivatives of symbolic regexes.

Character derivatives are always taken with respect to a minterm of the
compiled regex, represented by a witness code point: a minterm is fully
inside or fully outside every predicate of the regex, so the singleton case
reduces to one membership test.

Anchors are zero-width and never consume a character; they are resolved by
*border* derivatives against the conditions holding at the current position,
and by context-aware nullability when testing acceptance. A border
derivative only resolves anchors reachable before the first character
consumption; deeper anchors are left for later positions.
*/

use std::collections::HashMap;

use crate::re::{Anchor, ReBuilder, ReId, ReKind, UNBOUNDED};

/// A set of border conditions. States carry the begin-side bits of their
/// position; the end-side bits are supplied transiently by lookahead.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Debug)]
pub(crate) struct BorderCtx(pub u8);

impl BorderCtx {
    /// Beginning of the haystack.
    pub const BEGIN_TEXT: u8 = 1 << 0;
    /// Beginning of the haystack or of a line. Implied by `BEGIN_TEXT`.
    pub const BEGIN_LINE: u8 = 1 << 1;
    /// End of the haystack or of a line. Implied by `END_TEXT`.
    pub const END_LINE: u8 = 1 << 2;
    /// End of the haystack.
    pub const END_TEXT: u8 = 1 << 3;

    pub const NONE: BorderCtx = BorderCtx(0);

    pub fn with(self, bits: u8) -> BorderCtx {
        BorderCtx(self.0 | bits)
    }

    pub fn satisfies(self, anchor: Anchor) -> bool {
        let bit = match anchor {
            Anchor::StartText => Self::BEGIN_TEXT,
            Anchor::StartLine => Self::BEGIN_LINE,
            Anchor::EndLine => Self::END_LINE,
            Anchor::EndText => Self::END_TEXT,
        };
        self.0 & bit != 0
    }
}

impl ReBuilder {
    /// Whether the language of `id` accepts the empty string when the border
    /// conditions in `ctx` hold.
    pub(crate) fn nullable_in(&self, id: ReId, ctx: BorderCtx) -> bool {
        if !self.contains_anchors(id) {
            return self.is_nullable(id);
        }
        match self.kind(id) {
            ReKind::Singleton(_) => false,
            ReKind::Epsilon | ReKind::Watchdog(_) => true,
            ReKind::Anchor(a) => ctx.satisfies(*a),
            ReKind::Concat(a, b) => {
                self.nullable_in(*a, ctx) && self.nullable_in(*b, ctx)
            }
            ReKind::Or(set) => {
                set.members.iter().any(|&m| self.nullable_in(m, ctx))
                    || set.folded.iter().any(|f| self.nullable_in(f.tail, ctx))
            }
            ReKind::And(set) => {
                set.iter().all(|&m| self.nullable_in(m, ctx))
            }
            ReKind::Loop { body, lo, .. } => {
                *lo == 0 || self.nullable_in(*body, ctx)
            }
            ReKind::IfThenElse { cond, then, els } => {
                if self.nullable_in(*cond, ctx) {
                    self.nullable_in(*then, ctx)
                } else {
                    self.nullable_in(*els, ctx)
                }
            }
        }
    }

    /// The Brzozowski derivative of `id` with respect to the minterm whose
    /// witness code point is `witness`: the regex accepting exactly the `w`
    /// such that `c·w` is accepted for the characters `c` of the minterm.
    pub(crate) fn derivative(&mut self, witness: u32, id: ReId) -> ReId {
        let kind = self.kind(id).clone();
        match kind {
            ReKind::Singleton(p) => {
                if p.contains_code(witness) {
                    self.epsilon()
                } else {
                    self.nothing()
                }
            }
            ReKind::Epsilon | ReKind::Anchor(_) | ReKind::Watchdog(_) => {
                self.nothing()
            }
            ReKind::Concat(a, b) => {
                let da = self.derivative(witness, a);
                let left = self.concat(da, b);
                if self.is_nullable(a) {
                    let db = self.derivative(witness, b);
                    self.alternation(vec![left, db])
                } else {
                    left
                }
            }
            ReKind::Or(set) => {
                let alts = self.alternatives_of(&set);
                let mut ds = Vec::with_capacity(alts.len());
                for alt in alts {
                    ds.push(self.derivative(witness, alt));
                }
                self.alternation(ds)
            }
            ReKind::And(set) => {
                let mut ds = Vec::with_capacity(set.len());
                for &m in set.iter() {
                    ds.push(self.derivative(witness, m));
                }
                self.intersection(ds)
            }
            ReKind::Loop { body, lo, hi, lazy } => {
                debug_assert!(hi > 0);
                let db = self.derivative(witness, body);
                let hi = if hi == UNBOUNDED { UNBOUNDED } else { hi - 1 };
                let rest = self.mk_loop(body, lo.saturating_sub(1), hi, lazy);
                self.concat(db, rest)
            }
            ReKind::IfThenElse { cond, then, els } => {
                let dc = self.derivative(witness, cond);
                let dt = self.derivative(witness, then);
                let de = self.derivative(witness, els);
                self.if_then_else(dc, dt, de)
            }
        }
    }

    /// Resolves every anchor of `id` that is reachable before the first
    /// character consumption: anchors whose condition holds in `ctx` become
    /// ε, the rest become ∅. Anchors behind a character remain untouched.
    pub(crate) fn derivative_border(
        &mut self,
        ctx: BorderCtx,
        id: ReId,
    ) -> ReId {
        let mut memo = HashMap::new();
        self.border_rec(ctx, id, &mut memo)
    }

    fn border_rec(
        &mut self,
        ctx: BorderCtx,
        id: ReId,
        memo: &mut HashMap<ReId, Option<ReId>>,
    ) -> ReId {
        if !self.contains_anchors(id) {
            return id;
        }
        match memo.get(&id) {
            Some(Some(done)) => return *done,
            // In progress: a nullable loop of anchored bodies reached
            // itself. The self-referent occurs under a union, so the least
            // solution substitutes ∅ for the recursive occurrence.
            Some(None) => return self.nothing(),
            None => {}
        }
        memo.insert(id, None);
        let kind = self.kind(id).clone();
        let out = match kind {
            ReKind::Anchor(a) => {
                if ctx.satisfies(a) {
                    self.epsilon()
                } else {
                    self.nothing()
                }
            }
            ReKind::Singleton(_)
            | ReKind::Epsilon
            | ReKind::Watchdog(_) => id,
            ReKind::Concat(a, b) => {
                let a2 = self.border_rec(ctx, a, memo);
                let head = self.concat(a2, b);
                if self.is_nullable(a2) {
                    let b2 = self.border_rec(ctx, b, memo);
                    self.alternation(vec![head, b2])
                } else {
                    head
                }
            }
            ReKind::Or(set) => {
                let alts = self.alternatives_of(&set);
                let mut bs = Vec::with_capacity(alts.len());
                for alt in alts {
                    bs.push(self.border_rec(ctx, alt, memo));
                }
                self.alternation(bs)
            }
            ReKind::And(set) => {
                let mut bs = Vec::with_capacity(set.len());
                for &m in set.iter() {
                    bs.push(self.border_rec(ctx, m, memo));
                }
                self.intersection(bs)
            }
            ReKind::Loop { body, lo, hi, lazy } => {
                // Unroll one iteration so only the first iteration's anchors
                // are resolved against this position.
                debug_assert!(hi > 0);
                let hi1 = if hi == UNBOUNDED { UNBOUNDED } else { hi - 1 };
                let rest = self.mk_loop(body, lo.saturating_sub(1), hi1, lazy);
                let one = self.concat(body, rest);
                let b1 = self.border_rec(ctx, one, memo);
                if lo == 0 {
                    let eps = self.epsilon();
                    self.alternation(vec![b1, eps])
                } else {
                    b1
                }
            }
            ReKind::IfThenElse { cond, then, els } => {
                let c = self.border_rec(ctx, cond, memo);
                let t = self.border_rec(ctx, then, memo);
                let e = self.border_rec(ctx, els, memo);
                self.if_then_else(c, t, e)
            }
        };
        memo.insert(id, Some(out));
        out
    }

    /// The reversal of `id`: concatenations flip, start anchors become the
    /// corresponding end anchors and vice versa, watchdogs are erased.
    /// Reversing twice is semantically the identity.
    pub(crate) fn reverse(&mut self, id: ReId) -> ReId {
        let mut memo = HashMap::new();
        self.reverse_rec(id, &mut memo)
    }

    fn reverse_rec(
        &mut self,
        id: ReId,
        memo: &mut HashMap<ReId, ReId>,
    ) -> ReId {
        if let Some(&done) = memo.get(&id) {
            return done;
        }
        let kind = self.kind(id).clone();
        let out = match kind {
            ReKind::Singleton(_) | ReKind::Epsilon => id,
            ReKind::Watchdog(_) => self.epsilon(),
            ReKind::Anchor(a) => {
                let swapped = match a {
                    Anchor::StartText => Anchor::EndText,
                    Anchor::EndText => Anchor::StartText,
                    Anchor::StartLine => Anchor::EndLine,
                    Anchor::EndLine => Anchor::StartLine,
                };
                self.anchor(swapped)
            }
            ReKind::Concat(a, b) => {
                let rb = self.reverse_rec(b, memo);
                let ra = self.reverse_rec(a, memo);
                self.concat(rb, ra)
            }
            ReKind::Or(set) => {
                let alts = self.alternatives_of(&set);
                let mut rs = Vec::with_capacity(alts.len());
                for alt in alts {
                    rs.push(self.reverse_rec(alt, memo));
                }
                self.alternation(rs)
            }
            ReKind::And(set) => {
                let mut rs = Vec::with_capacity(set.len());
                for &m in set.iter() {
                    rs.push(self.reverse_rec(m, memo));
                }
                self.intersection(rs)
            }
            ReKind::Loop { body, lo, hi, lazy } => {
                let rb = self.reverse_rec(body, memo);
                self.mk_loop(rb, lo, hi, lazy)
            }
            ReKind::IfThenElse { cond, then, els } => {
                let c = self.reverse_rec(cond, memo);
                let t = self.reverse_rec(then, memo);
                let e = self.reverse_rec(els, memo);
                self.if_then_else(c, t, e)
            }
        };
        memo.insert(id, out);
        out
    }

    /// If an accepting (nullable) path through `id` passes a watchdog,
    /// returns the committed match length. All watchdogs reachable this way
    /// carry the same constant, so any of them answers.
    pub(crate) fn watchdog_len(&self, id: ReId) -> Option<u32> {
        if !self.contains_watchdog(id) {
            return None;
        }
        match self.kind(id) {
            ReKind::Watchdog(n) => Some(*n),
            ReKind::Concat(a, b) => {
                if self.is_nullable(*a) && self.is_nullable(*b) {
                    self.watchdog_len(*a).or_else(|| self.watchdog_len(*b))
                } else {
                    None
                }
            }
            ReKind::Or(set) => set
                .members
                .iter()
                .filter(|&&m| self.is_nullable(m))
                .find_map(|&m| self.watchdog_len(m))
                .or_else(|| {
                    set.folded
                        .iter()
                        .filter(|f| self.is_nullable(f.tail))
                        .find_map(|f| self.watchdog_len(f.tail))
                }),
            ReKind::And(set) => {
                if set.iter().all(|&m| self.is_nullable(m)) {
                    set.iter().find_map(|&m| self.watchdog_len(m))
                } else {
                    None
                }
            }
            ReKind::Loop { body, lo, .. } => {
                if *lo > 0 && self.is_nullable(*body) {
                    self.watchdog_len(*body)
                } else {
                    None
                }
            }
            ReKind::IfThenElse { cond, then, els } => {
                let branch = if self.is_nullable(*cond) { then } else { els };
                if self.is_nullable(*branch) {
                    self.watchdog_len(*branch)
                } else {
                    None
                }
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pred::Pred;

    fn lit(b: &mut ReBuilder, s: &str) -> ReId {
        let ids: Vec<ReId> =
            s.chars().map(|c| b.singleton(Pred::char(c))).collect();
        b.concat_all(ids)
    }

    /// Derives through `word` character by character and reports acceptance.
    /// Characters here are chosen to be their own minterm witnesses for the
    /// predicates in play (plain literals), so deriving by the code point is
    /// exactly deriving by the minterm.
    fn accepts(b: &mut ReBuilder, mut re: ReId, word: &str) -> bool {
        for c in word.chars() {
            re = b.derivative(c as u32, re);
        }
        b.is_nullable(re)
    }

    #[test]
    fn derivative_soundness_samples() {
        let mut b = ReBuilder::new();

        let abc = lit(&mut b, "abc");
        assert!(accepts(&mut b, abc, "abc"));
        assert!(!accepts(&mut b, abc, "ab"));
        assert!(!accepts(&mut b, abc, "abd"));

        let a = b.singleton(Pred::char('a'));
        let bb = lit(&mut b, "b");
        let ab = b.concat(a, bb);
        let star = b.repetition(ab, 0, None, false).unwrap();
        assert!(accepts(&mut b, star, ""));
        assert!(accepts(&mut b, star, "abab"));
        assert!(!accepts(&mut b, star, "aba"));

        let l = b.repetition(a, 2, Some(4), false).unwrap();
        assert!(!accepts(&mut b, l, "a"));
        assert!(accepts(&mut b, l, "aa"));
        assert!(accepts(&mut b, l, "aaaa"));
        assert!(!accepts(&mut b, l, "aaaaa"));
    }

    #[test]
    fn derivative_of_alternation_and_intersection() {
        let mut b = ReBuilder::new();
        let abc = lit(&mut b, "abc");
        let abd = lit(&mut b, "abd");
        let or = b.alternation(vec![abc, abd]);
        assert!(accepts(&mut b, or, "abc"));
        assert!(accepts(&mut b, or, "abd"));
        assert!(!accepts(&mut b, or, "abe"));

        // (a[bc]) ∧ (ab|xy) = ab
        let a = b.singleton(Pred::char('a'));
        let bc = b.singleton(Pred::ranges([
            ('b' as u32, 'c' as u32),
        ]));
        let l = b.concat(a, bc);
        let ab = lit(&mut b, "ab");
        let xy = lit(&mut b, "xy");
        let r = b.alternation(vec![ab, xy]);
        let and = b.intersection(vec![l, r]);
        assert!(accepts(&mut b, and, "ab"));
        assert!(!accepts(&mut b, and, "ac"));
        assert!(!accepts(&mut b, and, "xy"));
    }

    #[test]
    fn derivative_respects_minterm_witness() {
        let mut b = ReBuilder::new();
        let digits = b.singleton(Pred::range('0' as u32, '9' as u32));
        // Any witness inside the class gives ε, outside gives ∅.
        let d5 = b.derivative('5' as u32, digits);
        let d0 = b.derivative('0' as u32, digits);
        assert_eq!(d5, b.epsilon());
        assert_eq!(d5, d0);
        let dx = b.derivative('x' as u32, digits);
        assert_eq!(dx, b.nothing());
    }

    #[test]
    fn border_resolves_left_edge_anchors_only() {
        let mut b = ReBuilder::new();
        let abc = lit(&mut b, "abc");
        let bol = b.anchor(Anchor::StartLine);
        let eol = b.anchor(Anchor::EndLine);
        let head = b.concat(bol, abc);
        let re = b.concat(head, eol);

        // At a line start, ^ resolves to ε; $ stays for later positions.
        let at_bol =
            b.derivative_border(BorderCtx(BorderCtx::BEGIN_LINE), re);
        let expect = b.concat(abc, eol);
        assert_eq!(at_bol, expect);

        // Mid-line the whole term dies.
        let mid = b.derivative_border(BorderCtx::NONE, re);
        assert_eq!(mid, b.nothing());
    }

    #[test]
    fn border_through_nullable_head() {
        let mut b = ReBuilder::new();
        let a = b.singleton(Pred::char('a'));
        let opt = b.repetition(a, 0, Some(1), false).unwrap();
        let bol = b.anchor(Anchor::StartLine);
        let x = lit(&mut b, "x");
        let tail = b.concat(bol, x);
        let re = b.concat(opt, tail);

        // a?^x at a non-border position: the ε path of a? exposes ^, which
        // fails; the a path keeps ^ pending for the next position.
        let mid = b.derivative_border(BorderCtx::NONE, re);
        assert!(!b.is_nullable(mid));
        // Consuming 'a' then taking the border at a line start must accept "x".
        let after_a = b.derivative('a' as u32, mid);
        let resolved =
            b.derivative_border(BorderCtx(BorderCtx::BEGIN_LINE), after_a);
        assert!(accepts(&mut b, resolved, "x"));
    }

    #[test]
    fn border_anchored_loop_terminates() {
        let mut b = ReBuilder::new();
        let bol = b.anchor(Anchor::StartLine);
        let star = b.repetition(bol, 0, None, false).unwrap();
        // (^)* is ε-equivalent at any border; the recursion must not diverge.
        let r = b.derivative_border(BorderCtx(BorderCtx::BEGIN_LINE), star);
        assert!(b.is_nullable(r));
        let r = b.derivative_border(BorderCtx::NONE, star);
        assert!(b.is_nullable(r));
    }

    #[test]
    fn nullable_in_context() {
        let mut b = ReBuilder::new();
        let eol = b.anchor(Anchor::EndLine);
        let a = b.singleton(Pred::char('a'));
        let opt = b.repetition(a, 0, Some(1), false).unwrap();
        let re = b.concat(opt, eol);

        assert!(!b.is_nullable(re));
        assert!(b.nullable_in(re, BorderCtx(BorderCtx::END_LINE)));
        assert!(!b.nullable_in(re, BorderCtx(BorderCtx::BEGIN_LINE)));
    }

    #[test]
    fn reverse_twice_is_identity_on_samples() {
        let mut b = ReBuilder::new();
        let abc = lit(&mut b, "abc");
        let d = b.singleton(Pred::range('0' as u32, '9' as u32));
        let loop_ = b.repetition(d, 1, Some(3), false).unwrap();
        let cat = b.concat(abc, loop_);
        let alt = {
            let xy = lit(&mut b, "xy");
            b.alternation(vec![cat, xy])
        };
        for re in [abc, cat, alt] {
            let r = b.reverse(re);
            let rr = b.reverse(r);
            assert_eq!(rr, re);
        }

        // "abc" reversed accepts "cba".
        let r = b.reverse(abc);
        assert!(accepts(&mut b, r, "cba"));
        assert!(!accepts(&mut b, r, "abc"));
    }

    #[test]
    fn reverse_swaps_anchors() {
        let mut b = ReBuilder::new();
        let bol = b.anchor(Anchor::StartLine);
        let abc = lit(&mut b, "abc");
        let re = b.concat(bol, abc);
        let rev = b.reverse(re);
        // rev(^abc) = cba$
        let eol = b.anchor(Anchor::EndLine);
        let cba = lit(&mut b, "cba");
        let expect = b.concat(cba, eol);
        assert_eq!(rev, expect);
    }

    #[test]
    fn watchdog_surfaces_on_nullable_paths() {
        let mut b = ReBuilder::new();
        let abc = lit(&mut b, "abc");
        let wd = b.watchdog(3);
        let marked = b.concat(abc, wd);
        assert_eq!(b.watchdog_len(marked), None);

        let mut re = marked;
        for c in "abc".chars() {
            re = b.derivative(c as u32, re);
        }
        assert!(b.is_nullable(re));
        assert_eq!(b.watchdog_len(re), Some(3));
    }
}
