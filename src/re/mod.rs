/*!
The symbolic regex AST and its hash-consing builder.

Every node is interned in a [`ReBuilder`] arena and addressed by a [`ReId`];
structurally equal terms always share one id, so equality is id equality and
derivative memoization can key on ids. Constructors normalize bottom-up:
unit and absorption laws for ε/∅/⊤, right-threaded concatenations, sorted
duplicate-free alternation and intersection sets, and compaction of bounded
zero-loops inside alternations.

References only point downward (parents to children), so the arena is
acyclic; anchors and watchdogs are leaves.
*/

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use crate::{error::Error, pred::Pred};

pub(crate) mod derive;
pub(crate) mod serialize;

/// Sentinel upper bound for unbounded loops.
pub const UNBOUNDED: u32 = u32::MAX;

/// Identity of an interned symbolic regex node.
///
/// Ids are only meaningful relative to the [`ReBuilder`] that produced them.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct ReId(u32);

impl ReId {
    fn idx(self) -> usize {
        self.0 as usize
    }
}

/// Zero-width position assertions.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Anchor {
    /// `\A`: beginning of the haystack.
    StartText,
    /// `\z`: end of the haystack.
    EndText,
    /// `^` in multiline mode: beginning of the haystack or after `\n`.
    StartLine,
    /// `$` in multiline mode: end of the haystack or before `\n`.
    EndLine,
}

/// A bounded zero-minimum loop folded into an alternation:
/// `body{0,hi}·tail`, compacted so that disjunctions of such entries keep a
/// single entry with the maximal bound per `(body, tail, lazy)`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub(crate) struct FoldedLoop {
    pub body: ReId,
    pub tail: ReId,
    pub lazy: bool,
    pub hi: u32,
}

/// The member set of an `Or` node: explicit alternatives plus folded
/// bounded-loop entries. Both sequences are sorted and duplicate free.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct AltSet {
    pub(crate) members: Box<[ReId]>,
    pub(crate) folded: Box<[FoldedLoop]>,
}

/// The shape of a symbolic regex node.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum ReKind {
    /// One character drawn from a predicate. An unsatisfiable predicate is
    /// the canonical empty language ∅.
    Singleton(Pred),
    /// The empty string.
    Epsilon,
    /// Sequence. The left child is never itself a `Concat`.
    Concat(ReId, ReId),
    /// Alternation over a commutative, idempotent set.
    Or(AltSet),
    /// Intersection over a commutative, idempotent set.
    And(Box<[ReId]>),
    /// `body{lo,hi}`; `hi == UNBOUNDED` means no upper bound.
    Loop { body: ReId, lo: u32, hi: u32, lazy: bool },
    /// `(?(cond) then | else)`: `(cond ∧ then) ∨ (¬cond ∧ else)`.
    IfThenElse { cond: ReId, then: ReId, els: ReId },
    Anchor(Anchor),
    /// Zero-width accept marker carrying the match length committed when an
    /// accepting path passes through it.
    Watchdog(u32),
}

#[derive(Clone)]
struct Node {
    kind: ReKind,
    /// Nullable with no border condition holding (anchors block).
    nullable: bool,
    /// Nullable if every border condition held (anchors pass). Used for
    /// over-approximating first sets.
    nullable_any_ctx: bool,
    has_anchors: bool,
    has_watchdog: bool,
    /// `Some(n)` iff every word of the language has exactly `n` characters.
    fixed_len: Option<u32>,
    /// Over-approximation of the possible first characters.
    first: Pred,
}

/// Arena, intern table and normalizing constructors for symbolic regexes.
///
/// # Example
///
/// ```
/// use symre::re::ReBuilder;
/// use symre::pred::Pred;
///
/// let mut b = ReBuilder::new();
/// let a = b.singleton(Pred::char('a'));
/// let b_ = b.singleton(Pred::char('b'));
/// let ab = b.concat(a, b_);
/// // Hash consing: the same construction yields the same id.
/// let ab2 = b.concat(a, b_);
/// assert_eq!(ab, ab2);
/// assert_eq!(b.fixed_len(ab), Some(2));
/// ```
#[derive(Clone)]
pub struct ReBuilder {
    nodes: Vec<Node>,
    intern: HashMap<ReKind, ReId>,
    eps_id: ReId,
    empty_id: ReId,
    dot_star_id: ReId,
    optimize_loops: bool,
}

impl Default for ReBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ReBuilder {
    pub fn new() -> ReBuilder {
        let mut b = ReBuilder {
            nodes: Vec::new(),
            intern: HashMap::new(),
            eps_id: ReId(0),
            empty_id: ReId(0),
            dot_star_id: ReId(0),
            optimize_loops: true,
        };
        b.eps_id = b.intern_kind(ReKind::Epsilon);
        b.empty_id = b.intern_kind(ReKind::Singleton(Pred::none()));
        let any = b.intern_kind(ReKind::Singleton(Pred::any()));
        b.dot_star_id = b.intern_kind(ReKind::Loop {
            body: any,
            lo: 0,
            hi: UNBOUNDED,
            lazy: false,
        });
        b
    }

    /// Disables the bounded-zero-loop compaction inside alternations.
    pub fn optimize_loops(&mut self, yes: bool) {
        self.optimize_loops = yes;
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// ε, the empty string.
    pub fn epsilon(&self) -> ReId {
        self.eps_id
    }

    /// ∅, the empty language.
    pub fn nothing(&self) -> ReId {
        self.empty_id
    }

    /// `(?s:.)*`, the universal language.
    pub fn dot_star(&self) -> ReId {
        self.dot_star_id
    }

    pub fn kind(&self, id: ReId) -> &ReKind {
        &self.nodes[id.idx()].kind
    }

    /// Whether the language contains the empty string, with no border
    /// condition satisfied (unresolved anchors block acceptance).
    pub fn is_nullable(&self, id: ReId) -> bool {
        self.nodes[id.idx()].nullable
    }

    pub fn contains_anchors(&self, id: ReId) -> bool {
        self.nodes[id.idx()].has_anchors
    }

    pub(crate) fn contains_watchdog(&self, id: ReId) -> bool {
        self.nodes[id.idx()].has_watchdog
    }

    /// `Some(n)` iff every accepted word has exactly `n` characters.
    pub fn fixed_len(&self, id: ReId) -> Option<u32> {
        self.nodes[id.idx()].fixed_len
    }

    /// Whether `id` was produced by this builder.
    pub fn contains(&self, id: ReId) -> bool {
        id.idx() < self.nodes.len()
    }

    /// An over-approximation of the characters a match can start with.
    pub fn first_set(&self, id: ReId) -> &Pred {
        &self.nodes[id.idx()].first
    }

    /// Whether `id` denotes the universal language `(?s:.)*`.
    pub fn is_universal(&self, id: ReId) -> bool {
        if id == self.dot_star_id {
            return true;
        }
        match *self.kind(id) {
            ReKind::Loop { body, lo: 0, hi: UNBOUNDED, .. } => {
                matches!(self.kind(body), ReKind::Singleton(p) if p.is_full())
            }
            _ => false,
        }
    }

    pub fn singleton(&mut self, pred: Pred) -> ReId {
        self.intern_kind(ReKind::Singleton(pred))
    }

    pub fn anchor(&mut self, anchor: Anchor) -> ReId {
        self.intern_kind(ReKind::Anchor(anchor))
    }

    pub fn watchdog(&mut self, len: u32) -> ReId {
        self.intern_kind(ReKind::Watchdog(len))
    }

    /// Sequencing. ε is a unit, ∅ annihilates, and left-nested concats are
    /// re-threaded so the left child is never a `Concat`.
    pub fn concat(&mut self, a: ReId, b: ReId) -> ReId {
        if a == self.eps_id {
            return b;
        }
        if b == self.eps_id {
            return a;
        }
        if a == self.empty_id || b == self.empty_id {
            return self.empty_id;
        }
        if let ReKind::Concat(x, y) = *self.kind(a) {
            let tail = self.concat(y, b);
            return self.concat(x, tail);
        }
        self.intern_kind(ReKind::Concat(a, b))
    }

    /// Right-fold of [`concat`](Self::concat) over a sequence.
    pub fn concat_all<I>(&mut self, items: I) -> ReId
    where
        I: IntoIterator<Item = ReId>,
        I::IntoIter: DoubleEndedIterator,
    {
        let mut acc = self.eps_id;
        for item in items.into_iter().rev() {
            acc = self.concat(item, acc);
        }
        acc
    }

    /// Alternation. Flattens nested alternations, drops ∅, absorbs ⊤,
    /// collapses singleton sets, and folds `body{0,k}` and `body{0,k}·tail`
    /// entries into a `(body, tail) → max k` compaction.
    pub fn alternation(&mut self, items: Vec<ReId>) -> ReId {
        let mut members: BTreeSet<ReId> = BTreeSet::new();
        let mut folded: BTreeMap<(ReId, ReId, bool), u32> = BTreeMap::new();
        let mut stack = items;
        while let Some(id) = stack.pop() {
            if id == self.empty_id {
                continue;
            }
            if self.is_universal(id) {
                return self.dot_star_id;
            }
            match self.kind(id) {
                ReKind::Or(set) => {
                    stack.extend(set.members.iter().copied());
                    for f in set.folded.iter() {
                        let slot =
                            folded.entry((f.body, f.tail, f.lazy)).or_insert(0);
                        *slot = (*slot).max(f.hi);
                    }
                }
                _ => match self.as_foldable(id) {
                    Some((body, tail, lazy, hi)) => {
                        let slot = folded.entry((body, tail, lazy)).or_insert(0);
                        *slot = (*slot).max(hi);
                    }
                    None => {
                        members.insert(id);
                    }
                },
            }
        }

        let folded: Vec<FoldedLoop> = folded
            .into_iter()
            .map(|((body, tail, lazy), hi)| FoldedLoop { body, tail, lazy, hi })
            .collect();

        match (members.len(), folded.len()) {
            (0, 0) => self.empty_id,
            (1, 0) => members.into_iter().next().unwrap(),
            (0, 1) => self.reconstitute(folded[0]),
            _ => self.intern_kind(ReKind::Or(AltSet {
                members: members.into_iter().collect(),
                folded: folded.into(),
            })),
        }
    }

    /// Recognizes `body{0,k}` and `body{0,k}·tail` with a finite `k`.
    fn as_foldable(&self, id: ReId) -> Option<(ReId, ReId, bool, u32)> {
        if !self.optimize_loops {
            return None;
        }
        match *self.kind(id) {
            ReKind::Loop { body, lo: 0, hi, lazy } if hi != UNBOUNDED => {
                Some((body, self.eps_id, lazy, hi))
            }
            ReKind::Concat(head, tail) => match *self.kind(head) {
                ReKind::Loop { body, lo: 0, hi, lazy } if hi != UNBOUNDED => {
                    Some((body, tail, lazy, hi))
                }
                _ => None,
            },
            _ => None,
        }
    }

    fn reconstitute(&mut self, f: FoldedLoop) -> ReId {
        let l = self.mk_loop(f.body, 0, f.hi, f.lazy);
        self.concat(l, f.tail)
    }

    /// Intersection. Flattens nested intersections, absorbs ⊤ members,
    /// short-circuits on ∅, and merges singleton members by predicate
    /// conjunction. The empty intersection is ⊤.
    pub fn intersection(&mut self, items: Vec<ReId>) -> ReId {
        let mut members: BTreeSet<ReId> = BTreeSet::new();
        let mut single: Option<Pred> = None;
        let mut stack = items;
        while let Some(id) = stack.pop() {
            if id == self.empty_id {
                return self.empty_id;
            }
            if self.is_universal(id) {
                continue;
            }
            match self.kind(id) {
                ReKind::And(set) => stack.extend(set.iter().copied()),
                ReKind::Singleton(p) => {
                    let p = p.clone();
                    single = Some(match single {
                        Some(q) => q.and(&p),
                        None => p,
                    });
                }
                _ => {
                    members.insert(id);
                }
            }
        }
        if let Some(p) = single {
            let s = self.singleton(p);
            if s == self.empty_id {
                return self.empty_id;
            }
            members.insert(s);
        }
        match members.len() {
            0 => self.dot_star_id,
            1 => members.into_iter().next().unwrap(),
            _ => self
                .intern_kind(ReKind::And(members.into_iter().collect())),
        }
    }

    /// `body{lo,hi}` (`hi = None` for unbounded). Fails when `lo > hi`.
    pub fn repetition(
        &mut self,
        body: ReId,
        lo: u32,
        hi: Option<u32>,
        lazy: bool,
    ) -> Result<ReId, Error> {
        let hi = hi.unwrap_or(UNBOUNDED);
        if lo > hi {
            return Err(Error::invalid(format!(
                "loop lower bound {} exceeds upper bound {}",
                lo, hi
            )));
        }
        Ok(self.mk_loop(body, lo, hi, lazy))
    }

    /// Bounds-checked internally by callers.
    pub(crate) fn mk_loop(
        &mut self,
        body: ReId,
        lo: u32,
        hi: u32,
        lazy: bool,
    ) -> ReId {
        debug_assert!(lo <= hi);
        if hi == 0 || body == self.eps_id {
            return self.eps_id;
        }
        if body == self.empty_id {
            return if lo == 0 { self.eps_id } else { self.empty_id };
        }
        if lo == 1 && hi == 1 {
            return body;
        }
        // (r*)* = r*
        if lo == 0 && hi == UNBOUNDED {
            if let ReKind::Loop { body: inner, lo: 0, hi: UNBOUNDED, .. } =
                *self.kind(body)
            {
                return self.mk_loop(inner, 0, UNBOUNDED, lazy);
            }
        }
        self.intern_kind(ReKind::Loop { body, lo, hi, lazy })
    }

    /// `(cond ∧ then) ∨ (¬cond ∧ else)`. A ∅ else-branch lowers to an
    /// intersection.
    pub fn if_then_else(&mut self, cond: ReId, then: ReId, els: ReId) -> ReId {
        if els == self.empty_id {
            return self.intersection(vec![cond, then]);
        }
        if cond == self.empty_id {
            return els;
        }
        if self.is_universal(cond) || then == els {
            return then;
        }
        self.intern_kind(ReKind::IfThenElse { cond, then, els })
    }

    /// The alternatives of an `Or` node with folded entries reconstituted,
    /// or `[id]` for any other node.
    pub fn alternatives(&mut self, id: ReId) -> Vec<ReId> {
        match self.kind(id) {
            ReKind::Or(set) => {
                let set = set.clone();
                self.alternatives_of(&set)
            }
            _ => vec![id],
        }
    }

    pub(crate) fn alternatives_of(&mut self, set: &AltSet) -> Vec<ReId> {
        let mut out: Vec<ReId> = set.members.to_vec();
        for &f in set.folded.iter() {
            let r = self.reconstitute(f);
            out.push(r);
        }
        out
    }

    /// All distinct satisfiable, non-trivial predicates mentioned by
    /// singletons reachable from `root`.
    pub fn collect_predicates(&self, root: ReId) -> Vec<Pred> {
        let mut out = Vec::new();
        let mut seen_preds: HashSet<Pred> = HashSet::new();
        let mut seen: HashSet<ReId> = HashSet::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }
            match self.kind(id) {
                ReKind::Singleton(p) => {
                    if p.is_satisfiable()
                        && !p.is_full()
                        && seen_preds.insert(p.clone())
                    {
                        out.push(p.clone());
                    }
                }
                ReKind::Epsilon
                | ReKind::Anchor(_)
                | ReKind::Watchdog(_) => {}
                ReKind::Concat(a, b) => stack.extend([*a, *b]),
                ReKind::Or(set) => {
                    stack.extend(set.members.iter().copied());
                    for f in set.folded.iter() {
                        stack.extend([f.body, f.tail]);
                    }
                }
                ReKind::And(set) => stack.extend(set.iter().copied()),
                ReKind::Loop { body, .. } => stack.push(*body),
                ReKind::IfThenElse { cond, then, els } => {
                    stack.extend([*cond, *then, *els])
                }
            }
        }
        out
    }

    fn intern_kind(&mut self, kind: ReKind) -> ReId {
        if let Some(&id) = self.intern.get(&kind) {
            return id;
        }
        let node = self.analyze(kind);
        let id = ReId(self.nodes.len() as u32);
        self.intern.insert(node.kind.clone(), id);
        self.nodes.push(node);
        id
    }

    fn analyze(&self, kind: ReKind) -> Node {
        let n = |id: ReId| &self.nodes[id.idx()];
        match &kind {
            ReKind::Singleton(p) => {
                let first = p.clone();
                let fixed = p.is_satisfiable().then_some(1);
                Node {
                    kind,
                    nullable: false,
                    nullable_any_ctx: false,
                    has_anchors: false,
                    has_watchdog: false,
                    fixed_len: fixed,
                    first,
                }
            }
            ReKind::Epsilon => Node {
                kind,
                nullable: true,
                nullable_any_ctx: true,
                has_anchors: false,
                has_watchdog: false,
                fixed_len: Some(0),
                first: Pred::none(),
            },
            ReKind::Anchor(_) => Node {
                kind,
                nullable: false,
                nullable_any_ctx: true,
                has_anchors: true,
                has_watchdog: false,
                fixed_len: Some(0),
                first: Pred::none(),
            },
            ReKind::Watchdog(_) => Node {
                kind,
                nullable: true,
                nullable_any_ctx: true,
                has_anchors: false,
                has_watchdog: true,
                fixed_len: Some(0),
                first: Pred::none(),
            },
            ReKind::Concat(a, b) => {
                let (a, b) = (n(*a), n(*b));
                let first = if a.nullable_any_ctx {
                    a.first.or(&b.first)
                } else {
                    a.first.clone()
                };
                Node {
                    nullable: a.nullable && b.nullable,
                    nullable_any_ctx: a.nullable_any_ctx && b.nullable_any_ctx,
                    has_anchors: a.has_anchors || b.has_anchors,
                    has_watchdog: a.has_watchdog || b.has_watchdog,
                    fixed_len: a
                        .fixed_len
                        .zip(b.fixed_len)
                        .and_then(|(x, y)| x.checked_add(y)),
                    first,
                    kind,
                }
            }
            ReKind::Or(set) => {
                let mut nullable = false;
                let mut nullable_any = false;
                let mut anchors = false;
                let mut watchdog = false;
                let mut first = Pred::none();
                let mut fixed: Option<Option<u32>> = None;
                for &m in set.members.iter() {
                    let m = n(m);
                    nullable |= m.nullable;
                    nullable_any |= m.nullable_any_ctx;
                    anchors |= m.has_anchors;
                    watchdog |= m.has_watchdog;
                    first = first.or(&m.first);
                    fixed = match fixed {
                        None => Some(m.fixed_len),
                        Some(f) if f == m.fixed_len => Some(f),
                        _ => Some(None),
                    };
                }
                for f in set.folded.iter() {
                    let (body, tail) = (n(f.body), n(f.tail));
                    nullable |= tail.nullable;
                    nullable_any |= tail.nullable_any_ctx;
                    anchors |= body.has_anchors || tail.has_anchors;
                    watchdog |= body.has_watchdog || tail.has_watchdog;
                    first = first.or(&body.first).or(&tail.first);
                    fixed = Some(None);
                }
                Node {
                    kind,
                    nullable,
                    nullable_any_ctx: nullable_any,
                    has_anchors: anchors,
                    has_watchdog: watchdog,
                    fixed_len: fixed.flatten(),
                    first,
                }
            }
            ReKind::And(set) => {
                let mut nullable = true;
                let mut nullable_any = true;
                let mut anchors = false;
                let mut watchdog = false;
                let mut first = Pred::any();
                let mut fixed = None;
                for &m in set.iter() {
                    let m = n(m);
                    nullable &= m.nullable;
                    nullable_any &= m.nullable_any_ctx;
                    anchors |= m.has_anchors;
                    watchdog |= m.has_watchdog;
                    first = first.and(&m.first);
                    fixed = fixed.or(m.fixed_len);
                }
                Node {
                    kind,
                    nullable,
                    nullable_any_ctx: nullable_any,
                    has_anchors: anchors,
                    has_watchdog: watchdog,
                    fixed_len: fixed,
                    first,
                }
            }
            ReKind::Loop { body, lo, hi, .. } => {
                let b = n(*body);
                Node {
                    nullable: *lo == 0 || b.nullable,
                    nullable_any_ctx: *lo == 0 || b.nullable_any_ctx,
                    has_anchors: b.has_anchors,
                    has_watchdog: b.has_watchdog,
                    fixed_len: (lo == hi && *hi != UNBOUNDED)
                        .then(|| b.fixed_len.and_then(|f| f.checked_mul(*lo)))
                        .flatten(),
                    first: b.first.clone(),
                    kind,
                }
            }
            ReKind::IfThenElse { cond, then, els } => {
                let (c, t, e) = (n(*cond), n(*then), n(*els));
                Node {
                    nullable: if c.nullable { t.nullable } else { e.nullable },
                    nullable_any_ctx: if c.nullable_any_ctx {
                        t.nullable_any_ctx
                    } else {
                        e.nullable_any_ctx
                    },
                    has_anchors: c.has_anchors
                        || t.has_anchors
                        || e.has_anchors,
                    has_watchdog: c.has_watchdog
                        || t.has_watchdog
                        || e.has_watchdog,
                    fixed_len: (t.fixed_len == e.fixed_len)
                        .then_some(t.fixed_len)
                        .flatten(),
                    first: c.first.and(&t.first).or(&e.first),
                    kind,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chars(b: &mut ReBuilder, s: &str) -> Vec<ReId> {
        s.chars().map(|c| b.singleton(Pred::char(c))).collect()
    }

    #[test]
    fn hash_cons_identity() {
        let mut b = ReBuilder::new();
        let xs = chars(&mut b, "abc");
        let r1 = b.concat_all(xs.clone());
        let r2 = b.concat_all(xs);
        assert_eq!(r1, r2);

        let a = b.singleton(Pred::char('a'));
        let l1 = b.repetition(a, 2, Some(4), false).unwrap();
        let l2 = b.repetition(a, 2, Some(4), false).unwrap();
        assert_eq!(l1, l2);
        assert_ne!(l1, r1);
    }

    #[test]
    fn concat_units() {
        let mut b = ReBuilder::new();
        let a = b.singleton(Pred::char('a'));
        let eps = b.epsilon();
        let nil = b.nothing();
        assert_eq!(b.concat(eps, a), a);
        assert_eq!(b.concat(a, eps), a);
        assert_eq!(b.concat(nil, a), nil);
        assert_eq!(b.concat(a, nil), nil);
    }

    #[test]
    fn concat_right_threaded() {
        let mut b = ReBuilder::new();
        let xs = chars(&mut b, "abcd");
        // Build left-nested, expect the same node as right-nested.
        let left = {
            let ab = b.concat(xs[0], xs[1]);
            let abc = b.concat(ab, xs[2]);
            b.concat(abc, xs[3])
        };
        let right = b.concat_all(xs.clone());
        assert_eq!(left, right);
        match b.kind(right) {
            ReKind::Concat(hd, _) => {
                assert!(!matches!(b.kind(*hd), ReKind::Concat(..)))
            }
            k => panic!("expected concat, got {:?}", k),
        }
    }

    #[test]
    fn alternation_laws() {
        let mut b = ReBuilder::new();
        let a = b.singleton(Pred::char('a'));
        let c = b.singleton(Pred::char('c'));
        let nil = b.nothing();
        let top = b.dot_star();

        // ∅ is a unit, singleton sets collapse, duplicates vanish.
        assert_eq!(b.alternation(vec![a, nil]), a);
        assert_eq!(b.alternation(vec![a, a]), a);
        assert_eq!(b.alternation(vec![]), nil);
        // ⊤ absorbs.
        assert_eq!(b.alternation(vec![a, top, c]), top);
        // Commutative.
        let ac = b.alternation(vec![a, c]);
        let ca = b.alternation(vec![c, a]);
        assert_eq!(ac, ca);
    }

    #[test]
    fn alternation_folds_bounded_zero_loops() {
        let mut b = ReBuilder::new();
        let a = b.singleton(Pred::char('a'));
        let t = b.singleton(Pred::char('t'));
        let l3 = b.repetition(a, 0, Some(3), false).unwrap();
        let l5 = b.repetition(a, 0, Some(5), false).unwrap();
        let c3 = b.concat(l3, t);
        let c5 = b.concat(l5, t);

        // a{0,3}t | a{0,5}t folds to the single entry a{0,5}t.
        let or = b.alternation(vec![c3, c5]);
        assert_eq!(or, c5);

        // With a third unrelated member the fold lives inside the set.
        let z = b.singleton(Pred::char('z'));
        let or = b.alternation(vec![c3, c5, z]);
        match b.kind(or) {
            ReKind::Or(set) => {
                assert_eq!(set.members.as_ref(), &[z]);
                assert_eq!(set.folded.len(), 1);
                assert_eq!(set.folded[0].hi, 5);
                assert_eq!(set.folded[0].tail, t);
            }
            k => panic!("expected or, got {:?}", k),
        }
        // Reconstitution is exact.
        let alts = b.alternatives(or);
        assert!(alts.contains(&z) && alts.contains(&c5));
    }

    #[test]
    fn intersection_laws() {
        let mut b = ReBuilder::new();
        let a = b.singleton(Pred::char('a'));
        let nil = b.nothing();
        let top = b.dot_star();
        let ab = {
            let x = b.singleton(Pred::char('a'));
            let y = b.singleton(Pred::char('b'));
            b.concat(x, y)
        };

        assert_eq!(b.intersection(vec![a, nil]), nil);
        assert_eq!(b.intersection(vec![a, top]), a);
        assert_eq!(b.intersection(vec![]), top);
        assert_eq!(b.intersection(vec![ab, ab]), ab);

        // Disjoint singletons intersect to ∅.
        let z = b.singleton(Pred::char('z'));
        assert_eq!(b.intersection(vec![a, z]), nil);
        // Overlapping singletons intersect by predicate.
        let az = b.singleton(Pred::range('a' as u32, 'z' as u32));
        assert_eq!(b.intersection(vec![a, az]), a);
    }

    #[test]
    fn loop_degenerations() {
        let mut b = ReBuilder::new();
        let a = b.singleton(Pred::char('a'));
        let eps = b.epsilon();
        let nil = b.nothing();

        assert_eq!(b.repetition(a, 0, Some(0), false).unwrap(), eps);
        assert_eq!(b.repetition(a, 1, Some(1), false).unwrap(), a);
        assert_eq!(b.repetition(eps, 3, Some(7), false).unwrap(), eps);
        assert_eq!(b.repetition(nil, 0, Some(7), false).unwrap(), eps);
        assert_eq!(b.repetition(nil, 2, Some(7), false).unwrap(), nil);
        assert!(b.repetition(a, 5, Some(2), false).is_err());

        // (a*)* = a*
        let star = b.repetition(a, 0, None, false).unwrap();
        let star2 = b.repetition(star, 0, None, false).unwrap();
        assert_eq!(star, star2);
    }

    #[test]
    fn if_then_else_lowering() {
        let mut b = ReBuilder::new();
        let a = b.singleton(Pred::char('a'));
        let t = b.singleton(Pred::char('t'));
        let e = b.singleton(Pred::char('e'));
        let nil = b.nothing();
        let top = b.dot_star();

        let and = b.intersection(vec![a, t]);
        assert_eq!(b.if_then_else(a, t, nil), and);
        assert_eq!(b.if_then_else(nil, t, e), e);
        assert_eq!(b.if_then_else(top, t, e), t);
        assert_eq!(b.if_then_else(a, t, t), t);
    }

    #[test]
    fn cached_properties() {
        let mut b = ReBuilder::new();
        let a = b.singleton(Pred::char('a'));
        let d = b.singleton(Pred::range('0' as u32, '9' as u32));
        let ad = b.concat(a, d);
        assert!(!b.is_nullable(ad));
        assert_eq!(b.fixed_len(ad), Some(2));
        assert_eq!(b.first_set(ad), &Pred::char('a'));

        let opt = b.repetition(a, 0, Some(1), false).unwrap();
        let oad = b.concat(opt, d);
        assert!(b.first_set(oad).contains('a'));
        assert!(b.first_set(oad).contains('5'));
        assert_eq!(b.fixed_len(oad), None);

        let star = b.repetition(ad, 0, None, false).unwrap();
        assert!(b.is_nullable(star));

        let anc = b.anchor(Anchor::StartLine);
        let anchored = b.concat(anc, ad);
        assert!(b.contains_anchors(anchored));
        assert!(!b.contains_anchors(ad));
        assert_eq!(b.fixed_len(anchored), Some(2));
    }

    #[test]
    fn collect_predicates_dedupes() {
        let mut b = ReBuilder::new();
        let a1 = b.singleton(Pred::char('a'));
        let a2 = b.singleton(Pred::char('a'));
        let d = b.singleton(Pred::range('0' as u32, '9' as u32));
        let c1 = b.concat(a1, d);
        let r = b.alternation(vec![c1, a2]);
        let preds = b.collect_predicates(r);
        assert_eq!(preds.len(), 2);
    }
}
