/*!
The lazily constructed DFA over minterm ids.

A state is an interned `(regex, begin-context)` pair; its transition row is
filled on demand by taking a border derivative for the conditions holding at
the current position followed by the character derivative of the consumed
minterm. Rows of the root states are pinned; everything else can be evicted
when the configured transition cap trips, and is recomputed
deterministically on demand.
*/

use std::collections::HashMap;

use crate::{
    pred::{MintermId, Minterms},
    re::{derive::BorderCtx, ReBuilder, ReId},
};

pub(crate) type StateId = u32;

const UNFILLED: StateId = StateId::MAX;

pub(crate) struct State {
    pub re: ReId,
    /// Begin-side border bits of the position this state is entered at.
    pub bits: u8,
    /// The canonical empty language: no continuation can accept.
    pub dead: bool,
    /// Committed match length if an accepting path passes a watchdog.
    pub watchdog: Option<u32>,
    /// Memoized finality per end context: none, end-of-line, end-of-text.
    finals: [Option<bool>; 3],
}

pub(crate) struct Dfa {
    states: Vec<State>,
    intern: HashMap<(ReId, u8), StateId>,
    /// Flat `state × minterm` next-state table.
    trans: Vec<StateId>,
    minterm_count: usize,
    /// The minterm that fires line borders. `None` when the regex has no
    /// anchors, so states need not split on line bookkeeping.
    newline: Option<MintermId>,
    filled: usize,
    /// States whose rows survive eviction.
    pinned: usize,
}

fn end_idx(end_bits: u8) -> usize {
    if end_bits & BorderCtx::END_TEXT != 0 {
        2
    } else if end_bits & BorderCtx::END_LINE != 0 {
        1
    } else {
        0
    }
}

impl Dfa {
    pub fn new(minterm_count: usize, newline: Option<MintermId>) -> Dfa {
        Dfa {
            states: Vec::new(),
            intern: HashMap::new(),
            trans: Vec::new(),
            minterm_count,
            newline,
            filled: 0,
            pinned: 0,
        }
    }

    pub fn state(&self, q: StateId) -> &State {
        &self.states[q as usize]
    }

    pub fn intern(&mut self, b: &ReBuilder, re: ReId, bits: u8) -> StateId {
        if let Some(&q) = self.intern.get(&(re, bits)) {
            return q;
        }
        let q = self.states.len() as StateId;
        self.states.push(State {
            re,
            bits,
            dead: re == b.nothing(),
            watchdog: b.watchdog_len(re),
            finals: [None; 3],
        });
        self.trans.extend(std::iter::repeat(UNFILLED).take(self.minterm_count));
        self.intern.insert((re, bits), q);
        q
    }

    /// Marks every state interned so far as a pinned root.
    pub fn seal_pinned(&mut self) {
        self.pinned = self.states.len();
    }

    /// The transition of `q` over minterm `m`, memoized. `cache_limit`
    /// bounds the number of retained transitions.
    pub fn next(
        &mut self,
        b: &mut ReBuilder,
        minterms: &Minterms,
        q: StateId,
        m: MintermId,
        cache_limit: Option<usize>,
    ) -> StateId {
        let slot = q as usize * self.minterm_count + m as usize;
        let cached = self.trans[slot];
        if cached != UNFILLED {
            return cached;
        }

        let (re, bits) = {
            let st = &self.states[q as usize];
            (st.re, st.bits)
        };
        // Border conditions holding before the character is consumed: the
        // state's begin bits, plus end-of-line when the character is `\n`.
        let mut ctx = BorderCtx(bits);
        if self.newline == Some(m) {
            ctx = ctx.with(BorderCtx::END_LINE);
        }
        let resolved = if b.contains_anchors(re) {
            b.derivative_border(ctx, re)
        } else {
            re
        };
        let derived = b.derivative(minterms.witness(m), resolved);
        let next_bits = if self.newline == Some(m) {
            BorderCtx::BEGIN_LINE
        } else {
            0
        };
        let q2 = self.intern(b, derived, next_bits);

        if let Some(cap) = cache_limit {
            if self.filled >= cap.max(1) {
                self.evict();
            }
        }
        self.trans[q as usize * self.minterm_count + m as usize] = q2;
        self.filled += 1;
        q2
    }

    /// Whether `q` accepts under the given end-side border bits.
    pub fn is_final(
        &mut self,
        b: &ReBuilder,
        q: StateId,
        end_bits: u8,
    ) -> bool {
        let i = end_idx(end_bits);
        if let Some(v) = self.states[q as usize].finals[i] {
            return v;
        }
        let st = &self.states[q as usize];
        let v = if b.contains_anchors(st.re) {
            b.nullable_in(st.re, BorderCtx(st.bits | end_bits))
        } else {
            b.is_nullable(st.re)
        };
        self.states[q as usize].finals[i] = Some(v);
        v
    }

    /// Drops every non-pinned transition. States stay interned, so ids held
    /// by an in-flight scan remain valid and rows refill deterministically.
    fn evict(&mut self) {
        let keep = self.pinned * self.minterm_count;
        let keep = keep.min(self.trans.len());
        for t in self.trans[keep..].iter_mut() {
            *t = UNFILLED;
        }
        self.filled =
            self.trans[..keep].iter().filter(|&&t| t != UNFILLED).count();
        log!(log::debug!(
            "evicted transition cache down to {} pinned entries",
            self.filled
        ));
    }

    #[cfg(test)]
    pub(crate) fn state_count(&self) -> usize {
        self.states.len()
    }
}
