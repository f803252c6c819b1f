/*!
The matcher driver: compiled [`Regex`] values and the scan loops.

Match location is a three-pass derivative scan over the lazily built DFA:

1. a *seek* pass with the `(?s:.)*?`-prefixed pattern runs forward from the
   search position and stops at the earliest position where the state
   accepts — the earliest match end;
2. if that state committed a watchdog (fixed-length patterns), the match is
   the last `n` characters before the end and the remaining passes are
   skipped;
3. otherwise a reverse pass with the reversed pattern walks left from the
   end to the leftmost accepting start, and a final forward pass with the
   plain pattern extends from that start to the latest accepting end.

Anchors are threaded as border bits: states carry the begin-side conditions
of their position, end-side conditions come from one character of lookahead,
and crossing `\n` fires the line borders.
*/

use std::sync::{Arc, Mutex, MutexGuard};

use crate::{
    dfa::Dfa,
    error::Error,
    pred::{Minterms, Pred},
    re::{self, derive::BorderCtx, ReBuilder, ReId},
    syntax,
};

mod matches;
#[cfg(feature = "perf-literal")]
mod prefilter;

pub use matches::Match;

#[cfg(feature = "perf-literal")]
use prefilter::Prefilter;

/// Compile-time configuration of a [`Regex`].
///
/// # Example
///
/// ```
/// use symre::{Config, Regex};
///
/// let config = Config::builder().ignore_case(true).multiline(true).build();
/// let re = Regex::with_config("^abc", config).unwrap();
/// assert!(re.is_match("xyz\nABCdef"));
/// ```
#[derive(Clone, Debug, bon::Builder)]
pub struct Config {
    /// Case folding of singletons: every literal and class is closed under
    /// simple Unicode case folding (ASCII folding without the `unicode`
    /// feature).
    #[builder(default)]
    pub ignore_case: bool,
    /// `^`/`$` match at `\n` boundaries in addition to the haystack
    /// boundaries.
    #[builder(default)]
    pub multiline: bool,
    /// `.` matches every code point, including `\n`.
    #[builder(default)]
    pub singleline: bool,
    /// Enables the fixed-prefix substring prefilter in the seek pass.
    /// Requires the `perf-literal` feature to have an effect.
    #[builder(default)]
    pub vectorize: bool,
    /// Maximum number of retained DFA transitions before the non-root part
    /// of the transition cache is dropped and rebuilt on demand. Unbounded
    /// by default.
    pub state_cache_limit: Option<usize>,
    /// Cooperative step budget, checked once per scanned character. When it
    /// runs out, the `try_*` search APIs return
    /// [`Error::MatchAborted`]. No budget by default.
    pub step_limit: Option<usize>,
}

impl Default for Config {
    fn default() -> Config {
        Config::builder().build()
    }
}

/// A compiled symbolic regular expression.
///
/// A pattern is compiled into a hash-consed symbolic AST whose transitions
/// are labelled with code point predicates; matching runs a lazily
/// determinized derivative DFA over the minterms of those predicates, in
/// time linear in the haystack and independent of character class
/// complexity.
///
/// # Example
///
/// ```
/// use symre::Regex;
///
/// let re = Regex::new(r"a{2,4}").unwrap();
/// let spans: Vec<(usize, usize)> =
///     re.find_iter("..aaaaaaaaaaa..").map(|m| (m.start(), m.len())).collect();
/// assert_eq!(spans, vec![(2, 4), (6, 4), (10, 3)]);
/// ```
///
/// # Synchronization
///
/// The compiled AST and minterm classifier are immutable; the only mutable
/// state is the lazily filled transition cache, held in a [`Cache`]. The
/// high-level APIs (`is_match`, `find`, `find_iter`) guard an internal
/// cache with a mutex, so a `Regex` is freely shareable across threads.
/// For lock-free searching, create per-thread caches with
/// [`Regex::create_cache`] and use the `try_*` APIs; cloning a `Regex` is
/// cheap and gives the clone its own internal cache.
///
/// # Panics
///
/// When [`Config::step_limit`] is set, the high-level APIs panic if the
/// budget runs out mid-search; use the `try_*` APIs to observe
/// [`Error::MatchAborted`] instead.
pub struct Regex {
    imp: Arc<RegexI>,
    cache: Mutex<Cache>,
}

struct RegexI {
    /// Frozen after compilation; caches clone it and grow their copies with
    /// derived nodes.
    builder: ReBuilder,
    /// The compiled pattern, with a watchdog commit marker appended when
    /// the pattern has a fixed length.
    root: ReId,
    /// The pattern without the marker; serialization externalizes this.
    root_plain: ReId,
    root_rev: ReId,
    root_seek: ReId,
    minterms: Minterms,
    /// Whether border bookkeeping is needed at all.
    track_borders: bool,
    #[cfg(feature = "perf-literal")]
    prefilter: Option<Prefilter>,
    config: Config,
}

/// Mutable scratch state for searching: the derived-node arena extension
/// and the lazy DFA. Created by [`Regex::create_cache`]; contents are
/// deterministic, so dropping a cache only costs recomputation.
pub struct Cache {
    builder: ReBuilder,
    dfa: Dfa,
}

impl Cache {
    fn new(imp: &RegexI) -> Cache {
        let builder = imp.builder.clone();
        let newline = imp.track_borders.then(|| imp.minterms.newline());
        let mut dfa = Dfa::new(imp.minterms.len(), newline);
        let all = BorderCtx::BEGIN_TEXT | BorderCtx::BEGIN_LINE;
        for bits in [all, BorderCtx::BEGIN_LINE, 0] {
            for root in [imp.root_seek, imp.root, imp.root_rev] {
                dfa.intern(&builder, root, bits);
            }
        }
        dfa.seal_pinned();
        Cache { builder, dfa }
    }
}

fn compile(
    mut builder: ReBuilder,
    root: ReId,
    config: Config,
) -> Result<Regex, Error> {
    let root_plain = root;
    let root = match builder.fixed_len(root) {
        Some(n) if !builder.contains_watchdog(root) => {
            let wd = builder.watchdog(n);
            builder.concat(root, wd)
        }
        _ => root,
    };
    let root_rev = builder.reverse(root_plain);
    let any = builder.singleton(Pred::any());
    let seek_star = builder.mk_loop(any, 0, re::UNBOUNDED, true);
    let root_seek = builder.concat(seek_star, root);

    let track_borders = builder.contains_anchors(root_seek)
        || builder.contains_anchors(root_rev);
    let mut preds = builder.collect_predicates(root_seek);
    for p in builder.collect_predicates(root_rev) {
        if !preds.contains(&p) {
            preds.push(p);
        }
    }
    if track_borders {
        let nl = Pred::char('\n');
        if !preds.contains(&nl) {
            preds.push(nl);
        }
    }
    let minterms = Minterms::new(&preds)?;

    #[cfg(feature = "perf-literal")]
    let prefilter = if config.vectorize {
        Prefilter::from_root(&builder, root_plain)
    } else {
        None
    };

    log!(log::debug!(
        "compiled symbolic regex: {} nodes, {} minterms",
        builder.len(),
        minterms.len()
    ));

    let imp = Arc::new(RegexI {
        builder,
        root,
        root_plain,
        root_rev,
        root_seek,
        minterms,
        track_borders,
        #[cfg(feature = "perf-literal")]
        prefilter,
        config,
    });
    let cache = Cache::new(&imp);
    Ok(Regex { imp, cache: Mutex::new(cache) })
}

impl Regex {
    /// Compiles a pattern with the default configuration.
    pub fn new(pattern: &str) -> Result<Regex, Error> {
        Regex::with_config(pattern, Config::default())
    }

    /// Compiles a pattern with the given configuration.
    pub fn with_config(pattern: &str, config: Config) -> Result<Regex, Error> {
        let hir = syntax::parse(pattern, &config)?;
        Regex::from_hir(&hir, config)
    }

    /// Builds a `Regex` directly from a `regex_syntax` [`Hir`](syntax::Hir).
    ///
    /// `multiline` and `singleline` only apply at parse time, so they are
    /// ignored here; `ignore_case` still applies to the translated
    /// singletons.
    pub fn from_hir(hir: &syntax::Hir, config: Config) -> Result<Regex, Error> {
        let mut builder = ReBuilder::new();
        let root = syntax::translate(&mut builder, hir, config.ignore_case)?;
        compile(builder, root, config)
    }

    /// Builds a `Regex` from a hand-constructed symbolic AST. `root` must
    /// be an id of `builder`.
    pub fn from_ast(
        builder: ReBuilder,
        root: ReId,
        config: Config,
    ) -> Result<Regex, Error> {
        if !builder.contains(root) {
            return Err(Error::invalid("AST root does not belong to builder"));
        }
        compile(builder, root, config)
    }

    /// Rebuilds a `Regex` from [`Regex::serialize`] output. The DFA is
    /// always rebuilt; only the AST is externalized.
    pub fn from_serialized(
        text: &str,
        config: Config,
    ) -> Result<Regex, Error> {
        const TAG: &str = "v1:";
        let body = text
            .strip_prefix(TAG)
            .ok_or(Error::InvalidFormat { at: 0 })?;
        let mut builder = ReBuilder::new();
        let root =
            re::serialize::deserialize(&mut builder, body).map_err(|e| {
                match e {
                    Error::InvalidFormat { at } => {
                        Error::InvalidFormat { at: at + TAG.len() }
                    }
                    e => e,
                }
            })?;
        compile(builder, root, config)
    }

    /// The `v1:`-tagged textual form of the compiled AST.
    pub fn serialize(&self) -> String {
        format!(
            "v1:{}",
            re::serialize::serialize(&self.imp.builder, self.imp.root_plain)
        )
    }

    /// Creates a fresh scratch cache for the `try_*` search APIs.
    pub fn create_cache(&self) -> Cache {
        Cache::new(&self.imp)
    }

    /// Returns true if and only if the pattern matches somewhere in the
    /// haystack. Stops at the earliest accepting position, so this can be
    /// much cheaper than [`Regex::find`].
    pub fn is_match(&self, haystack: &str) -> bool {
        let mut cache = self.lock_cache();
        self.try_is_match(&mut cache, haystack)
            .expect("step budget exhausted; use try_is_match")
    }

    /// Finds the leftmost match, if any.
    pub fn find(&self, haystack: &str) -> Option<Match> {
        let mut cache = self.lock_cache();
        self.try_find(&mut cache, haystack)
            .expect("step budget exhausted; use try_find")
    }

    /// An iterator over all non-overlapping matches, in increasing start
    /// order. Each match begins at the first position at or past the end of
    /// the previous one (one character past it for empty matches).
    pub fn find_iter<'r, 'h>(&'r self, haystack: &'h str) -> Matches<'r, 'h> {
        Matches { re: self, haystack, at: 0 }
    }

    /// Fallible [`Regex::is_match`] against an explicit cache.
    pub fn try_is_match(
        &self,
        cache: &mut Cache,
        haystack: &str,
    ) -> Result<bool, Error> {
        let mut steps = 0;
        Ok(self.seek_end(cache, haystack, 0, &mut steps)?.is_some())
    }

    /// Fallible [`Regex::find`] against an explicit cache.
    pub fn try_find(
        &self,
        cache: &mut Cache,
        haystack: &str,
    ) -> Result<Option<Match>, Error> {
        self.find_at(cache, haystack, 0)
    }

    /// Fallible [`Regex::find_iter`] against an explicit cache.
    pub fn try_find_iter<'r, 'c, 'h>(
        &'r self,
        cache: &'c mut Cache,
        haystack: &'h str,
    ) -> TryMatches<'r, 'c, 'h> {
        TryMatches { re: self, cache, haystack, at: 0 }
    }

    fn lock_cache(&self) -> MutexGuard<'_, Cache> {
        // A panic while holding the lock leaves only a stale scratch cache
        // behind; recomputation is deterministic, so keep using it.
        self.cache.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn find_at(
        &self,
        cache: &mut Cache,
        haystack: &str,
        start: usize,
    ) -> Result<Option<Match>, Error> {
        let mut steps = 0;
        let (end, watchdog) =
            match self.seek_end(cache, haystack, start, &mut steps)? {
                None => return Ok(None),
                Some(found) => found,
            };
        if let Some(n) = watchdog {
            let mstart = step_back_chars(haystack, end, n as usize);
            debug_assert!(mstart >= start);
            return Ok(Some(Match::new(mstart, end)));
        }
        let mstart =
            self.rev_start(cache, haystack, start, end, &mut steps)?;
        let mend = self.anchored_end(cache, haystack, mstart, &mut steps)?;
        Ok(Some(Match::new(mstart, mend)))
    }

    /// Pass 1: forward with the seek pattern, stopping at the earliest
    /// accepting position. Returns the match end and the watchdog length
    /// committed there, if any.
    fn seek_end(
        &self,
        cache: &mut Cache,
        haystack: &str,
        start: usize,
        steps: &mut usize,
    ) -> Result<Option<(usize, Option<u32>)>, Error> {
        let imp = &*self.imp;
        let Cache { builder, dfa } = cache;
        let mut q =
            dfa.intern(builder, imp.root_seek, begin_bits(haystack, start));
        if dfa.state(q).dead {
            return Ok(None);
        }
        if dfa.is_final(builder, q, end_bits(haystack, start)) {
            return Ok(Some((start, dfa.state(q).watchdog)));
        }
        let mut pos = start;
        while pos < haystack.len() {
            #[cfg(feature = "perf-literal")]
            if let Some(pf) = &imp.prefilter {
                if dfa.state(q).re == imp.root_seek {
                    match pf.find(haystack[pos..].as_bytes()) {
                        Some(0) => {}
                        Some(off) => {
                            pos += off;
                            q = dfa.intern(
                                builder,
                                imp.root_seek,
                                begin_bits(haystack, pos),
                            );
                        }
                        None => return Ok(None),
                    }
                }
            }
            let c = char_at(haystack, pos)?;
            self.bump_step(steps, pos)?;
            let m = imp.minterms.classify(c);
            q = dfa.next(
                builder,
                &imp.minterms,
                q,
                m,
                imp.config.state_cache_limit,
            );
            pos += c.len_utf8();
            if dfa.state(q).dead {
                return Ok(None);
            }
            if dfa.is_final(builder, q, end_bits(haystack, pos)) {
                return Ok(Some((pos, dfa.state(q).watchdog)));
            }
        }
        Ok(None)
    }

    /// Pass 2: reverse from the match end down to `floor`, tracking the
    /// leftmost accepting position.
    fn rev_start(
        &self,
        cache: &mut Cache,
        haystack: &str,
        floor: usize,
        end: usize,
        steps: &mut usize,
    ) -> Result<usize, Error> {
        let imp = &*self.imp;
        let Cache { builder, dfa } = cache;
        let mut q =
            dfa.intern(builder, imp.root_rev, rev_begin_bits(haystack, end));
        let mut best = dfa
            .is_final(builder, q, rev_end_bits(haystack, end))
            .then_some(end);
        let mut pos = end;
        while pos > floor {
            if dfa.state(q).dead {
                break;
            }
            let c = char_before(haystack, pos)?;
            self.bump_step(steps, pos)?;
            let m = imp.minterms.classify(c);
            q = dfa.next(
                builder,
                &imp.minterms,
                q,
                m,
                imp.config.state_cache_limit,
            );
            pos -= c.len_utf8();
            if dfa.is_final(builder, q, rev_end_bits(haystack, pos)) {
                best = Some(pos);
            }
        }
        best.ok_or(Error::Internal { detail: "reverse scan lost the match" })
    }

    /// Pass 3: forward from the match start with the plain pattern,
    /// tracking the latest accepting position.
    fn anchored_end(
        &self,
        cache: &mut Cache,
        haystack: &str,
        start: usize,
        steps: &mut usize,
    ) -> Result<usize, Error> {
        let imp = &*self.imp;
        let Cache { builder, dfa } = cache;
        let mut q =
            dfa.intern(builder, imp.root, begin_bits(haystack, start));
        let mut best = dfa
            .is_final(builder, q, end_bits(haystack, start))
            .then_some(start);
        let mut pos = start;
        while pos < haystack.len() {
            if dfa.state(q).dead {
                break;
            }
            let c = char_at(haystack, pos)?;
            self.bump_step(steps, pos)?;
            let m = imp.minterms.classify(c);
            q = dfa.next(
                builder,
                &imp.minterms,
                q,
                m,
                imp.config.state_cache_limit,
            );
            pos += c.len_utf8();
            if dfa.is_final(builder, q, end_bits(haystack, pos)) {
                best = Some(pos);
            }
        }
        best.ok_or(Error::Internal { detail: "forward scan lost the match" })
    }

    fn bump_step(&self, steps: &mut usize, at: usize) -> Result<(), Error> {
        *steps += 1;
        match self.imp.config.step_limit {
            Some(limit) if *steps > limit => Err(Error::MatchAborted { at }),
            _ => Ok(()),
        }
    }
}

impl Clone for Regex {
    fn clone(&self) -> Regex {
        Regex {
            imp: Arc::clone(&self.imp),
            cache: Mutex::new(Cache::new(&self.imp)),
        }
    }
}

impl std::fmt::Debug for Regex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Regex")
            .field("minterms", &self.imp.minterms.len())
            .finish_non_exhaustive()
    }
}

/// Iterator over non-overlapping matches. See [`Regex::find_iter`].
#[derive(Debug)]
pub struct Matches<'r, 'h> {
    re: &'r Regex,
    haystack: &'h str,
    at: usize,
}

impl Iterator for Matches<'_, '_> {
    type Item = Match;

    fn next(&mut self) -> Option<Match> {
        if self.at > self.haystack.len() {
            return None;
        }
        let m = {
            let mut cache = self.re.lock_cache();
            self.re
                .find_at(&mut cache, self.haystack, self.at)
                .expect("step budget exhausted; use try_find_iter")?
        };
        self.at = next_search_position(self.haystack, m);
        Some(m)
    }
}

/// Fallible iterator over non-overlapping matches. See
/// [`Regex::try_find_iter`].
pub struct TryMatches<'r, 'c, 'h> {
    re: &'r Regex,
    cache: &'c mut Cache,
    haystack: &'h str,
    at: usize,
}

impl Iterator for TryMatches<'_, '_, '_> {
    type Item = Result<Match, Error>;

    fn next(&mut self) -> Option<Result<Match, Error>> {
        if self.at > self.haystack.len() {
            return None;
        }
        match self.re.find_at(self.cache, self.haystack, self.at) {
            Ok(Some(m)) => {
                self.at = next_search_position(self.haystack, m);
                Some(Ok(m))
            }
            Ok(None) => {
                self.at = self.haystack.len() + 1;
                None
            }
            Err(e) => {
                self.at = self.haystack.len() + 1;
                Some(Err(e))
            }
        }
    }
}

/// The position the next search resumes from: the match end, or one
/// character past it for an empty match.
fn next_search_position(haystack: &str, m: Match) -> usize {
    if m.is_empty() {
        m.end()
            + haystack[m.end()..]
                .chars()
                .next()
                .map_or(1, char::len_utf8)
    } else {
        m.end()
    }
}

fn begin_bits(haystack: &str, pos: usize) -> u8 {
    if pos == 0 {
        BorderCtx::BEGIN_TEXT | BorderCtx::BEGIN_LINE
    } else if haystack.as_bytes()[pos - 1] == b'\n' {
        BorderCtx::BEGIN_LINE
    } else {
        0
    }
}

fn end_bits(haystack: &str, pos: usize) -> u8 {
    if pos == haystack.len() {
        BorderCtx::END_TEXT | BorderCtx::END_LINE
    } else if haystack.as_bytes()[pos] == b'\n' {
        BorderCtx::END_LINE
    } else {
        0
    }
}

/// Begin-side bits of a reverse scan entered at `pos`: the mirror image of
/// [`end_bits`].
fn rev_begin_bits(haystack: &str, pos: usize) -> u8 {
    if pos == haystack.len() {
        BorderCtx::BEGIN_TEXT | BorderCtx::BEGIN_LINE
    } else if haystack.as_bytes()[pos] == b'\n' {
        BorderCtx::BEGIN_LINE
    } else {
        0
    }
}

/// End-side bits of a reverse scan at `pos`: the mirror image of
/// [`begin_bits`].
fn rev_end_bits(haystack: &str, pos: usize) -> u8 {
    if pos == 0 {
        BorderCtx::END_TEXT | BorderCtx::END_LINE
    } else if haystack.as_bytes()[pos - 1] == b'\n' {
        BorderCtx::END_LINE
    } else {
        0
    }
}

fn char_at(haystack: &str, pos: usize) -> Result<char, Error> {
    haystack[pos..]
        .chars()
        .next()
        .ok_or(Error::Internal { detail: "scan ran past the haystack" })
}

fn char_before(haystack: &str, pos: usize) -> Result<char, Error> {
    haystack[..pos]
        .chars()
        .next_back()
        .ok_or(Error::Internal { detail: "reverse scan ran past the floor" })
}

/// Steps `n` characters back from `end`, staying on char boundaries.
fn step_back_chars(haystack: &str, end: usize, n: usize) -> usize {
    let mut pos = end;
    for _ in 0..n {
        match haystack[..pos].chars().next_back() {
            Some(c) => pos -= c.len_utf8(),
            None => break,
        }
    }
    pos
}
