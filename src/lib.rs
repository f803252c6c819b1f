/*!
A symbolic regular expression engine.

Instead of enumerating transitions over individual characters, `symre`
compiles a pattern into a *symbolic* automaton whose transitions are
labelled with predicates over the code point alphabet, and determinizes it
lazily with regex derivatives. Matching runs in time linear in the haystack
and independent of how complex the pattern's character classes are.

## Features
- Predicate transitions: character classes are first-class sets of code
  points with full Boolean algebra, partitioned into [minterms](pred) so
  every run-time decision is a single table lookup.
- Lazy derivative DFA: states are built on demand and hash-consed, so even
  `(ab|x|ba){1,20000}` compiles instantly and explores only the states the
  haystack touches.
- Intersection and conditionals ([`And`](re::ReKind::And),
  [`IfThenElse`](re::ReKind::IfThenElse)) on top of the usual operators,
  available through the [AST builder](re::ReBuilder).
- Anchors (`^`, `$`, `\A`, `\z`) via zero-width border steps; multiline and
  singleline modes.
- A serializable compiled form ([`Regex::serialize`]) that round-trips the
  AST and rebuilds the automaton on load.

Deliberately not supported: capture group extraction, back-references,
look-around and word boundaries. The engine rejects them up front rather
than mis-handle them.

## Usage
```
use symre::{Config, Regex};

let re = Regex::new("bcd|(cc)+|e+").unwrap();
let spans: Vec<(usize, usize)> = re
    .find_iter("cccccbcdeeeee")
    .map(|m| (m.start(), m.len()))
    .collect();
assert_eq!(spans, vec![(0, 4), (5, 3), (8, 5)]);

let re = Regex::with_config(
    "^a{2,4}",
    Config::builder().multiline(true).build(),
).unwrap();
assert!(re.is_match("bbb\naaa"));
```

## Pattern syntax
Patterns are parsed with [`regex-syntax`](https://docs.rs/regex-syntax), so
the accepted syntax is that of the `regex` crate minus the rejected
features above. The engine itself only consumes the abstract syntax: see
[`Regex::from_hir`] and [`Regex::from_ast`] for skipping the parser.

## Crate features
- `unicode` (default): Unicode classes (`\w`, `\p{..}`) and simple case
  folding for case-insensitive matching.
- `perf` / `perf-literal` (default): the fixed-prefix substring prefilter,
  enabled per regex with [`Config::vectorize`].
- `logging`: trace compile and cache events through the `log` crate.
*/
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

#[cfg(feature = "logging")]
macro_rules! log {
    ($($tt:tt)*) => { $($tt)* }
}
#[cfg(not(feature = "logging"))]
macro_rules! log {
    ($($tt:tt)*) => {};
}

mod dfa;
mod error;
pub mod matcher;
pub mod pred;
pub mod re;
pub mod syntax;
pub mod unicode;

pub use crate::{
    error::Error,
    matcher::{Cache, Config, Match, Matches, Regex, TryMatches},
};

#[cfg(test)]
mod tests {
    use crate::{Config, Regex};

    #[test]
    fn end_to_end() {
        let re = Regex::with_config(
            "abc",
            Config::builder().ignore_case(true).build(),
        )
        .unwrap();
        let spans: Vec<(usize, usize)> = re
            .find_iter("xbxabcabxxxxaBCabcxx")
            .map(|m| (m.start(), m.len()))
            .collect();
        assert_eq!(spans, vec![(3, 3), (12, 3), (15, 3)]);

        let text = re.serialize();
        let re2 = Regex::from_serialized(&text, Config::default()).unwrap();
        assert!(re2.is_match("xxabcxx"));
    }
}
