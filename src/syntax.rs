/*!
The pattern front-end: `regex-syntax` parsing and `Hir` → symbolic AST
translation.

The engine's own contract is the AST built by
[`ReBuilder`](crate::re::ReBuilder); pattern strings are a convenience
layered on `regex-syntax`. Multiline and singleline semantics are decided at
parse time (they pick which anchors `^`/`$` denote and whether `.` matches
`\n`), while case insensitivity is applied here so that singletons carry
their case closure as predicates.

Constructs the core deliberately rejects — back-references, look-around,
word boundaries — surface as [`Error::UnsupportedFeature`].
*/

use itertools::Itertools;
use regex_syntax::{
    ast,
    hir::{Class, HirKind, Look},
};

pub use regex_syntax::hir::Hir;

use crate::{
    error::Error,
    matcher::Config,
    pred::Pred,
    re::{Anchor, ReBuilder, ReId},
    unicode,
};

pub(crate) fn parse(pattern: &str, config: &Config) -> Result<Hir, Error> {
    regex_syntax::ParserBuilder::new()
        .multi_line(config.multiline)
        .dot_matches_new_line(config.singleline)
        // Case folding is the engine's job; see `char_pred`.
        .case_insensitive(false)
        .utf8(true)
        .build()
        .parse(pattern)
        .map_err(map_parse_error)
}

fn map_parse_error(e: regex_syntax::Error) -> Error {
    if let regex_syntax::Error::Parse(pe) = &e {
        match pe.kind() {
            ast::ErrorKind::UnsupportedBackreference => {
                return Error::unsupported("back-reference");
            }
            ast::ErrorKind::UnsupportedLookAround => {
                return Error::unsupported("look-around");
            }
            _ => {}
        }
    }
    Error::invalid(e.to_string())
}

pub(crate) fn translate(
    b: &mut ReBuilder,
    hir: &Hir,
    ignore_case: bool,
) -> Result<ReId, Error> {
    match hir.kind() {
        HirKind::Empty => Ok(b.epsilon()),
        HirKind::Literal(lit) => {
            let s = std::str::from_utf8(&lit.0)
                .map_err(|_| Error::invalid("non-UTF-8 literal in pattern"))?;
            let ids: Vec<ReId> = s
                .chars()
                .map(|c| {
                    let p = char_pred(c, ignore_case);
                    b.singleton(p)
                })
                .collect();
            Ok(b.concat_all(ids))
        }
        HirKind::Class(Class::Unicode(cls)) => {
            let p = Pred::ranges(
                cls.ranges().iter().map(|r| (r.start() as u32, r.end() as u32)),
            );
            Ok(b.singleton(close_case(p, ignore_case)))
        }
        HirKind::Class(Class::Bytes(cls)) => {
            let p = Pred::ranges(
                cls.ranges().iter().map(|r| (r.start() as u32, r.end() as u32)),
            );
            Ok(b.singleton(close_case(p, ignore_case)))
        }
        HirKind::Look(look) => match look {
            Look::Start => Ok(b.anchor(Anchor::StartText)),
            Look::End => Ok(b.anchor(Anchor::EndText)),
            Look::StartLF => Ok(b.anchor(Anchor::StartLine)),
            Look::EndLF => Ok(b.anchor(Anchor::EndLine)),
            Look::StartCRLF | Look::EndCRLF => {
                Err(Error::unsupported("CRLF line anchors"))
            }
            _ => Err(Error::unsupported("word boundary")),
        },
        HirKind::Repetition(rep) => {
            let body = translate(b, &rep.sub, ignore_case)?;
            b.repetition(body, rep.min, rep.max, !rep.greedy)
        }
        // Groups only group; captures are not resolved by this engine.
        HirKind::Capture(cap) => translate(b, &cap.sub, ignore_case),
        HirKind::Concat(subs) => {
            let ids: Vec<ReId> = subs
                .iter()
                .map(|h| translate(b, h, ignore_case))
                .try_collect()?;
            Ok(b.concat_all(ids))
        }
        HirKind::Alternation(subs) => {
            let ids: Vec<ReId> = subs
                .iter()
                .map(|h| translate(b, h, ignore_case))
                .try_collect()?;
            Ok(b.alternation(ids))
        }
    }
}

fn char_pred(c: char, ignore_case: bool) -> Pred {
    close_case(Pred::char(c), ignore_case)
}

fn close_case(p: Pred, ignore_case: bool) -> Pred {
    if ignore_case {
        unicode::case_closure(&p)
    } else {
        p
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(pattern: &str, config: &Config) -> Result<ReId, Error> {
        let hir = parse(pattern, config)?;
        let mut b = ReBuilder::new();
        translate(&mut b, &hir, config.ignore_case)
    }

    #[test]
    fn anchors_depend_on_multiline() {
        let plain = Config::default();
        let hir = parse("^a$", &plain).unwrap();
        let mut b = ReBuilder::new();
        let re = translate(&mut b, &hir, false).unwrap();
        let a = b.singleton(Pred::char('a'));
        let sot = b.anchor(Anchor::StartText);
        let eot = b.anchor(Anchor::EndText);
        let tail = b.concat(a, eot);
        assert_eq!(re, b.concat(sot, tail));

        let ml = Config::builder().multiline(true).build();
        let hir = parse("^a$", &ml).unwrap();
        let re = translate(&mut b, &hir, false).unwrap();
        let bol = b.anchor(Anchor::StartLine);
        let eol = b.anchor(Anchor::EndLine);
        let tail = b.concat(a, eol);
        assert_eq!(re, b.concat(bol, tail));
    }

    #[test]
    fn dot_depends_on_singleline() {
        let mut b = ReBuilder::new();
        let plain = parse(".", &Config::default()).unwrap();
        let re = translate(&mut b, &plain, false).unwrap();
        match b.kind(re) {
            crate::re::ReKind::Singleton(p) => {
                assert!(!p.contains('\n'));
                assert!(p.contains('x'));
            }
            k => panic!("unexpected kind {:?}", k),
        }

        let sl = Config::builder().singleline(true).build();
        let hir = parse(".", &sl).unwrap();
        let re = translate(&mut b, &hir, false).unwrap();
        match b.kind(re) {
            crate::re::ReKind::Singleton(p) => assert!(p.contains('\n')),
            k => panic!("unexpected kind {:?}", k),
        }
    }

    #[test]
    fn case_closure_in_singletons() {
        let config = Config::builder().ignore_case(true).build();
        let mut b = ReBuilder::new();
        let hir = parse("ab", &config).unwrap();
        let re = translate(&mut b, &hir, true).unwrap();
        match b.kind(re) {
            crate::re::ReKind::Concat(a, _) => match b.kind(*a) {
                crate::re::ReKind::Singleton(p) => {
                    assert!(p.contains('a') && p.contains('A'));
                }
                k => panic!("unexpected kind {:?}", k),
            },
            k => panic!("unexpected kind {:?}", k),
        }
    }

    #[test]
    fn rejected_features() {
        let config = Config::default();
        assert_eq!(
            build(r"(?=a)b", &config),
            Err(Error::UnsupportedFeature { feature: "look-around" })
        );
        assert_eq!(
            build(r"(a)\1", &config),
            Err(Error::UnsupportedFeature { feature: "back-reference" })
        );
        assert_eq!(
            build(r"\bfoo\b", &config),
            Err(Error::UnsupportedFeature { feature: "word boundary" })
        );
        assert!(matches!(
            build(r"a{4,2}", &config),
            Err(Error::InvalidRegex { .. })
        ));
        assert!(matches!(
            build(r"a(", &config),
            Err(Error::InvalidRegex { .. })
        ));
    }

    #[test]
    fn bounded_repetition_shape() {
        let mut b = ReBuilder::new();
        let hir = parse("a{2,4}?", &Config::default()).unwrap();
        let re = translate(&mut b, &hir, false).unwrap();
        match *b.kind(re) {
            crate::re::ReKind::Loop { lo, hi, lazy, .. } => {
                assert_eq!((lo, hi, lazy), (2, 4, true));
            }
            ref k => panic!("unexpected kind {:?}", k),
        }
    }
}
