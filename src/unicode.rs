/*!
Unicode category support for hand-built ASTs.

Patterns built through the front-end get their classes expanded by
`regex-syntax` directly; this module is the equivalent surface for callers
constructing ASTs programmatically via [`ReBuilder`](crate::re::ReBuilder),
plus the case-folding closure used by case-insensitive singletons.

With the crate's `unicode` feature disabled, the Perl classes degrade to
their ASCII definitions and case closure degrades to ASCII folding.
*/

use crate::{error::Error, pred::Pred};

/// `\w`: word characters.
pub fn word() -> Pred {
    #[cfg(feature = "unicode")]
    return class_of_pattern(r"\w").expect("\\w is always a valid class");
    #[cfg(not(feature = "unicode"))]
    Pred::ranges([
        ('0' as u32, '9' as u32),
        ('A' as u32, 'Z' as u32),
        ('_' as u32, '_' as u32),
        ('a' as u32, 'z' as u32),
    ])
}

/// `\s`: whitespace.
pub fn space() -> Pred {
    #[cfg(feature = "unicode")]
    return class_of_pattern(r"\s").expect("\\s is always a valid class");
    #[cfg(not(feature = "unicode"))]
    Pred::ranges([(0x09, 0x0D), (0x20, 0x20)])
}

/// `\d`: decimal digits.
pub fn digit() -> Pred {
    #[cfg(feature = "unicode")]
    return class_of_pattern(r"\d").expect("\\d is always a valid class");
    #[cfg(not(feature = "unicode"))]
    Pred::range('0' as u32, '9' as u32)
}

/// The predicate of a Unicode general category, script or other named class,
/// e.g. `general_category("Lu")` or `general_category("Greek")`.
pub fn general_category(name: &str) -> Result<Pred, Error> {
    if name.is_empty()
        || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(Error::invalid(format!(
            "malformed category name `{}`",
            name
        )));
    }
    #[cfg(feature = "unicode")]
    return class_of_pattern(&format!(r"\p{{{}}}", name));
    #[cfg(not(feature = "unicode"))]
    Err(Error::invalid(format!(
        "category `{}` requires the `unicode` feature",
        name
    )))
}

#[cfg(feature = "unicode")]
fn class_of_pattern(pattern: &str) -> Result<Pred, Error> {
    use regex_syntax::hir::{Class, HirKind};

    let hir = regex_syntax::Parser::new()
        .parse(pattern)
        .map_err(|e| Error::invalid(e.to_string()))?;
    match hir.kind() {
        HirKind::Class(Class::Unicode(cls)) => Ok(Pred::ranges(
            cls.ranges().iter().map(|r| (r.start() as u32, r.end() as u32)),
        )),
        _ => Err(Error::Internal { detail: "class pattern parsed to non-class" }),
    }
}

/// The closure of `p` under simple Unicode case folding: the smallest
/// superset of `p` closed under folding-equivalence, so that a
/// case-insensitive singleton matches every case variant.
///
/// ```
/// use symre::{pred::Pred, unicode};
///
/// let k = unicode::case_closure(&Pred::char('k'));
/// assert!(k.contains('K'));
/// # #[cfg(feature = "unicode")]
/// assert!(k.contains('\u{212A}')); // KELVIN SIGN
/// ```
#[cfg(feature = "unicode")]
pub fn case_closure(p: &Pred) -> Pred {
    use regex_syntax::hir::{ClassUnicode, ClassUnicodeRange};

    if !p.is_satisfiable() {
        return p.clone();
    }
    let mut cls = ClassUnicode::new(p.iter().flat_map(|(lo, hi)| {
        // Surrogates are not scalar values; split ranges around them.
        let head = (lo.min(0xD7FF), hi.min(0xD7FF));
        let tail = (lo.max(0xE000), hi.max(0xE000));
        [head, tail].into_iter().filter_map(move |(a, b)| {
            if a <= b && lo <= b && a <= hi {
                Some(ClassUnicodeRange::new(
                    char::from_u32(a)?,
                    char::from_u32(b)?,
                ))
            } else {
                None
            }
        })
    }));
    cls.case_fold_simple();
    let folded = Pred::ranges(
        cls.ranges().iter().map(|r| (r.start() as u32, r.end() as u32)),
    );
    // Folding only ever adds code points; keep any surrogate-range content
    // the caller put in by unioning with the original.
    folded.or(p)
}

/// ASCII-only case closure, used when the `unicode` feature is disabled.
#[cfg(not(feature = "unicode"))]
pub fn case_closure(p: &Pred) -> Pred {
    let upper = Pred::range('A' as u32, 'Z' as u32);
    let lower = Pred::range('a' as u32, 'z' as u32);
    let to_lower = Pred::ranges(
        p.and(&upper).iter().map(|(lo, hi)| (lo + 32, hi + 32)),
    );
    let to_upper = Pred::ranges(
        p.and(&lower).iter().map(|(lo, hi)| (lo - 32, hi - 32)),
    );
    p.or(&to_lower).or(&to_upper)
}
