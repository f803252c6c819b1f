use memchr::memmem;

use crate::re::{ReBuilder, ReId, ReKind};

/// At most this many characters of mandatory prefix are extracted; longer
/// needles stop paying for themselves once the DFA takes over.
const MAX_PREFIX_CHARS: usize = 5;

/// Substring prefilter over the mandatory fixed prefix of a regex.
///
/// When the root has a non-empty fixed prefix — literal singletons along the
/// left spine of concatenations, the common prefix across alternation
/// branches — the seek loop can jump straight to candidate positions with a
/// vectorized substring search instead of stepping the DFA over every
/// character.
#[derive(Clone, Debug)]
pub(crate) struct Prefilter {
    finder: memmem::Finder<'static>,
}

impl Prefilter {
    pub fn from_root(b: &ReBuilder, root: ReId) -> Option<Prefilter> {
        let mut prefix = String::new();
        collect_prefix(b, root, &mut prefix);
        if prefix.is_empty() {
            return None;
        }
        log!(log::debug!("prefilter on fixed prefix {:?}", prefix));
        Some(Prefilter {
            finder: memmem::Finder::new(prefix.as_bytes()).into_owned(),
        })
    }

    /// The offset of the next candidate position in `haystack`, if any.
    pub fn find(&self, haystack: &[u8]) -> Option<usize> {
        self.finder.find(haystack)
    }
}

/// Appends the mandatory prefix of `id` to `out`. Returns whether the whole
/// node was consumed as a literal chain, i.e. whether a following node can
/// continue the prefix.
fn collect_prefix(b: &ReBuilder, id: ReId, out: &mut String) -> bool {
    if out.chars().count() >= MAX_PREFIX_CHARS {
        return false;
    }
    match b.kind(id) {
        // Zero-width nodes are transparent: the first match text follows.
        ReKind::Epsilon | ReKind::Anchor(_) | ReKind::Watchdog(_) => true,
        ReKind::Singleton(p) => match p.as_single_char() {
            Some(c) => {
                out.push(c);
                true
            }
            None => false,
        },
        ReKind::Concat(a, b_) => {
            let (a, b_) = (*a, *b_);
            collect_prefix(b, a, out) && collect_prefix(b, b_, out)
        }
        ReKind::Loop { body, lo, .. } if *lo >= 1 => {
            // One mandatory iteration contributes; further ones may not.
            collect_prefix(b, *body, out);
            false
        }
        ReKind::Or(set) => {
            let mut alts: Vec<String> = Vec::new();
            for &m in set.members.iter() {
                let mut s = String::new();
                collect_prefix(b, m, &mut s);
                alts.push(s);
            }
            for f in set.folded.iter() {
                // body{0,k}·tail can skip the loop, so only the prefix
                // shared by body and tail is mandatory.
                let mut via_body = String::new();
                collect_prefix(b, f.body, &mut via_body);
                let mut via_tail = String::new();
                collect_prefix(b, f.tail, &mut via_tail);
                alts.push(common_prefix(&via_body, &via_tail).to_owned());
            }
            let mut iter = alts.iter();
            let mut common: &str = match iter.next() {
                Some(s) => s,
                None => return false,
            };
            for s in iter {
                common = common_prefix(common, s);
            }
            out.push_str(common);
            false
        }
        _ => false,
    }
}

fn common_prefix<'a>(a: &'a str, b: &str) -> &'a str {
    let end = a
        .char_indices()
        .zip(b.chars())
        .find(|((_, ca), cb)| ca != cb)
        .map(|((i, _), _)| i)
        .unwrap_or_else(|| a.len().min(b.len()));
    // Trim to a character boundary of `a`.
    let mut end = end;
    while !a.is_char_boundary(end) {
        end -= 1;
    }
    &a[..end]
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

    fn prefix_of(b: &ReBuilder, id: ReId) -> String {
        let mut out = String::new();
        collect_prefix(b, id, &mut out);
        out
    }

    #[test]
    fn literal_spine() {
        let mut b = ReBuilder::new();
        let abc = lit(&mut b, "abcdefg");
        // Capped at five characters.
        assert_eq!(prefix_of(&b, abc), "abcde");

        let d = b.singleton(Pred::range('0' as u32, '9' as u32));
        let ab = lit(&mut b, "ab");
        let re = b.concat(ab, d);
        assert_eq!(prefix_of(&b, re), "ab");
    }

    #[test]
    fn anchors_are_transparent() {
        let mut b = ReBuilder::new();
        let bol = b.anchor(crate::re::Anchor::StartLine);
        let abc = lit(&mut b, "abc");
        let re = b.concat(bol, abc);
        assert_eq!(prefix_of(&b, re), "abc");
    }

    #[test]
    fn alternation_common_prefix() {
        let mut b = ReBuilder::new();
        let abx = lit(&mut b, "abx");
        let aby = lit(&mut b, "abyz");
        let or = b.alternation(vec![abx, aby]);
        assert_eq!(prefix_of(&b, or), "ab");

        // A nullable branch kills the prefix.
        let eps = b.epsilon();
        let or = b.alternation(vec![abx, eps]);
        assert_eq!(prefix_of(&b, or), "");
    }

    #[test]
    fn nullable_and_class_heads_have_no_prefix() {
        let mut b = ReBuilder::new();
        let a = b.singleton(Pred::char('a'));
        let opt = b.repetition(a, 0, Some(1), false).unwrap();
        let bc = lit(&mut b, "bc");
        let re = b.concat(opt, bc);
        assert_eq!(prefix_of(&b, re), "");

        let d = b.singleton(Pred::range('0' as u32, '9' as u32));
        let re = b.concat(d, bc);
        assert_eq!(prefix_of(&b, re), "");
    }

    #[test]
    fn mandatory_loop_head() {
        let mut b = ReBuilder::new();
        let ab = lit(&mut b, "ab");
        let plus = b.repetition(ab, 1, None, false).unwrap();
        let re = {
            let tail = lit(&mut b, "xy");
            b.concat(plus, tail)
        };
        // One iteration of ab is mandatory; what follows is not fixed.
        assert_eq!(prefix_of(&b, re), "ab");
    }

    #[test]
    fn finder_finds() {
        let mut b = ReBuilder::new();
        let abc = lit(&mut b, "abc");
        let pf = Prefilter::from_root(&b, abc).unwrap();
        assert_eq!(pf.find(b"xxabcxx"), Some(2));
        assert_eq!(pf.find(b"xxabxcx"), None);

        let d = b.singleton(Pred::range('0' as u32, '9' as u32));
        assert!(Prefilter::from_root(&b, d).is_none());
    }
}
