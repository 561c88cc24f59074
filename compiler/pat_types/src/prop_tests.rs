//! Property tests for the mailbox content algebra.
//!
//! Random patterns are generated as interner-free sketches and realized
//! against a fresh interner inside each case.

use crate::algebra::canonicalize;
use pat_ir::{MailboxPattern, PatternKind, Span, StringInterner};
use proptest::prelude::*;

#[derive(Clone, Debug)]
enum Sketch {
    Empty,
    Tag(u8),
    Seq(Box<Sketch>, Box<Sketch>),
    Choice(Box<Sketch>, Box<Sketch>),
    Star(Box<Sketch>),
}

fn arb_sketch() -> impl Strategy<Value = Sketch> {
    let leaf = prop_oneof![
        1 => Just(Sketch::Empty),
        4 => (0u8..3).prop_map(Sketch::Tag),
    ];
    leaf.prop_recursive(4, 24, 2, |inner| {
        prop_oneof![
            (inner.clone(), inner.clone())
                .prop_map(|(a, b)| Sketch::Seq(Box::new(a), Box::new(b))),
            (inner.clone(), inner.clone())
                .prop_map(|(a, b)| Sketch::Choice(Box::new(a), Box::new(b))),
            inner.prop_map(|p| Sketch::Star(Box::new(p))),
        ]
    })
}

const TAG_NAMES: [&str; 3] = ["Get", "Put", "Reply"];

fn realize(sketch: &Sketch, interner: &StringInterner) -> MailboxPattern {
    let kind = match sketch {
        Sketch::Empty => PatternKind::Empty,
        Sketch::Tag(idx) => {
            PatternKind::Tag(interner.intern(TAG_NAMES[*idx as usize % TAG_NAMES.len()]))
        }
        Sketch::Seq(a, b) => PatternKind::Seq(
            Box::new(realize(a, interner)),
            Box::new(realize(b, interner)),
        ),
        Sketch::Choice(a, b) => PatternKind::Choice(
            Box::new(realize(a, interner)),
            Box::new(realize(b, interner)),
        ),
        Sketch::Star(p) => PatternKind::Star(Box::new(realize(p, interner))),
    };
    MailboxPattern {
        kind,
        span: Span::DUMMY,
    }
}

fn seq(a: MailboxPattern, b: MailboxPattern) -> MailboxPattern {
    MailboxPattern {
        kind: PatternKind::Seq(Box::new(a), Box::new(b)),
        span: Span::DUMMY,
    }
}

fn choice(a: MailboxPattern, b: MailboxPattern) -> MailboxPattern {
    MailboxPattern {
        kind: PatternKind::Choice(Box::new(a), Box::new(b)),
        span: Span::DUMMY,
    }
}

fn star(p: MailboxPattern) -> MailboxPattern {
    MailboxPattern {
        kind: PatternKind::Star(Box::new(p)),
        span: Span::DUMMY,
    }
}

fn empty() -> MailboxPattern {
    MailboxPattern {
        kind: PatternKind::Empty,
        span: Span::DUMMY,
    }
}

proptest! {
    #[test]
    fn seq_commutes(a in arb_sketch(), b in arb_sketch()) {
        let interner = StringInterner::new();
        let pa = realize(&a, &interner);
        let pb = realize(&b, &interner);
        let ab = canonicalize(&seq(pa.clone(), pb.clone()));
        let ba = canonicalize(&seq(pb, pa));
        prop_assert!(ab.equivalent(&ba));
    }

    #[test]
    fn seq_associates(a in arb_sketch(), b in arb_sketch(), c in arb_sketch()) {
        let interner = StringInterner::new();
        let pa = realize(&a, &interner);
        let pb = realize(&b, &interner);
        let pc = realize(&c, &interner);
        let left = canonicalize(&seq(seq(pa.clone(), pb.clone()), pc.clone()));
        let right = canonicalize(&seq(pa, seq(pb, pc)));
        prop_assert!(left.equivalent(&right));
    }

    #[test]
    fn seq_empty_is_identity(a in arb_sketch()) {
        let interner = StringInterner::new();
        let pa = realize(&a, &interner);
        let padded = canonicalize(&seq(pa.clone(), empty()));
        prop_assert!(padded.equivalent(&canonicalize(&pa)));
    }

    #[test]
    fn choice_commutes_and_dedups(a in arb_sketch(), b in arb_sketch()) {
        let interner = StringInterner::new();
        let pa = realize(&a, &interner);
        let pb = realize(&b, &interner);
        let ab = canonicalize(&choice(pa.clone(), pb.clone()));
        let ba = canonicalize(&choice(pb, pa.clone()));
        prop_assert!(ab.equivalent(&ba));

        let aa = canonicalize(&choice(pa.clone(), pa.clone()));
        prop_assert!(aa.equivalent(&canonicalize(&pa)));
    }

    #[test]
    fn star_is_nullable(a in arb_sketch()) {
        let interner = StringInterner::new();
        let starred = canonicalize(&star(realize(&a, &interner)));
        prop_assert!(starred.admits_empty());
    }

    #[test]
    fn star_is_idempotent(a in arb_sketch()) {
        let interner = StringInterner::new();
        let pa = realize(&a, &interner);
        let once = canonicalize(&star(pa.clone()));
        let twice = canonicalize(&star(star(pa)));
        prop_assert!(once.equivalent(&twice));
    }

    #[test]
    fn derivable_tags_match_derive(a in arb_sketch()) {
        let interner = StringInterner::new();
        let canon = canonicalize(&realize(&a, &interner));
        let derivable = canon.derivable_tags();
        for name in TAG_NAMES {
            let tag = interner.intern(name);
            prop_assert_eq!(derivable.contains(&tag), canon.derive(tag).is_some());
        }
    }

    #[test]
    fn derive_keeps_star_derivable(a in arb_sketch()) {
        let interner = StringInterner::new();
        let starred = canonicalize(&star(realize(&a, &interner)));
        // A star can always absorb another occurrence of anything it emits.
        for tag in starred.derivable_tags() {
            let residual = starred.derive(tag);
            prop_assert!(residual.is_some(), "derivable tag must derive");
            if let Some(residual) = residual {
                prop_assert!(residual.derive(tag).is_some() || residual.admits_empty());
            }
        }
    }
}
