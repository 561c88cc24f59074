//! Commutative regular expressions over message tags.
//!
//! A mailbox content type describes the multiset of messages a receive
//! capability may still consume. Sequencing is commutative (order is
//! irrelevant, counts matter), so equivalence and derivability are decided
//! on a canonical normal form rather than on the surface syntax:
//!
//! - a canonical form ([`Canon`]) is a set of alternative [`Factor`]s;
//! - a factor is a finite multiset of tags plus a set of starred
//!   sub-forms, each itself canonical.
//!
//! Normalisation applies the commutative identities: sequencing unions
//! factor contents, choice and star sets are idempotent, `*(a + b)` equals
//! `*a . *b`, `**p` equals `*p`, and `*1` equals `1`.

use pat_ir::{MailboxPattern, Name, PatternKind, Span};
use std::collections::{BTreeMap, BTreeSet};

/// Canonical commutative form: a choice between alternative factors.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct Canon {
    alts: BTreeSet<Factor>,
}

/// One alternative: a multiset of required tags and a set of starred forms.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default)]
pub struct Factor {
    /// Required occurrences per tag (never zero-valued entries).
    counts: BTreeMap<Name, u32>,
    /// Starred components: each may contribute any number of repetitions.
    stars: BTreeSet<Canon>,
}

impl Factor {
    fn tag(name: Name) -> Factor {
        let mut counts = BTreeMap::new();
        counts.insert(name, 1);
        Factor {
            counts,
            stars: BTreeSet::new(),
        }
    }

    /// Commutative sequencing of two factors.
    fn combine(&self, other: &Factor) -> Factor {
        let mut counts = self.counts.clone();
        for (&tag, &n) in &other.counts {
            *counts.entry(tag).or_insert(0) += n;
        }
        let mut stars = self.stars.clone();
        stars.extend(other.stars.iter().cloned());
        Factor { counts, stars }
    }

    fn is_epsilon(&self) -> bool {
        self.counts.is_empty() && self.stars.is_empty()
    }
}

impl Canon {
    /// The empty mailbox (`1`).
    pub fn empty() -> Canon {
        let mut alts = BTreeSet::new();
        alts.insert(Factor::default());
        Canon { alts }
    }

    /// A single message tag.
    pub fn tag(name: Name) -> Canon {
        let mut alts = BTreeSet::new();
        alts.insert(Factor::tag(name));
        Canon { alts }
    }

    /// Commutative sequencing: both contents, in any order.
    pub fn seq(&self, other: &Canon) -> Canon {
        let mut alts = BTreeSet::new();
        for a in &self.alts {
            for b in &other.alts {
                alts.insert(a.combine(b));
            }
        }
        Canon { alts }
    }

    /// Choice between two contents.
    pub fn choice(&self, other: &Canon) -> Canon {
        let mut alts = self.alts.clone();
        alts.extend(other.alts.iter().cloned());
        Canon { alts }
    }

    /// Kleene star: zero or more repetitions of the content.
    ///
    /// Under commutativity the star distributes over choice, so the result
    /// is the product of the stars of each alternative. A purely-starred
    /// factor is already its own star.
    pub fn star(&self) -> Canon {
        let mut result = Canon::empty();
        for factor in &self.alts {
            let starred = if factor.is_epsilon() {
                continue;
            } else if factor.counts.is_empty() {
                // (*a . *b)* = *a . *b
                Factor {
                    counts: BTreeMap::new(),
                    stars: factor.stars.clone(),
                }
            } else if factor.counts.len() == 1 && factor.stars.is_empty() {
                let (&tag, &n) = match factor.counts.iter().next() {
                    Some(entry) => entry,
                    None => continue,
                };
                if n == 1 {
                    // Primitive starred tag.
                    let mut stars = BTreeSet::new();
                    stars.insert(Canon::tag(tag));
                    Factor {
                        counts: BTreeMap::new(),
                        stars,
                    }
                } else {
                    let mut stars = BTreeSet::new();
                    let mut alts = BTreeSet::new();
                    alts.insert(factor.clone());
                    stars.insert(Canon { alts });
                    Factor {
                        counts: BTreeMap::new(),
                        stars,
                    }
                }
            } else {
                // Star of a compound factor stays opaque: repetitions must
                // keep the factor's tag counts in lockstep.
                let mut stars = BTreeSet::new();
                let mut alts = BTreeSet::new();
                alts.insert(factor.clone());
                stars.insert(Canon { alts });
                Factor {
                    counts: BTreeMap::new(),
                    stars,
                }
            };
            let mut wrapper = BTreeSet::new();
            wrapper.insert(starred);
            result = result.seq(&Canon { alts: wrapper });
        }
        result
    }

    /// True iff the content can match zero messages; gates `free`.
    pub fn admits_empty(&self) -> bool {
        self.alts.iter().any(|f| f.counts.is_empty())
    }

    /// Commutative equivalence: canonical forms are equal.
    pub fn equivalent(&self, other: &Canon) -> bool {
        self == other
    }

    /// Residual content after consuming one `tag`, or `None` when no
    /// execution can deliver `tag` next.
    ///
    /// Each alternative contributes residuals two ways: decrementing a
    /// required occurrence, or letting a starred component emit one message
    /// (the star itself remains: `*Get` derives by `Get` to `*Get`).
    pub fn derive(&self, tag: Name) -> Option<Canon> {
        let mut alts = BTreeSet::new();

        for factor in &self.alts {
            if let Some(&n) = factor.counts.get(&tag) {
                let mut counts = factor.counts.clone();
                if n == 1 {
                    counts.remove(&tag);
                } else {
                    counts.insert(tag, n - 1);
                }
                alts.insert(Factor {
                    counts,
                    stars: factor.stars.clone(),
                });
            }
            for star in &factor.stars {
                if let Some(residual) = star.derive(tag) {
                    // residual . (whole factor, star included)
                    for rf in &residual.alts {
                        alts.insert(factor.combine(rf));
                    }
                }
            }
        }

        if alts.is_empty() {
            None
        } else {
            Some(Canon { alts })
        }
    }

    /// Tags that may be consumed next: exactly those where `derive` succeeds.
    pub fn derivable_tags(&self) -> BTreeSet<Name> {
        let mut tags = BTreeSet::new();
        for factor in &self.alts {
            tags.extend(factor.counts.keys().copied());
            for star in &factor.stars {
                tags.extend(star.derivable_tags());
            }
        }
        tags
    }

    /// Tags that every execution must consume at least once: those required
    /// by all alternatives. Starred components never make a tag mandatory.
    pub fn mandatory_tags(&self) -> BTreeSet<Name> {
        let mut iter = self.alts.iter();
        let Some(first) = iter.next() else {
            return BTreeSet::new();
        };
        let mut mandatory: BTreeSet<Name> = first.counts.keys().copied().collect();
        for factor in iter {
            mandatory.retain(|tag| factor.counts.contains_key(tag));
        }
        mandatory
    }
}

/// Normalize a surface pattern into canonical form.
pub fn canonicalize(pattern: &MailboxPattern) -> Canon {
    match &pattern.kind {
        PatternKind::Empty => Canon::empty(),
        PatternKind::Tag(name) => Canon::tag(*name),
        PatternKind::Seq(a, b) => canonicalize(a).seq(&canonicalize(b)),
        PatternKind::Choice(a, b) => canonicalize(a).choice(&canonicalize(b)),
        PatternKind::Star(inner) => canonicalize(inner).star(),
    }
}

/// Collect every tag occurrence in a surface pattern, with its span.
pub fn pattern_tags(pattern: &MailboxPattern, out: &mut Vec<(Name, Span)>) {
    match &pattern.kind {
        PatternKind::Empty => {}
        PatternKind::Tag(name) => out.push((*name, pattern.span)),
        PatternKind::Seq(a, b) | PatternKind::Choice(a, b) => {
            pattern_tags(a, out);
            pattern_tags(b, out);
        }
        PatternKind::Star(inner) => pattern_tags(inner, out),
    }
}
