//! AS path: ordered sequence of segments, plus the AS_PATH / AS4_PATH
//! reconciliation algorithm (RFC 6793 9).

use crate::models::network::asn::Asn;
use std::fmt::{Display, Formatter};

/// One segment of an AS path.
///
/// `Sequence`/`ConfedSequence` are order-sensitive; `Set`/`ConfedSet` are
/// order-insensitive (RFC 4271 segment semantics).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AsPathSegment {
    Sequence(Vec<Asn>),
    Set(Vec<Asn>),
    ConfedSequence(Vec<Asn>),
    ConfedSet(Vec<Asn>),
}

impl AsPathSegment {
    fn asns(&self) -> &[Asn] {
        match self {
            AsPathSegment::Sequence(v)
            | AsPathSegment::Set(v)
            | AsPathSegment::ConfedSequence(v)
            | AsPathSegment::ConfedSet(v) => v,
        }
    }

    /// RFC 4271 path-length contribution: a sequence counts its ASNs, a set
    /// counts as a single hop regardless of its size.
    fn hop_count(&self) -> usize {
        match self {
            AsPathSegment::Sequence(v) | AsPathSegment::ConfedSequence(v) => v.len(),
            AsPathSegment::Set(_) | AsPathSegment::ConfedSet(_) => 1,
        }
    }

    const fn is_special(&self) -> bool {
        matches!(
            self,
            AsPathSegment::Set(_) | AsPathSegment::ConfedSequence(_) | AsPathSegment::ConfedSet(_)
        )
    }

    fn with_asns(&self, asns: Vec<Asn>) -> AsPathSegment {
        match self {
            AsPathSegment::Sequence(_) => AsPathSegment::Sequence(asns),
            AsPathSegment::Set(_) => AsPathSegment::Set(asns),
            AsPathSegment::ConfedSequence(_) => AsPathSegment::ConfedSequence(asns),
            AsPathSegment::ConfedSet(_) => AsPathSegment::ConfedSet(asns),
        }
    }
}

impl PartialEq for AsPath {
    fn eq(&self, other: &Self) -> bool {
        if self.segments.len() != other.segments.len() {
            return false;
        }
        self.segments.iter().zip(other.segments.iter()).all(|(a, b)| {
            match (a, b) {
                (AsPathSegment::Sequence(x), AsPathSegment::Sequence(y))
                | (AsPathSegment::ConfedSequence(x), AsPathSegment::ConfedSequence(y)) => x == y,
                (AsPathSegment::Set(x), AsPathSegment::Set(y))
                | (AsPathSegment::ConfedSet(x), AsPathSegment::ConfedSet(y)) => {
                    let mut x_sorted = x.iter().map(|a| a.to_u32()).collect::<Vec<_>>();
                    let mut y_sorted = y.iter().map(|a| a.to_u32()).collect::<Vec<_>>();
                    x_sorted.sort_unstable();
                    y_sorted.sort_unstable();
                    x_sorted == y_sorted
                }
                _ => false,
            }
        })
    }
}

/// Ordered sequence of AS path segments.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AsPath {
    segments: Vec<AsPathSegment>,
}

impl AsPath {
    pub fn new() -> Self {
        AsPath::default()
    }

    pub fn clear(&mut self) {
        self.segments.clear();
    }

    pub fn append_segment(&mut self, segment: AsPathSegment) {
        self.segments.push(segment);
    }

    pub fn segments(&self) -> &[AsPathSegment] {
        &self.segments
    }

    /// Total RFC 4271 hop count: sequences count their ASNs, sets count 1.
    pub fn path_length(&self) -> usize {
        self.segments.iter().map(AsPathSegment::hop_count).sum()
    }

    /// First ASN of the first `Sequence` segment, if any -- conventionally
    /// the origin AS of the route.
    pub fn origin_asns(&self) -> Option<Vec<Asn>> {
        self.segments.last().map(|seg| match seg {
            AsPathSegment::Sequence(v) | AsPathSegment::ConfedSequence(v) => {
                v.last().map(|a| vec![*a]).unwrap_or_default()
            }
            AsPathSegment::Set(v) | AsPathSegment::ConfedSet(v) => v.clone(),
        })
    }

    /// Reconcile a legacy 2-byte-ASN `AS_PATH` with a 4-byte-ASN `AS4_PATH`
    /// (RFC 6793 9).
    ///
    /// If only one side is present, it is used as-is. If both are present
    /// and `aspath` has at least as many hops as `as4path`, the first
    /// `aspath.path_length() - as4path.path_length()` effective hops of
    /// `aspath` are kept (special segments always consume whole and count
    /// as 1; the last plain sequence segment may be partially consumed),
    /// then every segment of `as4path` is appended unchanged. Otherwise
    /// (`as4path` longer than `aspath`, a malformed-peer situation) `aspath`
    /// is trusted alone.
    pub fn reconcile(aspath: Option<&AsPath>, as4path: Option<&AsPath>) -> AsPath {
        match (aspath, as4path) {
            (Some(a), None) => a.clone(),
            (None, Some(b)) => b.clone(),
            (None, None) => AsPath::new(),
            (Some(a), Some(b)) => {
                let a_len = a.path_length();
                let b_len = b.path_length();
                if a_len < b_len {
                    return a.clone();
                }
                let budget = a_len - b_len;
                let mut merged = AsPath::new();
                let mut remaining = budget;
                for seg in &a.segments {
                    if remaining == 0 {
                        break;
                    }
                    if seg.is_special() {
                        merged.append_segment(seg.clone());
                        remaining = remaining.saturating_sub(1);
                        continue;
                    }
                    let take = remaining.min(seg.asns().len());
                    if take == seg.asns().len() {
                        merged.append_segment(seg.clone());
                    } else {
                        merged.append_segment(seg.with_asns(seg.asns()[..take].to_vec()));
                    }
                    remaining -= take;
                }
                for seg in &b.segments {
                    merged.append_segment(seg.clone());
                }
                merged
            }
        }
    }
}

impl Display for AsPathSegment {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let render = |v: &[Asn]| {
            v.iter()
                .map(|a| a.to_string())
                .collect::<Vec<_>>()
                .join(" ")
        };
        match self {
            AsPathSegment::Sequence(v) => write!(f, "{}", render(v)),
            AsPathSegment::Set(v) => write!(f, "{{{}}}", render(v)),
            AsPathSegment::ConfedSequence(v) => write!(f, "({})", render(v)),
            AsPathSegment::ConfedSet(v) => write!(f, "[{}]", render(v)),
        }
    }
}

impl Display for AsPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let rendered = self
            .segments
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .join(" ");
        write!(f, "{}", rendered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seq(asns: &[u32]) -> AsPathSegment {
        AsPathSegment::Sequence(asns.iter().map(|v| Asn::new(*v)).collect())
    }

    fn path(segments: Vec<AsPathSegment>) -> AsPath {
        let mut p = AsPath::new();
        for s in segments {
            p.append_segment(s);
        }
        p
    }

    #[test]
    fn hop_count_set_counts_as_one() {
        let p = path(vec![
            seq(&[1, 2, 3]),
            AsPathSegment::Set(vec![Asn::new(4), Asn::new(5)]),
        ]);
        assert_eq!(p.path_length(), 4);
    }

    #[test]
    fn render_bracketing() {
        let p = path(vec![
            seq(&[1, 2]),
            AsPathSegment::Set(vec![Asn::new(3)]),
            AsPathSegment::ConfedSequence(vec![Asn::new(4)]),
            AsPathSegment::ConfedSet(vec![Asn::new(5)]),
        ]);
        assert_eq!(p.to_string(), "1 2 {3} (4) [5]");
    }

    #[test]
    fn reconcile_idempotent_when_equal() {
        let a = path(vec![seq(&[1, 2, 3])]);
        let b = path(vec![seq(&[1, 2, 3])]);
        let merged = AsPath::reconcile(Some(&a), Some(&b));
        assert_eq!(merged, a);
    }

    #[test]
    fn reconcile_length_rule() {
        let a = path(vec![seq(&[100, 200, 300, 400])]);
        let b = path(vec![seq(&[65000, 400])]);
        // aspath longer: result length == max(len(a), len(b)) == 4
        let merged = AsPath::reconcile(Some(&a), Some(&b));
        assert_eq!(merged.path_length(), 4);
        assert_eq!(merged.to_string(), "100 200 65000 400");

        // as4path longer than aspath: trust aspath alone
        let short_a = path(vec![seq(&[100])]);
        let long_b = path(vec![seq(&[65000, 65001, 65002])]);
        let merged2 = AsPath::reconcile(Some(&short_a), Some(&long_b));
        assert_eq!(merged2.path_length(), short_a.path_length());
        assert_eq!(merged2, short_a);
    }

    #[test]
    fn reconcile_only_one_present() {
        let a = path(vec![seq(&[1, 2])]);
        assert_eq!(AsPath::reconcile(Some(&a), None), a);
        assert_eq!(AsPath::reconcile(None, Some(&a)), a);
    }

    #[test]
    fn reconcile_partial_last_segment() {
        // aspath has 5 hops across two sequences, as4path has 2 -> budget 3:
        // take whole first segment (2), then 1 from the second (of 3).
        let a = path(vec![seq(&[1, 2]), seq(&[3, 4, 5])]);
        let b = path(vec![seq(&[65004, 65005])]);
        let merged = AsPath::reconcile(Some(&a), Some(&b));
        assert_eq!(merged.to_string(), "1 2 3 65004 65005");
    }
}
