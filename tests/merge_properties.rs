//! Property tests for streaming-statistic merging.
//!
//! The sequential comparator depends on batch merging being exact: the
//! running statistics after merging any partition of a sample must equal the
//! statistics of pushing every value one by one. These properties are what
//! make the batch schedule a pure performance knob with no effect on
//! decisions.

use proptest::prelude::*;

use theorycraft::StreamingStat;

fn pushed(values: &[f64]) -> StreamingStat {
    let mut stat = StreamingStat::new();
    for &v in values {
        stat.push(v);
    }
    stat
}

fn close(a: f64, b: f64) -> bool {
    let scale = a.abs().max(b.abs()).max(1.0);
    (a - b).abs() <= 1e-9 * scale
}

fn sample_value() -> impl Strategy<Value = f64> {
    // DPS-scale values; merging is not expected to survive 1e300 overflows.
    -1e6..1e6f64
}

proptest! {
    #[test]
    fn merging_a_split_matches_pushing_everything(
        values in prop::collection::vec(sample_value(), 1..200),
        split in 0usize..200,
    ) {
        let split = split % (values.len() + 1);
        let (left, right) = values.split_at(split);

        let mut merged = pushed(left);
        merged.merge(&pushed(right));
        let whole = pushed(&values);

        prop_assert_eq!(merged.count(), whole.count());
        prop_assert!(close(merged.mean(), whole.mean()));
        prop_assert!(close(merged.variance(), whole.variance()));
    }

    #[test]
    fn merge_order_does_not_matter(
        a in prop::collection::vec(sample_value(), 1..100),
        b in prop::collection::vec(sample_value(), 1..100),
    ) {
        let mut ab = pushed(&a);
        ab.merge(&pushed(&b));
        let mut ba = pushed(&b);
        ba.merge(&pushed(&a));

        prop_assert_eq!(ab.count(), ba.count());
        prop_assert!(close(ab.mean(), ba.mean()));
        prop_assert!(close(ab.variance(), ba.variance()));
    }

    #[test]
    fn merge_grouping_does_not_matter(
        a in prop::collection::vec(sample_value(), 1..60),
        b in prop::collection::vec(sample_value(), 1..60),
        c in prop::collection::vec(sample_value(), 1..60),
    ) {
        // (a + b) + c
        let mut left = pushed(&a);
        left.merge(&pushed(&b));
        left.merge(&pushed(&c));

        // a + (b + c)
        let mut bc = pushed(&b);
        bc.merge(&pushed(&c));
        let mut right = pushed(&a);
        right.merge(&bc);

        prop_assert_eq!(left.count(), right.count());
        prop_assert!(close(left.mean(), right.mean()));
        prop_assert!(close(left.variance(), right.variance()));
    }

    #[test]
    fn merging_an_empty_stat_changes_nothing(
        values in prop::collection::vec(sample_value(), 1..100),
    ) {
        let mut stat = pushed(&values);
        let before = stat;
        stat.merge(&StreamingStat::new());
        prop_assert_eq!(stat, before);
    }

    #[test]
    fn uncertainty_never_negative(
        values in prop::collection::vec(sample_value(), 1..100),
    ) {
        let stat = pushed(&values);
        prop_assert!(stat.variance() >= 0.0);
        prop_assert!(stat.var_of_mean().unwrap() >= 0.0);
    }
}
