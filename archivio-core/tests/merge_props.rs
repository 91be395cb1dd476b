use archivio_core::{PointSeries, remove_range, union_no_intersect, union_second_wins};
use chrono::NaiveDate;
use proptest::prelude::*;
use std::collections::BTreeMap;

fn day(offset: i32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Days::new(u64::from(offset.unsigned_abs()))
}

fn arb_series() -> impl Strategy<Value = PointSeries> {
    proptest::collection::btree_map(0i32..400, -1_000_000i64..1_000_000, 0..60).prop_map(|m| {
        m.into_iter()
            .map(|(d, v)| (day(d), v as f64))
            .collect::<PointSeries>()
    })
}

proptest! {
    #[test]
    fn second_wins_union_prefers_corrections(a in arb_series(), b in arb_series()) {
        let merged = union_second_wins(a.clone(), b.clone());

        let mut expected: BTreeMap<NaiveDate, f64> = a.iter().collect();
        expected.extend(b.iter());

        prop_assert_eq!(merged.len(), expected.len());
        for (date, value) in &expected {
            prop_assert_eq!(merged.value_on(*date), Some(*value));
        }
        // Dates strictly increasing in iteration order.
        let dates: Vec<NaiveDate> = merged.iter().map(|(d, _)| d).collect();
        prop_assert!(dates.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn second_wins_union_is_idempotent(a in arb_series(), b in arb_series()) {
        let once = union_second_wins(a.clone(), b.clone());
        let twice = union_second_wins(once.clone(), b);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn no_intersect_union_rejects_any_collision(a in arb_series(), b in arb_series()) {
        let collides = a.iter().any(|(d, _)| b.value_on(d).is_some());
        let merged = union_no_intersect(a.clone(), b.clone());
        if collides {
            prop_assert!(merged.is_err());
        } else {
            let merged = merged.unwrap();
            prop_assert_eq!(merged.len(), a.len() + b.len());
        }
    }

    #[test]
    fn remove_range_is_exact(s in arb_series(), lo in 0i32..400, hi in 0i32..400) {
        let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };
        let removed = remove_range(s.clone(), Some(day(lo)), Some(day(hi)));
        for (date, value) in s.iter() {
            let in_range = day(lo) <= date && date <= day(hi);
            if in_range {
                prop_assert_eq!(removed.value_on(date), None);
            } else {
                prop_assert_eq!(removed.value_on(date), Some(value));
            }
        }
    }

    #[test]
    fn open_ended_remove_clears_everything(s in arb_series()) {
        prop_assert!(remove_range(s, None, None).is_empty());
    }

    #[test]
    fn sub_series_window_is_inclusive_exclusive(s in arb_series(), lo in 0i32..400, hi in 0i32..400) {
        let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };
        let sub = s.sub_series(Some(day(lo)), Some(day(hi)));
        for (date, _) in sub.iter() {
            prop_assert!(day(lo) <= date && date < day(hi));
        }
        let expected = s.iter().filter(|(d, _)| day(lo) <= *d && *d < day(hi)).count();
        prop_assert_eq!(sub.len(), expected);
    }

    #[test]
    fn limit_selects_head_or_tail(s in arb_series(), n in 1i64..50) {
        let head = s.limit(n);
        let tail = s.limit(-n);
        let n = n as usize;
        prop_assert_eq!(head.len(), s.len().min(n));
        prop_assert_eq!(tail.len(), s.len().min(n));
        if let (Some((h, _)), Some((e, _))) = (head.earliest(), s.earliest()) {
            prop_assert_eq!(h, e);
        }
        if let (Some((t, _)), Some((l, _))) = (tail.latest(), s.latest()) {
            prop_assert_eq!(t, l);
        }
    }
}
