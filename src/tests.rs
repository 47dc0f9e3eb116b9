use std::sync::Arc;
use std::thread;

use crate::{Params, Table};

fn small_table() -> Table<u64, &'static str> {
    // Small enough to make neighborhood displacement observable: 2
    // segments, 16 buckets each, hop range 4, add range 8.
    Table::with_params(Params {
        n_segments: 2,
        n_buckets_per_segment: 16,
        hop_range: 4,
        add_range: 8,
        ..Params::default()
    })
    .unwrap()
}

#[test]
fn insert_get_remove_round_trip() {
    let t = small_table();
    t.put(1, "a").unwrap();
    assert_eq!(t.get(&1), Some("a"));
    assert_eq!(t.remove(&1), Some("a"));
    assert_eq!(t.get(&1), None);
}

#[test]
fn put_never_overwrites_existing_key() {
    let t = small_table();
    t.put(1, "a").unwrap();
    t.put(1, "b").unwrap();
    assert_eq!(t.get(&1), Some("a"));
}

#[test]
fn remove_idempotence() {
    let t = small_table();
    t.put(1, "a").unwrap();
    assert_eq!(t.remove(&1), Some("a"));
    assert_eq!(t.remove(&1), None);
    assert_eq!(t.get(&1), None);
}

#[test]
fn remove_absent_is_none() {
    let t: Table<u64, u64> = Table::new().unwrap();
    assert_eq!(t.remove(&0), None);
}

#[test]
fn distinct_keys_round_trip() {
    let t: Table<u64, u64> = Table::new().unwrap();
    for i in 1..2000u64 {
        t.put(i, i * 2).unwrap();
    }
    for i in 1..2000u64 {
        assert_eq!(t.get(&i), Some(i * 2));
    }
    t.check_invariants().unwrap();
}

#[test]
fn insert_then_remove_every_other() {
    let t: Table<u64, u64> = Table::new().unwrap();
    for i in 1..1000u64 {
        t.put(i, i).unwrap();
    }
    for i in (1..1000u64).step_by(2) {
        assert_eq!(t.remove(&i), Some(i));
    }
    for i in 1..1000u64 {
        if i % 2 == 0 {
            assert_eq!(t.get(&i), Some(i));
        } else {
            assert_eq!(t.get(&i), None);
        }
    }
    t.check_invariants().unwrap();
}

#[test]
fn len_tracks_inserts_and_removes() {
    let t: Table<u64, u64> = Table::new().unwrap();
    assert_eq!(t.len(), 0);
    assert!(t.is_empty());

    t.put(1, 1).unwrap();
    t.put(2, 2).unwrap();
    assert_eq!(t.len(), 2);

    t.remove(&1);
    assert_eq!(t.len(), 1);
    assert!(!t.is_empty());
}

#[test]
fn resize_triggers_and_preserves_entries() {
    // Deliberately tiny and dense: one segment, small add range, enough
    // keys that displacement alone can't place them all and resize must
    // fire.
    let t: Table<u64, u64> = Table::with_params(Params {
        n_segments: 1,
        n_buckets_per_segment: 8,
        hop_range: 4,
        add_range: 4,
        max_tries: 4,
        ..Params::default()
    })
    .unwrap();

    // All of these hash (identity-ish via `hash::hash`) to the same
    // segment (only one exists); pushing enough of them in forces at
    // least one resize.
    for i in 0..64u64 {
        t.put(i, i).unwrap();
    }
    for i in 0..64u64 {
        assert_eq!(t.get(&i), Some(i));
    }
    assert_eq!(t.len(), 64);
    assert!(t.buckets() > 8);
    t.check_invariants().unwrap();
}

#[test]
fn resize_cap_reached_is_reported() {
    let t: Table<u64, u64> = Table::with_params(Params {
        n_segments: 1,
        n_buckets_per_segment: 4,
        hop_range: 2,
        add_range: 2,
        max_segments: 1,
        ..Params::default()
    })
    .unwrap();

    // The single segment can hold only a few entries before `put` must
    // grow past `max_segments == 1`, which is rejected.
    let mut first_err = None;
    let mut placed = Vec::new();
    for i in 0..64u64 {
        match t.put(i, i) {
            Ok(()) => placed.push(i),
            Err(e) => {
                first_err = Some(e);
                break;
            }
        }
    }
    assert!(first_err.is_some(), "expected a ResizeCapReached error");
    assert!(!placed.is_empty());

    // The failed resize must not have cost the table anything it already
    // held: every key placed before the failing `put` is still there,
    // `len` matches exactly, and the rejected key itself never got in.
    assert_eq!(t.len(), placed.len());
    for key in &placed {
        assert_eq!(t.get(key), Some(*key));
    }
    assert_eq!(t.get(&(placed.len() as u64)), None);
    t.check_invariants().unwrap();
}

#[test]
fn misconfiguration_rejected_at_construction() {
    let bad = Params {
        n_segments: 3,
        ..Params::default()
    };
    assert!(Table::<u64, u64>::with_params(bad).is_err());

    let bad = Params {
        hop_range: 64,
        ..Params::default()
    };
    assert!(Table::<u64, u64>::with_params(bad).is_err());

    let bad = Params {
        hop_range: 16,
        add_range: 8,
        ..Params::default()
    };
    assert!(Table::<u64, u64>::with_params(bad).is_err());
}

#[test]
fn spam_insert() {
    let t = Arc::new(Table::<u64, u64>::new().unwrap());
    let mut joins = Vec::new();

    for thread_idx in 0..10u64 {
        let t = t.clone();
        joins.push(thread::spawn(move || {
            for i in thread_idx * 1000..(thread_idx + 1) * 1000 {
                t.put(i, i).unwrap();
            }
        }));
    }
    for j in joins.drain(..) {
        j.join().unwrap();
    }

    for thread_idx in 0..5u64 {
        let t = t.clone();
        joins.push(thread::spawn(move || {
            for i in thread_idx * 2000..(thread_idx + 1) * 2000 {
                assert_eq!(t.get(&i), Some(i));
            }
        }));
    }
    for j in joins {
        j.join().unwrap();
    }

    assert_eq!(t.len(), 10_000);
}

#[test]
fn spam_insert_and_remove_disjoint_ranges() {
    // Two threads, disjoint key ranges, 10,000 puts each.
    let t = Arc::new(Table::<u64, u64>::new().unwrap());

    let handles: Vec<_> = (0..2u64)
        .map(|thread_idx| {
            let t = t.clone();
            thread::spawn(move || {
                let base = thread_idx * 10_000;
                for i in base..base + 10_000 {
                    t.put(i, i).unwrap();
                }
                for i in base..base + 10_000 {
                    assert_eq!(t.get(&i), Some(i));
                }
            })
        })
        .collect();

    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(t.len(), 20_000);
}

#[test]
fn concurrent_put_get_remove_on_shared_keys() {
    let t = Arc::new(Table::<u64, u64>::new().unwrap());
    for i in 0..256u64 {
        t.put(i, i).unwrap();
    }

    let remover = {
        let t = t.clone();
        thread::spawn(move || {
            for i in (0..256u64).step_by(2) {
                t.remove(&i);
            }
        })
    };
    let reader = {
        let t = t.clone();
        thread::spawn(move || {
            for _ in 0..2000 {
                for i in 0..256u64 {
                    // Every observed value must be the one this test put
                    // there; a torn/garbage read would fail this.
                    if let Some(v) = t.get(&i) {
                        assert_eq!(v, i);
                    }
                }
            }
        })
    };

    remover.join().unwrap();
    reader.join().unwrap();

    for i in (1..256u64).step_by(2) {
        assert_eq!(t.get(&i), Some(i));
    }
    for i in (0..256u64).step_by(2) {
        assert_eq!(t.get(&i), None);
    }
}

#[test]
fn dispose_drops_cleanly() {
    let t: Table<u64, String> = Table::new().unwrap();
    t.put(1, "hello".to_owned()).unwrap();
    t.dispose();
}
