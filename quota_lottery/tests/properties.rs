use proptest::prelude::*;
use quota_lottery::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::HashSet;

fn category() -> impl Strategy<Value = Category> {
    prop_oneof![
        Just(Category::Student),
        Just(Category::Staff),
        Just(Category::ExternalCommunity),
    ]
}

fn pool() -> impl Strategy<Value = Vec<Candidate>> {
    proptest::collection::vec(category(), 0..60).prop_map(|cats| {
        cats.into_iter()
            .enumerate()
            .map(|(i, cat)| Candidate::new(&i.to_string(), "n", cat))
            .collect()
    })
}

proptest! {
    #[test]
    fn quotas_add_up_to_slots(
        slots in 0u32..10_000,
        s in 0.0f64..1.0,
        t in 0.0f64..1.0,
        e in 0.001f64..1.0,
    ) {
        let q = compute_quota(slots, &Shares::new(s, t, e)).unwrap();
        prop_assert_eq!(q.total(), slots);
    }

    #[test]
    fn draw_splits_the_pool(n in 0usize..80, k in 0usize..100, seed in any::<u64>()) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let items: Vec<usize> = (0..n).collect();
        let (winners, waitlist) = draw_for_category(&mut rng, &items, k);
        prop_assert_eq!(winners.len(), k.min(n));
        prop_assert_eq!(waitlist.len(), n - winners.len());
        let w: HashSet<usize> = winners.iter().cloned().collect();
        let l: HashSet<usize> = waitlist.iter().cloned().collect();
        prop_assert!(w.is_disjoint(&l));
        prop_assert_eq!(w.len() + l.len(), n);
    }

    #[test]
    fn lottery_partitions_candidates(
        cands in pool(),
        slots in 0u32..80,
        seed in any::<u64>(),
    ) {
        let res = run_lottery(&cands, slots, &Shares::new(0.5, 0.3, 0.2), seed).unwrap();
        if slots == 0 {
            prop_assert!(res.admitted.is_empty() && res.waitlisted.is_empty());
        } else {
            prop_assert_eq!(res.admitted.len(), cands.len().min(slots as usize));
            prop_assert_eq!(res.admitted.len() + res.waitlisted.len(), cands.len());
            let admitted: HashSet<&str> = res.admitted.iter().map(|c| c.id.as_str()).collect();
            prop_assert!(res.waitlisted.iter().all(|c| !admitted.contains(c.id.as_str())));
        }
    }

    #[test]
    fn lottery_is_reproducible(cands in pool(), slots in 1u32..40, seed in any::<u64>()) {
        let shares = Shares::new(0.4, 0.4, 0.2);
        let r1 = run_lottery(&cands, slots, &shares, seed).unwrap();
        let r2 = run_lottery(&cands, slots, &shares, seed).unwrap();
        prop_assert_eq!(r1, r2);
    }
}
