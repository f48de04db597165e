mod config;
pub mod builder;
pub mod manual;

use log::{debug, info, warn};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use std::collections::HashMap;

pub use crate::config::*;

// **** Private structures ****

// Position of a candidate in the slice handed over by the caller.
type CandidateIdx = usize;

/// The working lists of a pool while the lottery runs: for each category,
/// the candidates drawn so far and the ones still waiting.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct CategoryDraw<T> {
    pub selected: PerCategory<Vec<T>>,
    pub waiting: PerCategory<Vec<T>>,
}

/// Computes how many slots each category receives.
///
/// Each category gets the integer part of its share of the slots. The slots left over by the
/// rounding are handed out one at a time, following the priority order of the categories.
///
/// ```
/// use quota_lottery::*;
///
/// let quotas = compute_quota(10, &Shares::new(0.6, 0.2, 0.2))?;
/// assert_eq!(quotas, PerCategory::new(6, 2, 2));
/// # Ok::<(), LotteryErrors>(())
/// ```
pub fn compute_quota(slots: u32, shares: &Shares) -> Result<Quotas, LotteryErrors> {
    let shares = shares.normalized()?;
    let mut quotas: Quotas = PerCategory::default();
    for cat in Category::ALL {
        quotas[cat] = (slots as f64 * shares.get(cat)).floor() as u32;
    }
    let mut remainder = slots.saturating_sub(quotas.total());
    debug!(
        "compute_quota: slots: {:?} rounded quotas: {:?} remainder: {:?}",
        slots, quotas, remainder
    );
    for cat in Category::ALL.iter().cycle() {
        if remainder == 0 {
            break;
        }
        quotas[*cat] += 1;
        remainder -= 1;
    }
    Ok(quotas)
}

/// Draws `k` winners out of a pool, without replacement.
///
/// Returns the winners and the waitlist. When the pool is large enough, both lists are in
/// random order. When nobody is drawn, the waitlist is the pool in its original order.
pub fn draw_for_category<T: Clone, R: Rng + ?Sized>(
    rng: &mut R,
    pool: &[T],
    k: usize,
) -> (Vec<T>, Vec<T>) {
    if k == 0 || pool.is_empty() {
        return (Vec::new(), pool.to_vec());
    }
    let mut shuffled = pool.to_vec();
    if k >= pool.len() {
        shuffled.shuffle(rng);
        return (shuffled, Vec::new());
    }
    let (selected, rest) = shuffled.partial_shuffle(rng, k);
    let selected = selected.to_vec();
    let mut remaining = rest.to_vec();
    // The order of the waitlist must not depend on the order of the selection.
    remaining.shuffle(rng);
    (selected, remaining)
}

/// Fills the quotas that some categories could not fill by themselves.
///
/// The number of missing winners is summed over all the categories. These slots are then
/// given to the waitlisted candidates, taking the front of the waitlist of the highest priority
/// category first, regardless of the category that had the shortfall. If all the waitlists run
/// out, the remaining slots stay empty.
pub fn redistribute_shortfalls<T>(draw: CategoryDraw<T>, quotas: &Quotas) -> CategoryDraw<T> {
    let CategoryDraw {
        mut selected,
        mut waiting,
    } = draw;
    let mut deficit: usize = Category::ALL
        .iter()
        .map(|cat| (quotas[*cat] as usize).saturating_sub(selected[*cat].len()))
        .sum();
    if deficit == 0 {
        return CategoryDraw { selected, waiting };
    }
    debug!("redistribute_shortfalls: total deficit: {:?}", deficit);

    for cat in Category::ALL {
        if deficit == 0 {
            break;
        }
        let take = deficit.min(waiting[cat].len());
        let moved: Vec<T> = waiting[cat].drain(..take).collect();
        debug!(
            "redistribute_shortfalls: {:?} receives {:?} extra slots",
            cat, take
        );
        selected[cat].extend(moved);
        deficit -= take;
    }
    if deficit > 0 {
        debug!(
            "redistribute_shortfalls: not enough candidates, {:?} slots stay empty",
            deficit
        );
    }
    CategoryDraw { selected, waiting }
}

/// Runs the lottery for a single pool of slots.
///
/// Arguments:
/// * `candidates` all the candidates of the pool
/// * `slots` the number of slots to fill. No candidate is drawn if it is zero.
/// * `shares` the share of the slots reserved for each category
/// * `seed` the seed of the random generator. The same inputs with the same seed always give
/// the same outcome, including the order of the lists.
pub fn run_lottery<'a>(
    candidates: &'a [Candidate],
    slots: u32,
    shares: &Shares,
    seed: u64,
) -> Result<LotteryOutcome<'a>, LotteryErrors> {
    info!(
        "run_lottery: {:?} candidates, {:?} slots, seed {:?}",
        candidates.len(),
        slots,
        seed
    );
    let eligible: Vec<CandidateIdx> = (0..candidates.len()).collect();
    run_pool(candidates, &eligible, slots, shares, seed)
}

fn run_pool<'a>(
    candidates: &'a [Candidate],
    eligible: &[CandidateIdx],
    slots: u32,
    shares: &Shares,
    seed: u64,
) -> Result<LotteryOutcome<'a>, LotteryErrors> {
    if slots == 0 {
        return Ok(LotteryOutcome::default());
    }
    let quotas = compute_quota(slots, shares)?;
    info!("run_pool: quotas: {:?}", quotas);

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let pools = partition_by_category(candidates, eligible);

    let mut draw: CategoryDraw<CandidateIdx> = CategoryDraw::default();
    for cat in Category::ALL {
        let (selected, waiting) = draw_for_category(&mut rng, &pools[cat], quotas[cat] as usize);
        debug!(
            "run_pool: {:?}: pool: {:?} quota: {:?} drawn: {:?}",
            cat,
            pools[cat].len(),
            quotas[cat],
            selected.len()
        );
        draw.selected[cat] = selected;
        draw.waiting[cat] = waiting;
    }

    let draw = redistribute_shortfalls(draw, &quotas);

    let mut admitted: Vec<&Candidate> = collect_in_priority(candidates, &draw.selected);
    admitted.truncate(slots as usize);
    let waitlisted: Vec<&Candidate> = collect_in_priority(candidates, &draw.waiting);
    info!(
        "run_pool: {:?} admitted, {:?} waitlisted",
        admitted.len(),
        waitlisted.len()
    );
    Ok(LotteryOutcome {
        admitted,
        waitlisted,
        quotas,
    })
}

fn partition_by_category(
    candidates: &[Candidate],
    eligible: &[CandidateIdx],
) -> PerCategory<Vec<CandidateIdx>> {
    let mut res: PerCategory<Vec<CandidateIdx>> = PerCategory::default();
    for idx in eligible.iter() {
        res[candidates[*idx].category].push(*idx);
    }
    res
}

fn collect_in_priority<'a>(
    candidates: &'a [Candidate],
    lists: &PerCategory<Vec<CandidateIdx>>,
) -> Vec<&'a Candidate> {
    lists
        .iter()
        .flat_map(|(_, l)| l.iter())
        .map(|idx| &candidates[*idx])
        .collect()
}

/// Runs the lottery independently for each group of candidates.
///
/// Arguments:
/// * `candidates` the candidates of all the groups. Candidates without a group belong to the
/// group with the empty name.
/// * `group_slots` the slots of each group. Groups that are missing or have zero slots get an
/// empty outcome.
/// * `shares` the shares of the categories, applied to every group. Within a group, the
/// categories that the group does not accept are left out and the shares of the others are
/// rescaled.
/// * `seed` the global seed. Each group draws with its own seed (see [`derive_group_seed`]), so
/// that the outcome of a group only depends on its own candidates.
///
/// The groups are returned in the order of their first candidate.
pub fn run_lottery_per_group<'a>(
    candidates: &'a [Candidate],
    group_slots: &HashMap<String, u32>,
    shares: &Shares,
    seed: u64,
) -> Result<Vec<GroupOutcome<'a>>, LotteryErrors> {
    let shares = shares.normalized()?;

    let mut groups: Vec<(&str, Vec<CandidateIdx>)> = Vec::new();
    let mut positions: HashMap<&str, usize> = HashMap::new();
    for (idx, c) in candidates.iter().enumerate() {
        let name = c.group_name();
        let pos = *positions.entry(name).or_insert_with(|| {
            groups.push((name, Vec::new()));
            groups.len() - 1
        });
        groups[pos].1.push(idx);
    }
    info!(
        "run_lottery_per_group: {:?} candidates in {:?} groups",
        candidates.len(),
        groups.len()
    );

    let mut res: Vec<GroupOutcome> = Vec::new();
    for (name, members) in groups.iter() {
        let group_seed = derive_group_seed(seed, name);
        let allowed = allowed_categories(candidates, members);
        let slots = match group_slots.get(*name) {
            Some(x) => *x,
            None => {
                warn!(
                    "run_lottery_per_group: no slots defined for group {:?}, skipping it",
                    name
                );
                0
            }
        };
        if slots == 0 {
            res.push(GroupOutcome {
                group: name.to_string(),
                slots,
                seed: group_seed,
                allowed,
                outcome: LotteryOutcome::default(),
            });
            continue;
        }

        let eligible: Vec<CandidateIdx> = members
            .iter()
            .copied()
            .filter(|idx| allowed.contains(&candidates[*idx].category))
            .collect();
        info!(
            "run_lottery_per_group: group {:?}: {:?} slots, {:?} of {:?} candidates eligible, categories {:?}",
            name,
            slots,
            eligible.len(),
            members.len(),
            allowed
        );
        let group_shares = shares.restricted(&allowed).normalized()?;
        let outcome = run_pool(candidates, &eligible, slots, &group_shares, group_seed)?;
        res.push(GroupOutcome {
            group: name.to_string(),
            slots,
            seed: group_seed,
            allowed,
            outcome,
        });
    }
    Ok(res)
}

// The first record of a group with group-level flags speaks for the whole group.
fn allowed_categories(candidates: &[Candidate], members: &[CandidateIdx]) -> Vec<Category> {
    let flags = members
        .iter()
        .find_map(|idx| candidates[*idx].group_categories.clone());
    match flags {
        Some(cats) if !cats.is_empty() => cats,
        _ => Category::ALL.to_vec(),
    }
}

/// Derives the seed of a group from the global seed.
///
/// The seed is the first 64 bits of the SHA-256 digest of `"{seed}|{group}"`. It does not
/// depend on the other groups, nor on the order in which the groups are processed.
pub fn derive_group_seed(seed: u64, group: &str) -> u64 {
    let digest: String = sha256::digest(format!("{}|{}", seed, group));
    digest
        .chars()
        .take(16)
        .filter_map(|c| c.to_digit(16))
        .fold(0u64, |acc, d| (acc << 4) | d as u64)
}
