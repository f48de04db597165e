pub use crate::config::*;

use std::collections::{HashMap, HashSet};

/// A builder for registering candidates and running the lottery on them.
///
/// ```
/// use quota_lottery::builder::Builder;
/// use quota_lottery::{Category, Shares};
/// # use quota_lottery::LotteryErrors;
///
/// let mut builder = Builder::new(&Shares::new(0.6, 0.2, 0.2), 42)?;
///
/// builder.add_candidate_simple("Anna", Category::Student)?;
/// builder.add_candidate_simple("Bob", Category::Staff)?;
///
/// let outcome = builder.draw(1)?;
/// assert_eq!(outcome.admitted.len(), 1);
/// assert_eq!(outcome.waitlisted.len(), 1);
///
/// # Ok::<(), LotteryErrors>(())
/// ```
pub struct Builder {
    pub(crate) _shares: Shares,
    pub(crate) _seed: u64,
    pub(crate) _candidates: Vec<Candidate>,
    pub(crate) _ids: HashSet<String>,
}

impl Builder {
    pub fn new(shares: &Shares, seed: u64) -> Result<Builder, LotteryErrors> {
        // Fail early rather than at draw time.
        shares.normalized()?;
        Ok(Builder {
            _shares: *shares,
            _seed: seed,
            _candidates: Vec::new(),
            _ids: HashSet::new(),
        })
    }

    /// Adds a candidate with a generated identifier (its registration number).
    pub fn add_candidate_simple(
        &mut self,
        name: &str,
        category: Category,
    ) -> Result<(), LotteryErrors> {
        let id = (self._candidates.len() + 1).to_string();
        self.add_candidate(Candidate::new(&id, name, category))
    }

    /// Adds a candidate. The identifier of the candidate must not be already registered.
    pub fn add_candidate(&mut self, candidate: Candidate) -> Result<(), LotteryErrors> {
        if !self._ids.insert(candidate.id.clone()) {
            return Err(LotteryErrors::DuplicateCandidate(candidate.id));
        }
        self._candidates.push(candidate);
        Ok(())
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self._candidates
    }

    /// Runs the lottery on all the registered candidates as a single pool.
    pub fn draw(&self, slots: u32) -> Result<LotteryOutcome<'_>, LotteryErrors> {
        crate::run_lottery(&self._candidates, slots, &self._shares, self._seed)
    }

    /// Runs the lottery separately for each group of candidates.
    pub fn draw_per_group(
        &self,
        group_slots: &HashMap<String, u32>,
    ) -> Result<Vec<GroupOutcome<'_>>, LotteryErrors> {
        crate::run_lottery_per_group(&self._candidates, group_slots, &self._shares, self._seed)
    }
}
