// ********* Input data structures ***********

use std::error::Error;
use std::fmt::Display;
use std::ops::{Index, IndexMut};

/// The eligibility categories, in priority order.
///
/// The order matters: when a category cannot fill its quota, the freed slots
/// go to the waitlists of the earlier categories first.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub enum Category {
    Student,
    Staff,
    ExternalCommunity,
}

impl Category {
    /// All the categories, highest priority first.
    pub const ALL: [Category; 3] = [
        Category::Student,
        Category::Staff,
        Category::ExternalCommunity,
    ];

    /// The label used in the input and output files.
    pub fn label(&self) -> &'static str {
        match self {
            Category::Student => "Aluno",
            Category::Staff => "Servidor",
            Category::ExternalCommunity => "Comunidade Externa",
        }
    }

    /// Parses one of the labels returned by [`Category::label`].
    pub fn from_label(label: &str) -> Option<Category> {
        Category::ALL.into_iter().find(|c| c.label() == label)
    }

    fn position(self) -> usize {
        self as usize
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// One value per category, indexed by [`Category`].
#[derive(Eq, PartialEq, Debug, Clone, Copy, Default, Hash)]
pub struct PerCategory<T>([T; 3]);

impl<T> PerCategory<T> {
    pub fn new(student: T, staff: T, external: T) -> PerCategory<T> {
        PerCategory([student, staff, external])
    }

    /// Iterates in priority order.
    pub fn iter(&self) -> impl Iterator<Item = (Category, &T)> {
        Category::ALL.into_iter().zip(self.0.iter())
    }
}

impl PerCategory<u32> {
    pub fn total(&self) -> u32 {
        self.0.iter().sum()
    }
}

impl<T> Index<Category> for PerCategory<T> {
    type Output = T;
    fn index(&self, cat: Category) -> &T {
        &self.0[cat.position()]
    }
}

impl<T> IndexMut<Category> for PerCategory<T> {
    fn index_mut(&mut self, cat: Category) -> &mut T {
        &mut self.0[cat.position()]
    }
}

/// The number of slots reserved for each category.
///
/// Invariant: the quotas of a pool add up to the slots of this pool.
pub type Quotas = PerCategory<u32>;

/// The share of the slots requested for each category.
///
/// The shares do not need to add up to 1, they are normalized before use.
/// Negative shares count as zero. A NaN share is invalid.
#[derive(PartialEq, Debug, Clone, Copy)]
pub struct Shares(PerCategory<f64>);

impl Shares {
    pub fn new(student: f64, staff: f64, external: f64) -> Shares {
        Shares(PerCategory::new(student, staff, external))
    }

    pub fn get(&self, cat: Category) -> f64 {
        self.0[cat]
    }

    /// Rescales the shares so that they add up to 1.
    pub fn normalized(&self) -> Result<Shares, LotteryErrors> {
        if self.0.iter().any(|(_, s)| s.is_nan()) {
            return Err(LotteryErrors::InvalidShares);
        }
        let clamped = PerCategory::new(
            self.0[Category::Student].max(0.0),
            self.0[Category::Staff].max(0.0),
            self.0[Category::ExternalCommunity].max(0.0),
        );
        let total: f64 = clamped.iter().map(|(_, s)| *s).sum();
        if !(total > 0.0) || !total.is_finite() {
            return Err(LotteryErrors::InvalidShares);
        }
        Ok(Shares(PerCategory::new(
            clamped[Category::Student] / total,
            clamped[Category::Staff] / total,
            clamped[Category::ExternalCommunity] / total,
        )))
    }

    /// Sets the share of the categories outside `allowed` to zero.
    pub fn restricted(&self, allowed: &[Category]) -> Shares {
        let mut res = *self;
        for cat in Category::ALL {
            if !allowed.contains(&cat) {
                res.0[cat] = 0.0;
            }
        }
        res
    }
}

/// A candidate registered for the lottery.
///
/// Candidates are never compared by value: two records with the same fields
/// are still two different candidates.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub id: String,
    pub name: String,
    pub category: Category,
    /// The group (class, section, ...) this candidate applies to.
    pub group: Option<String>,
    /// The categories that the group of this candidate accepts, when the
    /// record carries this information.
    pub group_categories: Option<Vec<Category>>,
    /// The other columns of the original record, in their original order.
    /// They are only used when writing the results.
    pub extra: Vec<(String, String)>,
}

impl Candidate {
    pub fn new(id: &str, name: &str, category: Category) -> Candidate {
        Candidate {
            id: id.to_string(),
            name: name.to_string(),
            category,
            group: None,
            group_categories: None,
            extra: Vec::new(),
        }
    }

    pub fn with_group(self, group: &str) -> Candidate {
        Candidate {
            group: Some(group.to_string()),
            ..self
        }
    }

    /// The group name, or the empty string for candidates without a group.
    pub fn group_name(&self) -> &str {
        self.group.as_deref().unwrap_or("")
    }

    /// Looks up a column of the original record.
    pub fn field(&self, column: &str) -> Option<&str> {
        self.extra
            .iter()
            .find(|(k, _)| k == column)
            .map(|(_, v)| v.as_str())
    }
}

// ******** Output data structures *********

/// The result of the lottery for one pool of slots.
#[derive(Debug, Clone, Default)]
pub struct LotteryOutcome<'a> {
    /// The candidates that obtained a slot, in draw order.
    pub admitted: Vec<&'a Candidate>,
    /// The other eligible candidates, in the order they will be called.
    pub waitlisted: Vec<&'a Candidate>,
    /// The quotas computed for this pool, before any redistribution.
    pub quotas: Quotas,
}

impl PartialEq for LotteryOutcome<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.quotas == other.quotas
            && same_records(&self.admitted, &other.admitted)
            && same_records(&self.waitlisted, &other.waitlisted)
    }
}

fn same_records(l: &[&Candidate], r: &[&Candidate]) -> bool {
    l.len() == r.len() && l.iter().zip(r.iter()).all(|(a, b)| std::ptr::eq(*a, *b))
}

/// The result of the lottery for one group.
#[derive(PartialEq, Debug, Clone)]
pub struct GroupOutcome<'a> {
    pub group: String,
    pub slots: u32,
    /// The seed derived for this group.
    pub seed: u64,
    /// The categories admitted in this group.
    pub allowed: Vec<Category>,
    pub outcome: LotteryOutcome<'a>,
}

/// Errors that prevent the lottery from running.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum LotteryErrors {
    /// The category shares add up to zero (or less).
    InvalidShares,
    /// Two candidates share the same identifier.
    DuplicateCandidate(String),
}

impl Error for LotteryErrors {}

impl Display for LotteryErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LotteryErrors::InvalidShares => {
                write!(f, "the category percentages must add up to more than zero")
            }
            LotteryErrors::DuplicateCandidate(id) => {
                write!(f, "candidate id {:?} is used more than once", id)
            }
        }
    }
}
