//! Part categories and the tolerance rules used to intersect them.
//!
//! A [`Category`] names the physical parts that may instantiate an atom: a flat
//! identifier set plus a role map (role -> identifiers filed under that role).
//! Every identifier filed under a role is also present in the flat set.

use std::fmt;

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

use crate::error::{ConstellationError, Result};

/// Strictness used when two categories are matched by an AND.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Tolerance {
    /// Identifiers must overlap.
    #[default]
    Strict,
    /// A side without identifiers may borrow the other side's, given a shared role.
    RoleRelaxed,
    /// Like `RoleRelaxed`, and two identifier-less sides match on a shared role alone.
    RoleOnly,
}

impl TryFrom<u8> for Tolerance {
    type Error = ConstellationError;

    fn try_from(level: u8) -> Result<Self> {
        match level {
            0 => Ok(Tolerance::Strict),
            1 => Ok(Tolerance::RoleRelaxed),
            2 => Ok(Tolerance::RoleOnly),
            _ => Err(ConstellationError::InvalidParameter(format!(
                "tolerance must be 0, 1 or 2, got {level}"
            ))),
        }
    }
}

impl From<Tolerance> for u8 {
    fn from(tolerance: Tolerance) -> Self {
        match tolerance {
            Tolerance::Strict => 0,
            Tolerance::RoleRelaxed => 1,
            Tolerance::RoleOnly => 2,
        }
    }
}

impl fmt::Display for Tolerance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", u8::from(*self))
    }
}

/// The set of parts eligible for one atom.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawCategory")]
pub struct Category {
    ids: IndexSet<String>,
    roles: IndexMap<String, IndexSet<String>>,
}

impl Category {
    /// Create a new empty category.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a category from a flat identifier list with no roles.
    pub fn from_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ids: ids.into_iter().map(Into::into).collect(),
            roles: IndexMap::new(),
        }
    }

    /// Builder form of [`Category::add_role_ids`].
    pub fn with_role<I, S>(mut self, role: impl Into<String>, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.add_role_ids(role, ids);
        self
    }

    /// Declare a role, possibly without any identifiers.
    pub fn add_role(&mut self, role: impl Into<String>) {
        self.roles.entry(role.into()).or_default();
    }

    /// File identifiers under a role; they also join the flat identifier set.
    pub fn add_role_ids<I, S>(&mut self, role: impl Into<String>, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let filed = self.roles.entry(role.into()).or_default();
        for id in ids {
            let id = id.into();
            filed.insert(id.clone());
            self.ids.insert(id);
        }
    }

    /// Every identifier in the category, in insertion order.
    pub fn ids(&self) -> &IndexSet<String> {
        &self.ids
    }

    /// Role name -> identifiers filed under it.
    pub fn roles(&self) -> &IndexMap<String, IndexSet<String>> {
        &self.roles
    }

    /// Check if the category names at least one concrete part.
    pub fn has_ids(&self) -> bool {
        !self.ids.is_empty()
    }

    /// A category is empty when it has neither identifiers nor roles.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty() && self.roles.is_empty()
    }

    /// Whether the two categories declare at least one role in common.
    pub fn shares_role(&self, other: &Category) -> bool {
        self.roles.keys().any(|role| other.roles.contains_key(role))
    }

    /// Union another category into this one.
    pub fn union_with(&mut self, other: &Category) {
        self.ids.extend(other.ids.iter().cloned());
        for (role, ids) in &other.roles {
            self.roles
                .entry(role.clone())
                .or_default()
                .extend(ids.iter().cloned());
        }
    }

    /// Intersect two categories under the given tolerance.
    ///
    /// The result is empty (see [`Category::is_empty`]) when the two do not match.
    pub fn combine(&self, other: &Category, tolerance: Tolerance) -> Category {
        match tolerance {
            Tolerance::Strict => self.combine_strict(other),
            Tolerance::RoleRelaxed => self.combine_role_relaxed(other),
            Tolerance::RoleOnly => self.combine_role_only(other),
        }
    }

    fn combine_strict(&self, other: &Category) -> Category {
        let common: IndexSet<String> = self
            .ids
            .iter()
            .filter(|id| other.ids.contains(*id))
            .cloned()
            .collect();
        if common.is_empty() {
            return Category::default();
        }

        let mut roles: IndexMap<String, IndexSet<String>> = IndexMap::new();
        for (role, ids) in self.roles.iter().chain(other.roles.iter()) {
            for id in ids.iter().filter(|id| common.contains(*id)) {
                roles.entry(role.clone()).or_default().insert(id.clone());
            }
        }

        Category { ids: common, roles }
    }

    fn combine_role_relaxed(&self, other: &Category) -> Category {
        if self.has_ids() && other.has_ids() {
            return self.combine_strict(other);
        }
        if !self.shares_role(other) {
            return Category::default();
        }

        let ids = if self.ids.is_empty() {
            &other.ids
        } else {
            &self.ids
        };
        if ids.is_empty() {
            return Category::default();
        }

        let mut combined = self.clone();
        combined.union_with(other);
        combined.ids = ids.clone();
        combined
    }

    fn combine_role_only(&self, other: &Category) -> Category {
        if self.ids.is_empty() && other.ids.is_empty() {
            if !self.shares_role(other) {
                return Category::default();
            }
            // Provisional match: roles only, parts are chosen later.
            let mut combined = self.clone();
            combined.union_with(other);
            return combined;
        }
        self.combine_role_relaxed(other)
    }
}

/// Wire form of a category entry in a categories document.
#[derive(Deserialize)]
struct RawCategory {
    #[serde(default)]
    ids: Vec<String>,
    #[serde(default)]
    roles: Option<RawRoles>,
    #[serde(default)]
    role: Option<String>,
    #[serde(flatten)]
    other: IndexMap<String, serde_json::Value>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawRoles {
    Names(Vec<String>),
    Map(IndexMap<String, Vec<String>>),
}

impl From<RawCategory> for Category {
    fn from(raw: RawCategory) -> Self {
        let mut category = Category::from_ids(raw.ids);
        match raw.roles {
            Some(RawRoles::Names(names)) => {
                for name in names {
                    category.add_role(name);
                }
            }
            Some(RawRoles::Map(map)) => {
                for (role, ids) in map {
                    category.add_role_ids(role, ids);
                }
            }
            None => {}
        }
        if let Some(role) = raw.role {
            category.add_role(role);
        }
        // Remaining list-valued keys are the role-map form: role -> identifiers.
        for (role, value) in raw.other {
            if let serde_json::Value::Array(items) = value {
                let ids: Vec<String> = items
                    .iter()
                    .filter_map(|item| item.as_str().map(str::to_owned))
                    .collect();
                category.add_role_ids(role, ids);
            }
        }
        category
    }
}

/// Label -> category lookup shared by construction and enumeration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryTable {
    entries: IndexMap<String, Category>,
}

impl CategoryTable {
    /// Create a new empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the category for an atom label.
    pub fn get(&self, label: &str) -> Option<&Category> {
        self.entries.get(label)
    }

    /// Check if a label is defined.
    pub fn contains(&self, label: &str) -> bool {
        self.entries.contains_key(label)
    }

    /// Insert or replace a category, returning the previous one.
    pub fn insert(&mut self, label: impl Into<String>, category: Category) -> Option<Category> {
        self.entries.insert(label.into(), category)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Category)> + '_ {
        self.entries.iter()
    }

    /// Copy every entry of `other` into this table, replacing same-named entries.
    pub fn extend(&mut self, other: CategoryTable) {
        self.entries.extend(other.entries);
    }

    /// Store the result of combining the categories behind `label1` and `label2`
    /// and return the label the combined edge should carry.
    ///
    /// Identical labels keep their name. Otherwise the pair is named
    /// `label1_label2`, unless either ordering already exists, in which case the
    /// combined category is folded into that entry.
    pub fn register_merged(&mut self, label1: &str, label2: &str, combined: Category) -> String {
        if label1 == label2 {
            self.entries.insert(label1.to_string(), combined);
            return label1.to_string();
        }

        let forward = format!("{label1}_{label2}");
        if let Some(existing) = self.entries.get_mut(&forward) {
            existing.union_with(&combined);
            return forward;
        }
        let backward = format!("{label2}_{label1}");
        if let Some(existing) = self.entries.get_mut(&backward) {
            existing.union_with(&combined);
            return backward;
        }

        self.entries.insert(forward.clone(), combined);
        forward
    }
}

impl FromIterator<(String, Category)> for CategoryTable {
    fn from_iter<I: IntoIterator<Item = (String, Category)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Parse a categories document (a JSON object of label -> category).
pub fn parse_categories(text: &str) -> Result<CategoryTable> {
    let text = text.replace('\t', " ");
    Ok(serde_json::from_str(&text)?)
}
