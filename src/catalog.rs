//! Browsing helpers over the variable catalog.

use indexmap::IndexMap;

use crate::metadata::{CountryMetadata, VariableInfo};

/// Category name for variables without a module path.
pub const OTHER_CATEGORY: &str = "Other";

/// Input variables in catalog order.
#[must_use]
pub fn input_variables(metadata: &CountryMetadata) -> Vec<&VariableInfo> {
    metadata
        .variables
        .values()
        .filter(|v| v.is_input_variable)
        .collect()
}

/// One node of the category tree.
#[derive(Debug, Clone, PartialEq)]
pub struct NestedCategory<'a> {
    pub name: String,
    /// Variables whose module path ends at this node.
    pub variables: Vec<&'a VariableInfo>,
    pub subcategories: IndexMap<String, NestedCategory<'a>>,
}

impl<'a> NestedCategory<'a> {
    fn new(name: String) -> Self {
        Self {
            name,
            variables: Vec::new(),
            subcategories: IndexMap::new(),
        }
    }

    /// Variables in this node and every subcategory.
    #[must_use]
    pub fn total_count(&self) -> usize {
        self.variables.len()
            + self
                .subcategories
                .values()
                .map(NestedCategory::total_count)
                .sum::<usize>()
    }

    /// How many of `selected` appear in this subtree.
    #[must_use]
    pub fn selected_count(&self, selected: &[String]) -> usize {
        let here = self
            .variables
            .iter()
            .filter(|v| selected.iter().any(|s| *s == v.name))
            .count();
        here + self
            .subcategories
            .values()
            .map(|c| c.selected_count(selected))
            .sum::<usize>()
    }

    /// Looks up a descendant by humanized path segments.
    #[must_use]
    pub fn find(&self, path: &[&str]) -> Option<&NestedCategory<'a>> {
        match path.split_first() {
            None => Some(self),
            Some((head, rest)) => self.subcategories.get(*head)?.find(rest),
        }
    }
}

/// `employment_income` → `Employment income`.
fn humanize(segment: &str) -> String {
    let spaced = segment.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Partitions variables into a category tree built from each variable's
/// module path.
///
/// Top-level categories come back in first-seen order, with
/// [`OTHER_CATEGORY`] last when any variable has no category path.
///
/// # Examples
///
/// ```
/// use policysim::{catalog, ValueType, VariableInfo};
///
/// let rent = VariableInfo::new("rent", "Rent", "household", ValueType::Float)
///     .with_module("household.expense.housing.rent");
/// let tree = catalog::group_variables_nested([&rent]);
///
/// assert_eq!(tree[0].name, "Household");
/// assert_eq!(tree[0].find(&["Expense", "Housing"]).unwrap().variables.len(), 1);
/// ```
#[must_use]
pub fn group_variables_nested<'a, I>(variables: I) -> Vec<NestedCategory<'a>>
where
    I: IntoIterator<Item = &'a VariableInfo>,
{
    let mut root = NestedCategory::new(String::new());
    let mut other = NestedCategory::new(OTHER_CATEGORY.to_string());

    for variable in variables {
        let path = variable.category_path();
        if path.is_empty() {
            other.variables.push(variable);
            continue;
        }
        let mut node = &mut root;
        for segment in path {
            let name = humanize(segment);
            node = node
                .subcategories
                .entry(name.clone())
                .or_insert_with(|| NestedCategory::new(name));
        }
        node.variables.push(variable);
    }

    let mut categories: Vec<_> = root.subcategories.into_values().collect();
    if !other.variables.is_empty() {
        categories.push(other);
    }
    categories
}

/// Case-insensitive substring search on label or name, in input order.
///
/// A blank query matches nothing. `limit` caps the result length.
#[must_use]
pub fn search_variables<'a, I>(
    variables: I,
    query: &str,
    limit: Option<usize>,
) -> Vec<&'a VariableInfo>
where
    I: IntoIterator<Item = &'a VariableInfo>,
{
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return Vec::new();
    }
    variables
        .into_iter()
        .filter(|v| {
            v.label.to_lowercase().contains(&query) || v.name.to_lowercase().contains(&query)
        })
        .take(limit.unwrap_or(usize::MAX))
        .collect()
}
