//! Search and category filtering for the catalog screens.

use crate::model::*;

/// Category selector that matches every item.
pub const ALL: &str = "all";

/// Number of actions the dashboard recommends.
pub const MAX_RECOMMENDED: usize = 3;

/// Items that belong to a named category.
pub trait Categorized {
    fn category(&self) -> &str;
}

impl Categorized for Challenge {
    fn category(&self) -> &str {
        &self.category
    }
}

impl Categorized for Resource {
    fn category(&self) -> &str {
        &self.category
    }
}

impl Categorized for LocalService {
    fn category(&self) -> &str {
        &self.category
    }
}

impl Categorized for EcoTip {
    fn category(&self) -> &str {
        &self.category
    }
}

/// Case-insensitive substring match of `term` against any of `fields`.
/// An empty term matches everything.
pub fn matches_search(term: &str, fields: &[&str]) -> bool {
    if term.is_empty() {
        return true;
    }
    let term = term.to_lowercase();
    fields.iter().any(|f| f.to_lowercase().contains(&term))
}

pub fn matches_selector(selector: &str, value: &str) -> bool {
    selector == ALL || selector == value
}

/// `["all", ...]` followed by each distinct category in first-seen order.
pub fn categories<T: Categorized>(items: &[T]) -> Vec<String> {
    distinct(items.iter().map(|i| i.category().to_string()))
}

/// `["all", ...]` followed by each distinct resource type in first-seen order.
pub fn resource_kinds(resources: &[Resource]) -> Vec<String> {
    distinct(resources.iter().map(|r| r.kind.to_string()))
}

fn distinct(values: impl Iterator<Item = String>) -> Vec<String> {
    let mut out = vec![ALL.to_string()];
    for v in values {
        if !out.contains(&v) {
            out.push(v);
        }
    }
    out
}

pub fn filter_challenges<'a>(
    challenges: &'a [Challenge],
    term: &str,
    category: &str,
) -> Vec<&'a Challenge> {
    challenges
        .iter()
        .filter(|c| matches_search(term, &[&c.title, &c.description]))
        .filter(|c| matches_selector(category, &c.category))
        .collect()
}

pub fn filter_resources<'a>(
    resources: &'a [Resource],
    term: &str,
    kind: &str,
    category: &str,
) -> Vec<&'a Resource> {
    resources
        .iter()
        .filter(|r| matches_search(term, &[&r.title, &r.description]))
        .filter(|r| matches_selector(kind, &r.kind.to_string()))
        .filter(|r| matches_selector(category, &r.category))
        .collect()
}

pub fn filter_services<'a>(
    services: &'a [LocalService],
    term: &str,
    category: &str,
) -> Vec<&'a LocalService> {
    services
        .iter()
        .filter(|s| matches_search(term, &[&s.name, &s.description]))
        .filter(|s| matches_selector(category, &s.category))
        .collect()
}

/// Actions that target the user's weakest gauges, at most [`MAX_RECOMMENDED`].
pub fn recommended_actions<'a>(stats: &UserStats, actions: &'a [EcoAction]) -> Vec<&'a EcoAction> {
    actions
        .iter()
        .filter(|a| {
            (stats.carbon_footprint > 10.0 && a.impact.carbon > 0.5)
                || (stats.water_usage > 300.0 && a.impact.water > 30.0)
                || (stats.waste_reduction < 20.0 && a.impact.waste > 0.3)
                || (stats.energy_saved < 250.0 && a.impact.energy > 50.0)
        })
        .take(MAX_RECOMMENDED)
        .collect()
}
