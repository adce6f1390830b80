use crate::models::{Filters, ProgramRecord, ProgramSearchQuery};

/// Check a candidate against the hard constraints
///
/// All filters are conjunctive:
/// - school type must match (case-insensitive) unless it is "any" or blank
/// - at least one location substring must appear in the candidate's location
/// - numeric tuition per semester must not exceed the budget
///
/// A candidate without a numeric tuition is never rejected on budget.
#[inline]
pub fn passes_filters(program: &ProgramRecord, filters: &Filters) -> bool {
    matches_school_type(program, &filters.school_type)
        && matches_locations(program, &filters.locations)
        && within_budget(program, filters.max_budget)
}

#[inline]
fn matches_school_type(program: &ProgramRecord, school_type: &str) -> bool {
    let wanted = school_type.to_lowercase();
    if wanted.is_empty() || wanted == "any" {
        return true;
    }

    program
        .school_type
        .as_deref()
        .unwrap_or_default()
        .to_lowercase()
        == wanted
}

#[inline]
fn matches_locations(program: &ProgramRecord, locations: &[String]) -> bool {
    if locations.is_empty() {
        return true;
    }

    let location = program.location.as_deref().unwrap_or_default().to_lowercase();
    locations
        .iter()
        .any(|loc| location.contains(&loc.to_lowercase()))
}

#[inline]
fn within_budget(program: &ProgramRecord, max_budget: Option<f64>) -> bool {
    match (max_budget, program.tuition_amount()) {
        (Some(budget), Some(tuition)) => tuition <= budget,
        _ => true,
    }
}

/// Apply the filters to a catalog, preserving order
pub fn filter_candidates<'a>(
    catalog: &'a [ProgramRecord],
    filters: &Filters,
) -> Vec<&'a ProgramRecord> {
    catalog
        .iter()
        .filter(|program| passes_filters(program, filters))
        .collect()
}

/// Case-insensitive substring search over name, location and category.
///
/// Blank or absent terms are ignored; a record missing a searched field
/// does not match. Catalog order is kept.
pub fn search_programs<'a>(
    catalog: &'a [ProgramRecord],
    query: &ProgramSearchQuery,
) -> Vec<&'a ProgramRecord> {
    let term = |t: &Option<String>| {
        t.as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_lowercase)
    };
    let name = term(&query.name);
    let location = term(&query.location);
    let category = term(&query.category);

    catalog
        .iter()
        .filter(|program| {
            contains_term(Some(program.name.as_str()), name.as_deref())
                && contains_term(program.location.as_deref(), location.as_deref())
                && contains_term(program.category.as_deref(), category.as_deref())
        })
        .collect()
}

#[inline]
fn contains_term(field: Option<&str>, term: Option<&str>) -> bool {
    match (field, term) {
        (_, None) => true,
        (Some(field), Some(term)) => field.to_lowercase().contains(term),
        (None, Some(_)) => false,
    }
}
