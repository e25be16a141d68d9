// Search / categorical filter / pagination pipeline for list views
use serde::Serialize;

/// Sentinel meaning "do not filter on this category".
pub const ALL: &str = "ALL";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CategoryFilter {
    #[default]
    All,
    Only(String),
}

impl CategoryFilter {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            None | Some("") => CategoryFilter::All,
            Some(v) if v.eq_ignore_ascii_case(ALL) || v == "All Vehicles" => CategoryFilter::All,
            Some(v) => CategoryFilter::Only(v.to_string()),
        }
    }

    pub fn matches(&self, value: &str) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Only(expected) => expected == value,
        }
    }
}

type Predicate<'a, T> = Box<dyn Fn(&T) -> bool + Send + Sync + 'a>;

/// AND-combined record predicates.
pub struct Pipeline<'a, T> {
    predicates: Vec<Predicate<'a, T>>,
}

impl<'a, T: Clone> Pipeline<'a, T> {
    pub fn new() -> Self {
        Self {
            predicates: Vec::new(),
        }
    }

    /// Case-insensitive free-text match; a record passes if any field matches.
    pub fn search<F>(mut self, term: &str, fields: F) -> Self
    where
        F: Fn(&T) -> Vec<String> + Send + Sync + 'a,
    {
        let needle = SearchTerm::new(term);
        if !needle.is_empty() {
            self.predicates
                .push(Box::new(move |r| fields(r).iter().any(|f| needle.matches(f))));
        }
        self
    }

    pub fn category<F>(mut self, filter: CategoryFilter, value: F) -> Self
    where
        F: Fn(&T) -> String + Send + Sync + 'a,
    {
        if filter != CategoryFilter::All {
            self.predicates.push(Box::new(move |r| filter.matches(&value(r))));
        }
        self
    }

    pub fn apply(&self, records: &[T]) -> Vec<T> {
        records
            .iter()
            .filter(|r| self.predicates.iter().all(|p| p(r)))
            .cloned()
            .collect()
    }
}

impl<T: Clone> Default for Pipeline<'_, T> {
    fn default() -> Self {
        Self::new()
    }
}

/// A lowercase needle that also tolerates zero padding in digit runs, so
/// `car1` finds `CAR001`.
#[derive(Debug, Clone)]
struct SearchTerm {
    raw: String,
    unpadded: String,
}

impl SearchTerm {
    fn new(term: &str) -> Self {
        let raw = term.to_lowercase();
        let unpadded = strip_zero_padding(&raw);
        Self { raw, unpadded }
    }

    fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    fn matches(&self, field: &str) -> bool {
        let field = field.to_lowercase();
        field.contains(&self.raw) || strip_zero_padding(&field).contains(&self.unpadded)
    }
}

fn strip_zero_padding(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    let mut significant = false;
    while let Some(c) = chars.next() {
        if c.is_ascii_digit() {
            let more_digits = chars.peek().is_some_and(|n| n.is_ascii_digit());
            if c == '0' && !significant && more_digits {
                continue;
            }
            significant = true;
        } else {
            significant = false;
        }
        out.push(c);
    }
    out
}

/// One page of a filtered list.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub page_size: usize,
    pub total_pages: usize,
    pub total_items: usize,
}

pub fn total_pages(count: usize, page_size: usize) -> usize {
    count.div_ceil(page_size.max(1)).max(1)
}

/// Slice out `page` (1-based). A page outside `[1, total_pages]` resets to 1.
pub fn paginate<T: Clone>(records: &[T], page_size: usize, page: usize) -> Page<T> {
    let page_size = page_size.max(1);
    let total_pages = total_pages(records.len(), page_size);
    let page = if (1..=total_pages).contains(&page) { page } else { 1 };
    let start = (page - 1) * page_size;
    let items = records.iter().skip(start).take(page_size).cloned().collect();

    Page {
        items,
        page,
        page_size,
        total_pages,
        total_items: records.len(),
    }
}
