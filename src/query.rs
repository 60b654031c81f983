//! Filtered, sorted views over the note collections.
//!
//! Everything here is read-only: [`query`] borrows the collections and
//! returns references in display order. The same [`FilterSpec`] over the same
//! collections always yields the same sequence, so callers may memoize on the
//! spec's hash as long as they drop the cache after any store mutation.

use crate::model::{CategoryId, Note, TagId};
use crate::text::{contains_ignore_case, locale_compare, plain_text};
use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Tab {
    #[default]
    Notes,
    Favorites,
    Trash,
}

impl Tab {
    pub fn label(&self) -> &'static str {
        match self {
            Tab::Notes => "Notes",
            Tab::Favorites => "Favorites",
            Tab::Trash => "Trash",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortField {
    #[default]
    UpdatedAt,
    CreatedAt,
    Title,
}

impl SortField {
    pub fn label(&self) -> &'static str {
        match self {
            SortField::UpdatedAt => "updated",
            SortField::CreatedAt => "created",
            SortField::Title => "title",
        }
    }

    pub fn key<'a>(&self, note: &'a Note) -> SortKey<'a> {
        match self {
            SortField::UpdatedAt => SortKey::Time(note.updated_at),
            SortField::CreatedAt => SortKey::Time(note.created_at),
            SortField::Title => SortKey::Text(&note.title),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn reversed(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

/// Value a note is ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey<'a> {
    Text(&'a str),
    Time(DateTime<Utc>),
}

/// Text compares with [`locale_compare`], timestamps chronologically.
/// Keys of different kinds compare equal, which leaves a stable sort untouched.
pub fn compare_keys(a: &SortKey<'_>, b: &SortKey<'_>) -> Ordering {
    match (a, b) {
        (SortKey::Text(a), SortKey::Text(b)) => locale_compare(a, b),
        (SortKey::Time(a), SortKey::Time(b)) => a.cmp(b),
        _ => Ordering::Equal,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct SearchFilters {
    pub query: String,
    /// Matches notes carrying any of these tags.
    pub tags: BTreeSet<TagId>,
    /// Matches notes in any of these categories.
    pub categories: BTreeSet<CategoryId>,
    pub favorites_only: bool,
    pub pinned_only: bool,
    pub sort_by: SortField,
    pub sort_direction: SortDirection,
}

/// Partial update for [`SearchFilters`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchPatch {
    pub query: Option<String>,
    pub tags: Option<BTreeSet<TagId>>,
    pub categories: Option<BTreeSet<CategoryId>>,
    pub favorites_only: Option<bool>,
    pub pinned_only: Option<bool>,
    pub sort_by: Option<SortField>,
    pub sort_direction: Option<SortDirection>,
}

impl SearchFilters {
    pub fn merge(&mut self, patch: SearchPatch) {
        if let Some(query) = patch.query {
            self.query = query;
        }
        if let Some(tags) = patch.tags {
            self.tags = tags;
        }
        if let Some(categories) = patch.categories {
            self.categories = categories;
        }
        if let Some(favorites_only) = patch.favorites_only {
            self.favorites_only = favorites_only;
        }
        if let Some(pinned_only) = patch.pinned_only {
            self.pinned_only = pinned_only;
        }
        if let Some(sort_by) = patch.sort_by {
            self.sort_by = sort_by;
        }
        if let Some(sort_direction) = patch.sort_direction {
            self.sort_direction = sort_direction;
        }
    }

    fn matches(&self, note: &Note) -> bool {
        if !self.query.is_empty()
            && !contains_ignore_case(&note.title, &self.query)
            && !contains_ignore_case(&plain_text(&note.content), &self.query)
        {
            return false;
        }
        if !self.tags.is_empty() && self.tags.is_disjoint(&note.tags) {
            return false;
        }
        if !self.categories.is_empty() && !self.categories.contains(&note.category) {
            return false;
        }
        if self.favorites_only && !note.is_favorite {
            return false;
        }
        if self.pinned_only && !note.is_pinned {
            return false;
        }
        true
    }
}

/// Everything that parameterizes a note listing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct FilterSpec {
    pub tab: Tab,
    pub category: Option<CategoryId>,
    pub tag: Option<TagId>,
    pub search: SearchFilters,
}

impl FilterSpec {
    pub fn tab(tab: Tab) -> Self {
        FilterSpec {
            tab,
            ..FilterSpec::default()
        }
    }
}

/// Computes the ordered listing for `spec`.
///
/// Pinned notes float to the top of every tab except the trash, keeping the
/// chosen sort order within the pinned and unpinned groups.
pub fn query<'a>(active: &'a [Note], trashed: &'a [Note], spec: &FilterSpec) -> Vec<&'a Note> {
    let base = if spec.tab == Tab::Trash { trashed } else { active };

    let mut result: Vec<&Note> = base
        .iter()
        .filter(|note| spec.tab != Tab::Favorites || note.is_favorite)
        .filter(|note| match &spec.category {
            Some(category) => &note.category == category,
            None => true,
        })
        .filter(|note| match &spec.tag {
            Some(tag) => note.has_tag(tag),
            None => true,
        })
        .filter(|note| spec.search.matches(note))
        .collect();

    let field = spec.search.sort_by;
    match spec.search.sort_direction {
        SortDirection::Asc => result.sort_by(|a, b| compare_keys(&field.key(a), &field.key(b))),
        SortDirection::Desc => result.sort_by(|a, b| compare_keys(&field.key(b), &field.key(a))),
    }

    if spec.tab != Tab::Trash {
        let (pinned, unpinned): (Vec<&Note>, Vec<&Note>) =
            result.into_iter().partition(|note| note.is_pinned);
        result = pinned;
        result.extend(unpinned);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NoteDraft;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn note(id: &str, draft: NoteDraft, secs: i64) -> Note {
        Note::from_draft(id.into(), draft, at(secs))
    }

    fn titles(notes: &[&Note]) -> Vec<String> {
        notes.iter().map(|n| n.title.clone()).collect()
    }

    #[test]
    fn pinned_notes_lead_each_group_sorted_by_title() {
        let active = vec![
            note("1", NoteDraft::titled("B").pinned(), 0),
            note("2", NoteDraft::titled("D"), 1),
            note("3", NoteDraft::titled("A").pinned(), 2),
            note("4", NoteDraft::titled("C"), 3),
        ];
        let mut spec = FilterSpec::tab(Tab::Notes);
        spec.search.sort_by = SortField::Title;
        spec.search.sort_direction = SortDirection::Asc;
        let result = query(&active, &[], &spec);
        assert_eq!(titles(&result), vec!["A", "B", "C", "D"]);
    }

    #[test]
    fn trash_tab_keeps_pinned_notes_in_sort_order() {
        let trashed = vec![
            note("1", NoteDraft::titled("B").pinned(), 0),
            note("2", NoteDraft::titled("A"), 1),
        ];
        let mut spec = FilterSpec::tab(Tab::Trash);
        spec.search.sort_by = SortField::Title;
        spec.search.sort_direction = SortDirection::Asc;
        let result = query(&[], &trashed, &spec);
        assert_eq!(titles(&result), vec!["A", "B"]);
    }

    #[test]
    fn default_sort_is_newest_update_first() {
        let active = vec![
            note("1", NoteDraft::titled("old"), 0),
            note("2", NoteDraft::titled("new"), 100),
            note("3", NoteDraft::titled("mid"), 50),
        ];
        let result = query(&active, &[], &FilterSpec::default());
        assert_eq!(titles(&result), vec!["new", "mid", "old"]);
    }

    #[test]
    fn category_and_tag_filters_combine() {
        let active = vec![
            note("1", NoteDraft::titled("a").category("work").tag("todo"), 0),
            note("2", NoteDraft::titled("b").category("work"), 1),
            note("3", NoteDraft::titled("c").tag("todo"), 2),
        ];
        let spec = FilterSpec {
            category: Some("work".into()),
            tag: Some("todo".into()),
            ..FilterSpec::default()
        };
        assert_eq!(titles(&query(&active, &[], &spec)), vec!["a"]);
    }

    #[test]
    fn search_tags_use_any_semantics() {
        let active = vec![
            note("1", NoteDraft::titled("a").tag("x"), 0),
            note("2", NoteDraft::titled("b").tag("y"), 1),
            note("3", NoteDraft::titled("c").tag("z"), 2),
        ];
        let mut spec = FilterSpec::default();
        spec.search.tags = ["x".to_string(), "y".to_string()].into_iter().collect();
        spec.search.sort_by = SortField::Title;
        spec.search.sort_direction = SortDirection::Asc;
        assert_eq!(titles(&query(&active, &[], &spec)), vec!["a", "b"]);
    }

    #[test]
    fn search_ignores_markup_in_content() {
        let active = vec![note("1", NoteDraft::titled("a").content("<p>x</p><b>y</b>"), 0)];
        let mut spec = FilterSpec::default();
        spec.search.query = "p>".into();
        assert!(query(&active, &[], &spec).is_empty());
        spec.search.query = "XY".into();
        assert_eq!(query(&active, &[], &spec).len(), 1);
    }

    #[test]
    fn mismatched_key_kinds_compare_equal() {
        let text = SortKey::Text("a");
        let time = SortKey::Time(at(0));
        assert_eq!(compare_keys(&text, &time), Ordering::Equal);
        assert_eq!(compare_keys(&time, &text), Ordering::Equal);
    }

    #[test]
    fn equal_keys_keep_collection_order_in_both_directions() {
        let active = vec![
            note("1", NoteDraft::titled("first"), 0),
            note("2", NoteDraft::titled("second"), 0),
        ];
        let mut spec = FilterSpec::default();
        spec.search.sort_direction = SortDirection::Desc;
        assert_eq!(titles(&query(&active, &[], &spec)), vec!["first", "second"]);
        spec.search.sort_direction = SortDirection::Asc;
        assert_eq!(titles(&query(&active, &[], &spec)), vec!["first", "second"]);
    }

    #[test]
    fn merge_only_overrides_supplied_fields() {
        let mut filters = SearchFilters::default();
        filters.merge(SearchPatch {
            query: Some("plan".into()),
            ..SearchPatch::default()
        });
        filters.merge(SearchPatch {
            sort_by: Some(SortField::Title),
            ..SearchPatch::default()
        });
        assert_eq!(filters.query, "plan");
        assert_eq!(filters.sort_by, SortField::Title);
        assert_eq!(filters.sort_direction, SortDirection::Desc);
    }
}
