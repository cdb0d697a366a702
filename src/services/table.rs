use std::cmp::Ordering;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::attendance::{AttendanceRecord, AttendanceStatus};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttendanceFilter {
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub status: Option<AttendanceStatus>,
    pub level: Option<String>,
    pub language: Option<String>,
    pub student_search: Option<String>,
    pub student_id: Option<i64>,
}

fn same_text(field: Option<&str>, wanted: &str) -> bool {
    field.is_some_and(|value| value.trim().eq_ignore_ascii_case(wanted.trim()))
}

impl AttendanceFilter {
    /// Every set predicate must hold. Each date bound applies on its own;
    /// records without a date never satisfy a date bound.
    pub fn matches(&self, record: &AttendanceRecord) -> bool {
        if self.date_from.is_some() || self.date_to.is_some() {
            let Some(day) = record.day() else {
                return false;
            };
            if self.date_from.is_some_and(|from| day < from) {
                return false;
            }
            if self.date_to.is_some_and(|to| day > to) {
                return false;
            }
        }

        if self.status.is_some_and(|status| record.status != status) {
            return false;
        }

        if let Some(level) = &self.level {
            if !same_text(record.level.as_deref(), level) {
                return false;
            }
        }

        if let Some(language) = &self.language {
            if !same_text(record.language.as_deref(), language) {
                return false;
            }
        }

        if let Some(search) = &self.student_search {
            let needle = search.trim().to_lowercase();
            if !needle.is_empty() && !record.display_name().to_lowercase().contains(&needle) {
                return false;
            }
        }

        if self.student_id.is_some_and(|id| record.student != id) {
            return false;
        }

        true
    }

    pub fn apply<'a>(&self, records: &'a [AttendanceRecord]) -> Vec<&'a AttendanceRecord> {
        records.iter().filter(|r| self.matches(r)).collect()
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    StudentName,
    Date,
    Status,
}

impl SortField {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortField::StudentName => "student_name",
            SortField::Date => "date",
            SortField::Status => "status",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "student_name" => Some(SortField::StudentName),
            "date" => Some(SortField::Date),
            "status" => Some(SortField::Status),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn reversed(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Ascending => "asc",
            SortDirection::Descending => "desc",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "asc" => Some(SortDirection::Ascending),
            "desc" => Some(SortDirection::Descending),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortState {
    pub field: Option<SortField>,
    pub direction: SortDirection,
}

impl SortState {
    pub fn new(field: Option<SortField>, direction: SortDirection) -> Self {
        Self { field, direction }
    }

    pub fn default_direction(field: SortField) -> SortDirection {
        match field {
            SortField::Date => SortDirection::Descending,
            SortField::StudentName | SortField::Status => SortDirection::Ascending,
        }
    }

    /// Clicking the active column flips it; another column starts fresh
    pub fn toggle_or_set(&mut self, field: SortField) {
        match self.field {
            Some(current) if current == field => {
                self.direction = self.direction.reversed();
            }
            _ => {
                self.field = Some(field);
                self.direction = Self::default_direction(field);
            }
        }
    }

    /// State a click on `field` would produce, for building header links
    pub fn after_click(&self, field: SortField) -> SortState {
        let mut next = *self;
        next.toggle_or_set(field);
        next
    }

    /// Sorts in place; missing values go last in either direction
    pub fn sort(&self, records: &mut [&AttendanceRecord]) {
        let Some(field) = self.field else {
            return;
        };

        records.sort_by(|left, right| {
            let ordering = match field {
                SortField::StudentName => Some(
                    left.display_name()
                        .to_lowercase()
                        .cmp(&right.display_name().to_lowercase()),
                ),
                SortField::Status => Some(left.status.as_str().cmp(right.status.as_str())),
                SortField::Date => match (left.day(), right.day()) {
                    (Some(l), Some(r)) => Some(l.cmp(&r)),
                    (Some(_), None) => return Ordering::Less,
                    (None, Some(_)) => return Ordering::Greater,
                    (None, None) => None,
                },
            };

            match (ordering, self.direction) {
                (Some(o), SortDirection::Ascending) => o,
                (Some(o), SortDirection::Descending) => o.reverse(),
                (None, _) => Ordering::Equal,
            }
            .then_with(|| left.id.cmp(&right.id))
        });
    }
}

impl Default for SortState {
    fn default() -> Self {
        Self {
            field: Some(SortField::Date),
            direction: SortDirection::Descending,
        }
    }
}

/// One page of a list plus the numbers needed to render navigation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// 1-based
    pub page: usize,
    pub total_pages: usize,
    pub total_items: usize,
    pub page_size: usize,
}

impl<T> Page<T> {
    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    pub fn first_index(&self) -> usize {
        if self.total_items == 0 {
            0
        } else {
            (self.page - 1) * self.page_size + 1
        }
    }

    pub fn last_index(&self) -> usize {
        (self.first_index() + self.items.len()).saturating_sub(1)
    }

    pub fn numbers(&self) -> Vec<usize> {
        (1..=self.total_pages).collect()
    }
}

/// Slices `items` into the requested page, clamping out-of-range requests.
/// An empty list still has one (empty) page.
pub fn paginate<T>(items: Vec<T>, page: usize, page_size: usize) -> Page<T> {
    let page_size = page_size.max(1);
    let total_items = items.len();
    let total_pages = total_items.div_ceil(page_size).max(1);
    let page = page.clamp(1, total_pages);

    let items = items
        .into_iter()
        .skip((page - 1) * page_size)
        .take(page_size)
        .collect();

    Page {
        items,
        page,
        total_pages,
        total_items,
        page_size,
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AttendanceStats {
    pub total: usize,
    pub present: usize,
    pub absent: usize,
    pub late: usize,
    pub attendance_percentage: u32,
}

impl AttendanceStats {
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a AttendanceRecord>) -> Self {
        let mut stats = Self::default();
        for record in records {
            stats.total += 1;
            match record.status {
                AttendanceStatus::Present => stats.present += 1,
                AttendanceStatus::Absent => stats.absent += 1,
                AttendanceStatus::Late => stats.late += 1,
            }
        }
        if stats.total > 0 {
            stats.attendance_percentage =
                (stats.present as f64 / stats.total as f64 * 100.0).round() as u32;
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: i64, name: &str, date: Option<&str>, status: AttendanceStatus) -> AttendanceRecord {
        AttendanceRecord {
            id,
            student: id * 10,
            session: Some(1),
            status,
            scanned_at: None,
            valid: true,
            notes: None,
            student_name: Some(name.to_string()),
            level: Some("Intermediate".to_string()),
            language: Some("English".to_string()),
            date: date.map(|d| d.parse().unwrap()),
            lessons_remaining: None,
        }
    }

    #[test]
    fn test_date_range_and_status_both_apply() {
        let records = vec![
            record(1, "Ana", Some("2024-10-01"), AttendanceStatus::Present),
            record(2, "Ben", Some("2024-10-05"), AttendanceStatus::Absent),
            record(3, "Cara", Some("2024-10-05"), AttendanceStatus::Present),
            record(4, "Dan", Some("2024-10-20"), AttendanceStatus::Present),
            record(5, "Eve", None, AttendanceStatus::Present),
        ];
        let filter = AttendanceFilter {
            date_from: "2024-10-02".parse().ok(),
            date_to: "2024-10-10".parse().ok(),
            status: Some(AttendanceStatus::Present),
            ..AttendanceFilter::default()
        };

        let ids: Vec<i64> = filter.apply(&records).iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![3]);
    }

    #[test]
    fn test_single_date_bound_applies_alone() {
        let records = vec![
            record(1, "Ana", Some("2024-10-01"), AttendanceStatus::Present),
            record(2, "Ben", Some("2024-10-05"), AttendanceStatus::Absent),
        ];
        let filter = AttendanceFilter {
            date_from: "2024-10-03".parse().ok(),
            ..AttendanceFilter::default()
        };
        assert_eq!(filter.apply(&records).len(), 1);
    }

    #[test]
    fn test_text_filters() {
        let records = vec![
            record(1, "Ana Lopez", Some("2024-10-01"), AttendanceStatus::Late),
            record(2, "Ben Smith", Some("2024-10-01"), AttendanceStatus::Late),
        ];
        let filter = AttendanceFilter {
            student_search: Some("LOPEZ".to_string()),
            language: Some("english".to_string()),
            ..AttendanceFilter::default()
        };
        let ids: Vec<i64> = filter.apply(&records).iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1]);

        let by_id = AttendanceFilter {
            student_id: Some(20),
            ..AttendanceFilter::default()
        };
        assert_eq!(by_id.apply(&records)[0].id, 2);
    }

    #[test]
    fn test_sort_toggle_and_nulls_last() {
        let records = vec![
            record(1, "Cara", None, AttendanceStatus::Present),
            record(2, "ana", Some("2024-10-02"), AttendanceStatus::Absent),
            record(3, "Ben", Some("2024-10-09"), AttendanceStatus::Late),
        ];

        let mut state = SortState::default();
        let mut rows: Vec<&AttendanceRecord> = records.iter().collect();
        state.sort(&mut rows);
        assert_eq!(rows.iter().map(|r| r.id).collect::<Vec<_>>(), vec![3, 2, 1]);

        state.toggle_or_set(SortField::Date);
        assert_eq!(state.direction, SortDirection::Ascending);
        state.sort(&mut rows);
        assert_eq!(rows.iter().map(|r| r.id).collect::<Vec<_>>(), vec![2, 3, 1]);

        state.toggle_or_set(SortField::StudentName);
        assert_eq!(state.direction, SortDirection::Ascending);
        state.sort(&mut rows);
        assert_eq!(rows.iter().map(|r| r.id).collect::<Vec<_>>(), vec![2, 3, 1]);
    }

    #[test]
    fn test_paginate_37_by_6() {
        let items: Vec<usize> = (1..=37).collect();

        let first = paginate(items.clone(), 1, 6);
        assert_eq!(first.total_pages, 7);
        assert_eq!(first.items, vec![1, 2, 3, 4, 5, 6]);
        assert!(!first.has_previous());

        let last = paginate(items.clone(), 7, 6);
        assert_eq!(last.items, vec![37]);
        assert_eq!(last.first_index(), 37);
        assert_eq!(last.last_index(), 37);
        assert!(!last.has_next());

        let clamped = paginate(items, 99, 6);
        assert_eq!(clamped.page, 7);
    }

    #[test]
    fn test_paginate_empty() {
        let page = paginate(Vec::<u8>::new(), 3, 6);
        assert_eq!(page.page, 1);
        assert_eq!(page.total_pages, 1);
        assert_eq!(page.first_index(), 0);
        assert_eq!(page.last_index(), 0);
    }

    #[test]
    fn test_stats() {
        let records = vec![
            record(1, "A", None, AttendanceStatus::Present),
            record(2, "B", None, AttendanceStatus::Present),
            record(3, "C", None, AttendanceStatus::Absent),
        ];
        let stats = AttendanceStats::from_records(&records);
        assert_eq!(stats.total, 3);
        assert_eq!(stats.attendance_percentage, 67);
        assert_eq!(AttendanceStats::from_records(&Vec::<AttendanceRecord>::new()).attendance_percentage, 0);
    }
}
