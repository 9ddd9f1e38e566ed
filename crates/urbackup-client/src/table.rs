//! Search, sort, pagination and breadcrumb helpers for tabular views.

use std::cmp::Ordering;

use urbackup_api_models::{StatusClientItem, UsageClientStat};

use crate::format::{format_last_backup, format_local_datetime};

/// Page sizes offered by the tables.
pub const PAGE_SIZES: [usize; 4] = [10, 25, 50, 100];

/// Default page size.
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// One page of a longer list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSlice<'a, T> {
    /// Rows on this page.
    pub items: &'a [T],
    /// 1-based page number actually shown.
    pub page: usize,
    /// Number of pages, at least one.
    pub page_count: usize,
    /// Rows across all pages.
    pub total: usize,
}

/// True when `per_page` is one of [`PAGE_SIZES`].
#[must_use]
pub fn is_valid_page_size(per_page: usize) -> bool {
    PAGE_SIZES.contains(&per_page)
}

/// Slice out page `page` (1-based). Out-of-range pages clamp to the last one.
#[must_use]
pub fn paginate<T>(items: &[T], page: usize, per_page: usize) -> PageSlice<'_, T> {
    let per_page = per_page.max(1);
    let total = items.len();
    let page_count = total.div_ceil(per_page).max(1);
    let page = page.clamp(1, page_count);
    let start = (page - 1) * per_page;
    let end = (start + per_page).min(total);
    PageSlice {
        items: &items[start.min(total)..end],
        page,
        page_count,
        total,
    }
}

/// Keep rows where any displayed field contains `query`, ignoring case.
///
/// An empty or blank query keeps every row.
pub fn filter_by_search<'a, T, F>(items: &'a [T], query: &str, fields: F) -> Vec<&'a T>
where
    F: Fn(&T) -> Vec<String>,
{
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return items.iter().collect();
    }
    items
        .iter()
        .filter(|&item| {
            fields(item)
                .iter()
                .any(|field| field.to_lowercase().contains(&needle))
        })
        .collect()
}

/// Fields of a client row that the status search looks at.
#[must_use]
pub fn status_search_fields(item: &StatusClientItem) -> Vec<String> {
    vec![
        item.name.clone(),
        item.groupname.clone(),
        item.ip.clone(),
        item.client_version_string.clone(),
        item.os_version_string.clone(),
        item.status_code().label().to_string(),
        format_last_backup(item.lastbackup),
        format_last_backup(item.lastbackup_image),
    ]
}

/// Status rows shown by default: clients pending removal are hidden.
#[must_use]
pub fn visible_clients(items: &[StatusClientItem]) -> Vec<&StatusClientItem> {
    items.iter().filter(|item| !item.is_delete_pending()).collect()
}

/// Status rows matching `query`, hiding removal-pending clients unless `include_pending`.
#[must_use]
pub fn filter_status<'a>(
    items: &'a [StatusClientItem],
    query: &str,
    include_pending: bool,
) -> Vec<&'a StatusClientItem> {
    filter_by_search(items, query, status_search_fields)
        .into_iter()
        .filter(|item| include_pending || !item.is_delete_pending())
        .collect()
}

/// Usage rows whose client name matches `query`.
#[must_use]
pub fn filter_usage<'a>(items: &'a [UsageClientStat], query: &str) -> Vec<&'a UsageClientStat> {
    filter_by_search(items, query, |item| vec![item.name.clone()])
}

/// Sort order of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    /// Smallest first.
    #[default]
    Ascending,
    /// Largest first.
    Descending,
}

/// Stable sort by `compare`, reversed for [`SortDirection::Descending`].
pub fn sort_rows<T, F>(rows: &mut [T], direction: SortDirection, compare: F)
where
    F: Fn(&T, &T) -> Ordering,
{
    rows.sort_by(|left, right| match direction {
        SortDirection::Ascending => compare(left, right),
        SortDirection::Descending => compare(right, left),
    });
}

/// Sortable columns of the status table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusColumn {
    /// Client name, case-insensitive.
    Name,
    /// Last file backup time.
    LastFileBackup,
    /// Last image backup time.
    LastImageBackup,
    /// Online flag.
    Online,
    /// Group name.
    Group,
    /// Status label.
    Status,
}

/// Sort status rows by `column`.
pub fn sort_status(rows: &mut [&StatusClientItem], column: StatusColumn, direction: SortDirection) {
    sort_rows(rows, direction, |left, right| match column {
        StatusColumn::Name => left.name.to_lowercase().cmp(&right.name.to_lowercase()),
        StatusColumn::LastFileBackup => left.lastbackup.cmp(&right.lastbackup),
        StatusColumn::LastImageBackup => left.lastbackup_image.cmp(&right.lastbackup_image),
        StatusColumn::Online => left.online.cmp(&right.online),
        StatusColumn::Group => left.groupname.cmp(&right.groupname),
        StatusColumn::Status => left
            .status_code()
            .label()
            .cmp(right.status_code().label()),
    });
}

/// Sortable columns of the usage table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageColumn {
    /// Client name.
    Name,
    /// File backup bytes.
    Files,
    /// Image backup bytes.
    Images,
    /// Total bytes.
    Used,
}

/// Sort usage rows by `column`.
pub fn sort_usage(rows: &mut [&UsageClientStat], column: UsageColumn, direction: SortDirection) {
    sort_rows(rows, direction, |left, right| match column {
        UsageColumn::Name => left.name.to_lowercase().cmp(&right.name.to_lowercase()),
        UsageColumn::Files => left.files.total_cmp(&right.files),
        UsageColumn::Images => left.images.total_cmp(&right.images),
        UsageColumn::Used => left.used.total_cmp(&right.used),
    });
}

/// Trail shown above the backup browser:
/// `Backups > <client> > <backup time> > path segments`.
#[must_use]
pub fn backup_breadcrumbs(
    client_name: Option<&str>,
    backuptime: Option<i64>,
    path: &str,
) -> Vec<String> {
    let mut crumbs = vec!["Backups".to_string()];
    let Some(client) = client_name else {
        return crumbs;
    };
    crumbs.push(client.to_string());
    let Some(time) = backuptime else {
        return crumbs;
    };
    crumbs.push(format_local_datetime(time));
    crumbs.extend(
        path.split('/')
            .filter(|segment| !segment.is_empty())
            .map(str::to_string),
    );
    crumbs
}
