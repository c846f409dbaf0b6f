//! Declarative filter/sort builder shared by every list endpoint.
//!
//! A `FilterSpec` names the sortable columns and the criteria an endpoint
//! understands. `apply` turns `ListParams` into a sea-orm `Select`;
//! `fetch_page` counts, clamps the page and loads it.

use chrono::NaiveDate;
use sea_orm::sea_query::{Expr, Func, LikeExpr};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, FromQueryResult, Order, PaginatorTrait,
    QueryFilter, QueryOrder, Select,
};

use crate::domain::{DomainError, ListParams, Page, SortOrder, paginate};

#[derive(Debug, Clone, Copy)]
pub enum FieldRule<C> {
    /// Case-insensitive substring match. Non-ASCII text only folds when the
    /// column already stores a lowercased copy.
    Contains(C),
    /// Integer equality
    Equals(C),
    /// Integer lower bound, inclusive
    AtLeast(C),
    /// Integer upper bound, inclusive
    AtMost(C),
}

/// Range over an RFC 3339 text column, bounded by two `YYYY-MM-DD` criteria.
#[derive(Debug, Clone, Copy)]
struct DateRange<C> {
    from_key: &'static str,
    to_key: &'static str,
    column: C,
}

pub struct FilterSpec<E: EntityTrait> {
    sortable: Vec<(&'static str, E::Column)>,
    default_sort: E::Column,
    fields: Vec<(&'static str, FieldRule<E::Column>)>,
    date_ranges: Vec<DateRange<E::Column>>,
}

impl<E: EntityTrait> FilterSpec<E> {
    pub fn new(default_sort: E::Column) -> Self {
        Self {
            sortable: Vec::new(),
            default_sort,
            fields: Vec::new(),
            date_ranges: Vec::new(),
        }
    }

    pub fn sortable(mut self, name: &'static str, column: E::Column) -> Self {
        self.sortable.push((name, column));
        self
    }

    pub fn field(mut self, name: &'static str, rule: FieldRule<E::Column>) -> Self {
        self.fields.push((name, rule));
        self
    }

    /// Both bounds must be present; a lone bound is ignored.
    pub fn date_range(
        mut self,
        from_key: &'static str,
        to_key: &'static str,
        column: E::Column,
    ) -> Self {
        self.date_ranges.push(DateRange {
            from_key,
            to_key,
            column,
        });
        self
    }

    /// Names accepted by `sort`, used in validation messages and docs.
    pub fn sort_names(&self) -> Vec<&'static str> {
        self.sortable.iter().map(|(name, _)| *name).collect()
    }

    /// Whether `name` is a criterion this endpoint understands.
    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|(n, _)| *n == name)
    }

    pub fn apply(&self, mut select: Select<E>, params: &ListParams) -> Result<Select<E>, DomainError> {
        for (name, rule) in &self.fields {
            let Some(raw) = params.get(name) else {
                continue;
            };
            select = match *rule {
                FieldRule::Contains(column) => select.filter(
                    Expr::expr(Func::lower(Expr::col((E::default(), column))))
                        .like(LikeExpr::new(like_pattern(raw)).escape(LIKE_ESCAPE)),
                ),
                FieldRule::Equals(column) => select.filter(column.eq(parse_int(name, raw)?)),
                FieldRule::AtLeast(column) => select.filter(column.gte(parse_int(name, raw)?)),
                FieldRule::AtMost(column) => select.filter(column.lte(parse_int(name, raw)?)),
            };
        }

        for range in &self.date_ranges {
            let (Some(from), Some(to)) = (params.get(range.from_key), params.get(range.to_key))
            else {
                continue;
            };
            let from = parse_date(range.from_key, from)?;
            let to = parse_date(range.to_key, to)?;
            let day_after = to.succ_opt().ok_or_else(|| {
                DomainError::Validation(format!("{} is out of range", range.to_key))
            })?;
            select = select
                .filter(range.column.gte(from.format("%Y-%m-%d").to_string()))
                .filter(range.column.lt(day_after.format("%Y-%m-%d").to_string()));
        }

        let column = match params.sort.as_deref() {
            None => self.default_sort,
            Some(name) => self
                .sortable
                .iter()
                .find(|(n, _)| *n == name)
                .map(|(_, c)| *c)
                .ok_or_else(|| {
                    DomainError::Validation(format!(
                        "sort must be one of: {}",
                        self.sort_names().join(", ")
                    ))
                })?,
        };
        let order = match params.order {
            SortOrder::Asc => Order::Asc,
            SortOrder::Desc => Order::Desc,
        };

        Ok(select.order_by(column, order))
    }
}

const LIKE_ESCAPE: char = '!';

/// `%raw%` with the wildcards in `raw` matched literally
fn like_pattern(raw: &str) -> String {
    let mut pattern = String::with_capacity(raw.len() + 2);
    pattern.push('%');
    for c in raw.to_lowercase().chars() {
        if matches!(c, '%' | '_' | LIKE_ESCAPE) {
            pattern.push(LIKE_ESCAPE);
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

fn parse_int(name: &str, raw: &str) -> Result<i64, DomainError> {
    raw.parse()
        .map_err(|_| DomainError::Validation(format!("{} must be an integer", name)))
}

fn parse_date(name: &str, raw: &str) -> Result<NaiveDate, DomainError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| DomainError::Validation(format!("{} must be a date (YYYY-MM-DD)", name)))
}

/// Count the filtered rows, clamp the requested page and fetch it.
pub async fn fetch_page<E>(
    db: &DatabaseConnection,
    select: Select<E>,
    page_size: u64,
    requested_page: u64,
) -> Result<Page<E::Model>, DomainError>
where
    E: EntityTrait,
    E::Model: FromQueryResult + Send + Sync + 'static,
{
    let count = select.clone().count(db).await?;
    let pagination = paginate(count, page_size, requested_page);

    let items = if page_size == 0 {
        Vec::new()
    } else {
        select
            .paginate(db, page_size)
            .fetch_page(pagination.page)
            .await?
    };

    Ok(Page {
        items,
        count,
        page: pagination.page,
        limit: pagination.limit,
    })
}
