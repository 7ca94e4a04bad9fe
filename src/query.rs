//! Dashboard list query state: filter, sort, and pagination.

use crate::models::{ListMeta, Role, SortBy, SortOrder, User, UserPage};

pub const DEFAULT_PER_PAGE: u32 = 10;
pub const MAX_PER_PAGE: u32 = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub role: Option<Role>,
    pub sort_by: SortBy,
    pub sort_order: SortOrder,
    pub page: u32,
    pub per_page: u32,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            role: None,
            sort_by: SortBy::default(),
            sort_order: SortOrder::default(),
            page: 1,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

/// A single filter or pagination control interaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryAction {
    FilterRole(Option<Role>),
    SortBy(SortBy),
    SortOrder(SortOrder),
    PerPage(u32),
    NextPage,
    PrevPage,
    GoTo(u32),
}

impl ListQuery {
    /// Query string parameters for `GET /users`
    pub fn params(&self) -> Vec<(String, String)> {
        let mut params = Vec::with_capacity(5);
        if let Some(role) = self.role {
            params.push(("role".to_string(), role.as_str().to_string()));
        }
        params.push(("sortBy".to_string(), self.sort_by.as_str().to_string()));
        params.push((
            "sortOrder".to_string(),
            self.sort_order.as_str().to_string(),
        ));
        params.push(("page".to_string(), self.page.to_string()));
        params.push(("perPage".to_string(), self.per_page.to_string()));
        params
    }

    /// Apply a control interaction. Filter, sort, and page-size changes go
    /// back to page 1. Page moves are bounded by `meta` when one is known.
    /// Returns whether the query changed.
    pub fn apply(&mut self, action: QueryAction, meta: Option<&ListMeta>) -> bool {
        let before = self.clone();
        match action {
            QueryAction::FilterRole(role) => {
                if self.role != role {
                    self.role = role;
                    self.page = 1;
                }
            }
            QueryAction::SortBy(sort_by) => {
                if self.sort_by != sort_by {
                    self.sort_by = sort_by;
                    self.page = 1;
                }
            }
            QueryAction::SortOrder(order) => {
                if self.sort_order != order {
                    self.sort_order = order;
                    self.page = 1;
                }
            }
            QueryAction::PerPage(n) => {
                let n = n.clamp(1, MAX_PER_PAGE);
                if self.per_page != n {
                    self.per_page = n;
                    self.page = 1;
                }
            }
            QueryAction::NextPage => {
                if meta.map_or(true, |m| m.has_page_after(self.page)) {
                    self.page += 1;
                }
            }
            QueryAction::PrevPage => {
                if self.page > 1 {
                    self.page -= 1;
                }
            }
            QueryAction::GoTo(page) => {
                let in_range = page >= 1 && meta.map_or(true, |m| page <= m.last_page.max(1));
                if in_range {
                    self.page = page;
                }
            }
        }
        *self != before
    }
}

/// Filter, sort, and slice a full user list the way the server would
pub fn paginate_locally(users: Vec<User>, query: &ListQuery) -> UserPage {
    let mut users: Vec<User> = users
        .into_iter()
        .filter(|u| query.role.map_or(true, |r| u.role == r))
        .collect();

    match query.sort_by {
        SortBy::Name => users.sort_by_key(|u| u.name.to_lowercase()),
        SortBy::CreatedAt => users.sort_by_key(|u| u.created_at),
    }
    if query.sort_order == SortOrder::Desc {
        users.reverse();
    }

    let per_page = query.per_page.max(1);
    let total = users.len() as u64;
    let last_page = (total.div_ceil(per_page as u64) as u32).max(1);
    let skip = (query.page.saturating_sub(1) as usize) * per_page as usize;

    UserPage {
        data: users.into_iter().skip(skip).take(per_page as usize).collect(),
        meta: ListMeta {
            total,
            page: query.page,
            last_page,
            per_page,
        },
    }
}

/// Ticket identifying one issued list request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

/// Orders list responses so a superseded request never overwrites newer state
#[derive(Debug, Default)]
pub struct RequestSeq {
    latest: u64,
}

impl RequestSeq {
    pub fn issue(&mut self) -> Ticket {
        self.latest += 1;
        Ticket(self.latest)
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        ticket.0 == self.latest
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn user(id: &str, name: &str, role: Role, day: u32) -> User {
        User {
            id: id.to_string(),
            name: name.to_string(),
            email: format!("{}@example.com", id),
            password: None,
            role,
            created_at: Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap(),
        }
    }

    fn meta(page: u32, last_page: u32) -> ListMeta {
        ListMeta {
            total: last_page as u64 * 5,
            page,
            last_page,
            per_page: 5,
        }
    }

    #[test]
    fn test_sort_change_resets_page() {
        let mut q = ListQuery {
            page: 1,
            per_page: 5,
            ..Default::default()
        };
        assert!(q.apply(QueryAction::SortBy(SortBy::Name), None));
        assert_eq!(q.page, 1);

        q.page = 3;
        assert!(q.apply(QueryAction::SortBy(SortBy::CreatedAt), None));
        assert_eq!(q.page, 1);
    }

    #[test]
    fn test_filter_and_order_reset_page() {
        let mut q = ListQuery {
            page: 4,
            ..Default::default()
        };
        q.apply(QueryAction::FilterRole(Some(Role::Admin)), None);
        assert_eq!(q.page, 1);
        assert_eq!(q.role, Some(Role::Admin));

        q.page = 2;
        q.apply(QueryAction::SortOrder(SortOrder::Asc), None);
        assert_eq!(q.page, 1);

        q.page = 2;
        q.apply(QueryAction::PerPage(25), None);
        assert_eq!((q.page, q.per_page), (1, 25));
    }

    #[test]
    fn test_unchanged_value_keeps_page() {
        let mut q = ListQuery {
            page: 2,
            ..Default::default()
        };
        assert!(!q.apply(QueryAction::FilterRole(None), None));
        assert_eq!(q.page, 2);
    }

    #[test]
    fn test_page_bounds() {
        let mut q = ListQuery::default();
        assert!(!q.apply(QueryAction::PrevPage, Some(&meta(1, 3))));
        assert!(q.apply(QueryAction::NextPage, Some(&meta(1, 3))));
        assert_eq!(q.page, 2);

        q.page = 3;
        assert!(!q.apply(QueryAction::NextPage, Some(&meta(3, 3))));
        assert!(!q.apply(QueryAction::GoTo(9), Some(&meta(3, 3))));
        assert!(q.apply(QueryAction::GoTo(1), Some(&meta(3, 3))));
        assert!(!q.apply(QueryAction::GoTo(0), None));
    }

    #[test]
    fn test_next_page_bounded_by_own_page_not_stale_meta() {
        // Last received meta says page 2 of 3, but the query already moved to 3
        let stale = meta(2, 3);
        let mut q = ListQuery {
            page: 3,
            ..Default::default()
        };
        assert!(!q.apply(QueryAction::NextPage, Some(&stale)));
        assert_eq!(q.page, 3);
    }

    #[test]
    fn test_params() {
        let q = ListQuery {
            role: Some(Role::User),
            sort_by: SortBy::Name,
            sort_order: SortOrder::Asc,
            page: 2,
            per_page: 5,
        };
        let params = q.params();
        assert_eq!(params[0], ("role".to_string(), "USER".to_string()));
        assert!(params.contains(&("sortBy".to_string(), "name".to_string())));
        assert!(params.contains(&("perPage".to_string(), "5".to_string())));

        assert!(!ListQuery::default()
            .params()
            .iter()
            .any(|(k, _)| k == "role"));
    }

    #[test]
    fn test_paginate_locally() {
        let users = vec![
            user("a", "carla", Role::User, 3),
            user("b", "Ana", Role::Admin, 1),
            user("c", "bruno", Role::User, 2),
            user("d", "Davi", Role::User, 4),
        ];
        let q = ListQuery {
            role: Some(Role::User),
            sort_by: SortBy::Name,
            sort_order: SortOrder::Asc,
            page: 1,
            per_page: 2,
        };
        let page = paginate_locally(users.clone(), &q);
        let names: Vec<_> = page.data.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, vec!["bruno", "carla"]);
        assert_eq!(page.meta.total, 3);
        assert_eq!(page.meta.last_page, 2);

        let newest = paginate_locally(
            users,
            &ListQuery {
                per_page: 1,
                ..Default::default()
            },
        );
        assert_eq!(newest.data[0].id, "d");
        assert_eq!(newest.meta.last_page, 4);
    }

    #[test]
    fn test_empty_list_has_one_page() {
        let page = paginate_locally(Vec::new(), &ListQuery::default());
        assert!(page.data.is_empty());
        assert_eq!(page.meta.last_page, 1);
        assert!(!page.meta.has_page_after(1));
    }

    #[test]
    fn test_request_seq_discards_stale() {
        let mut seq = RequestSeq::default();
        let first = seq.issue();
        let second = seq.issue();
        assert!(!seq.is_current(first));
        assert!(seq.is_current(second));
    }
}
