use askama::Template;

use crate::application::admin::AdminPostRow;
use crate::application::pagination::Page;
use crate::domain::entities::GroupRecord;
use crate::domain::posts::truncate_chars;
use crate::domain::validators::FieldErrors;
use crate::presentation::views::{FormFieldView, PaginatorView, format_date};

#[derive(Clone)]
pub struct AdminNavigationItemView {
    pub label: &'static str,
    pub href: &'static str,
    pub is_active: bool,
}

#[derive(Clone)]
pub struct AdminLayout<T> {
    pub title: &'static str,
    pub navigation: Vec<AdminNavigationItemView>,
    pub content: T,
}

impl<T> AdminLayout<T> {
    pub fn new(title: &'static str, active_path: &str, content: T) -> Self {
        let navigation = [("Группы", "/groups"), ("Посты", "/posts")]
            .into_iter()
            .map(|(label, href)| AdminNavigationItemView {
                label,
                href,
                is_active: href == active_path,
            })
            .collect();
        Self {
            title,
            navigation,
            content,
        }
    }
}

pub struct AdminGroupRowView {
    pub title: String,
    pub slug: String,
    pub description: String,
}

pub struct AdminGroupsView {
    pub groups: Vec<AdminGroupRowView>,
    pub fields: Vec<FormFieldView>,
    pub created: Option<String>,
}

impl AdminGroupsView {
    pub fn new(groups: Vec<GroupRecord>, form: [&str; 3], errors: &FieldErrors) -> Self {
        let [title, slug, description] = form;
        Self {
            groups: groups
                .into_iter()
                .map(|group| AdminGroupRowView {
                    title: group.title,
                    slug: group.slug,
                    description: group.description,
                })
                .collect(),
            fields: vec![
                FormFieldView::new("title", "Заголовок", "text")
                    .value(title)
                    .errors(errors),
                FormFieldView::new("slug", "Slug", "text")
                    .help("Оставьте пустым, чтобы получить из заголовка")
                    .optional()
                    .value(slug)
                    .errors(errors),
                FormFieldView::new("description", "Описание", "textarea")
                    .value(description)
                    .errors(errors),
            ],
            created: None,
        }
    }
}

#[derive(Template)]
#[template(path = "admin/groups.html")]
pub struct AdminGroupsTemplate {
    pub view: AdminLayout<AdminGroupsView>,
}

pub struct AdminPostRowView {
    pub pk: i64,
    pub text: String,
    pub created: String,
    pub author: String,
    pub group: String,
}

pub struct AdminPostsView {
    pub search: String,
    pub rows: Vec<AdminPostRowView>,
    pub total_count: u64,
    pub paginator: PaginatorView,
}

impl AdminPostsView {
    pub fn new(page: Page<AdminPostRow>, search: &str, display_length: usize) -> Self {
        let extra_query = if search.is_empty() {
            String::new()
        } else {
            url::form_urlencoded::Serializer::new(String::new())
                .append_pair("search", search)
                .finish()
        };
        let paginator = PaginatorView::from_page(&page, &extra_query);
        let total_count = page.total_count;

        Self {
            search: search.to_string(),
            rows: page
                .items
                .into_iter()
                .map(|row| AdminPostRowView {
                    pk: row.pk,
                    text: truncate_chars(&row.text, display_length).to_string(),
                    created: format_date(row.created_at),
                    author: row.author,
                    group: row.group,
                })
                .collect(),
            total_count,
            paginator,
        }
    }
}

#[derive(Template)]
#[template(path = "admin/posts.html")]
pub struct AdminPostsTemplate {
    pub view: AdminLayout<AdminPostsView>,
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;
    use crate::application::pagination::Paginator;

    #[test]
    fn search_term_is_carried_into_page_links() {
        let paginator = Paginator::new(1);
        let window = paginator.window(2, Some("1"));
        let row = AdminPostRow {
            pk: 1,
            text: "Очень длинный текст поста".to_string(),
            created_at: datetime!(2026-10-17 0:00 UTC),
            author: "leo".to_string(),
            group: "-пусто-".to_string(),
        };
        let page = paginator.page(vec![row], window, 2);
        let view = AdminPostsView::new(page, "кот и пёс", 15);

        let next = view.paginator.next_href.expect("next page");
        assert!(next.starts_with("?search="));
        assert!(next.ends_with("&page=2"));
        assert_eq!(view.rows[0].text, "Очень длинный т");
        assert_eq!(view.rows[0].group, "-пусто-");
    }

    #[test]
    fn navigation_marks_active_section() {
        let layout = AdminLayout::new("Группы", "/groups", ());
        let active: Vec<_> = layout
            .navigation
            .iter()
            .filter(|item| item.is_active)
            .map(|item| item.href)
            .collect();
        assert_eq!(active, vec!["/groups"]);
    }
}
