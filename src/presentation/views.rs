use crate::application::accounts::Principal;
use crate::application::error::{ErrorReport, HttpError};
use crate::application::pagination::Page;
use crate::domain::entities::{CommentEntry, GroupRecord, PostEntry};
use crate::domain::posts::truncate_chars;
use crate::domain::validators::FieldErrors;
use askama::{Error as AskamaError, Template};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

const MONTHS_GENITIVE: [&str; 12] = [
    "января",
    "февраля",
    "марта",
    "апреля",
    "мая",
    "июня",
    "июля",
    "августа",
    "сентября",
    "октября",
    "ноября",
    "декабря",
];

#[derive(Debug, Error)]
#[error("{public_message}")]
pub struct TemplateRenderError {
    pub(crate) source: &'static str,
    pub(crate) public_message: &'static str,
    #[source]
    pub(crate) error: AskamaError,
}

impl TemplateRenderError {
    pub fn new(source: &'static str, public_message: &'static str, error: AskamaError) -> Self {
        Self {
            source,
            public_message,
            error,
        }
    }
}

impl From<TemplateRenderError> for HttpError {
    fn from(err: TemplateRenderError) -> Self {
        let TemplateRenderError {
            source,
            public_message,
            error,
        } = err;

        HttpError::from_error(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            public_message,
            &error,
        )
    }
}

pub fn render_template<T: Template>(template: T) -> Result<Html<String>, HttpError> {
    template.render().map(Html).map_err(|err| {
        TemplateRenderError::new(
            "presentation::views::render_template",
            "Template rendering failed",
            err,
        )
        .into()
    })
}

pub fn render_template_response<T: Template>(template: T, status: StatusCode) -> Response {
    match render_template(template) {
        Ok(html) => (status, html).into_response(),
        Err(err) => err.into_response(),
    }
}

pub fn render_not_found_response(chrome: LayoutChrome) -> Response {
    let view = LayoutContext::new(chrome.with_title("Страница не найдена"), ErrorPageView::not_found());
    let mut response = render_template_response(ErrorTemplate { view }, StatusCode::NOT_FOUND);
    ErrorReport::from_message(
        "presentation::views::render_not_found_response",
        StatusCode::NOT_FOUND,
        "Resource not found",
    )
    .attach(&mut response);
    response
}

/// `17 октября 2026`
pub fn format_date(value: OffsetDateTime) -> String {
    let month = MONTHS_GENITIVE[usize::from(u8::from(value.month())) - 1];
    format!("{} {} {}", value.day(), month, value.year())
}

fn iso_date(value: OffsetDateTime) -> String {
    value.format(&Rfc3339).unwrap_or_default()
}

#[derive(Clone)]
pub struct ViewerView {
    pub username: String,
    pub display_name: String,
}

#[derive(Clone)]
pub struct LayoutChrome {
    pub title: String,
    pub viewer: Option<ViewerView>,
}

impl LayoutChrome {
    pub fn new(principal: &Principal) -> Self {
        let viewer = principal.user().map(|user| ViewerView {
            username: user.username.clone(),
            display_name: user.display_name().to_string(),
        });
        Self {
            title: "Yatube".to_string(),
            viewer,
        }
    }

    pub fn with_title(self, title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..self
        }
    }
}

#[derive(Clone)]
pub struct LayoutContext<T> {
    pub title: String,
    pub viewer: Option<ViewerView>,
    pub content: T,
}

impl<T> LayoutContext<T> {
    pub fn new(chrome: LayoutChrome, content: T) -> Self {
        Self {
            title: chrome.title,
            viewer: chrome.viewer,
            content,
        }
    }
}

#[derive(Clone)]
pub struct GroupLinkView {
    pub title: String,
    pub slug: String,
}

#[derive(Clone)]
pub struct PostCard {
    pub id: i64,
    pub text: String,
    pub short_text: String,
    pub author_username: String,
    pub author_name: String,
    pub group: Option<GroupLinkView>,
    pub image_url: Option<String>,
    pub published: String,
    pub iso_date: String,
}

impl PostCard {
    pub fn from_entry(entry: PostEntry, display_length: usize) -> Self {
        let PostEntry {
            post,
            author,
            group,
        } = entry;
        Self {
            id: post.id,
            short_text: truncate_chars(&post.text, display_length).to_string(),
            author_name: author.display_name().to_string(),
            author_username: author.username,
            group: group.map(|group| GroupLinkView {
                title: group.title,
                slug: group.slug,
            }),
            image_url: post.image.map(|path| format!("/media/{path}")),
            published: format_date(post.created_at),
            iso_date: iso_date(post.created_at),
            text: post.text,
        }
    }
}

#[derive(Clone)]
pub struct PageLinkView {
    pub number: usize,
    pub href: String,
    pub is_current: bool,
}

/// Navigation links for a page-number listing.
#[derive(Clone)]
pub struct PaginatorView {
    pub visible: bool,
    pub number: usize,
    pub num_pages: usize,
    pub first_href: Option<String>,
    pub previous_href: Option<String>,
    pub next_href: Option<String>,
    pub last_href: Option<String>,
    pub links: Vec<PageLinkView>,
}

impl PaginatorView {
    /// `extra_query` is appended to every link, e.g. `search=cats`.
    pub fn from_page<T>(page: &Page<T>, extra_query: &str) -> Self {
        let href = |number: usize| {
            if extra_query.is_empty() {
                format!("?page={number}")
            } else {
                format!("?{extra_query}&page={number}")
            }
        };

        Self {
            visible: page.has_other_pages(),
            number: page.number,
            num_pages: page.num_pages,
            first_href: (page.number > 2).then(|| href(1)),
            previous_href: page.previous_number().map(href),
            next_href: page.next_number().map(href),
            last_href: (page.number + 1 < page.num_pages).then(|| href(page.num_pages)),
            links: page
                .link_numbers()
                .into_iter()
                .map(|number| PageLinkView {
                    number,
                    href: href(number),
                    is_current: number == page.number,
                })
                .collect(),
        }
    }
}

#[derive(Clone)]
pub struct FeedView {
    pub posts: Vec<PostCard>,
    pub paginator: PaginatorView,
    pub total_count: u64,
}

impl FeedView {
    pub fn from_page(page: Page<PostEntry>, display_length: usize) -> Self {
        let paginator = PaginatorView::from_page(&page, "");
        let total_count = page.total_count;
        Self {
            posts: page
                .items
                .into_iter()
                .map(|entry| PostCard::from_entry(entry, display_length))
                .collect(),
            paginator,
            total_count,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }
}

/// A feed with nothing else on the page.
pub struct FeedPageView {
    pub feed: FeedView,
}

#[derive(Template)]
#[template(path = "posts/index.html")]
pub struct IndexTemplate {
    pub view: LayoutContext<FeedPageView>,
}

#[derive(Template)]
#[template(path = "posts/follow.html")]
pub struct FollowTemplate {
    pub view: LayoutContext<FeedPageView>,
}

pub struct GroupPageView {
    pub title: String,
    pub description: String,
    pub feed: FeedView,
}

impl GroupPageView {
    pub fn new(group: GroupRecord, feed: FeedView) -> Self {
        Self {
            title: group.title,
            description: group.description,
            feed,
        }
    }
}

#[derive(Template)]
#[template(path = "posts/group_list.html")]
pub struct GroupTemplate {
    pub view: LayoutContext<GroupPageView>,
}

pub struct ProfileView {
    pub username: String,
    pub display_name: String,
    pub post_count: u64,
    pub following: bool,
    pub can_follow: bool,
    pub feed: FeedView,
}

#[derive(Template)]
#[template(path = "posts/profile.html")]
pub struct ProfileTemplate {
    pub view: LayoutContext<ProfileView>,
}

pub struct CommentView {
    pub author_username: String,
    pub author_name: String,
    pub text: String,
    pub published: String,
}

impl From<CommentEntry> for CommentView {
    fn from(entry: CommentEntry) -> Self {
        Self {
            author_name: entry.author.display_name().to_string(),
            author_username: entry.author.username,
            published: format_date(entry.comment.created_at),
            text: entry.comment.text,
        }
    }
}

/// One form input, its current value and the first error reported for it.
#[derive(Clone)]
pub struct FormFieldView {
    pub name: &'static str,
    pub label: &'static str,
    pub help_text: &'static str,
    pub input_type: &'static str,
    pub required: bool,
    pub value: String,
    pub error: Option<String>,
}

impl FormFieldView {
    pub fn new(name: &'static str, label: &'static str, input_type: &'static str) -> Self {
        Self {
            name,
            label,
            help_text: "",
            input_type,
            required: true,
            value: String::new(),
            error: None,
        }
    }

    pub fn help(mut self, help_text: &'static str) -> Self {
        self.help_text = help_text;
        self
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    pub fn errors(mut self, errors: &FieldErrors) -> Self {
        self.error = errors.message(self.name).map(str::to_string);
        self
    }
}

pub struct CommentFormView {
    pub action: String,
    pub text: FormFieldView,
}

impl CommentFormView {
    pub fn new(post_id: i64) -> Self {
        Self {
            action: format!("/posts/{post_id}/comment/"),
            text: FormFieldView::new("text", "Текст комментария", "textarea")
                .help("Введите текст комментария"),
        }
    }
}

pub struct PostDetailView {
    pub post: PostCard,
    pub author_post_count: u64,
    pub comments: Vec<CommentView>,
    pub can_edit: bool,
    pub comment_form: Option<CommentFormView>,
}

#[derive(Template)]
#[template(path = "posts/post_detail.html")]
pub struct PostDetailTemplate {
    pub view: LayoutContext<PostDetailView>,
}

pub struct GroupOptionView {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

pub struct PostFormView {
    pub is_edit: bool,
    pub action: String,
    pub text: FormFieldView,
    pub group: FormFieldView,
    pub group_options: Vec<GroupOptionView>,
    pub image: FormFieldView,
    pub current_image: Option<String>,
}

impl PostFormView {
    /// `selected_group` is the raw form value; empty means no group.
    pub fn new(
        action: String,
        text: &str,
        selected_group: &str,
        groups: &[GroupRecord],
        errors: &FieldErrors,
    ) -> Self {
        let group_options = groups
            .iter()
            .map(|group| {
                let value = group.id.to_string();
                GroupOptionView {
                    selected: value == selected_group,
                    value,
                    label: group.title.clone(),
                }
            })
            .collect();

        Self {
            is_edit: false,
            action,
            text: FormFieldView::new("text", "Текст поста", "textarea")
                .help("Введите текст поста")
                .value(text)
                .errors(errors),
            group: FormFieldView::new("group", "Группа", "select")
                .help("Группа, к которой будет относиться пост")
                .optional()
                .value(selected_group)
                .errors(errors),
            group_options,
            image: FormFieldView::new("image", "Картинка", "file")
                .optional()
                .errors(errors),
            current_image: None,
        }
    }

    pub fn editing(mut self, current_image: Option<String>) -> Self {
        self.is_edit = true;
        self.current_image = current_image.map(|path| format!("/media/{path}"));
        self
    }
}

#[derive(Template)]
#[template(path = "posts/create_post.html")]
pub struct PostFormTemplate {
    pub view: LayoutContext<PostFormView>,
}

/// Any of the account forms: a heading, inputs and an optional form-wide error.
pub struct AuthFormView {
    pub heading: &'static str,
    pub action: String,
    pub submit_label: &'static str,
    pub fields: Vec<FormFieldView>,
    pub non_field_error: Option<String>,
    pub next: Option<String>,
}

#[derive(Template)]
#[template(path = "users/form.html")]
pub struct AuthFormTemplate {
    pub view: LayoutContext<AuthFormView>,
}

pub struct LinkView {
    pub href: String,
    pub label: &'static str,
}

pub struct MessagePageView {
    pub heading: &'static str,
    pub message: &'static str,
    pub link: Option<LinkView>,
}

#[derive(Template)]
#[template(path = "users/message.html")]
pub struct MessageTemplate {
    pub view: LayoutContext<MessagePageView>,
}

#[derive(Template)]
#[template(path = "about/author.html")]
pub struct AboutAuthorTemplate {
    pub view: LayoutContext<()>,
}

#[derive(Template)]
#[template(path = "about/tech.html")]
pub struct AboutTechTemplate {
    pub view: LayoutContext<()>,
}

pub struct ErrorPageView {
    pub heading: String,
    pub message: String,
    pub path: Option<String>,
}

impl ErrorPageView {
    pub fn not_found() -> Self {
        Self {
            heading: "Страница не найдена".to_string(),
            message: "Запрошенная страница не существует.".to_string(),
            path: None,
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }
}

#[derive(Template)]
#[template(path = "core/error.html")]
pub struct ErrorTemplate {
    pub view: LayoutContext<ErrorPageView>,
}
