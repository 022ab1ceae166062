//! Sign up, log in, log out and password change pages.

use axum::{
    extract::{Form, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::{
    CookieJar,
    cookie::{Cookie, SameSite},
};
use serde::Deserialize;

use crate::{
    application::{
        accounts::{
            AccountError, INVALID_LOGIN_MESSAGE, LoginForm, PasswordChangeForm, Principal,
            SessionToken, SignupForm,
        },
        error::HttpError,
    },
    domain::validators::FieldErrors,
    presentation::views::{
        AuthFormTemplate, AuthFormView, FormFieldView, LayoutChrome, LayoutContext, LinkView,
        MessagePageView, MessageTemplate, render_template_response,
    },
};

use super::{
    HttpState,
    auth::{LOGIN_PATH, SignedIn, Viewer, found, local_location},
};

const PASSWORD_CHANGE_DONE_PATH: &str = "/auth/password_change/done/";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct SignupInput {
    first_name: String,
    last_name: String,
    username: String,
    email: String,
    password1: String,
    password2: String,
}

impl From<SignupInput> for SignupForm {
    fn from(input: SignupInput) -> Self {
        Self {
            first_name: input.first_name,
            last_name: input.last_name,
            username: input.username,
            email: input.email,
            password1: input.password1,
            password2: input.password2,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct LoginInput {
    username: String,
    password: String,
    next: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct NextQuery {
    next: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct PasswordChangeInput {
    old_password: String,
    new_password1: String,
    new_password2: String,
}

pub(super) async fn signup_form(Viewer(principal): Viewer) -> Response {
    render_signup(
        LayoutChrome::new(&principal),
        &SignupForm::default(),
        &FieldErrors::new(),
    )
}

pub(super) async fn signup(
    State(state): State<HttpState>,
    Viewer(principal): Viewer,
    jar: CookieJar,
    Form(input): Form<SignupInput>,
) -> Response {
    let form = SignupForm::from(input);
    match state.accounts.signup(&form).await {
        Ok((_, token)) => {
            let jar = jar.add(session_cookie(&state, token));
            (jar, found("/")).into_response()
        }
        Err(AccountError::Validation(errors)) => {
            render_signup(LayoutChrome::new(&principal), &form, &errors)
        }
        Err(err) => HttpError::from(err).into_response(),
    }
}

pub(super) async fn login_form(
    Viewer(principal): Viewer,
    Query(query): Query<NextQuery>,
) -> Response {
    render_login(
        LayoutChrome::new(&principal),
        "",
        query.next,
        &FieldErrors::new(),
        None,
    )
}

pub(super) async fn login(
    State(state): State<HttpState>,
    Viewer(principal): Viewer,
    jar: CookieJar,
    Form(input): Form<LoginInput>,
) -> Response {
    let form = LoginForm {
        username: input.username,
        password: input.password,
    };

    match state.accounts.login(&form).await {
        Ok((_, token)) => {
            let target = input
                .next
                .as_deref()
                .and_then(local_location)
                .unwrap_or_else(|| "/".to_string());
            let jar = jar.add(session_cookie(&state, token));
            (jar, found(&target)).into_response()
        }
        Err(AccountError::Validation(errors)) => render_login(
            LayoutChrome::new(&principal),
            &form.username,
            input.next,
            &errors,
            None,
        ),
        Err(AccountError::InvalidCredentials) => render_login(
            LayoutChrome::new(&principal),
            &form.username,
            input.next,
            &FieldErrors::new(),
            Some(INVALID_LOGIN_MESSAGE),
        ),
        Err(err) => HttpError::from(err).into_response(),
    }
}

pub(super) async fn logout(State(state): State<HttpState>, jar: CookieJar) -> Response {
    if let Some(cookie) = jar.get(&state.session_cookie) {
        if let Err(err) = state.accounts.logout(cookie.value()).await {
            return HttpError::from(err).into_response();
        }
    }

    let jar = jar.remove(Cookie::build(state.session_cookie.to_string()).path("/"));
    let view = MessagePageView {
        heading: "Вы вышли из своей учётной записи",
        message: "Ждём вас снова!",
        link: Some(LinkView {
            href: LOGIN_PATH.to_string(),
            label: "Войти снова",
        }),
    };
    let chrome = LayoutChrome::new(&Principal::Anonymous).with_title("Вы вышли из системы");
    let page = render_template_response(
        MessageTemplate {
            view: LayoutContext::new(chrome, view),
        },
        StatusCode::OK,
    );
    (jar, page).into_response()
}

pub(super) async fn password_change_form(signed_in: SignedIn) -> Response {
    render_password_change(LayoutChrome::new(&signed_in.principal), &FieldErrors::new())
}

pub(super) async fn password_change(
    State(state): State<HttpState>,
    signed_in: SignedIn,
    Form(input): Form<PasswordChangeInput>,
) -> Response {
    let form = PasswordChangeForm {
        old_password: input.old_password,
        new_password1: input.new_password1,
        new_password2: input.new_password2,
    };

    match state
        .accounts
        .change_password(signed_in.user.id, &form)
        .await
    {
        Ok(()) => found(PASSWORD_CHANGE_DONE_PATH),
        Err(AccountError::Validation(errors)) => {
            render_password_change(LayoutChrome::new(&signed_in.principal), &errors)
        }
        Err(err) => HttpError::from(err).into_response(),
    }
}

pub(super) async fn password_change_done(signed_in: SignedIn) -> Response {
    let view = MessagePageView {
        heading: "Пароль изменён",
        message: "Ваш пароль был успешно изменён.",
        link: Some(LinkView {
            href: "/".to_string(),
            label: "На главную",
        }),
    };
    let chrome = LayoutChrome::new(&signed_in.principal).with_title("Пароль изменён");
    render_template_response(
        MessageTemplate {
            view: LayoutContext::new(chrome, view),
        },
        StatusCode::OK,
    )
}

fn session_cookie(state: &HttpState, token: SessionToken) -> Cookie<'static> {
    Cookie::build((state.session_cookie.to_string(), token.into_inner()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(state.session_ttl)
        .build()
}

fn render_signup(chrome: LayoutChrome, form: &SignupForm, errors: &FieldErrors) -> Response {
    let view = AuthFormView {
        heading: "Зарегистрироваться",
        action: "/auth/signup/".to_string(),
        submit_label: "Зарегистрироваться",
        fields: vec![
            FormFieldView::new("first_name", "Имя", "text")
                .optional()
                .value(form.first_name.as_str())
                .errors(errors),
            FormFieldView::new("last_name", "Фамилия", "text")
                .optional()
                .value(form.last_name.as_str())
                .errors(errors),
            FormFieldView::new("username", "Имя пользователя", "text")
                .help("Обязательное поле. Не более 150 символов. Только буквы, цифры и символы @/./+/-/_.")
                .value(form.username.as_str())
                .errors(errors),
            FormFieldView::new("email", "Адрес электронной почты", "email")
                .optional()
                .value(form.email.as_str())
                .errors(errors),
            FormFieldView::new("password1", "Пароль", "password").errors(errors),
            FormFieldView::new("password2", "Подтверждение пароля", "password")
                .help("Для подтверждения введите, пожалуйста, пароль ещё раз.")
                .errors(errors),
        ],
        non_field_error: None,
        next: None,
    };
    render_template_response(
        AuthFormTemplate {
            view: LayoutContext::new(chrome.with_title("Регистрация"), view),
        },
        StatusCode::OK,
    )
}

fn render_login(
    chrome: LayoutChrome,
    username: &str,
    next: Option<String>,
    errors: &FieldErrors,
    non_field_error: Option<&str>,
) -> Response {
    let view = AuthFormView {
        heading: "Войти на сайт",
        action: LOGIN_PATH.to_string(),
        submit_label: "Войти",
        fields: vec![
            FormFieldView::new("username", "Имя пользователя", "text")
                .value(username)
                .errors(errors),
            FormFieldView::new("password", "Пароль", "password").errors(errors),
        ],
        non_field_error: non_field_error.map(str::to_string),
        next: next.filter(|value| local_location(value).is_some()),
    };
    render_template_response(
        AuthFormTemplate {
            view: LayoutContext::new(chrome.with_title("Войти"), view),
        },
        StatusCode::OK,
    )
}

fn render_password_change(chrome: LayoutChrome, errors: &FieldErrors) -> Response {
    let view = AuthFormView {
        heading: "Изменить пароль",
        action: "/auth/password_change/".to_string(),
        submit_label: "Изменить пароль",
        fields: vec![
            FormFieldView::new("old_password", "Старый пароль", "password").errors(errors),
            FormFieldView::new("new_password1", "Новый пароль", "password").errors(errors),
            FormFieldView::new("new_password2", "Подтверждение нового пароля", "password")
                .errors(errors),
        ],
        non_field_error: None,
        next: None,
    };
    render_template_response(
        AuthFormTemplate {
            view: LayoutContext::new(chrome.with_title("Смена пароля"), view),
        },
        StatusCode::OK,
    )
}
