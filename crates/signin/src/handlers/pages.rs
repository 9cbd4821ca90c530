use askama::Template;
use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use signin_auth::{AuthState, OptionalSession};
use signin_core::auth::SessionUser;

/// Template wrapper that converts Askama templates into HTML responses.
struct HtmlTemplate<T>(T);

impl<T> IntoResponse for HtmlTemplate<T>
where
    T: Template,
{
    fn into_response(self) -> Response {
        match self.0.render() {
            Ok(html) => Html(html).into_response(),
            Err(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to render template: {err}"),
            )
                .into_response(),
        }
    }
}

struct ProviderLink {
    name: String,
    login_url: String,
}

/// Index page: the signed-in user, or a login link per provider.
#[derive(Template)]
#[template(path = "index.html")]
struct IndexTemplate {
    user: Option<SessionUser>,
    providers: Vec<ProviderLink>,
}

/// Handler for the index page (GET /).
pub async fn index(
    State(auth): State<AuthState>,
    OptionalSession(session): OptionalSession,
) -> impl IntoResponse {
    let providers = auth
        .providers()
        .map(|p| ProviderLink {
            name: p.display_name().to_string(),
            login_url: format!("/auth/{}/login", p.kind().slug()),
        })
        .collect();

    HtmlTemplate(IndexTemplate {
        user: session.map(|s| s.user),
        providers,
    })
}
