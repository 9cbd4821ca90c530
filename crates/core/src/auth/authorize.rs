use url::Url;

use super::PkcePair;

/// Scope requested from the custom OIDC provider unless configured otherwise.
pub const DEFAULT_SCOPE: &str = "openid email profile";

/// Build the authorization redirect for one attempt.
///
/// Parameters are appended after any query the endpoint already carries. The
/// same inputs always produce the same URL.
pub fn build_authorization_url(
    authorize_endpoint: &Url,
    client_id: &str,
    scope: &str,
    pkce: &PkcePair,
    state: &str,
    redirect_uri: &str,
) -> Url {
    let mut url = authorize_endpoint.clone();
    url.query_pairs_mut()
        .append_pair("client_id", client_id)
        .append_pair("redirect_uri", redirect_uri)
        .append_pair("response_type", "code")
        .append_pair("scope", scope)
        .append_pair("state", state)
        .append_pair("code_challenge", &pkce.challenge)
        .append_pair("code_challenge_method", pkce.method.as_str());
    url
}
