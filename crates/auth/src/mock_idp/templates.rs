//! HTML templates for the Mock IdP login page.

/// Escape HTML special characters to prevent XSS.
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Parameters of the authorize request carried through the login form.
pub struct LoginPage<'a> {
    pub state: &'a str,
    pub redirect_uri: &'a str,
    pub code_challenge: &'a str,
}

/// Generate the HTML login page.
pub fn login_page(page: &LoginPage<'_>) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <title>Mock OIDC Sign In (DEV ONLY)</title>
    <style>
        body {{
            font-family: -apple-system, BlinkMacSystemFont, sans-serif;
            max-width: 400px;
            margin: 100px auto;
            padding: 20px;
        }}
        .warning {{
            background: #fff3cd;
            border: 1px solid #ffc107;
            padding: 15px;
            border-radius: 8px;
            margin-bottom: 20px;
        }}
        .warning h2 {{
            color: #856404;
            margin-top: 0;
        }}
        form {{
            background: #f8f9fa;
            padding: 20px;
            border-radius: 8px;
        }}
        label {{
            display: block;
            margin-bottom: 5px;
            font-weight: 500;
        }}
        input[type="text"] {{
            width: 100%;
            padding: 10px;
            margin-bottom: 15px;
            border: 1px solid #ced4da;
            border-radius: 4px;
            box-sizing: border-box;
        }}
        button {{
            width: 100%;
            padding: 12px;
            background: #007bff;
            color: white;
            border: none;
            border-radius: 4px;
            cursor: pointer;
            font-size: 16px;
        }}
    </style>
</head>
<body>
    <div class="warning">
        <h2>Development Only</h2>
        <p>This is a <strong>mock OpenID Connect login</strong> for development purposes.</p>
        <p>Enter any username to simulate authentication.</p>
    </div>

    <form action="/authorize/submit" method="POST">
        <input type="hidden" name="state" value="{state}" />
        <input type="hidden" name="redirect_uri" value="{redirect_uri}" />
        <input type="hidden" name="code_challenge" value="{code_challenge}" />

        <label for="username">Username</label>
        <input type="text" id="username" name="username" placeholder="alice" required />

        <button type="submit">Sign in</button>
    </form>
</body>
</html>"#,
        state = html_escape(page.state),
        redirect_uri = html_escape(page.redirect_uri),
        code_challenge = html_escape(page.code_challenge),
    )
}
