use super::is_dark;
use crate::params::Params;
use crate::registry::{names, BlueprintTemplate, Fragment, RegistryBuilder};

pub fn register(builder: RegistryBuilder) -> RegistryBuilder {
    builder
        .blueprint("blueprint:test/blank", blank())
        .blueprint("blueprint:auth/login+dashboard", login_dashboard())
}

fn output(params: &Params) -> &str {
    params.text_or("output", "app")
}

fn blank() -> BlueprintTemplate {
    BlueprintTemplate {
        summary: "Empty page with a themed background".into(),
        params: names(&["theme", "background", "output"]),
        start: Fragment::computed(|p| {
            format!(
                r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <title>Test Page</title>
  <link href="https://fonts.googleapis.com/css2?family=Inter:wght@300;400;500;600;700&family=Instrument+Serif:ital@0;1&family=Faustina:wght@300;400;500;600;700;800&display=swap" rel="stylesheet">
  <link rel="stylesheet" href="{}.css">
</head>
<body>"#,
                output(p)
            )
        }),
        end: Fragment::computed(|p| {
            format!(
                r#"
  <script src="{}.js"></script>
</body>
</html>"#,
                output(p)
            )
        }),
        css: Fragment::computed(|p| {
            let default_bg = if is_dark(p) { "#101010ff" } else { "#f7f7f7ff" };
            format!(
                "body {{\n    margin: 0;\n    background: {};\n    min-height: 100vh;\n}}\n",
                p.text_or("background", default_bg)
            )
        }),
        js: Fragment::empty(),
    }
}

struct LoginColors {
    body_bg: &'static str,
    body_color: &'static str,
    card_bg: &'static str,
    card_border: &'static str,
    accent: &'static str,
    subtext: &'static str,
    input_bg: &'static str,
    input_color: &'static str,
    separator_color: &'static str,
    separator_line: &'static str,
    footer_color: &'static str,
    dashboard_bg: &'static str,
    dashboard_border: &'static str,
    button_bg: &'static str,
    button_hover: &'static str,
    icon_filter: &'static str,
    btn_bg: &'static str,
    btn_color: &'static str,
    btn_glow: &'static str,
}

const LOGIN_DARK: LoginColors = LoginColors {
    body_bg: "linear-gradient(135deg, #100f17, #17161a)",
    body_color: "#ffffff",
    card_bg: "#171721",
    card_border: "rgba(255, 255, 255, 0.05)",
    accent: "#20b2aa",
    subtext: "#b0b0c3",
    input_bg: "#1c1c29",
    input_color: "#ffffff",
    separator_color: "#6e6a7b",
    separator_line: "#2e2e3f",
    footer_color: "#777777",
    dashboard_bg: "#17161c",
    dashboard_border: "#444444",
    button_bg: "#1c1b22",
    button_hover: "#232227",
    icon_filter: "none",
    btn_bg: "#ffffff",
    btn_color: "#000000",
    btn_glow: "rgba(255, 255, 255, 0.3)",
};

const LOGIN_LIGHT: LoginColors = LoginColors {
    body_bg: "linear-gradient(135deg, #f8f9fa, #e9ecef)",
    body_color: "#333333",
    card_bg: "#ffffff",
    card_border: "rgba(0, 0, 0, 0.1)",
    accent: "#6c5ce7",
    subtext: "#6c757d",
    input_bg: "#f8f9fa",
    input_color: "#333333",
    separator_color: "#6c757d",
    separator_line: "#dee2e6",
    footer_color: "#6c757d",
    dashboard_bg: "#ffffff",
    dashboard_border: "#dee2e6",
    button_bg: "#f8f9fa",
    button_hover: "#e9ecef",
    icon_filter: "invert(1)",
    btn_bg: "#000000",
    btn_color: "#ffffff",
    btn_glow: "rgba(0, 0, 0, 0.3)",
};

fn login_dashboard() -> BlueprintTemplate {
    BlueprintTemplate {
        summary: "Centered login card that fades into a dashboard".into(),
        params: names(&["theme", "output"]),
        start: Fragment::computed(|p| {
            format!(
                r#"<!DOCTYPE html>
<html lang="en">

<head>
  <meta charset="UTF-8">
  <title>Login</title>
  <link href="https://fonts.googleapis.com/css2?family=Inter:wght@400;600;700&display=swap" rel="stylesheet">
  <link rel="stylesheet" href="{}.css">
</head>

<body>
  <div class="login-box" id="login-box">
    <h2>Welcome Back</h2>
    <div class="subtext">Sign in to your account to continue</div>"#,
                output(p)
            )
        }),
        end: Fragment::computed(|p| {
            format!(
                r##"    <div class="footer">
      Don't have an account? <a href="#">Sign up</a>
    </div>
  </div>

  <div id="dashboard" class="hidden">
    <h2>Welcome, John Doe</h2>
    <p>You are now logged in. This is your dashboard.</p>
    <button id="logout-btn" class="btn glow">Logout</button>
  </div>

  <script src="{}.js"></script>
</body>

</html>"##,
                output(p)
            )
        }),
        // The login card is dark unless asked otherwise.
        css: Fragment::computed(|p| {
            let c = if p.text("theme") == Some("light") {
                &LOGIN_LIGHT
            } else {
                &LOGIN_DARK
            };
            login_css(c)
        }),
        js: Fragment::literal(LOGIN_JS),
    }
}

fn login_css(c: &LoginColors) -> String {
    format!(
        r#"body {{
    margin: 0;
    padding: 0;
    font-family: 'Inter', sans-serif;
    color: {body_color};
    display: flex;
    justify-content: center;
    align-items: center;
    height: 100vh;
    background: {body_bg};
}}

.fade {{
    opacity: 0;
    visibility: hidden;
    transition: opacity 0.5s ease, visibility 0.5s ease;
    position: absolute;
    top: 50%;
    left: 50%;
    transform: translate(-50%, -50%);
}}

.fade.show {{
    opacity: 1;
    visibility: visible;
}}

.hidden {{
    opacity: 0 !important;
    visibility: hidden !important;
    pointer-events: none;
}}

.login-box,
#dashboard {{
    position: absolute;
    top: 50%;
    left: 50%;
    transform: translate(-50%, -50%);
    transition: opacity 0.2s ease, visibility 0.2s ease;
    opacity: 1;
    visibility: visible;
}}

.login-box {{
    background: {card_bg};
    padding: 2rem;
    border-radius: 12px;
    box-shadow: 0 0 0 1px {card_border};
    width: 100%;
    max-width: 400px;
}}

h2 {{
    text-align: center;
    color: {accent};
    font-weight: 700;
    font-size: 30px;
    font-family: 'Segoe UI';
    margin-bottom: 1.7rem;
}}

.subtext {{
    text-align: center;
    font-size: 0.95rem;
    color: {subtext};
    margin-bottom: 1.5rem;
}}

.btn {{
    width: 100%;
    padding: 0.75rem;
    border-radius: 24px;
    background-color: {btn_bg};
    border: none;
    font-family: 'Segoe UI';
    font-weight: 500;
    font-size: 16px;
    color: {btn_color};
    display: flex;
    align-items: center;
    justify-content: center;
    margin-bottom: 1rem;
    cursor: pointer;
    transition: box-shadow 0.3s ease;
}}

.btn:hover {{
    box-shadow: 0 0 18px {btn_glow};
}}

.btn img {{
    margin-right: 0.5rem;
    height: 1rem;
    filter: {icon_filter};
}}

.separator {{
    display: flex;
    align-items: center;
    text-align: center;
    margin: 1.5rem 0;
    color: {separator_color};
    font-size: 0.7rem;
    font-family: 'Segoe UI';
}}

.separator::before,
.separator::after {{
    content: "";
    flex: 1;
    height: 1px;
    background: {separator_line};
    margin: 0 0.5rem;
}}

label {{
    font-size: 0.85rem;
    display: block;
    margin-bottom: 0.25rem;
}}

input {{
    width: 94%;
    padding: 0.75rem;
    background: {input_bg};
    font-family: 'Segoe UI';
    font-size: 14px;
    border: none;
    border-radius: 12px;
    color: {input_color};
    margin-bottom: 1rem;
}}

.sign-in {{
    background: linear-gradient(to right, #5434e2, #5ea2ef);
    color: #ffffff;
}}

.footer {{
    text-align: center;
    font-size: 0.85rem;
    color: {footer_color};
    margin-top: 1rem;
}}

.footer a {{
    color: {accent};
    text-decoration: none;
}}

#dashboard {{
    margin-top: 40px;
    padding: 20px;
    border: 1px solid {dashboard_border};
    border-radius: 12px;
    background-color: {dashboard_bg};
    color: {body_color};
    text-align: center;
    max-width: 400px;
    margin-left: auto;
    margin-right: auto;
    box-shadow: 0 0 20px rgba(0, 0, 0, 0.2);
}}

#dashboard h2 {{
    margin-bottom: 10px;
    font-size: 24px;
}}

#dashboard button {{
    background-color: {button_bg};
    color: {body_color};
    border: 1px solid {dashboard_border};
    padding: 10px 20px;
    border-radius: 8px;
    margin-top: 20px;
    cursor: pointer;
    transition: background-color 0.3s ease;
}}

#dashboard button:hover {{
    background-color: {button_hover};
}}
"#,
        body_color = c.body_color,
        body_bg = c.body_bg,
        card_bg = c.card_bg,
        card_border = c.card_border,
        accent = c.accent,
        subtext = c.subtext,
        btn_bg = c.btn_bg,
        btn_color = c.btn_color,
        btn_glow = c.btn_glow,
        icon_filter = c.icon_filter,
        separator_color = c.separator_color,
        separator_line = c.separator_line,
        input_bg = c.input_bg,
        input_color = c.input_color,
        footer_color = c.footer_color,
        dashboard_border = c.dashboard_border,
        dashboard_bg = c.dashboard_bg,
        button_bg = c.button_bg,
        button_hover = c.button_hover,
    )
}

const LOGIN_JS: &str = r#"const loginBox = document.getElementById("login-box");
const dashboard = document.getElementById("dashboard");

function fadeIn(el) {
    el.classList.remove("hidden");
    el.classList.add("fade");
    void el.offsetWidth;
    el.classList.add("show");
}

function fadeOut(el, callback) {
    el.classList.remove("show");
    setTimeout(() => {
        el.classList.add("hidden");
        el.classList.remove("fade");
        if (callback) callback();
    }, 500);
}
"#;
