use crate::params::Params;
use crate::registry::{names, ComponentTemplate, Fragment, RegistryBuilder};

pub fn register(builder: RegistryBuilder) -> RegistryBuilder {
    builder
        .component("provider:google", provider_google())
        .component("provider:apple", provider_apple())
        .component("form:email", form_email())
        .component(
            r#"form:email; fields=[email,password]; submit="Sign In"; validation=[required,email_format]"#,
            form_email_validated(),
        )
        .component("separator:text", separator_text())
        .component(
            r#"separator:text; content="OR CONTINUE WITH EMAIL""#,
            literal("Fixed email separator", SEPARATOR_EMAIL),
        )
        .component(
            r#"ui:dashboard; welcome="Welcome, John Doe"; state=hidden; includes=[logout_button]"#,
            literal("Placeholder; the login blueprint already renders the dashboard", UI_DASHBOARD),
        )
        .component("ui:footer", ui_footer())
        .component(
            r##"ui:footer; text="Don't have an account?"; link=[text="Sign up",href="#"]"##,
            literal("Fixed sign-up footer", UI_FOOTER),
        )
}

fn literal(summary: &str, html: &'static str) -> ComponentTemplate {
    ComponentTemplate {
        summary: summary.to_string(),
        html: Fragment::literal(html),
        ..Default::default()
    }
}

const GOOGLE_ICON: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 24 24" width="16" height="16" style="margin-right: 0.5rem;">
  <path fill="#4285f4" d="M22.56 12.25c0-.78-.07-1.53-.2-2.25H12v4.26h5.92c-.26 1.37-1.04 2.53-2.21 3.31v2.77h3.57c2.08-1.92 3.28-4.74 3.28-8.09z"/>
  <path fill="#34a853" d="M12 23c2.97 0 5.46-.98 7.28-2.66l-3.57-2.77c-.98.66-2.23 1.06-3.71 1.06-2.86 0-5.29-1.93-6.16-4.53H2.18v2.84C3.99 20.53 7.7 23 12 23z"/>
  <path fill="#fbbc05" d="M5.84 14.09c-.22-.66-.35-1.36-.35-2.09s.13-1.43.35-2.09V7.07H2.18C1.43 8.55 1 10.22 1 12s.43 3.45 1.18 4.93l2.85-2.22.81-.62z"/>
  <path fill="#ea4335" d="M12 5.38c1.62 0 3.06.56 4.21 1.64l3.15-3.15C17.45 2.09 14.97 1 12 1 7.7 1 3.99 3.47 2.18 7.07l3.66 2.84c.87-2.6 3.3-4.53 6.16-4.53z"/>
</svg>"##;

fn provider_google() -> ComponentTemplate {
    ComponentTemplate {
        summary: "Google sign-in button".into(),
        params: names(&["text"]),
        html: Fragment::computed(|p| {
            format!(
                r#"
    <button class="btn glow" id="google-login">
      {GOOGLE_ICON}
      {}
    </button>"#,
                p.text_or("text", "Continue with Google")
            )
        }),
        ..Default::default()
    }
}

fn provider_apple() -> ComponentTemplate {
    ComponentTemplate {
        summary: "Apple sign-in button".into(),
        params: names(&["text"]),
        html: Fragment::computed(|p| {
            format!(
                r#"
    <button class="btn glow" id="apple-login">
      <img src="https://upload.wikimedia.org/wikipedia/commons/f/fa/Apple_logo_black.svg" alt="Apple logo">
      {}
    </button>"#,
                p.text_or("text", "Continue with Apple")
            )
        }),
        ..Default::default()
    }
}

fn field_markup(field: &str) -> String {
    let (input_type, label) = match field {
        "email" => ("email", "Email"),
        "password" => ("password", "Password"),
        "phone" => ("tel", "Phone"),
        other => ("text", other),
    };
    let mut label = label.to_string();
    if let Some(first) = label.get(..1) {
        label = first.to_uppercase() + &label[1..];
    }
    format!(
        r#"
      <label>{label}</label>
      <input type="{input_type}" name="{field}" placeholder="Enter your {}">
"#,
        label.to_lowercase()
    )
}

fn form_html(p: &Params) -> String {
    let fields = p
        .items("fields")
        .unwrap_or_else(|| vec!["email", "password"]);
    let submit = p.text_or("submit", "Sign In");
    let inputs: String = fields.into_iter().map(field_markup).collect();

    format!(
        r#"
    <form>{inputs}
      <button class="btn sign-in glow" id="email-login">{submit}</button>
    </form>"#
    )
}

fn form_email() -> ComponentTemplate {
    ComponentTemplate {
        summary: "Email sign-in form built from a list of fields".into(),
        params: names(&["fields", "submit"]),
        html: Fragment::computed(form_html),
        ..Default::default()
    }
}

fn form_email_validated() -> ComponentTemplate {
    ComponentTemplate {
        summary: "Email and password form with browser validation".into(),
        html: Fragment::literal(
            r#"
    <form>
      <label>Email</label>
      <input type="email" name="email" placeholder="Enter your email" required>

      <label>Password</label>
      <input type="password" name="password" placeholder="Enter your password" required>

      <button class="btn sign-in glow" id="email-login">Sign In</button>
    </form>"#,
        ),
        ..Default::default()
    }
}

fn separator_text() -> ComponentTemplate {
    ComponentTemplate {
        summary: "Horizontal rule with a caption".into(),
        params: names(&["content"]),
        html: Fragment::computed(|p| {
            format!(
                "\n    <div class=\"separator\">{}</div>",
                p.text_or("content", "OR")
            )
        }),
        ..Default::default()
    }
}

const SEPARATOR_EMAIL: &str = r#"
    <div class="separator">OR CONTINUE WITH EMAIL</div>"#;

const UI_DASHBOARD: &str =
    "<!-- Dashboard already included in blueprint html.end, so this can be empty or a comment -->";

fn ui_footer() -> ComponentTemplate {
    ComponentTemplate {
        summary: "Footer line with a call-to-action link".into(),
        params: names(&["text", "link", "href"]),
        html: Fragment::computed(|p| {
            format!(
                r#"
    <div class="footer">
      {} <a href="{}">{}</a>
    </div>"#,
                p.text_or("text", "Don't have an account?"),
                p.text_or("href", "#"),
                p.text_or("link", "Sign up")
            )
        }),
        ..Default::default()
    }
}

const UI_FOOTER: &str = r##"
    <div class="footer">
      Don't have an account? <a href="#">Sign up</a>
    </div>"##;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Registry;

    #[test]
    fn test_form_fields() {
        let mut p = Params::new();
        p.insert("fields", vec!["email".to_string(), "company".to_string()]);
        p.insert("submit", "Join");

        let html = form_html(&p);
        assert!(html.contains(r#"<input type="email" name="email""#));
        assert!(html.contains("<label>Company</label>"));
        assert!(html.contains(r#"id="email-login">Join</button>"#));
        assert!(!html.contains("password"));
    }

    #[test]
    fn test_exact_form_overrides_generated_one() {
        let registry = Registry::builtin();
        let exact = r#"form:email; fields=[email,password]; submit="Sign In"; validation=[required,email_format];"#;
        let t = registry.component(exact, "form:email").unwrap();
        assert!(!t.html.is_computed());

        let loose = r#"form:email; fields=[email,password]; submit="Sign In";"#;
        let t = registry.component(loose, "form:email").unwrap();
        assert!(t.html.is_computed());
    }

    #[test]
    fn test_separator_caption() {
        let registry = Registry::builtin();
        let t = registry
            .component("separator:text; content=\"OR\"", "separator:text")
            .unwrap();
        let mut p = Params::new();
        p.insert("content", "OR");
        assert!(t.html.render(&p).unwrap().contains(">OR</div>"));
    }
}
