use crate::registry::{FlowTemplate, Fragment, RegistryBuilder};

pub fn register(builder: RegistryBuilder) -> RegistryBuilder {
    builder
        .flow(
            "flow:email_submit > dashboard",
            flow("Email sign-in fades the login card into the dashboard", EMAIL_SUBMIT),
        )
        .flow(
            "flow:google_auth > dashboard",
            flow("Google sign-in placeholder", GOOGLE_AUTH),
        )
        .flow(
            "flow:logout > login",
            flow("Logout fades the dashboard back into the login card", LOGOUT),
        )
        .flow(
            "flow:page_transition",
            flow("Fade between pages linked from a minimal nav", PAGE_TRANSITION),
        )
        .flow(
            "flow:page_transition; style=fade",
            flow("Fade between pages linked from a minimal nav", PAGE_TRANSITION),
        )
}

fn flow(summary: &str, js: &'static str) -> FlowTemplate {
    FlowTemplate {
        summary: summary.to_string(),
        params: Vec::new(),
        js: Fragment::literal(js),
    }
}

const EMAIL_SUBMIT: &str = r#"
document.getElementById("email-login").addEventListener("click", function (e) {
    e.preventDefault();
    fadeOut(loginBox, () => fadeIn(dashboard));
});"#;

const GOOGLE_AUTH: &str = "// Google auth flow - would redirect to /auth/google in real app";

const LOGOUT: &str = r#"
document.getElementById("logout-btn").addEventListener("click", function () {
    fadeOut(dashboard, () => fadeIn(loginBox));
});"#;

const PAGE_TRANSITION: &str = r#"
// Page transition with fade effect
if (document.querySelector('.nav-links-minimal') && document.getElementById('main-content')) {
  const navLinks = document.querySelector('.nav-links-minimal');
  const links = navLinks.querySelectorAll('a');
  const mainContent = document.getElementById('main-content');

  const style = document.createElement('style');
  style.textContent = `
    #main-content {
      transition: opacity 0.3s ease-in-out;
    }
  `;
  document.head.appendChild(style);

  async function loadPage(page) {
    try {
      mainContent.style.opacity = '0.5';

      const existingPageCSS = document.querySelector('link[data-page-css]');
      if (existingPageCSS) {
        existingPageCSS.remove();
      }

      let content = '';

      if (page === 'home') {
        content = document.getElementById('main-content').innerHTML;
      } else {
        const response = await fetch(`${page}.html`);
        if (response.ok) {
          const html = await response.text();
          const bodyMatch = html.match(/<body[^>]*>([\s\S]*?)<\/body>/i);
          content = bodyMatch ? bodyMatch[1] : html;

          const cssLink = document.createElement('link');
          cssLink.rel = 'stylesheet';
          cssLink.href = `${page}.css`;
          cssLink.setAttribute('data-page-css', page);
          document.head.appendChild(cssLink);
        } else {
          content = `<div style="color: #fbfbfbff; text-align: center; margin-top: 100px;">
              <h1 style="font-family: 'Instrument Serif', serif;">Page Not Found</h1>
              <p style="font-family: 'Inter', sans-serif;">The ${page} page is not available yet.</p>
          </div>`;
        }
      }

      setTimeout(() => {
        mainContent.innerHTML = content;
        mainContent.style.opacity = '1';
      }, 150);
    } catch (error) {
      console.error('Error loading page:', error);
      mainContent.innerHTML = `<div style="color: #fbfbfbff; text-align: center; margin-top: 100px;">
          <h1 style="font-family: 'Instrument Serif', serif;">Error</h1>
          <p style="font-family: 'Inter', sans-serif;">Could not load the ${page} page.</p>
      </div>`;
      mainContent.style.opacity = '1';
    }
  }

  links.forEach((link) => {
    link.addEventListener('click', (e) => {
      e.preventDefault();
      const page = link.getAttribute('data-page');
      links.forEach(l => l.classList.remove('active'));
      link.classList.add('active');
      if (page) {
        loadPage(page);
      }
    });
  });
}"#;

#[cfg(test)]
mod tests {
    use crate::params::Params;
    use crate::registry::Registry;

    #[test]
    fn test_flow_lines_resolve() {
        let registry = Registry::builtin();
        let t = registry
            .flow("flow:email_submit > dashboard", "flow:email_submit > dashboard")
            .unwrap();
        let js = t.js.render(&Params::new()).unwrap();
        assert!(js.contains("fadeOut(loginBox, () => fadeIn(dashboard));"));

        assert!(registry
            .flow("flow:page_transition; style=fade;", "flow:page_transition")
            .is_some());
        assert!(registry.flow("flow:teleport > moon", "flow:teleport > moon").is_none());
    }
}
