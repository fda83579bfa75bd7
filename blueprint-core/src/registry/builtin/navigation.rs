use super::is_dark;
use crate::params::Params;
use crate::registry::{names, ComponentTemplate, Fragment, RegistryBuilder};

pub fn register(builder: RegistryBuilder) -> RegistryBuilder {
    builder.component("nav", nav())
}

/// Bare page names get `.html`; URLs, anchors and file names are left alone.
fn normalize_href(href: &str) -> String {
    if !href.contains('.') && !href.starts_with("http") && !href.contains('#') {
        format!("{href}.html")
    } else {
        href.to_string()
    }
}

fn nav_html(p: &Params) -> String {
    let links = p
        .items("links")
        .unwrap_or_else(|| vec!["Product", "Pricing", "Contact"]);
    let hrefs: Vec<String> = p
        .items("hrefs")
        .unwrap_or_default()
        .into_iter()
        .map(normalize_href)
        .collect();

    let dark = is_dark(p);
    let active = p.number("activeIndex").unwrap_or(0);
    let spacing = p.text_or("spacing", "30px");
    let font = p.text_or("font", "Inter");
    let text_color = p.text_or("color", if dark { "#f7f7f7ff" } else { "#191919ff" });
    let pill_glass = if dark { "rgba(255, 255, 255, 0.08)" } else { "rgba(0, 0, 0, 0.08)" };
    let pill_minimal = if dark { "rgba(255, 255, 255, 0.12)" } else { "rgba(20, 45, 142, 0.2)" };
    let links_class = match p.text("style") {
        Some("minimal") => "nav-links-minimal",
        _ => "nav-links-glassmorphism",
    };
    let justify = match p.text("layout") {
        Some("center") => "center",
        Some("left") => "flex-start",
        _ => "flex-end",
    };

    let anchors: String = links
        .iter()
        .enumerate()
        .map(|(i, link)| {
            let href = hrefs.get(i).map(String::as_str).unwrap_or("#");
            let class = if i == active { "active" } else { "" };
            format!(r#"<a href="{href}" class="{class}">{link}</a>"#)
        })
        .collect();

    format!(
        r#"
<div class="nav-container" style="display: flex; justify-content: {justify}; padding: 0px 40px;">
  <div class="{links_class}" style="margin: {spacing} 0; --nav-text-color: {text_color}; --pill-bg-glass: {pill_glass}; --pill-bg-minimal: {pill_minimal}; font-family: '{font}', sans-serif;">
    {anchors}
  </div>
</div>"#
    )
}

fn nav() -> ComponentTemplate {
    ComponentTemplate {
        summary: "Navigation bar with an animated pill, glassmorphism or minimal style".into(),
        params: names(&[
            "links", "hrefs", "style", "activeIndex", "spacing", "theme", "font", "color",
            "layout",
        ]),
        html: Fragment::computed(nav_html),
        css: Fragment::literal(NAV_CSS),
        js: Fragment::literal(NAV_JS),
    }
}

const NAV_CSS: &str = r#"
/* Glassmorphism style - with container background */
.nav-links-glassmorphism {
  display: inline-flex;
  gap: 14px;
  position: relative;
  background: rgba(61, 61, 61, 0.09);
  padding: 3px 6px;
  border-radius: 20px;
  backdrop-filter: blur(10px);
}

.nav-links-glassmorphism::before {
  content: '';
  position: absolute;
  background: var(--pill-bg-glass, rgba(0, 0, 0, 0.08));
  border-radius: 20px;
  transition: all 0.3s ease;
  z-index: 1;
  height: calc(100% - 12px);
  top: 6px;
  width: var(--pill-width-glass, 60px);
  left: var(--pill-position-glass, 8px);
}

/* Minimal style. no container, just pill */
.nav-links-minimal {
  display: inline-flex;
  gap: 14px;
  position: relative;
}

.nav-links-minimal::before {
  content: '';
  position: absolute;
  background: var(--pill-bg-minimal, rgba(0, 0, 0, 0.08));
  border-radius: 20px;
  transition: all 0.3s ease;
  z-index: 1;
  height: calc(100% - 6px);
  top: 3px;
  width: var(--pill-width-minimal, 60px);
  left: var(--pill-position-minimal, 0px);
}

.nav-links-glassmorphism a,
.nav-links-minimal a {
  color: var(--nav-text-color, #f7f7f7ff);
  text-decoration: none;
  padding: 8px 16px;
  border-radius: 20px;
  position: relative;
  z-index: 2;
  transition: all 0.3s ease;
  font-family: inherit;
}

.nav-links-glassmorphism a:hover,
.nav-links-minimal a:hover {
  color: var(--nav-text-color, #f7f7f7ff);
  opacity: 0.8;
}

.nav-links-glassmorphism a.active,
.nav-links-minimal a.active {
  color: var(--nav-text-color, #f7f7f7ff);
}
"#;

const NAV_JS: &str = r#"
// Slide the pill under the active link for either nav style
['glassmorphism', 'minimal'].forEach(function (style) {
  const navLinks = document.querySelector('.nav-links-' + style);
  if (!navLinks) return;
  const links = navLinks.querySelectorAll('a');

  function updatePill() {
    const activeLink = navLinks.querySelector('a.active');
    if (activeLink) {
      navLinks.style.setProperty('--pill-position-' + (style === 'minimal' ? 'minimal' : 'glass'), activeLink.offsetLeft + 'px');
      navLinks.style.setProperty('--pill-width-' + (style === 'minimal' ? 'minimal' : 'glass'), activeLink.offsetWidth + 'px');
    }
  }

  links.forEach(function (link) {
    link.addEventListener('click', function (e) {
      if (link.getAttribute('href') === '#') e.preventDefault();
      links.forEach(function (l) { l.classList.remove('active'); });
      link.classList.add('active');
      updatePill();
    });
  });

  updatePill();
});
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_href() {
        assert_eq!(normalize_href("about"), "about.html");
        assert_eq!(normalize_href("about.html"), "about.html");
        assert_eq!(normalize_href("https://example.com"), "https://example.com");
        assert_eq!(normalize_href("#top"), "#top");
    }

    #[test]
    fn test_nav_links_and_active_index() {
        let mut p = Params::new();
        p.insert("links", vec!["Home".to_string(), "Docs".to_string()]);
        p.insert("hrefs", vec!["index".to_string()]);
        p.insert("activeIndex", "1");

        let html = nav_html(&p);
        assert!(html.contains(r#"<a href="index.html" class="">Home</a>"#));
        assert!(html.contains(r##"<a href="#" class="active">Docs</a>"##));
    }

    #[test]
    fn test_nav_defaults_and_theme() {
        let mut p = Params::new();
        p.insert("theme", "dark");
        p.insert("style", "minimal");
        p.insert("layout", "center");

        let html = nav_html(&p);
        assert!(html.contains("Product"));
        assert!(html.contains("nav-links-minimal"));
        assert!(html.contains("justify-content: center"));
        assert!(html.contains("--nav-text-color: #f7f7f7ff"));
    }
}
