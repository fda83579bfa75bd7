use super::{is_dark, repeat_count};
use crate::params::Params;
use crate::registry::{names, ComponentTemplate, Fragment, RegistryBuilder};

pub fn register(builder: RegistryBuilder) -> RegistryBuilder {
    builder
        .component("features-grid", features_grid())
        .component("project-cards", project_cards())
}

const FEATURE_COLORS: [&str; 10] = [
    "blue", "orange", "green", "blue", "green", "green", "pink", "blue", "blue", "pink",
];

fn features_html(p: &Params) -> String {
    let count = repeat_count(p, 10);
    let text = p.items("text").unwrap_or_default();
    let font = p.text_or("font", "Inter");
    let color = p.text_or("color", if is_dark(p) { "#f7f7f7ff" } else { "#191919ff" });
    let spacing = p.text_or("spacing", "60px");

    let mut items = String::new();
    for i in 0..count {
        let label = match text.get(i) {
            Some(t) => t.to_string(),
            None => format!("Feature {}", i + 1),
        };
        let icon = FEATURE_COLORS[i % FEATURE_COLORS.len()];
        items.push_str(&format!(
            r#"
        <div class="feature-item">
          <div class="feature-icon {icon}"></div>
          <span>{label}</span>
        </div>"#
        ));
    }

    format!(
        r#"
<div class="features-grid" style="font-family: '{font}', sans-serif; color: {color}; margin-top: {spacing}; margin-bottom: {spacing};">
  {items}
</div>"#
    )
}

fn features_grid() -> ComponentTemplate {
    ComponentTemplate {
        summary: "Two-column grid of features with colored dots".into(),
        params: names(&["count", "text", "font", "theme", "color", "spacing"]),
        html: Fragment::computed(features_html),
        css: Fragment::literal(FEATURES_CSS),
        js: Fragment::empty(),
    }
}

const FEATURES_CSS: &str = r#"
.features-grid {
  display: grid;
  grid-template-columns: 1fr 1fr;
  gap: 30px;
  margin: 30px auto 0;
  max-width: 600px;
}

.feature-item {
  display: flex;
  align-items: center;
  gap: 15px;
  font-size: 16px;
}

.feature-icon {
  width: 36px;
  height: 36px;
  border-radius: 50%;
  flex-shrink: 0;
}

.feature-icon.blue { background: #007AFF; }
.feature-icon.green { background: #34C759; }
.feature-icon.orange { background: #FF9500; }
.feature-icon.pink { background: #FF2D92; }
"#;

const DEFAULT_TITLES: [&str; 3] = ["Project Alpha", "Project Beta", "Project Gamma"];
const DEFAULT_DESCRIPTIONS: [&str; 3] = [
    "A comprehensive solution for modern businesses.",
    "Advanced analytics with real-time insights.",
    "Next-generation platform for scalable growth.",
];
const DEFAULT_TECH: [&str; 3] = [
    "React • Node.js • MongoDB",
    "Python • FastAPI • PostgreSQL",
    "Next.js • TypeScript • Tailwind",
];
const DEFAULT_STATUS: [&str; 3] = ["Live", "Beta", "Coming Soon"];

fn status_class(status: &str) -> String {
    status
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
}

fn project_cards_html(p: &Params) -> String {
    let count = repeat_count(p, 3);
    let titles = p.items("titles").unwrap_or_else(|| DEFAULT_TITLES.to_vec());
    let descriptions = p
        .items("descriptions")
        .unwrap_or_else(|| DEFAULT_DESCRIPTIONS.to_vec());
    let tech = p.items("tech").unwrap_or_else(|| DEFAULT_TECH.to_vec());
    let statuses = p.items("status").unwrap_or_else(|| DEFAULT_STATUS.to_vec());
    let spacing = p.text_or("spacing", "60px");
    let theme = if is_dark(p) { "dark" } else { "light" };
    let (title_color, desc_color, secondary_color) = if is_dark(p) {
        ("#f7f7f7ff", "#e5e5e5", "#f7f7f7ff")
    } else {
        ("#191919ff", "#666666", "#191919ff")
    };

    let mut cards = String::new();
    for i in 0..count {
        let status = statuses.get(i).copied().unwrap_or("Live");
        let title = match titles.get(i) {
            Some(t) => t.to_string(),
            None => format!("Project {}", i + 1),
        };
        let description = descriptions
            .get(i)
            .copied()
            .unwrap_or("Project description here.");
        let stack = tech.get(i).copied().unwrap_or("Tech • Stack • Here");
        cards.push_str(&format!(
            r##"
    <div class="project-card" data-theme="{theme}">
      <div class="project-status {class}">{status}</div>
      <h3 style="color: {title_color};">{title}</h3>
      <p style="color: {desc_color};">{description}</p>
      <div class="tech-stack">{stack}</div>
      <div class="project-links">
        <a href="#" class="btn-primary">View Project</a>
        <a href="#" class="btn-secondary" style="color: {secondary_color};">GitHub</a>
      </div>
    </div>"##,
            class = status_class(status)
        ));
    }

    format!(
        r#"
<div class="projects-section" style="margin-top: {spacing}; margin-bottom: {spacing};">
  <div class="projects-grid" data-theme="{theme}">
    {cards}
  </div>
</div>"#
    )
}

fn project_cards() -> ComponentTemplate {
    ComponentTemplate {
        summary: "Grid of project cards with status badges and links".into(),
        params: names(&[
            "count", "titles", "descriptions", "tech", "status", "spacing", "theme",
        ]),
        html: Fragment::computed(project_cards_html),
        css: Fragment::literal(PROJECT_CARDS_CSS),
        js: Fragment::empty(),
    }
}

const PROJECT_CARDS_CSS: &str = r#"
.projects-section {
  max-width: 1200px;
  margin: 0 auto;
  padding: 0 20px;
}

.projects-grid {
  display: grid;
  grid-template-columns: repeat(auto-fit, minmax(350px, 1fr));
  gap: 30px;
  margin-top: 40px;
}

.projects-grid[data-theme="dark"] .project-card {
  background: rgba(255, 255, 255, 0.05);
  border: 1px solid rgba(255, 255, 255, 0.1);
}

.projects-grid[data-theme="dark"] .project-card:hover {
  border-color: rgba(255, 255, 255, 0.2);
  background: rgba(255, 255, 255, 0.08);
}

.projects-grid[data-theme="dark"] .tech-stack {
  border-top: 1px solid rgba(255, 255, 255, 0.1);
  border-bottom: 1px solid rgba(255, 255, 255, 0.1);
}

.projects-grid[data-theme="dark"] .btn-secondary {
  border: 1px solid rgba(255, 255, 255, 0.2);
}

.projects-grid[data-theme="light"] .project-card {
  background: rgba(0, 0, 0, 0.03);
  border: 1px solid rgba(0, 0, 0, 0.15);
}

.projects-grid[data-theme="light"] .project-card:hover {
  border-color: rgba(0, 0, 0, 0.2);
  background: rgba(0, 0, 0, 0.04);
}

.projects-grid[data-theme="light"] .tech-stack {
  border-top: 1px solid rgba(0, 0, 0, 0.1);
  border-bottom: 1px solid rgba(0, 0, 0, 0.1);
}

.projects-grid[data-theme="light"] .btn-secondary {
  border: 1px solid rgba(0, 0, 0, 0.2);
}

.project-card {
  border-radius: 16px;
  padding: 30px;
  position: relative;
  transition: all 0.3s ease;
  backdrop-filter: blur(10px);
}

.project-card:hover {
  transform: translateY(-5px);
}

.project-status {
  position: absolute;
  top: 20px;
  right: 20px;
  padding: 4px 12px;
  border-radius: 20px;
  font-size: 12px;
  font-weight: 600;
  font-family: 'Inter', sans-serif;
}

.project-status.live {
  background: rgba(52, 199, 89, 0.2);
  color: #34C759;
  border: 1px solid rgba(52, 199, 89, 0.3);
}

.project-status.beta {
  background: rgba(255, 149, 0, 0.2);
  color: #FF9500;
  border: 1px solid rgba(255, 149, 0, 0.3);
}

.project-status.coming-soon {
  background: rgba(0, 122, 255, 0.2);
  color: #007AFF;
  border: 1px solid rgba(0, 122, 255, 0.3);
}

.project-card h3 {
  font-family: 'Instrument Serif', serif;
  font-size: 24px;
  font-weight: 600;
  margin: 0 0 16px 0;
  line-height: 1.3;
}

.project-card p {
  font-family: 'Inter', sans-serif;
  font-size: 15px;
  line-height: 1.5;
  margin: 0 0 20px 0;
}

.tech-stack {
  color: #007AFF;
  font-family: 'Inter', sans-serif;
  font-size: 13px;
  font-weight: 500;
  margin-bottom: 24px;
  padding: 8px 0;
}

.project-links {
  display: flex;
  gap: 12px;
}

.btn-primary, .btn-secondary {
  padding: 10px 20px;
  border-radius: 8px;
  text-decoration: none;
  font-family: 'Inter', sans-serif;
  font-size: 14px;
  font-weight: 500;
  transition: all 0.3s ease;
  text-align: center;
  flex: 1;
}

.btn-primary {
  background: #007AFF;
  color: white;
  border: 1px solid #007AFF;
}

.btn-primary:hover {
  background: #0056CC;
  border-color: #0056CC;
}

.btn-secondary {
  background: transparent;
}
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_class() {
        assert_eq!(status_class("Coming Soon"), "coming-soon");
        assert_eq!(status_class("Live"), "live");
    }

    #[test]
    fn test_features_grid_labels() {
        let mut p = Params::new();
        p.insert("count", "3");
        p.insert("text", vec!["Fast".to_string(), "Small".to_string()]);

        let html = features_html(&p);
        assert_eq!(html.matches("class=\"feature-item\"").count(), 3);
        assert!(html.contains("<span>Fast</span>"));
        assert!(html.contains("<span>Feature 3</span>"));
        assert!(html.contains("feature-icon orange"));
    }

    #[test]
    fn test_project_cards_fall_back_per_index() {
        let mut p = Params::new();
        p.insert("count", "4");
        p.insert("theme", "dark");

        let html = project_cards_html(&p);
        assert_eq!(html.matches("class=\"project-card\"").count(), 4);
        assert!(html.contains(">Project 4</h3>"));
        assert!(html.contains("project-status coming-soon"));
        assert!(html.contains(r#"data-theme="dark""#));
    }
}
