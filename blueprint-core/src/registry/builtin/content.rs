use super::{is_dark, repeat_count};
use crate::params::Params;
use crate::registry::{names, ComponentTemplate, Fragment, RegistryBuilder};

pub fn register(builder: RegistryBuilder) -> RegistryBuilder {
    builder.component("hero", hero()).component("steps", steps())
}

fn hero_html(p: &Params) -> String {
    let title = p.text_or("title", "Lorem ipsum dolor sit amet.");
    let description = p.text_or(
        "description",
        "Nulla vitae odio quis sem vehicula malesuada et a est. Suspendisse fringilla turpis et eros semper, id elementum quam porttitor.",
    );
    let spacing = p.text_or("spacing", "60px");
    let title_font = p.text_or("font", "Instrument Serif");
    let description_font = p.text_or("descriptionFont", "Inter");
    let size = p.text_or("size", "3rem");
    let default_color = if is_dark(p) { "#f7f7f7ff" } else { "#191919ff" };
    let color = p.text_or("color", default_color);
    let center_class = if p.flag("centered").unwrap_or(true) {
        "centered-hero"
    } else {
        ""
    };

    format!(
        r#"
<div class="hero-section {center_class}" style="margin-top: {spacing}; margin-bottom: {spacing};">
  <h1 style="color: {color}; font-family: '{title_font}', serif; font-size: {size};">{title}</h1>
  <p style="color: {color}; font-family: '{description_font}', sans-serif;">{description}</p>
</div>"#
    )
}

fn hero() -> ComponentTemplate {
    ComponentTemplate {
        summary: "Centered hero section with a title and description".into(),
        params: names(&[
            "title", "description", "spacing", "theme", "font", "descriptionFont", "color",
            "centered", "size",
        ]),
        html: Fragment::computed(hero_html),
        css: Fragment::literal(HERO_CSS),
        js: Fragment::empty(),
    }
}

const HERO_CSS: &str = r#"
.hero-section {
  text-align: center;
  max-width: 800px;
  width: 90%;
  margin: 0 auto;
}

.hero-section.centered-hero {
  display: flex;
  flex-direction: column;
  justify-content: center;
  align-items: center;
}

.hero-section h1 {
  font-weight: 700;
  margin: 0 0 1rem 0;
  line-height: 1.2;
}

.hero-section p {
  font-size: 0.9rem;
  line-height: 1.2;
  max-width: 600px;
  margin: 0 auto;
}
"#;

const STEP_TITLES: [&str; 6] = [
    "Streamline Your Workflow Process",
    "Implement Advanced Security Protocols",
    "Scale Your Operations Efficiently",
    "Optimize Performance and Analytics",
    "Deploy With Enterprise Confidence",
    "Finalize Your Business Strategy",
];

const STEP_DESCRIPTIONS: [&str; 6] = [
    "Automate repetitive tasks and eliminate bottlenecks with our intelligent workflow management system designed for modern businesses.",
    "Protect your data with military-grade encryption and multi-factor authentication while maintaining seamless user experience.",
    "Handle increased demand effortlessly with our cloud-native infrastructure that grows with your business needs.",
    "Make data-driven decisions with real-time insights and comprehensive reporting tools that matter to your bottom line.",
    "Enterprise-ready deployment options with 99.9% uptime guarantee, dedicated support, and custom integration capabilities.",
    "Execute your strategic vision with confidence using our comprehensive business intelligence and project management suite.",
];

fn steps_html(p: &Params) -> String {
    let count = repeat_count(p, 5);
    let titles = p.items("titles").unwrap_or_default();
    let descriptions = p.items("descriptions").unwrap_or_default();
    let font = p.text_or("font", "Inter");
    let spacing = p.text_or("spacing", "60px");

    let (title_default, description_default, line_default) = if is_dark(p) {
        ("#f7f7f7ff", "#e5e5e5", "#2a2a2aff")
    } else {
        ("#191919ff", "#191919ff", "#e5e5e5")
    };
    let title_color = p.text_or("titleColor", title_default);
    let description_color = p.text_or("descriptionColor", description_default);
    let line_color = p.text_or("lineColor", line_default);

    let mut items = String::new();
    for i in 0..count {
        let title = titles
            .get(i)
            .copied()
            .unwrap_or(STEP_TITLES[i % STEP_TITLES.len()]);
        let description = descriptions
            .get(i)
            .copied()
            .unwrap_or(STEP_DESCRIPTIONS[i % STEP_DESCRIPTIONS.len()]);
        items.push_str(&format!(
            r#"
       <div class="step-item">
         <div class="step-number">{number}</div>
         <div class="step-content">
           <h4 style="color: {title_color};">{title}</h4>
           <p style="color: {description_color};">{description}</p>
         </div>
       </div>"#,
            number = i + 1
        ));
    }

    format!(
        r#"
<div class="process-steps" style="font-family: '{font}', sans-serif; --line-color: {line_color}; margin-top: {spacing}; margin-bottom: {spacing};">
 {items}
</div>"#
    )
}

fn steps() -> ComponentTemplate {
    ComponentTemplate {
        summary: "Numbered vertical process steps joined by a dashed line".into(),
        params: names(&[
            "count", "titles", "descriptions", "font", "theme", "spacing", "titleColor",
            "descriptionColor", "lineColor",
        ]),
        html: Fragment::computed(steps_html),
        css: Fragment::literal(STEPS_CSS),
        js: Fragment::empty(),
    }
}

const STEPS_CSS: &str = r#"
.process-steps {
 position: relative;
 max-width: 700px;
 margin: 0 auto;
 text-align: left;
}

.process-steps::before {
 content: '';
 position: absolute;
 left: 18px;
 top: 35px;
 bottom: 35px;
 width: 1px;
 background: repeating-linear-gradient(
   to bottom,
   var(--line-color) 0px,
   var(--line-color) 4px,
   transparent 4px,
   transparent 8px
 );
 z-index: 0;
}

.step-item {
 display: flex;
 gap: 23px;
 margin-bottom: 40px;
 position: relative;
 z-index: 1;
}

.step-item:last-child {
 margin-bottom: 0;
}

.step-number {
 width: 37px;
 height: 37px;
 background: #007AFF;
 border-radius: 50%;
 color: #f7f7f7ff;
 display: flex;
 align-items: center;
 justify-content: center;
 font-weight: 600;
 font-size: 14px;
 flex-shrink: 0;
}

.step-content h4 {
 font-size: 18px;
 font-weight: 600;
 margin: 0 0 8px 0;
}

.step-content p {
 font-size: 15px;
 line-height: 1.4;
 margin: 0;
 text-align: left;
}
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hero_overrides() {
        let mut p = Params::new();
        p.insert("title", "Ship faster");
        p.insert("centered", "false");
        p.insert("theme", "dark");

        let html = hero_html(&p);
        assert!(html.contains(">Ship faster</h1>"));
        assert!(!html.contains("centered-hero"));
        assert!(html.contains("color: #f7f7f7ff"));
    }

    #[test]
    fn test_steps_count_and_custom_titles() {
        let mut p = Params::new();
        p.insert("count", "2");
        p.insert("titles", vec!["Plan".to_string()]);

        let html = steps_html(&p);
        assert_eq!(html.matches("class=\"step-item\"").count(), 2);
        assert!(html.contains(">Plan</h4>"));
        assert!(html.contains(STEP_TITLES[1]));
    }
}
