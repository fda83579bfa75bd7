use blueprint_core::compiler::DEFAULT_PAGE_NAME;
use blueprint_core::workspace::tools::{dispatch, ToolRequest};
use blueprint_core::{
    CompileOptions, Compiler, Diagnostic, ProjectBuilder, Registry, Versioner, Workspace,
};
use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;

const LOGIN: &str = r#"page:login;
blueprint:auth/login+dashboard; theme=dark;
provider:google;
separator:text; content="OR CONTINUE WITH EMAIL";
form:email; fields=[email,password]; submit="Sign In";
flow:email_submit > dashboard;
flow:logout > login;
"#;

fn compile(source: &str) -> blueprint_core::CompiledPage {
    let registry = Registry::builtin();
    Compiler::new(&registry).compile(source).unwrap()
}

#[test]
fn test_blank_dark_page() {
    let page = compile("page:demo;\nblueprint:test/blank; theme=dark;\n");

    assert_eq!(page.page_name, "demo");
    assert!(page.html.starts_with("<!DOCTYPE html>"));
    assert!(page.html.contains(r#"<link rel="stylesheet" href="demo.css">"#));
    assert!(page.html.ends_with("</html>"));
    assert_eq!(
        page.css,
        "body {\n    margin: 0;\n    background: #101010ff;\n    min-height: 100vh;\n}\n"
    );
    assert!(page.js.is_empty());
    assert!(page.diagnostics.is_empty());
}

#[test]
fn test_login_body_order() {
    let page = compile(LOGIN);

    let card = page.html.find("Sign in to your account").unwrap();
    let google = page.html.find("google-login").unwrap();
    let separator = page.html.find("OR CONTINUE WITH EMAIL").unwrap();
    let form = page.html.find("<form").unwrap();
    let footer = page.html.find("Don't have an account?").unwrap();

    assert!(card < google);
    assert!(google < separator);
    assert!(separator < form);
    assert!(form < footer);
    assert!(!page.js.is_empty());
    assert!(page.diagnostics.is_empty(), "{:?}", page.diagnostics);
}

#[test]
fn test_compile_is_deterministic() {
    let first = compile(LOGIN);
    let second = compile(LOGIN);
    assert_eq!(first, second);
}

#[test]
fn test_unknown_lines_are_reported_not_fatal() {
    let page = compile("blueprint:test/blank;\ncarousel; slides=3;\n");

    assert_eq!(page.page_name, DEFAULT_PAGE_NAME);
    assert!(page.html.contains(r#"href="app.css""#));
    assert_eq!(
        page.diagnostics,
        vec![Diagnostic::Unresolved {
            line: 2,
            key: "carousel".into()
        }]
    );
}

#[test]
fn test_telemetry_script_is_spliced() {
    let registry = Registry::builtin();
    let compiler = Compiler::new(&registry).with_options(CompileOptions {
        telemetry: Some("http://localhost:3002/log-browser-error".into()),
        ..Default::default()
    });
    let page = compiler.compile("page:demo;\nblueprint:test/blank;\n").unwrap();

    let script = page.html.find("reportToBlueprint").unwrap();
    let body_close = page.html.find("</body>").unwrap();
    assert!(script < body_close);
    assert!(page.html.contains("const PAGE_NAME = 'demo.html';"));
}

#[test]
fn test_build_writes_only_non_empty_streams() {
    let src = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    std::fs::write(src.path().join("demo.txt"), "page:demo;\nblueprint:test/blank;\n").unwrap();
    std::fs::write(src.path().join("login.txt"), LOGIN).unwrap();

    let project = ProjectBuilder::new()
        .source_dir(src.path())
        .output_dir(out.path())
        .build()
        .unwrap();
    let report = project.build_all().unwrap();

    assert!(report.is_success());
    assert!(out.path().join("demo.html").exists());
    assert!(!out.path().join("demo.js").exists());
    assert!(out.path().join("login.js").exists());
}

#[test]
fn test_versioned_writes() {
    let base = TempDir::new().unwrap();
    let sources = base.path().join("blueprints");
    std::fs::create_dir_all(&sources).unwrap();
    std::fs::write(sources.join("demo.txt"), "page:demo;\nblueprint:test/blank;\n").unwrap();

    let versioner = Arc::new(Versioner::new(base.path()));
    let project = ProjectBuilder::new()
        .source_dir(&sources)
        .output_dir(base.path().join("sandbox"))
        .backup(versioner.clone())
        .build()
        .unwrap();

    let first = project.build_one("demo").unwrap();
    assert_eq!(first.write.backed_up.len(), 2);

    // identical output is already in the ledger
    let second = project.build_one("demo").unwrap();
    assert!(second.write.backed_up.is_empty());

    let ledger = std::fs::read_to_string(versioner.ledger_path()).unwrap();
    assert_eq!(ledger.lines().count(), 2);
    assert!(ledger.contains("sandbox/demo.html "));
}

#[test]
fn test_agent_session() {
    let base = TempDir::new().unwrap();
    std::fs::create_dir_all(base.path().join("blueprints")).unwrap();
    let project = ProjectBuilder::new()
        .source_dir(base.path().join("blueprints"))
        .output_dir(base.path().join("sandbox"))
        .build()
        .unwrap();
    let workspace = Workspace::new(base.path(), project);

    let call = |name: &str, arguments: serde_json::Value| {
        dispatch(
            &workspace,
            &ToolRequest {
                name: name.into(),
                arguments,
            },
        )
    };

    let index = call("read", json!({"target": "index"}));
    assert!(index.body().contains("provider:google"));

    let written = call("write", json!({"mode": "blueprint", "content": LOGIN}));
    assert!(!written.is_error, "{}", written.body());

    let generated = call("execute", json!({"command": "generate"}));
    assert!(!generated.is_error, "{}", generated.body());
    assert!(generated.body().contains("generated sandbox/login.html"));

    let edited = call(
        "write",
        json!({"mode": "segment", "filename": "login.html", "old_str": "Welcome Back", "new_str": "Hello Again"}),
    );
    assert!(!edited.is_error, "{}", edited.body());

    let preview = call("read", json!({"target": "generated"}));
    assert!(preview.body().starts_with("Generated login.html (first 800 chars):"));
    assert!(preview.body().contains("Hello Again"));

    let refused = call(
        "write",
        json!({"mode": "overwrite", "filename": "blueprint.txt", "content": "x"}),
    );
    assert!(refused.is_error);

    let escape = call("read", json!({"target": "file", "filename": "../outside.txt"}));
    assert!(escape.is_error);
}

#[test]
fn test_page_names_stay_inside_output_dir() {
    let base = TempDir::new().unwrap();
    let sources = base.path().join("blueprints");
    let out = base.path().join("sandbox");
    std::fs::create_dir_all(&sources).unwrap();

    let outside = base.path().join("outside");
    std::fs::write(sources.join("up.txt"), "page:../escaped;\nblueprint:test/blank;\n").unwrap();
    std::fs::write(
        sources.join("abs.txt"),
        format!("page:{};\nblueprint:test/blank;\n", outside.display()),
    )
    .unwrap();

    let project = ProjectBuilder::new()
        .source_dir(&sources)
        .output_dir(&out)
        .build()
        .unwrap();
    let report = project.build_all().unwrap();

    assert!(report.is_success());
    assert!(!base.path().join("escaped.html").exists());
    assert!(!base.path().join("outside.html").exists());
    assert!(out.join("app.html").exists());

    for unit in &report.units {
        let built = unit.result.as_ref().unwrap();
        assert_eq!(built.page.page_name, DEFAULT_PAGE_NAME);
        assert!(matches!(
            built.page.diagnostics.first(),
            Some(Diagnostic::InvalidPageName { line: 1, .. })
        ));
    }
}

#[test]
fn test_failing_pack_fragment_contributes_nothing() {
    let pack = TempDir::new().unwrap();
    std::fs::write(
        pack.path().join("registry.toml"),
        "[[components]]\nkey = \"banner\"\nparams = [\"text\"]\nhtml = \"banner.html.tera\"\njs = \"banner.js.tera\"\n",
    )
    .unwrap();
    std::fs::write(pack.path().join("banner.html.tera"), "<div class=\"banner\">{{ text }}</div>").unwrap();
    std::fs::write(pack.path().join("banner.js.tera"), "console.log({{ not_a_param }});\n").unwrap();

    let base = TempDir::new().unwrap();
    let sources = base.path().join("blueprints");
    let out = base.path().join("sandbox");
    std::fs::create_dir_all(&sources).unwrap();
    std::fs::write(
        sources.join("promo.txt"),
        "page:promo;\nblueprint:test/blank;\nbanner; text=\"Sale\";\n",
    )
    .unwrap();

    let project = ProjectBuilder::new()
        .source_dir(&sources)
        .output_dir(&out)
        .templates(pack.path())
        .build()
        .unwrap();
    let built = project.build_one("promo").unwrap();

    assert!(matches!(
        built.page.diagnostics.as_slice(),
        [Diagnostic::RenderFailed { line: 3, key, .. }] if key == "banner"
    ));
    assert!(built.page.html.contains("<div class=\"banner\">Sale</div>"));
    assert!(built.page.js.is_empty());
    assert!(out.join("promo.html").exists());
    assert!(!out.join("promo.js").exists());
}
