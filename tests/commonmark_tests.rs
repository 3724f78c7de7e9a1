use std::fs;

use gfmark::{markdown_to_html, Options};
use pretty_assertions::assert_eq;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct Case {
    section: String,
    markdown: String,
    html: String,
    options: Vec<String>,
}

fn options_from_names(names: &[String]) -> Options {
    let mut options = Options::NONE;
    for name in names {
        options = options
            | match name.as_str() {
                "footnotes" => Options::FOOTNOTES,
                "tables" => Options::TABLES,
                "strikethrough" => Options::STRIKETHROUGH,
                "tasklist" => Options::TASKLIST,
                "autolinks" => Options::AUTOLINKS,
                "hard_breaks" => Options::HARD_BREAKS,
                "unsafe_html" => Options::UNSAFE_HTML,
                other => panic!("unknown option name in fixture: {}", other),
            };
    }
    options
}

#[test]
fn fixture_cases_render_expected_html() {
    let data = fs::read_to_string("tests/data/cases.json").expect("failed to read cases.json");
    let cases: Vec<Case> = serde_json::from_str(&data).expect("failed to parse cases.json");
    assert!(!cases.is_empty());

    for case in &cases {
        let result = markdown_to_html(&case.markdown, options_from_names(&case.options));
        assert_eq!(
            result, case.html,
            "section {:?}, input {:?}",
            case.section, case.markdown
        );
    }
}

#[test]
fn fixture_cases_survive_reparse_of_rendered_tree() {
    // Parsing is total: whatever the fixture inputs produce, feeding the
    // rendered HTML back through the parser must not panic
    let data = fs::read_to_string("tests/data/cases.json").expect("failed to read cases.json");
    let cases: Vec<Case> = serde_json::from_str(&data).expect("failed to parse cases.json");
    for case in &cases {
        let options = options_from_names(&case.options);
        let html = markdown_to_html(&case.markdown, options);
        let _ = gfmark::parse(&html, options, &[]);
    }
}
