//! The default checklist for a Sphinx documentation tree.
//!
//! Groups mirror the areas a Sphinx site is usually reviewed for: `api`,
//! `build`, `configuration`, `content`, `i18n`, `search` and `static`.
//! Expected values (extensions, languages, search terms, ...) come from
//! [`GateConfig`].

use crate::check::{
    Check, ChildSelector, Checklist, EntryKind, Expectation, Occupancy, PathRef, PathSpec,
    Pattern, ProcessSpec, Structure,
};
use crate::config::GateConfig;
use crate::rst::RstRule;

/// Reason every check is skipped when the gate variable is not set.
pub const GATE_SKIP_REASON: &str = "Set TEST_DOCS=1 to run documentation checks";

/// Section headings `api.rst` must contain (regular expressions).
pub const API_SECTIONS: &[&str] = &["API Reference", "Modules", "Submodules", "Subpackages"];

/// Assignments `conf.py` must contain.
pub const REQUIRED_SETTINGS: &[&str] = &[
    "project",
    "author",
    "release",
    "extensions",
    "html_theme",
    "html_static_path",
    "html_css_files",
    "html_js_files",
];

/// Files at the project root that must exist and be non-empty.
pub const ROOT_FILES: &[&str] = &["README.md", "LICENSE", "CONTRIBUTING.md"];

/// Jinja blocks the layout template must define.
pub const LAYOUT_BLOCKS: &[&str] = &[
    "doctype", "htmltag", "head", "body", "header", "content", "footer", "scripts",
];

pub const IMAGE_PATTERNS: &[&str] = &["*.png", "*.jpg", "*.jpeg", "*.gif", "*.svg", "*.ico"];
pub const FONT_PATTERNS: &[&str] = &["*.woff", "*.woff2", "*.ttf", "*.eot", "*.otf"];

/// Diagnostic words that fail an otherwise successful build (case-insensitive).
pub const FORBIDDEN_DIAGNOSTICS: &[&str] =
    &["warning", "error", "failed", "traceback", "exception"];

/// Files a successful HTML build must produce.
pub const HTML_OUTPUT_FILES: &[&str] = &[
    "index.html",
    "_static/theme.css",
    "_static/theme.js",
    "genindex.html",
    "search.html",
    "searchindex.js",
];

/// Builders exercised by the builder matrix, and whether they need extra tooling.
pub const BUILDERS: &[(&str, bool)] = &[
    ("html", false),
    ("latex", true),
    ("man", true),
    ("texinfo", true),
];

/// Candidate locations of the JSON search index, in lookup order.
///
/// `searchindex.js` is not a candidate: it stores stemmed terms under
/// `titleterms`-style keys, unlike the JSON export.
pub const SEARCH_INDEX_FILES: &[&str] = &["_static/searchindex.json", "searchindex.json"];

const CHANGELOG: &str = "changelog.rst";
const BUILD_DIR: &str = "_build";
const LOCALE_DIR: &str = "locale";
const POT_DIR: &str = "pot";

/// Every check for the configured project.
pub fn sphinx_checklist(config: &GateConfig) -> Checklist {
    let mut checklist = Checklist::new();
    checklist.extend(api_checks());
    checklist.extend(build_checks(&config.build.program.value));
    checklist.extend(configuration_checks(config));
    checklist.extend(content_checks(config));
    checklist.extend(i18n_checks(&config.languages.value));
    checklist.extend(search_checks(config));
    checklist.extend(static_checks());
    checklist
}

/// Lowercase id segment: runs of anything but `[a-z0-9._]` become `_`.
fn slug(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_alphanumeric() || c == '.' || c == '_' {
            out.push(c);
        } else if !out.ends_with('_') {
            out.push('_');
        }
    }
    out.trim_matches('_').to_string()
}

fn existence(target: PathSpec, kind: EntryKind, occupancy: Occupancy) -> Expectation {
    Expectation::Existence {
        target,
        kind,
        occupancy,
    }
}

pub fn api_checks() -> Vec<Check> {
    let mut checks = vec![Check::new(
        "api.file",
        "api.rst exists and is non-empty",
        Expectation::non_empty_file(PathRef::docs("api.rst")),
    )];
    for section in API_SECTIONS {
        checks.push(Check::new(
            format!("api.section.{}", slug(section)),
            format!("api.rst has a '{section}' section"),
            Expectation::contains(PathRef::docs("api.rst"), Pattern::regex(*section)),
        )
        .when_present());
    }
    checks
}

/// `<program> [-W] -b <builder> -d <scratch>/doctrees <docs> <scratch>/<builder>`.
pub fn builder_invocation(program: &str, builder: &str, warnings_as_errors: bool) -> ProcessSpec {
    let mut spec = ProcessSpec::new(program);
    if warnings_as_errors {
        spec = spec.arg("-W");
    }
    spec.arg("-b")
        .arg(builder)
        .arg("-d")
        .scratch("doctrees")
        .docs_dir()
        .scratch(builder)
}

pub fn build_checks(program: &str) -> Vec<Check> {
    let html = builder_invocation(program, "html", false);
    let forbidden: Vec<Pattern> = FORBIDDEN_DIAGNOSTICS
        .iter()
        .map(|w| Pattern::regex(*w))
        .collect();

    let mut checks = vec![
        Check::new(
            "build.html",
            "HTML build succeeds without diagnostics",
            Expectation::ExternalProcessSuccess {
                steps: vec![html.clone()],
                forbidden,
                then: vec![Expectation::exists(PathRef::scratch("html/index.html"))],
            },
        ),
        Check::new(
            "build.output",
            "HTML build produces the expected files",
            Expectation::ExternalProcessSuccess {
                steps: vec![html.clone()],
                forbidden: Vec::new(),
                then: HTML_OUTPUT_FILES
                    .iter()
                    .map(|f| Expectation::exists(PathRef::scratch(format!("html/{f}"))))
                    .collect(),
            },
        ),
        Check::new(
            "build.warnings_as_errors",
            "HTML build succeeds with warnings treated as errors",
            Expectation::ExternalProcessSuccess {
                steps: vec![builder_invocation(program, "html", true)],
                forbidden: Vec::new(),
                then: Vec::new(),
            },
        ),
    ];

    for (builder, needs_extras) in BUILDERS {
        let check = Check::new(
            format!("build.builder.{builder}"),
            format!("{builder} builder produces output"),
            Expectation::ExternalProcessSuccess {
                steps: vec![builder_invocation(program, builder, false)],
                forbidden: Vec::new(),
                then: vec![existence(
                    PathSpec::single(PathRef::scratch(*builder)),
                    EntryKind::Dir,
                    Occupancy::NonEmpty,
                )],
            },
        );
        checks.push(if *needs_extras {
            check.disabled(format!("{builder} builder requires additional dependencies"))
        } else {
            check
        });
    }

    checks.push(Check::new(
        "build.clean",
        "clean empties the build directory",
        Expectation::ExternalProcessSuccess {
            steps: vec![
                html,
                ProcessSpec::new(program)
                    .arg("-M")
                    .arg("clean")
                    .docs_dir()
                    .scratch(""),
            ],
            forbidden: Vec::new(),
            then: vec![existence(
                PathSpec::single(PathRef::scratch("")),
                EntryKind::Dir,
                Occupancy::Empty,
            )],
        },
    ));
    checks
}

pub fn configuration_checks(config: &GateConfig) -> Vec<Check> {
    let conf = || PathRef::docs("conf.py");
    let mut checks = vec![Check::new(
        "configuration.conf_py",
        "conf.py exists",
        Expectation::exists(conf()),
    )];

    for setting in REQUIRED_SETTINGS {
        checks.push(Check::new(
            format!("configuration.setting.{setting}"),
            format!("conf.py sets {setting}"),
            Expectation::contains(conf(), Pattern::regex(format!(r"{setting}\s*="))),
        )
        .when_present());
    }

    for extension in &config.extensions.value {
        checks.push(Check::new(
            format!("configuration.extension.{}", slug(extension)),
            format!("extension {extension} is enabled"),
            Expectation::structure(
                PathSpec::single(conf()),
                Structure::ListItem {
                    name: "extensions".to_string(),
                    item: extension.clone(),
                },
            ),
        )
        .when_present());
    }

    let theme = &config.expected.theme;
    checks.extend([
        Check::new(
            "configuration.theme",
            format!("html_theme is {theme}"),
            Expectation::contains(conf(), Pattern::quoted_assignment("html_theme", theme)),
        )
        .when_present(),
        Check::new(
            "configuration.static_path",
            "html_static_path is ['_static']",
            Expectation::contains(
                conf(),
                Pattern::AnyLiteral(vec![
                    "html_static_path = ['_static']".to_string(),
                    "html_static_path = [\"_static\"]".to_string(),
                ]),
            ),
        )
        .when_present(),
        Check::new(
            "configuration.theme_css",
            "theme.css is included",
            Expectation::contains(conf(), Pattern::quoted("theme.css")),
        )
        .when_present(),
        Check::new(
            "configuration.theme_js",
            "theme.js is included",
            Expectation::contains(conf(), Pattern::quoted("theme.js")),
        )
        .when_present(),
        Check::new(
            "configuration.makefile",
            "Makefile exists",
            Expectation::exists(PathRef::docs("Makefile")),
        ),
    ]);

    for target in &config.expected.makefile_targets {
        checks.push(Check::new(
            format!("configuration.makefile.target.{}", slug(target)),
            format!("Makefile declares {target}"),
            Expectation::contains(
                PathRef::docs("Makefile"),
                Pattern::literal(format!(".PHONY: {target}")),
            ),
        )
        .when_present());
    }
    checks
}

pub fn content_checks(config: &GateConfig) -> Vec<Check> {
    let mut checks = Vec::new();
    for file in ROOT_FILES {
        checks.push(Check::new(
            format!("content.root.{}", slug(file)),
            format!("{file} exists and is non-empty"),
            Expectation::non_empty_file(PathRef::project(*file)),
        ));
    }
    for file in &config.expected.required_docs {
        checks.push(Check::new(
            format!("content.docs.{}", slug(file)),
            format!("{file} exists and is non-empty"),
            Expectation::non_empty_file(PathRef::docs(file)),
        ));
    }

    let rules = [
        (
            "line_length",
            RstRule::MaxLineLength {
                max: config.expected.max_line_length,
                exempt_files: vec![CHANGELOG.to_string()],
            },
        ),
        ("literal_block_spacing", RstRule::LiteralBlockSpacing),
        ("literal_block_highlighting", RstRule::LiteralBlockHighlighting),
    ];
    for (name, rule) in rules {
        checks.push(Check::new(
            format!("content.rst.{name}"),
            rule.describe(),
            Expectation::ContentConvention {
                files: PathSpec::glob(PathRef::docs(""), &["**/*.rst"]),
                exclude_dirs: vec![BUILD_DIR.to_string()],
                rule,
            },
        ));
    }
    checks
}

pub fn i18n_checks(languages: &[String]) -> Vec<Check> {
    let locale = || PathRef::docs(LOCALE_DIR);
    let mut checks = vec![Check::new(
        "i18n.locale",
        "locale directory exists",
        Expectation::dir(locale()),
    )];

    for lang in languages {
        checks.push(
            Check::new(
                format!("i18n.locale.{}", slug(lang)),
                format!("locale/{lang} exists"),
                existence(PathSpec::within(locale(), lang), EntryKind::Dir, Occupancy::Any),
            )
            .optional(),
        );
    }

    checks.extend([
        Check::new(
            "i18n.po_files",
            "every language has a non-empty docs.po",
            existence(
                PathSpec::each_subdir([locale()], &[POT_DIR], "LC_MESSAGES/docs.po"),
                EntryKind::File,
                Occupancy::NonEmpty,
            ),
        )
        .optional(),
        Check::new(
            "i18n.mo_files",
            "every built language has a non-empty docs.mo",
            existence(
                PathSpec::each_subdir(
                    [PathRef::output("_sources/locale"), PathRef::output(LOCALE_DIR)],
                    &[POT_DIR],
                    "LC_MESSAGES/docs.mo",
                ),
                EntryKind::File,
                Occupancy::NonEmpty,
            ),
        )
        .optional(),
        Check::new(
            "i18n.switcher",
            "index page has a language switcher",
            Expectation::structure(
                PathSpec::single(PathRef::output("index.html")),
                language_switcher(None),
            ),
        )
        .when_present(),
    ]);

    for lang in languages {
        checks.push(
            Check::new(
                format!("i18n.switcher.{}", slug(lang)),
                format!("language switcher links to {lang}"),
                Expectation::structure(
                    PathSpec::single(PathRef::output("index.html")),
                    language_switcher(Some(lang)),
                ),
            )
            .optional(),
        );
    }
    checks
}

fn language_switcher(lang: Option<&str>) -> Structure {
    Structure::HtmlElement {
        tag: "div".to_string(),
        class: Some("language-switcher".to_string()),
        child: lang.map(|lang| ChildSelector {
            tag: "a".to_string(),
            attr: "hreflang".to_string(),
            value: lang.to_string(),
        }),
    }
}

pub fn search_checks(config: &GateConfig) -> Vec<Check> {
    let index = || PathSpec::first_of(SEARCH_INDEX_FILES.iter().map(|f| PathRef::output(*f)));
    let mut checks = vec![
        Check::new(
            "search.page",
            "search page exists",
            Expectation::exists(PathRef::output("search.html")),
        ),
        Check::new(
            "search.form",
            "search page has a query form",
            Expectation::structure(
                PathSpec::single(PathRef::output("search.html")),
                Structure::HtmlElement {
                    tag: "form".to_string(),
                    class: Some("search".to_string()),
                    child: Some(ChildSelector {
                        tag: "input".to_string(),
                        attr: "name".to_string(),
                        value: "q".to_string(),
                    }),
                },
            ),
        )
        .when_present(),
        Check::new(
            "search.script",
            "search script is included",
            existence(
                PathSpec::first_of([
                    PathRef::output("_static/searchtools.js"),
                    PathRef::output("searchindex.js"),
                ]),
                EntryKind::Any,
                Occupancy::Any,
            ),
        ),
    ];

    for key in &config.expected.search_index_keys {
        checks.push(
            Check::new(
                format!("search.index.key.{}", slug(key)),
                format!("search index has '{key}'"),
                Expectation::structure(index(), Structure::JsonKey { key: key.clone() }),
            )
            .optional(),
        );
    }
    for term in &config.expected.search_terms {
        checks.push(
            Check::new(
                format!("search.index.term.{}", slug(term)),
                format!("search index has a term like '{term}'"),
                Expectation::structure(
                    index(),
                    Structure::JsonTermLike {
                        key: "terms".to_string(),
                        needle: term.clone(),
                    },
                ),
            )
            .optional(),
        );
    }
    checks
}

pub fn static_checks() -> Vec<Check> {
    let layout = || PathRef::docs("_templates/layout.html");
    let mut checks = vec![
        Check::new(
            "static.dir",
            "_static is a directory",
            Expectation::dir(PathRef::docs("_static")),
        ),
        Check::new(
            "static.theme_css",
            "theme.css is a non-empty file",
            Expectation::non_empty_file(PathRef::docs("_static/theme.css")),
        ),
        Check::new(
            "static.theme_js",
            "theme.js is a non-empty file",
            Expectation::non_empty_file(PathRef::docs("_static/theme.js")),
        ),
        Check::new(
            "static.images",
            "images are non-empty files",
            existence(
                PathSpec::glob(PathRef::docs("_static/images"), IMAGE_PATTERNS),
                EntryKind::File,
                Occupancy::NonEmpty,
            ),
        )
        .optional(),
        Check::new(
            "static.fonts",
            "fonts are non-empty files",
            existence(
                PathSpec::glob(PathRef::docs("_static/fonts"), FONT_PATTERNS),
                EntryKind::File,
                Occupancy::NonEmpty,
            ),
        )
        .optional(),
        Check::new(
            "static.templates",
            "_templates is a directory",
            Expectation::dir(PathRef::docs("_templates")),
        ),
        Check::new(
            "static.layout",
            "layout.html is a non-empty file",
            Expectation::non_empty_file(layout()),
        ),
        Check::new(
            "static.layout.theme_css",
            "layout includes theme.css",
            Expectation::contains(layout(), Pattern::literal("theme.css")),
        )
        .when_present(),
        Check::new(
            "static.layout.theme_js",
            "layout includes theme.js",
            Expectation::contains(layout(), Pattern::literal("theme.js")),
        )
        .when_present(),
    ];
    for block in LAYOUT_BLOCKS {
        checks.push(Check::new(
            format!("static.layout.block.{block}"),
            format!("layout defines block {block}"),
            Expectation::contains(layout(), Pattern::literal(format!("{{% block {block} %}}"))),
        )
        .when_present());
    }
    checks
}
