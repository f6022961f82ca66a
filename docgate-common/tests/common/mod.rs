//! Shared fixtures for docgate-common integration tests.

#![allow(dead_code)]

use docgate_common::check::EvalContext;
use docgate_common::config::{ExpectedValues, GateConfig};
use docgate_common::testing::init_global_test_logging;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

#[ctor::ctor]
fn setup() {
    init_global_test_logging();
}

const CONF_PY: &str = r#"# Configuration file for the Sphinx documentation builder.
project = 'Demo'
author = 'Demo Authors'
release = '1.0.0'

extensions = [
    'sphinx.ext.autodoc',
    'sphinx.ext.napoleon',
    "sphinx.ext.viewcode",
    'sphinx.ext.intersphinx',
]

html_theme = 'sphinx_rtd_theme'
html_static_path = ['_static']
html_css_files = ['theme.css']
html_js_files = ['theme.js']
"#;

const API_RST: &str = "API Reference\n=============\n\nModules\n-------\n\nSubmodules\n----------\n\nSubpackages\n-----------\n";

const USAGE_RST: &str = "Usage\n=====\n\n.. code-block:: text\n\nRun it::\n\n    demo --help\n";

const LAYOUT_HTML: &str = r#"{% block doctype %}<!DOCTYPE html>{% endblock %}
{% block htmltag %}<html>{% endblock %}
{% block head %}<link rel="stylesheet" href="_static/theme.css">{% endblock %}
{% block body %}
{% block header %}<header></header>{% endblock %}
{% block content %}{% endblock %}
{% block footer %}<footer></footer>{% endblock %}
{% endblock %}
{% block scripts %}<script src="_static/theme.js"></script>{% endblock %}
"#;

const SEARCH_HTML: &str = r#"<!DOCTYPE html>
<html><body>
<form class="search" action="" method="get">
  <input type="text" name="q" value="" />
  <input type="submit" value="search" />
</form>
</body></html>"#;

/// What Sphinx itself writes: stemmed terms and `titleterms`.
pub const SPHINX_SEARCH_INDEX_JS: &str = concat!(
    r#"Search.setIndex({"alltitles": {"Usage": [[2, null]]}, "docnames": ["api", "index", "usage"], "#,
    r#""envversion": {"sphinx": 61}, "filenames": ["api.rst", "index.rst", "usage.rst"], "#,
    r#""indexentries": {}, "objects": {}, "objnames": {}, "objtypes": {}, "#,
    r#""terms": {"instal": 1, "usag": [1, 2], "api": 0, "exampl": 2, "configur": [1, 2], "contribut": 1}, "#,
    r#""titles": ["API Reference", "Demo", "Usage"], "titleterms": {"api": 0, "usag": 2}})"#
);

/// Exported JSON index with unstemmed terms.
pub const SEARCH_INDEX_JSON: &str = r#"{
  "docnames": ["api", "index", "usage"],
  "filenames": ["api.rst", "index.rst", "usage.rst"],
  "terms": {
    "installation": 1,
    "usage": [1, 2],
    "api": 0,
    "examples": 2,
    "configuration": [1, 2],
    "contributing": 1
  },
  "titles": ["API Reference", "Demo", "Usage"],
  "title_terms": {"api": 0, "usage": 2},
  "terms_index": {}
}"#;

/// A conforming Sphinx project with a matching build output tree.
pub struct SphinxSite {
    pub project: TempDir,
    pub output: TempDir,
}

impl SphinxSite {
    pub fn new() -> Self {
        let project = TempDir::new().expect("Failed to create project dir");
        let output = TempDir::new().expect("Failed to create output dir");
        let site = Self { project, output };
        let expected = ExpectedValues::default();

        site.write_project("README.md", "# Demo\n");
        site.write_project("LICENSE", "MIT License\n");
        site.write_project("CONTRIBUTING.md", "# Contributing\n");

        site.write_docs("conf.py", CONF_PY);
        let makefile: String = expected
            .makefile_targets
            .iter()
            .map(|t| format!(".PHONY: {t}\n{t}:\n\t@echo {t}\n"))
            .collect();
        site.write_docs("Makefile", &makefile);
        for doc in &expected.required_docs {
            let title = doc.trim_end_matches(".rst");
            site.write_docs(doc, &format!("{title}\n{}\n", "=".repeat(title.len())));
        }
        site.write_docs("api.rst", API_RST);
        site.write_docs("usage.rst", USAGE_RST);
        site.write_docs("_static/theme.css", "body { margin: 0; }\n");
        site.write_docs("_static/theme.js", "console.log('theme');\n");
        site.write_docs("_static/images/logo.png", "\u{89}PNG");
        site.write_docs("_static/fonts/body.woff2", "wOF2");
        site.write_docs("_templates/layout.html", LAYOUT_HTML);
        fs::create_dir_all(site.docs().join("locale/pot")).expect("Failed to create pot dir");

        let mut links = String::new();
        for lang in &expected.languages {
            site.write_docs(
                &format!("locale/{lang}/LC_MESSAGES/docs.po"),
                "msgid \"\"\nmsgstr \"\"\n",
            );
            site.write_output(&format!("locale/{lang}/LC_MESSAGES/docs.mo"), "\u{de}\u{12}");
            links.push_str(&format!("<a hreflang=\"{lang}\" href=\"/{lang}/\">{lang}</a>\n"));
        }

        site.write_output(
            "index.html",
            &format!(
                "<!DOCTYPE html><html><body><div class=\"language-switcher\">\n{links}</div></body></html>"
            ),
        );
        site.write_output("genindex.html", "<html><body>Index</body></html>");
        site.write_output("search.html", SEARCH_HTML);
        site.write_output("searchindex.js", SPHINX_SEARCH_INDEX_JS);
        site.write_output("searchindex.json", SEARCH_INDEX_JSON);
        site.write_output("_static/theme.css", "body { margin: 0; }\n");
        site.write_output("_static/theme.js", "console.log('theme');\n");
        site.write_output("_static/searchtools.js", "var Search = {};\n");
        site
    }

    pub fn root(&self) -> &Path {
        self.project.path()
    }

    pub fn docs(&self) -> PathBuf {
        self.root().join("docs")
    }

    pub fn output_dir(&self) -> &Path {
        self.output.path()
    }

    pub fn config(&self) -> GateConfig {
        GateConfig::for_project(self.root())
    }

    /// Context with the prepared output tree attached.
    pub fn context(&self) -> EvalContext {
        EvalContext::from_config(&self.config()).with_output_dir(self.output_dir())
    }

    pub fn write_project(&self, rel: &str, content: &str) {
        write(&self.root().join(rel), content);
    }

    pub fn write_docs(&self, rel: &str, content: &str) {
        write(&self.docs().join(rel), content);
    }

    pub fn write_output(&self, rel: &str, content: &str) {
        write(&self.output_dir().join(rel), content);
    }

    pub fn remove_docs(&self, rel: &str) {
        remove(&self.docs().join(rel));
    }

    pub fn remove_output(&self, rel: &str) {
        remove(&self.output_dir().join(rel));
    }

    /// Executable stand-in for `sphinx-build`.
    ///
    /// Builds copy the prepared output tree into the output directory;
    /// `-M clean <src> <dir>` empties `<dir>`. `prelude` runs first and may
    /// print diagnostics or exit early.
    #[cfg(unix)]
    pub fn fake_builder(&self, prelude: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let script = format!(
            r#"#!/bin/sh
{prelude}
if [ "$1" = "-M" ]; then
    rm -rf "$4"/*
    exit 0
fi
if [ "$1" = "-W" ]; then
    shift
fi
mkdir -p "$4" "$6"
cp -R "{template}/." "$6/"
"#,
            template = self.output_dir().display()
        );
        let path = self.root().join("bin/fake-sphinx-build");
        write(&path, &script);
        let mut perms = fs::metadata(&path).expect("script metadata").permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&path, perms).expect("Failed to chmod fake builder");
        path
    }
}

fn write(path: &Path, content: &str) {
    fs::create_dir_all(path.parent().expect("path has a parent")).expect("Failed to create dirs");
    fs::write(path, content).expect("Failed to write fixture file");
}

fn remove(path: &Path) {
    if path.is_dir() {
        fs::remove_dir_all(path).expect("Failed to remove fixture dir");
    } else {
        fs::remove_file(path).expect("Failed to remove fixture file");
    }
}
