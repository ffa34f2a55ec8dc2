use questionnaire_model::Template;
use questionnaire_parser::{codemap_diagnostics, parse_report, Diagnostics};

use std::path::PathBuf;
use std::process::exit;

use structopt::StructOpt;

#[derive(Debug, StructOpt)]
enum Cli {
    /// Parse templates and report every warning and error.
    Check { xml: Vec<PathBuf> },
    /// Parse one template and print the resulting object model.
    Dump { xml: PathBuf },
}

fn main() {
    match Cli::from_args() {
        Cli::Check { xml } => check(xml),
        Cli::Dump { xml } => dump(xml),
    }
}

fn check(xmls: Vec<PathBuf>) {
    let mut invalid = false;
    for xml in xmls {
        let doc = match std::fs::read_to_string(&xml) {
            Ok(doc) => doc,
            Err(err) => {
                eprintln!("{}: {err}", xml.display());
                exit(1);
            }
        };
        eprintln!("Checking {xml:?}");
        let (template, mut diags) = parse_report(doc.as_bytes());
        lint_duplicate_ids(&template, &mut diags);
        if diags.has_errors() {
            invalid = true;
        }
        let (map, rendered) =
            codemap_diagnostics(xml.to_string_lossy().to_string(), doc, &diags);
        if !rendered.is_empty() {
            let mut emitter = codemap_diagnostic::Emitter::stderr(
                codemap_diagnostic::ColorConfig::Auto,
                Some(&map),
            );
            emitter.emit(&rendered[..]);
        }
    }
    if invalid {
        exit(2);
    }
}

fn dump(xml: PathBuf) {
    let doc = match std::fs::read_to_string(&xml) {
        Ok(doc) => doc,
        Err(err) => {
            eprintln!("{}: {err}", xml.display());
            exit(1);
        }
    };
    let result = questionnaire_parser::parse_str(&doc);
    for warning in &result.warnings {
        eprintln!("warning: {warning}");
    }
    for error in &result.errors {
        eprintln!("error: {error}");
    }
    println!("{:#?}", result.template);
    if !result.errors.is_empty() {
        exit(2);
    }
}

/// Identifier uniqueness is a consumer-level concern, so it lives here
/// rather than in the parsing engine.
fn lint_duplicate_ids(template: &Template, diags: &mut Diagnostics) {
    let mut seen = fnv::FnvHashSet::default();
    for question in template.questions() {
        if !seen.insert(question.id.as_str()) {
            diags.error(
                format!("duplicate question id {:?}", question.id),
                None,
            );
        }
    }
}
