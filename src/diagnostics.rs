//! Error and warning rendering.
//!
//! Every fatal error prints as an `ariadne` report: a
//! `(<error-kind>): <message>` headline, the source snippet with the
//! offending span underlined, and one extra label per `#IMPORT` site
//! when the span lives in an included file, so the whole import chain is
//! visible. Bracket errors add a label at the second involved site.
//!
//! If the report itself cannot be written, a plain
//! `<file>:<line>:<column>` line goes to stderr instead.

use ariadne::{Color, Config, IndexType, Label, Report, ReportKind};

use crate::codegen::Warning;
use crate::driver::CompileError;
use crate::source::SourceSet;
use crate::token::Span;

/// Prints a compile error to stderr.
pub fn report_error(sources: &SourceSet, error: &CompileError) {
    match error {
        CompileError::Io { .. } => eprintln!("Error: {}", error),
        CompileError::Lex(e) => print_report(
            sources,
            ReportKind::Error,
            e.kind().title(),
            e.message(),
            e.span(),
            None,
        ),
        CompileError::Parse(e) => print_report(
            sources,
            ReportKind::Error,
            "ParseError",
            e.message(),
            e.span(),
            e.related().map(|span| ("the other bracket is here", span)),
        ),
        CompileError::Translate(e) => print_report(
            sources,
            ReportKind::Error,
            "PTParseError",
            e.message(),
            e.span(),
            None,
        ),
        CompileError::Semantic(e) => print_report(
            sources,
            ReportKind::Error,
            "TypeError",
            e.message(),
            e.span(),
            None,
        ),
        CompileError::Codegen(e) => match e.span() {
            Some(span) => print_report(
                sources,
                ReportKind::Error,
                "CodeError",
                e.message(),
                span,
                None,
            ),
            None => eprintln!("CodeError: {}", e.message()),
        },
    }
}

/// Prints a warning to stderr. Warnings never stop the run.
pub fn report_warning(sources: &SourceSet, warning: &Warning) {
    print_report(
        sources,
        ReportKind::Warning,
        "Warning",
        &warning.message,
        warning.span,
        None,
    );
}

fn print_report(
    sources: &SourceSet,
    kind: ReportKind<'_>,
    title: &str,
    message: &str,
    span: Span,
    related: Option<(&str, Span)>,
) {
    let color = match &kind {
        ReportKind::Warning => Color::Yellow,
        _ => Color::Red,
    };
    let file_name = sources.file(span.file).name().to_string();

    let mut report = Report::build(kind, (file_name.clone(), span.start..span.end))
        .with_config(Config::default().with_index_type(IndexType::Byte))
        .with_message(format!("{}: {}", title, message))
        .with_label(
            Label::new((file_name.clone(), span.start..span.end))
                .with_message(message)
                .with_color(color),
        );

    if let Some((note, related_span)) = related {
        let related_name = sources.file(related_span.file).name().to_string();
        report = report.with_label(
            Label::new((related_name, related_span.start..related_span.end))
                .with_message(note)
                .with_color(Color::Yellow),
        );
    }

    // Walk the import chain, labeling every `#IMPORT` that led here.
    let mut anchor = span.anchor;
    while let Some(id) = anchor {
        let site = sources.anchor(id).site;
        let site_name = sources.file(site.file).name().to_string();
        report = report.with_label(
            Label::new((site_name, site.start..site.end))
                .with_message("imported from here")
                .with_color(Color::Blue),
        );
        anchor = site.anchor;
    }

    let cache = ariadne::sources(
        sources
            .files()
            .map(|f| (f.name().to_string(), f.text().to_string())),
    );
    if report.finish().eprint(cache).is_err() {
        eprintln!(
            "{}: {} (at {}:{}:{})",
            title,
            message,
            sources.file(span.file).name(),
            span.line,
            span.column
        );
    }
}
