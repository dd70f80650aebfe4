use codespan_reporting::diagnostic::{Diagnostic, Severity};
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term::termcolor::{BufferedStandardStream, ColorChoice, WriteColor};
use std::cell::RefCell;
use std::io::{Read, Write};
use std::ops::Range;
use std::path::Path;

use pretty::RcDoc;

use crate::core;
use crate::source::FileId;
use crate::surface::parse;

#[derive(Debug, Copy, Clone)]
pub enum Status {
    Ok,
    Error,
}

impl Status {
    pub fn exit_code(self) -> i32 {
        match self {
            Status::Ok => 0,
            Status::Error => 1,
        }
    }
}

pub struct Driver {
    files: SimpleFiles<String, String>,

    allow_errors: bool,
    seen_errors: RefCell<bool>,
    codespan_config: codespan_reporting::term::Config,
    diagnostic_writer: RefCell<Box<dyn WriteColor>>,

    quiet: bool,
    emit_width: usize,
    emit_writer: RefCell<Box<dyn WriteColor>>,
}

impl Driver {
    pub fn new() -> Driver {
        Driver {
            files: SimpleFiles::new(),

            allow_errors: false,
            seen_errors: RefCell::new(false),
            codespan_config: codespan_reporting::term::Config::default(),
            diagnostic_writer: RefCell::new(Box::new(BufferedStandardStream::stderr(
                if atty::is(atty::Stream::Stderr) {
                    ColorChoice::Auto
                } else {
                    ColorChoice::Never
                },
            ))),

            quiet: false,
            emit_width: usize::MAX,
            emit_writer: RefCell::new(Box::new(BufferedStandardStream::stdout(
                if atty::is(atty::Stream::Stdout) {
                    ColorChoice::Auto
                } else {
                    ColorChoice::Never
                },
            ))),
        }
    }

    /// Set to true if files should count as succeeded despite errors
    pub fn set_allow_errors(&mut self, allow_errors: bool) {
        self.allow_errors = allow_errors;
    }

    /// Set to true to suppress the descriptor dump
    pub fn set_quiet(&mut self, quiet: bool) {
        self.quiet = quiet;
    }

    /// Set the writer to use when rendering diagnostics
    pub fn set_diagnostic_writer(&mut self, stream: impl 'static + WriteColor) {
        self.diagnostic_writer = RefCell::new(Box::new(stream) as Box<dyn WriteColor>);
    }

    /// Set the width to use when emitting the descriptor dump
    pub fn set_emit_width(&mut self, emit_width: usize) {
        self.emit_width = emit_width;
    }

    /// Set the writer to use when emitting the descriptor dump
    pub fn set_emit_writer(&mut self, stream: impl 'static + WriteColor) {
        self.emit_writer = RefCell::new(Box::new(stream) as Box<dyn WriteColor>);
    }

    /// Load a source string into the file database.
    pub fn load_source_string(&mut self, name: String, source: String) -> FileId {
        self.files.add(name, source)
    }

    /// Load a source file into the file database using a reader.
    pub fn load_source(&mut self, name: String, mut reader: impl Read) -> Option<FileId> {
        let mut source = String::new();
        match reader.read_to_string(&mut source) {
            Ok(_) => Some(self.load_source_string(name, source)),
            Err(error) => {
                self.emit_read_diagnostic(name, error);
                None
            }
        }
    }

    /// Load a source file into the file database from the given path.
    pub fn load_source_path(&mut self, path: &Path) -> Option<FileId> {
        match std::fs::File::open(path) {
            Ok(file) => self.load_source(path.display().to_string(), file),
            Err(error) => {
                self.emit_read_diagnostic(path.display(), error);
                None
            }
        }
    }

    /// Compile every annotation block in a loaded file and emit the
    /// resolved descriptors.
    pub fn compile_file(&self, file_id: FileId) -> Status {
        *self.seen_errors.borrow_mut() = false;

        let file = self.files.get(file_id).unwrap();
        let source = file.source().as_str();
        let package = package_name(file.name());

        let mut context = parse::Context::new(file_id, source, &package);
        for block in comment_blocks(source) {
            context.parse_block(block);
        }
        let (data, messages) = context.finish();

        self.emit_diagnostics(messages.iter().map(|message| message.to_diagnostic()));

        // Defective directives were dropped with a diagnostic; whatever
        // parsed cleanly is still emitted.
        if !self.quiet && !data.is_empty() {
            let context = core::pretty::Context::new();
            self.emit_doc(context.file_data(&data));
        }

        match *self.seen_errors.borrow() && !self.allow_errors {
            true => Status::Error,
            false => Status::Ok,
        }
    }

    fn emit_doc(&self, doc: RcDoc) {
        let mut emit_writer = self.emit_writer.borrow_mut();
        writeln!(emit_writer, "{}", doc.pretty(self.emit_width)).unwrap();
        emit_writer.flush().unwrap();
    }

    fn emit_diagnostic(&self, diagnostic: Diagnostic<FileId>) {
        let mut writer = self.diagnostic_writer.borrow_mut();
        let config = &self.codespan_config;

        codespan_reporting::term::emit(&mut *writer, config, &self.files, &diagnostic).unwrap();
        writer.flush().unwrap();

        if diagnostic.severity >= Severity::Error {
            *self.seen_errors.borrow_mut() = true;
        }
    }

    fn emit_diagnostics(&self, diagnostics: impl Iterator<Item = Diagnostic<FileId>>) {
        for diagnostic in diagnostics {
            self.emit_diagnostic(diagnostic);
        }
    }

    fn emit_read_diagnostic(&self, name: impl std::fmt::Display, error: std::io::Error) {
        let diagnostic =
            Diagnostic::error().with_message(format!("couldn't read `{name}`: {error}"));
        self.emit_diagnostic(diagnostic);
    }
}

impl Default for Driver {
    fn default() -> Driver {
        Driver::new()
    }
}

/// The package name for a file, taken from its file stem.
fn package_name(name: &str) -> String {
    Path::new(name)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .filter(|stem| !stem.is_empty())
        .unwrap_or_else(|| "main".to_owned())
}

/// The inner byte ranges of every `/* ... */` comment in the file. Comments
/// do not nest; an unterminated comment runs to the end of the file.
fn comment_blocks(source: &str) -> Vec<Range<usize>> {
    let mut blocks = Vec::new();
    let mut pos = 0;
    while let Some(open) = source[pos..].find("/*") {
        let start = pos + open + 2;
        match source[start..].find("*/") {
            Some(close) => {
                blocks.push(start..start + close);
                pos = start + close + 2;
            }
            None => {
                blocks.push(start..source.len());
                break;
            }
        }
    }
    blocks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comment_blocks_are_found() {
        let source = "package x\n/* @enum A\nB\n*/\ncode\n/* second */";
        let blocks = comment_blocks(source);
        assert_eq!(blocks.len(), 2);
        assert_eq!(&source[blocks[0].clone()], " @enum A\nB\n");
        assert_eq!(&source[blocks[1].clone()], " second ");
    }

    #[test]
    fn unterminated_comment_runs_to_eof() {
        let source = "/* @enum A\nB\n";
        let blocks = comment_blocks(source);
        assert_eq!(blocks, vec![2..source.len()]);
    }

    #[test]
    fn package_name_from_stem() {
        assert_eq!(package_name("src/colors.go"), "colors");
        assert_eq!(package_name("colors"), "colors");
        assert_eq!(package_name(""), "main");
    }
}
