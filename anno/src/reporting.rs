//! Diagnostic messages produced while compiling annotation blocks.

use codespan_reporting::diagnostic::{Diagnostic, Label};

use crate::source::ByteRange;

/// Top-level message type, tagging each phase's messages with the
/// descriptor that was being parsed when they were produced.
#[derive(Debug, Clone)]
pub enum Message {
    Lexer(LexerMessage),
    Parse(ParseMessage),
    /// A message raised while parsing the body of a named descriptor.
    InDescriptor {
        directive: &'static str,
        name: String,
        message: Box<Message>,
    },
}

impl From<LexerMessage> for Message {
    fn from(message: LexerMessage) -> Message {
        Message::Lexer(message)
    }
}

impl From<ParseMessage> for Message {
    fn from(message: ParseMessage) -> Message {
        Message::Parse(message)
    }
}

impl Message {
    pub fn to_diagnostic(&self) -> Diagnostic<usize> {
        match self {
            Message::Lexer(message) => message.to_diagnostic(),
            Message::Parse(message) => message.to_diagnostic(),
            Message::InDescriptor {
                directive,
                name,
                message,
            } => {
                let mut diagnostic = message.to_diagnostic();
                diagnostic
                    .notes
                    .push(format!("while parsing `@{directive} {name}`"));
                diagnostic
            }
        }
    }
}

/// Messages produced by the directive tokenizer.
#[derive(Debug, Clone)]
pub enum LexerMessage {
    /// A `--` was not followed by a lowercase flag name.
    InvalidFlagName { range: ByteRange, found: String },
    InvalidIdent { range: ByteRange, found: String },
    ExpectedIdentOrType { range: ByteRange, found: String },
    /// A line break separated a flag from its `=`.
    LineBreakBeforeEquals { range: ByteRange },
    /// A line break separated an `=` from its value.
    LineBreakAfterEquals { range: ByteRange },
    ExpectedFlagValue { range: ByteRange, flag: String },
    UnclosedQuote { range: ByteRange },
    /// A definition did not end at the end of its line.
    ExpectedLineBreak { range: ByteRange },
}

impl LexerMessage {
    pub fn to_diagnostic(&self) -> Diagnostic<usize> {
        let primary_label = |range: &ByteRange| Label::primary(range.file_id(), *range);

        match self {
            LexerMessage::InvalidFlagName { range, found } => Diagnostic::error()
                .with_message(format!("invalid flag name `{found}`"))
                .with_labels(vec![primary_label(range)])
                .with_notes(vec![
                    "flag names are lowercase letters and underscores".to_owned()
                ]),
            LexerMessage::InvalidIdent { range, found } => Diagnostic::error()
                .with_message(format!("invalid identifier `{found}`"))
                .with_labels(vec![primary_label(range)]),
            LexerMessage::ExpectedIdentOrType { range, found } => Diagnostic::error()
                .with_message(format!("expected a field name or a type, found `{found}`"))
                .with_labels(vec![primary_label(range)]),
            LexerMessage::LineBreakBeforeEquals { range } => Diagnostic::error()
                .with_message("invalid line break before `=`")
                .with_labels(vec![primary_label(range)]),
            LexerMessage::LineBreakAfterEquals { range } => Diagnostic::error()
                .with_message("invalid line break after `=`")
                .with_labels(vec![primary_label(range)]),
            LexerMessage::ExpectedFlagValue { range, flag } => Diagnostic::error()
                .with_message(format!("expected a value after `--{flag}=`"))
                .with_labels(vec![primary_label(range)]),
            LexerMessage::UnclosedQuote { range } => Diagnostic::error()
                .with_message("missing closing quote")
                .with_labels(vec![primary_label(range)]),
            LexerMessage::ExpectedLineBreak { range } => Diagnostic::error()
                .with_message("expected a line break")
                .with_labels(vec![primary_label(range)]),
        }
    }
}

/// Messages produced while building descriptors from the token stream.
#[derive(Debug, Clone)]
pub enum ParseMessage {
    ExpectedSpaceAndName {
        directive: &'static str,
        range: ByteRange,
    },
    NameOnNextLine {
        directive: &'static str,
        range: ByteRange,
    },
    EmptyDescriptor {
        directive: &'static str,
        what: &'static str,
        range: ByteRange,
    },
    IteratorNameConflict {
        field: String,
        range: ByteRange,
    },
    /// `--value` used on a variant of a bitflag enum.
    BitflagExplicitValue {
        range: ByteRange,
    },
    ValueOnDefaultVariant {
        range: ByteRange,
    },
    /// A 65th flag variant has no bit left in `uint64`.
    TooManyBitflagVariants {
        range: ByteRange,
    },
    ReservedZeroValue {
        range: ByteRange,
    },
    DuplicateDefault {
        previous: String,
        range: ByteRange,
    },
    InvalidUint {
        value: String,
        range: ByteRange,
    },
    FlagNeedsValue {
        flag: String,
        range: ByteRange,
    },
    FlagNeedsNonEmptyValue {
        flag: String,
        range: ByteRange,
    },
    FlagNeedsIdent {
        flag: String,
        range: ByteRange,
    },
    InvalidBoolValue {
        flag: String,
        value: String,
        range: ByteRange,
    },
    InvalidMarshalMode {
        flag: String,
        value: String,
        range: ByteRange,
    },
    UnknownFlag {
        flag: String,
        range: ByteRange,
        suggestion: Option<String>,
    },
    CtorNameInDefaults {
        range: ByteRange,
    },
    FlagNotAllowedOnEmbedded {
        flag: String,
        range: ByteRange,
    },
    AccessorNameConflict {
        accessor: &'static str,
        name: String,
        range: ByteRange,
    },
    /// A field's tag string appeared on the line after the field.
    TagOnNextLine {
        range: ByteRange,
    },
    NamedUnionMember {
        range: ByteRange,
    },
    UnionMemberFlag {
        flag: String,
        range: ByteRange,
    },
    /// Text between two directives could not be parsed and was skipped.
    SkippedText {
        range: ByteRange,
    },
    NonExportedAccessor {
        accessor: &'static str,
        name: String,
        range: ByteRange,
    },
    DropCtorWithCtorName {
        name: String,
        range: ByteRange,
    },
}

impl ParseMessage {
    pub fn to_diagnostic(&self) -> Diagnostic<usize> {
        let primary_label = |range: &ByteRange| Label::primary(range.file_id(), *range);

        match self {
            ParseMessage::ExpectedSpaceAndName { directive, range } => Diagnostic::error()
                .with_message(format!("expected a name after `@{directive}`"))
                .with_labels(vec![primary_label(range)]),
            ParseMessage::NameOnNextLine { directive, range } => Diagnostic::error()
                .with_message(format!(
                    "the name must be on the same line as `@{directive}`"
                ))
                .with_labels(vec![primary_label(range)]),
            ParseMessage::EmptyDescriptor {
                directive,
                what,
                range,
            } => Diagnostic::error()
                .with_message(format!("`@{directive}` must define at least one {what}"))
                .with_labels(vec![primary_label(range)]),
            ParseMessage::IteratorNameConflict { field, range } => Diagnostic::error()
                .with_message(format!(
                    "variant `{field}` collides with the iterator function name"
                ))
                .with_labels(vec![primary_label(range)])
                .with_notes(vec![
                    "rename the variant, or pick another name with `--iterator_name`".to_owned(),
                ]),
            ParseMessage::BitflagExplicitValue { range } => Diagnostic::error()
                .with_message("`--value` cannot be used on a bitflag variant")
                .with_labels(vec![primary_label(range)])
                .with_notes(vec![
                    "bitflag values are assigned from the variant order".to_owned()
                ]),
            ParseMessage::ValueOnDefaultVariant { range } => Diagnostic::error()
                .with_message("`--value` cannot be combined with `--default`")
                .with_labels(vec![primary_label(range)])
                .with_notes(vec!["the default variant always has value zero".to_owned()]),
            ParseMessage::TooManyBitflagVariants { range } => Diagnostic::error()
                .with_message("too many bitflag variants for `uint64`")
                .with_labels(vec![primary_label(range)])
                .with_notes(vec![
                    "a bitflag enum uses one bit per variant, allowing at most 64".to_owned(),
                ]),
            ParseMessage::ReservedZeroValue { range } => Diagnostic::error()
                .with_message("`--value=0` is reserved for the default variant")
                .with_labels(vec![primary_label(range)]),
            ParseMessage::DuplicateDefault { previous, range } => Diagnostic::error()
                .with_message("more than one default variant")
                .with_labels(vec![primary_label(range)])
                .with_notes(vec![format!("`{previous}` is already the default")]),
            ParseMessage::InvalidUint { value, range } => Diagnostic::error()
                .with_message(format!("`{value}` is not an unsigned integer"))
                .with_labels(vec![primary_label(range)]),
            ParseMessage::FlagNeedsValue { flag, range } => Diagnostic::error()
                .with_message(format!("`--{flag}` requires a value"))
                .with_labels(vec![primary_label(range)]),
            ParseMessage::FlagNeedsNonEmptyValue { flag, range } => Diagnostic::error()
                .with_message(format!("`--{flag}` requires a non-empty value"))
                .with_labels(vec![primary_label(range)]),
            ParseMessage::FlagNeedsIdent { flag, range } => Diagnostic::error()
                .with_message(format!("`--{flag}` requires a valid identifier"))
                .with_labels(vec![primary_label(range)]),
            ParseMessage::InvalidBoolValue { flag, value, range } => Diagnostic::error()
                .with_message(format!("invalid value `{value}` for `--{flag}`"))
                .with_labels(vec![primary_label(range)])
                .with_notes(vec!["expected `true` or `false`".to_owned()]),
            ParseMessage::InvalidMarshalMode { flag, value, range } => Diagnostic::error()
                .with_message(format!("invalid value `{value}` for `--{flag}`"))
                .with_labels(vec![primary_label(range)])
                .with_notes(vec!["expected `string` or `value`".to_owned()]),
            ParseMessage::UnknownFlag {
                flag,
                range,
                suggestion,
            } => {
                let diagnostic = Diagnostic::error()
                    .with_message(format!("unknown flag `--{flag}`"))
                    .with_labels(vec![primary_label(range)]);
                match suggestion {
                    None => diagnostic,
                    Some(suggestion) => {
                        diagnostic.with_notes(vec![format!("did you mean `--{suggestion}`?")])
                    }
                }
            }
            ParseMessage::CtorNameInDefaults { range } => Diagnostic::error()
                .with_message("`--ctor_name` cannot be set in a defaults block")
                .with_labels(vec![primary_label(range)])
                .with_notes(vec![
                    "a constructor name only makes sense for a single struct".to_owned(),
                ]),
            ParseMessage::FlagNotAllowedOnEmbedded { flag, range } => Diagnostic::error()
                .with_message(format!("`--{flag}` cannot be used on an embedded field"))
                .with_labels(vec![primary_label(range)]),
            ParseMessage::AccessorNameConflict {
                accessor,
                name,
                range,
            } => Diagnostic::error()
                .with_message(format!(
                    "{accessor} accessor `{name}` conflicts with the field name"
                ))
                .with_labels(vec![primary_label(range)]),
            ParseMessage::TagOnNextLine { range } => Diagnostic::error()
                .with_message("found a string, expected flags or a field definition")
                .with_labels(vec![primary_label(range)])
                .with_notes(vec![
                    "a field tag must be on the same line as the field".to_owned()
                ]),
            ParseMessage::NamedUnionMember { range } => Diagnostic::error()
                .with_message("union members must be embedded types")
                .with_labels(vec![primary_label(range)]),
            ParseMessage::UnionMemberFlag { flag, range } => Diagnostic::error()
                .with_message(format!("`--{flag}` cannot be used on a union member"))
                .with_labels(vec![primary_label(range)]),
            ParseMessage::SkippedText { range } => Diagnostic::warning()
                .with_message("skipped unparseable text")
                .with_labels(vec![primary_label(range)]),
            ParseMessage::NonExportedAccessor {
                accessor,
                name,
                range,
            } => Diagnostic::warning()
                .with_message(format!("{accessor} accessor `{name}` is not exported"))
                .with_labels(vec![primary_label(range)])
                .with_notes(vec![
                    "accessor names starting with a lowercase letter are package-private"
                        .to_owned(),
                ]),
            ParseMessage::DropCtorWithCtorName { name, range } => Diagnostic::warning()
                .with_message(format!(
                    "`--ctor_name={name}` has no effect together with `--drop_ctor`"
                ))
                .with_labels(vec![primary_label(range)]),
        }
    }
}
