//! Surface language: the directive mini-language embedded in comments.
//!
//! An annotation block contains directives such as `@enum Color` followed by
//! variant or field definitions, each optionally modified by `--flag` or
//! `--flag=value` flags. [`lexer`] tokenizes that text and [`parse`] builds
//! the core representation from it.

use crate::reporting::ParseMessage;
use crate::source::ByteRange;

pub mod lexer;
pub mod parse;

/// The directive keywords that open a descriptor.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Directive {
    Enum,
    EnumDefaults,
    Struct,
    StructDefaults,
    Union,
    UnionDefaults,
}

impl Directive {
    /// All directives, longest keyword first, so that prefix dispatch never
    /// mistakes `@enum-defaults` for `@enum`.
    const ALL: [Directive; 6] = [
        Directive::EnumDefaults,
        Directive::StructDefaults,
        Directive::UnionDefaults,
        Directive::Enum,
        Directive::Struct,
        Directive::Union,
    ];

    pub const fn keyword(&self) -> &'static str {
        match self {
            Directive::Enum => "enum",
            Directive::EnumDefaults => "enum-defaults",
            Directive::Struct => "struct",
            Directive::StructDefaults => "struct-defaults",
            Directive::Union => "union",
            Directive::UnionDefaults => "union-defaults",
        }
    }

    /// Match a directive at the start of `text`, which must begin with `@`.
    pub fn lookup(text: &str) -> Option<Directive> {
        let text = text.strip_prefix('@')?;
        (Directive::ALL.iter())
            .copied()
            .find(|directive| text.starts_with(directive.keyword()))
    }

    /// Find the byte offset of the next directive in `text`, if any.
    /// Used to resynchronize after a parse error.
    pub fn next_directive(text: &str) -> Option<usize> {
        let mut offset = 0;
        let mut rest = text;
        while let Some(at) = rest.find('@') {
            if Directive::lookup(&rest[at..]).is_some() {
                return Some(offset + at);
            }
            offset += at + 1;
            rest = &rest[at + 1..];
        }
        None
    }
}

/// A `--name` or `--name=value` modifier.
#[derive(Debug, Copy, Clone)]
pub struct Flag<'src> {
    pub name: &'src str,
    pub value: &'src str,
    pub has_value: bool,
    pub range: ByteRange,
}

impl<'src> Flag<'src> {
    /// The flag's value; the value may be empty but `=` must be present.
    pub fn expect_value(&self) -> Result<&'src str, ParseMessage> {
        if self.has_value {
            Ok(self.value)
        } else {
            Err(ParseMessage::FlagNeedsValue {
                flag: self.name.to_owned(),
                range: self.range,
            })
        }
    }

    /// The flag's value, which must be non-empty.
    pub fn non_empty(&self) -> Result<&'src str, ParseMessage> {
        match self.expect_value()? {
            "" => Err(ParseMessage::FlagNeedsNonEmptyValue {
                flag: self.name.to_owned(),
                range: self.range,
            }),
            value => Ok(value),
        }
    }

    /// The flag's value, which must be a valid identifier.
    pub fn ident(&self) -> Result<&'src str, ParseMessage> {
        let value = self.expect_value()?;
        if lexer::is_ident(value) {
            Ok(value)
        } else {
            Err(ParseMessage::FlagNeedsIdent {
                flag: self.name.to_owned(),
                range: self.range,
            })
        }
    }

    /// Interpret the flag as a boolean: a bare `--flag` means `true`,
    /// otherwise the value must be `true` or `false`.
    pub fn boolean(&self) -> Result<bool, ParseMessage> {
        if !self.has_value {
            return Ok(true);
        }
        match self.value {
            "true" => Ok(true),
            "false" => Ok(false),
            value => Err(ParseMessage::InvalidBoolValue {
                flag: self.name.to_owned(),
                value: value.to_owned(),
                range: self.range,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directive_longest_match() {
        assert_eq!(Directive::lookup("@enum Color"), Some(Directive::Enum));
        assert_eq!(
            Directive::lookup("@enum-defaults"),
            Some(Directive::EnumDefaults)
        );
        assert_eq!(
            Directive::lookup("@struct-defaults\n"),
            Some(Directive::StructDefaults)
        );
        assert_eq!(Directive::lookup("@unionize"), Some(Directive::Union));
        assert_eq!(Directive::lookup("@interface"), None);
        assert_eq!(Directive::lookup("enum"), None);
    }

    #[test]
    fn next_directive_skips_plain_ats() {
        let text = "user@example.com then @struct Point";
        assert_eq!(Directive::next_directive(text), Some(22));
        assert_eq!(Directive::next_directive("no directives here"), None);
    }

    #[test]
    fn flag_boolean() {
        let flag = |value, has_value| Flag {
            name: "summary",
            value,
            has_value,
            range: ByteRange::new(0, 0, 0),
        };
        assert!(flag("", false).boolean().unwrap());
        assert!(flag("true", true).boolean().unwrap());
        assert!(!flag("false", true).boolean().unwrap());
        assert!(flag("yes", true).boolean().is_err());
    }
}
