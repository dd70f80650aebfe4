//! A hand-written lexer for the directive language.
//!
//! Directive text is line-break sensitive: descriptor names must share a line
//! with their keyword, `=` may not be separated from its flag by a line
//! break, and a field definition ends at the end of its line. The scanners
//! here therefore operate on a byte cursor that reports whether a skipped
//! whitespace run crossed a line terminator, instead of discarding layout the
//! way a conventional token stream would.

use crate::reporting::LexerMessage;
use crate::source::{ByteRange, BytePos, FileId};
use crate::surface::Flag;
use std::ops::Range;

/// A cursor over one annotation block.
///
/// The cursor addresses the whole source file and is bounded to the block's
/// byte range, so every scanned token carries an absolute [`ByteRange`] that
/// can be used directly as a diagnostic label.
#[derive(Copy, Clone)]
pub struct Cursor<'src> {
    file_id: FileId,
    source: &'src str,
    pos: BytePos,
    end: BytePos,
}

/// A quoted string scanned from the input, without its delimiters.
#[derive(Debug, Copy, Clone)]
pub struct Quoted<'src> {
    pub range: ByteRange,
    pub value: &'src str,
}

pub fn is_ident(word: &str) -> bool {
    let mut chars = word.chars();
    match chars.next() {
        None => false,
        Some(first) if !first.is_alphabetic() && first != '_' => false,
        Some(_) => chars.all(|ch| ch.is_alphanumeric() || ch == '_'),
    }
}

impl<'src> Cursor<'src> {
    pub fn new(file_id: FileId, source: &'src str, range: Range<usize>) -> Cursor<'src> {
        Cursor {
            file_id,
            source,
            pos: range.start,
            end: range.end,
        }
    }

    pub fn pos(&self) -> BytePos {
        self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.pos >= self.end
    }

    /// The unconsumed text of the block.
    pub fn rest(&self) -> &'src str {
        &self.source[self.pos..self.end]
    }

    pub fn starts_with(&self, prefix: &str) -> bool {
        self.rest().starts_with(prefix)
    }

    pub fn bump(&mut self, len: usize) {
        self.pos = (self.pos + len).min(self.end);
    }

    pub fn range(&self, start: BytePos, end: BytePos) -> ByteRange {
        ByteRange::new(self.file_id, start, end)
    }

    pub fn range_from(&self, start: BytePos) -> ByteRange {
        ByteRange::new(self.file_id, start, self.pos)
    }

    /// An empty range at the current position.
    pub fn caret(&self) -> ByteRange {
        ByteRange::new(self.file_id, self.pos, self.pos)
    }

    /// Skip a whitespace run, reporting whether it contained a line
    /// terminator.
    pub fn skip_whitespace(&mut self) -> bool {
        let mut found_newline = false;
        for ch in self.rest().chars() {
            if !ch.is_whitespace() {
                break;
            }
            if ch == '\n' || ch == '\r' {
                found_newline = true;
            }
            self.pos += ch.len_utf8();
        }
        found_newline
    }

    /// Consume the remainder of the current line, not including the line
    /// terminator, and return it with surrounding whitespace trimmed.
    pub fn scan_line(&mut self) -> &'src str {
        let rest = self.rest();
        let len = rest.find(['\n', '\r']).unwrap_or(rest.len());
        self.bump(len);
        if self.starts_with("\r\n") {
            self.bump(2);
        } else if !self.is_empty() {
            self.bump(1);
        }
        rest[..len].trim()
    }

    /// Scan an identifier: letters, digits and underscores, not starting
    /// with a digit. Leading whitespace is skipped first.
    pub fn scan_ident(&mut self) -> Result<(ByteRange, &'src str), LexerMessage> {
        self.skip_whitespace();
        let start = self.pos;
        let rest = self.rest();
        let mut len = 0;
        for ch in rest.chars() {
            if ch.is_alphanumeric() || ch == '_' {
                if len == 0 && ch.is_ascii_digit() {
                    return Err(self.invalid_ident(start, ch.len_utf8()));
                }
                len += ch.len_utf8();
            } else if ch.is_whitespace() {
                break;
            } else {
                return Err(self.invalid_ident(start, len + ch.len_utf8()));
            }
        }
        if len == 0 {
            return Err(self.invalid_ident(start, 0));
        }
        self.pos += len;
        Ok((self.range_from(start), &rest[..len]))
    }

    fn invalid_ident(&self, start: BytePos, len: usize) -> LexerMessage {
        LexerMessage::InvalidIdent {
            range: self.range(start, start + len),
            found: self.source[start..start + len].to_owned(),
        }
    }

    /// Scan a type: an optional leading `*` followed by an identifier.
    pub fn scan_type(&mut self) -> Result<(ByteRange, String), LexerMessage> {
        self.skip_whitespace();
        let start = self.pos;
        let pointer = self.starts_with("*");
        if pointer {
            self.bump(1);
        }
        let (_, ident) = self.scan_ident()?;
        let ty = if pointer {
            format!("*{ident}")
        } else {
            ident.to_owned()
        };
        Ok((self.range_from(start), ty))
    }

    /// Scan a token that may be either a field name or a member type.
    pub fn scan_ident_or_type(&mut self) -> Result<(ByteRange, String), LexerMessage> {
        let mut probe = *self;
        match probe.scan_ident() {
            Ok((range, ident)) => {
                *self = probe;
                Ok((range, ident.to_owned()))
            }
            Err(_) => {
                let mut probe = *self;
                probe.skip_whitespace();
                let start = probe.pos();
                match probe.scan_type() {
                    Ok((range, ty)) => {
                        *self = probe;
                        Ok((range, ty))
                    }
                    Err(_) => {
                        let bad = probe.rest();
                        let len = bad.find(char::is_whitespace).unwrap_or(bad.len());
                        Err(LexerMessage::ExpectedIdentOrType {
                            range: probe.range(start, start + len),
                            found: bad[..len].to_owned(),
                        })
                    }
                }
            }
        }
    }

    /// Try to scan a quoted string delimited by `"`, `` ` `` or (when
    /// `accept_single` is set) `'`. There is no escape processing: the value
    /// runs to the first matching delimiter.
    ///
    /// When no opening quote follows, the cursor is left untouched so that a
    /// later scanner can still observe the intervening line break; the
    /// returned flag reports whether one was crossed while probing.
    pub fn scan_quoted(
        &mut self,
        accept_single: bool,
    ) -> Result<(Option<Quoted<'src>>, bool), LexerMessage> {
        let mut probe = *self;
        let found_newline = probe.skip_whitespace();
        let rest = probe.rest();
        let quote = match rest.as_bytes().first() {
            Some(b'"') => '"',
            Some(b'`') => '`',
            Some(b'\'') if accept_single => '\'',
            _ => return Ok((None, found_newline)),
        };
        let start = probe.pos();
        match rest[1..].find(quote) {
            None => Err(LexerMessage::UnclosedQuote {
                range: probe.range(start, probe.end),
            }),
            Some(idx) => {
                let value = &rest[1..1 + idx];
                probe.bump(2 + idx);
                let range = probe.range_from(start);
                *self = probe;
                Ok((Some(Quoted { range, value }), found_newline))
            }
        }
    }

    /// Scan a flag name: a run of lowercase letters and underscores, ended
    /// by `=`, whitespace, or the end of the block.
    fn scan_flag_word(&mut self) -> Result<(ByteRange, &'src str), LexerMessage> {
        let start = self.pos;
        let rest = self.rest();
        let mut len = 0;
        for ch in rest.chars() {
            if ch.is_ascii_lowercase() || ch == '_' {
                len += 1;
            } else if ch == '=' || ch.is_whitespace() {
                break;
            } else {
                let bad = len + ch.len_utf8();
                return Err(LexerMessage::InvalidFlagName {
                    range: self.range(start, start + bad),
                    found: rest[..bad].to_owned(),
                });
            }
        }
        if len == 0 {
            return Err(LexerMessage::InvalidFlagName {
                range: self.caret(),
                found: String::new(),
            });
        }
        self.pos += len;
        Ok((self.range_from(start), &rest[..len]))
    }

    /// Scan an unquoted flag value: everything up to the next whitespace.
    fn scan_bare_value(&mut self) -> &'src str {
        let rest = self.rest();
        let len = rest.find(char::is_whitespace).unwrap_or(rest.len());
        self.bump(len);
        &rest[..len]
    }
}

/// Tokenize a run of `--flag` / `--flag=value` modifiers.
///
/// Returns the flags in source order along with whether a line break
/// followed the last one. A trailing line break is required unless
/// `possible_end` is set and the block is exhausted.
pub fn gather_flags<'src>(
    cursor: &mut Cursor<'src>,
    possible_end: bool,
) -> Result<(Vec<Flag<'src>>, bool), LexerMessage> {
    let mut flags = Vec::new();
    let mut found_newline = cursor.skip_whitespace();

    while cursor.starts_with("--") {
        let flag_start = cursor.pos();
        cursor.bump(2);

        let (_, name) = cursor.scan_flag_word()?;
        let mut value = "";
        let mut has_value = false;
        let mut flag_end = cursor.pos();

        found_newline = cursor.skip_whitespace();

        if cursor.starts_with("=") {
            has_value = true;
            if found_newline {
                return Err(LexerMessage::LineBreakBeforeEquals {
                    range: cursor.range_from(flag_start),
                });
            }
            cursor.bump(1);

            found_newline = cursor.skip_whitespace();
            if found_newline {
                return Err(LexerMessage::LineBreakAfterEquals {
                    range: cursor.range_from(flag_start),
                });
            }
            if cursor.is_empty() {
                return Err(LexerMessage::ExpectedFlagValue {
                    flag: name.to_owned(),
                    range: cursor.range_from(flag_start),
                });
            }

            match cursor.scan_quoted(true)? {
                (Some(quoted), _) => value = quoted.value,
                (None, _) => value = cursor.scan_bare_value(),
            }
            flag_end = cursor.pos();
            found_newline = cursor.skip_whitespace();
        }

        flags.push(Flag {
            name,
            value,
            has_value,
            range: cursor.range(flag_start, flag_end),
        });
    }

    if !found_newline && (!possible_end || !cursor.is_empty()) {
        return Err(LexerMessage::ExpectedLineBreak {
            range: cursor.caret(),
        });
    }

    Ok((flags, found_newline))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cursor(source: &str) -> Cursor<'_> {
        Cursor::new(0, source, 0..source.len())
    }

    #[test]
    fn flag_roundtrip() {
        let source = "--json=\"string\" --drop_json\n";
        let (flags, found_newline) = gather_flags(&mut cursor(source), false).unwrap();

        assert!(found_newline);
        assert_eq!(flags.len(), 2);
        assert_eq!(flags[0].name, "json");
        assert_eq!(flags[0].value, "string");
        assert!(flags[0].has_value);
        assert_eq!(flags[1].name, "drop_json");
        assert!(!flags[1].has_value);
    }

    #[test]
    fn flag_quote_styles() {
        for source in ["--sep=\",\"\n", "--sep=`,`\n", "--sep=','\n"] {
            let (flags, _) = gather_flags(&mut cursor(source), false).unwrap();
            assert_eq!(flags[0].value, ",", "source: {source}");
        }
    }

    #[test]
    fn flag_bare_value() {
        let (flags, _) = gather_flags(&mut cursor("--iterator_name=Names\n"), false).unwrap();
        assert_eq!(flags[0].value, "Names");
        assert!(flags[0].has_value);
    }

    #[test]
    fn line_break_before_equals() {
        let result = gather_flags(&mut cursor("--json\n=\"string\"\n"), false);
        assert!(matches!(
            result,
            Err(LexerMessage::LineBreakBeforeEquals { .. })
        ));
    }

    #[test]
    fn line_break_after_equals() {
        let result = gather_flags(&mut cursor("--json=\n\"string\"\n"), false);
        assert!(matches!(
            result,
            Err(LexerMessage::LineBreakAfterEquals { .. })
        ));
    }

    #[test]
    fn unclosed_quote() {
        let result = gather_flags(&mut cursor("--json=\"string\n"), false);
        assert!(matches!(result, Err(LexerMessage::UnclosedQuote { .. })));
    }

    #[test]
    fn missing_trailing_line_break() {
        let result = gather_flags(&mut cursor("--bitflags Red"), false);
        assert!(matches!(result, Err(LexerMessage::ExpectedLineBreak { .. })));

        // At the very end of a block the line break is optional.
        let (flags, found_newline) = gather_flags(&mut cursor("--bitflags"), true).unwrap();
        assert_eq!(flags.len(), 1);
        assert!(!found_newline);
    }

    #[test]
    fn invalid_flag_name() {
        let result = gather_flags(&mut cursor("--Bit\n"), false);
        match result {
            Err(LexerMessage::InvalidFlagName { found, .. }) => assert_eq!(found, "B"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn ident_rejects_leading_digit() {
        assert!(cursor("9lives").scan_ident().is_err());
        assert!(is_ident("red_5"));
        assert!(!is_ident("5red"));
        assert!(!is_ident(""));
    }

    #[test]
    fn type_scans_pointer() {
        let (_, ty) = cursor(" *Foo rest").scan_type().unwrap();
        assert_eq!(ty, "*Foo");
        let (_, ty) = cursor("Bar rest").scan_type().unwrap();
        assert_eq!(ty, "Bar");
    }

    #[test]
    fn quoted_probe_preserves_newline() {
        // No string follows: the cursor must stay put so the line break is
        // still visible to the flag tokenizer.
        let source = "\nnext_field int";
        let mut c = cursor(source);
        let (quoted, newline) = c.scan_quoted(false).unwrap();
        assert!(quoted.is_none());
        assert!(newline);
        assert_eq!(c.pos(), 0);
    }
}
