//! Building core descriptors from annotation blocks.

use levenshtein::levenshtein;
use std::ops::Range;

use crate::core::{
    Base, Defaults, EnumDefaults, EnumFieldRepr, EnumRepr, FileData, StructDefaults,
    StructFieldRepr, StructRepr, UnionMemberRepr, UnionRepr,
};
use crate::reporting::{Message, ParseMessage};
use crate::source::{ByteRange, FileId};
use crate::surface::lexer::{self, Cursor};
use crate::surface::{Directive, Flag};

const ENUM_FLAGS: &[&str] = &[
    "bitflags",
    "bitflag_separator",
    "iterator_name",
    "summary",
    "json",
    "json_marshal",
    "json_unmarshal",
    "drop_json",
];

const STRUCT_FLAGS: &[&str] = &["drop_json", "drop_ctor", "ctor_name"];

/// Parser state for a single source file.
///
/// A file is parsed one annotation block at a time; the defaults prototypes
/// persist across blocks, so an `@enum-defaults` in an early block still
/// applies to enums in later ones. Descriptors that fail to parse are
/// dropped whole, and parsing resumes at the next directive.
pub struct Context<'src> {
    file_id: FileId,
    source: &'src str,
    defaults: Defaults,
    data: FileData,
    messages: Vec<Message>,
}

impl<'src> Context<'src> {
    pub fn new(file_id: FileId, source: &'src str, package_name: &str) -> Context<'src> {
        Context {
            file_id,
            source,
            defaults: Defaults::default(),
            data: FileData::new(package_name),
            messages: Vec::new(),
        }
    }

    /// Parse one annotation block, given as a byte range of the file.
    pub fn parse_block(&mut self, range: Range<usize>) {
        let mut cursor = Cursor::new(self.file_id, self.source, range);
        let mut doc_lines = Vec::new();

        loop {
            cursor.skip_whitespace();
            if cursor.is_empty() {
                break;
            }

            if cursor.starts_with("//") {
                cursor.bump(2);
                doc_lines.push(cursor.scan_line().to_owned());
                continue;
            }

            let directive = match Directive::lookup(cursor.rest()) {
                Some(directive) => directive,
                // Ordinary prose before the next directive is not an error.
                None => {
                    doc_lines.clear();
                    let rest = cursor.rest();
                    cursor.bump(Directive::next_directive(rest).unwrap_or(rest.len()));
                    continue;
                }
            };
            cursor.bump(1 + directive.keyword().len());

            let docs = std::mem::take(&mut doc_lines);
            let result = match directive {
                Directive::Enum => self.parse_enum(&mut cursor, docs),
                Directive::EnumDefaults => self.parse_enum_defaults(&mut cursor),
                Directive::Struct => self.parse_struct(&mut cursor, docs),
                Directive::StructDefaults => self.parse_struct_defaults(&mut cursor),
                Directive::Union => self.parse_union(&mut cursor, docs),
                Directive::UnionDefaults => self.parse_union_defaults(&mut cursor),
            };

            if let Err(message) = result {
                self.messages.push(message);
                self.resync(&mut cursor);
            }
        }
    }

    /// Finish the file: resolve imports and hand back the data along with
    /// any messages produced.
    pub fn finish(mut self) -> (FileData, Vec<Message>) {
        self.data.gather_imports();
        (self.data, self.messages)
    }

    /// Skip ahead to the next directive, warning if the skipped text was
    /// more than whitespace.
    fn resync(&mut self, cursor: &mut Cursor<'src>) {
        let start = cursor.pos();
        let rest = cursor.rest();
        let skipped = Directive::next_directive(rest).unwrap_or(rest.len());
        if !rest[..skipped].trim().is_empty() {
            let range = cursor.range(start, start + skipped);
            self.messages.push(ParseMessage::SkippedText { range }.into());
        }
        cursor.bump(skipped);
    }

    /// Parse the descriptor name following a directive keyword. The name
    /// must be separated from the keyword by spaces only.
    fn descriptor_name(
        &self,
        cursor: &mut Cursor<'src>,
        directive: Directive,
    ) -> Result<(ByteRange, &'src str), Message> {
        let keyword = directive.keyword();
        match cursor.rest().chars().next() {
            Some(ch) if ch.is_whitespace() => {}
            _ => {
                return Err(ParseMessage::ExpectedSpaceAndName {
                    directive: keyword,
                    range: cursor.caret(),
                }
                .into())
            }
        }

        let mut probe = *cursor;
        if probe.skip_whitespace() {
            return Err(ParseMessage::NameOnNextLine {
                directive: keyword,
                range: probe.caret(),
            }
            .into());
        }
        *cursor = probe;

        let (range, name) = cursor.scan_ident()?;
        Ok((range, name))
    }

    /// The verbatim `--flag` or `--flag=value` text, for pass-through.
    fn flag_text(&self, flag: &Flag<'src>) -> String {
        self.source[flag.range.start()..flag.range.end()].to_owned()
    }

    fn unknown_flag(&self, flag: &Flag<'src>, known: &[&'static str]) -> ParseMessage {
        let suggestion = (known.iter())
            .map(|name| (levenshtein(flag.name, name), *name))
            .min()
            .filter(|(distance, _)| *distance <= 2)
            .map(|(_, name)| name.to_owned());
        ParseMessage::UnknownFlag {
            flag: flag.name.to_owned(),
            range: flag.range,
            suggestion,
        }
    }

    fn parse_enum(&mut self, cursor: &mut Cursor<'src>, docs: Vec<String>) -> Result<(), Message> {
        let (_, name) = self.descriptor_name(cursor, Directive::Enum)?;
        let name = name.to_owned();

        let mut repr = EnumRepr {
            base: Base::new(self.data.fresh_uid(), docs),
            name: name.clone(),
            opts: self.defaults.enums.clone(),
            fields: Vec::new(),
            has_default_variant: false,
            passthrough: Vec::new(),
        };

        self.enum_body(cursor, &mut repr)
            .map_err(|message| Message::InDescriptor {
                directive: "enum",
                name,
                message: Box::new(message),
            })?;

        self.data.enums.push(repr);
        Ok(())
    }

    fn enum_body(&mut self, cursor: &mut Cursor<'src>, repr: &mut EnumRepr) -> Result<(), Message> {
        let (flags, _) = lexer::gather_flags(cursor, false)?;
        for flag in &flags {
            self.enum_flag(&mut repr.opts, flag, Some(&mut repr.passthrough))?;
        }

        let mut doc_lines = Vec::new();
        loop {
            cursor.skip_whitespace();
            if cursor.is_empty() || Directive::lookup(cursor.rest()).is_some() {
                break;
            }
            if cursor.starts_with("//") {
                cursor.bump(2);
                doc_lines.push(cursor.scan_line().to_owned());
                continue;
            }
            self.enum_field(cursor, repr, std::mem::take(&mut doc_lines))?;
        }

        if repr.fields.is_empty() {
            return Err(ParseMessage::EmptyDescriptor {
                directive: "enum",
                what: "variant",
                range: cursor.caret(),
            }
            .into());
        }
        Ok(())
    }

    fn enum_flag(
        &self,
        opts: &mut EnumDefaults,
        flag: &Flag<'src>,
        passthrough: Option<&mut Vec<String>>,
    ) -> Result<(), Message> {
        match flag.name {
            "bitflags" => opts.bitflag_mode = flag.boolean()?,
            "bitflag_separator" => opts.flag_separator = flag.non_empty()?.to_owned(),
            "iterator_name" => opts.iterator_name = flag.ident()?.to_owned(),
            "summary" => opts.summary = flag.boolean()?,
            "json" => {
                let as_string = marshal_mode(flag)?;
                opts.json_marshal_string = as_string;
                opts.json_unmarshal_string = as_string;
            }
            "json_marshal" => opts.json_marshal_string = marshal_mode(flag)?,
            "json_unmarshal" => opts.json_unmarshal_string = marshal_mode(flag)?,
            "drop_json" => opts.drop_json = flag.boolean()?,
            _ => match passthrough {
                Some(passthrough) => passthrough.push(self.flag_text(flag)),
                None => return Err(self.unknown_flag(flag, ENUM_FLAGS).into()),
            },
        }
        Ok(())
    }

    fn enum_field(
        &mut self,
        cursor: &mut Cursor<'src>,
        repr: &mut EnumRepr,
        docs: Vec<String>,
    ) -> Result<(), Message> {
        let (name_range, name) = cursor.scan_ident()?;

        if name == repr.opts.iterator_name {
            return Err(ParseMessage::IteratorNameConflict {
                field: name.to_owned(),
                range: name_range,
            }
            .into());
        }

        let mut field = EnumFieldRepr {
            base: Base::new(self.data.fresh_uid(), docs),
            name: name.to_owned(),
            display: String::new(),
            description: String::new(),
            value: u64::MAX,
            is_default: false,
            has_explicit_value: false,
            passthrough: Vec::new(),
        };

        let (flags, _) = lexer::gather_flags(cursor, true)?;
        for flag in &flags {
            match flag.name {
                "string" => field.display = flag.expect_value()?.to_owned(),
                "description" => field.description = flag.expect_value()?.to_owned(),
                "value" => {
                    if field.is_default {
                        return Err(ParseMessage::ValueOnDefaultVariant { range: flag.range }.into());
                    }
                    let value = flag.expect_value()?;
                    let parsed = value.parse::<u32>().map_err(|_| ParseMessage::InvalidUint {
                        value: value.to_owned(),
                        range: flag.range,
                    })?;
                    if parsed == 0 {
                        return Err(ParseMessage::ReservedZeroValue { range: flag.range }.into());
                    }
                    field.value = u64::from(parsed);
                    field.has_explicit_value = true;
                }
                "default" => {
                    if field.has_explicit_value {
                        return Err(ParseMessage::ValueOnDefaultVariant { range: flag.range }.into());
                    }
                    field.is_default = true;
                    field.value = 0;
                }
                _ => field.passthrough.push(self.flag_text(flag)),
            }
        }

        if repr.is_bitflag() && field.has_explicit_value {
            return Err(ParseMessage::BitflagExplicitValue { range: name_range }.into());
        }

        if field.display.is_empty() {
            field.display = field.name.clone();
        }
        if field.description.is_empty() {
            field.description = field.display.clone();
        }

        if !field.has_explicit_value && !field.is_default {
            field.value = if repr.is_bitflag() {
                if repr.fields.len() >= 64 {
                    return Err(ParseMessage::TooManyBitflagVariants { range: name_range }.into());
                }
                1 << repr.fields.len()
            } else {
                repr.fields.len() as u64 + 1
            };
        }

        if field.is_default {
            if repr.has_default_variant {
                let previous = (repr.fields.iter())
                    .find(|field| field.is_default)
                    .map(|field| field.name.clone())
                    .unwrap_or_default();
                return Err(ParseMessage::DuplicateDefault {
                    previous,
                    range: name_range,
                }
                .into());
            }
            repr.has_default_variant = true;
        }

        repr.fields.push(field);
        Ok(())
    }

    fn parse_enum_defaults(&mut self, cursor: &mut Cursor<'src>) -> Result<(), Message> {
        let (flags, _) = lexer::gather_flags(cursor, true)?;

        // Commit only once every flag has been accepted, so a bad defaults
        // block leaves the prototype untouched.
        let mut opts = self.defaults.enums.clone();
        for flag in &flags {
            self.enum_flag(&mut opts, flag, None)?;
        }
        self.defaults.enums = opts;
        Ok(())
    }

    fn parse_struct(
        &mut self,
        cursor: &mut Cursor<'src>,
        docs: Vec<String>,
    ) -> Result<(), Message> {
        let (name_range, name) = self.descriptor_name(cursor, Directive::Struct)?;
        let name = name.to_owned();

        let mut repr = StructRepr {
            base: Base::new(self.data.fresh_uid(), docs),
            name: name.clone(),
            opts: self.defaults.structs.clone(),
            ctor_name: None,
            fields: Vec::new(),
            passthrough: Vec::new(),
        };

        self.struct_body(cursor, &mut repr, name_range)
            .map_err(|message| Message::InDescriptor {
                directive: "struct",
                name,
                message: Box::new(message),
            })?;

        self.data.structs.push(repr);
        Ok(())
    }

    fn struct_body(
        &mut self,
        cursor: &mut Cursor<'src>,
        repr: &mut StructRepr,
        name_range: ByteRange,
    ) -> Result<(), Message> {
        let (flags, _) = lexer::gather_flags(cursor, false)?;
        for flag in &flags {
            let StructRepr {
                opts,
                ctor_name,
                passthrough,
                ..
            } = repr;
            self.struct_flag(opts, Some(ctor_name), flag, Some(passthrough))?;
        }

        if repr.opts.drop_ctor {
            if let Some(ctor_name) = &repr.ctor_name {
                self.messages.push(
                    ParseMessage::DropCtorWithCtorName {
                        name: ctor_name.clone(),
                        range: name_range,
                    }
                    .into(),
                );
            }
        }

        let mut doc_lines = Vec::new();
        loop {
            cursor.skip_whitespace();
            if cursor.is_empty() || Directive::lookup(cursor.rest()).is_some() {
                break;
            }
            if cursor.starts_with("//") {
                cursor.bump(2);
                doc_lines.push(cursor.scan_line().to_owned());
                continue;
            }
            self.struct_field(cursor, repr, std::mem::take(&mut doc_lines))?;
        }

        if repr.fields.is_empty() {
            return Err(ParseMessage::EmptyDescriptor {
                directive: "struct",
                what: "field",
                range: cursor.caret(),
            }
            .into());
        }
        Ok(())
    }

    fn struct_flag(
        &self,
        opts: &mut StructDefaults,
        ctor_name: Option<&mut Option<String>>,
        flag: &Flag<'src>,
        passthrough: Option<&mut Vec<String>>,
    ) -> Result<(), Message> {
        match flag.name {
            "drop_json" => opts.drop_json = flag.boolean()?,
            "drop_ctor" => opts.drop_ctor = flag.boolean()?,
            "ctor_name" => match ctor_name {
                Some(slot) => *slot = Some(flag.ident()?.to_owned()),
                None => return Err(ParseMessage::CtorNameInDefaults { range: flag.range }.into()),
            },
            _ => match passthrough {
                Some(passthrough) => passthrough.push(self.flag_text(flag)),
                None => return Err(self.unknown_flag(flag, STRUCT_FLAGS).into()),
            },
        }
        Ok(())
    }

    fn struct_field(
        &mut self,
        cursor: &mut Cursor<'src>,
        repr: &mut StructRepr,
        docs: Vec<String>,
    ) -> Result<(), Message> {
        let (first_range, first) = cursor.scan_ident_or_type()?;

        let mut field = StructFieldRepr {
            base: Base::new(self.data.fresh_uid(), docs),
            name: String::new(),
            ty: String::new(),
            tag: String::new(),
            read: None,
            write: None,
            default_expr: None,
            embedded: false,
        };

        // An embedded field is a bare type: the first token is followed by
        // the end of the line, the end of the block, flags, or a tag.
        let mut probe = *cursor;
        let newline = probe.skip_whitespace();
        let embedded = newline
            || probe.is_empty()
            || probe.starts_with("--")
            || matches!(probe.rest().as_bytes().first(), Some(b'"' | b'`'));

        if embedded {
            field.embedded = true;
            field.ty = first;

            match cursor.scan_quoted(false)? {
                (Some(quoted), false) => field.tag = quoted.value.to_owned(),
                (Some(quoted), true) => {
                    return Err(ParseMessage::TagOnNextLine {
                        range: quoted.range,
                    }
                    .into())
                }
                (None, _) => {}
            }

            let (flags, _) = lexer::gather_flags(cursor, true)?;
            for flag in &flags {
                match flag.name {
                    "default_expr" => field.default_expr = Some(flag.non_empty()?.to_owned()),
                    "read" | "write" => {
                        return Err(ParseMessage::FlagNotAllowedOnEmbedded {
                            flag: flag.name.to_owned(),
                            range: flag.range,
                        }
                        .into())
                    }
                    _ => append_tag(&mut field.tag, &self.flag_text(flag)),
                }
            }
        } else {
            if !lexer::is_ident(&first) {
                return Err(ParseMessage::ExpectedSpaceAndName {
                    directive: "struct",
                    range: first_range,
                }
                .into());
            }
            field.name = first;
            let (_, ty) = cursor.scan_type()?;
            field.ty = ty;

            match cursor.scan_quoted(false)? {
                (Some(quoted), false) => field.tag = quoted.value.to_owned(),
                (Some(quoted), true) => {
                    return Err(ParseMessage::TagOnNextLine {
                        range: quoted.range,
                    }
                    .into())
                }
                (None, _) => {}
            }

            // Accessor flags track whether an explicit name was given:
            // `--read` alone borrows the field name, `--read=Name` sets it.
            let mut read: Option<Option<String>> = None;
            let mut write: Option<Option<String>> = None;

            let (flags, _) = lexer::gather_flags(cursor, true)?;
            for flag in &flags {
                match flag.name {
                    "read" => {
                        read = Some(match flag.has_value {
                            true => Some(flag.ident()?.to_owned()),
                            false => None,
                        });
                    }
                    "write" => {
                        write = Some(match flag.has_value {
                            true => Some(flag.ident()?.to_owned()),
                            false => None,
                        });
                    }
                    "default_expr" => field.default_expr = Some(flag.non_empty()?.to_owned()),
                    _ => append_tag(&mut field.tag, &self.flag_text(flag)),
                }
            }

            if read.is_some() && write.is_some() {
                for (accessor, name) in [("read", &read), ("write", &write)] {
                    if let Some(Some(name)) = name {
                        if *name == field.name {
                            return Err(ParseMessage::AccessorNameConflict {
                                accessor,
                                name: name.clone(),
                                range: first_range,
                            }
                            .into());
                        }
                    }
                }
            }

            field.read = read.map(|name| name.unwrap_or_else(|| field.name.clone()));
            field.write = write.map(|name| {
                name.unwrap_or_else(|| format!("Set{}", capitalize_first(&field.name)))
            });

            for (accessor, name) in [("read", &field.read), ("write", &field.write)] {
                if let Some(name) = name {
                    let exported = (name.chars().next()).map_or(false, char::is_uppercase);
                    if !exported {
                        self.messages.push(
                            ParseMessage::NonExportedAccessor {
                                accessor,
                                name: name.clone(),
                                range: first_range,
                            }
                            .into(),
                        );
                    }
                }
            }
        }

        repr.fields.push(field);
        Ok(())
    }

    fn parse_struct_defaults(&mut self, cursor: &mut Cursor<'src>) -> Result<(), Message> {
        let (flags, _) = lexer::gather_flags(cursor, true)?;

        let mut opts = self.defaults.structs.clone();
        for flag in &flags {
            self.struct_flag(&mut opts, None, flag, None)?;
        }
        self.defaults.structs = opts;
        Ok(())
    }

    fn parse_union(&mut self, cursor: &mut Cursor<'src>, docs: Vec<String>) -> Result<(), Message> {
        let (_, name) = self.descriptor_name(cursor, Directive::Union)?;
        let name = name.to_owned();

        let mut repr = UnionRepr {
            base: Base::new(self.data.fresh_uid(), docs),
            name: name.clone(),
            opts: self.defaults.unions.clone(),
            members: Vec::new(),
        };

        self.union_body(cursor, &mut repr)
            .map_err(|message| Message::InDescriptor {
                directive: "union",
                name,
                message: Box::new(message),
            })?;

        self.data.unions.push(repr);
        Ok(())
    }

    fn union_body(
        &mut self,
        cursor: &mut Cursor<'src>,
        repr: &mut UnionRepr,
    ) -> Result<(), Message> {
        // Unions take no flags at all.
        let (flags, _) = lexer::gather_flags(cursor, false)?;
        if let Some(flag) = flags.first() {
            return Err(self.unknown_flag(flag, &[]).into());
        }

        let mut doc_lines = Vec::new();
        loop {
            cursor.skip_whitespace();
            if cursor.is_empty() || Directive::lookup(cursor.rest()).is_some() {
                break;
            }
            if cursor.starts_with("//") {
                cursor.bump(2);
                doc_lines.push(cursor.scan_line().to_owned());
                continue;
            }

            let (range, ty) = cursor.scan_type()?;

            let mut probe = *cursor;
            let newline = probe.skip_whitespace();
            if !newline && !probe.is_empty() && !probe.starts_with("--") {
                return Err(ParseMessage::NamedUnionMember { range }.into());
            }

            let (flags, _) = lexer::gather_flags(cursor, true)?;
            if let Some(flag) = flags.first() {
                return Err(ParseMessage::UnionMemberFlag {
                    flag: flag.name.to_owned(),
                    range: flag.range,
                }
                .into());
            }

            repr.members.push(UnionMemberRepr {
                base: Base::new(self.data.fresh_uid(), std::mem::take(&mut doc_lines)),
                ty,
            });
        }

        if repr.members.is_empty() {
            return Err(ParseMessage::EmptyDescriptor {
                directive: "union",
                what: "member",
                range: cursor.caret(),
            }
            .into());
        }
        Ok(())
    }

    fn parse_union_defaults(&mut self, cursor: &mut Cursor<'src>) -> Result<(), Message> {
        let (flags, _) = lexer::gather_flags(cursor, true)?;
        if let Some(flag) = flags.first() {
            return Err(self.unknown_flag(flag, &[]).into());
        }
        Ok(())
    }
}

fn marshal_mode(flag: &Flag<'_>) -> Result<bool, ParseMessage> {
    match flag.expect_value()? {
        "string" => Ok(true),
        "value" => Ok(false),
        value => Err(ParseMessage::InvalidMarshalMode {
            flag: flag.name.to_owned(),
            value: value.to_owned(),
            range: flag.range,
        }),
    }
}

fn append_tag(tag: &mut String, text: &str) {
    if !tag.is_empty() {
        tag.push(' ');
    }
    tag.push_str(text);
}

fn capitalize_first(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_uppercase().chain(chars).collect(),
    }
}
