//! A pretty printer for compiled descriptors.
//!
//! This is mainly intended for inspecting what the parser resolved: applied
//! defaults, assigned variant values, accessor names and gathered imports.

use itertools::Itertools;
use pretty::RcDoc;

use crate::core::{EnumFieldRepr, EnumRepr, FileData, StructFieldRepr, StructRepr, UnionRepr};

const INDENT: isize = 4;

pub struct Context {}

impl Context {
    pub fn new() -> Context {
        Context {}
    }

    pub fn file_data<'doc>(&self, data: &'doc FileData) -> RcDoc<'doc> {
        let header = RcDoc::concat([
            RcDoc::text("package"),
            RcDoc::space(),
            RcDoc::text(data.package_name.clone()),
            RcDoc::hardline(),
        ]);

        let imports = if data.imports.is_empty() {
            RcDoc::nil()
        } else {
            RcDoc::concat([
                RcDoc::hardline(),
                RcDoc::text("import ("),
                RcDoc::concat((data.imports.iter().sorted()).map(|import| {
                    RcDoc::concat([
                        RcDoc::hardline(),
                        RcDoc::text(format!("{import:?}")),
                    ])
                }))
                .nest(INDENT),
                RcDoc::hardline(),
                RcDoc::text(")"),
                RcDoc::hardline(),
            ])
        };

        RcDoc::concat([
            header,
            imports,
            RcDoc::concat((data.enums.iter()).map(|repr| self.enum_repr(repr))),
            RcDoc::concat((data.structs.iter()).map(|repr| self.struct_repr(repr))),
            RcDoc::concat((data.unions.iter()).map(|repr| self.union_repr(repr))),
        ])
    }

    fn doc_lines<'doc>(&self, lines: &'doc [String]) -> RcDoc<'doc> {
        RcDoc::concat(lines.iter().map(|line| {
            RcDoc::concat([
                RcDoc::text("// "),
                RcDoc::text(line.as_str()),
                RcDoc::hardline(),
            ])
        }))
    }

    pub fn enum_repr<'doc>(&self, repr: &'doc EnumRepr) -> RcDoc<'doc> {
        let mut opts = Vec::new();
        if repr.is_bitflag() {
            opts.push(format!("bitflags(sep = {:?})", repr.flag_separator()));
        }
        if repr.do_summary() {
            opts.push("summary".to_owned());
        }
        if repr.do_json() {
            opts.push(format!(
                "json(marshal = {}, unmarshal = {})",
                marshal_mode(repr.opts.json_marshal_string),
                marshal_mode(repr.opts.json_unmarshal_string),
            ));
        }
        opts.extend(repr.passthrough.iter().cloned());

        RcDoc::concat([
            RcDoc::hardline(),
            self.doc_lines(&repr.base.doc_lines),
            RcDoc::text("enum"),
            RcDoc::space(),
            RcDoc::text(repr.name.as_str()),
            RcDoc::space(),
            RcDoc::text(":"),
            RcDoc::space(),
            RcDoc::text(repr.int_width().name()),
            match opts.is_empty() {
                true => RcDoc::nil(),
                false => RcDoc::text(format!(" [{}]", opts.join(", "))),
            },
            RcDoc::space(),
            RcDoc::text("{"),
            RcDoc::concat(
                (repr.fields.iter()).map(|field| self.enum_field(field).nest(INDENT)),
            ),
            RcDoc::hardline(),
            RcDoc::text("}"),
            RcDoc::hardline(),
        ])
    }

    fn enum_field<'doc>(&self, field: &'doc EnumFieldRepr) -> RcDoc<'doc> {
        RcDoc::concat([
            RcDoc::hardline(),
            self.doc_lines(&field.base.doc_lines),
            RcDoc::text(field.name.as_str()),
            RcDoc::space(),
            RcDoc::text("="),
            RcDoc::space(),
            RcDoc::text(field.value.to_string()),
            match field.is_default {
                true => RcDoc::text(" (default)"),
                false => RcDoc::nil(),
            },
            RcDoc::text(format!(" {:?}", field.display)),
            match field.description == field.display {
                true => RcDoc::nil(),
                false => RcDoc::text(format!(" {:?}", field.description)),
            },
            match field.passthrough.is_empty() {
                true => RcDoc::nil(),
                false => RcDoc::text(format!(" [{}]", field.passthrough.join(" "))),
            },
            RcDoc::text(","),
        ])
        .group()
    }

    pub fn struct_repr<'doc>(&self, repr: &'doc StructRepr) -> RcDoc<'doc> {
        let mut opts = Vec::new();
        if repr.do_ctor() {
            opts.push(format!("ctor {}", repr.ctor_name()));
        }
        if repr.do_json() {
            opts.push("json".to_owned());
        }
        opts.extend(repr.passthrough.iter().cloned());

        RcDoc::concat([
            RcDoc::hardline(),
            self.doc_lines(&repr.base.doc_lines),
            RcDoc::text("struct"),
            RcDoc::space(),
            RcDoc::text(repr.name.as_str()),
            match opts.is_empty() {
                true => RcDoc::nil(),
                false => RcDoc::text(format!(" [{}]", opts.join(", "))),
            },
            RcDoc::space(),
            RcDoc::text("{"),
            RcDoc::concat(
                (repr.fields.iter()).map(|field| self.struct_field(field).nest(INDENT)),
            ),
            RcDoc::hardline(),
            RcDoc::text("}"),
            RcDoc::hardline(),
        ])
    }

    fn struct_field<'doc>(&self, field: &'doc StructFieldRepr) -> RcDoc<'doc> {
        let mut notes = Vec::new();
        if let Some(read) = &field.read {
            notes.push(format!("read {read}"));
        }
        if let Some(write) = &field.write {
            notes.push(format!("write {write}"));
        }
        if let Some(expr) = &field.default_expr {
            notes.push(format!("default {expr}"));
        }

        RcDoc::concat([
            RcDoc::hardline(),
            self.doc_lines(&field.base.doc_lines),
            match field.embedded {
                true => RcDoc::text("embed "),
                false => RcDoc::text(format!("{}: ", field.name)),
            },
            RcDoc::text(field.ty.as_str()),
            match field.tag.is_empty() {
                true => RcDoc::nil(),
                false => RcDoc::text(format!(" `{}`", field.tag)),
            },
            match notes.is_empty() {
                true => RcDoc::nil(),
                false => RcDoc::text(format!(" ({})", notes.join(", "))),
            },
            RcDoc::text(","),
        ])
        .group()
    }

    pub fn union_repr<'doc>(&self, repr: &'doc UnionRepr) -> RcDoc<'doc> {
        RcDoc::concat([
            RcDoc::hardline(),
            self.doc_lines(&repr.base.doc_lines),
            RcDoc::text("union"),
            RcDoc::space(),
            RcDoc::text(repr.name.as_str()),
            RcDoc::space(),
            RcDoc::text("{"),
            RcDoc::concat((repr.members.iter()).map(|member| {
                RcDoc::concat([
                    RcDoc::hardline(),
                    self.doc_lines(&member.base.doc_lines),
                    RcDoc::text(member.ty.as_str()),
                    RcDoc::text(","),
                ])
                .nest(INDENT)
            })),
            RcDoc::hardline(),
            RcDoc::text("}"),
            RcDoc::hardline(),
        ])
    }
}

impl Default for Context {
    fn default() -> Context {
        Context::new()
    }
}

fn marshal_mode(as_string: bool) -> &'static str {
    match as_string {
        true => "string",
        false => "value",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::parse;

    fn dump(source: &str) -> String {
        let mut context = parse::Context::new(0, source, "demo");
        context.parse_block(0..source.len());
        let (data, messages) = context.finish();
        assert!(messages.is_empty(), "unexpected messages: {messages:#?}");
        let output = Context::new().file_data(&data).pretty(80).to_string();
        output
    }

    #[test]
    fn enum_dump() {
        let output = dump("@enum Animal\nDog --string=\"doggy\"\nCat\n");
        assert!(output.contains("package demo"), "output: {output}");
        assert!(output.contains("enum Animal : uint8"), "output: {output}");
        assert!(output.contains("Dog = 1 \"doggy\""), "output: {output}");
        assert!(output.contains("\"strconv\""), "output: {output}");
    }

    #[test]
    fn struct_dump() {
        let output = dump("@struct Person\nName string `json:\"name\"` --read\n");
        assert!(output.contains("struct Person [ctor NewPerson, json]"));
        assert!(output.contains("Name: string `json:\"name\"` (read Name)"));
    }

    #[test]
    fn union_dump() {
        let output = dump("@union Shape\nCircle\n*Square\n");
        assert!(output.contains("union Shape {"));
        assert!(output.contains("*Square,"));
    }
}
