//! The core representation of parsed descriptors.
//!
//! Surface parsing lowers each `@enum`, `@struct` and `@union` block into
//! the descriptor types defined here. Descriptors are fully resolved: flag
//! defaults have been applied, variant values assigned, and accessor names
//! filled in, so a code generator can consume them without consulting the
//! source text again.

use fxhash::FxHashSet;

pub mod pretty;

/// State shared by every descriptor and field: its doc comment lines and a
/// file-unique id used to derive collision-free helper names.
#[derive(Debug, Clone, Default)]
pub struct Base {
    uid: u64,
    pub doc_lines: Vec<String>,
}

impl Base {
    pub fn new(uid: u64, doc_lines: Vec<String>) -> Base {
        Base { uid, doc_lines }
    }

    /// The unique id rendered in base 36, as used in generated names.
    pub fn unique_suffix(&self) -> String {
        const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
        let mut n = self.uid;
        let mut out = Vec::new();
        loop {
            out.push(DIGITS[(n % 36) as usize] as char);
            n /= 36;
            if n == 0 {
                break;
            }
        }
        out.iter().rev().collect()
    }
}

/// The integer type backing an enum.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum IntWidth {
    U8,
    U16,
    U32,
    U64,
}

impl IntWidth {
    pub const fn name(&self) -> &'static str {
        match self {
            IntWidth::U8 => "uint8",
            IntWidth::U16 => "uint16",
            IntWidth::U32 => "uint32",
            IntWidth::U64 => "uint64",
        }
    }
}

/// Enum-level options, also usable as a defaults prototype.
#[derive(Debug, Clone)]
pub struct EnumDefaults {
    pub flag_separator: String,
    pub iterator_name: String,
    pub bitflag_mode: bool,
    pub summary: bool,
    pub json_marshal_string: bool,
    pub json_unmarshal_string: bool,
    pub drop_json: bool,
}

impl Default for EnumDefaults {
    fn default() -> EnumDefaults {
        EnumDefaults {
            flag_separator: String::new(),
            iterator_name: "Values".to_owned(),
            bitflag_mode: false,
            summary: false,
            json_marshal_string: false,
            json_unmarshal_string: false,
            drop_json: false,
        }
    }
}

/// A resolved `@enum` descriptor.
#[derive(Debug, Clone)]
pub struct EnumRepr {
    pub base: Base,
    pub name: String,
    pub opts: EnumDefaults,
    pub fields: Vec<EnumFieldRepr>,
    pub has_default_variant: bool,
    /// Unrecognized flags, preserved verbatim for downstream tooling.
    pub passthrough: Vec<String>,
}

impl EnumRepr {
    pub fn is_bitflag(&self) -> bool {
        self.opts.bitflag_mode
    }

    pub fn do_json(&self) -> bool {
        !self.opts.drop_json
    }

    pub fn do_summary(&self) -> bool {
        self.opts.summary
    }

    pub fn iterator_name(&self) -> &str {
        &self.opts.iterator_name
    }

    pub fn flag_separator(&self) -> &str {
        &self.opts.flag_separator
    }

    /// The name of the generated value field, unique per enum.
    pub fn unique_name(&self) -> String {
        format!("value_{}", self.base.unique_suffix())
    }

    /// The narrowest unsigned integer type that can hold every variant.
    ///
    /// Bitflag enums need one bit per variant, so the width follows the
    /// variant count; plain enums follow the largest assigned value.
    pub fn int_width(&self) -> IntWidth {
        if self.is_bitflag() {
            match self.fields.len() {
                0..=8 => IntWidth::U8,
                9..=16 => IntWidth::U16,
                17..=32 => IntWidth::U32,
                _ => IntWidth::U64,
            }
        } else {
            let max = self.fields.iter().map(|field| field.value).max();
            match max.unwrap_or(0) {
                0..=0xff => IntWidth::U8,
                0x100..=0xffff => IntWidth::U16,
                0x1_0000..=0xffff_ffff => IntWidth::U32,
                _ => IntWidth::U64,
            }
        }
    }
}

/// A single enum variant.
#[derive(Debug, Clone)]
pub struct EnumFieldRepr {
    pub base: Base,
    pub name: String,
    /// The string representation, defaulting to the variant name.
    pub display: String,
    /// The long description, defaulting to the string representation.
    pub description: String,
    pub value: u64,
    pub is_default: bool,
    pub has_explicit_value: bool,
    pub passthrough: Vec<String>,
}

/// Struct-level options, also usable as a defaults prototype.
#[derive(Debug, Clone, Default)]
pub struct StructDefaults {
    pub drop_json: bool,
    pub drop_ctor: bool,
}

/// A resolved `@struct` descriptor.
#[derive(Debug, Clone)]
pub struct StructRepr {
    pub base: Base,
    pub name: String,
    pub opts: StructDefaults,
    /// Explicit constructor name from `--ctor_name`, if any.
    pub ctor_name: Option<String>,
    pub fields: Vec<StructFieldRepr>,
    pub passthrough: Vec<String>,
}

impl StructRepr {
    pub fn do_json(&self) -> bool {
        !self.opts.drop_json
    }

    pub fn do_ctor(&self) -> bool {
        !self.opts.drop_ctor
    }

    pub fn ctor_name(&self) -> String {
        match &self.ctor_name {
            Some(name) => name.clone(),
            None => format!("New{}", capitalize(&self.name)),
        }
    }

    /// The name of the generated private mirror type.
    pub fn private_type_name(&self) -> String {
        format!("private_{}", self.base.unique_suffix())
    }

    /// The name of the generated JSON shadow type.
    pub fn json_type_name(&self) -> String {
        format!("json_{}", self.base.unique_suffix())
    }
}

/// A struct field, either named or embedded.
#[derive(Debug, Clone)]
pub struct StructFieldRepr {
    pub base: Base,
    /// Empty for embedded fields.
    pub name: String,
    pub ty: String,
    /// The field tag, including any unrecognized flags appended verbatim.
    pub tag: String,
    pub read: Option<String>,
    pub write: Option<String>,
    pub default_expr: Option<String>,
    pub embedded: bool,
}

impl StructFieldRepr {
    /// The name the field is addressed by: its own name, or for embedded
    /// fields the type name without any pointer marker.
    pub fn name_maybe_type(&self) -> &str {
        if self.embedded {
            self.ty.trim_start_matches('*')
        } else {
            &self.name
        }
    }

    pub fn is_public(&self) -> bool {
        (self.name_maybe_type().chars().next()).map_or(false, char::is_uppercase)
    }
}

/// Union-level options. Unions accept no flags, but the prototype keeps the
/// defaults machinery uniform across the three descriptor kinds.
#[derive(Debug, Clone, Default)]
pub struct UnionDefaults {}

/// A resolved `@union` descriptor.
#[derive(Debug, Clone)]
pub struct UnionRepr {
    pub base: Base,
    pub name: String,
    pub opts: UnionDefaults,
    pub members: Vec<UnionMemberRepr>,
}

impl UnionRepr {
    /// The name of the generated marker method, unique per union.
    pub fn unique_method_name(&self) -> String {
        format!("{}_union_{}", self.name, self.base.unique_suffix())
    }
}

/// A union member: always an embedded type.
#[derive(Debug, Clone)]
pub struct UnionMemberRepr {
    pub base: Base,
    pub ty: String,
}

impl UnionMemberRepr {
    pub fn type_name(&self) -> &str {
        self.ty.trim_start_matches('*')
    }
}

/// The per-file defaults prototypes, cloned into each new descriptor.
#[derive(Debug, Clone, Default)]
pub struct Defaults {
    pub enums: EnumDefaults,
    pub structs: StructDefaults,
    pub unions: UnionDefaults,
}

/// Everything compiled from one source file.
#[derive(Debug, Clone)]
pub struct FileData {
    pub package_name: String,
    pub enums: Vec<EnumRepr>,
    pub structs: Vec<StructRepr>,
    pub unions: Vec<UnionRepr>,
    pub imports: FxHashSet<String>,
    next_uid: u64,
}

impl FileData {
    pub fn new(package_name: impl Into<String>) -> FileData {
        FileData {
            package_name: package_name.into(),
            enums: Vec::new(),
            structs: Vec::new(),
            unions: Vec::new(),
            imports: FxHashSet::default(),
            next_uid: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.enums.is_empty() && self.structs.is_empty() && self.unions.is_empty()
    }

    pub fn fresh_uid(&mut self) -> u64 {
        let uid = self.next_uid;
        self.next_uid += 1;
        uid
    }

    /// Record the imports the generated output for this file will need.
    pub fn gather_imports(&mut self) {
        if !self.enums.is_empty() {
            self.imports.insert("strconv".to_owned());
            if (self.enums.iter()).any(|repr| repr.do_json() && repr.opts.json_unmarshal_string) {
                self.imports.insert("log".to_owned());
            }
            if self.enums.iter().any(EnumRepr::is_bitflag) {
                self.imports.insert("strings".to_owned());
            }
        }
        if self.structs.iter().any(StructRepr::do_json) {
            self.imports.insert("encoding/json".to_owned());
        }
    }
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_uppercase().chain(chars).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enum_repr(bitflag: bool, values: &[u64]) -> EnumRepr {
        EnumRepr {
            base: Base::default(),
            name: "Test".to_owned(),
            opts: EnumDefaults {
                bitflag_mode: bitflag,
                ..EnumDefaults::default()
            },
            fields: (values.iter().enumerate())
                .map(|(index, &value)| EnumFieldRepr {
                    base: Base::default(),
                    name: format!("V{index}"),
                    display: format!("V{index}"),
                    description: format!("V{index}"),
                    value,
                    is_default: false,
                    has_explicit_value: false,
                    passthrough: Vec::new(),
                })
                .collect(),
            has_default_variant: false,
            passthrough: Vec::new(),
        }
    }

    #[test]
    fn int_width_plain_follows_max_value() {
        assert_eq!(enum_repr(false, &[1, 2, 3]).int_width(), IntWidth::U8);
        assert_eq!(enum_repr(false, &[1, 300]).int_width(), IntWidth::U16);
        assert_eq!(enum_repr(false, &[70_000]).int_width(), IntWidth::U32);
        assert_eq!(enum_repr(false, &[1 << 40]).int_width(), IntWidth::U64);
    }

    #[test]
    fn int_width_bitflag_follows_count() {
        let values: Vec<u64> = (0..9).map(|n| 1 << n).collect();
        assert_eq!(enum_repr(true, &values[..8]).int_width(), IntWidth::U8);
        assert_eq!(enum_repr(true, &values[..9]).int_width(), IntWidth::U16);
    }

    #[test]
    fn unique_suffix_is_base36() {
        assert_eq!(Base::new(0, Vec::new()).unique_suffix(), "0");
        assert_eq!(Base::new(35, Vec::new()).unique_suffix(), "z");
        assert_eq!(Base::new(36, Vec::new()).unique_suffix(), "10");
    }

    #[test]
    fn ctor_name_fallback() {
        let repr = StructRepr {
            base: Base::new(37, Vec::new()),
            name: "point".to_owned(),
            opts: StructDefaults::default(),
            ctor_name: None,
            fields: Vec::new(),
            passthrough: Vec::new(),
        };
        assert_eq!(repr.ctor_name(), "NewPoint");
        assert_eq!(repr.private_type_name(), "private_11");
        assert_eq!(repr.json_type_name(), "json_11");
    }

    #[test]
    fn generated_names_use_the_uid() {
        let repr = EnumRepr {
            base: Base::new(36, Vec::new()),
            ..enum_repr(false, &[1])
        };
        assert_eq!(repr.unique_name(), "value_10");

        let union = UnionRepr {
            base: Base::new(1, Vec::new()),
            name: "Shape".to_owned(),
            opts: UnionDefaults::default(),
            members: Vec::new(),
        };
        assert_eq!(union.unique_method_name(), "Shape_union_1");
    }

    #[test]
    fn embedded_field_visibility() {
        let field = |ty: &str, name: &str, embedded| StructFieldRepr {
            base: Base::default(),
            name: name.to_owned(),
            ty: ty.to_owned(),
            tag: String::new(),
            read: None,
            write: None,
            default_expr: None,
            embedded,
        };
        assert!(field("*Base", "", true).is_public());
        assert_eq!(field("*Base", "", true).name_maybe_type(), "Base");
        assert!(!field("int", "age", false).is_public());
        assert!(field("string", "Name", false).is_public());
    }

    #[test]
    fn imports_for_enums() {
        let mut data = FileData::new("demo");
        data.enums.push(enum_repr(true, &[1, 2]));
        data.gather_imports();
        assert!(data.imports.contains("strconv"));
        assert!(data.imports.contains("strings"));
        assert!(!data.imports.contains("log"));
    }
}
