//! BSDL abstract syntax tree, as produced by [`crate::grammar::parse_entity`].

use compact_str::CompactString;

#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub name: CompactString,
    pub generics: Vec<GenericItem>,
    pub ports: Vec<PortItem>,
    pub decls: Vec<Decl>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenericItem {
    pub name: CompactString,
    pub typ: CompactString,
    pub default: Option<Expression>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortMode {
    In,
    Out,
    InOut,
    Buffer,
    Linkage,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PortItem {
    pub name: CompactString,
    pub mode: PortMode,
    pub typ: CompactString,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Decl {
    Use(CompactString),
    Attribute(AttributeSpec),
    Constant(ConstantAttribute),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    Entity,
    Signal,
    Constant,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttributeSpec {
    pub name: CompactString,
    pub target: CompactString,
    pub target_kind: TargetKind,
    pub value: Expression,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConstantAttribute {
    pub name: CompactString,
    pub typ: CompactString,
    pub value: Expression,
}

/// A sequence of terms joined by `&` (string concatenation).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Expression(pub Vec<Term>);

#[derive(Debug, Clone, PartialEq)]
pub enum Term {
    Str(CompactString),
    BitString { radix: char, digits: CompactString },
    Integer(i64),
    Real(f64),
    Bool(bool),
    Ident(CompactString),
    /// A parenthesized, comma-separated list of sub-expressions, e.g. the
    /// `(30.0e6, BOTH)` tuple of `TAP_SCAN_CLOCK`.
    Tuple(Vec<Expression>),
}

impl Expression {
    /// Concatenate every string-like term's textual content. Used for
    /// attributes whose value is meant to be read as one long string, e.g.
    /// `IDCODE_REGISTER`, `INSTRUCTION_OPCODE`, `BOUNDARY_REGISTER`, and any
    /// `PIN_MAP_STRING`-typed constant.
    pub fn concat_text(&self) -> CompactString {
        let mut out = CompactString::default();
        for term in &self.0 {
            match term {
                Term::Str(s) => out.push_str(s),
                Term::BitString { digits, .. } => out.push_str(digits),
                Term::Ident(s) => out.push_str(s),
                Term::Integer(i) => out.push_str(&i.to_string()),
                Term::Real(r) => out.push_str(&r.to_string()),
                Term::Bool(b) => out.push_str(if *b { "TRUE" } else { "FALSE" }),
                Term::Tuple(_) => {}
            }
        }
        out
    }

    /// The single tuple term of this expression, if it consists of exactly
    /// one `Term::Tuple`. Used for `TAP_SCAN_CLOCK`.
    pub fn as_tuple(&self) -> Option<&[Expression]> {
        match self.0.as_slice() {
            [Term::Tuple(items)] => Some(items),
            _ => None,
        }
    }
}
