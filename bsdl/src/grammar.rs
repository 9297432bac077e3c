//! Recursive-descent parser building an [`Entity`] from the token stream
//! produced by [`crate::lexer::lex`]. Two tokens of lookahead are available
//! via [`Parser::peek`]/[`Parser::peek2`], used to disambiguate constructs
//! like `END [ENTITY] [name] ;` and `ATTRIBUTE x OF y : entity|signal|T IS`.

use crate::ast::*;
use crate::error::{Error, Result};
use crate::lexer::{lex, LineIndex, Tok};
use compact_str::CompactString;

pub struct Parser<'a> {
    src: &'a [u8],
    toks: Vec<(Tok, usize)>,
    pos: usize,
    lines: LineIndex,
}

impl<'a> Parser<'a> {
    pub fn new(src: &'a [u8]) -> Result<Self> {
        let lines = LineIndex::new(src);
        let toks = lex(src).map_err(|e| {
            let (line, col) = lines.resolve(e.offset);
            Error::Lex { line, col }
        })?;
        Ok(Parser {
            src,
            toks,
            pos: 0,
            lines,
        })
    }

    fn cur(&self) -> &Tok {
        &self.toks[self.pos].0
    }

    fn cur_offset(&self) -> usize {
        self.toks[self.pos].1
    }

    fn peek2(&self) -> &Tok {
        &self.toks[(self.pos + 1).min(self.toks.len() - 1)].0
    }

    fn bump(&mut self) -> Tok {
        let t = self.toks[self.pos].0.clone();
        if self.pos + 1 < self.toks.len() {
            self.pos += 1;
        }
        t
    }

    fn err_unexpected(&self, expected: &str) -> Error {
        let (line, col) = self.lines.resolve(self.cur_offset());
        Error::Parse {
            line,
            col,
            found: self.cur().describe(),
            expected: expected.to_string(),
        }
    }

    fn expect(&mut self, expected: &Tok, name: &str) -> Result<()> {
        if self.cur() == expected {
            self.bump();
            Ok(())
        } else {
            Err(self.err_unexpected(name))
        }
    }

    fn expect_ident(&mut self) -> Result<CompactString> {
        match self.cur().clone() {
            Tok::Ident(s) => {
                self.bump();
                Ok(s)
            }
            _ => Err(self.err_unexpected("identifier")),
        }
    }

    /// Captures the exact source text of a balanced `( ... )` group,
    /// including the parens, without interpreting its contents. Used for
    /// array-range type suffixes like `BIT_VECTOR (7 downto 0)`.
    fn skip_balanced_parens(&mut self) -> Result<&'a str> {
        let start = self.cur_offset();
        self.expect(&Tok::LParen, "`(`")?;
        let mut depth = 1usize;
        loop {
            match self.cur().clone() {
                Tok::LParen => {
                    depth += 1;
                    self.bump();
                }
                Tok::RParen => {
                    depth -= 1;
                    self.bump();
                    if depth == 0 {
                        break;
                    }
                }
                Tok::Eof => return Err(self.err_unexpected("`)`")),
                _ => {
                    self.bump();
                }
            }
        }
        let end = self.cur_offset();
        Ok(std::str::from_utf8(&self.src[start..end]).unwrap_or("").trim())
    }

    fn parse_type(&mut self) -> Result<CompactString> {
        let base = match self.cur().clone() {
            Tok::KwBit => {
                self.bump();
                "BIT".to_string()
            }
            Tok::KwBitVector => {
                self.bump();
                "BIT_VECTOR".to_string()
            }
            Tok::KwString => {
                self.bump();
                "STRING".to_string()
            }
            Tok::KwInteger => {
                self.bump();
                "INTEGER".to_string()
            }
            Tok::KwReal => {
                self.bump();
                "REAL".to_string()
            }
            Tok::KwBoolean => {
                self.bump();
                "BOOLEAN".to_string()
            }
            Tok::Ident(s) => {
                self.bump();
                s.to_string()
            }
            _ => return Err(self.err_unexpected("type name")),
        };
        if *self.cur() == Tok::LParen {
            let range = self.skip_balanced_parens()?;
            Ok(CompactString::from(format!("{}{}", base, range)))
        } else {
            Ok(CompactString::from(base))
        }
    }

    fn parse_term(&mut self) -> Result<Term> {
        match self.cur().clone() {
            Tok::Str { text, .. } => {
                self.bump();
                Ok(Term::Str(text))
            }
            Tok::BitStr { radix, digits } => {
                self.bump();
                Ok(Term::BitString { radix, digits })
            }
            Tok::Integer(i) => {
                self.bump();
                Ok(Term::Integer(i))
            }
            Tok::Real(r) => {
                self.bump();
                Ok(Term::Real(r))
            }
            Tok::KwTrue => {
                self.bump();
                Ok(Term::Bool(true))
            }
            Tok::KwFalse => {
                self.bump();
                Ok(Term::Bool(false))
            }
            Tok::Ident(s) => {
                self.bump();
                Ok(Term::Ident(s))
            }
            Tok::LParen => {
                self.bump();
                let mut items = vec![self.parse_expression()?];
                while *self.cur() == Tok::Comma {
                    self.bump();
                    items.push(self.parse_expression()?);
                }
                self.expect(&Tok::RParen, "`)`")?;
                Ok(Term::Tuple(items))
            }
            _ => Err(self.err_unexpected("expression term")),
        }
    }

    fn parse_expression(&mut self) -> Result<Expression> {
        let mut terms = vec![self.parse_term()?];
        while *self.cur() == Tok::Amp {
            self.bump();
            terms.push(self.parse_term()?);
        }
        Ok(Expression(terms))
    }

    fn parse_generics(&mut self) -> Result<Vec<GenericItem>> {
        if *self.cur() != Tok::KwGeneric {
            return Ok(Vec::new());
        }
        self.bump();
        self.expect(&Tok::LParen, "`(`")?;
        let mut items = Vec::new();
        loop {
            let name = self.expect_ident()?;
            self.expect(&Tok::Colon, "`:`")?;
            let typ = self.parse_type()?;
            let default = if *self.cur() == Tok::Assign {
                self.bump();
                Some(self.parse_expression()?)
            } else {
                None
            };
            items.push(GenericItem { name, typ, default });
            if *self.cur() == Tok::Semicolon {
                self.bump();
                continue;
            }
            break;
        }
        self.expect(&Tok::RParen, "`)`")?;
        self.expect(&Tok::Semicolon, "`;`")?;
        Ok(items)
    }

    fn parse_ports(&mut self) -> Result<Vec<PortItem>> {
        if *self.cur() != Tok::KwPort {
            return Ok(Vec::new());
        }
        self.bump();
        self.expect(&Tok::LParen, "`(`")?;
        let mut items = Vec::new();
        loop {
            let mut names = vec![self.expect_ident()?];
            while *self.cur() == Tok::Comma {
                self.bump();
                names.push(self.expect_ident()?);
            }
            self.expect(&Tok::Colon, "`:`")?;
            let mode = match self.cur().clone() {
                Tok::KwIn => {
                    self.bump();
                    PortMode::In
                }
                Tok::KwOut => {
                    self.bump();
                    PortMode::Out
                }
                Tok::KwInout => {
                    self.bump();
                    PortMode::InOut
                }
                Tok::KwBuffer => {
                    self.bump();
                    PortMode::Buffer
                }
                Tok::KwLinkage => {
                    self.bump();
                    PortMode::Linkage
                }
                _ => return Err(self.err_unexpected("port mode (in/out/inout/buffer/linkage)")),
            };
            let typ = self.parse_type()?;
            for name in names {
                items.push(PortItem {
                    name,
                    mode,
                    typ: typ.clone(),
                });
            }
            if *self.cur() == Tok::Semicolon {
                // could be separator before the next port item, or a
                // trailing semicolon right before `)`.
                if self.peek2() == &Tok::RParen {
                    self.bump();
                    break;
                }
                self.bump();
                continue;
            }
            break;
        }
        self.expect(&Tok::RParen, "`)`")?;
        self.expect(&Tok::Semicolon, "`;`")?;
        Ok(items)
    }

    fn parse_use(&mut self) -> Result<Decl> {
        self.bump(); // USE
        let mut path = self.expect_ident()?.to_string();
        while *self.cur() == Tok::Dot {
            self.bump();
            if *self.cur() == Tok::KwAll {
                self.bump();
                path.push_str(".ALL");
            } else {
                path.push('.');
                path.push_str(&self.expect_ident()?);
            }
        }
        self.expect(&Tok::Semicolon, "`;`")?;
        Ok(Decl::Use(CompactString::from(path)))
    }

    fn parse_attribute(&mut self) -> Result<Decl> {
        self.bump(); // ATTRIBUTE
        let name = self.expect_ident()?;
        self.expect(&Tok::KwOf, "`OF`")?;
        let target = self.expect_ident()?;
        self.expect(&Tok::Colon, "`:`")?;
        let target_kind = match self.cur().clone() {
            Tok::KwEntity => {
                self.bump();
                TargetKind::Entity
            }
            Tok::Ident(s) if s.eq_ignore_ascii_case("signal") => {
                self.bump();
                TargetKind::Signal
            }
            Tok::KwConstant => {
                self.bump();
                TargetKind::Constant
            }
            _ => return Err(self.err_unexpected("`entity`, `signal`, or `constant`")),
        };
        self.expect(&Tok::KwIs, "`IS`")?;
        let value = self.parse_expression()?;
        self.expect(&Tok::Semicolon, "`;`")?;
        Ok(Decl::Attribute(AttributeSpec {
            name,
            target,
            target_kind,
            value,
        }))
    }

    fn parse_constant(&mut self) -> Result<Decl> {
        self.bump(); // CONSTANT
        let name = self.expect_ident()?;
        self.expect(&Tok::Colon, "`:`")?;
        let typ = self.expect_ident()?;
        self.expect(&Tok::Assign, "`:=`")?;
        let value = self.parse_expression()?;
        self.expect(&Tok::Semicolon, "`;`")?;
        Ok(Decl::Constant(ConstantAttribute { name, typ, value }))
    }

    fn parse_decls(&mut self) -> Result<Vec<Decl>> {
        let mut decls = Vec::new();
        loop {
            match self.cur() {
                Tok::KwUse => decls.push(self.parse_use()?),
                Tok::KwAttribute => decls.push(self.parse_attribute()?),
                Tok::KwConstant => decls.push(self.parse_constant()?),
                _ => break,
            }
        }
        Ok(decls)
    }

    pub fn parse_entity(&mut self) -> Result<Entity> {
        self.expect(&Tok::KwEntity, "`ENTITY`")?;
        let name = self.expect_ident()?;
        self.expect(&Tok::KwIs, "`IS`")?;
        let generics = self.parse_generics()?;
        let ports = self.parse_ports()?;
        let decls = self.parse_decls()?;
        self.expect(&Tok::KwEnd, "`END`")?;
        if *self.cur() == Tok::KwEntity {
            self.bump();
        }
        if let Tok::Ident(end_name) = self.cur().clone() {
            if end_name != name {
                return Err(self.err_unexpected(&format!("entity name `{}`", name)));
            }
            self.bump();
        }
        self.expect(&Tok::Semicolon, "`;`")?;
        if *self.cur() != Tok::Eof {
            return Err(self.err_unexpected("end of file"));
        }
        Ok(Entity {
            name,
            generics,
            ports,
            decls,
        })
    }
}

pub fn parse_entity(src: &[u8]) -> Result<Entity> {
    Parser::new(src)?.parse_entity()
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        entity FOO is
            generic (PHYSICAL_PIN_MAP : string := "LQFP64");
            port (TCK: in bit; TDO: out bit);

            attribute PIN_MAP of FOO : entity is "LQFP64";
            constant LQFP64 : PIN_MAP_STRING :=
                "TCK:5," &
                "TDO:6";
        end FOO;
    "#;

    #[test]
    fn parses_minimal_entity() {
        let e = parse_entity(MINIMAL.as_bytes()).unwrap();
        assert_eq!(e.name, "FOO");
        assert_eq!(e.generics.len(), 1);
        assert_eq!(e.ports.len(), 2);
        assert_eq!(e.decls.len(), 2);
    }

    #[test]
    fn end_name_mismatch_is_rejected() {
        let src = "entity A is end B;";
        let err = parse_entity(src.as_bytes()).unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
    }

    #[test]
    fn end_without_repeated_name_is_accepted() {
        let src = "entity A is end entity;";
        assert!(parse_entity(src.as_bytes()).is_ok());
    }

    #[test]
    fn reports_line_and_column_on_error() {
        let src = "entity A\nis\nbogus";
        let err = parse_entity(src.as_bytes()).unwrap_err();
        match err {
            Error::Parse { line, .. } => assert_eq!(line, 3),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn concatenated_expression_joins_terms() {
        let e = parse_entity(MINIMAL.as_bytes()).unwrap();
        let Decl::Constant(c) = &e.decls[1] else { panic!() };
        assert_eq!(c.value.concat_text(), "TCK:5,TDO:6");
    }
}
