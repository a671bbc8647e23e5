//! Reader and writer for the object literals found in Tailwind config modules.
//!
//! Only plain data is interpreted. Anything else (function calls, member
//! access, arrow functions, template interpolation) is kept verbatim as
//! [`Literal::Raw`] so it survives a merge untouched.

use crate::{RegraphError, Result};

#[derive(Clone, Debug, PartialEq)]
pub enum Literal {
    Null,
    Bool(bool),
    Number(String),
    Str(String),
    Array(Vec<Literal>),
    Object(Vec<Member>),
    Raw(String),
}

#[derive(Clone, Debug, PartialEq)]
pub enum Member {
    Pair(String, Literal),
    Spread(String),
}

impl Literal {
    pub fn get(&self, key: &str) -> Option<&Literal> {
        let Literal::Object(members) = self else {
            return None;
        };

        members.iter().find_map(|member| match member {
            Member::Pair(k, v) if k == key => Some(v),
            _ => None,
        })
    }

    /// Returns the object stored under `key`, inserting an empty one when absent.
    /// `None` when `self` or the existing value is not an object literal.
    pub fn object_entry(&mut self, key: &str) -> Option<&mut Literal> {
        let Literal::Object(members) = self else {
            return None;
        };

        let index = members
            .iter()
            .position(|m| matches!(m, Member::Pair(k, _) if k == key));

        let index = match index {
            Some(index) => index,
            None => {
                members.push(Member::Pair(key.to_string(), Literal::Object(Vec::new())));
                members.len() - 1
            }
        };

        match &mut members[index] {
            Member::Pair(_, value @ Literal::Object(_)) => Some(value),
            _ => None,
        }
    }

    pub fn members_mut(&mut self) -> Option<&mut Vec<Member>> {
        match self {
            Literal::Object(members) => Some(members),
            _ => None,
        }
    }

    fn is_scalar(&self) -> bool {
        !matches!(self, Literal::Array(_) | Literal::Object(_))
    }
}

/// Parses `module.exports = {...}`, `export default {...}` (directly or via a
/// named `const`), or a bare object literal.
pub fn parse_config_module(source: &str) -> Result<Literal> {
    let mut parser = Parser::new(source);
    let start = locate_export(&mut parser)?;
    parser.pos = start;
    parser.skip_trivia()?;

    if parser.peek() != Some(b'{') {
        return Err(parser.error("expected an object literal after the export"));
    }

    parser.parse_object()
}

pub fn parse_literal(source: &str) -> Result<Literal> {
    let mut parser = Parser::new(source);
    parser.skip_trivia()?;
    let value = parser.parse_value()?;
    parser.skip_trivia()?;
    if parser.pos < parser.bytes.len() {
        return Err(parser.error("unexpected trailing input"));
    }
    Ok(value)
}

fn locate_export(parser: &mut Parser<'_>) -> Result<usize> {
    let src = parser.src;

    if let Some(idx) = src.find("module.exports") {
        parser.pos = idx + "module.exports".len();
        parser.skip_trivia()?;
        if parser.peek() != Some(b'=') {
            return Err(parser.error("expected `=` after module.exports"));
        }
        parser.pos += 1;
        return resolve_export_target(parser);
    }

    if let Some(idx) = src.find("export default") {
        parser.pos = idx + "export default".len();
        return resolve_export_target(parser);
    }

    parser.pos = 0;
    parser.skip_trivia()?;
    if parser.peek() == Some(b'{') {
        return Ok(parser.pos);
    }

    Err(parser.error("no exported config object found"))
}

fn resolve_export_target(parser: &mut Parser<'_>) -> Result<usize> {
    parser.skip_trivia()?;

    if parser.peek() == Some(b'{') {
        return Ok(parser.pos);
    }

    let name = parser.identifier();
    if name.is_empty() {
        return Err(parser.error("expected an object literal or identifier after the export"));
    }

    let src = parser.src;
    for keyword in ["const", "let", "var"] {
        let needle = format!("{} {}", keyword, name);
        let mut search_from = 0;

        while let Some(found) = src[search_from..].find(&needle) {
            let after = search_from + found + needle.len();
            let boundary = src[after..]
                .chars()
                .next()
                .map(|c| !is_ident_char(c))
                .unwrap_or(true);

            if boundary && let Some(eq) = src[after..].find('=') {
                parser.pos = after + eq + 1;
                parser.skip_trivia()?;
                if parser.peek() == Some(b'{') {
                    return Ok(parser.pos);
                }
            }

            search_from = after;
        }
    }

    Err(parser.error(&format!("could not find the object bound to `{}`", name)))
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$'
}

struct Parser<'s> {
    src: &'s str,
    bytes: &'s [u8],
    pos: usize,
}

impl<'s> Parser<'s> {
    fn new(src: &'s str) -> Self {
        Parser {
            src,
            bytes: src.as_bytes(),
            pos: 0,
        }
    }

    fn error(&self, reason: &str) -> RegraphError {
        RegraphError::TailwindParse {
            offset: self.pos,
            reason: reason.to_string(),
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn skip_trivia(&mut self) -> Result<()> {
        loop {
            match self.peek() {
                Some(b) if b.is_ascii_whitespace() => self.pos += 1,
                Some(b'/') if self.peek_at(1) == Some(b'/') => {
                    while let Some(b) = self.peek() {
                        if b == b'\n' {
                            break;
                        }
                        self.pos += 1;
                    }
                }
                Some(b'/') if self.peek_at(1) == Some(b'*') => {
                    match self.src[self.pos + 2..].find("*/") {
                        Some(end) => self.pos += 2 + end + 2,
                        None => return Err(self.error("unterminated comment")),
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn identifier(&mut self) -> &'s str {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if b.is_ascii_alphanumeric() || b == b'_' || b == b'$' {
                self.pos += 1;
            } else {
                break;
            }
        }
        &self.src[start..self.pos]
    }

    fn at_terminator(&mut self) -> Result<bool> {
        self.skip_trivia()?;
        Ok(matches!(
            self.peek(),
            None | Some(b',') | Some(b'}') | Some(b']') | Some(b';')
        ))
    }

    fn parse_value(&mut self) -> Result<Literal> {
        self.skip_trivia()?;
        let start = self.pos;

        let simple = match self.peek() {
            None => return Err(self.error("expected a value")),
            Some(b'{') => Some(self.parse_object()?),
            Some(b'[') => Some(self.parse_array()?),
            Some(b'"') | Some(b'\'') => Some(Literal::Str(self.parse_string()?)),
            Some(b'`') => self.parse_template()?.map(Literal::Str),
            Some(b) if b.is_ascii_digit() || b == b'-' || b == b'.' => self.parse_number(),
            Some(b) if b.is_ascii_alphabetic() || b == b'_' || b == b'$' => {
                match self.identifier() {
                    "true" => Some(Literal::Bool(true)),
                    "false" => Some(Literal::Bool(false)),
                    "null" | "undefined" => Some(Literal::Null),
                    _ => None,
                }
            }
            _ => None,
        };

        if let Some(value) = simple
            && self.at_terminator()?
        {
            return Ok(value);
        }

        self.pos = start;
        self.capture_raw()
    }

    fn parse_number(&mut self) -> Option<Literal> {
        let start = self.pos;
        if self.peek() == Some(b'-') {
            self.pos += 1;
        }

        let mut digits = 0;
        while let Some(b) = self.peek() {
            if b.is_ascii_digit() || b == b'.' || b == b'e' || b == b'E' || b == b'_' {
                if b.is_ascii_digit() {
                    digits += 1;
                }
                self.pos += 1;
            } else if (b == b'+' || b == b'-')
                && matches!(self.bytes.get(self.pos - 1), Some(b'e') | Some(b'E'))
            {
                self.pos += 1;
            } else {
                break;
            }
        }

        if digits == 0 {
            return None;
        }

        Some(Literal::Number(self.src[start..self.pos].to_string()))
    }

    fn parse_string(&mut self) -> Result<String> {
        let Some(quote) = self.peek() else {
            return Err(self.error("expected a string"));
        };
        self.pos += 1;

        let mut out = String::new();
        let mut chars = self.src[self.pos..].char_indices();

        while let Some((offset, ch)) = chars.next() {
            match ch {
                c if c as u32 == quote as u32 => {
                    self.pos += offset + 1;
                    return Ok(out);
                }
                '\\' => {
                    let Some((_, escaped)) = chars.next() else {
                        break;
                    };
                    match escaped {
                        'n' => out.push('\n'),
                        't' => out.push('\t'),
                        'r' => out.push('\r'),
                        '0' => out.push('\0'),
                        '\n' => {}
                        other => out.push(other),
                    }
                }
                '\n' if quote != b'`' => {
                    self.pos += offset;
                    return Err(self.error("unterminated string"));
                }
                other => out.push(other),
            }
        }

        self.pos = self.bytes.len();
        Err(self.error("unterminated string"))
    }

    /// Template literals are data only when they carry no interpolation.
    fn parse_template(&mut self) -> Result<Option<String>> {
        let start = self.pos;
        let text = self.parse_string()?;
        if self.src[start..self.pos].contains("${") {
            return Ok(None);
        }
        Ok(Some(text))
    }

    fn parse_key(&mut self) -> Result<String> {
        match self.peek() {
            Some(b'"') | Some(b'\'') => self.parse_string(),
            Some(b) if b.is_ascii_alphanumeric() || b == b'_' || b == b'$' => {
                Ok(self.identifier().to_string())
            }
            Some(b'[') => Err(self.error("computed keys are not supported")),
            _ => Err(self.error("expected a property name")),
        }
    }

    fn parse_object(&mut self) -> Result<Literal> {
        self.pos += 1;
        let mut members = Vec::new();

        loop {
            self.skip_trivia()?;
            match self.peek() {
                None => return Err(self.error("unterminated object literal")),
                Some(b'}') => {
                    self.pos += 1;
                    return Ok(Literal::Object(members));
                }
                Some(b'.') if self.src[self.pos..].starts_with("...") => {
                    self.pos += 3;
                    match self.capture_raw()? {
                        Literal::Raw(expr) => members.push(Member::Spread(expr)),
                        _ => return Err(self.error("invalid spread")),
                    }
                }
                _ => {
                    let key = self.parse_key()?;
                    self.skip_trivia()?;
                    match self.peek() {
                        Some(b':') => {
                            self.pos += 1;
                            let value = self.parse_value()?;
                            members.push(Member::Pair(key, value));
                        }
                        Some(b',') | Some(b'}') => {
                            let value = Literal::Raw(key.clone());
                            members.push(Member::Pair(key, value));
                        }
                        _ => return Err(self.error("expected `:` after property name")),
                    }
                }
            }

            self.skip_trivia()?;
            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(b'}') => {}
                None => return Err(self.error("unterminated object literal")),
                _ => return Err(self.error("expected `,` or `}`")),
            }
        }
    }

    fn parse_array(&mut self) -> Result<Literal> {
        self.pos += 1;
        let mut items = Vec::new();

        loop {
            self.skip_trivia()?;
            match self.peek() {
                None => return Err(self.error("unterminated array literal")),
                Some(b']') => {
                    self.pos += 1;
                    return Ok(Literal::Array(items));
                }
                Some(b'.') if self.src[self.pos..].starts_with("...") => {
                    items.push(self.capture_raw()?);
                }
                _ => items.push(self.parse_value()?),
            }

            self.skip_trivia()?;
            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(b']') => {}
                None => return Err(self.error("unterminated array literal")),
                _ => return Err(self.error("expected `,` or `]`")),
            }
        }
    }

    /// Consumes one arbitrary expression up to the next top-level separator.
    fn capture_raw(&mut self) -> Result<Literal> {
        let start = self.pos;
        let mut depth = 0usize;

        while let Some(b) = self.peek() {
            match b {
                b'"' | b'\'' | b'`' => {
                    self.parse_string()?;
                    continue;
                }
                b'/' if matches!(self.peek_at(1), Some(b'/') | Some(b'*')) => {
                    self.skip_trivia()?;
                    continue;
                }
                b'(' | b'[' | b'{' => depth += 1,
                b')' | b']' | b'}' => {
                    if depth == 0 {
                        break;
                    }
                    depth -= 1;
                }
                b',' | b';' if depth == 0 => break,
                _ => {}
            }
            self.pos += 1;
        }

        if depth != 0 {
            return Err(self.error("unbalanced brackets in expression"));
        }

        let text = self.src[start..self.pos].trim();
        if text.is_empty() {
            return Err(self.error("expected a value"));
        }

        Ok(Literal::Raw(text.to_string()))
    }
}

pub fn render_module(value: &Literal) -> String {
    let mut out = String::from("/** @type {import('tailwindcss').Config} */\nmodule.exports = ");
    render_into(value, 0, &mut out);
    out.push_str(";\n");
    out
}

fn render_into(value: &Literal, indent: usize, out: &mut String) {
    match value {
        Literal::Null => out.push_str("null"),
        Literal::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Literal::Number(n) => out.push_str(n),
        Literal::Str(s) => out.push_str(&quote(s)),
        Literal::Raw(raw) => out.push_str(raw),
        Literal::Array(items) if items.is_empty() => out.push_str("[]"),
        Literal::Array(items) if items.iter().all(Literal::is_scalar) && items.len() <= 4 => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                render_into(item, indent, out);
            }
            out.push(']');
        }
        Literal::Array(items) => {
            out.push_str("[\n");
            for item in items {
                pad(indent + 1, out);
                render_into(item, indent + 1, out);
                out.push_str(",\n");
            }
            pad(indent, out);
            out.push(']');
        }
        Literal::Object(members) if members.is_empty() => out.push_str("{}"),
        Literal::Object(members) => {
            out.push_str("{\n");
            for member in members {
                pad(indent + 1, out);
                match member {
                    Member::Pair(key, value) => {
                        out.push_str(&render_key(key));
                        out.push_str(": ");
                        render_into(value, indent + 1, out);
                    }
                    Member::Spread(expr) => {
                        out.push_str("...");
                        out.push_str(expr);
                    }
                }
                out.push_str(",\n");
            }
            pad(indent, out);
            out.push('}');
        }
    }
}

fn pad(indent: usize, out: &mut String) {
    for _ in 0..indent {
        out.push_str("  ");
    }
}

fn quote(text: &str) -> String {
    serde_json::to_string(text).unwrap_or_else(|_| format!("\"{}\"", text))
}

fn render_key(key: &str) -> String {
    let mut chars = key.chars();
    let bare = match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' || first == '$' => {
            chars.all(is_ident_char)
        }
        _ => false,
    };

    if bare { key.to_string() } else { quote(key) }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHADCN_STYLE: &str = r#"
/** @type {import('tailwindcss').Config} */
module.exports = {
  darkMode: ["class"],
  // extensions
  theme: {
    extend: {
      colors: {
        brand: '#123456',
        "brand-foreground": "hsl(var(--brand-foreground))",
      },
      borderRadius: { lg: `var(--radius)` },
      spacing: { 18: 4.5 },
    },
  },
  plugins: [require("tailwindcss-animate")],
}
"#;

    #[test]
    fn reads_common_config_shape() {
        let value = parse_config_module(SHADCN_STYLE).unwrap();
        let colors = value.get("theme").unwrap().get("extend").unwrap().get("colors").unwrap();
        assert_eq!(colors.get("brand"), Some(&Literal::Str("#123456".into())));
        assert!(colors.get("brand-foreground").is_some());

        let plugins = value.get("plugins").unwrap();
        assert_eq!(
            plugins,
            &Literal::Array(vec![Literal::Raw("require(\"tailwindcss-animate\")".into())])
        );
    }

    #[test]
    fn follows_named_default_export() {
        let source = r#"
import type { Config } from "tailwindcss"
const config = {
  theme: { extend: { boxShadow: { glow: "0 0 8px #fff" } } },
} satisfies Config
export default config
"#;
        let value = parse_config_module(source).unwrap();
        assert!(value.get("theme").is_some());
    }

    #[test]
    fn keeps_expressions_verbatim() {
        let value = parse_literal("{ sans: ['Inter', ...fontFamily.sans], x: 1 + 2 }").unwrap();
        let sans = value.get("sans").unwrap();
        assert_eq!(
            sans,
            &Literal::Array(vec![
                Literal::Str("Inter".into()),
                Literal::Raw("...fontFamily.sans".into())
            ])
        );
        assert_eq!(value.get("x"), Some(&Literal::Raw("1 + 2".into())));
    }

    #[test]
    fn interpolated_templates_are_raw() {
        let value = parse_literal("{ a: `calc(${x} + 1px)` }").unwrap();
        assert_eq!(value.get("a"), Some(&Literal::Raw("`calc(${x} + 1px)`".into())));
    }

    #[test]
    fn rejects_unbalanced_input() {
        assert!(parse_config_module("module.exports = { theme: { extend: {} }").is_err());
        assert!(parse_config_module("const x = 1").is_err());
        assert!(parse_literal("{ a: 'unterminated }").is_err());
    }

    #[test]
    fn renders_parseable_output() {
        let value = parse_config_module(SHADCN_STYLE).unwrap();
        let rendered = render_module(&value);
        assert!(rendered.contains("\"brand-foreground\": \"hsl(var(--brand-foreground))\""));
        assert!(rendered.contains("plugins: [require(\"tailwindcss-animate\")]"));
        assert_eq!(parse_config_module(&rendered).unwrap(), value);
    }
}
