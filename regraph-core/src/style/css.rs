//! Global CSS merging.
//!
//! Stylesheets are read into directives, rules grouped by `@layer`, keyframes
//! and opaque blocks. Declarations are deduplicated per selector by property
//! name, which covers CSS variables; keyframes by name; opaque blocks by text.

use super::{ConflictNote, ConflictPolicy};
use crate::{RegraphError, Result};

#[derive(Clone, Debug, PartialEq)]
pub enum CssNode {
    Statement(String),
    Block {
        prelude: String,
        children: Vec<CssNode>,
    },
}

pub fn parse_stylesheet(source: &str) -> Result<Vec<CssNode>> {
    let mut parser = CssParser { src: source, pos: 0 };
    parser.nodes(false)
}

struct CssParser<'s> {
    src: &'s str,
    pos: usize,
}

impl CssParser<'_> {
    fn error(&self, reason: &str) -> RegraphError {
        RegraphError::CssParse {
            offset: self.pos,
            reason: reason.to_string(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn nodes(&mut self, nested: bool) -> Result<Vec<CssNode>> {
        let mut nodes = Vec::new();
        let mut buf = String::new();

        while let Some(ch) = self.peek() {
            match ch {
                '/' if self.src[self.pos..].starts_with("/*") => {
                    match self.src[self.pos + 2..].find("*/") {
                        Some(end) => self.pos += 2 + end + 2,
                        None => return Err(self.error("unterminated comment")),
                    }
                    buf.push(' ');
                }
                '"' | '\'' => {
                    let quoted = self.quoted(ch)?;
                    buf.push_str(quoted);
                }
                '(' => {
                    let group = self.parenthesized()?;
                    buf.push_str(group);
                }
                ';' => {
                    self.pos += 1;
                    push_statement(&mut nodes, &buf);
                    buf.clear();
                }
                '{' => {
                    self.pos += 1;
                    let prelude = normalize_ws(&buf);
                    if prelude.is_empty() {
                        return Err(self.error("block without a selector"));
                    }
                    let children = self.nodes(true)?;
                    nodes.push(CssNode::Block { prelude, children });
                    buf.clear();
                }
                '}' => {
                    if !nested {
                        return Err(self.error("unexpected `}`"));
                    }
                    self.pos += 1;
                    push_statement(&mut nodes, &buf);
                    return Ok(nodes);
                }
                other => {
                    buf.push(other);
                    self.pos += other.len_utf8();
                }
            }
        }

        if nested {
            return Err(self.error("unclosed block"));
        }

        push_statement(&mut nodes, &buf);
        Ok(nodes)
    }

    fn quoted(&mut self, quote: char) -> Result<&str> {
        let start = self.pos;
        let mut escaped = false;

        for (offset, ch) in self.src[start + 1..].char_indices() {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == quote {
                self.pos = start + 1 + offset + 1;
                return Ok(&self.src[start..self.pos]);
            } else if ch == '\n' {
                break;
            }
        }

        Err(self.error("unterminated string"))
    }

    fn parenthesized(&mut self) -> Result<&str> {
        let start = self.pos;
        let mut depth = 0usize;

        while let Some(ch) = self.peek() {
            match ch {
                '"' | '\'' => {
                    self.quoted(ch)?;
                    continue;
                }
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        self.pos += 1;
                        return Ok(&self.src[start..self.pos]);
                    }
                }
                _ => {}
            }
            self.pos += ch.len_utf8();
        }

        self.pos = start;
        Err(self.error("unbalanced parentheses"))
    }
}

fn push_statement(nodes: &mut Vec<CssNode>, buf: &str) {
    let text = normalize_ws(buf);
    if !text.is_empty() {
        nodes.push(CssNode::Statement(text));
    }
}

/// Collapses whitespace runs outside of quoted strings.
fn normalize_ws(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut quote: Option<char> = None;
    let mut pending_space = false;

    for ch in text.chars() {
        if let Some(q) = quote {
            out.push(ch);
            if ch == q {
                quote = None;
            }
            continue;
        }

        if ch.is_whitespace() {
            pending_space = !out.is_empty();
            continue;
        }

        if pending_space {
            out.push(' ');
            pending_space = false;
        }

        if ch == '"' || ch == '\'' {
            quote = Some(ch);
        }
        out.push(ch);
    }

    out
}

fn normalize_selector(selector: &str) -> String {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut current = String::new();

    for ch in selector.chars() {
        match ch {
            '(' | '[' => depth += 1,
            ')' | ']' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(current.trim().to_string());
                current.clear();
                continue;
            }
            _ => {}
        }
        current.push(ch);
    }
    parts.push(current.trim().to_string());

    parts.join(", ")
}

#[derive(Clone, Debug, PartialEq)]
struct Declaration {
    name: String,
    value: Option<String>,
}

impl Declaration {
    fn parse(text: &str) -> Self {
        if !text.starts_with('@')
            && let Some((name, value)) = text.split_once(':')
        {
            let name = name.trim();
            if !name.is_empty() && !name.contains(char::is_whitespace) {
                return Declaration {
                    name: name.to_string(),
                    value: Some(value.trim().to_string()),
                };
            }
        }

        Declaration {
            name: text.to_string(),
            value: None,
        }
    }

    fn render(&self) -> String {
        match &self.value {
            Some(value) => format!("{}: {};", self.name, value),
            None => format!("{};", self.name),
        }
    }
}

/// A declaration together with the contributor that supplied it.
#[derive(Clone, Debug)]
struct Slot {
    declaration: Declaration,
    contributor: usize,
}

#[derive(Clone, Debug)]
struct Rule {
    selector: String,
    declarations: Vec<Slot>,
}

#[derive(Clone, Debug)]
struct Context {
    layer: Option<String>,
    rules: Vec<Rule>,
    others: Vec<CssNode>,
}

/// Merge target: everything seen so far, in first-seen order.
#[derive(Clone, Debug, Default)]
pub struct Stylesheet {
    directives: Vec<String>,
    contexts: Vec<Context>,
    keyframes: Vec<(String, CssNode)>,
    contributors: usize,
}

impl Stylesheet {
    pub fn absorb(
        &mut self,
        source: &str,
        origin: &str,
        policy: ConflictPolicy,
        notes: &mut Vec<ConflictNote>,
    ) -> Result<()> {
        let nodes = parse_stylesheet(source)?;
        let contributor = self.contributors;
        self.contributors += 1;

        let mut merge = Merge {
            sheet: self,
            contributor,
            origin,
            policy,
            notes,
        };

        for node in nodes {
            match node {
                CssNode::Statement(text) if text.starts_with('@') => merge.directive(text),
                CssNode::Statement(text) => {
                    return Err(RegraphError::CssParse {
                        offset: 0,
                        reason: format!("declaration `{}` outside of a rule", text),
                    });
                }
                CssNode::Block { prelude, children } => {
                    if let Some(layer) = layer_name(&prelude) {
                        for child in children {
                            merge.node(Some(layer), child)?;
                        }
                    } else {
                        merge.node(None, CssNode::Block { prelude, children })?;
                    }
                }
            }
        }

        Ok(())
    }

    pub fn render(&self) -> String {
        let mut sections = Vec::new();

        if !self.directives.is_empty() {
            let mut directives: Vec<&String> = self.directives.iter().collect();
            directives.sort_by_key(|d| directive_rank(d));
            let mut block = String::new();
            for directive in directives {
                block.push_str(directive);
                block.push_str(";\n");
            }
            sections.push(block);
        }

        for context in &self.contexts {
            if context.rules.is_empty() && context.others.is_empty() {
                continue;
            }

            match &context.layer {
                Some(layer) => {
                    let mut block = format!("@layer {} {{\n", layer);
                    render_context_body(context, 1, &mut block);
                    block.push_str("}\n");
                    sections.push(block);
                }
                None => {
                    let mut block = String::new();
                    render_context_body(context, 0, &mut block);
                    sections.push(block);
                }
            }
        }

        for (_, node) in &self.keyframes {
            let mut block = String::new();
            render_node(node, 0, &mut block);
            sections.push(block);
        }

        sections.join("\n")
    }
}

struct Merge<'a> {
    sheet: &'a mut Stylesheet,
    contributor: usize,
    origin: &'a str,
    policy: ConflictPolicy,
    notes: &'a mut Vec<ConflictNote>,
}

impl Merge<'_> {
    fn directive(&mut self, text: String) {
        if !self.sheet.directives.contains(&text) {
            self.sheet.directives.push(text);
        }
    }

    fn node(&mut self, layer: Option<&str>, node: CssNode) -> Result<()> {
        match node {
            CssNode::Statement(_) => {
                self.other(layer, node);
                Ok(())
            }
            CssNode::Block { prelude, children } => {
                if let Some(name) = keyframes_name(&prelude) {
                    return self.keyframes(name, CssNode::Block { prelude, children });
                }

                let nested = children.iter().any(|c| matches!(c, CssNode::Block { .. }));
                if prelude.starts_with('@') || nested {
                    self.other(layer, CssNode::Block { prelude, children });
                    return Ok(());
                }

                self.rule(layer, &prelude, children)
            }
        }
    }

    fn context(&mut self, layer: Option<&str>) -> &mut Context {
        let index = self
            .sheet
            .contexts
            .iter()
            .position(|c| c.layer.as_deref() == layer);

        let index = match index {
            Some(index) => index,
            None => {
                self.sheet.contexts.push(Context {
                    layer: layer.map(str::to_string),
                    rules: Vec::new(),
                    others: Vec::new(),
                });
                self.sheet.contexts.len() - 1
            }
        };

        &mut self.sheet.contexts[index]
    }

    fn other(&mut self, layer: Option<&str>, node: CssNode) {
        let context = self.context(layer);
        if !context.others.contains(&node) {
            context.others.push(node);
        }
    }

    fn keyframes(&mut self, name: String, node: CssNode) -> Result<()> {
        let existing = self.sheet.keyframes.iter().position(|(k, _)| *k == name);

        let Some(index) = existing else {
            self.sheet.keyframes.push((name, node));
            return Ok(());
        };

        if self.sheet.keyframes[index].1 == node {
            return Ok(());
        }

        if self.conflict("keyframes", &name)? {
            self.sheet.keyframes[index].1 = node;
        }
        Ok(())
    }

    fn rule(&mut self, layer: Option<&str>, prelude: &str, children: Vec<CssNode>) -> Result<()> {
        let selector = normalize_selector(prelude);
        let declarations: Vec<Declaration> = children
            .into_iter()
            .filter_map(|child| match child {
                CssNode::Statement(text) => Some(Declaration::parse(&text)),
                CssNode::Block { .. } => None,
            })
            .collect();

        let context = self.context(layer);
        let rule_index = match context.rules.iter().position(|r| r.selector == selector) {
            Some(index) => index,
            None => {
                context.rules.push(Rule {
                    selector: selector.clone(),
                    declarations: Vec::new(),
                });
                context.rules.len() - 1
            }
        };

        // Repeated properties inside one contributor are kept as written; only
        // definitions left by earlier contributors can conflict.
        let mut decided: Vec<(String, bool)> = Vec::new();
        for declaration in &declarations {
            if decided.iter().any(|(name, _)| *name == declaration.name) {
                continue;
            }

            let contributor = self.contributor;
            let rule = &self.context(layer).rules[rule_index];
            let earlier: Vec<&Declaration> = rule
                .declarations
                .iter()
                .filter(|slot| slot.contributor != contributor)
                .map(|slot| &slot.declaration)
                .filter(|d| d.name == declaration.name)
                .collect();

            let keep = if earlier.is_empty() {
                true
            } else {
                let incoming: Vec<&Declaration> = declarations
                    .iter()
                    .filter(|d| d.name == declaration.name)
                    .collect();

                if earlier == incoming {
                    false
                } else {
                    let category = if declaration.name.starts_with("--") {
                        "css variable"
                    } else {
                        "css declaration"
                    };
                    let key = format!("{} {}", selector, declaration.name);
                    let replace = self.conflict(category, &key)?;

                    if replace {
                        let rule = &mut self.context(layer).rules[rule_index];
                        rule.declarations.retain(|slot| {
                            slot.contributor == contributor || slot.declaration.name != declaration.name
                        });
                    }
                    replace
                }
            };

            decided.push((declaration.name.clone(), keep));
        }

        let contributor = self.contributor;
        let rule = &mut self.context(layer).rules[rule_index];
        for declaration in declarations {
            let keep = decided
                .iter()
                .any(|(name, keep)| *keep && *name == declaration.name);
            if keep {
                rule.declarations.push(Slot {
                    declaration,
                    contributor,
                });
            }
        }

        Ok(())
    }

    /// Records a conflict; returns whether the incoming definition replaces the existing one.
    fn conflict(&mut self, category: &str, key: &str) -> Result<bool> {
        let replace = match self.policy {
            ConflictPolicy::FirstWins => {
                tracing::warn!(
                    component = self.origin,
                    category,
                    key,
                    "duplicate css definition dropped, earlier definition kept"
                );
                false
            }
            ConflictPolicy::LastWins => {
                tracing::warn!(
                    component = self.origin,
                    category,
                    key,
                    "duplicate css definition replaces earlier definition"
                );
                true
            }
            ConflictPolicy::Error => {
                return Err(RegraphError::StyleConflict {
                    category: category.to_string(),
                    key: key.to_string(),
                });
            }
        };

        self.notes.push(ConflictNote {
            category: category.to_string(),
            key: key.to_string(),
            origin: self.origin.to_string(),
            policy: self.policy,
        });

        Ok(replace)
    }
}

fn layer_name(prelude: &str) -> Option<&str> {
    let name = prelude.strip_prefix("@layer ")?.trim();
    if name.is_empty() || name.contains(',') || name.contains(char::is_whitespace) {
        return None;
    }
    Some(name)
}

fn keyframes_name(prelude: &str) -> Option<String> {
    let (keyword, name) = prelude.split_once(' ')?;
    if keyword == "@keyframes" || (keyword.starts_with("@-") && keyword.ends_with("-keyframes")) {
        Some(format!("{} {}", keyword, name.trim()))
    } else {
        None
    }
}

fn directive_rank(directive: &str) -> u8 {
    if directive.starts_with("@charset") {
        0
    } else if directive.starts_with("@import") {
        1
    } else {
        2
    }
}

fn render_context_body(context: &Context, indent: usize, out: &mut String) {
    let mut first = true;

    for rule in &context.rules {
        if !first {
            out.push('\n');
        }
        first = false;

        pad(indent, out);
        out.push_str(&rule.selector);
        out.push_str(" {\n");
        for slot in &rule.declarations {
            pad(indent + 1, out);
            out.push_str(&slot.declaration.render());
            out.push('\n');
        }
        pad(indent, out);
        out.push_str("}\n");
    }

    for node in &context.others {
        if !first {
            out.push('\n');
        }
        first = false;
        render_node(node, indent, out);
    }
}

fn render_node(node: &CssNode, indent: usize, out: &mut String) {
    match node {
        CssNode::Statement(text) => {
            pad(indent, out);
            out.push_str(text);
            out.push_str(";\n");
        }
        CssNode::Block { prelude, children } => {
            pad(indent, out);
            out.push_str(prelude);
            out.push_str(" {\n");
            for child in children {
                render_node(child, indent + 1, out);
            }
            pad(indent, out);
            out.push_str("}\n");
        }
    }
}

fn pad(indent: usize, out: &mut String) {
    for _ in 0..indent {
        out.push_str("  ");
    }
}

/// Merges every fragment into the base stylesheet and renders the result.
pub fn merge_css(
    base: &str,
    fragments: &[(&str, &str)],
    policy: ConflictPolicy,
    notes: &mut Vec<ConflictNote>,
) -> Result<String> {
    let mut sheet = Stylesheet::default();
    sheet.absorb(base, "base", policy, notes)?;

    for (origin, text) in fragments {
        sheet.absorb(text, origin, policy, notes)?;
    }

    Ok(sheet.render())
}
