//! Prompt body templating on top of `handlebars`.
//!
//! Syntax:
//! - `{{name}}` substitutes an argument; unknown names are left verbatim.
//! - `{{#if name}}..{{else}}..{{/if}}`, also `{{#if name == "value"}}` and
//!   `!=`; `{{#unless name}}..{{/unless}}` is the negation.
//! - `{{#each name}}..{{this}}..{{/each}}` iterates a JSON array value, or a
//!   comma-separated list. `{{@index}}`, `{{@first}}`, `{{@last}}` and
//!   `{{this.field}}` are available inside the loop; `{{else}}` renders when
//!   the list is empty.
//!
//! Argument values are opaque: they are never parsed as template syntax.
//! Block tags that are never closed render as literal text, as do stray
//! `{{else}}`/closing tags and anything that is not one of the forms above.
//! Block tags standing alone on a line consume that line, as in Handlebars.
//!
//! The template is first matched in one pass with an explicit block stack,
//! then lowered to a Handlebars source where every argument and literal is
//! a data slot (`@root.sN`). Only the lowered block tags reach the
//! Handlebars parser, so user text can never inject syntax.

use std::collections::HashMap;
use std::sync::OnceLock;

use handlebars::{
    handlebars_helper, no_escape, Context, Handlebars, Helper, HelperResult, Output, RenderContext,
};
use serde_json::{Map, Value as JsonValue};

pub fn render(template: &str, args: &HashMap<String, String>) -> String {
    let tokens = tokenize(template);
    let roles = match_blocks(&tokens);
    let lowered = lower(&tokens, &roles, args);
    match engine().render_template(&lowered.source, &JsonValue::Object(lowered.slots)) {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!(error = %e, "prompt template failed to render; returning it unrendered");
            template.to_owned()
        }
    }
}

fn engine() -> &'static Handlebars<'static> {
    static ENGINE: OnceLock<Handlebars<'static>> = OnceLock::new();
    ENGINE.get_or_init(|| {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(false);
        handlebars.register_escape_fn(no_escape);
        handlebars.register_helper("truthy", Box::new(truthy));
        handlebars.register_helper("same", Box::new(same));
        handlebars.register_helper("items", Box::new(items));
        handlebars.register_helper("text", Box::new(text_helper));
        handlebars
    })
}

handlebars_helper!(truthy: |v: Json| is_truthy(v));
handlebars_helper!(same: |a: Json, b: Json| !a.is_null() && text_of(a) == text_of(b));
handlebars_helper!(items: |v: Json| JsonValue::Array(list_items(v)));

/// `{{text path raw}}`: a loop value as plain text, or `raw` when the path
/// does not resolve.
fn text_helper(
    h: &Helper,
    _: &Handlebars,
    _: &Context,
    _: &mut RenderContext,
    out: &mut dyn Output,
) -> HelperResult {
    let raw = h.param(1).and_then(|p| p.value().as_str()).unwrap_or_default();
    match h.param(0) {
        Some(p) if !p.is_value_missing() => out.write(&text_of(p.value()))?,
        _ => out.write(raw)?,
    }
    Ok(())
}

fn text_of(v: &JsonValue) -> String {
    match v {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn is_truthy(v: &JsonValue) -> bool {
    match v {
        JsonValue::Null => false,
        JsonValue::Bool(b) => *b,
        JsonValue::String(s) => {
            let s = s.trim();
            !(s.is_empty() || s == "false" || s == "0" || s == "[]")
        }
        JsonValue::Array(a) => !a.is_empty(),
        other => {
            let s = other.to_string();
            s != "0" && s != "0.0"
        }
    }
}

fn list_items(v: &JsonValue) -> Vec<JsonValue> {
    let text = match v {
        JsonValue::Null => return Vec::new(),
        JsonValue::Array(arr) => return arr.clone(),
        JsonValue::String(s) => s.as_str(),
        other => return vec![other.clone()],
    };
    if let Ok(JsonValue::Array(arr)) = serde_json::from_str::<JsonValue>(text) {
        return arr;
    }
    text.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| JsonValue::String(s.to_owned()))
        .collect()
}

#[derive(Debug, Clone, Copy)]
enum Token<'a> {
    Text(&'a str),
    Tag { raw: &'a str, inner: &'a str },
}

fn tokenize(src: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut rest = src;
    while let Some(open) = rest.find("{{") {
        let Some(close) = rest[open + 2..].find("}}") else {
            break;
        };
        let end = open + 2 + close + 2;
        if open > 0 {
            tokens.push(Token::Text(&rest[..open]));
        }
        tokens.push(Token::Tag {
            raw: &rest[open..end],
            inner: rest[open + 2..end - 2].trim(),
        });
        rest = &rest[end..];
    }
    if !rest.is_empty() {
        tokens.push(Token::Text(rest));
    }
    tokens
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockKind {
    If,
    Unless,
    Each,
}

impl BlockKind {
    fn keyword(self) -> &'static str {
        match self {
            BlockKind::If => "if",
            BlockKind::Unless => "unless",
            BlockKind::Each => "each",
        }
    }
}

#[derive(Debug)]
enum Tag<'a> {
    Open(BlockKind, &'a str),
    Else,
    Close(BlockKind),
    Var(&'a str),
    Literal,
}

fn classify(inner: &str) -> Tag<'_> {
    if let Some(expr) = inner.strip_prefix("#if ") {
        return Tag::Open(BlockKind::If, expr.trim());
    }
    if let Some(expr) = inner.strip_prefix("#unless ") {
        return Tag::Open(BlockKind::Unless, expr.trim());
    }
    if let Some(expr) = inner.strip_prefix("#each ") {
        return Tag::Open(BlockKind::Each, expr.trim());
    }
    match inner {
        "else" => Tag::Else,
        "/if" => Tag::Close(BlockKind::If),
        "/unless" => Tag::Close(BlockKind::Unless),
        "/each" => Tag::Close(BlockKind::Each),
        name if is_name(name) => Tag::Var(name),
        _ => Tag::Literal,
    }
}

fn is_name(s: &str) -> bool {
    !s.is_empty()
        && s.chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | '@'))
}

#[derive(Debug)]
enum Cond<'a> {
    Truthy(&'a str),
    Compare { name: &'a str, literal: &'a str, equal: bool },
}

fn parse_cond(expr: &str) -> Option<Cond<'_>> {
    for (op, equal) in [("==", true), ("!=", false)] {
        if let Some((lhs, rhs)) = expr.split_once(op) {
            let name = lhs.trim();
            let literal = unquote(rhs.trim());
            return is_name(name).then_some(Cond::Compare { name, literal, equal });
        }
    }
    is_name(expr).then_some(Cond::Truthy(expr))
}

fn unquote(s: &str) -> &str {
    for q in ['"', '\''] {
        if s.len() >= 2 && s.starts_with(q) && s.ends_with(q) {
            return &s[1..s.len() - 1];
        }
    }
    s
}

/// What a tag turned out to be once blocks are paired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Verbatim,
    Open,
    Else,
    Close,
}

struct OpenBlock {
    kind: BlockKind,
    open: usize,
    otherwise: Option<usize>,
    valid: bool,
}

/// Pair block tags in a single left-to-right pass. Openers still on the
/// stack at the end were never closed, so they and their `else` stay text
/// while the content between them renders normally.
fn match_blocks(tokens: &[Token<'_>]) -> Vec<Role> {
    let mut roles = vec![Role::Verbatim; tokens.len()];
    let mut stack: Vec<OpenBlock> = Vec::new();
    for (i, tok) in tokens.iter().enumerate() {
        let Token::Tag { inner, .. } = tok else {
            continue;
        };
        match classify(inner) {
            Tag::Open(kind, expr) => {
                let valid = match kind {
                    BlockKind::Each => is_name(expr),
                    BlockKind::If | BlockKind::Unless => parse_cond(expr).is_some(),
                };
                stack.push(OpenBlock { kind, open: i, otherwise: None, valid });
            }
            Tag::Else => {
                if let Some(top) = stack.last_mut().filter(|b| b.otherwise.is_none()) {
                    top.otherwise = Some(i);
                }
            }
            Tag::Close(kind) => {
                if stack.last().is_some_and(|b| b.kind == kind) {
                    if let Some(block) = stack.pop().filter(|b| b.valid) {
                        roles[block.open] = Role::Open;
                        if let Some(e) = block.otherwise {
                            roles[e] = Role::Else;
                        }
                        roles[i] = Role::Close;
                    }
                }
            }
            Tag::Var(_) | Tag::Literal => {}
        }
    }
    roles
}

struct Lowered {
    source: String,
    slots: Map<String, JsonValue>,
}

impl Lowered {
    fn slot(&mut self, value: JsonValue) -> String {
        let key = format!("s{}", self.slots.len());
        self.slots.insert(key.clone(), value);
        format!("@root.{key}")
    }

    fn literal(&mut self, text: &str) {
        let path = self.slot(JsonValue::String(text.to_owned()));
        self.source.push_str(&format!("{{{{{path}}}}}"));
    }
}

fn is_loop_name(name: &str) -> bool {
    matches!(name, "this" | "." | "@index" | "@first" | "@last") || name.starts_with("this.")
}

/// Handlebars expression for a name used in a condition or `#each` head.
fn operand(name: &str, in_loop: bool, args: &HashMap<String, String>, out: &mut Lowered) -> String {
    if in_loop && is_loop_name(name) {
        return if name == "." { "this".to_owned() } else { name.to_owned() };
    }
    let value = args.get(name).map_or(JsonValue::Null, |v| JsonValue::String(v.clone()));
    out.slot(value)
}

fn lower(tokens: &[Token<'_>], roles: &[Role], args: &HashMap<String, String>) -> Lowered {
    let mut out = Lowered { source: String::new(), slots: Map::new() };
    let mut kinds: Vec<BlockKind> = Vec::new();
    let mut loops = 0usize;
    for (tok, role) in tokens.iter().zip(roles) {
        let (raw, inner) = match *tok {
            Token::Text(t) if t.contains("{{") || t.ends_with('\\') => {
                out.literal(t);
                continue;
            }
            Token::Text(t) => {
                out.source.push_str(t);
                continue;
            }
            Token::Tag { raw, inner } => (raw, inner),
        };
        match (role, classify(inner)) {
            (Role::Open, Tag::Open(BlockKind::Each, expr)) => {
                let list = operand(expr, loops > 0, args, &mut out);
                out.source.push_str(&format!("{{{{#each (items {list})}}}}"));
                loops += 1;
                kinds.push(BlockKind::Each);
            }
            (Role::Open, Tag::Open(kind, expr)) => {
                let (head, kind) = match parse_cond(expr) {
                    Some(Cond::Truthy(name)) => {
                        (format!("(truthy {})", operand(name, loops > 0, args, &mut out)), kind)
                    }
                    // `!=` flips the block keyword rather than the helper.
                    Some(Cond::Compare { name, literal, equal }) => {
                        let lhs = operand(name, loops > 0, args, &mut out);
                        let rhs = out.slot(JsonValue::String(literal.to_owned()));
                        (format!("(same {lhs} {rhs})"), if equal { kind } else { flip(kind) })
                    }
                    None => (format!("(truthy {})", out.slot(JsonValue::Null)), kind),
                };
                out.source.push_str(&format!("{{{{#{} {head}}}}}", kind.keyword()));
                kinds.push(kind);
            }
            (Role::Else, _) => out.source.push_str("{{else}}"),
            (Role::Close, _) => {
                let kind = kinds.pop().unwrap_or(BlockKind::If);
                if kind == BlockKind::Each {
                    loops = loops.saturating_sub(1);
                }
                out.source.push_str(&format!("{{{{/{}}}}}", kind.keyword()));
            }
            (_, Tag::Var(name)) if loops > 0 && is_loop_name(name) => {
                let path = if name == "." { "this" } else { name };
                let fallback = out.slot(JsonValue::String(raw.to_owned()));
                out.source.push_str(&format!("{{{{text {path} {fallback}}}}}"));
            }
            (_, Tag::Var(name)) => match args.get(name) {
                Some(v) => out.literal(v),
                None => out.literal(raw),
            },
            _ => out.literal(raw),
        }
    }
    out
}

fn flip(kind: BlockKind) -> BlockKind {
    match kind {
        BlockKind::If => BlockKind::Unless,
        BlockKind::Unless => BlockKind::If,
        BlockKind::Each => BlockKind::Each,
    }
}
