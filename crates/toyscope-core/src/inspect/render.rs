//! Text rendering of decoded nodes.
//!
//! Fixed delimiters: lists are `[a b c]`, namespaces are `NS{k: v k: v}`,
//! scope chains join namespaces with `<-`, identifiers are `Id{'name'}`.

use super::node::{ElementNode, NamespaceNode, Node, PairNode};
use super::scalar::quote;
use crate::config::ElementStyle;

/// Render any decoded node.
pub fn render(node: &Node, style: ElementStyle) -> String {
    match node {
        Node::Null => "NULL".to_string(),
        Node::Str(s) => quote(s),
        Node::Ident(name) => render_ident(name),
        Node::Element(el) => render_element(el, style),
        Node::Pair(pair) => render_pair(pair, style),
        Node::ScopeChain(chain) => render_scope_chain(chain, style),
        Node::ElementList(items) => render_sequence(items.iter().map(|el| render_element(el, style))),
        Node::IdentList(names) => render_sequence(names.iter().map(|name| render_ident(name))),
    }
}

pub fn render_ident(name: &str) -> String {
    format!("Id{{{}}}", quote(name))
}

/// `[a b c]`, `[]` when empty.
fn render_sequence(items: impl Iterator<Item = String>) -> String {
    format!("[{}]", items.collect::<Vec<_>>().join(" "))
}

pub fn render_element(el: &ElementNode, style: ElementStyle) -> String {
    match style {
        ElementStyle::Bare => render_bare(el),
        ElementStyle::Tagged => render_tagged(el),
    }
}

fn render_params(params: &[String]) -> String {
    render_sequence(params.iter().map(|p| render_ident(p)))
}

fn render_bare(el: &ElementNode) -> String {
    match el {
        ElementNode::Null => "null".to_string(),
        ElementNode::Error(msg) => format!("error({})", quote(msg)),
        ElementNode::Int(v) => v.to_string(),
        ElementNode::Str(s) => quote(s),
        ElementNode::Bool(b) => b.to_string(),
        ElementNode::List(items) => render_sequence(items.iter().map(render_bare)),
        ElementNode::Return(inner) => format!("return {}", render_bare(inner)),
        ElementNode::Function { params, closure } => {
            format!("fn({}) ns={:#x}", render_params(params), closure)
        }
        ElementNode::Builtin => "builtin(not implemented)".to_string(),
        ElementNode::Unknown(tag) => format!("<unknown element tag {}>", tag),
    }
}

fn render_tagged(el: &ElementNode) -> String {
    match el {
        ElementNode::Null => "El|NULL|".to_string(),
        ElementNode::Error(msg) => format!("El|ERR, {}|", quote(msg)),
        ElementNode::Int(v) => format!("El|INT, {}|", v),
        ElementNode::Str(s) => format!("El|STR, {}|", quote(s)),
        ElementNode::Bool(b) => format!("El|BOOL, {}|", b),
        ElementNode::List(items) => render_sequence(items.iter().map(render_tagged)),
        ElementNode::Return(inner) => format!("El|RETURN, {}|", render_tagged(inner)),
        ElementNode::Function { params, closure } => {
            format!("El|FUNCTION, ({}), ns={:#x}|", render_params(params), closure)
        }
        ElementNode::Builtin => "El|BUILTIN, Not Impl|".to_string(),
        ElementNode::Unknown(tag) => format!("El|UNKNOWN, tag={}|", tag),
    }
}

/// `'key': value`, or just `'key'` when the value was not decoded.
pub fn render_pair(pair: &PairNode, style: ElementStyle) -> String {
    match &pair.value {
        Some(value) => format!("{}: {}", quote(&pair.key), render_element(value, style)),
        None => quote(&pair.key),
    }
}

pub fn render_namespace(ns: &NamespaceNode, style: ElementStyle) -> String {
    let entries: Vec<String> = ns.entries.iter().map(|p| render_pair(p, style)).collect();
    format!("NS{{{}}}", entries.join(" "))
}

pub fn render_scope_chain(chain: &[NamespaceNode], style: ElementStyle) -> String {
    chain
        .iter()
        .map(|ns| render_namespace(ns, style))
        .collect::<Vec<_>>()
        .join("<-")
}
