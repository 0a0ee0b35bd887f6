use std::rc::Rc;

use anyhow::{anyhow, bail, Result};
use serde::{Deserialize, Serialize};

use crate::lexer::{Token, TokenKind};
use crate::value::Rgba;

/// Syntax tree handed to the evaluator. On the wire it is tagged by `kind`
/// and uses the flat `params` shapes external front ends emit (see
/// `WireNode`); in memory the positional params are split into fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "WireNode", into = "WireNode")]
pub enum Node {
    Program {
        values: Vec<Node>,
    },
    Number {
        value: f64,
    },
    String {
        value: String,
    },
    Color {
        value: Rgba,
    },
    /// Text keeps its leading sigil, e.g. `:fill`.
    Symbol {
        value: String,
    },
    Variable {
        value: String,
    },
    List {
        values: Vec<Node>,
    },
    Vector {
        values: Vec<Node>,
    },
    /// Flat alternating key/value sequence.
    Map {
        values: Vec<Node>,
    },
    Function {
        params: Vec<String>,
        body: Rc<Node>,
    },
    NamedFunction {
        name: String,
        params: Vec<String>,
        body: Rc<Node>,
    },
    Condition {
        guard: Box<Node>,
        then: Box<Node>,
        otherwise: Option<Box<Node>>,
    },
    ConstAssignment {
        name: String,
        value: Box<Node>,
    },
    /// `[body]`, or `[List of watched names, body]`.
    StateAssignment {
        name: String,
        params: Vec<Rc<Node>>,
    },
    CallExpression {
        name: String,
        values: Vec<Node>,
    },
    ExposedParameter {
        value: Box<Node>,
    },
    Unknown,
}

// Serialized form. Function-like kinds carry `params`:
//   Function         [List of parameter names, body...]
//   NamedFunction    name + [List of parameter names, body...]
//   Condition        [guard, then, else?]
//   ConstAssignment  name + [value]
//   StateAssignment  name + [body] or [List of watched names, body]
#[derive(Serialize, Deserialize)]
#[serde(tag = "kind")]
enum WireNode {
    Program {
        values: Vec<Node>,
    },
    Number {
        value: f64,
    },
    String {
        value: String,
    },
    Color {
        value: Rgba,
    },
    Symbol {
        value: String,
    },
    Variable {
        value: String,
    },
    List {
        values: Vec<Node>,
    },
    Vector {
        values: Vec<Node>,
    },
    Map {
        values: Vec<Node>,
    },
    Function {
        params: Vec<Node>,
    },
    NamedFunction {
        name: String,
        params: Vec<Node>,
    },
    Condition {
        params: Vec<Node>,
    },
    ConstAssignment {
        name: String,
        params: Vec<Node>,
    },
    StateAssignment {
        name: String,
        params: Vec<Rc<Node>>,
    },
    CallExpression {
        name: String,
        #[serde(default)]
        values: Vec<Node>,
    },
    ExposedParameter {
        value: Box<Node>,
    },
    #[serde(other)]
    Unknown,
}

fn param_names(kind: &str, list: Node) -> Result<Vec<String>, String> {
    let values = match list {
        Node::List { values } => values,
        other => {
            return Err(format!(
                "{} params must start with a List of names, found {}",
                kind,
                other.kind_name()
            ))
        }
    };
    values
        .into_iter()
        .map(|n| match n {
            Node::Variable { value } | Node::String { value } => Ok(value),
            other => Err(format!("{} parameter must be a name, found {}", kind, other.kind_name())),
        })
        .collect()
}

fn function_parts(kind: &str, params: Vec<Node>) -> Result<(Vec<String>, Rc<Node>), String> {
    let mut params = params.into_iter();
    let names = match params.next() {
        Some(list) => param_names(kind, list)?,
        None => return Err(format!("{} needs a parameter list and a body", kind)),
    };
    let mut body: Vec<Node> = params.collect();
    let body = match body.len() {
        0 => return Err(format!("{} has no body", kind)),
        1 => body.remove(0),
        _ => Node::Program { values: body },
    };
    Ok((names, Rc::new(body)))
}

impl TryFrom<WireNode> for Node {
    type Error = String;

    fn try_from(wire: WireNode) -> Result<Self, Self::Error> {
        Ok(match wire {
            WireNode::Program { values } => Node::Program { values },
            WireNode::Number { value } => Node::Number { value },
            WireNode::String { value } => Node::String { value },
            WireNode::Color { value } => Node::Color { value },
            WireNode::Symbol { value } => Node::Symbol { value },
            WireNode::Variable { value } => Node::Variable { value },
            WireNode::List { values } => Node::List { values },
            WireNode::Vector { values } => Node::Vector { values },
            WireNode::Map { values } => Node::Map { values },
            WireNode::Function { params } => {
                let (params, body) = function_parts("Function", params)?;
                Node::Function { params, body }
            }
            WireNode::NamedFunction { name, params } => {
                let (params, body) = function_parts("NamedFunction", params)?;
                Node::NamedFunction { name, params, body }
            }
            WireNode::Condition { params } => {
                let mut parts = params.into_iter();
                match (parts.next(), parts.next(), parts.next(), parts.next()) {
                    (Some(guard), Some(then), otherwise, None) => Node::Condition {
                        guard: Box::new(guard),
                        then: Box::new(then),
                        otherwise: otherwise.map(Box::new),
                    },
                    _ => return Err("Condition params are [guard, then, else?]".to_string()),
                }
            }
            WireNode::ConstAssignment { name, mut params } => {
                if params.len() != 1 {
                    return Err(format!(
                        "ConstAssignment '{}' takes exactly one param, found {}",
                        name,
                        params.len()
                    ));
                }
                Node::ConstAssignment {
                    name,
                    value: Box::new(params.remove(0)),
                }
            }
            WireNode::StateAssignment { name, params } => {
                if params.is_empty() || params.len() > 2 {
                    return Err(format!(
                        "StateAssignment '{}' params are [body] or [watch list, body], found {}",
                        name,
                        params.len()
                    ));
                }
                Node::StateAssignment { name, params }
            }
            WireNode::CallExpression { name, values } => Node::CallExpression { name, values },
            WireNode::ExposedParameter { value } => Node::ExposedParameter { value },
            WireNode::Unknown => Node::Unknown,
        })
    }
}

fn name_list(names: Vec<String>) -> Node {
    Node::List {
        values: names.into_iter().map(|value| Node::Variable { value }).collect(),
    }
}

impl From<Node> for WireNode {
    fn from(node: Node) -> Self {
        match node {
            Node::Program { values } => WireNode::Program { values },
            Node::Number { value } => WireNode::Number { value },
            Node::String { value } => WireNode::String { value },
            Node::Color { value } => WireNode::Color { value },
            Node::Symbol { value } => WireNode::Symbol { value },
            Node::Variable { value } => WireNode::Variable { value },
            Node::List { values } => WireNode::List { values },
            Node::Vector { values } => WireNode::Vector { values },
            Node::Map { values } => WireNode::Map { values },
            Node::Function { params, body } => WireNode::Function {
                params: vec![name_list(params), (*body).clone()],
            },
            Node::NamedFunction { name, params, body } => WireNode::NamedFunction {
                name,
                params: vec![name_list(params), (*body).clone()],
            },
            Node::Condition {
                guard,
                then,
                otherwise,
            } => {
                let mut params = vec![*guard, *then];
                params.extend(otherwise.map(|b| *b));
                WireNode::Condition { params }
            }
            Node::ConstAssignment { name, value } => WireNode::ConstAssignment {
                name,
                params: vec![*value],
            },
            Node::StateAssignment { name, params } => WireNode::StateAssignment { name, params },
            Node::CallExpression { name, values } => WireNode::CallExpression { name, values },
            Node::ExposedParameter { value } => WireNode::ExposedParameter { value },
            Node::Unknown => WireNode::Unknown,
        }
    }
}

impl Node {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Node::Program { .. } => "Program",
            Node::Number { .. } => "Number",
            Node::String { .. } => "String",
            Node::Color { .. } => "Color",
            Node::Symbol { .. } => "Symbol",
            Node::Variable { .. } => "Variable",
            Node::List { .. } => "List",
            Node::Vector { .. } => "Vector",
            Node::Map { .. } => "Map",
            Node::Function { .. } => "Function",
            Node::NamedFunction { .. } => "NamedFunction",
            Node::Condition { .. } => "Condition",
            Node::ConstAssignment { .. } => "ConstAssignment",
            Node::StateAssignment { .. } => "StateAssignment",
            Node::CallExpression { .. } => "CallExpression",
            Node::ExposedParameter { .. } => "ExposedParameter",
            Node::Unknown => "Unknown",
        }
    }
}

pub fn parse(tokens: Vec<Token>) -> Result<Node> {
    let mut p = Parser { tokens, pos: 0 };
    p.parse_program()
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }
    fn peek_is(&self, k: TokenKind) -> bool {
        self.peek().map(|t| t.kind.clone()) == Some(k)
    }
    fn bump(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        t
    }
    fn location(&self) -> String {
        self.peek()
            .map(|t| format!(" at line {}, col {}", t.line, t.col))
            .unwrap_or_else(|| " at end of input".to_string())
    }
    fn eat(&mut self, kind: TokenKind) -> Result<Token> {
        if self.peek_is(kind.clone()) {
            if let Some(t) = self.bump() {
                return Ok(t);
            }
        }
        Err(anyhow!("expected {:?}{}", kind, self.location()))
    }
    fn eat_ident(&mut self) -> Result<String> {
        if self.peek_is(TokenKind::Ident) {
            if let Some(t) = self.bump() {
                return Ok(t.text);
            }
        }
        Err(anyhow!("expected a name{}", self.location()))
    }

    fn parse_program(&mut self) -> Result<Node> {
        let mut values = Vec::new();
        while self.peek().is_some() {
            values.push(self.parse_form()?);
        }
        Ok(Node::Program { values })
    }

    // Forms up to (not including) the closing token.
    fn parse_until(&mut self, close: TokenKind) -> Result<Vec<Node>> {
        let mut out = Vec::new();
        while !self.peek_is(close.clone()) {
            if self.peek().is_none() {
                bail!("unclosed form: expected {:?} before end of input", close);
            }
            out.push(self.parse_form()?);
        }
        Ok(out)
    }

    fn parse_form(&mut self) -> Result<Node> {
        let tok = match self.bump() {
            Some(t) => t,
            None => bail!("unexpected end of input"),
        };
        let node = match tok.kind {
            TokenKind::Number => Node::Number {
                value: tok
                    .text
                    .parse()
                    .map_err(|_| anyhow!("invalid number '{}' at line {}, col {}", tok.text, tok.line, tok.col))?,
            },
            TokenKind::String => Node::String {
                value: tok.text.trim_matches('"').to_string(),
            },
            TokenKind::Color => Node::Color {
                value: Rgba::from_hex(&tok.text).ok_or_else(|| {
                    anyhow!("invalid color '{}' at line {}, col {}", tok.text, tok.line, tok.col)
                })?,
            },
            TokenKind::Symbol => Node::Symbol { value: tok.text },
            TokenKind::Ident => Node::Variable { value: tok.text },
            TokenKind::LBracket => {
                let values = self.parse_until(TokenKind::RBracket)?;
                self.eat(TokenKind::RBracket)?;
                Node::List { values }
            }
            TokenKind::LBrace => {
                let values = self.parse_until(TokenKind::RBrace)?;
                self.eat(TokenKind::RBrace)?;
                Node::Map { values }
            }
            TokenKind::LParen => {
                let node = self.parse_compound(&tok)?;
                self.eat(TokenKind::RParen)?;
                node
            }
            _ => bail!("unexpected '{}' at line {}, col {}", tok.text, tok.line, tok.col),
        };
        Ok(node)
    }

    fn parse_compound(&mut self, open: &Token) -> Result<Node> {
        if !self.peek_is(TokenKind::Ident) {
            bail!(
                "form opened at line {}, col {} must start with a name{}",
                open.line,
                open.col,
                self.location()
            );
        }
        let head = self.eat_ident()?;
        let node = match head.as_str() {
            "const" => {
                let name = self.eat_ident()?;
                let value = Box::new(self.parse_form()?);
                Node::ConstAssignment { name, value }
            }
            "$" => {
                let name = self.eat_ident()?;
                let params = self.parse_until(TokenKind::RParen)?;
                if params.is_empty() || params.len() > 2 {
                    bail!(
                        "state '{}' at line {}, col {} takes a body or a watch list and a body",
                        name,
                        open.line,
                        open.col
                    );
                }
                Node::StateAssignment {
                    name,
                    params: params.into_iter().map(Rc::new).collect(),
                }
            }
            "fn" => {
                let name = if self.peek_is(TokenKind::Ident) {
                    Some(self.eat_ident()?)
                } else {
                    None
                };
                let params = self.parse_param_list()?;
                let body = Rc::new(self.parse_body(open)?);
                match name {
                    Some(name) => Node::NamedFunction { name, params, body },
                    None => Node::Function { params, body },
                }
            }
            "if" => {
                let mut parts = self.parse_until(TokenKind::RParen)?.into_iter();
                match (parts.next(), parts.next(), parts.next(), parts.next()) {
                    (Some(guard), Some(then), otherwise, None) => Node::Condition {
                        guard: Box::new(guard),
                        then: Box::new(then),
                        otherwise: otherwise.map(Box::new),
                    },
                    _ => bail!(
                        "'if' at line {}, col {} takes a guard, a branch and an optional else",
                        open.line,
                        open.col
                    ),
                }
            }
            "Vector" => Node::Vector {
                values: self.parse_until(TokenKind::RParen)?,
            },
            "expose" => Node::ExposedParameter {
                value: Box::new(self.parse_form()?),
            },
            _ => Node::CallExpression {
                name: head,
                values: self.parse_until(TokenKind::RParen)?,
            },
        };
        Ok(node)
    }

    fn parse_param_list(&mut self) -> Result<Vec<String>> {
        self.eat(TokenKind::LBracket)?;
        let mut params = Vec::new();
        while !self.peek_is(TokenKind::RBracket) {
            params.push(self.eat_ident()?);
        }
        self.eat(TokenKind::RBracket)?;
        Ok(params)
    }

    // Several body forms run in sequence, like a program.
    fn parse_body(&mut self, open: &Token) -> Result<Node> {
        let mut forms = self.parse_until(TokenKind::RParen)?;
        match forms.len() {
            0 => bail!("function at line {}, col {} has no body", open.line, open.col),
            1 => Ok(forms.remove(0)),
            _ => Ok(Node::Program { values: forms }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::lex;

    fn parse_src(src: &str) -> Node {
        parse(lex(src).unwrap()).unwrap()
    }

    fn single(src: &str) -> Node {
        match parse_src(src) {
            Node::Program { mut values } if values.len() == 1 => values.remove(0),
            other => panic!("expected one form, got {:?}", other),
        }
    }

    #[test]
    fn observing_state_form() {
        let node = single("($ b [a] (add a 1))");
        match node {
            Node::StateAssignment { name, params } => {
                assert_eq!(name, "b");
                assert_eq!(params.len(), 2);
                assert!(matches!(params[0].as_ref(), Node::List { values } if values.len() == 1));
                assert!(matches!(params[1].as_ref(), Node::CallExpression { name, .. } if name == "add"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn named_and_anonymous_functions() {
        assert!(matches!(single("(fn sq [x] (mul x x))"), Node::NamedFunction { name, params, .. } if name == "sq" && params == vec!["x"]));
        assert!(matches!(single("(fn [a b] a b)"), Node::Function { body, .. } if matches!(body.as_ref(), Node::Program { values } if values.len() == 2)));
    }

    #[test]
    fn vector_arity_is_left_to_evaluation() {
        assert!(matches!(single("(Vector 1)"), Node::Vector { values } if values.len() == 1));
    }

    #[test]
    fn unclosed_form_is_an_error() {
        let err = parse(lex("(add 1 2").unwrap()).unwrap_err().to_string();
        assert!(err.contains("unclosed"), "unexpected message: {}", err);
    }

    #[test]
    fn call_head_must_be_a_name() {
        assert!(parse(lex("((fn [x] x) 1)").unwrap()).is_err());
    }

    #[test]
    fn function_params_from_json() {
        let node: Node = serde_json::from_str(
            r#"{"kind":"Function","params":[
                {"kind":"List","values":[{"kind":"Variable","value":"a"},{"kind":"Variable","value":"b"}]},
                {"kind":"Variable","value":"a"},
                {"kind":"Variable","value":"b"}
            ]}"#,
        )
        .unwrap();
        match node {
            Node::Function { params, body } => {
                assert_eq!(params, vec!["a", "b"]);
                assert!(matches!(body.as_ref(), Node::Program { values } if values.len() == 2));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(serde_json::from_str::<Node>(r#"{"kind":"Function","params":[{"kind":"List","values":[]}]}"#).is_err());
    }

    #[test]
    fn serialized_tree_reads_back() {
        let tree = parse_src("(const k 2) (fn f [x] (if x k)) ($ s [k] (f k))");
        let json = serde_json::to_value(&tree).unwrap();
        assert_eq!(json["values"][0]["params"][0]["value"], 2.0);
        assert_eq!(json["values"][1]["params"][0]["kind"], "List");
        assert_eq!(serde_json::from_value::<Node>(json).unwrap(), tree);
    }

    #[test]
    fn unknown_kind_from_json() {
        let node: Node = serde_json::from_str(r#"{"kind":"Loop","body":[]}"#).unwrap();
        assert_eq!(node, Node::Unknown);
    }
}
