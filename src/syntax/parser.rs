//! Indentation-aware parser for GDScript class files.
//!
//! Parsing happens in two passes:
//!
//! 1. Tokens are grouped into *logical lines*: a newline inside brackets or
//!    after a `\` continuation does not end the line. Bracket balance is
//!    checked here.
//! 2. Logical lines are parsed into class members by indentation level.
//!    Function bodies are not turned into a tree; they are scanned for block
//!    structure and for the warnings the parser reports.
//!
//! Only the first error is reported. The tree keeps every declaration parsed
//! before it.

use rustc_hash::FxHashMap;
use smol_str::SmolStr;

use super::ast::{
    BlockNode, ClassNode, ConstantNode, FunctionNode, Node, NodeKind, Param, ParseError,
    ParseOutput, SignalNode, SyntaxTree, VariableNode, Warning, WarningCode,
};
use super::lexer::{Token, TokenKind, tokenize_partial};
use crate::base::leading_whitespace_len;

/// Modifiers accepted before `var` / `func` for network replication.
const RPC_MODIFIERS: &[&str] = &[
    "remote",
    "master",
    "puppet",
    "slave",
    "sync",
    "remotesync",
    "mastersync",
    "puppetsync",
];

/// Parse a whole source text.
pub fn parse(source: &str) -> ParseOutput {
    let (tokens, lex_error) = tokenize_partial(source);
    let (lines, split_error) = split_logical_lines(source, tokens);
    let early_error = split_error.or(lex_error);

    let mut parser = Parser {
        source,
        lines: &lines,
        pos: 0,
        truncated: early_error.is_some(),
        warnings: Vec::new(),
    };

    let mut tree = SyntaxTree::default();
    let result = parser.parse_class_body(&mut tree.class, 0);
    tree.end_line = lines.last().map_or(1, |l| l.last_line);

    let error = match (result.err(), early_error) {
        (Some(a), Some(b)) => Some(if a.line <= b.line { a } else { b }),
        (a, b) => a.or(b),
    };

    let warnings = if error.is_none() {
        let mut warnings = parser.warnings;
        warnings.sort_by_key(|w| w.line);
        warnings
    } else {
        Vec::new()
    };

    ParseOutput {
        tree,
        error,
        warnings,
    }
}

// ============================================================================
// LOGICAL LINES
// ============================================================================

#[derive(Debug)]
struct LogicalLine<'s> {
    tokens: Vec<Token<'s>>,
    /// Leading whitespace width of the first physical line.
    indent: u32,
    /// 1-indexed line of the first token.
    line: u32,
    /// 1-indexed line of the last token.
    last_line: u32,
    /// Comment block directly above the line.
    doc: Option<String>,
}

fn split_logical_lines<'s>(
    source: &'s str,
    tokens: Vec<Token<'s>>,
) -> (Vec<LogicalLine<'s>>, Option<ParseError>) {
    let physical: Vec<&str> = source.split('\n').collect();
    let mut lines = Vec::new();
    let mut current: Vec<Token<'s>> = Vec::new();
    let mut open: Vec<Token<'s>> = Vec::new();
    let mut comments: Vec<(u32, String)> = Vec::new();

    for token in tokens {
        match token.kind {
            TokenKind::Comment => {
                if current.is_empty() {
                    comments.push((token.line, comment_text(token.text)));
                }
            }
            TokenKind::LineContinuation => {}
            TokenKind::Newline => {
                if open.is_empty() && !current.is_empty() {
                    lines.push(finish_line(std::mem::take(&mut current), &physical, &mut comments));
                }
            }
            kind if kind.is_opener() => {
                open.push(token.clone());
                current.push(token);
            }
            kind => {
                if let Some(expected) = kind.opener() {
                    match open.pop() {
                        Some(opener) if opener.kind == expected => {}
                        Some(opener) => {
                            let message = format!(
                                "Closing '{}' does not match opening '{}'.",
                                token.text, opener.text
                            );
                            return (lines, Some(ParseError::new(message, token.line, token.column)));
                        }
                        None => {
                            let message = format!("Unexpected '{}'.", token.text);
                            return (lines, Some(ParseError::new(message, token.line, token.column)));
                        }
                    }
                }
                current.push(token);
            }
        }
    }

    if let Some(opener) = open.first() {
        let message = format!("Unclosed '{}'.", opener.text);
        return (lines, Some(ParseError::new(message, opener.line, opener.column)));
    }
    if !current.is_empty() {
        lines.push(finish_line(current, &physical, &mut comments));
    }
    (lines, None)
}

fn finish_line<'s>(
    tokens: Vec<Token<'s>>,
    physical: &[&str],
    comments: &mut Vec<(u32, String)>,
) -> LogicalLine<'s> {
    let line = tokens[0].line;
    let last_line = tokens[tokens.len() - 1].line;
    let indent = physical
        .get(line as usize - 1)
        .map_or(0, |text| leading_whitespace_len(text));

    // Comments directly above, without blank lines in between.
    let mut doc = Vec::new();
    let mut expected = line.saturating_sub(1);
    while let Some((comment_line, _)) = comments.last() {
        if *comment_line != expected || expected == 0 {
            break;
        }
        if let Some((_, text)) = comments.pop() {
            doc.push(text);
        }
        expected -= 1;
    }
    comments.clear();
    doc.reverse();

    LogicalLine {
        tokens,
        indent,
        line,
        last_line,
        doc: if doc.is_empty() { None } else { Some(doc.join("\n")) },
    }
}

fn comment_text(text: &str) -> String {
    let text = text.trim_start_matches('#');
    text.strip_prefix(' ').unwrap_or(text).trim_end().to_string()
}

// ============================================================================
// DECLARATIONS
// ============================================================================

struct Parser<'a, 's> {
    source: &'s str,
    lines: &'a [LogicalLine<'s>],
    pos: usize,
    /// The token stream ended early because of a lexical or bracket error.
    /// Blocks cut off at the end of input are then not reported.
    truncated: bool,
    warnings: Vec<Warning>,
}

/// What a member declaration consumed.
struct MemberEnd {
    last_line: u32,
    opened_class: bool,
}

impl<'a, 's> Parser<'a, 's> {
    fn peek(&self) -> Option<&'a LogicalLine<'s>> {
        let lines = self.lines;
        lines.get(self.pos)
    }

    fn at_truncated_end(&self) -> bool {
        self.truncated && self.pos >= self.lines.len()
    }

    /// Parse members at exactly `indent` until a dedent. Returns the last
    /// line consumed.
    fn parse_class_body(&mut self, class: &mut ClassNode, indent: u32) -> Result<u32, ParseError> {
        let mut last_line = 0;
        let mut after_class = false;

        while let Some(line) = self.peek() {
            if line.indent < indent {
                break;
            }
            if line.indent > indent {
                let message = if after_class {
                    "Unindent does not match any outer indentation level."
                } else {
                    "Unexpected indentation."
                };
                return Err(ParseError::new(message, line.line, line.indent));
            }
            self.pos += 1;
            let end = self.parse_member(class, line)?;
            last_line = end.last_line;
            after_class = end.opened_class;
        }

        Ok(last_line)
    }

    fn parse_member(&mut self, class: &mut ClassNode, line: &'a LogicalLine<'s>) -> Result<MemberEnd, ParseError> {
        let toks = &line.tokens;
        let first = &toks[0];
        let simple = MemberEnd {
            last_line: line.last_line,
            opened_class: false,
        };

        match first.kind {
            TokenKind::Tool | TokenKind::Pass => Ok(simple),
            TokenKind::Extends => {
                class.extends = Some(self.parse_extends(toks, 1)?);
                Ok(simple)
            }
            TokenKind::ClassName => {
                let name = expect_name(toks, 1, "class_name")?;
                class.name = Some(SmolStr::new(name.text));
                class.name_column = name.column;
                class.is_global = true;
                if class.doc.is_none() {
                    class.doc = line.doc.clone();
                }
                Ok(simple)
            }
            TokenKind::Const => {
                class.members.push(self.parse_constant(line)?);
                Ok(simple)
            }
            TokenKind::Signal => {
                class.members.push(self.parse_signal(line)?);
                Ok(simple)
            }
            TokenKind::Enum => {
                class.members.extend(self.parse_enum(line)?);
                Ok(simple)
            }
            TokenKind::Class => self.parse_subclass(class, line),
            TokenKind::Var | TokenKind::Export | TokenKind::Onready | TokenKind::Func | TokenKind::Static => {
                self.parse_modified_member(class, line)
            }
            TokenKind::Identifier if RPC_MODIFIERS.contains(&first.text) => self.parse_modified_member(class, line),
            _ => Err(ParseError::new(
                format!("Unexpected '{}' in class body.", first.text),
                first.line,
                first.column,
            )),
        }
    }

    /// `var` and `func` declarations with their optional modifiers.
    fn parse_modified_member(
        &mut self,
        class: &mut ClassNode,
        line: &'a LogicalLine<'s>,
    ) -> Result<MemberEnd, ParseError> {
        let toks = &line.tokens;
        let mut i = 0;
        let mut exported = false;
        let mut onready = false;

        while let Some(tok) = toks.get(i) {
            match tok.kind {
                TokenKind::Export => {
                    exported = true;
                    i += 1;
                    if toks.get(i).is_some_and(|t| t.kind == TokenKind::LParen) {
                        i = matching_close(toks, i) + 1;
                    }
                }
                TokenKind::Onready => {
                    onready = true;
                    i += 1;
                }
                TokenKind::Identifier if RPC_MODIFIERS.contains(&tok.text) => i += 1,
                _ => break,
            }
        }

        match toks.get(i).map(|t| t.kind) {
            Some(TokenKind::Var) => {
                class.members.push(self.parse_variable(line, i, exported, onready)?);
                Ok(MemberEnd {
                    last_line: line.last_line,
                    opened_class: false,
                })
            }
            Some(TokenKind::Func) | Some(TokenKind::Static) => {
                let node = self.parse_function(line, i)?;
                let last_line = node.end_line;
                class.members.push(node);
                Ok(MemberEnd {
                    last_line,
                    opened_class: false,
                })
            }
            _ => {
                let tok = toks.get(i).unwrap_or(&toks[toks.len() - 1]);
                Err(ParseError::new(
                    format!("Expected 'var' or 'func' after '{}'.", toks[0].text),
                    tok.line,
                    tok.column,
                ))
            }
        }
    }

    fn parse_extends(&self, toks: &[Token<'s>], at: usize) -> Result<SmolStr, ParseError> {
        let Some(tok) = toks.get(at) else {
            let last = &toks[toks.len() - 1];
            return Err(ParseError::new(
                "Expected class name or path after 'extends'.",
                last.line,
                last.column,
            ));
        };
        match tok.kind {
            TokenKind::String => Ok(SmolStr::new(unquote(tok.text))),
            kind if kind.is_name() => {
                // Dotted names such as `Outer.Inner`.
                let mut end = at;
                while toks.get(end + 1).is_some_and(|t| t.kind == TokenKind::Dot)
                    && toks.get(end + 2).is_some_and(|t| t.kind.is_name())
                {
                    end += 2;
                }
                Ok(SmolStr::new(self.text_of(&toks[at..=end])))
            }
            _ => Err(ParseError::new(
                "Expected class name or path after 'extends'.",
                tok.line,
                tok.column,
            )),
        }
    }

    fn parse_variable(
        &self,
        line: &LogicalLine<'s>,
        at: usize,
        exported: bool,
        onready: bool,
    ) -> Result<Node, ParseError> {
        let toks = &line.tokens;
        let name = expect_name(toks, at + 1, "var")?;
        let mut type_hint = None;
        let mut default = None;

        let mut i = at + 2;
        while let Some(tok) = toks.get(i) {
            match tok.kind {
                TokenKind::Colon => {
                    let end = find_kind(toks, i + 1, &[TokenKind::Assign, TokenKind::Setget]);
                    if end == i + 1 {
                        return Err(ParseError::new("Expected type after ':'.", tok.line, tok.column));
                    }
                    type_hint = Some(SmolStr::new(self.text_of(&toks[i + 1..end])));
                    i = end;
                }
                TokenKind::Assign | TokenKind::ColonAssign => {
                    let end = find_kind(toks, i + 1, &[TokenKind::Setget]);
                    if end == i + 1 {
                        return Err(ParseError::new("Expected expression after '='.", tok.line, tok.column));
                    }
                    default = Some(self.text_of(&toks[i + 1..end]).to_string());
                    i = end;
                }
                TokenKind::Setget => break,
                _ => {
                    return Err(ParseError::new(
                        format!("Unexpected '{}' in variable declaration.", tok.text),
                        tok.line,
                        tok.column,
                    ));
                }
            }
        }

        Ok(Node {
            line: line.line,
            column: toks[0].column,
            end_line: line.last_line,
            kind: NodeKind::Variable(VariableNode {
                name: SmolStr::new(name.text),
                name_column: name.column,
                type_hint,
                default,
                exported,
                onready,
                doc: line.doc.clone(),
            }),
        })
    }

    fn parse_constant(&self, line: &LogicalLine<'s>) -> Result<Node, ParseError> {
        let toks = &line.tokens;
        let name = expect_name(toks, 1, "const")?;
        let mut i = 2;
        let mut type_hint = None;

        if toks.get(i).is_some_and(|t| t.kind == TokenKind::Colon) {
            let end = find_kind(toks, i + 1, &[TokenKind::Assign]);
            if end > i + 1 {
                type_hint = Some(SmolStr::new(self.text_of(&toks[i + 1..end])));
            }
            i = end;
        }

        let value = match toks.get(i).map(|t| t.kind) {
            Some(TokenKind::Assign) | Some(TokenKind::ColonAssign) if i + 1 < toks.len() => {
                self.text_of(&toks[i + 1..]).to_string()
            }
            _ => {
                return Err(ParseError::new(
                    "Expected '=' after constant name.",
                    name.line,
                    name.column,
                ));
            }
        };

        Ok(Node {
            line: line.line,
            column: toks[0].column,
            end_line: line.last_line,
            kind: NodeKind::Constant(ConstantNode {
                name: SmolStr::new(name.text),
                name_column: name.column,
                type_hint,
                value,
                doc: line.doc.clone(),
            }),
        })
    }

    fn parse_signal(&self, line: &LogicalLine<'s>) -> Result<Node, ParseError> {
        let toks = &line.tokens;
        let name = expect_name(toks, 1, "signal")?;
        let params = match toks.get(2) {
            Some(tok) if tok.kind == TokenKind::LParen => {
                let close = matching_close(toks, 2);
                self.parse_params(&toks[3..close])?
            }
            Some(tok) => {
                return Err(ParseError::new(
                    format!("Unexpected '{}' after signal name.", tok.text),
                    tok.line,
                    tok.column,
                ));
            }
            None => Vec::new(),
        };

        Ok(Node {
            line: line.line,
            column: toks[0].column,
            end_line: line.last_line,
            kind: NodeKind::Signal(SignalNode {
                name: SmolStr::new(name.text),
                name_column: name.column,
                params,
                doc: line.doc.clone(),
            }),
        })
    }

    /// `enum Name { A, B = 2 }` yields one constant holding the dictionary;
    /// an unnamed enum yields one constant per value.
    fn parse_enum(&self, line: &LogicalLine<'s>) -> Result<Vec<Node>, ParseError> {
        let toks = &line.tokens;
        let (name, open) = match toks.get(1) {
            Some(tok) if tok.kind.is_name() => (Some(tok), 2),
            _ => (None, 1),
        };
        let Some(brace) = toks.get(open).filter(|t| t.kind == TokenKind::LBrace) else {
            let tok = toks.get(open).unwrap_or(&toks[0]);
            return Err(ParseError::new("Expected '{' after enum.", tok.line, tok.column));
        };
        let close = matching_close(toks, open);

        if let Some(name) = name {
            let value = self.source[brace.span.start..toks[close].span.end].to_string();
            return Ok(vec![Node {
                line: line.line,
                column: toks[0].column,
                end_line: line.last_line,
                kind: NodeKind::Constant(ConstantNode {
                    name: SmolStr::new(name.text),
                    name_column: name.column,
                    type_hint: None,
                    value,
                    doc: line.doc.clone(),
                }),
            }]);
        }

        let mut nodes = Vec::new();
        let mut next_value: i64 = 0;
        for entry in split_top_level(&toks[open + 1..close]) {
            let Some(name) = entry.first().filter(|t| t.kind.is_name()) else {
                if let Some(tok) = entry.first() {
                    return Err(ParseError::new("Expected enum value name.", tok.line, tok.column));
                }
                continue;
            };
            let value = if entry.len() > 2 && entry[1].kind == TokenKind::Assign {
                let text = self.text_of(&entry[2..]).to_string();
                next_value = text.parse::<i64>().map_or(next_value, |v| v) + 1;
                text
            } else {
                next_value += 1;
                (next_value - 1).to_string()
            };
            nodes.push(Node {
                line: name.line,
                column: name.column,
                end_line: name.line,
                kind: NodeKind::Constant(ConstantNode {
                    name: SmolStr::new(name.text),
                    name_column: name.column,
                    type_hint: None,
                    value,
                    doc: None,
                }),
            });
        }
        Ok(nodes)
    }

    fn parse_params(&self, toks: &[Token<'s>]) -> Result<Vec<Param>, ParseError> {
        let mut params = Vec::new();
        for group in split_top_level(toks) {
            let Some(name) = group.first() else {
                continue;
            };
            if !name.kind.is_name() {
                return Err(ParseError::new("Expected argument name.", name.line, name.column));
            }
            let mut type_hint = None;
            let mut default = None;
            let mut i = 1;
            if group.get(i).is_some_and(|t| t.kind == TokenKind::Colon) {
                let end = find_kind(group, i + 1, &[TokenKind::Assign]);
                if end > i + 1 {
                    type_hint = Some(SmolStr::new(self.text_of(&group[i + 1..end])));
                }
                i = end;
            }
            if let Some(tok) = group.get(i) {
                if matches!(tok.kind, TokenKind::Assign | TokenKind::ColonAssign) && i + 1 < group.len() {
                    default = Some(self.text_of(&group[i + 1..]).to_string());
                } else {
                    return Err(ParseError::new(
                        format!("Unexpected '{}' in argument list.", tok.text),
                        tok.line,
                        tok.column,
                    ));
                }
            }
            params.push(Param {
                name: SmolStr::new(name.text),
                type_hint,
                default,
            });
        }
        Ok(params)
    }

    fn parse_function(&mut self, line: &'a LogicalLine<'s>, at: usize) -> Result<Node, ParseError> {
        let toks = &line.tokens;
        let is_static = toks[at].kind == TokenKind::Static;
        let func_at = if is_static { at + 1 } else { at };
        if toks.get(func_at).is_none_or(|t| t.kind != TokenKind::Func) {
            let tok = &toks[at];
            return Err(ParseError::new("Expected 'func' after 'static'.", tok.line, tok.column));
        }

        let name = expect_name(toks, func_at + 1, "func")?;
        let open = func_at + 2;
        if toks.get(open).is_none_or(|t| t.kind != TokenKind::LParen) {
            return Err(ParseError::new("Expected '(' after function name.", name.line, name.column));
        }
        let close = matching_close(toks, open);
        let params = self.parse_params(&toks[open + 1..close])?;

        let mut i = close + 1;
        let mut return_type = None;
        if let Some(arrow) = toks.get(i).filter(|t| t.kind == TokenKind::Arrow) {
            let end = find_kind(toks, i + 1, &[TokenKind::Colon]);
            if end == i + 1 {
                return Err(ParseError::new("Expected return type after '->'.", arrow.line, arrow.column));
            }
            return_type = Some(SmolStr::new(self.text_of(&toks[i + 1..end])));
            i = end;
        }
        let Some(colon) = toks.get(i).filter(|t| t.kind == TokenKind::Colon) else {
            let tok = toks.get(i).unwrap_or(&toks[toks.len() - 1]);
            return Err(ParseError::new(
                "Expected ':' after function declaration.",
                tok.line,
                tok.column,
            ));
        };

        let inline = &toks[i + 1..];
        let mut body_lines: Vec<&'a LogicalLine<'s>> = Vec::new();
        while let Some(next) = self.peek() {
            if next.indent <= line.indent {
                break;
            }
            body_lines.push(next);
            self.pos += 1;
        }

        let last_statement_line = match body_lines.last() {
            Some(last) => last.last_line,
            None if !inline.is_empty() || self.at_truncated_end() => line.last_line,
            None => {
                let (err_line, err_col) = self.peek().map_or((line.last_line + 1, 0), |n| (n.line, n.indent));
                return Err(ParseError::new(
                    "Expected indented block after function declaration.",
                    err_line,
                    err_col,
                ));
            }
        };

        let function = FunctionNode {
            name: SmolStr::new(name.text),
            name_column: name.column,
            is_static,
            params,
            return_type,
            body: BlockNode {
                line: colon.line,
                end_line: last_statement_line + 1,
            },
            doc: line.doc.clone(),
        };

        self.check_body(&function, line, inline, &body_lines)?;

        Ok(Node {
            line: line.line,
            column: toks[0].column,
            end_line: last_statement_line,
            kind: NodeKind::Function(function),
        })
    }

    fn parse_subclass(&mut self, class: &mut ClassNode, line: &'a LogicalLine<'s>) -> Result<MemberEnd, ParseError> {
        let toks = &line.tokens;
        let name = expect_name(toks, 1, "class")?;
        let mut sub = ClassNode {
            name: Some(SmolStr::new(name.text)),
            name_column: name.column,
            doc: line.doc.clone(),
            ..ClassNode::default()
        };

        let mut i = 2;
        if toks.get(i).is_some_and(|t| t.kind == TokenKind::Extends) {
            sub.extends = Some(self.parse_extends(toks, i + 1)?);
            i = find_kind(toks, i + 1, &[TokenKind::Colon]);
        }
        if toks.get(i).is_none_or(|t| t.kind != TokenKind::Colon) {
            let tok = toks.get(i).unwrap_or(&toks[toks.len() - 1]);
            return Err(ParseError::new("Expected ':' after class declaration.", tok.line, tok.column));
        }
        let has_inline = i + 1 < toks.len();

        let result = match self.peek() {
            Some(next) if next.indent > line.indent => self.parse_class_body(&mut sub, next.indent),
            _ if has_inline || self.at_truncated_end() => Ok(line.last_line),
            next => {
                let (err_line, err_col) = next.map_or((line.last_line + 1, 0), |n| (n.line, n.indent));
                Err(ParseError::new(
                    "Expected indented block after class declaration.",
                    err_line,
                    err_col,
                ))
            }
        };

        let last_line = result.as_ref().map_or(line.last_line, |&l| l.max(line.last_line));
        class.members.push(Node {
            line: line.line,
            column: toks[0].column,
            end_line: last_line,
            kind: NodeKind::Class(sub),
        });
        result?;

        Ok(MemberEnd {
            last_line,
            opened_class: true,
        })
    }

    // ========================================================================
    // FUNCTION BODIES
    // ========================================================================

    /// Validate block headers and collect unused/unreachable warnings.
    fn check_body(
        &mut self,
        function: &FunctionNode,
        header: &LogicalLine<'s>,
        inline: &[Token<'s>],
        body: &[&LogicalLine<'s>],
    ) -> Result<(), ParseError> {
        let mut uses: FxHashMap<&str, usize> = FxHashMap::default();
        let mut locals: Vec<(&str, u32)> = Vec::new();
        let mut returned_at: Option<u32> = None;

        let statements = std::iter::once((header.indent + 1, header.line, inline))
            .filter(|(_, _, toks)| !toks.is_empty())
            .chain(body.iter().map(|l| (l.indent, l.line, l.tokens.as_slice())));

        for (indent, line, toks) in statements {
            if let Some(ret) = returned_at.take() {
                if indent == ret {
                    self.warnings.push(Warning {
                        code: WarningCode::UnreachableCode,
                        line,
                        message: format!(
                            "Unreachable code (statement after return) in function '{}()'.",
                            function.name
                        ),
                    });
                }
            }

            let first = &toks[0];
            match first.kind {
                TokenKind::If
                | TokenKind::Elif
                | TokenKind::Else
                | TokenKind::For
                | TokenKind::While
                | TokenKind::Match => {
                    if !toks.iter().any(|t| t.kind == TokenKind::Colon) {
                        let last = &toks[toks.len() - 1];
                        return Err(ParseError::new(
                            format!("Expected ':' after '{}' block header.", first.text),
                            last.line,
                            last.column,
                        ));
                    }
                }
                TokenKind::Var => {
                    let name = expect_name(toks, 1, "var")?;
                    locals.push((name.text, name.line));
                }
                TokenKind::Return => returned_at = Some(indent),
                TokenKind::Func | TokenKind::Class | TokenKind::Signal => {
                    return Err(ParseError::new(
                        format!("Unexpected '{}' inside function body.", first.text),
                        first.line,
                        first.column,
                    ));
                }
                _ => {}
            }

            for tok in toks.iter().filter(|t| t.kind.is_name()) {
                *uses.entry(tok.text).or_default() += 1;
            }
        }

        for (name, line) in locals {
            if uses.get(name).copied().unwrap_or(0) <= 1 {
                self.warnings.push(Warning {
                    code: WarningCode::UnusedVariable,
                    line,
                    message: format!(
                        "The local variable '{}' is declared but never used in the block.",
                        name
                    ),
                });
            }
        }

        for param in &function.params {
            if param.name.starts_with('_') || uses.contains_key(param.name.as_str()) {
                continue;
            }
            self.warnings.push(Warning {
                code: WarningCode::UnusedArgument,
                line: header.line,
                message: format!(
                    "The argument '{}' is never used in the function '{}'. If this is intended, prefix it with an underscore: '_{}'",
                    param.name, function.name, param.name
                ),
            });
        }

        Ok(())
    }

    /// Source text covered by a token run.
    fn text_of(&self, toks: &[Token<'s>]) -> &'s str {
        match (toks.first(), toks.last()) {
            (Some(first), Some(last)) => &self.source[first.span.start..last.span.end],
            _ => "",
        }
    }
}

// ============================================================================
// TOKEN HELPERS
// ============================================================================

fn expect_name<'t, 's>(toks: &'t [Token<'s>], at: usize, after: &str) -> Result<&'t Token<'s>, ParseError> {
    match toks.get(at) {
        Some(tok) if tok.kind.is_name() => Ok(tok),
        Some(tok) => Err(ParseError::new(
            format!("Expected identifier after '{}'.", after),
            tok.line,
            tok.column,
        )),
        None => {
            let last = &toks[toks.len() - 1];
            Err(ParseError::new(
                format!("Expected identifier after '{}'.", after),
                last.line,
                last.column,
            ))
        }
    }
}

/// Index of the bracket closing the opener at `open`. Brackets are balanced
/// within a logical line; without a partner the last index is returned.
fn matching_close(toks: &[Token<'_>], open: usize) -> usize {
    let mut depth = 0usize;
    for (i, tok) in toks.iter().enumerate().skip(open) {
        if tok.kind.is_opener() {
            depth += 1;
        } else if tok.kind.opener().is_some() {
            depth -= 1;
            if depth == 0 {
                return i;
            }
        }
    }
    toks.len().saturating_sub(1)
}

/// First index at or after `from` holding one of `kinds` at bracket depth 0,
/// or `toks.len()`.
fn find_kind(toks: &[Token<'_>], from: usize, kinds: &[TokenKind]) -> usize {
    let mut depth = 0usize;
    for (i, tok) in toks.iter().enumerate().skip(from) {
        if depth == 0 && kinds.contains(&tok.kind) {
            return i;
        }
        if tok.kind.is_opener() {
            depth += 1;
        } else if tok.kind.opener().is_some() {
            depth = depth.saturating_sub(1);
        }
    }
    toks.len()
}

/// Split on commas at bracket depth 0.
fn split_top_level<'t, 's>(toks: &'t [Token<'s>]) -> Vec<&'t [Token<'s>]> {
    let mut groups = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, tok) in toks.iter().enumerate() {
        match tok.kind {
            TokenKind::Comma if depth == 0 => {
                groups.push(&toks[start..i]);
                start = i + 1;
            }
            kind if kind.is_opener() => depth += 1,
            kind if kind.opener().is_some() => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    if start < toks.len() {
        groups.push(&toks[start..]);
    }
    groups
}

fn unquote(text: &str) -> &str {
    text.trim_matches(|c| c == '"' || c == '\'')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(source: &str) -> ParseOutput {
        let output = parse(source);
        assert!(output.error.is_none(), "unexpected error: {:?}", output.error);
        output
    }

    #[test]
    fn test_members_in_declaration_order() {
        let output = parse_ok("extends Node\nvar a = 1\nsignal hit(amount)\nconst MAX = 3\nfunc foo():\n\tpass\n");
        let class = &output.tree.class;
        assert_eq!(class.extends.as_deref(), Some("Node"));
        let names: Vec<_> = class.members.iter().filter_map(|m| m.name()).map(|n| n.as_str()).collect();
        assert_eq!(names, vec!["a", "hit", "MAX", "foo"]);
    }

    #[test]
    fn test_function_block_lines() {
        let output = parse_ok("var a = 1\nfunc foo():\n\tpass");
        let (node, func) = output.tree.class.functions(false).next().unwrap();
        assert_eq!(node.line, 2);
        assert_eq!(func.body.line, 2);
        assert_eq!(func.body.end_line, 4);
        assert_eq!(node.end_line, 3);
    }

    #[test]
    fn test_function_signature_parts() {
        let output = parse_ok("static func add(a: int, b := 2) -> int:\n\treturn a + b\n");
        let (_, func) = output.tree.class.functions(true).next().unwrap();
        assert!(func.is_static);
        assert_eq!(func.return_type.as_deref(), Some("int"));
        assert_eq!(func.params[0].signature(), "a: int");
        assert_eq!(func.params[1].signature(), "b = 2");
    }

    #[test]
    fn test_multiline_call_is_one_logical_line() {
        let output = parse_ok("func f():\n\tprint(1,\n\t\t2)\n\tpass\n");
        let (_, func) = output.tree.class.functions(false).next().unwrap();
        assert_eq!(func.body.end_line, 5);
    }

    #[test]
    fn test_subclass_nesting() {
        let source = "class Inner extends Reference:\n\tvar x\n\tfunc g():\n\t\treturn x\nvar after\n";
        let output = parse_ok(source);
        let (node, inner) = output.tree.class.subclasses().next().unwrap();
        assert_eq!(inner.name.as_deref(), Some("Inner"));
        assert_eq!(inner.extends.as_deref(), Some("Reference"));
        assert_eq!(inner.members.len(), 2);
        assert_eq!(node.end_line, 4);
        assert!(output.tree.class.member("after").is_some());
    }

    #[test]
    fn test_class_name_registers_global() {
        let output = parse_ok("extends Node2D\nclass_name Player, \"res://icon.png\"\n");
        assert!(output.tree.class.is_global);
        assert_eq!(output.tree.class.name.as_deref(), Some("Player"));
    }

    #[test]
    fn test_doc_comments_attach_to_next_declaration() {
        let output = parse_ok("# Speed in pixels.\n# Per second.\nvar speed = 10\n\n# stray\n\nvar other\n");
        let speed = output.tree.class.member("speed").unwrap();
        assert_eq!(speed.doc(), Some("Speed in pixels.\nPer second."));
        let other = output.tree.class.member("other").unwrap();
        assert_eq!(other.doc(), None);
    }

    #[test]
    fn test_unnamed_enum_becomes_constants() {
        let output = parse_ok("enum { IDLE, RUN = 5, JUMP }\nenum State { A, B }\n");
        let values: Vec<_> = output
            .tree
            .class
            .constants()
            .map(|(_, c)| (c.name.to_string(), c.value.clone()))
            .collect();
        assert_eq!(
            values,
            vec![
                ("IDLE".to_string(), "0".to_string()),
                ("RUN".to_string(), "5".to_string()),
                ("JUMP".to_string(), "6".to_string()),
                ("State".to_string(), "{ A, B }".to_string()),
            ]
        );
    }

    #[test]
    fn test_named_enum_is_one_constant() {
        let output = parse_ok("enum Mode { ON, OFF = 3 }\n");
        let (node, mode) = output.tree.class.constants().next().unwrap();
        assert_eq!(mode.name, "Mode");
        assert_eq!(mode.value, "{ ON, OFF = 3 }");
        assert_eq!(node.line, 1);
        assert_eq!(output.tree.class.constants().count(), 1);
    }

    #[test]
    fn test_unmatched_paren_reports_its_line() {
        let output = parse("var a = 1\nfunc foo():\n\tprint(a))\n");
        let error = output.error.unwrap();
        assert_eq!(error.line, 3);
        assert_eq!(error.message, "Unexpected ')'.");
        // Declarations before the error survive.
        assert!(output.tree.class.member("a").is_some());
        assert!(output.warnings.is_empty());
    }

    #[test]
    fn test_unclosed_bracket() {
        let error = parse("var a = [1, 2\nvar b\n").error.unwrap();
        assert_eq!(error.line, 1);
        assert_eq!(error.message, "Unclosed '['.");
    }

    #[test]
    fn test_unexpected_indentation() {
        let error = parse("var a\n\tvar b\n").error.unwrap();
        assert_eq!(error.line, 2);
        assert_eq!(error.message, "Unexpected indentation.");
    }

    #[test]
    fn test_missing_function_body() {
        let error = parse("func foo():\nvar b\n").error.unwrap();
        assert_eq!(error.line, 2);
        assert_eq!(error.message, "Expected indented block after function declaration.");
    }

    #[test]
    fn test_missing_colon_on_block_header() {
        let error = parse("func foo():\n\tif true\n\t\tpass\n").error.unwrap();
        assert_eq!(error.line, 2);
    }

    #[test]
    fn test_warnings() {
        let source = "func foo(unused, _ok):\n\tvar temp = 1\n\treturn 0\n\tprint(1)\n";
        let output = parse_ok(source);
        let codes: Vec<_> = output.warnings.iter().map(|w| (w.code, w.line)).collect();
        assert_eq!(
            codes,
            vec![
                (WarningCode::UnusedArgument, 1),
                (WarningCode::UnusedVariable, 2),
                (WarningCode::UnreachableCode, 4),
            ]
        );
    }

    #[test]
    fn test_exported_and_rpc_modifiers() {
        let output = parse_ok("export(int, 0, 10) var hp = 5\nonready var label = $Label\nremote func sync_pos():\n\tpass\n");
        let (_, hp) = output.tree.class.variables().next().unwrap();
        assert!(hp.exported);
        assert_eq!(hp.default.as_deref(), Some("5"));
        let (_, label) = output.tree.class.variables().nth(1).unwrap();
        assert!(label.onready);
        assert_eq!(output.tree.class.functions(false).count(), 1);
    }
}
