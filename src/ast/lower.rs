//! Lowering from derivation trees to the typed AST.
//!
//! This module is the only place in the crate that matches on grammar
//! production shapes; everything downstream works on the typed AST. Each
//! lowering function matches `(head, rhs)` exhaustively and rejects any
//! derivation the source grammar cannot produce.

use super::{
    BinaryOp, Body, Comparison, Dcl, Expr, ExprKind, Initializer, LocalDecl, Lvalue, Main,
    Procedure, Program, Statement, Test, Type,
};
use crate::diag::Diag;
use crate::parser::ParseTree;
use smol_str::SmolStr;

/// Lowers a complete derivation tree into a [`Program`].
pub fn lower(tree: &ParseTree) -> Result<Program, Diag> {
    match shape(tree).as_slice() {
        ["start", "BOF", "procedures", "EOF"] => lower_procedures(&tree.children()[1]),
        _ => Err(malformed(tree)),
    }
}

/// The node head followed by its right-hand-side symbols.
fn shape(node: &ParseTree) -> Vec<&str> {
    match node {
        ParseTree::Leaf { kind, .. } => vec![kind.as_str()],
        ParseTree::Node { head, rhs, .. } => {
            let mut shape = Vec::with_capacity(rhs.len() + 1);
            shape.push(head.as_str());
            shape.extend(rhs.iter().map(SmolStr::as_str));
            shape
        }
    }
}

fn malformed(node: &ParseTree) -> Diag {
    Diag::error(format!(
        "malformed derivation: unexpected rule `{}`",
        shape(node).join(" ")
    ))
    .with_code("lower::malformed")
}

fn leaf_lexeme(node: &ParseTree) -> Result<SmolStr, Diag> {
    node.lexeme()
        .map(SmolStr::new)
        .ok_or_else(|| malformed(node))
}

fn lower_procedures(node: &ParseTree) -> Result<Program, Diag> {
    let mut procedures = Vec::new();
    let mut current = node;

    loop {
        match shape(current).as_slice() {
            ["procedures", "procedure", "procedures"] => {
                procedures.push(lower_procedure(&current.children()[0])?);
                current = &current.children()[1];
            }
            ["procedures", "main"] => {
                let main = lower_main(&current.children()[0])?;
                return Ok(Program { procedures, main });
            }
            _ => return Err(malformed(current)),
        }
    }
}

fn lower_procedure(node: &ParseTree) -> Result<Procedure, Diag> {
    match shape(node).as_slice() {
        ["procedure", "INT", "ID", "LPAREN", "params", "RPAREN", "LBRACE", "dcls", "statements", "RETURN", "expr", "SEMI", "RBRACE"] =>
        {
            let children = node.children();
            Ok(Procedure {
                name: leaf_lexeme(&children[1])?,
                params: lower_params(&children[3])?,
                body: lower_body(&children[6], &children[7], &children[9])?,
            })
        }
        _ => Err(malformed(node)),
    }
}

fn lower_main(node: &ParseTree) -> Result<Main, Diag> {
    match shape(node).as_slice() {
        ["main", "INT", "WAIN", "LPAREN", "dcl", "COMMA", "dcl", "RPAREN", "LBRACE", "dcls", "statements", "RETURN", "expr", "SEMI", "RBRACE"] =>
        {
            let children = node.children();
            Ok(Main {
                params: [lower_dcl(&children[3])?, lower_dcl(&children[5])?],
                body: lower_body(&children[8], &children[9], &children[11])?,
            })
        }
        _ => Err(malformed(node)),
    }
}

fn lower_body(dcls: &ParseTree, statements: &ParseTree, ret: &ParseTree) -> Result<Body, Diag> {
    Ok(Body {
        dcls: lower_dcls(dcls)?,
        statements: lower_statements(statements)?,
        ret: lower_expr(ret)?,
    })
}

fn lower_params(node: &ParseTree) -> Result<Vec<Dcl>, Diag> {
    match shape(node).as_slice() {
        ["params"] => Ok(Vec::new()),
        ["params", "paramlist"] => {
            let mut params = Vec::new();
            let mut current = &node.children()[0];
            loop {
                match shape(current).as_slice() {
                    ["paramlist", "dcl"] => {
                        params.push(lower_dcl(&current.children()[0])?);
                        return Ok(params);
                    }
                    ["paramlist", "dcl", "COMMA", "paramlist"] => {
                        params.push(lower_dcl(&current.children()[0])?);
                        current = &current.children()[2];
                    }
                    _ => return Err(malformed(current)),
                }
            }
        }
        _ => Err(malformed(node)),
    }
}

fn lower_dcl(node: &ParseTree) -> Result<Dcl, Diag> {
    match shape(node).as_slice() {
        ["dcl", "type", "ID"] => {
            let children = node.children();
            Ok(Dcl {
                ty: lower_type(&children[0])?,
                name: leaf_lexeme(&children[1])?,
            })
        }
        _ => Err(malformed(node)),
    }
}

fn lower_type(node: &ParseTree) -> Result<Type, Diag> {
    match shape(node).as_slice() {
        ["type", "INT"] => Ok(Type::Int),
        ["type", "INT", "STAR"] => Ok(Type::IntStar),
        _ => Err(malformed(node)),
    }
}

fn lower_dcls(node: &ParseTree) -> Result<Vec<LocalDecl>, Diag> {
    // `dcls` is left-recursive; unroll it iteratively to keep declaration
    // order without recursing per declaration.
    let mut chain = Vec::new();
    let mut current = node;
    loop {
        match shape(current).as_slice() {
            ["dcls"] => break,
            ["dcls", "dcls", "dcl", "BECOMES", "NUM", "SEMI"] => {
                let children = current.children();
                let value: i32 = leaf_lexeme(&children[3])?.parse().map_err(|_| {
                    Diag::error(format!(
                        "integer literal `{}` out of range in derivation",
                        children[3].lexeme().unwrap_or_default()
                    ))
                    .with_code("lower::literal_range")
                })?;
                chain.push(LocalDecl {
                    dcl: lower_dcl(&children[1])?,
                    init: Initializer::Number(value),
                });
                current = &children[0];
            }
            ["dcls", "dcls", "dcl", "BECOMES", "NULL", "SEMI"] => {
                let children = current.children();
                chain.push(LocalDecl {
                    dcl: lower_dcl(&children[1])?,
                    init: Initializer::Null,
                });
                current = &children[0];
            }
            _ => return Err(malformed(current)),
        }
    }
    chain.reverse();
    Ok(chain)
}

fn lower_statements(node: &ParseTree) -> Result<Vec<Statement>, Diag> {
    let mut chain = Vec::new();
    let mut current = node;
    loop {
        match shape(current).as_slice() {
            ["statements"] => break,
            ["statements", "statements", "statement"] => {
                chain.push(lower_statement(&current.children()[1])?);
                current = &current.children()[0];
            }
            _ => return Err(malformed(current)),
        }
    }
    chain.reverse();
    Ok(chain)
}

fn lower_statement(node: &ParseTree) -> Result<Statement, Diag> {
    let children = node.children();
    match shape(node).as_slice() {
        ["statement", "lvalue", "BECOMES", "expr", "SEMI"] => Ok(Statement::Assign {
            target: lower_lvalue(&children[0])?,
            value: lower_expr(&children[2])?,
        }),
        ["statement", "IF", "LPAREN", "test", "RPAREN", "LBRACE", "statements", "RBRACE", "ELSE", "LBRACE", "statements", "RBRACE"] => {
            Ok(Statement::If {
                test: lower_test(&children[2])?,
                then_branch: lower_statements(&children[5])?,
                else_branch: lower_statements(&children[9])?,
            })
        }
        ["statement", "WHILE", "LPAREN", "test", "RPAREN", "LBRACE", "statements", "RBRACE"] => {
            Ok(Statement::While {
                test: lower_test(&children[2])?,
                body: lower_statements(&children[5])?,
            })
        }
        ["statement", "PRINTLN", "LPAREN", "expr", "RPAREN", "SEMI"] => {
            Ok(Statement::Println(lower_expr(&children[2])?))
        }
        ["statement", "DELETE", "LBRACK", "RBRACK", "expr", "SEMI"] => {
            Ok(Statement::Delete(lower_expr(&children[3])?))
        }
        _ => Err(malformed(node)),
    }
}

fn lower_test(node: &ParseTree) -> Result<Test, Diag> {
    let children = node.children();
    let op = match shape(node).as_slice() {
        ["test", "expr", "EQ", "expr"] => Comparison::Eq,
        ["test", "expr", "NE", "expr"] => Comparison::Ne,
        ["test", "expr", "LT", "expr"] => Comparison::Lt,
        ["test", "expr", "LE", "expr"] => Comparison::Le,
        ["test", "expr", "GE", "expr"] => Comparison::Ge,
        ["test", "expr", "GT", "expr"] => Comparison::Gt,
        _ => return Err(malformed(node)),
    };
    Ok(Test {
        op,
        lhs: lower_expr(&children[0])?,
        rhs: lower_expr(&children[2])?,
    })
}

fn lower_expr(node: &ParseTree) -> Result<Expr, Diag> {
    let children = node.children();
    match shape(node).as_slice() {
        ["expr", "term"] => lower_term(&children[0]),
        ["expr", "expr", "PLUS", "term"] => Ok(Expr::binary(
            BinaryOp::Add,
            lower_expr(&children[0])?,
            lower_term(&children[2])?,
        )),
        ["expr", "expr", "MINUS", "term"] => Ok(Expr::binary(
            BinaryOp::Sub,
            lower_expr(&children[0])?,
            lower_term(&children[2])?,
        )),
        _ => Err(malformed(node)),
    }
}

fn lower_term(node: &ParseTree) -> Result<Expr, Diag> {
    let children = node.children();
    let op = match shape(node).as_slice() {
        ["term", "factor"] => return lower_factor(&children[0]),
        ["term", "term", "STAR", "factor"] => BinaryOp::Mul,
        ["term", "term", "SLASH", "factor"] => BinaryOp::Div,
        ["term", "term", "PCT", "factor"] => BinaryOp::Rem,
        _ => return Err(malformed(node)),
    };
    Ok(Expr::binary(
        op,
        lower_term(&children[0])?,
        lower_factor(&children[2])?,
    ))
}

fn lower_factor(node: &ParseTree) -> Result<Expr, Diag> {
    let children = node.children();
    match shape(node).as_slice() {
        ["factor", "ID"] => Ok(Expr::variable(leaf_lexeme(&children[0])?)),
        ["factor", "NUM"] => {
            let lexeme = leaf_lexeme(&children[0])?;
            let value: i32 = lexeme.parse().map_err(|_| {
                Diag::error(format!("integer literal `{lexeme}` out of range in derivation"))
                    .with_code("lower::literal_range")
            })?;
            Ok(Expr::number(value))
        }
        ["factor", "NULL"] => Ok(Expr::null()),
        // Parentheses carry no meaning past this point.
        ["factor", "LPAREN", "expr", "RPAREN"] => lower_expr(&children[1]),
        ["factor", "AMP", "lvalue"] => Ok(Expr::new(ExprKind::AddressOf(lower_lvalue(
            &children[1],
        )?))),
        ["factor", "STAR", "factor"] => Ok(Expr::new(ExprKind::Dereference(Box::new(
            lower_factor(&children[1])?,
        )))),
        ["factor", "NEW", "INT", "LBRACK", "expr", "RBRACK"] => Ok(Expr::new(ExprKind::New(
            Box::new(lower_expr(&children[3])?),
        ))),
        ["factor", "ID", "LPAREN", "RPAREN"] => Ok(Expr::new(ExprKind::Call {
            name: leaf_lexeme(&children[0])?,
            arguments: Vec::new(),
        })),
        ["factor", "ID", "LPAREN", "arglist", "RPAREN"] => Ok(Expr::new(ExprKind::Call {
            name: leaf_lexeme(&children[0])?,
            arguments: lower_arglist(&children[2])?,
        })),
        _ => Err(malformed(node)),
    }
}

fn lower_arglist(node: &ParseTree) -> Result<Vec<Expr>, Diag> {
    let mut arguments = Vec::new();
    let mut current = node;
    loop {
        match shape(current).as_slice() {
            ["arglist", "expr"] => {
                arguments.push(lower_expr(&current.children()[0])?);
                return Ok(arguments);
            }
            ["arglist", "expr", "COMMA", "arglist"] => {
                arguments.push(lower_expr(&current.children()[0])?);
                current = &current.children()[2];
            }
            _ => return Err(malformed(current)),
        }
    }
}

fn lower_lvalue(node: &ParseTree) -> Result<Lvalue, Diag> {
    let children = node.children();
    match shape(node).as_slice() {
        ["lvalue", "ID"] => Ok(Lvalue::Variable(leaf_lexeme(&children[0])?)),
        ["lvalue", "STAR", "factor"] => Ok(Lvalue::Dereference(Box::new(lower_factor(
            &children[1],
        )?))),
        ["lvalue", "LPAREN", "lvalue", "RPAREN"] => lower_lvalue(&children[1]),
        _ => Err(malformed(node)),
    }
}
