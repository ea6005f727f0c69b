//! Semantic analysis: declarations, references, and types.
//!
//! Analysis is three separate traversals of the same AST, in dependency
//! order: pass 1 builds the symbol table, pass 2 resolves every name against
//! it, pass 3 assigns types bottom-up and finalizes each procedure's frame
//! layout. The passes are intentionally not fused; each one relies on the
//! previous having completed over the whole program (a procedure may be
//! called from anywhere at or after its declaration).

pub mod scope;

pub use scope::{MAIN, Scope, SymbolTable, Variable};

use crate::ast::{
    BinaryOp, Body, Expr, ExprKind, Initializer, Lvalue, Program, Statement, Test, Type,
};
use crate::diag::Diag;

/// Analyzes a program, returning its finalized symbol table.
///
/// On success every expression node carries an inferred type and every
/// scope's frame layout (parameter and local offsets, local count) is final.
pub fn analyze(program: &mut Program) -> Result<SymbolTable, Diag> {
    let mut symbols = SymbolTable::new();
    collect_declarations(program, &mut symbols)?;
    check_references(program, &symbols)?;
    check_types(program, &mut symbols)?;
    Ok(symbols)
}

// ---------------------------------------------------------------------------
// Pass 1: declarations
// ---------------------------------------------------------------------------

fn collect_declarations(program: &Program, symbols: &mut SymbolTable) -> Result<(), Diag> {
    for procedure in &program.procedures {
        let scope = symbols.declare_procedure(procedure.name.clone())?;
        for param in &procedure.params {
            if !scope.declare_parameter(param.name.clone(), param.ty) {
                return Err(duplicate_variable(&param.name, &procedure.name));
            }
        }
        for local in &procedure.body.dcls {
            if !scope.declare_local(local.dcl.name.clone(), local.dcl.ty) {
                return Err(duplicate_variable(&local.dcl.name, &procedure.name));
            }
        }
    }

    let main = &program.main;
    let scope = symbols.declare_procedure(MAIN.into())?;
    // wain's parameters live in ordinary local slots; the anonymous entries
    // keep the parameter count (and so the frame layout) honest.
    for param in &main.params {
        scope.push_anonymous_parameter(param.ty);
    }
    for param in &main.params {
        if !scope.declare_local(param.name.clone(), param.ty) {
            return Err(duplicate_variable(&param.name, MAIN));
        }
    }
    for local in &main.body.dcls {
        if !scope.declare_local(local.dcl.name.clone(), local.dcl.ty) {
            return Err(duplicate_variable(&local.dcl.name, MAIN));
        }
    }

    Ok(())
}

fn duplicate_variable(name: &str, procedure: &str) -> Diag {
    Diag::error(format!(
        "duplicate variable `{name}` in procedure `{procedure}`"
    ))
    .with_code("semantic::duplicate_variable")
}

// ---------------------------------------------------------------------------
// Pass 2: references
// ---------------------------------------------------------------------------

fn check_references(program: &Program, symbols: &SymbolTable) -> Result<(), Diag> {
    for procedure in &program.procedures {
        let scope = expect_scope(symbols, &procedure.name);
        check_body_references(&procedure.body, scope, symbols)?;
    }
    check_body_references(&program.main.body, expect_scope(symbols, MAIN), symbols)
}

fn check_body_references(body: &Body, scope: &Scope, symbols: &SymbolTable) -> Result<(), Diag> {
    for statement in &body.statements {
        check_statement_references(statement, scope, symbols)?;
    }
    check_expr_references(&body.ret, scope, symbols)
}

fn check_statement_references(
    statement: &Statement,
    scope: &Scope,
    symbols: &SymbolTable,
) -> Result<(), Diag> {
    match statement {
        Statement::Assign { target, value } => {
            check_lvalue_references(target, scope, symbols)?;
            check_expr_references(value, scope, symbols)
        }
        Statement::If {
            test,
            then_branch,
            else_branch,
        } => {
            check_test_references(test, scope, symbols)?;
            for statement in then_branch.iter().chain(else_branch) {
                check_statement_references(statement, scope, symbols)?;
            }
            Ok(())
        }
        Statement::While { test, body } => {
            check_test_references(test, scope, symbols)?;
            for statement in body {
                check_statement_references(statement, scope, symbols)?;
            }
            Ok(())
        }
        Statement::Println(expr) | Statement::Delete(expr) => {
            check_expr_references(expr, scope, symbols)
        }
    }
}

fn check_test_references(test: &Test, scope: &Scope, symbols: &SymbolTable) -> Result<(), Diag> {
    check_expr_references(&test.lhs, scope, symbols)?;
    check_expr_references(&test.rhs, scope, symbols)
}

fn check_expr_references(expr: &Expr, scope: &Scope, symbols: &SymbolTable) -> Result<(), Diag> {
    match &expr.kind {
        ExprKind::Number(_) | ExprKind::Null => Ok(()),
        ExprKind::Variable(name) => {
            if scope.contains(name) {
                Ok(())
            } else {
                Err(Diag::error(format!("use of undeclared variable `{name}`"))
                    .with_code("semantic::undeclared_variable"))
            }
        }
        ExprKind::Call { name, arguments } => {
            if scope.contains(name) {
                return Err(Diag::error(format!(
                    "`{name}` is a variable here and cannot be called"
                ))
                .with_code("semantic::call_shadowed"));
            }
            let callee = symbols.scope(name).ok_or_else(|| {
                Diag::error(format!("call of undeclared procedure `{name}`"))
                    .with_code("semantic::undeclared_procedure")
            })?;
            if callee.order() > scope.order() {
                return Err(Diag::error(format!(
                    "procedure `{name}` is declared later and cannot be called from here"
                ))
                .with_code("semantic::forward_call"));
            }
            if callee.parameter_count() != arguments.len() {
                return Err(Diag::error(format!(
                    "procedure `{name}` takes {} argument(s), {} supplied",
                    callee.parameter_count(),
                    arguments.len()
                ))
                .with_code("semantic::arity"));
            }
            for argument in arguments {
                check_expr_references(argument, scope, symbols)?;
            }
            Ok(())
        }
        ExprKind::AddressOf(lvalue) => check_lvalue_references(lvalue, scope, symbols),
        ExprKind::Dereference(inner) | ExprKind::New(inner) => {
            check_expr_references(inner, scope, symbols)
        }
        ExprKind::Binary { lhs, rhs, .. } => {
            check_expr_references(lhs, scope, symbols)?;
            check_expr_references(rhs, scope, symbols)
        }
    }
}

fn check_lvalue_references(
    lvalue: &Lvalue,
    scope: &Scope,
    symbols: &SymbolTable,
) -> Result<(), Diag> {
    match lvalue {
        Lvalue::Variable(name) => {
            if scope.contains(name) {
                Ok(())
            } else {
                Err(Diag::error(format!("use of undeclared variable `{name}`"))
                    .with_code("semantic::undeclared_variable"))
            }
        }
        Lvalue::Dereference(inner) => check_expr_references(inner, scope, symbols),
    }
}

fn expect_scope<'a>(symbols: &'a SymbolTable, name: &str) -> &'a Scope {
    symbols
        .scope(name)
        .expect("scopes are created in the declaration pass")
}

// ---------------------------------------------------------------------------
// Pass 3: types
// ---------------------------------------------------------------------------

fn check_types(program: &mut Program, symbols: &mut SymbolTable) -> Result<(), Diag> {
    for procedure in &mut program.procedures {
        {
            let scope = expect_scope(symbols, &procedure.name);
            check_body_types(&mut procedure.body, scope, symbols)?;
        }
        symbols
            .scope_mut(&procedure.name)
            .expect("scope exists")
            .import_parameters();
    }

    {
        let scope = expect_scope(symbols, MAIN);
        // wain's second parameter is the only place the grammar allows a
        // pointer type that the language then forbids.
        if program.main.params[1].ty != Type::Int {
            return Err(Diag::error("second parameter of `wain` must be int")
                .with_code("semantic::main_signature"));
        }
        check_body_types(&mut program.main.body, scope, symbols)?;
    }
    symbols
        .scope_mut(MAIN)
        .expect("scope exists")
        .import_parameters();

    Ok(())
}

fn check_body_types(body: &mut Body, scope: &Scope, symbols: &SymbolTable) -> Result<(), Diag> {
    for local in &mut body.dcls {
        let declared = local.dcl.ty;
        let initializer = match local.init {
            Initializer::Number(_) => Type::Int,
            Initializer::Null => Type::IntStar,
        };
        if declared != initializer {
            return Err(Diag::error(format!(
                "variable `{}` of type {declared} initialized with {initializer}",
                local.dcl.name
            ))
            .with_code("semantic::initializer_type"));
        }
    }

    for statement in &mut body.statements {
        check_statement_types(statement, scope, symbols)?;
    }

    let ret = check_expr_types(&mut body.ret, scope, symbols)?;
    if ret != Type::Int {
        return Err(
            Diag::error("return expression must be int").with_code("semantic::return_type")
        );
    }
    Ok(())
}

fn check_statement_types(
    statement: &mut Statement,
    scope: &Scope,
    symbols: &SymbolTable,
) -> Result<(), Diag> {
    match statement {
        Statement::Assign { target, value } => {
            let target_ty = check_lvalue_types(target, scope, symbols)?;
            let value_ty = check_expr_types(value, scope, symbols)?;
            if target_ty != value_ty {
                return Err(Diag::error(format!(
                    "cannot assign {value_ty} to a location of type {target_ty}"
                ))
                .with_code("semantic::assign_type"));
            }
            Ok(())
        }
        Statement::If {
            test,
            then_branch,
            else_branch,
        } => {
            check_test_types(test, scope, symbols)?;
            for statement in then_branch.iter_mut().chain(else_branch) {
                check_statement_types(statement, scope, symbols)?;
            }
            Ok(())
        }
        Statement::While { test, body } => {
            check_test_types(test, scope, symbols)?;
            for statement in body {
                check_statement_types(statement, scope, symbols)?;
            }
            Ok(())
        }
        Statement::Println(expr) => {
            if check_expr_types(expr, scope, symbols)? != Type::Int {
                return Err(Diag::error("println argument must be int")
                    .with_code("semantic::println_type"));
            }
            Ok(())
        }
        Statement::Delete(expr) => {
            if check_expr_types(expr, scope, symbols)? != Type::IntStar {
                return Err(Diag::error("delete argument must be int*")
                    .with_code("semantic::delete_type"));
            }
            Ok(())
        }
    }
}

fn check_test_types(test: &mut Test, scope: &Scope, symbols: &SymbolTable) -> Result<(), Diag> {
    let lhs = check_expr_types(&mut test.lhs, scope, symbols)?;
    let rhs = check_expr_types(&mut test.rhs, scope, symbols)?;
    if lhs != rhs {
        return Err(
            Diag::error(format!("cannot compare {lhs} with {rhs}"))
                .with_code("semantic::test_type"),
        );
    }
    Ok(())
}

fn check_expr_types(expr: &mut Expr, scope: &Scope, symbols: &SymbolTable) -> Result<Type, Diag> {
    let ty = match &mut expr.kind {
        ExprKind::Number(_) => Type::Int,
        ExprKind::Null => Type::IntStar,
        ExprKind::Variable(name) => {
            scope
                .lookup(name)
                .expect("references resolved before typing")
                .ty
        }
        ExprKind::Call { name, arguments } => {
            let callee = symbols
                .scope(name)
                .expect("references resolved before typing");
            let declared: Vec<Type> = callee.parameter_types().collect();
            for (argument, expected) in arguments.iter_mut().zip(declared) {
                let supplied = check_expr_types(argument, scope, symbols)?;
                if supplied != expected {
                    return Err(Diag::error(format!(
                        "argument of type {supplied} passed to parameter of type {expected} of `{name}`"
                    ))
                    .with_code("semantic::argument_type"));
                }
            }
            Type::Int
        }
        ExprKind::AddressOf(lvalue) => {
            if check_lvalue_types(lvalue, scope, symbols)? != Type::Int {
                return Err(Diag::error("cannot take the address of an int* location")
                    .with_code("semantic::address_of"));
            }
            Type::IntStar
        }
        ExprKind::Dereference(inner) => {
            if check_expr_types(inner, scope, symbols)? != Type::IntStar {
                return Err(
                    Diag::error("cannot dereference an int").with_code("semantic::dereference")
                );
            }
            Type::Int
        }
        ExprKind::New(size) => {
            if check_expr_types(size, scope, symbols)? != Type::Int {
                return Err(Diag::error("allocation size must be int")
                    .with_code("semantic::allocation_size"));
            }
            Type::IntStar
        }
        ExprKind::Binary { op, lhs, rhs } => {
            let op = *op;
            let lhs = check_expr_types(lhs, scope, symbols)?;
            let rhs = check_expr_types(rhs, scope, symbols)?;
            binary_type(op, lhs, rhs)?
        }
    };

    expr.set_ty(ty);
    Ok(ty)
}

fn binary_type(op: BinaryOp, lhs: Type, rhs: Type) -> Result<Type, Diag> {
    match (op, lhs, rhs) {
        (BinaryOp::Add, Type::Int, Type::Int) => Ok(Type::Int),
        (BinaryOp::Add, Type::IntStar, Type::Int) | (BinaryOp::Add, Type::Int, Type::IntStar) => {
            Ok(Type::IntStar)
        }
        (BinaryOp::Add, Type::IntStar, Type::IntStar) => Err(Diag::error(
            "cannot add two pointers",
        )
        .with_code("semantic::pointer_arithmetic")),

        (BinaryOp::Sub, Type::Int, Type::Int) => Ok(Type::Int),
        (BinaryOp::Sub, Type::IntStar, Type::Int) => Ok(Type::IntStar),
        (BinaryOp::Sub, Type::IntStar, Type::IntStar) => Ok(Type::Int),
        (BinaryOp::Sub, Type::Int, Type::IntStar) => Err(Diag::error(
            "cannot subtract a pointer from an int",
        )
        .with_code("semantic::pointer_arithmetic")),

        (BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem, Type::Int, Type::Int) => Ok(Type::Int),
        (BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem, ..) => Err(Diag::error(format!(
            "operands of {} must both be int",
            match op {
                BinaryOp::Mul => "*",
                BinaryOp::Div => "/",
                _ => "%",
            }
        ))
        .with_code("semantic::pointer_arithmetic")),
    }
}

fn check_lvalue_types(
    lvalue: &mut Lvalue,
    scope: &Scope,
    symbols: &SymbolTable,
) -> Result<Type, Diag> {
    match lvalue {
        Lvalue::Variable(name) => Ok(scope
            .lookup(name)
            .expect("references resolved before typing")
            .ty),
        Lvalue::Dereference(inner) => {
            if check_expr_types(inner, scope, symbols)? != Type::IntStar {
                return Err(Diag::error("cannot assign through an int")
                    .with_code("semantic::dereference"));
            }
            Ok(Type::Int)
        }
    }
}
