//! Assembly emission for analyzed programs.
//!
//! Generation is infallible: the analyzer has already rejected everything
//! the generator cannot handle, and every expression node carries its
//! inferred type. Code for an expression always leaves the value in `$3`;
//! binary operations protect the left operand on the stack around the right
//! operand's evaluation, so arbitrarily nested expressions compose without
//! register allocation.

pub mod regs;

use crate::ast::{
    BinaryOp, Body, Comparison, Expr, ExprKind, Initializer, Lvalue, Main, Procedure, Program,
    Statement, Test, Type,
};
use crate::semantic::{MAIN, Scope, SymbolTable};
use regs::{ARG1, ARG2, CMP_A, CMP_B, FP, FRAME, ONE, RA, RESULT, Reg, SCRATCH, SP, TARGET, WORD, ZERO};
use std::fmt::Display;

/// Generates assembly for a fully analyzed program.
///
/// `wain` is emitted first so execution starts with it at address 0; user
/// procedures follow in declaration order.
pub fn generate(program: &Program, symbols: &SymbolTable) -> String {
    let mut generator = Generator::new(symbols);
    generator.gen_main(&program.main);
    for procedure in &program.procedures {
        generator.gen_procedure(procedure);
    }
    generator.code
}

struct Generator<'a> {
    symbols: &'a SymbolTable,
    code: String,
    next_label: u32,
    print_imported: bool,
}

impl<'a> Generator<'a> {
    fn new(symbols: &'a SymbolTable) -> Self {
        Self {
            symbols,
            code: String::new(),
            next_label: 0,
            print_imported: false,
        }
    }

    // -- emission helpers ---------------------------------------------------

    fn emit(&mut self, line: impl AsRef<str>) {
        self.code.push_str(line.as_ref());
        self.code.push('\n');
    }

    fn add(&mut self, d: Reg, s: Reg, t: Reg) {
        self.emit(format!("add {d}, {s}, {t}"));
    }

    fn sub(&mut self, d: Reg, s: Reg, t: Reg) {
        self.emit(format!("sub {d}, {s}, {t}"));
    }

    fn mult(&mut self, s: Reg, t: Reg) {
        self.emit(format!("mult {s}, {t}"));
    }

    fn div(&mut self, s: Reg, t: Reg) {
        self.emit(format!("div {s}, {t}"));
    }

    fn mflo(&mut self, d: Reg) {
        self.emit(format!("mflo {d}"));
    }

    fn mfhi(&mut self, d: Reg) {
        self.emit(format!("mfhi {d}"));
    }

    fn slt(&mut self, d: Reg, s: Reg, t: Reg, unsigned: bool) {
        let opcode = if unsigned { "sltu" } else { "slt" };
        self.emit(format!("{opcode} {d}, {s}, {t}"));
    }

    fn lw(&mut self, t: Reg, offset: i32, s: Reg) {
        self.emit(format!("lw {t}, {offset}({s})"));
    }

    fn sw(&mut self, t: Reg, offset: i32, s: Reg) {
        self.emit(format!("sw {t}, {offset}({s})"));
    }

    fn beq(&mut self, s: Reg, t: Reg, target: impl Display) {
        self.emit(format!("beq {s}, {t}, {target}"));
    }

    fn bne(&mut self, s: Reg, t: Reg, target: impl Display) {
        self.emit(format!("bne {s}, {t}, {target}"));
    }

    /// `lis d` followed by the literal `.word`.
    fn lis(&mut self, d: Reg, value: impl Display) {
        self.emit(format!("lis {d}"));
        self.emit(format!(".word {value}"));
    }

    fn jr(&mut self, s: Reg) {
        self.emit(format!("jr {s}"));
    }

    fn jalr(&mut self, s: Reg) {
        self.emit(format!("jalr {s}"));
    }

    fn label(&mut self, name: &str) {
        self.emit(format!("{name}:"));
    }

    fn import(&mut self, symbol: &str) {
        self.emit(format!(".import {symbol}"));
    }

    fn push(&mut self, r: Reg) {
        self.sw(r, -4, SP);
        self.sub(SP, SP, WORD);
    }

    fn pop(&mut self, r: Reg) {
        self.add(SP, SP, WORD);
        self.lw(r, -4, SP);
    }

    fn fresh_label(&mut self) -> String {
        let label = format!("L{}", self.next_label);
        self.next_label += 1;
        label
    }

    // -- procedures ---------------------------------------------------------

    fn scope(&self, name: &str) -> &'a Scope {
        self.symbols
            .scope(name)
            .expect("analysis created a scope per procedure")
    }

    fn offset_of(scope: &Scope, name: &str) -> i32 {
        scope
            .lookup(name)
            .expect("analysis resolved every variable")
            .offset
    }

    fn gen_main(&mut self, main: &Main) {
        let scope = self.scope(MAIN);

        self.lis(WORD, 4);
        self.lis(ONE, 1);
        self.sub(FP, SP, WORD);
        // The +8 covers the two entry-argument slots alongside the locals.
        self.lis(FRAME, scope.variables_count() * 4 + 8);
        self.sub(SP, SP, FRAME);
        self.sw(ARG1, Self::offset_of(scope, &main.params[0].name), FP);
        self.sw(ARG2, Self::offset_of(scope, &main.params[1].name), FP);

        // Without a pointer argument there is no array, and init must see a
        // length of zero.
        if main.params[0].ty == Type::Int {
            self.lis(ARG2, 0);
        }

        self.import("init");
        self.import("new");
        self.import("delete");
        self.push(RA);
        self.lis(TARGET, "init");
        self.jalr(TARGET);
        self.pop(RA);

        self.gen_body(&main.body, scope);

        self.add(SP, FP, WORD);
        self.jr(RA);
    }

    fn gen_procedure(&mut self, procedure: &Procedure) {
        let scope = self.scope(&procedure.name);

        self.label(&procedure_label(&procedure.name));
        self.sub(FP, SP, WORD);
        self.lis(FRAME, scope.variables_count() * 4);
        self.sub(SP, SP, FRAME);

        self.gen_body(&procedure.body, scope);

        self.add(SP, FP, WORD);
        self.jr(RA);
    }

    fn gen_body(&mut self, body: &Body, scope: &Scope) {
        for local in &body.dcls {
            match local.init {
                Initializer::Number(value) => self.lis(RESULT, value),
                Initializer::Null => self.add(RESULT, ZERO, ONE),
            }
            self.sw(RESULT, Self::offset_of(scope, &local.dcl.name), FP);
        }
        for statement in &body.statements {
            self.gen_statement(statement, scope);
        }
        self.gen_expr(&body.ret, scope);
    }

    // -- statements ---------------------------------------------------------

    fn gen_statement(&mut self, statement: &Statement, scope: &Scope) {
        match statement {
            Statement::Assign { target, value } => match target {
                Lvalue::Variable(name) => {
                    self.gen_expr(value, scope);
                    self.sw(RESULT, Self::offset_of(scope, name), FP);
                }
                Lvalue::Dereference(pointer) => {
                    self.gen_expr(value, scope);
                    self.push(RESULT);
                    self.gen_expr(pointer, scope);
                    self.pop(SCRATCH);
                    self.sw(SCRATCH, 0, RESULT);
                }
            },
            Statement::If {
                test,
                then_branch,
                else_branch,
            } => {
                let else_label = self.fresh_label();
                let end_label = self.fresh_label();

                self.gen_test(test, scope);
                self.beq(RESULT, ZERO, &else_label);
                for statement in then_branch {
                    self.gen_statement(statement, scope);
                }
                self.beq(ZERO, ZERO, &end_label);
                self.label(&else_label);
                for statement in else_branch {
                    self.gen_statement(statement, scope);
                }
                self.label(&end_label);
            }
            Statement::While { test, body } => {
                let head_label = self.fresh_label();
                let end_label = self.fresh_label();

                self.label(&head_label);
                self.gen_test(test, scope);
                self.beq(RESULT, ZERO, &end_label);
                for statement in body {
                    self.gen_statement(statement, scope);
                }
                self.beq(ZERO, ZERO, &head_label);
                self.label(&end_label);
            }
            Statement::Println(argument) => {
                if !self.print_imported {
                    self.import("print");
                    self.print_imported = true;
                }
                self.gen_expr(argument, scope);
                self.add(ARG1, RESULT, ZERO);
                self.push(RA);
                self.lis(TARGET, "print");
                self.jalr(TARGET);
                self.pop(RA);
            }
            Statement::Delete(pointer) => {
                let skip_label = self.fresh_label();

                self.gen_expr(pointer, scope);
                // NULL never reaches the runtime.
                self.beq(RESULT, ONE, &skip_label);
                self.add(ARG1, ZERO, RESULT);
                self.push(RA);
                self.lis(TARGET, "delete");
                self.jalr(TARGET);
                self.pop(RA);
                self.label(&skip_label);
            }
        }
    }

    fn gen_test(&mut self, test: &Test, scope: &Scope) {
        self.gen_expr(&test.lhs, scope);
        self.push(RESULT);
        self.gen_expr(&test.rhs, scope);
        self.pop(SCRATCH);

        match test.op {
            Comparison::Lt | Comparison::Ge | Comparison::Gt | Comparison::Le => {
                // Pointer comparisons are unsigned address comparisons.
                let unsigned = test.lhs.ty() == Type::IntStar;
                match test.op {
                    Comparison::Lt | Comparison::Ge => self.slt(RESULT, SCRATCH, RESULT, unsigned),
                    _ => self.slt(RESULT, RESULT, SCRATCH, unsigned),
                }
                if matches!(test.op, Comparison::Ge | Comparison::Le) {
                    self.sub(RESULT, ONE, RESULT);
                }
            }
            Comparison::Eq | Comparison::Ne => {
                // Equality only needs to detect a bit difference, so the
                // int case can use the unsigned comparison.
                let unsigned = test.lhs.ty() == Type::Int;
                self.slt(CMP_A, RESULT, SCRATCH, unsigned);
                self.slt(CMP_B, SCRATCH, RESULT, unsigned);
                self.add(RESULT, CMP_A, CMP_B);
                if test.op == Comparison::Eq {
                    self.sub(RESULT, ONE, RESULT);
                }
            }
        }
    }

    // -- expressions --------------------------------------------------------

    fn gen_expr(&mut self, expr: &Expr, scope: &Scope) {
        match &expr.kind {
            ExprKind::Number(value) => self.lis(RESULT, *value),
            ExprKind::Null => self.add(RESULT, ZERO, ONE),
            ExprKind::Variable(name) => self.lw(RESULT, Self::offset_of(scope, name), FP),
            ExprKind::Call { name, arguments } => self.gen_call(name, arguments, scope),
            ExprKind::AddressOf(lvalue) => match lvalue {
                Lvalue::Variable(name) => {
                    self.lis(RESULT, Self::offset_of(scope, name));
                    self.add(RESULT, RESULT, FP);
                }
                // &*e is e.
                Lvalue::Dereference(pointer) => self.gen_expr(pointer, scope),
            },
            ExprKind::Dereference(pointer) => {
                self.gen_expr(pointer, scope);
                self.lw(RESULT, 0, RESULT);
            }
            ExprKind::New(size) => {
                self.gen_expr(size, scope);
                self.add(ARG1, ZERO, RESULT);
                self.push(RA);
                self.lis(TARGET, "new");
                self.jalr(TARGET);
                self.pop(RA);
                // The allocator reports failure as 0; rewrite it to the
                // NULL sentinel, skipping the rewrite on success.
                self.bne(RESULT, ZERO, 1);
                self.add(RESULT, ZERO, ONE);
            }
            ExprKind::Binary { op, lhs, rhs } => self.gen_binary(*op, lhs, rhs, scope),
        }
    }

    fn gen_call(&mut self, name: &str, arguments: &[Expr], scope: &Scope) {
        self.push(FP);
        self.push(RA);
        for argument in arguments {
            self.gen_expr(argument, scope);
            self.push(RESULT);
        }
        self.lis(TARGET, procedure_label(name));
        self.jalr(TARGET);
        if !arguments.is_empty() {
            self.lis(FRAME, 4 * arguments.len());
            self.add(SP, SP, FRAME);
        }
        self.pop(RA);
        self.pop(FP);
    }

    fn gen_binary(&mut self, op: BinaryOp, lhs: &Expr, rhs: &Expr, scope: &Scope) {
        match op {
            BinaryOp::Add | BinaryOp::Sub => {
                self.gen_expr(lhs, scope);
                // int + pointer scales the int side by the word size.
                if op == BinaryOp::Add && rhs.ty() == Type::IntStar {
                    self.mult(RESULT, WORD);
                    self.mflo(RESULT);
                }
                self.push(RESULT);
                self.gen_expr(rhs, scope);
                if lhs.ty() == Type::IntStar && rhs.ty() == Type::Int {
                    self.mult(RESULT, WORD);
                    self.mflo(RESULT);
                }
                self.pop(SCRATCH);
                if op == BinaryOp::Add {
                    self.add(RESULT, SCRATCH, RESULT);
                } else {
                    self.sub(RESULT, SCRATCH, RESULT);
                }
                // Pointer difference is measured in elements, not bytes.
                if op == BinaryOp::Sub && rhs.ty() == Type::IntStar {
                    self.div(RESULT, WORD);
                    self.mflo(RESULT);
                }
            }
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => {
                self.gen_expr(lhs, scope);
                self.push(RESULT);
                self.gen_expr(rhs, scope);
                self.pop(SCRATCH);
                if op == BinaryOp::Mul {
                    self.mult(SCRATCH, RESULT);
                } else {
                    self.div(SCRATCH, RESULT);
                }
                if op == BinaryOp::Rem {
                    self.mfhi(RESULT);
                } else {
                    self.mflo(RESULT);
                }
            }
        }
    }
}

/// The label a procedure is called through.
fn procedure_label(name: &str) -> String {
    format!("F{name}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Dcl, LocalDecl};
    use crate::semantic::analyze;

    fn generated(mut program: Program) -> String {
        let symbols = analyze(&mut program).expect("test programs analyze");
        generate(&program, &symbols)
    }

    fn int_main(body: Body) -> Program {
        Program {
            procedures: Vec::new(),
            main: Main {
                params: [Dcl::new(Type::Int, "a"), Dcl::new(Type::Int, "b")],
                body,
            },
        }
    }

    fn ret_only(ret: Expr) -> Body {
        Body {
            dcls: Vec::new(),
            statements: Vec::new(),
            ret,
        }
    }

    #[test]
    fn main_prologue_and_epilogue() {
        let code = generated(int_main(ret_only(Expr::variable("a"))));

        let expected_prologue = "\
lis $4
.word 4
lis $11
.word 1
sub $29, $30, $4
lis $12
.word 8
sub $30, $30, $12
sw $1, 0($29)
sw $2, -4($29)
lis $2
.word 0
.import init
.import new
.import delete
sw $31, -4($30)
sub $30, $30, $4
lis $10
.word init
jalr $10
add $30, $30, $4
lw $31, -4($30)
";
        assert!(code.starts_with(expected_prologue), "got:\n{code}");
        assert!(code.ends_with("lw $3, 0($29)\nadd $30, $29, $4\njr $31\n"));
    }

    #[test]
    fn pointer_main_keeps_length_argument() {
        let program = Program {
            procedures: Vec::new(),
            main: Main {
                params: [Dcl::new(Type::IntStar, "p"), Dcl::new(Type::Int, "n")],
                body: ret_only(Expr::variable("n")),
            },
        };
        let code = generated(program);
        // $2 is the array length; it must survive into init.
        assert!(!code.contains("lis $2\n"), "got:\n{code}");
    }

    #[test]
    fn null_uses_the_sentinel() {
        let program = Program {
            procedures: Vec::new(),
            main: Main {
                params: [Dcl::new(Type::IntStar, "p"), Dcl::new(Type::Int, "n")],
                body: Body {
                    dcls: vec![LocalDecl {
                        dcl: Dcl::new(Type::IntStar, "q"),
                        init: Initializer::Null,
                    }],
                    statements: Vec::new(),
                    ret: Expr::variable("n"),
                },
            },
        };
        let code = generated(program);
        assert!(code.contains("add $3, $0, $11\nsw $3, -8($29)\n"), "got:\n{code}");
    }

    #[test]
    fn pointer_addition_scales_the_int_side() {
        let program = Program {
            procedures: Vec::new(),
            main: Main {
                params: [Dcl::new(Type::IntStar, "p"), Dcl::new(Type::Int, "n")],
                body: ret_only(Expr::new(ExprKind::Dereference(Box::new(Expr::binary(
                    BinaryOp::Add,
                    Expr::variable("p"),
                    Expr::variable("n"),
                ))))),
            },
        };
        let code = generated(program);
        let scaled_rhs = "\
lw $3, -4($29)
mult $3, $4
mflo $3
add $30, $30, $4
lw $5, -4($30)
add $3, $5, $3
lw $3, 0($3)
";
        assert!(code.contains(scaled_rhs), "got:\n{code}");
    }

    #[test]
    fn pointer_difference_divides_by_word_size() {
        let program = Program {
            procedures: Vec::new(),
            main: Main {
                params: [Dcl::new(Type::IntStar, "p"), Dcl::new(Type::Int, "n")],
                body: ret_only(Expr::binary(
                    BinaryOp::Sub,
                    Expr::variable("p"),
                    Expr::variable("p"),
                )),
            },
        };
        let code = generated(program);
        assert!(
            code.contains("sub $3, $5, $3\ndiv $3, $4\nmflo $3\n"),
            "got:\n{code}"
        );
    }

    #[test]
    fn equality_on_int_uses_unsigned_comparison() {
        let body = Body {
            dcls: Vec::new(),
            statements: vec![Statement::If {
                test: Test {
                    op: Comparison::Eq,
                    lhs: Expr::variable("a"),
                    rhs: Expr::variable("b"),
                },
                then_branch: Vec::new(),
                else_branch: Vec::new(),
            }],
            ret: Expr::variable("a"),
        };
        let code = generated(int_main(body));
        assert!(
            code.contains("sltu $6, $3, $5\nsltu $7, $5, $3\nadd $3, $6, $7\nsub $3, $11, $3\n"),
            "got:\n{code}"
        );
    }

    #[test]
    fn ordering_on_pointers_uses_unsigned_comparison() {
        let program = Program {
            procedures: Vec::new(),
            main: Main {
                params: [Dcl::new(Type::IntStar, "p"), Dcl::new(Type::Int, "n")],
                body: Body {
                    dcls: Vec::new(),
                    statements: vec![Statement::While {
                        test: Test {
                            op: Comparison::Lt,
                            lhs: Expr::variable("p"),
                            rhs: Expr::variable("p"),
                        },
                        body: Vec::new(),
                    }],
                    ret: Expr::variable("n"),
                },
            },
        };
        let code = generated(program);
        assert!(code.contains("sltu $3, $5, $3\n"), "got:\n{code}");
    }

    #[test]
    fn while_loop_shape() {
        let body = Body {
            dcls: Vec::new(),
            statements: vec![Statement::While {
                test: Test {
                    op: Comparison::Lt,
                    lhs: Expr::variable("a"),
                    rhs: Expr::variable("b"),
                },
                body: vec![Statement::Assign {
                    target: Lvalue::Variable("a".into()),
                    value: Expr::binary(BinaryOp::Add, Expr::variable("a"), Expr::number(1)),
                }],
            }],
            ret: Expr::variable("a"),
        };
        let code = generated(int_main(body));
        assert!(code.contains("L0:\n"), "got:\n{code}");
        assert!(code.contains("beq $3, $0, L1\n"), "got:\n{code}");
        assert!(code.contains("beq $0, $0, L0\nL1:\n"), "got:\n{code}");
    }

    #[test]
    fn call_pushes_arguments_left_to_right() {
        let callee = Procedure {
            name: "sum".into(),
            params: vec![Dcl::new(Type::Int, "x"), Dcl::new(Type::Int, "y")],
            body: ret_only(Expr::binary(
                BinaryOp::Add,
                Expr::variable("x"),
                Expr::variable("y"),
            )),
        };
        let program = Program {
            procedures: vec![callee],
            main: Main {
                params: [Dcl::new(Type::Int, "a"), Dcl::new(Type::Int, "b")],
                body: ret_only(Expr::new(ExprKind::Call {
                    name: "sum".into(),
                    arguments: vec![Expr::variable("a"), Expr::variable("b")],
                })),
            },
        };
        let code = generated(program);

        assert!(code.contains("lis $10\n.word Fsum\njalr $10\nlis $12\n.word 8\nadd $30, $30, $12\n"),
            "got:\n{code}");
        assert!(code.contains("Fsum:\n"), "got:\n{code}");
        // Parameters sit above the frame pointer in source order.
        assert!(code.contains("Fsum:\nsub $29, $30, $4\nlis $12\n.word 0\nsub $30, $30, $12\nlw $3, 8($29)\n"),
            "got:\n{code}");
    }

    #[test]
    fn delete_skips_runtime_for_null() {
        let program = Program {
            procedures: Vec::new(),
            main: Main {
                params: [Dcl::new(Type::IntStar, "p"), Dcl::new(Type::Int, "n")],
                body: Body {
                    dcls: Vec::new(),
                    statements: vec![Statement::Delete(Expr::variable("p"))],
                    ret: Expr::variable("n"),
                },
            },
        };
        let code = generated(program);
        assert!(code.contains("beq $3, $11, L0\n"), "got:\n{code}");
        assert!(code.contains(".word delete\njalr $10\n"), "got:\n{code}");
        assert!(code.contains("lw $31, -4($30)\nL0:\n"), "got:\n{code}");
    }

    #[test]
    fn new_rewrites_failure_to_null_sentinel() {
        let program = Program {
            procedures: Vec::new(),
            main: Main {
                params: [Dcl::new(Type::Int, "a"), Dcl::new(Type::Int, "b")],
                body: Body {
                    dcls: vec![LocalDecl {
                        dcl: Dcl::new(Type::IntStar, "p"),
                        init: Initializer::Null,
                    }],
                    statements: vec![Statement::Assign {
                        target: Lvalue::Variable("p".into()),
                        value: Expr::new(ExprKind::New(Box::new(Expr::number(3)))),
                    }],
                    ret: Expr::variable("a"),
                },
            },
        };
        let code = generated(program);
        assert!(
            code.contains("bne $3, $0, 1\nadd $3, $0, $11\n"),
            "got:\n{code}"
        );
    }

    #[test]
    fn assignment_through_pointer_stores_indirect() {
        let program = Program {
            procedures: Vec::new(),
            main: Main {
                params: [Dcl::new(Type::IntStar, "p"), Dcl::new(Type::Int, "n")],
                body: Body {
                    dcls: Vec::new(),
                    statements: vec![Statement::Assign {
                        target: Lvalue::Dereference(Box::new(Expr::variable("p"))),
                        value: Expr::number(42),
                    }],
                    ret: Expr::variable("n"),
                },
            },
        };
        let code = generated(program);
        let indirect_store = "\
lw $3, 0($29)
add $30, $30, $4
lw $5, -4($30)
sw $5, 0($3)
";
        assert!(code.contains(indirect_store), "got:\n{code}");
    }

    #[test]
    fn println_imports_print_once() {
        let body = Body {
            dcls: Vec::new(),
            statements: vec![
                Statement::Println(Expr::variable("a")),
                Statement::Println(Expr::variable("b")),
            ],
            ret: Expr::variable("a"),
        };
        let code = generated(int_main(body));
        assert_eq!(code.matches(".import print").count(), 1, "got:\n{code}");
        assert!(code.contains("add $1, $3, $0\n"), "got:\n{code}");
    }

    #[test]
    fn address_of_variable_and_deref() {
        let program = Program {
            procedures: Vec::new(),
            main: Main {
                params: [Dcl::new(Type::Int, "a"), Dcl::new(Type::Int, "b")],
                body: ret_only(Expr::new(ExprKind::Dereference(Box::new(Expr::new(
                    ExprKind::AddressOf(Lvalue::Variable("b".into())),
                ))))),
            },
        };
        let code = generated(program);
        assert!(
            code.contains("lis $3\n.word -4\nadd $3, $3, $29\nlw $3, 0($3)\n"),
            "got:\n{code}"
        );
    }
}
