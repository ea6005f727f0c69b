//! Per-procedure scopes and the program symbol table.
//!
//! Frame offsets are byte displacements from the frame pointer. Locals are
//! assigned `-4 * k` as they are declared; parameters first get a placeholder
//! and are rewritten to positive offsets by [`Scope::import_parameters`] once
//! the full variable count of the procedure is known.

use crate::ast::Type;
use crate::diag::Diag;
use smol_str::SmolStr;
use std::collections::HashMap;

/// The symbol-table key of the main procedure.
pub const MAIN: &str = "wain";

/// Placeholder offset for parameters before `import_parameters` runs.
const PENDING_OFFSET: i32 = -1;

/// A variable binding: declared type and frame offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Variable {
    /// The declared type.
    pub ty: Type,
    /// Byte displacement from the frame pointer.
    pub offset: i32,
}

/// One procedure's scope.
#[derive(Debug, Clone)]
pub struct Scope {
    /// Parameters in declaration order. `wain`'s two parameters are recorded
    /// anonymously; they live in frame slots like locals and only their
    /// types participate here.
    parameters: Vec<(Option<SmolStr>, Type)>,
    /// All variables (parameters included) by name.
    variables: HashMap<SmolStr, Variable>,
    /// Declaration index of this procedure; callees must not exceed the
    /// caller's index.
    order: usize,
    /// Number of local slots handed out so far.
    location_count: i32,
    /// Guards the one-shot parameter-offset rewrite.
    parameters_loaded: bool,
    /// Locals (variables minus parameters), valid after `import_parameters`.
    variables_count: i32,
}

impl Scope {
    fn new(order: usize) -> Self {
        Self {
            parameters: Vec::new(),
            variables: HashMap::new(),
            order,
            location_count: 0,
            parameters_loaded: false,
            variables_count: 0,
        }
    }

    /// This procedure's declaration index.
    pub fn order(&self) -> usize {
        self.order
    }

    /// Declares a named parameter. Returns false on a duplicate name.
    pub fn declare_parameter(&mut self, name: SmolStr, ty: Type) -> bool {
        if self.variables.contains_key(&name) {
            return false;
        }
        self.variables.insert(
            name.clone(),
            Variable {
                ty,
                offset: PENDING_OFFSET,
            },
        );
        self.parameters.push((Some(name), ty));
        true
    }

    /// Records an anonymous parameter slot (used for `wain`, whose two
    /// parameters are stored as ordinary locals).
    pub fn push_anonymous_parameter(&mut self, ty: Type) {
        self.parameters.push((None, ty));
    }

    /// Declares a local variable at the next free slot. Returns false on a
    /// duplicate name.
    pub fn declare_local(&mut self, name: SmolStr, ty: Type) -> bool {
        if self.variables.contains_key(&name) {
            return false;
        }
        let offset = -4 * self.location_count;
        self.location_count += 1;
        self.variables.insert(name, Variable { ty, offset });
        true
    }

    /// Looks up a variable by name.
    pub fn lookup(&self, name: &str) -> Option<Variable> {
        self.variables.get(name).copied()
    }

    /// Returns true if `name` is a variable in this scope.
    pub fn contains(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    /// The number of declared parameters.
    pub fn parameter_count(&self) -> usize {
        self.parameters.len()
    }

    /// Parameter types in declaration order.
    pub fn parameter_types(&self) -> impl Iterator<Item = Type> + '_ {
        self.parameters.iter().map(|(_, ty)| *ty)
    }

    /// Locals count, valid after [`Scope::import_parameters`].
    pub fn variables_count(&self) -> i32 {
        self.variables_count
    }

    /// Finalizes the frame layout: computes the local count and rewrites
    /// each named parameter's offset to `(param_count - i) * 4`, preserving
    /// source order above the frame pointer. Idempotent.
    pub fn import_parameters(&mut self) {
        if self.parameters_loaded {
            return;
        }
        self.parameters_loaded = true;
        self.variables_count = (self.variables.len() - self.parameters.len()) as i32;

        let count = self.parameters.len() as i32;
        for (index, (name, _)) in self.parameters.iter().enumerate() {
            if let Some(name) = name {
                let slot = self
                    .variables
                    .get_mut(name)
                    .expect("parameters are registered as variables");
                slot.offset = (count - index as i32) * 4;
            }
        }
    }
}

/// The program symbol table: one scope per procedure, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    scopes: HashMap<SmolStr, Scope>,
}

impl SymbolTable {
    /// Creates an empty symbol table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a scope for a procedure, assigning the next declaration
    /// index. Fails on a duplicate procedure name.
    pub fn declare_procedure(&mut self, name: SmolStr) -> Result<&mut Scope, Diag> {
        let order = self.scopes.len();
        if self.scopes.contains_key(&name) {
            return Err(Diag::error(format!("duplicate procedure `{name}`"))
                .with_code("semantic::duplicate_procedure"));
        }
        Ok(self.scopes.entry(name).or_insert_with(|| Scope::new(order)))
    }

    /// Looks up a procedure's scope.
    pub fn scope(&self, name: &str) -> Option<&Scope> {
        self.scopes.get(name)
    }

    pub(crate) fn scope_mut(&mut self, name: &str) -> Option<&mut Scope> {
        self.scopes.get_mut(name)
    }
}
