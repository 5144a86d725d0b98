//! IrContext: arena-based storage for a Toy op graph.
//!
//! All operations and values are stored in `PrimaryMap`s owned by
//! `IrContext`. Operand lists use `EntityList + ListPool` for compact storage.
//! Use-chains are maintained eagerly, so RAUW and dead-op checks never need
//! to rescan the graph.

use cranelift_entity::{EntityList, ListPool, PrimaryMap, SecondaryMap};
use smallvec::SmallVec;

use super::refs::*;
use super::types::*;

// ============================================================================
// Operation kinds
// ============================================================================

/// Kind tag of an operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpKind {
    Transpose,
    Reshape,
    /// Any other producer, identified by its interned name (`toy.mul`, ...).
    Other(NameRef),
}

/// Payload-free discriminant of [`OpKind`], used to key pattern tables.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OpClass {
    Transpose,
    Reshape,
    Other,
}

impl OpKind {
    pub fn class(self) -> OpClass {
        match self {
            OpKind::Transpose => OpClass::Transpose,
            OpKind::Reshape => OpClass::Reshape,
            OpKind::Other(_) => OpClass::Other,
        }
    }

    /// Number of operands this kind requires, if fixed.
    pub fn fixed_arity(self) -> Option<usize> {
        match self {
            OpKind::Transpose | OpKind::Reshape => Some(1),
            OpKind::Other(_) => None,
        }
    }
}

// ============================================================================
// Use-chain
// ============================================================================

/// Who consumes a value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum User {
    /// An operand slot of an operation.
    Op(OpRef),
    /// An externally observed result of the graph.
    Output,
}

/// A single use of a value: the consumer plus the operand (or output) index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Use {
    pub user: User,
    pub index: u32,
}

// ============================================================================
// Entity data types
// ============================================================================

/// Data for a single operation in the arena.
pub struct OperationData {
    pub kind: OpKind,
    pub operands: EntityList<ValueRef>,
    pub result_ty: TypeRef,
}

/// Data for a single value.
pub struct ValueData {
    pub def: ValueDef,
    pub ty: TypeRef,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum OpState {
    /// Created but not yet placed in the body.
    Detached,
    /// Part of the body.
    Attached,
    /// Erased; the slot stays allocated but must not be reused.
    Erased,
}

struct OpSlot {
    data: OperationData,
    result: ValueRef,
    state: OpState,
}

// ============================================================================
// IrContext
// ============================================================================

/// Arena-based op graph.
///
/// Owns every operation and value, the program order of live operations,
/// the graph inputs, and the externally observed outputs. Outputs are
/// tracked in the use-chain, so replacing a value also rewires them.
pub struct IrContext {
    name: String,
    ops: PrimaryMap<OpRef, OpSlot>,
    values: PrimaryMap<ValueRef, ValueData>,

    /// Use-chain: for each value, the list of slots that reference it.
    uses: SecondaryMap<ValueRef, SmallVec<[Use; 2]>>,

    /// Program order of attached operations.
    body: Vec<OpRef>,
    inputs: Vec<ValueRef>,
    outputs: Vec<ValueRef>,

    pub types: TypeInterner,
    pub names: NameInterner,

    /// Backing pool for operand lists.
    value_pool: ListPool<ValueRef>,
}

impl IrContext {
    /// Create a new empty graph named `main`.
    pub fn new() -> Self {
        Self::with_name("main")
    }

    /// Create a new empty graph with the given name.
    pub fn with_name(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ops: PrimaryMap::new(),
            values: PrimaryMap::new(),
            uses: SecondaryMap::new(),
            body: Vec::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            types: TypeInterner::new(),
            names: NameInterner::new(),
            value_pool: ListPool::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    // ========================================================================
    // Inputs / outputs
    // ========================================================================

    /// Append a graph input of the given type.
    pub fn add_input(&mut self, ty: TypeRef) -> ValueRef {
        let index = self.inputs.len() as u32;
        let v = self.values.push(ValueData {
            def: ValueDef::Input(index),
            ty,
        });
        self.inputs.push(v);
        v
    }

    pub fn inputs(&self) -> &[ValueRef] {
        &self.inputs
    }

    /// Replace the set of externally observed results.
    pub fn set_outputs(&mut self, outputs: impl IntoIterator<Item = ValueRef>) {
        for (idx, &old) in self.outputs.iter().enumerate() {
            self.uses[old].retain(|u| !(u.user == User::Output && u.index == idx as u32));
        }
        self.outputs = outputs.into_iter().collect();
        for (idx, &v) in self.outputs.iter().enumerate() {
            self.uses[v].push(Use {
                user: User::Output,
                index: idx as u32,
            });
        }
    }

    pub fn outputs(&self) -> &[ValueRef] {
        &self.outputs
    }

    // ========================================================================
    // Operation
    // ========================================================================

    /// Create a new operation and allocate its result value.
    ///
    /// The operation's operands are registered in the use-chain. The
    /// operation is detached; use `push_op` or `insert_op_before` to place
    /// it in the body.
    pub fn create_op(&mut self, data: OperationData) -> OpRef {
        let op = self.ops.next_key();
        let result = self.values.push(ValueData {
            def: ValueDef::OpResult(op),
            ty: data.result_ty,
        });

        let operands: SmallVec<[ValueRef; 4]> = data.operands.as_slice(&self.value_pool).into();
        let pushed = self.ops.push(OpSlot {
            data,
            result,
            state: OpState::Detached,
        });
        debug_assert_eq!(pushed, op);

        for (idx, &val) in operands.iter().enumerate() {
            self.uses[val].push(Use {
                user: User::Op(op),
                index: idx as u32,
            });
        }

        op
    }

    /// Get immutable reference to operation data.
    pub fn op(&self, op: OpRef) -> &OperationData {
        &self.ops[op].data
    }

    pub fn op_kind(&self, op: OpRef) -> OpKind {
        self.ops[op].data.kind
    }

    /// Textual name of an operation without the dialect prefix.
    pub fn op_name(&self, op: OpRef) -> &str {
        match self.ops[op].data.kind {
            OpKind::Transpose => "transpose",
            OpKind::Reshape => "reshape",
            OpKind::Other(name) => self.names.get(name),
        }
    }

    /// Get the operands of an operation as a slice.
    pub fn op_operands(&self, op: OpRef) -> &[ValueRef] {
        self.ops[op].data.operands.as_slice(&self.value_pool)
    }

    /// Get the result value of an operation.
    pub fn op_result(&self, op: OpRef) -> ValueRef {
        self.ops[op].result
    }

    /// Get the declared result type of an operation.
    pub fn op_result_type(&self, op: OpRef) -> TypeRef {
        self.ops[op].data.result_ty
    }

    /// Whether the operation is currently part of the body.
    pub fn is_live(&self, op: OpRef) -> bool {
        self.ops[op].state == OpState::Attached
    }

    /// Whether the operation's result has no remaining uses.
    pub fn is_dead(&self, op: OpRef) -> bool {
        !self.has_uses(self.ops[op].result)
    }

    /// Erase an operation: detach it from the body and drop its operand uses.
    ///
    /// # Panics
    ///
    /// Panics if the result value still has uses, as that would leave
    /// dangling references.
    pub fn erase_op(&mut self, op: OpRef) {
        assert!(
            self.ops[op].state != OpState::Erased,
            "erase_op: operation {op} was already erased",
        );
        let result = self.ops[op].result;
        assert!(
            self.uses[result].is_empty(),
            "erase_op: result value {result} still has {} use(s); \
             replace all uses before erasing the operation",
            self.uses[result].len()
        );

        if self.ops[op].state == OpState::Attached {
            self.body.retain(|&o| o != op);
        }
        self.ops[op].state = OpState::Erased;

        let operands: SmallVec<[ValueRef; 4]> = self.op_operands(op).into();
        for (idx, &val) in operands.iter().enumerate() {
            self.uses[val].retain(|u| !(u.user == User::Op(op) && u.index == idx as u32));
        }
    }

    // ========================================================================
    // Body
    // ========================================================================

    /// Live operations in program order.
    pub fn ops(&self) -> &[OpRef] {
        &self.body
    }

    /// Live operations of the given class, in program order.
    pub fn ops_of_kind(&self, class: OpClass) -> Vec<OpRef> {
        self.body
            .iter()
            .copied()
            .filter(|&op| self.op_kind(op).class() == class)
            .collect()
    }

    /// Append an operation to the end of the body.
    ///
    /// # Panics
    ///
    /// Panics if the operation is already attached or was erased.
    pub fn push_op(&mut self, op: OpRef) {
        assert!(
            self.ops[op].state == OpState::Detached,
            "push_op: operation {op} is not detached ({:?})",
            self.ops[op].state,
        );
        self.ops[op].state = OpState::Attached;
        self.body.push(op);
    }

    /// Insert an operation before `before` in the body.
    ///
    /// # Panics
    ///
    /// Panics if the operation is not detached, or if `before` is not in
    /// the body.
    pub fn insert_op_before(&mut self, before: OpRef, op: OpRef) {
        assert!(
            self.ops[op].state == OpState::Detached,
            "insert_op_before: operation {op} is not detached ({:?})",
            self.ops[op].state,
        );
        let pos = self
            .body
            .iter()
            .position(|&o| o == before)
            .expect("insert_op_before: `before` op not found in body");
        self.body.insert(pos, op);
        self.ops[op].state = OpState::Attached;
    }

    // ========================================================================
    // Value
    // ========================================================================

    /// Get immutable reference to value data.
    pub fn value(&self, v: ValueRef) -> &ValueData {
        &self.values[v]
    }

    /// Get the type of a value.
    pub fn value_ty(&self, v: ValueRef) -> TypeRef {
        self.values[v].ty
    }

    /// Get the definition of a value.
    pub fn value_def(&self, v: ValueRef) -> ValueDef {
        self.values[v].def
    }

    /// The operation producing `v`, or `None` for graph inputs.
    pub fn defining_op(&self, v: ValueRef) -> Option<OpRef> {
        match self.values[v].def {
            ValueDef::OpResult(op) => Some(op),
            ValueDef::Input(_) => None,
        }
    }

    // ========================================================================
    // Use-chain
    // ========================================================================

    /// Get all uses of a value.
    pub fn uses(&self, v: ValueRef) -> &[Use] {
        &self.uses[v]
    }

    /// Check if a value has any uses.
    pub fn has_uses(&self, v: ValueRef) -> bool {
        !self.uses[v].is_empty()
    }

    // ========================================================================
    // RAUW (Replace All Uses With)
    // ========================================================================

    /// Replace all uses of `old` with `new`, graph-wide.
    ///
    /// Rewires operand slots and output slots, and moves the use-chain
    /// entries from `old` to `new`.
    pub fn replace_all_uses(&mut self, old: ValueRef, new: ValueRef) {
        if old == new {
            return;
        }
        let old_uses = std::mem::take(&mut self.uses[old]);

        for u in &old_uses {
            match u.user {
                User::Op(user) => {
                    let operands = &mut self.ops[user].data.operands;
                    let slice = operands.as_mut_slice(&mut self.value_pool);
                    debug_assert_eq!(slice[u.index as usize], old);
                    slice[u.index as usize] = new;
                }
                User::Output => {
                    debug_assert_eq!(self.outputs[u.index as usize], old);
                    self.outputs[u.index as usize] = new;
                }
            }
            self.uses[new].push(*u);
        }
    }
}

impl Default for IrContext {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Builder for OperationData
// ============================================================================

/// Builder for constructing `OperationData` with a pool-backed operand list.
pub struct OperationDataBuilder {
    kind: OpKind,
    operands: Vec<ValueRef>,
    result_ty: TypeRef,
}

impl OperationDataBuilder {
    pub fn new(kind: OpKind, result_ty: TypeRef) -> Self {
        Self {
            kind,
            operands: Vec::new(),
            result_ty,
        }
    }

    pub fn operand(mut self, v: ValueRef) -> Self {
        self.operands.push(v);
        self
    }

    pub fn operands(mut self, vs: impl IntoIterator<Item = ValueRef>) -> Self {
        self.operands.extend(vs);
        self
    }

    /// Build the `OperationData`, packing operands into an `EntityList`
    /// using the context's pool.
    pub fn build(self, ctx: &mut IrContext) -> OperationData {
        let mut operands = EntityList::new();
        for v in self.operands {
            operands.push(v, &mut ctx.value_pool);
        }
        OperationData {
            kind: self.kind,
            operands,
            result_ty: self.result_ty,
        }
    }
}
