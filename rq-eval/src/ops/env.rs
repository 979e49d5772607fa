//! The shared mutable state `Filter`/`Extend`/`LeftJoin`/`Group` need to
//! evaluate expressions: one `RandSource` and one blank-node minter per
//! query, not per operator, so `RAND()`/`BNODE()` stay deterministic and
//! distinct across the whole plan rather than resetting at every operator
//! boundary. Grounded on the teacher's single `QueryEvaluator`-owned RNG,
//! split out here since this tree has many small operators instead of one
//! big evaluator loop.
use std::cell::RefCell;
use std::rc::Rc;

use rq_model::{BlankNode, DateTime};

use crate::expr_eval::{evaluate, EvalContext, EvalValue, ExistsRunner};
use crate::function_registry::FunctionRegistry;
use crate::ops::service::ServiceResolver;
use crate::rand_source::RandSource;
use crate::row::Row;
use rq_algebra::Expression;

#[derive(Clone)]
pub struct EvalEnv {
    rand: Rc<RefCell<RandSource>>,
    now: DateTime,
    blank_node_seq: Rc<RefCell<u64>>,
    exists: Rc<RefCell<dyn ExistsRunner>>,
    functions: Rc<FunctionRegistry>,
    no_net: bool,
    service_resolver: Option<Rc<dyn ServiceResolver>>,
}

impl EvalEnv {
    pub fn new(
        rand: Rc<RefCell<RandSource>>,
        now: DateTime,
        exists: Rc<RefCell<dyn ExistsRunner>>,
        functions: Rc<FunctionRegistry>,
        no_net: bool,
        service_resolver: Option<Rc<dyn ServiceResolver>>,
    ) -> Self {
        Self {
            rand,
            now,
            blank_node_seq: Rc::new(RefCell::new(0)),
            exists,
            functions,
            no_net,
            service_resolver,
        }
    }

    pub fn functions(&self) -> &Rc<FunctionRegistry> {
        &self.functions
    }

    pub fn no_net(&self) -> bool {
        self.no_net
    }

    pub fn service_resolver(&self) -> Option<Rc<dyn ServiceResolver>> {
        self.service_resolver.clone()
    }

    pub fn now(&self) -> DateTime {
        self.now
    }

    pub fn with_rand<R>(&self, f: impl FnOnce(&mut RandSource) -> R) -> R {
        f(&mut self.rand.borrow_mut())
    }

    /// A fresh blank node, distinct from every other one minted from this
    /// `EvalEnv` for the lifetime of the query (§4.3 `BNODE()`/ `BNODE(str)`
    /// without an argument).
    pub fn fresh_blank_node(&self) -> BlankNode {
        let mut seq = self.blank_node_seq.borrow_mut();
        *seq += 1;
        BlankNode::new_unchecked(format!("b{}", *seq))
    }

    pub fn with_exists<R>(&self, f: impl FnOnce(&mut dyn ExistsRunner) -> R) -> R {
        f(&mut *self.exists.borrow_mut())
    }

    /// Evaluates `expr` against `row`, threading this environment's shared
    /// RNG, blank-node minter and `EXISTS` runner through a single
    /// [`EvalContext`] built just for this call.
    pub fn evaluate(&self, expr: &Expression, row: &Row) -> EvalValue {
        let mut mint = || self.fresh_blank_node();
        self.with_rand(|rand| {
            self.with_exists(|exists| {
                let mut ctx = EvalContext {
                    row,
                    rand,
                    now: self.now,
                    exists,
                    fresh_blank_node: &mut mint,
                    functions: &self.functions,
                };
                evaluate(expr, &mut ctx)
            })
        })
    }
}
