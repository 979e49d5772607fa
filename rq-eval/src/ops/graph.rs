//! `Graph` (§4.5, `GRAPH <iri-or-var> { ... }`): fixes the inner pattern's
//! active origin to a constant IRI, or drives it once per named graph in
//! the dataset when the origin is a variable, binding that variable on each
//! emitted row. Relies on `inner` being a rowsource that honors
//! `set_origin`/`reset` (§4.5) — the planner only ever puts a `Bgp`
//! directly under `Graph`, so `inner` is always a [`crate::TriplesRowsource`].
use std::rc::Rc;

use crate::dataset::TripleSource;
use crate::error::EvaluationError;
use crate::row::Row;
use crate::rowsource::Rowsource;
use rq_algebra::{NamedOrVariable, VariableOffset, VariablesTable};
use rq_model::Term;

pub struct GraphRowsource<TS: TripleSource> {
    inner: Box<dyn Rowsource>,
    source: Rc<TS>,
    origin: NamedOrVariable,
    graphs: Vec<Term>,
    graph_index: usize,
    started_current: bool,
}

impl<TS: TripleSource> GraphRowsource<TS> {
    pub fn new(inner: Box<dyn Rowsource>, source: Rc<TS>, origin: NamedOrVariable) -> Self {
        Self {
            inner,
            source,
            origin,
            graphs: Vec::new(),
            graph_index: 0,
            started_current: false,
        }
    }

    fn variable_offset(&self) -> Option<VariableOffset> {
        match self.origin {
            NamedOrVariable::Variable(v) => Some(v),
            NamedOrVariable::Term(_) => None,
        }
    }
}

impl<TS: TripleSource> Rowsource for GraphRowsource<TS> {
    fn variables(&self) -> &VariablesTable {
        self.inner.variables()
    }

    fn init(&mut self) -> Result<(), EvaluationError> {
        self.inner.init()?;
        if let NamedOrVariable::Term(term) = &self.origin {
            self.inner.set_origin(Some(Term::from(term.clone())));
        } else {
            self.graphs = self.source.named_graphs().map_err(EvaluationError::triple_source)?.into_iter().map(Term::NamedNode).collect();
        }
        Ok(())
    }

    fn read_row(&mut self) -> Result<Option<Row>, EvaluationError> {
        let Some(variable) = self.variable_offset() else {
            return self.inner.read_row();
        };
        loop {
            if !self.started_current {
                let Some(graph) = self.graphs.get(self.graph_index).cloned() else {
                    return Ok(None);
                };
                self.inner.set_origin(Some(graph));
                if self.inner.is_resettable() {
                    self.inner.reset()?;
                }
                self.started_current = true;
            }
            if let Some(mut row) = self.inner.read_row()? {
                row.set(variable, self.graphs.get(self.graph_index).cloned());
                return Ok(Some(row));
            }
            self.graph_index += 1;
            self.started_current = false;
        }
    }

    fn get_inner_rowsource(&self, index: usize) -> Option<&dyn Rowsource> {
        if index == 0 {
            Some(self.inner.as_ref())
        } else {
            None
        }
    }

    fn finish(&mut self) {
        self.inner.finish();
    }

    fn operator_name(&self) -> &'static str {
        "Graph"
    }
}
